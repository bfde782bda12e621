//! Serial snapshot queue
//!
//! One worker task consumes jobs in the order they were queued and awaits
//! each to completion before starting the next, so commits never overlap.

use crate::SnapJob;
use async_trait::async_trait;
use sidesnap_core::Error;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of a job that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Committed {
        commit: String,
        path: String,
        bytes: u64,
    },
    NoChanges,
}

/// Executes one job; typically a snapshot of the job's path
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(&self, job: &SnapJob) -> Result<JobOutcome, Error>;
}

/// What happened to a job, in queue order
#[derive(Debug)]
pub enum QueueEvent {
    Committed {
        job: SnapJob,
        commit: String,
        path: String,
        bytes: u64,
    },
    Failed {
        job: SnapJob,
        error: Error,
    },
}

/// Handle to the queue worker
pub struct SerialQueue {
    jobs: mpsc::UnboundedSender<SnapJob>,
    close: CancellationToken,
    worker: JoinHandle<usize>,
}

impl SerialQueue {
    /// Spawn the worker; job results are reported on the returned receiver
    pub fn spawn(runner: Arc<dyn JobRunner>) -> (Self, mpsc::UnboundedReceiver<QueueEvent>) {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let close = CancellationToken::new();

        let worker = tokio::spawn(run_worker(runner, jobs_rx, events_tx, close.clone()));

        (
            Self {
                jobs: jobs_tx,
                close,
                worker,
            },
            events_rx,
        )
    }

    /// Sender for producers such as the debounce scheduler
    pub fn sender(&self) -> mpsc::UnboundedSender<SnapJob> {
        self.jobs.clone()
    }

    /// Finish every job already queued, stop the worker and return the
    /// number of commits made over the queue's lifetime
    pub async fn drain(self) -> usize {
        self.close.cancel();
        drop(self.jobs);
        match self.worker.await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "snapshot queue worker failed");
                0
            }
        }
    }
}

async fn run_worker(
    runner: Arc<dyn JobRunner>,
    mut jobs: mpsc::UnboundedReceiver<SnapJob>,
    events: mpsc::UnboundedSender<QueueEvent>,
    close: CancellationToken,
) -> usize {
    let mut committed = 0;
    loop {
        let job = tokio::select! {
            biased;
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
            _ = close.cancelled() => match jobs.try_recv() {
                Ok(job) => job,
                Err(_) => break,
            },
        };

        if run_job(runner.as_ref(), job, &events).await {
            committed += 1;
        }
    }
    debug!(committed, "snapshot queue drained");
    committed
}

async fn run_job(
    runner: &dyn JobRunner,
    job: SnapJob,
    events: &mpsc::UnboundedSender<QueueEvent>,
) -> bool {
    match runner.run(&job).await {
        Ok(JobOutcome::Committed {
            commit,
            path,
            bytes,
        }) => {
            let _ = events.send(QueueEvent::Committed {
                job,
                commit,
                path,
                bytes,
            });
            true
        }
        Ok(JobOutcome::NoChanges) => false,
        Err(error) => {
            let _ = events.send(QueueEvent::Failed { job, error });
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WatchAction;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records start/end of every job and fails on request
    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
        running: AtomicBool,
        overlaps: AtomicUsize,
    }

    #[async_trait]
    impl JobRunner for Recorder {
        async fn run(&self, job: &SnapJob) -> Result<JobOutcome, Error> {
            if self.running.swap(true, Ordering::SeqCst) {
                self.overlaps.fetch_add(1, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.log.lock().unwrap().push(job.path.clone());
            self.running.store(false, Ordering::SeqCst);

            match job.path.as_str() {
                "unchanged" => Ok(JobOutcome::NoChanges),
                "fail" => Err(Error::PreconditionFailed("boom".into())),
                path => Ok(JobOutcome::Committed {
                    commit: format!("c-{path}"),
                    path: path.to_string(),
                    bytes: 1,
                }),
            }
        }
    }

    fn job(path: &str) -> SnapJob {
        SnapJob {
            path: path.to_string(),
            action: WatchAction::Update,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_jobs_run_in_order_without_overlap() {
        let recorder = Arc::new(Recorder::default());
        let (queue, mut events) = SerialQueue::spawn(recorder.clone());

        for path in ["a", "unchanged", "fail", "b"] {
            queue.sender().send(job(path)).unwrap();
        }
        let committed = queue.drain().await;

        assert_eq!(committed, 2);
        assert_eq!(*recorder.log.lock().unwrap(), vec!["a", "unchanged", "fail", "b"]);
        assert_eq!(recorder.overlaps.load(Ordering::SeqCst), 0);

        let mut reported = Vec::new();
        while let Ok(event) = events.try_recv() {
            reported.push(match event {
                QueueEvent::Committed { commit, .. } => commit,
                QueueEvent::Failed { job, .. } => format!("failed-{}", job.path),
            });
        }
        assert_eq!(reported, vec!["c-a", "failed-fail", "c-b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_with_outstanding_senders() {
        let recorder = Arc::new(Recorder::default());
        let (queue, _events) = SerialQueue::spawn(recorder.clone());
        let producer = queue.sender();

        producer.send(job("a")).unwrap();
        producer.send(job("b")).unwrap();
        assert_eq!(queue.drain().await, 2);
        assert!(producer.send(job("late")).is_err());
    }
}
