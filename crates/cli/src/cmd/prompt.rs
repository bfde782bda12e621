//! Guidance text for coding agents that keep drafts with sidesnap

use crate::app::App;
use anyhow::Result;
use serde_json::json;
use sidesnap_core::ExitCode;

pub const PROMPT_TEXT: &str = r#"A command named "sidesnap" is available for versioning scratch drafts (notes, outlines, experiments) in a sidecar git store that lives next to the main repository and never touches its history.

Setup:
1) At the start of a session run `sidesnap ensure --json` once. It is safe to repeat. Continue only when it reports code 0.

Saving drafts:
2) After editing a file under the scratch directory (default `scratch/`), record it:
   `sidesnap snap <path> -m "<purpose>: <summary>" --json`
   To record every changed scratch file in one snapshot:
   `sidesnap snap --all -m "<purpose>: <summary>" --json`
   Exit code 0 means a snapshot was stored. Exit code 10 means nothing changed; treat it as success.
   `sidesnap watch` can record changes automatically until it is stopped with Ctrl+C.

Reading results:
3) With `--json`, read only stdout. Stderr carries human-readable logs and is not a stable format.

Reviewing and recovering:
4) `sidesnap log [path] --json` lists snapshots, newest first. Add `--timeline` with a path for per-snapshot line counts.
   `sidesnap diff [path] --json` compares the two latest snapshots; `--current` compares against the working file and `--since N` against N snapshots back.
   `sidesnap restore <revision> <path> --json` writes an older version back; the file it replaces is kept as a `.sidesnap.bak.*` copy.

Housekeeping:
5) `sidesnap prune --keep 200 --json` drops older snapshots. Run it rarely.
6) Leave `.gitignore` alone. Drafts are hidden through `.git/info/exclude`, and the sidecar store is never pushed anywhere.
7) If the command is missing or fails to start, carry on with the task without it.

Snapshot after:
- creating a new draft
- a substantial edit (restructuring, rewriting a section, roughly ten or more lines)
- finishing a logical step, before trying a risky rewrite

Skip snapshots for:
- typo fixes and small wording tweaks
- several quick edits in a row; snapshot once at the end

If the user asks for more or fewer snapshots, follow their preference.

Message convention: "<purpose>: <summary>", for example
- "outline: first pass at section headings"
- "draft: expand the migration notes"
- "revise: tighten the intro after review"

Handling results:
- code 0: stored, continue
- code 10: nothing to store, continue
- code 12: another sidesnap process holds the lock; retry shortly
- any other code: mention it briefly and continue the task
"#;

pub fn run(app: &App) -> Result<ExitCode> {
    if app.out.is_json() {
        app.out.finish(ExitCode::Ok, &json!({ "prompt": PROMPT_TEXT }));
    } else {
        print!("{}", PROMPT_TEXT);
    }
    Ok(ExitCode::Ok)
}
