//! CLI command implementations

pub mod diff;
pub mod ensure;
pub mod log;
pub mod prompt;
pub mod prune;
pub mod restore;
pub mod snap;
pub mod status;
pub mod watch;
