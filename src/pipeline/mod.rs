//! The core pipeline: key derivation, diffing, and run orchestration.
//!
//! - `key`: stable identity keys for residence records
//! - `diff`: current-vs-previous key set comparison
//! - `watch`: one full run, wiring source, notifier, and state together

pub mod diff;
pub mod key;
pub mod watch;

pub use diff::{KeySet, diff};
pub use key::{DerivedKey, KeySource, derive_batch, derive_key, normalize};
pub use watch::{RunSummary, run_watch};
