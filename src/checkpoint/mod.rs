//! Versioned checkpoint/restart over an abstract storage backend.
//!
//! The backend owns durability; this module owns the decision logic of
//! when, what, and from where to checkpoint or restore. A version is a
//! durable, immutable snapshot of the protected state, identified by
//! the number of completed loop iterations. Versions are superseded by
//! later ones, never deleted.

mod coordinator;
mod file;
mod filter;

pub use coordinator::*;
pub use file::*;
pub use filter::*;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Version = u64;

/// Byte view of one protected region, for writing a checkpoint.
pub struct Region<'a> {
    pub id: u32,
    pub bytes: &'a [u8],
}

/// Mutable byte view of one protected region, overwritten in place by
/// a restart.
pub struct RegionMut<'a> {
    pub id: u32,
    pub bytes: &'a mut [u8],
}

#[derive(Debug, Error)]
pub enum BackendInitError {
    #[error("cannot read backend config {path}: {source}")]
    Config { path: PathBuf, source: io::Error },

    #[error("malformed backend config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot prepare checkpoint directory {dir}: {source}")]
    Storage { dir: PathBuf, source: io::Error },
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("writing checkpoint version {version} failed: {source}")]
    Write { version: Version, source: io::Error },

    #[error("reading checkpoint version {version} failed: {source}")]
    Read { version: Version, source: io::Error },

    #[error("checkpoint version {version} is not durable")]
    MissingVersion { version: Version },

    #[error("checkpoint version {version} is truncated")]
    Corrupt { version: Version },

    #[error("region {id}: got {got} bytes, protected declaration says {declared}")]
    RegionMismatch {
        id: u32,
        declared: usize,
        got: usize,
    },

    #[error("checkpoint version {version} holds no region {id}")]
    MissingRegion { version: Version, id: u32 },
}

/// The storage engine boundary. Implementations guarantee at most one
/// in-flight checkpoint per run id and mutual exclusion of `checkpoint`
/// and `restart` for the same run id (`&mut self` encodes both here).
pub trait CheckpointBackend {
    /// Declares a protected region: every checkpoint must cover it and
    /// a restart overwrites it in place.
    fn protect(&mut self, id: u32, len_bytes: usize);

    /// Makes `version` durable. Succeeds completely or leaves the
    /// version store without that version.
    fn checkpoint(
        &mut self,
        run_id: &str,
        version: Version,
        regions: &[Region<'_>],
    ) -> Result<(), CheckpointError>;

    /// Probes for a restorable version: the hinted one if given, the
    /// latest otherwise. `None` when nothing usable is durable.
    fn restart_test(&mut self, run_id: &str, hint: Option<Version>) -> Option<Version>;

    /// Overwrites all protected regions from the durable snapshot.
    fn restart(
        &mut self,
        run_id: &str,
        version: Version,
        regions: &mut [RegionMut<'_>],
    ) -> Result<(), CheckpointError>;

    fn latest_version(&mut self, run_id: &str) -> Option<Version>;

    /// Releases the backend. Durable versions outlive the process.
    fn finalize(&mut self);
}
