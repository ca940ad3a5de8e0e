use crate::checkpoint::CheckpointMode;
use crate::error::Error;

/// Immutable execution bounds for one run, shared by every rank.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Per-rank problem size in MB; the grid width is derived from it.
    pub size_mb: usize,
    /// Maximum number of iterations.
    pub nsteps: u64,
    /// Convergence threshold on the group-wide error.
    pub precision: f64,
    /// Completed iterations between durable checkpoints.
    pub checkpoint_interval: u64,
    /// Tag identifying the checkpoint stream of this execution.
    pub run_id: String,
    pub mode: CheckpointMode,
    /// Restore this exact version instead of probing for the latest.
    pub restore_version: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            size_mb: 100,
            nsteps: 600,
            precision: 1e-5,
            checkpoint_interval: 100,
            run_id: "heatdis".to_string(),
            mode: CheckpointMode::Explicit,
            restore_version: None,
        }
    }
}

impl RunConfig {
    /// Rejects unusable parameters before any collective is entered,
    /// so every rank fails identically.
    pub fn validate(&self) -> Result<(), Error> {
        if self.size_mb == 0 {
            return Err(Error::Config("problem size must be positive".to_string()));
        }
        if self.checkpoint_interval == 0 {
            return Err(Error::Config(
                "checkpoint interval must be positive".to_string(),
            ));
        }
        if !(self.precision > 0.0) {
            return Err(Error::Config("precision must be positive".to_string()));
        }
        Ok(())
    }
}
