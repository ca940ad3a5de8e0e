use crate::checkpoint::{CheckpointBackend, CheckpointCoordinator};
use crate::comm::Communicator;
use crate::config::RunConfig;
use crate::convergence::ConvergenceMonitor;
use crate::error::Result;
use crate::partition::DomainPartition;
use crate::solver;
use crate::state::RunState;
use crate::stencil::jacobi_5pt;
use log::info;
use std::time::Instant;

/// Progress output cadence, iterations.
pub const ITER_OUT: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The group error fell below the precision target.
    Converged,
    /// Step budget exhausted without reaching the target. Normal
    /// termination, not an error.
    MaxStepsReached,
}

#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Completed iterations at termination.
    pub iterations: u64,
    /// Last reduced group-wide error.
    pub global_error: f64,
    pub elapsed_seconds: f64,
}

/// Ties partition, stencil step, convergence monitor and checkpoint
/// coordinator into the iteration loop, enforcing their ordering and
/// propagating the first failure.
pub struct RunDriver<C: Communicator, B: CheckpointBackend> {
    config: RunConfig,
    partition: DomainPartition,
    comm: C,
    coordinator: CheckpointCoordinator<B>,
    monitor: ConvergenceMonitor,
    state: RunState,
}

impl<C: Communicator, B: CheckpointBackend> RunDriver<C, B> {
    pub fn new(
        config: RunConfig,
        partition: DomainPartition,
        comm: C,
        coordinator: CheckpointCoordinator<B>,
    ) -> Self {
        let state = RunState::new(&partition);
        let monitor = ConvergenceMonitor::new(config.precision);
        RunDriver {
            config,
            partition,
            comm,
            coordinator,
            monitor,
            state,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn partition(&self) -> &DomainPartition {
        &self.partition
    }

    /// Runs to convergence or step exhaustion, resuming from the
    /// newest usable checkpoint first. Stdout stays quiet except on
    /// rank 0.
    pub fn run(&mut self) -> Result<RunReport> {
        let root = self.partition.rank() == 0;
        if root {
            println!(
                "Local data size is {} x {} = {:.6} MB ({}).",
                self.partition.grid_size(),
                self.partition.local_rows(),
                self.partition.memory_mb(),
                self.config.size_mb
            );
            println!("Target precision : {:.6} ", self.config.precision);
            println!("Maximum number of iterations : {} ", self.config.nsteps);
        }

        let start = Instant::now();
        let resumed = self.coordinator.initialize(&mut self.state)?;
        if resumed > 0 && root {
            println!(
                "Previous checkpoint found at iteration {}, initiating restart...",
                resumed
            );
        }

        let stencil = jacobi_5pt();
        let mut outcome = RunOutcome::MaxStepsReached;
        while self.state.iteration < self.config.nsteps {
            let iteration = self.state.iteration;
            let comm = &mut self.comm;
            let monitor = &mut self.monitor;
            let partition = &self.partition;
            self.coordinator.run_step(&mut self.state, |state| {
                let local_error = solver::step(comm, partition, &stencil, &mut state.field)?;
                if iteration % ITER_OUT == 0 && root {
                    // The printed figure is the last reduced one, stale
                    // off the reduction cadence.
                    println!(
                        "Step : {}, error = {:.6}",
                        iteration,
                        monitor.global_error()
                    );
                }
                monitor.maybe_reduce(comm, local_error, iteration)?;
                Ok(())
            })?;

            if self.monitor.converged() {
                if root {
                    println!("PRECISION ERROR");
                }
                outcome = RunOutcome::Converged;
                break;
            }

            if self
                .coordinator
                .iteration_complete(&self.state, self.config.nsteps)?
            {
                info!(
                    "checkpoint rank: {} ---- i: {}",
                    self.partition.rank(),
                    self.state.iteration
                );
            }
        }

        self.coordinator.finalize();
        let elapsed_seconds = start.elapsed().as_secs_f64();
        if root {
            println!("Execution finished in {:.6} seconds.", elapsed_seconds);
        }

        Ok(RunReport {
            outcome,
            iterations: self.state.iteration,
            global_error: self.monitor.global_error(),
            elapsed_seconds,
        })
    }
}
