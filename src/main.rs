use clap::Parser;
use heatdis::build_info;
use heatdis::checkpoint::{BackendConfig, CheckpointCoordinator, CheckpointMode, FileBackend};
use heatdis::comm::LocalGroup;
use heatdis::config::RunConfig;
use heatdis::driver::{RunDriver, RunReport};
use heatdis::error::Error;
use heatdis::partition::DomainPartition;
use log::debug;
use std::path::PathBuf;

/// Sample heat distribution code with checkpoint/restart.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Problem size per rank, MB.
    #[arg(short, long, default_value = "100")]
    pub size: usize,

    /// Number of timesteps.
    #[arg(short, long, default_value = "600")]
    pub nsteps: u64,

    /// Min precision.
    #[arg(short, long, default_value = "0.00001")]
    pub precision: f64,

    /// Checkpoint interval.
    #[arg(short, long, default_value = "100")]
    pub checkpoint_interval: u64,

    /// Number of ranks to run in this process group.
    #[arg(short, long, default_value = "1")]
    pub ranks: usize,

    /// Tag identifying the checkpoint stream.
    #[arg(long, default_value = "heatdis")]
    pub run_id: String,

    /// Treat every iteration as a transactional checkpoint point and
    /// let the interval filter pick the durable ones.
    #[arg(long)]
    pub transactional: bool,

    /// Restore this exact checkpoint version instead of probing for
    /// the latest.
    #[arg(long)]
    pub restore_version: Option<u64>,

    /// The number of threads for the local stencil update.
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Print build information and quit.
    #[arg(long)]
    pub build_info: bool,

    /// Backend config file.
    #[arg(required_unless_present = "build_info")]
    pub config: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.build_info {
        build_info::print_report("heatdis");
        std::process::exit(0);
    }

    if args.size == 0 {
        println!("Wrong memory size! See usage");
        std::process::exit(3);
    }

    if let Err(err) = run(&args) {
        eprintln!("heatdis: {err}");
        std::process::exit(err.exit_code());
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let config = RunConfig {
        size_mb: args.size,
        nsteps: args.nsteps,
        precision: args.precision,
        checkpoint_interval: args.checkpoint_interval,
        run_id: args.run_id.clone(),
        mode: if args.transactional {
            CheckpointMode::Transactional
        } else {
            CheckpointMode::Explicit
        },
        restore_version: args.restore_version,
    };
    config.validate()?;
    if args.ranks == 0 {
        return Err(Error::Config("rank count must be positive".to_string()));
    }

    // Sizing problems surface here, before the group exists and before
    // the backend is touched.
    DomainPartition::from_memory_budget(config.size_mb, 0, args.ranks)?;

    let config_path = args.config.as_deref().expect("clap enforces the positional");
    let backend_config = BackendConfig::load(config_path)?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("rayon_thread_{}", i))
            .build_global()
            .unwrap();
    }

    let ranks = args.ranks;
    let handles: Vec<_> = LocalGroup::split(ranks)
        .into_iter()
        .enumerate()
        .map(|(rank, comm)| {
            let config = config.clone();
            let backend_config = backend_config.clone();
            std::thread::Builder::new()
                .name(format!("rank_{}", rank))
                .spawn(move || -> Result<RunReport, Error> {
                    let partition =
                        DomainPartition::from_memory_budget(config.size_mb, rank, ranks)?;
                    let backend = FileBackend::initialize(&backend_config, rank)?;
                    let coordinator = CheckpointCoordinator::new(
                        backend,
                        config.run_id.clone(),
                        config.checkpoint_interval,
                        config.mode,
                        config.restore_version,
                    );
                    RunDriver::new(config, partition, comm, coordinator).run()
                })
                .expect("spawn rank thread")
        })
        .collect();

    // A failed rank drops its channels, which unblocks its peers with
    // a comm error. Report the root cause, not the knock-on comm
    // failures, so the exit code stays meaningful.
    let mut group_error: Option<Error> = None;
    for handle in handles {
        match handle.join().expect("rank thread panicked") {
            Ok(report) => debug!(
                "rank finished: {:?} after {} iterations",
                report.outcome, report.iterations
            ),
            Err(err) => {
                let knock_on = matches!(err, Error::Comm(_));
                match &group_error {
                    None => group_error = Some(err),
                    Some(Error::Comm(_)) if !knock_on => group_error = Some(err),
                    Some(_) => {}
                }
            }
        }
    }
    match group_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
