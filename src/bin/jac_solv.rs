//! `jac_solv`: generate a diagonally dominant system and solve it with Jacobi or Gauss-Seidel.
//!
//! The report goes to stdout; logs and errors go to stderr. Exits 0 on success and on
//! non-convergence (reported with a WARNING line), nonzero on configuration, resource or device
//! errors.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use jacsolv::config::DEFAULT_PARTITION;
use jacsolv::device::{self, DeviceScalar};
use jacsolv::{
    DiagDominant, Diagnostics, ExecutionModel, NearIdentity, SolveContext, SolveError,
    SolverOptions, UpdateRule, init_tracing,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// Calling thread only
    Serial,
    /// rayon worker pool
    Rayon,
    /// Device queue selected with --device
    Device,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Precision {
    F32,
    F64,
}

#[derive(Parser, Debug)]
#[command(
    name = "jac_solv",
    version,
    about = "Solve a generated diagonally dominant system by stationary iteration"
)]
struct Cli {
    /// Matrix order [default: 1024 for jacobi, 20000 for gauss-seidel]
    ndim: Option<usize>,

    /// Select device at INDEX (see --list)
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    device: usize,

    /// Work-group (reduction partition) size; must divide NDIM
    #[arg(long, value_name = "SIZE", default_value_t = DEFAULT_PARTITION)]
    wgsize: usize,

    /// List available devices and exit
    #[arg(long)]
    list: bool,

    /// Update rule: jacobi or gauss-seidel
    #[arg(long, default_value = "jacobi")]
    method: UpdateRule,

    #[arg(long, value_enum, default_value_t = Backend::Device)]
    backend: Backend,

    #[arg(long, value_enum, default_value_t = Precision::F64)]
    precision: Precision,

    /// Convergence tolerance [default: 1e-3 for jacobi, 1e-5 for gauss-seidel]
    #[arg(long)]
    tol: Option<f64>,

    /// Iteration cap [default: 5000 for jacobi, 100000 for gauss-seidel]
    #[arg(long)]
    max_iters: Option<usize>,

    /// Worker threads for the rayon backend [default: logical CPUs]
    #[arg(long)]
    threads: Option<usize>,

    /// Seed for the matrix generator
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Trace the residual every sweep and every row of the verification
    #[arg(long)]
    debug: bool,

    /// Dump the generated matrix before solving
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn diagnostics(&self) -> Diagnostics {
        let mut d = Diagnostics::empty();
        if self.debug {
            d |= Diagnostics::DEBUG;
        }
        if self.verbose {
            d |= Diagnostics::MATRIX_DUMP;
        }
        d
    }

    fn model(&self) -> ExecutionModel {
        match self.backend {
            Backend::Serial => ExecutionModel::Serial,
            Backend::Rayon => ExecutionModel::HostParallel { threads: self.threads },
            Backend::Device => ExecutionModel::Offload { device: self.device },
        }
    }
}

fn list_devices() {
    println!();
    println!("Devices:");
    for (i, info) in device::enumerate().iter().enumerate() {
        println!("{i:2}: {}", info.name);
    }
    println!();
}

fn run<T: DeviceScalar>(cli: &Cli) -> Result<(), SolveError> {
    let mut opts = SolverOptions::<T>::for_rule(cli.method)
        .with_partition(cli.wgsize)
        .with_diagnostics(cli.diagnostics());
    if let Some(n) = cli.ndim {
        opts = opts.with_n(n);
    }
    if let Some(tol) = cli.tol {
        opts = opts.with_tol(T::of(tol));
    }
    if let Some(max_iters) = cli.max_iters {
        opts = opts.with_max_iters(max_iters);
    }

    let ctx = SolveContext::new(cli.model(), opts);
    let report = match cli.method {
        UpdateRule::Jacobi => ctx.generate_and_solve(&mut NearIdentity::new(cli.seed))?,
        UpdateRule::GaussSeidel => ctx.generate_and_solve(&mut DiagDominant::new(cli.seed))?,
    };
    println!("{report}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(if cli.debug || cli.verbose { "info" } else { "warn" });

    if cli.list {
        list_devices();
        return ExitCode::SUCCESS;
    }

    let result = match cli.precision {
        Precision::F32 => run::<f32>(&cli),
        Precision::F64 => run::<f64>(&cli),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
