use jacsolv::device;
use jacsolv::{
    DiagDominant, ExecutionModel, MatrixGenerator, NearIdentity, SolveContext, SolverOptions,
    UpdateRule, init_tracing,
};

fn main() {
    init_tracing("info");

    for (i, info) in device::enumerate().iter().enumerate() {
        println!("{i:2}: {} ({:?}, max work-group {})", info.name, info.kind, info.max_work_group_size);
    }

    // Same system on every execution model; the solutions agree bit for bit.
    let n = 256;
    let sys = NearIdentity::new(42).generate(n).unwrap();
    let host = device::enumerate().len() - 1;
    for model in [
        ExecutionModel::Serial,
        ExecutionModel::HostParallel { threads: None },
        ExecutionModel::Offload { device: host },
    ] {
        let opts = SolverOptions::<f64>::jacobi().with_n(n).with_tol(1e-8);
        match SolveContext::new(model, opts).solve(&sys) {
            Ok(report) => println!("{model:?}\n{report}\n"),
            Err(err) => eprintln!("{model:?}: {err}"),
        }
    }

    // Gauss-Seidel on the harder generator.
    let sys = DiagDominant::new(42).generate(n).unwrap();
    let opts = SolverOptions::<f64>::for_rule(UpdateRule::GaussSeidel).with_n(n).with_partition(32);
    let report = SolveContext::new(ExecutionModel::Serial, opts).solve(&sys).unwrap();
    println!("{report}");
}
