use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use jacsolv::parallel::{Executor, SerialExecutor, Workspace};
use jacsolv::{LinearSystem, MatrixGenerator, NearIdentity, UpdateRule};

fn sweeps<E: Executor<f64>>(exec: &mut E, sys: &LinearSystem<f64>, partition: usize, count: usize) -> f64 {
    let mut ws = exec.allocate(&sys.a, &sys.b, partition).unwrap();
    let mut last = 0.0;
    for _ in 0..count {
        ws.swap_roles();
        exec.update(&mut ws, &sys.a, &sys.b, UpdateRule::Jacobi).unwrap();
        exec.reduce(&mut ws, UpdateRule::Jacobi).unwrap();
        last = jacsolv::kernel::aggregate(ws.partials());
    }
    last
}

fn bench_serial_vs_rayon(c: &mut Criterion) {
    let mut group = c.benchmark_group("jacobi sweep");
    for n in [256usize, 1024] {
        let sys: LinearSystem<f64> = NearIdentity::new(0).generate(n).unwrap();

        group.bench_with_input(BenchmarkId::new("serial", n), &sys, |ben, sys| {
            let mut exec = SerialExecutor;
            ben.iter(|| black_box(sweeps(&mut exec, sys, 64, 10)))
        });

        #[cfg(feature = "rayon")]
        group.bench_with_input(BenchmarkId::new("rayon", n), &sys, |ben, sys| {
            let mut exec = jacsolv::parallel::RayonExecutor::new(None).unwrap();
            ben.iter(|| black_box(sweeps(&mut exec, sys, 64, 10)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_serial_vs_rayon);
criterion_main!(benches);
