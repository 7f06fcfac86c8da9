use criterion::{Criterion, black_box, criterion_group, criterion_main};
use optbench_core::problem::{Batch, Mode, ProblemSettings, TestProblem};
use optbench_core::training::{EpochLoop, EvalSplit, LoopSettings, evaluate};
use optbench_core::{Hyperparameters, create_testproblem, optimizer_factory};

fn bench_epoch_loop(c: &mut Criterion) {
    let hp = Hyperparameters::new().with("lr", 0.01);

    for (problem, optimizer) in [
        ("quadratic_deep", "sgd"),
        ("quadratic_deep", "adam"),
        ("synthetic_logreg", "adam"),
        ("two_d_beale", "sgd"),
    ] {
        let factory = optimizer_factory(optimizer).unwrap();
        let hp = hp.resolve(optimizer, factory.hyperparameter_specs()).unwrap();
        c.bench_function(&format!("epoch_loop_{problem}_{optimizer}_2_epochs"), |b| {
            b.iter(|| {
                let mut p = create_testproblem(problem, &ProblemSettings::new(128, 42)).unwrap();
                EpochLoop::standard(LoopSettings::new(2))
                    .run(p.as_mut(), factory.as_ref(), black_box(&hp))
                    .unwrap()
            })
        });
    }
}

fn bench_evaluation(c: &mut Criterion) {
    let mut problem = create_testproblem("quadratic_deep", &ProblemSettings::new(128, 42)).unwrap();
    let reg = problem.set_up().unwrap();

    c.bench_function("evaluate_quadratic_deep_test", |b| {
        b.iter(|| evaluate(problem.as_mut(), black_box(EvalSplit::Test), reg).unwrap())
    });
}

fn bench_batch_iteration(c: &mut Criterion) {
    let mut problem =
        create_testproblem("synthetic_logreg", &ProblemSettings::new(128, 42)).unwrap();
    problem.set_up().unwrap();

    c.bench_function("synthetic_logreg_train_pass", |b| {
        b.iter(|| {
            problem.init_pass(Mode::Train).unwrap();
            let mut n = 0usize;
            while let Batch::Data(batch) = problem.next_batch().unwrap() {
                black_box(batch.loss);
                n += 1;
            }
            n
        })
    });
}

criterion_group!(
    benches,
    bench_epoch_loop,
    bench_evaluation,
    bench_batch_iteration
);
criterion_main!(benches);
