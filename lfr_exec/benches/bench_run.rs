//! # Full Run Benchmark

use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};

use comms_if::net::channel_link;
use lfr_lib::{
    kin_sim::{self, KinSim},
    kpi,
    line_ctrl::{self, Gains, LineCtrl},
    path_ref::{self, PathRef, PathShape},
    run::{self, Run},
};

fn sim() -> KinSim {
    let params = kin_sim::Params {
        seed: 7,
        noise_speed_std_ms: 0.02,
        noise_ang_vel_std_rads: 0.02,
        dist_mag_rads: 0.2,
        dist_prob: 0.01,
        ..Default::default()
    };
    KinSim::new(params, StdRng::seed_from_u64(7)).unwrap()
}

fn line_ctrl(path: PathRef, time_step_s: f64) -> LineCtrl {
    LineCtrl::new(line_ctrl::InitData {
        params: line_ctrl::Params {
            gains: Gains {
                k_p: 1.5,
                k_i: 0.0,
                k_d: 0.1,
                k_head: 2.5,
                k_ff: 1.0,
            },
            nom_speed_ms: 1.0,
            min_speed_ms: 0.3,
            slow_gain: 1.0,
            integral_limit: 1.0,
            max_ang_vel_rads: 3.0,
            tracking_loss_limit_m: None,
        },
        path,
        time_step_s,
    })
    .unwrap()
}

fn run_benchmark(c: &mut Criterion) {
    // ---- Build the path and run parameters ----

    let path = PathRef::new(&path_ref::Params {
        x_start_m: 0.0,
        length_m: 30.0,
        shape: PathShape::from_type_name("curved").unwrap(),
    })
    .unwrap();

    let run_params = run::Params {
        time_step_s: 0.02,
        duration_s: 20.0,
        init_x_m: 0.0,
        init_y_m: 0.0,
        init_head_rad: 0.0,
    };

    // Bench a local run, including KPI evaluation
    c.bench_function("Run::execute::local", |b| {
        b.iter(|| {
            let mut run = Run::new(
                run_params.clone(),
                sim(),
                line_ctrl(path.clone(), run_params.time_step_s),
            )
            .unwrap();
            run.execute().unwrap();
            kpi::evaluate(run.log(), &kpi::Params::default()).unwrap()
        })
    });

    // Bench a run with the controller on its own thread
    c.bench_function("Run::execute::split", |b| {
        b.iter(|| {
            let (client, server) = channel_link();
            let remote = line_ctrl(path.clone(), run_params.time_step_s);
            let jh = std::thread::spawn(move || remote.serve(server));

            let mut run = Run::new(run_params.clone(), sim(), client).unwrap();
            run.execute().unwrap();
            let log = run.into_log();

            jh.join().unwrap();
            log
        })
    });

    // Bench projection alone
    c.bench_function("PathRef::project", |b| {
        let pose = comms_if::sim::Pose::new(12.3, 7.1, 0.4);
        b.iter(|| path.project(&pose).unwrap())
    });
}

criterion_group!(benches, run_benchmark);
criterion_main!(benches);
