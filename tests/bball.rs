//! Bouncing ball: QSS2 height and velocity, a zero-crossing on the
//! height, and a bounce handler applied through deferred handler events.
//! The ball must not sink below the floor, the bounce count must match
//! the restitution schedule, and the total energy must decay.

use qssim::mdl;
use qssim::model::Model;
use qssim::options::{Method, Options};
use qssim::simulate::Simulation;
use qssim::variable::VarId;

const G: f64 = 9.80665;

fn energy(sim: &Simulation, h: VarId, v: VarId, t: f64) -> f64 {
    let height = sim.model().var(h).x(t);
    let speed = sim.model().var(v).x(t);
    G * height + 0.5 * speed * speed
}

#[test]
fn bounces_floor_and_energy() {
    let mut opts = Options::quiet();
    opts.method = Method::Qss2;
    opts.set_t_end(2.0);
    let mut model = Model::new(&opts);
    mdl::bball(&mut opts, &mut model).unwrap();
    let mut sim = Simulation::new(opts, model).unwrap();
    let h = VarId(0);
    let v = VarId(1);

    let e0 = energy(&sim, h, v, 0.0);
    let mut e_prev = e0;
    let mut zc_seen = 0;
    while sim.step().unwrap() {
        let t = sim.time();
        // Floor invariant: the height stays above the floor up to the
        // quantization and root-refinement tolerances.
        assert!(
            sim.model().var(h).x(t) >= -1.0e-3,
            "ball sank below the floor at t = {}",
            t
        );
        if sim.counters().zc > zc_seen {
            zc_seen = sim.counters().zc;
            let e_now = energy(&sim, h, v, t);
            // Energy is non-increasing across bounces (small slack for
            // the quantized representations).
            assert!(
                e_now <= e_prev + 0.05 * e0,
                "energy increased across a bounce: {} -> {}",
                e_prev,
                e_now
            );
            e_prev = e_now;
        }
    }

    // Drop from rest at h = 1: impacts at 0.4515, 1.084, 1.526, 1.836,
    // then past tEnd = 2.
    assert!(
        (3..=6).contains(&zc_seen),
        "unexpected bounce count: {}",
        zc_seen
    );

    // Restitution losses are visible by the end of the run.
    assert!(
        e_prev < 0.75 * e0,
        "energy did not decay: {} vs {}",
        e_prev,
        e0
    );
    // Handler events were deferred through the queue as a handler wave.
    assert!(sim.counters().qss > 10);
}
