//! Achilles and the tortoise: the two-variable LTI system under QSS2.
//! The trajectories stay bounded, the quantization band invariant holds
//! at every event, and the event counts stay in the expected range.

use qssim::mdl;
use qssim::model::Model;
use qssim::options::{Method, Options};
use qssim::simulate::Simulation;

#[test]
fn qss2_achilles_band_invariant_and_counts() {
    let mut opts = Options::quiet();
    opts.method = Method::Qss2;
    opts.set_t_end(10.0);
    let mut model = Model::new(&opts);
    mdl::achilles(&mut opts, &mut model).unwrap();
    let mut sim = Simulation::new(opts, model).unwrap();

    let mut peak: f64 = 0.0;
    while sim.step().unwrap() {
        let t = sim.time();
        for v in sim.model().ids() {
            let var = sim.model().var(v);
            // |x(t) - q(t)| <= qTol inside the active segment.
            let dev = (var.x(t) - var.q(t)).abs();
            assert!(
                dev <= var.qtol + 1.0e-9,
                "band invariant violated for {}: {} > {}",
                var.name,
                dev,
                var.qtol
            );
            peak = peak.max(var.x(t).abs());
        }
    }

    // The system is oscillatory but stable: the state stays of the same
    // magnitude as the initial condition.
    assert!(peak < 10.0, "trajectory escaped: peak |x| = {}", peak);

    // Both variables requantize throughout the run: tens to thousands of
    // events, not a handful and not millions.
    let qss = sim.counters().qss;
    assert!(qss > 50, "suspiciously few events: {}", qss);
    assert!(qss < 1_000_000, "suspiciously many events: {}", qss);
}

#[test]
fn continuity_across_requantization() {
    let mut opts = Options::quiet();
    opts.method = Method::Qss2;
    opts.set_t_end(1.0);
    let mut model = Model::new(&opts);
    mdl::achilles(&mut opts, &mut model).unwrap();
    let mut sim = Simulation::new(opts, model).unwrap();

    // x is continuous across a requantization: evaluating the old
    // segment at tE equals the new segment's x(tX), and q jumps by at
    // most qTol.
    for _ in 0..50 {
        let before: Vec<(f64, f64, f64)> = sim
            .model()
            .ids()
            .map(|v| {
                let var = sim.model().var(v);
                (var.t_e, var.x(var.t_e.min(1.0e9)), var.q(var.t_e.min(1.0e9)))
            })
            .collect();
        if !sim.step().unwrap() {
            break;
        }
        let t = sim.time();
        for v in sim.model().ids() {
            let var = sim.model().var(v);
            let (t_e_old, x_old, q_old) = before[v.0];
            if t_e_old == t && var.t_q == t {
                assert!((var.x(t) - x_old).abs() < 1.0e-9, "x discontinuous");
                // qTol was recomputed from the new quantized value, so
                // allow the relative-tolerance wiggle.
                assert!(
                    (var.q(t) - q_old).abs() <= var.qtol * (1.0 + var.rtol) + 1.0e-6,
                    "q jumped more than qTol"
                );
            }
        }
    }
}
