//! Exponential decay end-to-end: a single QSS1 variable integrating
//! x' = -x from 1 must land near exp(-10) at t = 10 and decrease
//! monotonically across events.

use qssim::function::FunctionLti;
use qssim::model::Model;
use qssim::options::{Method, Options};
use qssim::simulate::Simulation;

#[test]
fn qss1_decay_accuracy_and_monotonicity() {
    let mut opts = Options::quiet();
    opts.method = Method::Qss1;
    opts.rtol = 1.0e-6;
    opts.atol = 1.0e-6;
    opts.set_t_end(10.0);
    let mut model = Model::new(&opts);
    let x = model.add_qss("x", 1, opts.rtol, opts.atol, 1.0);
    model.set_derivative(x, FunctionLti::new().add(-1.0, x).boxed());
    let mut sim = Simulation::new(opts, model).unwrap();

    let mut prev = f64::INFINITY;
    let mut checked = 0u64;
    while sim.step().unwrap() {
        // Sample the continuous value at the event time every so often;
        // it must never increase.
        if sim.counters().qss % 1024 == 0 {
            let now = sim.model().var(x).x[0];
            assert!(
                now <= prev + 1.0e-12,
                "x increased across events: {} -> {}",
                prev,
                now
            );
            prev = now;
            checked += 1;
        }
    }
    assert!(checked > 10);
    assert!(sim.counters().qss > 1000);

    let x_end = sim.model().var(x).x(10.0);
    let exact = (-10.0_f64).exp();
    assert!(
        (x_end - exact).abs() < 1.0e-4,
        "|x(10) - e^-10| = {}",
        (x_end - exact).abs()
    );
}
