//! Simultaneous trigger ordering: when two variables share a
//! requantization time, stage 0 of both (value roll-forward) completes
//! before stage 1 of either (derivative evaluation). Observed by a
//! probing derivative that records, at every stage-1 evaluation, whether
//! both variables' quantized segments have already been restarted at the
//! trigger time.

use qssim::function::{Derivative, Refs};
use qssim::model::Model;
use qssim::options::Options;
use qssim::simulate::Simulation;
use qssim::time::{Time, Value};
use qssim::variable::VarId;
use std::cell::RefCell;
use std::rc::Rc;

/// A constant derivative that logs stage-1 evaluations.
struct Probe {
    c: Value,
    owner: RefCell<Option<VarId>>,
    log: Rc<RefCell<Vec<bool>>>,
}

impl Derivative for Probe {
    fn observees(&self) -> Vec<VarId> {
        vec![]
    }

    fn wire(&mut self, owner: VarId) {
        *self.owner.borrow_mut() = Some(owner);
    }

    fn q(&self, _r: &Refs, _t: Time) -> Value {
        self.c
    }

    fn x(&self, _r: &Refs, _t: Time) -> Value {
        self.c
    }

    fn s(&self, _r: &Refs, _t: Time) -> Value {
        self.c
    }

    fn ss(&self, r: &Refs, t: Time) -> Value {
        // Stage 1 of a simultaneous advance: both triggers must already
        // have tQ == t from their stage 0.
        let aligned = r.vars.iter().take(2).all(|v| v.t_q == t);
        self.log.borrow_mut().push(aligned);
        self.s(r, t)
    }
}

#[test]
fn stage_zero_completes_before_stage_one() {
    let mut opts = Options::quiet();
    opts.set_t_end(0.5);
    let log = Rc::new(RefCell::new(vec![]));
    let mut model = Model::new(&opts);
    // Identical setup: identical tE at every requantization, so every
    // wave is a simultaneous trigger pair.
    let a = model.add_qss("a", 1, 1.0e-4, 1.0e-3, 1.0);
    let b = model.add_qss("b", 1, 1.0e-4, 1.0e-3, 1.0);
    model.set_derivative(
        a,
        Box::new(Probe {
            c: -1.0,
            owner: RefCell::new(None),
            log: Rc::clone(&log),
        }),
    );
    model.set_derivative(
        b,
        Box::new(Probe {
            c: -1.0,
            owner: RefCell::new(None),
            log: Rc::clone(&log),
        }),
    );
    let mut sim = Simulation::new(opts, model).unwrap();
    sim.run().unwrap();

    assert!(sim.counters().qss_simultaneous > 5);
    assert_eq!(sim.model().var(a).t_q, sim.model().var(b).t_q);

    let log = log.borrow();
    // Two stage-1 probes per simultaneous wave, plus the two init-stage
    // evaluations (where both variables also sit at the shared time).
    assert!(log.len() as u64 >= 2 * sim.counters().qss_simultaneous);
    assert!(
        log.iter().all(|&aligned| aligned),
        "a stage-1 evaluation ran before a peer's stage 0"
    );
}
