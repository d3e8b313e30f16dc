//! Input variable advance protocols.
//!
//! Input variables carry a prescribed function of time. Requantization
//! refreshes the polynomial from the function's smooth token; a token
//! with a finite `tD` additionally schedules a discrete event, at which
//! the segment restarts discontinuously. The queue entry alternates
//! between `Qss` and `Discrete`, whichever comes first.

use super::Model;
use crate::events::EventQueue;
use crate::function::SmoothToken;
use crate::time::Time;
use crate::variable::{InpId, VarId};

impl Model {
    fn token(&self, f: InpId, t: Time) -> SmoothToken {
        self.inputs[f.0].eval(t)
    }

    /// Initialization stage 0: value and next discrete event time.
    pub(crate) fn inp_init_0(&mut self, v: VarId, f: InpId) {
        let tok = self.token(f, self.vars[v.0].t_q);
        let var = &mut self.vars[v.0];
        var.x[0] = tok.x0;
        var.q[0] = tok.x0;
        var.t_d = tok.t_d;
        var.set_qtol();
    }

    /// Initialization stage 1.
    pub(crate) fn inp_init_1(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let tok = self.token(f, self.vars[v.0].t_q);
        let var = &mut self.vars[v.0];
        var.x[1] = tok.x1;
        if var.order >= 2 {
            var.q[1] = tok.x1;
        }
        if var.order == 1 {
            self.inp_finish(queue, v, true);
        }
    }

    /// Initialization stage 2 (order 2+).
    pub(crate) fn inp_init_2(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let tok = self.token(f, self.vars[v.0].t_q);
        let var = &mut self.vars[v.0];
        var.x[2] = 0.5 * tok.x2;
        if var.order >= 3 {
            var.q[2] = var.x[2];
        }
        if var.order == 2 {
            self.inp_finish(queue, v, true);
        }
    }

    /// Initialization stage 3 (order 3).
    pub(crate) fn inp_init_3(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let tok = self.token(f, self.vars[v.0].t_q);
        self.vars[v.0].x[3] = tok.x3 / 6.0;
        self.inp_finish(queue, v, true);
    }

    /// Sets the segment end and (re)binds the queue entry to the sooner
    /// of the requantization and the discrete event.
    fn inp_finish(&mut self, queue: &mut EventQueue, v: VarId, add: bool) {
        self.set_te_aligned(v);
        let (t_d, t_e) = {
            let var = self.var(v);
            (var.t_d, var.t_e)
        };
        match (add, t_d < t_e) {
            (true, true) => queue.add_discrete(t_d, v),
            (true, false) => queue.add_qss(t_e, v),
            (false, true) => queue.shift_discrete(t_d, v),
            (false, false) => queue.shift_qss(t_e, v),
        }
        self.diag(v, '!', self.vars[v.0].t_q);
    }

    /// Refreshes the whole polynomial from the function at time `t`.
    fn inp_refresh(&mut self, v: VarId, f: InpId, t: Time) {
        let tok = self.token(f, t);
        let var = &mut self.vars[v.0];
        var.t_q = t;
        var.t_x = t;
        var.x[0] = tok.x0;
        var.q[0] = tok.x0;
        var.x[1] = tok.x1;
        if var.order >= 2 {
            var.q[1] = tok.x1;
            var.x[2] = 0.5 * tok.x2;
        }
        if var.order >= 3 {
            var.q[2] = var.x[2];
            var.x[3] = tok.x3 / 6.0;
        }
        var.t_d = tok.t_d;
        var.set_qtol();
    }

    /// Requantization advance (single trigger).
    pub(crate) fn inp_advance_qss(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let t = self.vars[v.0].t_e;
        self.inp_refresh(v, f, t);
        self.inp_finish(queue, v, false);
        self.advance_observers(queue, v, t);
    }

    /// Requantization stage 0 (simultaneous).
    pub(crate) fn inp_advance_qss_0(&mut self, v: VarId, f: InpId) {
        let t = self.vars[v.0].t_e;
        let tok = self.token(f, t);
        let var = &mut self.vars[v.0];
        var.t_q = t;
        var.t_x = t;
        var.x[0] = tok.x0;
        var.q[0] = tok.x0;
        var.t_d = tok.t_d;
        var.set_qtol();
    }

    /// Requantization stage 1 (simultaneous).
    pub(crate) fn inp_advance_qss_1(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let tok = self.token(f, self.vars[v.0].t_q);
        let var = &mut self.vars[v.0];
        var.x[1] = tok.x1;
        if var.order >= 2 {
            var.q[1] = tok.x1;
        }
        if var.order == 1 {
            self.inp_finish(queue, v, false);
        }
    }

    /// Requantization stage 2 (simultaneous, order 2+).
    pub(crate) fn inp_advance_qss_2(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let tok = self.token(f, self.vars[v.0].t_q);
        let var = &mut self.vars[v.0];
        var.x[2] = 0.5 * tok.x2;
        if var.order >= 3 {
            var.q[2] = var.x[2];
        }
        if var.order == 2 {
            self.inp_finish(queue, v, false);
        }
    }

    /// Requantization stage 3 (simultaneous, order 3).
    pub(crate) fn inp_advance_qss_3(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let tok = self.token(f, self.vars[v.0].t_q);
        self.vars[v.0].x[3] = tok.x3 / 6.0;
        self.inp_finish(queue, v, false);
    }

    /// Discrete advance: discontinuous segment restart at `tD`.
    pub(crate) fn inp_advance_discrete(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let t = self.vars[v.0].t_d;
        self.inp_refresh(v, f, t);
        debug_assert!(self.vars[v.0].t_d > t);
        self.set_te_aligned(v);
        let (t_d, t_e) = {
            let var = self.var(v);
            (var.t_d, var.t_e)
        };
        if t_d < t_e {
            queue.shift_discrete(t_d, v);
        } else {
            queue.shift_qss(t_e, v);
        }
        self.diag(v, '*', t);
        self.advance_observers(queue, v, t);
    }

    /// Discrete advance: stages 0 and 1 (simultaneous). Order-1 inputs
    /// are complete after this stage and reschedule here.
    pub(crate) fn inp_advance_discrete_0_1(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let t = self.vars[v.0].t_d;
        let tok = self.token(f, t);
        {
            let var = &mut self.vars[v.0];
            var.t_q = t;
            var.t_x = t;
            var.x[0] = tok.x0;
            var.q[0] = tok.x0;
            var.x[1] = tok.x1;
            if var.order >= 2 {
                var.q[1] = tok.x1;
            }
            var.t_d = tok.t_d;
            var.set_qtol();
        }
        if self.vars[v.0].order == 1 {
            self.inp_discrete_finish(queue, v);
        }
    }

    /// Discrete advance: stage 2 (simultaneous, order 2+).
    pub(crate) fn inp_advance_discrete_2(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let tok = self.token(f, self.vars[v.0].t_q);
        let var = &mut self.vars[v.0];
        var.x[2] = 0.5 * tok.x2;
        if var.order >= 3 {
            var.q[2] = var.x[2];
        }
        if var.order == 2 {
            self.inp_discrete_finish(queue, v);
        }
    }

    /// Discrete advance: stage 3 (simultaneous, order 3).
    pub(crate) fn inp_advance_discrete_3(&mut self, queue: &mut EventQueue, v: VarId, f: InpId) {
        let tok = self.token(f, self.vars[v.0].t_q);
        self.vars[v.0].x[3] = tok.x3 / 6.0;
        self.inp_discrete_finish(queue, v);
    }

    fn inp_discrete_finish(&mut self, queue: &mut EventQueue, v: VarId) {
        self.set_te_aligned(v);
        let (t_d, t_e) = {
            let var = self.var(v);
            (var.t_d, var.t_e)
        };
        if t_d < t_e {
            queue.shift_discrete(t_d, v);
        } else {
            queue.shift_qss(t_e, v);
        }
        self.diag(v, '*', self.vars[v.0].t_q);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::{InputSin, InputStep};
    use crate::options::Options;

    #[test]
    fn sine_input_init_matches_reference_fixture() {
        let opts = Options::quiet();
        let mut m = Model::new(&opts);
        let u = m.add_input(
            "u",
            2,
            1.0e-4,
            1.0e-6,
            Box::new(InputSin { c: 0.05, s: 0.5 }),
        );
        m.var_mut(u).set_dt_max(1.0);
        let mut queue = EventQueue::new();
        m.init(&mut queue).unwrap();
        let var = m.var(u);
        assert_eq!(var.rtol, 1.0e-4);
        assert_eq!(var.atol, 1.0e-6);
        assert_eq!(var.x(0.0), 0.0);
        assert!((var.x(1.0) - 0.025).abs() < 1e-12);
        assert!((var.x1(0.0) - 0.025).abs() < 1e-12);
        assert_eq!(var.x2(0.0), 0.0);
        assert_eq!(var.q(0.0), 0.0);
        assert!((var.q(1.0) - 0.025).abs() < 1e-12);
        assert!((var.q1(0.0) - 0.025).abs() < 1e-12);
        assert_eq!(var.t_q, 0.0);
        // x2 vanishes at t = 0, so tE comes from the dt_max clamp.
        assert_eq!(var.t_e, 1.0);
    }

    #[test]
    fn sine_input_requantization() {
        let opts = Options::quiet();
        let mut m = Model::new(&opts);
        let u = m.add_input(
            "u",
            2,
            1.0e-4,
            1.0e-6,
            Box::new(InputSin { c: 0.05, s: 0.5 }),
        );
        m.var_mut(u).set_dt_max(1.0);
        let mut queue = EventQueue::new();
        m.init(&mut queue).unwrap();
        let t_e = m.var(u).t_e;
        queue.set_active_time();
        m.advance_qss(&mut queue, u);
        let var = m.var(u);
        assert_eq!(var.t_q, t_e);
        assert_eq!(queue.len(), 1);
        // Value tracks the sine exactly at requantization times.
        assert!((var.x[0] - 0.05 * (0.5_f64).sin()).abs() < 1e-12);
    }

    #[test]
    fn step_input_discrete_events() {
        let opts = Options::quiet();
        let mut m = Model::new(&opts);
        let u = m.add_input(
            "u",
            1,
            1.0e-4,
            1.0e-6,
            Box::new(InputStep {
                h0: 0.0,
                dh: 1.0,
                dt: 0.5,
            }),
        );
        let mut queue = EventQueue::new();
        m.init(&mut queue).unwrap();
        let var = m.var(u);
        // Constant between steps: requantization never fires, the
        // discrete event at 0.5 owns the queue entry.
        assert_eq!(var.t_d, 0.5);
        assert_eq!(queue.top_time(), 0.5);
        assert_eq!(
            queue.top().unwrap().kind,
            crate::events::EventKind::Discrete
        );
        queue.set_active_time();
        m.advance_discrete(&mut queue, u);
        let var = m.var(u);
        assert_eq!(var.x[0], 1.0);
        assert_eq!(var.t_d, 1.0);
        assert_eq!(queue.top_time(), 1.0);
    }
}
