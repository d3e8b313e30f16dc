//! Handler advance protocols.
//!
//! Zero-crossing handlers mutate their target variables through these
//! entry points: a discontinuous reset of the value followed by a fresh
//! quantized segment, with observers advanced afterwards. Handlers can
//! apply targets directly (single-target case) or defer through handler
//! events carrying value payloads, which the driver then services as a
//! staged simultaneous wave.

use super::{Dispatch, Model};
use crate::events::EventQueue;
use crate::time::{Time, Value};
use crate::variable::{DiscreteKind, FnId, VarId, VarKind};

impl Model {
    /// Schedules a handler event for `v` at time `t` with the given value
    /// payload. The variable's queue entry is rebound; its own advance
    /// will reschedule it when the event is serviced.
    pub fn request_handler(&self, queue: &mut EventQueue, v: VarId, t: Time, value: Value) {
        debug_assert!(v.0 < self.vars.len());
        queue.shift_handler(t, value, v);
    }

    /// Handler advance (single target): discontinuous reset to `value`
    /// at time `t`, then observer propagation.
    pub fn advance_handler(&mut self, queue: &mut EventQueue, v: VarId, t: Time, value: Value) {
        match self.dispatch(v) {
            Dispatch::Qss(f) | Dispatch::Liqss(f) => {
                self.state_handler(queue, v, f, t, value);
                self.diag(v, '*', t);
                self.advance_observers(queue, v, t);
            }
            Dispatch::Discrete => {
                self.discrete_handler(queue, v, t, value);
                self.diag(v, '*', t);
                self.advance_observers(queue, v, t);
            }
            _ => unreachable!("variable kind has no handler advance"),
        }
    }

    /// Handler advance: stage 0 (simultaneous).
    pub(crate) fn advance_handler_0(&mut self, queue: &mut EventQueue, v: VarId, t: Time, value: Value) {
        match self.dispatch(v) {
            Dispatch::Qss(_) | Dispatch::Liqss(_) => {
                let var = &mut self.vars[v.0];
                debug_assert!(var.t_x <= t && var.t_q <= t && t <= var.t_e);
                var.t_x = t;
                var.t_q = t;
                var.x[0] = value;
                var.q[0] = value;
                var.q_c = value;
                var.set_qtol();
            }
            Dispatch::Discrete => {
                self.discrete_handler(queue, v, t, value);
                self.diag(v, '*', t);
            }
            _ => unreachable!("variable kind has no handler advance"),
        }
    }

    /// Handler advance: stage 1 (simultaneous, order 1+).
    pub(crate) fn advance_handler_1(&mut self, queue: &mut EventQueue, v: VarId) {
        let t = self.vars[v.0].t_q;
        let order = self.vars[v.0].order;
        let f = match self.dispatch(v) {
            Dispatch::Qss(f) | Dispatch::Liqss(f) => f,
            _ => unreachable!("variable kind has no staged handler advance"),
        };
        let x1 = self.deriv(f).qs(&self.refs(queue), t);
        {
            let var = &mut self.vars[v.0];
            var.x[1] = x1;
            if var.order >= 2 {
                var.q[1] = x1;
            }
        }
        if order == 1 {
            self.set_te_aligned(v);
            queue.shift_qss(self.vars[v.0].t_e, v);
            self.diag(v, '*', t);
        }
    }

    /// Handler advance: stage 2 (simultaneous, order 2+).
    pub(crate) fn advance_handler_2(&mut self, queue: &mut EventQueue, v: VarId) {
        let t = self.vars[v.0].t_q;
        let order = self.vars[v.0].order;
        let f = match self.dispatch(v) {
            Dispatch::Qss(f) | Dispatch::Liqss(f) => f,
            _ => unreachable!("variable kind has no staged handler advance"),
        };
        if order == 2 {
            let d1 = self.deriv(f).qf1(&self.refs(queue), t);
            self.vars[v.0].x[2] = 0.5 * d1;
            self.set_te_aligned(v);
            queue.shift_qss(self.vars[v.0].t_e, v);
            self.diag(v, '*', t);
        } else {
            let d1 = self.deriv(f).qc1(&self.refs(queue), t);
            let var = &mut self.vars[v.0];
            var.x[2] = 0.5 * d1;
            var.q[2] = var.x[2];
        }
    }

    /// Handler advance: stage 3 (simultaneous, order 3).
    pub(crate) fn advance_handler_3(&mut self, queue: &mut EventQueue, v: VarId) {
        let t = self.vars[v.0].t_q;
        let f = match self.dispatch(v) {
            Dispatch::Qss(f) => f,
            _ => unreachable!("variable kind has no staged handler advance"),
        };
        let d2 = self.deriv(f).qc2(&self.refs(queue), t);
        self.vars[v.0].x[3] = d2 / 6.0;
        self.set_te_aligned(v);
        queue.shift_qss(self.vars[v.0].t_e, v);
        self.diag(v, '*', t);
    }

    /// Full state-variable handler advance: value reset and a fresh
    /// aligned segment from the quantized views at `t`.
    fn state_handler(&mut self, queue: &mut EventQueue, v: VarId, f: FnId, t: Time, value: Value) {
        let order = self.vars[v.0].order;
        {
            let var = &mut self.vars[v.0];
            debug_assert!(var.t_x <= t && var.t_q <= t && t <= var.t_e);
            var.t_x = t;
            var.t_q = t;
            var.x[0] = value;
            var.q[0] = value;
            var.q_c = value;
            var.set_qtol();
        }
        let x1 = self.deriv(f).qs(&self.refs(queue), t);
        {
            let var = &mut self.vars[v.0];
            var.x[1] = x1;
            if order >= 2 {
                var.q[1] = x1;
            }
        }
        if order == 2 {
            let d1 = self.deriv(f).qf1(&self.refs(queue), t);
            self.vars[v.0].x[2] = 0.5 * d1;
        } else if order >= 3 {
            let d1 = self.deriv(f).qc1(&self.refs(queue), t);
            {
                let var = &mut self.vars[v.0];
                var.x[2] = 0.5 * d1;
                var.q[2] = var.x[2];
            }
            let d2 = self.deriv(f).qc2(&self.refs(queue), t);
            self.vars[v.0].x[3] = d2 / 6.0;
        }
        self.set_te_aligned(v);
        queue.shift_qss(self.vars[v.0].t_e, v);
    }

    /// Discrete variable handler advance: set the value and park the
    /// handler entry back at infinity.
    fn discrete_handler(&mut self, queue: &mut EventQueue, v: VarId, t: Time, value: Value) {
        let var = &mut self.vars[v.0];
        debug_assert!(var.t_x <= t);
        var.t_x = t;
        var.t_q = t;
        var.x[0] = match var.kind {
            VarKind::Discrete {
                kind: DiscreteKind::Integer,
            } => value.round(),
            VarKind::Discrete {
                kind: DiscreteKind::Boolean,
            } => {
                if value != 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            _ => value,
        };
        var.q[0] = var.x[0];
        queue.shift_handler_inf(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionLti;
    use crate::options::Options;

    #[test]
    fn state_handler_resets_segment() {
        let opts = Options::quiet();
        let mut m = Model::new(&opts);
        let x = m.add_qss("x", 2, 1.0e-4, 1.0e-6, 1.0);
        m.set_derivative(x, FunctionLti::new().add(-1.0, x).boxed());
        let mut queue = EventQueue::new();
        m.init(&mut queue).unwrap();
        queue.set_active_time();
        let t = 0.005;
        m.advance_handler(&mut queue, x, t, 2.0);
        let var = m.var(x);
        assert_eq!(var.t_q, t);
        assert_eq!(var.t_x, t);
        assert_eq!(var.x[0], 2.0);
        assert_eq!(var.q[0], 2.0);
        // Derivative reread from the new quantized value.
        assert!((var.x[1] + 2.0).abs() < 1e-12);
        assert!(var.t_e > t);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn discrete_handler_rounds_kinds() {
        let opts = Options::quiet();
        let mut m = Model::new(&opts);
        let d = m.add_discrete("d", DiscreteKind::Real, 0.0);
        let i = m.add_discrete("i", DiscreteKind::Integer, 0.0);
        let b = m.add_discrete("b", DiscreteKind::Boolean, 0.0);
        let mut queue = EventQueue::new();
        m.init(&mut queue).unwrap();
        assert_eq!(queue.len(), 3);
        queue.set_active_time();
        m.advance_handler(&mut queue, d, 1.0, 2.7);
        m.advance_handler(&mut queue, i, 1.0, 2.7);
        m.advance_handler(&mut queue, b, 1.0, 2.7);
        assert_eq!(m.var(d).x(1.0), 2.7);
        assert_eq!(m.var(i).x(1.0), 3.0);
        assert_eq!(m.var(b).x(1.0), 1.0);
        // Entries parked back at infinity.
        assert_eq!(queue.top_time(), crate::math::INFINITY);
    }

    #[test]
    fn deferred_handler_event_carries_value() {
        let opts = Options::quiet();
        let mut m = Model::new(&opts);
        let d = m.add_discrete("d", DiscreteKind::Real, 0.0);
        let mut queue = EventQueue::new();
        m.init(&mut queue).unwrap();
        queue.set_active_time();
        m.request_handler(&mut queue, d, 0.5, -0.7);
        let e = *queue.top().unwrap();
        assert_eq!(e.kind, crate::events::EventKind::Handler);
        assert_eq!(e.val, -0.7);
        assert_eq!(queue.top_time(), 0.5);
    }
}
