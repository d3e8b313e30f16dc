//! Explicit QSS1/2/3 advance protocols.
//!
//! A requantization rolls the continuous representation forward to `tE`,
//! restarts the quantized segment there, reads the derivative through the
//! quantized-sequential view (the simultaneous view inside staged
//! simultaneous advances), recomputes the segment end, reschedules, and
//! advances observers. The second and third coefficients come through the
//! forward/centered numeric-differenced entry points so both analytic and
//! numerically-differentiated right-hand sides fit the same protocol.

use super::Model;
use crate::events::EventQueue;
use crate::variable::{FnId, VarId};

impl Model {
    /// Initialization stage 1: first derivative from the simultaneous
    /// view (all variables still hold their initial representations).
    pub(crate) fn qss_init_1(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_q;
        let x1 = self.deriv(f).ss(&self.refs(queue), t);
        let var = &mut self.vars[v.0];
        var.x[1] = x1;
        if var.order >= 2 {
            var.q[1] = x1;
        }
        if var.order == 1 {
            self.qss_finish_init(queue, v);
        }
    }

    /// Initialization stage 2 (order 2+).
    pub(crate) fn qss_init_2(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_q;
        let order = self.vars[v.0].order;
        if order == 2 {
            let d1 = self.deriv(f).sf1(&self.refs(queue), t);
            self.vars[v.0].x[2] = 0.5 * d1;
            self.qss_finish_init(queue, v);
        } else {
            let d1 = self.deriv(f).sc1(&self.refs(queue), t);
            let var = &mut self.vars[v.0];
            var.x[2] = 0.5 * d1;
            var.q[2] = var.x[2];
        }
    }

    /// Initialization stage 3 (order 3).
    pub(crate) fn qss_init_3(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_q;
        let d2 = self.deriv(f).sc2(&self.refs(queue), t);
        self.vars[v.0].x[3] = d2 / 6.0;
        self.qss_finish_init(queue, v);
    }

    fn qss_finish_init(&mut self, queue: &mut EventQueue, v: VarId) {
        self.set_te_aligned(v);
        queue.add_qss(self.vars[v.0].t_e, v);
        self.diag(v, '!', self.vars[v.0].t_q);
    }

    /// Requantization advance (single trigger).
    pub(crate) fn qss_advance(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_e;
        let order = self.vars[v.0].order;
        {
            let var = &mut self.vars[v.0];
            let x0 = var.x(t);
            var.x[0] = x0;
            var.q[0] = x0;
            var.t_q = t;
            var.t_x = t;
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
        if order >= 2 {
            // Numeric differentiation probes land at tN.
            self.vars[v.0].t_n = t + self.cfg.dt_num;
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
        self.diag(v, '!', t);
        self.advance_observers(queue, v, t);
    }

    /// Requantization stage 0: roll values forward; derivatives follow in
    /// the later stages once every trigger's stage 0 is done.
    pub(crate) fn qss_advance_0(&mut self, v: VarId) {
        let var = &mut self.vars[v.0];
        let t = var.t_e;
        let x0 = var.x(t);
        var.x[0] = x0;
        var.q[0] = x0;
        var.q_c = x0;
        var.t_q = t;
        var.t_x = t;
        var.set_qtol();
    }

    /// Requantization stage 1: first derivative through the simultaneous
    /// view, which hides in-progress same-instant self-updates.
    pub(crate) fn qss_advance_1(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_q;
        let order = self.vars[v.0].order;
        let x1 = self.deriv(f).ss(&self.refs(queue), t);
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
            self.diag(v, '=', t);
        }
    }

    /// Requantization stage 2 (order 2+).
    pub(crate) fn qss_advance_2(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_q;
        let order = self.vars[v.0].order;
        self.vars[v.0].t_n = t + self.cfg.dt_num;
        if order == 2 {
            let d1 = self.deriv(f).sf1(&self.refs(queue), t);
            self.vars[v.0].x[2] = 0.5 * d1;
            self.set_te_aligned(v);
            queue.shift_qss(self.vars[v.0].t_e, v);
            self.diag(v, '=', t);
        } else {
            let d1 = self.deriv(f).sc1(&self.refs(queue), t);
            let var = &mut self.vars[v.0];
            var.x[2] = 0.5 * d1;
            var.q[2] = var.x[2];
        }
    }

    /// Requantization stage 3 (order 3).
    pub(crate) fn qss_advance_3(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_q;
        let d2 = self.deriv(f).sc2(&self.refs(queue), t);
        self.vars[v.0].x[3] = d2 / 6.0;
        self.set_te_aligned(v);
        queue.shift_qss(self.vars[v.0].t_e, v);
        self.diag(v, '=', t);
    }

    /// Observer advance: roll the continuous representation to `t` and
    /// refresh its derivatives; the quantized segment is untouched, so
    /// the new segment end comes from the unaligned equations.
    pub(crate) fn qss_advance_observer(
        &mut self,
        queue: &mut EventQueue,
        w: VarId,
        f: FnId,
        t: crate::time::Time,
    ) {
        let order = self.vars[w.0].order;
        {
            let var = &mut self.vars[w.0];
            debug_assert!(var.t_x <= t && t <= var.t_e);
            let x0 = var.x(t);
            var.x[0] = x0;
            var.t_x = t;
        }
        let x1 = self.deriv(f).qs(&self.refs(queue), t);
        self.vars[w.0].x[1] = x1;
        if order >= 2 {
            self.vars[w.0].t_n = t + self.cfg.dt_num;
        }
        if order == 2 {
            let d1 = self.deriv(f).qf1(&self.refs(queue), t);
            self.vars[w.0].x[2] = 0.5 * d1;
        } else if order >= 3 {
            let d1 = self.deriv(f).qc1(&self.refs(queue), t);
            self.vars[w.0].x[2] = 0.5 * d1;
            let d2 = self.deriv(f).qc2(&self.refs(queue), t);
            self.vars[w.0].x[3] = d2 / 6.0;
        }
        self.set_te_unaligned(w);
        queue.shift_qss(self.vars[w.0].t_e, w);
        self.diag(w, ' ', t);
    }
}
