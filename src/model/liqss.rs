//! Linearly-implicit QSS1/2 advance protocols.
//!
//! LIQSS damps the oscillations explicit QSS produces on self-referential
//! variables by biasing the quantized value within ±qTol of the center
//! according to the derivative signs under both candidates. The probes go
//! through the `lu` entry points of the derivative; non-self-observing
//! LIQSS variables just bias by the sign of the leading coefficient.

use super::Model;
use crate::events::EventQueue;
use crate::function::{LiqssSpecs, LiqssSpecs2};
use crate::math::signum;
use crate::time::Time;
use crate::variable::{FnId, VarId};

impl Model {
    /// Initialization stage 1.
    pub(crate) fn liqss_init_1(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_q;
        let order = self.vars[v.0].order;
        if order == 1 {
            if self.vars[v.0].self_observer {
                // Simultaneous reps used to avoid cyclic dependency.
                let specs = self
                    .deriv(f)
                    .slu1(&self.refs(queue), t, self.vars[v.0].qtol);
                self.liqss1_apply(v, specs);
            } else {
                let x1 = self.deriv(f).ss(&self.refs(queue), t);
                let var = &mut self.vars[v.0];
                var.x[1] = x1;
                var.q[0] += signum(x1) as f64 * var.qtol;
            }
            self.set_te_aligned(v);
            queue.add_qss(self.vars[v.0].t_e, v);
            self.diag(v, '!', t);
        } else {
            let x1 = self.deriv(f).ss(&self.refs(queue), t);
            let var = &mut self.vars[v.0];
            var.x[1] = x1;
            var.q[1] = x1;
        }
    }

    /// Initialization stage 2 (LIQSS2).
    pub(crate) fn liqss_init_2(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_q;
        if self.vars[v.0].self_observer {
            let specs = self
                .deriv(f)
                .slu2(&self.refs(queue), t, self.vars[v.0].qtol);
            self.liqss2_apply(v, specs);
        } else {
            let d1 = self.deriv(f).sf1(&self.refs(queue), t);
            let var = &mut self.vars[v.0];
            var.x[2] = 0.5 * d1;
            var.q[0] += signum(var.x[2]) as f64 * var.qtol;
        }
        self.set_te_aligned(v);
        queue.add_qss(self.vars[v.0].t_e, v);
        self.diag(v, '!', t);
    }

    /// Requantization advance (single trigger).
    pub(crate) fn liqss_advance(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_e;
        let order = self.vars[v.0].order;
        {
            let var = &mut self.vars[v.0];
            let x0 = var.x(t);
            var.x[0] = x0;
            var.q_c = x0;
            var.q[0] = x0;
            var.t_q = t;
            var.t_x = t;
            var.set_qtol();
        }
        if order == 1 {
            if self.vars[v.0].self_observer {
                let specs = self
                    .deriv(f)
                    .qlu1(&self.refs(queue), t, self.vars[v.0].qtol);
                self.liqss1_apply(v, specs);
            } else {
                let x1 = self.deriv(f).qs(&self.refs(queue), t);
                let var = &mut self.vars[v.0];
                var.x[1] = x1;
                var.q[0] += signum(x1) as f64 * var.qtol;
            }
        } else if self.vars[v.0].self_observer {
            let specs = self
                .deriv(f)
                .qlu2(&self.refs(queue), t, self.vars[v.0].qtol);
            self.liqss2_apply(v, specs);
        } else {
            let x1 = self.deriv(f).qs(&self.refs(queue), t);
            {
                let var = &mut self.vars[v.0];
                var.x[1] = x1;
                var.q[1] = x1;
            }
            let d1 = self.deriv(f).qf1(&self.refs(queue), t);
            let var = &mut self.vars[v.0];
            var.x[2] = 0.5 * d1;
            var.q[0] += signum(var.x[2]) as f64 * var.qtol;
        }
        self.set_te_aligned(v);
        queue.shift_qss(self.vars[v.0].t_e, v);
        self.diag(v, '!', t);
        self.advance_observers(queue, v, t);
    }

    /// Requantization stage 1 (simultaneous).
    pub(crate) fn liqss_advance_1(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_q;
        let order = self.vars[v.0].order;
        if order == 1 {
            if self.vars[v.0].self_observer {
                // Simultaneous reps used to avoid cyclic dependency.
                let specs = self
                    .deriv(f)
                    .slu1(&self.refs(queue), t, self.vars[v.0].qtol);
                self.liqss1_apply(v, specs);
            } else {
                let x1 = self.deriv(f).ss(&self.refs(queue), t);
                let var = &mut self.vars[v.0];
                var.x[1] = x1;
                var.q[0] += signum(x1) as f64 * var.qtol;
            }
            self.set_te_aligned(v);
            queue.shift_qss(self.vars[v.0].t_e, v);
            self.diag(v, '=', t);
        } else {
            let x1 = self.deriv(f).ss(&self.refs(queue), t);
            let var = &mut self.vars[v.0];
            var.x[1] = x1;
            var.q[1] = x1;
        }
    }

    /// Requantization stage 2 (LIQSS2, simultaneous).
    pub(crate) fn liqss_advance_2(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let t = self.vars[v.0].t_q;
        if self.vars[v.0].self_observer {
            let specs = self
                .deriv(f)
                .slu2(&self.refs(queue), t, self.vars[v.0].qtol);
            self.liqss2_apply(v, specs);
        } else {
            let d1 = self.deriv(f).sf1(&self.refs(queue), t);
            let var = &mut self.vars[v.0];
            var.x[2] = 0.5 * d1;
            var.q[0] += signum(var.x[2]) as f64 * var.qtol;
        }
        self.set_te_aligned(v);
        queue.shift_qss(self.vars[v.0].t_e, v);
        self.diag(v, '=', t);
    }

    /// Observer advance: no hysteresis, continuous representation only.
    pub(crate) fn liqss_advance_observer(
        &mut self,
        queue: &mut EventQueue,
        w: VarId,
        f: FnId,
        t: Time,
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
            let d1 = self.deriv(f).qf1(&self.refs(queue), t);
            self.vars[w.0].x[2] = 0.5 * d1;
        }
        self.set_te_unaligned(w);
        queue.shift_qss(self.vars[w.0].t_e, w);
        self.diag(w, ' ', t);
    }

    /// Applies the LIQSS1 selection: the derivative signs under the lower
    /// and upper candidates pick the boundary, a sign disagreement means
    /// a flat trajectory at the zero-slope witness.
    fn liqss1_apply(&mut self, v: VarId, specs: LiqssSpecs) {
        let var = &mut self.vars[v.0];
        debug_assert!(var.qtol > 0.0);
        debug_assert!(var.self_observer);
        let dls = signum(specs.l);
        let dus = signum(specs.u);
        if dls == -1 && dus == -1 {
            // Downward trajectory
            var.q[0] -= var.qtol;
            var.x[1] = specs.l;
        } else if dls == 1 && dus == 1 {
            // Upward trajectory
            var.q[0] += var.qtol;
            var.x[1] = specs.u;
        } else {
            // Flat trajectory: clipped in case of roundoff
            var.q[0] = specs.z.max(var.q[0] - var.qtol).min(var.q[0] + var.qtol);
            var.x[1] = 0.0;
        }
    }

    /// Applies the LIQSS2 selection on the second-derivative signs.
    fn liqss2_apply(&mut self, v: VarId, specs: LiqssSpecs2) {
        let var = &mut self.vars[v.0];
        debug_assert!(var.qtol > 0.0);
        debug_assert!(var.self_observer);
        let dls = signum(specs.l2);
        let dus = signum(specs.u2);
        if dls == -1 && dus == -1 {
            // Downward curving trajectory
            var.q[0] -= var.qtol;
            var.x[1] = specs.l1;
            var.q[1] = specs.l1;
            var.x[2] = 0.5 * specs.l2;
        } else if dls == 1 && dus == 1 {
            // Upward curving trajectory
            var.q[0] += var.qtol;
            var.x[1] = specs.u1;
            var.q[1] = specs.u1;
            var.x[2] = 0.5 * specs.u2;
        } else {
            // Flat trajectory
            var.q[0] = specs.z2.max(var.q[0] - var.qtol).min(var.q[0] + var.qtol);
            var.x[1] = specs.z1;
            var.q[1] = specs.z1;
            var.x[2] = 0.0;
        }
    }
}
