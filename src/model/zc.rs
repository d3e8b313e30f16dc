//! Zero-crossing variable protocols.
//!
//! A zero-crossing variable tracks a derived scalar whose sign changes
//! fire a handler. Its queue entry is bound to whichever of the segment
//! end `tE` and the crossing time `tZ` comes first. The root search seeds
//! `tZ` with the analytic root of the continuous representation and
//! refines it with a damped Newton iteration against the function (the
//! quantized view at order 1, the continuous view at order 2); it is only
//! robust for small active segments, which the requantization discipline
//! keeps small.

use super::Model;
use crate::error::{inv_op, Result};
use crate::events::EventQueue;
use crate::math::{min_positive_root_quadratic, signum, INFINITY};
use crate::time::Time;
use crate::variable::{Crossing, FnId, VarId};

impl Model {
    /// Initializes a zero-crossing variable: contract checks, initial
    /// representation, segment end, crossing search and event insertion.
    pub(crate) fn init_zc(&mut self, queue: &mut EventQueue, v: VarId) -> Result<()> {
        let f = self.vars[v.0].zc().map(|zc| zc.f).unwrap_or(FnId(0));
        if self.vars[v.0].self_observer {
            return inv_op(format!(
                "zero-crossing variable is self-observer: {}",
                self.vars[v.0].name
            ));
        }
        if !self.vars[v.0].observers.is_empty() {
            return inv_op(format!(
                "zero-crossing variable has observers: {}",
                self.vars[v.0].name
            ));
        }
        let t = self.vars[v.0].t_q;
        self.zc_refresh(queue, v, f, t);
        self.set_te_aligned(v);
        self.zc_set_tz(queue, v, f);
        let (t_e, t_z) = {
            let var = self.var(v);
            (var.t_e, var.t_zc())
        };
        if t_e < t_z {
            queue.add_qss(t_e, v);
        } else {
            queue.add_zc(t_z, v);
        }
        self.diag(v, '!', t);
        Ok(())
    }

    /// Requantization advance: the continuous representation drifted qTol
    /// from the quantized one; refresh both and search the new segment.
    pub(crate) fn zc_advance_requant(
        &mut self,
        queue: &mut EventQueue,
        v: VarId,
        f: FnId,
        marker: char,
    ) {
        let t = self.vars[v.0].t_e;
        self.zc_refresh(queue, v, f, t);
        self.set_te_aligned(v);
        self.zc_set_tz(queue, v, f);
        self.zc_rebind(queue, v);
        self.diag(v, marker, t);
    }

    /// Observer advance: an observee requantized at `t`. Re-sample the
    /// sign, treating `t == tZ_prev` as exactly zero so re-crossings
    /// right after a handler are caught, then either fire at the current
    /// instant or re-run the root search.
    pub(crate) fn zc_advance_observer(
        &mut self,
        queue: &mut EventQueue,
        w: VarId,
        f: FnId,
        t: Time,
    ) {
        let sign_old = {
            let var = &self.vars[w.0];
            debug_assert!(var.t_x <= t && t <= var.t_e);
            let t_z_prev = var.zc().map(|zc| zc.t_z_prev).unwrap_or(INFINITY);
            if t == t_z_prev {
                0
            } else {
                signum(var.x(t))
            }
        };
        self.zc_refresh(queue, w, f, t);
        let sign_new = signum(self.vars[w.0].x[0]);
        self.set_te_aligned(w);
        self.zc_crossing_detect(queue, w, f, sign_old, sign_new);
        self.diag(w, ' ', t);
    }

    /// Zero-crossing advance: fire the handler, consume the crossing, and
    /// search the remainder of the active segment.
    pub(crate) fn advance_zc(&mut self, queue: &mut EventQueue, v: VarId) {
        let (f, h, crossing, t_z) = {
            let zc = self.vars[v.0].zc().expect("not a zero-crossing variable");
            (zc.f, zc.h, zc.crossing, zc.t_z)
        };
        let handler = std::rc::Rc::clone(&self.handlers[h.0]);
        handler.apply(self, queue, t_z, crossing);
        if self.cfg.diagnostics {
            println!("Z {}({})", self.vars[v.0].name, t_z);
        }
        if let Some(zc) = self.vars[v.0].zc_mut() {
            zc.t_z_prev = t_z;
        }
        self.zc_set_tz_after(queue, v, f, t_z);
        self.zc_rebind(queue, v);
    }

    /// Refreshes the representation from the function at time `t`.
    ///
    /// An order-1 zero-crossing variable tracks the quantized view of its
    /// function; an order-2 variable tracks the continuous view, whose
    /// curvature the quantized representations of order-2 observees do
    /// not carry.
    fn zc_refresh(&mut self, queue: &mut EventQueue, v: VarId, f: FnId, t: Time) {
        let order = self.vars[v.0].order;
        let (x0, x1, d2) = if order == 1 {
            (
                self.deriv(f).q(&self.refs(queue), t),
                self.deriv(f).q1(&self.refs(queue), t),
                0.0,
            )
        } else {
            (
                self.deriv(f).x(&self.refs(queue), t),
                self.deriv(f).x1(&self.refs(queue), t),
                self.deriv(f).x2(&self.refs(queue), t),
            )
        };
        let var = &mut self.vars[v.0];
        var.t_q = t;
        var.t_x = t;
        var.x[0] = x0;
        var.q[0] = x0;
        var.set_qtol();
        var.x[1] = x1;
        if var.order >= 2 {
            var.q[1] = x1;
            var.x[2] = 0.5 * d2;
        }
    }

    /// The function value in the view matching the variable's order.
    fn zc_f(&self, queue: &EventQueue, v: VarId, f: FnId, t: Time) -> crate::time::Value {
        if self.vars[v.0].order == 1 {
            self.deriv(f).q(&self.refs(queue), t)
        } else {
            self.deriv(f).x(&self.refs(queue), t)
        }
    }

    /// The function derivative in the view matching the variable's order.
    fn zc_f1(&self, queue: &EventQueue, v: VarId, f: FnId, t: Time) -> crate::time::Value {
        if self.vars[v.0].order == 1 {
            self.deriv(f).q1(&self.refs(queue), t)
        } else {
            self.deriv(f).x1(&self.refs(queue), t)
        }
    }

    /// Rebinds the queue entry to the sooner of `tE` and `tZ`.
    fn zc_rebind(&mut self, queue: &mut EventQueue, v: VarId) {
        let (t_e, t_z) = {
            let var = self.var(v);
            (var.t_e, var.t_zc())
        };
        if t_e < t_z {
            queue.shift_qss(t_e, v);
        } else {
            queue.shift_zc(t_z, v);
        }
    }

    /// Crossing detection after an observer advance: a sign change at the
    /// current instant fires immediately when subscribed; otherwise the
    /// root search runs on the fresh segment.
    fn zc_crossing_detect(
        &mut self,
        queue: &mut EventQueue,
        v: VarId,
        f: FnId,
        sign_old: i32,
        sign_new: i32,
    ) {
        if sign_old != sign_new {
            let crossing_check = Crossing::from_signs(sign_old, sign_new);
            let subscribed = self.vars[v.0]
                .zc()
                .map(|zc| zc.crossings.has(crossing_check))
                .unwrap_or(false);
            if subscribed {
                let t_x = self.vars[v.0].t_x;
                if let Some(zc) = self.vars[v.0].zc_mut() {
                    zc.crossing = crossing_check;
                    zc.t_z = t_x;
                }
                let t_z = self.vars[v.0].t_zc();
                queue.shift_zc(t_z, v);
                return;
            }
        }
        self.zc_set_tz(queue, v, f);
        self.zc_rebind(queue, v);
    }

    /// Sets the zero-crossing time and type on the active segment.
    fn zc_set_tz(&mut self, queue: &mut EventQueue, v: VarId, f: FnId) {
        let (x0, t_x, order) = {
            let var = self.var(v);
            (var.x[0], var.t_x, var.order)
        };
        if x0 == 0.0 {
            // Already-zero segment start: not a fresh crossing.
            self.set_tz_value(v, INFINITY);
            return;
        }
        let sign_old = signum(x0);
        // Analytic seed root of the continuous representation and the
        // trajectory sign used to classify the candidate crossing.
        let (seed, sign_new) = match order {
            1 => {
                let x1 = self.vars[v.0].x[1];
                if x1 != 0.0 && sign_old != signum(x1) {
                    (Some(t_x - (x0 / x1)), signum(x1))
                } else {
                    (None, signum(x1))
                }
            }
            _ => {
                let var = self.var(v);
                let dt = min_positive_root_quadratic(var.x[2], var.x[1], var.x[0]);
                if dt != INFINITY {
                    let slope = var.x1(t_x + dt);
                    (Some(t_x + dt), signum(slope))
                } else {
                    (None, signum(var.x[1]))
                }
            }
        };
        let crossing_check = Crossing::from_signs(sign_old, sign_new);
        let subscribed = self.vars[v.0]
            .zc()
            .map(|zc| zc.crossings.has(crossing_check))
            .unwrap_or(false);
        let seed = match (subscribed, seed) {
            (true, Some(seed)) => seed,
            _ => {
                self.set_tz_value(v, INFINITY);
                return;
            }
        };
        debug_assert!(t_x < seed || self.vars[v.0].order >= 2);
        if let Some(zc) = self.vars[v.0].zc_mut() {
            zc.crossing = crossing_check;
        }
        let refined = self.zc_refine_root(queue, v, f, seed, sign_old);
        self.set_tz_value(v, refined);
    }

    /// Sets the zero-crossing time on `(tb, tE]`: the crossing at `tb`
    /// has just been consumed.
    fn zc_set_tz_after(&mut self, queue: &mut EventQueue, v: VarId, f: FnId, tb: Time) {
        self.zc_set_tz(queue, v, f);
        let t_z = self.vars[v.0].t_zc();
        if t_z <= tb {
            self.set_tz_value(v, INFINITY);
        }
    }

    fn set_tz_value(&mut self, v: VarId, t_z: Time) {
        if let Some(zc) = self.vars[v.0].zc_mut() {
            zc.t_z = t_z;
        }
    }

    /// Damped Newton refinement of a seed root against the function's
    /// quantized view. Bounded iteration; halves the step whenever |f|
    /// does not decrease; gives up on a vanishing derivative or when the
    /// root has clearly drifted past the segment end. The refined root is
    /// accepted only if it stayed in the segment and improved |f|.
    fn zc_refine_root(
        &mut self,
        queue: &mut EventQueue,
        v: VarId,
        f: FnId,
        seed: Time,
        sign_old: i32,
    ) -> Time {
        const MAX_ITER: usize = 10;
        let (t_x, t_e, atol) = {
            let var = self.var(v);
            (var.t_x, var.t_e, var.atol)
        };
        let v_seed = self.zc_f(queue, v, f, seed);
        let mut t = seed;
        let mut t_p = t;
        let mut val = v_seed;
        let mut val_p = v_seed;
        let mut m = 1.0;
        let mut i = 0;
        while {
            i += 1;
            i <= MAX_ITER && (val.abs() > atol || val.abs() < val_p.abs())
        } {
            let d = self.zc_f1(queue, v, f, t);
            if d == 0.0 {
                break;
            }
            if signum(d) != sign_old && t_e < t_p.min(t) {
                // Crossing appears to be past tE: stop refining.
                break;
            }
            t -= m * (val / d);
            val = self.zc_f(queue, v, f, t);
            if val.abs() >= val_p.abs() {
                // Non-converging step: reduce step size.
                m *= 0.5;
            }
            t_p = t;
            val_p = val;
        }
        if i > MAX_ITER && self.cfg.diagnostics {
            println!("  {}({}) tZ may not have converged", self.vars[v.0].name, t);
        }
        if t >= t_x && val.abs() < v_seed.abs() {
            t
        } else {
            seed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::function::{FunctionLti, Handler};
    use crate::options::Options;
    use crate::variable::Crossings;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct ResetHandler {
        target: VarId,
        fired: Rc<RefCell<Vec<(Time, Crossing)>>>,
    }

    impl Handler for ResetHandler {
        fn apply(&self, m: &mut Model, queue: &mut EventQueue, t: Time, crossing: Crossing) {
            self.fired.borrow_mut().push((t, crossing));
            if crossing.is_downward() {
                m.advance_handler(queue, self.target, t, 1.0);
            }
        }
    }

    fn ramp_model() -> (Model, EventQueue, VarId, VarId, Rc<RefCell<Vec<(Time, Crossing)>>>) {
        // x' = -1 from x(0) = 1, with a loose-tolerance ZC on x itself so
        // tE > tZ.
        let opts = Options::quiet();
        let mut m = Model::new(&opts);
        let x = m.add_qss("x", 2, 1.0e-4, 1.0e-6, 1.0);
        m.set_derivative(x, FunctionLti::new().constant(-1.0).boxed());
        let fired = Rc::new(RefCell::new(vec![]));
        let z = m.add_zc(
            "z",
            1,
            2.0,
            2.0,
            Crossings::dn(),
            FunctionLti::new().add_var(x).boxed(),
            Rc::new(ResetHandler {
                target: x,
                fired: Rc::clone(&fired),
            }),
        );
        let mut queue = EventQueue::new();
        m.init(&mut queue).unwrap();
        (m, queue, x, z, fired)
    }

    #[test]
    fn loose_tolerance_crossing_setup() {
        let (m, queue, x, z, _) = ramp_model();
        let xv = m.var(x);
        assert_eq!(xv.x(0.0), 1.0);
        assert_eq!(xv.q(0.0), 1.0);
        assert_eq!(xv.t_e, INFINITY);
        let zv = m.var(z);
        assert_eq!(zv.rtol, 2.0);
        assert_eq!(zv.atol, 2.0);
        assert_eq!(zv.x(0.0), 1.0);
        assert_eq!(zv.q(0.0), 1.0);
        // qTol = max(2 * |1|, 2) = 2, |x1| = 1: tE = 2.
        assert!((zv.t_e - 2.0).abs() < 1e-12);
        assert!((zv.t_zc() - 1.0).abs() < 1e-12);
        assert_eq!(zv.zc().unwrap().crossing, Crossing::DnPN);
        // The ZC event wins the queue entry.
        assert_eq!(queue.top().unwrap().kind, EventKind::Zc);
        assert!((queue.top_time() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn crossing_fires_handler_and_consumes() {
        let (mut m, mut queue, x, z, fired) = ramp_model();
        assert!((m.var(x).x(1.0) - 0.0).abs() < 1e-12);
        queue.set_active_time();
        m.advance_zc(&mut queue, z);
        // The handler reset x to 1 at t = 1.
        assert_eq!(m.var(x).x(1.0), 1.0);
        assert_eq!(m.var(x).q(1.0), 1.0);
        let fired = fired.borrow();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].1, Crossing::DnPN);
        assert!((fired[0].0 - 1.0).abs() < 1e-12);
        assert_eq!(m.var(z).zc().unwrap().t_z_prev, 1.0);
    }

    #[test]
    fn unsubscribed_direction_is_ignored() {
        // Upward ramp with a downward-only subscription: no crossing.
        let opts = Options::quiet();
        let mut m = Model::new(&opts);
        let x = m.add_qss("x", 1, 1.0e-4, 1.0e-6, -1.0);
        m.set_derivative(x, FunctionLti::new().constant(1.0).boxed());
        struct Never;
        impl Handler for Never {
            fn apply(&self, _: &mut Model, _: &mut EventQueue, _: Time, _: Crossing) {
                panic!("handler must not fire");
            }
        }
        let z = m.add_zc(
            "z",
            1,
            2.0,
            2.0,
            Crossings::dn(),
            FunctionLti::new().add_var(x).boxed(),
            Rc::new(Never),
        );
        let mut queue = EventQueue::new();
        m.init(&mut queue).unwrap();
        assert_eq!(m.var(z).t_zc(), INFINITY);
    }

    #[test]
    fn self_observing_zc_is_rejected() {
        let opts = Options::quiet();
        let mut m = Model::new(&opts);
        struct Never;
        impl Handler for Never {
            fn apply(&self, _: &mut Model, _: &mut EventQueue, _: Time, _: Crossing) {}
        }
        let z = m.add_zc(
            "z",
            1,
            1.0e-4,
            1.0e-6,
            Crossings::dn(),
            FunctionLti::new().constant(1.0).boxed(),
            Rc::new(Never),
        );
        // Forge a self-reference.
        m.var_mut(z).self_observer = true;
        let mut queue = EventQueue::new();
        let err = m.init(&mut queue).unwrap_err();
        assert!(format!("{}", err).contains("self-observer"));
    }
}
