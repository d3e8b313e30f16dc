//! Derivative and function abstraction.
//!
//! A QSS state variable reads its right-hand side through the
//! [`Derivative`] trait, which exposes the quantized, simultaneous and
//! continuous views of the expression plus the numeric-differenced
//! sequential entry points used by the higher-order methods. Zero-crossing
//! variables use the same trait for their scalar. Input variables use the
//! simpler [`InputFunction`] trait, which returns a [`SmoothToken`] (value,
//! derivatives, and the time of the next discontinuity).
//!
//! Functions read their operands out of the variable arena through
//! [`Refs`], so the variable ↔ function ↔ observee cycle is just index
//! lookups.
//!
//! [`Derivative`]: ./trait.Derivative.html
//! [`InputFunction`]: ./trait.InputFunction.html
//! [`SmoothToken`]: ./struct.SmoothToken.html
//! [`Refs`]: ./struct.Refs.html

use crate::events::EventQueue;
use crate::math::INFINITY;
use crate::model::Model;
use crate::time::{Time, Value};
use crate::variable::{Crossing, VarId, Variable};

/// Borrowed view of the variable arena used during function evaluation.
pub struct Refs<'a> {
    /// The variables.
    pub vars: &'a [Variable],
    /// The event queue (for the active superdense time that the LIQSS
    /// simultaneous view keys on).
    pub queue: &'a EventQueue,
}

impl<'a> Refs<'a> {
    /// Constructs a view.
    pub fn new(vars: &'a [Variable], queue: &'a EventQueue) -> Refs<'a> {
        Refs { vars, queue }
    }

    fn var(&self, v: VarId) -> &Variable {
        &self.vars[v.0]
    }
}

/// Derivative probes under the lower and upper quantized candidates, for
/// LIQSS1 self-observing advances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiqssSpecs {
    /// Derivative with the quantized value at center - qTol.
    pub l: Value,
    /// Derivative with the quantized value at center + qTol.
    pub u: Value,
    /// Quantized value at which the derivative vanishes.
    pub z: Value,
}

/// Second-order probes for LIQSS2 self-observing advances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiqssSpecs2 {
    /// First derivative with the quantized value at center - qTol.
    pub l1: Value,
    /// First derivative with the quantized value at center + qTol.
    pub u1: Value,
    /// First derivative at the flat-witness quantized value.
    pub z1: Value,
    /// Second derivative with the quantized value at center - qTol.
    pub l2: Value,
    /// Second derivative with the quantized value at center + qTol.
    pub u2: Value,
    /// Quantized value at which the second derivative vanishes.
    pub z2: Value,
}

/// The right-hand-side function bound to a QSS or zero-crossing variable.
///
/// The sequential entry points (`qs`, `qf1`, `qc1`, `qc2` and the
/// simultaneous analogues) default to the analytic derivatives; the
/// numeric-differentiation wrapper overrides them with finite differences.
/// Unsupported derivative orders return 0. The LIQSS probes are only
/// meaningful for functions that can be bound to a self-observing LIQSS
/// variable; the defaults panic, mirroring a missing override in the
/// method dispatch.
pub trait Derivative {
    /// The distinct variables this function reads, owner included if it
    /// reads itself.
    fn observees(&self) -> Vec<VarId>;

    /// Binds the function to its owning variable. Called once during
    /// wiring, before any evaluation.
    fn wire(&mut self, owner: VarId);

    /// Quantized value at time t.
    fn q(&self, r: &Refs, t: Time) -> Value;

    /// Quantized first derivative at time t.
    fn q1(&self, _r: &Refs, _t: Time) -> Value {
        0.0
    }

    /// Quantized second derivative at time t.
    fn q2(&self, _r: &Refs, _t: Time) -> Value {
        0.0
    }

    /// Continuous value at time t.
    fn x(&self, r: &Refs, t: Time) -> Value;

    /// Continuous first derivative at time t.
    fn x1(&self, _r: &Refs, _t: Time) -> Value {
        0.0
    }

    /// Continuous second derivative at time t.
    fn x2(&self, _r: &Refs, _t: Time) -> Value {
        0.0
    }

    /// Simultaneous value at time t.
    fn s(&self, r: &Refs, t: Time) -> Value;

    /// Simultaneous first derivative at time t.
    fn s1(&self, _r: &Refs, _t: Time) -> Value {
        0.0
    }

    /// Simultaneous second derivative at time t.
    fn s2(&self, _r: &Refs, _t: Time) -> Value {
        0.0
    }

    /// Simultaneous numeric differentiation value at time t.
    fn sn(&self, r: &Refs, t: Time) -> Value {
        self.s(r, t)
    }

    /// Quantized sequential value at time t.
    fn qs(&self, r: &Refs, t: Time) -> Value {
        self.q(r, t)
    }

    /// Quantized forward-difference sequential first derivative at time t.
    fn qf1(&self, r: &Refs, t: Time) -> Value {
        self.q1(r, t)
    }

    /// Quantized centered-difference sequential first derivative at time
    /// t.
    fn qc1(&self, r: &Refs, t: Time) -> Value {
        self.q1(r, t)
    }

    /// Quantized centered-difference sequential second derivative at time
    /// t.
    fn qc2(&self, r: &Refs, t: Time) -> Value {
        self.q2(r, t)
    }

    /// Simultaneous sequential value at time t.
    fn ss(&self, r: &Refs, t: Time) -> Value {
        self.s(r, t)
    }

    /// Simultaneous forward-difference sequential first derivative at
    /// time t.
    fn sf1(&self, r: &Refs, t: Time) -> Value {
        self.s1(r, t)
    }

    /// Simultaneous centered-difference sequential first derivative at
    /// time t.
    fn sc1(&self, r: &Refs, t: Time) -> Value {
        self.s1(r, t)
    }

    /// Simultaneous centered-difference sequential second derivative at
    /// time t.
    fn sc2(&self, r: &Refs, t: Time) -> Value {
        self.s2(r, t)
    }

    /// LIQSS1 probes through the continuous view.
    fn xlu1(&self, _r: &Refs, _t: Time, _qtol: Value) -> LiqssSpecs {
        unreachable!("derivative does not support LIQSS probes")
    }

    /// LIQSS1 probes through the quantized view.
    fn qlu1(&self, _r: &Refs, _t: Time, _qtol: Value) -> LiqssSpecs {
        unreachable!("derivative does not support LIQSS probes")
    }

    /// LIQSS1 probes through the simultaneous view.
    fn slu1(&self, _r: &Refs, _t: Time, _qtol: Value) -> LiqssSpecs {
        unreachable!("derivative does not support LIQSS probes")
    }

    /// LIQSS2 probes through the quantized view.
    fn qlu2(&self, _r: &Refs, _t: Time, _qtol: Value) -> LiqssSpecs2 {
        unreachable!("derivative does not support LIQSS2 probes")
    }

    /// LIQSS2 probes through the simultaneous view.
    fn slu2(&self, _r: &Refs, _t: Time, _qtol: Value) -> LiqssSpecs2 {
        unreachable!("derivative does not support LIQSS2 probes")
    }
}

/// Linear time-invariant function: `c0 + Σ cᵢ·vᵢ`.
///
/// The workhorse right-hand side: exact derivatives of every view and
/// exact LIQSS probe specs.
#[derive(Debug, Clone, Default)]
pub struct FunctionLti {
    c0: Value,
    terms: Vec<(Value, VarId)>,
    owner: Option<VarId>,
    self_coeff: Value,
}

impl FunctionLti {
    /// Constructs an empty (zero) function.
    pub fn new() -> FunctionLti {
        FunctionLti::default()
    }

    /// Adds a constant term.
    pub fn constant(mut self, c: Value) -> FunctionLti {
        self.c0 += c;
        self
    }

    /// Adds a term `c·v`.
    pub fn add(mut self, c: Value, v: VarId) -> FunctionLti {
        self.terms.push((c, v));
        self
    }

    /// Adds a term `v` with unit coefficient.
    pub fn add_var(mut self, v: VarId) -> FunctionLti {
        self.terms.push((1.0, v));
        self
    }

    /// Boxes the function for attachment to a variable.
    pub fn boxed(self) -> Box<dyn Derivative> {
        Box::new(self)
    }

    fn eval(&self, view: impl Fn(&Variable) -> Value, r: &Refs) -> Value {
        let mut acc = self.c0;
        for &(c, v) in &self.terms {
            acc += c * view(r.var(v));
        }
        acc
    }

    fn eval1(&self, view: impl Fn(&Variable) -> Value, r: &Refs) -> Value {
        let mut acc = 0.0;
        for &(c, v) in &self.terms {
            acc += c * view(r.var(v));
        }
        acc
    }

    // Value and first derivative of the non-self part.
    fn rest(
        &self,
        view: &impl Fn(&Variable) -> Value,
        view1: &impl Fn(&Variable) -> Value,
        r: &Refs,
    ) -> (Value, Value) {
        let owner = self.owner.expect("function not wired");
        let mut b = self.c0;
        let mut b1 = 0.0;
        for &(c, v) in &self.terms {
            if v != owner {
                b += c * view(r.var(v));
                b1 += c * view1(r.var(v));
            }
        }
        (b, b1)
    }

    fn lu1(
        &self,
        view: impl Fn(&Variable) -> Value,
        r: &Refs,
        _t: Time,
        qtol: Value,
    ) -> LiqssSpecs {
        let owner = self.owner.expect("function not wired");
        let (b, _) = self.rest(&view, &|_: &Variable| 0.0, r);
        let cs = self.self_coeff;
        let center = view(r.var(owner));
        if cs == 0.0 {
            return LiqssSpecs {
                l: b,
                u: b,
                z: center,
            };
        }
        LiqssSpecs {
            l: b + cs * (center - qtol),
            u: b + cs * (center + qtol),
            z: -(b / cs),
        }
    }

    fn lu2(
        &self,
        view: impl Fn(&Variable) -> Value,
        view1: impl Fn(&Variable) -> Value,
        r: &Refs,
        _t: Time,
        qtol: Value,
    ) -> LiqssSpecs2 {
        let owner = self.owner.expect("function not wired");
        let (b, b1) = self.rest(&view, &view1, r);
        let cs = self.self_coeff;
        let center = view(r.var(owner));
        if cs == 0.0 {
            return LiqssSpecs2 {
                l1: b,
                u1: b,
                z1: b,
                l2: b1,
                u2: b1,
                z2: center,
            };
        }
        let l1 = b + cs * (center - qtol);
        let u1 = b + cs * (center + qtol);
        // Quantized value zeroing the second derivative, and the slope
        // there.
        let z2 = -(b1 + cs * b) / (cs * cs);
        let z1 = -(b1 / cs);
        LiqssSpecs2 {
            l1,
            u1,
            z1,
            l2: b1 + cs * l1,
            u2: b1 + cs * u1,
            z2,
        }
    }
}

impl Derivative for FunctionLti {
    fn observees(&self) -> Vec<VarId> {
        let mut seen = vec![];
        for &(_, v) in &self.terms {
            if !seen.contains(&v) {
                seen.push(v);
            }
        }
        seen
    }

    fn wire(&mut self, owner: VarId) {
        self.owner = Some(owner);
        self.self_coeff = self
            .terms
            .iter()
            .filter(|&&(_, v)| v == owner)
            .map(|&(c, _)| c)
            .sum();
    }

    fn q(&self, r: &Refs, t: Time) -> Value {
        self.eval(|v| v.q(t), r)
    }

    fn q1(&self, r: &Refs, t: Time) -> Value {
        self.eval1(|v| v.q1(t), r)
    }

    fn q2(&self, r: &Refs, t: Time) -> Value {
        self.eval1(|v| v.q2(t), r)
    }

    fn x(&self, r: &Refs, t: Time) -> Value {
        self.eval(|v| v.x(t), r)
    }

    fn x1(&self, r: &Refs, t: Time) -> Value {
        self.eval1(|v| v.x1(t), r)
    }

    fn x2(&self, r: &Refs, t: Time) -> Value {
        self.eval1(|v| v.x2(t), r)
    }

    fn s(&self, r: &Refs, t: Time) -> Value {
        let active = r.queue.active_superdense_time();
        self.eval(|v| v.s(active, t), r)
    }

    fn s1(&self, r: &Refs, t: Time) -> Value {
        let active = r.queue.active_superdense_time();
        self.eval1(|v| v.s1(active, t), r)
    }

    fn s2(&self, r: &Refs, t: Time) -> Value {
        let active = r.queue.active_superdense_time();
        self.eval1(|v| v.s2(active, t), r)
    }

    fn sn(&self, r: &Refs, t: Time) -> Value {
        let active = r.queue.active_superdense_time();
        self.eval(|v| v.sn(active, t), r)
    }

    fn xlu1(&self, r: &Refs, t: Time, qtol: Value) -> LiqssSpecs {
        self.lu1(|v| v.x(t), r, t, qtol)
    }

    fn qlu1(&self, r: &Refs, t: Time, qtol: Value) -> LiqssSpecs {
        self.lu1(|v| v.q(t), r, t, qtol)
    }

    fn slu1(&self, r: &Refs, t: Time, qtol: Value) -> LiqssSpecs {
        let active = r.queue.active_superdense_time();
        self.lu1(|v| v.s(active, t), r, t, qtol)
    }

    fn qlu2(&self, r: &Refs, t: Time, qtol: Value) -> LiqssSpecs2 {
        self.lu2(|v| v.q(t), |v| v.q1(t), r, t, qtol)
    }

    fn slu2(&self, r: &Refs, t: Time, qtol: Value) -> LiqssSpecs2 {
        let active = r.queue.active_superdense_time();
        self.lu2(|v| v.s(active, t), |v| v.s1(active, t), r, t, qtol)
    }
}

/// Numeric-differentiation wrapper: overrides the sequential
/// forward/centered derivative entry points of an inner derivative with
/// finite differences of its value views, using probe offset `dtn`.
pub struct NumDiff {
    inner: Box<dyn Derivative>,
    dtn: Time,
}

impl NumDiff {
    /// Wraps a derivative with numeric differencing at probe offset
    /// `dtn` (`dtNum`).
    pub fn new(inner: Box<dyn Derivative>, dtn: Time) -> NumDiff {
        debug_assert!(dtn > 0.0);
        NumDiff { inner, dtn }
    }

    /// Boxes the wrapper for attachment to a variable.
    pub fn boxed(inner: Box<dyn Derivative>, dtn: Time) -> Box<dyn Derivative> {
        Box::new(NumDiff::new(inner, dtn))
    }
}

impl Derivative for NumDiff {
    fn observees(&self) -> Vec<VarId> {
        self.inner.observees()
    }

    fn wire(&mut self, owner: VarId) {
        self.inner.wire(owner);
    }

    fn q(&self, r: &Refs, t: Time) -> Value {
        self.inner.q(r, t)
    }

    fn q1(&self, r: &Refs, t: Time) -> Value {
        self.inner.q1(r, t)
    }

    fn q2(&self, r: &Refs, t: Time) -> Value {
        self.inner.q2(r, t)
    }

    fn x(&self, r: &Refs, t: Time) -> Value {
        self.inner.x(r, t)
    }

    fn x1(&self, r: &Refs, t: Time) -> Value {
        self.inner.x1(r, t)
    }

    fn x2(&self, r: &Refs, t: Time) -> Value {
        self.inner.x2(r, t)
    }

    fn s(&self, r: &Refs, t: Time) -> Value {
        self.inner.s(r, t)
    }

    fn s1(&self, r: &Refs, t: Time) -> Value {
        self.inner.s1(r, t)
    }

    fn s2(&self, r: &Refs, t: Time) -> Value {
        self.inner.s2(r, t)
    }

    fn qf1(&self, r: &Refs, t: Time) -> Value {
        (self.inner.q(r, t + self.dtn) - self.inner.q(r, t)) / self.dtn
    }

    fn qc1(&self, r: &Refs, t: Time) -> Value {
        (self.inner.q(r, t + self.dtn) - self.inner.q(r, t - self.dtn)) / (2.0 * self.dtn)
    }

    fn qc2(&self, r: &Refs, t: Time) -> Value {
        (self.inner.q(r, t + self.dtn) - (2.0 * self.inner.q(r, t))
            + self.inner.q(r, t - self.dtn))
            / (self.dtn * self.dtn)
    }

    fn sf1(&self, r: &Refs, t: Time) -> Value {
        (self.inner.sn(r, t + self.dtn) - self.inner.sn(r, t)) / self.dtn
    }

    fn sc1(&self, r: &Refs, t: Time) -> Value {
        (self.inner.sn(r, t + self.dtn) - self.inner.sn(r, t - self.dtn)) / (2.0 * self.dtn)
    }

    fn sc2(&self, r: &Refs, t: Time) -> Value {
        (self.inner.sn(r, t + self.dtn) - (2.0 * self.inner.sn(r, t))
            + self.inner.sn(r, t - self.dtn))
            / (self.dtn * self.dtn)
    }

    fn xlu1(&self, r: &Refs, t: Time, qtol: Value) -> LiqssSpecs {
        self.inner.xlu1(r, t, qtol)
    }

    fn qlu1(&self, r: &Refs, t: Time, qtol: Value) -> LiqssSpecs {
        self.inner.qlu1(r, t, qtol)
    }

    fn slu1(&self, r: &Refs, t: Time, qtol: Value) -> LiqssSpecs {
        self.inner.slu1(r, t, qtol)
    }

    fn qlu2(&self, r: &Refs, t: Time, qtol: Value) -> LiqssSpecs2 {
        self.inner.qlu2(r, t, qtol)
    }

    fn slu2(&self, r: &Refs, t: Time, qtol: Value) -> LiqssSpecs2 {
        self.inner.slu2(r, t, qtol)
    }
}

/// Value, derivatives, and next discrete event time of an input signal at
/// some instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothToken {
    /// Value.
    pub x0: Value,
    /// First derivative.
    pub x1: Value,
    /// Second derivative.
    pub x2: Value,
    /// Third derivative.
    pub x3: Value,
    /// Next discrete event time; infinity when the signal is smooth.
    pub t_d: Time,
}

impl SmoothToken {
    /// A token with the given value and derivatives and no discrete
    /// event.
    pub fn smooth(x0: Value, x1: Value, x2: Value, x3: Value) -> SmoothToken {
        SmoothToken {
            x0,
            x1,
            x2,
            x3,
            t_d: INFINITY,
        }
    }

    /// Whether a discrete event is pending.
    pub fn has_discrete(&self) -> bool {
        self.t_d < INFINITY
    }
}

/// A prescribed function of time driving an input variable.
pub trait InputFunction {
    /// Value, derivatives and next discrete event time at time t.
    fn eval(&self, t: Time) -> SmoothToken;
}

/// Constant input.
#[derive(Debug, Clone, Copy)]
pub struct InputConstant {
    /// The value.
    pub c: Value,
}

impl InputFunction for InputConstant {
    fn eval(&self, _t: Time) -> SmoothToken {
        SmoothToken::smooth(self.c, 0.0, 0.0, 0.0)
    }
}

/// Sinusoid input `c·sin(s·t)` with analytic derivatives.
#[derive(Debug, Clone, Copy)]
pub struct InputSin {
    /// Amplitude.
    pub c: Value,
    /// Angular frequency scaling.
    pub s: Value,
}

impl InputFunction for InputSin {
    fn eval(&self, t: Time) -> SmoothToken {
        let (sin, cos) = (self.s * t).sin_cos();
        SmoothToken::smooth(
            self.c * sin,
            self.c * self.s * cos,
            -self.c * self.s * self.s * sin,
            -self.c * self.s * self.s * self.s * cos,
        )
    }
}

/// Sinusoid input with numeric-differenced derivatives.
#[derive(Debug, Clone, Copy)]
pub struct InputSinNd {
    /// Amplitude.
    pub c: Value,
    /// Angular frequency scaling.
    pub s: Value,
    /// Numeric differentiation probe offset.
    pub dtn: Time,
}

impl InputSinNd {
    fn v(&self, t: Time) -> Value {
        self.c * (self.s * t).sin()
    }
}

impl InputFunction for InputSinNd {
    fn eval(&self, t: Time) -> SmoothToken {
        let h = self.dtn;
        let (vm2, vm, v0, vp, vp2) = (
            self.v(t - 2.0 * h),
            self.v(t - h),
            self.v(t),
            self.v(t + h),
            self.v(t + 2.0 * h),
        );
        SmoothToken::smooth(
            v0,
            (vp - vm) / (2.0 * h),
            (vp - 2.0 * v0 + vm) / (h * h),
            (vp2 - (2.0 * vp) + (2.0 * vm) - vm2) / (2.0 * h * h * h),
        )
    }
}

/// Staircase input: starts at `h0` and steps by `dh` every `dt`.
#[derive(Debug, Clone, Copy)]
pub struct InputStep {
    /// Initial value.
    pub h0: Value,
    /// Step height.
    pub dh: Value,
    /// Step interval.
    pub dt: Time,
}

impl InputFunction for InputStep {
    fn eval(&self, t: Time) -> SmoothToken {
        debug_assert!(self.dt > 0.0);
        let mut k = (t / self.dt).floor();
        // Roundoff in t/dt right at a step boundary must not produce a
        // discrete event in the past.
        if (k + 1.0) * self.dt <= t {
            k += 1.0;
        }
        SmoothToken {
            x0: self.h0 + (self.dh * k),
            x1: 0.0,
            x2: 0.0,
            x3: 0.0,
            t_d: (k + 1.0) * self.dt,
        }
    }
}

/// A zero-crossing handler: applied when a subscribed crossing fires.
///
/// Handlers mutate target variables through
/// [`Model::advance_handler`] or defer by scheduling handler events with
/// value payloads through [`Model::request_handler`].
///
/// [`Model::advance_handler`]: ../model/struct.Model.html#method.advance_handler
/// [`Model::request_handler`]: ../model/struct.Model.html#method.request_handler
pub trait Handler {
    /// Applies the handler at crossing time `t`.
    fn apply(&self, m: &mut Model, queue: &mut EventQueue, t: Time, crossing: Crossing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::INFINITY as INF;
    use crate::variable::{FnId, VarKind};

    fn arena() -> (Vec<Variable>, EventQueue) {
        let mut x = Variable::new(
            "x",
            2,
            1.0e-4,
            1.0e-6,
            1.0,
            0.0,
            INF,
            INF,
            VarKind::Qss { f: FnId(0) },
        );
        x.x = [1.0, -1.0, 0.25, 0.0];
        x.q = [1.0, -1.0, 0.0];
        let mut y = Variable::new(
            "y",
            2,
            1.0e-4,
            1.0e-6,
            2.0,
            0.0,
            INF,
            INF,
            VarKind::Qss { f: FnId(1) },
        );
        y.x = [2.0, 0.5, 0.0, 0.0];
        y.q = [2.0, 0.5, 0.0];
        (vec![x, y], EventQueue::new())
    }

    #[test]
    fn lti_views() {
        let (vars, queue) = arena();
        let mut f = FunctionLti::new().add(-0.5, VarId(0)).add(1.5, VarId(1));
        f.wire(VarId(0));
        let r = Refs::new(&vars, &queue);
        // q view at t = 0: -0.5*1 + 1.5*2 = 2.5
        assert!((f.q(&r, 0.0) - 2.5).abs() < 1e-15);
        // q1: -0.5*(-1) + 1.5*0.5 = 1.25
        assert!((f.q1(&r, 0.0) - 1.25).abs() < 1e-15);
        // x view sees the continuous polynomials
        assert!((f.x(&r, 0.0) - 2.5).abs() < 1e-15);
        assert!((f.x1(&r, 0.0) - 1.25).abs() < 1e-15);
        // Sequential aliases equal the analytic derivatives
        assert_eq!(f.qs(&r, 0.0), f.q(&r, 0.0));
        assert_eq!(f.qf1(&r, 0.0), f.q1(&r, 0.0));
        assert_eq!(f.sc2(&r, 0.0), f.s2(&r, 0.0));
    }

    #[test]
    fn lti_constant_term() {
        let (vars, queue) = arena();
        let mut f = FunctionLti::new().constant(-9.81);
        f.wire(VarId(1));
        let r = Refs::new(&vars, &queue);
        assert_eq!(f.q(&r, 0.0), -9.81);
        assert_eq!(f.q1(&r, 0.0), 0.0);
        assert_eq!(f.observees(), vec![]);
    }

    #[test]
    fn lti_liqss_probes() {
        // Pure decay y' = -y: lower candidate gives the upper derivative.
        let (vars, queue) = arena();
        let mut f = FunctionLti::new().add(-1.0, VarId(1));
        f.wire(VarId(1));
        let r = Refs::new(&vars, &queue);
        let qtol = 0.1;
        let specs = f.qlu1(&r, 0.0, qtol);
        // center = q_y(0) = 2
        assert!((specs.l - -(2.0 - 0.1)).abs() < 1e-15);
        assert!((specs.u - -(2.0 + 0.1)).abs() < 1e-15);
        assert!((specs.z - 0.0).abs() < 1e-15);
        let specs2 = f.qlu2(&r, 0.0, qtol);
        // b = 0, b1 = 0: l2 = -l1
        assert!((specs2.l2 + specs2.l1).abs() < 1e-15);
        assert!((specs2.u2 + specs2.u1).abs() < 1e-15);
        assert_eq!(specs2.z2, 0.0);
    }

    #[test]
    fn numeric_differencing() {
        let (vars, queue) = arena();
        let mut f = FunctionLti::new().add(-0.5, VarId(0)).add(1.5, VarId(1));
        f.wire(VarId(0));
        let nd = NumDiff::new(Box::new(f.clone()), 1.0e-6);
        let r = Refs::new(&vars, &queue);
        // The quantized views are linear, so the finite differences are
        // exact up to roundoff.
        assert!((nd.qf1(&r, 0.5) - f.q1(&r, 0.5)).abs() < 1e-8);
        assert!((nd.qc1(&r, 0.5) - f.q1(&r, 0.5)).abs() < 1e-8);
        // Second difference of a linear view: zero up to cancellation
        // noise at the 1e-12 denominator scale.
        assert!(nd.qc2(&r, 0.5).abs() < 5e-2);
        assert_eq!(nd.observees(), f.observees());
    }

    #[test]
    fn sin_tokens() {
        let f = InputSin { c: 0.05, s: 0.5 };
        let tok = f.eval(0.0);
        assert_eq!(tok.x0, 0.0);
        assert!((tok.x1 - 0.025).abs() < 1e-15);
        assert_eq!(tok.x2, 0.0);
        assert!((tok.x3 - -0.00625).abs() < 1e-15);
        assert!(!tok.has_discrete());

        let nd = InputSinNd {
            c: 0.05,
            s: 0.5,
            dtn: 1.0e-4,
        };
        let tok_nd = nd.eval(0.0);
        assert!((tok_nd.x1 - 0.025).abs() < 1e-9);
        assert!(tok_nd.x2.abs() < 1e-9);
        assert!((tok_nd.x3 - -0.00625).abs() < 1e-4);
    }

    #[test]
    fn step_tokens() {
        let f = InputStep {
            h0: 1.0,
            dh: 0.5,
            dt: 2.0,
        };
        let tok = f.eval(0.0);
        assert_eq!(tok.x0, 1.0);
        assert_eq!(tok.t_d, 2.0);
        let tok = f.eval(2.0);
        assert_eq!(tok.x0, 1.5);
        assert_eq!(tok.t_d, 4.0);
        let tok = f.eval(5.0);
        assert_eq!(tok.x0, 2.0);
        assert_eq!(tok.t_d, 6.0);
    }
}
