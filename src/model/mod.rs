//! The model arena.
//!
//! Variables, their derivative/input functions and zero-crossing handlers
//! live in one arena and refer to each other through stable indices, so
//! the variable ↔ function ↔ observee cycle of the dependency graph is a
//! plain directed graph over `VarId`s.
//!
//! The advance protocols are implemented on [`Model`] and grouped by
//! variable family:
//!
//! - [`qss`]: explicit QSS1/2/3 requantization, staging and observer
//!   advance,
//! - [`liqss`]: the hysteretic LIQSS1/2 variants,
//! - [`inp`]: input variables and their discrete events,
//! - [`zc`]: zero-crossing detection, root refinement and firing,
//! - [`handler`]: handler advances for state and discrete variables.
//!
//! [`Model`]: ./struct.Model.html

mod handler;
mod inp;
mod liqss;
mod qss;
mod zc;

use crate::error::Result;
use crate::events::EventQueue;
use crate::function::{Derivative, Handler, InputFunction, Refs};
use crate::math::{clamp_dt, signum, INFINITY};
use crate::options::{Method, Options};
use crate::time::{Time, Value};
use crate::variable::{
    Crossing, Crossings, DiscreteKind, FnId, HandlerId, InpId, VarId, VarKind, Variable, ZcData,
};
use std::rc::Rc;

/// Model-level configuration distilled from [`Options`]: the per-variable
/// defaults and the advance-protocol switches.
///
/// [`Options`]: ../options/struct.Options.html
#[derive(Debug, Clone)]
pub struct ModelCfg {
    /// Default minimum time step.
    pub dt_min: Time,
    /// Default maximum time step.
    pub dt_max: Time,
    /// Default deactivation time step.
    pub dt_inf: Time,
    /// Numeric differentiation probe offset.
    pub dt_num: Time,
    /// Inflection-point requantization clamping.
    pub inflection: bool,
    /// Per-event diagnostic trace lines.
    pub diagnostics: bool,
}

impl ModelCfg {
    fn from_options(opts: &Options) -> ModelCfg {
        ModelCfg {
            dt_min: opts.dt_min,
            dt_max: opts.dt_max,
            dt_inf: opts.dt_inf,
            dt_num: opts.dt_num,
            inflection: opts.inflection,
            diagnostics: opts.output.d,
        }
    }
}

pub(crate) enum Dispatch {
    Qss(FnId),
    Liqss(FnId),
    Inp(InpId),
    Discrete,
    Zc(FnId),
}

/// The arena of variables and their functions.
pub struct Model {
    pub(crate) vars: Vec<Variable>,
    pub(crate) derivs: Vec<Box<dyn Derivative>>,
    pub(crate) inputs: Vec<Box<dyn InputFunction>>,
    pub(crate) handlers: Vec<Rc<dyn Handler>>,
    pub(crate) cfg: ModelCfg,
}

impl Model {
    /// Constructs an empty model with per-variable defaults taken from
    /// the options.
    pub fn new(opts: &Options) -> Model {
        Model {
            vars: vec![],
            derivs: vec![],
            inputs: vec![],
            handlers: vec![],
            cfg: ModelCfg::from_options(opts),
        }
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the model has no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// All variable ids, in creation order.
    pub fn ids(&self) -> impl Iterator<Item = VarId> {
        (0..self.vars.len()).map(VarId)
    }

    /// A variable by id.
    pub fn var(&self, v: VarId) -> &Variable {
        &self.vars[v.0]
    }

    /// A variable by id, mutably.
    pub fn var_mut(&mut self, v: VarId) -> &mut Variable {
        &mut self.vars[v.0]
    }

    fn push(&mut self, var: Variable) -> VarId {
        self.vars.push(var);
        VarId(self.vars.len() - 1)
    }

    /// Adds an explicit QSS state variable of the given order; the
    /// derivative is attached separately with [`set_derivative`].
    ///
    /// [`set_derivative`]: #method.set_derivative
    pub fn add_qss(
        &mut self,
        name: impl Into<String>,
        order: i32,
        rtol: Value,
        atol: Value,
        x_ini: Value,
    ) -> VarId {
        debug_assert!((1..=3).contains(&order));
        let kind = VarKind::Qss {
            f: FnId(usize::max_value()),
        };
        let var = self.state_var(name, order, rtol, atol, x_ini, kind);
        self.push(var)
    }

    /// Adds a linearly-implicit QSS state variable of the given order.
    pub fn add_liqss(
        &mut self,
        name: impl Into<String>,
        order: i32,
        rtol: Value,
        atol: Value,
        x_ini: Value,
    ) -> VarId {
        debug_assert!((1..=2).contains(&order));
        let kind = VarKind::Liqss {
            f: FnId(usize::max_value()),
        };
        let var = self.state_var(name, order, rtol, atol, x_ini, kind);
        self.push(var)
    }

    /// Adds a state variable using the method selected in the options
    /// (LIQSS methods fall back to their order for state selection).
    pub fn add_state(
        &mut self,
        name: impl Into<String>,
        method: Method,
        rtol: Value,
        atol: Value,
        x_ini: Value,
    ) -> VarId {
        if method.is_liqss() {
            self.add_liqss(name, method.order(), rtol, atol, x_ini)
        } else {
            self.add_qss(name, method.order(), rtol, atol, x_ini)
        }
    }

    /// Adds an input variable of the given order driven by the given
    /// input function.
    pub fn add_input(
        &mut self,
        name: impl Into<String>,
        order: i32,
        rtol: Value,
        atol: Value,
        f: Box<dyn InputFunction>,
    ) -> VarId {
        debug_assert!((1..=3).contains(&order));
        let x_ini = f.eval(0.0).x0;
        self.inputs.push(f);
        let kind = VarKind::Inp {
            f: InpId(self.inputs.len() - 1),
        };
        let var = self.state_var(name, order, rtol, atol, x_ini, kind);
        self.push(var)
    }

    /// Adds a discrete (handler-updated) variable.
    pub fn add_discrete(
        &mut self,
        name: impl Into<String>,
        kind: DiscreteKind,
        x_ini: Value,
    ) -> VarId {
        let var = self.state_var(
            name,
            0,
            1.0e-4,
            1.0e-6,
            x_ini,
            VarKind::Discrete { kind },
        );
        self.push(var)
    }

    /// Adds a zero-crossing variable of the given order watching the sign
    /// of `f`, firing `h` at crossings of the subscribed types.
    pub fn add_zc(
        &mut self,
        name: impl Into<String>,
        order: i32,
        rtol: Value,
        atol: Value,
        crossings: Crossings,
        f: Box<dyn Derivative>,
        h: Rc<dyn Handler>,
    ) -> VarId {
        debug_assert!((1..=2).contains(&order));
        self.handlers.push(h);
        let h = HandlerId(self.handlers.len() - 1);
        let kind = VarKind::Zc(ZcData {
            f: FnId(usize::max_value()),
            h,
            crossings,
            crossing: Crossing::Flat,
            t_z: INFINITY,
            t_z_prev: INFINITY,
        });
        let var = self.state_var(name, order, rtol, atol, 0.0, kind);
        let v = self.push(var);
        self.attach(v, f);
        v
    }

    fn state_var(
        &self,
        name: impl Into<String>,
        order: i32,
        rtol: Value,
        atol: Value,
        x_ini: Value,
        kind: VarKind,
    ) -> Variable {
        Variable::new(
            name,
            order,
            rtol,
            atol,
            x_ini,
            self.cfg.dt_min,
            self.cfg.dt_max,
            self.cfg.dt_inf,
            kind,
        )
    }

    /// Attaches the derivative function of a QSS/LIQSS state variable and
    /// wires the dependency graph: the owner becomes an observer of every
    /// distinct variable the function reads, and reading itself marks it
    /// a self-observer.
    pub fn set_derivative(&mut self, v: VarId, f: Box<dyn Derivative>) {
        debug_assert!(self.vars[v.0].is_qss());
        self.attach(v, f);
    }

    /// Attaches a derivative wrapped in numeric differencing at the
    /// configured probe offset (`dtNum`).
    pub fn set_derivative_nd(&mut self, v: VarId, f: Box<dyn Derivative>) {
        let f = crate::function::NumDiff::boxed(f, self.cfg.dt_num);
        self.set_derivative(v, f);
    }

    fn attach(&mut self, v: VarId, mut f: Box<dyn Derivative>) {
        f.wire(v);
        let observees = f.observees();
        self.derivs.push(f);
        let fid = FnId(self.derivs.len() - 1);
        match &mut self.vars[v.0].kind {
            VarKind::Qss { f } | VarKind::Liqss { f } => *f = fid,
            VarKind::Zc(zc) => zc.f = fid,
            _ => unreachable!("variable kind takes no derivative"),
        }
        for o in observees {
            if o == v {
                self.vars[v.0].self_observer = true;
            } else {
                self.vars[v.0].observees.push(o);
                self.vars[o.0].observers.push(v);
            }
        }
    }

    /// Builds the sorted-observer caches: observers ascending by order,
    /// the index of the first order-2+ observer, and the max observer
    /// order.
    pub(crate) fn init_observers(&mut self) {
        for i in 0..self.vars.len() {
            let mut observers = std::mem::replace(&mut self.vars[i].observers, vec![]);
            observers.sort_by_key(|&w| (self.vars[w.0].order, w.0));
            let i_beg_2 = observers
                .iter()
                .position(|&w| self.vars[w.0].order >= 2)
                .unwrap_or_else(|| observers.len());
            let max_order = observers
                .last()
                .map(|&w| self.vars[w.0].order)
                .unwrap_or(0);
            let var = &mut self.vars[i];
            var.observers = observers;
            var.i_beg_observers_2 = i_beg_2;
            var.observers_max_order = max_order;
        }
    }

    /// Max method order among non-ZC variables, gating the init stages.
    pub fn max_order_non_zc(&self) -> i32 {
        self.vars
            .iter()
            .filter(|v| !v.is_zc())
            .map(|v| v.order)
            .max()
            .unwrap_or(0)
    }

    /// Initializes all variables stage-wise and inserts their events:
    /// non-ZC variables first (init_0, init_1, then the higher stages the
    /// max order requires), then ZC variables, which need the final
    /// post-init quantized representations of their observees.
    pub fn init(&mut self, queue: &mut EventQueue) -> Result<()> {
        self.init_observers();
        let non_zc: Vec<VarId> = self.ids().filter(|&v| !self.vars[v.0].is_zc()).collect();
        let zc: Vec<VarId> = self.ids().filter(|&v| self.vars[v.0].is_zc()).collect();
        let max_order = self.max_order_non_zc();
        for &v in &non_zc {
            self.init_0(queue, v);
        }
        for &v in &non_zc {
            self.init_1(queue, v);
        }
        if max_order >= 2 {
            for &v in &non_zc {
                self.init_2(queue, v);
            }
            if max_order >= 3 {
                for &v in &non_zc {
                    self.init_3(queue, v);
                }
            }
        }
        for &v in &zc {
            self.init_zc(queue, v)?;
        }
        Ok(())
    }

    pub(crate) fn dispatch(&self, v: VarId) -> Dispatch {
        match &self.vars[v.0].kind {
            VarKind::Qss { f } => Dispatch::Qss(*f),
            VarKind::Liqss { f } => Dispatch::Liqss(*f),
            VarKind::Inp { f } => Dispatch::Inp(*f),
            VarKind::Discrete { .. } => Dispatch::Discrete,
            VarKind::Zc(zc) => Dispatch::Zc(zc.f),
        }
    }

    /// Initialization: stage 0.
    pub(crate) fn init_0(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Qss(_) | Dispatch::Liqss(_) => {
                let var = &mut self.vars[v.0];
                var.x[0] = var.x_ini;
                var.q[0] = var.x_ini;
                var.q_c = var.x_ini;
                var.set_qtol();
            }
            Dispatch::Inp(f) => self.inp_init_0(v, f),
            Dispatch::Discrete => {
                let var = &mut self.vars[v.0];
                var.x[0] = match var.kind {
                    VarKind::Discrete {
                        kind: DiscreteKind::Integer,
                    } => var.x_ini.round(),
                    VarKind::Discrete {
                        kind: DiscreteKind::Boolean,
                    } => {
                        if var.x_ini != 0.0 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    _ => var.x_ini,
                };
                var.q[0] = var.x[0];
                queue.add_handler(v);
                self.diag(v, '!', 0.0);
            }
            Dispatch::Zc(_) => unreachable!("ZC variables initialize after non-ZC"),
        }
    }

    /// Initialization: stage 1.
    pub(crate) fn init_1(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Qss(f) => self.qss_init_1(queue, v, f),
            Dispatch::Liqss(f) => self.liqss_init_1(queue, v, f),
            Dispatch::Inp(f) => self.inp_init_1(queue, v, f),
            Dispatch::Discrete => {}
            Dispatch::Zc(_) => unreachable!("ZC variables initialize after non-ZC"),
        }
    }

    /// Initialization: stage 2.
    pub(crate) fn init_2(&mut self, queue: &mut EventQueue, v: VarId) {
        if self.vars[v.0].order < 2 {
            return;
        }
        match self.dispatch(v) {
            Dispatch::Qss(f) => self.qss_init_2(queue, v, f),
            Dispatch::Liqss(f) => self.liqss_init_2(queue, v, f),
            Dispatch::Inp(f) => self.inp_init_2(queue, v, f),
            Dispatch::Discrete => {}
            Dispatch::Zc(_) => unreachable!("ZC variables initialize after non-ZC"),
        }
    }

    /// Initialization: stage 3.
    pub(crate) fn init_3(&mut self, queue: &mut EventQueue, v: VarId) {
        if self.vars[v.0].order < 3 {
            return;
        }
        match self.dispatch(v) {
            Dispatch::Qss(f) => self.qss_init_3(queue, v, f),
            Dispatch::Inp(f) => self.inp_init_3(queue, v, f),
            _ => {}
        }
    }

    /// QSS requantization advance (single trigger).
    pub(crate) fn advance_qss(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Qss(f) => self.qss_advance(queue, v, f),
            Dispatch::Liqss(f) => self.liqss_advance(queue, v, f),
            Dispatch::Inp(f) => self.inp_advance_qss(queue, v, f),
            Dispatch::Zc(f) => self.zc_advance_requant(queue, v, f, '!'),
            Dispatch::Discrete => unreachable!("discrete variables have no QSS events"),
        }
    }

    /// QSS requantization advance: stage 0 (simultaneous).
    pub(crate) fn advance_qss_0(&mut self, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Qss(_) | Dispatch::Liqss(_) => self.qss_advance_0(v),
            Dispatch::Inp(f) => self.inp_advance_qss_0(v, f),
            _ => unreachable!("variable kind has no staged QSS advance"),
        }
    }

    /// QSS requantization advance: stage 1 (simultaneous).
    pub(crate) fn advance_qss_1(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Qss(f) => self.qss_advance_1(queue, v, f),
            Dispatch::Liqss(f) => self.liqss_advance_1(queue, v, f),
            Dispatch::Inp(f) => self.inp_advance_qss_1(queue, v, f),
            _ => unreachable!("variable kind has no staged QSS advance"),
        }
    }

    /// QSS requantization advance: stage 2 (simultaneous).
    pub(crate) fn advance_qss_2(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Qss(f) => self.qss_advance_2(queue, v, f),
            Dispatch::Liqss(f) => self.liqss_advance_2(queue, v, f),
            Dispatch::Inp(f) => self.inp_advance_qss_2(queue, v, f),
            _ => unreachable!("variable kind has no staged QSS advance"),
        }
    }

    /// QSS requantization advance: stage 3 (simultaneous).
    pub(crate) fn advance_qss_3(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Qss(f) => self.qss_advance_3(queue, v, f),
            Dispatch::Inp(f) => self.inp_advance_qss_3(queue, v, f),
            _ => unreachable!("variable kind has no staged QSS advance"),
        }
    }

    /// QSS advance of a ZC variable inside a simultaneous trigger set.
    pub(crate) fn advance_qss_simultaneous(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Zc(f) => self.zc_advance_requant(queue, v, f, '='),
            _ => unreachable!("only ZC variables take the simultaneous QSS advance"),
        }
    }

    /// Observer advance: roll the continuous representation of `w`
    /// forward to the trigger time `t` and reschedule.
    pub(crate) fn advance_observer(&mut self, queue: &mut EventQueue, w: VarId, t: Time) {
        match self.dispatch(w) {
            Dispatch::Qss(f) => self.qss_advance_observer(queue, w, f, t),
            Dispatch::Liqss(f) => self.liqss_advance_observer(queue, w, f, t),
            Dispatch::Zc(f) => self.zc_advance_observer(queue, w, f, t),
            _ => unreachable!("variable kind cannot observe"),
        }
    }

    /// Invokes `advance_observer` on every observer of `v`.
    pub(crate) fn advance_observers(&mut self, queue: &mut EventQueue, v: VarId, t: Time) {
        let observers = self.vars[v.0].observers.clone();
        for w in observers {
            self.advance_observer(queue, w, t);
        }
    }

    /// Discrete advance (single trigger).
    pub(crate) fn advance_discrete(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Inp(f) => self.inp_advance_discrete(queue, v, f),
            _ => unreachable!("variable kind has no discrete events"),
        }
    }

    /// Discrete advance: stages 0 and 1 (simultaneous).
    pub(crate) fn advance_discrete_0_1(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Inp(f) => self.inp_advance_discrete_0_1(queue, v, f),
            _ => unreachable!("variable kind has no discrete events"),
        }
    }

    /// Discrete advance: stage 2 (simultaneous).
    pub(crate) fn advance_discrete_2(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Inp(f) => self.inp_advance_discrete_2(queue, v, f),
            _ => unreachable!("variable kind has no discrete events"),
        }
    }

    /// Discrete advance: stage 3 (simultaneous).
    pub(crate) fn advance_discrete_3(&mut self, queue: &mut EventQueue, v: VarId) {
        match self.dispatch(v) {
            Dispatch::Inp(f) => self.inp_advance_discrete_3(queue, v, f),
            _ => unreachable!("variable kind has no discrete events"),
        }
    }

    /// Evaluation plumbing: the arena view handed to functions.
    pub(crate) fn refs<'a>(&'a self, queue: &'a EventQueue) -> Refs<'a> {
        Refs::new(&self.vars, queue)
    }

    pub(crate) fn deriv(&self, f: FnId) -> &dyn Derivative {
        &*self.derivs[f.0]
    }

    /// Sets the aligned requantization time: `tQ == tX` after a
    /// requantization, handler, or discrete advance.
    pub(crate) fn set_te_aligned(&mut self, v: VarId) {
        let inflection = self.cfg.inflection;
        let var = &mut self.vars[v.0];
        debug_assert!(var.t_x <= var.t_q);
        debug_assert!(var.dt_min <= var.dt_max);
        let dt = match var.order {
            1 => {
                if var.x[1] != 0.0 {
                    var.qtol / var.x[1].abs()
                } else {
                    INFINITY
                }
            }
            2 => {
                if var.x[2] != 0.0 {
                    (var.qtol / var.x[2].abs()).sqrt()
                } else {
                    INFINITY
                }
            }
            _ => {
                if var.x[3] != 0.0 {
                    (var.qtol / var.x[3].abs()).cbrt()
                } else {
                    INFINITY
                }
            }
        };
        let dt = clamp_dt(dt, var.dt_min, var.dt_max);
        var.t_e = if dt != INFINITY { var.t_q + dt } else { INFINITY };
        if inflection {
            match var.order {
                2 if var.x[2] != 0.0 && signum(var.x[1]) != signum(var.x[2]) => {
                    let t_i = var.t_x - (var.x[1] / (2.0 * var.x[2]));
                    if var.t_q < t_i {
                        var.t_e = var.t_e.min(t_i);
                    }
                }
                3 if var.x[3] != 0.0 && signum(var.x[2]) != signum(var.x[3]) => {
                    let t_i = var.t_x - (var.x[2] / (3.0 * var.x[3]));
                    if var.t_q < t_i {
                        var.t_e = var.t_e.min(t_i);
                    }
                }
                _ => {}
            }
        }
        var.te_infinity_tq();
    }

    /// Sets the unaligned requantization time after an observer advance,
    /// where `tQ < tX`: the next time the continuous representation can
    /// leave the band around the (older) quantized representation.
    pub(crate) fn set_te_unaligned(&mut self, v: VarId) {
        use crate::math::{
            min_root_cubic_both, min_root_cubic_lower, min_root_cubic_upper,
            min_root_quadratic_both, min_root_quadratic_lower, min_root_quadratic_upper,
        };
        let inflection = self.cfg.inflection;
        let var = &mut self.vars[v.0];
        debug_assert!(var.t_q <= var.t_x);
        debug_assert!(var.dt_min <= var.dt_max);
        let center = if var.is_liqss() { var.q_c } else { var.q[0] };
        let w = var.t_x - var.t_q;
        let dt = match var.order {
            1 => {
                if var.x[1] > 0.0 {
                    (center + var.qtol - var.x[0]) / var.x[1]
                } else if var.x[1] < 0.0 {
                    (center - var.qtol - var.x[0]) / var.x[1]
                } else {
                    INFINITY
                }
            }
            2 => {
                let d0 = var.x[0] - (center + (var.q[1] * w));
                let d1 = var.x[1] - var.q[1];
                if d1 >= 0.0 && var.x[2] >= 0.0 {
                    min_root_quadratic_upper(var.x[2], d1, d0 - var.qtol)
                } else if d1 <= 0.0 && var.x[2] <= 0.0 {
                    min_root_quadratic_lower(var.x[2], d1, d0 + var.qtol)
                } else {
                    min_root_quadratic_both(var.x[2], d1, d0 + var.qtol, d0 - var.qtol)
                }
            }
            _ => {
                let d0 = var.x[0] - (center + ((var.q[1] + (var.q[2] * w)) * w));
                let d1 = var.x[1] - (var.q[1] + (2.0 * var.q[2] * w));
                let d2 = var.x[2] - var.q[2];
                if d1 >= 0.0 && d2 >= 0.0 && var.x[3] >= 0.0 {
                    min_root_cubic_upper(var.x[3], d2, d1, d0 - var.qtol)
                } else if d1 <= 0.0 && d2 <= 0.0 && var.x[3] <= 0.0 {
                    min_root_cubic_lower(var.x[3], d2, d1, d0 + var.qtol)
                } else {
                    min_root_cubic_both(var.x[3], d2, d1, d0 + var.qtol, d0 - var.qtol)
                }
            }
        };
        let dt = clamp_dt(dt, var.dt_min, var.dt_max);
        var.t_e = if dt != INFINITY { var.t_x + dt } else { INFINITY };
        if inflection {
            match var.order {
                2 if var.x[2] != 0.0
                    && signum(var.x[1]) != signum(var.x[2])
                    && signum(var.x[1]) == signum(var.q[1]) =>
                {
                    let t_i = var.t_x - (var.x[1] / (2.0 * var.x[2]));
                    if var.t_x < t_i {
                        var.t_e = var.t_e.min(t_i);
                    }
                }
                3 if var.x[3] != 0.0
                    && signum(var.x[2]) != signum(var.x[3])
                    && signum(var.x[2]) == signum(var.q[2]) =>
                {
                    let t_i = var.t_x - (var.x[2] / (3.0 * var.x[3]));
                    if var.t_x < t_i {
                        var.t_e = var.t_e.min(t_i);
                    }
                }
                _ => {}
            }
        }
        var.te_infinity_tx();
    }

    /// Emits one diagnostic trace line when diagnostics are enabled.
    pub(crate) fn diag(&self, v: VarId, marker: char, t: Time) {
        if self.cfg.diagnostics {
            println!("{}", self.vars[v.0].diagnostic(marker, t));
        }
    }
}
