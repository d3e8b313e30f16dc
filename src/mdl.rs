//! Example model setups.
//!
//! Each setup populates a [`Model`] for one of the bundled example
//! systems, selecting variable kinds from the method in the options the
//! way a generated model would, and supplying a default end time when the
//! user did not pin one.
//!
//! [`Model`]: ../model/struct.Model.html

use crate::error::{inv_arg, Result};
use crate::events::EventQueue;
use crate::function::{FunctionLti, Handler, InputSin, InputSinNd, InputStep};
use crate::model::Model;
use crate::options::Options;
use crate::time::Time;
use crate::variable::{Crossing, Crossings, VarId};
use lazy_static::lazy_static;
use std::rc::Rc;

/// A model setup function.
pub type Setup = fn(&mut Options, &mut Model) -> Result<()>;

lazy_static! {
    /// Name → setup registry of the bundled example models.
    static ref MODELS: Vec<(&'static str, Setup)> = vec![
        ("exponential_decay", exponential_decay as Setup),
        ("exponential_decay_sine", exponential_decay_sine as Setup),
        ("exponential_decay_sine_nd", exponential_decay_sine_nd as Setup),
        ("exponential_decay_step", exponential_decay_step as Setup),
        ("achilles", achilles as Setup),
        ("bball", bball as Setup),
    ];
}

/// Builds the named example model, or fails with the known names listed.
pub fn build(name: &str, opts: &mut Options, model: &mut Model) -> Result<()> {
    for (known, setup) in MODELS.iter() {
        if *known == name {
            return setup(opts, model);
        }
    }
    inv_arg(format!(
        "unknown model: {} (known models: {})",
        name,
        names().join(", ")
    ))
}

/// The names of the bundled example models.
pub fn names() -> Vec<&'static str> {
    MODELS.iter().map(|(name, _)| *name).collect()
}

/// Exponential decay: x' = -x, x(0) = 1.
pub fn exponential_decay(opts: &mut Options, m: &mut Model) -> Result<()> {
    if !opts.t_end_set {
        opts.t_end = 10.0;
    }
    let x = m.add_state("x", opts.method, opts.rtol, opts.atol, 1.0);
    m.set_derivative(x, FunctionLti::new().add(-1.0, x).boxed());
    Ok(())
}

/// Exponential decay with sine input: x' = -x + u(t),
/// u(t) = 0.05 sin(0.5 t).
pub fn exponential_decay_sine(opts: &mut Options, m: &mut Model) -> Result<()> {
    if !opts.t_end_set {
        opts.t_end = 50.0;
    }
    let x = m.add_state("x", opts.method, opts.rtol, opts.atol, 1.0);
    let u = m.add_input(
        "u",
        opts.method.order(),
        opts.rtol,
        opts.atol,
        Box::new(InputSin { c: 0.05, s: 0.5 }),
    );
    m.var_mut(u).set_dt_max(0.1);
    m.set_derivative(x, FunctionLti::new().add(-1.0, x).add_var(u).boxed());
    Ok(())
}

/// Exponential decay with sine input and numeric differentiation.
pub fn exponential_decay_sine_nd(opts: &mut Options, m: &mut Model) -> Result<()> {
    if !opts.t_end_set {
        opts.t_end = 50.0;
    }
    let x = m.add_state("x", opts.method, opts.rtol, opts.atol, 1.0);
    let u = m.add_input(
        "u",
        opts.method.order(),
        opts.rtol,
        opts.atol,
        Box::new(InputSinNd {
            c: 0.05,
            s: 0.5,
            dtn: opts.dt_num,
        }),
    );
    m.var_mut(u).set_dt_max(0.1);
    m.set_derivative_nd(x, FunctionLti::new().add(-1.0, x).add_var(u).boxed());
    Ok(())
}

/// Exponential decay with a step input: x' = -x + u(t), u stepping by 1
/// every 2.5 time units.
pub fn exponential_decay_step(opts: &mut Options, m: &mut Model) -> Result<()> {
    if !opts.t_end_set {
        opts.t_end = 10.0;
    }
    let x = m.add_state("x", opts.method, opts.rtol, opts.atol, 1.0);
    let u = m.add_input(
        "u",
        opts.method.order(),
        opts.rtol,
        opts.atol,
        Box::new(InputStep {
            h0: 0.0,
            dh: 1.0,
            dt: 2.5,
        }),
    );
    m.set_derivative(x, FunctionLti::new().add(-1.0, x).add_var(u).boxed());
    Ok(())
}

/// Achilles and the tortoise: x1' = -0.5 x1 + 1.5 x2, x2' = -x1.
pub fn achilles(opts: &mut Options, m: &mut Model) -> Result<()> {
    if !opts.t_end_set {
        opts.t_end = 10.0;
    }
    let x1 = m.add_state("x1", opts.method, opts.rtol, opts.atol, 0.0);
    let x2 = m.add_state("x2", opts.method, opts.rtol, opts.atol, 2.0);
    m.set_derivative(x1, FunctionLti::new().add(-0.5, x1).add(1.5, x2).boxed());
    m.set_derivative(x2, FunctionLti::new().add(-1.0, x1).boxed());
    Ok(())
}

/// Bouncing-ball handler: reflects the velocity with restitution loss and
/// snaps the height to the floor, through deferred handler events.
struct BounceHandler {
    h: VarId,
    v: VarId,
    e: f64,
}

impl Handler for BounceHandler {
    fn apply(&self, m: &mut Model, queue: &mut EventQueue, t: Time, crossing: Crossing) {
        if crossing.is_downward() {
            let v_now = m.var(self.v).x(t);
            m.request_handler(queue, self.v, t, -self.e * v_now);
            m.request_handler(queue, self.h, t, 0.0);
        }
    }
}

/// Bouncing ball: height h and velocity v with v' = -g, a zero-crossing
/// on the height firing the bounce handler on downward crossings.
pub fn bball(opts: &mut Options, m: &mut Model) -> Result<()> {
    if !opts.t_end_set {
        opts.t_end = 2.0;
    }
    let h = m.add_state("h", opts.method, opts.rtol, opts.atol, 1.0);
    let v = m.add_state("v", opts.method, opts.rtol, opts.atol, 0.0);
    m.set_derivative(h, FunctionLti::new().add_var(v).boxed());
    m.set_derivative(v, FunctionLti::new().constant(-9.80665).boxed());
    m.add_zc(
        "z",
        opts.method.order().min(2),
        opts.rtol,
        opts.atol,
        Crossings::none().with(Crossing::DnPN).with(Crossing::DnPZ),
        FunctionLti::new().add_var(h).boxed(),
        Rc::new(BounceHandler { h, v, e: 0.7 }),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_models() {
        assert!(names().contains(&"achilles"));
        assert!(names().contains(&"bball"));
        let mut opts = Options::quiet();
        let mut m = Model::new(&opts);
        assert!(build("no_such_model", &mut opts, &mut m).is_err());
        build("achilles", &mut opts, &mut m).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(opts.t_end, 10.0);
    }

    #[test]
    fn pinned_end_time_is_kept() {
        let mut opts = Options::quiet();
        opts.set_t_end(2.5);
        let mut m = Model::new(&opts);
        build("exponential_decay_sine", &mut opts, &mut m).unwrap();
        assert_eq!(opts.t_end, 2.5);
        assert_eq!(m.len(), 2);
    }
}
