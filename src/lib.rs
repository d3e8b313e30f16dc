//! QSSim: a quantized state system (QSS) solver.
//!
//! QSSim integrates systems of ordinary differential equations by
//! quantizing state *values* instead of time: each state variable emits an
//! event only when its continuous trajectory drifts outside a tolerance
//! band around its quantized representation. Updates are sparse and
//! asynchronous, which suits stiff systems, systems with frequent state
//! events, and systems with widely varying time scales.
//!
//! The crate provides the explicit methods QSS1/QSS2/QSS3 and the
//! linearly-implicit variants LIQSS1/LIQSS2, input variables, discrete
//! (handler-updated) variables, and zero-crossing variables that fire
//! user-supplied handlers on sign changes.
//!
//! The usual entry point is [`simulate::Simulation`]: build a
//! [`model::Model`] (directly or through one of the [`mdl`] example
//! setups), hand it to a `Simulation` together with [`options::Options`],
//! and call `run()`.

pub mod error;
pub mod events;
pub mod function;
pub mod log;
pub mod math;
pub mod mdl;
pub mod model;
pub mod options;
pub mod output;
pub mod simulate;
pub mod time;
pub mod variable;
