//! Simulation options.
//!
//! An explicit options value threaded through the model and the driver.

use crate::error::{inv_arg, Error, Result};
use crate::math::INFINITY;
use crate::time::Time;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString};

/// The QSS method used for state variables.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
)]
pub enum Method {
    /// First-order explicit QSS.
    #[strum(to_string = "QSS1", serialize = "qss1")]
    Qss1,
    /// Second-order explicit QSS.
    #[strum(to_string = "QSS2", serialize = "qss2")]
    Qss2,
    /// Third-order explicit QSS.
    #[strum(to_string = "QSS3", serialize = "qss3")]
    Qss3,
    /// First-order linearly-implicit QSS.
    #[strum(to_string = "LIQSS1", serialize = "liqss1")]
    Liqss1,
    /// Second-order linearly-implicit QSS.
    #[strum(to_string = "LIQSS2", serialize = "liqss2")]
    Liqss2,
}

impl Method {
    /// Method order.
    pub fn order(self) -> i32 {
        match self {
            Method::Qss1 | Method::Liqss1 => 1,
            Method::Qss2 | Method::Liqss2 => 2,
            Method::Qss3 => 3,
        }
    }

    /// Whether this is a linearly-implicit (hysteretic) method.
    pub fn is_liqss(self) -> bool {
        matches!(self, Method::Liqss1 | Method::Liqss2)
    }
}

/// Output selector flags.
///
/// The compact string form accepted by the CLI is a subset of the
/// characters `xqrstoad`:
/// continuous, quantized, requantization events, sampled grid, time
/// events, observer events, all variables, diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFlags {
    /// Continuous trajectory output.
    pub x: bool,
    /// Quantized trajectory output.
    pub q: bool,
    /// Output at requantization events.
    pub r: bool,
    /// Output at sampled grid times.
    pub s: bool,
    /// Output at time (discrete) events.
    pub t: bool,
    /// Output of observers at events.
    pub o: bool,
    /// Output all variables at events.
    pub a: bool,
    /// Diagnostics: one trace line per event.
    pub d: bool,
}

impl Default for OutputFlags {
    fn default() -> OutputFlags {
        OutputFlags {
            x: true,
            q: true,
            r: true,
            s: true,
            t: true,
            o: false,
            a: false,
            d: false,
        }
    }
}

impl OutputFlags {
    /// The all-off flag set.
    pub fn none() -> OutputFlags {
        OutputFlags {
            x: false,
            q: false,
            r: false,
            s: false,
            t: false,
            o: false,
            a: false,
            d: false,
        }
    }

    /// Whether any trajectory file output is enabled.
    pub fn any_file(&self) -> bool {
        (self.x || self.q) && (self.r || self.s || self.t)
    }
}

impl FromStr for OutputFlags {
    type Err = Error;

    fn from_str(s: &str) -> Result<OutputFlags> {
        let mut flags = OutputFlags::none();
        for c in s.chars() {
            match c {
                'x' => flags.x = true,
                'q' => flags.q = true,
                'r' => flags.r = true,
                's' => flags.s = true,
                't' => flags.t = true,
                'o' => flags.o = true,
                'a' => flags.a = true,
                'd' => flags.d = true,
                _ => return inv_arg(format!("unknown output flag: {}", c)),
            }
        }
        Ok(flags)
    }
}

/// Simulation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// QSS method for state variables.
    pub method: Method,
    /// Default relative tolerance.
    pub rtol: f64,
    /// Default absolute tolerance.
    pub atol: f64,
    /// Simulation end time.
    pub t_end: Time,
    /// Whether the user pinned the end time (example models supply their
    /// own defaults otherwise).
    pub t_end_set: bool,
    /// Sampled output interval.
    pub dt_out: Time,
    /// Minimum time step.
    pub dt_min: Time,
    /// Maximum time step.
    pub dt_max: Time,
    /// Deactivation time step threshold.
    pub dt_inf: Time,
    /// Numeric differentiation probe offset.
    pub dt_num: Time,
    /// Enable inflection-point requantization clamping.
    pub inflection: bool,
    /// Output selector flags.
    pub output: OutputFlags,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            method: Method::Qss2,
            rtol: 1.0e-4,
            atol: 1.0e-6,
            t_end: 1.0,
            t_end_set: false,
            dt_out: 1.0e-2,
            dt_min: 0.0,
            dt_max: INFINITY,
            dt_inf: INFINITY,
            dt_num: 1.0e-6,
            inflection: false,
            output: OutputFlags::default(),
        }
    }
}

impl Options {
    /// Options for library-driven runs and tests: no file output.
    pub fn quiet() -> Options {
        Options {
            output: OutputFlags::none(),
            ..Options::default()
        }
    }

    /// Sets the end time and marks it user-pinned.
    pub fn set_t_end(&mut self, t_end: Time) {
        self.t_end = t_end;
        self.t_end_set = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_strings() {
        assert_eq!(Method::from_str("QSS2").unwrap(), Method::Qss2);
        assert_eq!(Method::from_str("liqss1").unwrap(), Method::Liqss1);
        assert_eq!(format!("{}", Method::Qss3), "QSS3");
        assert!(Method::from_str("QSS4").is_err());
        assert_eq!(Method::Qss3.order(), 3);
        assert!(Method::Liqss2.is_liqss());
        assert!(!Method::Qss1.is_liqss());
    }

    #[test]
    fn output_flag_strings() {
        let f: OutputFlags = "xq".parse().unwrap();
        assert!(f.x && f.q);
        assert!(!f.r && !f.s && !f.t && !f.o && !f.a && !f.d);
        let f: OutputFlags = "xqrstoad".parse().unwrap();
        assert!(f.a && f.d && f.o);
        assert!("xz".parse::<OutputFlags>().is_err());
    }

    #[test]
    fn file_output_gating() {
        let mut f = OutputFlags::none();
        assert!(!f.any_file());
        f.x = true;
        assert!(!f.any_file());
        f.s = true;
        assert!(f.any_file());
    }

    #[test]
    fn serde_round_trip() {
        let mut opts = Options::default();
        opts.method = Method::Liqss2;
        opts.set_t_end(25.0);
        // JSON has no infinity literal; pin the unbounded clamps.
        opts.dt_max = 1.0e6;
        opts.dt_inf = 1.0e6;
        let json = serde_json::to_string(&opts).unwrap();
        let back: Options = serde_json::from_str(&json).unwrap();
        assert_eq!(back.method, Method::Liqss2);
        assert_eq!(back.t_end, 25.0);
        assert!(back.t_end_set);
        assert_eq!(back.output, opts.output);
    }
}
