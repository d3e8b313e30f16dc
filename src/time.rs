//! Time scalars and superdense time.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Simulation time.
pub type Time = f64;

/// Variable value.
pub type Value = f64;

/// Superdense time index type.
pub type Index = u64;

/// A superdense time: real time plus an integer index that strictly
/// orders the event waves sharing the same real time.
///
/// Ordering is lexicographic. The real part is never NaN; ordering uses
/// the IEEE total order so that `infinity` sorts after every finite time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuperdenseTime {
    /// Real time.
    pub t: Time,
    /// Wave index within the real time.
    pub i: Index,
}

// The real part is never NaN, so the partial equivalence is total.
impl Eq for SuperdenseTime {}

impl SuperdenseTime {
    /// Time zero, wave zero.
    pub const ZERO: SuperdenseTime = SuperdenseTime { t: 0.0, i: 0 };

    /// Constructs a superdense time.
    pub fn new(t: Time, i: Index) -> SuperdenseTime {
        debug_assert!(!t.is_nan());
        SuperdenseTime { t, i }
    }

    /// The superdense time at infinity.
    pub fn infinity() -> SuperdenseTime {
        SuperdenseTime {
            t: std::f64::INFINITY,
            i: 0,
        }
    }

    /// The next wave at the same real time.
    pub fn next_wave(self) -> SuperdenseTime {
        SuperdenseTime {
            t: self.t,
            i: self.i + 1,
        }
    }
}

impl Ord for SuperdenseTime {
    fn cmp(&self, other: &SuperdenseTime) -> Ordering {
        self.t.total_cmp(&other.t).then(self.i.cmp(&other.i))
    }
}

impl PartialOrd for SuperdenseTime {
    fn partial_cmp(&self, other: &SuperdenseTime) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SuperdenseTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.t, self.i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicographic_order() {
        let a = SuperdenseTime::new(1.0, 0);
        let b = SuperdenseTime::new(1.0, 1);
        let c = SuperdenseTime::new(2.0, 0);
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
        assert_eq!(a, SuperdenseTime::new(1.0, 0));
    }

    #[test]
    fn infinity_sorts_last() {
        let inf = SuperdenseTime::infinity();
        assert!(SuperdenseTime::new(1e300, u64::max_value()) < inf);
        assert!(inf <= SuperdenseTime::infinity());
    }

    #[test]
    fn waves() {
        let s = SuperdenseTime::new(3.0, 4);
        assert_eq!(s.next_wave(), SuperdenseTime::new(3.0, 5));
        assert_eq!(format!("{}", s), "(3, 4)");
    }
}
