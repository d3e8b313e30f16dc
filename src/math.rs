//! Math kernel.
//!
//! Polynomial root solvers and sign helpers used by the quantization
//! step-size equations and the zero-crossing root search. The boundary
//! solvers return the smallest nonnegative root of `a·x² + b·x + c = 0`
//! (or the cubic analogue) against one or both tolerance boundaries, and
//! return `0` when floating-point precision loss makes the continuous
//! representation appear already outside the band — the caller then
//! treats the event as happening now, which is the conservative choice.

use crate::time::Time;

/// Distinguished infinite time/value.
pub const INFINITY: f64 = std::f64::INFINITY;

/// Finite ceiling used by the deactivation-relaxation doubling guard.
pub const HALF_INFINITY: f64 = std::f64::MAX / 2.0;

const ONE_THIRD: f64 = 1.0 / 3.0;
const ONE_NINTH: f64 = 1.0 / 9.0;
const TWO_THIRDS: f64 = 2.0 / 3.0;

/// Sign of `x` as ±1, using the sign bit (so `sign(-0.0) == -1`).
pub fn sign(x: f64) -> f64 {
    if x.is_sign_negative() {
        -1.0
    } else {
        1.0
    }
}

/// Signum of `x` as -1, 0 or +1.
pub fn signum(x: f64) -> i32 {
    if x < 0.0 {
        -1
    } else if x > 0.0 {
        1
    } else {
        0
    }
}

/// Square of `x`.
pub fn square(x: f64) -> f64 {
    x * x
}

/// Cube of `x`.
pub fn cube(x: f64) -> f64 {
    x * x * x
}

fn min3(x: f64, y: f64, z: f64) -> f64 {
    x.min(y).min(z)
}

/// Minimum positive of two nonnegative values; the other value when one
/// is zero.
pub fn min_positive(x: f64, y: f64) -> f64 {
    debug_assert!(x >= 0.0);
    debug_assert!(y >= 0.0);
    if x > 0.0 {
        if y > 0.0 {
            x.min(y)
        } else {
            x
        }
    } else {
        y
    }
}

/// Minimum positive of three nonnegative values.
pub fn min_positive3(x: f64, y: f64, z: f64) -> f64 {
    debug_assert!(x >= 0.0);
    debug_assert!(y >= 0.0);
    debug_assert!(z >= 0.0);
    if x > 0.0 {
        if y > 0.0 {
            if z > 0.0 {
                min3(x, y, z)
            } else {
                x.min(y)
            }
        } else if z > 0.0 {
            x.min(z)
        } else {
            x
        }
    } else if y > 0.0 {
        if z > 0.0 {
            y.min(z)
        } else {
            y
        }
    } else {
        z
    }
}

/// `r` if positive, infinity otherwise.
pub fn positive_or_infinity(r: f64) -> f64 {
    if r > 0.0 {
        r
    } else {
        INFINITY
    }
}

/// Minimum positive root of `a·x² + b·x + c = 0`, or infinity.
pub fn min_positive_root_quadratic(a: f64, b: f64, c: f64) -> f64 {
    if a == 0.0 {
        // Linear
        if b == 0.0 || c == 0.0 {
            INFINITY
        } else if sign(b) != sign(c) {
            -(c / b)
        } else {
            INFINITY
        }
    } else if c == 0.0 {
        // Roots at 0 and -b/a
        if b == 0.0 {
            INFINITY
        } else if sign(a) != sign(b) {
            -(b / a)
        } else {
            INFINITY
        }
    } else if b == 0.0 {
        if sign(a) != sign(c) {
            (-(c / a)).sqrt()
        } else {
            INFINITY
        }
    } else {
        let disc = (b * b) - (4.0 * a * c);
        if disc <= 0.0 {
            // Zero or one real root(s)
            if disc == 0.0 && sign(a) != sign(b) {
                -(b / (2.0 * a))
            } else {
                INFINITY
            }
        } else {
            // Two real roots: citardauq form for precision
            let q = -0.5 * (b + (sign(b) * disc.sqrt()));
            let r = if c > 0.0 {
                if b + (2.0 * q) <= 0.0 {
                    q / a
                } else {
                    c / q
                }
            } else {
                debug_assert!(c < 0.0);
                if b + (2.0 * q) >= 0.0 {
                    q / a
                } else {
                    c / q
                }
            };
            if r > 0.0 {
                r
            } else {
                INFINITY
            }
        }
    }
}

/// Minimum nonnegative root of the lower boundary quadratic
/// `a·x² + b·x + c = 0` with `a ≤ 0`, `b ≤ 0` and, barring precision
/// loss, `c > 0`.
pub fn min_root_quadratic_lower(a: f64, b: f64, c: f64) -> f64 {
    debug_assert!(a <= 0.0);
    debug_assert!(b <= 0.0);
    if c <= 0.0 {
        // Precision loss: x(tX) < q(tX) - qTol
        0.0
    } else if a == 0.0 {
        // Linear
        if b == 0.0 {
            INFINITY
        } else {
            -(c / b)
        }
    } else {
        let disc = (b * b) - (4.0 * a * c);
        if disc <= 0.0 {
            // Zero or one real root(s) => precision loss
            0.0
        } else {
            let q = -0.5 * (b + (sign(b) * disc.sqrt()));
            if b + (2.0 * q) <= 0.0 {
                (q / a).max(0.0)
            } else {
                (c / q).max(0.0)
            }
        }
    }
}

/// Minimum nonnegative root of the upper boundary quadratic
/// `a·x² + b·x + c = 0` with `a ≥ 0`, `b ≥ 0` and, barring precision
/// loss, `c < 0`.
pub fn min_root_quadratic_upper(a: f64, b: f64, c: f64) -> f64 {
    debug_assert!(a >= 0.0);
    debug_assert!(b >= 0.0);
    if c >= 0.0 {
        // Precision loss: x(tX) > q(tX) + qTol
        0.0
    } else if a == 0.0 {
        // Linear
        if b == 0.0 {
            INFINITY
        } else {
            -(c / b)
        }
    } else {
        let disc = (b * b) - (4.0 * a * c);
        if disc <= 0.0 {
            0.0
        } else {
            let q = -0.5 * (b + (sign(b) * disc.sqrt()));
            if b + (2.0 * q) >= 0.0 {
                (q / a).max(0.0)
            } else {
                (c / q).max(0.0)
            }
        }
    }
}

/// Minimum nonnegative root over both boundary quadratics
/// `a·x² + b·x + cl = 0` and `a·x² + b·x + cu = 0` with, barring
/// precision loss, `cl > 0` and `cu < 0`.
pub fn min_root_quadratic_both(a: f64, b: f64, cl: f64, cu: f64) -> f64 {
    if cl <= 0.0 || cu >= 0.0 {
        // Precision loss: x(tX) already outside the band
        return 0.0;
    }
    if a == 0.0 {
        // Linear
        if b == 0.0 {
            INFINITY
        } else if b <= 0.0 {
            -(cl / b)
        } else {
            -(cu / b)
        }
    } else {
        let bb = b * b;
        let a4 = 4.0 * a;

        // Lower boundary
        let discl = bb - (a4 * cl);
        let rootl = if discl < 0.0 {
            INFINITY
        } else if discl == 0.0 {
            let r = -b / (2.0 * a);
            if r < 0.0 {
                INFINITY
            } else {
                r
            }
        } else {
            let q = -0.5 * (b + (sign(b) * discl.sqrt()));
            if b + (2.0 * q) <= 0.0 {
                q / a
            } else {
                cl / q
            }
        };

        // Upper boundary
        let discu = bb - (a4 * cu);
        let rootu = if discu < 0.0 {
            INFINITY
        } else if discu == 0.0 {
            let r = -b / (2.0 * a);
            if r < 0.0 {
                INFINITY
            } else {
                r
            }
        } else {
            let q = -0.5 * (b + (sign(b) * discu.sqrt()));
            if b + (2.0 * q) >= 0.0 {
                q / a
            } else {
                cu / q
            }
        };

        if rootl == INFINITY && rootu == INFINITY {
            // Precision loss
            0.0
        } else {
            rootl.min(rootu).max(0.0)
        }
    }
}

// Root of a cubic if it crosses outward or zero.
fn cubic_cull(a: f64, b: f64, r: f64) -> f64 {
    if r > 0.0 {
        if (3.0 * r * r) + (2.0 * a * r) + b >= 0.0 {
            r
        } else {
            0.0
        }
    } else {
        0.0
    }
}

// Root of a cubic if it crosses upward or zero.
fn cubic_cull_upper(a: f64, b: f64, r: f64, s: f64) -> f64 {
    if r > 0.0 {
        if ((3.0 * r * r) + (2.0 * a * r) + b) * s >= 0.0 {
            r
        } else {
            0.0
        }
    } else {
        0.0
    }
}

// Root of a cubic if it crosses downward or zero.
fn cubic_cull_lower(a: f64, b: f64, r: f64, s: f64) -> f64 {
    if r > 0.0 {
        if ((3.0 * r * r) + (2.0 * a * r) + b) * s <= 0.0 {
            r
        } else {
            0.0
        }
    } else {
        0.0
    }
}

/// Minimum positive root of `a·x³ + b·x² + c·x + d = 0`, or infinity.
pub fn min_positive_root_cubic(a: f64, b: f64, c: f64, d: f64) -> f64 {
    const ONE_54: f64 = 1.0 / 54.0;
    const ONE_1458: f64 = 1.0 / 1458.0;
    let two_thirds_pi = TWO_THIRDS * std::f64::consts::PI;
    if a == 0.0 {
        return min_positive_root_quadratic(b, c, d);
    }
    // Normalize to x^3 + a x^2 + b x + c
    let inv_a = 1.0 / a;
    let a = b * inv_a;
    let b = c * inv_a;
    let c = d * inv_a;
    let a_3 = ONE_THIRD * a;
    let a2 = a * a;
    let q = a2 - (3.0 * b);
    let r = (((2.0 * a2) - (9.0 * b)) * a) + (27.0 * c);
    if q == 0.0 && r == 0.0 {
        return if a_3 < 0.0 { -a_3 } else { INFINITY };
    }
    let q3 = q * q * q;
    let cr2 = 729.0 * r * r;
    let cq3 = 2916.0 * q3;
    let qq = ONE_NINTH * q;
    if cr2 > cq3 {
        // One real root
        let aa = -sign(r) * ((ONE_54 * r.abs()) + (ONE_1458 * (cr2 - cq3).sqrt())).cbrt();
        let bb = qq / aa;
        positive_or_infinity(aa + bb - a_3)
    } else if cr2 < cq3 {
        // Three real roots
        let sqrt_q = q.sqrt();
        let scl = -TWO_THIRDS * sqrt_q;
        let theta_3 = ONE_THIRD * (0.5 * r / (sqrt_q * sqrt_q * sqrt_q)).acos();
        let root1 = (scl * theta_3.cos()) - a_3;
        let root2 = (scl * (theta_3 + two_thirds_pi).cos()) - a_3;
        let root3 = (scl * (theta_3 - two_thirds_pi).cos()) - a_3;
        min3(
            positive_or_infinity(root1),
            positive_or_infinity(root2),
            positive_or_infinity(root3),
        )
    } else {
        // Two real roots
        let sqrt_qq = qq.sqrt();
        if r > 0.0 {
            let root1 = -(2.0 * sqrt_qq) - a_3;
            if root1 > 0.0 {
                // Must be smallest positive root
                root1
            } else {
                positive_or_infinity(sqrt_qq - a_3)
            }
        } else {
            let root1 = positive_or_infinity(-sqrt_qq - a_3);
            if root1 > 0.0 && root1 != INFINITY {
                root1
            } else {
                positive_or_infinity((2.0 * sqrt_qq) - a_3)
            }
        }
    }
}

// Shared core of the one-sided boundary cubics: solves the normalized
// cubic and culls roots with the given function.
fn min_root_cubic_boundary(
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    cull: impl Fn(f64, f64, f64) -> f64,
) -> f64 {
    const ONE_54: f64 = 1.0 / 54.0;
    const ONE_1458: f64 = 1.0 / 1458.0;
    let two_thirds_pi = TWO_THIRDS * std::f64::consts::PI;
    // Normalize to x^3 + a x^2 + b x + c
    let inv_a = 1.0 / a;
    let a = b * inv_a;
    let b = c * inv_a;
    let c = d * inv_a;
    let a_3 = ONE_THIRD * a;
    let a2 = a * a;
    let q = a2 - (3.0 * b);
    let r = (((2.0 * a2) - (9.0 * b)) * a) + (27.0 * c);
    if q == 0.0 && r == 0.0 {
        return (-a_3).max(0.0);
    }
    let q3 = q * q * q;
    let cr2 = 729.0 * r * r;
    let cq3 = 2916.0 * q3;
    let qq = ONE_NINTH * q;
    if cr2 > cq3 {
        // One real root
        let aa = -sign(r) * ((ONE_54 * r.abs()) + (ONE_1458 * (cr2 - cq3).sqrt())).cbrt();
        let bb = qq / aa;
        cull(a, b, aa + bb - a_3)
    } else if cr2 < cq3 {
        // Three real roots
        let sqrt_q = q.sqrt();
        let scl = -TWO_THIRDS * sqrt_q;
        let theta_3 = ONE_THIRD * (0.5 * r / (sqrt_q * sqrt_q * sqrt_q)).acos();
        let root1 = cull(a, b, (scl * theta_3.cos()) - a_3);
        let root2 = cull(a, b, (scl * (theta_3 + two_thirds_pi).cos()) - a_3);
        let root3 = cull(a, b, (scl * (theta_3 - two_thirds_pi).cos()) - a_3);
        min_positive3(root1, root2, root3)
    } else {
        // Two real roots
        let sqrt_qq = qq.sqrt();
        if r > 0.0 {
            let root1 = cull(a, b, -(2.0 * sqrt_qq) - a_3);
            if root1 > 0.0 {
                // Must be smallest positive root
                root1
            } else {
                cull(a, b, sqrt_qq - a_3)
            }
        } else {
            let root1 = cull(a, b, -sqrt_qq - a_3);
            if root1 > 0.0 {
                root1
            } else {
                cull(a, b, (2.0 * sqrt_qq) - a_3)
            }
        }
    }
}

/// Minimum nonnegative root of the upper boundary cubic
/// `a·x³ + b·x² + c·x + d = 0` with `a, b, c ≥ 0` and, barring precision
/// loss, `d < 0`.
pub fn min_root_cubic_upper(a: f64, b: f64, c: f64, d: f64) -> f64 {
    debug_assert!(a >= 0.0);
    debug_assert!(b >= 0.0);
    debug_assert!(c >= 0.0);
    if a == 0.0 {
        min_root_quadratic_upper(b, c, d)
    } else {
        min_root_cubic_boundary(a, b, c, d, cubic_cull)
    }
}

/// Minimum nonnegative root of the lower boundary cubic
/// `a·x³ + b·x² + c·x + d = 0` with `a, b, c ≤ 0` and, barring precision
/// loss, `d > 0`.
pub fn min_root_cubic_lower(a: f64, b: f64, c: f64, d: f64) -> f64 {
    debug_assert!(a <= 0.0);
    debug_assert!(b <= 0.0);
    debug_assert!(c <= 0.0);
    if a == 0.0 {
        min_root_quadratic_lower(b, c, d)
    } else {
        min_root_cubic_boundary(a, b, c, d, cubic_cull)
    }
}

/// Minimum nonnegative root over both boundary cubics
/// `a·x³ + b·x² + c·x + dl = 0` and `a·x³ + b·x² + c·x + du = 0` with,
/// barring precision loss, `dl > 0` and `du < 0`.
pub fn min_root_cubic_both(a: f64, b: f64, c: f64, dl: f64, du: f64) -> f64 {
    if a == 0.0 {
        return min_root_quadratic_both(b, c, dl, du);
    }
    let s = sign(a);
    let rootl = min_root_cubic_boundary(a, b, c, dl, |na, nb, r| cubic_cull_lower(na, nb, r, s));
    let rootu = min_root_cubic_boundary(a, b, c, du, |na, nb, r| cubic_cull_upper(na, nb, r, s));
    min_positive(rootl, rootu)
}

/// Clamps a step to `[dt_min, dt_max]` without disturbing infinity.
pub fn clamp_dt(dt: Time, dt_min: Time, dt_max: Time) -> Time {
    debug_assert!(dt_min <= dt_max);
    dt.max(dt_min).min(dt_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signs() {
        assert_eq!(sign(3.5), 1.0);
        assert_eq!(sign(-0.0), -1.0);
        assert_eq!(signum(-2.0), -1);
        assert_eq!(signum(0.0), 0);
        assert_eq!(signum(7.0), 1);
        assert_eq!(square(3.0), 9.0);
        assert_eq!(cube(-2.0), -8.0);
    }

    #[test]
    fn min_positive_selection() {
        assert_eq!(min_positive(0.0, 2.0), 2.0);
        assert_eq!(min_positive(3.0, 2.0), 2.0);
        assert_eq!(min_positive3(0.0, 0.0, 5.0), 5.0);
        assert_eq!(min_positive3(4.0, 2.0, 0.0), 2.0);
        assert_eq!(min_positive3(4.0, 2.0, 1.0), 1.0);
    }

    #[test]
    fn quadratic_positive_root() {
        // (x - 2)(x + 3) = x^2 + x - 6
        let r = min_positive_root_quadratic(1.0, 1.0, -6.0);
        assert!((r - 2.0).abs() < 1e-12);
        // No real roots
        assert_eq!(min_positive_root_quadratic(1.0, 0.0, 1.0), INFINITY);
        // Linear
        assert!((min_positive_root_quadratic(0.0, 2.0, -4.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn quadratic_upper_boundary() {
        // x(t) drifting up towards q + qTol: 0.5 t^2 + 0.1 t - 1e-4 = 0
        let r = min_root_quadratic_upper(0.5, 0.1, -1e-4);
        assert!(r > 0.0 && r < INFINITY);
        let res = 0.5 * r * r + 0.1 * r - 1e-4;
        assert!(res.abs() < 1e-12);
        // Precision loss: already past the boundary
        assert_eq!(min_root_quadratic_upper(0.5, 0.1, 1e-9), 0.0);
        // Degenerate constant
        assert_eq!(min_root_quadratic_upper(0.0, 0.0, -1.0), INFINITY);
    }

    #[test]
    fn quadratic_lower_boundary() {
        let r = min_root_quadratic_lower(-0.5, -0.1, 1e-4);
        assert!(r > 0.0 && r < INFINITY);
        let res = -0.5 * r * r - 0.1 * r + 1e-4;
        assert!(res.abs() < 1e-12);
        assert_eq!(min_root_quadratic_lower(-0.5, -0.1, -1e-9), 0.0);
    }

    #[test]
    fn quadratic_both_boundaries() {
        // Slope dominates: hits the lower boundary first when b < 0
        let r = min_root_quadratic_both(0.0, -0.2, 1e-4, -1e-4);
        assert!((r - 5e-4).abs() < 1e-15);
        // Curvature up, slope down: both boundaries reachable
        let r = min_root_quadratic_both(2.0, -0.5, 1e-3, -1e-3);
        assert!(r > 0.0 && r < INFINITY);
        let lower = 2.0 * r * r - 0.5 * r + 1e-3;
        let upper = 2.0 * r * r - 0.5 * r - 1e-3;
        assert!(lower.abs() < 1e-9 || upper.abs() < 1e-9);
        // Precision loss
        assert_eq!(min_root_quadratic_both(1.0, 1.0, -1e-12, -1e-4), 0.0);
    }

    #[test]
    fn cubic_positive_root() {
        // (x - 1)(x - 2)(x - 3) = x^3 - 6x^2 + 11x - 6
        let r = min_positive_root_cubic(1.0, -6.0, 11.0, -6.0);
        assert!((r - 1.0).abs() < 1e-9);
        // Falls back to the quadratic for a == 0
        let r = min_positive_root_cubic(0.0, 1.0, 1.0, -6.0);
        assert!((r - 2.0).abs() < 1e-12);
    }

    #[test]
    fn cubic_upper_boundary() {
        // Monotone upward drift to the boundary
        let r = min_root_cubic_upper(0.1, 0.2, 0.3, -1e-3);
        assert!(r > 0.0 && r < INFINITY);
        let res = 0.1 * r.powi(3) + 0.2 * r * r + 0.3 * r - 1e-3;
        assert!(res.abs() < 1e-10);
    }

    #[test]
    fn cubic_lower_boundary() {
        let r = min_root_cubic_lower(-0.1, -0.2, -0.3, 1e-3);
        assert!(r > 0.0 && r < INFINITY);
        let res = -0.1 * r.powi(3) - 0.2 * r * r - 0.3 * r + 1e-3;
        assert!(res.abs() < 1e-10);
    }

    #[test]
    fn cubic_both_boundaries() {
        let r = min_root_cubic_both(0.05, -0.3, 0.1, 1e-3, -1e-3);
        assert!(r > 0.0 && r < INFINITY);
        let lower = 0.05 * r.powi(3) - 0.3 * r * r + 0.1 * r + 1e-3;
        let upper = 0.05 * r.powi(3) - 0.3 * r * r + 0.1 * r - 1e-3;
        assert!(lower.abs() < 1e-9 || upper.abs() < 1e-9);
    }

    #[test]
    fn clamping() {
        assert_eq!(clamp_dt(0.5, 1.0, 2.0), 1.0);
        assert_eq!(clamp_dt(3.0, 1.0, 2.0), 2.0);
        assert_eq!(clamp_dt(INFINITY, 1.0, INFINITY), INFINITY);
    }
}
