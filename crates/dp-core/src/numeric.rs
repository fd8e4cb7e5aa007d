/// Floating point type used throughout the system.
pub type Real = f64;

#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// Number of fixed steps needed to cover `duration` with `timestep`.
///
/// Returns `(steps, exact)`. When the ratio is within tolerance of an integer
/// the rounded value is used; otherwise the count is rounded up and `exact`
/// is false, meaning the final step is shorter than `timestep`.
pub fn step_count(duration: Real, timestep: Real) -> (u64, bool) {
    let ratio = duration / timestep;
    let rounded = ratio.round();
    let tol = Tolerances {
        abs: 1e-9,
        rel: 1e-9,
    };
    if nearly_equal(ratio, rounded, tol) {
        (rounded.max(1.0) as u64, true)
    } else {
        (ratio.ceil().max(1.0) as u64, false)
    }
}
