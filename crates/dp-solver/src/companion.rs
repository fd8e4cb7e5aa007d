//! Trapezoidal companion models.
//!
//! Each dynamic branch is replaced, for one step of length `dt`, by a
//! conductance `g` in parallel with a history current source:
//! `i(t+dt) = g * v(t+dt) + hist`, where `v` is the branch voltage from
//! terminal a to terminal b and `i` flows from a to b.
//!
//! In the dynamic-phasor domain the models are shifted by `omega`; in EMT
//! `omega` is zero and the models reduce to the classic real companions.

use num_complex::Complex64;

/// Conductance and history current of one branch for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Companion {
    pub g: Complex64,
    pub hist: Complex64,
}

impl Companion {
    /// Branch current at the end of the step.
    pub fn current(&self, v: Complex64) -> Complex64 {
        self.g * v + self.hist
    }
}

/// Series R-L branch. `r = 0` gives the pure inductor.
///
/// `g = 1 / (2L/dt + Z)`, `hist = (2L/dt - Z)/(2L/dt + Z) * i_k + g * v_k`
/// with `Z = r + j*omega*L`.
pub fn series_rl(r: f64, l: f64, omega: f64, dt: f64, v_k: Complex64, i_k: Complex64) -> Companion {
    let z = Complex64::new(r, omega * l);
    let two_l_dt = Complex64::new(2.0 * l / dt, 0.0);
    let g = (two_l_dt + z).inv();
    let hist = (two_l_dt - z) * g * i_k + g * v_k;
    Companion { g, hist }
}

/// Capacitor.
///
/// `g = 2C/dt + j*omega*C`, `hist = -(2C/dt - j*omega*C) * v_k - i_k`.
pub fn capacitor(c: f64, omega: f64, dt: f64, v_k: Complex64, i_k: Complex64) -> Companion {
    let g = Complex64::new(2.0 * c / dt, omega * c);
    let hist = -Complex64::new(2.0 * c / dt, -omega * c) * v_k - i_k;
    Companion { g, hist }
}
