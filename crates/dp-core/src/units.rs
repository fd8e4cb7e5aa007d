// dp-core/src/units.rs

use uom::si::f64::{
    Capacitance as UomCapacitance, ElectricPotential as UomElectricPotential,
    ElectricalResistance as UomElectricalResistance, Frequency as UomFrequency,
    Inductance as UomInductance,
};

// Public canonical unit types (SI, f64)
pub type Capacitance = UomCapacitance;
pub type Frequency = UomFrequency;
pub type Inductance = UomInductance;
pub type Resistance = UomElectricalResistance;
pub type Voltage = UomElectricPotential;

#[inline]
pub fn ohm(v: f64) -> Resistance {
    use uom::si::electrical_resistance::ohm;
    Resistance::new::<ohm>(v)
}

#[inline]
pub fn farad(v: f64) -> Capacitance {
    use uom::si::capacitance::farad;
    Capacitance::new::<farad>(v)
}

#[inline]
pub fn henry(v: f64) -> Inductance {
    use uom::si::inductance::henry;
    Inductance::new::<henry>(v)
}

#[inline]
pub fn volt(v: f64) -> Voltage {
    use uom::si::electric_potential::volt;
    Voltage::new::<volt>(v)
}

#[inline]
pub fn hz(v: f64) -> Frequency {
    use uom::si::frequency::hertz;
    Frequency::new::<hertz>(v)
}

/// Angular frequency in rad/s for a frequency.
#[inline]
pub fn omega(f: Frequency) -> f64 {
    use uom::si::frequency::hertz;
    2.0 * core::f64::consts::PI * f.get::<hertz>()
}
