//! Arrhenius-form property correlations.
//!
//! Literature transport properties for hydrogen isotopes in molten salts are
//! reported as `value(T) = A · exp(−E_a / (R·T))` with a pre-exponential `A`
//! in the property's own unit and an activation energy in J/mol.

use serde::{Deserialize, Serialize};

use crate::material::PropertyReference;

/// Molar gas constant [J·mol⁻¹·K⁻¹].
pub const GAS_CONSTANT: f64 = 8.314_462_618;

/// A single Arrhenius-form property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrheniusProperty {
    /// Pre-exponential factor, in the property's unit.
    pub pre_exp: f64,
    /// Activation energy [J·mol⁻¹].
    pub act_energy_j_mol: f64,
}

impl ArrheniusProperty {
    pub fn value(&self, temperature_k: f64) -> f64 {
        self.pre_exp * (-self.act_energy_j_mol / (GAS_CONSTANT * temperature_k)).exp()
    }
}

/// A reference material defined by Arrhenius diffusivity and solubility laws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArrheniusReference {
    pub name: &'static str,
    pub diffusivity: ArrheniusProperty,
    pub solubility: ArrheniusProperty,
}

impl PropertyReference for ArrheniusReference {
    fn diffusivity(&self, temperature_k: f64) -> f64 {
        self.diffusivity.value(temperature_k)
    }

    fn solubility(&self, temperature_k: f64) -> f64 {
        self.solubility.value(temperature_k)
    }
}

/// Tritium in FLiBe, Calderoni et al. (2008).
///
/// Diffusivity 9.3e-7 m²/s with E_a = 42 kJ/mol; Henry solubility
/// 7.9e-2 mol·m⁻³·Pa⁻¹ with E_a = 35 kJ/mol. These are the correlations the
/// permeation experiment is benchmarked against.
pub const FLIBE_CALDERONI: ArrheniusReference = ArrheniusReference {
    name: "FLiBe (Calderoni 2008)",
    diffusivity: ArrheniusProperty {
        pre_exp: 9.3e-7,
        act_energy_j_mol: 42_000.0,
    },
    solubility: ArrheniusProperty {
        pre_exp: 7.9e-2,
        act_energy_j_mol: 35_000.0,
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrhenius_increases_with_temperature() {
        let d = FLIBE_CALDERONI.diffusivity;
        assert!(d.value(900.0) > d.value(700.0));
    }

    #[test]
    fn flibe_diffusivity_order_of_magnitude() {
        // ~1.7e-9 m²/s at 800 K.
        let v = FLIBE_CALDERONI.diffusivity(800.0);
        assert!(v > 1e-9 && v < 3e-9, "unexpected diffusivity {v}");
    }

    #[test]
    fn permeability_is_product() {
        let t = 823.0;
        let p = FLIBE_CALDERONI.permeability(t);
        let d = FLIBE_CALDERONI.diffusivity(t);
        let s = FLIBE_CALDERONI.solubility(t);
        assert!((p - d * s).abs() <= 1e-30 + 1e-12 * p.abs());
    }
}
