//! Personalized energy density of body-mass change
//!
//! Uses the Forbes partition model: the fat share of a mass change grows with
//! existing fat mass, so the energy stored per kilogram depends on body composition.
//!
//! ```text
//! FM = weight × body_fat_fraction
//! p  = FM / (FM + 10.4)
//! ρ  = p × 9440 + (1 − p) × 1816        kcal per kg
//! ```

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Energy content of fat tissue change (kcal/kg)
pub const FAT_TISSUE_KCAL_PER_KG: f64 = 9440.0;

/// Energy content of lean tissue change (kcal/kg)
pub const LEAN_TISSUE_KCAL_PER_KG: f64 = 1816.0;

/// Forbes constant (kg of fat mass)
pub const FORBES_CONSTANT_KG: f64 = 10.4;

/// Population-average density used without body-fat data (kcal/kg)
pub const DEFAULT_KCAL_PER_KG: f64 = 7350.0;

/// Constants of the energy density model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyDensityConstants {
    pub fat_kcal_per_kg: f64,
    pub lean_kcal_per_kg: f64,
    pub forbes_constant_kg: f64,
    pub default_kcal_per_kg: f64,
}

impl Default for EnergyDensityConstants {
    fn default() -> Self {
        Self {
            fat_kcal_per_kg: FAT_TISSUE_KCAL_PER_KG,
            lean_kcal_per_kg: LEAN_TISSUE_KCAL_PER_KG,
            forbes_constant_kg: FORBES_CONSTANT_KG,
            default_kcal_per_kg: DEFAULT_KCAL_PER_KG,
        }
    }
}

impl EnergyDensityConstants {
    pub fn validate(&self) -> Result<(), ComputeError> {
        let values = [
            ("fat_kcal_per_kg", self.fat_kcal_per_kg),
            ("lean_kcal_per_kg", self.lean_kcal_per_kg),
            ("forbes_constant_kg", self.forbes_constant_kg),
            ("default_kcal_per_kg", self.default_kcal_per_kg),
        ];
        for (name, value) in values {
            if !(value.is_finite() && value > 0.0) {
                return Err(ComputeError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Fat share of a mass change for the given composition
    pub fn fat_partition(&self, body_weight_kg: f64, body_fat_fraction: f64) -> f64 {
        let fat_mass = body_weight_kg * body_fat_fraction;
        fat_mass / (fat_mass + self.forbes_constant_kg)
    }

    /// Energy density in kcal/kg.
    ///
    /// Falls back to `default_kcal_per_kg` when either input is missing or outside
    /// a usable range.
    pub fn energy_density(
        &self,
        body_weight_kg: Option<f64>,
        body_fat_fraction: Option<f64>,
    ) -> f64 {
        match (body_weight_kg, body_fat_fraction) {
            (Some(weight), Some(fraction))
                if weight.is_finite() && weight > 0.0 && (0.0..1.0).contains(&fraction) =>
            {
                let p = self.fat_partition(weight, fraction);
                p * self.fat_kcal_per_kg + (1.0 - p) * self.lean_kcal_per_kg
            }
            _ => self.default_kcal_per_kg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_value() {
        let constants = EnergyDensityConstants::default();
        // FM = 20 kg, p = 20 / 30.4
        let p = 20.0 / 30.4;
        let expected = p * 9440.0 + (1.0 - p) * 1816.0;
        let rho = constants.energy_density(Some(80.0), Some(0.25));
        assert!((rho - expected).abs() < 1e-9);
    }

    #[test]
    fn test_density_grows_with_body_fat() {
        let constants = EnergyDensityConstants::default();
        let lean = constants.energy_density(Some(80.0), Some(0.10));
        let adipose = constants.energy_density(Some(80.0), Some(0.40));
        assert!(adipose > lean);

        let mut previous = constants.energy_density(Some(80.0), Some(0.01));
        for pct in 2..60 {
            let rho = constants.energy_density(Some(80.0), Some(pct as f64 / 100.0));
            assert!(rho > previous);
            previous = rho;
        }
    }

    #[test]
    fn test_falls_back_without_composition() {
        let constants = EnergyDensityConstants::default();
        assert_eq!(constants.energy_density(None, Some(0.2)), DEFAULT_KCAL_PER_KG);
        assert_eq!(constants.energy_density(Some(80.0), None), DEFAULT_KCAL_PER_KG);
        assert_eq!(constants.energy_density(Some(80.0), Some(1.5)), DEFAULT_KCAL_PER_KG);
    }

    #[test]
    fn test_density_stays_between_tissue_bounds() {
        let constants = EnergyDensityConstants::default();
        let rho = constants.energy_density(Some(120.0), Some(0.45));
        assert!(rho > LEAN_TISSUE_KCAL_PER_KG && rho < FAT_TISSUE_KCAL_PER_KG);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let constants = EnergyDensityConstants {
            default_kcal_per_kg: 0.0,
            ..Default::default()
        };
        assert!(constants.validate().is_err());
        assert!(EnergyDensityConstants::default().validate().is_ok());
    }
}
