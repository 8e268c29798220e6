use serde::{Deserialize, Serialize};

use crate::error::GranError;

/// Switches selecting the optional parts of the contact model.
///
/// Mirrors the style settings of the force law: tangential damping on/off,
/// rolling friction on/off, cohesion on/off. Validated once at setup; an
/// illegal combination is a configuration error, not a runtime condition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Apply viscous damping to the tangential force in the static branch.
    pub tangential_damping: bool,
    /// Add a constant-directional-torque rolling resistance at each contact.
    pub rolling_friction: bool,
    /// Subtract an attractive normal force proportional to the contact area.
    pub cohesion: bool,
    /// Domain dimension; cohesion is only defined for 3.
    pub dimension: u32,
    /// Conversion from pressure units to force/length^2, applied to the
    /// stiffness of particle-particle contacts. Wall contacts are already in
    /// force units and skip it.
    pub pressure_to_force: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            tangential_damping: true,
            rolling_friction: false,
            cohesion: false,
            dimension: 3,
            pressure_to_force: 1.0,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), GranError> {
        if self.cohesion && self.dimension != 3 {
            return Err(GranError::CohesionRequires3d(self.dimension));
        }
        if !(self.dimension == 2 || self.dimension == 3) {
            return Err(GranError::InvalidConfig(format!(
                "dimension must be 2 or 3, got {}",
                self.dimension
            )));
        }
        if !(self.pressure_to_force > 0.0) || !self.pressure_to_force.is_finite() {
            return Err(GranError::InvalidConfig(format!(
                "pressure_to_force must be positive and finite, got {}",
                self.pressure_to_force
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ModelConfig::default().validate().is_ok());
    }

    #[test]
    fn cohesion_rejected_in_2d() {
        let config = ModelConfig {
            cohesion: true,
            dimension: 2,
            ..ModelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GranError::CohesionRequires3d(2))
        ));
    }

    #[test]
    fn nonpositive_pressure_conversion_rejected() {
        let config = ModelConfig {
            pressure_to_force: 0.0,
            ..ModelConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
