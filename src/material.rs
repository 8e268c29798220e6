//! Material property tables and the per-type-pair coefficient resolver.
//!
//! Source properties are supplied per type (elastic constants) or per
//! unordered type pair (restitution, friction, optional rolling friction and
//! cohesion). The resolver combines them once into a dense symmetric table so
//! the per-contact hot loop is a plain indexed lookup.

use std::f64::consts::PI;

use tracing::debug;

use crate::config::ModelConfig;
use crate::error::GranError;

/// A dense symmetric per-type-pair value table.
#[derive(Clone, Debug)]
pub struct TypePairValues {
    ntypes: usize,
    values: Vec<f64>,
}

impl TypePairValues {
    /// Builds from a full row-major square matrix; the upper triangle wins if
    /// the input is not symmetric.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, GranError> {
        let n = rows.len();
        let mut values = vec![0.0; n * n];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(GranError::InvalidProperty {
                    name: "type pair table",
                    detail: format!("row {} has {} entries, expected {}", i, row.len(), n),
                });
            }
            for (j, &v) in row.iter().enumerate() {
                values[i * n + j] = v;
            }
        }
        for i in 0..n {
            for j in 0..i {
                values[i * n + j] = values[j * n + i];
            }
        }
        Ok(Self { ntypes: n, values })
    }

    pub fn uniform(ntypes: usize, value: f64) -> Self {
        Self {
            ntypes,
            values: vec![value; ntypes * ntypes],
        }
    }

    pub fn ntypes(&self) -> usize {
        self.ntypes
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.ntypes + j]
    }
}

/// Externally supplied source properties for all material types.
///
/// `ntypes` material types are indexed from 0. Per-type vectors must have
/// exactly `ntypes` entries and per-pair tables must be `ntypes` square;
/// anything else is rejected when the coefficient table is built.
#[derive(Clone, Debug)]
pub struct MaterialSet {
    pub ntypes: usize,
    /// Young's modulus per type, pressure units.
    pub youngs_modulus: Vec<f64>,
    /// Poisson's ratio per type.
    pub poissons_ratio: Vec<f64>,
    /// Coefficient of restitution per type pair, in (0, 1].
    pub restitution: TypePairValues,
    /// Sliding friction coefficient per type pair.
    pub friction: TypePairValues,
    /// Rolling friction coefficient per type pair; required when rolling
    /// friction is enabled in the model config.
    pub rolling_friction: Option<TypePairValues>,
    /// Cohesion energy density per type pair; required when cohesion is
    /// enabled in the model config.
    pub cohesion_energy_density: Option<TypePairValues>,
    /// Global characteristic velocity regularizing the stiffness law.
    pub characteristic_velocity: f64,
    /// Thermal conductivity per type; required for heat transfer.
    pub thermal_conductivity: Option<Vec<f64>>,
    /// Optional per-pair ratio reconciling the force-law overlap with a
    /// separately calibrated heat-contact overlap at walls.
    pub heat_overlap_ratio: Option<TypePairValues>,
}

impl MaterialSet {
    /// A single material type with uniform pair properties. Convenient for
    /// tests and monodisperse setups.
    pub fn single(
        youngs_modulus: f64,
        poissons_ratio: f64,
        restitution: f64,
        friction: f64,
        characteristic_velocity: f64,
    ) -> Self {
        Self {
            ntypes: 1,
            youngs_modulus: vec![youngs_modulus],
            poissons_ratio: vec![poissons_ratio],
            restitution: TypePairValues::uniform(1, restitution),
            friction: TypePairValues::uniform(1, friction),
            rolling_friction: None,
            cohesion_energy_density: None,
            characteristic_velocity,
            thermal_conductivity: None,
            heat_overlap_ratio: None,
        }
    }
}

/// Resolved coefficients for one unordered type pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairCoefficients {
    /// Effective Young's modulus.
    pub yeff: f64,
    /// Effective shear modulus. Not used by the base normal-force law but
    /// resolved for tangential-stiffness extensions.
    pub geff: f64,
    /// ln of the restitution coefficient.
    pub rest_log: f64,
    /// Damping ratio ln(e)/sqrt(ln(e)^2 + pi^2).
    pub beta: f64,
    pub friction: f64,
    pub rolling_friction: f64,
    pub cohesion_energy_density: f64,
}

/// The prebuilt symmetric coefficient table queried by the force model.
///
/// Built once at setup and rebuilt whenever the source tables change;
/// read-only during force evaluation.
#[derive(Clone, Debug)]
pub struct PairTable {
    ntypes: usize,
    pairs: Vec<PairCoefficients>,
    characteristic_velocity: f64,
    thermal_conductivity: Option<Vec<f64>>,
    heat_overlap_ratio: Option<TypePairValues>,
}

fn check_per_type(
    name: &'static str,
    values: &[f64],
    ntypes: usize,
) -> Result<(), GranError> {
    if values.len() != ntypes {
        return Err(GranError::MissingProperty {
            name,
            expected: ntypes,
            got: values.len(),
        });
    }
    Ok(())
}

fn check_per_pair(
    name: &'static str,
    values: &TypePairValues,
    ntypes: usize,
) -> Result<(), GranError> {
    if values.ntypes() != ntypes {
        return Err(GranError::MissingProperty {
            name,
            expected: ntypes * ntypes,
            got: values.ntypes() * values.ntypes(),
        });
    }
    Ok(())
}

impl PairTable {
    pub fn build(set: &MaterialSet, config: &ModelConfig) -> Result<Self, GranError> {
        config.validate()?;
        let n = set.ntypes;
        if n == 0 {
            return Err(GranError::InvalidConfig("no material types declared".into()));
        }
        check_per_type("youngsModulus", &set.youngs_modulus, n)?;
        check_per_type("poissonsRatio", &set.poissons_ratio, n)?;
        check_per_pair("coefficientRestitution", &set.restitution, n)?;
        check_per_pair("coefficientFriction", &set.friction, n)?;

        let rolling = match (config.rolling_friction, &set.rolling_friction) {
            (true, None) => {
                return Err(GranError::MissingProperty {
                    name: "coefficientRollingFriction",
                    expected: n * n,
                    got: 0,
                })
            }
            (true, Some(t)) => {
                check_per_pair("coefficientRollingFriction", t, n)?;
                Some(t)
            }
            (false, _) => None,
        };
        let cohesion = match (config.cohesion, &set.cohesion_energy_density) {
            (true, None) => {
                return Err(GranError::MissingProperty {
                    name: "cohesionEnergyDensity",
                    expected: n * n,
                    got: 0,
                })
            }
            (true, Some(t)) => {
                check_per_pair("cohesionEnergyDensity", t, n)?;
                Some(t)
            }
            (false, _) => None,
        };
        if let Some(cond) = &set.thermal_conductivity {
            check_per_type("thermalConductivity", cond, n)?;
        }
        if let Some(ratio) = &set.heat_overlap_ratio {
            check_per_pair("heatOverlapRatio", ratio, n)?;
        }

        for (t, &y) in set.youngs_modulus.iter().enumerate() {
            if !(y > 0.0) || !y.is_finite() {
                return Err(GranError::InvalidProperty {
                    name: "youngsModulus",
                    detail: format!("type {}: must be positive and finite, got {}", t, y),
                });
            }
        }
        for (t, &nu) in set.poissons_ratio.iter().enumerate() {
            if !(-1.0..0.5).contains(&nu) {
                return Err(GranError::InvalidProperty {
                    name: "poissonsRatio",
                    detail: format!("type {}: must be in [-1, 0.5), got {}", t, nu),
                });
            }
        }
        if !(set.characteristic_velocity > 0.0) || !set.characteristic_velocity.is_finite() {
            return Err(GranError::InvalidProperty {
                name: "characteristicVelocity",
                detail: format!(
                    "must be positive and finite, got {}",
                    set.characteristic_velocity
                ),
            });
        }

        let mut pairs = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                let yi = set.youngs_modulus[i];
                let yj = set.youngs_modulus[j];
                let vi = set.poissons_ratio[i];
                let vj = set.poissons_ratio[j];

                let yeff = 1.0 / ((1.0 - vi * vi) / yi + (1.0 - vj * vj) / yj);
                let geff = 1.0
                    / (2.0 * (2.0 - vi) * (1.0 + vi) / yi + 2.0 * (2.0 - vj) * (1.0 + vj) / yj);

                let e = set.restitution.get(i, j);
                if !(e > 0.0 && e <= 1.0) {
                    return Err(GranError::InvalidProperty {
                        name: "coefficientRestitution",
                        detail: format!("pair ({}, {}): must be in (0, 1], got {}", i, j, e),
                    });
                }
                let rest_log = e.ln();
                let beta = rest_log / (rest_log * rest_log + PI * PI).sqrt();

                pairs.push(PairCoefficients {
                    yeff,
                    geff,
                    rest_log,
                    beta,
                    friction: set.friction.get(i, j),
                    rolling_friction: rolling.map_or(0.0, |t| t.get(i, j)),
                    cohesion_energy_density: cohesion.map_or(0.0, |t| t.get(i, j)),
                });
            }
        }

        debug!(
            ntypes = n,
            char_vel = set.characteristic_velocity,
            rolling = config.rolling_friction,
            cohesion = config.cohesion,
            "built pair coefficient table"
        );

        Ok(Self {
            ntypes: n,
            pairs,
            characteristic_velocity: set.characteristic_velocity,
            thermal_conductivity: set.thermal_conductivity.clone(),
            heat_overlap_ratio: set.heat_overlap_ratio.clone(),
        })
    }

    pub fn ntypes(&self) -> usize {
        self.ntypes
    }

    /// Coefficients for an unordered type pair. Panics on an undeclared type
    /// index; type assignment is validated by the particle-storage owner.
    pub fn resolve(&self, type_a: usize, type_b: usize) -> &PairCoefficients {
        &self.pairs[type_a * self.ntypes + type_b]
    }

    pub fn characteristic_velocity(&self) -> f64 {
        self.characteristic_velocity
    }

    pub fn thermal_conductivity(&self, material: usize) -> Option<f64> {
        self.thermal_conductivity.as_ref().map(|c| c[material])
    }

    /// Calibration ratio applied to the overlap used for the wall
    /// heat-contact area; 1.0 when no calibration is supplied.
    pub fn heat_overlap_ratio(&self, type_a: usize, type_b: usize) -> f64 {
        self.heat_overlap_ratio
            .as_ref()
            .map_or(1.0, |t| t.get(type_a, type_b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_type_set() -> MaterialSet {
        MaterialSet {
            ntypes: 2,
            youngs_modulus: vec![1.0e7, 2.0e7],
            poissons_ratio: vec![0.3, 0.25],
            restitution: TypePairValues::uniform(2, 0.9),
            friction: TypePairValues::from_rows(&[vec![0.5, 0.3], vec![0.3, 0.4]]).unwrap(),
            rolling_friction: None,
            cohesion_energy_density: None,
            characteristic_velocity: 1.0,
            thermal_conductivity: None,
            heat_overlap_ratio: None,
        }
    }

    #[test]
    fn effective_modulus_matches_formula() {
        let table = PairTable::build(&two_type_set(), &ModelConfig::default()).unwrap();
        let c = table.resolve(0, 1);
        let expected = 1.0 / ((1.0 - 0.09) / 1.0e7 + (1.0 - 0.0625) / 2.0e7);
        assert!((c.yeff - expected).abs() / expected < 1e-14);
        // symmetric lookup
        assert_eq!(table.resolve(1, 0), table.resolve(0, 1));
    }

    #[test]
    fn restitution_log_and_beta() {
        let table = PairTable::build(&two_type_set(), &ModelConfig::default()).unwrap();
        let c = table.resolve(0, 0);
        let ln_e = 0.9f64.ln();
        assert!((c.rest_log - ln_e).abs() < 1e-15);
        assert!((c.beta - ln_e / (ln_e * ln_e + PI * PI).sqrt()).abs() < 1e-15);
    }

    #[test]
    fn rolling_enabled_without_table_is_fatal() {
        let config = ModelConfig {
            rolling_friction: true,
            ..ModelConfig::default()
        };
        let err = PairTable::build(&two_type_set(), &config).unwrap_err();
        assert!(matches!(
            err,
            GranError::MissingProperty {
                name: "coefficientRollingFriction",
                ..
            }
        ));
    }

    #[test]
    fn cohesion_enabled_without_table_is_fatal() {
        let config = ModelConfig {
            cohesion: true,
            ..ModelConfig::default()
        };
        assert!(PairTable::build(&two_type_set(), &config).is_err());
    }

    #[test]
    fn bad_restitution_rejected() {
        let mut set = two_type_set();
        set.restitution = TypePairValues::uniform(2, 0.0);
        assert!(PairTable::build(&set, &ModelConfig::default()).is_err());
    }

    #[test]
    fn wrong_table_size_rejected() {
        let mut set = two_type_set();
        set.youngs_modulus = vec![1.0e7];
        assert!(matches!(
            PairTable::build(&set, &ModelConfig::default()),
            Err(GranError::MissingProperty {
                name: "youngsModulus",
                ..
            })
        ));
    }
}
