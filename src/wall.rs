//! Sphere-vs-boundary specialization of the contact force law.
//!
//! A boundary contact is a pair contact with an infinite-radius,
//! infinite-mass counterpart: the effective radius collapses to the sphere's
//! radius, the effective mass to the sphere's mass, and the stiffness stays
//! in force units (no pressure conversion). Force and tangential torque are
//! scaled by the element's area-weighting factor.

use glam::DVec3;

use crate::contact::ContactState;
use crate::particle::{BoundaryElement, Particle};
use crate::physics::{rolling_torque, HookeHistory, StepContext};
use crate::material::PairTable;

use std::f64::consts::PI;

/// One candidate sphere-boundary contact reported by the boundary
/// collaborator.
#[derive(Clone, Copy, Debug)]
pub struct WallContact {
    /// Index of the contacting particle in the bodies slice.
    pub body: usize,
    pub element: BoundaryElement,
    /// Vector from the contact point on the boundary to the sphere center.
    /// Its length is the current separation; the contact touches while that
    /// length is below the sphere radius.
    pub delta: DVec3,
}

/// Force and torque a boundary contact applies to the particle, already
/// scaled by the element's area-weighting factor.
#[derive(Clone, Copy, Debug)]
pub struct WallForces {
    pub force: DVec3,
    pub torque: DVec3,
}

impl HookeHistory {
    /// Evaluates one sphere-boundary contact. Returns `None` once the sphere
    /// center is at or beyond its radius from the boundary; the caller resets
    /// the stored history then.
    pub fn wall_contact(
        &self,
        p: &Particle,
        contact: &WallContact,
        table: &PairTable,
        state: &mut ContactState,
        ctx: &StepContext,
    ) -> Option<WallForces> {
        let delta = contact.delta;
        let rsq = delta.length_squared();
        if rsq >= p.radius * p.radius {
            return None;
        }

        let r = rsq.sqrt();
        let rinv = 1.0 / r;
        let rsqinv = 1.0 / rsq;
        let overlap = p.radius - r;
        // contact-plane radius on the particle side
        let cr = p.radius - 0.5 * overlap;

        let vr = p.velocity - contact.element.velocity;
        let vnnr = vr.dot(delta);
        let vn = delta * (vnnr * rsqinv);
        let vt = vr - vn;

        let wr = cr * p.angular_velocity * rinv;

        let coeff = table.resolve(p.material, contact.element.material);
        let stiff = self.stiffness(coeff, table.characteristic_velocity(), p.mass, p.radius, false);

        let damp = stiff.gamma_n * vnnr * rsqinv;
        let mut ccel = stiff.kn * overlap * rinv - damp;

        if self.config().cohesion {
            let acont = wall_contact_area(p.radius, r, contact.element.area_ratio);
            ccel -= coeff.cohesion_energy_density * acont * rinv;
        }

        let vtr = vt + delta.cross(wr);

        state.touching = true;
        if ctx.shear_update {
            state.shear += vtr * ctx.dt;
            let rsht = state.shear.dot(delta) * rsqinv;
            state.shear -= delta * rsht;
        }
        let shear_mag = state.shear.length();

        let mut fs = -stiff.kt * state.shear;
        let fs_mag = fs.length();
        let fn_limit = coeff.friction * (ccel * r).abs();
        if fs_mag > fn_limit {
            if shear_mag != 0.0 {
                fs *= fn_limit / fs_mag;
                state.shear = -fs / stiff.kt;
            } else {
                fs = DVec3::ZERO;
            }
        } else {
            fs -= stiff.gamma_t * vtr;
        }

        let area_ratio = contact.element.area_ratio;
        let force = (delta * ccel + fs) * area_ratio;
        let tor = delta.cross(fs) * rinv;

        let r_torque = if self.config().rolling_friction {
            // relative spin at a wall is the particle's own rigid contact
            // rotation
            rolling_torque(wr, delta, rsqinv, coeff.rolling_friction * stiff.kn * overlap * cr)
        } else {
            DVec3::ZERO
        };

        Some(WallForces {
            force,
            torque: -(cr * tor * area_ratio) - r_torque,
        })
    }
}

/// Cap contact area of a sphere of radius `ri` whose center sits a distance
/// `r` from the boundary, weighted by the element's area factor.
pub(crate) fn wall_contact_area(ri: f64, r: f64, area_ratio: f64) -> f64 {
    (ri * ri - r * r) * PI * area_ratio
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::material::{MaterialSet, TypePairValues};

    fn setup() -> (HookeHistory, PairTable) {
        let model = HookeHistory::new(ModelConfig::default()).unwrap();
        let table = PairTable::build(
            &MaterialSet::single(1.0e7, 0.3, 0.9, 0.5, 1.0),
            &ModelConfig::default(),
        )
        .unwrap();
        (model, table)
    }

    #[test]
    fn separated_wall_contact_returns_none() {
        let (model, table) = setup();
        let p = Particle::new(0, DVec3::new(0.0, 2.0e-3, 0.0), 1.0e-3, 1.0e-6, 0);
        let contact = WallContact {
            body: 0,
            element: BoundaryElement::fixed(0, 0),
            delta: DVec3::new(0.0, 2.0e-3, 0.0),
        };
        let mut state = ContactState::new();
        let ctx = StepContext {
            dt: 1.0e-6,
            shear_update: true,
        };
        assert!(model
            .wall_contact(&p, &contact, &table, &mut state, &ctx)
            .is_none());
    }

    #[test]
    fn area_ratio_scales_force_linearly() {
        let (model, table) = setup();
        let mut p = Particle::new(0, DVec3::new(0.0, 0.9e-3, 0.0), 1.0e-3, 1.0e-6, 0);
        p.velocity = DVec3::new(0.0, -0.1, 0.0);
        let delta = DVec3::new(0.0, 0.9e-3, 0.0);
        let ctx = StepContext {
            dt: 1.0e-6,
            shear_update: true,
        };

        let full = WallContact {
            body: 0,
            element: BoundaryElement::fixed(0, 0),
            delta,
        };
        let mut half_element = BoundaryElement::fixed(0, 0);
        half_element.area_ratio = 0.5;
        let half = WallContact {
            body: 0,
            element: half_element,
            delta,
        };

        let mut s1 = ContactState::new();
        let mut s2 = ContactState::new();
        let f_full = model.wall_contact(&p, &full, &table, &mut s1, &ctx).unwrap();
        let f_half = model.wall_contact(&p, &half, &table, &mut s2, &ctx).unwrap();
        let ratio = f_half.force.length() / f_full.force.length();
        assert!((ratio - 0.5).abs() < 1e-12);
    }

    #[test]
    fn wall_rolling_torque_is_orthogonal_and_not_area_scaled() {
        let rolling_only = ModelConfig {
            rolling_friction: true,
            tangential_damping: false,
            ..ModelConfig::default()
        };
        let with_damping = ModelConfig {
            rolling_friction: true,
            ..ModelConfig::default()
        };
        let mut set = MaterialSet::single(1.0e7, 0.3, 0.9, 0.5, 1.0);
        set.rolling_friction = Some(TypePairValues::uniform(1, 0.2));
        let table = PairTable::build(&set, &rolling_only).unwrap();

        // spinning particle resting on the wall, no translation
        let mut p = Particle::new(0, DVec3::new(0.0, 0.9e-3, 0.0), 1.0e-3, 1.0e-6, 0);
        p.angular_velocity = DVec3::new(0.0, 0.0, 10.0);
        let delta = DVec3::new(0.0, 0.9e-3, 0.0);
        let ctx = StepContext {
            dt: 1.0e-6,
            shear_update: false,
        };

        let contact = |area_ratio: f64| {
            let mut element = BoundaryElement::fixed(0, 0);
            element.area_ratio = area_ratio;
            WallContact {
                body: 0,
                element,
                delta,
            }
        };
        let torque = |config: ModelConfig, area_ratio: f64| {
            let model = HookeHistory::new(config).unwrap();
            let mut state = ContactState::new();
            model
                .wall_contact(&p, &contact(area_ratio), &table, &mut state, &ctx)
                .unwrap()
                .torque
        };

        // with zero shear and no tangential damping only rolling resistance
        // remains; it resists the spin regardless of element coverage
        let roll_full = torque(rolling_only, 1.0);
        let roll_half = torque(rolling_only, 0.5);
        assert!(roll_full.length() > 0.0);
        assert_eq!(roll_full, roll_half);
        assert!(roll_full.dot(delta).abs() < 1e-12 * roll_full.length() * delta.length());

        // the tangential-damping torque on top of it scales with coverage
        let tangential_full = torque(with_damping, 1.0) - roll_full;
        let tangential_half = torque(with_damping, 0.5) - roll_full;
        assert!(tangential_full.length() > 0.0);
        let diff = tangential_half * 2.0 - tangential_full;
        assert!(diff.length() < 1e-12 * tangential_full.length());
    }

    #[test]
    fn moving_wall_velocity_enters_damping() {
        let (model, table) = setup();
        let p = Particle::new(0, DVec3::new(0.0, 0.9e-3, 0.0), 1.0e-3, 1.0e-6, 0);
        let delta = DVec3::new(0.0, 0.9e-3, 0.0);
        let ctx = StepContext {
            dt: 1.0e-6,
            shear_update: false,
        };

        let still = WallContact {
            body: 0,
            element: BoundaryElement::fixed(0, 0),
            delta,
        };
        let mut moving_element = BoundaryElement::fixed(0, 0);
        // wall moving toward the particle looks like the particle approaching
        moving_element.velocity = DVec3::new(0.0, 0.2, 0.0);
        let moving = WallContact {
            body: 0,
            element: moving_element,
            delta,
        };

        let mut s1 = ContactState::new();
        let mut s2 = ContactState::new();
        let f_still = model.wall_contact(&p, &still, &table, &mut s1, &ctx).unwrap();
        let f_moving = model.wall_contact(&p, &moving, &table, &mut s2, &ctx).unwrap();
        assert!(f_moving.force.y > f_still.force.y);
    }
}
