//! The Hooke-history contact force law for particle-particle contacts.
//!
//! Normal force is a velocity-regularized stiffness plus viscous damping and
//! an optional cohesive term; tangential force is an incremental spring on
//! the accumulated shear displacement, Coulomb-clamped with the history
//! back-solved to stay consistent with the clamped force during sliding.

use std::f64::consts::PI;

use glam::DVec3;

use crate::config::ModelConfig;
use crate::contact::ContactState;
use crate::error::GranError;
use crate::material::{PairCoefficients, PairTable};
use crate::particle::{effective_mass, effective_radius, Particle};

/// Per-step inputs shared by every contact evaluation.
#[derive(Clone, Copy, Debug)]
pub struct StepContext {
    pub dt: f64,
    /// False on evaluations that must not integrate new shear: repeated
    /// evaluations within one step and reporting-only passes.
    pub shear_update: bool,
}

/// Stiffness and damping derived for one contact.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Stiffness {
    pub kn: f64,
    pub kt: f64,
    pub gamma_n: f64,
    pub gamma_t: f64,
}

/// Force and torques a pair contact applies to its two bodies. The reaction
/// force on the second body is the negation of `force`.
#[derive(Clone, Copy, Debug)]
pub struct PairForces {
    pub force: DVec3,
    pub torque_i: DVec3,
    pub torque_j: DVec3,
}

/// The contact force model, configured once at setup.
#[derive(Clone, Debug)]
pub struct HookeHistory {
    config: ModelConfig,
}

impl HookeHistory {
    pub fn new(config: ModelConfig) -> Result<Self, GranError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Derives stiffness and damping for a contact with effective mass
    /// `m_eff` and effective radius `r_eff`.
    ///
    /// The stiffness is regularized by the global characteristic velocity so
    /// it does not degenerate at vanishing impact speed; despite the Hookean
    /// naming it scales Hertz-like with sqrt(r_eff). Particle-particle
    /// contacts convert the stiffness from pressure units to force/length^2;
    /// wall contacts are already in force units.
    pub(crate) fn stiffness(
        &self,
        coeff: &PairCoefficients,
        char_vel: f64,
        m_eff: f64,
        r_eff: f64,
        pressure_units: bool,
    ) -> Stiffness {
        let sqrt_reff = r_eff.sqrt();
        let mut kn = 16.0 / 15.0
            * sqrt_reff
            * coeff.yeff
            * (15.0 * m_eff * char_vel * char_vel / (16.0 * sqrt_reff * coeff.yeff)).powf(0.2);
        let gamma_n =
            (4.0 * m_eff * kn / (1.0 + (PI / coeff.rest_log) * (PI / coeff.rest_log))).sqrt();
        let gamma_t = if self.config.tangential_damping {
            gamma_n
        } else {
            0.0
        };
        if pressure_units {
            kn /= self.config.pressure_to_force;
        }
        Stiffness {
            kn,
            kt: kn,
            gamma_n,
            gamma_t,
        }
    }

    /// Evaluates one particle-particle contact.
    ///
    /// Returns `None` when the separation is at or beyond the sum of radii;
    /// the caller is responsible for resetting the stored history in that
    /// case. Otherwise marks `state` touching, advances its shear (when the
    /// context permits) and returns the forces on body `i`; Newton's third
    /// law gives body `j` the opposite force.
    pub fn pair_contact(
        &self,
        pi: &Particle,
        pj: &Particle,
        table: &PairTable,
        state: &mut ContactState,
        ctx: &StepContext,
    ) -> Option<PairForces> {
        let delta = pi.position - pj.position;
        let rsq = delta.length_squared();
        let radsum = pi.radius + pj.radius;
        if rsq >= radsum * radsum {
            return None;
        }

        let r = rsq.sqrt();
        let rinv = 1.0 / r;
        let rsqinv = 1.0 / rsq;
        let overlap = radsum - r;

        // relative translational velocity, split along the line of centers
        let vr = pi.velocity - pj.velocity;
        let vnnr = vr.dot(delta);
        let vn = delta * (vnnr * rsqinv);
        let vt = vr - vn;

        // rigid-rotation velocity at the contact point; radii measured to
        // the contact plane
        let cri = pi.radius - 0.5 * overlap;
        let crj = pj.radius - 0.5 * overlap;
        let wr = (cri * pi.angular_velocity + crj * pj.angular_velocity) * rinv;

        let coeff = table.resolve(pi.material, pj.material);
        let m_eff = effective_mass(pi, pj);
        let r_eff = effective_radius(pi.radius, pj.radius);
        let stiff = self.stiffness(coeff, table.characteristic_velocity(), m_eff, r_eff, true);

        // normal force = stiffness + velocity damping, as force / distance
        let damp = stiff.gamma_n * vnnr * rsqinv;
        let mut ccel = stiff.kn * overlap * rinv - damp;

        if self.config.cohesion {
            let fn_coh = coeff.cohesion_energy_density
                * sphere_pair_contact_area(r, pi.radius, pj.radius);
            ccel -= fn_coh * rinv;
        }

        // relative tangential velocity at the contact point
        let vtr = vt + delta.cross(wr);

        state.touching = true;
        if ctx.shear_update {
            state.shear += vtr * ctx.dt;
            // re-project onto the current tangential plane as the contact
            // frame rotates between steps
            let rsht = state.shear.dot(delta) * rsqinv;
            state.shear -= delta * rsht;
        }
        let shear_mag = state.shear.length();

        // trial tangential force with Coulomb clamp
        let mut fs = -stiff.kt * state.shear;
        let fs_mag = fs.length();
        let fn_limit = coeff.friction * (ccel * r).abs();
        if fs_mag > fn_limit {
            if shear_mag != 0.0 {
                fs *= fn_limit / fs_mag;
                // truncate history to stay consistent with the clamped force
                state.shear = -fs / stiff.kt;
            } else {
                fs = DVec3::ZERO;
            }
        } else {
            fs -= stiff.gamma_t * vtr;
        }

        let force = delta * ccel + fs;
        let tor = delta.cross(fs) * rinv;

        let r_torque = if self.config.rolling_friction {
            let wr_roll = pi.angular_velocity - pj.angular_velocity;
            rolling_torque(
                wr_roll,
                delta,
                rsqinv,
                coeff.rolling_friction * stiff.kn * overlap * r_eff,
            )
        } else {
            DVec3::ZERO
        };

        Some(PairForces {
            force,
            torque_i: -(cri * tor) - r_torque,
            torque_j: -(crj * tor) + r_torque,
        })
    }
}

/// Lens contact area of two overlapping spheres whose centers are `r` apart.
pub(crate) fn sphere_pair_contact_area(r: f64, ri: f64, rj: f64) -> f64 {
    -PI / 4.0 * ((r - ri - rj) * (r + ri - rj) * (r - ri + rj) * (r + ri + rj)) / (r * r)
}

/// Rolling-resistance torque of the given magnitude, directed opposite the
/// relative spin, with its component along the contact normal (pure torsion)
/// projected out. Zero spin yields zero torque instead of a NaN direction.
pub(crate) fn rolling_torque(
    spin: DVec3,
    delta: DVec3,
    rsqinv: f64,
    magnitude: f64,
) -> DVec3 {
    let spin_mag = spin.length();
    if spin_mag <= 0.0 {
        return DVec3::ZERO;
    }
    let mut torque = spin * (magnitude / spin_mag);
    let along_normal = torque.dot(delta) * rsqinv;
    torque -= delta * along_normal;
    torque
}
