//! Conductive heat exchange across touching contacts.
//!
//! Active only when both sides carry a temperature and a thermal-conductivity
//! table is supplied. The conductance follows from the geometric contact
//! area; negligible conductivity on either side short-circuits to zero flux.

use crate::material::PairTable;
use crate::particle::Particle;
use crate::physics::sphere_pair_contact_area;
use crate::wall::{wall_contact_area, WallContact};

const SMALL: f64 = 1e-12;

/// Contact conductance `4 k1 k2 / (k1 + k2) * sqrt(A)`.
fn conductance(k1: f64, k2: f64, contact_area: f64) -> f64 {
    if k1.abs() < SMALL || k2.abs() < SMALL {
        return 0.0;
    }
    4.0 * k1 * k2 / (k1 + k2) * contact_area.max(0.0).sqrt()
}

/// Per-step conductive flux into particle `pi` from a touching pair contact;
/// `pj` receives the negation. `None` when the heat model is inactive for
/// this pair.
pub fn pair_flux(pi: &Particle, pj: &Particle, table: &PairTable) -> Option<f64> {
    let ti = pi.temperature?;
    let tj = pj.temperature?;
    let ki = table.thermal_conductivity(pi.material)?;
    let kj = table.thermal_conductivity(pj.material)?;

    let r = (pi.position - pj.position).length();
    let area = sphere_pair_contact_area(r, pi.radius, pj.radius);
    let hc = conductance(ki, kj, area);
    Some((tj - ti) * hc)
}

/// Per-step conductive flux into the particle from a touching wall contact.
///
/// The contact area may be corrected by the per-type-pair overlap calibration
/// ratio, reconciling the force-law contact radius with a separately
/// calibrated heat-contact radius.
pub fn wall_flux(p: &Particle, contact: &WallContact, table: &PairTable) -> Option<f64> {
    let tp = p.temperature?;
    let tw = contact.element.temperature?;
    let kp = table.thermal_conductivity(p.material)?;
    let kw = table.thermal_conductivity(contact.element.material)?;

    let mut r = contact.delta.length();
    let ratio = table.heat_overlap_ratio(p.material, contact.element.material);
    if ratio != 1.0 {
        let overlap = (p.radius - r) * ratio;
        r = p.radius - overlap;
    }

    let area = wall_contact_area(p.radius, r, contact.element.area_ratio);
    let hc = conductance(kp, kw, area);
    Some((tw - tp) * hc)
}
