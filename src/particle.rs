use glam::DVec3;

/// A rigid spherical body as seen by the contact kernel.
///
/// Position, velocity and spin are owned by the particle-storage collaborator
/// and treated as read-only here; `force`, `torque` and `heat_flux` are the
/// running accumulators this kernel additively updates in integration mode.
#[derive(Clone, Copy, Debug)]
pub struct Particle {
    /// Durable identity, stable across neighbor-list rebuilds.
    pub id: u64,
    pub position: DVec3,
    pub velocity: DVec3,
    pub angular_velocity: DVec3,
    pub radius: f64,
    pub mass: f64,
    /// Material type index into the pair-coefficient table.
    pub material: usize,
    /// Present only when a heat-transfer model is active.
    pub temperature: Option<f64>,
    /// Member of a frozen group; its mass drops out of the effective mass.
    pub frozen: bool,

    pub force: DVec3,
    pub torque: DVec3,
    pub heat_flux: f64,
}

impl Particle {
    pub fn new(id: u64, position: DVec3, radius: f64, mass: f64, material: usize) -> Self {
        Self {
            id,
            position,
            velocity: DVec3::ZERO,
            angular_velocity: DVec3::ZERO,
            radius,
            mass,
            material,
            temperature: None,
            frozen: false,
            force: DVec3::ZERO,
            torque: DVec3::ZERO,
            heat_flux: 0.0,
        }
    }

    /// Clears the per-step accumulators. The driver owning the integration
    /// loop calls this before handing the particle set to the kernel.
    pub fn reset_accumulators(&mut self) {
        self.force = DVec3::ZERO;
        self.torque = DVec3::ZERO;
        self.heat_flux = 0.0;
    }
}

/// Kinematic sample of a boundary surface at the contact point.
///
/// The geometry and motion of the boundary itself live in an external mesh
/// collaborator; the kernel only needs the local velocity, material type and
/// the area-weighting factor for elements covering the contact partially.
#[derive(Clone, Copy, Debug)]
pub struct BoundaryElement {
    /// Durable identity of the boundary element, used to key contact history.
    pub id: u64,
    pub material: usize,
    /// Velocity of the boundary surface at the contact point.
    pub velocity: DVec3,
    /// Scale factor in [0, 1] correcting for partial element coverage.
    pub area_ratio: f64,
    pub temperature: Option<f64>,
}

impl BoundaryElement {
    pub fn fixed(id: u64, material: usize) -> Self {
        Self {
            id,
            material,
            velocity: DVec3::ZERO,
            area_ratio: 1.0,
            temperature: None,
        }
    }
}

pub(crate) fn effective_radius(r1: f64, r2: f64) -> f64 {
    (r1 * r2) / (r1 + r2)
}

/// Harmonic-mean mass of a contacting pair. A frozen body is treated as
/// immovable, so only the other body's mass remains.
pub(crate) fn effective_mass(p1: &Particle, p2: &Particle) -> f64 {
    let mut meff = (p1.mass * p2.mass) / (p1.mass + p2.mass);
    if p1.frozen {
        meff = p2.mass;
    }
    if p2.frozen {
        meff = p1.mass;
    }
    meff
}
