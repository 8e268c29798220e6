//! Where computed contributions go: either straight into the bodies' running
//! accumulators, or out to an external collector for inspection or coupling.
//!
//! Both modes share the same numerical core; the sink is the only thing that
//! differs. A collector sink never mutates simulation state, so it can be
//! used for non-destructive force inspection mid-run.

use glam::DVec3;

use crate::particle::Particle;

/// Contribution of one particle-particle contact.
#[derive(Clone, Copy, Debug)]
pub struct PairContribution {
    pub i: usize,
    pub j: usize,
    /// Force on body `i`; body `j` receives the negation.
    pub force: DVec3,
    pub torque_i: DVec3,
    pub torque_j: DVec3,
    /// Shear history after this evaluation.
    pub shear: DVec3,
}

/// Contribution of one sphere-boundary contact, area-weighted.
#[derive(Clone, Copy, Debug)]
pub struct WallContribution {
    pub body: usize,
    pub element: u64,
    pub force: DVec3,
    pub torque: DVec3,
    pub shear: DVec3,
}

/// Conductive flux into one body from one touching contact.
#[derive(Clone, Copy, Debug)]
pub struct HeatContribution {
    pub body: usize,
    pub flux: f64,
}

/// Receives every computed contribution of an evaluation pass.
pub trait ContactSink {
    fn pair(&mut self, bodies: &mut [Particle], contribution: &PairContribution);
    fn wall(&mut self, bodies: &mut [Particle], contribution: &WallContribution);
    fn heat(&mut self, bodies: &mut [Particle], contribution: &HeatContribution);

    /// Whether this sink integrates into simulation state. When false, the
    /// kernel leaves contact history, separation resets and its running heat
    /// total untouched.
    fn integrates(&self) -> bool {
        true
    }
}

/// Applies contributions to the bodies' accumulators, with action/reaction
/// for pair contacts.
#[derive(Debug, Default)]
pub struct Integrator;

impl ContactSink for Integrator {
    fn pair(&mut self, bodies: &mut [Particle], c: &PairContribution) {
        bodies[c.i].force += c.force;
        bodies[c.i].torque += c.torque_i;
        bodies[c.j].force -= c.force;
        bodies[c.j].torque += c.torque_j;
    }

    fn wall(&mut self, bodies: &mut [Particle], c: &WallContribution) {
        bodies[c.body].force += c.force;
        bodies[c.body].torque += c.torque;
    }

    fn heat(&mut self, bodies: &mut [Particle], c: &HeatContribution) {
        bodies[c.body].heat_flux += c.flux;
    }
}

/// Records contributions without touching any simulation state.
#[derive(Debug, Default)]
pub struct Collector {
    pub pairs: Vec<PairContribution>,
    pub walls: Vec<WallContribution>,
    pub heat: Vec<HeatContribution>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.pairs.clear();
        self.walls.clear();
        self.heat.clear();
    }
}

impl ContactSink for Collector {
    fn pair(&mut self, _bodies: &mut [Particle], c: &PairContribution) {
        self.pairs.push(*c);
    }

    fn wall(&mut self, _bodies: &mut [Particle], c: &WallContribution) {
        self.walls.push(*c);
    }

    fn heat(&mut self, _bodies: &mut [Particle], c: &HeatContribution) {
        self.heat.push(*c);
    }

    fn integrates(&self) -> bool {
        false
    }
}
