//! The per-step driver: walks the candidate contacts reported by the
//! neighbor-list collaborator, evaluates the force model against the stored
//! history, and routes the results through a sink.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ModelConfig;
use crate::contact::{ContactKey, ContactRecord, HistoryStore};
use crate::error::GranError;
use crate::heat;
use crate::material::{MaterialSet, PairTable};
use crate::particle::Particle;
use crate::physics::{HookeHistory, StepContext};
use crate::sink::{ContactSink, HeatContribution, PairContribution, WallContribution};
use crate::wall::WallContact;

/// A candidate particle pair reported by the neighbor list. Indices refer to
/// the bodies slice passed to [`ContactKernel::evaluate`].
#[derive(Clone, Copy, Debug)]
pub struct PairCandidate {
    pub i: usize,
    pub j: usize,
}

/// Everything the kernel persists across a restart: the model flags it was
/// configured with and every live contact's history record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelSnapshot {
    pub config: ModelConfig,
    pub contacts: Vec<ContactRecord>,
}

/// The contact-force kernel: force model, resolved material table and contact
/// history, evaluated once per step over the candidate contact lists.
#[derive(Debug)]
pub struct ContactKernel {
    model: HookeHistory,
    table: PairTable,
    store: HistoryStore,
    dt: f64,
    last_step: Option<u64>,
    heat_total: f64,
}

impl ContactKernel {
    pub fn new(config: ModelConfig, materials: &MaterialSet, dt: f64) -> Result<Self, GranError> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(GranError::InvalidConfig(format!(
                "timestep must be positive and finite, got {}",
                dt
            )));
        }
        let model = HookeHistory::new(config)?;
        let table = PairTable::build(materials, &config)?;
        Ok(Self {
            model,
            table,
            store: HistoryStore::new(),
            dt,
            last_step: None,
            heat_total: 0.0,
        })
    }

    /// Rebuilds the coefficient table after the source property tables
    /// changed. Contact history is unaffected.
    pub fn rebuild_table(&mut self, materials: &MaterialSet) -> Result<(), GranError> {
        self.table = PairTable::build(materials, self.model.config())?;
        debug!("pair coefficient table rebuilt");
        Ok(())
    }

    pub fn model(&self) -> &HookeHistory {
        &self.model
    }

    pub fn table(&self) -> &PairTable {
        &self.table
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Accumulated boundary heat exchanged since setup (flux integrated over
    /// the timestep).
    pub fn heat_total(&self) -> f64 {
        self.heat_total
    }

    /// Evaluates every candidate contact for `step` and feeds the sink.
    ///
    /// With an integrating sink, force/torque/heat land in the bodies'
    /// accumulators, history is written back (and reset for separated
    /// contacts), and the step counter is recorded. With a reporting sink
    /// nothing but the sink itself observes the pass.
    ///
    /// Shear history integrates only on the first evaluation at a given step;
    /// a second evaluation at the same counter value reuses the stored
    /// displacement unchanged, so a force recomputation right after a
    /// neighbor-list rebuild cannot inject an artificial displacement jump.
    ///
    /// Contributions are computed in parallel (each contact owns its history
    /// entry) and applied to the shared accumulators serially, in input
    /// order, so results are deterministic.
    pub fn evaluate(
        &mut self,
        bodies: &mut [Particle],
        pairs: &[PairCandidate],
        walls: &[WallContact],
        step: u64,
        sink: &mut dyn ContactSink,
    ) {
        let integrate = sink.integrates();
        let shear_update = integrate && self.last_step.map_or(true, |last| step > last);
        let ctx = StepContext {
            dt: self.dt,
            shear_update,
        };

        let model = &self.model;
        let table = &self.table;
        let store = &self.store;
        let view: &[Particle] = bodies;

        let pair_outcomes: Vec<Option<(PairContribution, Option<f64>)>> = pairs
            .par_iter()
            .map(|candidate| {
                let pi = view[candidate.i];
                let pj = view[candidate.j];
                let key = ContactKey::pair(pi.id, pj.id);
                let mut state = store.get(&key);
                match model.pair_contact(&pi, &pj, table, &mut state, &ctx) {
                    Some(forces) => {
                        if integrate {
                            store.set(key, state);
                        }
                        let flux = heat::pair_flux(&pi, &pj, table);
                        Some((
                            PairContribution {
                                i: candidate.i,
                                j: candidate.j,
                                force: forces.force,
                                torque_i: forces.torque_i,
                                torque_j: forces.torque_j,
                                shear: state.shear,
                            },
                            flux,
                        ))
                    }
                    None => {
                        if integrate {
                            store.reset(&key);
                        }
                        None
                    }
                }
            })
            .collect();

        let wall_outcomes: Vec<Option<(WallContribution, Option<f64>)>> = walls
            .par_iter()
            .map(|contact| {
                let p = view[contact.body];
                let key = ContactKey::wall(p.id, contact.element.id);
                let mut state = store.get(&key);
                match model.wall_contact(&p, contact, table, &mut state, &ctx) {
                    Some(forces) => {
                        if integrate {
                            store.set(key, state);
                        }
                        let flux = heat::wall_flux(&p, contact, table);
                        Some((
                            WallContribution {
                                body: contact.body,
                                element: contact.element.id,
                                force: forces.force,
                                torque: forces.torque,
                                shear: state.shear,
                            },
                            flux,
                        ))
                    }
                    None => {
                        if integrate {
                            store.reset(&key);
                        }
                        None
                    }
                }
            })
            .collect();

        for (contribution, flux) in pair_outcomes.into_iter().flatten() {
            sink.pair(bodies, &contribution);
            if let Some(flux) = flux {
                sink.heat(
                    bodies,
                    &HeatContribution {
                        body: contribution.i,
                        flux,
                    },
                );
                sink.heat(
                    bodies,
                    &HeatContribution {
                        body: contribution.j,
                        flux: -flux,
                    },
                );
            }
        }

        for (contribution, flux) in wall_outcomes.into_iter().flatten() {
            sink.wall(bodies, &contribution);
            if let Some(flux) = flux {
                sink.heat(
                    bodies,
                    &HeatContribution {
                        body: contribution.body,
                        flux,
                    },
                );
                if integrate {
                    self.heat_total += flux * self.dt;
                }
            }
        }

        if integrate {
            self.last_step = Some(step);
        }
    }

    /// Captures the full restartable state: model flags and all live contact
    /// histories, in deterministic order.
    pub fn snapshot(&self) -> KernelSnapshot {
        KernelSnapshot {
            config: *self.model.config(),
            contacts: self.store.snapshot(),
        }
    }

    /// Restores contact history from a snapshot. The snapshot must have been
    /// taken under the same model flags; restoring and continuing reproduces
    /// the force trajectory of a run that never restarted.
    pub fn restore(&mut self, snapshot: &KernelSnapshot) -> Result<(), GranError> {
        if snapshot.config != *self.model.config() {
            return Err(GranError::SnapshotConfigMismatch {
                snapshot: snapshot.config,
                current: *self.model.config(),
            });
        }
        self.store.restore(&snapshot.contacts)?;
        self.last_step = None;
        debug!(contacts = snapshot.contacts.len(), "restored contact history");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{Collector, Integrator};
    use glam::DVec3;

    fn kernel() -> ContactKernel {
        ContactKernel::new(
            ModelConfig::default(),
            &MaterialSet::single(1.0e7, 0.3, 0.9, 0.5, 1.0),
            1.0e-6,
        )
        .unwrap()
    }

    fn overlapping_pair() -> Vec<Particle> {
        let mut a = Particle::new(0, DVec3::ZERO, 1.0e-3, 1.0e-6, 0);
        let b = Particle::new(1, DVec3::new(1.99e-3, 0.0, 0.0), 1.0e-3, 1.0e-6, 0);
        a.velocity = DVec3::new(0.0, 0.05, 0.0);
        vec![a, b]
    }

    #[test]
    fn second_evaluation_same_step_skips_shear_integration() {
        let mut kernel = kernel();
        let mut bodies = overlapping_pair();
        let pairs = [PairCandidate { i: 0, j: 1 }];

        kernel.evaluate(&mut bodies, &pairs, &[], 1, &mut Integrator);
        let shear_first = kernel.store().get(&ContactKey::pair(0, 1)).shear;
        assert!(shear_first.length() > 0.0);

        kernel.evaluate(&mut bodies, &pairs, &[], 1, &mut Integrator);
        let shear_second = kernel.store().get(&ContactKey::pair(0, 1)).shear;
        assert_eq!(shear_first, shear_second);

        kernel.evaluate(&mut bodies, &pairs, &[], 2, &mut Integrator);
        let shear_third = kernel.store().get(&ContactKey::pair(0, 1)).shear;
        assert!(shear_third.length() > shear_second.length());
    }

    #[test]
    fn collector_mode_mutates_nothing() {
        let mut kernel = kernel();
        let mut bodies = overlapping_pair();
        let pairs = [PairCandidate { i: 0, j: 1 }];

        let mut collector = Collector::new();
        kernel.evaluate(&mut bodies, &pairs, &[], 1, &mut collector);

        assert_eq!(collector.pairs.len(), 1);
        assert!(collector.pairs[0].force.length() > 0.0);
        // no accumulator or history mutation
        assert_eq!(bodies[0].force, DVec3::ZERO);
        assert_eq!(bodies[1].torque, DVec3::ZERO);
        assert!(kernel.store().is_empty());

        // a later integrating pass at the same step still updates shear,
        // since reporting passes do not consume the step counter
        kernel.evaluate(&mut bodies, &pairs, &[], 1, &mut Integrator);
        assert!(kernel.store().get(&ContactKey::pair(0, 1)).shear.length() > 0.0);
    }

    #[test]
    fn separation_resets_history_even_without_force() {
        let mut kernel = kernel();
        let mut bodies = overlapping_pair();
        let pairs = [PairCandidate { i: 0, j: 1 }];
        kernel.evaluate(&mut bodies, &pairs, &[], 1, &mut Integrator);
        assert!(kernel.store().get(&ContactKey::pair(0, 1)).touching);

        bodies[1].position.x = 5.0e-3;
        kernel.evaluate(&mut bodies, &pairs, &[], 2, &mut Integrator);
        let state = kernel.store().get(&ContactKey::pair(0, 1));
        assert!(!state.touching);
        assert_eq!(state.shear, DVec3::ZERO);
    }

    #[test]
    fn snapshot_requires_matching_config() {
        let mut kernel = kernel();
        let mut snapshot = kernel.snapshot();
        snapshot.config.rolling_friction = true;
        assert!(matches!(
            kernel.restore(&snapshot),
            Err(GranError::SnapshotConfigMismatch { .. })
        ));
    }

    #[test]
    fn invalid_timestep_rejected() {
        let result = ContactKernel::new(
            ModelConfig::default(),
            &MaterialSet::single(1.0e7, 0.3, 0.9, 0.5, 1.0),
            0.0,
        );
        assert!(result.is_err());
    }
}
