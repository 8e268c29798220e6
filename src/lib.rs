//! Granular contact-force kernel with per-contact shear memory.
//!
//! Computes normal and tangential contact forces, torques and optional
//! conductive heat flux for overlapping rigid spheres and sphere-boundary
//! contacts, with an incremental Coulomb friction law whose accumulated slip
//! persists across steps and restarts. Neighbor detection, boundary geometry
//! and time integration live in external collaborators; this crate owns the
//! force law, the resolved material coefficients and the contact history.

pub mod config;
pub mod contact;
pub mod error;
pub mod heat;
pub mod material;
pub mod particle;
pub mod physics;
pub mod simulation;
pub mod sink;
pub mod wall;

pub use config::ModelConfig;
pub use contact::{ContactKey, ContactRecord, ContactState, HistoryStore};
pub use error::GranError;
pub use material::{MaterialSet, PairCoefficients, PairTable, TypePairValues};
pub use particle::{BoundaryElement, Particle};
pub use physics::{HookeHistory, PairForces, StepContext};
pub use simulation::{ContactKernel, KernelSnapshot, PairCandidate};
pub use sink::{Collector, ContactSink, HeatContribution, Integrator, PairContribution, WallContribution};
pub use wall::{WallContact, WallForces};
