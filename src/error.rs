use thiserror::Error;

/// Errors surfaced during model setup or restart handling.
///
/// Configuration problems are fatal by design: a missing material property
/// or an illegal flag combination aborts setup instead of being silently
/// defaulted. The per-step force evaluation itself does not return errors;
/// numeric edge cases there degrade to zero contributions.
#[derive(Debug, Error)]
pub enum GranError {
    /// A per-type or per-type-pair property table is absent or the wrong size.
    #[error("missing material property `{name}`: expected {expected} entries, got {got}")]
    MissingProperty {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    /// A supplied property value is outside its physical range.
    #[error("invalid material property `{name}`: {detail}")]
    InvalidProperty { name: &'static str, detail: String },

    /// Cohesion needs a 3d domain; the contact-area formula has no 2d analogue.
    #[error("cohesion model is valid for 3d simulations only (dimension = {0})")]
    CohesionRequires3d(u32),

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    /// A restart snapshot was produced under different model flags.
    #[error("restart snapshot config mismatch: snapshot has {snapshot:?}, kernel has {current:?}")]
    SnapshotConfigMismatch {
        snapshot: crate::config::ModelConfig,
        current: crate::config::ModelConfig,
    },

    #[error("corrupt restart snapshot: {0}")]
    CorruptSnapshot(String),
}
