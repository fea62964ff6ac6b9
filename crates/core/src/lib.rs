//! Core business logic for roadwatch.
//!
//! A creation request flows through the [`AttachmentNormalizer`] and the
//! [`PriorityClassifier`] before [`ReportService`] stores its files and
//! persists it. Status changes go through the [`LifecycleManager`].

pub mod classifier;
pub mod identity;
pub mod lifecycle;
pub mod normalizer;
pub mod services;

pub use classifier::PriorityClassifier;
pub use identity::{Caller, IdentityProvider, JwtIdentityProvider, ReporterProfile, Role};
pub use lifecycle::{LifecycleManager, StatusUpdate, is_transition_allowed};
pub use normalizer::{
    AttachmentNormalizer, FileSlots, IncomingFile, LocationInput, NormalizedSubmission,
    RawSubmission, Slot,
};
pub use services::*;
