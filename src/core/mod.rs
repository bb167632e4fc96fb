// Core discovery exports
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod filters;
pub mod params;

pub use coordinator::{Ack, InteractionCoordinator};
pub use engine::{DiscoveryEngine, DiscoverySettings, NextCandidate};
pub use error::DiscoveryError;
pub use filters::{matches_criteria, screen_candidate, SkipReason};
pub use params::{validate_criteria, InvalidCriteria, Lang, PhotoParams, SearchParams};
