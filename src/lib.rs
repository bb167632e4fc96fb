//! VKinder - candidate discovery service for the VKinder matchmaking bot
//!
//! Pages through VK user search on behalf of a requester, returns one unseen
//! candidate at a time with their newest profile photos, and applies the
//! requester's like/unlike/skip decisions. Seen sets, search cursors and
//! decisions are kept per requester.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{Ack, DiscoveryEngine, DiscoveryError, InteractionCoordinator, NextCandidate};
pub use models::{Candidate, Requester, SearchCriteria};
