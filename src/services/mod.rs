// Service exports
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod transport;
pub mod vk;

pub use cache::{CacheError, CacheKey, CacheManager, CachingTransport};
pub use memory::InMemoryStore;
pub use postgres::{DecisionKind, PostgresStore};
pub use store::{CandidateStore, StoreError, StoreResult};
pub use transport::{RawRecord, Transport, TransportError, TransportResult};
pub use vk::{VkClient, DEFAULT_API_VERSION};
