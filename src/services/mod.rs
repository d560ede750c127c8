// Service exports
pub mod memory;
pub mod postgres;
pub mod session;
pub mod traits;
pub mod vk;

pub use memory::MemoryStore;
pub use postgres::PostgresClient;
pub use session::{CacheError, SessionHandle, SessionKey, SessionStore};
pub use traits::{
    DirectorySearch, ExclusionStore, LocationLookup, PhotoLookup, ProfileLookup, StoreError,
    UpstreamError,
};
pub use vk::VkClient;
