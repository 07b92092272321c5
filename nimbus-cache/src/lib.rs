pub mod config;
pub mod core;

// Re-export commonly used types
pub use config::NimbusConfig;
pub use core::{
    CacheConfig, CacheError, CacheStats, DispatchStats, EmptyCacheEvent, EmptySource, Entry,
    NimbusCache, PromotionMode, Region, SubscriberId,
};
