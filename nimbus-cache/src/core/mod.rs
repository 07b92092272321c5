mod cleaner;
pub mod engine;
pub mod error;
pub mod events;
pub mod frequency;
pub mod promotion;
pub mod region;
pub mod types;

pub use engine::NimbusCache;
pub use error::{CacheError, Result};
pub use events::{
    DispatchStats, EmptyCacheEvent, EmptyCacheHandler, EmptySource, EventDispatcher, SubscriberId,
};
pub use frequency::FrequencyIndex;
pub use promotion::{Promotion, PromotionMode, PromotionPolicy};
pub use region::{ActiveRegion, DormantRegion};
pub use types::{CacheConfig, CacheStats, Entry, Region};
