mod error;
mod keys;
pub mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{
    repository_tags, tag_tracking_key, tagged_key, tagged_key_tags, validate_tags, CacheKey,
    GLOBAL_TAG,
};
pub use traits::TaggedCache;
