//! Redis cache backend, shared by every instance of a deployment.

mod cache;
mod error;

pub use cache::RedisCache;
