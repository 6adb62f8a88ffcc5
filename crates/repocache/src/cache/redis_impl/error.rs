//! Redis error mapping to CacheError.

use redis::{ErrorKind, RedisError};
use repocache_core::cache::CacheError;

/// Maps Redis errors to CacheError.
///
/// Anything that means the server could not be reached is a connection
/// failure; errors the server answered with are operation failures.
pub fn map_redis_error(err: RedisError) -> CacheError {
    let unreachable = err.is_connection_refusal()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.kind() == ErrorKind::IoError;

    if unreachable {
        CacheError::ConnectionFailed(err.to_string())
    } else {
        CacheError::OperationFailed(err.to_string())
    }
}
