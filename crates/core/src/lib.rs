//! Repository contract, query model and cache primitives shared by the
//! repocache backends.

pub mod cache;
pub mod entity;
pub mod query;
pub mod storage;
