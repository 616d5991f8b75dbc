//! CLI command implementations.

pub(crate) mod batch;
pub(crate) mod cache;
pub(crate) mod convert;
pub(crate) mod engines;

pub(crate) use batch::BatchArgs;
pub(crate) use cache::CacheCommand;
pub(crate) use convert::ConvertArgs;
pub(crate) use engines::EnginesArgs;
