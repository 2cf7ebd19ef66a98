//! Domain layer: navigation model, script codec and shard index
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod bundled;
pub mod entities;
pub mod error;
pub mod script;
pub mod shard;
pub mod writer;

pub use arena::{NavArena, NodeData};
pub use builder::{BuiltIndex, ShardIndexBuilder, DEFAULT_SHARD_SIZE};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use script::{Literal, Script, ScriptError};
pub use shard::{KeyOrder, LookupMiss, PageEntry, ShardEntry, ShardHit, ShardIndex, ShardPage};
