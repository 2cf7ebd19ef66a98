//! doxnav: load, validate, query and re-emit Doxygen navigation tree data
//!
//! Layers, innermost first:
//! - [`domain`]: navigation model, script codec, shard index
//! - [`application`]: services that read and write documentation directories
//! - [`infrastructure`]: filesystem boundary and service wiring
//! - [`cli`]: argument parsing and command handlers

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
