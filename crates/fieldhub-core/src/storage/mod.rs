//! Storage layer for FieldHub.
//!
//! This module provides a sled-based storage engine where each logical table
//! is a sled tree, and the field group store built on top of it.

mod config;
mod engine;
mod group_store;
mod record;

pub mod key;
pub mod naming;

pub use config::StorageConfig;
pub use engine::StorageEngine;
pub use group_store::FieldGroupStore;
pub use key::ValueKey;
pub use record::{GroupEntry, ValueRow};
pub(crate) use record::aligned;
