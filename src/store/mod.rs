//! In-memory storage module
//!
//! The concurrent dictionary shared by all connections and the entity
//! container it stores. Independent of protocol and command handling.

mod dict;
mod entity;

pub use dict::{Dict, RenameOutcome};
pub use entity::{Data, Entity};
