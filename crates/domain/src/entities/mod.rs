//! 领域实体定义

pub mod connection_set;

pub use connection_set::{ConnectionSet, PresenceTransition};
