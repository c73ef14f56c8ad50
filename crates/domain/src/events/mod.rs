//! 领域事件定义
//!
//! 推送给 Hub 客户端的事件类型

pub mod hub_event;

pub use hub_event::*;
