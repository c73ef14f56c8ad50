//! 在线状态核心领域模型
//!
//! 包含用户标识、连接标识、连接集合实体及其状态迁移，以及推送给客户端的 Hub 事件。

pub mod entities;
pub mod errors;
pub mod events;
pub mod value_objects;

// 重新导出常用类型
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use value_objects::*;
