//! 应用层实现。
//!
//! 围绕连接集合实体提供在线状态用例：连接注册表、在线状态广播、
//! 以及私信通知转发。外部适配器（广播通道、注册表存储）都通过 trait 抽象。

pub mod broadcaster;
pub mod error;
pub mod local_broadcast;
pub mod messaging;
pub mod presence;
pub mod registry;

pub use broadcaster::{Audience, BroadcastError, HubEnvelope, PresenceBroadcaster};
pub use error::ApplicationError;
pub use local_broadcast::{HubStream, LocalHubBroadcaster};
pub use messaging::{Delivery, MessageRelay, MAX_MESSAGE_LEN};
pub use presence::PresenceService;
pub use registry::{memory::InMemoryConnectionRegistry, ConnectionRegistry};
