use serde::{Deserialize, Serialize};

use crate::value_objects::Username;

/// 服务端推送给客户端的 Hub 事件，按 `type` 字段区分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HubEvent {
    /// 用户上线（集合由空变为非空）
    UserIsOnline { username: Username },
    /// 用户下线（集合由非空变为空）
    UserIsOffline { username: Username },
    /// 当前在线用户列表，按用户名升序
    GetOnlineUsers { usernames: Vec<Username> },
    /// 私信通知
    NewMessageReceived { sender: Username, content: String },
    Error { code: String, message: String },
}

impl HubEvent {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::UserIsOnline { .. } => "UserIsOnline",
            Self::UserIsOffline { .. } => "UserIsOffline",
            Self::GetOnlineUsers { .. } => "GetOnlineUsers",
            Self::NewMessageReceived { .. } => "NewMessageReceived",
            Self::Error { .. } => "Error",
        }
    }
}
