use std::sync::Arc;

use domain::{DomainError, HubEvent, Username};
use serde::Serialize;

use crate::broadcaster::{HubEnvelope, PresenceBroadcaster};
use crate::error::ApplicationError;
use crate::registry::ConnectionRegistry;

/// 私信内容最大长度
pub const MAX_MESSAGE_LEN: usize = 2000;

/// 私信投递结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Delivery {
    /// 已通知接收方的全部在线连接
    Notified { connections: usize },
    RecipientOffline,
}

/// 私信通知转发
///
/// 不做持久化，只把 `NewMessageReceived` 推送到接收方当前的每一个连接。
pub struct MessageRelay {
    registry: Arc<dyn ConnectionRegistry>,
    broadcaster: Arc<dyn PresenceBroadcaster>,
}

impl MessageRelay {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        broadcaster: Arc<dyn PresenceBroadcaster>,
    ) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    pub async fn send(
        &self,
        sender: &Username,
        recipient: &Username,
        content: &str,
    ) -> Result<Delivery, ApplicationError> {
        if sender == recipient {
            return Err(DomainError::validation_error(
                "recipient",
                "You cannot send messages to yourself",
            )
            .into());
        }
        if content.trim().is_empty() {
            return Err(
                DomainError::validation_error("content", "message content cannot be empty").into(),
            );
        }
        if content.chars().count() > MAX_MESSAGE_LEN {
            return Err(DomainError::validation_error(
                "content",
                format!("message content cannot exceed {MAX_MESSAGE_LEN} characters"),
            )
            .into());
        }

        let connections: Vec<_> = self
            .registry
            .get_connections_for_user(recipient)
            .await?
            .into_iter()
            .collect();

        if connections.is_empty() {
            tracing::debug!(sender = %sender, recipient = %recipient, "recipient offline, notification skipped");
            return Ok(Delivery::RecipientOffline);
        }

        let count = connections.len();
        let event = HubEvent::NewMessageReceived {
            sender: sender.clone(),
            content: content.to_string(),
        };
        self.broadcaster
            .broadcast(HubEnvelope::to_connections(connections, event))
            .await?;

        tracing::info!(sender = %sender, recipient = %recipient, connections = count, "私信通知已发送");
        Ok(Delivery::Notified { connections: count })
    }
}
