use async_trait::async_trait;
use domain::{ConnectionId, HubEvent};
use thiserror::Error;

/// 广播的目标连接
#[derive(Debug, Clone, PartialEq)]
pub enum Audience {
    /// 除调用方外的所有连接
    Others { except: ConnectionId },
    /// 指定的连接集合
    Connections(Vec<ConnectionId>),
}

#[derive(Debug, Clone)]
pub struct HubEnvelope {
    pub audience: Audience,
    pub event: HubEvent,
}

impl HubEnvelope {
    pub fn others(except: ConnectionId, event: HubEvent) -> Self {
        Self {
            audience: Audience::Others { except },
            event,
        }
    }

    pub fn to_connections(connections: Vec<ConnectionId>, event: HubEvent) -> Self {
        Self {
            audience: Audience::Connections(connections),
            event,
        }
    }

    pub fn is_addressed_to(&self, connection_id: &ConnectionId) -> bool {
        match &self.audience {
            Audience::Others { except } => except != connection_id,
            Audience::Connections(targets) => targets.contains(connection_id),
        }
    }
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceBroadcaster: Send + Sync {
    async fn broadcast(&self, envelope: HubEnvelope) -> Result<(), BroadcastError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::Username;

    #[test]
    fn others_audience_excludes_caller_only() {
        let event = HubEvent::UserIsOnline {
            username: Username::parse("alice").unwrap(),
        };
        let envelope = HubEnvelope::others(ConnectionId::from("c1"), event);
        assert!(!envelope.is_addressed_to(&ConnectionId::from("c1")));
        assert!(envelope.is_addressed_to(&ConnectionId::from("c2")));
    }

    #[test]
    fn connections_audience_is_explicit() {
        let event = HubEvent::error("X", "y");
        let envelope = HubEnvelope::to_connections(
            vec![ConnectionId::from("c1"), ConnectionId::from("c3")],
            event,
        );
        assert!(envelope.is_addressed_to(&ConnectionId::from("c3")));
        assert!(!envelope.is_addressed_to(&ConnectionId::from("c2")));
    }
}
