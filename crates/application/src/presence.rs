use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use domain::{ConnectionId, HubEvent, PresenceTransition, Username};

use crate::broadcaster::{HubEnvelope, PresenceBroadcaster};
use crate::error::ApplicationError;
use crate::registry::ConnectionRegistry;

/// 在线状态服务
///
/// 把连接生命周期事件转换为注册表状态迁移，并在上线/下线时通知其他连接。
/// 广播是尽力而为的：投递失败只记录日志，不影响生命周期操作本身。
///
/// 状态迁移与其广播在同一临界区内完成，同一用户的上线/下线事件按迁移顺序送达。
pub struct PresenceService {
    registry: Arc<dyn ConnectionRegistry>,
    broadcaster: Arc<dyn PresenceBroadcaster>,
    transitions: Mutex<()>,
}

impl PresenceService {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        broadcaster: Arc<dyn PresenceBroadcaster>,
    ) -> Self {
        Self {
            registry,
            broadcaster,
            transitions: Mutex::new(()),
        }
    }

    pub async fn user_connected(
        &self,
        username: &Username,
        connection_id: &ConnectionId,
    ) -> Result<PresenceTransition, ApplicationError> {
        let _guard = self.transitions.lock().await;
        let transition = self
            .registry
            .add_connection(username, connection_id.clone())
            .await?;

        if transition.came_online() {
            tracing::info!(username = %username, connection_id = %connection_id, "用户上线");
            let event = HubEvent::UserIsOnline {
                username: username.clone(),
            };
            self.announce(HubEnvelope::others(connection_id.clone(), event))
                .await;
        } else {
            tracing::debug!(username = %username, connection_id = %connection_id, "新增连接");
        }

        Ok(transition)
    }

    pub async fn user_disconnected(
        &self,
        username: &Username,
        connection_id: &ConnectionId,
    ) -> Result<PresenceTransition, ApplicationError> {
        let _guard = self.transitions.lock().await;
        let transition = self
            .registry
            .remove_connection(username, connection_id)
            .await?;

        if transition.went_offline() {
            tracing::info!(username = %username, connection_id = %connection_id, "用户下线");
            let event = HubEvent::UserIsOffline {
                username: username.clone(),
            };
            self.announce(HubEnvelope::others(connection_id.clone(), event))
                .await;
        } else {
            tracing::debug!(username = %username, connection_id = %connection_id, "移除连接");
        }

        Ok(transition)
    }

    pub async fn online_users(&self) -> Result<Vec<Username>, ApplicationError> {
        self.registry.get_online_users().await
    }

    pub async fn connections_for(
        &self,
        username: &Username,
    ) -> Result<HashSet<ConnectionId>, ApplicationError> {
        self.registry.get_connections_for_user(username).await
    }

    async fn announce(&self, envelope: HubEnvelope) {
        let event = envelope.event.name();
        if let Err(err) = self.broadcaster.broadcast(envelope).await {
            tracing::warn!(error = %err, event, "presence broadcast dropped");
        }
    }
}
