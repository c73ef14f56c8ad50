use std::sync::Arc;

use application::{
    ConnectionRegistry, InMemoryConnectionRegistry, LocalHubBroadcaster, MessageRelay,
    PresenceBroadcaster, PresenceService,
};
use config::HubConfig;

use crate::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub presence: Arc<PresenceService>,
    pub relay: Arc<MessageRelay>,
    pub hub: Arc<LocalHubBroadcaster>,
    pub jwt_service: Arc<JwtService>,
    pub command_buffer: usize,
}

impl AppState {
    pub fn new(
        presence: Arc<PresenceService>,
        relay: Arc<MessageRelay>,
        hub: Arc<LocalHubBroadcaster>,
        jwt_service: Arc<JwtService>,
        command_buffer: usize,
    ) -> Self {
        Self {
            presence,
            relay,
            hub,
            jwt_service,
            command_buffer: command_buffer.max(1),
        }
    }

    /// 单进程部署：内存注册表 + 进程内广播
    pub fn in_memory(jwt_service: Arc<JwtService>, hub_config: &HubConfig) -> Self {
        let hub = Arc::new(LocalHubBroadcaster::with_capacity(
            hub_config.broadcast_capacity,
        ));
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryConnectionRegistry::new());
        let broadcaster: Arc<dyn PresenceBroadcaster> = hub.clone();

        let presence = Arc::new(PresenceService::new(registry.clone(), broadcaster.clone()));
        let relay = Arc::new(MessageRelay::new(registry, broadcaster));

        Self::new(presence, relay, hub, jwt_service, hub_config.command_buffer)
    }
}
