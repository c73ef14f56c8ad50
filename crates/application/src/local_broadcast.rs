// 进程内广播器实现
use crate::broadcaster::{BroadcastError, HubEnvelope, PresenceBroadcaster};
use async_trait::async_trait;
use domain::{ConnectionId, HubEvent};
use tokio::sync::broadcast::{self, error::RecvError};

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Clone)]
pub struct LocalHubBroadcaster {
    sender: broadcast::Sender<HubEnvelope>,
}

impl LocalHubBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 为指定连接订阅事件流
    pub fn subscribe(&self, connection_id: ConnectionId) -> HubStream {
        HubStream::new(self.sender.subscribe(), connection_id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LocalHubBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceBroadcaster for LocalHubBroadcaster {
    async fn broadcast(&self, envelope: HubEnvelope) -> Result<(), BroadcastError> {
        self.sender
            .send(envelope)
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        Ok(())
    }
}

/// 单个连接的事件流，只产出投递给该连接的事件
pub struct HubStream {
    receiver: broadcast::Receiver<HubEnvelope>,
    connection_id: ConnectionId,
}

impl HubStream {
    pub fn new(receiver: broadcast::Receiver<HubEnvelope>, connection_id: ConnectionId) -> Self {
        Self {
            receiver,
            connection_id,
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub async fn recv(&mut self) -> Option<HubEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => {
                    if envelope.is_addressed_to(&self.connection_id) {
                        return Some(envelope.event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        connection_id = %self.connection_id,
                        skipped,
                        "hub stream lagged, events dropped"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
