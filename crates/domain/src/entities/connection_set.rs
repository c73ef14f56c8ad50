//! 连接集合实体
//!
//! 每个用户持有一个无序的连接标识集合，代表同时打开的多个实时会话（例如多个浏览器标签页）。
//! 用户在线当且仅当集合非空。集合的每次变更都产出一个离散的 [`PresenceTransition`]。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::value_objects::ConnectionId;

/// 连接集合变更后的在线状态迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceTransition {
    /// 集合由空变为非空
    CameOnline,
    /// 集合由非空变为空
    WentOffline,
    /// 在线状态未变化（重复连接、移除非最后一个连接、移除未知连接）
    Unchanged,
}

impl PresenceTransition {
    pub fn came_online(self) -> bool {
        matches!(self, Self::CameOnline)
    }

    pub fn went_offline(self) -> bool {
        matches!(self, Self::WentOffline)
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionSet {
    connections: HashSet<ConnectionId>,
}

impl Default for ConnectionSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self {
            connections: HashSet::new(),
        }
    }

    /// 加入连接；首个连接返回 `CameOnline`
    pub fn connect(&mut self, connection_id: ConnectionId) -> PresenceTransition {
        let was_empty = self.connections.is_empty();
        if !self.connections.insert(connection_id) {
            return PresenceTransition::Unchanged;
        }
        if was_empty {
            PresenceTransition::CameOnline
        } else {
            PresenceTransition::Unchanged
        }
    }

    /// 移除连接；最后一个连接被移除时返回 `WentOffline`。
    ///
    /// 断开与重连的先后顺序不受传输层保证，所以移除未知连接是空操作。
    pub fn disconnect(&mut self, connection_id: &ConnectionId) -> PresenceTransition {
        if !self.connections.remove(connection_id) {
            return PresenceTransition::Unchanged;
        }
        if self.connections.is_empty() {
            PresenceTransition::WentOffline
        } else {
            PresenceTransition::Unchanged
        }
    }

    pub fn is_online(&self) -> bool {
        !self.connections.is_empty()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn connections(&self) -> &HashSet<ConnectionId> {
        &self.connections
    }
}
