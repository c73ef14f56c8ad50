use std::collections::HashSet;

use domain::{ConnectionId, PresenceTransition, Username};

use crate::error::ApplicationError;

/// 连接注册表trait
/// 记录每个用户当前打开的实时连接集合
#[async_trait::async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// 加入连接；用户首个连接返回 `CameOnline`
    async fn add_connection(
        &self,
        username: &Username,
        connection_id: ConnectionId,
    ) -> Result<PresenceTransition, ApplicationError>;

    /// 移除连接；集合变空时删除用户条目并返回 `WentOffline`
    async fn remove_connection(
        &self,
        username: &Username,
        connection_id: &ConnectionId,
    ) -> Result<PresenceTransition, ApplicationError>;

    /// 获取用户当前的连接集合（可能为空）
    async fn get_connections_for_user(
        &self,
        username: &Username,
    ) -> Result<HashSet<ConnectionId>, ApplicationError>;

    /// 获取所有在线用户，按用户名升序
    async fn get_online_users(&self) -> Result<Vec<Username>, ApplicationError>;

    async fn is_online(&self, username: &Username) -> Result<bool, ApplicationError>;
}

/// 内存实现的连接注册表
pub mod memory {
    use super::*;
    use domain::ConnectionSet;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    /// 用一把全局读写锁保护整张表，所有变更互斥
    pub struct InMemoryConnectionRegistry {
        users: RwLock<HashMap<Username, ConnectionSet>>,
    }

    impl Default for InMemoryConnectionRegistry {
        fn default() -> Self {
            Self::new()
        }
    }

    impl InMemoryConnectionRegistry {
        pub fn new() -> Self {
            Self {
                users: RwLock::new(HashMap::new()),
            }
        }

        /// 注册表中的用户条目数
        pub async fn len(&self) -> usize {
            self.users.read().await.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.users.read().await.is_empty()
        }
    }

    #[async_trait::async_trait]
    impl ConnectionRegistry for InMemoryConnectionRegistry {
        async fn add_connection(
            &self,
            username: &Username,
            connection_id: ConnectionId,
        ) -> Result<PresenceTransition, ApplicationError> {
            let mut users = self.users.write().await;
            let transition = users
                .entry(username.clone())
                .or_default()
                .connect(connection_id);
            Ok(transition)
        }

        async fn remove_connection(
            &self,
            username: &Username,
            connection_id: &ConnectionId,
        ) -> Result<PresenceTransition, ApplicationError> {
            let mut users = self.users.write().await;

            let Some(connections) = users.get_mut(username) else {
                return Ok(PresenceTransition::Unchanged);
            };

            let transition = connections.disconnect(connection_id);
            if connections.is_empty() {
                users.remove(username);
            }

            Ok(transition)
        }

        async fn get_connections_for_user(
            &self,
            username: &Username,
        ) -> Result<HashSet<ConnectionId>, ApplicationError> {
            let users = self.users.read().await;
            let connections = users
                .get(username)
                .map(|set| set.connections().clone())
                .unwrap_or_default();
            Ok(connections)
        }

        async fn get_online_users(&self) -> Result<Vec<Username>, ApplicationError> {
            let users = self.users.read().await;
            let mut usernames: Vec<Username> = users.keys().cloned().collect();
            usernames.sort();
            Ok(usernames)
        }

        async fn is_online(&self, username: &Username) -> Result<bool, ApplicationError> {
            let users = self.users.read().await;
            Ok(users.get(username).is_some_and(|set| set.is_online()))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn user(name: &str) -> Username {
            Username::parse(name).unwrap()
        }

        #[tokio::test]
        async fn add_and_remove_report_transitions() {
            let registry = InMemoryConnectionRegistry::new();
            let alice = user("alice");

            let first = registry.add_connection(&alice, "c1".into()).await.unwrap();
            let second = registry.add_connection(&alice, "c2".into()).await.unwrap();
            assert!(first.came_online());
            assert_eq!(second, PresenceTransition::Unchanged);

            let connections = registry.get_connections_for_user(&alice).await.unwrap();
            assert_eq!(connections.len(), 2);

            let removed = registry
                .remove_connection(&alice, &"c1".into())
                .await
                .unwrap();
            assert_eq!(removed, PresenceTransition::Unchanged);
            assert!(registry.is_online(&alice).await.unwrap());

            let removed = registry
                .remove_connection(&alice, &"c2".into())
                .await
                .unwrap();
            assert!(removed.went_offline());
            assert!(!registry.is_online(&alice).await.unwrap());
            assert!(registry.is_empty().await);
        }

        #[tokio::test]
        async fn removing_unknown_entries_is_noop() {
            let registry = InMemoryConnectionRegistry::new();
            let bob = user("bob");

            let result = registry
                .remove_connection(&bob, &"missing".into())
                .await
                .unwrap();
            assert_eq!(result, PresenceTransition::Unchanged);

            registry.add_connection(&bob, "c1".into()).await.unwrap();
            let result = registry
                .remove_connection(&bob, &"missing".into())
                .await
                .unwrap();
            assert_eq!(result, PresenceTransition::Unchanged);
            assert_eq!(registry.len().await, 1);
        }

        #[tokio::test]
        async fn online_users_are_sorted() {
            let registry = InMemoryConnectionRegistry::new();
            for (name, id) in [("carol", "c1"), ("alice", "c2"), ("bob", "c3")] {
                registry.add_connection(&user(name), id.into()).await.unwrap();
            }

            let online = registry.get_online_users().await.unwrap();
            let names: Vec<&str> = online.iter().map(Username::as_str).collect();
            assert_eq!(names, vec!["alice", "bob", "carol"]);
        }

        #[tokio::test]
        async fn unknown_user_has_no_connections() {
            let registry = InMemoryConnectionRegistry::new();
            let connections = registry
                .get_connections_for_user(&user("nobody"))
                .await
                .unwrap();
            assert!(connections.is_empty());
        }
    }
}
