use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// 用户名最大长度
pub const USERNAME_MAX_LEN: usize = 64;

/// 用户唯一标识（来自认证层的用户名）。
///
/// 用户名在构造时去除首尾空白并统一为小写，保证同一用户的多个会话落在同一个键上。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn parse(value: impl AsRef<str>) -> Result<Self, DomainError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation_error(
                "username",
                "username cannot be empty",
            ));
        }
        if trimmed.chars().count() > USERNAME_MAX_LEN {
            return Err(DomainError::validation_error(
                "username",
                format!("username cannot exceed {USERNAME_MAX_LEN} characters"),
            ));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

/// 实时连接标识，对本层是不透明字符串。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 为新会话生成随机标识
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_is_trimmed_and_lowercased() {
        let username = Username::parse("  Alice ").unwrap();
        assert_eq!(username.as_str(), "alice");
        assert_eq!(username, Username::parse("ALICE").unwrap());
    }

    #[test]
    fn username_rejects_blank_and_oversized_values() {
        assert!(matches!(
            Username::parse("   "),
            Err(DomainError::ValidationError { ref field, .. }) if field == "username"
        ));
        assert!(Username::parse("x".repeat(USERNAME_MAX_LEN + 1)).is_err());
        assert!(Username::parse("x".repeat(USERNAME_MAX_LEN)).is_ok());
    }

    #[test]
    fn username_deserialization_validates() {
        let parsed: Username = serde_json::from_str("\"Bob\"").unwrap();
        assert_eq!(parsed.as_str(), "bob");
        assert!(serde_json::from_str::<Username>("\"\"").is_err());
    }

    #[test]
    fn generated_connection_ids_are_unique() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();
        assert_ne!(a, b);
        assert_eq!(serde_json::to_string(&ConnectionId::from("c1")).unwrap(), "\"c1\"");
    }
}
