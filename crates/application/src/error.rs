use domain::DomainError;
use thiserror::Error;

use crate::broadcaster::BroadcastError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("broadcast error: {0}")]
    Broadcast(#[from] BroadcastError),
    #[error("infrastructure error: {message}")]
    Infrastructure { message: String },
}

impl ApplicationError {
    /// 创建基础设施错误
    pub fn infrastructure(message: impl Into<String>) -> Self {
        ApplicationError::Infrastructure {
            message: message.into(),
        }
    }
}
