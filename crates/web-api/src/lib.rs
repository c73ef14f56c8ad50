//! Web API 层。
//!
//! 提供 Axum 路由：在线状态 Hub（WebSocket）与在线用户查询接口，
//! 把连接生命周期委托给应用层的在线状态服务。

mod auth;
mod error;
mod hub_connection;
mod routes;
mod state;

pub use auth::{Claims, JwtService};
pub use config::JwtConfig;
pub use error::ApiError;
pub use routes::{cors_layer, router};
pub use state::AppState;
