use std::{net::SocketAddr, sync::Arc, time::Duration};

use config::HubConfig;
use domain::Username;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::{net::TcpListener, net::TcpStream, sync::oneshot, time::timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use web_api::{router, AppState, JwtConfig, JwtService};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const TEST_SECRET: &str = "integration-test-secret-with-enough-length";

/// 运行在随机端口上的测试服务器，drop 时优雅关闭
pub struct TestServer {
    pub addr: SocketAddr,
    pub jwt: Arc<JwtService>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let jwt = Arc::new(JwtService::new(JwtConfig {
            secret: TEST_SECRET.to_string(),
            expiration_hours: 1,
        }));
        let state = AppState::in_memory(jwt.clone(), &HubConfig::default());
        let app = router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            jwt,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn token_for(&self, name: &str) -> String {
        let username = Username::parse(name).expect("username");
        self.jwt.generate_token(&username).expect("token")
    }

    pub fn hub_url(&self, token: &str) -> String {
        format!("ws://{}/hubs/presence?access_token={}", self.addr, token)
    }

    /// 以指定用户连接 Hub，并消费首帧 GetOnlineUsers
    pub async fn connect(&self, name: &str) -> (WsClient, Value) {
        let (mut ws, _) = connect_async(self.hub_url(&self.token_for(name)))
            .await
            .expect("ws connect");
        let first = next_event(&mut ws).await;
        assert_eq!(first["type"], "GetOnlineUsers", "unexpected first frame: {first}");
        (ws, first)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// 读取下一条 JSON 事件帧（跳过控制帧）
pub async fn next_event(ws: &mut WsClient) -> Value {
    loop {
        let message = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for hub event")
            .expect("hub stream ended")
            .expect("hub stream error");
        if let TungsteniteMessage::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("json frame");
        }
    }
}

/// 读取事件直到满足条件
pub async fn next_event_where(ws: &mut WsClient, predicate: impl Fn(&Value) -> bool) -> Value {
    loop {
        let event = next_event(ws).await;
        if predicate(&event) {
            return event;
        }
    }
}

/// 断言在给定时间内没有事件帧到达
pub async fn assert_silent(ws: &mut WsClient, wait: Duration) {
    if let Ok(Some(Ok(TungsteniteMessage::Text(text)))) = timeout(wait, ws.next()).await {
        panic!("unexpected hub event: {}", text.as_str());
    }
}

pub fn usernames(event: &Value) -> Vec<String> {
    event["usernames"]
        .as_array()
        .expect("usernames array")
        .iter()
        .map(|v| v.as_str().expect("username string").to_string())
        .collect()
}
