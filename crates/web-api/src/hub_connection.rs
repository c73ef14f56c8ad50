use crate::error::ApiError;
use crate::state::AppState;
use application::{ApplicationError, Delivery, HubStream};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{ConnectionId, HubEvent, Username};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

/// 客户端发送给 Hub 的命令，按 `type` 字段区分
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientCommand {
    SendMessage { recipient: String, content: String },
    GetOnlineUsers,
}

/// 在线状态 Hub 连接
///
/// 封装单个 WebSocket 会话的生命周期：
/// - 订阅广播并登记连接（可能触发上线广播）
/// - 推送当前在线用户列表给调用方
/// - 处理客户端命令与心跳
/// - 断开时注销连接（可能触发下线广播）
pub struct HubConnection {
    socket: WebSocket,
    state: AppState,
    username: Username,
    connection_id: ConnectionId,
    stream: HubStream,
}

impl HubConnection {
    /// 建立连接
    ///
    /// 先订阅再登记，保证不会错过登记之后别人发出的事件。
    pub async fn open(
        socket: WebSocket,
        state: AppState,
        username: Username,
    ) -> Result<Self, ApiError> {
        let connection_id = ConnectionId::generate();
        let stream = state.hub.subscribe(connection_id.clone());

        state
            .presence
            .user_connected(&username, &connection_id)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, username = %username, "Failed to register connection");
                ApiError::internal_server_error("Failed to establish connection")
            })?;

        tracing::info!(username = %username, connection_id = %connection_id, "Hub 连接已建立");

        Ok(Self {
            socket,
            state,
            username,
            connection_id,
            stream,
        })
    }

    /// 运行连接主循环，直到任一方向结束
    pub async fn run(self) {
        let Self {
            socket,
            state,
            username,
            connection_id,
            mut stream,
        } = self;

        let (mut sender, mut incoming) = socket.split();

        // mpsc channel 解耦对 sender 的访问
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(state.command_buffer);

        Self::push_online_users(&state, &cmd_tx).await;

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let mut send_task = tokio::spawn(async move {
            loop {
                // 优先处理直接回复调用方的命令
                let frame = tokio::select! {
                    biased;
                    Some(cmd) = cmd_rx.recv() => match cmd {
                        WsCommand::Send(event) => match serde_json::to_string(&event) {
                            Ok(json) => WsMessage::Text(json.into()),
                            Err(err) => {
                                tracing::warn!(error = %err, "failed to serialize hub event");
                                continue;
                            }
                        },
                        WsCommand::Pong(data) => WsMessage::Pong(data.into()),
                    },
                    Some(event) = stream.recv() => match serde_json::to_string(&event) {
                        Ok(json) => WsMessage::Text(json.into()),
                        Err(err) => {
                            tracing::warn!(error = %err, "failed to serialize hub event");
                            continue;
                        }
                    },
                    else => break,
                };

                if sender.send(frame).await.is_err() {
                    tracing::debug!("Hub socket closed while sending");
                    break;
                }
            }
        });

        // 接收任务：处理来自客户端的消息
        let mut recv_task = {
            let state = state.clone();
            let username = username.clone();
            tokio::spawn(async move {
                while let Some(Ok(message)) = incoming.next().await {
                    if Self::handle_incoming(message, &state, &username, &cmd_tx)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            })
        };

        tokio::select! {
            _ = &mut send_task => {
                recv_task.abort();
                tracing::debug!(connection_id = %connection_id, "Hub 发送任务结束");
            }
            _ = &mut recv_task => {
                send_task.abort();
                tracing::debug!(connection_id = %connection_id, "Hub 接收任务结束");
            }
        }

        if let Err(err) = state
            .presence
            .user_disconnected(&username, &connection_id)
            .await
        {
            tracing::error!(error = %err, username = %username, connection_id = %connection_id, "Failed to unregister connection");
        }

        tracing::info!(username = %username, connection_id = %connection_id, "Hub 连接已断开");
    }

    async fn push_online_users(state: &AppState, cmd_tx: &mpsc::Sender<WsCommand>) {
        let event = match state.presence.online_users().await {
            Ok(usernames) => HubEvent::GetOnlineUsers { usernames },
            Err(err) => ApiError::from(err).into_hub_event(),
        };
        if cmd_tx.send(WsCommand::Send(event)).await.is_err() {
            tracing::warn!("Failed to queue online users");
        }
    }

    /// 处理来自客户端的消息；返回 Err 表示结束会话
    async fn handle_incoming(
        message: WsMessage,
        state: &AppState,
        username: &Username,
        cmd_tx: &mpsc::Sender<WsCommand>,
    ) -> Result<(), ()> {
        match message {
            WsMessage::Close(_) => {
                tracing::debug!(username = %username, "Hub 收到关闭消息");
                return Err(());
            }
            WsMessage::Ping(data) => {
                cmd_tx
                    .send(WsCommand::Pong(data.to_vec()))
                    .await
                    .map_err(|_| ())?;
            }
            WsMessage::Pong(_) => {}
            WsMessage::Text(text) => {
                let reply = match serde_json::from_str::<ClientCommand>(text.as_str()) {
                    Ok(command) => Self::dispatch(command, state, username).await,
                    Err(err) => Some(
                        ApiError::bad_request(format!("malformed command: {err}")).into_hub_event(),
                    ),
                };
                if let Some(event) = reply {
                    cmd_tx.send(WsCommand::Send(event)).await.map_err(|_| ())?;
                }
            }
            WsMessage::Binary(_) => {
                tracing::debug!(username = %username, "ignoring binary frame");
            }
        }
        Ok(())
    }

    async fn dispatch(
        command: ClientCommand,
        state: &AppState,
        username: &Username,
    ) -> Option<HubEvent> {
        match command {
            ClientCommand::GetOnlineUsers => match state.presence.online_users().await {
                Ok(usernames) => Some(HubEvent::GetOnlineUsers { usernames }),
                Err(err) => Some(ApiError::from(err).into_hub_event()),
            },
            ClientCommand::SendMessage { recipient, content } => {
                let recipient = match Username::parse(&recipient) {
                    Ok(recipient) => recipient,
                    Err(err) => {
                        return Some(ApiError::from(ApplicationError::from(err)).into_hub_event())
                    }
                };
                match state.relay.send(username, &recipient, &content).await {
                    Ok(Delivery::Notified { connections }) => {
                        tracing::debug!(sender = %username, recipient = %recipient, connections, "message relayed");
                        None
                    }
                    Ok(Delivery::RecipientOffline) => None,
                    Err(err) => Some(ApiError::from(err).into_hub_event()),
                }
            }
        }
    }
}

/// WebSocket 写操作命令
#[derive(Debug)]
enum WsCommand {
    Send(HubEvent),
    Pong(Vec<u8>),
}
