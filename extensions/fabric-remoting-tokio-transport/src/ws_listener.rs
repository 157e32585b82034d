use crate::{FrameKind, TransportFrame, TransportSettings, WS_ROUTE, utils::websocket_address};
use axum::{
    Router,
    extract::ConnectInfo,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use bytes::Bytes;
use fabric_remoting::{
    RemotingCallbackClient, RemotingListener, RemotingMessageHandler, RemotingRequest,
    RemotingResponse, RemotingResultStatus, RequestContext, TransportError,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tokio::{
    net::TcpListener,
    sync::{Mutex, mpsc},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// State shared by the accept loop and every connection of one listener.
struct ListenerContext {
    handler: Arc<dyn RemotingMessageHandler>,
    settings: TransportSettings,
    /// Stops accepting connections and reading new requests.
    shutdown: CancellationToken,
    /// Additionally abandons requests that are still being handled.
    abort: CancellationToken,
    tasks: TaskTracker,
}

/// Serves a [`RemotingMessageHandler`] over WebSockets.
///
/// Each connection gets its own sender and receiver task. Requests are
/// handled concurrently; responses carry the correlation id of their
/// request. The connection is also the callback channel for one-way
/// messages the handler sends back to the client.
pub struct WsRemotingListener {
    bind_address: String,
    context: Arc<ListenerContext>,
    published_address: Mutex<Option<String>>,
}

impl WsRemotingListener {
    /// `bind_address` may use port 0; [`RemotingListener::open`] returns the
    /// address actually bound.
    pub fn new(
        bind_address: impl Into<String>,
        handler: Arc<dyn RemotingMessageHandler>,
        settings: TransportSettings,
    ) -> Self {
        Self {
            bind_address: bind_address.into(),
            context: Arc::new(ListenerContext {
                handler,
                settings,
                shutdown: CancellationToken::new(),
                abort: CancellationToken::new(),
                tasks: TaskTracker::new(),
            }),
            published_address: Mutex::new(None),
        }
    }

    /// The address clients connect to, once the listener is open.
    pub async fn published_address(&self) -> Option<String> {
        self.published_address.lock().await.clone()
    }

    async fn ws_handler(
        ws: WebSocketUpgrade,
        ConnectInfo(addr): ConnectInfo<SocketAddr>,
        context: Arc<ListenerContext>,
    ) -> impl IntoResponse {
        tracing::info!("Client connected: {}", addr);
        ws.max_message_size(context.settings.max_message_size)
            .on_upgrade(move |socket| context.handle_socket(socket, addr))
    }
}

#[async_trait::async_trait]
impl RemotingListener for WsRemotingListener {
    async fn open(&self) -> Result<String, TransportError> {
        if self.context.shutdown.is_cancelled() {
            return Err(TransportError::object_closed("the listener was closed"));
        }

        let mut published = self.published_address.lock().await;
        if let Some(address) = published.as_ref() {
            return Ok(address.clone());
        }

        let listener = TcpListener::bind(&self.bind_address).await.map_err(|err| {
            TransportError::endpoint_unreachable(format!(
                "failed to bind {}: {}",
                self.bind_address, err
            ))
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| TransportError::endpoint_unreachable(err.to_string()))?;

        let app = Router::new().route(
            WS_ROUTE,
            get({
                let context = self.context.clone();
                move |ws, conn| Self::ws_handler(ws, conn, context.clone())
            }),
        );

        let shutdown = self.context.shutdown.clone();
        self.context.tasks.spawn(async move {
            let serve = axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown.cancelled_owned());
            if let Err(err) = serve.await {
                tracing::error!("Listener on {} failed: {}", local_addr, err);
            }
        });

        let address = websocket_address(local_addr);
        tracing::info!("Listener running on {}", address);
        *published = Some(address.clone());
        Ok(address)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.context.shutdown.cancel();
        self.context.tasks.close();
        self.context.tasks.wait().await;
        tracing::info!("Listener on {} closed", self.bind_address);
        Ok(())
    }

    fn abort(&self) {
        self.context.abort.cancel();
        self.context.shutdown.cancel();
        self.context.tasks.close();
        tracing::info!("Listener on {} aborted", self.bind_address);
    }
}

impl ListenerContext {
    async fn handle_socket(self: Arc<Self>, socket: WebSocket, addr: SocketAddr) {
        let (sender, receiver) = socket.split();
        let (tx, rx) = mpsc::channel::<Message>(self.settings.channel_buffer_size);

        self.tasks.spawn(Self::sender_task(sender, rx));
        self.tasks
            .spawn(self.clone().receiver_task(receiver, tx, addr));
    }

    /// Forwards responses, callbacks and pings to the client.
    async fn sender_task(
        mut sender: SplitSink<WebSocket, Message>,
        mut rx: mpsc::Receiver<Message>,
    ) {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break; // Exit if the client has disconnected.
            }
        }
        let _ = sender.close().await;
    }

    /// Reads frames from one client, pings it, and drops it when it stays
    /// silent for longer than the client timeout.
    async fn receiver_task(
        self: Arc<Self>,
        mut receiver: SplitStream<WebSocket>,
        tx: mpsc::Sender<Message>,
        addr: SocketAddr,
    ) {
        let callback = Arc::new(ConnectionCallbackClient {
            tx: tx.downgrade(),
            settings: self.settings.clone(),
            closed: CancellationToken::new(),
        });
        let context = RequestContext::new(
            Some(callback.clone() as Arc<dyn RemotingCallbackClient>),
            Some(addr.to_string()),
        );

        let mut heartbeat = tokio::time::interval(self.settings.heartbeat_interval);
        let mut last_seen = Instant::now();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Closing connection of {} on shutdown.", addr);
                    break;
                }

                _ = heartbeat.tick() => {
                    if last_seen.elapsed() > self.settings.client_timeout {
                        tracing::warn!("Client {} timed out. Closing connection.", addr);
                        break;
                    }
                    if tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        tracing::info!("Client {} disconnected (failed to send ping).", addr);
                        break;
                    }
                }

                message = receiver.next() => {
                    match message {
                        Some(Ok(Message::Binary(bytes))) => {
                            last_seen = Instant::now();
                            self.handle_frame(&bytes, &tx, &context, addr);
                        }
                        Some(Ok(Message::Pong(_))) => {
                            last_seen = Instant::now();
                            tracing::trace!("Received pong from {}", addr);
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Client {} initiated close.", addr);
                            break;
                        }
                        Some(Ok(_)) => {
                            last_seen = Instant::now();
                        }
                        None | Some(Err(_)) => {
                            tracing::info!("Client {} disconnected.", addr);
                            break;
                        }
                    }
                }
            }
        }

        callback.closed.cancel();
        tracing::info!("Terminated connection for {}.", addr);
    }

    fn handle_frame(
        &self,
        bytes: &[u8],
        tx: &mpsc::Sender<Message>,
        context: &RequestContext,
        addr: SocketAddr,
    ) {
        let codec = self.settings.serialization.header;
        let frame = match TransportFrame::decode(bytes, self.settings.max_message_size) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::error!("Error decoding frame from {}: {}", addr, err);
                return;
            }
        };

        match frame.kind {
            FrameKind::Request => {
                let correlation_id = frame.correlation_id;
                let handler = self.handler.clone();
                let settings = self.settings.clone();
                let abort = self.abort.clone();
                let context = context.clone();
                let tx = tx.clone();

                self.tasks.spawn(async move {
                    let response = match frame.into_request(codec) {
                        Ok(request) => {
                            tokio::select! {
                                response = handler.handle_request_response(context, request) => response,
                                _ = abort.cancelled() => return,
                            }
                        }
                        Err(err) => {
                            RemotingResponse::fault(RemotingResultStatus::SystemFault, err.to_string())
                        }
                    };
                    send_response(&tx, correlation_id, response, &settings).await;
                });
            }
            FrameKind::OneWay => {
                let request = match frame.into_request(codec) {
                    Ok(request) => request,
                    Err(err) => {
                        tracing::debug!("Dropping one-way frame from {}: {}", addr, err);
                        return;
                    }
                };
                let handler = self.handler.clone();
                let abort = self.abort.clone();
                let context = context.clone();

                self.tasks.spawn(async move {
                    tokio::select! {
                        _ = handler.handle_one_way(context, request) => {}
                        _ = abort.cancelled() => {}
                    }
                });
            }
            FrameKind::Response => {
                tracing::debug!("Ignoring response frame sent by client {}", addr);
            }
        }
    }
}

async fn send_response(
    tx: &mpsc::Sender<Message>,
    correlation_id: u64,
    response: RemotingResponse,
    settings: &TransportSettings,
) {
    let codec = settings.serialization.header;
    let encoded = TransportFrame::response(correlation_id, response, codec)
        .and_then(|frame| frame.encode(settings.max_message_size));

    let bytes = match encoded {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!("Response {} could not be sent: {}", correlation_id, err);
            let fallback = RemotingResponse::fault(RemotingResultStatus::SystemFault, err.to_string());
            match TransportFrame::response(correlation_id, fallback, codec)
                .and_then(|frame| frame.encode(settings.max_message_size))
            {
                Ok(bytes) => bytes,
                Err(_) => return,
            }
        }
    };

    // A closed channel means the client is gone; nobody waits for this.
    let _ = tx.send(Message::Binary(bytes.into())).await;
}

/// Sends one-way messages back over the connection a request arrived on.
///
/// Holds only a weak sender so that subscriptions kept by the handler do not
/// keep a finished connection's sender task alive.
struct ConnectionCallbackClient {
    tx: mpsc::WeakSender<Message>,
    settings: TransportSettings,
    closed: CancellationToken,
}

#[async_trait::async_trait]
impl RemotingCallbackClient for ConnectionCallbackClient {
    async fn send_one_way(&self, request: RemotingRequest) -> Result<(), TransportError> {
        let tx = match self.tx.upgrade() {
            Some(tx) if !self.closed.is_cancelled() => tx,
            _ => return Err(TransportError::object_closed("the connection is closed")),
        };
        let bytes = TransportFrame::one_way(request, self.settings.serialization.header)?
            .encode(self.settings.max_message_size)?;
        tx.send(Message::Binary(bytes.into()))
            .await
            .map_err(|_| TransportError::connection_faulted("the connection dropped"))
    }

    fn is_connected(&self) -> bool {
        !self.closed.is_cancelled() && self.tx.strong_count() > 0
    }
}
