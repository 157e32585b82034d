use crate::{FrameKind, TransportFrame, TransportSettings};
use dashmap::DashMap;
use fabric_remoting::{
    RemotingMessageHandler, RemotingRequest, RemotingResponse, RemotingResultStatus,
    RemotingTransportClient, RequestContext, TransportError,
};
use futures_util::{SinkExt, StreamExt, stream::SplitStream};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message as WsMessage,
};
use tokio_util::sync::CancellationToken;

type PendingResponses = DashMap<u64, oneshot::Sender<RemotingResponse>>;

/// One WebSocket connection to a remoting listener.
///
/// Concurrent requests share the connection and are matched to their
/// responses by correlation id. One-way frames sent by the listener are
/// handed to the callback handler, if one was given.
pub struct WsRemotingClient {
    endpoint: String,
    settings: TransportSettings,
    tx: mpsc::Sender<WsMessage>,
    pending: Arc<PendingResponses>,
    next_correlation_id: AtomicU64,
    closed: CancellationToken,
    task_handles: Vec<JoinHandle<()>>,
}

impl WsRemotingClient {
    pub async fn connect(
        endpoint: &str,
        settings: TransportSettings,
        callback: Option<Arc<dyn RemotingMessageHandler>>,
    ) -> Result<Self, TransportError> {
        let (ws_stream, _) = connect_async(endpoint).await.map_err(|err| {
            TransportError::endpoint_unreachable(format!("failed to connect to {endpoint}: {err}"))
        })?;
        let (mut sender, receiver) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<WsMessage>(settings.channel_buffer_size);
        let pending: Arc<PendingResponses> = Arc::new(DashMap::new());
        let closed = CancellationToken::new();

        // Send loop
        let send_closed = closed.clone();
        let send_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = rx.recv() => match msg {
                        Some(msg) => {
                            if sender.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = send_closed.cancelled() => break,
                }
            }
            let _ = sender.close().await;
            send_closed.cancel();
        });

        // Receive loop
        let recv_handle = tokio::spawn(Self::receive_loop(
            receiver,
            pending.clone(),
            closed.clone(),
            settings.clone(),
            callback,
            endpoint.to_string(),
        ));

        tracing::debug!("Connected to {}", endpoint);

        Ok(Self {
            endpoint: endpoint.to_string(),
            settings,
            tx,
            pending,
            next_correlation_id: AtomicU64::new(1),
            closed,
            task_handles: vec![send_handle, recv_handle],
        })
    }

    pub fn is_connected(&self) -> bool {
        !self.closed.is_cancelled()
    }

    /// Closes the connection. Requests still waiting fail with a
    /// connection fault.
    pub fn close(&self) {
        self.closed.cancel();
    }

    async fn receive_loop(
        mut receiver: SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
        pending: Arc<PendingResponses>,
        closed: CancellationToken,
        settings: TransportSettings,
        callback: Option<Arc<dyn RemotingMessageHandler>>,
        endpoint: String,
    ) {
        let codec = settings.serialization.header;

        loop {
            let message = tokio::select! {
                message = receiver.next() => message,
                _ = closed.cancelled() => break,
            };

            let bytes = match message {
                Some(Ok(WsMessage::Binary(bytes))) => bytes,
                Some(Ok(WsMessage::Close(_))) | None => {
                    tracing::debug!("Connection to {} closed", endpoint);
                    break;
                }
                Some(Err(err)) => {
                    tracing::warn!("Connection to {} failed: {}", endpoint, err);
                    break;
                }
                // Pings are answered by the WebSocket layer.
                Some(Ok(_)) => continue,
            };

            let frame = match TransportFrame::decode(&bytes, settings.max_message_size) {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::error!("Error decoding frame from {}: {}", endpoint, err);
                    continue;
                }
            };

            match frame.kind {
                FrameKind::Response => {
                    let correlation_id = frame.correlation_id;
                    let response = frame.into_response(codec).unwrap_or_else(|err| {
                        RemotingResponse::fault(RemotingResultStatus::SystemFault, err.to_string())
                    });
                    match pending.remove(&correlation_id) {
                        Some((_, waiter)) => {
                            let _ = waiter.send(response);
                        }
                        None => {
                            tracing::debug!("Dropping late response {}", correlation_id);
                        }
                    }
                }
                FrameKind::OneWay => {
                    let Some(handler) = callback.clone() else {
                        tracing::debug!("Dropping one-way frame; no callback handler installed");
                        continue;
                    };
                    match frame.into_request(codec) {
                        Ok(request) => {
                            let context = RequestContext::new(None, Some(endpoint.clone()));
                            tokio::spawn(async move {
                                handler.handle_one_way(context, request).await;
                            });
                        }
                        Err(err) => {
                            tracing::debug!("Dropping one-way frame from {}: {}", endpoint, err);
                        }
                    }
                }
                FrameKind::Request => {
                    tracing::debug!("Ignoring request frame sent by {}", endpoint);
                }
            }
        }

        closed.cancel();
        // Dropping the waiters fails every request still in flight.
        pending.clear();
    }

    async fn send_frame(&self, frame: TransportFrame) -> Result<(), TransportError> {
        let bytes = frame.encode(self.settings.max_message_size)?;
        self.tx
            .send(WsMessage::Binary(bytes.into()))
            .await
            .map_err(|_| TransportError::connection_faulted("the connection dropped"))
    }
}

/// Removes a pending entry when the request future finishes or is dropped.
struct PendingGuard<'a> {
    pending: &'a PendingResponses,
    correlation_id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.correlation_id);
    }
}

#[async_trait::async_trait]
impl RemotingTransportClient for WsRemotingClient {
    async fn request_response(
        &self,
        request: RemotingRequest,
    ) -> Result<RemotingResponse, TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::object_closed("the client is closed"));
        }

        let correlation_id = self.next_correlation_id.fetch_add(1, Ordering::Relaxed);
        let frame = TransportFrame::request(
            correlation_id,
            request,
            self.settings.serialization.header,
        )?;

        let (waiter, response) = oneshot::channel();
        self.pending.insert(correlation_id, waiter);
        let _guard = PendingGuard {
            pending: &self.pending,
            correlation_id,
        };

        // The receive loop may have cleared the table before the insert.
        if self.closed.is_cancelled() {
            return Err(TransportError::connection_faulted("the connection dropped"));
        }

        self.send_frame(frame).await?;

        match tokio::time::timeout(self.settings.request_timeout, response).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(TransportError::connection_faulted(
                "the connection closed before the response arrived",
            )),
            Err(_) => Err(TransportError::timeout(format!(
                "no response from {} within {:?}",
                self.endpoint, self.settings.request_timeout
            ))),
        }
    }

    async fn send_one_way(&self, request: RemotingRequest) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::object_closed("the client is closed"));
        }
        let frame = TransportFrame::one_way(request, self.settings.serialization.header)?;
        self.send_frame(frame).await
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Drop for WsRemotingClient {
    fn drop(&mut self) {
        self.closed.cancel();
        for handle in &self.task_handles {
            handle.abort();
        }
    }
}
