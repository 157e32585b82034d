use crate::WS_ROUTE;
use std::net::SocketAddr;

/// The address clients connect to for a listener bound at `addr`.
pub fn websocket_address(addr: SocketAddr) -> String {
    format!("ws://{addr}{WS_ROUTE}")
}
