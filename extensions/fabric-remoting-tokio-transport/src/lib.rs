//! A WebSocket transport for fabric remoting.
//!
//! [`WsRemotingListener`] serves a [`RemotingMessageHandler`] over an Axum
//! WebSocket route; [`WsClientFactory`] hands out [`WsRemotingClient`]s that
//! multiplex concurrent requests over one connection per endpoint and feed
//! server-initiated one-way messages (actor events) to a callback handler.
//!
//! This transport does not include authentication or authorization. It is
//! suited for trusted, internal networks and for tests.
//!
//! [`RemotingMessageHandler`]: fabric_remoting::RemotingMessageHandler

mod client_factory;
pub use client_factory::*;
mod frame;
pub use frame::*;
mod settings;
pub use settings::*;
pub mod utils;
mod ws_client;
pub use ws_client::*;
mod ws_listener;
pub use ws_listener::*;
