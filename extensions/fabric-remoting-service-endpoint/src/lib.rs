mod actor_host;
pub use actor_host::*;
mod cancellation_tracker;
pub use cancellation_tracker::*;
mod dispatcher_map;
pub use dispatcher_map::*;
mod endpoint;
pub use endpoint::*;
pub mod error;
pub use error::*;
mod event_publisher;
pub use event_publisher::*;
