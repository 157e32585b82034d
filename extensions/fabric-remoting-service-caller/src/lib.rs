mod cancellation;
pub mod error;
pub use error::*;
mod events;
pub use events::*;
mod exception_converter;
pub use exception_converter::*;
mod partition_client;
pub use partition_client::*;
mod proxy;
pub use proxy::*;
mod proxy_generator;
pub use proxy_generator::*;
mod resolver;
pub use resolver::*;
mod retry;
pub use retry::*;
