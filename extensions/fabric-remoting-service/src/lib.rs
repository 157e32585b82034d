mod arguments;
pub use arguments::*;
mod description;
pub use description::*;
mod dispatch_table;
pub use dispatch_table::*;
pub mod error;
pub use error::*;
mod identity;
pub use identity::*;
mod macros;
pub use macros::*;
mod registry;
pub use registry::*;
mod settings;
pub use settings::*;
mod signature;
pub use signature::*;
