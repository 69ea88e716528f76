//! gnmi-lite core - path-addressed configuration tree engine
//!
//! A schema-validated configuration tree served through Get, Set and
//! Subscribe. The crate holds everything below the transport:
//!
//! - `schema` / `model` - schema tree, typed configuration, JSON codecs
//! - `tree` - generic tree navigation, mutation and data-type pruning
//! - `store` - authoritative root behind a single writer section
//! - `set` - transactional Delete/Replace/Update with apply/rollback hooks
//! - `read` / `get` - typed values for reads
//! - `subscribe` - ONCE/POLL/STREAM subscriptions over a change bus
//! - `server` - the facade wiring the pieces together

pub mod config;
pub mod error;
pub mod events;
pub mod get;
pub mod hook;
pub mod model;
pub mod path;
pub mod read;
pub mod schema;
pub mod server;
pub mod set;
pub mod store;
pub mod subscribe;
pub mod tree;
pub mod types;

pub use config::EngineConfig;
pub use error::{Code, GnmiError, GnmiResult};
pub use hook::ConfigHook;
pub use model::{ConfigRoot, JsonStyle, Model, ModelError};
pub use schema::{LeafKind, SchemaNode};
pub use server::Server;
pub use subscribe::SubscribeStream;
pub use types::*;
