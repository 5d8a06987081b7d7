//! ebics-core: shared types, return-code registry, config schema, and error types

pub mod config;
pub mod error;
pub mod return_code;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use error::{EbicsError, EbicsResult};
pub use return_code::{MessageCatalog, ReturnCode};
pub use transport::Transport;
pub use types::{OrderType, Subscriber, TransactionPhase, TransferDirection};
