// redwire-proto - Wire data model and RESP codec for the redwire client
//
// This crate defines the reply value model, request framing, and the
// incremental reply parser shared by every higher-level component.

pub mod decode;
pub mod encode;
pub mod error;
pub mod value;

// Re-export for convenience
pub use decode::Parser;
pub use encode::write_command;
pub use error::DecodeError;
pub use value::{ServerError, Value};
