//! # redwire Client
//!
//! Purpose: Issue commands to a Redis-compatible server over TCP and receive
//! typed results, with explicit support for pipelining, MULTI/EXEC
//! transactions, and subscribe-mode streaming.
//!
//! ## Design Principles
//! 1. **Typed Boundaries**: `ToArgs` turns values into wire tokens and
//!    `FromValue` turns replies into results; nothing else touches framing.
//! 2. **One Operation In Flight**: `&mut Connection` receivers enforce the
//!    protocol's single-slot ordering without a runtime lock.
//! 3. **Fatal Means Fatal**: Transport and decode failures poison the
//!    connection; only reconnecting recovers.
//! 4. **Modes By Construction**: Subscribe mode is a separate handle type, so
//!    mixing it with request/response cannot compile.

mod args;
mod client;
mod cmd;
mod config;
mod connection;
mod error;
mod from_value;
mod pipeline;
mod pubsub;

pub use args::ToArgs;
pub use client::{Client, SetCondition, SetExpiration, SetFlags, SetOptions, Ttl};
pub use cmd::{cmd, Cmd};
pub use config::{ClientConfig, ProtocolVersion};
pub use connection::Connection;
pub use error::{Error, Result};
pub use from_value::{from_wire, FromValue};
pub use pipeline::Pipeline;
pub use pubsub::{Message, PubSub, PushEvent, SubscriptionKind};

// The wire value model is part of the public surface (raw pipeline replies,
// server hello, custom conversions).
pub use redwire_proto::{DecodeError, ServerError, Value};
