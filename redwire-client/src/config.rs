//! # Client Configuration
//!
//! Purpose: Collect everything needed to open and negotiate one connection.
//! The core itself only consumes the resulting stream and protocol flag.

use std::time::Duration;

/// Protocol revision to negotiate with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolVersion {
    /// Legacy protocol; no handshake required.
    #[default]
    Resp2,
    /// Extended protocol with richer reply shapes, negotiated via HELLO.
    Resp3,
}

impl ProtocolVersion {
    /// Numeric version sent in the HELLO handshake.
    pub fn version_number(&self) -> u8 {
        match self {
            ProtocolVersion::Resp2 => 2,
            ProtocolVersion::Resp3 => 3,
        }
    }

    /// Check if this is the extended protocol.
    pub fn is_resp3(&self) -> bool {
        matches!(self, ProtocolVersion::Resp3)
    }
}

/// Configuration for a single connection.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Username for authentication; requires `password`.
    pub username: Option<String>,
    /// Password for authentication.
    pub password: Option<String>,
    /// Database index selected after connecting (0 skips SELECT).
    pub database: u32,
    /// Protocol revision to negotiate.
    pub protocol: ProtocolVersion,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional deadline for each reply read. Firing it poisons the
    /// connection, since the reply may still arrive later.
    pub response_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            username: None,
            password: None,
            database: 0,
            protocol: ProtocolVersion::Resp2,
            connect_timeout: None,
            response_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Configuration for the given address with all other fields defaulted.
    pub fn new(addr: impl Into<String>) -> Self {
        ClientConfig {
            addr: addr.into(),
            ..ClientConfig::default()
        }
    }
}
