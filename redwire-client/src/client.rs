//! # Typed Client Facade
//!
//! Purpose: Expose a compact typed API for common commands over one
//! connection, exercising the encoder and decoder contracts end to end.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `Client` hides command assembly and conversion.
//! 2. **Fail Fast**: Server errors and shape mismatches surface immediately.
//! 3. **Protocol Literals**: Option types carry their wire keyword as an
//!    explicit string; the Rust identifier is never the source of truth.

use std::time::Duration;

use crate::args::ToArgs;
use crate::cmd::cmd;
use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::from_value::FromValue;

/// Condition under which SET stores its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    /// Only set the key if it does not already exist.
    Nx,
    /// Only set the key if it already exists.
    Xx,
}

impl ToArgs for SetCondition {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        out.push(match self {
            SetCondition::Nx => b"NX".to_vec(),
            SetCondition::Xx => b"XX".to_vec(),
        });
    }
}

/// Expiration attached by SET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetExpiration {
    /// Relative expiration in seconds.
    Ex(u64),
    /// Relative expiration in milliseconds.
    Px(u64),
    /// Absolute Unix time in seconds.
    ExAt(u64),
    /// Absolute Unix time in milliseconds.
    PxAt(u64),
}

impl ToArgs for SetExpiration {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        match self {
            SetExpiration::Ex(seconds) => {
                out.push(b"EX".to_vec());
                seconds.write_args(out);
            }
            SetExpiration::Px(millis) => {
                out.push(b"PX".to_vec());
                millis.write_args(out);
            }
            SetExpiration::ExAt(timestamp) => {
                out.push(b"EXAT".to_vec());
                timestamp.write_args(out);
            }
            SetExpiration::PxAt(timestamp) => {
                out.push(b"PXAT".to_vec());
                timestamp.write_args(out);
            }
        }
    }
}

/// Standalone keyword flags accepted by SET.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetFlags {
    bits: u8,
}

impl SetFlags {
    /// Return the previous value stored at the key.
    pub const GET: SetFlags = SetFlags { bits: 1 << 0 };
    /// Retain the key's existing time to live.
    pub const KEEP_TTL: SetFlags = SetFlags { bits: 1 << 1 };

    /// No flags set.
    pub const fn empty() -> Self {
        SetFlags { bits: 0 }
    }

    /// True when every flag in `other` is set in `self`.
    pub const fn contains(self, other: SetFlags) -> bool {
        self.bits & other.bits == other.bits
    }

    /// True when no flag is set.
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for SetFlags {
    type Output = SetFlags;

    fn bitor(self, rhs: SetFlags) -> SetFlags {
        SetFlags {
            bits: self.bits | rhs.bits,
        }
    }
}

impl ToArgs for SetFlags {
    // Tokens follow flag declaration order, independent of how the set was
    // built, so the wire output is deterministic.
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        if self.contains(SetFlags::GET) {
            out.push(b"GET".to_vec());
        }
        if self.contains(SetFlags::KEEP_TTL) {
            out.push(b"KEEPTTL".to_vec());
        }
    }
}

/// Full option block for SET.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Conditional store behavior.
    pub condition: Option<SetCondition>,
    /// Standalone keyword flags.
    pub flags: SetFlags,
    /// Expiration to attach.
    pub expiration: Option<SetExpiration>,
}

impl ToArgs for SetOptions {
    fn write_args(&self, out: &mut Vec<Vec<u8>>) {
        self.condition.write_args(out);
        self.flags.write_args(out);
        self.expiration.write_args(out);
    }
}

/// TTL state reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Key is missing or already expired.
    Missing,
    /// Key exists without expiration.
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

impl Ttl {
    /// Decodes the -2/-1/n reply convention of TTL.
    fn from_reply(seconds: i64) -> Ttl {
        match seconds {
            -2 => Ttl::Missing,
            -1 => Ttl::NoExpiry,
            n => Ttl::ExpiresIn(Duration::from_secs(n.max(0) as u64)),
        }
    }
}

/// Typed facade over a single connection.
pub struct Client {
    conn: Connection,
}

impl Client {
    /// Connects and negotiates per the configuration.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        Ok(Client {
            conn: Connection::connect(config).await?,
        })
    }

    /// Wraps an already-open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Client { conn }
    }

    /// Access to the underlying connection, e.g. for pipelines.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Releases the underlying connection, e.g. to enter subscribe mode.
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Pings the server; returns the status text.
    pub async fn ping(&mut self) -> Result<String> {
        self.conn.execute(&cmd("PING")).await
    }

    /// Echoes a payload back from the server.
    pub async fn echo<T: ToArgs>(&mut self, message: T) -> Result<Vec<u8>> {
        self.conn.execute(cmd("ECHO").arg(message)).await
    }

    /// Fetches a value by key; `None` when the key is missing.
    pub async fn get<K: ToArgs>(&mut self, key: K) -> Result<Option<Vec<u8>>> {
        self.conn.execute(cmd("GET").arg(key)).await
    }

    /// Stores a value without options.
    pub async fn set<K: ToArgs, V: ToArgs>(&mut self, key: K, value: V) -> Result<()> {
        self.conn.execute(cmd("SET").arg(key).arg(value)).await
    }

    /// Stores a value with conditions, flags, and expiration.
    ///
    /// The reply shape depends on the options (status, old value, or Null
    /// when a condition failed), so the target type is the caller's choice.
    pub async fn set_with_options<K, V, T>(
        &mut self,
        key: K,
        value: V,
        options: SetOptions,
    ) -> Result<T>
    where
        K: ToArgs,
        V: ToArgs,
        T: FromValue,
    {
        self.conn
            .execute(cmd("SET").arg(key).arg(value).arg(options))
            .await
    }

    /// Stores multiple key/value pairs in one request.
    pub async fn mset<P: ToArgs>(&mut self, pairs: P) -> Result<()> {
        self.conn.execute(cmd("MSET").arg(pairs)).await
    }

    /// Deletes a key. Returns true when a key was removed.
    pub async fn del<K: ToArgs>(&mut self, key: K) -> Result<bool> {
        let removed: i64 = self.conn.execute(cmd("DEL").arg(key)).await?;
        Ok(removed > 0)
    }

    /// True when the key exists.
    pub async fn exists<K: ToArgs>(&mut self, key: K) -> Result<bool> {
        let found: i64 = self.conn.execute(cmd("EXISTS").arg(key)).await?;
        Ok(found > 0)
    }

    /// Increments a counter and returns the new value.
    pub async fn incr_by<K: ToArgs>(&mut self, key: K, delta: i64) -> Result<i64> {
        self.conn.execute(cmd("INCRBY").arg(key).arg(delta)).await
    }

    /// Sets a time-to-live on a key. Returns true when the TTL was set.
    pub async fn expire<K: ToArgs>(&mut self, key: K, ttl: Duration) -> Result<bool> {
        let set: i64 = self
            .conn
            .execute(cmd("EXPIRE").arg(key).arg(ttl.as_secs()))
            .await?;
        Ok(set == 1)
    }

    /// Returns TTL status for a key.
    pub async fn ttl<K: ToArgs>(&mut self, key: K) -> Result<Ttl> {
        let seconds: i64 = self.conn.execute(cmd("TTL").arg(key)).await?;
        Ok(Ttl::from_reply(seconds))
    }

    /// Publishes a payload; returns the number of receiving subscribers.
    pub async fn publish<C: ToArgs, P: ToArgs>(&mut self, channel: C, payload: P) -> Result<u64> {
        self.conn
            .execute(cmd("PUBLISH").arg(channel).arg(payload))
            .await
    }

    /// Fetches server INFO output.
    pub async fn info(&mut self) -> Result<String> {
        self.conn.execute(&cmd("INFO")).await
    }

    /// Switches the logical database.
    pub async fn select(&mut self, database: u32) -> Result<()> {
        self.conn.execute(cmd("SELECT").arg(database)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_options_token_order() {
        let options = SetOptions {
            condition: Some(SetCondition::Nx),
            flags: SetFlags::GET,
            expiration: Some(SetExpiration::Ex(10)),
        };
        assert_eq!(
            options.to_args(),
            vec![
                b"NX".to_vec(),
                b"GET".to_vec(),
                b"EX".to_vec(),
                b"10".to_vec(),
            ]
        );
    }

    #[test]
    fn test_set_flags_declaration_order() {
        // Building KEEP_TTL first must not reorder the wire tokens.
        let flags = SetFlags::KEEP_TTL | SetFlags::GET;
        assert_eq!(flags.to_args(), vec![b"GET".to_vec(), b"KEEPTTL".to_vec()]);
    }

    #[test]
    fn test_empty_options_append_nothing() {
        assert!(SetOptions::default().to_args().is_empty());
        assert!(SetFlags::empty().is_empty());
    }

    #[test]
    fn test_expiration_payload_tokens() {
        assert_eq!(
            SetExpiration::PxAt(1700000000000).to_args(),
            vec![b"PXAT".to_vec(), b"1700000000000".to_vec()]
        );
    }

    #[test]
    fn test_ttl_reply_convention() {
        assert_eq!(Ttl::from_reply(-2), Ttl::Missing);
        assert_eq!(Ttl::from_reply(-1), Ttl::NoExpiry);
        assert_eq!(Ttl::from_reply(5), Ttl::ExpiresIn(Duration::from_secs(5)));
    }
}
