//! # Subscription Stream
//!
//! Purpose: Repurpose a connection as a receive loop for unsolicited push
//! messages, with the ordinary request/response surface made unreachable.
//!
//! ## Design Principles
//! 1. **Mode By Type**: Entering subscribe mode consumes the `Connection`;
//!    only the `PubSub` handle remains, so a normal command cannot be issued
//!    on a subscribed stream.
//! 2. **Acks Are Events**: Administrative replies to (un)subscribe commands
//!    arrive interleaved with payload pushes and are yielded as distinct
//!    events, never discarded.
//! 3. **Both Wire Forms**: RESP3 delivers pushes as `>` frames, RESP2 as
//!    plain arrays; classification is by the first token, not the frame kind.

use tracing::{debug, trace};

use redwire_proto::Value;

use crate::args::ToArgs;
use crate::cmd::Cmd;
use crate::connection::{Connection, Mode};
use crate::error::{Error, Result};

/// What a subscription target is: a literal channel, a glob pattern, or a
/// sharded channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    /// SUBSCRIBE / UNSUBSCRIBE.
    Channel,
    /// PSUBSCRIBE / PUNSUBSCRIBE.
    Pattern,
    /// SSUBSCRIBE / SUNSUBSCRIBE.
    Shard,
}

/// A published payload delivered to this subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Channel the message was published to.
    pub channel: String,
    /// Pattern that matched, for pattern subscriptions.
    pub pattern: Option<String>,
    /// Raw message payload.
    pub payload: Vec<u8>,
}

impl Message {
    /// Payload as UTF-8 text, when it is text.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// One decoded push frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A published message ("message", "pmessage", or "smessage").
    Message(Message),
    /// Acknowledgement of a subscribe command; `count` is the server's
    /// current subscription total for this client.
    Subscribed {
        /// Which subscribe family was acknowledged.
        kind: SubscriptionKind,
        /// The channel or pattern that was added.
        target: String,
        /// Subscriptions remaining after the change.
        count: u64,
    },
    /// Acknowledgement of an unsubscribe command; `target` is absent when
    /// the command matched no subscription.
    Unsubscribed {
        /// Which unsubscribe family was acknowledged.
        kind: SubscriptionKind,
        /// The channel or pattern that was removed.
        target: Option<String>,
        /// Subscriptions remaining after the change.
        count: u64,
    },
}

impl Connection {
    /// Subscribes to the given channels, consuming the connection into a
    /// [`PubSub`] handle. Acknowledgements arrive as events on the handle.
    pub async fn subscribe<T: ToArgs>(self, channels: T) -> Result<PubSub> {
        self.into_pubsub("SUBSCRIBE", channels).await
    }

    /// Subscribes to the given patterns, consuming the connection.
    pub async fn psubscribe<T: ToArgs>(self, patterns: T) -> Result<PubSub> {
        self.into_pubsub("PSUBSCRIBE", patterns).await
    }

    async fn into_pubsub<T: ToArgs>(mut self, name: &str, targets: T) -> Result<PubSub> {
        self.ensure_usable()?;
        if self.mode() == Mode::Queuing {
            return Err(Error::InvalidState(
                "cannot enter subscribe mode inside a MULTI block",
            ));
        }
        let mut pubsub = PubSub {
            conn: self,
            used_shard: false,
        };
        pubsub.send(name, targets).await?;
        debug!("entered subscribe mode");
        Ok(pubsub)
    }
}

/// Handle for a connection in subscribe mode.
///
/// The only operations left are managing subscriptions and receiving the
/// lazy, unbounded event stream; [`PubSub::unsubscribe_all`] converts the
/// handle back into an ordinary [`Connection`].
pub struct PubSub {
    conn: Connection,
    used_shard: bool,
}

impl PubSub {
    /// Adds channel subscriptions.
    pub async fn subscribe<T: ToArgs>(&mut self, channels: T) -> Result<()> {
        self.send("SUBSCRIBE", channels).await
    }

    /// Adds pattern subscriptions.
    pub async fn psubscribe<T: ToArgs>(&mut self, patterns: T) -> Result<()> {
        self.send("PSUBSCRIBE", patterns).await
    }

    /// Adds sharded channel subscriptions.
    pub async fn ssubscribe<T: ToArgs>(&mut self, channels: T) -> Result<()> {
        self.used_shard = true;
        self.send("SSUBSCRIBE", channels).await
    }

    /// Removes channel subscriptions; with no arguments, removes all.
    pub async fn unsubscribe<T: ToArgs>(&mut self, channels: T) -> Result<()> {
        self.send("UNSUBSCRIBE", channels).await
    }

    /// Removes pattern subscriptions; with no arguments, removes all.
    pub async fn punsubscribe<T: ToArgs>(&mut self, patterns: T) -> Result<()> {
        self.send("PUNSUBSCRIBE", patterns).await
    }

    /// Removes sharded channel subscriptions.
    pub async fn sunsubscribe<T: ToArgs>(&mut self, channels: T) -> Result<()> {
        self.send("SUNSUBSCRIBE", channels).await
    }

    /// Waits for the next push frame and classifies it.
    pub async fn next_event(&mut self) -> Result<PushEvent> {
        let value = self.conn.read_value().await?;
        classify(value)
    }

    /// Waits for the next published message, yielding administrative
    /// acknowledgements to the log only.
    pub async fn next_message(&mut self) -> Result<Message> {
        loop {
            match self.next_event().await? {
                PushEvent::Message(message) => return Ok(message),
                event => trace!(?event, "administrative push"),
            }
        }
    }

    /// Unsubscribes from everything and returns the connection to ordinary
    /// request/response use.
    ///
    /// Messages still in flight while the unsubscribes drain are dropped.
    pub async fn unsubscribe_all(mut self) -> Result<Connection> {
        self.send("UNSUBSCRIBE", ()).await?;
        self.send("PUNSUBSCRIBE", ()).await?;
        let terminal_kind = if self.used_shard {
            self.send("SUNSUBSCRIBE", ()).await?;
            SubscriptionKind::Shard
        } else {
            SubscriptionKind::Pattern
        };

        // Replies drain in command order, so the terminal ack is the last
        // unsubscribe event of the last family sent, with nothing remaining.
        loop {
            match self.next_event().await? {
                PushEvent::Unsubscribed { kind, count: 0, .. } if kind == terminal_kind => {
                    break;
                }
                event => trace!(?event, "draining subscribe mode"),
            }
        }

        debug!("left subscribe mode");
        self.conn.set_mode(Mode::Idle);
        Ok(self.conn)
    }

    async fn send<T: ToArgs>(&mut self, name: &str, targets: T) -> Result<()> {
        let mut command = Cmd::new(name);
        command.arg(targets);
        self.conn.send_batch(std::slice::from_ref(&command)).await
    }
}

fn classify(value: Value) -> Result<PushEvent> {
    let items = match value {
        Value::Push(items) | Value::Array(items) => items,
        Value::Error(err) => return Err(Error::Server(err)),
        other => {
            return Err(Error::TypeMismatch {
                expected: "push frame",
                actual: other.type_name().to_string(),
            })
        }
    };

    let mut iter = items.into_iter();
    let kind = next_text(&mut iter, "push kind token")?;

    match kind.as_str() {
        "message" | "smessage" => Ok(PushEvent::Message(Message {
            channel: next_text(&mut iter, "channel")?,
            pattern: None,
            payload: next_bytes(&mut iter, "payload")?,
        })),
        "pmessage" => {
            let pattern = next_text(&mut iter, "pattern")?;
            Ok(PushEvent::Message(Message {
                channel: next_text(&mut iter, "channel")?,
                pattern: Some(pattern),
                payload: next_bytes(&mut iter, "payload")?,
            }))
        }
        "subscribe" | "psubscribe" | "ssubscribe" => Ok(PushEvent::Subscribed {
            kind: family_of(&kind),
            target: next_text(&mut iter, "target")?,
            count: next_count(&mut iter)?,
        }),
        "unsubscribe" | "punsubscribe" | "sunsubscribe" => {
            let target = match iter.next() {
                Some(Value::Null) | None => None,
                Some(value) => Some(text_of(value, "target")?),
            };
            Ok(PushEvent::Unsubscribed {
                kind: family_of(&kind),
                target,
                count: next_count(&mut iter)?,
            })
        }
        _ => Err(Error::TypeMismatch {
            expected: "known push kind",
            actual: format!("push tagged {:?}", kind),
        }),
    }
}

fn family_of(kind: &str) -> SubscriptionKind {
    match kind {
        "psubscribe" | "punsubscribe" => SubscriptionKind::Pattern,
        "ssubscribe" | "sunsubscribe" => SubscriptionKind::Shard,
        _ => SubscriptionKind::Channel,
    }
}

fn next_text(iter: &mut std::vec::IntoIter<Value>, what: &'static str) -> Result<String> {
    match iter.next() {
        Some(value) => text_of(value, what),
        None => Err(Error::TypeMismatch {
            expected: what,
            actual: "truncated push frame".to_string(),
        }),
    }
}

fn text_of(value: Value, what: &'static str) -> Result<String> {
    match value {
        Value::Bulk(data) => String::from_utf8(data).map_err(|_| Error::TypeMismatch {
            expected: what,
            actual: "bulk string with invalid UTF-8".to_string(),
        }),
        Value::Simple(text) => Ok(text),
        other => Err(Error::TypeMismatch {
            expected: what,
            actual: other.type_name().to_string(),
        }),
    }
}

fn next_bytes(iter: &mut std::vec::IntoIter<Value>, what: &'static str) -> Result<Vec<u8>> {
    match iter.next() {
        Some(Value::Bulk(data)) => Ok(data),
        Some(Value::Simple(text)) => Ok(text.into_bytes()),
        Some(other) => Err(Error::TypeMismatch {
            expected: what,
            actual: other.type_name().to_string(),
        }),
        None => Err(Error::TypeMismatch {
            expected: what,
            actual: "truncated push frame".to_string(),
        }),
    }
}

fn next_count(iter: &mut std::vec::IntoIter<Value>) -> Result<u64> {
    match iter.next() {
        Some(Value::Int(n)) if n >= 0 => Ok(n as u64),
        Some(other) => Err(Error::TypeMismatch {
            expected: "subscription count",
            actual: other.type_name().to_string(),
        }),
        None => Err(Error::TypeMismatch {
            expected: "subscription count",
            actual: "truncated push frame".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(data: &[u8]) -> Value {
        Value::Bulk(data.to_vec())
    }

    #[test]
    fn test_classify_message_push() {
        let event = classify(Value::Push(vec![
            bulk(b"message"),
            bulk(b"c"),
            bulk(b"hello"),
        ]))
        .unwrap();
        assert_eq!(
            event,
            PushEvent::Message(Message {
                channel: "c".to_string(),
                pattern: None,
                payload: b"hello".to_vec(),
            })
        );
    }

    #[test]
    fn test_classify_resp2_array_form() {
        let event = classify(Value::Array(vec![
            bulk(b"pmessage"),
            bulk(b"c.*"),
            bulk(b"c.1"),
            bulk(b"payload"),
        ]))
        .unwrap();
        match event {
            PushEvent::Message(message) => {
                assert_eq!(message.pattern.as_deref(), Some("c.*"));
                assert_eq!(message.channel, "c.1");
                assert_eq!(message.payload, b"payload");
            }
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_subscribe_ack() {
        let event = classify(Value::Array(vec![
            bulk(b"subscribe"),
            bulk(b"c"),
            Value::Int(1),
        ]))
        .unwrap();
        assert_eq!(
            event,
            PushEvent::Subscribed {
                kind: SubscriptionKind::Channel,
                target: "c".to_string(),
                count: 1,
            }
        );
    }

    #[test]
    fn test_classify_unsubscribe_without_target() {
        let event = classify(Value::Array(vec![
            bulk(b"punsubscribe"),
            Value::Null,
            Value::Int(0),
        ]))
        .unwrap();
        assert_eq!(
            event,
            PushEvent::Unsubscribed {
                kind: SubscriptionKind::Pattern,
                target: None,
                count: 0,
            }
        );
    }

    #[test]
    fn test_classify_rejects_ordinary_reply() {
        assert!(matches!(
            classify(Value::Simple("OK".to_string())),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_classify_surfaces_server_error() {
        let err = classify(Value::Error(redwire_proto::ServerError::from_line(
            "ERR bad",
        )))
        .unwrap_err();
        assert!(matches!(err, Error::Server(_)));
    }
}
