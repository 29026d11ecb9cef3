//! # Command Assembly
//!
//! Purpose: Accumulate the ordered token list of one request and render it
//! into wire framing.
//!
//! A command is append-only while being built and immutable once handed to a
//! connection: `write_packed` borrows `&self` and the builder exposes no way
//! to replace or remove tokens, so a serialized command can never be observed
//! mid-mutation.

use bytes::BytesMut;

use redwire_proto::encode::write_command;

use crate::args::ToArgs;

/// One request: the command name followed by its argument tokens.
///
/// Token order is caller-controlled and must match the server's expectations
/// for the command being assembled.
#[derive(Debug, Clone)]
pub struct Cmd {
    tokens: Vec<Vec<u8>>,
}

/// Shorthand constructor in fluent style: `cmd("SET").arg("k").arg("v")`.
pub fn cmd(name: &str) -> Cmd {
    Cmd::new(name)
}

impl Cmd {
    /// Creates a command seeded with its name token.
    pub fn new(name: impl AsRef<[u8]>) -> Self {
        Cmd {
            tokens: vec![name.as_ref().to_vec()],
        }
    }

    /// Appends `arg`'s tokens and returns the builder for chaining.
    pub fn arg<T: ToArgs>(&mut self, arg: T) -> &mut Cmd {
        arg.write_args(&mut self.tokens);
        self
    }

    /// The command name token.
    pub fn name(&self) -> &[u8] {
        &self.tokens[0]
    }

    /// All tokens in request order.
    pub fn tokens(&self) -> &[Vec<u8>] {
        &self.tokens
    }

    /// Renders the token list into wire framing. Pure and repeatable.
    pub fn write_packed(&self, out: &mut BytesMut) {
        write_command(&self.tokens, out);
    }

    pub(crate) fn name_is(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name.as_bytes())
    }

    /// Commands that switch the connection into subscribe mode or back; they
    /// are only valid through the `PubSub` handle.
    pub(crate) fn is_subscribe_family(&self) -> bool {
        const SUBSCRIBE_FAMILY: &[&str] = &[
            "SUBSCRIBE",
            "UNSUBSCRIBE",
            "PSUBSCRIBE",
            "PUNSUBSCRIBE",
            "SSUBSCRIBE",
            "SUNSUBSCRIBE",
        ];
        SUBSCRIBE_FAMILY.iter().any(|name| self.name_is(name))
    }

    /// Commands that control transaction queuing.
    pub(crate) fn is_transaction_control(&self) -> bool {
        self.name_is("MULTI") || self.name_is("EXEC") || self.name_is("DISCARD")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SetCondition;

    #[test]
    fn test_set_with_condition_tokens() {
        let mut c = cmd("SET");
        c.arg("k").arg("v").arg(SetCondition::Nx);
        let tokens: Vec<&[u8]> = c.tokens().iter().map(|t| t.as_slice()).collect();
        assert_eq!(tokens, vec![b"SET".as_slice(), b"k", b"v", b"NX"]);
    }

    #[test]
    fn test_mset_pair_tokens() {
        let mut c = cmd("MSET");
        c.arg(vec![("a", "1"), ("b", "2")]);
        let tokens: Vec<&[u8]> = c.tokens().iter().map(|t| t.as_slice()).collect();
        assert_eq!(tokens, vec![b"MSET".as_slice(), b"a", b"1", b"b", b"2"]);
    }

    #[test]
    fn test_write_packed_framing() {
        let mut c = cmd("GET");
        c.arg("key");
        let mut buf = BytesMut::new();
        c.write_packed(&mut buf);
        assert_eq!(&buf[..], b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n");

        // Serialization is repeatable.
        let mut again = BytesMut::new();
        c.write_packed(&mut again);
        assert_eq!(buf, again);
    }

    #[test]
    fn test_family_checks_ignore_case() {
        assert!(cmd("subscribe").is_subscribe_family());
        assert!(cmd("PUnsubscribe").is_subscribe_family());
        assert!(cmd("multi").is_transaction_control());
        assert!(!cmd("GET").is_subscribe_family());
    }
}
