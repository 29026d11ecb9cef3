//! # Connection
//!
//! Purpose: Own one TCP byte stream and run the request/response protocol on
//! it: serialize a command, write it fully, read exactly one reply, convert.
//!
//! ## Design Principles
//! 1. **One Operation In Flight**: Every operation takes `&mut self`, so the
//!    exclusive borrow is the single-slot guard the protocol requires.
//! 2. **Resumable Reads**: TCP delivers arbitrary chunk boundaries; replies
//!    are accumulated in a reusable buffer until the parser yields a value.
//! 3. **Poison On Fatal**: A transport or decode failure leaves the stream in
//!    an unknown framing state; the connection refuses further use instead of
//!    guessing.
//! 4. **Explicit Modes**: MULTI/EXEC/DISCARD transitions are tracked on the
//!    connection; subscribe mode is a separate handle type (`PubSub`) so it
//!    cannot be entered by accident.

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, trace, warn};

use redwire_proto::{Parser, Value};

use crate::cmd::{cmd, Cmd};
use crate::config::{ClientConfig, ProtocolVersion};
use crate::error::{Error, Result};
use crate::from_value::{from_wire, FromValue};

/// Request/response modes tracked on the connection itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Ordinary request/response.
    Idle,
    /// Between MULTI and EXEC/DISCARD; commands are queued server-side.
    Queuing,
}

/// A single client connection.
///
/// Dropping an in-flight `execute` future (e.g. racing it against a timer)
/// leaves a reply on the wire with no consumer; the connection must then be
/// dropped, not reused.
pub struct Connection {
    stream: TcpStream,
    read_buf: BytesMut,
    write_buf: BytesMut,
    parser: Parser,
    protocol: ProtocolVersion,
    response_timeout: Option<Duration>,
    mode: Mode,
    poisoned: bool,
    hello: Option<Value>,
}

impl Connection {
    /// Opens a TCP connection and negotiates per the configuration.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let stream = match config.connect_timeout {
            Some(limit) => timeout(limit, TcpStream::connect(&config.addr))
                .await
                .map_err(|_| Error::Timeout)??,
            None => TcpStream::connect(&config.addr).await?,
        };
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;
        debug!(addr = %config.addr, "connected");

        let mut conn = Connection {
            stream,
            read_buf: BytesMut::with_capacity(8 * 1024),
            write_buf: BytesMut::with_capacity(512),
            parser: Parser::new(),
            protocol: config.protocol,
            response_timeout: config.response_timeout,
            mode: Mode::Idle,
            poisoned: false,
            hello: None,
        };
        conn.handshake(&config).await?;
        Ok(conn)
    }

    /// Negotiated protocol revision.
    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    /// Server metadata returned by the HELLO handshake, when one was sent.
    pub fn server_hello(&self) -> Option<&Value> {
        self.hello.as_ref()
    }

    /// True once a fatal error has invalidated this connection.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Executes one command and converts its reply.
    ///
    /// Subscribe-family commands are rejected here; enter subscribe mode
    /// through [`Connection::subscribe`] or [`Connection::psubscribe`], which
    /// hand back a dedicated `PubSub` handle.
    pub async fn execute<T: FromValue>(&mut self, command: &Cmd) -> Result<T> {
        let reply = self.request_value(command).await?;
        from_wire(reply)
    }

    /// Executes one command and returns the raw reply value, tracking
    /// transaction-mode transitions.
    pub(crate) async fn request_value(&mut self, command: &Cmd) -> Result<Value> {
        self.ensure_usable()?;
        if command.is_subscribe_family() {
            return Err(Error::InvalidState(
                "subscribe commands must go through the PubSub handle",
            ));
        }

        self.send_batch(std::slice::from_ref(command)).await?;
        let reply = self.read_value().await?;
        self.track_mode(command, &reply);
        Ok(reply)
    }

    /// Serializes a batch of commands into one write and flushes it.
    ///
    /// `write_all` retries partial writes until the transport accepts the
    /// whole buffer or reports an error.
    pub(crate) async fn send_batch(&mut self, commands: &[Cmd]) -> Result<()> {
        self.ensure_usable()?;
        self.write_buf.clear();
        for command in commands {
            command.write_packed(&mut self.write_buf);
            trace!(
                name = %String::from_utf8_lossy(command.name()),
                tokens = command.tokens().len(),
                "sending command"
            );
        }

        let write = async {
            self.stream.write_all(&self.write_buf).await?;
            self.stream.flush().await
        };
        if let Err(err) = write.await {
            self.poison("write failure");
            return Err(err.into());
        }
        Ok(())
    }

    /// Reads exactly one reply value, buffering partial input as needed.
    pub(crate) async fn read_value(&mut self) -> Result<Value> {
        self.ensure_usable()?;
        let deadline = self.response_timeout.map(|limit| Instant::now() + limit);

        loop {
            match self.parser.parse(&mut self.read_buf) {
                Ok(Some(value)) => {
                    trace!(shape = value.type_name(), "decoded reply");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(err) => {
                    self.poison("malformed reply framing");
                    return Err(err.into());
                }
            }

            let read = {
                let fill = self.stream.read_buf(&mut self.read_buf);
                match deadline {
                    Some(at) => match timeout_at(at, fill).await {
                        Ok(result) => result,
                        Err(_) => {
                            self.poison("response timeout elapsed");
                            return Err(Error::Timeout);
                        }
                    },
                    None => fill.await,
                }
            };
            match read {
                Ok(0) => {
                    self.poison("server closed the connection");
                    return Err(Error::Transport(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "server closed the connection",
                    )));
                }
                Ok(_) => {}
                Err(err) => {
                    self.poison("read failure");
                    return Err(err.into());
                }
            }
        }
    }

    pub(crate) fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(Error::ConnectionPoisoned);
        }
        Ok(())
    }

    pub(crate) fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    fn poison(&mut self, reason: &'static str) {
        if !self.poisoned {
            warn!(reason, "connection poisoned");
            self.poisoned = true;
        }
    }

    fn track_mode(&mut self, command: &Cmd, reply: &Value) {
        if !command.is_transaction_control() {
            return;
        }
        if command.name_is("MULTI") {
            if matches!(reply, Value::Simple(_)) {
                debug!("entering transaction queue");
                self.mode = Mode::Queuing;
            }
        } else {
            // EXEC or DISCARD, acknowledged or not, ends queuing.
            debug!("leaving transaction queue");
            self.mode = Mode::Idle;
        }
    }

    async fn handshake(&mut self, config: &ClientConfig) -> Result<()> {
        match self.protocol {
            ProtocolVersion::Resp3 => {
                let mut hello = cmd("HELLO");
                hello.arg(u16::from(self.protocol.version_number()));
                if let Some(password) = &config.password {
                    let username = config.username.as_deref().unwrap_or("default");
                    hello.arg("AUTH").arg(username).arg(password.as_str());
                }
                let reply: Value = self.execute(&hello).await?;
                debug!("negotiated extended protocol");
                self.hello = Some(reply);
            }
            ProtocolVersion::Resp2 => {
                if let Some(password) = &config.password {
                    let mut auth = cmd("AUTH");
                    if let Some(username) = &config.username {
                        auth.arg(username.as_str());
                    }
                    auth.arg(password.as_str());
                    self.execute::<()>(&auth).await?;
                    debug!("authenticated");
                }
            }
        }

        if config.database != 0 {
            let mut select = cmd("SELECT");
            select.arg(config.database);
            self.execute::<()>(&select).await?;
            debug!(database = config.database, "selected database");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("protocol", &self.protocol)
            .field("mode", &self.mode)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}
