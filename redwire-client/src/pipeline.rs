//! # Pipeline and Transaction Controller
//!
//! Purpose: Batch multiple commands into one write, then read exactly as many
//! replies, in submission order, to amortize round-trip latency.
//!
//! In atomic form the batch is wrapped in MULTI/EXEC: each wrapped command is
//! acknowledged as queued, and only the terminal EXEC reply carries results.
//! A Null EXEC reply means a watched key changed and nothing was applied.

use redwire_proto::{ServerError, Value};

use crate::cmd::Cmd;
use crate::connection::{Connection, Mode};
use crate::error::{Error, Result};

/// An ordered batch of commands executed over one connection.
#[derive(Debug, Default)]
pub struct Pipeline {
    commands: Vec<Cmd>,
    atomic: bool,
}

impl Pipeline {
    /// Creates an empty, non-atomic pipeline.
    pub fn new() -> Self {
        Pipeline {
            commands: Vec::new(),
            atomic: false,
        }
    }

    /// Wraps the batch in MULTI/EXEC when queried.
    pub fn atomic(&mut self) -> &mut Self {
        self.atomic = true;
        self
    }

    /// Appends a command to the batch.
    pub fn add(&mut self, command: Cmd) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Number of commands in the batch.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when no commands have been added.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Sends the batch and collects one reply per command, in order.
    ///
    /// Non-atomic form: server errors are returned in-slot as
    /// [`Value::Error`], leaving conversion to the caller. Atomic form: the
    /// EXEC result array is returned; a Null EXEC reply yields
    /// [`Error::TransactionAborted`].
    pub async fn query(&self, conn: &mut Connection) -> Result<Vec<Value>> {
        conn.ensure_usable()?;
        self.check_commands(conn)?;
        if self.commands.is_empty() {
            return Ok(Vec::new());
        }

        if self.atomic {
            self.query_atomic(conn).await
        } else {
            self.query_plain(conn).await
        }
    }

    fn check_commands(&self, conn: &Connection) -> Result<()> {
        if conn.mode() == Mode::Queuing {
            return Err(Error::InvalidState(
                "connection is inside an explicit MULTI block",
            ));
        }
        for command in &self.commands {
            if command.is_subscribe_family() {
                return Err(Error::InvalidState(
                    "subscribe commands cannot be pipelined",
                ));
            }
            if command.is_transaction_control() {
                return Err(Error::InvalidState(
                    "transaction control belongs to Pipeline::atomic, not the batch",
                ));
            }
        }
        Ok(())
    }

    async fn query_plain(&self, conn: &mut Connection) -> Result<Vec<Value>> {
        conn.send_batch(&self.commands).await?;

        let mut replies = Vec::with_capacity(self.commands.len());
        for _ in 0..self.commands.len() {
            replies.push(conn.read_value().await?);
        }
        Ok(replies)
    }

    async fn query_atomic(&self, conn: &mut Connection) -> Result<Vec<Value>> {
        let mut framed = Vec::with_capacity(self.commands.len() + 2);
        framed.push(Cmd::new("MULTI"));
        framed.extend(self.commands.iter().cloned());
        framed.push(Cmd::new("EXEC"));
        conn.send_batch(&framed).await?;

        // MULTI ack. If it failed, the queued commands ran as plain commands
        // and EXEC failed too; drain their replies to keep the stream aligned.
        let multi_ack = conn.read_value().await?;
        if let Value::Error(err) = multi_ack {
            for _ in 0..self.commands.len() + 1 {
                conn.read_value().await?;
            }
            return Err(Error::Server(err));
        }

        // Per-command queued acks. The first queue rejection wins, but every
        // ack and the EXEC reply are still consumed.
        let mut queue_error: Option<ServerError> = None;
        for _ in 0..self.commands.len() {
            if let Value::Error(err) = conn.read_value().await? {
                queue_error.get_or_insert(err);
            }
        }

        let exec_reply = conn.read_value().await?;
        if let Some(err) = queue_error {
            return Err(Error::Server(err));
        }

        match exec_reply {
            Value::Null => Err(Error::TransactionAborted),
            Value::Array(results) => Ok(results),
            Value::Error(err) => Err(Error::Server(err)),
            other => Err(Error::TypeMismatch {
                expected: "EXEC result array",
                actual: other.type_name().to_string(),
            }),
        }
    }
}
