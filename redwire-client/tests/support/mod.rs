//! Scripted in-process server for integration tests.
//!
//! Each test declares the exact command tokens it expects and the raw reply
//! bytes to send back; any deviation fails the server task's assertions.

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use redwire_proto::{Parser, Value};

/// One step of the server script.
pub enum Action {
    /// Read one request and assert its tokens.
    Expect(Vec<Vec<u8>>),
    /// Write raw reply bytes, solicited or not.
    Reply(Vec<u8>),
}

/// Expect a request whose tokens are the given strings.
pub fn expect(tokens: &[&str]) -> Action {
    Action::Expect(tokens.iter().map(|t| t.as_bytes().to_vec()).collect())
}

/// Send raw reply bytes.
pub fn reply(bytes: &[u8]) -> Action {
    Action::Reply(bytes.to_vec())
}

/// Opt-in log output while debugging a failing test: RUST_LOG=trace.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Binds a listener, runs the script against the first connection, then
/// drains the socket until the client hangs up. Returns the address.
pub async fn spawn_server(script: Vec<Action>) -> String {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut parser = Parser::new();
        let mut buf = BytesMut::with_capacity(4 * 1024);

        for action in script {
            match action {
                Action::Expect(tokens) => {
                    let request = read_request(&mut stream, &mut parser, &mut buf).await;
                    assert_eq!(request, tokens, "unexpected command tokens");
                }
                Action::Reply(bytes) => {
                    stream.write_all(&bytes).await.expect("write reply");
                    stream.flush().await.expect("flush reply");
                }
            }
        }

        // Hold the socket open until the client is done with it.
        let mut sink = [0u8; 512];
        loop {
            match stream.read(&mut sink).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    addr
}

/// Requests are arrays of bulk strings, so the reply parser reads them too.
async fn read_request(
    stream: &mut TcpStream,
    parser: &mut Parser,
    buf: &mut BytesMut,
) -> Vec<Vec<u8>> {
    loop {
        match parser.parse(buf).expect("well-formed request") {
            Some(value) => return request_tokens(value),
            None => {
                let read = stream.read_buf(buf).await.expect("read request");
                assert!(read > 0, "client closed mid-request");
            }
        }
    }
}

fn request_tokens(value: Value) -> Vec<Vec<u8>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Bulk(data) => data,
                other => panic!("request token was {:?}", other),
            })
            .collect(),
        other => panic!("request was {:?}", other),
    }
}
