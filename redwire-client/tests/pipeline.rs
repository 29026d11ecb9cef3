use std::time::Duration;

use redwire_client::{cmd, ClientConfig, Connection, Error, Pipeline, Value};

mod support;
use support::{expect, reply, spawn_server, Action};

fn config(addr: String) -> ClientConfig {
    let mut config = ClientConfig::new(addr);
    config.response_timeout = Some(Duration::from_secs(2));
    config.connect_timeout = Some(Duration::from_secs(2));
    config
}

#[tokio::test]
async fn empty_pipeline_performs_no_io() {
    let addr = spawn_server(vec![]).await;
    let mut conn = Connection::connect(config(addr)).await.expect("connect");

    let replies = Pipeline::new().query(&mut conn).await.expect("query");
    assert!(replies.is_empty());
}

#[tokio::test]
async fn single_command_pipeline() {
    let addr = spawn_server(vec![expect(&["GET", "key"]), reply(b"$1\r\nv\r\n")]).await;
    let mut conn = Connection::connect(config(addr)).await.expect("connect");

    let mut pipe = Pipeline::new();
    pipe.add({
        let mut c = cmd("GET");
        c.arg("key");
        c
    });
    let replies = pipe.query(&mut conn).await.expect("query");
    assert_eq!(replies, vec![Value::Bulk(b"v".to_vec())]);
}

#[tokio::test]
async fn fifty_command_pipeline_preserves_order() {
    let mut script = Vec::new();
    for i in 0..50 {
        script.push(expect(&["ECHO", &i.to_string()]));
    }
    for i in 0..50 {
        let payload = i.to_string();
        script.push(Action::Reply(
            format!("${}\r\n{}\r\n", payload.len(), payload).into_bytes(),
        ));
    }
    let addr = spawn_server(script).await;
    let mut conn = Connection::connect(config(addr)).await.expect("connect");

    let mut pipe = Pipeline::new();
    for i in 0..50 {
        let mut c = cmd("ECHO");
        c.arg(i.to_string());
        pipe.add(c);
    }

    let replies = pipe.query(&mut conn).await.expect("query");
    assert_eq!(replies.len(), 50);
    for (i, value) in replies.iter().enumerate() {
        assert_eq!(*value, Value::Bulk(i.to_string().into_bytes()));
    }
}

#[tokio::test]
async fn pipeline_returns_server_errors_in_slot() {
    let addr = spawn_server(vec![
        expect(&["GET", "a"]),
        expect(&["GET", "b"]),
        expect(&["GET", "c"]),
        reply(b"$1\r\n1\r\n"),
        reply(b"-ERR broken slot\r\n"),
        reply(b"$1\r\n3\r\n"),
    ])
    .await;
    let mut conn = Connection::connect(config(addr)).await.expect("connect");

    let mut pipe = Pipeline::new();
    for key in ["a", "b", "c"] {
        let mut c = cmd("GET");
        c.arg(key);
        pipe.add(c);
    }

    let replies = pipe.query(&mut conn).await.expect("query");
    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0], Value::Bulk(b"1".to_vec()));
    assert!(replies[1].is_error());
    assert_eq!(replies[2], Value::Bulk(b"3".to_vec()));
}

#[tokio::test]
async fn atomic_pipeline_returns_exec_results() {
    let addr = spawn_server(vec![
        expect(&["MULTI"]),
        expect(&["SET", "k", "v"]),
        expect(&["INCRBY", "n", "1"]),
        expect(&["EXEC"]),
        reply(b"+OK\r\n"),
        reply(b"+QUEUED\r\n"),
        reply(b"+QUEUED\r\n"),
        reply(b"*2\r\n+OK\r\n:2\r\n"),
    ])
    .await;
    let mut conn = Connection::connect(config(addr)).await.expect("connect");

    let mut pipe = Pipeline::new();
    pipe.atomic();
    pipe.add({
        let mut c = cmd("SET");
        c.arg("k").arg("v");
        c
    });
    pipe.add({
        let mut c = cmd("INCRBY");
        c.arg("n").arg(1);
        c
    });

    let results = pipe.query(&mut conn).await.expect("query");
    assert_eq!(
        results,
        vec![Value::Simple("OK".to_string()), Value::Int(2)]
    );
}

#[tokio::test]
async fn aborted_transaction_yields_explicit_error() {
    let addr = spawn_server(vec![
        expect(&["MULTI"]),
        expect(&["SET", "k", "v"]),
        expect(&["EXEC"]),
        reply(b"+OK\r\n"),
        reply(b"+QUEUED\r\n"),
        // A watched key changed: EXEC replies Null and nothing was applied.
        reply(b"*-1\r\n"),
        expect(&["PING"]),
        reply(b"+PONG\r\n"),
    ])
    .await;
    let mut conn = Connection::connect(config(addr)).await.expect("connect");

    let mut pipe = Pipeline::new();
    pipe.atomic();
    pipe.add({
        let mut c = cmd("SET");
        c.arg("k").arg("v");
        c
    });

    match pipe.query(&mut conn).await {
        Err(Error::TransactionAborted) => {}
        other => panic!("expected aborted transaction, got {:?}", other),
    }

    // Abort is per-call; the connection stays usable.
    let pong: String = conn.execute(&cmd("PING")).await.expect("ping");
    assert_eq!(pong, "PONG");
}

#[tokio::test]
async fn queue_rejection_surfaces_after_draining() {
    let addr = spawn_server(vec![
        expect(&["MULTI"]),
        expect(&["BROKEN"]),
        expect(&["EXEC"]),
        reply(b"+OK\r\n"),
        reply(b"-ERR unknown command 'BROKEN'\r\n"),
        reply(b"-EXECABORT Transaction discarded because of previous errors.\r\n"),
        expect(&["PING"]),
        reply(b"+PONG\r\n"),
    ])
    .await;
    let mut conn = Connection::connect(config(addr)).await.expect("connect");

    let mut pipe = Pipeline::new();
    pipe.atomic();
    pipe.add(cmd("BROKEN"));

    match pipe.query(&mut conn).await {
        Err(Error::Server(err)) => assert_eq!(err.code, "ERR"),
        other => panic!("expected queue rejection, got {:?}", other),
    }

    // Every ack and the EXEC reply were consumed; the stream is aligned.
    let pong: String = conn.execute(&cmd("PING")).await.expect("ping");
    assert_eq!(pong, "PONG");
}

#[tokio::test]
async fn manual_multi_exec_tracks_queuing_mode() {
    let addr = spawn_server(vec![
        expect(&["MULTI"]),
        reply(b"+OK\r\n"),
        expect(&["SET", "k", "v"]),
        reply(b"+QUEUED\r\n"),
        expect(&["EXEC"]),
        reply(b"*1\r\n+OK\r\n"),
    ])
    .await;
    let mut conn = Connection::connect(config(addr)).await.expect("connect");

    conn.execute::<()>(&cmd("MULTI")).await.expect("multi");

    // While queuing, a pipeline on the same connection is refused.
    let mut pipe = Pipeline::new();
    pipe.add(cmd("PING"));
    match pipe.query(&mut conn).await {
        Err(Error::InvalidState(_)) => {}
        other => panic!("expected invalid state, got {:?}", other),
    }

    // Queued commands are acknowledged, not executed.
    let mut queued = cmd("SET");
    queued.arg("k").arg("v");
    let ack: String = conn.execute(&queued).await.expect("queued set");
    assert_eq!(ack, "QUEUED");

    let results: Vec<Value> = conn.execute(&cmd("EXEC")).await.expect("exec");
    assert_eq!(results, vec![Value::Simple("OK".to_string())]);
}

#[tokio::test]
async fn pipeline_rejects_transaction_control_commands() {
    let addr = spawn_server(vec![]).await;
    let mut conn = Connection::connect(config(addr)).await.expect("connect");

    let mut pipe = Pipeline::new();
    pipe.add(cmd("MULTI"));
    match pipe.query(&mut conn).await {
        Err(Error::InvalidState(_)) => {}
        other => panic!("expected invalid state, got {:?}", other),
    }
}
