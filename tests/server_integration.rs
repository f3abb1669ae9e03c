//! End-to-end tests over real TCP
//!
//! Each test starts a server on a random port, speaks the length-prefixed
//! binary protocol through the public codec, and checks the tagged
//! responses, mirroring the external conformance scripts.

use bytes::{BufMut, BytesMut};
use scorekv::network::protocol;
use scorekv::{Config, ResponseValue, ScoreKvServer};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

async fn start_server() -> (ScoreKvServer, SocketAddr) {
    let mut config = Config::default();
    config.server.port = 0;
    config.server.bind_address = "127.0.0.1".to_string();

    let mut server = ScoreKvServer::new(config).unwrap();
    let addr = server.start_with_addr().await.unwrap();
    (server, addr)
}

struct TestClient {
    stream: TcpStream,
    read_buf: BytesMut,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
        }
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    async fn read_response(&mut self) -> ResponseValue {
        loop {
            if let Some(value) = protocol::decode_response(&mut self.read_buf).unwrap() {
                return value;
            }
            let n = timeout(
                Duration::from_secs(5),
                self.stream.read_buf(&mut self.read_buf),
            )
            .await
            .expect("timed out waiting for response")
            .unwrap();
            assert!(n > 0, "server closed the connection unexpectedly");
        }
    }

    async fn request(&mut self, args: &[&str]) -> ResponseValue {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut frame = BytesMut::new();
        protocol::encode_request(&args, &mut frame);
        self.send_raw(&frame).await;
        self.read_response().await
    }
}

fn int(n: i64) -> ResponseValue {
    ResponseValue::Int(n)
}

fn dbl(d: f64) -> ResponseValue {
    ResponseValue::Dbl(d)
}

fn str_value(s: &str) -> ResponseValue {
    ResponseValue::Str(s.to_string())
}

fn pairs(items: &[(&str, f64)]) -> ResponseValue {
    let mut values = Vec::new();
    for (member, score) in items {
        values.push(str_value(member));
        values.push(dbl(*score));
    }
    ResponseValue::Arr(values)
}

fn err_code(value: &ResponseValue) -> i32 {
    match value {
        ResponseValue::Err { code, .. } => *code,
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn sorted_set_end_to_end_scenario() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    assert_eq!(client.request(&["zscore", "asdf", "n1"]).await, ResponseValue::Nil);
    assert_eq!(
        client.request(&["zquery", "xxx", "1", "asdf", "1", "10"]).await,
        pairs(&[])
    );

    assert_eq!(client.request(&["zadd", "zset", "1", "n1"]).await, int(1));
    assert_eq!(client.request(&["zadd", "zset", "2", "n2"]).await, int(1));
    assert_eq!(client.request(&["zadd", "zset", "1.1", "n1"]).await, int(0));
    assert_eq!(client.request(&["zscore", "zset", "n1"]).await, dbl(1.1));

    assert_eq!(
        client.request(&["zquery", "zset", "1", "", "0", "10"]).await,
        pairs(&[("n1", 1.1), ("n2", 2.0)])
    );
    assert_eq!(
        client.request(&["zquery", "zset", "1.1", "", "1", "10"]).await,
        pairs(&[("n2", 2.0)])
    );
    assert_eq!(
        client.request(&["zquery", "zset", "1.1", "", "2", "10"]).await,
        pairs(&[])
    );

    assert_eq!(client.request(&["zrem", "zset", "adsf"]).await, int(0));
    assert_eq!(client.request(&["zrem", "zset", "n1"]).await, int(1));
    assert_eq!(
        client.request(&["zquery", "zset", "1", "", "0", "10"]).await,
        pairs(&[("n2", 2.0)])
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn ttl_scenario() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    assert_eq!(client.request(&["zadd", "key1", "5", "test"]).await, int(1));
    assert_eq!(client.request(&["pexpire", "key1", "1000"]).await, int(1));

    match client.request(&["pttl", "key1"]).await {
        ResponseValue::Int(ttl) => assert!(ttl > 900 && ttl <= 1000, "unexpected ttl {ttl}"),
        other => panic!("expected int, got {other:?}"),
    }

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn expired_key_is_gone_without_a_sweep() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    assert_eq!(client.request(&["set", "key1", "5"]).await, ResponseValue::Nil);
    assert_eq!(client.request(&["pexpire", "key1", "50"]).await, int(1));

    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(client.request(&["pttl", "key1"]).await, int(-2));
    assert_eq!(client.request(&["get", "key1"]).await, ResponseValue::Nil);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn pttl_reports_minus_one_without_ttl() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    assert_eq!(client.request(&["set", "key1", "v"]).await, ResponseValue::Nil);
    assert_eq!(client.request(&["pttl", "key1"]).await, int(-1));
    assert_eq!(client.request(&["pttl", "missing"]).await, int(-2));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn parse_errors_carry_code_4_and_leave_state_alone() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    let response = client.request(&["zadd", "z1", "not-a-number", "a"]).await;
    assert_eq!(
        response,
        ResponseValue::Err {
            code: 4,
            message: "expect float".to_string()
        }
    );

    let response = client.request(&["zquery", "z1", "0", "", "0", "bad"]).await;
    assert_eq!(
        response,
        ResponseValue::Err {
            code: 4,
            message: "expect int".to_string()
        }
    );

    // Neither failure touched the keyspace
    assert_eq!(client.request(&["zscore", "z1", "a"]).await, ResponseValue::Nil);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn unknown_command_and_bad_arity() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    assert_eq!(err_code(&client.request(&["nosuch", "x"]).await), 1);
    // Command names are case-sensitive
    assert_eq!(err_code(&client.request(&["GET", "key1"]).await), 1);
    // Known command, wrong argument count
    assert_eq!(err_code(&client.request(&["get"]).await), 2);
    assert_eq!(err_code(&client.request(&["zadd", "zset", "1"]).await), 2);

    // The connection survives all of it
    assert_eq!(client.request(&["set", "key1", "v"]).await, ResponseValue::Nil);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn wrong_type_access_reports_code_3() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    assert_eq!(client.request(&["set", "plain", "v"]).await, ResponseValue::Nil);
    assert_eq!(err_code(&client.request(&["zadd", "plain", "1", "n1"]).await), 3);
    assert_eq!(err_code(&client.request(&["zscore", "plain", "n1"]).await), 3);

    assert_eq!(client.request(&["zadd", "zset", "1", "n1"]).await, int(1));
    assert_eq!(err_code(&client.request(&["get", "zset"]).await), 3);

    // zquery against the wrong type stays an empty array, not an error
    assert_eq!(
        client.request(&["zquery", "plain", "0", "", "0", "10"]).await,
        pairs(&[])
    );

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn del_removes_either_type() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    assert_eq!(client.request(&["set", "key1", "v"]).await, ResponseValue::Nil);
    assert_eq!(client.request(&["del", "key1"]).await, int(1));
    assert_eq!(client.request(&["get", "key1"]).await, ResponseValue::Nil);
    assert_eq!(client.request(&["del", "key1"]).await, int(0));

    assert_eq!(client.request(&["zadd", "zset", "1", "n1"]).await, int(1));
    assert_eq!(client.request(&["del", "zset"]).await, int(1));
    assert_eq!(client.request(&["zcard", "zset"]).await, int(0));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn zcard_counts_members() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    assert_eq!(client.request(&["zcard", "zset"]).await, int(0));
    client.request(&["zadd", "zset", "1", "n1"]).await;
    client.request(&["zadd", "zset", "2", "n2"]).await;
    client.request(&["zadd", "zset", "3", "n1"]).await;
    assert_eq!(client.request(&["zcard", "zset"]).await, int(2));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn set_overwrite_clears_ttl() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    client.request(&["set", "key1", "old"]).await;
    assert_eq!(client.request(&["pexpire", "key1", "60000"]).await, int(1));
    client.request(&["set", "key1", "new"]).await;

    assert_eq!(client.request(&["pttl", "key1"]).await, int(-1));
    assert_eq!(client.request(&["get", "key1"]).await, str_value("new"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn pipelined_requests_answer_in_order() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    let mut frames = BytesMut::new();
    for args in [
        vec!["set", "k", "v"],
        vec!["get", "k"],
        vec!["pttl", "k"],
    ] {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        protocol::encode_request(&args, &mut frames);
    }
    client.send_raw(&frames).await;

    assert_eq!(client.read_response().await, ResponseValue::Nil);
    assert_eq!(client.read_response().await, str_value("v"));
    assert_eq!(client.read_response().await, int(-1));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn connections_share_one_keyspace() {
    let (mut server, addr) = start_server().await;

    let mut writer = TestClient::connect(addr).await;
    writer.request(&["set", "shared", "value"]).await;

    let mut reader = TestClient::connect(addr).await;
    assert_eq!(reader.request(&["get", "shared"]).await, str_value("value"));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn empty_request_frame_is_an_error_not_a_disconnect() {
    let (mut server, addr) = start_server().await;
    let mut client = TestClient::connect(addr).await;

    // A frame declaring zero arguments
    let mut frame = BytesMut::new();
    frame.put_u32_le(4);
    frame.put_u32_le(0);
    client.send_raw(&frame).await;

    assert_eq!(err_code(&client.read_response().await), 1);
    // Still connected
    assert_eq!(client.request(&["pttl", "x"]).await, int(-2));

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn oversized_frame_closes_only_that_connection() {
    let (mut server, addr) = start_server().await;

    let mut victim = TestClient::connect(addr).await;
    let mut frame = BytesMut::new();
    frame.put_u32_le(u32::MAX);
    victim.send_raw(&frame).await;

    // The offending connection is closed without a response
    let mut buf = [0u8; 16];
    let n = timeout(Duration::from_secs(5), victim.stream.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(n, 0);

    // Other connections are unaffected
    let mut healthy = TestClient::connect(addr).await;
    assert_eq!(healthy.request(&["pttl", "x"]).await, int(-2));

    server.shutdown().await.unwrap();
}
