//! CLI client: one framed request, one rendered tagged response
//!
//! The textual rendering is the conformance surface external test scripts
//! diff against: `(nil)`, `(int) 1`, `(dbl) 1.1`, `(str) n1`,
//! `(arr) len=4 … (arr) end`, `(err) 4 expect float`.

use crate::commands::ResponseValue;
use crate::error::{Result, ScoreKvError};
use crate::network::protocol;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Client connection to a scorekv server
pub struct CliClient {
    stream: TcpStream,
    read_buf: BytesMut,
}

impl CliClient {
    pub async fn connect(address: &str) -> Result<Self> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| ScoreKvError::NetworkError {
                message: format!("Failed to connect to {address}: {e}"),
                source: Some(Box::new(e)),
                connection_id: None,
            })?;
        Ok(Self {
            stream,
            read_buf: BytesMut::with_capacity(4096),
        })
    }

    /// Send one command and wait for its tagged response.
    pub async fn request(&mut self, args: &[String]) -> Result<ResponseValue> {
        let mut frame = BytesMut::new();
        protocol::encode_request(args, &mut frame);
        self.stream
            .write_all(&frame)
            .await
            .map_err(|e| ScoreKvError::NetworkError {
                message: format!("Failed to send request: {e}"),
                source: Some(Box::new(e)),
                connection_id: None,
            })?;

        loop {
            match protocol::decode_response(&mut self.read_buf) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => {
                    return Err(ScoreKvError::ProtocolError {
                        message: e.to_string(),
                        source: Some(Box::new(e)),
                        connection_id: None,
                    });
                }
            }

            let n = self.stream.read_buf(&mut self.read_buf).await.map_err(|e| {
                ScoreKvError::NetworkError {
                    message: format!("Failed to read response: {e}"),
                    source: Some(Box::new(e)),
                    connection_id: None,
                }
            })?;
            if n == 0 {
                return Err(ScoreKvError::NetworkError {
                    message: "server closed the connection mid-response".to_string(),
                    source: None,
                    connection_id: None,
                });
            }
        }
    }
}

/// Render a tagged value in the canonical textual form, one line per
/// scalar, arrays bracketed by a length header and an end marker.
pub fn render(value: &ResponseValue) -> String {
    match value {
        ResponseValue::Nil => "(nil)".to_string(),
        ResponseValue::Int(n) => format!("(int) {n}"),
        ResponseValue::Dbl(d) => format!("(dbl) {d}"),
        ResponseValue::Str(s) => format!("(str) {s}"),
        ResponseValue::Err { code, message } => format!("(err) {code} {message}"),
        ResponseValue::Arr(items) => {
            let mut out = format!("(arr) len={}", items.len());
            for item in items {
                out.push('\n');
                out.push_str(&render(item));
            }
            out.push_str("\n(arr) end");
            out
        }
    }
}
