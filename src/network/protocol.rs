//! Length-prefixed binary protocol
//!
//! Every request and response is a frame: a little-endian `u32` payload
//! length followed by that many payload bytes.
//!
//! Request payload: `u32` argument count, then each argument as `u32`
//! length + raw bytes. Argument 0 is the command name.
//!
//! Response payload: one tagged value. Tags: 0 nil, 1 err (`i32` code +
//! length-prefixed message), 2 str (length-prefixed bytes), 3 int (`i64`),
//! 4 dbl (`f64`), 5 arr (`u32` element count, the elements, then the
//! explicit terminator tag 6).
//!
//! Decoding is incremental: a partial frame yields `Ok(None)` and the
//! caller reads more bytes. A malformed frame is fatal to the connection.

use crate::commands::ResponseValue;
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Maximum frame payload size
pub const MAX_FRAME_BYTES: usize = 32 << 20; // 32 MiB
/// Maximum number of arguments in one request
pub const MAX_ARGS: usize = 200_000;

const TAG_NIL: u8 = 0;
const TAG_ERR: u8 = 1;
const TAG_STR: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_DBL: u8 = 4;
const TAG_ARR: u8 = 5;
const TAG_ARR_END: u8 = 6;

/// Connection-fatal framing failures
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    #[error("request declares {count} arguments, limit is {max}")]
    TooManyArgs { count: usize, max: usize },

    #[error("payload ended early while reading {context}")]
    Truncated { context: &'static str },

    #[error("{extra} trailing bytes after the payload")]
    TrailingBytes { extra: usize },

    #[error("unknown value tag {tag:#04x}")]
    UnknownTag { tag: u8 },

    #[error("array terminator missing")]
    MissingTerminator,
}

/// Try to decode one request frame from the front of `buf`. Returns
/// `Ok(None)` when the frame is still incomplete; consumes the frame from
/// `buf` on success.
pub fn decode_request(buf: &mut BytesMut) -> Result<Option<Vec<String>>, FrameError> {
    let Some(payload_len) = frame_payload_len(buf)? else {
        return Ok(None);
    };

    let frame = buf.split_to(4 + payload_len);
    let mut payload = &frame[4..];

    let argc = read_u32(&mut payload, "argument count")? as usize;
    if argc > MAX_ARGS {
        return Err(FrameError::TooManyArgs {
            count: argc,
            max: MAX_ARGS,
        });
    }

    let mut args = Vec::with_capacity(argc.min(64));
    for _ in 0..argc {
        let len = read_u32(&mut payload, "argument length")? as usize;
        if payload.remaining() < len {
            return Err(FrameError::Truncated {
                context: "argument bytes",
            });
        }
        let bytes = payload.copy_to_bytes(len);
        args.push(String::from_utf8_lossy(&bytes).into_owned());
    }

    if payload.has_remaining() {
        return Err(FrameError::TrailingBytes {
            extra: payload.remaining(),
        });
    }
    Ok(Some(args))
}

/// Frame a request from an argument list. Used by the client and tests.
pub fn encode_request(args: &[String], out: &mut BytesMut) {
    let payload_len: usize = 4 + args.iter().map(|a| 4 + a.len()).sum::<usize>();
    out.reserve(4 + payload_len);
    out.put_u32_le(payload_len as u32);
    out.put_u32_le(args.len() as u32);
    for arg in args {
        out.put_u32_le(arg.len() as u32);
        out.put_slice(arg.as_bytes());
    }
}

/// Frame one tagged response value.
pub fn encode_response(value: &ResponseValue, out: &mut BytesMut) {
    let mut body = BytesMut::new();
    encode_value(value, &mut body);
    out.reserve(4 + body.len());
    out.put_u32_le(body.len() as u32);
    out.extend_from_slice(&body);
}

fn encode_value(value: &ResponseValue, buf: &mut BytesMut) {
    match value {
        ResponseValue::Nil => buf.put_u8(TAG_NIL),
        ResponseValue::Err { code, message } => {
            buf.put_u8(TAG_ERR);
            buf.put_i32_le(*code);
            buf.put_u32_le(message.len() as u32);
            buf.put_slice(message.as_bytes());
        }
        ResponseValue::Str(s) => {
            buf.put_u8(TAG_STR);
            buf.put_u32_le(s.len() as u32);
            buf.put_slice(s.as_bytes());
        }
        ResponseValue::Int(n) => {
            buf.put_u8(TAG_INT);
            buf.put_i64_le(*n);
        }
        ResponseValue::Dbl(d) => {
            buf.put_u8(TAG_DBL);
            buf.put_f64_le(*d);
        }
        ResponseValue::Arr(items) => {
            buf.put_u8(TAG_ARR);
            buf.put_u32_le(items.len() as u32);
            for item in items {
                encode_value(item, buf);
            }
            buf.put_u8(TAG_ARR_END);
        }
    }
}

/// Try to decode one response frame from the front of `buf`. The client
/// side of the codec; `Ok(None)` means a partial frame.
pub fn decode_response(buf: &mut BytesMut) -> Result<Option<ResponseValue>, FrameError> {
    let Some(payload_len) = frame_payload_len(buf)? else {
        return Ok(None);
    };

    let frame = buf.split_to(4 + payload_len);
    let mut payload = &frame[4..];

    let value = decode_value(&mut payload)?;
    if payload.has_remaining() {
        return Err(FrameError::TrailingBytes {
            extra: payload.remaining(),
        });
    }
    Ok(Some(value))
}

fn decode_value(payload: &mut &[u8]) -> Result<ResponseValue, FrameError> {
    if !payload.has_remaining() {
        return Err(FrameError::Truncated { context: "value tag" });
    }
    let tag = payload.get_u8();
    match tag {
        TAG_NIL => Ok(ResponseValue::Nil),
        TAG_ERR => {
            if payload.remaining() < 4 {
                return Err(FrameError::Truncated {
                    context: "error code",
                });
            }
            let code = payload.get_i32_le();
            let len = read_u32(payload, "error message length")? as usize;
            if payload.remaining() < len {
                return Err(FrameError::Truncated {
                    context: "error message",
                });
            }
            let bytes = payload.copy_to_bytes(len);
            Ok(ResponseValue::Err {
                code,
                message: String::from_utf8_lossy(&bytes).into_owned(),
            })
        }
        TAG_STR => {
            let len = read_u32(payload, "string length")? as usize;
            if payload.remaining() < len {
                return Err(FrameError::Truncated {
                    context: "string bytes",
                });
            }
            let bytes = payload.copy_to_bytes(len);
            Ok(ResponseValue::Str(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        }
        TAG_INT => {
            if payload.remaining() < 8 {
                return Err(FrameError::Truncated {
                    context: "integer value",
                });
            }
            Ok(ResponseValue::Int(payload.get_i64_le()))
        }
        TAG_DBL => {
            if payload.remaining() < 8 {
                return Err(FrameError::Truncated {
                    context: "double value",
                });
            }
            Ok(ResponseValue::Dbl(payload.get_f64_le()))
        }
        TAG_ARR => {
            let count = read_u32(payload, "array length")? as usize;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(decode_value(payload)?);
            }
            if !payload.has_remaining() || payload.get_u8() != TAG_ARR_END {
                return Err(FrameError::MissingTerminator);
            }
            Ok(ResponseValue::Arr(items))
        }
        other => Err(FrameError::UnknownTag { tag: other }),
    }
}

/// Payload length of the frame at the front of `buf`, or `None` while the
/// header or body is still incomplete.
fn frame_payload_len(buf: &BytesMut) -> Result<Option<usize>, FrameError> {
    if buf.len() < 4 {
        return Ok(None);
    }
    let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(FrameError::FrameTooLarge {
            len,
            max: MAX_FRAME_BYTES,
        });
    }
    if buf.len() < 4 + len {
        return Ok(None);
    }
    Ok(Some(len))
}

fn read_u32(payload: &mut &[u8], context: &'static str) -> Result<u32, FrameError> {
    if payload.remaining() < 4 {
        return Err(FrameError::Truncated { context });
    }
    Ok(payload.get_u32_le())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn request_round_trip() {
        let args = strings(&["zadd", "zset", "1.5", "n1"]);
        let mut buf = BytesMut::new();
        encode_request(&args, &mut buf);

        let decoded = decode_request(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, args);
        assert!(buf.is_empty());
    }

    #[test]
    fn request_with_empty_argument() {
        let args = strings(&["zquery", "zset", "1", "", "0", "10"]);
        let mut buf = BytesMut::new();
        encode_request(&args, &mut buf);

        let decoded = decode_request(&mut buf).unwrap().unwrap();
        assert_eq!(decoded[3], "");
        assert_eq!(decoded.len(), 6);
    }

    #[test]
    fn partial_request_needs_more_data() {
        let mut full = BytesMut::new();
        encode_request(&strings(&["get", "key1"]), &mut full);

        for cut in [0, 2, 4, full.len() - 1] {
            let mut partial = BytesMut::from(&full[..cut]);
            assert!(decode_request(&mut partial).unwrap().is_none());
            // Nothing consumed while incomplete
            assert_eq!(partial.len(), cut);
        }
    }

    #[test]
    fn two_pipelined_requests_decode_in_order() {
        let mut buf = BytesMut::new();
        encode_request(&strings(&["set", "k", "v"]), &mut buf);
        encode_request(&strings(&["get", "k"]), &mut buf);

        assert_eq!(
            decode_request(&mut buf).unwrap().unwrap(),
            strings(&["set", "k", "v"])
        );
        assert_eq!(
            decode_request(&mut buf).unwrap().unwrap(),
            strings(&["get", "k"])
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_le((MAX_FRAME_BYTES + 1) as u32);
        assert!(matches!(
            decode_request(&mut buf),
            Err(FrameError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn excessive_arg_count_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(4);
        buf.put_u32_le((MAX_ARGS + 1) as u32);
        assert!(matches!(
            decode_request(&mut buf),
            Err(FrameError::TooManyArgs { .. })
        ));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let mut buf = BytesMut::new();
        // argc=1, one 1-byte arg, plus 3 stray bytes inside the payload
        buf.put_u32_le(4 + 4 + 1 + 3);
        buf.put_u32_le(1);
        buf.put_u32_le(1);
        buf.put_u8(b'x');
        buf.put_slice(b"???");
        assert!(matches!(
            decode_request(&mut buf),
            Err(FrameError::TrailingBytes { extra: 3 })
        ));
    }

    #[test]
    fn truncated_argument_is_rejected() {
        let mut buf = BytesMut::new();
        // argc=1, declared arg length runs past the payload end
        buf.put_u32_le(4 + 4 + 2);
        buf.put_u32_le(1);
        buf.put_u32_le(100);
        buf.put_slice(b"ab");
        assert!(matches!(
            decode_request(&mut buf),
            Err(FrameError::Truncated { .. })
        ));
    }

    #[test]
    fn scalar_response_round_trips() {
        let cases = vec![
            ResponseValue::Nil,
            ResponseValue::Int(-2),
            ResponseValue::Dbl(1.1),
            ResponseValue::Str("n1".to_string()),
            ResponseValue::Err {
                code: 4,
                message: "expect float".to_string(),
            },
        ];
        for value in cases {
            let mut buf = BytesMut::new();
            encode_response(&value, &mut buf);
            let decoded = decode_response(&mut buf).unwrap().unwrap();
            assert_eq!(decoded, value);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn array_response_round_trips_with_terminator() {
        let value = ResponseValue::Arr(vec![
            ResponseValue::Str("n1".to_string()),
            ResponseValue::Dbl(1.1),
            ResponseValue::Str("n2".to_string()),
            ResponseValue::Dbl(2.0),
        ]);
        let mut buf = BytesMut::new();
        encode_response(&value, &mut buf);

        // Last payload byte is the terminator tag
        assert_eq!(buf[buf.len() - 1], 6);

        let decoded = decode_response(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn empty_array_still_carries_terminator() {
        let mut buf = BytesMut::new();
        encode_response(&ResponseValue::Arr(Vec::new()), &mut buf);
        // len(4) + tag(1) + count(4) + end(1)
        assert_eq!(buf.len(), 10);
        assert_eq!(
            decode_response(&mut buf).unwrap().unwrap(),
            ResponseValue::Arr(Vec::new())
        );
    }

    #[test]
    fn array_without_terminator_is_rejected() {
        let mut body = BytesMut::new();
        body.put_u8(5); // arr
        body.put_u32_le(0);
        // terminator omitted
        let mut buf = BytesMut::new();
        buf.put_u32_le(body.len() as u32);
        buf.extend_from_slice(&body);
        assert!(matches!(
            decode_response(&mut buf),
            Err(FrameError::MissingTerminator)
        ));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(1);
        buf.put_u8(0x7f);
        assert!(matches!(
            decode_response(&mut buf),
            Err(FrameError::UnknownTag { tag: 0x7f })
        ));
    }

    #[test]
    fn partial_response_needs_more_data() {
        let mut full = BytesMut::new();
        encode_response(&ResponseValue::Int(42), &mut full);

        let mut partial = BytesMut::from(&full[..full.len() - 1]);
        assert!(decode_response(&mut partial).unwrap().is_none());
    }
}
