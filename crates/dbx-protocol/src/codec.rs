use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{Request, Response, MAX_MESSAGE_SIZE, REQUEST_LABELS};

const HEADER_LEN: usize = 4;

/// Codec for Driftbox frames: `[4 bytes big-endian len][JSON payload]`.
pub struct FrameCodec;

impl FrameCodec {
    /// Serialize `msg` and prepend its length.
    pub fn encode<T: Serialize>(msg: &T) -> ProtocolResult<Bytes> {
        let payload =
            serde_json::to_vec(msg).map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.put_slice(&payload);
        Ok(buf.freeze())
    }

    /// Parse a frame payload as a request.
    ///
    /// Unknown labels and malformed documents are reported separately so the
    /// caller can log and skip them.
    pub fn parse_request(payload: &[u8]) -> ProtocolResult<Request> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::Malformed("missing label".into()))?;
        if !REQUEST_LABELS.contains(&label) {
            return Err(ProtocolError::UnknownLabel(label.to_string()));
        }
        serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    pub fn parse_response(payload: &[u8]) -> ProtocolResult<Response> {
        serde_json::from_slice(payload).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }
}

/// Read one frame payload. Returns `None` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R) -> ProtocolResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    match fill(reader, &mut header).await? {
        0 => return Ok(None),
        HEADER_LEN => {}
        actual => {
            return Err(ProtocolError::Truncated {
                expected: HEADER_LEN,
                actual,
            })
        }
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }
    let mut payload = vec![0u8; len];
    let actual = fill(reader, &mut payload).await?;
    if actual < len {
        return Err(ProtocolError::Truncated {
            expected: len,
            actual,
        });
    }
    Ok(Some(payload))
}

/// Read until `buf` is full or the stream ends; returns the bytes read.
async fn fill<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Encode `msg` and write it as one frame.
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = FrameCodec::encode(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
