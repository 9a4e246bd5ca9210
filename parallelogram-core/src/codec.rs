use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;

/// Writes one self-delimited message: the serialized envelope followed by
/// shutting down the write half, so the peer's read-to-EOF loop knows the
/// message is complete. Matches §4.1: "connection close signals
/// end-of-message".
pub async fn write_message<T, W>(stream: &mut W, msg: &T) -> Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let bytes = serde_json::to_vec(msg)?;
    stream.write_all(&bytes).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Reads one self-delimited message by draining `stream` until EOF in
/// reads of at most `buf_size` bytes (reference: 8 KiB), then decodes the
/// accumulated bytes as one envelope. Tolerates payloads larger than a
/// single read by looping, per §4.1.
pub async fn read_message<T, R>(stream: &mut R, buf_size: usize) -> Result<T>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut read_buf = vec![0u8; buf_size];
    loop {
        let n = stream.read(&mut read_buf).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&read_buf[..n]);
    }
    let value = serde_json::from_slice(&buf)?;
    Ok(value)
}
