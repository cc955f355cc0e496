//! Length-prefixed message framing over relay streams
//!
//! Format: `[4 bytes little-endian length][bincode payload]`.

use shared::{decode_message, encode_frame, CodecError, Message, MAX_FRAME_SIZE};
use std::io;
use tokio::io::{sink, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads the payload of the next frame.
///
/// A stream that ends before or inside a frame reports
/// [`CodecError::ConnectionClosed`]. An oversized frame is consumed and
/// reported as [`CodecError::FrameTooLarge`], leaving the stream at the next
/// frame boundary.
pub async fn read_frame<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Vec<u8>, CodecError> {
    let mut len_buf = [0u8; 4];
    read_exact_or_closed(stream, &mut len_buf).await?;

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        let skipped = tokio::io::copy(&mut (&mut *stream).take(len as u64), &mut sink()).await?;
        if skipped < len as u64 {
            return Err(CodecError::ConnectionClosed);
        }
        return Err(CodecError::FrameTooLarge(len, MAX_FRAME_SIZE));
    }

    let mut payload = vec![0u8; len];
    read_exact_or_closed(stream, &mut payload).await?;
    Ok(payload)
}

/// Reads and decodes the next message.
pub async fn read_message<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Message, CodecError> {
    let payload = read_frame(stream).await?;
    decode_message(&payload)
}

pub async fn write_message<W: AsyncWrite + Unpin>(
    stream: &mut W,
    message: &Message,
) -> Result<(), CodecError> {
    let frame = encode_frame(message)?;
    stream.write_all(&frame).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_exact_or_closed<R: AsyncRead + Unpin>(
    stream: &mut R,
    buf: &mut [u8],
) -> Result<(), CodecError> {
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(CodecError::ConnectionClosed),
        Err(e) => Err(CodecError::Io(e)),
    }
}
