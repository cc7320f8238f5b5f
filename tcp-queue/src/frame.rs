use chunk_reduce_core::error::QueueError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame, guards against garbage length prefixes
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Write one message as a 4-byte big-endian length followed by its JSON encoding
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), QueueError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let serialized =
        serde_json::to_vec(message).map_err(|e| QueueError::Protocol(e.to_string()))?;
    if serialized.len() > MAX_FRAME_LEN {
        return Err(QueueError::Protocol(format!(
            "frame of {} bytes exceeds the {} byte limit",
            serialized.len(),
            MAX_FRAME_LEN
        )));
    }
    // Prefix and body leave in one write so Nagle never holds back the body
    let mut frame = Vec::with_capacity(4 + serialized.len());
    frame.extend_from_slice(&(serialized.len() as u32).to_be_bytes());
    frame.extend_from_slice(&serialized);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one message. Returns `None` if the peer closed the connection between frames;
/// a close in the middle of a frame is an error.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, QueueError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_bytes = [0u8; 4];
    let mut filled = 0;
    while filled < len_bytes.len() {
        match reader.read(&mut len_bytes[filled..]).await? {
            0 if filled == 0 => return Ok(None),
            0 => {
                return Err(QueueError::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("connection closed after {} of 4 length bytes", filled),
                )))
            }
            n => filled += n,
        }
    }

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(QueueError::Protocol(format!(
            "announced frame of {} bytes exceeds the {} byte limit",
            len, MAX_FRAME_LEN
        )));
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await?;
    let message =
        serde_json::from_slice(&buffer).map_err(|e| QueueError::Protocol(e.to_string()))?;
    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_is_length_prefixed_json() {
        // Arrange
        let mut buffer = Vec::new();

        // Act
        write_frame(&mut buffer, &vec![1u64, 2, 3]).await.unwrap();

        // Assert
        assert_eq!(&buffer[..4], &7u32.to_be_bytes());
        assert_eq!(&buffer[4..], b"[1,2,3]");
    }

    #[tokio::test]
    async fn test_clean_close_reads_as_none() {
        // Arrange
        let mut empty: &[u8] = &[];

        // Act
        let frame: Option<Vec<u64>> = read_frame(&mut empty).await.unwrap();

        // Assert
        assert!(frame.is_none());
    }

    #[tokio::test]
    async fn test_close_inside_length_prefix_is_an_error() {
        // Arrange
        let mut truncated: &[u8] = &[0, 0];

        // Act
        let result: Result<Option<Vec<u64>>, _> = read_frame(&mut truncated).await;

        // Assert
        assert!(matches!(result, Err(QueueError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn test_oversized_length_is_rejected() {
        // Arrange
        let prefix = u32::MAX.to_be_bytes();
        let mut reader: &[u8] = &prefix;

        // Act
        let result: Result<Option<Vec<u64>>, _> = read_frame(&mut reader).await;

        // Assert
        assert!(matches!(result, Err(QueueError::Protocol(_))));
    }
}
