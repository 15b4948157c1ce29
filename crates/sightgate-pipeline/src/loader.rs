use sightgate_core::ImageBytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

/// Upper bound on the up-front allocation; larger images grow the buffer as they are read.
const INITIAL_CAPACITY_LIMIT: u64 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Image is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("Stream ended after {actual} of {expected} bytes")]
    IncompleteRead { expected: u64, actual: u64 },

    #[error("Failed to read image stream: {0}")]
    Io(#[from] std::io::Error),
}

/// Buffer the whole stream and rewind it to offset 0.
///
/// Reads exactly `declared_len` bytes in one sweep. A stream longer than
/// declared is not drained past that point; a shorter one is an error.
pub async fn load_image<R>(
    reader: &mut R,
    declared_len: u64,
    max_bytes: u64,
) -> Result<ImageBytes, LoadError>
where
    R: AsyncRead + AsyncSeek + Unpin + ?Sized,
{
    if declared_len > max_bytes {
        return Err(LoadError::TooLarge {
            size: declared_len,
            limit: max_bytes,
        });
    }

    let capacity = usize::try_from(declared_len.min(INITIAL_CAPACITY_LIMIT)).unwrap_or(0);
    let mut buffer = Vec::with_capacity(capacity);
    let read = (&mut *reader)
        .take(declared_len)
        .read_to_end(&mut buffer)
        .await? as u64;

    if read < declared_len {
        return Err(LoadError::IncompleteRead {
            expected: declared_len,
            actual: read,
        });
    }

    reader.rewind().await?;

    tracing::debug!(size_bytes = read, "Image loaded");
    Ok(ImageBytes::new(buffer))
}
