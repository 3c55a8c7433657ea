//! Artifact byte transfer into an installer write channel.

use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Buffer size of the fallback copy loop.
pub const TRANSFER_BUFFER_SIZE: usize = 4096;

/// How bytes are moved from the artifact into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyStrategy {
    /// Single bulk stream copy.
    Bulk,
    /// Fixed-size buffered read/write loop.
    Buffered,
}

/// Copy every byte of `source` into `dest` and flush it.
///
/// Returns the number of bytes copied. Only a zero-length read ends the
/// copy; short reads just continue the loop. Durability (fsync) and closing
/// the channel are the caller's job since they go through the session.
pub async fn copy_artifact<R, W>(
    source: &mut R,
    dest: &mut W,
    strategy: CopyStrategy,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let copied = match strategy {
        CopyStrategy::Bulk => tokio::io::copy(source, dest).await?,
        CopyStrategy::Buffered => copy_buffered(source, dest).await?,
    };
    dest.flush().await?;
    Ok(copied)
}

async fn copy_buffered<R, W>(source: &mut R, dest: &mut W) -> io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = [0u8; TRANSFER_BUFFER_SIZE];
    let mut total = 0u64;
    loop {
        let n = match source.read(&mut buf).await {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        dest.write_all(&buf[..n]).await?;
        total += n as u64;
    }
}
