//! Streaming file downloads.
//!
//! [`save_response_to_dir`] persists a streaming response body to disk. The
//! body is written in chunks through a fixed-size buffer to a `.part` file
//! in the destination directory, then renamed into place once the stream
//! completes. An interrupted download therefore leaves only the `.part`
//! file behind, never a truncated file at the final path.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use http::header::CONTENT_DISPOSITION;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::{Error, Result};

/// Write-buffer size for streaming body chunks to disk.
const WRITE_BUFFER_SIZE: usize = 8192;

/// Streams a response body to a file under `destination`.
///
/// The filename comes from the response's `Content-Disposition` header when
/// it carries a `filename=` token, otherwise `fallback_name` is used
/// verbatim. The destination directory is created recursively if missing.
///
/// Returns the final path of the written file.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use uspto_odp::{download::save_response_to_dir, ApiRequest, OdpClient};
///
/// # async fn example(client: OdpClient) -> Result<(), uspto_odp::Error> {
/// let response = client
///     .stream(ApiRequest::get("api/v1/download/applications/12345678/ABC123.pdf"))
///     .await?;
/// let path = save_response_to_dir(response, Path::new("./downloads"), "ABC123").await?;
/// println!("saved to {}", path.display());
/// # Ok(())
/// # }
/// ```
pub async fn save_response_to_dir(
    response: reqwest::Response,
    destination: &Path,
    fallback_name: &str,
) -> Result<PathBuf> {
    let filename = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_content_disposition)
        .unwrap_or_else(|| fallback_name.to_owned());

    fs::create_dir_all(destination).await?;
    let final_path = destination.join(&filename);
    let part_path = destination.join(format!("{filename}.part"));

    let file = File::create(&part_path).await?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    let mut body = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(Error::request_failed)?;
        writer.write_all(&chunk).await?;
        bytes_written += chunk.len() as u64;
    }
    writer.flush().await?;

    fs::rename(&part_path, &final_path).await?;
    tracing::info!(
        path = %final_path.display(),
        bytes = bytes_written,
        "Download complete"
    );
    Ok(final_path)
}

/// Extracts the filename from a `Content-Disposition` header value.
///
/// Handles both `filename="example.pdf"` and `filename=example.pdf`.
fn parse_content_disposition(header: &str) -> Option<String> {
    let pos = header.find("filename=")?;
    let value = header[pos + "filename=".len()..].trim();

    if let Some(stripped) = value.strip_prefix('"') {
        let end = stripped.find('"')?;
        let name = &stripped[..end];
        return (!name.is_empty()).then(|| name.to_owned());
    }

    let end = value.find(';').unwrap_or(value.len());
    let name = value[..end].trim();
    (!name.is_empty()).then(|| name.to_owned())
}
