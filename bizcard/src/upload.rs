//! Module for uploading images to the blob store.

use crate::backend::{self, Backend};
use crate::{card::ImageField, Error};
use chrono::Utc;
use futures::future;
use rand::{distributions::Alphanumeric, Rng};
use std::path::Path;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

const RANDOM_SUFFIX_LEN: usize = 8;

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageFile {
    /// The original file name, used for its extension.
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Creates a new [`ImageFile`], guessing the content type from the extension of `name`.
    pub fn new<N: Into<String>>(name: N, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type_of(&name).to_owned();
        Self {
            name,
            content_type,
            bytes,
        }
    }

    /// Returns the lowercase extension of the file name, or `bin` if it has none.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .and_then(|v| v.to_str())
            .filter(|v| !v.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "bin".to_owned())
    }
}

fn content_type_of(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|v| v.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        Some("avif") => "image/avif",
        _ => "application/octet-stream",
    }
}

/// Returns the storage path of `file`, `<owner>/<group>_<key>_<unix millis>_<random>.<ext>`.
pub(crate) fn object_path(owner: Uuid, field: ImageField, file: &ImageFile) -> String {
    let suffix = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect::<String>();
    format!(
        "{}/{}_{}_{}_{}.{}",
        owner,
        field.group().column(),
        field.key(),
        Utc::now().timestamp_millis(),
        suffix,
        file.extension()
    )
}

/// Uploads `file` and returns its public URL.
pub(crate) async fn upload_one(
    backend: &dyn Backend,
    owner: Uuid,
    field: ImageField,
    file: ImageFile,
    access_token: &str,
) -> Result<Url, Error> {
    let path = object_path(owner, field, &file);
    let ImageFile {
        name,
        content_type,
        bytes,
    } = file;
    let upload_failed = |source: backend::Error| Error::UploadFailed {
        file: name.clone(),
        source,
    };
    backend
        .upload(&path, bytes, &content_type, Some(access_token))
        .await
        .map_err(upload_failed)?;
    let url = backend.public_url(&path).map_err(upload_failed)?;
    debug!(%path, "uploaded file");
    Ok(url)
}

/// Uploads `files` concurrently and returns their public URLs in input order.
///
/// Every upload runs to completion. If any of them fails, the error of the first failed file is
/// returned and files that were uploaded stay in the store unreferenced.
pub(crate) async fn upload_all(
    backend: &dyn Backend,
    owner: Uuid,
    field: ImageField,
    files: Vec<ImageFile>,
    access_token: &str,
) -> Result<Vec<Url>, Error> {
    let count = files.len();
    let results = future::join_all(
        files
            .into_iter()
            .map(|file| upload_one(backend, owner, field, file, access_token)),
    )
    .await;
    let failed = results.iter().filter(|v| v.is_err()).count();
    if failed > 0 {
        warn!(failed, count, "image upload failed, discarding batch");
    }
    results.into_iter().collect()
}
