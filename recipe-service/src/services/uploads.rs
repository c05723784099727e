//! Scoped storage for uploaded images.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Extensions accepted by `/predict`, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Returns true when the text after the last '.' is an allowed image extension.
pub fn is_allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            ALLOWED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Reduces a client-supplied filename to a flat, ASCII-only name.
///
/// Path separators become word breaks, whitespace runs become `_`, anything
/// outside `[A-Za-z0-9_.-]` is dropped and leading/trailing `.`/`_` are
/// stripped. The result may be empty.
pub fn secure_filename(filename: &str) -> String {
    let flattened = filename.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");

    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// An upload written to disk for the lifetime of one request.
///
/// The file is removed when the guard is dropped, whichever way the request
/// ends. Removal failures are logged and never reach the caller.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    /// Writes `data` into `dir` under a unique name derived from `filename`.
    pub async fn persist(dir: &Path, filename: &str, data: &[u8]) -> io::Result<Self> {
        let sanitized = secure_filename(filename);
        let unique = Uuid::new_v4().simple().to_string();
        let stored_name = if sanitized.is_empty() {
            unique
        } else {
            format!("{}_{}", unique, sanitized)
        };

        // Guard first so a partial write is cleaned up too.
        let upload = Self {
            path: dir.join(stored_name),
        };
        fs::write(&upload.path, data).await?;

        tracing::info!(path = %upload.path.display(), bytes = data.len(), "File saved temporarily");
        Ok(upload)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Temporary file deleted");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Error deleting temporary file"
                );
            }
        }
    }
}
