use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::BUNDLED_MODEL_DIR;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model file {name} not found (searched: {})", join_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },
}

fn join_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nowhere".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Where to look for model assets, in priority order.
#[derive(Clone, Debug, Default)]
pub struct ModelSearch {
    /// Directory given explicitly by the operator; always checked first.
    pub model_dir: Option<PathBuf>,
    /// Per-user cache, also the download destination.
    pub cache_dir: Option<PathBuf>,
    /// Pre-packaged models shipped next to the executable.
    pub bundled_dir: Option<PathBuf>,
    /// Base URL to fetch missing models from. Without it a missing model
    /// is fatal.
    pub base_url: Option<String>,
}

impl ModelSearch {
    /// Search the platform cache and the `models/` directory beside the
    /// running executable.
    pub fn standard() -> Self {
        Self {
            model_dir: None,
            cache_dir: model_cache_dir(),
            bundled_dir: bundled_model_dir(),
            base_url: None,
        }
    }

    pub fn with_model_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.model_dir = dir;
        self
    }

    pub fn with_base_url(mut self, url: Option<String>) -> Self {
        self.base_url = url;
        self
    }
}

/// Resolve a model file by name.
///
/// Resolution order:
/// 1. Explicit model directory
/// 2. User cache directory (platform-specific)
/// 3. Bundled directory next to the executable
/// 4. Download from `base_url` into the cache, if both are configured
pub fn resolve(
    name: &str,
    search: &ModelSearch,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let mut searched = Vec::new();
    let local_dirs = [&search.model_dir, &search.cache_dir, &search.bundled_dir];

    for dir in local_dirs.into_iter().flatten() {
        let candidate = dir.join(name);
        if candidate.is_file() {
            log::debug!("Resolved model {name} at {}", candidate.display());
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    match (&search.base_url, &search.cache_dir) {
        (Some(base_url), Some(cache_dir)) => {
            let url = model_url(base_url, name);
            let dest = cache_dir.join(name);
            log::info!("Downloading model {name} from {url}");
            fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
            download(&url, &dest, progress)?;
            Ok(dest)
        }
        _ => Err(ModelResolveError::NotFound {
            name: name.to_string(),
            searched,
        }),
    }
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/handmark/models/`
/// - Linux: `$XDG_CACHE_HOME/handmark/models/` or `~/.cache/handmark/models/`
/// - Windows: `%LOCALAPPDATA%/handmark/models/`
pub fn model_cache_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir().map(|d| d.join("handmark").join("models"))
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir().map(|d| d.join("handmark").join("models"))
    }
}

fn bundled_model_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent().map(|dir| dir.join(BUNDLED_MODEL_DIR))
}

fn model_url(base_url: &str, name: &str) -> String {
    format!("{}/{name}", base_url.trim_end_matches('/'))
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let write_err = |source| ModelResolveError::Write {
        path: temp_path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(temp_path).map_err(write_err)?;
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }
    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ModelResolveError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
