//! Loading scene files and their buffers from wherever assets live.
//!
//! Native builds read from a directory on disk, web builds fetch relative to
//! the page origin. Tests use [`InMemoryAssets`].

use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
};

use anyhow::anyhow;

pub mod scene_loader;

/// Where scene files and the buffers they reference come from.
pub trait AssetSource {
    /// Fetches the bytes at `path`, relative to the asset root.
    fn fetch(&self, path: &str) -> impl Future<Output = anyhow::Result<Vec<u8>>>;
}

/// Assets under a root directory (native) or a same-named folder on the
/// page origin (web).
#[derive(Clone, Debug)]
pub struct FileAssets {
    root: PathBuf,
}

impl FileAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[cfg(target_arch = "wasm32")]
    fn format_url(&self, file_name: &str) -> anyhow::Result<reqwest::Url> {
        let window = web_sys::window().ok_or_else(|| anyhow!("no browser window"))?;
        let origin = window
            .location()
            .origin()
            .map_err(|err| anyhow!("could not read page origin: {:?}", err))?;
        let root = self.root.to_string_lossy();
        let base = reqwest::Url::parse(&format!("{}/{}/", origin, root.trim_matches('/')))?;
        Ok(base.join(file_name)?)
    }
}

impl AssetSource for FileAssets {
    async fn fetch(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        #[cfg(target_arch = "wasm32")]
        let data = {
            let url = self.format_url(path)?;
            log::debug!("fetching {}", url);
            let response = reqwest::get(url).await?.error_for_status()?;
            response.bytes().await?.to_vec()
        };
        #[cfg(not(target_arch = "wasm32"))]
        let data = {
            let full = self.root.join(path);
            log::debug!("reading {}", full.display());
            tokio::fs::read(&full)
                .await
                .map_err(|err| anyhow!("could not read {}: {}", full.display(), err))?
        };

        Ok(data)
    }
}

/// Assets held in memory, keyed by their relative path.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAssets {
    files: HashMap<String, Vec<u8>>,
}

impl InMemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), data.into());
    }

    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }
}

impl AssetSource for InMemoryAssets {
    async fn fetch(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("asset `{}` not found", path))
    }
}
