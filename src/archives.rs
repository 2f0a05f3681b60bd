//! Every configured archive, opened once at startup.

use crate::error::{ErrorKind, Result};
use airlog_config::Config;
use airlog_library::Library;
use airlog_storage::BackendHandle;
use airlog_storage::backend::{CachedBackend, LocalBackend};
use exn::ResultExt;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

struct Archive {
    root: PathBuf,
    library: Library,
}

pub struct Archives {
    default: String,
    archives: BTreeMap<String, Archive>,
}
impl Archives {
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut archives = BTreeMap::new();
        for (name, settings) in &config.archives {
            let local = LocalBackend::new(name.as_str(), &settings.root).or_raise(|| ErrorKind::Archive(name.clone()))?;
            let backend: BackendHandle = match settings.cache_ttl() {
                Some(ttl) => Arc::new(CachedBackend::new(Arc::new(local), ttl)),
                None => Arc::new(local),
            };
            let library = Library::new(backend)
                .with_extension(settings.extension.as_str())
                .with_validation(settings.validation);
            tracing::debug!(
                archive = %name,
                root = %settings.root.display(),
                extension = %settings.extension,
                cache_ttl = ?settings.cache_ttl,
                "Opened archive"
            );
            let archive = Archive {
                root: settings.root.clone(),
                library,
            };
            archives.insert(name.clone(), archive);
        }
        Ok(Self {
            default: config.default_archive.clone(),
            archives,
        })
    }

    pub fn default_name(&self) -> &str {
        &self.default
    }

    /// The named archive, or the default one.
    pub fn get(&self, name: Option<&str>) -> Result<&Library> {
        let name = name.unwrap_or(&self.default);
        match self.archives.get(name) {
            Some(archive) => Ok(&archive.library),
            None => exn::bail!(ErrorKind::UnknownArchive(name.to_string())),
        }
    }

    /// Names of the archives whose root directory currently exists.
    pub async fn available(&self) -> Vec<&str> {
        let mut available = Vec::new();
        for (name, archive) in &self.archives {
            match tokio::fs::metadata(&archive.root).await {
                Ok(metadata) if metadata.is_dir() => available.push(name.as_str()),
                _ => tracing::debug!(archive = %name, root = %archive.root.display(), "Archive root is not available"),
            }
        }
        available
    }
}
