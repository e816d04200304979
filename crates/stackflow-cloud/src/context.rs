//! Context cache for lookup results
//!
//! Manages the `.stackflow/context.json` file next to the stack file.
//! Synthesis reads it instead of calling cloud APIs.

use crate::error::{CloudError, Result};
use crate::lookup::{VpcContext, VpcLookupRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const CONTEXT_VERSION: u32 = 1;
const CONTEXT_DIR: &str = ".stackflow";
const CONTEXT_FILE: &str = "context.json";
const CONTEXT_BACKUP: &str = "context.json.backup";

/// Cached lookup results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextCache {
    /// Cache file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Lookup results indexed by cache key
    pub entries: BTreeMap<String, serde_json::Value>,
}

impl Default for ContextCache {
    fn default() -> Self {
        Self {
            version: CONTEXT_VERSION,
            updated_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vpc(&self, request: &VpcLookupRequest) -> Option<VpcContext> {
        self.entries
            .get(&request.cache_key())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set_vpc(&mut self, request: &VpcLookupRequest, context: &VpcContext) -> Result<()> {
        self.entries
            .insert(request.cache_key(), serde_json::to_value(context)?);
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Reader/writer for the context cache file
pub struct ContextStore {
    /// Project root directory
    project_root: PathBuf,
}

impl ContextStore {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn context_dir(&self) -> PathBuf {
        self.project_root.join(CONTEXT_DIR)
    }

    pub fn context_path(&self) -> PathBuf {
        self.context_dir().join(CONTEXT_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.context_dir().join(CONTEXT_BACKUP)
    }

    async fn ensure_context_dir(&self) -> Result<()> {
        let dir = self.context_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created context directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the cache, empty if the file does not exist
    pub async fn load(&self) -> Result<ContextCache> {
        let path = self.context_path();
        if !path.exists() {
            tracing::debug!("Context file not found, returning empty cache");
            return Ok(ContextCache::new());
        }

        let content = fs::read_to_string(&path).await?;
        let cache: ContextCache = serde_json::from_str(&content)?;

        if cache.version > CONTEXT_VERSION {
            return Err(CloudError::StateError(format!(
                "Context file version {} is newer than supported version {}",
                cache.version, CONTEXT_VERSION
            )));
        }

        tracing::debug!("Loaded context with {} entries", cache.entries.len());
        Ok(cache)
    }

    pub async fn save(&self, cache: &ContextCache) -> Result<()> {
        self.ensure_context_dir().await?;

        let path = self.context_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created context backup");
        }

        let content = serde_json::to_string_pretty(cache)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved context with {} entries", cache.entries.len());
        Ok(())
    }
}
