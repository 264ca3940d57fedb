//! Sharded on-disk account store
//!
//! Each account is one JSON file. Files live under
//! `<base>/tunnelgate/<seg1>/<seg2>/<tenant>.json`, where the two
//! segments come from [`shard_path`] applied to the tenant part of the
//! record key. The `tunnelgate` directory carries the key namespace. A file
//! is loaded only when its stem is a valid tenant id, it sits in that
//! tenant's shard and its body names the same tenant.
//!
//! Writes go to a uniquely named temporary sibling that is synced and
//! renamed into place, then the directory is synced, so a crash leaves
//! either the old record or the new one.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use tg_core::error::StoreError;
use tg_core::traits::{decode_record, record_key, AccountStore, STORE_PREFIX};
use tg_core::types::{Account, TenantId};

/// Number of directory levels below the namespace directory
const SHARD_DEPTH: usize = 2;

/// Characters per directory level
const SHARD_WIDTH: usize = 2;

/// Bucket used for keys too short to fill every shard level
pub const FALLBACK_SHARD: &str = "__small";

const RECORD_EXT: &str = "json";
const TEMP_EXT: &str = "tmp";

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Map a key to its two shard directory names
///
/// Keys with at least four characters yield `[key[0..2], key[2..4]]`.
/// Shorter keys always land in `[FALLBACK_SHARD, FALLBACK_SHARD]`.
/// Segments are cut on character boundaries.
pub fn shard_path(key: &str) -> [String; SHARD_DEPTH] {
    let chars: Vec<char> = key.chars().take(SHARD_DEPTH * SHARD_WIDTH).collect();
    if chars.len() < SHARD_DEPTH * SHARD_WIDTH {
        return std::array::from_fn(|_| FALLBACK_SHARD.to_string());
    }

    std::array::from_fn(|level| {
        chars[level * SHARD_WIDTH..(level + 1) * SHARD_WIDTH]
            .iter()
            .collect()
    })
}

/// File-backed account store
#[derive(Debug, Clone)]
pub struct DiskStore {
    /// Namespace directory (`<base>/tunnelgate`)
    root: PathBuf,
}

impl DiskStore {
    /// Create a store rooted at `base`. Directories are created lazily.
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self {
            root: base.as_ref().join(STORE_PREFIX),
        }
    }

    /// Namespace directory holding every shard
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shard directory for a tenant
    fn shard_dir(&self, tenant: &TenantId) -> PathBuf {
        let mut path = self.root.clone();
        for segment in shard_path(tenant.as_str()) {
            path.push(segment);
        }
        path
    }

    /// Path of the record file for an account
    pub fn record_path(&self, account: &Account) -> PathBuf {
        let tenant = &account.tenant_id;
        self.shard_dir(tenant)
            .join(format!("{}.{}", tenant, RECORD_EXT))
    }

    /// Tenant a record file belongs to, if the file follows the layout
    fn owner_of(&self, file: &Path) -> Option<TenantId> {
        if file.extension() != Some(OsStr::new(RECORD_EXT)) {
            return None;
        }
        let tenant = TenantId::new(file.file_stem()?.to_str()?);
        if tenant.validate().is_err() {
            return None;
        }
        (file.parent()? == self.shard_dir(&tenant).as_path()).then_some(tenant)
    }

    async fn read_record(&self, path: &Path, tenant: &TenantId) -> Result<Account, StoreError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        decode_record(&path.display().to_string(), tenant, &bytes)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}-{}.{}", std::process::id(), seq, TEMP_EXT));
    path.with_file_name(name)
}

#[async_trait]
impl AccountStore for DiskStore {
    async fn save(&self, account: &Account) -> Result<(), StoreError> {
        let key = record_key(&account.tenant_id);
        let bytes = serde_json::to_vec(account).map_err(|source| StoreError::Encode {
            key: key.clone(),
            source,
        })?;

        let path = self.record_path(account);
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| StoreError::Io { path, source }
        };

        let shard = self.shard_dir(&account.tenant_id);
        let new_shard = !tokio::fs::try_exists(&shard).await.unwrap_or(false);
        tokio::fs::create_dir_all(&shard)
            .await
            .map_err(io_err(&shard))?;
        if new_shard {
            // New directory entries must reach disk too
            let mut dir = shard.as_path();
            while let Some(parent) = dir.parent() {
                sync_dir(parent).await;
                if parent == self.root.as_path() {
                    break;
                }
                dir = parent;
            }
        }

        let tmp = temp_path(&path);
        if let Err(e) = write_synced(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(&tmp)(e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(&path)(e));
        }
        sync_dir(&shard).await;

        tracing::debug!("Saved {} to {:?}", key, path);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Account>, StoreError> {
        let mut accounts = Vec::new();

        let first_level = match list_dirs(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No account store at {:?}, starting empty", self.root);
                return Ok(accounts);
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        for first in first_level {
            let second_level = match list_dirs(&first).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Skipping unreadable shard {:?}: {}", first, e);
                    continue;
                }
            };

            for second in second_level {
                let files = match list_files(&second).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable shard {:?}: {}", second, e);
                        continue;
                    }
                };

                for file in files {
                    let Some(tenant) = self.owner_of(&file) else {
                        if file.extension() == Some(OsStr::new(RECORD_EXT)) {
                            tracing::warn!("Skipping misplaced account file {:?}", file);
                        }
                        continue;
                    };

                    match self.read_record(&file, &tenant).await {
                        Ok(account) => accounts.push(account),
                        Err(e) => tracing::warn!("Skipping account record: {}", e),
                    }
                }
            }
        }

        tracing::debug!("Loaded {} account records from {:?}", accounts.len(), self.root);
        Ok(accounts)
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

/// Flush a directory's entries to disk
///
/// Only meaningful on unix; a failure is logged since the rename it follows
/// has already taken effect.
async fn sync_dir(path: &Path) {
    #[cfg(unix)]
    {
        let result = match tokio::fs::File::open(path).await {
            Ok(dir) => dir.sync_all().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to sync directory {:?}: {}", path, e);
        }
    }
    #[cfg(not(unix))]
    let _ = path;
}

/// Collect the subdirectories of a directory
async fn list_dirs(path: &Path) -> io::Result<Vec<PathBuf>> {
    list_entries(path, true).await
}

/// Collect the regular files in a directory
async fn list_files(path: &Path) -> io::Result<Vec<PathBuf>> {
    list_entries(path, false).await
}

async fn list_entries(path: &Path, dirs: bool) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(path).await?;
    while let Some(entry) = dir.next_entry().await? {
        let file_type = entry.file_type().await?;
        if (dirs && file_type.is_dir()) || (!dirs && file_type.is_file()) {
            entries.push(entry.path());
        }
    }
    Ok(entries)
}
