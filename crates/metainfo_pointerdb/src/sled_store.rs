//! sled-backed pointer store.

use std::ops::Bound;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{PointerDbError, PointerDbResult};
use crate::store::{ListItem, ListOptions, ListPage, PATH_SEPARATOR, PointerDb};

/// Pointer store kept in a single sled tree, ordered by raw key bytes.
#[derive(Debug, Clone)]
pub struct SledPointerDb {
    db: sled::Db,
}

impl SledPointerDb {
    /// Open an existing pointer store directory.
    pub fn open(path: impl AsRef<Path>) -> PointerDbResult<Self> {
        let path = path.as_ref();
        info!("Opening pointer store: {}", path.display());
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Open a throwaway store (for testing).
    pub fn temporary() -> PointerDbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    pub fn put(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> PointerDbResult<()> {
        self.db.insert(key.as_ref(), value.as_ref())?;
        Ok(())
    }

    pub fn remove(&self, key: impl AsRef<[u8]>) -> PointerDbResult<()> {
        self.db.remove(key.as_ref())?;
        Ok(())
    }

    fn list_page(&self, options: &ListOptions) -> PointerDbResult<ListPage> {
        let limit = options.page_size();
        let start = if options.start_after.is_empty() {
            Bound::Included(options.prefix.clone())
        } else {
            let mut key = options.prefix.clone();
            key.extend_from_slice(&options.start_after);
            Bound::Excluded(key)
        };

        // a non-recursive page that ended on a collapsed prefix resumes past it
        let ends_on_dir = options.start_after.last() == Some(&PATH_SEPARATOR);
        let skipped_dir =
            (!options.recursive && ends_on_dir).then_some(options.start_after.as_slice());

        let mut items: Vec<ListItem> = Vec::new();
        for entry in self.db.range((start, Bound::Unbounded)) {
            let (key, value) = entry?;
            if !key.starts_with(&options.prefix) {
                break;
            }

            let relative = &key[options.prefix.len()..];
            if skipped_dir.is_some_and(|dir| relative.starts_with(dir)) {
                continue;
            }

            let dir_end = (!options.recursive)
                .then(|| relative.iter().position(|b| *b == PATH_SEPARATOR))
                .flatten();

            let item = match dir_end {
                Some(end) => {
                    let dir = &relative[..=end];
                    if items.last().is_some_and(|last| last.is_prefix && last.key == dir) {
                        continue;
                    }
                    ListItem {
                        key: dir.to_vec(),
                        value: Vec::new(),
                        is_prefix: true,
                    }
                }
                None => ListItem {
                    key: relative.to_vec(),
                    value: if options.include_value {
                        value.to_vec()
                    } else {
                        Vec::new()
                    },
                    is_prefix: false,
                },
            };

            if items.len() == limit {
                return Ok(ListPage { items, more: true });
            }
            items.push(item);
        }

        Ok(ListPage { items, more: false })
    }
}

#[async_trait]
impl PointerDb for SledPointerDb {
    async fn list(&self, options: &ListOptions) -> PointerDbResult<ListPage> {
        self.list_page(options)
    }

    async fn get_all(&self, keys: &[Vec<u8>]) -> PointerDbResult<Vec<Vec<u8>>> {
        debug!(keys = keys.len(), "Fetching pointers");
        keys.iter()
            .map(|key| {
                self.db
                    .get(key)?
                    .map(|value| value.to_vec())
                    .ok_or_else(|| PointerDbError::key_not_found(key))
            })
            .collect()
    }
}
