//! Store capability consumed by the migration: ordered, resumable listing
//! and bulk fetch.

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::error::PointerDbResult;
use crate::path;

/// Page size used when [`ListOptions::limit`] is zero.
pub const DEFAULT_LIST_LIMIT: usize = 1000;

/// Separator between key components.
pub const PATH_SEPARATOR: u8 = b'/';

/// Options for a single listing call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only keys starting with this prefix are listed. Returned keys are
    /// relative to it.
    pub prefix: Vec<u8>,
    /// Resume strictly after this key (relative to `prefix`).
    pub start_after: Vec<u8>,
    /// Descend into nested keys instead of collapsing them into prefix items.
    pub recursive: bool,
    pub include_value: bool,
    /// Maximum number of items per page, 0 for [`DEFAULT_LIST_LIMIT`].
    pub limit: usize,
}

impl ListOptions {
    /// Recursive listing of every key and value under `prefix`.
    pub fn recursive(prefix: Vec<u8>) -> Self {
        Self {
            prefix,
            recursive: true,
            include_value: true,
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Effective page size.
    pub fn page_size(&self) -> usize {
        if self.limit == 0 {
            DEFAULT_LIST_LIMIT
        } else {
            self.limit
        }
    }
}

/// One listed key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    /// Key relative to the listing prefix.
    pub key: Vec<u8>,
    /// Empty unless values were requested and the item is not a prefix.
    pub value: Vec<u8>,
    /// Collapsed `dir/` item of a non-recursive listing.
    pub is_prefix: bool,
}

/// One page of listing results.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub items: Vec<ListItem>,
    /// Whether more items follow the last one.
    pub more: bool,
}

/// Legacy pointer store.
#[async_trait]
pub trait PointerDb: Send + Sync {
    /// List one page of keys in key order.
    async fn list(&self, options: &ListOptions) -> PointerDbResult<ListPage>;

    /// Fetch the values of `keys` in one call, in the same order.
    async fn get_all(&self, keys: &[Vec<u8>]) -> PointerDbResult<Vec<Vec<u8>>>;
}

/// Resumable traversal over consecutive listing pages.
///
/// Only the current page is held in memory; each call resumes after the
/// last key of the page before it.
#[derive(Debug, Clone)]
pub struct ListCursor {
    options: ListOptions,
    exhausted: bool,
}

impl ListCursor {
    pub fn new(options: ListOptions) -> Self {
        Self {
            options,
            exhausted: false,
        }
    }

    /// Fetch the next page, or `None` once the listing is exhausted.
    pub async fn next_page<P>(&mut self, db: &P) -> PointerDbResult<Option<Vec<ListItem>>>
    where
        P: PointerDb + ?Sized,
    {
        if self.exhausted {
            return Ok(None);
        }

        let page = db.list(&self.options).await?;
        let Some(last) = page.items.last() else {
            self.exhausted = true;
            return Ok(None);
        };

        self.options.start_after = last.key.clone();
        self.exhausted = !page.more;
        debug!(
            items = page.items.len(),
            more = page.more,
            "Listed pointer page"
        );
        Ok(Some(page.items))
    }

    /// Key the next page will start after.
    pub fn last_key(&self) -> &[u8] {
        &self.options.start_after
    }
}

/// Names of all buckets of a project that hold at least one object.
pub async fn list_buckets<P>(db: &P, project_id: &Uuid) -> PointerDbResult<Vec<Vec<u8>>>
where
    P: PointerDb + ?Sized,
{
    let mut cursor = ListCursor::new(ListOptions {
        prefix: path::project_prefix(project_id),
        ..Default::default()
    });

    let mut buckets = Vec::new();
    while let Some(page) = cursor.next_page(db).await? {
        buckets.extend(
            page.into_iter()
                .filter(|item| item.is_prefix)
                .map(|item| item.key[..item.key.len() - 1].to_vec()),
        );
    }
    Ok(buckets)
}
