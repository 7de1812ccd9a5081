use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// A catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub id: i64,
    pub title: String,
    pub overview: String,
}

/// In-memory catalog store.
///
/// Holds the catalog entries behind a shared lock; cloning is cheap and all
/// clones operate on the same catalog. Entries are kept ordered by id so listing
/// is deterministic. All data is lost when the process terminates.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    inner: Arc<Mutex<BTreeMap<i64, Title>>>,
}

impl CatalogStore {
    /// Creates a new empty catalog store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Inserts a new title.
    ///
    /// Returns `false` when an entry with the same id already exists, in which
    /// case the catalog is left untouched.
    pub async fn insert(&self, title: Title) -> bool {
        let mut inner = self.inner.lock().await;

        if inner.contains_key(&title.id) {
            return false;
        }

        inner.insert(title.id, title);

        true
    }

    /// Returns the title with the given id, if present.
    pub async fn get(&self, id: i64) -> Option<Title> {
        self.inner.lock().await.get(&id).cloned()
    }

    /// Returns every title in the catalog, ordered by id.
    pub async fn list(&self) -> Vec<Title> {
        self.inner.lock().await.values().cloned().collect()
    }

    /// Replaces an existing title.
    ///
    /// Returns `false` when no entry with that id exists.
    pub async fn update(&self, title: Title) -> bool {
        let mut inner = self.inner.lock().await;

        if !inner.contains_key(&title.id) {
            return false;
        }

        inner.insert(title.id, title);

        true
    }

    /// Removes the title with the given id.
    ///
    /// Returns `false` when no entry with that id exists.
    pub async fn remove(&self, id: i64) -> bool {
        self.inner.lock().await.remove(&id).is_some()
    }

    /// Returns the number of titles in the catalog.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Returns whether the catalog is empty.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(id: i64, name: &str) -> Title {
        Title {
            id,
            title: name.to_string(),
            overview: format!("overview of {name}"),
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = CatalogStore::new();

        assert!(store.insert(title(1, "Alien")).await);
        assert!(!store.insert(title(1, "Aliens")).await);

        // The original entry survives a rejected insert.
        assert_eq!(store.get(1).await.unwrap().title, "Alien");
    }

    #[tokio::test]
    async fn test_update_requires_existing_entry() {
        let store = CatalogStore::new();

        assert!(!store.update(title(1, "Alien")).await);

        store.insert(title(1, "Alien")).await;
        assert!(store.update(title(1, "Aliens")).await);
        assert_eq!(store.get(1).await.unwrap().title, "Aliens");
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        let store = CatalogStore::new();

        store.insert(title(3, "Blade Runner")).await;
        store.insert(title(1, "Alien")).await;
        store.insert(title(2, "Arrival")).await;

        let ids: Vec<i64> = store.list().await.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_remove_reports_missing_entry() {
        let store = CatalogStore::new();

        store.insert(title(1, "Alien")).await;
        assert!(store.remove(1).await);
        assert!(!store.remove(1).await);
        assert!(store.is_empty().await);
    }
}
