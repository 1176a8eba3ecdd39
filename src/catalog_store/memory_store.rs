//! In-memory catalog store.
//!
//! Keeps records in a vector behind a mutex. Used by tests and by callers
//! that want to stage a catalog without touching a database file.

use super::models::{CatalogRecord, NewCatalogRecord};
use super::store::remove_cover_best_effort;
use super::trait_def::CatalogStore;
use anyhow::{bail, Result};
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    records: Vec<CatalogRecord>,
    last_id: i64,
}

#[derive(Default)]
pub struct InMemoryCatalogStore {
    inner: Mutex<Inner>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CatalogStore for InMemoryCatalogStore {
    fn backing_store_exists(&self) -> bool {
        true
    }

    fn source_label(&self) -> String {
        "memory".to_string()
    }

    fn list_all(&self) -> Result<Vec<CatalogRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.records.iter().rev().cloned().collect())
    }

    fn get(&self, id: i64) -> Result<Option<CatalogRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.records.iter().find(|r| r.id == id).cloned())
    }

    fn find_titles(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.records.iter().map(|r| r.title.clone()).collect())
    }

    fn insert(&self, record: &NewCatalogRecord) -> Result<CatalogRecord> {
        if record.title.trim().is_empty() {
            bail!("Cannot insert a catalog entry with an empty title");
        }
        let mut inner = self.inner.lock().unwrap();
        inner.last_id += 1;
        let created = record.clone().into_record(inner.last_id);
        inner.records.push(created.clone());
        Ok(created)
    }

    fn update(&self, record: &CatalogRecord) -> Result<CatalogRecord> {
        let mut inner = self.inner.lock().unwrap();
        match inner.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(record.clone())
            }
            None => bail!("Catalog entry {} not found", record.id),
        }
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.records.iter().position(|r| r.id == id) {
            Some(index) => {
                let removed = inner.records.remove(index);
                remove_cover_best_effort(&removed.cover_path);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
