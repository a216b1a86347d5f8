//! Table store abstraction.
//!
//! The service only ever needs row-level CRUD over a single table queried by
//! column equality. `TableStore` is that surface; the REST backend lives in
//! `postgrest_client`, and `MemoryStore` keeps rows in-process.

use crate::errors::StoreError;
use crate::models::{fields, Lead};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Equality filter on a single column (`column = value`).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    fn matches(&self, row: &Lead) -> bool {
        match row.get(&self.column) {
            Some(found) => values_equal(found, &self.value),
            None => self.value.is_null(),
        }
    }
}

/// Numbers compare by value so `5` and `5.0` match, like they would in SQL.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Row-level access to one remote table.
///
/// Every method returns the affected rows, mirroring what the REST backend
/// hands back with `Prefer: return=representation`.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Rows matching every filter, at most `limit` of them when given.
    async fn select(&self, filters: &[Filter], limit: Option<usize>)
        -> Result<Vec<Lead>, StoreError>;

    /// Inserts one row; the store assigns `id`.
    async fn insert(&self, row: Lead) -> Result<Vec<Lead>, StoreError>;

    /// Merges `patch` into every matching row.
    async fn update(&self, filters: &[Filter], patch: Lead) -> Result<Vec<Lead>, StoreError>;

    /// Removes every matching row.
    async fn delete(&self, filters: &[Filter]) -> Result<Vec<Lead>, StoreError>;
}

/// In-process table keyed by `id`.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<MemoryTable>,
}

#[derive(Debug)]
struct MemoryTable {
    next_id: i64,
    rows: BTreeMap<i64, Lead>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryTable {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryTable>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Decode("memory store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_all(filters: &[Filter], row: &Lead) -> bool {
    filters.iter().all(|f| f.matches(row))
}

#[async_trait]
impl TableStore for MemoryStore {
    async fn select(
        &self,
        filters: &[Filter],
        limit: Option<usize>,
    ) -> Result<Vec<Lead>, StoreError> {
        let table = self.lock()?;
        let rows = table
            .rows
            .values()
            .filter(|row| matches_all(filters, row))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(rows)
    }

    async fn insert(&self, mut row: Lead) -> Result<Vec<Lead>, StoreError> {
        let mut table = self.lock()?;

        let id = match row.get(fields::ID).and_then(Value::as_i64) {
            Some(id) if table.rows.contains_key(&id) => {
                return Err(StoreError::Status {
                    status: 409,
                    body: format!("duplicate key value violates unique constraint: id={}", id),
                });
            }
            Some(id) => id,
            None => table.next_id,
        };
        let Some(after) = id.checked_add(1) else {
            return Err(StoreError::Status {
                status: 400,
                body: format!("id {} is out of range", id),
            });
        };
        table.next_id = table.next_id.max(after);

        // `id` leads the row, the same column order the table reports
        let mut stored = Lead::new();
        stored.insert(fields::ID.to_string(), Value::from(id));
        row.remove(fields::ID);
        stored.extend(row);

        table.rows.insert(id, stored.clone());
        Ok(vec![stored])
    }

    async fn update(&self, filters: &[Filter], patch: Lead) -> Result<Vec<Lead>, StoreError> {
        let mut table = self.lock()?;
        let mut updated = Vec::new();

        for row in table.rows.values_mut() {
            if !matches_all(filters, row) {
                continue;
            }
            for (key, value) in &patch {
                if key != fields::ID {
                    row.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }

        Ok(updated)
    }

    async fn delete(&self, filters: &[Filter]) -> Result<Vec<Lead>, StoreError> {
        let mut table = self.lock()?;

        let ids: Vec<i64> = table
            .rows
            .iter()
            .filter(|(_, row)| matches_all(filters, row))
            .map(|(id, _)| *id)
            .collect();

        Ok(ids
            .into_iter()
            .filter_map(|id| table.rows.remove(&id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Lead {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::new();

        let first = store.insert(row(json!({ "name": "A" }))).await.unwrap();
        let second = store.insert(row(json!({ "name": "B" }))).await.unwrap();

        assert_eq!(first[0]["id"], json!(1));
        assert_eq!(second[0]["id"], json!(2));
        assert_eq!(first[0].keys().next().map(String::as_str), Some("id"));
    }

    #[tokio::test]
    async fn test_select_filters_and_limits() {
        let store = MemoryStore::new();
        store.insert(row(json!({ "phone": "9876543210" }))).await.unwrap();
        store.insert(row(json!({ "phone": "9876543210" }))).await.unwrap();
        store.insert(row(json!({ "phone": "9123456789" }))).await.unwrap();

        let all = store.select(&[], None).await.unwrap();
        assert_eq!(all.len(), 3);

        let matching = store
            .select(&[Filter::eq("phone", "9876543210")], None)
            .await
            .unwrap();
        assert_eq!(matching.len(), 2);

        let limited = store
            .select(&[Filter::eq("phone", "9876543210")], Some(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0]["id"], json!(1));
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_id() {
        let store = MemoryStore::new();
        store
            .insert(row(json!({ "name": "A", "tag": "Lead" })))
            .await
            .unwrap();

        let updated = store
            .update(&[Filter::eq("id", 1)], row(json!({ "tag": "Hot", "id": 99 })))
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["id"], json!(1));
        assert_eq!(updated[0]["name"], json!("A"));
        assert_eq!(updated[0]["tag"], json!("Hot"));
    }

    #[tokio::test]
    async fn test_delete_returns_removed_rows() {
        let store = MemoryStore::new();
        store.insert(row(json!({ "name": "A" }))).await.unwrap();

        let removed = store.delete(&[Filter::eq("id", 1)]).await.unwrap();
        assert_eq!(removed.len(), 1);

        let removed_again = store.delete(&[Filter::eq("id", 1)]).await.unwrap();
        assert!(removed_again.is_empty());
    }

    #[tokio::test]
    async fn test_insert_rejects_id_at_upper_bound() {
        let store = MemoryStore::new();

        let result = store.insert(row(json!({ "id": i64::MAX, "name": "A" }))).await;
        assert!(matches!(result, Err(StoreError::Status { status: 400, .. })));

        // The table stays usable afterwards
        let next = store.insert(row(json!({ "name": "B" }))).await.unwrap();
        assert_eq!(next[0]["id"], json!(1));
        assert_eq!(store.select(&[], None).await.unwrap().len(), 1);
    }

    #[test]
    fn test_numeric_filters_compare_by_value() {
        let lead = row(json!({ "id": 3 }));
        assert!(Filter::eq("id", 3u64).matches(&lead));
        assert!(Filter::eq("id", 3.0).matches(&lead));
        assert!(!Filter::eq("id", "3").matches(&lead));
    }
}
