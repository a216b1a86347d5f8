use crate::errors::StoreError;
use crate::models::{fields, Lead};
use crate::store::{Filter, TableStore};
use serde_json::Value;
use std::sync::Arc;

/// Columns that must stay unique across leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Phone,
    Email,
}

impl UniqueField {
    pub fn column(self) -> &'static str {
        match self {
            UniqueField::Phone => fields::PHONE,
            UniqueField::Email => fields::EMAIL,
        }
    }
}

/// CRUD façade over the leads table.
#[derive(Clone)]
pub struct LeadRepository {
    store: Arc<dyn TableStore>,
}

impl LeadRepository {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub async fn list_all(&self) -> Result<Vec<Lead>, StoreError> {
        self.store.select(&[], None).await
    }

    pub async fn get_by_id(&self, id: u64) -> Result<Option<Lead>, StoreError> {
        let rows = self.store.select(&[Filter::eq(fields::ID, id)], None).await?;
        Ok(rows.into_iter().next())
    }

    /// Inserts a lead and returns the persisted row, `id` included.
    pub async fn insert(&self, data: Lead) -> Result<Lead, StoreError> {
        let rows = self.store.insert(data).await?;
        let lead = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::EmptyResponse("insert".to_string()))?;

        let id = lead.get(fields::ID).cloned().unwrap_or_default();
        tracing::info!("Lead created: id={}", id);
        Ok(lead)
    }

    /// Merges `patch` into the lead; fields not in the patch keep their values.
    ///
    /// Returns `None` when no row has that id.
    pub async fn update(&self, id: u64, patch: Lead) -> Result<Option<Lead>, StoreError> {
        let rows = self
            .store
            .update(&[Filter::eq(fields::ID, id)], patch)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Returns true if a row was removed.
    pub async fn delete_by_id(&self, id: u64) -> Result<bool, StoreError> {
        let removed = self.store.delete(&[Filter::eq(fields::ID, id)]).await?;
        Ok(!removed.is_empty())
    }

    /// Point lookup used by the uniqueness checks.
    pub async fn exists_by_field(
        &self,
        field: UniqueField,
        value: &Value,
    ) -> Result<bool, StoreError> {
        let rows = self
            .store
            .select(&[Filter::eq(field.column(), value.clone())], Some(1))
            .await?;
        Ok(!rows.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn repository() -> LeadRepository {
        LeadRepository::new(Arc::new(MemoryStore::new()))
    }

    fn lead(value: Value) -> Lead {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_crud_cycle() {
        let repo = repository();

        let created = repo
            .insert(lead(json!({ "name": "Ravi", "phone": "9876543210" })))
            .await
            .unwrap();
        assert_eq!(created["id"], json!(1));

        let fetched = repo.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        let updated = repo
            .update(1, lead(json!({ "status": "Cold" })))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["name"], json!("Ravi"));
        assert_eq!(updated["status"], json!("Cold"));

        assert_eq!(repo.list_all().await.unwrap().len(), 1);
        assert!(repo.delete_by_id(1).await.unwrap());
        assert!(!repo.delete_by_id(1).await.unwrap());
        assert!(repo.get_by_id(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_row_is_none() {
        let repo = repository();
        let result = repo.update(7, lead(json!({ "tag": "x" }))).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_exists_by_field() {
        let repo = repository();
        repo.insert(lead(json!({ "phone": "9876543210", "email": "a@b.in" })))
            .await
            .unwrap();

        assert!(repo
            .exists_by_field(UniqueField::Phone, &json!("9876543210"))
            .await
            .unwrap());
        assert!(repo
            .exists_by_field(UniqueField::Email, &json!("a@b.in"))
            .await
            .unwrap());
        assert!(!repo
            .exists_by_field(UniqueField::Email, &json!("other@b.in"))
            .await
            .unwrap());
    }
}
