use serde::Serialize;
use std::marker::PhantomData;
use uuid::Uuid;

use super::models::Model;
use super::store::{DataStore, Scope, StoreError};
use crate::filter::Filter;

/// Typed access to one table on behalf of one caller
pub struct Repository<'a, T> {
    store: &'a dyn DataStore,
    scope: &'a Scope,
    _phantom: PhantomData<T>,
}

impl<'a, T: Model> Repository<'a, T> {
    pub fn new(store: &'a dyn DataStore, scope: &'a Scope) -> Self {
        Self {
            store,
            scope,
            _phantom: PhantomData,
        }
    }

    /// Empty filter on this repository's table
    pub fn filter(&self) -> Filter {
        Filter::new(T::TABLE)
    }

    pub async fn select_any(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        self.store
            .select(self.scope, filter)
            .await?
            .into_iter()
            .map(T::from_row)
            .collect()
    }

    pub async fn select_one(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        let mut filter = filter.clone();
        filter.limit(1)?;
        match self.store.select(self.scope, &filter).await?.into_iter().next() {
            Some(row) => T::from_row(row).map(Some),
            None => Ok(None),
        }
    }

    pub async fn select_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        let mut filter = self.filter();
        filter.eq("id", id)?;
        self.select_one(&filter).await
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.store.count(self.scope, filter).await
    }

    pub async fn insert<R: Serialize>(&self, row: &R) -> Result<(), StoreError> {
        let row = serde_json::to_value(row)?;
        self.store.insert(self.scope, T::TABLE, row).await
    }

    /// Number of rows updated
    pub async fn update_all<P: Serialize>(&self, filter: &Filter, patch: &P) -> Result<u64, StoreError> {
        self.store.update(self.scope, filter, serde_json::to_value(patch)?).await
    }

    pub async fn update_id<P: Serialize>(&self, id: Uuid, patch: &P) -> Result<u64, StoreError> {
        let mut filter = self.filter();
        filter.eq("id", id)?;
        self.update_all(&filter, patch).await
    }

    pub async fn delete_all(&self, filter: &Filter) -> Result<(), StoreError> {
        self.store.delete(self.scope, filter).await
    }

    pub async fn delete_id(&self, id: Uuid) -> Result<(), StoreError> {
        let mut filter = self.filter();
        filter.eq("id", id)?;
        self.delete_all(&filter).await
    }
}
