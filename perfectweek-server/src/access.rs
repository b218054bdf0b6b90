use std::sync::Arc;

use async_trait::async_trait;
use perfectweek_common::{RecordId, UserId};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::gateway::{Gateway, Stored};
use crate::membership::{self, Membership, Role};
use crate::query::{Filter, ListQuery};

/// Per-entity authorization policy.
#[async_trait]
pub trait Scope<R: Stored>: Send + Sync {
    /// Users entitled to see `record`, with their roles.
    async fn members(&self, record: &R) -> Result<Vec<Membership>>;

    fn may_mutate(&self, role: Role) -> bool;

    /// Clears rows that point at `record` before it is destroyed.
    async fn cascade(&self, _record: &R) -> Result<()> {
        Ok(())
    }
}

/// CRUD over one record type, in an unscoped (admin) flavour and a
/// caller-scoped flavour that hides rows the caller is not a member of.
pub struct Controller<R: Stored> {
    gateway: Arc<dyn Gateway<R>>,
    scope: Arc<dyn Scope<R>>,
    writes: Arc<Mutex<()>>,
}

impl<R: Stored> Controller<R> {
    pub fn new(gateway: Arc<dyn Gateway<R>>, scope: Arc<dyn Scope<R>>, writes: Arc<Mutex<()>>) -> Self {
        Self {
            gateway,
            scope,
            writes,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway<R>> {
        &self.gateway
    }

    fn not_found(id: RecordId) -> AppError {
        AppError::NotFound(format!("No {} with ID {}", R::NAME, id))
    }

    pub async fn fetch_all(&self, query: &ListQuery) -> Result<Vec<R>> {
        self.gateway.fetch_many(query).await
    }

    pub async fn search(&self, query: &ListQuery) -> Result<Vec<R>> {
        self.gateway.text_search(query).await
    }

    pub async fn fetch(&self, id: RecordId) -> Result<R> {
        self.gateway
            .fetch_one(id)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    pub async fn count(&self, filters: &[Filter]) -> Result<usize> {
        self.gateway.count(filters).await
    }

    pub async fn add(&self, fields: Value) -> Result<R> {
        let _guard = self.writes.lock().await;
        self.insert(fields).await
    }

    pub async fn edit(&self, id: RecordId, fields: Value) -> Result<R> {
        let _guard = self.writes.lock().await;
        self.update(id, fields).await
    }

    /// Like [`Controller::add`], for callers already holding the write lock.
    pub(crate) async fn insert(&self, fields: Value) -> Result<R> {
        let record = self.gateway.save(None, fields).await?;
        tracing::debug!(entity = R::NAME, id = %record.id(), "created");
        Ok(record)
    }

    /// Like [`Controller::edit`], for callers already holding the write lock.
    pub(crate) async fn update(&self, id: RecordId, fields: Value) -> Result<R> {
        self.gateway.save(Some(id), fields).await
    }

    pub async fn remove(&self, id: RecordId) -> Result<R> {
        let record = self.fetch(id).await?;
        self.destroy(record).await
    }

    async fn destroy(&self, record: R) -> Result<R> {
        self.scope.cascade(&record).await?;
        self.gateway.destroy(record.id()).await?;
        tracing::debug!(entity = R::NAME, id = %record.id(), "destroyed");
        Ok(record)
    }

    async fn role_of(&self, record: &R, user: UserId) -> Result<Option<Role>> {
        Ok(membership::role_of(&self.scope.members(record).await?, user))
    }

    async fn visible_to(&self, records: Vec<R>, user: UserId) -> Result<Vec<R>> {
        let mut visible = Vec::with_capacity(records.len());
        for record in records {
            if self.role_of(&record, user).await?.is_some() {
                visible.push(record);
            }
        }
        Ok(visible)
    }

    // Paging is applied before the membership filter, so a page can come
    // back shorter than `_limit` even when more visible rows exist.
    pub async fn fetch_all_of_user(&self, query: &ListQuery, user: UserId) -> Result<Vec<R>> {
        let records = self.gateway.fetch_many(query).await?;
        self.visible_to(records, user).await
    }

    pub async fn search_of_user(&self, query: &ListQuery, user: UserId) -> Result<Vec<R>> {
        let records = self.gateway.text_search(query).await?;
        self.visible_to(records, user).await
    }

    pub async fn fetch_of_user(&self, id: RecordId, user: UserId) -> Result<R> {
        let record = self.fetch(id).await?;
        match self.role_of(&record, user).await? {
            Some(_) => Ok(record),
            None => Err(Self::not_found(id)),
        }
    }

    pub async fn count_of_user(&self, filters: &[Filter], user: UserId) -> Result<usize> {
        let query = ListQuery {
            filters: filters.to_vec(),
            ..ListQuery::unbounded()
        };
        Ok(self.fetch_all_of_user(&query, user).await?.len())
    }

    /// Fetches `id` and checks that `user` may mutate it. Must be called with
    /// the write lock held so the check and the write stay together.
    async fn authorize(&self, id: RecordId, user: UserId) -> Result<R> {
        let record = self.fetch(id).await?;
        match self.role_of(&record, user).await? {
            Some(role) if self.scope.may_mutate(role) => Ok(record),
            role => {
                tracing::debug!(entity = R::NAME, %id, %user, ?role, "mutation denied");
                Err(Self::not_found(id))
            }
        }
    }

    pub async fn edit_of_user(&self, id: RecordId, fields: Value, user: UserId) -> Result<R> {
        let _guard = self.writes.lock().await;
        self.authorize(id, user).await?;
        self.update(id, fields).await
    }

    pub async fn remove_of_user(&self, id: RecordId, user: UserId) -> Result<R> {
        let _guard = self.writes.lock().await;
        let record = self.authorize(id, user).await?;
        self.destroy(record).await
    }
}
