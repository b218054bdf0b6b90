use std::marker::PhantomData;

use anyhow::anyhow;
use async_trait::async_trait;
use perfectweek_common::{Record, RecordId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use sled::{Db, Tree};

use crate::error::{AppError, Result};
use crate::query::{text_of, Filter, ListQuery};
use crate::search::{Matcher, SearchDialect};

/// Bounds every record type needs to go through a [`Gateway`].
pub trait Stored: Record + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}
impl<R> Stored for R where R: Record + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Storage for one record type. Knows nothing about callers or permissions.
#[async_trait]
pub trait Gateway<R: Stored>: Send + Sync {
    async fn fetch_many(&self, query: &ListQuery) -> Result<Vec<R>>;
    async fn fetch_one(&self, id: RecordId) -> Result<Option<R>>;
    async fn count(&self, filters: &[Filter]) -> Result<usize>;
    /// Inserts when `id` is `None`, otherwise merges `fields` over the stored row.
    async fn save(&self, id: Option<RecordId>, fields: Value) -> Result<R>;
    async fn destroy(&self, id: RecordId) -> Result<()>;
    async fn text_search(&self, query: &ListQuery) -> Result<Vec<R>>;
}

pub struct SledGateway<R> {
    db: Db,
    tree: Tree,
    dialect: SearchDialect,
    _record: PhantomData<fn() -> R>,
}

impl<R: Stored> SledGateway<R> {
    pub fn open(db: &Db, dialect: SearchDialect) -> Result<Self> {
        Ok(Self {
            db: db.clone(),
            tree: db.open_tree(R::NAME)?,
            dialect,
            _record: PhantomData,
        })
    }

    fn rows(&self) -> Result<Vec<(Value, R)>> {
        self.tree
            .iter()
            .values()
            .map(|bytes| -> Result<(Value, R)> {
                let value: Value = serde_json::from_slice(&bytes?)?;
                let record = serde_json::from_value(value.clone())?;
                Ok((value, record))
            })
            .collect()
    }

    fn not_found(id: RecordId) -> AppError {
        AppError::NotFound(format!("No {} with ID {}", R::NAME, id))
    }

    /// Fails when a row other than `id` already holds `row`'s values for
    /// every field in `R::UNIQUE`.
    fn check_unique(&self, id: RecordId, row: &Value) -> Result<()> {
        if R::UNIQUE.is_empty() {
            return Ok(());
        }
        let taken = self.rows()?.into_iter().any(|(value, other)| {
            other.id() != id && R::UNIQUE.iter().all(|field| value.get(field) == row.get(field))
        });
        if !taken {
            return Ok(());
        }
        let key = R::UNIQUE
            .iter()
            .map(|field| format!("{field} {}", text_of(row.get(field).unwrap_or(&Value::Null))))
            .collect::<Vec<_>>()
            .join(" and ");
        Err(AppError::Conflict(format!("A {} with {} already exists", R::NAME, key)))
    }
}

fn key(id: RecordId) -> [u8; 8] {
    id.0.to_be_bytes()
}

#[async_trait]
impl<R: Stored> Gateway<R> for SledGateway<R> {
    async fn fetch_many(&self, query: &ListQuery) -> Result<Vec<R>> {
        let rows = self
            .rows()?
            .into_iter()
            .filter(|(value, _)| query.matches(value))
            .collect();
        Ok(query.page(rows))
    }

    async fn fetch_one(&self, id: RecordId) -> Result<Option<R>> {
        match self.tree.get(key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn count(&self, filters: &[Filter]) -> Result<usize> {
        Ok(self
            .rows()?
            .iter()
            .filter(|(value, _)| filters.iter().all(|filter| filter.matches(value)))
            .count())
    }

    async fn save(&self, id: Option<RecordId>, fields: Value) -> Result<R> {
        let Value::Object(mut fields) = fields else {
            return Err(AppError::BadRequest(format!("{} body must be a JSON object", R::NAME)));
        };
        fields.remove("id");

        let (id, mut merged) = match id {
            Some(id) => {
                let bytes = self.tree.get(key(id))?.ok_or_else(|| Self::not_found(id))?;
                match serde_json::from_slice::<Value>(&bytes)? {
                    Value::Object(stored) => (id, stored),
                    _ => return Err(anyhow!("{} {} is not stored as an object", R::NAME, id).into()),
                }
            }
            None => (RecordId(self.db.generate_id()?), Map::new()),
        };
        merged.extend(fields);
        merged.insert("id".to_string(), Value::from(id.0));

        let record: R = serde_json::from_value(Value::Object(merged))
            .map_err(|e| AppError::BadRequest(format!("Invalid {}: {}", R::NAME, e)))?;
        self.check_unique(id, &serde_json::to_value(&record)?)?;
        self.tree.insert(key(id), serde_json::to_vec(&record)?)?;
        Ok(record)
    }

    async fn destroy(&self, id: RecordId) -> Result<()> {
        self.tree
            .remove(key(id))?
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }

    async fn text_search(&self, query: &ListQuery) -> Result<Vec<R>> {
        let matcher = Matcher::new(query.search.as_deref().unwrap_or_default(), self.dialect);
        let rows = self
            .rows()?
            .into_iter()
            .filter(|(value, _)| matcher.matches(R::SCHEMA, value))
            .collect();
        Ok(query.page(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perfectweek_common::{Group, GroupMember};
    use serde_json::json;

    fn gateway() -> SledGateway<Group> {
        let db = sled::Config::new().temporary(true).open().unwrap();
        SledGateway::open(&db, SearchDialect::MySql).unwrap()
    }

    #[tokio::test]
    async fn save_inserts_then_merges() {
        let groups = gateway();
        let created = groups
            .save(None, json!({"name": "Runners", "id": 999}))
            .await
            .unwrap();
        assert_eq!(created.name, "Runners");
        assert_ne!(created.id, RecordId(999));
        assert!(!created.private);

        let updated = groups
            .save(Some(created.id), json!({"private": true}))
            .await
            .unwrap();
        assert_eq!(updated.name, "Runners");
        assert!(updated.private);
        assert_eq!(groups.fetch_one(created.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn save_rejects_invalid_payloads() {
        let groups = gateway();
        assert!(matches!(
            groups.save(None, json!({"description": "no name"})).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            groups.save(None, json!(["not", "an", "object"])).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            groups.save(Some(RecordId(42)), json!({"name": "x"})).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn fetch_many_filters_sorts_and_pages() {
        let groups = gateway();
        for name in ["b", "d", "a", "c"] {
            groups.save(None, json!({"name": name})).await.unwrap();
        }
        let mut params = std::collections::HashMap::new();
        params.insert("_sort".to_string(), "name:ASC".to_string());
        params.insert("_start".to_string(), "1".to_string());
        params.insert("_limit".to_string(), "2".to_string());
        params.insert("name_ne".to_string(), "c".to_string());
        let query = ListQuery::parse(&params, 100).unwrap();

        let names: Vec<_> = groups
            .fetch_many(&query)
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(names, vec!["b", "d"]);
        assert_eq!(groups.count(&query.filters).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn unique_fields_reject_a_second_row() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let members: SledGateway<GroupMember> = SledGateway::open(&db, SearchDialect::MySql).unwrap();
        let first = members
            .save(None, json!({"group": 1, "user": 7}))
            .await
            .unwrap();
        let err = members
            .save(None, json!({"group": 1, "user": 7, "role": "admin"}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "A groupmember with group 1 and user 7 already exists");
        assert_eq!(members.count(&[]).await.unwrap(), 1);

        // the same pair in another group, and re-saving the row itself, are fine
        let second = members
            .save(None, json!({"group": 2, "user": 7}))
            .await
            .unwrap();
        members
            .save(Some(first.id), json!({"role": "admin"}))
            .await
            .unwrap();
        assert!(matches!(
            members.save(Some(second.id), json!({"group": 1})).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn destroy_removes_row() {
        let groups = gateway();
        let group = groups.save(None, json!({"name": "x"})).await.unwrap();
        groups.destroy(group.id).await.unwrap();
        assert_eq!(groups.fetch_one(group.id).await.unwrap(), None);
        assert!(matches!(
            groups.destroy(group.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn text_search_uses_schema() {
        let groups = gateway();
        groups
            .save(None, json!({"name": "Chess club", "private": true}))
            .await
            .unwrap();
        groups.save(None, json!({"name": "Choir"})).await.unwrap();

        let query = ListQuery {
            search: Some("chess".into()),
            ..Default::default()
        };
        let found = groups.text_search(&query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Chess club");

        let query = ListQuery {
            search: Some("true".into()),
            ..Default::default()
        };
        assert_eq!(groups.text_search(&query).await.unwrap().len(), 1);
    }
}
