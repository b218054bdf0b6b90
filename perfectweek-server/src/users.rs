use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::{async_trait, Extension};
use perfectweek_common::{NewUser, User, UserId};
use sled::{Db, Tree};

use crate::error::{AppError, Result};
use crate::state::State;

/// Header the upstream authenticator sets to the caller's user id.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct Users {
    db: Db,
    tree: Tree,
}

impl Users {
    pub fn new(db: &Db) -> Result<Self> {
        Ok(Self {
            db: db.clone(),
            tree: db.open_tree("users")?,
        })
    }

    pub fn get(&self, id: UserId) -> Result<Option<User>> {
        match self.tree.get(id.0.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn create(&self, new_user: NewUser) -> Result<User> {
        let username = new_user.username.trim();
        if username.is_empty() {
            return Err(AppError::BadRequest("Missing username".into()));
        }
        let user = User {
            id: UserId(self.db.generate_id()?),
            username: username.to_string(),
            image: new_user.image,
        };
        self.tree
            .insert(user.id.0.to_be_bytes(), serde_json::to_vec(&user)?)?;
        tracing::info!(user = %user.id, username = %user.username, "registered user");
        Ok(user)
    }
}

/// The authenticated caller, resolved from [`USER_HEADER`].
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Extension(app) = Extension::<State>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;
        let id = parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .map(UserId)
            .ok_or(AppError::Unauthorized)?;
        app.users()
            .get(id)?
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}
