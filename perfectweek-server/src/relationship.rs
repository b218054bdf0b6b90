//! Friend requests between two users.
//!
//! An edge starts as `request` from the inviter to the invitee. The invitee
//! either accepts it, turning it into `friend` in place, or declines it,
//! which deletes the edge. At most one edge exists per pair of users,
//! whichever direction it was created in.

use std::sync::Arc;

use perfectweek_common::{
    InviteRequest, RelationshipStatus, RespondRequest, UserId, UserRelationship,
};
use serde_json::json;
use tokio::sync::Mutex;

use crate::access::Controller;
use crate::error::{AppError, Result};
use crate::query::ListQuery;
use crate::users::Users;

pub struct Relationships {
    controller: Arc<Controller<UserRelationship>>,
    users: Users,
    writes: Arc<Mutex<()>>,
}

impl Relationships {
    pub fn new(
        controller: Arc<Controller<UserRelationship>>,
        users: Users,
        writes: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            controller,
            users,
            writes,
        }
    }

    pub fn controller(&self) -> &Controller<UserRelationship> {
        &self.controller
    }

    /// Every edge touching `user`, unpaginated.
    pub async fn of_user(&self, user: UserId) -> Result<Vec<UserRelationship>> {
        self.controller
            .fetch_all_of_user(&ListQuery::unbounded(), user)
            .await
    }

    pub async fn invite(&self, from: UserId, request: InviteRequest) -> Result<UserRelationship> {
        let to = request
            .user
            .ok_or_else(|| AppError::BadRequest("Missing user argument in body".into()))?;
        if to == from {
            return Err(AppError::BadRequest("Cannot invite yourself as a friend".into()));
        }
        if self.users.get(to)?.is_none() {
            return Err(AppError::NotFound(format!("No user with ID {to}")));
        }

        let _guard = self.writes.lock().await;
        for edge in self.of_user(from).await? {
            let conflict = match (edge.status, edge.with == to, edge.from == to) {
                (RelationshipStatus::Friend, true, _) | (RelationshipStatus::Friend, _, true) => {
                    format!("User with ID {to} is already a friend")
                }
                (RelationshipStatus::Request, true, _) => {
                    format!("User with ID {to} has already been requested")
                }
                (RelationshipStatus::Request, _, true) => {
                    format!("User with ID {to} has already requested you")
                }
                _ => continue,
            };
            tracing::debug!(%from, %to, edge = %edge.id, "invite rejected");
            return Err(AppError::Conflict(conflict));
        }

        let edge = self
            .controller
            .insert(json!({ "from": from, "with": to, "status": RelationshipStatus::Request }))
            .await?;
        tracing::info!(%from, %to, edge = %edge.id, "friend request sent");
        Ok(edge)
    }

    /// Accepts or declines a pending request addressed to `user` and returns
    /// the caller's relationships afterwards.
    pub async fn respond(&self, user: UserId, request: RespondRequest) -> Result<Vec<UserRelationship>> {
        let accept = request
            .response
            .ok_or_else(|| AppError::BadRequest("Missing response argument in body".into()))?;
        let id = request
            .request
            .ok_or_else(|| AppError::BadRequest("Missing request argument in body".into()))?;

        {
            let _guard = self.writes.lock().await;
            let edge = self
                .controller
                .gateway()
                .fetch_one(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("No request with ID {id}")))?;
            if edge.with != user {
                return Err(AppError::NotFound(format!(
                    "Request with ID {id} cannot be accepted by current user"
                )));
            }
            if edge.status != RelationshipStatus::Request {
                return Err(AppError::BadRequest(
                    "Relationship has status \"friend\", expected \"request\"".into(),
                ));
            }

            if accept {
                self.controller
                    .update(id, json!({ "status": RelationshipStatus::Friend }))
                    .await?;
                tracing::info!(from = %edge.from, with = %user, edge = %id, "friend request accepted");
            } else {
                self.controller.remove(id).await?;
                tracing::info!(from = %edge.from, with = %user, edge = %id, "friend request declined");
            }
        }

        self.of_user(user).await
    }
}
