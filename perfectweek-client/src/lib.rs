use std::fmt;

use perfectweek_common::ErrorBody;
use reqwest::{RequestBuilder, Response, StatusCode};

/// A non-2xx answer from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Header carrying the caller's identity.
pub const USER_HEADER: &str = "x-user-id";

async fn send(request: RequestBuilder) -> anyhow::Result<Response> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or_default().to_string(),
    };
    Err(ApiError { status, message }.into())
}

pub mod client {
    use perfectweek_common::{
        Event, GroupDetail, InviteRequest, NewUser, Record, RecordId, RespondRequest, User,
        UserId, UserRelationship,
    };
    use reqwest::Client;
    use serde::de::DeserializeOwned;
    use serde_json::Value;
    use anyhow::Result;

    use crate::{send, USER_HEADER};

    fn url(base: &str, path: impl AsRef<str>) -> String {
        String::from(base.trim_end_matches('/')) + "/" + path.as_ref()
    }

    pub async fn add_user(client: &Client, base: &str, new_user: &NewUser) -> Result<User> {
        Ok(send(client.post(url(base, "users")).json(new_user))
            .await?
            .json::<_>()
            .await?)
    }
    pub async fn get_user(client: &Client, base: &str, caller: UserId, id: UserId) -> Result<User> {
        Ok(send(client.get(url(base, format!("users/{id}"))).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }

    pub async fn list<R: Record + DeserializeOwned>(client: &Client, base: &str, caller: UserId, params: &[(&str, &str)]) -> Result<Vec<R>> {
        Ok(send(client.get(url(base, R::NAME)).query(params).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }
    pub async fn search<R: Record + DeserializeOwned>(client: &Client, base: &str, caller: UserId, q: &str) -> Result<Vec<R>> {
        list(client, base, caller, &[("_q", q)]).await
    }
    pub async fn count<R: Record>(client: &Client, base: &str, caller: UserId, params: &[(&str, &str)]) -> Result<usize> {
        Ok(send(client.get(url(base, format!("{}/count", R::NAME))).query(params).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }
    pub async fn get<R: Record + DeserializeOwned>(client: &Client, base: &str, caller: UserId, id: RecordId) -> Result<R> {
        Ok(send(client.get(url(base, format!("{}/{id}", R::NAME))).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }
    pub async fn create<R: Record + DeserializeOwned>(client: &Client, base: &str, caller: UserId, body: &Value) -> Result<R> {
        Ok(send(client.post(url(base, R::NAME)).json(body).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }
    pub async fn update<R: Record + DeserializeOwned>(client: &Client, base: &str, caller: UserId, id: RecordId, body: &Value) -> Result<R> {
        Ok(send(client.put(url(base, format!("{}/{id}", R::NAME))).json(body).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }
    pub async fn destroy<R: Record + DeserializeOwned>(client: &Client, base: &str, caller: UserId, id: RecordId) -> Result<R> {
        Ok(send(client.delete(url(base, format!("{}/{id}", R::NAME))).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }

    pub async fn create_group(client: &Client, base: &str, caller: UserId, body: &Value) -> Result<GroupDetail> {
        Ok(send(client.post(url(base, "group")).json(body).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }
    pub async fn get_group(client: &Client, base: &str, caller: UserId, id: RecordId) -> Result<GroupDetail> {
        Ok(send(client.get(url(base, format!("group/{id}"))).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }
    pub async fn create_event(client: &Client, base: &str, caller: UserId, body: &Value) -> Result<Event> {
        create::<Event>(client, base, caller, body).await
    }

    pub async fn invite(client: &Client, base: &str, caller: UserId, to: UserId) -> Result<UserRelationship> {
        Ok(send(client.post(url(base, "userrelationship/invite")).json(&InviteRequest { user: Some(to) }).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }
    pub async fn respond(client: &Client, base: &str, caller: UserId, request: RecordId, accept: bool) -> Result<Vec<UserRelationship>> {
        let body = RespondRequest { request: Some(request), response: Some(accept) };
        Ok(send(client.post(url(base, "userrelationship/respond")).json(&body).header(USER_HEADER, caller.0))
            .await?
            .json::<_>()
            .await?)
    }
    pub async fn relationships(client: &Client, base: &str, caller: UserId) -> Result<Vec<UserRelationship>> {
        list::<UserRelationship>(client, base, caller, &[]).await
    }
    pub async fn unfriend(client: &Client, base: &str, caller: UserId, edge: RecordId) -> Result<UserRelationship> {
        destroy::<UserRelationship>(client, base, caller, edge).await
    }
}
