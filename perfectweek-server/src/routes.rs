use std::collections::HashMap;

use axum::routing::{get, post, MethodRouter};
use axum::{Extension, Router};
use perfectweek_common::{
    Calendar, Event, EventAttendee, Group, GroupDetail, GroupInvite, GroupMember, InviteRequest,
    NewUser, Record, RecordId, RespondRequest, User, UserId, UserRelationship,
};
use serde_json::Value;
use tower_http::trace::TraceLayer;

use crate::access::Controller;
use crate::error::{AppError, Result};
use crate::extract::{Json, Path, Query};
use crate::gateway::Stored;
use crate::query::ListQuery;
use crate::state::State;
use crate::users::CurrentUser;

type Params = Query<HashMap<String, String>>;

/// A record type with its own set of routes.
pub trait Resource: Stored {
    fn controller(state: &State) -> &Controller<Self>;
}

impl Resource for Calendar {
    fn controller(state: &State) -> &Controller<Self> {
        state.calendars()
    }
}
impl Resource for Event {
    fn controller(state: &State) -> &Controller<Self> {
        state.events()
    }
}
impl Resource for EventAttendee {
    fn controller(state: &State) -> &Controller<Self> {
        state.attendees()
    }
}
impl Resource for Group {
    fn controller(state: &State) -> &Controller<Self> {
        state.groups()
    }
}
impl Resource for GroupInvite {
    fn controller(state: &State) -> &Controller<Self> {
        state.invites()
    }
}
impl Resource for GroupMember {
    fn controller(state: &State) -> &Controller<Self> {
        state.members()
    }
}
impl Resource for UserRelationship {
    fn controller(state: &State) -> &Controller<Self> {
        state.relationships().controller()
    }
}

pub fn router(state: State) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/users", post(register_user))
        .route("/users/:id", get(show_user))
        .merge(entity_routes::<Calendar>(
            get(find::<Calendar>).post(create::<Calendar>),
            get(count::<Calendar>),
            get(find_one::<Calendar>)
                .put(update::<Calendar>)
                .delete(destroy::<Calendar>),
        ))
        .merge(entity_routes::<Event>(
            get(find_of_user::<Event>).post(create_event),
            get(count_of_user::<Event>),
            scoped_member::<Event>(),
        ))
        .merge(entity_routes::<Group>(
            get(find_of_user::<Group>).post(create_group),
            get(count_of_user::<Group>),
            get(find_one_group)
                .put(update_of_user::<Group>)
                .delete(destroy_of_user::<Group>),
        ))
        .merge(scoped_routes::<EventAttendee>())
        .merge(scoped_routes::<GroupInvite>())
        .merge(scoped_routes::<GroupMember>())
        .merge(entity_routes::<UserRelationship>(
            get(find_of_user::<UserRelationship>).post(invite),
            get(count_of_user::<UserRelationship>),
            get(find_one_of_user::<UserRelationship>).delete(destroy_of_user::<UserRelationship>),
        ))
        .route("/userrelationship/invite", post(invite))
        .route("/userrelationship/respond", post(respond))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

fn entity_routes<R: Record>(collection: MethodRouter, count: MethodRouter, member: MethodRouter) -> Router {
    Router::new()
        .route(&format!("/{}", R::NAME), collection)
        .route(&format!("/{}/count", R::NAME), count)
        .route(&format!("/{}/:id", R::NAME), member)
}

fn scoped_member<R: Resource>() -> MethodRouter {
    get(find_one_of_user::<R>)
        .put(update_of_user::<R>)
        .delete(destroy_of_user::<R>)
}

fn scoped_routes<R: Resource>() -> Router {
    entity_routes::<R>(
        get(find_of_user::<R>).post(create::<R>),
        get(count_of_user::<R>),
        scoped_member::<R>(),
    )
}

async fn root() -> &'static str {
    "perfectweek"
}

async fn register_user(Extension(state): Extension<State>, Json(new_user): Json<NewUser>) -> Result<Json<User>> {
    Ok(Json(state.users().create(new_user)?))
}

async fn show_user(
    Extension(state): Extension<State>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<User>> {
    state
        .users()
        .get(UserId(id))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No user with ID {id}")))
}

// Unscoped variants.

async fn find<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(_): CurrentUser,
    Query(params): Params,
) -> Result<Json<Vec<R>>> {
    let query = ListQuery::parse(&params, state.default_limit())?;
    let controller = R::controller(&state);
    let records = match query.search {
        Some(_) => controller.search(&query).await?,
        None => controller.fetch_all(&query).await?,
    };
    Ok(Json(records))
}

async fn find_one<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<R>> {
    Ok(Json(R::controller(&state).fetch(RecordId(id)).await?))
}

async fn count<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(_): CurrentUser,
    Query(params): Params,
) -> Result<Json<usize>> {
    let query = ListQuery::parse(&params, state.default_limit())?;
    Ok(Json(R::controller(&state).count(&query.filters).await?))
}

async fn create<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(_): CurrentUser,
    Json(body): Json<Value>,
) -> Result<Json<R>> {
    Ok(Json(R::controller(&state).add(body).await?))
}

async fn update<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Result<Json<R>> {
    Ok(Json(R::controller(&state).edit(RecordId(id), body).await?))
}

async fn destroy<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<R>> {
    Ok(Json(R::controller(&state).remove(RecordId(id)).await?))
}

// Caller-scoped variants.

async fn find_of_user<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Query(params): Params,
) -> Result<Json<Vec<R>>> {
    let query = ListQuery::parse(&params, state.default_limit())?;
    let controller = R::controller(&state);
    let records = match query.search {
        Some(_) => controller.search_of_user(&query, user.id).await?,
        None => controller.fetch_all_of_user(&query, user.id).await?,
    };
    Ok(Json(records))
}

async fn find_one_of_user<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<R>> {
    Ok(Json(
        R::controller(&state)
            .fetch_of_user(RecordId(id), user.id)
            .await?,
    ))
}

async fn count_of_user<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Query(params): Params,
) -> Result<Json<usize>> {
    let query = ListQuery::parse(&params, state.default_limit())?;
    Ok(Json(
        R::controller(&state)
            .count_of_user(&query.filters, user.id)
            .await?,
    ))
}

async fn update_of_user<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Result<Json<R>> {
    Ok(Json(
        R::controller(&state)
            .edit_of_user(RecordId(id), body, user.id)
            .await?,
    ))
}

async fn destroy_of_user<R: Resource>(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<R>> {
    Ok(Json(
        R::controller(&state)
            .remove_of_user(RecordId(id), user.id)
            .await?,
    ))
}

async fn create_group(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<Json<GroupDetail>> {
    Ok(Json(state.create_group(body, &user).await?))
}

async fn find_one_group(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<GroupDetail>> {
    let group = state.groups().fetch_of_user(RecordId(id), user.id).await?;
    Ok(Json(state.group_detail(group).await?))
}

async fn create_event(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<Value>,
) -> Result<Json<Event>> {
    Ok(Json(state.create_event(body, &user).await?))
}

async fn invite(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<InviteRequest>,
) -> Result<Json<UserRelationship>> {
    Ok(Json(state.relationships().invite(user.id, body).await?))
}

async fn respond(
    Extension(state): Extension<State>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<RespondRequest>,
) -> Result<Json<Vec<UserRelationship>>> {
    Ok(Json(state.relationships().respond(user.id, body).await?))
}
