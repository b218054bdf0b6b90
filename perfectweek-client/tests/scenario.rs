use std::net::TcpListener;

use perfectweek_client::client::*;
use perfectweek_client::{ApiError, USER_HEADER};
use perfectweek_common::{
    Calendar, ErrorBody, Event, Group, GroupMember, NewUser, RelationshipStatus, User,
    UserRelationship,
};
use reqwest::{Client, StatusCode};
use serde_json::json;

async fn spawn_server() -> anyhow::Result<String> {
    let state = perfectweek_server::State::temporary()?;
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;
    let server = axum::Server::from_tcp(listener)?
        .serve(perfectweek_server::router(state).into_make_service());
    tokio::spawn(server);
    Ok(format!("http://{addr}"))
}

async fn register(client: &Client, base: &str, name: &str) -> anyhow::Result<User> {
    add_user(
        client,
        base,
        &NewUser {
            username: name.into(),
            image: Some(format!("{name}.png")),
        },
    )
    .await
}

fn status_of(error: anyhow::Error) -> StatusCode {
    error
        .downcast_ref::<ApiError>()
        .map(|e| e.status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

#[tokio::test]
async fn friend_request_round_trip() -> anyhow::Result<()> {
    let base = spawn_server().await?;
    let client = Client::new();
    let ana = register(&client, &base, "ana").await?;
    let bob = register(&client, &base, "bob").await?;

    assert!(relationships(&client, &base, ana.id).await?.is_empty());

    let edge = invite(&client, &base, ana.id, bob.id).await?;
    assert_eq!(edge.from, ana.id);
    assert_eq!(edge.with, bob.id);
    assert_eq!(edge.status, RelationshipStatus::Request);

    let err = invite(&client, &base, bob.id, ana.id).await.unwrap_err();
    assert_eq!(status_of(err), StatusCode::CONFLICT);
    let err = invite(&client, &base, ana.id, ana.id).await.unwrap_err();
    assert_eq!(status_of(err), StatusCode::BAD_REQUEST);

    // only the invitee can answer
    let err = respond(&client, &base, ana.id, edge.id, true).await.unwrap_err();
    assert_eq!(status_of(err), StatusCode::NOT_FOUND);

    let bobs = respond(&client, &base, bob.id, edge.id, true).await?;
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].status, RelationshipStatus::Friend);
    assert_eq!(relationships(&client, &base, ana.id).await?, bobs);
    assert_eq!(count::<UserRelationship>(&client, &base, ana.id, &[]).await?, 1);

    unfriend(&client, &base, bob.id, edge.id).await?;
    assert!(relationships(&client, &base, ana.id).await?.is_empty());

    let again = invite(&client, &base, ana.id, bob.id).await?;
    assert!(respond(&client, &base, bob.id, again.id, false).await?.is_empty());
    invite(&client, &base, ana.id, bob.id).await?;
    Ok(())
}

#[tokio::test]
async fn groups_are_scoped_to_members() -> anyhow::Result<()> {
    let base = spawn_server().await?;
    let client = Client::new();
    let ana = register(&client, &base, "ana").await?;
    let bob = register(&client, &base, "bob").await?;

    let detail = create_group(&client, &base, ana.id, &json!({"name": "Climbing club"})).await?;
    assert_eq!(detail.members.len(), 1);
    assert_eq!(detail.members[0].username, "ana");
    let group_id = detail.group.id;

    assert!(list::<Group>(&client, &base, bob.id, &[]).await?.is_empty());
    let err = get_group(&client, &base, bob.id, group_id).await.unwrap_err();
    assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    assert_eq!(list::<Group>(&client, &base, ana.id, &[]).await?.len(), 1);
    assert_eq!(search::<Group>(&client, &base, ana.id, "climbing").await?.len(), 1);
    assert!(search::<Group>(&client, &base, bob.id, "climbing").await?.is_empty());

    create::<GroupMember>(
        &client,
        &base,
        bob.id,
        &json!({"group": group_id, "user": bob.id, "role": "member"}),
    )
    .await?;
    assert_eq!(get_group(&client, &base, bob.id, group_id).await?.members.len(), 2);
    let err = create::<GroupMember>(
        &client,
        &base,
        bob.id,
        &json!({"group": group_id, "user": bob.id, "role": "admin"}),
    )
    .await
    .unwrap_err();
    assert_eq!(status_of(err), StatusCode::CONFLICT);
    assert_eq!(get_group(&client, &base, bob.id, group_id).await?.members.len(), 2);

    let err = update::<Group>(&client, &base, bob.id, group_id, &json!({"name": "mine"}))
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    let renamed = update::<Group>(&client, &base, ana.id, group_id, &json!({"name": "Bouldering"})).await?;
    assert_eq!(renamed.name, "Bouldering");

    destroy::<Group>(&client, &base, ana.id, group_id).await?;
    assert!(list::<GroupMember>(&client, &base, bob.id, &[]).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn events_and_calendars() -> anyhow::Result<()> {
    let base = spawn_server().await?;
    let client = Client::new();
    let ana = register(&client, &base, "ana").await?;
    let bob = register(&client, &base, "bob").await?;

    let calendar = create::<Calendar>(&client, &base, ana.id, &json!({"name": "Family"})).await?;
    // calendars are global
    assert_eq!(get::<Calendar>(&client, &base, bob.id, calendar.id).await?, calendar);

    let event = create_event(
        &client,
        &base,
        ana.id,
        &json!({
            "name": "Birthday dinner",
            "start_time": "2024-03-10T18:00:00Z",
            "end_time": "2024-03-10T22:00:00Z",
            "calendar": calendar.id,
            "max_attendees": 12
        }),
    )
    .await?;
    assert_eq!(get::<Event>(&client, &base, ana.id, event.id).await?, event);
    assert_eq!(list::<Event>(&client, &base, ana.id, &[("max_attendees_gte", "10")]).await?.len(), 1);
    assert!(list::<Event>(&client, &base, ana.id, &[("max_attendees_lt", "10")]).await?.is_empty());
    assert_eq!(search::<Event>(&client, &base, ana.id, "12").await?.len(), 1);
    let err = get::<Event>(&client, &base, bob.id, event.id).await.unwrap_err();
    assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    assert_eq!(count::<Event>(&client, &base, bob.id, &[]).await?, 0);

    destroy::<Calendar>(&client, &base, bob.id, calendar.id).await?;
    assert_eq!(get::<Event>(&client, &base, ana.id, event.id).await?.calendar, None);
    Ok(())
}

#[tokio::test]
async fn requests_need_a_known_caller() -> anyhow::Result<()> {
    let base = spawn_server().await?;
    let client = Client::new();
    let ana = register(&client, &base, "ana").await?;
    assert_eq!(get_user(&client, &base, ana.id, ana.id).await?, ana);

    let stranger = perfectweek_common::UserId(ana.id.0 + 1000);
    let err = list::<Group>(&client, &base, stranger, &[]).await.unwrap_err();
    assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn malformed_input_is_a_bad_request() -> anyhow::Result<()> {
    let base = spawn_server().await?;
    let client = Client::new();
    let ana = register(&client, &base, "ana").await?;

    let response = client
        .post(format!("{base}/userrelationship/invite"))
        .header(USER_HEADER, ana.id.0)
        .json(&json!({"user": "bob"}))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json().await?;
    assert!(body.error.contains("user"));

    let response = client
        .post(format!("{base}/group"))
        .header(USER_HEADER, ana.id.0)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{\"name\": ")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    response.json::<ErrorBody>().await?;

    let response = client
        .get(format!("{base}/group/not-a-number"))
        .header(USER_HEADER, ana.id.0)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    response.json::<ErrorBody>().await?;
    Ok(())
}
