pub mod non_api_structs;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::non_api_structs::FieldKind;

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Copy, Clone, Debug, Serialize, Deserialize, Default)]
pub struct RecordId(pub u64);

#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Copy, Clone, Debug, Serialize, Deserialize, Default)]
pub struct UserId(pub u64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A stored entity type. `NAME` doubles as the sled tree name and the
/// route prefix; `SCHEMA` lists the searchable columns.
pub trait Record {
    const NAME: &'static str;
    const SCHEMA: &'static [(&'static str, FieldKind)];
    /// Fields whose combined values identify at most one row.
    const UNIQUE: &'static [&'static str] = &[];
    fn id(&self) -> RecordId;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Calendar {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<UserId>,
}
impl Record for Calendar {
    const NAME: &'static str = "calendar";
    const SCHEMA: &'static [(&'static str, FieldKind)] = &[
        ("name", FieldKind::Text),
        ("description", FieldKind::Text),
    ];
    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub max_attendees: Option<i64>,
    #[serde(default)]
    pub group: Option<RecordId>,
    #[serde(default)]
    pub calendar: Option<RecordId>,
}
impl Record for Event {
    const NAME: &'static str = "event";
    const SCHEMA: &'static [(&'static str, FieldKind)] = &[
        ("name", FieldKind::Text),
        ("description", FieldKind::Text),
        ("location", FieldKind::Text),
        ("start_time", FieldKind::Other),
        ("end_time", FieldKind::Other),
        ("max_attendees", FieldKind::Numeric),
    ];
    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeStatus {
    Admin,
    #[default]
    Attendee,
    Pending,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventAttendee {
    pub id: RecordId,
    pub event: RecordId,
    pub user: UserId,
    #[serde(default)]
    pub status: AttendeeStatus,
}
impl Record for EventAttendee {
    const NAME: &'static str = "eventattendee";
    const SCHEMA: &'static [(&'static str, FieldKind)] = &[("status", FieldKind::Other)];
    const UNIQUE: &'static [&'static str] = &["event", "user"];
    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
}
impl Record for Group {
    const NAME: &'static str = "group";
    const SCHEMA: &'static [(&'static str, FieldKind)] = &[
        ("name", FieldKind::Text),
        ("description", FieldKind::Text),
        ("private", FieldKind::Boolean),
    ];
    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Admin,
    #[default]
    Member,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMember {
    pub id: RecordId,
    pub group: RecordId,
    pub user: UserId,
    #[serde(default)]
    pub role: MemberRole,
}
impl Record for GroupMember {
    const NAME: &'static str = "groupmember";
    const SCHEMA: &'static [(&'static str, FieldKind)] = &[("role", FieldKind::Other)];
    const UNIQUE: &'static [&'static str] = &["group", "user"];
    fn id(&self) -> RecordId {
        self.id
    }
}

/// `user` is the invitee, `from` the member who sent the invite.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupInvite {
    pub id: RecordId,
    pub group: RecordId,
    pub user: UserId,
    pub from: UserId,
}
impl Record for GroupInvite {
    const NAME: &'static str = "groupinvite";
    const SCHEMA: &'static [(&'static str, FieldKind)] = &[];
    fn id(&self) -> RecordId {
        self.id
    }
}

#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Request,
    Friend,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRelationship {
    pub id: RecordId,
    pub from: UserId,
    pub with: UserId,
    pub status: RelationshipStatus,
}
impl Record for UserRelationship {
    const NAME: &'static str = "userrelationship";
    const SCHEMA: &'static [(&'static str, FieldKind)] = &[("status", FieldKind::Other)];
    fn id(&self) -> RecordId {
        self.id
    }
}
impl UserRelationship {
    pub fn touches(&self, user: UserId) -> bool {
        self.from == user || self.with == user
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct NewUser {
    pub username: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct InviteRequest {
    pub user: Option<UserId>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RespondRequest {
    pub request: Option<RecordId>,
    pub response: Option<bool>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberSummary {
    pub id: UserId,
    pub username: String,
    pub role: MemberRole,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<MemberSummary>,
    pub invited_members: Vec<User>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ErrorBody {
    pub error: String,
}
