use std::sync::Arc;

use perfectweek_common::{
    AttendeeStatus, Calendar, Event, EventAttendee, Group, GroupDetail, GroupInvite, GroupMember,
    MemberRole, MemberSummary, User, UserRelationship,
};
use serde_json::{json, Value};
use sled::Db;
use tokio::sync::{Mutex, MutexGuard};

use crate::access::Controller;
use crate::config::Config;
use crate::error::Result;
use crate::gateway::{Gateway, SledGateway};
use crate::query::ListQuery;
use crate::relationship::Relationships;
use crate::scopes::{CalendarScope, EventScope, GroupScope, OwnedScope};
use crate::search::SearchDialect;
use crate::users::Users;

/// Everything a request handler needs, wired once at startup.
#[derive(Clone)]
pub struct State {
    db: Db,
    default_limit: usize,
    users: Users,
    calendars: Arc<Controller<Calendar>>,
    events: Arc<Controller<Event>>,
    attendees: Arc<Controller<EventAttendee>>,
    groups: Arc<Controller<Group>>,
    invites: Arc<Controller<GroupInvite>>,
    members: Arc<Controller<GroupMember>>,
    relationships: Arc<Relationships>,
    writes: Arc<Mutex<()>>,
}

impl State {
    pub fn open(config: &Config) -> Result<Self> {
        let db = sled::open(&config.db_path)?;
        tracing::info!(path = %config.db_path.display(), "opened database");
        Self::with_db(db, config.search_dialect, config.default_limit)
    }

    /// Backed by a throwaway database, removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let config = Config::default();
        Self::with_db(db, config.search_dialect, config.default_limit)
    }

    fn with_db(db: Db, dialect: SearchDialect, default_limit: usize) -> Result<Self> {
        let writes = Arc::new(Mutex::new(()));
        let users = Users::new(&db)?;

        let calendar_rows: Arc<dyn Gateway<Calendar>> = Arc::new(SledGateway::<Calendar>::open(&db, dialect)?);
        let event_rows: Arc<dyn Gateway<Event>> = Arc::new(SledGateway::<Event>::open(&db, dialect)?);
        let attendee_rows: Arc<dyn Gateway<EventAttendee>> = Arc::new(SledGateway::<EventAttendee>::open(&db, dialect)?);
        let group_rows: Arc<dyn Gateway<Group>> = Arc::new(SledGateway::<Group>::open(&db, dialect)?);
        let invite_rows: Arc<dyn Gateway<GroupInvite>> = Arc::new(SledGateway::<GroupInvite>::open(&db, dialect)?);
        let member_rows: Arc<dyn Gateway<GroupMember>> = Arc::new(SledGateway::<GroupMember>::open(&db, dialect)?);
        let relationship_rows: Arc<dyn Gateway<UserRelationship>> =
            Arc::new(SledGateway::<UserRelationship>::open(&db, dialect)?);

        let calendars = Controller::new(
            calendar_rows,
            Arc::new(CalendarScope {
                events: event_rows.clone(),
            }),
            writes.clone(),
        );
        let events = Controller::new(
            event_rows.clone(),
            Arc::new(EventScope {
                attendees: attendee_rows.clone(),
            }),
            writes.clone(),
        );
        let groups = Controller::new(
            group_rows,
            Arc::new(GroupScope {
                members: member_rows.clone(),
                invites: invite_rows.clone(),
                events: event_rows,
            }),
            writes.clone(),
        );
        let attendees = Controller::new(attendee_rows, Arc::new(OwnedScope), writes.clone());
        let invites = Controller::new(invite_rows, Arc::new(OwnedScope), writes.clone());
        let members = Controller::new(member_rows, Arc::new(OwnedScope), writes.clone());
        let relationships = Relationships::new(
            Arc::new(Controller::new(relationship_rows, Arc::new(OwnedScope), writes.clone())),
            users.clone(),
            writes.clone(),
        );

        Ok(Self {
            db,
            default_limit,
            users,
            calendars: Arc::new(calendars),
            events: Arc::new(events),
            attendees: Arc::new(attendees),
            groups: Arc::new(groups),
            invites: Arc::new(invites),
            members: Arc::new(members),
            relationships: Arc::new(relationships),
            writes,
        })
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }
    pub fn users(&self) -> &Users {
        &self.users
    }
    pub fn calendars(&self) -> &Controller<Calendar> {
        &self.calendars
    }
    pub fn events(&self) -> &Controller<Event> {
        &self.events
    }
    pub fn attendees(&self) -> &Controller<EventAttendee> {
        &self.attendees
    }
    pub fn groups(&self) -> &Controller<Group> {
        &self.groups
    }
    pub fn invites(&self) -> &Controller<GroupInvite> {
        &self.invites
    }
    pub fn members(&self) -> &Controller<GroupMember> {
        &self.members
    }
    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    pub async fn write_lock(&self) -> MutexGuard<'_, ()> {
        self.writes.lock().await
    }

    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }

    /// Creates the group and makes `creator` its first admin.
    pub async fn create_group(&self, fields: Value, creator: &User) -> Result<GroupDetail> {
        let _guard = self.write_lock().await;
        let group = self.groups.insert(fields).await?;
        self.members
            .insert(json!({ "group": group.id, "user": creator.id, "role": MemberRole::Admin }))
            .await?;
        tracing::info!(group = %group.id, user = %creator.id, "group created");
        self.group_detail(group).await
    }

    /// Creates the event and makes `creator` an admin attendee.
    pub async fn create_event(&self, fields: Value, creator: &User) -> Result<Event> {
        let _guard = self.write_lock().await;
        let event = self.events.insert(fields).await?;
        self.attendees
            .insert(json!({ "event": event.id, "user": creator.id, "status": AttendeeStatus::Admin }))
            .await?;
        tracing::info!(event = %event.id, user = %creator.id, "event created");
        Ok(event)
    }

    pub async fn group_detail(&self, group: Group) -> Result<GroupDetail> {
        let by_group = ListQuery::where_eq("group", group.id);

        let mut members = Vec::new();
        for member in self.members.fetch_all(&by_group).await? {
            match self.users.get(member.user)? {
                Some(user) => members.push(MemberSummary {
                    id: user.id,
                    username: user.username,
                    role: member.role,
                    image: user.image,
                }),
                None => tracing::warn!(group = %group.id, user = %member.user, "member has no user"),
            }
        }

        let mut invited_members = Vec::new();
        for invite in self.invites.fetch_all(&by_group).await? {
            if let Some(user) = self.users.get(invite.user)? {
                invited_members.push(user);
            }
        }

        Ok(GroupDetail {
            group,
            members,
            invited_members,
        })
    }
}
