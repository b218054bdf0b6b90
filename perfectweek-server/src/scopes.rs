//! Who may see and change each record type.

use std::sync::Arc;

use async_trait::async_trait;
use perfectweek_common::{
    Calendar, Event, EventAttendee, Group, GroupInvite, GroupMember, UserId,
    UserRelationship,
};
use serde_json::json;

use crate::access::Scope;
use crate::error::Result;
use crate::gateway::{Gateway, Stored};
use crate::membership::{Membership, Role};
use crate::query::ListQuery;

/// Groups are visible to their members and changed by admins. Deleting a
/// group drops its members and invites and detaches its events.
pub struct GroupScope {
    pub members: Arc<dyn Gateway<GroupMember>>,
    pub invites: Arc<dyn Gateway<GroupInvite>>,
    pub events: Arc<dyn Gateway<Event>>,
}

#[async_trait]
impl Scope<Group> for GroupScope {
    async fn members(&self, group: &Group) -> Result<Vec<Membership>> {
        let rows = self
            .members
            .fetch_many(&ListQuery::where_eq("group", group.id))
            .await?;
        Ok(rows
            .into_iter()
            .map(|member| Membership::new(member.user, member.role))
            .collect())
    }

    fn may_mutate(&self, role: Role) -> bool {
        role == Role::Admin
    }

    async fn cascade(&self, group: &Group) -> Result<()> {
        let by_group = ListQuery::where_eq("group", group.id);
        for member in self.members.fetch_many(&by_group).await? {
            self.members.destroy(member.id).await?;
        }
        for invite in self.invites.fetch_many(&by_group).await? {
            self.invites.destroy(invite.id).await?;
        }
        for event in self.events.fetch_many(&by_group).await? {
            self.events.save(Some(event.id), json!({ "group": null })).await?;
        }
        tracing::info!(group = %group.id, "cleared group associations");
        Ok(())
    }
}

/// Events are visible to attendees and changed by attendees with `admin` status.
pub struct EventScope {
    pub attendees: Arc<dyn Gateway<EventAttendee>>,
}

#[async_trait]
impl Scope<Event> for EventScope {
    async fn members(&self, event: &Event) -> Result<Vec<Membership>> {
        let rows = self
            .attendees
            .fetch_many(&ListQuery::where_eq("event", event.id))
            .await?;
        Ok(rows
            .into_iter()
            .map(|attendee| Membership::new(attendee.user, attendee.status))
            .collect())
    }

    fn may_mutate(&self, role: Role) -> bool {
        role == Role::Admin
    }

    async fn cascade(&self, event: &Event) -> Result<()> {
        for attendee in self
            .attendees
            .fetch_many(&ListQuery::where_eq("event", event.id))
            .await?
        {
            self.attendees.destroy(attendee.id).await?;
        }
        tracing::info!(event = %event.id, "cleared event attendees");
        Ok(())
    }
}

/// Calendars are served through the unscoped routes; when scoped, only the
/// owner sees them. Deleting one detaches its events.
pub struct CalendarScope {
    pub events: Arc<dyn Gateway<Event>>,
}

#[async_trait]
impl Scope<Calendar> for CalendarScope {
    async fn members(&self, calendar: &Calendar) -> Result<Vec<Membership>> {
        Ok(calendar
            .owner
            .map(|owner| Membership {
                user: owner,
                role: Role::Owner,
            })
            .into_iter()
            .collect())
    }

    fn may_mutate(&self, role: Role) -> bool {
        role == Role::Owner
    }

    async fn cascade(&self, calendar: &Calendar) -> Result<()> {
        for event in self
            .events
            .fetch_many(&ListQuery::where_eq("calendar", calendar.id))
            .await?
        {
            self.events
                .save(Some(event.id), json!({ "calendar": null }))
                .await?;
        }
        Ok(())
    }
}

/// Rows that belong to specific users.
pub trait Owned {
    fn owners(&self) -> Vec<UserId>;
}

impl Owned for GroupMember {
    fn owners(&self) -> Vec<UserId> {
        vec![self.user]
    }
}

impl Owned for EventAttendee {
    fn owners(&self) -> Vec<UserId> {
        vec![self.user]
    }
}

impl Owned for GroupInvite {
    fn owners(&self) -> Vec<UserId> {
        vec![self.user, self.from]
    }
}

impl Owned for UserRelationship {
    fn owners(&self) -> Vec<UserId> {
        vec![self.from, self.with]
    }
}

/// Visible to and changed only by the row's owners.
pub struct OwnedScope;

#[async_trait]
impl<R> Scope<R> for OwnedScope
where
    R: Stored + Owned,
{
    async fn members(&self, record: &R) -> Result<Vec<Membership>> {
        Ok(record
            .owners()
            .into_iter()
            .map(|user| Membership {
                user,
                role: Role::Owner,
            })
            .collect())
    }

    fn may_mutate(&self, role: Role) -> bool {
        role == Role::Owner
    }
}
