use perfectweek_common::{AttendeeStatus, MemberRole, UserId};

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum Role {
    Pending,
    Member,
    Admin,
    /// The caller is the user the row itself belongs to.
    Owner,
}

impl Role {
    fn rank(self) -> u8 {
        match self {
            Role::Pending => 0,
            Role::Member => 1,
            Role::Admin => 2,
            Role::Owner => 3,
        }
    }
}

impl From<MemberRole> for Role {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Admin => Role::Admin,
            MemberRole::Member => Role::Member,
        }
    }
}

impl From<AttendeeStatus> for Role {
    fn from(status: AttendeeStatus) -> Self {
        match status {
            AttendeeStatus::Admin => Role::Admin,
            AttendeeStatus::Attendee => Role::Member,
            AttendeeStatus::Pending => Role::Pending,
        }
    }
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub struct Membership {
    pub user: UserId,
    pub role: Role,
}

impl Membership {
    pub fn new(user: UserId, role: impl Into<Role>) -> Self {
        Self {
            user,
            role: role.into(),
        }
    }
}

/// The caller's role in a membership collection, or `None` when absent.
/// A user listed more than once, such as an invite someone sent to
/// themselves, gets the strongest of their roles.
pub fn role_of(members: &[Membership], user: UserId) -> Option<Role> {
    members
        .iter()
        .filter(|member| member.user == user)
        .map(|member| member.role)
        .max_by_key(|role| role.rank())
}
