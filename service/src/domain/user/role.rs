//! [`Role`] definitions and access rules.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[cfg(doc)]
use crate::domain::User;

/// Access role of a [`User`].
///
/// Roles unknown to the dashboard are preserved as [`Role::Other`], so they
/// can be counted and reported, but are never permitted to log in.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Administrator, seeing and managing every [`User`].
    Admin,

    /// Regular [`User`].
    User,

    /// Moderator.
    Moderator,

    /// Any other role, not permitted to use the dashboard.
    Other(String),
}

impl Role {
    /// Returns the textual representation of this [`Role`].
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Other(role) => role,
        }
    }

    /// Indicates whether this [`Role`] is permitted to use the dashboard at
    /// all.
    #[must_use]
    pub const fn is_permitted(&self) -> bool {
        matches!(self, Self::Admin | Self::User | Self::Moderator)
    }

    /// Checks whether this [`Role`] is allowed to perform the provided
    /// [`Action`].
    ///
    /// See [`can()`] for the rules.
    #[must_use]
    pub fn can(&self, action: Action<'_>) -> bool {
        can(self, action)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Role {
    fn from(role: String) -> Self {
        match role.as_str() {
            "admin" => Self::Admin,
            "user" => Self::User,
            "moderator" => Self::Moderator,
            _ => Self::Other(role),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(role) => role,
            Role::Admin | Role::User | Role::Moderator => {
                role.as_str().to_owned()
            }
        }
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.to_owned().into())
    }
}

/// Action a caller may be allowed to perform.
#[derive(Clone, Copy, Debug)]
pub enum Action<'r> {
    /// Seeing a [`User`] record having the provided [`Role`].
    View(&'r Role),

    /// Adding a new [`User`] record.
    AddUser,

    /// Editing an existing [`User`] record.
    EditUser,

    /// Deleting an existing [`User`] record.
    DeleteUser,

    /// Entering the administration area.
    AccessAdminArea,
}

/// Checks whether the `caller` [`Role`] is allowed to perform the provided
/// [`Action`].
///
/// Rules:
/// - a not permitted [`Role`] is allowed nothing;
/// - [`Role::Admin`] is allowed everything;
/// - any other [`Role`] sees only [`Role::User`] records (not even other
///   moderators), may add records, but may neither edit nor delete them, nor
///   enter the administration area.
#[must_use]
pub fn can(caller: &Role, action: Action<'_>) -> bool {
    match caller {
        Role::Admin => true,
        Role::User | Role::Moderator => match action {
            Action::View(target) => *target == Role::User,
            Action::AddUser => true,
            Action::EditUser | Action::DeleteUser | Action::AccessAdminArea => {
                false
            }
        },
        Role::Other(_) => false,
    }
}

#[cfg(test)]
mod spec {
    use super::{can, Action, Role};

    #[test]
    fn parses_known_and_unknown_roles() {
        assert_eq!(Role::from("admin".to_owned()), Role::Admin);
        assert_eq!(Role::from("moderator".to_owned()), Role::Moderator);
        assert_eq!(
            Role::from("guest".to_owned()),
            Role::Other("guest".to_owned()),
        );
        assert!(!Role::Other("guest".to_owned()).is_permitted());
    }

    #[test]
    fn round_trips_through_json() {
        for role in [
            Role::Admin,
            Role::User,
            Role::Moderator,
            Role::Other("guest".to_owned()),
        ] {
            let json = serde_json::to_string(&role).unwrap();

            assert_eq!(json, format!("\"{role}\""));
            assert_eq!(serde_json::from_str::<Role>(&json).unwrap(), role);
        }
    }

    #[test]
    fn admin_can_everything() {
        for action in [
            Action::View(&Role::Admin),
            Action::View(&Role::Moderator),
            Action::AddUser,
            Action::EditUser,
            Action::DeleteUser,
            Action::AccessAdminArea,
        ] {
            assert!(can(&Role::Admin, action), "{action:?}");
        }
    }

    #[test]
    fn non_admins_see_only_regular_users() {
        for caller in [Role::User, Role::Moderator] {
            assert!(caller.can(Action::View(&Role::User)));
            assert!(!caller.can(Action::View(&Role::Moderator)));
            assert!(!caller.can(Action::View(&Role::Admin)));
            assert!(caller.can(Action::AddUser));
            assert!(!caller.can(Action::EditUser));
            assert!(!caller.can(Action::DeleteUser));
            assert!(!caller.can(Action::AccessAdminArea));
        }
    }

    #[test]
    fn unknown_roles_can_nothing() {
        let guest = Role::Other("guest".to_owned());

        assert!(!guest.can(Action::View(&Role::User)));
        assert!(!guest.can(Action::AddUser));
    }
}
