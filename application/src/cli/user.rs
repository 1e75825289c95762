//! User-related [`Cmd`]s.
//!
//! [`Cmd`]: crate::args::Cmd

use std::fmt;

use service::{
    command::{self, add_user::Draft},
    domain::{
        roster::View,
        user::{self, Action},
        User,
    },
    query, Command as _,
};

use crate::{define_error, AsError, Context, Error};

/// Printable [`User`] record.
#[derive(Clone, Debug)]
pub struct Record(pub User);

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(u) = self;
        write!(
            f,
            "#{} {} @{} <{}> {} {}",
            u.id,
            u.full_name(),
            u.username,
            u.email,
            u.role,
            u.gender,
        )
    }
}

/// Printable [`View`] of users.
#[derive(Clone, Debug)]
pub struct Listing(pub View);

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(view) = self;
        let stats = &view.statistics;
        write!(
            f,
            "{} users from {} (admins: {}, users: {}, moderators: {}, \
             others: {})",
            stats.total,
            view.source,
            stats.admins,
            stats.users,
            stats.moderators,
            stats.others,
        )?;
        for u in &view.records {
            write!(f, "\n  {}", Record(u.clone()))?;
        }
        Ok(())
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_FOUND"]
        #[message = "`User` with the provided ID doesn't exist"]
        NotFound,

        #[code = "NOTHING_TO_CHANGE"]
        #[message = "No changes provided"]
        NothingToChange,

        #[code = "INVALID_ROLE"]
        #[message = "`User` can only be `admin`, `user` or `moderator`"]
        InvalidRole,
    }
}

/// Lists the users visible to the current session [`User`].
pub(crate) async fn list(
    ctx: &Context,
    refresh: bool,
) -> Result<Listing, Error> {
    let caller = ctx.current_user().await?.role;
    let view = if refresh {
        ctx.service().execute(command::RefreshUsers { caller }).await
    } else {
        ctx.service()
            .execute(query::FetchUsers {
                caller,
                refresh: false,
            })
            .await
    };
    Ok(Listing(view.unwrap_or_else(|e| match e {})))
}

/// Returns the [`User`] with the provided ID, if the current session
/// [`User`] is allowed to see it.
pub(crate) async fn get(ctx: &Context, id: user::Id) -> Result<Record, Error> {
    let caller = ctx.current_user().await?.role;
    ctx.service()
        .execute(query::UserById(id))
        .await
        .map_err(AsError::into_error)?
        .filter(|u| caller.can(Action::View(&u.role)))
        .map(Record)
        .ok_or_else(|| UserError::NotFound.into())
}

/// Adds a new [`User`].
pub(crate) async fn add(ctx: &Context, draft: Draft) -> Result<Record, Error> {
    let caller = ctx.authorize(Action::AddUser).await?.role;
    ctx.service()
        .execute(command::AddUser { draft, caller })
        .await
        .map(|out| Record(out.user))
        .map_err(AsError::into_error)
}

/// Edits an existing [`User`].
pub(crate) async fn edit(
    ctx: &Context,
    id: user::Id,
    changes: user::Changes,
) -> Result<Record, Error> {
    let caller = ctx.authorize(Action::EditUser).await?.role;
    if changes.is_empty() {
        return Err(UserError::NothingToChange.into());
    }
    ctx.service()
        .execute(command::EditUser {
            id,
            changes,
            caller,
        })
        .await
        .map(|out| Record(out.user))
        .map_err(AsError::into_error)
}

/// Deletes an existing [`User`].
pub(crate) async fn delete(
    ctx: &Context,
    id: user::Id,
) -> Result<Listing, Error> {
    let caller = ctx.authorize(Action::DeleteUser).await?.role;
    ctx.service()
        .execute(command::DeleteUser { id, caller })
        .await
        .map(Listing)
        .map_err(AsError::into_error)
}

impl AsError for command::add_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Api(e) => e.try_as_error(),
            Self::InvalidRole(_) => Some(UserError::InvalidRole.into()),
        }
    }
}

impl AsError for command::edit_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Api(e) => e.try_as_error(),
            Self::InvalidRole(_) => Some(UserError::InvalidRole.into()),
            Self::NotFound(_) => Some(UserError::NotFound.into()),
        }
    }
}

impl AsError for command::delete_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Api(e) => e.try_as_error(),
            Self::NotFound(_) => Some(UserError::NotFound.into()),
        }
    }
}

#[cfg(test)]
mod spec {
    use service::domain::{
        roster::{Source, View},
        user::{AvatarUrl, Email, Gender, Id, Name, Username},
        Role, User,
    };

    use super::Listing;

    fn user(id: u64, role: Role) -> User {
        let username = Username::new(format!("user{id}")).unwrap();
        User {
            id: Id::from(id),
            first_name: Name::new("Jane").unwrap(),
            last_name: Name::new("Doe").unwrap(),
            email: Email::new(format!("user{id}@example.com")).unwrap(),
            gender: Gender::Female,
            avatar_url: AvatarUrl::derive_from(&username),
            username,
            role,
        }
    }

    #[test]
    fn lists_statistics_and_records() {
        let view = View::new(
            vec![user(1, Role::Admin), user(2, Role::User)],
            Source::Cache,
        );

        assert_eq!(
            Listing(view).to_string(),
            "2 users from cache (admins: 1, users: 1, moderators: 0, \
             others: 0)\n  \
             #1 Jane Doe @user1 <user1@example.com> admin female\n  \
             #2 Jane Doe @user2 <user2@example.com> user female",
        );
    }
}
