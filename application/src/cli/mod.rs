//! Console front-end running [`Cmd`]s against the [`Service`].
//!
//! [`Service`]: crate::Service

pub mod session;
pub mod user;

use std::{fmt, time::Duration};

use crate::{args::Cmd, Context, Error};

/// Printable output of a [`Cmd`].
#[derive(Clone, Debug)]
pub enum Output {
    /// Plain message.
    Done(&'static str),

    /// [`session::Status`] of the current session.
    Status(session::Status),

    /// Single [`user::Record`].
    User(user::Record),

    /// [`user::Listing`] of users.
    Users(user::Listing),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done(msg) => f.write_str(msg),
            Self::Status(status) => status.fmt(f),
            Self::User(record) => record.fmt(f),
            Self::Users(listing) => listing.fmt(f),
        }
    }
}

impl Cmd {
    /// Runs this [`Cmd`] in the provided [`Context`].
    ///
    /// # Errors
    ///
    /// If the [`Cmd`] fails.
    pub async fn run(self, ctx: &Context) -> Result<Output, Error> {
        Ok(match self {
            Self::Login { username, password } => Output::Status(
                session::log_in(ctx, username, password).await?,
            ),
            Self::Logout => {
                session::log_out(ctx).await;
                Output::Done("Logged out")
            }
            Self::Status => Output::Status(session::status(ctx).await),
            Self::Renew => Output::Status(session::renew(ctx).await?),
            Self::Profile => Output::User(session::profile(ctx).await?),
            Self::Watch => {
                session::watch(ctx).await?;
                Output::Status(session::status(ctx).await)
            }
            Self::Users { refresh } => {
                Output::Users(user::list(ctx, refresh).await?)
            }
            Self::User { id } => Output::User(user::get(ctx, id).await?),
            Self::AddUser {
                first_name,
                last_name,
                username,
                email,
                gender,
                role,
            } => Output::User(
                user::add(
                    ctx,
                    service::command::add_user::Draft {
                        first_name,
                        last_name,
                        username,
                        email,
                        gender,
                        role,
                    },
                )
                .await?,
            ),
            Self::EditUser {
                id,
                first_name,
                last_name,
                username,
                email,
                gender,
                role,
            } => Output::User(
                user::edit(
                    ctx,
                    id,
                    service::domain::user::Changes {
                        first_name,
                        last_name,
                        username,
                        email,
                        gender,
                        avatar_url: None,
                        role,
                    },
                )
                .await?,
            ),
            Self::DeleteUser { id } => {
                Output::Users(user::delete(ctx, id).await?)
            }
        })
    }
}

/// Formats the provided [`Duration`] as minutes and seconds.
fn minutes(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}m {:02}s", secs / 60, secs % 60)
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::minutes;

    #[test]
    fn formats_minutes() {
        assert_eq!(minutes(Duration::from_secs(599)), "9m 59s");
        assert_eq!(minutes(Duration::ZERO), "0m 00s");
    }
}
