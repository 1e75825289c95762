//! Session-related [`Cmd`]s.
//!
//! [`Cmd`]: crate::args::Cmd

use std::{fmt, time::Duration};

use secrecy::SecretBox;
use service::{
    command,
    domain::{user, User},
    query, Command as _,
};
use tokio::time;
use tracing as log;

use crate::{define_error, AsError, Context, Error};

use super::{minutes, user::Record};

/// Interval of polling the session status while watching it.
const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Printable status of the current session.
#[derive(Clone, Debug)]
pub struct Status(pub query::session::Status);

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(status) = self;
        writeln!(f, "phase: {}", status.phase)?;
        if let Some(user) = &status.user {
            writeln!(f, "user: {}", Record(user.clone()))?;
        }
        if let Some(expires_at) = status.expires_at {
            writeln!(
                f,
                "expires at: {expires_at} (in {})",
                minutes(status.remaining),
            )?;
        }
        if status.is_refreshing {
            writeln!(f, "renewal in flight")?;
        }
        write!(f, "failed renewals: {}", status.failed_renewals)
    }
}

/// Logs in with the provided credentials.
pub(crate) async fn log_in(
    ctx: &Context,
    username: user::Username,
    password: user::Password,
) -> Result<Status, Error> {
    drop(
        ctx.service()
            .execute(command::LogIn {
                username,
                password: SecretBox::init_with(move || password),
            })
            .await
            .map_err(AsError::into_error)?,
    );
    Ok(status(ctx).await)
}

/// Logs out.
pub(crate) async fn log_out(ctx: &Context) {
    ctx.service()
        .execute(command::LogOut)
        .await
        .unwrap_or_else(|e| match e {});
}

/// Returns the [`Status`] of the current session.
pub(crate) async fn status(ctx: &Context) -> Status {
    Status(
        ctx.service()
            .execute(query::SessionStatus)
            .await
            .unwrap_or_else(|e| match e {}),
    )
}

/// Renews the current session, unless it's being renewed already.
pub(crate) async fn renew(ctx: &Context) -> Result<Status, Error> {
    drop(ctx.current_user().await?);
    let renewed = ctx
        .service()
        .execute(command::TryRenewSession)
        .await
        .map_err(AsError::into_error)?;
    if renewed.is_none() {
        log::info!("Session is being renewed already");
    }
    Ok(status(ctx).await)
}

/// Reloads the profile of the current session [`User`].
pub(crate) async fn profile(ctx: &Context) -> Result<Record, Error> {
    ctx.service()
        .execute(command::ReloadProfile)
        .await
        .map(Record)
        .map_err(AsError::into_error)
}

/// Waits until the current session ends or the process is interrupted,
/// while the session is being kept alive in background.
pub(crate) async fn watch(ctx: &Context) -> Result<(), Error> {
    let User { id, .. } = ctx.current_user().await?;
    log::info!("Keeping session of `User(id: {id})` alive");

    let ended = async {
        loop {
            time::sleep(WATCH_POLL_INTERVAL).await;
            if !status(ctx).await.0.is_authenticated {
                break;
            }
        }
    };
    tokio::select! {
        () = ended => log::info!("Session of `User(id: {id})` has ended"),
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                log::error!("Failed to listen for interruption: {e}");
            }
        }
    }
    Ok(())
}

impl AsError for command::log_in::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ROLE_NOT_PERMITTED"]
                #[message = "Your role is not permitted to use the dashboard"]
                RoleNotPermitted,
            }
        }

        match self {
            Self::Api(e) => e.try_as_error(),
            Self::WrongCredentials(msg) => Some(crate::Error {
                code: "WRONG_CREDENTIALS",
                message: msg.clone(),
                backtrace: None,
            }),
            Self::RoleNotPermitted(_) => Some(Error::RoleNotPermitted.into()),
            Self::ProfileUnavailable(_) => None,
        }
    }
}

impl AsError for command::renew_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "ALREADY_RENEWING"]
                #[message = "Session is being renewed already"]
                AlreadyRenewing,

                #[code = "AUTHORIZATION_REQUIRED"]
                #[message = "Authorization required, log in first"]
                NotAuthenticated,

                #[code = "SESSION_CHANGED"]
                #[message = "Session has changed meanwhile"]
                SessionChanged,

                #[code = "SESSION_ENDED"]
                #[message = "Session renewal failed repeatedly, logged out"]
                Exhausted,
            }
        }

        Some(match self {
            Self::Api(e) => return e.try_as_error(),
            Self::AlreadyRenewing => Error::AlreadyRenewing.into(),
            Self::NotAuthenticated => Error::NotAuthenticated.into(),
            Self::SessionChanged => Error::SessionChanged.into(),
            Self::Exhausted(_) => Error::Exhausted.into(),
        })
    }
}

impl AsError for command::reload_profile::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "AUTHORIZATION_REQUIRED"]
                #[message = "Authorization required, log in first"]
                NotAuthenticated,

                #[code = "SESSION_CHANGED"]
                #[message = "Session has changed meanwhile"]
                SessionChanged,
            }
        }

        Some(match self {
            Self::Api(e) => return e.try_as_error(),
            Self::NotAuthenticated => Error::NotAuthenticated.into(),
            Self::SessionChanged => Error::SessionChanged.into(),
        })
    }
}

#[cfg(test)]
mod spec {
    use service::command::log_in::ExecutionError;

    use crate::AsError as _;

    #[test]
    fn wrong_credentials_keep_remote_message() {
        let err = ExecutionError::WrongCredentials(
            "Invalid credentials".to_owned(),
        )
        .as_error();

        assert_eq!(err.code, "WRONG_CREDENTIALS");
        assert_eq!(err.message, "Invalid credentials");
    }

    #[test]
    fn role_rejection_is_distinguished() {
        let err = ExecutionError::RoleNotPermitted(
            service::domain::Role::Other("guest".to_owned()),
        )
        .as_error();

        assert_eq!(err.code, "ROLE_NOT_PERMITTED");
    }
}
