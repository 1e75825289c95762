//! [`Command`] for beginning a new [`Session`].

use std::convert::Infallible;

use common::operations::{By, Perform, Select, Start};
use derive_more::{Display, Error, From};
use secrecy::SecretBox;
use tokio_util::sync::CancellationToken;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        user::{self, Role},
        Session, User,
    },
    infra::{
        api::{self, Authenticate, Authenticated},
        Api, Store,
    },
    task::{KeepSessionAlive, Task},
    Service,
};

use super::{Command, LogOut};

/// [`Command`] for beginning a new [`Session`] by [`User`] credentials.
///
/// Any existing [`Session`] is ended first. Only [`User`]s of a permitted
/// [`Role`] may log in: for any other [`Role`] nothing is persisted.
#[derive(Clone, Debug)]
pub struct LogIn {
    /// [`user::Username`] to log in with.
    pub username: user::Username,

    /// [`user::Password`] to log in with.
    pub password: SecretBox<user::Password>,
}

impl<A, S> Command<LogIn> for Service<A, S>
where
    A: Api<
            Perform<Authenticate>,
            Ok = Authenticated,
            Err = Traced<api::Error>,
        > + Api<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<api::Error>,
        >,
    S: Store,
    Self: Command<LogOut, Ok = (), Err = Infallible>
        + Task<
            Start<By<KeepSessionAlive<Self>, CancellationToken>>,
            Ok = (),
            Err = Infallible,
        > + Clone
        + 'static,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: LogIn) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let LogIn { username, password } = cmd;
        self.execute(LogOut).await.unwrap_or_else(|e| match e {});

        let duration = self.config().session.duration;
        let res = self
            .api()
            .execute(Perform(Authenticate {
                username: username.clone(),
                password,
                expires_in: duration,
            }))
            .await;
        let Authenticated { user_id, tokens } = match res {
            Err(e) if e.as_ref().is_client_error() => {
                let msg = e
                    .as_ref()
                    .rejection()
                    .unwrap_or("Invalid credentials")
                    .to_owned();
                log::debug!("`{username}` failed to log in: {msg}");
                return Err(tracerr::new!(E::WrongCredentials(msg)));
            }
            res => res.map_err(tracerr::map_from_and_wrap!(=> E))?,
        };

        let user = self
            .api()
            .execute(Select(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ProfileUnavailable(user_id))
            .map_err(tracerr::wrap!())?;
        if !user.role.is_permitted() {
            log::debug!(
                "`User(id: {user_id})` with `{}` role is not permitted to \
                 log in",
                user.role,
            );
            return Err(tracerr::new!(E::RoleNotPermitted(user.role)));
        }

        let session = Session {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: (self.clock().now() + duration).coerce(),
        };
        let generation = self.state.begin_session(session.clone());
        self.commit_session(generation, &session).await;
        self.keep_session_alive(generation);

        log::info!(
            "`User(id: {user_id})` logged in until {}",
            session.expires_at,
        );
        Ok(session)
    }
}

/// Error of [`LogIn`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Api`] error.
    #[display("`Api` operation failed: {_0}")]
    Api(api::Error),

    /// Credentials have been rejected.
    #[display("Wrong credentials: {_0}")]
    #[from(ignore)]
    WrongCredentials(#[error(not(source))] String),

    /// [`User`] has a [`Role`] not permitted to log in.
    #[display("`{_0}` role is not permitted to log in")]
    #[from(ignore)]
    RoleNotPermitted(#[error(not(source))] Role),

    /// Profile of the authenticated [`User`] cannot be found.
    #[display("Profile of `User(id: {_0})` is unavailable")]
    #[from(ignore)]
    ProfileUnavailable(#[error(not(source))] user::Id),
}
