//! [`Command`] for restoring a persisted [`Session`].

use std::convert::Infallible;

use common::operations::{By, Select, Start};
use tokio_util::sync::CancellationToken;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{user::session::AccessToken, Session, User},
    infra::{api, Api, Store},
    task::{KeepSessionAlive, Task},
    Service,
};

use super::Command;

/// [`Command`] for restoring a [`Session`] persisted by a previous run.
///
/// Expired or incomplete [`Session`]s are forgotten. A restored [`Session`]
/// is validated against the remote [`Api`], refreshing its [`User`] profile:
/// - a rejected [`Session`] is forgotten;
/// - a [`User`] whose role is no longer permitted is logged out;
/// - an unreachable [`Api`] keeps the [`Session`] as is.
///
/// Returns the current [`Session`], if any.
#[derive(Clone, Copy, Debug, Default)]
pub struct RestoreSession;

impl<A, S> Command<RestoreSession> for Service<A, S>
where
    A: Api<Select<By<User, AccessToken>>, Ok = User, Err = Traced<api::Error>>,
    S: Store,
    Self: Task<
            Start<By<KeepSessionAlive<Self>, CancellationToken>>,
            Ok = (),
            Err = Infallible,
        > + Clone
        + 'static,
{
    type Ok = Option<Session>;
    type Err = Infallible;

    async fn execute(&self, _: RestoreSession) -> Result<Self::Ok, Self::Err> {
        let (current, generation) = self.state.session();
        if current.is_some() {
            return Ok(current);
        }

        let loaded = self.load_session().await;
        if self.state.generation() != generation {
            return Ok(self.state.session().0);
        }
        let Some(mut session) = loaded else {
            self.discard_session(generation).await;
            return Ok(None);
        };
        if !session.is_valid(self.clock()) {
            log::debug!("Persisted `Session` has expired");
            self.discard_session(generation).await;
            return Ok(None);
        }

        let profile = self
            .api()
            .execute(Select(By::new(session.access_token.clone())))
            .await;
        // Someone has logged in or out meanwhile.
        if self.state.generation() != generation {
            return Ok(self.state.session().0);
        }
        match profile {
            Ok(user) if !user.role.is_permitted() => {
                log::info!(
                    "`User(id: {})` with `{}` role is not permitted anymore",
                    user.id,
                    user.role,
                );
                self.discard_session(generation).await;
                return Ok(None);
            }
            Ok(user) => session.user = user,
            Err(e) if e.as_ref().is_unauthorized() => {
                log::info!("Persisted `Session` has been rejected: {e}");
                self.discard_session(generation).await;
                return Ok(None);
            }
            Err(e) => {
                log::warn!("Failed to validate persisted `Session`: {e}");
            }
        }

        let generation = self.state.begin_session(session.clone());
        self.commit_session(generation, &session).await;
        self.keep_session_alive(generation);

        log::info!(
            "Session of `User(id: {})` restored until {}",
            session.user.id,
            session.expires_at,
        );
        Ok(Some(session))
    }
}
