//! [`Command`] for reloading the profile of the current [`Session`] [`User`].

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::Session;
use crate::{
    domain::{user::session::AccessToken, User},
    infra::{api, Api, Store},
    Service,
};

use super::Command;

/// [`Command`] for reloading the profile of the current [`Session`] [`User`]
/// from the remote [`Api`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ReloadProfile;

impl<A, S> Command<ReloadProfile> for Service<A, S>
where
    A: Api<Select<By<User, AccessToken>>, Ok = User, Err = Traced<api::Error>>,
    S: Store,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, _: ReloadProfile) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let (session, generation) = self.state.session();
        let session = session
            .filter(|s| s.is_valid(self.clock()))
            .ok_or(E::NotAuthenticated)
            .map_err(tracerr::wrap!())?;

        let user = self
            .api()
            .execute(Select(By::new(session.access_token)))
            .await
            .map_err(|e| {
                log::warn!("Failed to reload profile: {e}");
                e
            })
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let updated = self
            .state
            .update_profile(generation, user.clone())
            .ok_or(E::SessionChanged)
            .map_err(tracerr::wrap!())?;
        self.commit_session(generation, &updated).await;

        log::debug!("Profile of `User(id: {})` reloaded", user.id);
        Ok(user)
    }
}

/// Error of [`ReloadProfile`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Api`] error.
    #[display("`Api` operation failed: {_0}")]
    Api(api::Error),

    /// There is no valid [`Session`].
    #[display("No valid `Session`")]
    NotAuthenticated,

    /// [`Session`] has ended or changed while its profile was being
    /// reloaded.
    #[display("`Session` has changed during profile reloading")]
    SessionChanged,
}
