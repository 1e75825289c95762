//! [`Command`] for renewing the current [`Session`].

use std::convert::Infallible;

use common::operations::Perform;
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::Session,
    infra::{
        api::{self, RenewTokens, Tokens},
        Api, Store,
    },
    Service,
};

use super::{Command, LogOut};

/// [`Command`] for renewing the current [`Session`].
///
/// At most one renewal is in flight at any moment: a renewal requested
/// meanwhile fails with [`ExecutionError::AlreadyRenewing`] immediately.
///
/// Consecutive failures are counted, and the [`Session`] is ended once their
/// number reaches the configured maximum.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenewSession;

impl<A, S> Command<RenewSession> for Service<A, S>
where
    A: Api<Perform<RenewTokens>, Ok = Tokens, Err = Traced<api::Error>>,
    S: Store,
    Self: Command<LogOut, Ok = (), Err = Infallible>,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, _: RenewSession) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        // Must be taken before any suspension point.
        let Some(_refreshing) = self.state.begin_refresh() else {
            return Err(tracerr::new!(E::AlreadyRenewing));
        };

        let (session, generation) = self.state.session();
        let session = session
            .filter(|s| s.is_valid(self.clock()))
            .ok_or(E::NotAuthenticated)
            .map_err(tracerr::wrap!())?;

        let duration = self.config().session.duration;
        let result = self
            .api()
            .execute(Perform(RenewTokens {
                access_token: session.access_token,
                refresh_token: session.refresh_token,
                expires_in: duration,
            }))
            .await;

        let tokens = match result {
            Ok(tokens) => tokens,
            Err(e) => {
                let attempts = self
                    .state
                    .fail_renewal(generation)
                    .ok_or(E::SessionChanged)
                    .map_err(tracerr::wrap!())?;
                let max = self.config().session.max_renewal_attempts;
                if attempts >= max {
                    log::warn!(
                        "Session renewal failed {attempts} times in a row, \
                         logging out: {e}",
                    );
                    self.execute(LogOut).await.unwrap_or_else(|e| match e {});
                    return Err(tracerr::new!(E::Exhausted(attempts)));
                }
                log::warn!("Session renewal failed ({attempts}/{max}): {e}");
                return Err(e).map_err(tracerr::map_from_and_wrap!(=> E));
            }
        };

        let expires_at = (self.clock().now() + duration).coerce();
        let renewed = self
            .state
            .renew_session(generation, tokens, expires_at)
            .ok_or(E::SessionChanged)
            .map_err(tracerr::wrap!())?;
        self.commit_session(generation, &renewed).await;

        log::info!(
            "Session of `User(id: {})` renewed until {expires_at}",
            renewed.user.id,
        );
        Ok(renewed)
    }
}

/// Error of [`RenewSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Api`] error.
    #[display("`Api` operation failed: {_0}")]
    Api(api::Error),

    /// Another renewal is in flight already.
    #[display("`Session` is being renewed already")]
    AlreadyRenewing,

    /// There is no valid [`Session`] to renew.
    #[display("No valid `Session` to renew")]
    NotAuthenticated,

    /// [`Session`] has ended or changed while being renewed, so the renewal
    /// result is discarded.
    #[display("`Session` has changed during its renewal")]
    SessionChanged,

    /// Renewal has failed too many times in a row, so the [`Session`] has
    /// been ended.
    #[display("`Session` renewal failed {_0} times in a row")]
    #[from(ignore)]
    Exhausted(#[error(not(source))] u8),
}
