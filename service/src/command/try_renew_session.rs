//! [`Command`] for renewing the current [`Session`] on demand.

use tracerr::Traced;

use crate::{domain::Session, Service};

use super::{renew_session, Command, RenewSession};

/// [`Command`] for renewing the current [`Session`] on demand, unless it's
/// being renewed already or there is no valid [`Session`] at all.
///
/// Returns the renewed [`Session`], or [`None`] if nothing was attempted.
#[derive(Clone, Copy, Debug, Default)]
pub struct TryRenewSession;

impl<A, S> Command<TryRenewSession> for Service<A, S>
where
    Self: Command<
        RenewSession,
        Ok = Session,
        Err = Traced<renew_session::ExecutionError>,
    >,
{
    type Ok = Option<Session>;
    type Err = Traced<renew_session::ExecutionError>;

    async fn execute(
        &self,
        _: TryRenewSession,
    ) -> Result<Self::Ok, Self::Err> {
        use renew_session::ExecutionError as E;

        if self.state.is_refreshing() {
            return Ok(None);
        }
        match self.execute(RenewSession).await {
            Ok(session) => Ok(Some(session)),
            Err(e) => match e.as_ref() {
                E::AlreadyRenewing | E::NotAuthenticated => Ok(None),
                E::Api(_) | E::SessionChanged | E::Exhausted(_) => Err(e),
            },
        }
    }
}
