//! [`Command`] for ending the current [`Session`].

use std::convert::Infallible;

use tracing as log;

#[cfg(doc)]
use crate::domain::{Roster, Session};
use crate::{infra::Store, Service};

use super::Command;

/// [`Command`] for ending the current [`Session`].
///
/// Stops its renewal and forgets the persisted [`Session`]. The cached
/// [`Roster`] is kept. Does nothing if there is no [`Session`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LogOut;

impl<A, S: Store> Command<LogOut> for Service<A, S> {
    type Ok = ();
    type Err = Infallible;

    async fn execute(&self, _: LogOut) -> Result<Self::Ok, Self::Err> {
        if let Some(ended) = self.state.end_session() {
            log::info!("`User(id: {})` logged out", ended.user.id);
        }
        self.forget_session().await;
        Ok(())
    }
}
