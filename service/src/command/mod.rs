//! [`Command`] definition.

pub mod add_user;
pub mod delete_user;
pub mod edit_user;
pub mod log_in;
pub mod log_out;
pub mod refresh_users;
pub mod reload_profile;
pub mod renew_session;
pub mod restore_session;
pub mod try_renew_session;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    add_user::AddUser, delete_user::DeleteUser, edit_user::EditUser,
    log_in::LogIn, log_out::LogOut, refresh_users::RefreshUsers,
    reload_profile::ReloadProfile, renew_session::RenewSession,
    restore_session::RestoreSession, try_renew_session::TryRenewSession,
};

use std::convert::Infallible;

use crate::{
    domain::{roster::View, Role, Roster},
    query::{FetchUsers, Query},
    Service,
};

impl<A, S> Service<A, S> {
    /// Creates an empty [`Roster`] fetched at the current moment.
    fn empty_roster(&self) -> Roster {
        Roster {
            records: Vec::new(),
            fetched_at: self.clock().now().coerce(),
        }
    }
}

impl<A, S> Service<A, S>
where
    Self: Query<FetchUsers, Ok = View, Err = Infallible>,
{
    /// Makes sure the cached [`Roster`] is fetched, unless the remote source
    /// is unavailable.
    async fn ensure_roster(&self, caller: &Role) {
        drop(
            self.execute(FetchUsers {
                caller: caller.clone(),
                refresh: false,
            })
            .await
            .unwrap_or_else(|e| match e {}),
        );
    }
}
