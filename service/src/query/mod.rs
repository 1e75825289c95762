//! [`Query`] definition.

pub mod session;
pub mod user;
pub mod users;

#[cfg(doc)]
use crate::Service;

pub use self::{session::SessionStatus, user::UserById, users::FetchUsers};

/// [`Query`] of the [`Service`].
pub use common::Handler as Query;
