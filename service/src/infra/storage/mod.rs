//! Local key/value [`Storage`] definitions.

#[cfg(feature = "fs")]
pub mod file;
pub mod memory;

use std::{fmt, io};

use common::operations::{By, Delete, Insert, Select};
use derive_more::{Display, Error as StdError, From};
use tracerr::Traced;

#[cfg(feature = "fs")]
pub use self::file::File;
pub use self::memory::Memory;

/// Local storage operation.
pub use common::Handler as Storage;

/// Key of a value in a [`Storage`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Key {
    /// Access token of the current session.
    Token,

    /// Refresh token of the current session.
    RefreshToken,

    /// Profile of the current session user.
    User,

    /// Expiration moment of the current session.
    SessionExpiresAt,

    /// Cached roster of users.
    Users,

    /// Moment the cached roster of users was fetched at.
    UsersFetchedAt,
}

impl Key {
    /// [`Key`]s holding the current session.
    pub const SESSION: [Self; 4] = [
        Self::Token,
        Self::RefreshToken,
        Self::User,
        Self::SessionExpiresAt,
    ];

    /// Returns the textual name of this [`Key`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::RefreshToken => "refreshToken",
            Self::User => "user",
            Self::SessionExpiresAt => "sessionExpiresAt",
            Self::Users => "users",
            Self::UsersFetchedAt => "usersFetchedAt",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value stored under a [`Key`].
#[derive(Clone, Debug)]
pub struct Entry {
    /// [`Key`] to store the `value` under.
    pub key: Key,

    /// JSON document to store.
    pub value: String,
}

/// [`Storage`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// I/O operation failed.
    #[display("I/O operation failed: {_0}")]
    Io(io::Error),
}

/// [`Storage`] supporting every operation over [`Key`]s.
pub trait Store:
    Storage<
        Select<By<Option<String>, Key>>,
        Ok = Option<String>,
        Err = Traced<Error>,
    > + Storage<Insert<Entry>, Ok = (), Err = Traced<Error>>
    + Storage<Delete<Key>, Ok = (), Err = Traced<Error>>
{
}

impl<T> Store for T where
    T: Storage<
            Select<By<Option<String>, Key>>,
            Ok = Option<String>,
            Err = Traced<Error>,
        > + Storage<Insert<Entry>, Ok = (), Err = Traced<Error>>
        + Storage<Delete<Key>, Ok = (), Err = Traced<Error>>
{
}
