//! Remote [`Api`] definitions.

#[cfg(feature = "dummyjson")]
pub mod dummy_json;
#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

use derive_more::{Display, Error as StdError, From};
use secrecy::SecretBox;

use crate::domain::{
    user::{
        self,
        session::{AccessToken, RefreshToken},
    },
    User,
};

#[cfg(feature = "dummyjson")]
pub use self::dummy_json::DummyJson;

/// Remote API operation.
pub use common::Handler as Api;

/// Authentication of a [`User`] by credentials.
#[derive(Debug)]
pub struct Authenticate {
    /// [`user::Username`] to authenticate.
    pub username: user::Username,

    /// [`user::Password`] to authenticate with.
    pub password: SecretBox<user::Password>,

    /// Requested lifetime of the issued [`AccessToken`].
    pub expires_in: Duration,
}

/// Result of a successful [`Authenticate`] operation.
#[derive(Clone, Debug)]
pub struct Authenticated {
    /// ID of the authenticated [`User`].
    pub user_id: user::Id,

    /// Issued [`Tokens`].
    pub tokens: Tokens,
}

/// Renewal of the [`Tokens`] of a session.
#[derive(Clone, Debug)]
pub struct RenewTokens {
    /// Current [`AccessToken`].
    pub access_token: AccessToken,

    /// Current [`RefreshToken`], if any was issued.
    pub refresh_token: Option<RefreshToken>,

    /// Requested lifetime of the renewed [`AccessToken`].
    pub expires_in: Duration,
}

/// Tokens issued by the remote [`Api`].
#[derive(Clone, Debug)]
pub struct Tokens {
    /// Issued [`AccessToken`].
    pub access_token: AccessToken,

    /// Issued [`RefreshToken`], if any.
    pub refresh_token: Option<RefreshToken>,
}

/// Request of a single [`Page`] of [`User`]s.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageRequest {
    /// Maximum number of [`User`]s in the [`Page`].
    pub limit: usize,

    /// Number of [`User`]s to skip.
    pub skip: usize,
}

/// Single page of [`User`]s.
#[derive(Clone, Debug)]
pub struct Page {
    /// [`User`]s of this [`Page`].
    pub records: Vec<User>,

    /// Total number of [`User`]s known to the remote [`Api`].
    pub total: usize,
}

/// [`Api`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// HTTP transport failed (connection, timeout or malformed body).
    #[cfg(feature = "dummyjson")]
    #[display("HTTP request failed: {_0}")]
    Transport(reqwest::Error),

    /// Remote [`Api`] rejected the request.
    #[display("Request rejected with `{status}` status: {message}")]
    #[from(ignore)]
    Rejected {
        /// HTTP status code of the rejection.
        status: u16,

        /// Message explaining the rejection.
        message: String,
    },
}

impl Error {
    /// Indicates whether this [`Error`] means that the provided tokens are
    /// not accepted anymore.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status: 401 | 403, .. })
    }

    /// Indicates whether the remote [`Api`] rejected the request itself
    /// (`4xx` status), rather than failed to process it.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Rejected { status: 400..=499, .. })
    }

    /// Returns the message the remote [`Api`] explained the rejection with,
    /// if any.
    #[must_use]
    pub fn rejection(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => Some(message),
            #[cfg(feature = "dummyjson")]
            Self::Transport(_) => None,
        }
    }
}
