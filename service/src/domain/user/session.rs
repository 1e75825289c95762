//! [`Session`] definitions.

use std::time::Duration;

use common::{unit, Clock, DateTimeOf};
#[cfg(doc)]
use common::DateTime;
use derive_more::{AsRef, Display};
use serde::{Deserialize, Serialize};

use crate::domain::User;

/// Authenticated session of a [`User`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Session {
    /// [`User`] this [`Session`] belongs to.
    pub user: User,

    /// [`AccessToken`] authorizing requests of this [`Session`].
    pub access_token: AccessToken,

    /// [`RefreshToken`] renewing this [`Session`], if issued.
    pub refresh_token: Option<RefreshToken>,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: ExpirationDateTime,
}

impl Session {
    /// Returns the [`Duration`] left until this [`Session`] expires.
    #[must_use]
    pub fn remaining(&self, clock: &Clock) -> Duration {
        clock.until(self.expires_at)
    }

    /// Indicates whether this [`Session`] is still valid.
    #[must_use]
    pub fn is_valid(&self, clock: &Clock) -> bool {
        !self.remaining(clock).is_zero()
    }

    /// Returns the [`Phase`] of this [`Session`] considering the provided
    /// `warning` threshold.
    #[must_use]
    pub fn phase(&self, clock: &Clock, warning: Duration) -> Phase {
        let remaining = self.remaining(clock);
        if remaining.is_zero() {
            Phase::Expired
        } else if remaining <= warning {
            Phase::Expiring
        } else {
            Phase::Authenticated
        }
    }
}

/// Phase in the lifecycle of a [`Session`].
///
/// ```text
/// Anonymous → Authenticated → Expiring → (renewed) Authenticated
///                                      → Expired → Anonymous
/// ```
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Phase {
    /// No [`Session`] exists.
    #[display("anonymous")]
    Anonymous,

    /// [`Session`] is valid and far from its expiration.
    #[display("authenticated")]
    Authenticated,

    /// [`Session`] is valid, but expires soon and should be renewed.
    #[display("expiring")]
    Expiring,

    /// [`Session`] has expired and is going to be ended.
    #[display("expired")]
    Expired,
}

/// Opaque token authorizing requests of a [`Session`].
#[derive(AsRef, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[as_ref(str)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps the provided opaque `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

/// Opaque token renewing a [`Session`].
#[derive(AsRef, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[as_ref(str)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    /// Wraps the provided opaque `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;
