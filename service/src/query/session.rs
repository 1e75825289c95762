//! [`Query`] of the current [`Session`] status.

use std::{convert::Infallible, time::Duration};

use crate::{
    domain::{
        user::session::{self, Phase},
        Session, User,
    },
    Service,
};

use super::Query;

/// [`Query`] of the current [`Session`] [`Status`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionStatus;

/// Snapshot of the current [`Session`] status.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Status {
    /// [`User`] of the current [`Session`], if any.
    pub user: Option<User>,

    /// [`Phase`] of the current [`Session`].
    pub phase: Phase,

    /// Expiration of the current [`Session`], if any.
    pub expires_at: Option<session::ExpirationDateTime>,

    /// Time left until the current [`Session`] expires.
    pub remaining: Duration,

    /// Indicator whether there is a valid [`Session`].
    pub is_authenticated: bool,

    /// Indicator whether the current [`Session`] expires soon.
    pub is_expiring: bool,

    /// Indicator whether a renewal is in flight.
    pub is_refreshing: bool,

    /// Number of consecutive failed renewals.
    pub failed_renewals: u8,
}

impl<A, S> Query<SessionStatus> for Service<A, S> {
    type Ok = Status;
    type Err = Infallible;

    async fn execute(&self, _: SessionStatus) -> Result<Self::Ok, Self::Err> {
        let (session, _) = self.state.session();
        let warning = self.config().session.warning_threshold;
        let phase = session
            .as_ref()
            .map_or(Phase::Anonymous, |s| s.phase(self.clock(), warning));

        Ok(Status {
            remaining: session
                .as_ref()
                .map_or(Duration::ZERO, |s| s.remaining(self.clock())),
            expires_at: session.as_ref().map(|s| s.expires_at),
            user: session.map(|s| s.user),
            is_authenticated: matches!(
                phase,
                Phase::Authenticated | Phase::Expiring,
            ),
            is_expiring: phase == Phase::Expiring,
            is_refreshing: self.state.is_refreshing(),
            failed_renewals: self.state.failed_renewals(),
            phase,
        })
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{Clock, DateTime};

    use crate::{
        domain::{
            roster::spec::user,
            user::{
                session::{AccessToken, Phase},
                Role,
            },
            Session,
        },
        infra::{api::mock::Mock, Memory},
        Config, Query as _, Service,
    };

    use super::SessionStatus;

    fn service() -> Service<Mock, Memory> {
        Service::new(
            Config::default(),
            Mock::default(),
            Memory::default(),
            Clock::System,
        )
    }

    fn session(expires_at: DateTime) -> Session {
        Session {
            user: user(1, Role::User),
            access_token: AccessToken::new("access"),
            refresh_token: None,
            expires_at: expires_at.coerce(),
        }
    }

    #[tokio::test]
    async fn anonymous_without_session() {
        let status = service().execute(SessionStatus).await.unwrap();

        assert_eq!(status.phase, Phase::Anonymous);
        assert!(!status.is_authenticated);
        assert_eq!(status.user, None);
        assert_eq!(status.remaining, Duration::ZERO);
    }

    #[tokio::test]
    async fn reports_phases() {
        let svc = service();

        for (left, phase) in [
            (Duration::from_secs(5 * 60), Phase::Authenticated),
            (Duration::from_secs(60), Phase::Expiring),
        ] {
            _ = svc.state.begin_session(session(DateTime::now() + left));
            let status = svc.execute(SessionStatus).await.unwrap();

            assert_eq!(status.phase, phase);
            assert!(status.is_authenticated);
            assert_eq!(status.is_expiring, phase == Phase::Expiring);
        }

        _ = svc
            .state
            .begin_session(session(DateTime::now() - Duration::from_secs(1)));
        let status = svc.execute(SessionStatus).await.unwrap();
        assert_eq!(status.phase, Phase::Expired);
        assert!(!status.is_authenticated);
    }
}
