//! [`KeepSessionAlive`] [`Task`].

use std::convert::Infallible;

use common::operations::{By, Perform, Start};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::Session;
use crate::{
    command::{renew_session, LogOut, RenewSession},
    domain::user::session::{self, Phase},
    Command, Service, SessionConfig,
};

use super::Task;

/// [`Task`] renewing the current [`Session`] before it expires, and ending
/// it once expired.
///
/// Runs until its [`CancellationToken`] is cancelled, or the [`Session`]
/// ends.
#[derive(Clone, Copy, Debug)]
pub struct KeepSessionAlive<S> {
    /// [`SessionConfig`] of this [`Task`].
    config: SessionConfig,

    /// [`Service`] instance.
    service: S,
}

/// Kind of a single [`Session`] check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Check {
    /// Regular periodic check.
    Scheduled,

    /// Retry of a failed renewal of the [`Session`] of the provided
    /// generation.
    Retry {
        /// Generation of the [`Session`] whose renewal has failed.
        generation: u64,
    },
}

/// Outcome of a single [`Session`] [`Check`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// Nothing else to do until the next [`Check::Scheduled`].
    Fine,

    /// Renewal has failed and should be retried later.
    Retry {
        /// Generation of the [`Session`] whose renewal has failed.
        generation: u64,
    },

    /// [`Session`] has ended.
    Ended,
}

impl<A, S> Task<Start<By<KeepSessionAlive<Self>, CancellationToken>>>
    for Service<A, S>
where
    KeepSessionAlive<Self>:
        Task<Perform<Check>, Ok = Verdict, Err = Infallible>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<KeepSessionAlive<Self>, CancellationToken>>,
    ) -> Result<Self::Ok, Self::Err> {
        let cancelled = by.into_inner();
        let task = KeepSessionAlive {
            config: self.config().session,
            service: self.clone(),
        };

        let mut interval = time::interval(task.config.check_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut retry: Option<(Instant, u64)> = None;

        log::debug!("`task::KeepSessionAlive` started");
        loop {
            let retry_at = async move {
                match retry {
                    Some((at, generation)) => {
                        time::sleep_until(at).await;
                        generation
                    }
                    None => std::future::pending().await,
                }
            };

            let check = tokio::select! {
                biased;

                () = cancelled.cancelled() => break,
                generation = retry_at => {
                    retry = None;
                    Check::Retry { generation }
                }
                _ = interval.tick() => Check::Scheduled,
            };

            match task
                .execute(Perform(check))
                .await
                .unwrap_or_else(|e| match e {})
            {
                Verdict::Fine => {}
                Verdict::Retry { generation } => {
                    retry = Some((
                        Instant::now() + task.config.retry_delay,
                        generation,
                    ));
                }
                Verdict::Ended => break,
            }
        }
        log::debug!("`task::KeepSessionAlive` stopped");

        Ok(())
    }
}

impl<A, S> Service<A, S>
where
    Self: Task<
            Start<By<KeepSessionAlive<Self>, CancellationToken>>,
            Ok = (),
            Err = Infallible,
        > + Clone
        + 'static,
{
    /// Spawns [`KeepSessionAlive`] for the [`Session`] of the provided
    /// `generation` onto the current [`LocalSet`].
    ///
    /// Does nothing if the [`Session`] has changed meanwhile.
    ///
    /// # Panics
    ///
    /// If called outside of a [`LocalSet`].
    ///
    /// [`LocalSet`]: tokio::task::LocalSet
    pub(crate) fn keep_session_alive(&self, generation: u64) {
        let token = CancellationToken::new();
        if !self.state.keep_alive(generation, token.clone()) {
            return;
        }

        let svc = self.clone();
        drop(tokio::task::spawn_local(async move {
            svc.execute(Start(By::new(token))).await
        }));
    }
}

impl<A, S> Task<Perform<Check>> for KeepSessionAlive<Service<A, S>>
where
    Service<A, S>: Command<LogOut, Ok = (), Err = Infallible>
        + Command<
            RenewSession,
            Ok = session::Session,
            Err = Traced<renew_session::ExecutionError>,
        >,
{
    type Ok = Verdict;
    type Err = Infallible;

    async fn execute(
        &self,
        Perform(check): Perform<Check>,
    ) -> Result<Self::Ok, Self::Err> {
        use renew_session::ExecutionError as E;

        let svc = &self.service;
        let (session, generation) = svc.state.session();
        let Some(session) = session else {
            return Ok(Verdict::Ended);
        };
        if let Check::Retry { generation: g } = check {
            if g != generation {
                return Ok(Verdict::Fine);
            }
        }

        match session.phase(svc.clock(), self.config.warning_threshold) {
            Phase::Anonymous | Phase::Authenticated => Ok(Verdict::Fine),
            Phase::Expired => {
                log::info!(
                    "Session of `User(id: {})` has expired",
                    session.user.id,
                );
                svc.execute(LogOut).await?;
                Ok(Verdict::Ended)
            }
            Phase::Expiring => match svc.execute(RenewSession).await {
                Ok(_) => Ok(Verdict::Fine),
                Err(e) => match e.as_ref() {
                    E::Api(_) => Ok(Verdict::Retry { generation }),
                    E::Exhausted(_) => Ok(Verdict::Ended),
                    E::AlreadyRenewing
                    | E::NotAuthenticated
                    | E::SessionChanged => Ok(Verdict::Fine),
                },
            },
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::Clock;
    use secrecy::SecretBox;
    use tokio::{task::LocalSet, time};

    use crate::{
        command::LogIn,
        domain::{
            roster::spec::user,
            user::{session::Phase, Password, Role, Username},
        },
        infra::{
            api::mock::{Mock, PASSWORD},
            Memory,
        },
        query::{session::Status, SessionStatus},
        Command as _, Config, Service,
    };

    async fn log_in() -> Service<Mock, Memory> {
        let svc = Service::new(
            Config::default(),
            Mock::with_users(vec![user(1, Role::User)]),
            Memory::default(),
            Clock::runtime(),
        );
        drop(
            svc.execute(LogIn {
                username: Username::new("user1").unwrap(),
                password: SecretBox::new(Box::new(Password::from(PASSWORD))),
            })
            .await
            .unwrap(),
        );
        svc
    }

    async fn status(svc: &Service<Mock, Memory>) -> Status {
        svc.execute(SessionStatus).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn renews_expiring_session() {
        LocalSet::new()
            .run_until(async {
                let svc = log_in().await;

                time::sleep(Duration::from_secs(7 * 60 + 50)).await;
                assert_eq!(svc.api().state().calls.renewals, 0);
                assert_eq!(status(&svc).await.phase, Phase::Authenticated);

                time::sleep(Duration::from_secs(11)).await;
                assert_eq!(svc.api().state().calls.renewals, 1);
                let status = status(&svc).await;
                assert!(status.is_authenticated);
                assert!(!status.is_expiring);
                assert_eq!(
                    status.remaining,
                    Duration::from_secs(10 * 60 - 1),
                );
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn logs_out_once_renewals_are_exhausted() {
        LocalSet::new()
            .run_until(async {
                let svc = log_in().await;
                svc.api().state().fail_renewals = true;

                time::sleep(Duration::from_secs(8 * 60 + 1)).await;
                let status1 = status(&svc).await;
                assert!(status1.is_expiring);
                assert!(status1.is_authenticated);
                assert_eq!(status1.failed_renewals, 1);
                assert_eq!(svc.api().state().calls.renewals, 1);

                time::sleep(Duration::from_secs(5)).await;
                assert_eq!(status(&svc).await.failed_renewals, 2);

                time::sleep(Duration::from_secs(3 * 60)).await;
                let status2 = status(&svc).await;
                assert!(!status2.is_authenticated);
                assert_eq!(status2.phase, Phase::Anonymous);
                assert_eq!(svc.api().state().calls.renewals, 3);
                assert!(svc.storage().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_logout() {
        LocalSet::new()
            .run_until(async {
                let svc = log_in().await;

                svc.execute(crate::command::LogOut).await.unwrap();
                time::sleep(Duration::from_secs(20 * 60)).await;

                assert_eq!(svc.api().state().calls.renewals, 0);
                assert!(!status(&svc).await.is_authenticated);
            })
            .await;
    }
}
