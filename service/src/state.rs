//! In-memory [`State`] of a [`Service`] and its mirroring to a [`Storage`].
//!
//! Memory is authoritative while the process lives, while the [`Storage`]
//! is authoritative at cold start only. Failures of the [`Storage`] are
//! logged and never interrupt an operation.

use std::cell::{Cell, RefCell};

use common::{
    operations::{By, Delete, Insert, Select},
    DateTimeOf,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing as log;

#[cfg(doc)]
use crate::infra::Storage;
use crate::{
    domain::{
        roster,
        user::session::{self, AccessToken, RefreshToken},
        Roster, Session, User,
    },
    infra::{
        api::Tokens,
        storage::{Entry, Key},
        Store,
    },
    Service,
};

/// [`DateTimeOf`] stored as a Unix timestamp in milliseconds.
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
struct Millis<Of>(
    #[serde(with = "common::datetime::serde::unix_timestamp_millis")]
    DateTimeOf<Of>,
);

/// In-memory state shared between clones of a [`Service`].
#[derive(Debug, Default)]
pub(crate) struct State {
    /// State of the current [`Session`].
    session: RefCell<SessionState>,

    /// Indicator whether a [`Session`] renewal is in flight.
    refreshing: Cell<bool>,

    /// Cached [`Roster`], if any.
    roster: RefCell<Option<Roster>>,

    /// Indicator whether the [`Roster`] has been restored from the
    /// [`Storage`] already.
    roster_hydrated: Cell<bool>,
}

/// State of the current [`Session`].
#[derive(Debug, Default)]
struct SessionState {
    /// Current [`Session`], if any.
    current: Option<Session>,

    /// Generation of the `current` [`Session`], bumped every time a
    /// [`Session`] begins or ends.
    generation: u64,

    /// Number of consecutive failed renewals of the `current` [`Session`].
    failed_renewals: u8,

    /// [`CancellationToken`] of the renewal loop of the `current`
    /// [`Session`].
    keep_alive: Option<CancellationToken>,
}

impl State {
    /// Returns a copy of the current [`Session`] along with its generation.
    pub(crate) fn session(&self) -> (Option<Session>, u64) {
        let s = self.session.borrow();
        (s.current.clone(), s.generation)
    }

    /// Returns the generation of the current [`Session`].
    pub(crate) fn generation(&self) -> u64 {
        self.session.borrow().generation
    }

    /// Begins the provided [`Session`], ending the current one (if any).
    ///
    /// Returns the generation of the begun [`Session`].
    pub(crate) fn begin_session(&self, session: Session) -> u64 {
        let mut s = self.session.borrow_mut();
        if let Some(token) = s.keep_alive.take() {
            token.cancel();
        }
        s.current = Some(session);
        s.generation += 1;
        s.failed_renewals = 0;
        s.generation
    }

    /// Ends the current [`Session`] (if any) and stops its renewal loop.
    ///
    /// Returns the ended [`Session`].
    pub(crate) fn end_session(&self) -> Option<Session> {
        let mut s = self.session.borrow_mut();
        if let Some(token) = s.keep_alive.take() {
            token.cancel();
        }
        s.generation += 1;
        s.failed_renewals = 0;
        s.current.take()
    }

    /// Applies the renewed [`Tokens`] to the current [`Session`], if it is
    /// still of the provided `generation`.
    ///
    /// Returns the renewed [`Session`], or [`None`] if the renewal is stale.
    pub(crate) fn renew_session(
        &self,
        generation: u64,
        tokens: Tokens,
        expires_at: session::ExpirationDateTime,
    ) -> Option<Session> {
        let mut s = self.session.borrow_mut();
        if s.generation != generation {
            return None;
        }
        let Tokens {
            access_token,
            refresh_token,
        } = tokens;
        let session = s.current.as_mut()?;
        session.access_token = access_token;
        if refresh_token.is_some() {
            session.refresh_token = refresh_token;
        }
        session.expires_at = expires_at;
        let renewed = session.clone();
        s.failed_renewals = 0;
        Some(renewed)
    }

    /// Accounts a failed renewal of the current [`Session`], if it is still
    /// of the provided `generation`.
    ///
    /// Returns the number of consecutive failed renewals, or [`None`] if the
    /// failure is stale.
    pub(crate) fn fail_renewal(&self, generation: u64) -> Option<u8> {
        let mut s = self.session.borrow_mut();
        if s.generation != generation || s.current.is_none() {
            return None;
        }
        s.failed_renewals = s.failed_renewals.saturating_add(1);
        Some(s.failed_renewals)
    }

    /// Returns the number of consecutive failed renewals of the current
    /// [`Session`].
    pub(crate) fn failed_renewals(&self) -> u8 {
        self.session.borrow().failed_renewals
    }

    /// Replaces the [`User`] of the current [`Session`], if it is still of
    /// the provided `generation`.
    pub(crate) fn update_profile(
        &self,
        generation: u64,
        user: User,
    ) -> Option<Session> {
        let mut s = self.session.borrow_mut();
        if s.generation != generation {
            return None;
        }
        let session = s.current.as_mut()?;
        session.user = user;
        Some(session.clone())
    }

    /// Registers the [`CancellationToken`] of the renewal loop of the
    /// current [`Session`] of the provided `generation`.
    ///
    /// Returns `false` (cancelling the `token`) if the [`Session`] has
    /// changed meanwhile.
    pub(crate) fn keep_alive(
        &self,
        generation: u64,
        token: CancellationToken,
    ) -> bool {
        let mut s = self.session.borrow_mut();
        if s.generation != generation || s.current.is_none() {
            token.cancel();
            return false;
        }
        if let Some(previous) = s.keep_alive.replace(token) {
            previous.cancel();
        }
        true
    }

    /// Stops the renewal loop of the current [`Session`], if any.
    pub(crate) fn stop_keeping_alive(&self) {
        if let Some(token) = self.session.borrow_mut().keep_alive.take() {
            token.cancel();
        }
    }

    /// Indicates whether a [`Session`] renewal is in flight.
    pub(crate) fn is_refreshing(&self) -> bool {
        self.refreshing.get()
    }

    /// Marks a [`Session`] renewal as in flight, unless one is already.
    ///
    /// The mark is held until the returned [`RefreshGuard`] is dropped.
    pub(crate) fn begin_refresh(&self) -> Option<RefreshGuard<'_>> {
        (!self.refreshing.replace(true)).then(|| RefreshGuard(self))
    }

    /// Runs the provided function over the cached [`Roster`].
    pub(crate) fn with_roster<T>(
        &self,
        f: impl FnOnce(&mut Option<Roster>) -> T,
    ) -> T {
        f(&mut self.roster.borrow_mut())
    }
}

/// Mark of an in-flight [`Session`] renewal, released on drop.
#[derive(Debug)]
pub(crate) struct RefreshGuard<'s>(&'s State);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.refreshing.set(false);
    }
}

impl<A, S: Store> Service<A, S> {
    /// Stores the provided `value` as JSON under the provided [`Key`].
    async fn store<T: Serialize + ?Sized>(&self, key: Key, value: &T) {
        let value = match serde_json::to_string(value) {
            Ok(v) => v,
            Err(e) => {
                log::error!("Failed to encode `{key}` value: {e}");
                return;
            }
        };
        if let Err(e) =
            self.storage.execute(Insert(Entry { key, value })).await
        {
            log::warn!("Failed to persist `{key}`: {e}");
        }
    }

    /// Loads the JSON value stored under the provided [`Key`].
    ///
    /// Malformed values are treated as missing.
    async fn load<T: DeserializeOwned>(&self, key: Key) -> Option<T> {
        let value = self
            .storage
            .execute(Select(By::new(key)))
            .await
            .map_err(|e| log::warn!("Failed to load `{key}`: {e}"))
            .ok()??;
        serde_json::from_str(&value)
            .map_err(|e| log::warn!("Discarding malformed `{key}`: {e}"))
            .ok()
    }

    /// Removes values of the provided [`Key`]s.
    async fn forget(&self, keys: impl IntoIterator<Item = Key>) {
        for key in keys {
            if let Err(e) = self.storage.execute(Delete(key)).await {
                log::warn!("Failed to forget `{key}`: {e}");
            }
        }
    }

    /// Mirrors the provided [`Session`] to the [`Storage`].
    pub(crate) async fn persist_session(&self, session: &Session) {
        self.store(Key::Token, &session.access_token).await;
        if let Some(token) = &session.refresh_token {
            self.store(Key::RefreshToken, token).await;
        } else {
            self.forget([Key::RefreshToken]).await;
        }
        self.store(Key::User, &session.user).await;
        self.store(Key::SessionExpiresAt, &Millis(session.expires_at))
            .await;
    }

    /// Mirrors the provided [`Session`] of the provided `generation` to the
    /// [`Storage`].
    ///
    /// If the [`Session`] has changed while being persisted, the persisted
    /// state is brought in line with the current one.
    pub(crate) async fn commit_session(
        &self,
        generation: u64,
        session: &Session,
    ) {
        self.persist_session(session).await;
        let (current, actual) = self.state.session();
        if actual != generation {
            match current {
                Some(s) => self.persist_session(&s).await,
                None => self.forget_session().await,
            }
        }
    }

    /// Removes the persisted [`Session`] of the provided `generation` from
    /// the [`Storage`].
    ///
    /// If the [`Session`] has changed meanwhile, the current one stays
    /// persisted.
    pub(crate) async fn discard_session(&self, generation: u64) {
        self.forget_session().await;
        let (current, actual) = self.state.session();
        if actual != generation {
            if let Some(s) = current {
                self.persist_session(&s).await;
            }
        }
    }

    /// Restores a [`Session`] from the [`Storage`].
    ///
    /// Returns [`None`] if the persisted [`Session`] is incomplete.
    pub(crate) async fn load_session(&self) -> Option<Session> {
        let access_token = self.load::<AccessToken>(Key::Token).await;
        let refresh_token = self.load::<RefreshToken>(Key::RefreshToken).await;
        let user = self.load::<User>(Key::User).await;
        let expires_at: Option<session::ExpirationDateTime> = self
            .load::<Millis<_>>(Key::SessionExpiresAt)
            .await
            .map(|Millis(at)| at);

        Some(Session {
            user: user?,
            access_token: access_token?,
            refresh_token,
            expires_at: expires_at?,
        })
    }

    /// Removes any persisted [`Session`] from the [`Storage`].
    pub(crate) async fn forget_session(&self) {
        self.forget(Key::SESSION).await;
    }

    /// Mirrors the provided [`Roster`] to the [`Storage`].
    pub(crate) async fn persist_roster(&self, roster: &Roster) {
        self.store(Key::Users, &roster.records).await;
        self.store(Key::UsersFetchedAt, &Millis(roster.fetched_at)).await;
    }

    /// Restores the cached [`Roster`] from the [`Storage`] once, unless it's
    /// present in memory already.
    pub(crate) async fn hydrate_roster(&self) {
        if self.state.roster_hydrated.replace(true) {
            return;
        }

        let records = self.load::<Vec<User>>(Key::Users).await;
        let fetched_at: Option<roster::FetchDateTime> = self
            .load::<Millis<_>>(Key::UsersFetchedAt)
            .await
            .map(|Millis(at)| at);
        if let (Some(records), Some(fetched_at)) = (records, fetched_at) {
            log::debug!("Restored {} cached `User`s", records.len());
            self.state.with_roster(|cached| {
                if cached.is_none() {
                    *cached = Some(Roster {
                        records,
                        fetched_at,
                    });
                }
            });
        }
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Insert, Select},
        Clock, DateTime,
    };

    use crate::{
        domain::{
            roster::spec::{roster, user},
            user::{
                session::{AccessToken, RefreshToken},
                Role,
            },
            Session,
        },
        infra::{
            api::mock::Mock,
            storage::{Entry, Key},
            Memory, Storage as _,
        },
        Config, Service,
    };

    use super::State;

    fn service() -> Service<Mock, Memory> {
        Service::new(
            Config::default(),
            Mock::default(),
            Memory::default(),
            Clock::System,
        )
    }

    fn session() -> Session {
        Session {
            user: user(1, Role::Admin),
            access_token: AccessToken::new("access"),
            refresh_token: Some(RefreshToken::new("refresh")),
            expires_at: DateTime::from_unix_timestamp_millis(1_700_000_000_000)
                .unwrap()
                .coerce(),
        }
    }

    #[tokio::test]
    async fn restores_persisted_session() {
        let svc = service();

        svc.persist_session(&session()).await;

        assert_eq!(svc.load_session().await, Some(session()));
        assert_eq!(
            svc.storage
                .execute(Select(By::new(Key::SessionExpiresAt)))
                .await
                .unwrap()
                .as_deref(),
            Some("1700000000000"),
        );
    }

    #[tokio::test]
    async fn discards_incomplete_session() {
        let svc = service();
        svc.persist_session(&session()).await;
        svc.storage
            .execute(Insert(Entry {
                key: Key::User,
                value: "{not json".to_owned(),
            }))
            .await
            .unwrap();

        assert_eq!(svc.load_session().await, None);

        svc.forget_session().await;
        for key in Key::SESSION {
            assert_eq!(
                svc.storage.execute(Select(By::new(key))).await.unwrap(),
                None,
            );
        }
    }

    #[tokio::test]
    async fn storage_failures_are_not_fatal() {
        let svc = service();
        svc.storage.set_broken(true);

        svc.persist_session(&session()).await;
        svc.persist_roster(&roster()).await;

        assert_eq!(svc.load_session().await, None);
    }

    #[tokio::test]
    async fn hydrates_roster_once() {
        let svc = service();
        let persisted = roster();
        svc.persist_roster(&persisted).await;

        svc.hydrate_roster().await;
        assert_eq!(svc.state.with_roster(|r| r.clone()), Some(persisted));

        svc.state.with_roster(|r| *r = None);
        svc.hydrate_roster().await;
        assert_eq!(svc.state.with_roster(|r| r.clone()), None);
    }

    #[test]
    fn refresh_gate_admits_one() {
        let state = State::default();

        let guard = state.begin_refresh();
        assert!(guard.is_some());
        assert!(state.is_refreshing());
        assert!(state.begin_refresh().is_none());

        drop(guard);
        assert!(!state.is_refreshing());
        assert!(state.begin_refresh().is_some());
    }

    #[test]
    fn stale_renewals_are_discarded() {
        let state = State::default();
        let generation = state.begin_session(session());
        drop(state.end_session());

        assert_eq!(state.fail_renewal(generation), None);
        assert_eq!(state.session().0, None);
    }
}
