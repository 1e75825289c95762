//! In-memory [`Api`] double mimicking [DummyJSON] behaviour.
//!
//! [DummyJSON]: https://dummyjson.com/docs

use std::{
    cell::{RefCell, RefMut},
    collections::HashMap,
    rc::Rc,
};

use common::operations::{By, Delete, Insert, Perform, Select, Update};
use secrecy::ExposeSecret as _;
use tracerr::Traced;

use crate::{
    domain::{
        user::{
            self,
            session::{AccessToken, RefreshToken},
        },
        User,
    },
    infra::{
        api::{
            Authenticate, Authenticated, Error, Page, PageRequest,
            RenewTokens, Tokens,
        },
        Api,
    },
};

/// Password accepted for every [`User`] of a [`Mock`].
pub(crate) const PASSWORD: &str = "secret";

/// In-memory [`Api`] double.
#[derive(Clone, Debug, Default)]
pub(crate) struct Mock(Rc<RefCell<State>>);

/// State of a [`Mock`], tweakable by tests.
#[derive(Debug, Default)]
pub(crate) struct State {
    /// Remote [`User`]s.
    pub(crate) users: Vec<User>,

    /// Access tokens issued so far, mapped to their [`User`]s.
    pub(crate) sessions: HashMap<String, user::Id>,

    /// Number of token pairs issued so far.
    pub(crate) issued: u64,

    /// Whether token renewals fail.
    pub(crate) fail_renewals: bool,

    /// Number of pages served before page requests start failing.
    pub(crate) fail_pages_after: Option<usize>,

    /// Whether writes fail.
    pub(crate) fail_writes: bool,

    /// Status `GET /auth/me` is rejected with.
    pub(crate) reject_profile: Option<u16>,

    /// Number of performed calls.
    pub(crate) calls: Calls,
}

/// Counters of [`Mock`] calls.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Calls {
    pub(crate) logins: usize,
    pub(crate) renewals: usize,
    pub(crate) profiles: usize,
    pub(crate) lookups: usize,
    pub(crate) pages: usize,
    pub(crate) writes: usize,
}

impl Mock {
    /// Creates a new [`Mock`] knowing the provided [`User`]s.
    pub(crate) fn with_users(users: Vec<User>) -> Self {
        let mock = Self::default();
        mock.state().users = users;
        mock
    }

    /// Borrows the [`State`] of this [`Mock`].
    pub(crate) fn state(&self) -> RefMut<'_, State> {
        self.0.borrow_mut()
    }

    /// Accounts a write, which never changes the remote [`User`]s.
    fn write(&self) -> Result<(), Traced<Error>> {
        let mut state = self.state();
        state.calls.writes += 1;
        if state.fail_writes {
            return Err(unavailable());
        }
        Ok(())
    }
}

impl State {
    /// Issues new [`Tokens`] for the [`User`] with the provided ID.
    fn issue(&mut self, id: user::Id) -> Tokens {
        self.issued += 1;
        let access = format!("access-{}", self.issued);
        drop(self.sessions.insert(access.clone(), id));
        Tokens {
            access_token: AccessToken::new(access),
            refresh_token: Some(RefreshToken::new(format!(
                "refresh-{}",
                self.issued,
            ))),
        }
    }
}

/// Creates a server-side failure [`Error`].
fn unavailable() -> Traced<Error> {
    tracerr::new!(Error::Rejected {
        status: 503,
        message: "Service Unavailable".to_owned(),
    })
}

impl Api<Perform<Authenticate>> for Mock {
    type Ok = Authenticated;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Perform(auth): Perform<Authenticate>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state();
        state.calls.logins += 1;

        let id = state
            .users
            .iter()
            .find(|u| u.username == auth.username)
            .map(|u| u.id)
            .filter(|_| auth.password.expose_secret().as_ref() == PASSWORD)
            .ok_or_else(|| {
                tracerr::new!(Error::Rejected {
                    status: 400,
                    message: "Invalid credentials".to_owned(),
                })
            })?;

        Ok(Authenticated {
            user_id: id,
            tokens: state.issue(id),
        })
    }
}

impl Api<Perform<RenewTokens>> for Mock {
    type Ok = Tokens;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Perform(renew): Perform<RenewTokens>,
    ) -> Result<Self::Ok, Self::Err> {
        // Renewal is a network round trip, so let others run meanwhile.
        tokio::task::yield_now().await;

        let mut state = self.state();
        state.calls.renewals += 1;
        if state.fail_renewals {
            return Err(unavailable());
        }

        let id = state
            .sessions
            .remove(renew.access_token.as_ref())
            .filter(|_| renew.refresh_token.is_some())
            .ok_or_else(|| {
                tracerr::new!(Error::Rejected {
                    status: 401,
                    message: "Invalid refresh token".to_owned(),
                })
            })?;
        Ok(state.issue(id))
    }
}

impl Api<Select<By<User, AccessToken>>> for Mock {
    type Ok = User;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<User, AccessToken>>,
    ) -> Result<Self::Ok, Self::Err> {
        tokio::task::yield_now().await;

        let mut state = self.state();
        state.calls.profiles += 1;
        if let Some(status) = state.reject_profile {
            return Err(tracerr::new!(Error::Rejected {
                status,
                message: "Rejected".to_owned(),
            }));
        }

        let token = by.into_inner();
        state
            .sessions
            .get(token.as_ref())
            .and_then(|id| state.users.iter().find(|u| u.id == *id))
            .cloned()
            .ok_or_else(|| {
                tracerr::new!(Error::Rejected {
                    status: 401,
                    message: "Invalid token".to_owned(),
                })
            })
    }
}

impl Api<Select<By<Option<User>, user::Id>>> for Mock {
    type Ok = Option<User>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state();
        state.calls.lookups += 1;

        let id = by.into_inner();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }
}

impl Api<Select<By<Page, PageRequest>>> for Mock {
    type Ok = Page;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Page, PageRequest>>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut state = self.state();
        if state.fail_pages_after.is_some_and(|n| state.calls.pages >= n) {
            return Err(unavailable());
        }
        state.calls.pages += 1;

        let PageRequest { limit, skip } = by.into_inner();
        Ok(Page {
            records: state
                .users
                .iter()
                .skip(skip)
                .take(limit)
                .cloned()
                .collect(),
            total: state.users.len(),
        })
    }
}

impl Api<Insert<User>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(&self, _: Insert<User>) -> Result<Self::Ok, Self::Err> {
        self.write()
    }
}

impl Api<Update<User>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(&self, _: Update<User>) -> Result<Self::Ok, Self::Err> {
        self.write()
    }
}

impl Api<Delete<user::Id>> for Mock {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        _: Delete<user::Id>,
    ) -> Result<Self::Ok, Self::Err> {
        self.write()
    }
}
