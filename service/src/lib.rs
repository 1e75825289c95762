//! Service contains the business logic of the dashboard: the session
//! lifecycle with its renewal loop, and the role-gated roster cache.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
mod state;
pub mod task;

use std::{rc::Rc, time::Duration};

use common::Clock;
use serde::Deserialize;
use smart_default::SmartDefault;

#[cfg(doc)]
use crate::{
    domain::{Roster, Session},
    infra::{Api, Storage},
};

pub use self::{command::Command, query::Query, task::Task};

use self::state::State;

/// [`Service`] configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct Config {
    /// [`Session`] lifecycle configuration.
    pub session: SessionConfig,

    /// [`Roster`] cache configuration.
    pub users: UsersConfig,
}

/// [`Session`] lifecycle configuration.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct SessionConfig {
    /// Lifetime of a freshly issued or renewed [`Session`].
    #[default(Duration::from_secs(10 * 60))]
    pub duration: Duration,

    /// Remaining lifetime below which a [`Session`] is considered expiring
    /// and gets renewed.
    #[default(Duration::from_secs(2 * 60))]
    pub warning_threshold: Duration,

    /// Interval between [`Session`] checks of the renewal loop.
    #[default(Duration::from_secs(30))]
    pub check_interval: Duration,

    /// Delay before retrying a failed renewal.
    #[default(Duration::from_secs(5))]
    pub retry_delay: Duration,

    /// Number of consecutive failed renewals forcing a logout.
    #[default(3)]
    pub max_renewal_attempts: u8,
}

/// [`Roster`] cache configuration.
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct UsersConfig {
    /// Age after which a cached [`Roster`] is re-fetched.
    #[default(Duration::from_secs(5 * 60))]
    pub staleness: Duration,

    /// Number of records requested per page from the remote [`Api`].
    #[default(100)]
    pub page_size: usize,

    /// How `User` mutations are propagated to the remote [`Api`].
    pub remote_writes: RemoteWrites,
}

/// Propagation mode of `User` mutations to the remote [`Api`].
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RemoteWrites {
    /// Mutations change the local cache only.
    Skip,

    /// Mutations change the local cache, and are mirrored to the remote
    /// [`Api`] afterwards. Failures of the mirroring are only logged.
    #[default]
    Mirror,

    /// Mutations are applied to the remote [`Api`] first. Its failure aborts
    /// the mutation leaving the local cache untouched.
    Authoritative,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<A, S> {
    /// Configuration of this [`Service`].
    config: Config,

    /// Remote [`Api`] of this [`Service`].
    api: A,

    /// Local [`Storage`] of this [`Service`].
    storage: S,

    /// [`Clock`] of this [`Service`].
    clock: Clock,

    /// In-memory state shared between clones of this [`Service`].
    state: Rc<State>,
}

impl<A, S> Service<A, S> {
    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// The created [`Service`] is anonymous until a `LogIn` or a
    /// `RestoreSession` command is executed.
    #[must_use]
    pub fn new(config: Config, api: A, storage: S, clock: Clock) -> Self {
        Self {
            config,
            api,
            storage,
            clock,
            state: Rc::default(),
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns remote [`Api`] of this [`Service`].
    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Returns local [`Storage`] of this [`Service`].
    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns [`Clock`] of this [`Service`].
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Stops the background renewal of the current [`Session`] (if any)
    /// without touching the persisted state.
    ///
    /// Should be called once the owner of this [`Service`] is discarded.
    pub fn dispose(&self) {
        self.state.stop_keeping_alive();
    }
}
