//! [`Command`] for adding a new [`User`].

use std::convert::Infallible;

use common::operations::Insert;
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        roster::{Source, View},
        user::{self, AvatarUrl},
        Role, Roster, User,
    },
    infra::{api, Api, Store},
    query::{FetchUsers, Query},
    RemoteWrites, Service,
};

use super::Command;

/// [`Command`] for adding a new [`User`] to the cached [`Roster`].
///
/// The added [`User`] gets an ID greater than any cached one, and an avatar
/// derived from its [`user::Username`].
#[derive(Clone, Debug)]
pub struct AddUser {
    /// [`Draft`] of the [`User`] to add.
    pub draft: Draft,

    /// [`Role`] of the caller, the returned [`View`] is filtered for.
    pub caller: Role,
}

/// Data of a [`User`] to be added.
#[derive(Clone, Debug)]
pub struct Draft {
    /// First [`user::Name`] of the [`User`].
    pub first_name: user::Name,

    /// Last [`user::Name`] of the [`User`].
    pub last_name: user::Name,

    /// [`user::Username`] of the [`User`].
    pub username: user::Username,

    /// [`user::Email`] of the [`User`].
    pub email: user::Email,

    /// [`user::Gender`] of the [`User`].
    pub gender: user::Gender,

    /// [`Role`] of the [`User`].
    pub role: Role,
}

/// Output of [`AddUser`] and [`EditUser`] [`Command`]s.
///
/// [`EditUser`]: super::EditUser
#[derive(Clone, Debug)]
pub struct Output {
    /// Added or edited [`User`].
    pub user: User,

    /// Recomputed [`View`] for the caller.
    pub view: View,
}

impl<A, S> Command<AddUser> for Service<A, S>
where
    A: Api<Insert<User>, Ok = (), Err = Traced<api::Error>>,
    S: Store,
    Self: Query<FetchUsers, Ok = View, Err = Infallible>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: AddUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AddUser { draft, caller } = cmd;
        let mode = self.config().users.remote_writes;
        if !draft.role.is_permitted() {
            return Err(tracerr::new!(E::InvalidRole(draft.role)));
        }

        self.ensure_roster(&caller).await;
        let id = self.state.with_roster(|cached| {
            cached
                .as_ref()
                .map_or_else(|| user::Id::from(1_u64), Roster::next_id)
        });
        let mut user = User {
            id,
            avatar_url: AvatarUrl::derive_from(&draft.username),
            first_name: draft.first_name,
            last_name: draft.last_name,
            username: draft.username,
            email: draft.email,
            gender: draft.gender,
            role: draft.role,
        };

        if mode == RemoteWrites::Authoritative {
            self.api()
                .execute(Insert(user.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        let roster = self.state.with_roster(|cached| {
            let roster = cached.get_or_insert_with(|| self.empty_roster());
            // IDs may have been taken while the remote was busy.
            if roster.get(user.id).is_some() {
                user.id = roster.next_id();
            }
            roster.push(user.clone());
            roster.clone()
        });
        self.persist_roster(&roster).await;
        log::info!("`User(id: {})` added", user.id);

        if mode == RemoteWrites::Mirror {
            if let Err(e) = self.api().execute(Insert(user.clone())).await {
                log::warn!("Failed to mirror `User(id: {})`: {e}", user.id);
            }
        }

        Ok(Output {
            view: roster.view(&caller, Source::Cache),
            user,
        })
    }
}

/// Error of [`AddUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Api`] error.
    #[display("`Api` operation failed: {_0}")]
    Api(api::Error),

    /// [`User`] can't have the provided [`Role`].
    #[display("`User` can't have `{_0}` role")]
    #[from(ignore)]
    InvalidRole(#[error(not(source))] Role),
}
