//! [`Command`] for editing an existing [`User`].

use std::convert::Infallible;

use common::operations::Update;
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::Roster;
use crate::{
    domain::{
        roster::{Source, View},
        user, Role, User,
    },
    infra::{api, Api, Store},
    query::{FetchUsers, Query},
    RemoteWrites, Service,
};

use super::{add_user::Output, Command};

/// [`Command`] for editing an existing [`User`] of the cached [`Roster`].
#[derive(Clone, Debug)]
pub struct EditUser {
    /// ID of the [`User`] to edit.
    pub id: user::Id,

    /// [`user::Changes`] to apply.
    pub changes: user::Changes,

    /// [`Role`] of the caller, the returned [`View`] is filtered for.
    pub caller: Role,
}

impl<A, S> Command<EditUser> for Service<A, S>
where
    A: Api<Update<User>, Ok = (), Err = Traced<api::Error>>,
    S: Store,
    Self: Query<FetchUsers, Ok = View, Err = Infallible>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: EditUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let EditUser {
            id,
            changes,
            caller,
        } = cmd;
        let mode = self.config().users.remote_writes;
        if let Some(role) = changes.role.as_ref().filter(|r| !r.is_permitted())
        {
            return Err(tracerr::new!(E::InvalidRole(role.clone())));
        }

        self.ensure_roster(&caller).await;
        let mut preview = self
            .state
            .with_roster(|cached| cached.as_ref()?.get(id).cloned())
            .ok_or(E::NotFound(id))
            .map_err(tracerr::wrap!())?;
        changes.clone().apply_to(&mut preview);

        if mode == RemoteWrites::Authoritative {
            self.api()
                .execute(Update(preview))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        let (user, roster) = self
            .state
            .with_roster(|cached| {
                let roster = cached.as_mut()?;
                let user = roster.edit(id, changes)?.clone();
                Some((user, roster.clone()))
            })
            .ok_or(E::NotFound(id))
            .map_err(tracerr::wrap!())?;
        self.persist_roster(&roster).await;
        log::info!("`User(id: {id})` edited");

        if mode == RemoteWrites::Mirror {
            if let Err(e) = self.api().execute(Update(user.clone())).await {
                log::warn!("Failed to mirror `User(id: {id})` edit: {e}");
            }
        }

        Ok(Output {
            view: roster.view(&caller, Source::Cache),
            user,
        })
    }
}

/// Error of [`EditUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Api`] error.
    #[display("`Api` operation failed: {_0}")]
    Api(api::Error),

    /// [`User`] can't have the provided [`Role`].
    #[display("`User` can't have `{_0}` role")]
    #[from(ignore)]
    InvalidRole(#[error(not(source))] Role),

    /// [`User`] with the provided ID doesn't exist.
    #[display("`User(id: {_0})` doesn't exist")]
    #[from(ignore)]
    NotFound(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::Clock;

    use crate::{
        domain::{
            roster::{spec::roster, Source},
            user::{Changes, Name},
            Role,
        },
        infra::{api::mock::Mock, Memory},
        Command as _, Config, RemoteWrites, Service,
    };

    use super::{EditUser, ExecutionError};

    fn service(mode: RemoteWrites) -> Service<Mock, Memory> {
        let mut config = Config::default();
        config.users.remote_writes = mode;
        Service::new(
            config,
            Mock::with_users(roster().records),
            Memory::default(),
            Clock::System,
        )
    }

    fn promote(id: u64) -> EditUser {
        EditUser {
            id: id.into(),
            changes: Changes {
                first_name: Some(Name::new("Promoted").unwrap()),
                role: Some(Role::Moderator),
                ..Changes::default()
            },
            caller: Role::User,
        }
    }

    #[tokio::test]
    async fn merges_changes_and_recomputes_view() {
        let svc = service(RemoteWrites::Mirror);

        let out = svc.execute(promote(2)).await.unwrap();

        assert_eq!(out.user.first_name.to_string(), "Promoted");
        assert_eq!(out.user.role, Role::Moderator);
        assert_eq!(out.user.last_name.to_string(), "Last2");
        assert_eq!(out.view.source, Source::Cache);
        assert_eq!(out.view.records.len(), 4);
        assert_eq!(svc.api().state().calls.writes, 1);
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let svc = service(RemoteWrites::Mirror);

        let err = svc.execute(promote(99)).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::NotFound(id) if *id == 99_u64.into(),
        ));
        assert_eq!(svc.api().state().calls.writes, 0);
        assert_eq!(
            svc.state.with_roster(|r| r.clone()).map(|r| r.records),
            Some(roster().records),
        );
    }

    #[tokio::test]
    async fn rejects_not_permitted_role() {
        let svc = service(RemoteWrites::Authoritative);
        let mut edit = promote(2);
        edit.changes.role = Some(Role::Other("guest".to_owned()));

        let err = svc.execute(edit).await.unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::InvalidRole(Role::Other(r)) if r == "guest",
        ));
        assert_eq!(svc.api().state().calls.writes, 0);
        assert_eq!(svc.state.with_roster(|r| r.clone()), None);
    }

    #[tokio::test]
    async fn authoritative_failures_abort() {
        let svc = service(RemoteWrites::Authoritative);
        svc.api().state().fail_writes = true;

        let err = svc.execute(promote(2)).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Api(_)));
        assert_eq!(
            svc.state.with_roster(|r| r.clone()).map(|r| r.records),
            Some(roster().records),
        );
    }
}
