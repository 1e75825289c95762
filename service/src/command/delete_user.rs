//! [`Command`] for deleting an existing [`User`].

use std::convert::Infallible;

use common::operations::Delete;
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::Roster;
use crate::{
    domain::{
        roster::{Source, View},
        user, Role,
    },
    infra::{api, Api, Store},
    query::{FetchUsers, Query},
    RemoteWrites, Service,
};

use super::Command;

/// [`Command`] for deleting an existing [`User`] from the cached [`Roster`].
///
/// Returns the recomputed [`View`] for the caller.
#[derive(Clone, Debug)]
pub struct DeleteUser {
    /// ID of the [`User`] to delete.
    pub id: user::Id,

    /// [`Role`] of the caller, the returned [`View`] is filtered for.
    pub caller: Role,
}

impl<A, S> Command<DeleteUser> for Service<A, S>
where
    A: Api<Delete<user::Id>, Ok = (), Err = Traced<api::Error>>,
    S: Store,
    Self: Query<FetchUsers, Ok = View, Err = Infallible>,
{
    type Ok = View;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: DeleteUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let DeleteUser { id, caller } = cmd;
        let mode = self.config().users.remote_writes;

        self.ensure_roster(&caller).await;
        let exists = self.state.with_roster(|cached| {
            cached.as_ref().is_some_and(|r| r.get(id).is_some())
        });
        if !exists {
            return Err(tracerr::new!(E::NotFound(id)));
        }

        if mode == RemoteWrites::Authoritative {
            self.api()
                .execute(Delete(id))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        let roster = self
            .state
            .with_roster(|cached| {
                let roster = cached.as_mut()?;
                drop(roster.remove(id)?);
                Some(roster.clone())
            })
            .ok_or(E::NotFound(id))
            .map_err(tracerr::wrap!())?;
        self.persist_roster(&roster).await;
        log::info!("`User(id: {id})` deleted");

        if mode == RemoteWrites::Mirror {
            if let Err(e) = self.api().execute(Delete(id)).await {
                log::warn!("Failed to mirror `User(id: {id})` deletion: {e}");
            }
        }

        Ok(roster.view(&caller, Source::Cache))
    }
}

/// Error of [`DeleteUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Api`] error.
    #[display("`Api` operation failed: {_0}")]
    Api(api::Error),

    /// [`User`] with the provided ID doesn't exist.
    #[display("`User(id: {_0})` doesn't exist")]
    #[from(ignore)]
    NotFound(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::Clock;

    use crate::{
        command::{edit_user, EditUser},
        domain::{roster::spec::roster, user::Changes, Role},
        infra::{api::mock::Mock, Memory},
        Command as _, Config, RemoteWrites, Service,
    };

    use super::{DeleteUser, ExecutionError};

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

    fn delete(id: u64) -> DeleteUser {
        DeleteUser {
            id: id.into(),
            caller: Role::Admin,
        }
    }

    #[tokio::test]
    async fn deleted_user_cannot_be_edited() {
        let svc = service(RemoteWrites::Skip);

        let view = svc.execute(delete(3)).await.unwrap();
        assert_eq!(view.records.len(), 9);
        assert_eq!(view.statistics.moderators, 1);
        let before = svc.state.with_roster(|r| r.clone());

        let err = svc
            .execute(EditUser {
                id: 3_u64.into(),
                changes: Changes {
                    role: Some(Role::Admin),
                    ..Changes::default()
                },
                caller: Role::Admin,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            edit_user::ExecutionError::NotFound(_),
        ));
        assert_eq!(svc.state.with_roster(|r| r.clone()), before);
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let svc = service(RemoteWrites::Mirror);

        drop(svc.execute(delete(1)).await.unwrap());
        let err = svc.execute(delete(1)).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotFound(_)));
        assert_eq!(svc.api().state().calls.writes, 1);
    }

    #[tokio::test]
    async fn authoritative_failures_abort() {
        let svc = service(RemoteWrites::Authoritative);
        svc.api().state().fail_writes = true;

        let err = svc.execute(delete(1)).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Api(_)));
        assert!(svc.state.with_roster(|r| {
            r.as_ref().is_some_and(|r| r.get(1_u64.into()).is_some())
        }));
    }
}
