//! [`Command`] for re-fetching the cached [`Roster`].

use std::convert::Infallible;

#[cfg(doc)]
use crate::domain::Roster;
use crate::{
    domain::{roster::View, Role},
    query::{FetchUsers, Query},
    Service,
};

use super::Command;

/// [`Command`] for re-fetching the cached [`Roster`] regardless of its age.
#[derive(Clone, Debug)]
pub struct RefreshUsers {
    /// [`Role`] of the caller, the returned [`View`] is filtered for.
    pub caller: Role,
}

impl<A, S> Command<RefreshUsers> for Service<A, S>
where
    Self: Query<FetchUsers, Ok = View, Err = Infallible>,
{
    type Ok = View;
    type Err = Infallible;

    async fn execute(&self, cmd: RefreshUsers) -> Result<Self::Ok, Self::Err> {
        self.execute(FetchUsers {
            caller: cmd.caller,
            refresh: true,
        })
        .await
    }
}

#[cfg(test)]
mod spec {
    use common::Clock;

    use crate::{
        domain::{
            roster::{spec::roster, Source},
            Role,
        },
        infra::{api::mock::Mock, Memory},
        Command as _, Config, Service,
    };

    use super::RefreshUsers;

    #[tokio::test]
    async fn refetches_fresh_cache() {
        let svc = Service::new(
            Config::default(),
            Mock::with_users(roster().records),
            Memory::default(),
            Clock::System,
        );
        let mut cached = roster();
        cached.records.truncate(1);
        svc.state.with_roster(|r| *r = Some(cached));

        let view = svc
            .execute(RefreshUsers {
                caller: Role::Admin,
            })
            .await
            .unwrap();

        assert_eq!(view.source, Source::Remote);
        assert_eq!(view.records.len(), 10);
        assert_eq!(svc.api().state().calls.pages, 1);
    }
}
