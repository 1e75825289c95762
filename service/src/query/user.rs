//! [`Query`] of a single [`User`].

use common::operations::{By, Select};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Roster;
use crate::{
    domain::{user, User},
    infra::{api, Api, Store},
    Service,
};

use super::Query;

/// [`Query`] of a [`User`] by its [`user::Id`].
///
/// The cached [`Roster`] is looked up first. Otherwise the remote [`Api`] is
/// asked, without caching its answer.
#[derive(Clone, Copy, Debug)]
pub struct UserById(pub user::Id);

impl<A, S> Query<UserById> for Service<A, S>
where
    A: Api<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<api::Error>,
    >,
    S: Store,
{
    type Ok = Option<User>;
    type Err = Traced<api::Error>;

    async fn execute(
        &self,
        UserById(id): UserById,
    ) -> Result<Self::Ok, Self::Err> {
        self.hydrate_roster().await;
        let cached = self.state.with_roster(|cached| {
            cached.as_ref().and_then(|r| r.get(id)).cloned()
        });
        if cached.is_some() {
            return Ok(cached);
        }

        self.api()
            .execute(Select(By::new(id)))
            .await
            .map_err(tracerr::wrap!())
    }
}
