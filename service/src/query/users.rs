//! [`Query`] of the role-filtered [`User`]s roster.

use std::convert::Infallible;

use common::operations::{By, Select};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        roster::{self, Source, View},
        Role, Roster, User,
    },
    infra::{
        api::{self, Page, PageRequest},
        Api, Store,
    },
    Service,
};

use super::Query;

/// [`Query`] of the [`User`]s a `caller` is allowed to see.
///
/// A fresh cached [`Roster`] is used as is. Otherwise, every page is fetched
/// from the remote [`Api`] and cached. If fetching fails, whatever is cached
/// is used (even stale), or the pages fetched so far if nothing is.
#[derive(Clone, Debug)]
pub struct FetchUsers {
    /// [`Role`] of the caller.
    pub caller: Role,

    /// Indicator whether the cached [`Roster`] must be re-fetched even if
    /// fresh.
    pub refresh: bool,
}

impl<A, S> Query<FetchUsers> for Service<A, S>
where
    A: Api<Select<By<Page, PageRequest>>, Ok = Page, Err = Traced<api::Error>>,
    S: Store,
{
    type Ok = View;
    type Err = Infallible;

    async fn execute(&self, query: FetchUsers) -> Result<Self::Ok, Self::Err> {
        let FetchUsers { caller, refresh } = query;
        let staleness = self.config().users.staleness;

        self.hydrate_roster().await;
        if !refresh {
            let now = self.clock().now();
            let fresh = self.state.with_roster(|cached| {
                cached
                    .as_ref()
                    .filter(|r| !r.is_stale(now, staleness))
                    .map(|r| r.view(&caller, Source::Cache))
            });
            if let Some(view) = fresh {
                return Ok(view);
            }
        }

        let (records, res) = self.fetch_all().await;
        if let Err(e) = res {
            log::warn!(
                "Failed to fetch `User`s after {} records: {e}",
                records.len(),
            );
            let cached = self.state.with_roster(|cached| {
                cached.as_ref().map(|r| r.view(&caller, Source::Fallback))
            });
            return Ok(cached.unwrap_or_else(|| {
                View::new(roster::visible(&records, &caller), Source::Fallback)
            }));
        }

        let fetched = Roster {
            records,
            fetched_at: self.clock().now().coerce(),
        };
        log::debug!("Fetched {} `User`s", fetched.records.len());
        let view = fetched.view(&caller, Source::Remote);
        self.persist_roster(&fetched).await;
        self.state.with_roster(|cached| *cached = Some(fetched));
        Ok(view)
    }
}

impl<A, S> Service<A, S>
where
    A: Api<Select<By<Page, PageRequest>>, Ok = Page, Err = Traced<api::Error>>,
{
    /// Fetches every [`Page`] of [`User`]s until a short one.
    ///
    /// Returns the [`User`]s fetched so far along with the error that
    /// interrupted the fetching, if any.
    async fn fetch_all(&self) -> (Vec<User>, Result<(), Traced<api::Error>>) {
        let limit = self.config().users.page_size.max(1);
        let mut records = Vec::new();
        loop {
            let page = self
                .api()
                .execute(Select(By::new(PageRequest {
                    limit,
                    skip: records.len(),
                })))
                .await;
            match page {
                Ok(Page {
                    records: page,
                    total,
                }) => {
                    let short = page.len() < limit;
                    records.extend(page);
                    if short || records.len() >= total {
                        return (records, Ok(()));
                    }
                }
                Err(e) => return (records, Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{Clock, DateTime};

    use crate::{
        domain::{
            roster::{
                spec::{roster, user},
                Source,
            },
            Role,
        },
        infra::{api::mock::Mock, Memory},
        Config, Query as _, Service,
    };

    use super::FetchUsers;

    fn service(page_size: usize) -> Service<Mock, Memory> {
        let mut config = Config::default();
        config.users.page_size = page_size;
        Service::new(
            config,
            Mock::with_users(roster().records),
            Memory::default(),
            Clock::System,
        )
    }

    fn fetch(caller: Role) -> FetchUsers {
        FetchUsers {
            caller,
            refresh: false,
        }
    }

    #[tokio::test]
    async fn fetches_every_page_and_filters_by_role() {
        let svc = service(3);

        let admin = svc.execute(fetch(Role::Admin)).await.unwrap();
        let user = svc.execute(fetch(Role::User)).await.unwrap();

        assert_eq!(admin.source, Source::Remote);
        assert_eq!(admin.records.len(), 10);
        assert_eq!(admin.statistics.admins, 3);
        assert_eq!(svc.api().state().calls.pages, 4);
        assert_eq!(user.source, Source::Cache);
        assert_eq!(user.records.len(), 5);
        assert!(user.records.iter().all(|u| u.role == Role::User));
    }

    #[tokio::test]
    async fn stops_on_exact_total() {
        let svc = service(5);

        let view = svc.execute(fetch(Role::Admin)).await.unwrap();

        assert_eq!(view.records.len(), 10);
        assert_eq!(svc.api().state().calls.pages, 2);
    }

    #[tokio::test]
    async fn refetches_stale_or_refreshed_cache() {
        let svc = service(100);
        let mut stale = roster();
        stale.records.truncate(2);
        stale.fetched_at =
            (DateTime::now() - Duration::from_secs(6 * 60)).coerce();
        svc.state.with_roster(|r| *r = Some(stale));

        let view = svc.execute(fetch(Role::Admin)).await.unwrap();
        assert_eq!(view.source, Source::Remote);
        assert_eq!(view.records.len(), 10);

        let view = svc
            .execute(FetchUsers {
                caller: Role::Admin,
                refresh: true,
            })
            .await
            .unwrap();
        assert_eq!(view.source, Source::Remote);
        assert_eq!(svc.api().state().calls.pages, 2);
    }

    #[tokio::test]
    async fn falls_back_to_stale_cache() {
        let svc = service(100);
        let mut stale = roster();
        stale.records.truncate(2);
        stale.fetched_at =
            (DateTime::now() - Duration::from_secs(6 * 60)).coerce();
        svc.state.with_roster(|r| *r = Some(stale));
        svc.api().state().fail_pages_after = Some(0);

        let view = svc.execute(fetch(Role::Admin)).await.unwrap();

        assert_eq!(view.source, Source::Fallback);
        assert_eq!(view.records.len(), 2);
    }

    #[tokio::test]
    async fn falls_back_to_partial_pages() {
        let svc = service(4);
        svc.api().state().fail_pages_after = Some(1);

        let view = svc.execute(fetch(Role::Admin)).await.unwrap();

        assert_eq!(view.source, Source::Fallback);
        assert_eq!(view.records.len(), 4);
        assert_eq!(view.statistics.total, 4);
        assert!(svc.state.with_roster(|r| r.is_none()));
    }

    #[tokio::test]
    async fn hydrates_cache_from_storage() {
        let svc = service(100);
        svc.persist_roster(&roster()).await;

        let view = svc.execute(fetch(Role::Moderator)).await.unwrap();

        assert_eq!(view.source, Source::Cache);
        assert_eq!(view.records.len(), 5);
        assert_eq!(svc.api().state().calls.pages, 0);
    }
}
