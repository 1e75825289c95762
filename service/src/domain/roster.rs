//! [`Roster`] definitions.

use std::time::Duration;

use common::{unit, DateTime, DateTimeOf};
use derive_more::Display;

use crate::domain::user::{self, Action, Role, User};

/// Cached roster of every known [`User`] along with the [`DateTime`] it was
/// fetched at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Roster {
    /// [`User`] records in insertion order.
    pub records: Vec<User>,

    /// [`DateTime`] when the [`Roster`] was fetched from the remote source.
    pub fetched_at: FetchDateTime,
}

impl Roster {
    /// Indicates whether this [`Roster`] is older than the provided
    /// `staleness` threshold at the provided `now` moment.
    #[must_use]
    pub fn is_stale(&self, now: DateTime, staleness: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) > staleness
    }

    /// Returns the [`User`] with the provided [`user::Id`], if any.
    #[must_use]
    pub fn get(&self, id: user::Id) -> Option<&User> {
        self.records.iter().find(|u| u.id == id)
    }

    /// Returns a [`user::Id`] greater than the one of any [`User`] in this
    /// [`Roster`].
    #[must_use]
    pub fn next_id(&self) -> user::Id {
        self.records
            .iter()
            .map(|u| u.id)
            .max()
            .map_or(user::Id::from(1_u64), user::Id::next)
    }

    /// Appends the provided [`User`] to this [`Roster`].
    pub fn push(&mut self, user: User) {
        self.records.push(user);
    }

    /// Applies the provided [`user::Changes`] to the [`User`] with the
    /// provided [`user::Id`].
    ///
    /// Returns the updated [`User`], or [`None`] if there is no such [`User`]
    /// (nothing is changed then).
    pub fn edit(
        &mut self,
        id: user::Id,
        changes: user::Changes,
    ) -> Option<&User> {
        let user = self.records.iter_mut().find(|u| u.id == id)?;
        changes.apply_to(user);
        Some(user)
    }

    /// Removes the [`User`] with the provided [`user::Id`].
    ///
    /// Returns the removed [`User`], or [`None`] if there is no such [`User`].
    pub fn remove(&mut self, id: user::Id) -> Option<User> {
        let pos = self.records.iter().position(|u| u.id == id)?;
        Some(self.records.remove(pos))
    }

    /// Builds a [`View`] of this [`Roster`] for the `caller` [`Role`].
    #[must_use]
    pub fn view(&self, caller: &Role, source: Source) -> View {
        View::new(visible(&self.records, caller), source)
    }
}

/// [`DateTime`] when a [`Roster`] was fetched.
pub type FetchDateTime = DateTimeOf<(Roster, unit::Fetch)>;

/// Returns the [`User`] records the `caller` [`Role`] is allowed to see.
///
/// [`Role::Admin`] sees every record, any other [`Role`] sees only records of
/// regular [`Role::User`]s.
#[must_use]
pub fn visible<'u>(
    records: impl IntoIterator<Item = &'u User>,
    caller: &Role,
) -> Vec<User> {
    records
        .into_iter()
        .filter(|u| caller.can(Action::View(&u.role)))
        .cloned()
        .collect()
}

/// Role-filtered view of a [`Roster`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct View {
    /// [`User`] records visible to the caller.
    pub records: Vec<User>,

    /// [`Statistics`] of the visible `records`.
    pub statistics: Statistics,

    /// [`Source`] the `records` come from.
    pub source: Source,
}

impl View {
    /// Creates a new [`View`] of the provided visible `records`.
    #[must_use]
    pub fn new(records: Vec<User>, source: Source) -> Self {
        Self {
            statistics: Statistics::compute(&records),
            records,
            source,
        }
    }
}

/// Source of the records in a [`View`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Source {
    /// Fresh cached [`Roster`].
    #[display("cache")]
    Cache,

    /// [`Roster`] has just been fetched from the remote source.
    #[display("remote")]
    Remote,

    /// Remote source has failed, so whatever has been cached (possibly stale
    /// or nothing at all) is used.
    #[display("fallback")]
    Fallback,
}

/// Counts of [`User`]s by their [`Role`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Statistics {
    /// Total number of [`User`]s.
    pub total: usize,

    /// Number of [`Role::Admin`]s.
    pub admins: usize,

    /// Number of [`Role::User`]s.
    pub users: usize,

    /// Number of [`Role::Moderator`]s.
    pub moderators: usize,

    /// Number of [`User`]s with any other [`Role`].
    pub others: usize,
}

impl Statistics {
    /// Aggregates [`Statistics`] of the provided [`User`] records.
    #[must_use]
    pub fn compute<'u>(records: impl IntoIterator<Item = &'u User>) -> Self {
        records.into_iter().fold(Self::default(), |mut stats, u| {
            stats.total += 1;
            match u.role {
                Role::Admin => stats.admins += 1,
                Role::User => stats.users += 1,
                Role::Moderator => stats.moderators += 1,
                Role::Other(_) => stats.others += 1,
            }
            stats
        })
    }
}
