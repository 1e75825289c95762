//! In-memory [`Storage`] implementation.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use common::operations::{By, Delete, Insert, Select};
use tracerr::Traced;

use crate::infra::{
    storage::{Entry, Error, Key},
    Storage,
};

/// In-memory [`Storage`], living as long as the process does.
///
/// Clones share the same values.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored values.
    values: Arc<Mutex<HashMap<Key, String>>>,

    /// Indicator whether every operation fails.
    #[cfg(test)]
    broken: Arc<std::sync::atomic::AtomicBool>,
}

impl Memory {
    /// Runs the provided function over the stored values.
    #[cfg_attr(
        not(test),
        expect(clippy::unnecessary_wraps, reason = "uniform with tests")
    )]
    fn with<T>(
        &self,
        f: impl FnOnce(&mut HashMap<Key, String>) -> T,
    ) -> Result<T, Traced<Error>> {
        #[cfg(test)]
        if self.broken.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(tracerr::new!(Error::Io(std::io::Error::other(
                "storage is broken",
            ))));
        }

        let mut values =
            self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut values))
    }

    /// Makes every operation of this [`Memory`] fail (or succeed again).
    #[cfg(test)]
    pub(crate) fn set_broken(&self, broken: bool) {
        self.broken
            .store(broken, std::sync::atomic::Ordering::Relaxed);
    }

    /// Indicates whether this [`Memory`] holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Storage<Select<By<Option<String>, Key>>> for Memory {
    type Ok = Option<String>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<String>, Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        let key = by.into_inner();
        self.with(|values| values.get(&key).cloned())
    }
}

impl Storage<Insert<Entry>> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(entry): Insert<Entry>,
    ) -> Result<Self::Ok, Self::Err> {
        let Entry { key, value } = entry;
        self.with(|values| drop(values.insert(key, value)))
    }
}

impl Storage<Delete<Key>> for Memory {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Delete(key): Delete<Key>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|values| drop(values.remove(&key)))
    }
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Delete, Insert, Select};

    use crate::infra::{
        storage::{Entry, Key},
        Storage as _,
    };

    use super::Memory;

    #[tokio::test]
    async fn stores_and_forgets_values() {
        let storage = Memory::default();

        storage
            .execute(Insert(Entry {
                key: Key::Token,
                value: r#""abc""#.to_owned(),
            }))
            .await
            .unwrap();
        let stored = storage
            .clone()
            .execute(Select(By::new(Key::Token)))
            .await
            .unwrap();
        assert_eq!(stored.as_deref(), Some(r#""abc""#));

        storage.execute(Delete(Key::Token)).await.unwrap();
        storage.execute(Delete(Key::Token)).await.unwrap();
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn broken_storage_fails() {
        let storage = Memory::default();
        storage.set_broken(true);

        assert!(storage
            .execute(Select(By::new(Key::Users)))
            .await
            .is_err());
    }
}
