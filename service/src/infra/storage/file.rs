//! File-system [`Storage`] implementation.

use std::{io, path::PathBuf};

use common::operations::{By, Delete, Insert, Select};
use tokio::fs;
use tracerr::Traced;

use crate::infra::{
    storage::{Entry, Error, Key},
    Storage,
};

/// [`Storage`] keeping every value in a separate file of a directory.
///
/// The directory is created on the first write.
#[derive(Clone, Debug)]
pub struct File {
    /// Directory holding the files.
    dir: PathBuf,
}

impl File {
    /// Creates a new [`File`] storage in the provided directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns path of the file holding the value of the provided [`Key`].
    fn path(&self, key: Key) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage<Select<By<Option<String>, Key>>> for File {
    type Ok = Option<String>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<String>, Key>>,
    ) -> Result<Self::Ok, Self::Err> {
        match fs::read_to_string(self.path(by.into_inner())).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(tracerr::new!(Error::Io(e))),
        }
    }
}

impl Storage<Insert<Entry>> for File {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(entry): Insert<Entry>,
    ) -> Result<Self::Ok, Self::Err> {
        let Entry { key, value } = entry;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        fs::write(self.path(key), value)
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
    }
}

impl Storage<Delete<Key>> for File {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Delete(key): Delete<Key>,
    ) -> Result<Self::Ok, Self::Err> {
        match fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(tracerr::new!(Error::Io(e))),
        }
    }
}

#[cfg(test)]
mod spec {
    use std::{env, process};

    use common::operations::{By, Delete, Insert, Select};

    use crate::infra::{
        storage::{Entry, Key},
        Storage as _,
    };

    use super::File;

    #[tokio::test]
    async fn keeps_one_file_per_key() {
        let dir = env::temp_dir()
            .join(format!("idbrasil-storage-spec-{}", process::id()));
        let storage = File::new(&dir);

        assert_eq!(
            storage.execute(Select(By::new(Key::Users))).await.unwrap(),
            None,
        );

        storage
            .execute(Insert(Entry {
                key: Key::Users,
                value: "[]".to_owned(),
            }))
            .await
            .unwrap();
        assert!(dir.join("users.json").exists());
        assert_eq!(
            storage
                .execute(Select(By::new(Key::Users)))
                .await
                .unwrap()
                .as_deref(),
            Some("[]"),
        );

        storage.execute(Delete(Key::Users)).await.unwrap();
        storage.execute(Delete(Key::Users)).await.unwrap();
        assert!(!dir.join("users.json").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
