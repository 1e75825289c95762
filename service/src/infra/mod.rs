//! Infrastructure layer.

pub mod api;
pub mod storage;

#[cfg(feature = "dummyjson")]
pub use self::api::DummyJson;
#[cfg(feature = "fs")]
pub use self::storage::File;
pub use self::{
    api::Api,
    storage::{Memory, Storage, Store},
};
