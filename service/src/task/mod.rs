//! Background [`Task`]s definitions.

pub mod keep_session_alive;

pub use common::Handler as Task;

pub use self::keep_session_alive::KeepSessionAlive;
