//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler.
///
/// Every command, query, task and infrastructure operation is a [`Handler`]
/// implementation parametrized by the type of its arguments, so a single
/// value may execute many different operations.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
