//! [`Clock`] definitions.

use std::time::Duration;

use tokio::time::Instant;

use crate::{DateTime, DateTimeOf};

/// Source of the current [`DateTime`].
#[derive(Clone, Copy, Debug, Default)]
pub enum Clock {
    /// Wall clock of the operating system.
    #[default]
    System,

    /// Clock starting at the `origin` and advancing together with the timer
    /// of the current [`tokio`] runtime.
    ///
    /// Pausing and advancing the runtime time (see [`tokio::time::pause()`])
    /// moves this [`Clock`] as well, which keeps timestamps and timers in
    /// agreement.
    Runtime {
        /// [`DateTime`] this [`Clock`] has been started at.
        origin: DateTime,

        /// Runtime [`Instant`] corresponding to the `origin`.
        started: Instant,
    },
}

impl Clock {
    /// Creates a new [`Clock::Runtime`] starting at the current wall-clock
    /// [`DateTime`].
    #[must_use]
    pub fn runtime() -> Self {
        Self::Runtime {
            origin: DateTime::now(),
            started: Instant::now(),
        }
    }

    /// Returns the current [`DateTime`] according to this [`Clock`].
    #[must_use]
    pub fn now(&self) -> DateTime {
        match self {
            Self::System => DateTime::now(),
            Self::Runtime { origin, started } => *origin + started.elapsed(),
        }
    }

    /// Returns the [`Duration`] left until the provided `deadline`, or
    /// [`Duration::ZERO`] if it has already passed.
    #[must_use]
    pub fn until<Of: ?Sized>(&self, deadline: DateTimeOf<Of>) -> Duration {
        deadline.saturating_duration_since(self.now())
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::Clock;

    #[tokio::test(start_paused = true)]
    async fn runtime_clock_follows_paused_time() {
        let clock = Clock::runtime();
        let start = clock.now();

        tokio::time::advance(Duration::from_secs(8 * 60)).await;

        assert_eq!(
            clock.now().saturating_duration_since(start),
            Duration::from_secs(8 * 60),
        );
        assert_eq!(
            clock.until(start + Duration::from_secs(10 * 60)),
            Duration::from_secs(2 * 60),
        );
    }
}
