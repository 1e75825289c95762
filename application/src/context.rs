//! [`Context`]-related definitions.

use common::Clock;
use service::{
    command,
    domain::{user::Action, User},
    infra::{DummyJson, File},
    query, Command as _,
};
use tracing as log;

use crate::{define_error, AsError, Config, Error, Service};

/// Application context, owning the [`Service`] for the lifetime of a run.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,
}

impl Context {
    /// Initializes a new [`Context`] with the provided [`Config`], restoring
    /// the session persisted by a previous run (if any).
    ///
    /// Must be called inside a [`LocalSet`], as the restored session is kept
    /// alive by a background task.
    ///
    /// # Errors
    ///
    /// If the remote API client cannot be initialized.
    ///
    /// [`LocalSet`]: tokio::task::LocalSet
    pub async fn initialize(config: &Config) -> Result<Self, Error> {
        let api = DummyJson::new(config.api.clone().into())
            .map_err(AsError::into_error)?;
        let storage = File::new(config.storage.dir.clone());
        let service =
            Service::new(config.service(), api, storage, Clock::System);

        if let Some(session) = service
            .execute(command::RestoreSession)
            .await
            .unwrap_or_else(|e| match e {})
        {
            log::debug!(
                "Restored session of `User(id: {})`",
                session.user.id,
            );
        }

        Ok(Self { service })
    }

    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the [`User`] of the current session.
    ///
    /// # Errors
    ///
    /// If there is no valid session.
    pub async fn current_user(&self) -> Result<User, Error> {
        let status = self
            .service
            .execute(query::SessionStatus)
            .await
            .unwrap_or_else(|e| match e {});
        status
            .user
            .filter(|_| status.is_authenticated)
            .ok_or_else(|| AuthError::AuthorizationRequired.into())
    }

    /// Returns the [`User`] of the current session, if it's allowed to
    /// perform the provided [`Action`].
    ///
    /// # Errors
    ///
    /// If there is no valid session, or the [`Action`] is forbidden.
    pub async fn authorize(&self, action: Action<'_>) -> Result<User, Error> {
        let user = self.current_user().await?;
        if !user.role.can(action) {
            return Err(AuthError::Forbidden.into());
        }
        Ok(user)
    }

    /// Disposes this [`Context`], stopping the background session renewal
    /// while keeping the persisted session intact.
    pub fn dispose(self) {
        self.service.dispose();
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[message = "Authorization required, log in first"]
        AuthorizationRequired,

        #[code = "FORBIDDEN"]
        #[message = "Your role is not allowed to do this"]
        Forbidden,
    }
}
