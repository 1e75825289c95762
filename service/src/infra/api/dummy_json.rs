//! [DummyJSON] implementation of the remote [`Api`].
//!
//! [DummyJSON]: https://dummyjson.com/docs

use std::time::Duration;

use common::operations::{By, Delete, Insert, Perform, Select, Update};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::ExposeSecret as _;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use smart_default::SmartDefault;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        user::{
            self,
            session::{AccessToken, RefreshToken},
            AvatarUrl, Email, Gender, Name, Role, Username,
        },
        User,
    },
    infra::{
        api::{
            Authenticate, Authenticated, Error, Page, PageRequest,
            RenewTokens, Tokens,
        },
        Api,
    },
};

/// [`DummyJson`] client configuration.
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Base URL of the [DummyJSON] API.
    ///
    /// [DummyJSON]: https://dummyjson.com/docs
    #[default(DummyJson::DEFAULT_BASE_URL.to_owned())]
    pub base_url: String,

    /// Timeout of a single request.
    #[default(Duration::from_secs(10))]
    pub timeout: Duration,
}

/// [DummyJSON] API client.
///
/// [DummyJSON]: https://dummyjson.com/docs
#[derive(Clone, Debug)]
pub struct DummyJson {
    /// HTTP client performing requests.
    client: reqwest::Client,

    /// Base URL without a trailing slash.
    base_url: String,
}

impl DummyJson {
    /// Base URL of the public [DummyJSON] API.
    ///
    /// [DummyJSON]: https://dummyjson.com/docs
    pub const DEFAULT_BASE_URL: &'static str = "https://dummyjson.com";

    /// Creates a new [`DummyJson`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If the underlying HTTP client cannot be initialized.
    pub fn new(config: Config) -> Result<Self, Traced<Error>> {
        let Config { base_url, timeout } = config;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Builds an absolute URL of the provided `path`.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends the provided `request` and decodes its JSON response.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, Traced<Error>> {
        let response = request
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<Rejection>()
                .await
                .map(|r| r.message)
                .unwrap_or_else(|_| {
                    status.canonical_reason().unwrap_or("unknown").to_owned()
                });
            log::debug!(
                "DummyJSON rejected request with `{status}`: {message}",
            );
            return Err(tracerr::new!(Error::Rejected {
                status: status.as_u16(),
                message,
            }));
        }

        response
            .json()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))
    }
}

/// Converts the provided [`Duration`] into whole minutes (at least one), as
/// expected by the `expiresInMins` parameter.
fn minutes(duration: Duration) -> u64 {
    duration.as_secs().div_ceil(60).max(1)
}

impl Api<Perform<Authenticate>> for DummyJson {
    type Ok = Authenticated;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Perform(auth): Perform<Authenticate>,
    ) -> Result<Self::Ok, Self::Err> {
        let Authenticate {
            username,
            password,
            expires_in,
        } = auth;

        let LoginResponse { id, tokens } = self
            .send(self.client.post(self.url("/auth/login")).json(
                &LoginRequest {
                    username: username.as_ref(),
                    password: password.expose_secret().as_ref(),
                    expires_in_mins: minutes(expires_in),
                },
            ))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Authenticated {
            user_id: id,
            tokens: tokens.into(),
        })
    }
}

impl Api<Perform<RenewTokens>> for DummyJson {
    type Ok = Tokens;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Perform(renew): Perform<RenewTokens>,
    ) -> Result<Self::Ok, Self::Err> {
        let RenewTokens {
            access_token,
            refresh_token,
            expires_in,
        } = renew;

        self.send::<TokensResponse>(
            self.client
                .post(self.url("/auth/refresh"))
                .bearer_auth(access_token.as_ref())
                .json(&RefreshRequest {
                    refresh_token: refresh_token.as_ref().map(AsRef::as_ref),
                    expires_in_mins: minutes(expires_in),
                }),
        )
        .await
        .map(Into::into)
        .map_err(tracerr::wrap!())
    }
}

impl Api<Select<By<User, AccessToken>>> for DummyJson {
    type Ok = User;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<User, AccessToken>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();

        self.send::<Record>(
            self.client
                .get(self.url("/auth/me"))
                .bearer_auth(token.as_ref()),
        )
        .await
        .map(Into::into)
        .map_err(tracerr::wrap!())
    }
}

impl Api<Select<By<Option<User>, user::Id>>> for DummyJson {
    type Ok = Option<User>;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        match self
            .send::<Record>(self.client.get(self.url(&format!("/users/{id}"))))
            .await
        {
            Ok(record) => Ok(Some(record.into())),
            Err(e)
                if matches!(
                    e.as_ref(),
                    Error::Rejected { status, .. }
                        if *status == StatusCode::NOT_FOUND.as_u16(),
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(e).map_err(tracerr::wrap!()),
        }
    }
}

impl Api<Select<By<Page, PageRequest>>> for DummyJson {
    type Ok = Page;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Page, PageRequest>>,
    ) -> Result<Self::Ok, Self::Err> {
        let PageRequest { limit, skip } = by.into_inner();

        let UsersResponse { users, total } = self
            .send(
                self.client
                    .get(self.url("/users"))
                    .query(&[("limit", limit), ("skip", skip)]),
            )
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Page {
            records: users.into_iter().map(Into::into).collect(),
            total,
        })
    }
}

impl Api<Insert<User>> for DummyJson {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.send::<serde_json::Value>(
            self.client
                .post(self.url("/users/add"))
                .json(&Record::from(user)),
        )
        .await
        .map(drop)
        .map_err(tracerr::wrap!())
    }
}

impl Api<Update<User>> for DummyJson {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.send::<serde_json::Value>(
            self.client
                .put(self.url(&format!("/users/{}", user.id)))
                .json(&Record::from(user)),
        )
        .await
        .map(drop)
        .map_err(tracerr::wrap!())
    }
}

impl Api<Delete<user::Id>> for DummyJson {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Delete(id): Delete<user::Id>,
    ) -> Result<Self::Ok, Self::Err> {
        self.send::<serde_json::Value>(
            self.client.delete(self.url(&format!("/users/{id}"))),
        )
        .await
        .map(drop)
        .map_err(tracerr::wrap!())
    }
}

/// Body of a `POST /auth/login` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    expires_in_mins: u64,
}

/// Body of a `POST /auth/refresh` request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    expires_in_mins: u64,
}

/// Body of a `POST /auth/login` response.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    id: user::Id,
    #[serde(flatten)]
    tokens: TokensResponse,
}

/// Tokens of a `POST /auth/login` or `POST /auth/refresh` response.
///
/// Older API versions name the access token `token`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokensResponse {
    #[serde(alias = "token")]
    access_token: AccessToken,
    #[serde(default)]
    refresh_token: Option<RefreshToken>,
}

impl From<TokensResponse> for Tokens {
    fn from(resp: TokensResponse) -> Self {
        Self {
            access_token: resp.access_token,
            refresh_token: resp.refresh_token,
        }
    }
}

/// Body of a `GET /users` response.
#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: Vec<Record>,
    total: usize,
}

/// Body of an unsuccessful response.
#[derive(Debug, Deserialize)]
struct Rejection {
    message: String,
}

/// [`User`] record as represented on the wire.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct Record {
    id: user::Id,
    first_name: Name,
    last_name: Name,
    username: Username,
    email: Email,
    #[serde(default)]
    gender: Gender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<AvatarUrl>,
    role: Role,
}

impl From<Record> for User {
    fn from(record: Record) -> Self {
        let Record {
            id,
            first_name,
            last_name,
            username,
            email,
            gender,
            image,
            role,
        } = record;
        Self {
            id,
            first_name,
            last_name,
            avatar_url: image
                .unwrap_or_else(|| AvatarUrl::derive_from(&username)),
            username,
            email,
            gender,
            role,
        }
    }
}

impl From<User> for Record {
    fn from(user: User) -> Self {
        let User {
            id,
            first_name,
            last_name,
            username,
            email,
            gender,
            avatar_url,
            role,
        } = user;
        Self {
            id,
            first_name,
            last_name,
            username,
            email,
            gender,
            image: Some(avatar_url),
            role,
        }
    }
}
