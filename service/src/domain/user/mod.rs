//! [`User`] definitions.

pub mod role;
pub mod session;

use std::sync::LazyLock;

use derive_more::{AsRef, Display, From, FromStr, Into};
use regex::Regex;
use secrecy::{zeroize::Zeroize, CloneableSecret};
use serde::{Deserialize, Serialize};

pub use self::{
    role::{can, Action, Role},
    session::Session,
};

/// Dashboard user record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// First [`Name`] of this [`User`].
    pub first_name: Name,

    /// Last [`Name`] of this [`User`].
    pub last_name: Name,

    /// [`Username`] of this [`User`].
    pub username: Username,

    /// [`Email`] of this [`User`].
    pub email: Email,

    /// [`Gender`] of this [`User`].
    pub gender: Gender,

    /// [`AvatarUrl`] of this [`User`].
    pub avatar_url: AvatarUrl,

    /// [`Role`] of this [`User`].
    pub role: Role,
}

impl User {
    /// Returns the full name of this [`User`].
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// ID of a [`User`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(transparent)]
pub struct Id(u64);

impl Id {
    /// Returns the [`Id`] following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Name (first or last) of a [`User`].
#[derive(AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Username a [`User`] logs in with.
#[derive(AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Creates a new [`Username`] if the given `username` is valid.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Option<Self> {
        let username = username.into();
        Self::check(&username).then_some(Self(username))
    }

    /// Checks whether the given `username` is a valid [`Username`].
    fn check(username: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Username`] invariants:
        /// - Must not be empty;
        /// - Must contain only letters, digits, dots, dashes and underscores;
        /// - Must be at most 64 characters long.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[\p{L}\p{N}._-]{1,64}$").expect("valid regex")
        });

        REGEX.is_match(username.as_ref())
    }
}

impl FromStr for Username {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Username`")
    }
}

/// Password of a [`User`].
#[derive(Clone, Debug, Display, Eq, From, PartialEq)]
#[from(&str, String)]
pub struct Password(String);

impl Password {
    /// Creates a new [`Password`] if the given `password` is valid.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Option<Self> {
        let password = password.into();
        Self::check(&password).then_some(Self(password))
    }

    /// Checks whether the given `password` is a valid [`Password`].
    fn check(password: impl AsRef<str>) -> bool {
        let password = password.as_ref();
        !password.is_empty() && password.len() <= 128
    }
}

impl AsRef<str> for Password {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Password {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Password`")
    }
}

impl CloneableSecret for Password {}
impl Zeroize for Password {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Email address of a [`User`].
#[derive(AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Creates a new [`Email`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Email`].
    fn check(address: impl AsRef<str>) -> bool {
        /// Regular expression checking [`Email`] format.
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex")
        });

        REGEX.is_match(address.as_ref())
    }
}

impl FromStr for Email {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Email`")
    }
}

/// Gender of a [`User`].
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    #[display("male")]
    Male,

    /// Female.
    #[display("female")]
    Female,

    /// Not specified or not recognized.
    #[default]
    #[display("other")]
    #[serde(other)]
    Other,
}

impl FromStr for Gender {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => Err("invalid `Gender`"),
        }
    }
}

/// URL of a [`User`]'s avatar image.
#[derive(AsRef, Clone, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
#[as_ref(str, String)]
#[serde(transparent)]
pub struct AvatarUrl(String);

impl AvatarUrl {
    /// Base URL of generated avatars.
    const GENERATOR_URL: &'static str =
        "https://api.dicebear.com/7.x/avataaars/svg";

    /// Creates a new [`AvatarUrl`] pointing to the provided `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Derives an [`AvatarUrl`] of a generated avatar seeded with the provided
    /// [`Username`].
    ///
    /// The same [`Username`] always produces the same [`AvatarUrl`].
    #[must_use]
    pub fn derive_from(username: &Username) -> Self {
        Self(format!("{}?seed={username}", Self::GENERATOR_URL))
    }
}

/// Partial changes of a [`User`].
///
/// [`None`] fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct Changes {
    /// New first [`Name`].
    pub first_name: Option<Name>,

    /// New last [`Name`].
    pub last_name: Option<Name>,

    /// New [`Username`].
    pub username: Option<Username>,

    /// New [`Email`].
    pub email: Option<Email>,

    /// New [`Gender`].
    pub gender: Option<Gender>,

    /// New [`AvatarUrl`].
    pub avatar_url: Option<AvatarUrl>,

    /// New [`Role`].
    pub role: Option<Role>,
}

impl Changes {
    /// Indicates whether these [`Changes`] change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let Self {
            first_name,
            last_name,
            username,
            email,
            gender,
            avatar_url,
            role,
        } = self;
        first_name.is_none()
            && last_name.is_none()
            && username.is_none()
            && email.is_none()
            && gender.is_none()
            && avatar_url.is_none()
            && role.is_none()
    }

    /// Merges these [`Changes`] into the provided [`User`].
    pub fn apply_to(self, user: &mut User) {
        let Self {
            first_name,
            last_name,
            username,
            email,
            gender,
            avatar_url,
            role,
        } = self;
        if let Some(v) = first_name {
            user.first_name = v;
        }
        if let Some(v) = last_name {
            user.last_name = v;
        }
        if let Some(v) = username {
            user.username = v;
        }
        if let Some(v) = email {
            user.email = v;
        }
        if let Some(v) = gender {
            user.gender = v;
        }
        if let Some(v) = avatar_url {
            user.avatar_url = v;
        }
        if let Some(v) = role {
            user.role = v;
        }
    }
}

#[cfg(test)]
mod spec {
    use super::{AvatarUrl, Email, Gender, Name, Username};

    #[test]
    fn validates_names() {
        assert!(Name::new("Emily").is_some());
        assert!(Name::new("").is_none());
        assert!(Name::new(" Emily").is_none());
    }

    #[test]
    fn validates_usernames() {
        assert!(Username::new("emilys").is_some());
        assert!(Username::new("jane.doe_2").is_some());
        assert!(Username::new("").is_none());
        assert!(Username::new("with space").is_none());
    }

    #[test]
    fn validates_emails() {
        assert!(Email::new("emily.johnson@x.dummyjson.com").is_some());
        assert!(Email::new("emily").is_none());
        assert!(Email::new("emily@host").is_none());
    }

    #[test]
    fn derives_avatar_from_username() {
        let username = Username::new("emilys").unwrap();

        assert_eq!(
            AvatarUrl::derive_from(&username),
            AvatarUrl::derive_from(&username),
        );
        assert_eq!(
            AvatarUrl::derive_from(&username).to_string(),
            "https://api.dicebear.com/7.x/avataaars/svg?seed=emilys",
        );
    }

    #[test]
    fn unknown_gender_deserializes_as_other() {
        let gender: Gender = serde_json::from_str(r#""unknown""#).unwrap();

        assert_eq!(gender, Gender::Other);
    }
}
