//! [`Args`] definitions.

use clap::{Parser, Subcommand};
use service::domain::user::{self, Role};

/// Console front-end of the ID Brasil dashboard.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    /// [`Cmd`] to run.
    #[command(subcommand)]
    pub cmd: Cmd,
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// Errors if failed to parse command line arguments.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

/// Command to run.
#[derive(Clone, Debug, Subcommand)]
pub enum Cmd {
    /// Logs in with the provided credentials.
    Login {
        /// Username to log in with.
        username: user::Username,

        /// Password to log in with.
        #[arg(short, long)]
        password: user::Password,
    },

    /// Logs out, forgetting the stored session.
    Logout,

    /// Prints the status of the current session.
    Status,

    /// Renews the current session right away.
    Renew,

    /// Reloads and prints the profile of the logged-in user.
    Profile,

    /// Lists the users visible to the logged-in user.
    Users {
        /// Re-fetch the users even if the cached ones are fresh.
        #[arg(long)]
        refresh: bool,
    },

    /// Prints a single user.
    User {
        /// ID of the user.
        id: user::Id,
    },

    /// Adds a new user.
    AddUser {
        /// First name of the user.
        #[arg(long)]
        first_name: user::Name,

        /// Last name of the user.
        #[arg(long)]
        last_name: user::Name,

        /// Username of the user.
        #[arg(long)]
        username: user::Username,

        /// Email of the user.
        #[arg(long)]
        email: user::Email,

        /// Gender of the user: `male`, `female` or `other`.
        #[arg(long, default_value = "other")]
        gender: user::Gender,

        /// Role of the user.
        #[arg(long, default_value = "user")]
        role: Role,
    },

    /// Edits an existing user.
    EditUser {
        /// ID of the user.
        id: user::Id,

        /// New first name.
        #[arg(long)]
        first_name: Option<user::Name>,

        /// New last name.
        #[arg(long)]
        last_name: Option<user::Name>,

        /// New username.
        #[arg(long)]
        username: Option<user::Username>,

        /// New email.
        #[arg(long)]
        email: Option<user::Email>,

        /// New gender.
        #[arg(long)]
        gender: Option<user::Gender>,

        /// New role.
        #[arg(long)]
        role: Option<Role>,
    },

    /// Deletes an existing user.
    DeleteUser {
        /// ID of the user.
        id: user::Id,
    },

    /// Keeps the current session alive until interrupted or ended.
    Watch,
}
