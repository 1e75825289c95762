//! Domain definitions.

pub mod roster;
pub mod user;

pub use self::{
    roster::Roster,
    user::{Role, Session, User},
};
