//! Row types for hunts, participants and users.
//!
//! Persistence lives behind the store traits in `crate::repositories`; these
//! types carry the per-row rules (organizer checks, start gating, response
//! mapping) shared by every store.

pub mod hunt;
pub mod participant;
pub mod user;

#[cfg(test)]
mod tests;

pub use hunt::{Hunt, HuntCounts};
pub use participant::{Participant, ParticipationState};
pub use user::User;
