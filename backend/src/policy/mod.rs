//! Pure participation rules. Nothing in here touches a store; services call
//! these under the hunt lock and persist the resulting state.

pub mod capacity;
pub mod payment;

pub use capacity::{decide_join_outcome, entry_state, free_slots, has_free_slot, JoinOutcome};
