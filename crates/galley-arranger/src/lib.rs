//! Feature arrangement for Galley.
//!
//! Turns each resolved config into an ordered plan of branches and batches,
//! then replays the plan to a [`handler::ProvisionedConfigHandler`] through
//! a state machine that rejects out-of-branch events.

pub mod arrange;
pub mod feature_id;
pub mod handler;
pub mod replay;
