//! Route handlers.
//!
//! `auth` owns the passcode flow, session tokens and throttling; `notes` and
//! `user` only consume the principal it resolves.

pub mod auth;
pub mod health;
pub mod notes;
pub mod root;
pub mod user;
