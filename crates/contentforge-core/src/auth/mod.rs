//! Hosted auth and session keepalive

pub mod client;
pub mod session;

pub use client::{AuthClient, SignUpOutcome};
pub use session::{
    Session, SessionKeeper, SessionRefresher, SkipReason, User, ValidationOutcome,
};
