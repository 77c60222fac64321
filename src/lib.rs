//! Feedsync Library
//!
//! Client for a streaming market-data dissemination service: reassembles
//! fixed-size record frames from the primary TCP stream, detects sequence
//! gaps, recovers missing records over short-lived resend connections, and
//! freezes the complete record set for persistence.

pub mod feed;
pub mod output;

pub use feed::{FeedClientConfig, FeedSession, Record, SessionOutcome};
