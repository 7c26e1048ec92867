//! Single-session support dashboard for structured student exercises.
//!
//! The crate holds the session logic (clock, profile, emotion analysis,
//! feedback, rewards, vocal training, materials) and a small HTTP surface
//! that a browser UI drives one render at a time.

pub mod activity_log;
pub mod audio;
pub mod config;
pub mod dashboard;
pub mod emotion;
pub mod materials;
pub mod rewards;
pub mod server;
pub mod session;

pub use dashboard::SupportHub;
