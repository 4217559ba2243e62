//! Campus Meet - meet-matching engine for the campus coffee meets service
//!
//! Students submit search criteria and are paired with a mutually compatible
//! peer into a time-boxed meet. This library holds the matching and meet
//! lifecycle rules; users, the search pool and meet history are reached
//! through storage traits so any backend can be plugged in.

pub mod config;
pub mod core;
pub mod models;
pub mod services;
pub mod telemetry;

// Re-export commonly used types
pub use crate::config::{MatchingSettings, Settings};
pub use crate::core::{is_compatible, Candidate, Clock, ManualClock, MatchingEngine, MeetObserver};
pub use crate::models::{CancelStatus, CurrentMeet, Meet, MeetStatus, SearchOutcome, SearchParams, User};
pub use crate::services::{InMemoryMeetStore, InMemoryUserStore, SearchPool, StoreError};
