// Model exports
pub mod domain;
pub mod status;

pub use domain::{Degree, Gender, Meet, MeetStatus, Search, SearchParams, User, UserId};
pub use status::{CancelStatus, CurrentMeet, SearchOutcome};
