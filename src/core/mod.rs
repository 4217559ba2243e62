// Core algorithm exports
pub mod clock;
pub mod compatibility;
pub mod engine;
pub mod lifecycle;
pub mod observer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compatibility::{is_compatible, Candidate};
pub use engine::MatchingEngine;
pub use lifecycle::Transition;
pub use observer::{MeetObserver, NoopObserver, TracingObserver};
