// Service exports
pub mod memory;
pub mod store;

pub use memory::{InMemoryMeetStore, InMemoryUserStore, SearchPool};
pub use store::{MeetStore, SearchStore, StoreError, UserStore};
