use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::models::{Meet, Search, User, UserId};
use crate::services::store::{MeetStore, SearchStore, StoreError, UserStore};

/// Availability switch shared by the in-memory stores so callers can
/// simulate a collaborator going away.
#[derive(Debug)]
struct Availability {
    online: AtomicBool,
    name: &'static str,
}

impl Availability {
    fn new(name: &'static str) -> Self {
        Self {
            online: AtomicBool::new(true),
            name,
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!("{} is offline", self.name)))
        }
    }

    fn set(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }
}

/// In-memory user directory
#[derive(Debug)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
    availability: Availability,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            availability: Availability::new("user store"),
        }
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u)).collect()),
            availability: Availability::new("user store"),
        }
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    pub fn set_available(&self, online: bool) {
        self.availability.set(online);
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.availability.check()?;
        Ok(self.users.read().await.get(&id).cloned())
    }
}

/// In-memory pool of pending searches
///
/// Entries keep their insertion order, so a scan visits the oldest
/// searcher first.
#[derive(Debug)]
pub struct SearchPool {
    entries: RwLock<Vec<Search>>,
    availability: Availability,
}

impl SearchPool {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            availability: Availability::new("search pool"),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn set_available(&self, online: bool) {
        self.availability.set(online);
    }
}

impl Default for SearchPool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchStore for SearchPool {
    async fn find_by_finder(&self, finder: UserId) -> Result<Option<Search>, StoreError> {
        self.availability.check()?;
        let entries = self.entries.read().await;
        Ok(entries.iter().find(|s| s.finder.id == finder).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Search>, StoreError> {
        self.availability.check()?;
        Ok(self.entries.read().await.clone())
    }

    async fn save(&self, search: Search) -> Result<bool, StoreError> {
        self.availability.check()?;
        let mut entries = self.entries.write().await;

        // Existence check and insert happen under the same write guard
        if entries.iter().any(|s| s.finder.id == search.finder.id) {
            return Ok(false);
        }

        // Restored entries carry an older timestamp and slot back in place
        let index = entries.partition_point(|s| s.created_at <= search.created_at);
        entries.insert(index, search);
        Ok(true)
    }

    async fn delete(&self, finder: UserId) -> Result<bool, StoreError> {
        self.availability.check()?;
        let mut entries = self.entries.write().await;

        match entries.iter().position(|s| s.finder.id == finder) {
            Some(index) => {
                entries.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory meet table
#[derive(Debug)]
pub struct InMemoryMeetStore {
    meets: RwLock<Vec<Meet>>,
    writes: AtomicUsize,
    availability: Availability,
}

impl InMemoryMeetStore {
    pub fn new() -> Self {
        Self {
            meets: RwLock::new(Vec::new()),
            writes: AtomicUsize::new(0),
            availability: Availability::new("meet store"),
        }
    }

    /// Number of `save` calls served so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }

    pub async fn len(&self) -> usize {
        self.meets.read().await.len()
    }

    /// Remove a meet outright (administrative cleanup)
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut meets = self.meets.write().await;
        let before = meets.len();
        meets.retain(|m| m.id != id);
        meets.len() != before
    }

    pub fn set_available(&self, online: bool) {
        self.availability.set(online);
    }
}

impl Default for InMemoryMeetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MeetStore for InMemoryMeetStore {
    async fn find_by_user(&self, user: UserId) -> Result<Vec<Meet>, StoreError> {
        self.availability.check()?;
        let meets = self.meets.read().await;
        Ok(meets.iter().filter(|m| m.involves(user)).cloned().collect())
    }

    async fn find_all(&self) -> Result<Vec<Meet>, StoreError> {
        self.availability.check()?;
        Ok(self.meets.read().await.clone())
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        self.availability.check()?;
        Ok(self.meets.read().await.iter().any(|m| m.id == id))
    }

    async fn save(&self, meet: Meet) -> Result<(), StoreError> {
        self.availability.check()?;
        let mut meets = self.meets.write().await;

        match meets.iter_mut().find(|m| m.id == meet.id) {
            Some(existing) => *existing = meet,
            None => meets.push(meet),
        }

        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
