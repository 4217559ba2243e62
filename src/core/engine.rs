use chrono::Duration;
use std::sync::Arc;
use tokio::sync::Mutex;
use validator::Validate;
use crate::config::MatchingSettings;
use crate::core::{
    clock::{Clock, SystemClock},
    compatibility::{is_compatible, Candidate},
    lifecycle::Transition,
    observer::{MeetObserver, TracingObserver},
};
use crate::models::{CancelStatus, CurrentMeet, Meet, MeetStatus, Search, SearchOutcome, SearchParams, UserId};
use crate::services::{MeetStore, SearchStore, StoreError, UserStore};

/// Meet-matching orchestrator
///
/// Owns the rules that move a user between idle, searching and meeting:
///
/// 1. A user with an active meet cannot search.
/// 2. A searcher is paired with the oldest pooled entry that is mutually
///    compatible, or joins the pool if none is.
/// 3. Meets expire lazily: every read re-evaluates the expiry and persists
///    the switch to `Finished`.
///
/// Pool mutations are serialized through an internal lock. The store's
/// insert-if-absent and delete-returning semantics keep claims exclusive
/// when several engines share one store. A claim whose meet cannot be
/// written is returned to the pool.
pub struct MatchingEngine {
    users: Arc<dyn UserStore>,
    searches: Arc<dyn SearchStore>,
    meets: Arc<dyn MeetStore>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn MeetObserver>,
    meet_lifetime: Duration,
    pool_lock: Mutex<()>,
}

impl MatchingEngine {
    pub fn new(
        users: Arc<dyn UserStore>,
        searches: Arc<dyn SearchStore>,
        meets: Arc<dyn MeetStore>,
        clock: Arc<dyn Clock>,
        observer: Arc<dyn MeetObserver>,
        meet_lifetime: Duration,
    ) -> Self {
        Self {
            users,
            searches,
            meets,
            clock,
            observer,
            meet_lifetime,
            pool_lock: Mutex::new(()),
        }
    }

    /// Build an engine on the wall clock with tracing output
    pub fn from_settings(
        users: Arc<dyn UserStore>,
        searches: Arc<dyn SearchStore>,
        meets: Arc<dyn MeetStore>,
        settings: &MatchingSettings,
    ) -> Self {
        Self::new(
            users,
            searches,
            meets,
            Arc::new(SystemClock),
            Arc::new(TracingObserver),
            settings.meet_lifetime(),
        )
    }

    pub fn meet_lifetime(&self) -> Duration {
        self.meet_lifetime
    }

    /// Number of pending searches
    pub async fn pool_size(&self) -> Result<usize, StoreError> {
        Ok(self.searches.find_all().await?.len())
    }

    /// What the user is doing right now
    ///
    /// A pending search wins over any meet record. Otherwise the meet with
    /// the latest expiry is evaluated and returned unless it has finished.
    /// Unknown users get `CurrentMeet::None`.
    pub async fn get_current_meet(&self, user_id: UserId) -> Result<CurrentMeet, StoreError> {
        if !self.users.exists(user_id).await? {
            self.observer.user_unknown(user_id, "get_current_meet");
            return Ok(CurrentMeet::None);
        }

        if self.searches.find_by_finder(user_id).await?.is_some() {
            return Ok(CurrentMeet::Searching);
        }

        match self.latest_meet(user_id).await? {
            Some(meet) if !meet.is_finished() => Ok(CurrentMeet::Active(meet)),
            _ => Ok(CurrentMeet::None),
        }
    }

    /// All finished meets of the user, most recent first
    pub async fn get_finished_meets(&self, user_id: UserId) -> Result<Vec<Meet>, StoreError> {
        if !self.users.exists(user_id).await? {
            self.observer.user_unknown(user_id, "get_finished_meets");
            return Ok(Vec::new());
        }

        let mut finished = Vec::new();
        for mut meet in self.meets.find_by_user(user_id).await? {
            self.refresh(&mut meet).await?;
            if meet.is_finished() {
                finished.push(meet);
            }
        }

        finished.sort_by(|a, b| b.expires_at.cmp(&a.expires_at));
        Ok(finished)
    }

    /// Withdraw the user's pending search
    pub async fn cancel_search(&self, user_id: UserId) -> Result<CancelStatus, StoreError> {
        if !self.users.exists(user_id).await? {
            self.observer.user_unknown(user_id, "cancel_search");
            return Ok(CancelStatus::Fail);
        }

        let _guard = self.pool_lock.lock().await;

        if self.searches.delete(user_id).await? {
            self.observer.search_cancelled(user_id);
            Ok(CancelStatus::Success)
        } else {
            Ok(CancelStatus::NotAllowed)
        }
    }

    /// Look for a meet with the given criteria
    ///
    /// Returns `Active` if the user already meets someone or a partner was
    /// found, `Search` if the user waits in the pool, and `Error` for unknown
    /// users, invalid criteria or unreachable storage. A user who is already
    /// pooled keeps the criteria they first submitted.
    pub async fn search_meet(
        &self,
        user_id: UserId,
        params: SearchParams,
    ) -> Result<SearchOutcome, StoreError> {
        match self.try_search_meet(user_id, params).await {
            Err(e) if e.is_unavailable() => {
                self.observer.collaborator_unavailable("search_meet", &e);
                Ok(SearchOutcome::Error)
            }
            other => other,
        }
    }

    async fn try_search_meet(
        &self,
        user_id: UserId,
        params: SearchParams,
    ) -> Result<SearchOutcome, StoreError> {
        let Some(user) = self.users.find_by_id(user_id).await? else {
            self.observer.user_unknown(user_id, "search_meet");
            return Ok(SearchOutcome::Error);
        };

        if let Err(errors) = params.validate() {
            self.observer.invalid_params(user_id, &errors.to_string());
            return Ok(SearchOutcome::Error);
        }

        let _guard = self.pool_lock.lock().await;

        if let Some(meet) = self.latest_meet(user_id).await? {
            if meet.status == MeetStatus::Active {
                self.observer.already_meeting(user_id, &meet);
                return Ok(SearchOutcome::Active);
            }
        }

        if self.searches.find_by_finder(user_id).await?.is_some() {
            self.observer.already_searching(user_id);
            return Ok(SearchOutcome::Search);
        }

        loop {
            let pool = self.searches.find_all().await?;
            let seeker = Candidate::new(&user, &params);

            // The caller's own entry can still show up here when another
            // engine sharing the store pooled them after the check above
            let matched = pool
                .iter()
                .filter(|entry| entry.finder.id != user_id)
                .find(|entry| is_compatible(seeker, Candidate::new(&entry.finder, &entry.params)))
                .cloned();

            let Some(entry) = matched else {
                let now = self.clock.now();
                if self.searches.save(Search::new(user, params, now)).await? {
                    self.observer.pooled(user_id, pool.len() + 1);
                } else {
                    self.observer.already_searching(user_id);
                }
                return Ok(SearchOutcome::Search);
            };

            let now = self.clock.now();
            let Some(expires_at) = now.checked_add_signed(self.meet_lifetime) else {
                self.observer.lifetime_out_of_range(user_id, self.meet_lifetime);
                return Ok(SearchOutcome::Error);
            };

            // Only the caller whose delete removes the entry owns the match
            if !self.searches.delete(entry.finder.id).await? {
                self.observer.match_contended(user_id, entry.finder.id);
                continue;
            }

            let meet = Meet::new(user, entry.finder.clone(), now, expires_at);
            if let Err(e) = self.meets.save(meet.clone()).await {
                self.restore(entry).await?;
                return Err(e);
            }

            self.observer.matched(&meet);
            return Ok(SearchOutcome::Active);
        }
    }

    /// Put a claimed entry back after the meet could not be written
    ///
    /// The entry keeps its original `created_at`, so it regains its place in
    /// the pool. `Conflict` means the partner is now neither pooled nor
    /// meeting.
    async fn restore(&self, entry: Search) -> Result<(), StoreError> {
        let finder = entry.finder.id;
        match self.searches.save(entry).await {
            Ok(_) => {
                self.observer.claim_restored(finder);
                Ok(())
            }
            Err(e) => Err(StoreError::Conflict(format!(
                "claimed search of user {} could not be restored: {}",
                finder, e
            ))),
        }
    }

    /// The user's meet with the latest expiry, after lazy evaluation
    async fn latest_meet(&self, user_id: UserId) -> Result<Option<Meet>, StoreError> {
        let latest = self
            .meets
            .find_by_user(user_id)
            .await?
            .into_iter()
            .max_by_key(|meet| meet.expires_at);

        match latest {
            Some(mut meet) => {
                self.refresh(&mut meet).await?;
                Ok(Some(meet))
            }
            None => Ok(None),
        }
    }

    /// Apply lazy expiry and persist the transition if there was one
    async fn refresh(&self, meet: &mut Meet) -> Result<(), StoreError> {
        if meet.evaluate(self.clock.now()) == Transition::Finished {
            // A meet removed from storage meanwhile is not written back
            if self.meets.exists(meet.id).await? {
                self.meets.save(meet.clone()).await?;
            }
            self.observer.meet_finished(meet);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::observer::NoopObserver;
    use crate::models::{Degree, Gender, User};
    use crate::services::{InMemoryMeetStore, InMemoryUserStore, SearchPool};
    use async_trait::async_trait;
    use chrono::Utc;
    use uuid::Uuid;

    struct Fixture {
        engine: MatchingEngine,
        pool: Arc<SearchPool>,
        meets: Arc<InMemoryMeetStore>,
        clock: Arc<ManualClock>,
    }

    fn create_user(id: UserId, faculty: &str, course: u8) -> User {
        User {
            id,
            email: format!("{}@edu.hse.ru", id),
            first_name: Some(format!("Student {}", id)),
            last_name: None,
            faculty: faculty.to_string(),
            gender: Gender::Female,
            degree: Degree::Bachelor,
            course,
            contacts: vec![format!("@student{}", id)],
        }
    }

    fn params_for(faculty: &str, min_course: u8, max_course: u8) -> SearchParams {
        SearchParams {
            faculties: vec![faculty.to_string()],
            genders: vec![Gender::Female],
            degrees: vec![Degree::Bachelor],
            min_course,
            max_course,
        }
    }

    fn fixture(users: Vec<User>) -> Fixture {
        let pool = Arc::new(SearchPool::new());
        let meets = Arc::new(InMemoryMeetStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = MatchingEngine::new(
            Arc::new(InMemoryUserStore::with_users(users)),
            pool.clone(),
            meets.clone(),
            clock.clone(),
            Arc::new(NoopObserver),
            Duration::hours(1),
        );
        Fixture { engine, pool, meets, clock }
    }

    fn engine_with(
        users: Vec<User>,
        searches: Arc<dyn SearchStore>,
        meets: Arc<dyn MeetStore>,
        lifetime: Duration,
    ) -> MatchingEngine {
        MatchingEngine::new(
            Arc::new(InMemoryUserStore::with_users(users)),
            searches,
            meets,
            Arc::new(ManualClock::new(Utc::now())),
            Arc::new(NoopObserver),
            lifetime,
        )
    }

    /// Meet store that has no meets and refuses every write. When it holds
    /// the pool, the pool goes offline together with it.
    struct BrokenMeetStore {
        pool: Option<Arc<SearchPool>>,
    }

    #[async_trait]
    impl MeetStore for BrokenMeetStore {
        async fn find_by_user(&self, _user: UserId) -> Result<Vec<Meet>, StoreError> {
            Ok(Vec::new())
        }

        async fn find_all(&self) -> Result<Vec<Meet>, StoreError> {
            Ok(Vec::new())
        }

        async fn exists(&self, _id: Uuid) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn save(&self, _meet: Meet) -> Result<(), StoreError> {
            if let Some(pool) = &self.pool {
                pool.set_available(false);
            }
            Err(StoreError::Unavailable("meet store down".to_string()))
        }
    }

    /// Pool view that misses one finder on lookup but still lists their entry,
    /// as a store shared with another engine can between two reads
    struct LaggingPool {
        inner: Arc<SearchPool>,
        hidden: UserId,
    }

    #[async_trait]
    impl SearchStore for LaggingPool {
        async fn find_by_finder(&self, finder: UserId) -> Result<Option<Search>, StoreError> {
            if finder == self.hidden {
                return Ok(None);
            }
            self.inner.find_by_finder(finder).await
        }

        async fn find_all(&self) -> Result<Vec<Search>, StoreError> {
            self.inner.find_all().await
        }

        async fn save(&self, search: Search) -> Result<bool, StoreError> {
            self.inner.save(search).await
        }

        async fn delete(&self, finder: UserId) -> Result<bool, StoreError> {
            self.inner.delete(finder).await
        }
    }

    #[tokio::test]
    async fn test_first_searcher_is_pooled() {
        let f = fixture(vec![create_user(1, "CS", 2)]);

        let outcome = f.engine.search_meet(1, params_for("CS", 1, 3)).await.unwrap();

        assert_eq!(outcome, SearchOutcome::Search);
        assert_eq!(f.pool.len().await, 1);
        assert_eq!(f.engine.get_current_meet(1).await.unwrap(), CurrentMeet::Searching);
    }

    #[tokio::test]
    async fn test_pair_forms_meet() {
        let f = fixture(vec![create_user(1, "CS", 2), create_user(2, "CS", 2)]);

        f.engine.search_meet(1, params_for("CS", 1, 3)).await.unwrap();
        let outcome = f.engine.search_meet(2, params_for("CS", 1, 3)).await.unwrap();

        assert_eq!(outcome, SearchOutcome::Active);
        assert!(f.pool.is_empty().await);

        let current = f.engine.get_current_meet(1).await.unwrap();
        let meet = current.meet().expect("meet should be active");
        assert_eq!(meet.expires_at, f.clock.now() + Duration::hours(1));
        assert_eq!(meet.partner_of(1).map(|u| u.id), Some(2));
    }

    #[tokio::test]
    async fn test_pooled_user_keeps_first_params() {
        let f = fixture(vec![create_user(1, "CS", 2), create_user(2, "Law", 2)]);

        f.engine.search_meet(1, params_for("CS", 1, 3)).await.unwrap();
        let again = f.engine.search_meet(1, params_for("Law", 1, 3)).await.unwrap();
        assert_eq!(again, SearchOutcome::Search);

        let entry = f.pool.find_by_finder(1).await.unwrap().unwrap();
        assert_eq!(entry.params.faculties, vec!["CS".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_params_rejected_without_side_effects() {
        let f = fixture(vec![create_user(1, "CS", 2)]);

        let outcome = f.engine.search_meet(1, params_for("CS", 4, 1)).await.unwrap();

        assert_eq!(outcome, SearchOutcome::Error);
        assert!(f.pool.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_meet_persisted_as_finished() {
        let f = fixture(vec![create_user(1, "CS", 2), create_user(2, "CS", 2)]);
        f.engine.search_meet(1, params_for("CS", 1, 3)).await.unwrap();
        f.engine.search_meet(2, params_for("CS", 1, 3)).await.unwrap();

        f.clock.advance(Duration::hours(1));

        assert!(f.engine.get_current_meet(2).await.unwrap().is_none());
        let stored = f.meets.find_by_user(1).await.unwrap();
        assert_eq!(stored[0].status, MeetStatus::Finished);
    }

    #[tokio::test]
    async fn test_removed_meet_not_written_back() {
        let f = fixture(vec![create_user(1, "CS", 2), create_user(2, "CS", 2)]);
        f.engine.search_meet(1, params_for("CS", 1, 3)).await.unwrap();
        f.engine.search_meet(2, params_for("CS", 1, 3)).await.unwrap();

        let mut meet = f.meets.find_by_user(1).await.unwrap().remove(0);
        assert!(f.meets.remove(meet.id).await);

        f.clock.advance(Duration::hours(2));
        f.engine.refresh(&mut meet).await.unwrap();

        assert!(meet.is_finished());
        assert_eq!(f.meets.len().await, 0);
    }

    #[tokio::test]
    async fn test_unavailable_pool_reports_error() {
        let f = fixture(vec![create_user(1, "CS", 2)]);
        f.pool.set_available(false);

        let outcome = f.engine.search_meet(1, params_for("CS", 1, 3)).await.unwrap();
        assert_eq!(outcome, SearchOutcome::Error);

        assert!(f.engine.cancel_search(1).await.unwrap_err().is_unavailable());
    }

    #[tokio::test]
    async fn test_failed_meet_save_returns_partner_to_pool() {
        let pool = Arc::new(SearchPool::new());
        let engine = engine_with(
            vec![create_user(1, "CS", 2), create_user(2, "CS", 2)],
            pool.clone(),
            Arc::new(BrokenMeetStore { pool: None }),
            Duration::hours(1),
        );
        engine.search_meet(1, params_for("CS", 1, 3)).await.unwrap();
        let queued = pool.find_by_finder(1).await.unwrap().unwrap();

        let outcome = engine.search_meet(2, params_for("CS", 1, 3)).await.unwrap();

        assert_eq!(outcome, SearchOutcome::Error);
        let restored = pool.find_by_finder(1).await.unwrap().expect("partner still pooled");
        assert_eq!(restored.created_at, queued.created_at);
        assert_eq!(pool.find_all().await.unwrap()[0].finder.id, 1);
        assert!(pool.find_by_finder(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unrestorable_claim_reports_conflict() {
        let pool = Arc::new(SearchPool::new());
        let engine = engine_with(
            vec![create_user(1, "CS", 2), create_user(2, "CS", 2)],
            pool.clone(),
            Arc::new(BrokenMeetStore { pool: Some(pool.clone()) }),
            Duration::hours(1),
        );
        engine.search_meet(1, params_for("CS", 1, 3)).await.unwrap();

        let err = engine.search_meet(2, params_for("CS", 1, 3)).await.unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(err.to_string().contains("user 1"));
    }

    #[tokio::test]
    async fn test_expiry_overflow_reports_error_and_keeps_partner() {
        let pool = Arc::new(SearchPool::new());
        let meets = Arc::new(InMemoryMeetStore::new());
        let engine = engine_with(
            vec![create_user(1, "CS", 2), create_user(2, "CS", 2)],
            pool.clone(),
            meets.clone(),
            Duration::days(100_000_000),
        );
        engine.search_meet(1, params_for("CS", 1, 3)).await.unwrap();

        let outcome = engine.search_meet(2, params_for("CS", 1, 3)).await.unwrap();

        assert_eq!(outcome, SearchOutcome::Error);
        assert!(pool.find_by_finder(1).await.unwrap().is_some());
        assert_eq!(meets.len().await, 0);
    }

    #[tokio::test]
    async fn test_own_entry_never_matched() {
        let pool = Arc::new(SearchPool::new());
        let meets = Arc::new(InMemoryMeetStore::new());
        let user = create_user(1, "CS", 2);
        pool.save(Search::new(user.clone(), params_for("CS", 1, 3), Utc::now()))
            .await
            .unwrap();
        let engine = engine_with(
            vec![user],
            Arc::new(LaggingPool { inner: pool.clone(), hidden: 1 }),
            meets.clone(),
            Duration::hours(1),
        );

        let outcome = engine.search_meet(1, params_for("CS", 1, 3)).await.unwrap();

        assert_eq!(outcome, SearchOutcome::Search);
        assert_eq!(pool.len().await, 1);
        assert_eq!(meets.len().await, 0);
    }
}
