use chrono::Duration;
use crate::models::{Meet, UserId};
use crate::services::StoreError;

/// Receives notable engine events
///
/// The engine reports through this trait instead of logging inline. All
/// methods default to doing nothing.
pub trait MeetObserver: Send + Sync {
    fn user_unknown(&self, _user: UserId, _operation: &'static str) {}

    fn collaborator_unavailable(&self, _operation: &'static str, _error: &StoreError) {}

    fn invalid_params(&self, _user: UserId, _reason: &str) {}

    fn already_meeting(&self, _user: UserId, _meet: &Meet) {}

    fn already_searching(&self, _user: UserId) {}

    fn pooled(&self, _user: UserId, _pool_size: usize) {}

    fn matched(&self, _meet: &Meet) {}

    /// A compatible entry was claimed by someone else before we could
    fn match_contended(&self, _user: UserId, _candidate: UserId) {}

    /// A claimed entry went back to the pool because its meet was not saved
    fn claim_restored(&self, _user: UserId) {}

    fn lifetime_out_of_range(&self, _user: UserId, _lifetime: Duration) {}

    fn search_cancelled(&self, _user: UserId) {}

    fn meet_finished(&self, _meet: &Meet) {}
}

/// Observer that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MeetObserver for NoopObserver {}

/// Observer that emits structured `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl MeetObserver for TracingObserver {
    fn user_unknown(&self, user: UserId, operation: &'static str) {
        tracing::warn!(user_id = user, operation, "User not found");
    }

    fn collaborator_unavailable(&self, operation: &'static str, error: &StoreError) {
        tracing::error!(operation, %error, "Storage collaborator unavailable");
    }

    fn invalid_params(&self, user: UserId, reason: &str) {
        tracing::info!(user_id = user, reason, "Rejected search params");
    }

    fn already_meeting(&self, user: UserId, meet: &Meet) {
        tracing::debug!(user_id = user, meet_id = %meet.id, "User already has an active meet");
    }

    fn already_searching(&self, user: UserId) {
        tracing::debug!(user_id = user, "User already in search pool");
    }

    fn pooled(&self, user: UserId, pool_size: usize) {
        tracing::info!(user_id = user, pool_size, "User added to search pool");
    }

    fn matched(&self, meet: &Meet) {
        tracing::info!(
            meet_id = %meet.id,
            user1 = meet.user1.id,
            user2 = meet.user2.id,
            expires_at = %meet.expires_at,
            "Meet created"
        );
    }

    fn match_contended(&self, user: UserId, candidate: UserId) {
        tracing::debug!(user_id = user, candidate, "Candidate claimed concurrently, rescanning");
    }

    fn claim_restored(&self, user: UserId) {
        tracing::warn!(user_id = user, "Meet not saved, search returned to pool");
    }

    fn lifetime_out_of_range(&self, user: UserId, lifetime: Duration) {
        tracing::error!(user_id = user, lifetime_ms = lifetime.num_milliseconds(), "Meet expiry out of range");
    }

    fn search_cancelled(&self, user: UserId) {
        tracing::debug!(user_id = user, "Search cancelled");
    }

    fn meet_finished(&self, meet: &Meet) {
        tracing::debug!(meet_id = %meet.id, "Meet finished");
    }
}
