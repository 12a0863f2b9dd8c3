//! Per-user notification preference cache.
//!
//! Read-through TTL cache of the four category booleans. TTL expiry is the
//! primary eviction mechanism; preference updates additionally invalidate the
//! entry synchronously so a read after an update never observes the
//! pre-update value. Duplicate population by concurrent misses is harmless
//! since entries are idempotent projections of the store.

use koinonia_db::entities::notification::NotificationCategory;
use koinonia_db::entities::notification_preference;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// A user's notification-category booleans. Absent store rows resolve to the
/// default (everything enabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryPreferences {
    pub direct_message: bool,
    pub community: bool,
    pub forum: bool,
    pub feed: bool,
}

impl Default for CategoryPreferences {
    fn default() -> Self {
        Self {
            direct_message: true,
            community: true,
            forum: true,
            feed: true,
        }
    }
}

impl CategoryPreferences {
    /// Whether notifications of `category` are enabled.
    #[must_use]
    pub const fn allows(&self, category: &NotificationCategory) -> bool {
        match category {
            NotificationCategory::DirectMessage => self.direct_message,
            NotificationCategory::Community => self.community,
            NotificationCategory::Forum => self.forum,
            NotificationCategory::Feed => self.feed,
        }
    }
}

impl From<&notification_preference::Model> for CategoryPreferences {
    fn from(model: &notification_preference::Model) -> Self {
        Self {
            direct_message: model.direct_message,
            community: model.community,
            forum: model.forum,
            feed: model.feed,
        }
    }
}

/// Cache abstraction so the backing store can be an in-process map in a
/// single instance or an external cache in a multi-instance deployment. The
/// invalidate-on-write contract holds regardless of backing store.
pub trait PreferenceCache: Send + Sync {
    /// Get the cached preferences for a user, if present and fresh.
    fn get(&self, user_id: &str) -> Option<CategoryPreferences>;

    /// Insert or refresh the entry for a user.
    fn set(&self, user_id: &str, prefs: CategoryPreferences);

    /// Drop the entry for a user.
    fn invalidate(&self, user_id: &str);
}

/// In-process shared-memory cache with TTL expiry.
pub struct InMemoryPreferenceCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, CategoryPreferences)>>,
}

impl InMemoryPreferenceCache {
    /// Create a cache with the given entry TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl PreferenceCache for InMemoryPreferenceCache {
    fn get(&self, user_id: &str) -> Option<CategoryPreferences> {
        let entries = self.entries.read().ok()?;
        let (inserted_at, prefs) = entries.get(user_id)?;
        if inserted_at.elapsed() >= self.ttl {
            return None;
        }
        Some(*prefs)
    }

    fn set(&self, user_id: &str, prefs: CategoryPreferences) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(user_id.to_string(), (Instant::now(), prefs));
        }
    }

    fn invalidate(&self, user_id: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(user_id);
        }
    }
}

/// Wrapper for boxed `PreferenceCache` trait object.
pub type PreferenceCacheService = Arc<dyn PreferenceCache>;
