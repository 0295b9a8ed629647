use coachdesk_core::models::UserRole;
use coachdesk_core::{Config, TenantId};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

type CacheKey = (Option<TenantId>, String);

struct CachedRole {
    role: UserRole,
    stored_at: Instant,
}

struct CacheState {
    entries: LruCache<CacheKey, CachedRole>,
    /// Bumped by every invalidation. A resolution that started under an older
    /// generation must not be stored.
    generation: u64,
}

/// Bounded cache of resolved roles keyed by (tenant, user).
///
/// Entries older than the TTL are treated as absent and evicted on lookup.
pub struct RoleCache {
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl RoleCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                generation: 0,
            }),
        }
    }

    /// Build the cache described by the configuration; `None` when the TTL
    /// is zero or the capacity is zero.
    pub fn from_config(config: &Config) -> Option<Self> {
        let ttl = config.role_cache_ttl()?;
        let capacity = NonZeroUsize::new(config.role_cache_capacity)?;
        Some(Self::new(capacity, ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic while holding the lock cannot leave an entry half-written.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, tenant_id: Option<&TenantId>, user_id: &str) -> Option<UserRole> {
        let key = (tenant_id.cloned(), user_id.to_string());
        let mut state = self.lock();
        let cached = state
            .entries
            .get(&key)
            .map(|entry| (entry.stored_at.elapsed() < self.ttl, entry.role.clone()));
        match cached {
            Some((true, role)) => Some(role),
            Some((false, _)) => {
                state.entries.pop(&key);
                None
            }
            None => None,
        }
    }

    /// Current invalidation generation. Read it before resolving a role and
    /// hand it to [`RoleCache::insert_if_current`].
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn insert(&self, tenant_id: Option<&TenantId>, user_id: &str, role: UserRole) {
        let mut state = self.lock();
        Self::put(&mut state, tenant_id, user_id, role);
    }

    /// Store the role only if no invalidation happened since `generation` was
    /// read. Returns whether the entry was stored.
    pub fn insert_if_current(
        &self,
        tenant_id: Option<&TenantId>,
        user_id: &str,
        role: UserRole,
        generation: u64,
    ) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        Self::put(&mut state, tenant_id, user_id, role);
        true
    }

    fn put(state: &mut CacheState, tenant_id: Option<&TenantId>, user_id: &str, role: UserRole) {
        state.entries.put(
            (tenant_id.cloned(), user_id.to_string()),
            CachedRole {
                role,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every cached entry for a user, across all tenants, and fence off
    /// resolutions already in flight.
    pub fn invalidate_user(&self, user_id: &str) {
        let mut state = self.lock();
        state.generation = state.generation.wrapping_add(1);
        let stale: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|((_, cached_user), _)| cached_user == user_id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            state.entries.pop(&key);
        }
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation = state.generation.wrapping_add(1);
        state.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
