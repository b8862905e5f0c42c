//! Request cache for REST reads.
//!
//! Every GET goes through [`QueryCache`]. Entries are raw JSON keyed by
//! resource, the user whose token fetched them, the entity id and the
//! query string. They stay fresh for the configured TTL unless a mutation
//! or a realtime event invalidates them first.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use serde_json::Value;

use emporium_core::UserId;

/// Resource families a cached query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Products,
    Product,
    Categories,
    Orders,
    Order,
    Reviews,
    Wishlists,
    Cart,
    Users,
    Notifications,
    Analytics,
    Vendors,
    Profile,
}

impl Resource {
    pub const COUNT: usize = 13;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Products,
        Self::Product,
        Self::Categories,
        Self::Orders,
        Self::Order,
        Self::Reviews,
        Self::Wishlists,
        Self::Cart,
        Self::Users,
        Self::Notifications,
        Self::Analytics,
        Self::Vendors,
        Self::Profile,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Detail resources whose entries are also dropped when their list
    /// family is invalidated.
    const fn list_family(self) -> Self {
        match self {
            Self::Product => Self::Products,
            Self::Order => Self::Orders,
            other => other,
        }
    }
}

/// Identity of one cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub resource: Resource,
    /// User whose token fetched the data; `None` for public reads.
    pub scope: Option<UserId>,
    pub id: Option<i64>,
    /// Canonical query string.
    pub params: String,
}

impl QueryKey {
    /// A public list query.
    #[must_use]
    pub fn list(resource: Resource, params: impl Into<String>) -> Self {
        Self {
            resource,
            scope: None,
            id: None,
            params: params.into(),
        }
    }

    /// A single entity.
    #[must_use]
    pub fn entity(resource: Resource, id: impl Into<i64>) -> Self {
        Self {
            resource,
            scope: None,
            id: Some(id.into()),
            params: String::new(),
        }
    }

    /// Restrict the key to one user's view.
    #[must_use]
    pub const fn scoped(mut self, scope: Option<UserId>) -> Self {
        self.scope = scope;
        self
    }
}

/// What a mutation or realtime event makes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Every query of the resource, for every user.
    Resource(Resource),
    /// One entity, for every user.
    Entity(Resource, i64),
    /// Every query of the resource fetched by one user.
    Scoped(Resource, UserId),
}

impl Invalidation {
    /// Whether a cached key is stale under this invalidation.
    #[must_use]
    pub fn matches(&self, key: &QueryKey) -> bool {
        match *self {
            Self::Resource(resource) => {
                key.resource == resource || key.resource.list_family() == resource
            }
            Self::Entity(resource, id) => key.resource == resource && key.id == Some(id),
            Self::Scoped(resource, user) => key.resource == resource && key.scope == Some(user),
        }
    }

    /// Resources that can hold entries this invalidation drops.
    fn resources(self) -> impl Iterator<Item = Resource> {
        Resource::ALL.into_iter().filter(move |r| match self {
            Self::Resource(resource) => *r == resource || r.list_family() == resource,
            Self::Entity(resource, _) | Self::Scoped(resource, _) => *r == resource,
        })
    }
}

/// Invalidation counter per resource, read before a fetch and checked
/// again before its response is cached.
pub type Generation = u64;

/// TTL-bounded JSON cache shared by every request handler.
#[derive(Clone)]
pub struct QueryCache {
    cache: Cache<QueryKey, Arc<Value>>,
    generations: Arc<[AtomicU64; Resource::COUNT]>,
}

impl QueryCache {
    #[must_use]
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
            generations: Arc::new(std::array::from_fn(|_| AtomicU64::new(0))),
        }
    }

    /// Current invalidation count of a resource.
    #[must_use]
    pub fn generation(&self, resource: Resource) -> Generation {
        self.generations[resource.index()].load(Ordering::Acquire)
    }

    fn bump(&self, resource: Resource) {
        self.generations[resource.index()].fetch_add(1, Ordering::AcqRel);
    }

    /// Cache a fetched value unless its resource was invalidated since
    /// `seen` was read. Returns whether the value was kept.
    ///
    /// The generation is checked again after the insert: an invalidation
    /// bumps before it scans, so a value inserted between the two checks
    /// is either dropped here or found by that scan.
    pub async fn insert_fresh(&self, key: QueryKey, value: Value, seen: Generation) -> bool {
        let resource = key.resource;
        if self.generation(resource) != seen {
            tracing::debug!(?key, "Discarding response fetched before an invalidation");
            return false;
        }
        self.cache.insert(key.clone(), Arc::new(value)).await;
        if self.generation(resource) != seen {
            self.cache.invalidate(&key).await;
            tracing::debug!(?key, "Discarding response fetched before an invalidation");
            return false;
        }
        true
    }

    pub async fn get(&self, key: &QueryKey) -> Option<Arc<Value>> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: QueryKey, value: Value) {
        self.cache.insert(key, Arc::new(value)).await;
    }

    /// Optimistically replace an entry with a value the backend just returned.
    pub async fn set<T: Serialize>(&self, key: QueryKey, value: &T) {
        match serde_json::to_value(value) {
            Ok(json) => self.insert(key, json).await,
            Err(e) => {
                tracing::warn!(?key, error = %e, "Could not serialize optimistic cache value");
                self.cache.invalidate(&key).await;
            }
        }
    }

    /// Drop every entry the invalidation covers. Returns how many were dropped.
    pub async fn invalidate(&self, target: Invalidation) -> usize {
        for resource in target.resources() {
            self.bump(resource);
        }

        let stale: Vec<Arc<QueryKey>> = self
            .cache
            .iter()
            .filter(|(key, _)| target.matches(key))
            .map(|(key, _)| key)
            .collect();

        for key in &stale {
            self.cache.invalidate(key.as_ref()).await;
        }

        if !stale.is_empty() {
            tracing::debug!(?target, count = stale.len(), "Invalidated cached queries");
        }
        stale.len()
    }

    pub async fn invalidate_many(&self, targets: impl IntoIterator<Item = Invalidation>) -> usize {
        let mut removed = 0;
        for target in targets {
            removed += self.invalidate(target).await;
        }
        removed
    }

    /// Rewrite cached entries of a resource in place. `patch` returns whether
    /// it changed the value; unchanged entries keep their TTL.
    pub async fn patch_entries<F>(&self, resource: Resource, mut patch: F) -> usize
    where
        F: FnMut(&mut Value) -> bool,
    {
        let entries: Vec<(Arc<QueryKey>, Arc<Value>)> = self
            .cache
            .iter()
            .filter(|(key, _)| key.resource == resource)
            .collect();

        let mut patched = 0;
        for (key, value) in entries {
            let mut value = (*value).clone();
            if patch(&mut value) {
                self.cache.insert((*key).clone(), Arc::new(value)).await;
                patched += 1;
            }
        }
        patched
    }

    pub fn invalidate_all(&self) {
        for resource in Resource::ALL {
            self.bump(resource);
        }
        self.cache.invalidate_all();
    }

    /// Approximate number of live entries.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn cache() -> QueryCache {
        QueryCache::new(Duration::from_secs(60), 100)
    }

    #[tokio::test]
    async fn test_patch_entries_rewrites_matching_values() {
        let cache = cache();
        let key = QueryKey::list(Resource::Users, "page=1");
        cache
            .insert(key.clone(), json!({"items": [{"id": 1, "role": "customer"}]}))
            .await;
        cache
            .insert(QueryKey::list(Resource::Orders, ""), json!({"items": []}))
            .await;

        let patched = cache
            .patch_entries(Resource::Users, |value| {
                value
                    .pointer_mut("/items/0/role")
                    .map(|role| *role = json!("vendor"))
                    .is_some()
            })
            .await;

        assert_eq!(patched, 1);
        assert_eq!(
            cache.get(&key).await.unwrap()["items"][0]["role"],
            json!("vendor")
        );
    }

    #[tokio::test]
    async fn test_get_after_insert() {
        let cache = cache();
        let key = QueryKey::list(Resource::Products, "page=1");
        assert!(cache.get(&key).await.is_none());

        cache.insert(key.clone(), json!({"items": []})).await;
        assert_eq!(*cache.get(&key).await.unwrap(), json!({"items": []}));
    }

    #[tokio::test]
    async fn test_resource_invalidation_covers_details() {
        let cache = cache();
        let list = QueryKey::list(Resource::Products, "page=1");
        let detail = QueryKey::entity(Resource::Product, 7);
        let other = QueryKey::list(Resource::Categories, "");
        for key in [&list, &detail, &other] {
            cache.insert(key.clone(), json!(1)).await;
        }

        let dropped = cache.invalidate(Invalidation::Resource(Resource::Products)).await;
        assert_eq!(dropped, 2);
        assert!(cache.get(&list).await.is_none());
        assert!(cache.get(&detail).await.is_none());
        assert!(cache.get(&other).await.is_some());
    }

    #[tokio::test]
    async fn test_entity_invalidation_is_narrow() {
        let cache = cache();
        let seven = QueryKey::entity(Resource::Product, 7);
        let eight = QueryKey::entity(Resource::Product, 8);
        cache.insert(seven.clone(), json!(7)).await;
        cache.insert(eight.clone(), json!(8)).await;

        cache.invalidate(Invalidation::Entity(Resource::Product, 7)).await;
        assert!(cache.get(&seven).await.is_none());
        assert!(cache.get(&eight).await.is_some());
    }

    #[tokio::test]
    async fn test_scoped_invalidation() {
        let cache = cache();
        let ada = QueryKey::list(Resource::Cart, "").scoped(Some(UserId::new(1)));
        let bob = QueryKey::list(Resource::Cart, "").scoped(Some(UserId::new(2)));
        cache.insert(ada.clone(), json!("ada")).await;
        cache.insert(bob.clone(), json!("bob")).await;

        cache
            .invalidate(Invalidation::Scoped(Resource::Cart, UserId::new(1)))
            .await;
        assert!(cache.get(&ada).await.is_none());
        assert!(cache.get(&bob).await.is_some());
    }

    #[tokio::test]
    async fn test_set_replaces_entry() {
        let cache = cache();
        let key = QueryKey::entity(Resource::Product, 3);
        cache.insert(key.clone(), json!({"name": "old"})).await;
        cache.set(key.clone(), &json!({"name": "new"})).await;
        assert_eq!(cache.get(&key).await.unwrap()["name"], "new");
    }

    #[tokio::test]
    async fn test_response_fetched_before_invalidation_is_not_cached() {
        let cache = cache();
        let key = QueryKey::list(Resource::Products, "page=1");
        let seen = cache.generation(Resource::Products);

        // The fetch is in flight while a realtime event lands.
        cache.invalidate(Invalidation::Resource(Resource::Products)).await;

        assert!(!cache.insert_fresh(key.clone(), json!("old"), seen).await);
        assert!(cache.get(&key).await.is_none());

        let seen = cache.generation(Resource::Products);
        assert!(cache.insert_fresh(key.clone(), json!("new"), seen).await);
        assert_eq!(*cache.get(&key).await.unwrap(), json!("new"));
    }

    #[tokio::test]
    async fn test_list_invalidation_bumps_detail_generation() {
        let cache = cache();
        let detail = cache.generation(Resource::Product);
        let categories = cache.generation(Resource::Categories);

        cache.invalidate(Invalidation::Resource(Resource::Products)).await;

        assert_ne!(cache.generation(Resource::Product), detail);
        assert_eq!(cache.generation(Resource::Categories), categories);
    }

    #[test]
    fn test_resource_indexes_are_distinct() {
        for (i, resource) in Resource::ALL.into_iter().enumerate() {
            assert_eq!(resource.index(), i);
        }
    }

    #[test]
    fn test_invalidation_matching() {
        let order = QueryKey::entity(Resource::Order, 4);
        assert!(Invalidation::Resource(Resource::Orders).matches(&order));
        assert!(Invalidation::Entity(Resource::Order, 4).matches(&order));
        assert!(!Invalidation::Entity(Resource::Product, 4).matches(&order));
        assert!(!Invalidation::Resource(Resource::Order).matches(&QueryKey::list(Resource::Orders, "")));
    }
}
