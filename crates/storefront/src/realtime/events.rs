//! Which cached queries each realtime event makes stale.

use emporium_core::UserId;

use super::sse::RealtimeEvent;
use crate::api::{Invalidation, Resource};

/// Map a named event to the cache invalidations it implies.
///
/// Unknown events map to nothing.
#[must_use]
pub fn invalidations(event: &RealtimeEvent) -> Vec<Invalidation> {
    use Invalidation::{Entity, Resource as All, Scoped};

    let id = event.field_i64("id");
    let user = event.field_i64("user_id").map(UserId::new);
    let entity = |resource| id.map(|id| Entity(resource, id));
    let for_user = |resource| user.map_or(All(resource), |user| Scoped(resource, user));

    let targets = match event.name.as_str() {
        "order.created" => vec![
            Some(All(Resource::Orders)),
            Some(All(Resource::Analytics)),
            Some(All(Resource::Products)),
        ],
        "order.status.changed" => vec![
            Some(All(Resource::Orders)),
            entity(Resource::Order),
            Some(All(Resource::Analytics)),
            Some(for_user(Resource::Notifications)),
        ],
        "product.created" | "product.updated" | "product.deleted" => {
            vec![Some(All(Resource::Products)), entity(Resource::Product)]
        }
        "product.review.submitted" => vec![
            Some(All(Resource::Reviews)),
            entity(Resource::Product),
            Some(All(Resource::Products)),
        ],
        "review.moderated" => vec![Some(All(Resource::Reviews)), Some(All(Resource::Products))],
        "notification.created" => vec![Some(for_user(Resource::Notifications))],
        "user.updated" => vec![Some(All(Resource::Users))],
        "category.changed" => vec![
            Some(All(Resource::Categories)),
            Some(All(Resource::Products)),
        ],
        "cart.updated" => vec![Some(for_user(Resource::Cart))],
        other => {
            tracing::debug!(event = other, "Ignoring unknown realtime event");
            Vec::new()
        }
    };

    targets.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn event(name: &str, data: serde_json::Value) -> RealtimeEvent {
        RealtimeEvent {
            name: name.to_string(),
            data,
        }
    }

    #[test]
    fn test_order_created() {
        let targets = invalidations(&event("order.created", json!({"id": 3})));
        assert_eq!(
            targets,
            vec![
                Invalidation::Resource(Resource::Orders),
                Invalidation::Resource(Resource::Analytics),
                Invalidation::Resource(Resource::Products),
            ]
        );
    }

    #[test]
    fn test_order_status_changed_targets_order_and_user() {
        let targets = invalidations(&event(
            "order.status.changed",
            json!({"id": 9, "user_id": 4}),
        ));
        assert!(targets.contains(&Invalidation::Entity(Resource::Order, 9)));
        assert!(targets.contains(&Invalidation::Scoped(
            Resource::Notifications,
            UserId::new(4)
        )));
    }

    #[test]
    fn test_product_event_without_id() {
        let targets = invalidations(&event("product.updated", serde_json::Value::Null));
        assert_eq!(targets, vec![Invalidation::Resource(Resource::Products)]);
    }

    #[test]
    fn test_notification_without_user_drops_all() {
        let targets = invalidations(&event("notification.created", json!({})));
        assert_eq!(targets, vec![Invalidation::Resource(Resource::Notifications)]);
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        assert!(invalidations(&event("inventory.sync", json!({"id": 1}))).is_empty());
    }
}
