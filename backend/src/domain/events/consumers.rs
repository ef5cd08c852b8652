//! Which consumers receive which event types.

use std::collections::HashMap;

use super::model::EventType;

/// The consumer hosted by this process.
pub const REVIEWS_CORE_CONSUMER: &str = "reviews_core";

/// Event type to consumer names, used by the outbox fan-out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerRegistry {
    routes: HashMap<String, Vec<String>>,
}

impl ConsumerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event type routed to `reviews_core`.
    #[must_use]
    pub fn reviews_core() -> Self {
        let mut registry = Self::new();
        for event_type in EventType::ALL {
            registry.register(event_type.as_str(), REVIEWS_CORE_CONSUMER);
        }
        registry
    }

    /// Route `event_type` to `consumer`; repeated registrations are ignored.
    pub fn register(&mut self, event_type: &str, consumer: &str) {
        let consumers = self.routes.entry(event_type.to_owned()).or_default();
        if !consumers.iter().any(|existing| existing == consumer) {
            consumers.push(consumer.to_owned());
        }
    }

    /// Consumers for a stored event type; empty for unknown types.
    #[must_use]
    pub fn consumers_for(&self, event_type: &str) -> &[String] {
        self.routes.get(event_type).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reviews_core_receives_every_event_type() {
        let registry = ConsumerRegistry::reviews_core();
        for event_type in EventType::ALL {
            assert_eq!(
                registry.consumers_for(event_type.as_str()),
                [REVIEWS_CORE_CONSUMER.to_owned()]
            );
        }
    }

    #[test]
    fn duplicate_registrations_collapse() {
        let mut registry = ConsumerRegistry::new();
        registry.register("review.created", "search");
        registry.register("review.created", "search");
        registry.register("review.created", REVIEWS_CORE_CONSUMER);
        assert_eq!(registry.consumers_for("review.created").len(), 2);
        assert!(registry.consumers_for("unknown").is_empty());
    }
}
