//! Identity strategy trait and resolver.
//!
//! Identity resolution maps a clicked element to the post it belongs to.
//! Several independent strategies are tried in priority order; the first
//! one producing a valid identity wins.

use galleria_core::{Element, Identity};
use tracing::{debug, trace};

// ============================================================================
// Identity Strategy Trait
// ============================================================================

/// One way of finding the post behind a clicked element.
///
/// Strategies are synchronous and total: anything they cannot make sense
/// of yields `None`.
pub trait IdentityStrategy {
    /// Unique name of this strategy (e.g. `clicked-element`).
    fn name(&self) -> &str;

    /// Priority (lower = tried first).
    fn priority(&self) -> u32;

    /// Attempts to resolve the identity of `element`.
    fn resolve(&self, element: &Element) -> Option<Identity>;
}

// ============================================================================
// Identity Resolver
// ============================================================================

/// Runs identity strategies in priority order.
#[derive(Default)]
pub struct IdentityResolver {
    strategies: Vec<Box<dyn IdentityStrategy>>,
}

impl IdentityResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a resolver with the given strategies.
    pub fn with_strategies(strategies: Vec<Box<dyn IdentityStrategy>>) -> Self {
        let mut resolver = Self { strategies };
        resolver.sort_by_priority();
        resolver
    }

    /// Adds a strategy.
    pub fn add_strategy(&mut self, strategy: Box<dyn IdentityStrategy>) {
        self.strategies.push(strategy);
        self.sort_by_priority();
    }

    fn sort_by_priority(&mut self) {
        self.strategies.sort_by_key(|s| s.priority());
    }

    /// Number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns true if no strategies are registered.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategy names in execution order.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolves the identity of `element`.
    ///
    /// Results with an empty, non-numeric or `unknown` id are discarded and
    /// the next strategy is tried.
    pub fn resolve(&self, element: &Element) -> Option<Identity> {
        for strategy in &self.strategies {
            match strategy.resolve(element) {
                Some(identity) if identity.is_valid() => {
                    debug!(
                        strategy = %strategy.name(),
                        post_id = %identity.id,
                        author = %identity.author,
                        confidence = identity.confidence,
                        "Identity resolved"
                    );
                    return Some(identity);
                }
                Some(identity) => {
                    trace!(strategy = %strategy.name(), id = %identity.id, "Discarding invalid identity");
                }
                None => trace!(strategy = %strategy.name(), "No identity"),
            }
        }
        debug!("No identity strategy matched");
        None
    }

    /// Runs a single named strategy, with the same validation as `resolve`.
    pub fn resolve_with(&self, name: &str, element: &Element) -> Option<Identity> {
        self.strategies
            .iter()
            .find(|s| s.name() == name)
            .and_then(|s| s.resolve(element))
            .filter(Identity::is_valid)
    }

    /// Runs every strategy and reports what each one produced.
    pub fn resolve_all(&self, element: &Element) -> Vec<(String, Option<Identity>)> {
        self.strategies
            .iter()
            .map(|s| {
                (
                    s.name().to_string(),
                    s.resolve(element).filter(Identity::is_valid),
                )
            })
            .collect()
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use galleria_core::Document;

    struct Fixed {
        name: &'static str,
        priority: u32,
        id: Option<&'static str>,
    }

    impl IdentityStrategy for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> u32 {
            self.priority
        }

        fn resolve(&self, _element: &Element) -> Option<Identity> {
            self.id.map(|id| Identity::new(id, "someone", self.name, 0.5))
        }
    }

    fn element() -> Element {
        let doc = Document::parse("<html><body><img></body></html>", None);
        doc.select_first("img").unwrap()
    }

    #[test]
    fn test_priority_order_and_validation() {
        let resolver = IdentityResolver::with_strategies(vec![
            Box::new(Fixed { name: "late", priority: 5, id: Some("300") }),
            Box::new(Fixed { name: "bogus", priority: 1, id: Some("unknown") }),
            Box::new(Fixed { name: "empty", priority: 2, id: None }),
            Box::new(Fixed { name: "mid", priority: 3, id: Some("200") }),
        ]);

        assert_eq!(resolver.strategy_names(), vec!["bogus", "empty", "mid", "late"]);
        let identity = resolver.resolve(&element()).unwrap();
        assert_eq!(identity.id, "200");
        assert_eq!(identity.resolution_method, "mid");
    }

    #[test]
    fn test_empty_resolver_yields_none() {
        assert!(IdentityResolver::new().resolve(&element()).is_none());
    }

    #[test]
    fn test_diagnostics() {
        let resolver = IdentityResolver::with_strategies(vec![
            Box::new(Fixed { name: "a", priority: 1, id: Some("abc") }),
            Box::new(Fixed { name: "b", priority: 2, id: Some("42") }),
        ]);
        let el = element();

        assert!(resolver.resolve_with("a", &el).is_none());
        assert_eq!(resolver.resolve_with("b", &el).unwrap().id, "42");
        assert!(resolver.resolve_with("missing", &el).is_none());

        let all = resolver.resolve_all(&el);
        assert_eq!(all.len(), 2);
        assert!(all[0].1.is_none());
        assert_eq!(all[1].1.as_ref().map(|i| i.id.as_str()), Some("42"));
    }
}
