//! Aggregate trait and the in-memory state container

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// A domain value owned by exactly one store
///
/// `Default` is the compiled-in value used when no snapshot can be loaded.
pub trait Aggregate:
    Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Partial update understood by this aggregate
    type Update: Send + 'static;
    
    /// Store name used in log output
    const NAME: &'static str;
    
    /// Fold an update into the value. Must not have side effects.
    fn apply(&mut self, update: Self::Update);
}

/// Holds the current value of one aggregate
///
/// Values are replaced whole, so readers only ever see a complete value:
/// either the one before a merge or the one after it.
pub struct StateContainer<A: Aggregate> {
    value: RwLock<Arc<A>>,
}

impl<A: Aggregate> StateContainer<A> {
    pub fn new(initial: A) -> Self {
        Self {
            value: RwLock::new(Arc::new(initial)),
        }
    }
    
    /// Current value
    pub fn get(&self) -> Arc<A> {
        self.value.read().clone()
    }
    
    /// Apply an update and return the new value
    pub fn merge(&self, update: A::Update) -> Arc<A> {
        let mut guard = self.value.write();
        let mut next = A::clone(&guard);
        next.apply(update);
        let next = Arc::new(next);
        *guard = next.clone();
        next
    }
}

impl<A: Aggregate> Default for StateContainer<A> {
    fn default() -> Self {
        Self::new(A::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde::Deserialize;
    
    /// Small object aggregate used across the crate's tests
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Counter {
        pub label: String,
        pub count: u64,
    }
    
    #[derive(Debug, Clone, Default)]
    pub struct CounterPatch {
        pub label: Option<String>,
        pub count: Option<u64>,
    }
    
    impl Aggregate for Counter {
        type Update = CounterPatch;
        const NAME: &'static str = "counter";
        
        fn apply(&mut self, update: CounterPatch) {
            if let Some(label) = update.label {
                self.label = label;
            }
            if let Some(count) = update.count {
                self.count = count;
            }
        }
    }
    
    pub fn set_count(count: u64) -> CounterPatch {
        CounterPatch {
            count: Some(count),
            ..Default::default()
        }
    }
    
    #[test]
    fn test_merge_keeps_untouched_fields() {
        let container = StateContainer::new(Counter {
            label: "jobs".into(),
            count: 1,
        });
        
        let next = container.merge(set_count(5));
        assert_eq!(next.count, 5);
        assert_eq!(next.label, "jobs");
        assert_eq!(*container.get(), *next);
    }
    
    #[test]
    fn test_old_snapshots_are_unaffected_by_merge() {
        let container = StateContainer::<Counter>::default();
        let before = container.get();
        container.merge(set_count(9));
        
        assert_eq!(before.count, 0);
        assert_eq!(container.get().count, 9);
    }
    
    #[test]
    fn test_merge_is_left_fold_in_call_order() {
        let container = StateContainer::<Counter>::default();
        let patches = vec![
            set_count(1),
            CounterPatch { label: Some("a".into()), count: None },
            set_count(3),
            CounterPatch { label: Some("b".into()), count: None },
        ];
        
        let mut expected = Counter::default();
        for patch in patches {
            expected.apply(patch.clone());
            container.merge(patch);
        }
        
        assert_eq!(*container.get(), expected);
        assert_eq!(expected, Counter { label: "b".into(), count: 3 });
    }
    
    #[test]
    fn test_same_patch_twice_is_idempotent() {
        let container = StateContainer::<Counter>::default();
        let once = container.merge(set_count(4));
        let twice = container.merge(set_count(4));
        assert_eq!(*once, *twice);
    }
}
