//! Registry of active subscriptions for one instance.

use crate::error::{LpsError, Result};
use crate::pattern::Pattern;
use crate::types::{InstanceId, Sample, SubscriptionId};
use parking_lot::RwLock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{Release, Subscription, SubscriptionHandle};

/// Thread-safe collection of subscriptions.
///
/// Insert, remove, close and the dispatch snapshot are the only operations
/// that take the lock.
pub struct SubscriptionRegistry {
    /// Owning instance, checked on remove.
    instance: InstanceId,
    /// Active subscriptions. Order carries no meaning.
    subscriptions: RwLock<Vec<Arc<Subscription>>>,
    /// Set by `close`; accessed only while holding `subscriptions`.
    closed: AtomicBool,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Create an empty registry owned by `instance`.
    pub fn new(instance: InstanceId) -> Self {
        Self {
            instance,
            subscriptions: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback for topics matching `pattern`.
    ///
    /// Registering the same pattern twice yields two independent
    /// subscriptions that both fire. Fails with [`LpsError::Stopped`] once
    /// the registry is closed.
    pub fn insert<F>(&self, pattern: Pattern, callback: F) -> Result<SubscriptionHandle>
    where
        F: Fn(&str, Sample) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscription = Arc::new(Subscription::new(id, pattern, Box::new(callback)));

        {
            let mut subs = self.subscriptions.write();
            if self.closed.load(Ordering::Acquire) {
                return Err(LpsError::Stopped);
            }
            subs.push(Arc::clone(&subscription));
        }

        tracing::debug!(
            instance = %self.instance,
            subscription = %id,
            pattern = %subscription.pattern,
            "subscribe"
        );
        Ok(SubscriptionHandle {
            id,
            instance: self.instance,
        })
    }

    /// Unregister a subscription and drop the registry's reference.
    pub fn remove(&self, handle: SubscriptionHandle) -> Result<Release> {
        if handle.instance != self.instance {
            return Err(LpsError::WrongInstance {
                expected: self.instance,
                got: handle.instance,
            });
        }

        let entry = {
            let mut subs = self.subscriptions.write();
            let index = subs
                .iter()
                .position(|sub| sub.id == handle.id)
                .ok_or(LpsError::NotSubscribed(handle.id))?;
            subs.swap_remove(index)
        };

        // into_inner succeeds only for the last reference holder.
        let release = match Arc::into_inner(entry) {
            Some(_) => Release::Immediate,
            None => Release::Deferred,
        };
        tracing::debug!(
            instance = %self.instance,
            subscription = %handle.id,
            ?release,
            "unsubscribe"
        );
        Ok(release)
    }

    /// Refuse further inserts. With `drain`, also drop the registry's
    /// reference to every subscription.
    ///
    /// Returns how many were drained. Removing existing handles keeps
    /// working after close.
    pub fn close(&self, drain: bool) -> usize {
        let drained = {
            let mut subs = self.subscriptions.write();
            self.closed.store(true, Ordering::Release);
            if drain {
                std::mem::take(&mut *subs)
            } else {
                Vec::new()
            }
        };
        // Callbacks are dropped outside the lock.
        drained.len()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        let _subs = self.subscriptions.read();
        self.closed.load(Ordering::Acquire)
    }

    /// Collect the subscriptions matching `topic`, each with a transient
    /// reference that keeps it alive until the caller drops it.
    pub(crate) fn snapshot(&self, topic: &str) -> Vec<Arc<Subscription>> {
        self.subscriptions
            .read()
            .iter()
            .filter(|sub| sub.pattern.matches(topic))
            .cloned()
            .collect()
    }

    /// Invoke every matching callback outside the lock, in snapshot order.
    ///
    /// Returns the number of callbacks invoked. A panicking callback is
    /// logged and does not stop the remaining ones.
    pub fn dispatch(&self, topic: &str, sample: Sample) -> usize {
        let snapshot = self.snapshot(topic);
        let invoked = snapshot.len();

        for sub in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| sub.invoke(topic, sample)));
            if outcome.is_err() {
                tracing::error!(
                    instance = %self.instance,
                    subscription = %sub.id,
                    topic,
                    "subscription callback panicked"
                );
            }

            if Arc::into_inner(sub).is_some() {
                tracing::debug!(
                    instance = %self.instance,
                    topic,
                    "released unsubscribed entry after dispatch"
                );
            }
        }

        invoked
    }

    /// Number of registered subscriptions.
    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;

    /// Counts its own drops.
    struct DropProbe(Arc<AtomicUsize>);

    impl Drop for DropProbe {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let registry = SubscriptionRegistry::new(InstanceId(1));

        let handle = registry.insert("foo".into(), |_, _| {}).unwrap();
        assert_eq!(registry.len(), 1);

        assert_eq!(registry.remove(handle).unwrap(), Release::Immediate);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dispatch_to_matching() {
        let registry = SubscriptionRegistry::new(InstanceId(1));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _handle = registry
            .insert("sensor.*".into(), move |topic, sample| {
                sink.lock().push((topic.to_string(), sample));
            })
            .unwrap();

        assert_eq!(registry.dispatch("sensor.temp", Sample::Value(20.5)), 1);
        assert_eq!(registry.dispatch("actuator.fan", Sample::Value(1.0)), 0);

        let seen = seen.lock();
        assert_eq!(seen.as_slice(), &[("sensor.temp".to_string(), Sample::Value(20.5))]);
    }

    #[test]
    fn test_duplicate_patterns_fire_twice() {
        let registry = SubscriptionRegistry::new(InstanceId(1));
        let hits = counter();

        for _ in 0..2 {
            let hits = Arc::clone(&hits);
            let _ = registry.insert("a.b".into(), move |_, _| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(registry.dispatch("a.b", Sample::Counter(1.0)), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove_wrong_instance() {
        let a = SubscriptionRegistry::new(InstanceId(1));
        let b = SubscriptionRegistry::new(InstanceId(2));

        let handle = a.insert("x".into(), |_, _| {}).unwrap();
        let result = b.remove(handle);
        assert!(matches!(
            result,
            Err(LpsError::WrongInstance {
                expected: InstanceId(2),
                got: InstanceId(1)
            })
        ));
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn test_remove_after_drain() {
        let registry = SubscriptionRegistry::new(InstanceId(1));
        let handle = registry.insert("x".into(), |_, _| {}).unwrap();

        assert_eq!(registry.close(true), 1);
        assert!(matches!(registry.remove(handle), Err(LpsError::NotSubscribed(_))));
    }

    #[test]
    fn test_insert_after_close_rejected() {
        let registry = SubscriptionRegistry::new(InstanceId(1));
        let kept = registry.insert("x".into(), |_, _| {}).unwrap();

        assert_eq!(registry.close(false), 0);
        assert!(registry.is_closed());
        assert!(matches!(
            registry.insert("y".into(), |_, _| {}),
            Err(LpsError::Stopped)
        ));
        assert_eq!(registry.len(), 1);

        // Handles issued before close stay removable.
        assert_eq!(registry.remove(kept).unwrap(), Release::Immediate);
    }

    #[test]
    fn test_close_races_with_inserts() {
        let registry = Arc::new(SubscriptionRegistry::new(InstanceId(1)));
        let start = Arc::new(Barrier::new(5));

        let inserters: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    let mut accepted = 0;
                    for _ in 0..500 {
                        if registry.insert("x".into(), |_, _| {}).is_ok() {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();

        start.wait();
        let drained = registry.close(true);
        let accepted: usize = inserters.into_iter().map(|t| t.join().unwrap()).sum();

        // Every accepted insert landed before close and was drained by it.
        assert_eq!(drained, accepted);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_immediate_release_drops_callback() {
        let registry = SubscriptionRegistry::new(InstanceId(1));
        let drops = counter();

        let probe = DropProbe(Arc::clone(&drops));
        let handle = registry
            .insert("x".into(), move |_, _| {
                let _probe = &probe;
            })
            .unwrap();

        assert_eq!(drops.load(Ordering::SeqCst), 0);
        registry.remove(handle).unwrap();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_during_dispatch_defers_release() {
        let registry = Arc::new(SubscriptionRegistry::new(InstanceId(1)));
        let drops = counter();
        let calls = counter();
        let entered = Arc::new(Barrier::new(2));
        let resume = Arc::new(Barrier::new(2));

        let probe = DropProbe(Arc::clone(&drops));
        let handle = {
            let calls = Arc::clone(&calls);
            let entered = Arc::clone(&entered);
            let resume = Arc::clone(&resume);
            registry
                .insert("x".into(), move |_, _| {
                    let _probe = &probe;
                    entered.wait();
                    resume.wait();
                    calls.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap()
        };

        let dispatcher = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.dispatch("x", Sample::Value(1.0)))
        };

        // Callback is running; unsubscribe cannot free it yet.
        entered.wait();
        assert_eq!(registry.remove(handle).unwrap(), Release::Deferred);
        assert!(registry.is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 0);

        resume.wait();
        assert_eq!(dispatcher.join().unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(drops.load(Ordering::SeqCst), 1);

        // Gone from future dispatches.
        assert_eq!(registry.dispatch("x", Sample::Value(2.0)), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_subscribe_reentrantly() {
        let registry = Arc::new(SubscriptionRegistry::new(InstanceId(1)));

        let inner = Arc::clone(&registry);
        let _handle = registry
            .insert("x".into(), move |_, _| {
                let _ = inner.insert("y".into(), |_, _| {});
            })
            .unwrap();

        registry.dispatch("x", Sample::Value(1.0));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_panicking_callback_does_not_block_others() {
        let registry = SubscriptionRegistry::new(InstanceId(1));
        let hits = counter();

        let _bad = registry.insert("x".into(), |_, _| panic!("boom")).unwrap();
        let hits_clone = Arc::clone(&hits);
        let _good = registry
            .insert("x".into(), move |_, _| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(registry.dispatch("x", Sample::Value(1.0)), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
