// ============================================================================
// SECTION 10: MODEL LIFECYCLE
// ============================================================================
// Trained state lives in a `ModelSlot`: readers load an `Arc` snapshot without
// locking, trainers build a complete replacement and publish it with a single
// pointer swap. Readers holding the previous snapshot keep it until they
// drop it, so a prediction never mixes two training batches.
// ============================================================================

use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::debug;

type SwapHook = Box<dyn Fn() + Send + Sync>;

/// Atomically swappable, single-flight trained-model holder.
pub struct ModelSlot<T> {
    component: &'static str,
    current: ArcSwapOption<T>,
    train_guard: Mutex<()>,
    generation: AtomicU64,
    swap_hook: Option<SwapHook>,
}

impl<T> ModelSlot<T> {
    /// Create an empty (untrained) slot
    pub fn new(component: &'static str) -> Self {
        Self {
            component,
            current: ArcSwapOption::empty(),
            train_guard: Mutex::new(()),
            generation: AtomicU64::new(0),
            swap_hook: None,
        }
    }

    /// Run `hook` after a replacement is built and before it is published.
    /// Used to widen the swap window when exercising concurrent readers.
    pub fn with_swap_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.swap_hook = Some(Box::new(hook));
        self
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    /// Current snapshot, if any model has been installed
    #[inline]
    pub fn load(&self) -> Option<Arc<T>> {
        self.current.load_full()
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    /// Number of snapshots published so far
    pub fn generation(&self) -> u64 {
        self.generation.load(AtomicOrdering::Acquire)
    }

    /// Build a replacement and publish it on success.
    ///
    /// Trainers are serialized; `build` receives the generation number the
    /// new snapshot will carry. On error the installed snapshot is untouched.
    pub fn train<E, F>(&self, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce(u64) -> Result<T, E>,
    {
        let _guard = self.train_guard.lock();
        self.build_and_publish(build)
    }

    /// Return the installed snapshot, or train one if the slot is empty.
    ///
    /// Concurrent callers on an empty slot are deduplicated: one trains, the
    /// rest wait on the guard and reuse its result.
    pub fn get_or_try_init<E, F>(&self, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce(u64) -> Result<T, E>,
    {
        if let Some(current) = self.load() {
            return Ok(current);
        }

        let _guard = self.train_guard.lock();
        if let Some(current) = self.load() {
            debug!(
                target: "cortex::engine",
                component = self.component,
                "Reusing model trained by a concurrent caller"
            );
            return Ok(current);
        }
        self.build_and_publish(build)
    }

    fn build_and_publish<E, F>(&self, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce(u64) -> Result<T, E>,
    {
        let next = self.generation.load(AtomicOrdering::Acquire) + 1;
        let snapshot = Arc::new(build(next)?);

        if let Some(hook) = &self.swap_hook {
            hook();
        }

        self.current.store(Some(Arc::clone(&snapshot)));
        self.generation.store(next, AtomicOrdering::Release);

        debug!(
            target: "cortex::engine",
            component = self.component,
            generation = next,
            "Model snapshot published"
        );
        Ok(snapshot)
    }
}

impl<T: Debug> Debug for ModelSlot<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSlot")
            .field("component", &self.component)
            .field("ready", &self.is_ready())
            .field("generation", &self.generation())
            .field("has_swap_hook", &self.swap_hook.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_failed_training_keeps_previous_snapshot() {
        let slot: ModelSlot<u64> = ModelSlot::new("test");
        assert!(!slot.is_ready());

        slot.train(|gen| Ok::<_, String>(gen * 10)).unwrap();
        assert_eq!(*slot.load().unwrap(), 10);

        let err = slot.train(|_| Err::<u64, _>("boom".to_string()));
        assert!(err.is_err());
        assert_eq!(*slot.load().unwrap(), 10);
        assert_eq!(slot.generation(), 1);
    }

    #[test]
    fn test_first_failure_leaves_slot_empty() {
        let slot: ModelSlot<u64> = ModelSlot::new("test");
        assert!(slot.train(|_| Err::<u64, _>(())).is_err());
        assert!(!slot.is_ready());
        assert_eq!(slot.generation(), 0);
    }

    #[test]
    fn test_get_or_try_init_is_single_flight() {
        let slot = Arc::new(
            ModelSlot::<usize>::new("test")
                .with_swap_hook(|| thread::sleep(Duration::from_millis(20))),
        );
        let builds = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slot = Arc::clone(&slot);
                let builds = Arc::clone(&builds);
                thread::spawn(move || {
                    *slot
                        .get_or_try_init(|_| {
                            builds.fetch_add(1, AtomicOrdering::SeqCst);
                            Ok::<_, ()>(99)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 99);
        }
        assert_eq!(builds.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_readers_keep_old_snapshot_during_swap() {
        let slot = Arc::new(
            ModelSlot::<Vec<u64>>::new("test")
                .with_swap_hook(|| thread::sleep(Duration::from_millis(30))),
        );
        slot.train(|gen| Ok::<_, ()>(vec![gen; 4])).unwrap();

        let held = slot.load().unwrap();
        let trainer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.train(|gen| Ok::<_, ()>(vec![gen; 4])).unwrap())
        };

        let during = slot.load().unwrap();
        trainer.join().unwrap();
        let after = slot.load().unwrap();

        assert_eq!(*held, vec![1; 4]);
        assert!(*during == vec![1; 4] || *during == vec![2; 4]);
        assert_eq!(*after, vec![2; 4]);
    }
}
