//! Versioned cell
//!
//! A value guarded by a lock, paired with a monotonic version and a
//! change-notification primitive. Publication is the moment the exclusive
//! lock is released: the version advances and every waiter is woken.
//! Long-polling reads wait until the cell's version differs from the one
//! the caller already knows.

use brood_api::Version;
use std::sync::Mutex;
use tokio::sync::Notify;

/// A snapshot of a cell taken at a specific version.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot<T> {
    pub value: T,
    pub version: Version,
}

/// A value with a monotonically-increasing version and wake-on-change.
#[derive(Debug)]
pub struct Versioned<T> {
    state: Mutex<State<T>>,
    changed: Notify,
}

#[derive(Debug)]
struct State<T> {
    value: T,
    version: u64,
}

impl<T> Versioned<T> {
    /// Wrap `value` at version zero (wire form: the empty string).
    pub fn new(value: T) -> Self {
        Versioned {
            state: Mutex::new(State { value, version: 0 }),
            changed: Notify::new(),
        }
    }

    /// Mutate the value under the exclusive lock, then publish: the version
    /// advances and all waiters wake. Every call publishes, whether or not
    /// `f` changed anything.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut state = self.lock();
        let result = f(&mut state.value);
        state.version += 1;
        drop(state);
        self.changed.notify_waiters();
        result
    }

    /// Inspect the value under the shared discipline without publishing.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let state = self.lock();
        f(&state.value)
    }

    /// Current version.
    pub fn version(&self) -> Version {
        Version::from(self.lock().version)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T: Clone> Versioned<T> {
    /// Copy out the current value and version without waiting.
    pub fn snapshot(&self) -> Snapshot<T> {
        let state = self.lock();
        Snapshot {
            value: state.value.clone(),
            version: Version::from(state.version),
        }
    }

    /// Wait until the cell's version differs from `known`, then return a
    /// snapshot. Returns immediately when `known` is already stale. May
    /// suspend indefinitely; callers bound it with a timeout or shutdown
    /// select of their own.
    ///
    /// A waiter woken for version `v` always sees the value whose
    /// publication produced `v` (or a later one): interest is registered
    /// before the version check, so a publication racing the check is never
    /// lost.
    pub async fn wait_newer(&self, known: &Version) -> Snapshot<T> {
        loop {
            let notified = self.changed.notified();
            {
                let state = self.lock();
                let current = Version::from(state.version);
                if current != *known {
                    return Snapshot {
                        value: state.value.clone(),
                        version: current,
                    };
                }
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_new_cell_is_at_initial_version() {
        let cell = Versioned::new(0u32);
        assert_eq!(cell.version(), Version::initial());
    }

    #[test]
    fn test_update_publishes_even_without_mutation() {
        let cell = Versioned::new(0u32);
        cell.update(|_| ());
        cell.update(|v| *v += 1);
        assert_eq!(cell.version(), Version::from(2));
        assert_eq!(cell.snapshot().value, 1);
    }

    #[test]
    fn test_read_does_not_publish() {
        let cell = Versioned::new(5u32);
        let doubled = cell.read(|v| v * 2);
        assert_eq!(doubled, 10);
        assert_eq!(cell.version(), Version::initial());
    }

    #[tokio::test]
    async fn test_wait_newer_returns_immediately_when_stale() {
        let cell = Versioned::new("a".to_string());
        cell.update(|v| v.push('b'));
        let snap = cell.wait_newer(&Version::initial()).await;
        assert_eq!(snap.version, Version::from(1));
        assert_eq!(snap.value, "ab");
    }

    #[tokio::test]
    async fn test_wait_newer_blocks_until_publication() {
        let cell = Arc::new(Versioned::new(BTreeSet::<String>::new()));

        let waiter = cell.clone();
        let wait = tokio::spawn(async move { waiter.wait_newer(&Version::initial()).await });

        // The waiter has nothing to see yet.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!wait.is_finished());

        cell.update(|set| {
            set.insert("X".to_string());
        });

        let snap = tokio::time::timeout(Duration::from_secs(1), wait)
            .await
            .expect("waiter should wake")
            .unwrap();
        assert_eq!(snap.version, Version::from(1));
        assert!(snap.value.contains("X"));
    }

    #[tokio::test]
    async fn test_waiters_observe_versions_in_order() {
        let cell = Arc::new(Versioned::new(0u64));

        // The value always equals the publication counter, so every wake
        // can check it sees the state its version was published with.
        let reader = cell.clone();
        let chain = tokio::spawn(async move {
            let mut known = Version::initial();
            let mut observed = Vec::new();
            loop {
                let snap = reader.wait_newer(&known).await;
                known = snap.version.clone();
                observed.push((snap.value, snap.version));
                if known == Version::from(3) {
                    return observed;
                }
            }
        });

        for i in 1..=3u64 {
            cell.update(|v| *v = i);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let observed = tokio::time::timeout(Duration::from_secs(1), chain)
            .await
            .expect("chain should complete")
            .unwrap();
        // Versions arrive strictly ordered, a skipped intermediate is
        // fine, and each wake saw a consistent value.
        let mut last = 0u64;
        for (value, version) in observed {
            assert!(value > last, "versions must advance: {last} then {value}");
            assert_eq!(version, Version::from(value));
            last = value;
        }
        assert_eq!(last, 3);
    }

    #[tokio::test]
    async fn test_publication_racing_wait_is_not_lost() {
        let cell = Arc::new(Versioned::new(0u64));
        let writer = cell.clone();
        let wait = tokio::spawn(async move {
            cell.wait_newer(&Version::initial()).await;
        });
        writer.update(|v| *v = 1);
        tokio::time::timeout(Duration::from_secs(1), wait)
            .await
            .expect("racing publication must wake the waiter")
            .unwrap();
    }
}
