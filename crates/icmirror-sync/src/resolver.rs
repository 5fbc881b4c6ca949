//! Remote directory resolution
//!
//! Walks a component path from a remote root node, creating any missing
//! directory along the way. Creation is eventually consistent: a
//! just-created child may be invisible to lookups for a while, on this
//! handle and on every other worker's handle. The resolver therefore
//! never trusts a single read after creating - it invalidates the
//! parent's listing cache and polls until the child appears.
//!
//! Concurrent workers racing to create the same component need no
//! in-process lock: the remote service tolerates duplicate creation
//! requests, and every racer converges on the same node once it
//! becomes visible.

use icmirror_core::{RemoteNodeRef, SyncError, SyncOptions};
use tracing::{debug, warn};

/// Resolves `components` from `root`, creating missing directories
///
/// Returns the node addressed by walking all components in order.
/// With `max_poll_attempts` unset (the default) the visibility poll for
/// a created component runs until the node appears; when set,
/// exhaustion yields [`SyncError::GaveUp`].
pub async fn resolve(
    root: RemoteNodeRef,
    components: &[String],
    options: &SyncOptions,
) -> Result<RemoteNodeRef, SyncError> {
    let mut current = root;

    for part in components {
        if let Some(child) = current.child(part).await? {
            debug!(component = %part, "component found");
            current = child;
            continue;
        }

        debug!(component = %part, "component missing, creating");
        current.create_child_dir(part).await?;

        // The creation request is in flight somewhere in the service;
        // drop the stale listing and re-read until the child shows up.
        let mut attempts: u64 = 0;
        current = loop {
            current.invalidate().await;
            if let Some(child) = current.child(part).await? {
                break child;
            }

            attempts += 1;
            if let Some(max) = options.max_poll_attempts {
                if attempts >= max {
                    return Err(SyncError::GaveUp {
                        attempts,
                        reason: format!("waiting for directory '{part}' to become visible"),
                    });
                }
            }

            warn!(
                component = %part,
                attempt = attempts,
                "created directory not visible yet, polling"
            );
            tokio::time::sleep(options.poll_interval).await;
        };
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use icmirror_core::{RemoteError, RemoteNode};
    use tokio::sync::Mutex;

    use super::*;

    /// Minimal fake directory: children become visible only after a
    /// configurable number of lookups following their creation.
    struct LaggyDir {
        name: String,
        children: Arc<Mutex<HashMap<String, Arc<LaggyDir>>>>,
        /// Lookups remaining before a created child turns visible
        lag: Arc<Mutex<HashMap<String, u64>>>,
        visibility_lag: u64,
        creates: Arc<AtomicU64>,
    }

    impl LaggyDir {
        fn root(visibility_lag: u64) -> Arc<Self> {
            Arc::new(Self {
                name: String::new(),
                children: Arc::new(Mutex::new(HashMap::new())),
                lag: Arc::new(Mutex::new(HashMap::new())),
                visibility_lag,
                creates: Arc::new(AtomicU64::new(0)),
            })
        }
    }

    #[async_trait::async_trait]
    impl RemoteNode for LaggyDir {
        fn name(&self) -> &str {
            &self.name
        }
        fn is_dir(&self) -> bool {
            true
        }
        fn size(&self) -> Option<u64> {
            None
        }
        fn modified(&self) -> Option<DateTime<Utc>> {
            None
        }

        async fn child(&self, name: &str) -> Result<Option<RemoteNodeRef>, RemoteError> {
            let mut lag = self.lag.lock().await;
            if let Some(remaining) = lag.get_mut(name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Ok(None);
                }
            }
            drop(lag);
            Ok(self
                .children
                .lock()
                .await
                .get(name)
                .cloned()
                .map(|c| c as RemoteNodeRef))
        }

        async fn create_child_dir(&self, name: &str) -> Result<(), RemoteError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            let mut children = self.children.lock().await;
            if !children.contains_key(name) {
                children.insert(
                    name.to_string(),
                    Arc::new(LaggyDir {
                        name: name.to_string(),
                        children: Arc::new(Mutex::new(HashMap::new())),
                        lag: Arc::new(Mutex::new(HashMap::new())),
                        visibility_lag: self.visibility_lag,
                        creates: self.creates.clone(),
                    }),
                );
                self.lag.lock().await.insert(name.to_string(), self.visibility_lag);
            }
            Ok(())
        }

        async fn invalidate(&self) {}

        async fn upload(&self, _name: &str, _data: Vec<u8>) -> Result<(), RemoteError> {
            unreachable!("resolver never uploads")
        }

        async fn delete(&self) -> Result<(), RemoteError> {
            unreachable!("resolver never deletes")
        }
    }

    fn fast_options() -> SyncOptions {
        SyncOptions {
            poll_interval: Duration::from_millis(1),
            ..SyncOptions::default()
        }
    }

    #[tokio::test]
    async fn empty_components_return_root() {
        let root = LaggyDir::root(0);
        let resolved = resolve(root.clone(), &[], &fast_options()).await.unwrap();
        assert_eq!(resolved.name(), "");
    }

    #[tokio::test]
    async fn creates_missing_components_despite_lag() {
        // Each created child reports "not found" for 3 lookups.
        let root = LaggyDir::root(3);
        let components = vec!["a".to_string(), "b".to_string()];

        let resolved = resolve(root.clone(), &components, &fast_options())
            .await
            .unwrap();
        assert_eq!(resolved.name(), "b");
        assert_eq!(root.creates.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn poll_ceiling_gives_up() {
        // Child stays invisible longer than the ceiling allows.
        let root = LaggyDir::root(10);
        let options = SyncOptions {
            max_poll_attempts: Some(2),
            ..fast_options()
        };

        let err = resolve(root, &["a".to_string()], &options)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::GaveUp { attempts: 2, .. }));
    }
}
