//! Bounded fan-out over the entities of one kind.
//!
//! The original behavior fired every listing-derived task at once; here a
//! semaphore caps the number of outstanding remote calls per kind, and a
//! `JoinSet` collects completions in whatever order they finish. Per-entity
//! failures are logged with kind and name and never touch sibling tasks.

use crate::catalog::EntityKind;
use crate::error::{EngineError, EngineResult};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::warn;

/// Per-kind concurrency limiter.
#[derive(Debug, Clone)]
pub struct KindLimiter {
    permits: Arc<Semaphore>,
}

impl KindLimiter {
    /// Create a limiter allowing `limit` concurrent entity operations.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    /// Wait for a permit.
    pub async fn acquire(&self) -> EngineResult<OwnedSemaphorePermit> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| EngineError::LimiterClosed)
    }
}

/// Run `op` for every name with bounded concurrency.
///
/// Each entity's failure is local: it is logged and the remaining entities
/// proceed. Panicking tasks are logged the same way.
pub async fn fan_out<F, Fut>(limiter: &KindLimiter, kind: EntityKind, names: Vec<String>, op: F)
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = EngineResult<()>> + Send + 'static,
{
    let mut tasks: JoinSet<(String, EngineResult<()>)> = JoinSet::new();

    for name in names {
        let permit = match limiter.acquire().await {
            Ok(permit) => permit,
            Err(error) => {
                warn!(kind = %kind, error = %error, "concurrency limiter unavailable");
                break;
            }
        };
        let fut = op(name.clone());
        tasks.spawn(async move {
            let result = fut.await;
            drop(permit);
            (name, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(()))) => {}
            Ok((name, Err(error))) => {
                warn!(kind = %kind, name = %name, error = %error, "entity operation failed");
            }
            Err(join_error) => {
                warn!(kind = %kind, error = %join_error, "entity task aborted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_fan_out_runs_every_entity() {
        let limiter = KindLimiter::new(4);
        let done = Arc::new(AtomicUsize::new(0));
        let names: Vec<String> = (0..10).map(|i| format!("entity-{i}")).collect();

        let done_ref = done.clone();
        fan_out(&limiter, EntityKind::Product, names, move |_name| {
            let done = done_ref.clone();
            async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert_eq!(done.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_fan_out_bounds_concurrency() {
        let limiter = KindLimiter::new(2);
        let active = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));
        let names: Vec<String> = (0..8).map(|i| format!("entity-{i}")).collect();

        let active_ref = active.clone();
        let high_ref = high_water.clone();
        fan_out(&limiter, EntityKind::Kvm, names, move |_name| {
            let active = active_ref.clone();
            let high_water = high_ref.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                high_water.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert!(high_water.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_fan_out_failure_is_local() {
        let limiter = KindLimiter::new(2);
        let done = Arc::new(AtomicUsize::new(0));
        let names: Vec<String> = (0..6).map(|i| format!("entity-{i}")).collect();

        let done_ref = done.clone();
        fan_out(&limiter, EntityKind::Keystore, names, move |name| {
            let done = done_ref.clone();
            async move {
                if name == "entity-2" {
                    return Err(EngineError::KeystoreMissing(name));
                }
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert_eq!(done.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_limiter_floor_of_one() {
        let limiter = KindLimiter::new(0);
        let permit = limiter.acquire().await.unwrap();
        drop(permit);
    }
}
