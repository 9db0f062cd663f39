//! Context subscription engine.
//!
//! One periodic tokio task per subscribed source: await the provider,
//! broadcast an `arp.contextUpdate`, sleep the interval, repeat. Tasks are
//! cancelled through their token and terminate at their next suspension.
//! A failing provider ends its stream after one terminal update whose data
//! is `{"error": <message>}`; the engine does not restart it.

use crate::server::invocation::NotificationSender;
use crate::server::registry::ContextProvider;
use crate::types::{methods, ContextSource, ContextUpdateParams, JSONRPCNotification};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct SubscriptionTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// The set of live subscription tasks, keyed by source name.
pub struct SubscriptionManager {
    tasks: Mutex<HashMap<String, SubscriptionTask>>,
    notifier: NotificationSender,
}

impl SubscriptionManager {
    /// Create a manager that broadcasts through the given sender.
    pub fn new(notifier: NotificationSender) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            notifier,
        }
    }

    /// Start streaming a source. A second subscribe for the same name is a
    /// no-op; the existing task keeps its rate.
    ///
    /// The effective rate is `max_rate`, else the source's nominal
    /// `update_rate`, else 1 Hz.
    pub async fn subscribe(
        &self,
        source: &ContextSource,
        provider: Arc<dyn ContextProvider>,
        max_rate: Option<f64>,
    ) {
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&source.name) {
            return;
        }

        let rate = max_rate.or(source.update_rate).unwrap_or(1.0);
        let interval = if rate > 0.0 {
            Duration::from_secs_f64(1.0 / rate)
        } else {
            Duration::from_secs(1)
        };

        let token = CancellationToken::new();
        let handle = tokio::spawn(stream_loop(
            source.name.clone(),
            provider,
            interval,
            self.notifier.clone(),
            token.clone(),
        ));
        tracing::debug!(source = %source.name, ?interval, "context subscription started");
        tasks.insert(source.name.clone(), SubscriptionTask { token, handle });
    }

    /// Stop streaming a source. Unknown names are ignored.
    pub async fn unsubscribe(&self, name: &str) {
        if let Some(task) = self.tasks.lock().await.remove(name) {
            task.token.cancel();
            task.handle.abort();
            tracing::debug!(source = %name, "context subscription cancelled");
        }
    }

    /// Whether a source is currently subscribed.
    pub async fn is_subscribed(&self, name: &str) -> bool {
        self.tasks.lock().await.contains_key(name)
    }

    /// Cancel every live task (shutdown and teardown path).
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        for (name, task) in tasks.drain() {
            task.token.cancel();
            task.handle.abort();
            tracing::debug!(source = %name, "context subscription cancelled");
        }
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager").finish_non_exhaustive()
    }
}

async fn stream_loop(
    name: String,
    provider: Arc<dyn ContextProvider>,
    interval: Duration,
    notifier: NotificationSender,
    token: CancellationToken,
) {
    loop {
        let sample = tokio::select! {
            () = token.cancelled() => return,
            sample = provider.sample() => sample,
        };

        match sample {
            Ok(data) => broadcast_update(&notifier, &name, data),
            Err(err) => {
                // Terminal marker; the stream ends here.
                tracing::warn!(source = %name, error = %err, "context provider failed");
                broadcast_update(&notifier, &name, serde_json::json!({"error": err.to_string()}));
                return;
            },
        }

        tokio::select! {
            () = token.cancelled() => return,
            () = tokio::time::sleep(interval) => {},
        }
    }
}

fn broadcast_update(notifier: &NotificationSender, name: &str, data: serde_json::Value) {
    let params = ContextUpdateParams {
        name: name.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        data,
    };
    if let Ok(value) = serde_json::to_value(&params) {
        notifier(JSONRPCNotification::new(methods::CONTEXT_UPDATE, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::ContextDataType;
    use serde_json::{json, Value};
    use std::sync::Mutex as StdMutex;

    fn collector() -> (NotificationSender, Arc<StdMutex<Vec<JSONRPCNotification>>>) {
        let seen: Arc<StdMutex<Vec<JSONRPCNotification>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let notifier: NotificationSender = Arc::new(move |note| sink.lock().unwrap().push(note));
        (notifier, seen)
    }

    fn odometry() -> ContextSource {
        ContextSource::new("odometry", "pose", ContextDataType::Pose).with_update_rate(50.0)
    }

    #[tokio::test]
    async fn updates_flow_until_unsubscribe() {
        let (notifier, seen) = collector();
        let manager = SubscriptionManager::new(notifier);

        manager
            .subscribe(
                &odometry(),
                Arc::new(|| async { Ok(json!({"position": {"x": 0.1}})) }),
                None,
            )
            .await;
        assert!(manager.is_subscribed("odometry").await);

        tokio::time::sleep(Duration::from_millis(100)).await;
        manager.unsubscribe("odometry").await;
        assert!(!manager.is_subscribed("odometry").await);

        let count = seen.lock().unwrap().len();
        assert!(count >= 2, "expected several updates, got {count}");

        // No further ticks after unsubscribe.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(seen.lock().unwrap().len(), count);
    }

    #[tokio::test]
    async fn double_subscribe_is_single_task() {
        let (notifier, seen) = collector();
        let manager = SubscriptionManager::new(notifier);
        let provider = Arc::new(|| async { Ok(json!(1)) });

        let source = ContextSource::new("joints", "angles", ContextDataType::Joints);
        manager.subscribe(&source, provider.clone(), Some(20.0)).await;
        manager.subscribe(&source, provider, Some(20.0)).await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        manager.unsubscribe("joints").await;

        // A 20 Hz task produces ~2-3 updates in 120 ms; two tasks would
        // produce roughly twice that.
        let count = seen.lock().unwrap().len();
        assert!((1..=4).contains(&count), "unexpected update count {count}");
    }

    #[tokio::test]
    async fn timestamps_are_non_decreasing() {
        let (notifier, seen) = collector();
        let manager = SubscriptionManager::new(notifier);
        manager
            .subscribe(&odometry(), Arc::new(|| async { Ok(json!(0)) }), Some(100.0))
            .await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        manager.shutdown().await;

        let notes = seen.lock().unwrap();
        let timestamps: Vec<String> = notes
            .iter()
            .map(|n| n.params["timestamp"].as_str().unwrap().to_string())
            .collect();
        assert!(timestamps.len() >= 2);
        for pair in timestamps.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }

    #[tokio::test]
    async fn provider_failure_emits_terminal_error_marker() {
        let (notifier, seen) = collector();
        let manager = SubscriptionManager::new(notifier);

        let calls = Arc::new(StdMutex::new(0u32));
        let counter = calls.clone();
        let provider = Arc::new(move || {
            let counter = counter.clone();
            async move {
                let mut n = counter.lock().unwrap();
                *n += 1;
                if *n >= 2 {
                    Err(Error::handler("sensor offline"))
                } else {
                    Ok::<Value, Error>(json!({"ok": true}))
                }
            }
        });

        let source = ContextSource::new("imu", "inertial", ContextDataType::Imu);
        manager.subscribe(&source, provider, Some(100.0)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let notes = seen.lock().unwrap();
        let last = notes.last().expect("at least one update");
        assert_eq!(last.params["data"]["error"], json!("sensor offline"));
        // The loop stopped after the terminal marker.
        assert_eq!(notes.len(), 2);
    }
}
