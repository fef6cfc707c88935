use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::catalog::VideoId;
use crate::pipeline::Transcript;
use crate::TranscriptError;

type Outcome = Result<Transcript, TranscriptError>;

/// Cache key: one video under one normalized language preference list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    video_id: VideoId,
    languages: Vec<String>,
}

impl CacheKey {
    pub fn new(video_id: VideoId, languages: Vec<String>) -> Self {
        Self {
            video_id,
            languages,
        }
    }
}

/// Per-key slot state; the whole dedup invariant lives in this one map
enum Slot {
    /// A completed transcript and when it was stored
    Ready {
        transcript: Transcript,
        stored_at: Instant,
    },
    /// A computation is running; subscribers share its outcome
    InFlight(watch::Receiver<Option<Outcome>>),
}

/// Result of a synchronous slot lookup/registration
enum Lookup {
    Ready(Outcome),
    Join(watch::Receiver<Option<Outcome>>),
    Miss(watch::Sender<Option<Outcome>>, watch::Receiver<Option<Outcome>>),
}

/// TTL transcript cache with single-flight deduplication
///
/// At most one computation runs per key at a time. Concurrent callers for the
/// same key subscribe to the in-flight result instead of issuing their own
/// upstream requests, and all of them receive the same outcome, success or
/// failure. Failures are never stored. Expired entries are evicted lazily on
/// the next lookup; there is no background sweeper.
pub struct TranscriptCache {
    ttl: Duration,
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl TranscriptCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached transcript for `key`, or run `compute` to produce it
    ///
    /// The computation runs on its own task, so a waiter whose request is
    /// aborted does not cancel it for the other subscribers of the same key.
    pub async fn get_or_compute<F, Fut>(self: &Arc<Self>, key: CacheKey, compute: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        match self.lookup_or_register(&key) {
            Lookup::Ready(outcome) => outcome,
            Lookup::Join(rx) => self.wait_for_outcome(&key, rx).await,
            Lookup::Miss(tx, rx) => {
                let cache = Arc::clone(self);
                let task_key = key.clone();
                let future = compute();
                tokio::spawn(async move {
                    let outcome = future.await;
                    {
                        let mut slots = cache.slots.lock();
                        match &outcome {
                            Ok(transcript) => {
                                slots.insert(
                                    task_key,
                                    Slot::Ready {
                                        transcript: transcript.clone(),
                                        stored_at: Instant::now(),
                                    },
                                );
                            }
                            Err(_) => {
                                slots.remove(&task_key);
                            }
                        }
                    }
                    let _ = tx.send(Some(outcome));
                });

                self.wait_for_outcome(&key, rx).await
            }
        }
    }

    /// Synchronous slot lookup/registration; never holds the lock across an await
    fn lookup_or_register(self: &Arc<Self>, key: &CacheKey) -> Lookup {
        let mut slots = self.slots.lock();

        match slots.get(key) {
            Some(Slot::Ready {
                transcript,
                stored_at,
            }) => {
                if stored_at.elapsed() < self.ttl {
                    tracing::debug!(video = %key.video_id, "transcript cache hit");
                    return Lookup::Ready(Ok(transcript.clone()));
                }
                tracing::debug!(video = %key.video_id, "transcript cache entry expired");
                slots.remove(key);
            }
            Some(Slot::InFlight(rx)) => {
                tracing::debug!(video = %key.video_id, "joining in-flight computation");
                return Lookup::Join(rx.clone());
            }
            None => {}
        }

        tracing::debug!(video = %key.video_id, "transcript cache miss");
        let (tx, rx) = watch::channel(None);
        slots.insert(key.clone(), Slot::InFlight(rx.clone()));
        Lookup::Miss(tx, rx)
    }

    /// Block until the in-flight computation for `key` publishes its outcome
    async fn wait_for_outcome(
        &self,
        key: &CacheKey,
        mut rx: watch::Receiver<Option<Outcome>>,
    ) -> Outcome {
        loop {
            {
                let value = rx.borrow_and_update();
                if let Some(outcome) = value.as_ref() {
                    return outcome.clone();
                }
            }
            if rx.changed().await.is_err() {
                // Sender gone: either the outcome landed just before the
                // drop, or the computation task died without publishing.
                if let Some(outcome) = rx.borrow().as_ref() {
                    return outcome.clone();
                }
                self.remove_dead_slot(key);
                return Err(TranscriptError::UpstreamUnavailable(
                    "transcript computation was aborted".to_string(),
                ));
            }
        }
    }

    /// Drop an in-flight slot whose computation died without a result
    fn remove_dead_slot(&self, key: &CacheKey) {
        let mut slots = self.slots.lock();
        if let Some(Slot::InFlight(rx)) = slots.get(key) {
            if rx.has_changed().is_err() && rx.borrow().is_none() {
                slots.remove(key);
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}
