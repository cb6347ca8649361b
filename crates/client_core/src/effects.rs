//! Self-expiring presentation flags: gate auras, LED blinks and the error
//! banner. They are driven by action outcomes, not by the quantum state.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use shared::domain::{GateKind, QubitId};
use tokio::task::JoinHandle;
use tracing::trace;

use crate::{settings::PlaygroundSettings, PlaygroundEvent};

type Notify<K, V> = Arc<dyn Fn(K, Option<V>) + Send + Sync>;

struct ActiveFlag<V> {
    value: V,
    generation: u64,
    expiry: JoinHandle<()>,
}

/// Keyed flags that switch themselves off `ttl` after their last trigger.
///
/// Re-triggering a key that is still active aborts its pending expiry and
/// schedules a fresh one, so a key clears exactly once, `ttl` after the most
/// recent trigger.
pub struct ExpiringFlags<K, V> {
    name: &'static str,
    ttl: Duration,
    entries: Arc<Mutex<HashMap<K, ActiveFlag<V>>>>,
    generation: AtomicU64,
    notify: Notify<K, V>,
}

impl<K, V> ExpiringFlags<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new(
        name: &'static str,
        ttl: Duration,
        notify: impl Fn(K, Option<V>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            notify: Arc::new(notify),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn trigger(&self, key: K, value: V) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let previous = {
            let mut entries = lock(&self.entries);
            let expiry = self.spawn_expiry(key.clone(), generation);
            entries.insert(
                key.clone(),
                ActiveFlag {
                    value: value.clone(),
                    generation,
                    expiry,
                },
            )
        };
        if let Some(previous) = previous {
            previous.expiry.abort();
            trace!(flag = self.name, "restarted expiry window");
        }
        (self.notify)(key, Some(value));
    }

    fn spawn_expiry(&self, key: K, generation: u64) -> JoinHandle<()> {
        let entries = Arc::clone(&self.entries);
        let notify = Arc::clone(&self.notify);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let expired = {
                let mut entries = lock(&entries);
                match entries.get(&key) {
                    Some(active) if active.generation == generation => {
                        entries.remove(&key);
                        true
                    }
                    _ => false,
                }
            };
            if expired {
                notify(key, None);
            }
        })
    }

    pub fn is_active(&self, key: &K) -> bool {
        lock(&self.entries).contains_key(key)
    }

    pub fn value(&self, key: &K) -> Option<V> {
        lock(&self.entries).get(key).map(|active| active.value.clone())
    }

    /// Cancels all pending expiries and clears every flag immediately.
    pub fn clear(&self) {
        let drained: Vec<_> = lock(&self.entries).drain().collect();
        for (key, active) in drained {
            active.expiry.abort();
            (self.notify)(key, None);
        }
    }
}

impl<K, V> Drop for ExpiringFlags<K, V> {
    fn drop(&mut self) {
        for (_, active) in lock(&self.entries).drain() {
            active.expiry.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// All ephemeral animation state of one playground session.
pub struct EffectState {
    pub gate_aura: ExpiringFlags<GateKind, ()>,
    pub led_blink: ExpiringFlags<QubitId, ()>,
    pub error_banner: ExpiringFlags<(), String>,
}

impl EffectState {
    pub fn new(
        settings: &PlaygroundSettings,
        events: tokio::sync::broadcast::Sender<PlaygroundEvent>,
    ) -> Self {
        let aura_events = events.clone();
        let blink_events = events.clone();
        Self {
            gate_aura: ExpiringFlags::new("gate_aura", settings.gate_aura, move |gate, value| {
                let _ = aura_events.send(PlaygroundEvent::GateAura {
                    gate,
                    active: value.is_some(),
                });
            }),
            led_blink: ExpiringFlags::new("led_blink", settings.led_blink, move |qubit, value| {
                let _ = blink_events.send(PlaygroundEvent::LedBlink {
                    qubit,
                    active: value.is_some(),
                });
            }),
            error_banner: ExpiringFlags::new(
                "error_banner",
                settings.error_banner,
                move |(), message| {
                    let _ = events.send(PlaygroundEvent::ErrorBanner(message));
                },
            ),
        }
    }

    pub fn banner(&self) -> Option<String> {
        self.error_banner.value(&())
    }

    pub fn active_auras(&self) -> Vec<GateKind> {
        GateKind::ALL
            .into_iter()
            .filter(|gate| self.gate_aura.is_active(gate))
            .collect()
    }

    pub fn clear_all(&self) {
        self.gate_aura.clear();
        self.led_blink.clear();
        self.error_banner.clear();
    }
}
