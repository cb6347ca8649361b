use std::sync::{Arc, OnceLock};

use shared::{
    domain::{Bit, GateKind, MeasureScope, QubitId, SessionId},
    protocol::{QuantumState, QubitPair, TrialsResult},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

pub mod action;
pub mod effects;
pub mod error;
pub mod led;
pub mod refresh;
pub mod settings;
pub mod transport;
pub mod view;

pub use action::{ActionKind, ActionPermit, ActionSlot};
pub use effects::{EffectState, ExpiringFlags};
pub use error::{PlaygroundError, TransportError, BOOTSTRAP_FAILURE_MESSAGE};
pub use led::LedValues;
pub use refresh::RefreshLoop;
pub use settings::PlaygroundSettings;
pub use transport::{HttpSimulatorApi, SimulatorApi};
pub use view::{AmplitudeMemo, AmplitudeRow, PlaygroundView};

use led::{absorb_measurements, set_led};
use view::{led_views, session_summary, trials_rows};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Bootstrapping,
    Ready,
    /// Bootstrap failed; carries the message to show. There is no retry.
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    Bootstrap,
    Action(ActionKind),
    Refresh,
}

#[derive(Debug, Clone)]
pub enum PlaygroundEvent {
    SessionReady(SessionId),
    StateReplaced {
        state: Arc<QuantumState>,
        origin: SnapshotOrigin,
    },
    LedValuesChanged(LedValues),
    GateAura {
        gate: GateKind,
        active: bool,
    },
    LedBlink {
        qubit: QubitId,
        active: bool,
    },
    ErrorBanner(Option<String>),
    TrialsUpdated(Option<Arc<TrialsResult>>),
    Fatal(String),
}

#[derive(Debug, Clone)]
pub struct MeasureOutcome {
    pub outcome: QubitPair<Option<Bit>>,
    pub state: Arc<QuantumState>,
}

struct SessionState {
    phase: SessionPhase,
    snapshot: Option<Arc<QuantumState>>,
    /// Bumped on every snapshot write; lets a refresh detect that it raced
    /// with a newer write.
    revision: u64,
    leds: LedValues,
    trials: Option<Arc<TrialsResult>>,
    /// Set once by a failed bootstrap; replayed to every later caller.
    bootstrap_failure: Option<TransportError>,
}

impl SessionState {
    fn install(&mut self, state: QuantumState) -> (Arc<QuantumState>, Option<LedValues>) {
        self.revision += 1;
        let snapshot = Arc::new(state);
        let leds_changed = absorb_measurements(&mut self.leds, &snapshot);
        self.snapshot = Some(Arc::clone(&snapshot));
        (snapshot, leds_changed.then_some(self.leds))
    }
}

/// Owns the session handle and the current snapshot of one playground.
pub struct PlaygroundClient {
    api: Arc<dyn SimulatorApi>,
    settings: PlaygroundSettings,
    session: OnceLock<SessionId>,
    slot: ActionSlot,
    inner: Mutex<SessionState>,
    bootstrap_lock: Mutex<()>,
    effects: EffectState,
    refresh_loop: Mutex<Option<RefreshLoop>>,
    events: broadcast::Sender<PlaygroundEvent>,
}

impl PlaygroundClient {
    pub fn new(settings: PlaygroundSettings) -> Result<Arc<Self>, TransportError> {
        let api = HttpSimulatorApi::new(&settings)?;
        Ok(Self::new_with_api(settings, Arc::new(api)))
    }

    pub fn new_with_api(settings: PlaygroundSettings, api: Arc<dyn SimulatorApi>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            api,
            effects: EffectState::new(&settings, events.clone()),
            settings,
            session: OnceLock::new(),
            slot: ActionSlot::new(),
            inner: Mutex::new(SessionState {
                phase: SessionPhase::Bootstrapping,
                snapshot: None,
                revision: 0,
                leds: LedValues::default(),
                trials: None,
                bootstrap_failure: None,
            }),
            bootstrap_lock: Mutex::new(()),
            refresh_loop: Mutex::new(None),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlaygroundEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> &PlaygroundSettings {
        &self.settings
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.get()
    }

    pub fn busy_action(&self) -> Option<ActionKind> {
        self.slot.current()
    }

    pub fn trials_loading(&self) -> bool {
        matches!(self.slot.current(), Some(ActionKind::Trials(_)))
    }

    pub fn effects(&self) -> &EffectState {
        &self.effects
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.phase.clone()
    }

    /// True while bootstrapping or while any action holds the slot.
    pub async fn is_busy(&self) -> bool {
        self.slot.is_occupied() || self.inner.lock().await.phase == SessionPhase::Bootstrapping
    }

    pub async fn snapshot(&self) -> Option<Arc<QuantumState>> {
        self.inner.lock().await.snapshot.clone()
    }

    pub async fn led_values(&self) -> LedValues {
        self.inner.lock().await.leds
    }

    pub async fn trials(&self) -> Option<Arc<TrialsResult>> {
        self.inner.lock().await.trials.clone()
    }

    /// Calls the simulator's health endpoint. Does not touch session state.
    pub async fn check_health(&self) -> Result<(), TransportError> {
        let health = self.api.health().await?;
        debug!(status = %health.status, "session: simulator health");
        Ok(())
    }

    /// Creates the session. Runs at most once successfully; after a failure
    /// the client stays unavailable and later calls fail without a request.
    pub async fn bootstrap(self: &Arc<Self>) -> Result<SessionId, PlaygroundError> {
        let _bootstrapping = self.bootstrap_lock.lock().await;
        if let Some(session_id) = self.session.get() {
            return Ok(session_id.clone());
        }
        if let Some(cause) = &self.inner.lock().await.bootstrap_failure {
            return Err(PlaygroundError::Bootstrap(cause.clone()));
        }

        let response = match self.api.new_session().await {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, "session: bootstrap failed");
                {
                    let mut inner = self.inner.lock().await;
                    inner.phase = SessionPhase::Unavailable(BOOTSTRAP_FAILURE_MESSAGE.to_string());
                    inner.bootstrap_failure = Some(err.clone());
                }
                let _ = self
                    .events
                    .send(PlaygroundEvent::Fatal(BOOTSTRAP_FAILURE_MESSAGE.to_string()));
                return Err(PlaygroundError::Bootstrap(err));
            }
        };

        let session_id = response.session_id;
        let (snapshot, _) = {
            // Publish the session id only once the first snapshot is in place.
            let mut inner = self.inner.lock().await;
            inner.phase = SessionPhase::Ready;
            inner.leds = LedValues::default();
            let installed = inner.install(response.state);
            let _ = self.session.set(session_id.clone());
            installed
        };
        info!(session_id = %session_id, "session: ready");

        let _ = self
            .events
            .send(PlaygroundEvent::SessionReady(session_id.clone()));
        let _ = self.events.send(PlaygroundEvent::StateReplaced {
            state: snapshot,
            origin: SnapshotOrigin::Bootstrap,
        });
        let leds = self.inner.lock().await.leds;
        let _ = self.events.send(PlaygroundEvent::LedValuesChanged(leds));

        self.start_refresh().await;
        Ok(session_id)
    }

    pub async fn apply_gate(&self, gate: GateKind) -> Result<Arc<QuantumState>, PlaygroundError> {
        let kind = ActionKind::Gate(gate);
        let (session_id, _permit) = self.begin(kind)?;
        let state = match self.api.apply_gate(&session_id, gate).await {
            Ok(state) => state,
            Err(err) => return Err(self.action_failed(kind, err)),
        };
        let snapshot = self.replace_snapshot(state, kind).await;
        self.effects.gate_aura.trigger(gate, ());
        Ok(snapshot)
    }

    pub async fn measure(&self, scope: MeasureScope) -> Result<MeasureOutcome, PlaygroundError> {
        let kind = ActionKind::Measure(scope);
        let (session_id, _permit) = self.begin(kind)?;
        let response = match self.api.measure(&session_id, scope).await {
            Ok(response) => response,
            Err(err) => return Err(self.action_failed(kind, err)),
        };
        let snapshot = self.replace_snapshot(response.state, kind).await;
        let observed: Vec<_> = scope
            .qubits()
            .iter()
            .filter_map(|&qubit| (*response.outcome.get(qubit)).map(|bit| (qubit, bit)))
            .collect();
        self.flash_leds(&observed).await;
        Ok(MeasureOutcome {
            outcome: response.outcome,
            state: snapshot,
        })
    }

    pub async fn reset_qubit(&self, qubit: QubitId) -> Result<Arc<QuantumState>, PlaygroundError> {
        let kind = ActionKind::Reset(qubit);
        let (session_id, _permit) = self.begin(kind)?;
        let state = match self.api.reset_qubit(&session_id, qubit).await {
            Ok(state) => state,
            Err(err) => return Err(self.action_failed(kind, err)),
        };
        let snapshot = self.replace_snapshot(state, kind).await;
        self.flash_leds(&[(qubit, Bit::Zero)]).await;
        Ok(snapshot)
    }

    pub async fn hard_reset(&self) -> Result<Arc<QuantumState>, PlaygroundError> {
        let kind = ActionKind::HardReset;
        let (session_id, _permit) = self.begin(kind)?;
        let state = match self.api.hard_reset(&session_id).await {
            Ok(state) => state,
            Err(err) => return Err(self.action_failed(kind, err)),
        };
        let snapshot = self.replace_snapshot(state, kind).await;
        self.flash_leds(&[(QubitId::Q1, Bit::Zero), (QubitId::Q2, Bit::Zero)])
            .await;
        self.inner.lock().await.trials = None;
        let _ = self.events.send(PlaygroundEvent::TrialsUpdated(None));
        Ok(snapshot)
    }

    /// `n` is bounds-checked by the input surface; an out-of-range value is
    /// forwarded and a server rejection surfaces as an action failure.
    pub async fn run_trials(
        &self,
        scope: MeasureScope,
        n: u32,
    ) -> Result<Arc<TrialsResult>, PlaygroundError> {
        let kind = ActionKind::Trials(scope);
        let (session_id, _permit) = self.begin(kind)?;
        let result = match self.api.run_trials(&session_id, scope, n).await {
            Ok(result) => Arc::new(result),
            Err(err) => return Err(self.action_failed(kind, err)),
        };
        info!(session_id = %session_id, scope = %scope, n, "action: trials completed");
        self.inner.lock().await.trials = Some(Arc::clone(&result));
        let _ = self
            .events
            .send(PlaygroundEvent::TrialsUpdated(Some(Arc::clone(&result))));
        Ok(result)
    }

    /// Re-fetches the authoritative state. Returns whether the local snapshot
    /// was replaced; a result is dropped when an action is in flight or a
    /// newer snapshot landed while the fetch was outstanding.
    pub async fn refresh(&self) -> Result<bool, PlaygroundError> {
        let Some(session_id) = self.session.get().cloned() else {
            return Ok(false);
        };
        let issued_at = self.inner.lock().await.revision;

        let state = match self.api.fetch_state(&session_id).await {
            Ok(state) => state,
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "refresh: unable to refresh state");
                return Err(PlaygroundError::Refresh(err));
            }
        };

        if let Some(active) = self.slot.current() {
            debug!(action = %active, "refresh: action in flight, discarding poll result");
            return Ok(false);
        }
        let (snapshot, leds) = {
            let mut inner = self.inner.lock().await;
            if inner.revision != issued_at {
                debug!(
                    issued_at,
                    current = inner.revision,
                    "refresh: newer snapshot already applied, discarding poll result"
                );
                return Ok(false);
            }
            inner.install(state)
        };
        self.publish_snapshot(snapshot, SnapshotOrigin::Refresh, leds);
        Ok(true)
    }

    pub async fn start_refresh(self: &Arc<Self>) {
        let mut refresh_loop = self.refresh_loop.lock().await;
        if refresh_loop.is_none() {
            *refresh_loop = Some(RefreshLoop::spawn(
                Arc::downgrade(self),
                self.settings.poll_interval,
            ));
        }
    }

    pub async fn stop_refresh(&self) {
        if let Some(refresh_loop) = self.refresh_loop.lock().await.take() {
            refresh_loop.stop();
            info!("refresh: loop stopped");
        }
    }

    pub async fn is_refreshing(&self) -> bool {
        self.refresh_loop
            .lock()
            .await
            .as_ref()
            .is_some_and(|refresh_loop| !refresh_loop.is_finished())
    }

    /// Stops background polling and cancels all pending effect timers.
    pub async fn shutdown(&self) {
        self.stop_refresh().await;
        self.effects.clear_all();
    }

    pub async fn view(&self, memo: &mut AmplitudeMemo) -> PlaygroundView {
        let inner = self.inner.lock().await;
        let busy_action = self.slot.current();
        PlaygroundView {
            phase: inner.phase.clone(),
            busy: busy_action.is_some() || inner.phase == SessionPhase::Bootstrapping,
            busy_action,
            trials_loading: matches!(busy_action, Some(ActionKind::Trials(_))),
            amplitudes: memo.rows(inner.snapshot.as_ref()),
            leds: led_views(&inner.leds, |qubit| self.effects.led_blink.is_active(&qubit)),
            active_auras: self.effects.active_auras(),
            banner: self.effects.banner(),
            summary: session_summary(self.session.get(), inner.snapshot.as_deref()),
            trials: inner
                .trials
                .as_deref()
                .map(trials_rows)
                .unwrap_or_default(),
        }
    }

    fn begin(&self, kind: ActionKind) -> Result<(SessionId, ActionPermit), PlaygroundError> {
        let Some(session_id) = self.session.get().cloned() else {
            debug!(action = %kind, "action: refused, session not ready");
            self.raise_banner(kind.failure_message());
            return Err(PlaygroundError::SessionNotReady);
        };
        let permit = self.slot.try_acquire(kind).inspect_err(|_| {
            debug!(action = %kind, "action: refused, slot occupied");
        })?;
        debug!(session_id = %session_id, action = %kind, "action: started");
        Ok((session_id, permit))
    }

    fn action_failed(&self, kind: ActionKind, err: TransportError) -> PlaygroundError {
        error!(action = %kind, error = %err, "action: failed");
        self.raise_banner(kind.failure_message());
        PlaygroundError::Action {
            action: kind,
            source: err,
        }
    }

    fn raise_banner(&self, message: &str) {
        self.effects.error_banner.trigger((), message.to_string());
    }

    async fn replace_snapshot(&self, state: QuantumState, kind: ActionKind) -> Arc<QuantumState> {
        let (snapshot, leds) = self.inner.lock().await.install(state);
        self.publish_snapshot(Arc::clone(&snapshot), SnapshotOrigin::Action(kind), leds);
        snapshot
    }

    fn publish_snapshot(
        &self,
        snapshot: Arc<QuantumState>,
        origin: SnapshotOrigin,
        leds: Option<LedValues>,
    ) {
        let _ = self.events.send(PlaygroundEvent::StateReplaced {
            state: snapshot,
            origin,
        });
        if let Some(leds) = leds {
            let _ = self.events.send(PlaygroundEvent::LedValuesChanged(leds));
        }
    }

    /// Records explicit outcomes in the LED cache and blinks each LED, even
    /// when its value did not change.
    async fn flash_leds(&self, outcomes: &[(QubitId, Bit)]) {
        let changed = {
            let mut inner = self.inner.lock().await;
            let mut changed = false;
            for &(qubit, value) in outcomes {
                changed |= set_led(&mut inner.leds, qubit, value);
            }
            changed.then_some(inner.leds)
        };
        if let Some(leds) = changed {
            let _ = self.events.send(PlaygroundEvent::LedValuesChanged(leds));
        }
        for &(qubit, _) in outcomes {
            self.effects.led_blink.trigger(qubit, ());
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
