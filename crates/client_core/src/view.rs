//! Pure presentation values derived from a snapshot.

use std::sync::Arc;

use shared::{
    domain::{BasisLabel, Bit, GateKind, QubitId, SessionId},
    protocol::{QuantumState, TrialsResult},
};

use crate::{action::ActionKind, led::LedValues, SessionPhase};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmplitudeRow {
    pub basis: BasisLabel,
    pub real: String,
    pub imag: String,
    pub magnitude: String,
}

pub fn format_fixed3(value: f64) -> String {
    // Avoid rendering an exact negative zero as "-0.000".
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{value:.3}")
}

pub fn amplitude_rows(state: &QuantumState) -> Vec<AmplitudeRow> {
    state
        .vector
        .iter()
        .map(|(basis, amplitude)| AmplitudeRow {
            basis,
            real: format_fixed3(amplitude.real),
            imag: format_fixed3(amplitude.imag),
            magnitude: format_fixed3(amplitude.magnitude()),
        })
        .collect()
}

/// Caches amplitude rows for the snapshot they were computed from.
/// Snapshots are replaced wholesale, so pointer identity is the change signal.
#[derive(Debug)]
pub struct AmplitudeMemo {
    source: Option<Arc<QuantumState>>,
    rows: Arc<[AmplitudeRow]>,
}

impl Default for AmplitudeMemo {
    fn default() -> Self {
        Self::new()
    }
}

impl AmplitudeMemo {
    pub fn new() -> Self {
        Self {
            source: None,
            rows: Arc::from(Vec::new()),
        }
    }

    pub fn rows(&mut self, state: Option<&Arc<QuantumState>>) -> Arc<[AmplitudeRow]> {
        let unchanged = match (&self.source, state) {
            (Some(cached), Some(current)) => Arc::ptr_eq(cached, current),
            (None, None) => true,
            _ => false,
        };
        if !unchanged {
            self.rows = state
                .map(|state| Arc::from(amplitude_rows(state)))
                .unwrap_or_else(|| Arc::from(Vec::new()));
            self.source = state.cloned();
        }
        Arc::clone(&self.rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedColor {
    Green,
    Red,
}

pub fn led_color(value: Bit) -> LedColor {
    match value {
        Bit::Zero => LedColor::Green,
        Bit::One => LedColor::Red,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedView {
    pub qubit: QubitId,
    pub value: Bit,
    pub color: LedColor,
    pub blinking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateInfo {
    pub gate: GateKind,
    pub label: &'static str,
    pub description: &'static str,
}

pub fn gate_info(gate: GateKind) -> GateInfo {
    let (label, description) = match gate {
        GateKind::X => ("G1", "Flip"),
        GateKind::H => ("G2", "Superposition"),
        GateKind::Cnot => ("G3", "Entangle"),
    };
    GateInfo {
        gate,
        label,
        description,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: String,
    pub collapsed: String,
    pub last_measurement: String,
}

const PENDING: &str = "…";

pub fn session_summary(
    session_id: Option<&SessionId>,
    state: Option<&QuantumState>,
) -> SessionSummary {
    let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
    let known = |bit: Option<Bit>| bit.map(|bit| bit.to_string()).unwrap_or_else(|| "—".into());
    SessionSummary {
        session_id: session_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| PENDING.into()),
        collapsed: state
            .map(|state| {
                format!(
                    "Q1: {}, Q2: {}",
                    yes_no(state.collapsed.q1),
                    yes_no(state.collapsed.q2)
                )
            })
            .unwrap_or_else(|| PENDING.into()),
        last_measurement: state
            .map(|state| {
                format!(
                    "Q1: {}, Q2: {}",
                    known(state.last_measurement.q1),
                    known(state.last_measurement.q2)
                )
            })
            .unwrap_or_else(|| PENDING.into()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialsRow {
    pub outcome: String,
    pub count: u64,
    pub percent: String,
}

pub fn trials_rows(result: &TrialsResult) -> Vec<TrialsRow> {
    result
        .counts
        .iter()
        .map(|(outcome, count)| {
            let freq = result.freqs.get(outcome).copied().unwrap_or(0.0);
            TrialsRow {
                outcome: outcome.clone(),
                count: *count,
                percent: format!("{:.1}%", freq * 100.0),
            }
        })
        .collect()
}

/// Everything a front-end needs to draw one frame.
#[derive(Debug, Clone)]
pub struct PlaygroundView {
    pub phase: SessionPhase,
    pub busy: bool,
    pub busy_action: Option<ActionKind>,
    pub trials_loading: bool,
    pub amplitudes: Arc<[AmplitudeRow]>,
    pub leds: [LedView; 2],
    pub active_auras: Vec<GateKind>,
    pub banner: Option<String>,
    pub summary: SessionSummary,
    pub trials: Vec<TrialsRow>,
}

pub fn led_views(values: &LedValues, blinking: impl Fn(QubitId) -> bool) -> [LedView; 2] {
    QubitId::ALL.map(|qubit| {
        let value = *values.get(qubit);
        LedView {
            qubit,
            value,
            color: led_color(value),
            blinking: blinking(qubit),
        }
    })
}
