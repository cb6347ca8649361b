use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{BasisLabel, Bit, GateKind, MeasureScope, QubitId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Amplitude {
    pub real: f64,
    pub imag: f64,
}

impl Amplitude {
    pub const ZERO: Amplitude = Amplitude {
        real: 0.0,
        imag: 0.0,
    };

    pub fn new(real: f64, imag: f64) -> Self {
        Self { real, imag }
    }

    pub fn magnitude(&self) -> f64 {
        self.real.hypot(self.imag)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StateVector {
    #[serde(rename = "00")]
    pub b00: Amplitude,
    #[serde(rename = "01")]
    pub b01: Amplitude,
    #[serde(rename = "10")]
    pub b10: Amplitude,
    #[serde(rename = "11")]
    pub b11: Amplitude,
}

impl StateVector {
    pub fn basis(label: BasisLabel) -> Self {
        let mut vector = Self::default();
        *vector.amplitude_mut(label) = Amplitude::new(1.0, 0.0);
        vector
    }

    pub fn amplitude(&self, label: BasisLabel) -> Amplitude {
        match label {
            BasisLabel::B00 => self.b00,
            BasisLabel::B01 => self.b01,
            BasisLabel::B10 => self.b10,
            BasisLabel::B11 => self.b11,
        }
    }

    pub fn amplitude_mut(&mut self, label: BasisLabel) -> &mut Amplitude {
        match label {
            BasisLabel::B00 => &mut self.b00,
            BasisLabel::B01 => &mut self.b01,
            BasisLabel::B10 => &mut self.b10,
            BasisLabel::B11 => &mut self.b11,
        }
    }

    /// Amplitudes in canonical basis order.
    pub fn iter(&self) -> impl Iterator<Item = (BasisLabel, Amplitude)> + '_ {
        BasisLabel::CANONICAL
            .into_iter()
            .map(move |label| (label, self.amplitude(label)))
    }
}

/// Per-qubit value keyed `Q1`/`Q2` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QubitPair<T> {
    #[serde(rename = "Q1", default)]
    pub q1: T,
    #[serde(rename = "Q2", default)]
    pub q2: T,
}

impl<T> QubitPair<T> {
    pub fn new(q1: T, q2: T) -> Self {
        Self { q1, q2 }
    }

    pub fn get(&self, qubit: QubitId) -> &T {
        match qubit {
            QubitId::Q1 => &self.q1,
            QubitId::Q2 => &self.q2,
        }
    }

    pub fn get_mut(&mut self, qubit: QubitId) -> &mut T {
        match qubit {
            QubitId::Q1 => &mut self.q1,
            QubitId::Q2 => &mut self.q2,
        }
    }
}

/// One snapshot of the two-qubit system as reported by the simulator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuantumState {
    pub vector: StateVector,
    #[serde(default)]
    pub collapsed: QubitPair<bool>,
    #[serde(default)]
    pub last_measurement: QubitPair<Option<Bit>>,
}

impl QuantumState {
    /// The `|00⟩` state with no measurement history.
    pub fn ground() -> Self {
        Self {
            vector: StateVector::basis(BasisLabel::B00),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSessionResponse {
    pub session_id: SessionId,
    pub state: QuantumState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: QuantumState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRequest {
    pub session_id: SessionId,
    pub gate: GateKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureRequest {
    pub session_id: SessionId,
    pub qubit: MeasureScope,
}

/// Measurement response. For a single-qubit measurement the other qubit's
/// entry carries the simulator's previous knowledge and may be `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureResponse {
    pub outcome: QubitPair<Option<Bit>>,
    pub state: QuantumState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetRequest {
    pub session_id: SessionId,
    pub qubit: QubitId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardResetRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialsRequest {
    pub session_id: SessionId,
    pub qubit: MeasureScope,
    pub n: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrialsResult {
    pub counts: BTreeMap<String, u64>,
    pub freqs: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_simulator_state_payload() {
        let raw = r#"{
            "vector": {
                "00": {"real": 0.7071067811865475, "imag": 0.0},
                "01": {"real": 0.0, "imag": 0.0},
                "10": {"real": 0.7071067811865475, "imag": 0.0},
                "11": {"real": 0.0, "imag": 0.0}
            },
            "collapsed": {"Q1": true, "Q2": false},
            "last_measurement": {"Q1": 1, "Q2": null}
        }"#;

        let state: QuantumState = serde_json::from_str(raw).expect("decode state");
        assert!((state.vector.b10.real - 0.7071067811865475).abs() < f64::EPSILON);
        assert!(state.collapsed.q1);
        assert!(!state.collapsed.q2);
        assert_eq!(state.last_measurement.q1, Some(Bit::One));
        assert_eq!(state.last_measurement.q2, None);
    }

    #[test]
    fn missing_basis_label_is_rejected() {
        let raw = r#"{
            "vector": {"00": {"real": 1.0, "imag": 0.0}},
            "collapsed": {"Q1": false, "Q2": false},
            "last_measurement": {"Q1": null, "Q2": null}
        }"#;
        assert!(serde_json::from_str::<QuantumState>(raw).is_err());
    }

    #[test]
    fn measure_outcome_tolerates_null_for_unmeasured_qubit() {
        let raw = r#"{
            "outcome": {"Q1": 0, "Q2": null},
            "state": {
                "vector": {
                    "00": {"real": 1.0, "imag": 0.0},
                    "01": {"real": 0.0, "imag": 0.0},
                    "10": {"real": 0.0, "imag": 0.0},
                    "11": {"real": 0.0, "imag": 0.0}
                },
                "collapsed": {"Q1": true, "Q2": false},
                "last_measurement": {"Q1": 0, "Q2": null}
            }
        }"#;
        let response: MeasureResponse = serde_json::from_str(raw).expect("decode measure");
        assert_eq!(response.outcome, QubitPair::new(Some(Bit::Zero), None));
    }

    #[test]
    fn requests_serialise_with_wire_field_names() {
        let body = serde_json::to_value(TrialsRequest {
            session_id: SessionId("abc".into()),
            qubit: MeasureScope::Both,
            n: 1000,
        })
        .expect("encode");
        assert_eq!(
            body,
            serde_json::json!({"session_id": "abc", "qubit": "BOTH", "n": 1000})
        );
    }

    #[test]
    fn vector_iterates_in_canonical_order() {
        let labels: Vec<_> = StateVector::basis(BasisLabel::B11)
            .iter()
            .map(|(label, _)| label.as_str())
            .collect();
        assert_eq!(labels, ["00", "01", "10", "11"]);
        assert_eq!(
            StateVector::basis(BasisLabel::B11).amplitude(BasisLabel::B11),
            Amplitude::new(1.0, 0.0)
        );
    }
}
