use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque session handle issued by the simulator on `/session/new`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised {kind} '{value}'")]
pub struct ParseDomainError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseDomainError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GateKind {
    X,
    H,
    #[serde(rename = "CNOT")]
    Cnot,
}

impl GateKind {
    pub const ALL: [GateKind; 3] = [GateKind::X, GateKind::H, GateKind::Cnot];

    pub fn as_str(self) -> &'static str {
        match self {
            GateKind::X => "X",
            GateKind::H => "H",
            GateKind::Cnot => "CNOT",
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateKind {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(GateKind::X),
            "H" => Ok(GateKind::H),
            "CNOT" | "CX" => Ok(GateKind::Cnot),
            _ => Err(ParseDomainError::new("gate", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QubitId {
    Q1,
    Q2,
}

impl QubitId {
    pub const ALL: [QubitId; 2] = [QubitId::Q1, QubitId::Q2];

    pub fn as_str(self) -> &'static str {
        match self {
            QubitId::Q1 => "Q1",
            QubitId::Q2 => "Q2",
        }
    }
}

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QubitId {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Q1" => Ok(QubitId::Q1),
            "Q2" => Ok(QubitId::Q2),
            _ => Err(ParseDomainError::new("qubit", s)),
        }
    }
}

/// Target of a measurement or trials run: one qubit or the joint system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureScope {
    Q1,
    Q2,
    #[serde(rename = "BOTH")]
    Both,
}

impl MeasureScope {
    pub fn qubits(self) -> &'static [QubitId] {
        match self {
            MeasureScope::Q1 => &[QubitId::Q1],
            MeasureScope::Q2 => &[QubitId::Q2],
            MeasureScope::Both => &QubitId::ALL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MeasureScope::Q1 => "Q1",
            MeasureScope::Q2 => "Q2",
            MeasureScope::Both => "BOTH",
        }
    }
}

impl From<QubitId> for MeasureScope {
    fn from(value: QubitId) -> Self {
        match value {
            QubitId::Q1 => MeasureScope::Q1,
            QubitId::Q2 => MeasureScope::Q2,
        }
    }
}

impl fmt::Display for MeasureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasureScope {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Q1" => Ok(MeasureScope::Q1),
            "Q2" => Ok(MeasureScope::Q2),
            "BOTH" => Ok(MeasureScope::Both),
            _ => Err(ParseDomainError::new("measure scope", s)),
        }
    }
}

/// Classical measurement result. Serialised as the integer `0` or `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Bit {
    #[default]
    Zero,
    One,
}

impl From<Bit> for u8 {
    fn from(value: Bit) -> Self {
        match value {
            Bit::Zero => 0,
            Bit::One => 1,
        }
    }
}

impl TryFrom<u8> for Bit {
    type Error = ParseDomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Bit::Zero),
            1 => Ok(Bit::One),
            other => Err(ParseDomainError::new("bit", &other.to_string())),
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// Two-qubit computational basis label, ordered `00, 01, 10, 11`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BasisLabel {
    #[serde(rename = "00")]
    B00,
    #[serde(rename = "01")]
    B01,
    #[serde(rename = "10")]
    B10,
    #[serde(rename = "11")]
    B11,
}

impl BasisLabel {
    pub const CANONICAL: [BasisLabel; 4] = [
        BasisLabel::B00,
        BasisLabel::B01,
        BasisLabel::B10,
        BasisLabel::B11,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BasisLabel::B00 => "00",
            BasisLabel::B01 => "01",
            BasisLabel::B10 => "10",
            BasisLabel::B11 => "11",
        }
    }
}

impl fmt::Display for BasisLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
