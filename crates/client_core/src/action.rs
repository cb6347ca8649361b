use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::domain::{GateKind, MeasureScope, QubitId};

use crate::error::PlaygroundError;

/// A mutating operation against the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Gate(GateKind),
    Measure(MeasureScope),
    Reset(QubitId),
    HardReset,
    Trials(MeasureScope),
}

impl ActionKind {
    pub fn failure_message(self) -> &'static str {
        match self {
            ActionKind::Gate(_) => "Failed to apply gate.",
            ActionKind::Measure(_) => "Measurement failed.",
            ActionKind::Reset(_) => "Reset failed.",
            ActionKind::HardReset => "Hard reset failed.",
            ActionKind::Trials(_) => "Trials failed.",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Gate(gate) => write!(f, "gate-{gate}"),
            ActionKind::Measure(scope) => write!(f, "measure-{scope}"),
            ActionKind::Reset(qubit) => write!(f, "reset-{qubit}"),
            ActionKind::HardReset => f.write_str("reset-hard"),
            ActionKind::Trials(scope) => write!(f, "trials-{scope}"),
        }
    }
}

/// Single exclusivity slot shared by every mutating action. Acquisition never
/// waits: a caller either gets the permit immediately or is refused.
#[derive(Debug, Clone, Default)]
pub struct ActionSlot {
    occupant: Arc<Mutex<Option<ActionKind>>>,
}

impl ActionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, kind: ActionKind) -> Result<ActionPermit, PlaygroundError> {
        let mut occupant = lock(&self.occupant);
        if let Some(active) = *occupant {
            return Err(PlaygroundError::Busy { active });
        }
        *occupant = Some(kind);
        Ok(ActionPermit {
            occupant: Arc::clone(&self.occupant),
            kind,
        })
    }

    pub fn current(&self) -> Option<ActionKind> {
        *lock(&self.occupant)
    }

    pub fn is_occupied(&self) -> bool {
        self.current().is_some()
    }
}

/// Holding this keeps the slot occupied; dropping it releases the slot on
/// every exit path.
#[derive(Debug)]
pub struct ActionPermit {
    occupant: Arc<Mutex<Option<ActionKind>>>,
    kind: ActionKind,
}

impl Drop for ActionPermit {
    fn drop(&mut self) {
        let mut occupant = lock(&self.occupant);
        if *occupant == Some(self.kind) {
            *occupant = None;
        }
    }
}

fn lock(occupant: &Mutex<Option<ActionKind>>) -> MutexGuard<'_, Option<ActionKind>> {
    occupant.lock().unwrap_or_else(PoisonError::into_inner)
}
