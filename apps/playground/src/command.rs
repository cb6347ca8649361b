//! Line commands read from stdin.

use std::str::FromStr;

use client_core::settings::{MAX_TRIALS, MIN_TRIALS};
use shared::domain::{GateKind, MeasureScope, ParseDomainError, QubitId};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Gate(GateKind),
    Measure(MeasureScope),
    Reset(QubitId),
    HardReset,
    Trials { scope: MeasureScope, n: u32 },
    State,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Domain(#[from] ParseDomainError),
    #[error("trial count must be a whole number between 1 and 50000")]
    TrialCount,
}

pub const HELP: &str = "\
commands:
  gate <x|h|cnot>            apply a gate (G1 Flip, G2 Superposition, G3 Entangle)
  measure <q1|q2|both>       measure one qubit or both
  reset <q1|q2>              reset one qubit to |0>
  hard-reset                 reset both qubits and clear trials
  trials <q1|q2|both> <n>    sample n measurements without collapsing
  state                      print the current state
  help                       show this message
  quit                       exit";

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err(CommandError::Empty);
        };
        let args: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("gate" | "g", [gate]) => Command::Gate(gate.parse()?),
            ("gate" | "g", _) => return Err(CommandError::Usage("gate <x|h|cnot>")),
            ("measure" | "m", [scope]) => Command::Measure(scope.parse()?),
            ("measure" | "m", _) => return Err(CommandError::Usage("measure <q1|q2|both>")),
            ("reset" | "r", [qubit]) => Command::Reset(qubit.parse()?),
            ("reset" | "r", _) => return Err(CommandError::Usage("reset <q1|q2>")),
            ("hard-reset" | "hardreset", []) => Command::HardReset,
            ("trials" | "t", [scope, n]) => Command::Trials {
                scope: scope.parse()?,
                n: parse_trial_count(n)?,
            },
            ("trials" | "t", _) => return Err(CommandError::Usage("trials <q1|q2|both> <n>")),
            ("state" | "s", []) => Command::State,
            ("help" | "?", _) => Command::Help,
            ("quit" | "exit" | "q", _) => Command::Quit,
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

fn parse_trial_count(raw: &str) -> Result<u32, CommandError> {
    let n: u32 = raw.parse().map_err(|_| CommandError::TrialCount)?;
    if (MIN_TRIALS..=MAX_TRIALS).contains(&n) {
        Ok(n)
    } else {
        Err(CommandError::TrialCount)
    }
}
