use shared::{
    domain::{Bit, QubitId},
    protocol::{QuantumState, QubitPair},
};

/// Last known LED value per qubit.
pub type LedValues = QubitPair<Bit>;

/// Sets one LED, returning whether the value changed.
pub fn set_led(leds: &mut LedValues, qubit: QubitId, value: Bit) -> bool {
    let slot = leds.get_mut(qubit);
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

/// Copies every known measurement in `state` into the LED cache. Unknown
/// (`null`) entries leave the cached value untouched.
pub fn absorb_measurements(leds: &mut LedValues, state: &QuantumState) -> bool {
    let mut changed = false;
    for qubit in QubitId::ALL {
        if let Some(value) = *state.last_measurement.get(qubit) {
            changed |= set_led(leds, qubit, value);
        }
    }
    changed
}
