use std::fmt::Write;

use client_core::{
    view::{gate_info, LedColor},
    PlaygroundView, SessionPhase,
};
use shared::domain::GateKind;

pub fn render_view(view: &PlaygroundView) -> String {
    let mut out = String::new();

    match &view.phase {
        SessionPhase::Bootstrapping => out.push_str("Creating session...\n"),
        SessionPhase::Unavailable(message) => {
            let _ = writeln!(out, "!! {message}");
            return out;
        }
        SessionPhase::Ready => {}
    }

    let _ = writeln!(out, "Session ID: {}", view.summary.session_id);
    let _ = writeln!(out, "Collapsed:  {}", view.summary.collapsed);
    let _ = writeln!(out, "Last meas.: {}", view.summary.last_measurement);

    out.push_str("\n basis      real      imag       |a|\n");
    for row in view.amplitudes.iter() {
        let _ = writeln!(
            out,
            " |{}>  {:>8}  {:>8}  {:>8}",
            row.basis, row.real, row.imag, row.magnitude
        );
    }

    out.push('\n');
    for led in &view.leds {
        let color = match led.color {
            LedColor::Green => "green",
            LedColor::Red => "red",
        };
        let blink = if led.blinking { " *" } else { "" };
        let _ = writeln!(out, " LED {}: {} ({color}){blink}", led.qubit, led.value);
    }

    out.push_str(&render_gates(&view.active_auras));

    if view.trials_loading {
        out.push_str("\nTrials running...\n");
    } else if !view.trials.is_empty() {
        out.push_str("\n outcome     count  freq\n");
        for row in &view.trials {
            let _ = writeln!(out, " {:>7}  {:>8}  {}", row.outcome, row.count, row.percent);
        }
    }

    if let Some(action) = view.busy_action {
        let _ = writeln!(out, "\n(busy: {action})");
    }
    if let Some(banner) = &view.banner {
        let _ = writeln!(out, "\n!! {banner}");
    }
    out
}

fn render_gates(active: &[GateKind]) -> String {
    let mut out = String::from("\n");
    for gate in GateKind::ALL {
        let info = gate_info(gate);
        let aura = if active.contains(&gate) { " ~aura~" } else { "" };
        let _ = writeln!(
            out,
            " [{}] {} ({}){aura}",
            info.label,
            info.description,
            gate
        );
    }
    out
}
