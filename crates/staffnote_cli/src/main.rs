//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `staffnote_core` linkage without any UI runtime.
//! - Print the reference scale ledger with deterministic ids.

use staffnote_core::{EditingSession, SequentialIdSource};

fn main() {
    println!("staffnote_core ping={}", staffnote_core::ping());
    println!("staffnote_core version={}", staffnote_core::core_version());

    let mut session = EditingSession::start("smoke", SequentialIdSource::new("smoke"));
    if let Err(err) = session.load_reference_scale() {
        eprintln!("reference scale failed: {err}");
        std::process::exit(1);
    }

    if let Some(voice) = session.composition().active_voice() {
        for entry in voice.notes.iter() {
            println!(
                "{} pos={} pitch={} duration={}",
                entry.id,
                entry.position,
                entry.pitch.as_deref().unwrap_or("-"),
                entry.duration
            );
        }
    }
}
