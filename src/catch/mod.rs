//! Catch sequence state machine
//!
//! Everything that happens between a successful tap and the jump to the
//! result page lives here:
//! - One sequence at a time, never interrupted by further taps
//! - Score committed at the tap, before any animation
//! - Steps advance on the sequencer's own clock, fed by the frame driver

pub mod sequencer;
pub mod state;

pub use sequencer::{CatchSequencer, Stage};
pub use state::{CatchOutcome, SequencePhase};
