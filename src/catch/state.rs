//! Sequence phases and outcomes

/// Current step of the catch sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencePhase {
    /// Waiting for a tap on the coin
    #[default]
    Idle,
    /// Coin turning to face the camera
    Aligning,
    /// Coin pulled back along its forward axis
    Retracting,
    /// Coin spinning away with the throw sound
    Spinning,
    /// Coin coming back to its rest position
    Returning,
    /// Beat before the reward, coin scale settles
    Revealing,
    /// Reward text growing with the success sound
    GrowingReward,
    /// Result page requested, waiting out the sound grace period
    Completed,
}

impl SequencePhase {
    /// Step that follows this one; Completed wraps to Idle
    pub fn next(self) -> Self {
        match self {
            SequencePhase::Idle => SequencePhase::Aligning,
            SequencePhase::Aligning => SequencePhase::Retracting,
            SequencePhase::Retracting => SequencePhase::Spinning,
            SequencePhase::Spinning => SequencePhase::Returning,
            SequencePhase::Returning => SequencePhase::Revealing,
            SequencePhase::Revealing => SequencePhase::GrowingReward,
            SequencePhase::GrowingReward => SequencePhase::Completed,
            SequencePhase::Completed => SequencePhase::Idle,
        }
    }

    pub fn is_idle(self) -> bool {
        self == SequencePhase::Idle
    }
}

/// What a tap earned, decided the moment it was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchOutcome {
    pub target_id: String,
    /// Points added by this catch (0 when repeated)
    pub awarded: u64,
    /// Total after the catch
    pub total: u64,
    /// The coin had already been caught before
    pub repeated: bool,
}
