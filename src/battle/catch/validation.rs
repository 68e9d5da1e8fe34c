use crate::battle::state::BattleSession;
use crate::errors::{BattleError, BattleResult};

/// Capture is only possible once the enemy has been knocked out.
pub fn can_attempt_capture(session: &BattleSession) -> BattleResult<()> {
    if session.allow_capture {
        Ok(())
    } else {
        Err(BattleError::NotAllowedToCapture)
    }
}
