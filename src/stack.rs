use crate::content::ContentRegistry;
use crate::errors::{BattleError, BattleResult};

/// A player-proposed stack after sanitizing: known codes only, no duplicates,
/// exactly one base effect and it comes first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedStack {
    pub effects: Vec<String>,
    pub bonuses: Vec<String>,
}

/// Sanitize a proposed move stack.
///
/// Unknown and repeated codes are dropped. When several base-eligible effects
/// survive, the first one is kept and the others are discarded. The base is
/// moved to the front; everything else keeps its relative order.
pub fn validate_stack(
    content: &ContentRegistry,
    effects: &[String],
    bonuses: &[String],
) -> BattleResult<ValidatedStack> {
    let mut base: Option<String> = None;
    let mut rest: Vec<String> = Vec::new();

    for code in effects {
        let Some(effect) = content.effect_by_code(code) else {
            tracing::debug!("Dropping unknown effect code '{}'", code);
            continue;
        };
        if effect.base_flag_eligible {
            match &base {
                None => base = Some(code.clone()),
                Some(kept) if kept != code => {
                    tracing::debug!("Dropping extra base effect '{}', keeping '{}'", code, kept);
                }
                Some(_) => {}
            }
        } else if !rest.contains(code) {
            rest.push(code.clone());
        }
    }

    let Some(base) = base else {
        return Err(BattleError::InvalidStack(
            "must include exactly one base effect".to_string(),
        ));
    };

    let mut sanitized_bonuses: Vec<String> = Vec::new();
    for code in bonuses {
        if content.bonus_by_code(code).is_none() {
            tracing::debug!("Dropping unknown bonus code '{}'", code);
        } else if !sanitized_bonuses.contains(code) {
            sanitized_bonuses.push(code.clone());
        }
    }

    let mut stack = Vec::with_capacity(rest.len() + 1);
    stack.push(base);
    stack.extend(rest);
    Ok(ValidatedStack {
        effects: stack,
        bonuses: sanitized_bonuses,
    })
}
