//! Validation of a defender's box layout against the chosen placement rule.

use shared::{BoxContent, Rule, BOX_COUNT, MIN_DEPLOYMENT};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DefenseError {
    #[error("layout must contain exactly {} boxes", BOX_COUNT)]
    WrongBoxCount,
    #[error("token counts cannot be negative")]
    Negative,
    #[error("every box needs at least one token")]
    Empty,
    #[error("total deployment must be at least {}", MIN_DEPLOYMENT)]
    BelowMinimum,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("box values do not form an arithmetic progression")]
    NotProgression,
    #[error("every box must hold the same number of tokens")]
    UnequalTokenCounts,
    #[error("each box may only hold a single denomination")]
    MixedDenominations,
    #[error("exactly 1 box must contain 100-value tokens")]
    SpecialBoxCount,
    #[error("21 boxes must contain only 10-value tokens")]
    PlainBoxCount,
    #[error("10-value counts must be 1 to 22 with no repeats")]
    NotPermutation,
}

/// Checks `boxes` against `rule` and the defender's `balance`.
///
/// Returns the total value that deployment will debit.
pub fn validate_defense(
    rule: Rule,
    boxes: &[BoxContent],
    balance: i64,
) -> Result<i64, DefenseError> {
    if boxes.len() != BOX_COUNT {
        return Err(DefenseError::WrongBoxCount);
    }
    for content in boxes {
        if content.c10 < 0 || content.c100 < 0 {
            return Err(DefenseError::Negative);
        }
        if content.c10 == 0 && content.c100 == 0 {
            return Err(DefenseError::Empty);
        }
    }

    let total: i64 = boxes.iter().map(BoxContent::value).sum();
    if total < MIN_DEPLOYMENT {
        return Err(DefenseError::BelowMinimum);
    }
    if total > balance {
        return Err(DefenseError::InsufficientBalance);
    }

    match rule {
        Rule::Progression => check_progression(boxes)?,
        Rule::SingleSpecial => check_single_special(boxes)?,
        Rule::Permutation => check_permutation(boxes)?,
    }

    Ok(total)
}

fn check_progression(boxes: &[BoxContent]) -> Result<(), DefenseError> {
    let mut values: Vec<i64> = boxes.iter().map(BoxContent::value).collect();
    values.sort_unstable();
    let step = values[1] - values[0];
    if values.windows(2).all(|pair| pair[1] - pair[0] == step) {
        Ok(())
    } else {
        Err(DefenseError::NotProgression)
    }
}

fn check_single_special(boxes: &[BoxContent]) -> Result<(), DefenseError> {
    let tokens = boxes[0].tokens();
    if boxes.iter().any(|content| content.tokens() != tokens) {
        return Err(DefenseError::UnequalTokenCounts);
    }

    let mut plain = 0;
    let mut special = 0;
    for content in boxes {
        match (content.c10 > 0, content.c100 > 0) {
            (true, false) => plain += 1,
            (false, true) => special += 1,
            _ => return Err(DefenseError::MixedDenominations),
        }
    }

    if special != 1 {
        return Err(DefenseError::SpecialBoxCount);
    }
    if plain != BOX_COUNT - 1 {
        return Err(DefenseError::PlainBoxCount);
    }
    Ok(())
}

fn check_permutation(boxes: &[BoxContent]) -> Result<(), DefenseError> {
    let counts: HashSet<i32> = boxes.iter().map(|content| content.c10).collect();
    let min = counts.iter().min().copied();
    let max = counts.iter().max().copied();
    if counts.len() != BOX_COUNT || min != Some(1) || max != Some(BOX_COUNT as i32) {
        return Err(DefenseError::NotPermutation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progression(first: i32, step: i32) -> Vec<BoxContent> {
        (0..BOX_COUNT as i32)
            .map(|i| BoxContent::new(first + step * i, 0))
            .collect()
    }

    fn single_special(tokens: i32, special: usize) -> Vec<BoxContent> {
        (0..BOX_COUNT)
            .map(|i| {
                if i == special {
                    BoxContent::new(0, tokens)
                } else {
                    BoxContent::new(tokens, 0)
                }
            })
            .collect()
    }

    fn permutation() -> Vec<BoxContent> {
        (1..=BOX_COUNT as i32).map(|c10| BoxContent::new(c10, 1)).collect()
    }

    #[test]
    fn test_progression_accepts_constant_and_stepped_layouts() {
        assert_eq!(validate_defense(Rule::Progression, &progression(20, 0), 10_000), Ok(4_400));
        // 100, 110, ... 310 shuffled order is still a progression once sorted.
        let mut layout = progression(10, 1);
        layout.reverse();
        layout.swap(3, 17);
        assert_eq!(validate_defense(Rule::Progression, &layout, 10_000), Ok(4_510));
    }

    #[test]
    fn test_progression_rejects_broken_gap() {
        let mut layout = progression(20, 0);
        layout[7] = BoxContent::new(21, 0);
        assert_eq!(
            validate_defense(Rule::Progression, &layout, 10_000),
            Err(DefenseError::NotProgression)
        );
    }

    #[test]
    fn test_basic_checks_run_before_rule_checks() {
        let mut layout = progression(20, 0);
        layout[0] = BoxContent::new(-1, 2);
        assert_eq!(
            validate_defense(Rule::Progression, &layout, 10_000),
            Err(DefenseError::Negative)
        );

        layout[0] = BoxContent::new(0, 0);
        assert_eq!(validate_defense(Rule::Permutation, &layout, 10_000), Err(DefenseError::Empty));

        assert_eq!(
            validate_defense(Rule::Progression, &progression(10, 0), 10_000),
            Err(DefenseError::BelowMinimum)
        );
        assert_eq!(
            validate_defense(Rule::Progression, &progression(20, 0), 4_399),
            Err(DefenseError::InsufficientBalance)
        );
        assert_eq!(
            validate_defense(Rule::Progression, &progression(20, 0)[..21], 10_000),
            Err(DefenseError::WrongBoxCount)
        );
    }

    #[test]
    fn test_single_special_accepts_valid_layout() {
        assert_eq!(
            validate_defense(Rule::SingleSpecial, &single_special(10, 5), 10_000),
            Ok(3_100)
        );
    }

    #[test]
    fn test_single_special_rejections() {
        let no_special = vec![BoxContent::new(15, 0); BOX_COUNT];
        let err = validate_defense(Rule::SingleSpecial, &no_special, 10_000).unwrap_err();
        assert_eq!(err, DefenseError::SpecialBoxCount);
        assert_eq!(err.to_string(), "exactly 1 box must contain 100-value tokens");

        let mut two_special = single_special(10, 0);
        two_special[1] = BoxContent::new(0, 10);
        assert_eq!(
            validate_defense(Rule::SingleSpecial, &two_special, 10_000),
            Err(DefenseError::SpecialBoxCount)
        );

        let mut mixed = single_special(10, 0);
        mixed[3] = BoxContent::new(5, 5);
        assert_eq!(
            validate_defense(Rule::SingleSpecial, &mixed, 10_000),
            Err(DefenseError::MixedDenominations)
        );

        let mut uneven = single_special(10, 0);
        uneven[4] = BoxContent::new(11, 0);
        assert_eq!(
            validate_defense(Rule::SingleSpecial, &uneven, 10_000),
            Err(DefenseError::UnequalTokenCounts)
        );
    }

    #[test]
    fn test_permutation_accepts_one_to_twenty_two() {
        assert_eq!(validate_defense(Rule::Permutation, &permutation(), 10_000), Ok(4_730));
    }

    #[test]
    fn test_permutation_rejects_duplicates_and_out_of_range() {
        let mut duplicate = permutation();
        duplicate[0] = BoxContent::new(2, 1);
        assert_eq!(
            validate_defense(Rule::Permutation, &duplicate, 10_000),
            Err(DefenseError::NotPermutation)
        );

        let shifted: Vec<BoxContent> = (2..=23).map(|c10| BoxContent::new(c10, 1)).collect();
        assert_eq!(
            validate_defense(Rule::Permutation, &shifted, 10_000),
            Err(DefenseError::NotPermutation)
        );
    }
}
