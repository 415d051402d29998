use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::HashSet;
use tracing::debug;

use quiz_core::model::{DifficultyLevel, DifficultyTier, Question, QuestionBank, QuestionId};

/// Tiers searched for the next question, in order: the learner's own tier,
/// then one easier, then one harder.
///
/// Steps are clamped to the ladder, and a clamped step that lands on a tier
/// already listed is dropped, so each tier is tried at most once.
#[must_use]
pub fn candidate_tiers(difficulty: DifficultyLevel) -> Vec<DifficultyTier> {
    let mut tiers = Vec::with_capacity(3);
    for level in [difficulty, difficulty.lowered(), difficulty.raised()] {
        let tier = level.tier();
        if !tiers.contains(&tier) {
            tiers.push(tier);
        }
    }
    tiers
}

/// Pick a uniformly random unused question for `difficulty`, falling back to
/// the adjacent tiers (lower before higher).
///
/// Returns `None` when every candidate tier is exhausted; callers treat that
/// as the end of the session rather than an error.
pub fn select_next<'a, R: Rng + ?Sized>(
    bank: &'a QuestionBank,
    difficulty: DifficultyLevel,
    used: &HashSet<QuestionId>,
    rng: &mut R,
) -> Option<&'a Question> {
    let wanted = difficulty.tier();
    for tier in candidate_tiers(difficulty) {
        let candidates: Vec<&Question> = bank.unused_in_tier(tier, used).collect();
        if let Some(question) = candidates.choose(&mut *rng) {
            if tier != wanted {
                debug!(
                    wanted = %wanted,
                    fallback = %tier,
                    question_id = %question.id(),
                    "selected question from adjacent tier"
                );
            }
            return Some(*question);
        }
    }
    debug!(difficulty = %difficulty, used = used.len(), "no unused question at or near difficulty");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::QuestionDraft;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn draft(id: u64, tier: DifficultyTier) -> QuestionDraft {
        QuestionDraft {
            id,
            text: format!("Question {id}"),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: 0,
            tier,
            tags: Vec::new(),
            subject: None,
            hint: None,
            explanation: None,
        }
    }

    fn level(value: u8) -> DifficultyLevel {
        DifficultyLevel::new(value).unwrap()
    }

    fn used(ids: &[u64]) -> HashSet<QuestionId> {
        ids.iter().copied().map(QuestionId::new).collect()
    }

    #[test]
    fn candidate_tiers_try_lower_before_higher() {
        assert_eq!(
            candidate_tiers(level(3)),
            vec![
                DifficultyTier::Moderate,
                DifficultyTier::Easy,
                DifficultyTier::Difficult
            ]
        );
    }

    #[test]
    fn candidate_tiers_skip_clamped_duplicates() {
        assert_eq!(
            candidate_tiers(level(1)),
            vec![DifficultyTier::VeryEasy, DifficultyTier::Easy]
        );
        assert_eq!(
            candidate_tiers(level(4)),
            vec![DifficultyTier::Difficult, DifficultyTier::Moderate]
        );
    }

    #[test]
    fn never_returns_a_used_question() {
        let bank = QuestionBank::from_drafts(vec![
            draft(1, DifficultyTier::Easy),
            draft(2, DifficultyTier::Easy),
            draft(3, DifficultyTier::Easy),
        ])
        .unwrap();
        let used = used(&[1]);

        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = select_next(&bank, level(2), &used, &mut rng).unwrap();
            assert!(
                [QuestionId::new(2), QuestionId::new(3)].contains(&picked.id()),
                "seed {seed} picked {:?}",
                picked.id()
            );
        }
    }

    #[test]
    fn draws_are_spread_across_candidates() {
        let bank = QuestionBank::from_drafts(vec![
            draft(1, DifficultyTier::Moderate),
            draft(2, DifficultyTier::Moderate),
        ])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let picks: HashSet<_> = (0..64)
            .filter_map(|_| select_next(&bank, level(3), &HashSet::new(), &mut rng))
            .map(Question::id)
            .collect();
        assert_eq!(picks.len(), 2);
    }

    #[test]
    fn falls_back_to_lower_tier_first() {
        let bank = QuestionBank::from_drafts(vec![
            draft(1, DifficultyTier::Moderate),
            draft(2, DifficultyTier::Easy),
            draft(3, DifficultyTier::Difficult),
        ])
        .unwrap();
        let used = used(&[1]);

        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = select_next(&bank, level(3), &used, &mut rng).unwrap();
            assert_eq!(picked.id(), QuestionId::new(2));
        }
    }

    #[test]
    fn falls_back_to_higher_tier_when_lower_is_empty() {
        let bank = QuestionBank::from_drafts(vec![draft(3, DifficultyTier::Difficult)]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let picked = select_next(&bank, level(3), &HashSet::new(), &mut rng).unwrap();
        assert_eq!(picked.tier(), DifficultyTier::Difficult);
    }

    #[test]
    fn does_not_look_two_tiers_away() {
        let bank = QuestionBank::from_drafts(vec![draft(1, DifficultyTier::VeryEasy)]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_next(&bank, level(3), &HashSet::new(), &mut rng).is_none());
        assert!(select_next(&bank, level(2), &HashSet::new(), &mut rng).is_some());
    }

    #[test]
    fn exhausted_bank_yields_none() {
        let bank = QuestionBank::from_drafts(vec![draft(1, DifficultyTier::Moderate)]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_next(&bank, level(3), &used(&[1]), &mut rng).is_none());
    }
}
