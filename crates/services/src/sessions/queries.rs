use std::collections::BTreeMap;

use quiz_core::model::{SessionReport, TagName, TagPerformance};

use super::view::PerformanceOverview;

/// Aggregate stored reports into an overview.
pub(crate) fn overview(reports: &[SessionReport]) -> PerformanceOverview {
    let sessions = u32::try_from(reports.len()).unwrap_or(u32::MAX);
    if sessions == 0 {
        return PerformanceOverview::default();
    }

    let mut score_percent_sum = 0_u64;
    let mut accuracy_percent_sum = 0_u64;
    let mut best_score = 0_u32;
    let mut questions_answered = 0_u32;
    let mut by_tag: BTreeMap<TagName, (u32, u32)> = BTreeMap::new();

    for report in reports {
        score_percent_sum += u64::from(report.score_percent());
        accuracy_percent_sum += u64::from(report.accuracy_percent());
        best_score = best_score.max(report.final_score());
        questions_answered = questions_answered.saturating_add(report.questions_completed());
        for perf in report.tag_breakdown() {
            let entry = by_tag.entry(perf.tag.clone()).or_default();
            entry.0 += perf.attempted;
            entry.1 += perf.correct;
        }
    }

    PerformanceOverview {
        sessions,
        average_score_percent: mean(score_percent_sum, sessions),
        average_accuracy_percent: mean(accuracy_percent_sum, sessions),
        best_score,
        questions_answered,
        tag_breakdown: by_tag
            .into_iter()
            .map(|(tag, (attempted, correct))| TagPerformance {
                tag,
                attempted,
                correct,
            })
            .collect(),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn mean(sum: u64, count: u32) -> u32 {
    let count = u64::from(count);
    ((sum + count / 2) / count).min(u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{
        AnsweredQuestion, CompletionReason, DifficultyLevel, DifficultyTier, OptionIndex,
        QuestionBank, QuestionDraft, QuestionId, SessionId,
    };
    use quiz_core::time::fixed_now;

    fn bank() -> QuestionBank {
        QuestionBank::from_drafts((1..=4).map(|id| QuestionDraft {
            id,
            text: format!("Q{id}"),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: 0,
            tier: DifficultyTier::Moderate,
            tags: vec![(if id % 2 == 0 { "speed" } else { "percentages" }).to_string()],
            subject: None,
            hint: None,
            explanation: None,
        }))
        .unwrap()
    }

    fn report(answers: &[(u64, bool)], total: usize) -> SessionReport {
        let history = answers
            .iter()
            .map(|&(id, correct)| AnsweredQuestion {
                question_id: QuestionId::new(id),
                tier: DifficultyTier::Moderate,
                chosen: OptionIndex::new(if correct { 0 } else { 1 }).unwrap(),
                correct,
                points: if correct { 3 } else { 0 },
                difficulty_after: DifficultyLevel::STARTING,
            })
            .collect();
        SessionReport::from_history(
            SessionId::new(),
            total,
            DifficultyLevel::STARTING,
            CompletionReason::AllAnswered,
            history,
            &bank(),
            fixed_now(),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn empty_history_yields_zeroed_overview() {
        assert_eq!(overview(&[]), PerformanceOverview::default());
    }

    #[test]
    fn averages_and_merges_tags_across_reports() {
        let a = report(&[(1, true), (2, true)], 2); // score 6/2 -> 300%, accuracy 100%
        let b = report(&[(3, false), (4, true)], 2); // score 3/2 -> 150%, accuracy 50%
        let o = overview(&[a, b]);

        assert_eq!(o.sessions, 2);
        assert_eq!(o.average_score_percent, 225);
        assert_eq!(o.average_accuracy_percent, 75);
        assert_eq!(o.best_score, 6);
        assert_eq!(o.questions_answered, 4);

        let tags: Vec<_> = o
            .tag_breakdown
            .iter()
            .map(|t| (t.tag.as_str(), t.attempted, t.correct))
            .collect();
        assert_eq!(tags, vec![("percentages", 2, 1), ("speed", 2, 2)]);
    }
}
