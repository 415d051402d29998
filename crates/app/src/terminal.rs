use std::io::{self, BufRead, Write};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::debug;

use quiz_core::model::{OptionIndex, QuestionBank, SessionReport};
use services::{AnswerOutcome, AppServices, AssessmentEngine, AssessmentLoopService, SessionError};

/// Lines typed by the learner; the channel closes at end of input.
pub type Input = mpsc::Receiver<io::Result<String>>;

/// Read stdin on a plain OS thread and forward each line.
///
/// Terminal reads cannot be cancelled, so they stay off the runtime; the
/// detached thread does not hold up process exit after a timeout.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned.
pub fn spawn_stdin_reader() -> io::Result<Input> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// How an answer prompt ended.
enum Prompt {
    Answered(AnswerOutcome),
    TimedOut,
    Closed,
}

/// Run one assessment on the terminal and return its stored report.
///
/// # Errors
///
/// Returns an error if stdin/stdout fail or the services reject a call.
pub async fn run_assessment(
    app: &AppServices,
    seed: Option<u64>,
    input: &mut Input,
) -> Result<SessionReport, Box<dyn std::error::Error>> {
    let loop_svc = app.assessments();
    let settings = loop_svc.settings().clone();
    let mut engine = match seed {
        Some(seed) => loop_svc.start_assessment_with_seed(seed).await?,
        None => loop_svc.start_assessment().await?,
    };
    let deadline = settings.time_limit().map(|limit| Instant::now() + limit);

    println!(
        "{} questions{}. Answer with A-D, or h for a hint.",
        settings.total_questions(),
        settings
            .time_limit()
            .map(|limit| format!(", {} to finish", clock_face(limit)))
            .unwrap_or_default()
    );

    while !engine.is_complete() {
        let hint = show_question(&engine, deadline);
        match prompt_answer(&loop_svc, &mut engine, input, deadline, hint).await? {
            Prompt::Answered(outcome) => {
                show_outcome(&engine, &outcome);
                sleep(settings.result_delay()).await;
                loop_svc.advance(&mut engine).await?;
            }
            Prompt::TimedOut => {
                println!("\nTime's up!");
                loop_svc.expire(&mut engine).await?;
            }
            Prompt::Closed => {
                debug!("stdin closed, ending assessment");
                loop_svc.expire(&mut engine).await?;
            }
        }
    }

    let id = loop_svc.finalize_report(&mut engine).await?;
    Ok(app.reports().get_report(id).await?)
}

/// Print the current question and return its hint, if any.
fn show_question(engine: &AssessmentEngine, deadline: Option<Instant>) -> Option<String> {
    let question = engine.current_question()?;
    let progress = engine.progress();
    let position = progress.position.unwrap_or(progress.answered + 1);

    println!();
    print!(
        "Question {position}/{} | {} | difficulty {}",
        progress.total,
        question.tier().label(),
        progress.difficulty
    );
    if let Some(deadline) = deadline {
        print!(" | {} left", clock_face(deadline.saturating_duration_since(Instant::now())));
    }
    println!();
    println!("{}", question.text());
    for index in OptionIndex::all() {
        println!("  {}) {}", index.label(), question.option(index));
    }
    question.hint().map(str::to_string)
}

async fn prompt_answer(
    loop_svc: &AssessmentLoopService,
    engine: &mut AssessmentEngine,
    input: &mut Input,
    deadline: Option<Instant>,
    hint: Option<String>,
) -> Result<Prompt, Box<dyn std::error::Error>> {
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let received = match deadline {
            Some(deadline) => match timeout_at(deadline, input.recv()).await {
                Ok(received) => received,
                Err(_elapsed) => return Ok(Prompt::TimedOut),
            },
            None => input.recv().await,
        };
        let Some(line) = received.transpose()? else {
            return Ok(Prompt::Closed);
        };

        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("h") {
            match &hint {
                Some(hint) => println!("Hint: {hint}"),
                None => println!("No hint for this question."),
            }
            continue;
        }

        let mut chars = trimmed.chars();
        let (Some(letter), None) = (chars.next(), chars.next()) else {
            println!("Type a letter from A to D.");
            continue;
        };
        let Ok(choice) = OptionIndex::from_label(letter) else {
            println!("Type a letter from A to D.");
            continue;
        };

        match loop_svc.answer_current(engine, choice.value()) {
            Ok(outcome) => return Ok(Prompt::Answered(outcome)),
            Err(SessionError::InvalidOption(_)) => println!("Type a letter from A to D."),
            Err(err) => return Err(err.into()),
        }
    }
}

fn show_outcome(engine: &AssessmentEngine, outcome: &AnswerOutcome) {
    if outcome.correct {
        println!("Correct! +{} points (score {})", outcome.points, engine.score());
    } else {
        println!("Not quite. The answer was {}.", outcome.correct_option);
    }
    if let Some(explanation) = &outcome.explanation {
        println!("{explanation}");
    }
}

/// Print a completed session's report.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_report(report: &SessionReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!("Assessment complete ({})", report.completion());
    println!(
        "Score: {} points ({}%)",
        report.final_score(),
        report.score_percent()
    );
    println!(
        "Correct: {}/{} answered of {} ({}%)",
        report.correct_answers(),
        report.questions_completed(),
        report.total_questions(),
        report.accuracy_percent()
    );
    println!(
        "Final difficulty: {} ({})",
        report.final_difficulty(),
        report.final_difficulty_tier().label()
    );
    if !report.tag_breakdown().is_empty() {
        println!("By topic:");
        for perf in report.tag_breakdown() {
            println!(
                "  {:<12} {}/{} ({}%)",
                perf.tag.as_str(),
                perf.correct,
                perf.attempted,
                perf.percent()
            );
        }
    }
    Ok(())
}

/// Print per-tier counts and subjects of a bank.
pub fn print_bank(bank: &QuestionBank) {
    let counts = bank.tier_counts();
    println!("{} questions", counts.total());
    for tier in quiz_core::model::DifficultyTier::ALL {
        println!("  {:<10} {}", tier.label(), counts.get(tier));
    }
    let subjects: Vec<_> = bank.subjects().into_iter().collect();
    if !subjects.is_empty() {
        println!("Subjects: {}", subjects.join(", "));
    }
}

/// `m:ss`, rounded up so the display never shows 0:00 while time remains.
fn clock_face(remaining: Duration) -> String {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AssessmentSettingsDraft, CompletionReason};
    use services::Clock;
    use storage::Storage;

    async fn builtin_app(time_limit_secs: u64, total: u32) -> AppServices {
        let settings = AssessmentSettingsDraft {
            total_questions: Some(total),
            time_limit_secs: Some(time_limit_secs),
            ..AssessmentSettingsDraft::default()
        }
        .validate()
        .unwrap();
        AppServices::new(Storage::builtin(), settings, Clock::default_clock())
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_expires_while_waiting_for_input() {
        let app = builtin_app(2, 3).await;
        // sender stays alive: the learner is simply not typing
        let (_tx, mut input) = mpsc::channel(4);
        let started = Instant::now();

        let report = run_assessment(&app, Some(1), &mut input).await.unwrap();

        assert_eq!(report.completion(), CompletionReason::Expired);
        assert_eq!(report.questions_completed(), 0);
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(app.reports().list_recent(5).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn answers_count_until_the_countdown_fires() {
        let app = builtin_app(10, 5).await;
        let (tx, mut input) = mpsc::channel(8);
        for line in ["h", "zz", "e", "a"] {
            tx.send(Ok(line.to_string())).await.unwrap();
        }

        let report = run_assessment(&app, Some(3), &mut input).await.unwrap();

        assert_eq!(report.completion(), CompletionReason::Expired);
        assert_eq!(report.questions_completed(), 1);
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_input_ends_the_session() {
        let app = builtin_app(0, 5).await;
        let (tx, mut input) = mpsc::channel::<io::Result<String>>(1);
        drop(tx);

        let report = run_assessment(&app, None, &mut input).await.unwrap();
        assert_eq!(report.completion(), CompletionReason::Expired);
        assert_eq!(report.questions_completed(), 0);
    }

    #[test]
    fn clock_face_formats_minutes_and_seconds() {
        assert_eq!(clock_face(Duration::from_secs(300)), "5:00");
        assert_eq!(clock_face(Duration::from_secs(65)), "1:05");
        assert_eq!(clock_face(Duration::from_millis(400)), "0:01");
        assert_eq!(clock_face(Duration::ZERO), "0:00");
    }
}
