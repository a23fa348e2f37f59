// src/services/grading.rs

//! Deterministic scoring of submitted answers against a question snapshot.
//!
//! Nothing here touches storage or fails: malformed per-answer input is
//! scored as incorrect instead of rejected. Both the persisted attempt flow
//! and the stateless company tests grade through these functions.

use std::collections::HashSet;

use crate::models::{
    attempt::{AnswerRecord, SubmittedAnswer},
    question::{AnswerValue, QuestionSnapshot, QuestionType},
};

/// Graded answers plus their summed score.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub answers: Vec<AnswerRecord>,
    pub score: f64,
}

/// Sum of points over the whole snapshot, answered or not.
pub fn total_points(snapshot: &[QuestionSnapshot]) -> f64 {
    snapshot.iter().map(|q| q.points).sum()
}

/// Grades every submitted answer in order.
///
/// Only the first answer for a given `qIndex` can earn points; repeats are
/// recorded as incorrect so the score never exceeds the snapshot total.
pub fn grade(snapshot: &[QuestionSnapshot], submitted: &[SubmittedAnswer]) -> Evaluation {
    let mut seen = HashSet::new();
    let mut answers = Vec::with_capacity(submitted.len());

    for answer in submitted {
        let question = answer
            .q_index
            .filter(|idx| seen.insert(*idx))
            .and_then(|idx| lookup(snapshot, idx));
        let (correct, points_awarded) = grade_one(question, answer.value.as_ref());
        answers.push(AnswerRecord {
            q_index: answer.q_index,
            value: answer.value.clone(),
            correct,
            points_awarded,
        });
    }

    let score = answers.iter().map(|a| a.points_awarded).sum();
    Evaluation { answers, score }
}

fn lookup(snapshot: &[QuestionSnapshot], q_index: i64) -> Option<&QuestionSnapshot> {
    let idx = usize::try_from(q_index).ok()?;
    snapshot.iter().find(|q| q.q_index == idx)
}

/// Scores a single answer, returning `(correct, points_awarded)`.
///
/// * No matching question, or no value: incorrect.
/// * MCQ: compare numerically when both sides read as numbers, otherwise
///   compare trimmed text case-sensitively.
/// * Descriptive: never auto-graded, `correct` is `None`.
pub fn grade_one(
    question: Option<&QuestionSnapshot>,
    value: Option<&AnswerValue>,
) -> (Option<bool>, f64) {
    let Some(question) = question else {
        return (Some(false), 0.0);
    };

    match question.question_type {
        QuestionType::Descriptive => (None, 0.0),
        QuestionType::Mcq => {
            let correct = match (value, question.canonical_answer.as_ref()) {
                (Some(given), Some(expected)) => answers_match(given, expected),
                _ => false,
            };
            let points = if correct { question.points } else { 0.0 };
            (Some(correct), points)
        }
    }
}

fn answers_match(given: &AnswerValue, expected: &AnswerValue) -> bool {
    if let (Some(a), Some(b)) = (given.as_number(), expected.as_number()) {
        return a == b;
    }
    match (given.as_text(), expected.as_text()) {
        (Some(a), Some(b)) => a.trim() == b.trim(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(q_index: usize, answer: AnswerValue, points: f64) -> QuestionSnapshot {
        QuestionSnapshot {
            q_index,
            bank_id: format!("q{}", q_index),
            question_type: QuestionType::Mcq,
            question_text: "Pick one".to_string(),
            options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            canonical_answer: Some(answer),
            points,
        }
    }

    fn descriptive(q_index: usize) -> QuestionSnapshot {
        QuestionSnapshot {
            q_index,
            bank_id: format!("q{}", q_index),
            question_type: QuestionType::Descriptive,
            question_text: "Explain".to_string(),
            options: vec![],
            canonical_answer: None,
            points: 1.0,
        }
    }

    fn answer(q_index: i64, value: impl Into<AnswerValue>) -> SubmittedAnswer {
        SubmittedAnswer {
            q_index: Some(q_index),
            value: Some(value.into()),
        }
    }

    fn paper() -> Vec<QuestionSnapshot> {
        vec![mcq(0, 1.into(), 1.0), mcq(1, "B".into(), 1.0), descriptive(2)]
    }

    #[test]
    fn test_grade_two_of_three() {
        let eval = grade(&paper(), &[answer(0, 1), answer(1, "B")]);
        assert_eq!(eval.score, 2.0);
        assert_eq!(total_points(&paper()), 3.0);
        assert!(eval.answers.iter().all(|a| a.correct == Some(true)));
    }

    #[test]
    fn test_numeric_text_matches_number() {
        let eval = grade(&paper(), &[answer(0, "1"), answer(1, " B ")]);
        assert_eq!(eval.score, 2.0);
    }

    #[test]
    fn test_text_comparison_is_case_sensitive() {
        let eval = grade(&paper(), &[answer(1, "b")]);
        assert_eq!(eval.answers[0].correct, Some(false));
        assert_eq!(eval.score, 0.0);
    }

    #[test]
    fn test_numeric_comparison_ignores_formatting() {
        let eval = grade(&paper(), &[answer(0, "1.0")]);
        assert_eq!(eval.answers[0].correct, Some(true));
    }

    #[test]
    fn test_descriptive_is_never_scored() {
        let eval = grade(&paper(), &[answer(2, "a long essay")]);
        assert_eq!(eval.answers[0].correct, None);
        assert_eq!(eval.answers[0].points_awarded, 0.0);
    }

    #[test]
    fn test_unknown_index_is_incorrect() {
        let eval = grade(&paper(), &[answer(7, 1), answer(-1, 1)]);
        assert!(eval.answers.iter().all(|a| a.correct == Some(false)));
        assert_eq!(eval.score, 0.0);
    }

    #[test]
    fn test_missing_value_is_incorrect() {
        let submitted = [SubmittedAnswer {
            q_index: Some(0),
            value: None,
        }];
        let eval = grade(&paper(), &submitted);
        assert_eq!(eval.answers[0].correct, Some(false));
    }

    #[test]
    fn test_repeated_index_scores_once() {
        let eval = grade(&paper(), &[answer(0, 1), answer(0, 1), answer(0, 1)]);
        assert_eq!(eval.score, 1.0);
        assert_eq!(eval.answers.len(), 3);
    }

    #[test]
    fn test_malformed_answers_are_absorbed() {
        let submitted = [
            answer(0, 1),
            answer(1, AnswerValue::Other(serde_json::json!(true))),
            SubmittedAnswer {
                q_index: None,
                value: Some("B".into()),
            },
        ];
        let eval = grade(&paper(), &submitted);
        assert_eq!(eval.score, 1.0);
        assert_eq!(eval.answers.len(), 3);
        assert_eq!(eval.answers[1].correct, Some(false));
        assert_eq!(eval.answers[2].correct, Some(false));
        assert_eq!(eval.answers[2].q_index, None);
    }

    #[test]
    fn test_points_are_weighted() {
        let snapshot = vec![mcq(0, 2.into(), 2.5), mcq(1, 0.into(), 0.5)];
        let eval = grade(&snapshot, &[answer(0, 2), answer(1, 0)]);
        assert_eq!(eval.score, 3.0);
        assert_eq!(total_points(&snapshot), 3.0);
    }

    #[test]
    fn test_score_equals_sum_of_awarded_points() {
        let eval = grade(&paper(), &[answer(0, 2), answer(1, "B"), answer(2, "x")]);
        let awarded: f64 = eval.answers.iter().map(|a| a.points_awarded).sum();
        assert_eq!(eval.score, awarded);
        assert_eq!(eval.score, 1.0);
    }
}
