/**
 * Questions, answers and the rules for scoring a selection of answers.
 *
 * Author:  Ian Fisher (iafisher@fastmail.com)
 * Version: October 2026
 */
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

use super::common::{QuizError, Result};

/// Explanation given to questions that were stored or created without one.
pub const DEFAULT_EXPLANATION: &str = "No explanation provided.";

/// Represents one of the candidate answers to a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    text: String,
    correct: bool,
}

/// The rule that turns a selection of answers into a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoringVariant {
    /// Exactly one answer; 1 if it is correct, 0 otherwise.
    SingleChoice,
    /// Exactly one answer; 1 if it is correct, -1 otherwise.
    NegativeSingleChoice,
    /// Like `NegativeSingleChoice`, but selecting nothing is a skip worth 0.
    SkippableNegativeSingleChoice,
    /// Any number of answers; each correct one adds and each incorrect one subtracts
    /// an equal share of 1. Never below 0.
    MultipleChoice,
    /// Like `MultipleChoice`, but the score may be negative.
    NegativeMultipleChoice,
}

/// Represents a question.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    text: String,
    /// In display order. Shuffled once when the question is built.
    answers: Vec<Answer>,
    explanation: String,
    variant: ScoringVariant,
}

impl Answer {
    pub fn new(text: &str, correct: bool) -> Self {
        Answer {
            text: String::from(text),
            correct,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_correct(&self) -> bool {
        self.correct
    }
}

impl ScoringVariant {
    pub const ALL: [ScoringVariant; 5] = [
        ScoringVariant::SingleChoice,
        ScoringVariant::NegativeSingleChoice,
        ScoringVariant::SkippableNegativeSingleChoice,
        ScoringVariant::MultipleChoice,
        ScoringVariant::NegativeMultipleChoice,
    ];

    /// Look up a variant by the tag used in repository documents.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "single" => Ok(ScoringVariant::SingleChoice),
            "negative_single" => Ok(ScoringVariant::NegativeSingleChoice),
            "skippable_negative_single" => Ok(ScoringVariant::SkippableNegativeSingleChoice),
            "multiple" => Ok(ScoringVariant::MultipleChoice),
            "negative_multiple" => Ok(ScoringVariant::NegativeMultipleChoice),
            _ => Err(QuizError::UnknownVariant {
                tag: String::from(tag),
                question: None,
            }),
        }
    }

    /// The tag used in repository documents. Inverse of `from_tag`.
    pub fn tag(self) -> &'static str {
        match self {
            ScoringVariant::SingleChoice => "single",
            ScoringVariant::NegativeSingleChoice => "negative_single",
            ScoringVariant::SkippableNegativeSingleChoice => "skippable_negative_single",
            ScoringVariant::MultipleChoice => "multiple",
            ScoringVariant::NegativeMultipleChoice => "negative_multiple",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ScoringVariant::SingleChoice => "Single Choice",
            ScoringVariant::NegativeSingleChoice => "Negative Score Single Choice",
            ScoringVariant::SkippableNegativeSingleChoice => {
                "Skippable Negative Score Single Choice"
            }
            ScoringVariant::MultipleChoice => "Multiple Choice",
            ScoringVariant::NegativeMultipleChoice => "Negative Score Multiple Choice",
        }
    }

    /// Return `true` if at most one answer may be selected.
    pub fn is_single_choice(self) -> bool {
        match self {
            ScoringVariant::SingleChoice
            | ScoringVariant::NegativeSingleChoice
            | ScoringVariant::SkippableNegativeSingleChoice => true,
            ScoringVariant::MultipleChoice | ScoringVariant::NegativeMultipleChoice => false,
        }
    }

    /// Score the answers at positions `selected` out of `answers`.
    pub fn score(self, answers: &[Answer], selected: &[usize]) -> Result<f64> {
        let chosen = resolve_selection(answers, selected)?;
        match self {
            ScoringVariant::SingleChoice => score_single(&chosen, 0.0),
            ScoringVariant::NegativeSingleChoice => score_single(&chosen, -1.0),
            ScoringVariant::SkippableNegativeSingleChoice => {
                if chosen.is_empty() {
                    Ok(0.0)
                } else {
                    score_single(&chosen, -1.0)
                }
            }
            ScoringVariant::MultipleChoice => {
                let score = score_multiple(answers, &chosen);
                Ok(if score < 0.0 { 0.0 } else { score })
            }
            ScoringVariant::NegativeMultipleChoice => Ok(score_multiple(answers, &chosen)),
        }
    }
}

impl fmt::Display for ScoringVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Map selected positions to answers, rejecting positions that are out of range or
/// given twice.
fn resolve_selection<'a>(answers: &'a [Answer], selected: &[usize]) -> Result<Vec<&'a Answer>> {
    let mut seen = vec![false; answers.len()];
    let mut chosen = Vec::with_capacity(selected.len());
    for &index in selected.iter() {
        if index >= answers.len() {
            return Err(QuizError::InvalidSelection(format!(
                "answer {} does not exist",
                index + 1
            )));
        }
        if seen[index] {
            return Err(QuizError::InvalidSelection(format!(
                "answer {} selected more than once",
                index + 1
            )));
        }
        seen[index] = true;
        chosen.push(&answers[index]);
    }
    Ok(chosen)
}

fn score_single(chosen: &[&Answer], incorrect_score: f64) -> Result<f64> {
    if chosen.is_empty() {
        return Err(QuizError::InvalidSelection(String::from("No answer selected")));
    }
    if chosen.len() > 1 {
        return Err(QuizError::InvalidSelection(String::from(
            "Multiple answers selected for a single choice question",
        )));
    }

    if chosen[0].is_correct() {
        Ok(1.0)
    } else {
        Ok(incorrect_score)
    }
}

/// Each selected answer is worth 1/C where C is the number of correct answers, or
/// 1/N over all N answers when none is correct. The sum is taken over whole counts
/// so that selecting exactly the correct answers gives exactly 1.
fn score_multiple(answers: &[Answer], chosen: &[&Answer]) -> f64 {
    let corrects_count = answers.iter().filter(|a| a.is_correct()).count();
    let denominator = if corrects_count == 0 {
        answers.len()
    } else {
        corrects_count
    };

    let hits = chosen.iter().filter(|a| a.is_correct()).count() as f64;
    let misses = chosen.iter().filter(|a| !a.is_correct()).count() as f64;
    (hits - misses) / (denominator as f64)
}

impl Question {
    /// Build a question from in-memory parameters, e.g. from the add-question dialog.
    /// `explanation` falls back to `DEFAULT_EXPLANATION`.
    pub fn from_parameters<R: Rng + ?Sized>(
        text: &str,
        answers: Vec<Answer>,
        explanation: Option<&str>,
        tag: &str,
        rng: &mut R,
    ) -> Result<Self> {
        let variant = ScoringVariant::from_tag(tag)?;
        Question::new(variant, text, answers, explanation, rng)
    }

    /// Build a question from its JSON record in a repository document.
    pub fn from_json<R: Rng + ?Sized>(value: &Value, rng: &mut R) -> Result<Self> {
        let record = value
            .as_object()
            .ok_or_else(|| malformed("question is not a JSON object"))?;

        let tag = record
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("question does not contain a valid 'type' field"))?;
        let variant = ScoringVariant::from_tag(tag)?;

        let answer_records = record
            .get("answers")
            .and_then(Value::as_array)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| malformed("question must have at least one answer"))?;

        let mut answers = Vec::with_capacity(answer_records.len());
        for answer_record in answer_records.iter() {
            let text = answer_record.get("text").and_then(Value::as_str);
            let correct = answer_record.get("is_correct").and_then(Value::as_bool);
            match (text, correct) {
                (Some(text), Some(correct)) => {
                    answers.push(Answer::new(text, correct));
                }
                _ => {
                    return Err(malformed(
                        "answer must contain 'text' and 'is_correct' fields",
                    ));
                }
            }
        }

        let text = record
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("question text cannot be empty"))?;

        let explanation = match record.get("explanation") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => {
                return Err(malformed("question explanation must be a string"));
            }
        };

        Question::new(variant, text, answers, explanation, rng)
    }

    fn new<R: Rng + ?Sized>(
        variant: ScoringVariant,
        text: &str,
        mut answers: Vec<Answer>,
        explanation: Option<&str>,
        rng: &mut R,
    ) -> Result<Self> {
        if answers.is_empty() {
            return Err(malformed("question must have at least one answer"));
        }
        if text.is_empty() {
            return Err(malformed("question text cannot be empty"));
        }

        answers.shuffle(rng);
        Ok(Question {
            text: String::from(text),
            answers,
            explanation: String::from(explanation.unwrap_or(DEFAULT_EXPLANATION)),
            variant,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn variant(&self) -> ScoringVariant {
        self.variant
    }

    /// Positions of the correct answers in display order.
    pub fn correct_answers(&self) -> Vec<usize> {
        self.answers
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_correct())
            .map(|(i, _)| i)
            .collect()
    }

    /// Score the answers at positions `selected`. Fails with `InvalidSelection` when
    /// the selection breaks the rules of the question's variant.
    pub fn score(&self, selected: &[usize]) -> Result<f64> {
        self.variant.score(&self.answers, selected)
    }
}

fn malformed(message: &str) -> QuizError {
    QuizError::MalformedInput(String::from(message))
}
