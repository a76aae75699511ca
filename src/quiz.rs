/**
 * Taking a quiz from a repository, and the interactive dialog for writing new
 * questions.
 *
 * Author:  Ian Fisher (iafisher@fastmail.com)
 * Version: October 2026
 */
use std::io;
use std::io::Write;

use chrono::{DateTime, Utc};

use super::common::{QuizError, Result};
use super::iohelper::{prompt, prompt_allow_blank, MyReadline};
use super::question::{Answer, Question, ScoringVariant};
use super::repository::{QuestionId, Repository};
use super::ui::CmdUI;

/// The running tally of a quiz session.
#[derive(Debug, Clone)]
pub struct SessionScore {
    pub time_started: DateTime<Utc>,
    pub total_questions: usize,
    pub total_score: f64,
    pub total_correct: usize,
    pub total_partially_correct: usize,
    pub total_incorrect: usize,
}

impl SessionScore {
    pub fn new() -> Self {
        SessionScore {
            time_started: Utc::now(),
            total_questions: 0,
            total_score: 0.0,
            total_correct: 0,
            total_partially_correct: 0,
            total_incorrect: 0,
        }
    }

    pub fn record(&mut self, score: f64) {
        self.total_questions += 1;
        self.total_score += score;
        if score == 1.0 {
            self.total_correct += 1;
        } else if score > 0.0 {
            self.total_partially_correct += 1;
        } else {
            self.total_incorrect += 1;
        }
    }

    /// The total score as a percentage of the number of questions answered. May be
    /// negative when negatively-scored questions were answered wrongly.
    pub fn percentage(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            self.total_score * 100.0 / (self.total_questions as f64)
        }
    }
}

impl Default for SessionScore {
    fn default() -> Self {
        SessionScore::new()
    }
}

/// Ask up to `num_to_ask` questions from `repo`, then print the results of the
/// session. The quiz ends early if the user presses Ctrl+D or Ctrl+C.
pub fn take<W: io::Write, R: MyReadline>(
    ui: &mut CmdUI<W>,
    reader: &mut R,
    repo: &mut Repository,
    num_to_ask: usize,
) -> Result<()> {
    for _ in 0..num_to_ask {
        let id = repo.next_question()?;
        // Cloned so that the repository can be borrowed mutably while answering.
        let question = repo
            .question(id)
            .cloned()
            .ok_or(QuizError::QuestionNotFound(id))?;

        ui.question(&question)?;
        let (selected, score) = match ask(ui, reader, repo, id, &question)? {
            Some(result) => result,
            None => break,
        };

        if score == 1.0 {
            ui.correct()?;
        } else if selected.is_empty() && score == 0.0 {
            ui.skipped(&question)?;
        } else if score > 0.0 {
            ui.partially_correct(&question, score)?;
        } else {
            ui.incorrect(&question)?;
        }
        ui.explanation(question.explanation())?;
        ui.tally(repo.session())?;
    }

    ui.results(repo.session())
}

/// Read selections until one is accepted for `question`. Returns `None` if the user
/// ended the quiz instead of answering.
fn ask<W: io::Write, R: MyReadline>(
    ui: &mut CmdUI<W>,
    reader: &mut R,
    repo: &mut Repository,
    id: QuestionId,
    question: &Question,
) -> Result<Option<(Vec<usize>, f64)>> {
    let numbered = question.answers().len() > 26;
    let message = match (question.variant().is_single_choice(), numbered) {
        (true, false) => "Enter a letter: ",
        (true, true) => "Enter a letter or number: ",
        (false, false) => "Enter letters: ",
        (false, true) => "Enter letters or numbers: ",
    };

    loop {
        let response = match prompt_allow_blank(reader, message) {
            Ok(Some(response)) => response,
            Ok(None) | Err(QuizError::ReadlineInterrupted) => {
                return Ok(None);
            }
            Err(e) => {
                return Err(e);
            }
        };

        let selected = match parse_selection(&response) {
            Ok(selected) => selected,
            Err(e) => {
                ui.warning(&e.to_string())?;
                continue;
            }
        };

        match repo.score_and_feedback(id, &selected) {
            Ok(score) => {
                return Ok(Some((selected, score)));
            }
            Err(e) => {
                if !e.is_recoverable() {
                    return Err(e);
                }
                ui.warning(&e.to_string())?;
            }
        }
    }
}

/// Parse a selection of answers, given as letters (`a c`, `a,c`) or as 1-based
/// numbers. A blank response is the empty selection.
pub fn parse_selection(response: &str) -> Result<Vec<usize>> {
    let mut selected = Vec::new();
    for token in response.split(|c: char| c == ',' || c.is_whitespace()) {
        if token.is_empty() {
            continue;
        }

        let mut chars = token.chars();
        let index = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => {
                (c.to_ascii_lowercase() as usize) - ('a' as usize)
            }
            _ => match token.parse::<usize>() {
                Ok(n) if n > 0 => n - 1,
                _ => {
                    return Err(QuizError::InvalidSelection(format!(
                        "could not understand '{}'",
                        token
                    )));
                }
            },
        };
        selected.push(index);
    }
    Ok(selected)
}

/// Prompt the user for a new question and add it to `repo`. Returns `None` if the user
/// pressed Ctrl+D before finishing.
pub fn add_question_interactively<W: io::Write, R: MyReadline>(
    writer: &mut W,
    reader: &mut R,
    repo: &mut Repository,
) -> Result<Option<QuestionId>> {
    my_writeln!(writer, "Question types:")?;
    for variant in ScoringVariant::ALL.iter() {
        my_writeln!(writer, "  {:<27} {}", variant.tag(), variant)?;
    }

    let tag = loop {
        match prompt(reader, "Type: ")? {
            Some(tag) => {
                if ScoringVariant::from_tag(&tag).is_ok() {
                    break tag;
                }
                my_writeln!(writer, "Unknown question type '{}'.", tag)?;
            }
            None => {
                return Ok(None);
            }
        }
    };

    let text = match prompt(reader, "Text: ")? {
        Some(text) => text,
        None => {
            return Ok(None);
        }
    };

    my_writeln!(
        writer,
        "Enter one answer per line, with a leading '*' on correct answers. Enter a blank line to finish."
    )?;
    let mut answers = Vec::new();
    loop {
        match prompt_allow_blank(reader, "Answer: ")? {
            Some(line) => {
                if line.is_empty() {
                    if answers.is_empty() {
                        my_writeln!(writer, "At least one answer is required.")?;
                        continue;
                    }
                    break;
                }

                if line.starts_with('*') {
                    answers.push(Answer::new(line[1..].trim(), true));
                } else {
                    answers.push(Answer::new(&line, false));
                }
            }
            None => {
                return Ok(None);
            }
        }
    }

    let explanation = match prompt_allow_blank(reader, "Explanation (optional): ")? {
        Some(explanation) => explanation,
        None => {
            return Ok(None);
        }
    };
    let explanation = if explanation.is_empty() {
        None
    } else {
        Some(explanation.as_str())
    };

    let question = Question::from_parameters(&text, answers, explanation, &tag, repo.rng())?;
    repo.add_question(question).map(Some)
}
