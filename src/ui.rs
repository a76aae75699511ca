/**
 * The command-line user interface for answering questions.
 *
 * Author:  Ian Fisher (iafisher@fastmail.com)
 * Version: October 2026
 */
use std::io;
use std::io::Write;

use colored::*;

use super::common::Result;
use super::iohelper::{prettyprint, prettyprint_colored};
use super::question::Question;
use super::quiz::SessionScore;

pub struct CmdUI<W: io::Write> {
    writer: W,
    number: usize,
}

impl<W: io::Write> CmdUI<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, number: 0 }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Print the text of the next question and its answers, labelled with letters.
    /// Answers past the 26th are labelled with numbers.
    pub fn question(&mut self, question: &Question) -> Result<()> {
        self.number += 1;
        my_write!(self.writer, "\n")?;
        let prefix = format!("  ({}) ", self.number);
        prettyprint_colored(
            &mut self.writer,
            question.text(),
            &prefix,
            None,
            Some(Color::Cyan),
        )?;
        my_write!(self.writer, "\n")?;

        for (i, answer) in question.answers().iter().enumerate() {
            let prefix = format!("     ({}) ", label(i));
            prettyprint(&mut self.writer, answer.text(), &prefix)?;
        }
        my_write!(self.writer, "\n")
    }

    pub fn correct(&mut self) -> Result<()> {
        my_writeln!(self.writer, "{}", "Correct!".green())
    }

    pub fn skipped(&mut self, question: &Question) -> Result<()> {
        my_writeln!(self.writer, "{}", "Skipped.".white())?;
        self.correction(question)
    }

    pub fn partially_correct(&mut self, question: &Question, score: f64) -> Result<()> {
        let scorestr = format!("{:.1}%", score * 100.0).cyan();
        my_writeln!(
            self.writer,
            "{} Score for this question: {}",
            "Partially correct.".bright_green(),
            scorestr
        )?;
        self.correction(question)
    }

    pub fn incorrect(&mut self, question: &Question) -> Result<()> {
        my_writeln!(self.writer, "{}", "Incorrect.".red())?;
        self.correction(question)
    }

    fn correction(&mut self, question: &Question) -> Result<()> {
        let correct: Vec<String> = question
            .correct_answers()
            .into_iter()
            .map(|i| format!("({}) {}", label(i), question.answers()[i].text()))
            .collect();

        let message = match correct.len() {
            0 => String::from("None of the answers were correct."),
            1 => format!("The correct answer was {}.", correct[0].green()),
            _ => format!("The correct answers were {}.", correct.join(", ").green()),
        };
        prettyprint(&mut self.writer, &message, "")
    }

    pub fn explanation(&mut self, text: &str) -> Result<()> {
        prettyprint_colored(&mut self.writer, text, "", Some(Color::BrightBlue), None)
    }

    pub fn tally(&mut self, session: &SessionScore) -> Result<()> {
        my_writeln!(
            self.writer,
            "Total: {}",
            format!("{}/{}", session.total_score, session.total_questions).cyan()
        )
    }

    pub fn warning(&mut self, text: &str) -> Result<()> {
        prettyprint_colored(
            &mut self.writer,
            &format!("Warning: {}", text),
            "",
            Some(Color::Red),
            None,
        )
    }

    pub fn results(&mut self, results: &SessionScore) -> Result<()> {
        if results.total_questions > 0 {
            let score_as_str = format!("{:.1}%", results.percentage());

            my_write!(self.writer, "\n\n")?;
            my_write!(self.writer, "Score: ")?;
            my_write!(self.writer, "{}", score_as_str.cyan())?;
            my_write!(self.writer, " out of ")?;
            my_write!(self.writer, "{}", format!("{}", results.total_questions).cyan())?;
            if results.total_questions == 1 {
                my_writeln!(self.writer, " question")?;
            } else {
                my_writeln!(self.writer, " questions")?;
            }
            my_write!(self.writer, "  {}", format!("{}", results.total_correct).green())?;
            my_write!(self.writer, " correct\n")?;
            if results.total_partially_correct > 0 {
                my_write!(
                    self.writer,
                    "  {}",
                    format!("{}", results.total_partially_correct).bright_green()
                )?;
                my_write!(self.writer, " partially correct\n")?;
            }
            my_write!(self.writer, "  {}", format!("{}", results.total_incorrect).red())?;
            my_write!(self.writer, " incorrect\n")?;
        }
        Ok(())
    }
}

/// The label of the answer at position `index`: a, b, c, ... for the first 26 answers
/// and the 1-based position after that, both of which `parse_selection` accepts.
pub fn label(index: usize) -> String {
    if index < 26 {
        ((b'a' + index as u8) as char).to_string()
    } else {
        (index + 1).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::quiz::parse_selection;

    #[test]
    fn answers_past_z_are_numbered() {
        assert_eq!(label(0), "a");
        assert_eq!(label(25), "z");
        assert_eq!(label(26), "27");
        assert_eq!(label(40), "41");

        for index in [0, 7, 25, 26, 40].iter() {
            assert_eq!(parse_selection(&label(*index)).unwrap(), vec![*index]);
        }
    }
}
