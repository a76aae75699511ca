/**
 * Definitions of data structures used by several modules, such as `QuizError` and the
 * various structs that hold command-line arguments.
 *
 * Author:  Ian Fisher (iafisher@fastmail.com)
 * Version: October 2026
 */
use std::io;
use std::path::PathBuf;

use structopt::StructOpt;
use thiserror::Error;

use super::repository::QuestionId;

pub type Result<T> = ::std::result::Result<T, QuizError>;

#[derive(Debug, Error)]
pub enum QuizError {
    /// For documents and records with missing or badly-typed fields.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// For unrecognized question or repository `type` tags. `question` is the 1-based
    /// position of the offending question in a repository document, if any.
    #[error("unknown type '{tag}'{}", at_question(.question))]
    UnknownVariant { tag: String, question: Option<usize> },
    /// For selections that break the rules of the question's scoring variant. The
    /// caller may retry with a corrected selection.
    #[error("{0}")]
    InvalidSelection(String),
    #[error("no questions available in the repository")]
    EmptyPool,
    #[error("question {0} is not in the repository")]
    QuestionNotFound(QuestionId),
    #[error("a question with the text '{0}' already exists")]
    DuplicateQuestion(String),
    /// For question numbers given on the command line that are not in the listing.
    #[error("there is no question number {0}")]
    NoSuchQuestionNumber(usize),
    #[error("could not open repository at '{}'", .0.to_string_lossy())]
    RepositoryNotFound(PathBuf),
    #[error("repository already exists at '{}'", .0.to_string_lossy())]
    RepositoryExists(PathBuf),
    #[error("cannot write to file '{}'", .0.to_string_lossy())]
    CannotWriteToFile(PathBuf),
    /// For when the application directory cannot be created.
    #[error("unable to create application directory at '{}'", .0.to_string_lossy())]
    CannotMakeAppDir(PathBuf),
    /// For when the user's system editor cannot be opened.
    #[error("unable to open system editor")]
    CannotOpenEditor,
    #[error("could not parse JSON ({0})")]
    Json(#[from] serde_json::Error),
    #[error("IO error ({0})")]
    Io(#[from] io::Error),
    #[error("")]
    ReadlineInterrupted,
    #[error("")]
    ReadlineEof,
    #[error("error while reading input")]
    ReadlineOther,
}

impl QuizError {
    /// Return `true` if the error leaves the repository usable, e.g. a bad selection
    /// that can be corrected, as opposed to a failed load.
    pub fn is_recoverable(&self) -> bool {
        match self {
            QuizError::InvalidSelection(_)
            | QuizError::EmptyPool
            | QuizError::DuplicateQuestion(_)
            | QuizError::QuestionNotFound(_) => true,
            _ => false,
        }
    }
}

fn at_question(question: &Option<usize>) -> String {
    match question {
        Some(n) => format!(" (question {})", n),
        None => String::new(),
    }
}

pub fn is_broken_pipe(e: &QuizError) -> bool {
    if let QuizError::Io(e) = e {
        if let io::ErrorKind::BrokenPipe = e.kind() {
            return true;
        }
    }
    false
}

/// Holds the command-line configuration for the application.
#[derive(StructOpt)]
#[structopt(name = "funquiz", about = "Answer quiz questions from the command line.")]
pub struct Options {
    /// Look for repositories in a particular directory.
    #[structopt(short = "d", long = "directory", parse(from_os_str))]
    pub directory: Option<PathBuf>,
    /// Do not emit colorized output.
    #[structopt(long = "no-color")]
    pub no_color: bool,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Answer questions from a repository.
    #[structopt(name = "take")]
    Take(TakeOptions),
    /// Count the questions in a repository.
    #[structopt(name = "count")]
    Count(RepositoryOptions),
    /// List the questions in a repository.
    #[structopt(name = "ls")]
    Ls(RepositoryOptions),
    /// Create a new, empty repository.
    #[structopt(name = "new")]
    New(NewOptions),
    /// Add a question to a repository.
    #[structopt(name = "add")]
    Add(RepositoryOptions),
    /// Remove questions from a repository.
    #[structopt(name = "rm")]
    Rm(RmOptions),
    /// Open a repository in the system editor.
    #[structopt(name = "edit")]
    Edit(RepositoryOptions),
}

#[derive(StructOpt)]
pub struct TakeOptions {
    /// Name or path of the repository.
    pub name: String,
    /// Limit the total number of questions.
    #[structopt(short = "n", default_value = "20")]
    pub num_to_ask: usize,
}

#[derive(StructOpt)]
pub struct RepositoryOptions {
    /// Name or path of the repository.
    pub name: String,
}

#[derive(StructOpt)]
pub struct NewOptions {
    /// Name or path of the repository to create.
    pub name: String,
    /// One of 'random', 'random_non_repeating' or 'intelligent'.
    #[structopt(short = "s", long = "strategy", default_value = "intelligent")]
    pub strategy: String,
    /// Overwrite an existing repository.
    #[structopt(short = "f", long = "force")]
    pub force: bool,
}

#[derive(StructOpt)]
pub struct RmOptions {
    /// Name or path of the repository.
    pub name: String,
    /// Numbers of the questions to remove, as printed by `ls`.
    #[structopt(required = true)]
    pub numbers: Vec<usize>,
}
