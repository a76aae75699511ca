/**
 * Answer quiz questions from the command line.
 *
 * Author:  Ian Fisher (iafisher@fastmail.com)
 * Version: October 2026
 */
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command as Process;

use colored::*;
use log::info;
use structopt::StructOpt;

use funquiz::common::{
    is_broken_pipe, Command, NewOptions, Options, QuizError, RepositoryOptions, Result,
    RmOptions, TakeOptions,
};
use funquiz::iohelper::{confirm, MyReadline};
use funquiz::ui::CmdUI;
use funquiz::{my_writeln, persistence, quiz, StrategyKind};

fn main() {
    pretty_env_logger::init();
    let options = Options::from_args();

    if options.no_color {
        colored::control::set_override(false);
    }

    let directory = options.directory.as_ref().map(PathBuf::as_path);
    let mut rl = rustyline::Editor::<()>::new();
    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let result = match options.cmd {
        Command::Take(options) => main_take(&mut writer, &mut rl, directory, options),
        Command::Count(options) => main_count(&mut writer, directory, options),
        Command::Ls(options) => main_ls(&mut writer, directory, options),
        Command::New(options) => main_new(&mut writer, directory, options),
        Command::Add(options) => main_add(&mut writer, &mut rl, directory, options),
        Command::Rm(options) => main_rm(&mut writer, directory, options),
        Command::Edit(options) => main_edit(&mut rl, directory, options),
    };

    if let Err(e) = result {
        match e {
            QuizError::ReadlineInterrupted | QuizError::ReadlineEof => {}
            _ => {
                if !is_broken_pipe(&e) {
                    eprintln!("{}: {}", "Error".red(), e);
                    ::std::process::exit(2);
                }
            }
        }
    }
}

/// The main function for the `take` subcommand.
fn main_take<W: io::Write, R: MyReadline>(
    writer: &mut W,
    reader: &mut R,
    directory: Option<&Path>,
    options: TakeOptions,
) -> Result<()> {
    let path = persistence::get_repository_path(&options.name, directory)?;
    let mut repo = persistence::load_repository(&path)?;

    let mut ui = CmdUI::new(writer);
    quiz::take(&mut ui, reader, &mut repo, options.num_to_ask)?;
    info!(
        "session started at {} ended with {} of {} questions answered correctly",
        repo.session().time_started,
        repo.session().total_correct,
        repo.session().total_questions
    );
    Ok(())
}

/// The main function for the `count` subcommand.
fn main_count<W: io::Write>(
    writer: &mut W,
    directory: Option<&Path>,
    options: RepositoryOptions,
) -> Result<()> {
    let path = persistence::get_repository_path(&options.name, directory)?;
    let repo = persistence::load_repository(&path)?;
    my_writeln!(writer, "{}", repo.question_count())
}

/// The main function for the `ls` subcommand.
fn main_ls<W: io::Write>(
    writer: &mut W,
    directory: Option<&Path>,
    options: RepositoryOptions,
) -> Result<()> {
    let path = persistence::get_repository_path(&options.name, directory)?;
    let repo = persistence::load_repository(&path)?;

    if repo.question_count() == 0 {
        return my_writeln!(writer, "No questions found.");
    }

    for (i, (_, question)) in repo.questions().enumerate() {
        let prefix = format!("{:>3}. ", i + 1);
        let suffix = format!("[{}, {} answers]", question.variant().tag(), question.answers().len());
        my_writeln!(writer, "{}{} {}", prefix.cyan(), question.text(), suffix.white())?;
    }
    Ok(())
}

/// The main function for the `new` subcommand.
fn main_new<W: io::Write>(
    writer: &mut W,
    directory: Option<&Path>,
    options: NewOptions,
) -> Result<()> {
    let kind = StrategyKind::from_tag(&options.strategy)?;
    let path = persistence::get_repository_path(&options.name, directory)?;
    let path = persistence::create_repository(&path, kind, options.force)?;
    my_writeln!(writer, "Created repository at {}", path.display())
}

/// The main function for the `add` subcommand.
fn main_add<W: io::Write, R: MyReadline>(
    writer: &mut W,
    reader: &mut R,
    directory: Option<&Path>,
    options: RepositoryOptions,
) -> Result<()> {
    let path = persistence::get_repository_path(&options.name, directory)?;
    let mut repo = persistence::load_repository(&path)?;

    if quiz::add_question_interactively(writer, reader, &mut repo)?.is_some() {
        persistence::save_repository(&repo, &path)?;
        my_writeln!(writer, "Question added.")?;
    }
    Ok(())
}

/// The main function for the `rm` subcommand.
fn main_rm<W: io::Write>(
    writer: &mut W,
    directory: Option<&Path>,
    options: RmOptions,
) -> Result<()> {
    let path = persistence::get_repository_path(&options.name, directory)?;
    let mut repo = persistence::load_repository(&path)?;

    let ids = repo.ids();
    let mut to_remove = Vec::new();
    for number in options.numbers.iter() {
        match ids.get(number.wrapping_sub(1)) {
            Some(id) => to_remove.push(*id),
            None => {
                return Err(QuizError::NoSuchQuestionNumber(*number));
            }
        }
    }

    for id in to_remove.iter() {
        // A number given twice was already removed.
        if repo.question(*id).is_some() {
            repo.remove_question(*id)?;
        }
    }

    persistence::save_repository(&repo, &path)?;
    my_writeln!(writer, "{} question(s) left.", repo.question_count())
}

/// The main function for the `edit` subcommand.
fn main_edit<R: MyReadline>(
    reader: &mut R,
    directory: Option<&Path>,
    options: RepositoryOptions,
) -> Result<()> {
    let path = persistence::get_repository_path(&options.name, directory)?;

    loop {
        launch_editor(&path)?;

        if path.exists() {
            // Load it again to make sure it's okay.
            if let Err(e) = persistence::load_repository(&path) {
                eprintln!("{}: {}", "Error".red(), e);
                if !confirm(reader, "Do you want to save anyway? ") {
                    continue;
                }
            }
        }
        break;
    }
    Ok(())
}

fn launch_editor(path: &Path) -> Result<()> {
    let editor = ::std::env::var("EDITOR").unwrap_or_else(|_| String::from("nano"));
    let mut child = Process::new(&editor)
        .arg(path)
        .spawn()
        .or(Err(QuizError::CannotOpenEditor))?;
    child.wait().or(Err(QuizError::CannotOpenEditor))?;
    Ok(())
}
