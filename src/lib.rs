/**
 * Quiz repositories: scoring questions and choosing which question to ask next.
 *
 * Author:  Ian Fisher (iafisher@fastmail.com)
 * Version: October 2026
 */
#[macro_use]
pub mod iohelper;
pub mod common;
pub mod persistence;
pub mod question;
pub mod quiz;
pub mod repository;
pub mod ui;

pub use common::{QuizError, Result};
pub use persistence::{create_repository, load_repository, save_repository};
pub use question::{Answer, Question, ScoringVariant};
pub use quiz::SessionScore;
pub use repository::{PoolSlot, QuestionId, Repository, StrategyKind};
