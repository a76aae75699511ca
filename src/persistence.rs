/**
 * Reading and writing repository documents in the filesystem.
 *
 * Author:  Ian Fisher (iafisher@fastmail.com)
 * Version: October 2026
 */
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::Value;

use super::common::{QuizError, Result};
use super::question::Question;
use super::repository::{Repository, StrategyKind};

#[derive(Serialize)]
struct RepositoryRecord<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    questions: Vec<QuestionRecord<'a>>,
}

#[derive(Serialize)]
struct QuestionRecord<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
    explanation: &'a str,
    answers: Vec<AnswerRecord<'a>>,
}

#[derive(Serialize)]
struct AnswerRecord<'a> {
    text: &'a str,
    is_correct: bool,
}

/// Load the repository stored at `path`.
pub fn load_repository(path: &Path) -> Result<Repository> {
    let data =
        fs::read_to_string(path).or(Err(QuizError::RepositoryNotFound(path.to_path_buf())))?;
    let repo = Repository::from_json(&data)?;
    info!(
        "loaded repository from {} ({} questions, strategy '{}')",
        path.display(),
        repo.question_count(),
        repo.strategy_kind().tag()
    );
    Ok(repo)
}

/// Write `repo` to `path`, replacing whatever was there.
pub fn save_repository(repo: &Repository, path: &Path) -> Result<()> {
    let serialized = repo.to_json()?;
    fs::write(path, serialized).or(Err(QuizError::CannotWriteToFile(path.to_path_buf())))?;
    info!(
        "saved {} questions to {}",
        repo.question_count(),
        path.display()
    );
    Ok(())
}

/// Write an empty repository to `path`, with `.json` appended if the path has no such
/// extension. Fails if the file already exists, unless `force` is true. Returns the
/// path that was written.
pub fn create_repository(path: &Path, kind: StrategyKind, force: bool) -> Result<PathBuf> {
    let path = if path.extension().map_or(false, |ext| ext == "json") {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_os_string();
        name.push(".json");
        PathBuf::from(name)
    };

    if path.exists() && !force {
        return Err(QuizError::RepositoryExists(path));
    }

    save_repository(&Repository::new(kind), &path)?;
    Ok(path)
}

impl Repository {
    /// Build a repository from a JSON document.
    pub fn from_json(data: &str) -> Result<Self> {
        Repository::from_json_with_rng(data, StdRng::from_entropy())
    }

    /// Build a repository from a JSON document, shuffling answers and drawing questions
    /// with `rng`.
    pub fn from_json_with_rng(data: &str, mut rng: StdRng) -> Result<Self> {
        let document: Value = serde_json::from_str(data)?;
        let document = document.as_object().ok_or_else(|| {
            QuizError::MalformedInput(String::from("repository is not a JSON object"))
        })?;

        let tag = document.get("type").and_then(Value::as_str).ok_or_else(|| {
            QuizError::MalformedInput(String::from(
                "repository does not contain a valid 'type' field",
            ))
        })?;
        let kind = StrategyKind::from_tag(tag)?;

        let records = document
            .get("questions")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                QuizError::MalformedInput(String::from(
                    "repository does not contain a 'questions' list",
                ))
            })?;

        let mut questions = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            match Question::from_json(record, &mut rng) {
                Ok(question) => {
                    questions.push(question);
                }
                Err(QuizError::MalformedInput(message)) => {
                    return Err(QuizError::MalformedInput(format!(
                        "{} (question {})",
                        message,
                        i + 1
                    )));
                }
                Err(QuizError::UnknownVariant { tag, .. }) => {
                    return Err(QuizError::UnknownVariant {
                        tag,
                        question: Some(i + 1),
                    });
                }
                Err(e) => {
                    return Err(e);
                }
            }
        }

        Ok(Repository::from_questions(kind, questions, rng))
    }

    /// Serialize the repository as a JSON document. Answers are written in their
    /// current display order.
    pub fn to_json(&self) -> Result<String> {
        let record = RepositoryRecord {
            kind: self.strategy_kind().tag(),
            questions: self
                .questions()
                .map(|(_, q)| QuestionRecord {
                    kind: q.variant().tag(),
                    text: q.text(),
                    explanation: q.explanation(),
                    answers: q
                        .answers()
                        .iter()
                        .map(|a| AnswerRecord {
                            text: a.text(),
                            is_correct: a.is_correct(),
                        })
                        .collect(),
                })
                .collect(),
        };
        serde_json::to_string_pretty(&record).map_err(QuizError::Json)
    }
}

/// Return the path to the repository called `name`. A name that is already a path to
/// a file (an existing file, or anything with a path separator or a `.json` extension)
/// is used as is; otherwise the repository is looked up in `directory`, or in the
/// application directory if `directory` is `None`.
pub fn get_repository_path(name: &str, directory: Option<&Path>) -> Result<PathBuf> {
    let as_path = Path::new(name);
    if as_path.is_file()
        || name.contains(std::path::MAIN_SEPARATOR)
        || name.contains('/')
        || as_path.extension().map_or(false, |ext| ext == "json")
    {
        return Ok(as_path.to_path_buf());
    }

    let mut dirpath = match directory {
        Some(directory) => directory.to_path_buf(),
        None => require_app_dir_path()?,
    };
    dirpath.push(format!("{}.json", name));
    Ok(dirpath)
}

/// Return the path to the application directory.
pub fn get_app_dir_path() -> Result<PathBuf> {
    let mut dirpath =
        dirs::data_dir().ok_or(QuizError::CannotMakeAppDir(PathBuf::from("funquiz")))?;
    dirpath.push("funquiz");
    Ok(dirpath)
}

/// Return the path to the application directory, creating it if it doesn't exist.
pub fn require_app_dir_path() -> Result<PathBuf> {
    let dirpath = get_app_dir_path()?;
    if !dirpath.as_path().exists() {
        fs::create_dir_all(&dirpath).or(Err(QuizError::CannotMakeAppDir(dirpath.clone())))?;
    }
    Ok(dirpath)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    use crate::question::{Answer, ScoringVariant, DEFAULT_EXPLANATION};

    const DOCUMENT: &str = r#"
    {
        "type": "random_non_repeating",
        "questions": [
            {
                "type": "skippable_negative_single",
                "text": "What is the capital of Mongolia?",
                "explanation": "Also spelled Ulaanbaatar.",
                "answers": [
                    {"text": "Ulan Bator", "is_correct": true},
                    {"text": "Astana", "is_correct": false},
                    {"text": "Bishkek", "is_correct": false}
                ]
            },
            {
                "type": "negative_multiple",
                "text": "Which of these are prime?",
                "answers": [
                    {"text": "2", "is_correct": true},
                    {"text": "4", "is_correct": false},
                    {"text": "7", "is_correct": true}
                ]
            }
        ]
    }
    "#;

    #[test]
    fn can_load_repository_from_json() {
        let repo = Repository::from_json_with_rng(DOCUMENT, rng()).unwrap();
        assert_eq!(repo.strategy_kind(), StrategyKind::RandomNonRepeating);
        assert_eq!(repo.question_count(), 2);

        let questions: Vec<&Question> = repo.questions().map(|(_, q)| q).collect();
        assert_eq!(questions[0].text(), "What is the capital of Mongolia?");
        assert_eq!(
            questions[0].variant(),
            ScoringVariant::SkippableNegativeSingleChoice
        );
        assert_eq!(questions[1].explanation(), DEFAULT_EXPLANATION);
        assert_eq!(questions[1].correct_answers().len(), 2);
    }

    #[test]
    fn round_trip_preserves_questions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geography.json");

        let saved = Repository::from_json_with_rng(DOCUMENT, rng()).unwrap();
        save_repository(&saved, &path).unwrap();
        let loaded = load_repository(&path).unwrap();

        assert_eq!(loaded.strategy_kind(), saved.strategy_kind());
        assert_eq!(loaded.question_count(), saved.question_count());
        for ((_, a), (_, b)) in saved.questions().zip(loaded.questions()) {
            assert_eq!(a.text(), b.text());
            assert_eq!(a.explanation(), b.explanation());
            assert_eq!(a.variant(), b.variant());
            assert_eq!(sorted_answers(a), sorted_answers(b));
        }
    }

    #[test]
    fn saved_document_uses_tags() {
        let mut repo = Repository::with_rng(StrategyKind::Intelligent, rng());
        let question = Question::from_parameters(
            "Pick one",
            vec![Answer::new("yes", true)],
            None,
            "negative_single",
            repo.rng(),
        )
        .unwrap();
        repo.add_question(question).unwrap();

        let value: Value = serde_json::from_str(&repo.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "intelligent");
        assert_eq!(value["questions"][0]["type"], "negative_single");
        assert_eq!(value["questions"][0]["explanation"], DEFAULT_EXPLANATION);
        assert_eq!(value["questions"][0]["answers"][0]["is_correct"], true);
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let result = Repository::from_json(r#"{"type": "alphabetical", "questions": []}"#);
        match result {
            Err(QuizError::UnknownVariant { tag, question }) => {
                assert_eq!(tag, "alphabetical");
                assert_eq!(question, None);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn malformed_question_is_reported_with_its_position() {
        let data = r#"
        {
            "type": "random",
            "questions": [
                {"type": "single", "text": "Q1", "answers": [{"text": "a", "is_correct": true}]},
                {"type": "single", "text": "Q2", "answers": [{"text": "a"}]}
            ]
        }
        "#;
        match Repository::from_json(data) {
            Err(QuizError::MalformedInput(message)) => assert!(message.contains("question 2")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_question_type_is_reported_with_its_position() {
        let data = r#"
        {
            "type": "random",
            "questions": [
                {"type": "single", "text": "Q1", "answers": [{"text": "a", "is_correct": true}]},
                {"type": "essay", "text": "Q2", "answers": [{"text": "a", "is_correct": true}]}
            ]
        }
        "#;
        match Repository::from_json(data) {
            Err(e @ QuizError::UnknownVariant { .. }) => {
                assert_eq!(e.to_string(), "unknown type 'essay' (question 2)");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn save_failure_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("geography.json");
        let repo = Repository::with_rng(StrategyKind::Random, rng());
        assert!(match save_repository(&repo, &path) {
            Err(QuizError::CannotWriteToFile(p)) => p == path,
            _ => false,
        });
        assert!(!path.exists());
    }

    #[test]
    fn bad_documents_are_rejected() {
        assert!(match Repository::from_json("not json") {
            Err(QuizError::Json(_)) => true,
            _ => false,
        });
        assert!(match Repository::from_json("[]") {
            Err(QuizError::MalformedInput(_)) => true,
            _ => false,
        });
        assert!(match Repository::from_json(r#"{"questions": []}"#) {
            Err(QuizError::MalformedInput(_)) => true,
            _ => false,
        });
        assert!(match Repository::from_json(r#"{"type": "random"}"#) {
            Err(QuizError::MalformedInput(_)) => true,
            _ => false,
        });
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope.json");
        assert!(match load_repository(&path) {
            Err(QuizError::RepositoryNotFound(p)) => p == path,
            _ => false,
        });
    }

    #[test]
    fn can_create_empty_repository() {
        let dir = tempdir().unwrap();
        let path = create_repository(&dir.path().join("empty"), StrategyKind::Random, false)
            .unwrap();
        assert_eq!(path, dir.path().join("empty.json"));

        let repo = load_repository(&path).unwrap();
        assert_eq!(repo.question_count(), 0);
        assert_eq!(repo.strategy_kind(), StrategyKind::Random);

        assert!(match create_repository(&path, StrategyKind::Intelligent, false) {
            Err(QuizError::RepositoryExists(_)) => true,
            _ => false,
        });
        create_repository(&path, StrategyKind::Intelligent, true).unwrap();
        assert_eq!(
            load_repository(&path).unwrap().strategy_kind(),
            StrategyKind::Intelligent
        );
    }

    #[test]
    fn repository_names_are_resolved() {
        let dir = tempdir().unwrap();
        assert_eq!(
            get_repository_path("history", Some(dir.path())).unwrap(),
            dir.path().join("history.json")
        );
        assert_eq!(
            get_repository_path("history.json", Some(dir.path())).unwrap(),
            PathBuf::from("history.json")
        );
        assert_eq!(
            get_repository_path("tests/history", Some(dir.path())).unwrap(),
            PathBuf::from("tests/history")
        );
    }

    fn sorted_answers(question: &Question) -> Vec<Answer> {
        let mut answers = question.answers().to_vec();
        answers.sort_by(|a, b| a.text().cmp(b.text()));
        answers
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }
}
