/**
 * Repositories: a pool of questions together with the strategy that picks which
 * question to ask next.
 *
 * Random: any question, every time.
 * Random non-repeating: every question once per cycle, in random order.
 * Intelligent: like random non-repeating, but a cycle that ends with questions that
 *   were answered imperfectly is followed by a cycle of just those questions.
 *
 * Author:  Ian Fisher (iafisher@fastmail.com)
 * Version: October 2026
 */
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::mem;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use unicode_normalization::UnicodeNormalization;

use super::common::{QuizError, Result};
use super::question::Question;
use super::quiz::SessionScore;

/// Identifies a question inside the pool that owns it. Identifiers are never reused
/// within a pool, so a stale identifier cannot name a different question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionId(u64);

/// The selection strategy declared by a repository document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Random,
    RandomNonRepeating,
    Intelligent,
}

/// One entry of the replacement list given to `Repository::replace_questions`.
#[derive(Debug)]
pub enum PoolSlot {
    /// Keep a question that is already in the pool.
    Existing(QuestionId),
    /// Move a new question into the pool.
    New(Question),
}

/// The ordered questions owned by a repository.
#[derive(Debug, Default)]
struct Pool {
    entries: Vec<(QuestionId, Question)>,
    next_id: u64,
}

#[derive(Debug)]
enum Strategy {
    Random,
    RandomNonRepeating {
        remaining: BTreeSet<QuestionId>,
    },
    Intelligent {
        remaining: BTreeSet<QuestionId>,
        /// Questions scored below 1 since the last cycle began.
        hard: BTreeSet<QuestionId>,
    },
}

#[derive(Debug)]
pub struct Repository {
    pool: Pool,
    strategy: Strategy,
    rng: StdRng,
    session: SessionScore,
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Random,
        StrategyKind::RandomNonRepeating,
        StrategyKind::Intelligent,
    ];

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "random" => Ok(StrategyKind::Random),
            "random_non_repeating" => Ok(StrategyKind::RandomNonRepeating),
            "intelligent" => Ok(StrategyKind::Intelligent),
            _ => Err(QuizError::UnknownVariant {
                tag: String::from(tag),
                question: None,
            }),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            StrategyKind::Random => "random",
            StrategyKind::RandomNonRepeating => "random_non_repeating",
            StrategyKind::Intelligent => "intelligent",
        }
    }
}

impl Pool {
    fn push(&mut self, question: Question) -> QuestionId {
        let id = QuestionId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, question));
        id
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, id: QuestionId) -> Option<&Question> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, q)| q)
    }

    pub(crate) fn contains(&self, id: QuestionId) -> bool {
        self.entries.iter().any(|(i, _)| *i == id)
    }

    pub(crate) fn ids(&self) -> Vec<QuestionId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (QuestionId, &Question)> {
        self.entries.iter().map(|(id, q)| (*id, q))
    }
}

impl Strategy {
    fn new(kind: StrategyKind, pool: &Pool) -> Self {
        let all: BTreeSet<QuestionId> = pool.ids().into_iter().collect();
        match kind {
            StrategyKind::Random => Strategy::Random,
            StrategyKind::RandomNonRepeating => Strategy::RandomNonRepeating { remaining: all },
            StrategyKind::Intelligent => Strategy::Intelligent {
                remaining: all,
                hard: BTreeSet::new(),
            },
        }
    }

    fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Random => StrategyKind::Random,
            Strategy::RandomNonRepeating { .. } => StrategyKind::RandomNonRepeating,
            Strategy::Intelligent { .. } => StrategyKind::Intelligent,
        }
    }

    fn next<R: Rng + ?Sized>(&mut self, pool: &Pool, rng: &mut R) -> Result<QuestionId> {
        if pool.is_empty() {
            return Err(QuizError::EmptyPool);
        }

        match self {
            Strategy::Random => {
                let index = rng.gen_range(0..pool.len());
                Ok(pool.entries[index].0)
            }
            Strategy::RandomNonRepeating { remaining } => {
                if remaining.is_empty() {
                    debug!("all questions asked, starting a new cycle");
                    remaining.extend(pool.ids());
                }
                draw(remaining, rng)
            }
            Strategy::Intelligent { remaining, hard } => {
                if remaining.is_empty() {
                    if hard.is_empty() {
                        debug!("all questions asked, starting a new cycle");
                        remaining.extend(pool.ids());
                    } else {
                        debug!("starting a new cycle with {} hard question(s)", hard.len());
                        mem::swap(remaining, hard);
                    }
                    hard.clear();
                }
                draw(remaining, rng)
            }
        }
    }

    fn feedback(&mut self, id: QuestionId, score: f64) {
        if let Strategy::Intelligent { hard, .. } = self {
            if score < 1.0 && hard.insert(id) {
                debug!("question {} marked hard (score {})", id, score);
            }
        }
    }
}

/// Remove and return a uniformly random member of `remaining`.
fn draw<R: Rng + ?Sized>(remaining: &mut BTreeSet<QuestionId>, rng: &mut R) -> Result<QuestionId> {
    if remaining.is_empty() {
        return Err(QuizError::EmptyPool);
    }
    let index = rng.gen_range(0..remaining.len());
    let id = remaining
        .iter()
        .nth(index)
        .cloned()
        .ok_or(QuizError::EmptyPool)?;
    remaining.remove(&id);
    Ok(id)
}

impl Repository {
    /// Return a new, empty repository.
    pub fn new(kind: StrategyKind) -> Self {
        Repository::with_rng(kind, StdRng::from_entropy())
    }

    /// Return a new, empty repository that draws questions with `rng`.
    pub fn with_rng(kind: StrategyKind, rng: StdRng) -> Self {
        Repository::from_questions(kind, Vec::new(), rng)
    }

    /// Return a repository that owns `questions`, in order.
    pub fn from_questions(kind: StrategyKind, questions: Vec<Question>, rng: StdRng) -> Self {
        let mut pool = Pool::default();
        for question in questions.into_iter() {
            pool.push(question);
        }
        let strategy = Strategy::new(kind, &pool);
        Repository {
            pool,
            strategy,
            rng,
            session: SessionScore::new(),
        }
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn question_count(&self) -> usize {
        self.pool.len()
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.pool.get(id)
    }

    /// Questions in pool order.
    pub fn questions(&self) -> impl Iterator<Item = (QuestionId, &Question)> {
        self.pool.iter()
    }

    pub fn ids(&self) -> Vec<QuestionId> {
        self.pool.ids()
    }

    pub fn session(&self) -> &SessionScore {
        &self.session
    }

    /// The repository's random number generator, for building questions that will be
    /// added to it.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Choose the next question to ask.
    pub fn next_question(&mut self) -> Result<QuestionId> {
        self.strategy.next(&self.pool, &mut self.rng)
    }

    /// Report the score a question received so the strategy can take it into account.
    pub fn feedback(&mut self, id: QuestionId, score: f64) -> Result<()> {
        if !self.pool.contains(id) {
            return Err(QuizError::QuestionNotFound(id));
        }
        self.strategy.feedback(id, score);
        Ok(())
    }

    /// Score the answers at positions `selected` of question `id`, then feed the score
    /// back to the strategy. Nothing changes if the selection is rejected.
    pub fn score_and_feedback(&mut self, id: QuestionId, selected: &[usize]) -> Result<f64> {
        let question = self.pool.get(id).ok_or(QuizError::QuestionNotFound(id))?;
        let score = match question.score(selected) {
            Ok(score) => score,
            Err(e) => {
                debug!("selection {:?} rejected for question {}: {}", selected, id, e);
                return Err(e);
            }
        };

        self.strategy.feedback(id, score);
        self.session.record(score);
        Ok(score)
    }

    /// Replace the contents of the pool. Questions not named by an `Existing` slot are
    /// dropped, and the strategy and session start over. Returns the identifiers of the
    /// new pool in order.
    pub fn replace_questions(&mut self, slots: Vec<PoolSlot>) -> Result<Vec<QuestionId>> {
        for slot in slots.iter() {
            if let PoolSlot::Existing(id) = slot {
                if !self.pool.contains(*id) {
                    return Err(QuizError::QuestionNotFound(*id));
                }
            }
        }

        let mut old: HashMap<QuestionId, Question> = self.pool.entries.drain(..).collect();
        let mut kept = 0;
        let mut added = 0;
        let mut ids = Vec::with_capacity(slots.len());
        for slot in slots.into_iter() {
            match slot {
                PoolSlot::Existing(id) => {
                    // A repeated identifier has already been moved back into the pool.
                    if let Some(question) = old.remove(&id) {
                        self.pool.entries.push((id, question));
                        ids.push(id);
                        kept += 1;
                    }
                }
                PoolSlot::New(question) => {
                    ids.push(self.pool.push(question));
                    added += 1;
                }
            }
        }

        info!(
            "replaced questions: {} kept, {} added, {} dropped",
            kept,
            added,
            old.len()
        );
        self.strategy = Strategy::new(self.strategy.kind(), &self.pool);
        self.session = SessionScore::new();
        Ok(ids)
    }

    /// Add a question at the end of the pool. Fails if a question with the same text
    /// (ignoring case) is already present.
    pub fn add_question(&mut self, question: Question) -> Result<QuestionId> {
        let text = normalize(question.text());
        if self.pool.iter().any(|(_, q)| normalize(q.text()) == text) {
            return Err(QuizError::DuplicateQuestion(String::from(question.text())));
        }

        // The only new slot is given the pool's next identifier.
        let id = QuestionId(self.pool.next_id);
        let mut slots: Vec<PoolSlot> = self.pool.ids().into_iter().map(PoolSlot::Existing).collect();
        slots.push(PoolSlot::New(question));
        self.replace_questions(slots)?;
        Ok(id)
    }

    /// Remove a question from the pool.
    pub fn remove_question(&mut self, id: QuestionId) -> Result<()> {
        if !self.pool.contains(id) {
            return Err(QuizError::QuestionNotFound(id));
        }

        let slots = self
            .pool
            .ids()
            .into_iter()
            .filter(|i| *i != id)
            .map(PoolSlot::Existing)
            .collect();
        self.replace_questions(slots)?;
        Ok(())
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase().nfc().collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::question::Answer;

    #[test]
    fn empty_pool_cannot_be_drawn_from() {
        for kind in StrategyKind::ALL.iter() {
            let mut repo = Repository::with_rng(*kind, rng());
            assert!(match repo.next_question() {
                Err(QuizError::EmptyPool) => true,
                _ => false,
            });

            // The repository is still usable afterwards.
            let id = repo.add_question(q("Q1")).unwrap();
            assert_eq!(repo.next_question().unwrap(), id);
        }
    }

    #[test]
    fn random_draws_from_whole_pool() {
        let mut repo = repo(StrategyKind::Random, 2);
        let mut seen = BTreeSet::new();
        for _ in 0..50 {
            seen.insert(repo.next_question().unwrap());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn random_non_repeating_visits_each_question_once_per_cycle() {
        let mut repo = repo(StrategyKind::RandomNonRepeating, 5);
        let all: BTreeSet<QuestionId> = repo.ids().into_iter().collect();

        for _ in 0..3 {
            let mut seen = BTreeSet::new();
            for _ in 0..5 {
                assert!(seen.insert(repo.next_question().unwrap()));
            }
            assert_eq!(seen, all);
        }
    }

    #[test]
    fn intelligent_repeats_hard_questions_next_cycle() {
        let mut repo = repo(StrategyKind::Intelligent, 4);

        let mut first_cycle = Vec::new();
        for _ in 0..4 {
            first_cycle.push(repo.next_question().unwrap());
        }
        let hard_question = first_cycle[1];
        for id in first_cycle.iter() {
            let score = if *id == hard_question { 0.5 } else { 1.0 };
            repo.feedback(*id, score).unwrap();
        }

        // The next cycle consists of only the hard question, and the hard set is empty
        // again once it has been drawn into the cycle.
        assert_eq!(repo.next_question().unwrap(), hard_question);
        assert_eq!(hard_set(&repo).len(), 0);
        assert_eq!(remaining_set(&repo).len(), 0);

        // Answered perfectly this time, so the following cycle is the whole pool.
        repo.feedback(hard_question, 1.0).unwrap();
        let mut seen = BTreeSet::new();
        for _ in 0..4 {
            assert!(seen.insert(repo.next_question().unwrap()));
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn intelligent_feedback_uses_set_semantics() {
        let mut repo = repo(StrategyKind::Intelligent, 2);
        let id = repo.next_question().unwrap();
        repo.feedback(id, 0.0).unwrap();
        repo.feedback(id, -1.0).unwrap();
        assert_eq!(hard_set(&repo).len(), 1);

        repo.feedback(id, 1.0).unwrap();
        assert_eq!(hard_set(&repo).len(), 1);
    }

    #[test]
    fn feedback_is_ignored_by_random_strategies() {
        for kind in [StrategyKind::Random, StrategyKind::RandomNonRepeating].iter() {
            let mut repo = repo(*kind, 3);
            let id = repo.next_question().unwrap();
            repo.feedback(id, -1.0).unwrap();
            assert_eq!(repo.strategy_kind(), *kind);
        }
    }

    #[test]
    fn rejected_selection_changes_nothing() {
        let mut repo = repo(StrategyKind::Intelligent, 2);
        let id = repo.next_question().unwrap();

        let result = repo.score_and_feedback(id, &[0, 1]);
        assert!(match result {
            Err(QuizError::InvalidSelection(_)) => true,
            _ => false,
        });
        assert_eq!(hard_set(&repo).len(), 0);
        assert_eq!(repo.session().total_questions, 0);

        let wrong = wrong_answer(&repo, id);
        assert_eq!(repo.score_and_feedback(id, &[wrong]).unwrap(), 0.0);
        assert!(hard_set(&repo).contains(&id));
        assert_eq!(repo.session().total_questions, 1);
    }

    #[test]
    fn session_tracks_scores() {
        let mut repo = repo(StrategyKind::Random, 3);
        let id = repo.next_question().unwrap();
        let right = repo.question(id).unwrap().correct_answers()[0];
        let wrong = wrong_answer(&repo, id);

        repo.score_and_feedback(id, &[right]).unwrap();
        repo.score_and_feedback(id, &[wrong]).unwrap();

        let session = repo.session();
        assert_eq!(session.total_questions, 2);
        assert_eq!(session.total_score, 1.0);
        assert_eq!(session.total_correct, 1);
        assert_eq!(session.total_incorrect, 1);
        assert_eq!(session.percentage(), 50.0);
    }

    #[test]
    fn replacing_questions_drops_the_rest_and_resets_state() {
        let mut repo = repo(StrategyKind::Intelligent, 3);
        let ids = repo.ids();
        let first = repo.next_question().unwrap();
        repo.feedback(first, 0.0).unwrap();

        let new_ids = repo
            .replace_questions(vec![
                PoolSlot::Existing(ids[2]),
                PoolSlot::New(q("Q new")),
                PoolSlot::Existing(ids[0]),
            ])
            .unwrap();

        assert_eq!(repo.question_count(), 3);
        assert_eq!(new_ids[0], ids[2]);
        assert_eq!(new_ids[2], ids[0]);
        assert!(repo.question(ids[1]).is_none());
        assert_eq!(repo.question(new_ids[1]).unwrap().text(), "Q new");
        assert_eq!(repo.ids(), new_ids);

        assert_eq!(hard_set(&repo).len(), 0);
        let remaining: Vec<QuestionId> = remaining_set(&repo).iter().cloned().collect();
        let mut expected = new_ids.clone();
        expected.sort();
        assert_eq!(remaining, expected);
    }

    #[test]
    fn replacing_with_unknown_question_fails_without_changes() {
        let mut repo = repo(StrategyKind::RandomNonRepeating, 2);
        let ids = repo.ids();
        repo.remove_question(ids[1]).unwrap();

        let result = repo.replace_questions(vec![
            PoolSlot::Existing(ids[0]),
            PoolSlot::Existing(ids[1]),
        ]);
        assert!(match result {
            Err(QuizError::QuestionNotFound(id)) => id == ids[1],
            _ => false,
        });
        assert_eq!(repo.ids(), vec![ids[0]]);
    }

    #[test]
    fn repeated_slots_keep_one_copy() {
        let mut repo = repo(StrategyKind::Random, 2);
        let ids = repo.ids();
        let new_ids = repo
            .replace_questions(vec![PoolSlot::Existing(ids[0]), PoolSlot::Existing(ids[0])])
            .unwrap();
        assert_eq!(new_ids, vec![ids[0]]);
        assert_eq!(repo.question_count(), 1);
    }

    #[test]
    fn removed_question_is_never_drawn() {
        let mut repo = repo(StrategyKind::Intelligent, 3);
        let id = repo.next_question().unwrap();
        repo.feedback(id, 0.0).unwrap();
        repo.remove_question(id).unwrap();

        assert!(!hard_set(&repo).contains(&id));
        for _ in 0..10 {
            assert_ne!(repo.next_question().unwrap(), id);
        }
        assert!(match repo.feedback(id, 0.0) {
            Err(QuizError::QuestionNotFound(_)) => true,
            _ => false,
        });
    }

    #[test]
    fn cannot_add_duplicate_question() {
        let mut repo = repo(StrategyKind::Random, 2);
        assert!(match repo.add_question(q("  q1 ")) {
            Err(QuizError::DuplicateQuestion(_)) => true,
            _ => false,
        });
        assert_eq!(repo.question_count(), 2);

        let id = repo.add_question(q("Q3")).unwrap();
        assert_eq!(repo.question_count(), 3);
        assert_eq!(repo.question(id).unwrap().text(), "Q3");
        assert_eq!(repo.ids().last(), Some(&id));
    }

    #[test]
    fn identifiers_are_not_reused() {
        let mut repo = repo(StrategyKind::Random, 1);
        let old = repo.ids()[0];
        repo.remove_question(old).unwrap();
        let new = repo.add_question(q("Q1")).unwrap();
        assert_ne!(old, new);
        assert!(repo.question(old).is_none());
    }

    fn repo(kind: StrategyKind, n: usize) -> Repository {
        let mut r = rng();
        let questions: Vec<Question> = (1..=n).map(|i| q_with(&format!("Q{}", i), &mut r)).collect();
        Repository::from_questions(kind, questions, r)
    }

    fn q(text: &str) -> Question {
        q_with(text, &mut rng())
    }

    fn q_with(text: &str, r: &mut StdRng) -> Question {
        let answers = vec![Answer::new("yes", true), Answer::new("no", false)];
        Question::from_parameters(text, answers, None, "single", r).unwrap()
    }

    fn wrong_answer(repo: &Repository, id: QuestionId) -> usize {
        let question = repo.question(id).unwrap();
        question
            .answers()
            .iter()
            .position(|a| !a.is_correct())
            .unwrap()
    }

    fn hard_set(repo: &Repository) -> &BTreeSet<QuestionId> {
        match &repo.strategy {
            Strategy::Intelligent { hard, .. } => hard,
            _ => panic!("not an intelligent repository"),
        }
    }

    fn remaining_set(repo: &Repository) -> &BTreeSet<QuestionId> {
        match &repo.strategy {
            Strategy::RandomNonRepeating { remaining } => remaining,
            Strategy::Intelligent { remaining, .. } => remaining,
            Strategy::Random => panic!("random repositories have no remaining set"),
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }
}
