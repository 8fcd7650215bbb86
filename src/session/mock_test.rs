use chrono::{DateTime, Utc};
use rand::Rng;

use crate::gateway::{Evaluation, Question};
use crate::store::schema::{AnsweredQuestion, MockTestOptions, TestRecord};

pub const EMPTY_ANSWER_MESSAGE: &str = "Please enter an answer before checking.";

/// What a worker needs to evaluate one answer.
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluationRequest {
    pub index: usize,
    pub question: String,
    pub user_answer: String,
    pub model_answer: String,
    pub marks: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuestionState {
    pub answer: String,
    pub evaluation: Option<Evaluation>,
    pub evaluating: bool,
    pub error: Option<String>,
}

/// An in-progress mock test: generated questions plus the user's answers and
/// their evaluations, index-aligned.
#[derive(Clone, Debug)]
pub struct MockTestSession {
    pub options: MockTestOptions,
    pub questions: Vec<Question>,
    pub states: Vec<QuestionState>,
}

impl MockTestSession {
    pub fn new(options: MockTestOptions, questions: Vec<Question>) -> Self {
        let states = vec![QuestionState::default(); questions.len()];
        Self {
            options,
            questions,
            states,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn set_answer(&mut self, index: usize, answer: &str) {
        if let Some(state) = self.states.get_mut(index) {
            state.answer = answer.to_string();
        }
    }

    /// Mark question `index` as being evaluated. Blank answers are refused
    /// with a per-question error instead.
    pub fn begin_evaluation(&mut self, index: usize) -> Option<EvaluationRequest> {
        let question = self.questions.get(index)?;
        let state = &mut self.states[index];
        if state.evaluating {
            return None;
        }
        if state.answer.trim().is_empty() {
            state.error = Some(EMPTY_ANSWER_MESSAGE.to_string());
            return None;
        }
        state.evaluating = true;
        state.error = None;
        Some(EvaluationRequest {
            index,
            question: question.question.clone(),
            user_answer: state.answer.clone(),
            model_answer: question.answer.clone(),
            marks: question.marks,
        })
    }

    pub fn complete_evaluation(&mut self, index: usize, result: Result<Evaluation, String>) {
        let Some(state) = self.states.get_mut(index) else {
            return;
        };
        state.evaluating = false;
        match result {
            Ok(evaluation) => state.evaluation = Some(evaluation),
            Err(message) => state.error = Some(message),
        }
    }

    pub fn all_evaluated(&self) -> bool {
        self.states.iter().all(|s| s.evaluation.is_some())
    }

    pub fn evaluated_count(&self) -> usize {
        self.states.iter().filter(|s| s.evaluation.is_some()).count()
    }

    /// Sum of awarded scores; unevaluated questions count as zero.
    pub fn total_score(&self) -> f64 {
        self.states
            .iter()
            .filter_map(|s| s.evaluation.as_ref())
            .map(|e| e.score)
            .sum()
    }

    pub fn max_score(&self) -> f64 {
        self.questions.iter().map(|q| q.marks).sum()
    }

    /// Freeze the session into a record. Scores are summed here, once.
    pub fn to_record<R: Rng>(&self, now: DateTime<Utc>, rng: &mut R) -> TestRecord {
        let questions = self
            .questions
            .iter()
            .zip(&self.states)
            .map(|(q, s)| AnsweredQuestion {
                question: q.clone(),
                user_answer: s.answer.clone(),
                evaluation: s.evaluation.clone(),
            })
            .collect();

        TestRecord {
            id: new_record_id(now, rng),
            created_at: now,
            options: self.options.clone(),
            questions,
            total_score: self.total_score(),
            max_score: self.max_score(),
        }
    }
}

/// Millisecond timestamp plus a random suffix; uniqueness is not checked by the store.
pub fn new_record_id<R: Rng>(now: DateTime<Utc>, rng: &mut R) -> String {
    format!("{}-{:08x}", now.timestamp_millis(), rng.r#gen::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::Difficulty;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn question(marks: f64) -> Question {
        Question {
            question: format!("Worth {marks}"),
            answer: "model".to_string(),
            chapter: "Sound".to_string(),
            marks,
        }
    }

    fn session(marks: &[f64]) -> MockTestSession {
        let options = MockTestOptions {
            num_questions: marks.len() as u32,
            chapters: vec!["Sound".to_string()],
            difficulty: Difficulty::Medium,
        };
        MockTestSession::new(options, marks.iter().map(|&m| question(m)).collect())
    }

    fn evaluate(s: &mut MockTestSession, index: usize, score: f64) {
        s.set_answer(index, "an answer");
        assert!(s.begin_evaluation(index).is_some());
        s.complete_evaluation(
            index,
            Ok(Evaluation {
                score,
                feedback: "ok".to_string(),
            }),
        );
    }

    #[test]
    fn blank_answer_is_refused_with_message() {
        let mut s = session(&[1.0]);
        s.set_answer(0, "   ");
        assert!(s.begin_evaluation(0).is_none());
        assert_eq!(s.states[0].error.as_deref(), Some(EMPTY_ANSWER_MESSAGE));
        assert!(!s.states[0].evaluating);
    }

    #[test]
    fn evaluation_request_carries_question_fields() {
        let mut s = session(&[3.0]);
        s.set_answer(0, "sound is a wave");
        let req = s.begin_evaluation(0).unwrap();
        assert_eq!(req.marks, 3.0);
        assert_eq!(req.user_answer, "sound is a wave");
        assert_eq!(req.model_answer, "model");
        assert!(s.states[0].evaluating);
        // A second request while one is in flight is ignored.
        assert!(s.begin_evaluation(0).is_none());
    }

    #[test]
    fn failed_evaluation_keeps_answer_and_sets_error() {
        let mut s = session(&[2.0]);
        s.set_answer(0, "guess");
        s.begin_evaluation(0).unwrap();
        s.complete_evaluation(0, Err("try again".to_string()));
        assert_eq!(s.states[0].answer, "guess");
        assert_eq!(s.states[0].error.as_deref(), Some("try again"));
        assert!(s.states[0].evaluation.is_none());
        assert!(!s.all_evaluated());
    }

    #[test]
    fn record_sums_scores_at_save_time() {
        let mut s = session(&[1.0, 4.0, 5.0]);
        evaluate(&mut s, 0, 1.0);
        evaluate(&mut s, 1, 2.5);
        evaluate(&mut s, 2, 3.5);
        assert!(s.all_evaluated());

        let mut rng = SmallRng::seed_from_u64(7);
        let record = s.to_record(Utc::now(), &mut rng);
        assert_eq!(record.max_score, 10.0);
        assert_eq!(record.total_score, 7.0);
        assert_eq!(record.questions.len(), 3);
        assert_eq!(record.questions[1].user_answer, "an answer");
    }

    #[test]
    fn unevaluated_questions_count_as_zero() {
        let mut s = session(&[2.0, 2.0]);
        evaluate(&mut s, 0, 2.0);
        assert_eq!(s.total_score(), 2.0);
        assert_eq!(s.evaluated_count(), 1);
    }

    #[test]
    fn record_ids_embed_timestamp_and_differ() {
        let now = Utc::now();
        let mut rng = SmallRng::seed_from_u64(1);
        let a = new_record_id(now, &mut rng);
        let b = new_record_id(now, &mut rng);
        assert!(a.starts_with(&now.timestamp_millis().to_string()));
        assert_ne!(a, b);
    }
}
