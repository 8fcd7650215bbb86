use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gateway::{Evaluation, Question};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium => Difficulty::Hard,
            Difficulty::Hard => Difficulty::Easy,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Hard,
            Difficulty::Medium => Difficulty::Easy,
            Difficulty::Hard => Difficulty::Medium,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings a mock test was generated with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockTestOptions {
    pub num_questions: u32,
    pub chapters: Vec<String>,
    pub difficulty: Difficulty,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnsweredQuestion {
    #[serde(flatten)]
    pub question: Question,
    #[serde(default)]
    pub user_answer: String,
    #[serde(default)]
    pub evaluation: Option<Evaluation>,
}

/// A completed mock test. Written once; scores are fixed at save time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
    pub id: String,
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
    pub options: MockTestOptions,
    pub questions: Vec<AnsweredQuestion>,
    pub total_score: f64,
    pub max_score: f64,
}

/// On-disk layout of the history table: records keyed by id.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTable {
    pub schema_version: u32,
    #[serde(default)]
    pub records: BTreeMap<String, TestRecord>,
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            records: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_uses_camel_case_layout() {
        let record = TestRecord {
            id: "1700000000000-0000beef".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
            options: MockTestOptions {
                num_questions: 1,
                chapters: vec!["Sound".to_string()],
                difficulty: Difficulty::Easy,
            },
            questions: vec![AnsweredQuestion {
                question: Question {
                    question: "What is an echo?".to_string(),
                    answer: "A reflected sound.".to_string(),
                    chapter: "Sound".to_string(),
                    marks: 1.0,
                },
                user_answer: "Reflected sound".to_string(),
                evaluation: None,
            }],
            total_score: 0.0,
            max_score: 1.0,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("date").is_some());
        assert_eq!(value["totalScore"], 0.0);
        assert_eq!(value["options"]["numQuestions"], 1);
        assert_eq!(value["questions"][0]["question"], "What is an echo?");
        assert_eq!(value["questions"][0]["userAnswer"], "Reflected sound");
        assert!(value["questions"][0]["evaluation"].is_null());
    }

    #[test]
    fn difficulty_cycles_both_ways() {
        for d in Difficulty::ALL {
            assert_eq!(d.next().prev(), d);
        }
        assert_eq!(Difficulty::Hard.next(), Difficulty::Easy);
    }
}
