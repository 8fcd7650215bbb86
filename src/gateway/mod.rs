pub mod gemini;
pub mod prompts;
pub mod response;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RemoteServiceError;
use crate::store::schema::MockTestOptions;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weightage {
    pub chapter: String,
    pub percentage: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pyq {
    pub question: String,
    pub chapter: String,
    pub marks: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PyqAnalysis {
    pub weightage: Vec<Weightage>,
    pub pyqs: Vec<Pyq>,
}

/// A generated mock-test question; `answer` is the model answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub answer: String,
    pub chapter: String,
    pub marks: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub feedback: String,
}

/// Request/response adapters to the generative-content backend.
///
/// Implementations hold no per-call state. Every failure is collapsed into a
/// single [`RemoteServiceError`] after being logged.
pub trait ContentService: Send + Sync {
    fn generate_notes(&self, text: &str) -> Result<String, RemoteServiceError>;

    fn generate_flashcards(&self, text: &str) -> Result<Vec<Flashcard>, RemoteServiceError>;

    fn analyze_document(
        &self,
        content: &[u8],
        mime_type: &str,
    ) -> Result<PyqAnalysis, RemoteServiceError>;

    fn generate_test(&self, options: &MockTestOptions)
    -> Result<Vec<Question>, RemoteServiceError>;

    /// The returned score is passed through as the service produced it, even
    /// when it falls outside `0..=max_marks`.
    fn evaluate_answer(
        &self,
        question: &str,
        user_answer: &str,
        model_answer: &str,
        max_marks: f64,
    ) -> Result<Evaluation, RemoteServiceError>;
}

/// Media type sent alongside an uploaded question paper.
pub fn document_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/pdf",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_from_extension() {
        assert_eq!(document_mime_type(Path::new("paper.pdf")), "application/pdf");
        assert_eq!(document_mime_type(Path::new("scan.JPG")), "image/jpeg");
        assert_eq!(document_mime_type(Path::new("scan.png")), "image/png");
        assert_eq!(document_mime_type(Path::new("no_extension")), "application/pdf");
        assert_eq!(document_mime_type(Path::new("notes.txt")), "application/pdf");
    }
}
