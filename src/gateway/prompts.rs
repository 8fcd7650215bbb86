//! Request bodies for the `generateContent` endpoint.
//!
//! Each builder returns the full JSON body for one call. Structured calls pin
//! the response to JSON and attach a response schema so the service answers in
//! the shape the parsers in [`super::response`] expect.

use serde_json::{Value, json};

use crate::store::schema::MockTestOptions;

pub const NOTES_TEMPERATURE: f64 = 0.2;

fn string_field() -> Value {
    json!({ "type": "STRING" })
}

fn number_field() -> Value {
    json!({ "type": "NUMBER" })
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

fn array_of(items: Value) -> Value {
    json!({ "type": "ARRAY", "items": items })
}

fn text_part(text: &str) -> Value {
    json!({ "text": text })
}

fn user_content(parts: Vec<Value>) -> Value {
    json!([{ "role": "user", "parts": parts }])
}

fn json_body(parts: Vec<Value>, schema: Value) -> Value {
    json!({
        "contents": user_content(parts),
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema,
        }
    })
}

pub fn flashcard_schema() -> Value {
    array_of(object_schema(
        json!({ "question": string_field(), "answer": string_field() }),
        &["question", "answer"],
    ))
}

pub fn analysis_schema() -> Value {
    let pyq = object_schema(
        json!({
            "question": string_field(),
            "chapter": string_field(),
            "marks": number_field(),
        }),
        &["question", "chapter", "marks"],
    );
    let weightage = object_schema(
        json!({ "chapter": string_field(), "percentage": number_field() }),
        &["chapter", "percentage"],
    );
    object_schema(
        json!({ "weightage": array_of(weightage), "pyqs": array_of(pyq) }),
        &["weightage", "pyqs"],
    )
}

pub fn question_schema() -> Value {
    array_of(object_schema(
        json!({
            "question": string_field(),
            "answer": {
                "type": "STRING",
                "description": "A detailed, correct answer for the question.",
            },
            "chapter": string_field(),
            "marks": number_field(),
        }),
        &["question", "answer", "chapter", "marks"],
    ))
}

pub fn evaluation_schema(max_marks: f64) -> Value {
    object_schema(
        json!({
            "score": {
                "type": "NUMBER",
                "description": format!("The score awarded to the user, from 0 to {max_marks}."),
            },
            "feedback": {
                "type": "STRING",
                "description": "Constructive feedback for the user on their answer.",
            },
        }),
        &["score", "feedback"],
    )
}

pub fn notes_request(chapter_text: &str, temperature: f64) -> Value {
    let prompt = format!(
        "Please generate concise revision notes in markdown format for the following chapter \
         text. Focus on key definitions, concepts, and important points. Use headings and \
         bullet points for clarity. \n\n---{chapter_text}---"
    );
    json!({
        "contents": user_content(vec![text_part(&prompt)]),
        "generationConfig": { "temperature": temperature },
    })
}

pub fn flashcards_request(chapter_text: &str) -> Value {
    let prompt = format!(
        "Generate 10-15 flashcards from the following text. Each flashcard should have a clear \
         question and a concise answer. \n\n---{chapter_text}---"
    );
    json_body(vec![text_part(&prompt)], flashcard_schema())
}

/// `data_base64` is the document encoded with the standard base64 alphabet.
pub fn analysis_request(data_base64: &str, mime_type: &str) -> Value {
    let document = json!({
        "inlineData": { "mimeType": mime_type, "data": data_base64 }
    });
    let instruction = text_part(
        "Analyze this question paper. Identify each question, its chapter, and the marks \
         allocated. Also, calculate the chapter-wise weightage as a percentage of total marks. \
         The sum of all percentages in weightage should be 100.",
    );
    json_body(vec![document, instruction], analysis_schema())
}

pub fn test_request(options: &MockTestOptions) -> Value {
    let prompt = format!(
        "Generate a mock test with the following specifications:\n\
         - Number of questions: {count}\n\
         - Chapters: {chapters}\n\
         - Difficulty: {difficulty}\n\n\
         Each question should require a typed answer, not multiple choice. Include a mix of \
         one-mark short answer questions and longer descriptive answer questions (3-5 marks). \
         For each question, provide the question text, a detailed correct answer, the chapter \
         it belongs to, and the marks.",
        count = options.num_questions,
        chapters = options.chapters.join(", "),
        difficulty = options.difficulty,
    );
    json_body(vec![text_part(&prompt)], question_schema())
}

pub fn evaluation_request(
    question: &str,
    user_answer: &str,
    model_answer: &str,
    max_marks: f64,
) -> Value {
    let prompt = format!(
        "You are an expert teacher evaluating a student's answer.\n\
         The question is: \"{question}\" (Worth {max_marks} marks).\n\
         The student's answer is: \"{user_answer}\".\n\
         The ideal correct answer is: \"{model_answer}\".\n\n\
         Please evaluate the student's answer. Provide a score (out of {max_marks}) and \
         concise, constructive feedback. Be fair and encouraging. If the user answer is \
         completely wrong, give a score of 0. If it is partially correct, give partial marks."
    );
    json_body(vec![text_part(&prompt)], evaluation_schema(max_marks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::schema::Difficulty;

    #[test]
    fn notes_request_is_plain_text_with_low_temperature() {
        let body = notes_request("Photosynthesis", NOTES_TEMPERATURE);
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.ends_with("---Photosynthesis---"));
        assert_eq!(body["generationConfig"]["temperature"], json!(0.2));
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn analysis_request_puts_document_before_instruction() {
        let body = analysis_request("QUJD", "application/pdf");
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["data"], "QUJD");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert!(parts[1]["text"].as_str().unwrap().contains("weightage"));
        assert_eq!(
            body["generationConfig"]["responseSchema"]["required"],
            json!(["weightage", "pyqs"])
        );
    }

    #[test]
    fn test_request_lists_options() {
        let options = MockTestOptions {
            num_questions: 7,
            chapters: vec!["Sound".to_string(), "Cell Structure".to_string()],
            difficulty: Difficulty::Hard,
        };
        let body = test_request(&options);
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("Number of questions: 7"));
        assert!(text.contains("Chapters: Sound, Cell Structure"));
        assert!(text.contains("Difficulty: Hard"));
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }

    #[test]
    fn evaluation_schema_mentions_mark_ceiling() {
        let body = evaluation_request("Q", "A", "M", 5.0);
        let desc = body["generationConfig"]["responseSchema"]["properties"]["score"]
            ["description"]
            .as_str()
            .unwrap();
        assert!(desc.contains("from 0 to 5"));
    }
}
