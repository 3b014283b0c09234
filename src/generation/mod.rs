//! Content generation bridge.
//!
//! Turns free text about an exam into the structured section layout the
//! admin frontend renders, using an external completion service.

mod gemini;

pub use gemini::*;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::errors::AppError;

/// Top-level sections every generated document must contain.
pub const REQUIRED_SECTIONS: [&str; 8] = [
    "About",
    "Exam Dates",
    "Eligibility Criteria",
    "Exam Pattern & Syllabus",
    "Yearly Cutoff",
    "Application Fee",
    "Resources",
    "Applylink",
];

/// Completion service errors.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("network error: {0}")]
    Network(String),

    #[error("completion API error {0}: {1}")]
    Api(u16, String),

    #[error("unexpected completion response: {0}")]
    Response(String),
}

/// Prompt in, text out. One request, no conversation state.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Worked example showing the nested section/sub-section/block shape.
pub fn schema_example() -> Value {
    json!({
        "About": {
            "Exam Highlights": [
                {"type": "paragraph", "content": "A paragraph about the exam."},
                {"type": "table", "data": [{"Column 1": "Value", "Column 2": "Another Value"}]}
            ]
        },
        "Exam Dates": {
            "Important Dates": [
                {"type": "paragraph", "content": "A paragraph about dates."},
                {"type": "table", "data": [{"Phase": "Phase 1", "Date": "Some Date"}]}
            ]
        },
        "Eligibility Criteria": {
            "Eligibility Details": [
                {"type": "paragraph", "content": "A paragraph about eligibility."}
            ]
        },
        "Exam Pattern & Syllabus": {
            "Pattern": [
                {"type": "list", "items": ["List item 1", "List item 2"]},
                {"type": "table", "data": [{"Subject": "Subject Name", "Questions": "Number"}]}
            ]
        },
        "Yearly Cutoff": {
            "Past Cutoffs": [
                {"type": "list", "items": ["Some cutoff info.", "More info."]},
                {"type": "table", "data": [{"Course": "Course Name", "Expected Closing Rank": "Rank"}]}
            ]
        },
        "Application Fee": {
            "Fee Details": [
                {"type": "paragraph", "content": "A paragraph about the application fee."}
            ]
        },
        "Resources": {
            "Preparation Resources": [
                {"type": "list", "items": ["Resource 1", "Resource 2"]}
            ]
        },
        "Applylink": "https://example.com"
    })
}

/// Build the structuring prompt for one exam.
pub fn build_prompt(topic_name: &str, raw_text: &str) -> String {
    let example =
        serde_json::to_string_pretty(&schema_example()).unwrap_or_else(|_| "{}".to_string());

    format!(
        r#"You structure information about entrance examinations.
Convert the raw content about "{topic}" into valid JSON.

The JSON object must have exactly these top-level keys:
{sections}.

Each section maps sub-section titles to an ordered list of blocks. A block is one of
  {{"type": "paragraph", "content": "..."}}
  {{"type": "table", "data": [{{"Column": "Value"}}]}}
  {{"type": "list", "items": ["..."]}}
"Applylink" is a single URL string. Where the raw content has no data for a section,
write accurate general guidance instead of leaving it empty.

Follow this example for the shape:
{example}

Raw content:
---
{raw}
---

Respond with the JSON object only."#,
        topic = topic_name,
        sections = REQUIRED_SECTIONS.join(", "),
        example = example,
        raw = raw_text,
    )
}

/// Find the first balanced top-level `{...}` span, skipping braces inside strings.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse completion output into a JSON object, tolerating prose or fencing around it.
pub fn repair_output(raw: &str) -> Result<Map<String, Value>, AppError> {
    let trimmed = raw.trim();

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(map);
    }

    let span = first_object_span(trimmed).ok_or_else(|| {
        AppError::GenerationOutputInvalid("No JSON object found in completion output".to_string())
    })?;

    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => {
            tracing::debug!("Recovered JSON object embedded in completion output");
            Ok(map)
        }
        Ok(_) => Err(AppError::GenerationOutputInvalid(
            "Embedded JSON is not an object".to_string(),
        )),
        Err(e) => Err(AppError::GenerationOutputInvalid(format!(
            "Embedded JSON is invalid: {}",
            e
        ))),
    }
}

/// Drafts exam detail content through a completion service.
#[derive(Clone)]
pub struct ContentGenerator {
    completion: Arc<dyn Completion>,
}

impl ContentGenerator {
    pub fn new(completion: Arc<dyn Completion>) -> Self {
        Self { completion }
    }

    pub async fn generate(
        &self,
        topic_name: Option<&str>,
        raw_text: Option<&str>,
    ) -> Result<Map<String, Value>, AppError> {
        let topic_name = topic_name.map(str::trim).unwrap_or_default();
        let raw_text = raw_text.map(str::trim).unwrap_or_default();
        if topic_name.is_empty() || raw_text.is_empty() {
            return Err(AppError::Validation(
                "topic_name and raw_text are required".to_string(),
            ));
        }

        let prompt = build_prompt(topic_name, raw_text);
        tracing::info!(topic = topic_name, "Requesting generated exam content");

        let output = self.completion.complete(&prompt).await?;
        let document = repair_output(&output)?;

        let missing: Vec<_> = REQUIRED_SECTIONS
            .iter()
            .filter(|section| !document.contains_key(**section))
            .collect();
        if !missing.is_empty() {
            tracing::warn!(topic = topic_name, ?missing, "Generated content lacks sections");
        }

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns a fixed response and remembers the last prompt.
    struct CannedCompletion {
        response: Result<String, String>,
        last_prompt: Mutex<Option<String>>,
    }

    impl CannedCompletion {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.to_string()),
                last_prompt: Mutex::new(None),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Err(message.to_string()),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Completion for CannedCompletion {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.response.clone().map_err(CompletionError::Network)
        }
    }

    #[test]
    fn test_prompt_embeds_sections_example_and_text() {
        let prompt = build_prompt("JEE Main", "Held twice a year.");

        for section in REQUIRED_SECTIONS {
            assert!(prompt.contains(section), "missing {}", section);
        }
        assert!(prompt.contains("\"JEE Main\""));
        assert!(prompt.contains("Held twice a year."));
        assert!(prompt.contains("\"Exam Highlights\""));
        assert!(prompt.contains("\"items\""));
    }

    #[test]
    fn test_repair_accepts_clean_json() {
        let map = repair_output(r#"  {"About": {"x": []}}  "#).unwrap();
        assert!(map.contains_key("About"));
    }

    #[test]
    fn test_repair_extracts_embedded_object() {
        let raw = r#"Here is the JSON: {"About": {"Exam Highlights": [{"type": "paragraph", "content": "a } in text"}]}} done"#;
        let map = repair_output(raw).unwrap();
        assert_eq!(
            map["About"]["Exam Highlights"][0]["content"],
            "a } in text"
        );
    }

    #[test]
    fn test_repair_handles_markdown_fence() {
        let raw = "```json\n{\"Applylink\": \"https://example.com\"}\n```";
        let map = repair_output(raw).unwrap();
        assert_eq!(map["Applylink"], "https://example.com");
    }

    #[test]
    fn test_repair_rejects_text_without_object() {
        match repair_output("Sorry, I cannot help with that.") {
            Err(AppError::GenerationOutputInvalid(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_repair_rejects_unbalanced_object() {
        assert!(matches!(
            repair_output("prefix {\"About\": {"),
            Err(AppError::GenerationOutputInvalid(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_requires_inputs() {
        let completion = CannedCompletion::ok("{}");
        let generator = ContentGenerator::new(completion.clone());

        let err = generator.generate(Some("JEE"), Some("  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = generator.generate(None, Some("text")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(completion.last_prompt.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_generate_returns_repaired_document() {
        let completion = CannedCompletion::ok(r#"Sure! {"About": {"Overview": []}} Hope this helps."#);
        let generator = ContentGenerator::new(completion.clone());

        let document = generator
            .generate(Some("GATE"), Some("Graduate aptitude test."))
            .await
            .unwrap();

        assert!(document.contains_key("About"));
        let prompt = completion.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Graduate aptitude test."));
    }

    #[tokio::test]
    async fn test_generate_propagates_service_failure() {
        let generator = ContentGenerator::new(CannedCompletion::failing("connection reset"));

        match generator.generate(Some("GATE"), Some("text")).await {
            Err(AppError::Generation(msg)) => assert!(msg.contains("connection reset")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
