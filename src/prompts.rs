//! Built-in stage instructions.
//!
//! Every prompt lives here so the wording can change without touching the
//! stage runner. Callers override any of them through
//! [`crate::config::ArticleConfig`]; these constants apply only when no
//! override is set.

/// Name of the document extraction stage.
pub const EXTRACTION_STAGE: &str = "PDF Assistant";

/// Name of the search synthesis stage.
pub const SYNTHESIS_STAGE: &str = "Research Assistant";

/// Name of the writing stage.
pub const WRITING_STAGE: &str = "Writer Assistant";

/// Instructions for reading and organising a chunk of document text.
pub const EXTRACTION_INSTRUCTIONS: &str = r#"Your role is to read, extract, and analyze information from the provided PDF content.
Organize the content by main themes and key points, and include details for each main theme."#;

/// Appended to the extraction instructions when `read_document` is offered.
pub const EXTRACTION_TOOL_HINT: &str =
    "If you need text from pages that were not provided, call the read_document tool.";

/// Instructions for turning raw search results into a research brief.
pub const SYNTHESIS_INSTRUCTIONS: &str = r#"Your role is to analyze and synthesize the raw search results you are given.
Remove duplicate information and group related stories.
Keep dates, sources and URLs next to the facts they support.
Organize the findings by main themes and key points."#;

/// Appended to the synthesis instructions when `search_web` is offered.
pub const SYNTHESIS_TOOL_HINT: &str =
    "If the results are too thin to cover the topic, call the search_web tool for more.";

/// Join base instructions with a tool hint.
pub fn with_tool_hint(instructions: &str, hint: &str) -> String {
    format!("{}\n{}", instructions.trim_end(), hint)
}

/// Instructions for producing the publishable article.
pub const WRITING_INSTRUCTIONS: &str = r#"Transform the provided content into a clear, organized, and production-ready article.
Structure the content with a headline, subheadings and short paragraphs, and ensure readability.
Output ONLY the article in Markdown.
Do NOT wrap the output in ```markdown fences and do NOT add commentary about the task."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_distinct() {
        assert_ne!(EXTRACTION_STAGE, SYNTHESIS_STAGE);
        assert_ne!(SYNTHESIS_STAGE, WRITING_STAGE);
    }

    #[test]
    fn tool_hints_name_their_tools() {
        assert!(EXTRACTION_TOOL_HINT.contains("read_document"));
        assert!(SYNTHESIS_TOOL_HINT.contains("search_web"));
        assert!(!EXTRACTION_INSTRUCTIONS.contains("read_document"));
    }

    #[test]
    fn with_tool_hint_appends_on_new_line() {
        let joined = with_tool_hint("Do the thing.\n", "Call x.");
        assert_eq!(joined, "Do the thing.\nCall x.");
    }
}
