//! Stage specifications: the three processing roles of the pipeline.
//!
//! A stage is configuration, not a stateful object. [`StageSet::from_config`]
//! builds all three once at startup; the orchestrator only reads them.

use crate::config::ArticleConfig;
use crate::output::SourceKind;
use crate::prompts::{
    with_tool_hint, EXTRACTION_INSTRUCTIONS, EXTRACTION_STAGE, EXTRACTION_TOOL_HINT,
    SYNTHESIS_INSTRUCTIONS, SYNTHESIS_STAGE, SYNTHESIS_TOOL_HINT, WRITING_INSTRUCTIONS,
    WRITING_STAGE,
};
use crate::tools::ToolSet;

/// Which role a stage plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageRole {
    /// Reads and organises document text.
    Extraction,
    /// Turns raw search results into a research brief.
    Synthesis,
    /// Produces the publishable fragment.
    Writing,
}

/// Name, instructions, offered tools and target model of one stage.
#[derive(Debug, Clone)]
pub struct StageSpec {
    pub name: String,
    pub role: StageRole,
    pub instructions: String,
    pub model: String,
    pub tools: ToolSet,
}

impl StageSpec {
    pub fn new(
        role: StageRole,
        name: impl Into<String>,
        instructions: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            instructions: instructions.into(),
            model: model.into(),
            tools: ToolSet::new(),
        }
    }

    /// Offer `tools` to the stage.
    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }
}

/// The three stages a run needs.
#[derive(Debug, Clone)]
pub struct StageSet {
    pub extraction: StageSpec,
    pub synthesis: StageSpec,
    pub writing: StageSpec,
}

impl StageSet {
    /// Build the stages from config overrides and built-in prompts.
    ///
    /// A tool hint is appended to the built-in instructions only when that
    /// stage actually gets tools. Caller-supplied instructions are used
    /// verbatim.
    pub fn from_config(
        config: &ArticleConfig,
        extraction_tools: ToolSet,
        synthesis_tools: ToolSet,
    ) -> Self {
        let model = config.model_id();

        let instructions = |custom: &Option<String>, base: &str, hint: &str, tools: &ToolSet| {
            match custom {
                Some(text) => text.clone(),
                None if tools.is_empty() => base.to_string(),
                None => with_tool_hint(base, hint),
            }
        };

        let extraction = StageSpec::new(
            StageRole::Extraction,
            EXTRACTION_STAGE,
            instructions(
                &config.extraction_instructions,
                EXTRACTION_INSTRUCTIONS,
                EXTRACTION_TOOL_HINT,
                &extraction_tools,
            ),
            model.as_str(),
        )
        .with_tools(extraction_tools);

        let synthesis = StageSpec::new(
            StageRole::Synthesis,
            SYNTHESIS_STAGE,
            instructions(
                &config.synthesis_instructions,
                SYNTHESIS_INSTRUCTIONS,
                SYNTHESIS_TOOL_HINT,
                &synthesis_tools,
            ),
            model.as_str(),
        )
        .with_tools(synthesis_tools);

        let writing = StageSpec::new(
            StageRole::Writing,
            WRITING_STAGE,
            config
                .writing_instructions
                .clone()
                .unwrap_or_else(|| WRITING_INSTRUCTIONS.to_string()),
            model.as_str(),
        );

        Self {
            extraction,
            synthesis,
            writing,
        }
    }

    /// The analysis stage for a source: extraction for documents, synthesis
    /// for queries.
    pub fn analysis_for(&self, kind: SourceKind) -> &StageSpec {
        match kind {
            SourceKind::Document => &self.extraction,
            SourceKind::Query => &self.synthesis,
        }
    }

    /// Distinct target models, in stage order.
    pub fn models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = Vec::with_capacity(3);
        for spec in [&self.extraction, &self.synthesis, &self.writing] {
            if !models.contains(&spec.model.as_str()) {
                models.push(&spec.model);
            }
        }
        models
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echo"
        }
        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }
        async fn call(&self, args: Value) -> Result<String, ServiceError> {
            Ok(args.to_string())
        }
    }

    #[test]
    fn defaults_use_built_in_prompts() {
        let config = ArticleConfig::default();
        let stages = StageSet::from_config(&config, ToolSet::new(), ToolSet::new());
        assert_eq!(stages.extraction.name, "PDF Assistant");
        assert_eq!(stages.synthesis.name, "Research Assistant");
        assert_eq!(stages.writing.name, "Writer Assistant");
        assert_eq!(stages.extraction.instructions, EXTRACTION_INSTRUCTIONS);
        assert!(stages.writing.tools.is_empty());
        assert_eq!(stages.models(), vec![config.model_id()]);
    }

    #[test]
    fn tool_hint_only_when_tools_are_offered() {
        let config = ArticleConfig::default();
        let tools = ToolSet::new().with(Arc::new(Echo));
        let stages = StageSet::from_config(&config, tools, ToolSet::new());
        assert!(stages.extraction.instructions.contains("read_document"));
        assert!(!stages.synthesis.instructions.contains("search_web"));
        assert_eq!(stages.extraction.tools.names(), vec!["echo"]);
    }

    #[test]
    fn overrides_are_used_verbatim() {
        let config = ArticleConfig::builder()
            .model("gpt-4.1-mini")
            .writing_instructions("Write a haiku.")
            .synthesis_instructions("Summarise.")
            .build()
            .unwrap();
        let tools = ToolSet::new().with(Arc::new(Echo));
        let stages = StageSet::from_config(&config, ToolSet::new(), tools);
        assert_eq!(stages.writing.instructions, "Write a haiku.");
        assert_eq!(stages.synthesis.instructions, "Summarise.");
        assert_eq!(stages.writing.model, "gpt-4.1-mini");
    }

    #[test]
    fn analysis_stage_follows_source_kind() {
        let stages = StageSet::from_config(&ArticleConfig::default(), ToolSet::new(), ToolSet::new());
        assert_eq!(stages.analysis_for(SourceKind::Document).role, StageRole::Extraction);
        assert_eq!(stages.analysis_for(SourceKind::Query).role, StageRole::Synthesis);
    }
}
