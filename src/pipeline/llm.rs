//! Stage runner: send one payload through one stage.
//!
//! The runner is deliberately thin. The stage's instructions, model and tools
//! go to the completion service together with the payload as the single user
//! message; the final text comes back. Service errors are returned as they
//! are, and the orchestrator adds the stage name and chunk index.
//! There is no retry.

use crate::error::ServiceError;
use crate::service::{CompletionRequest, CompletionService};
use crate::stage::StageSpec;
use std::time::Instant;
use tracing::debug;

/// Run `spec` on `input` and return the stage output.
pub async fn run_stage(
    service: &dyn CompletionService,
    spec: &StageSpec,
    input: &str,
) -> Result<String, ServiceError> {
    let start = Instant::now();
    debug!(
        "{}: {} bytes in, model {}, tools {:?}",
        spec.name,
        input.len(),
        spec.model,
        spec.tools.names()
    );

    let output = service
        .complete(CompletionRequest {
            stage: &spec.name,
            model: &spec.model,
            instructions: &spec.instructions,
            message: input,
            tools: &spec.tools,
        })
        .await?;

    debug!(
        "{}: {} bytes out in {:?}",
        spec.name,
        output.len(),
        start.elapsed()
    );
    Ok(output)
}
