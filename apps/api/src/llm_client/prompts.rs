// Cross-cutting prompt fragments.
// Stage prompts live next to the stages in evaluation::prompts.

/// Appended to every structured-completion prompt.
pub const JSON_ONLY_SUFFIX: &str = "IMPORTANT: Respond with ONLY valid JSON. \
    Do not include any additional text, explanations, or formatting outside the JSON object.";

/// Sampling temperature used by every pipeline stage.
pub const STAGE_TEMPERATURE: f32 = 0.3;
