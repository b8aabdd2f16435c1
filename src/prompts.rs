//! Built-in defaults for the vision model request.
//!
//! These are the values used when neither the configuration file nor the
//! command line names a model or a prompt. Keeping them in one module lets
//! tests compare against them directly.

/// Model requested from the vision provider when none is configured.
pub const DEFAULT_MODEL: &str = "llama3.2-vision";

/// Provider used when none is configured. Ollama serves models locally.
pub const DEFAULT_PROVIDER: &str = "ollama";

/// Instruction sent alongside every image when no prompt is configured.
pub const DEFAULT_PROMPT: &str = "You are an expert OCR system.
Extract all the text from this image and format it into clean, structured Markdown.
- Use appropriate Markdown headers (#, ##) based on the visual hierarchy of the text.
- Format lists correctly using bullet points or numbers.
- If there is tabular data, format it as a standard Markdown table.
- Output ONLY the Markdown text. Do not include any conversational filler.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_has_no_surrounding_whitespace() {
        assert_eq!(DEFAULT_PROMPT, DEFAULT_PROMPT.trim());
        assert!(DEFAULT_PROMPT.starts_with("You are an expert OCR system."));
        assert!(DEFAULT_PROMPT.ends_with("conversational filler."));
    }
}
