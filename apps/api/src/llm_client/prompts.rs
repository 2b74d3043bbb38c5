// Shared prompt fragments used across generation steps.
// Step-specific templates live in the prompts.rs next to the step that uses them.

/// Follow-up user turn sent after a truncated assistant turn.
pub const CONTINUE_INSTRUCTION: &str = "\
Continue the text exactly from the point where it was cut off. \
Do not repeat anything that has already been written. \
Continue naturally, logically and coherently, keeping the same style and structure.";

/// Prefix for long-form steps; `{target_words}` is the minimum length.
pub const LENGTH_DIRECTIVE_TEMPLATE: &str = "\
Target length: at least {target_words} words.\n\
You must bring the text to full logical completion.\n\
If you run out of tokens, the text will be continued automatically, so do not summarise early.\n\n";

pub fn length_directive(target_words: u32) -> String {
    LENGTH_DIRECTIVE_TEMPLATE.replace("{target_words}", &target_words.to_string())
}
