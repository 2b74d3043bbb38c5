//! Prompt templates for the length-guarantee expansion pass.

// ────────────────────────────────────────────────────────────────────────────
// Expansion prompt (text complete but shorter than the target)
// ────────────────────────────────────────────────────────────────────────────

pub const EXPANSION_PROMPT_TEMPLATE: &str = "\
Current length: {word_count} words. The text must reach at least {target_words} words.\n\
Add at least {shortfall} more words: finish the last section, then deepen the \
conclusion, the examples and the theoretical detail.\n\
\n\
IMPORTANT: do NOT shorten, summarise or rewrite the existing text. Only extend it.\n\
Reply with the new material only, written so that it follows directly after the \
current text.\n\
\n\
Current text:\n\
{current_text}";

pub fn build_expansion_prompt(
    current_text: &str,
    word_count: u32,
    target_words: u32,
    shortfall: u32,
) -> String {
    EXPANSION_PROMPT_TEMPLATE
        .replace("{word_count}", &word_count.to_string())
        .replace("{target_words}", &target_words.to_string())
        .replace("{shortfall}", &shortfall.to_string())
        .replace("{current_text}", current_text)
}
