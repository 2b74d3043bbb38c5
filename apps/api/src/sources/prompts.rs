// Prompt templates for source summarisation.

pub const SOURCE_ANALYST_SYSTEM: &str = "\
You are an expert in analysing academic texts. Write short, precise summaries.";

pub const CHUNK_SUMMARY_TEMPLATE: &str = "\
Summarise the following fragment of an academic source for a lecturer preparing a lecture.\n\
Keep the main claims, key terms, methods and any figures worth citing.\n\
\n\
Fragment:\n\
{chunk_text}";

pub const COMBINED_SUMMARY_TEMPLATE: &str = "\
Merge the fragment summaries below into one structured summary of the whole document.\n\
\n\
Fragment summaries:\n\
{chunk_summaries}\n\
\n\
Produce:\n\
1. A short overview (5-10 sentences)\n\
2. Key ideas (bullet list)\n\
3. Important terms\n\
4. Methodological foundations\n\
5. Relevance for the lecture";

pub const KEY_IDEAS_TEMPLATE: &str = "\
Extract only the key ideas from the following summary as a bullet list:\n\
\n\
{summary}\n\
\n\
Return only the list, one idea per line, each line starting with \"- \".";

pub fn build_chunk_prompt(chunk_text: &str) -> String {
    CHUNK_SUMMARY_TEMPLATE.replace("{chunk_text}", chunk_text)
}

pub fn build_combined_prompt(chunk_summaries: &str) -> String {
    COMBINED_SUMMARY_TEMPLATE.replace("{chunk_summaries}", chunk_summaries)
}

pub fn build_key_ideas_prompt(summary: &str) -> String {
    KEY_IDEAS_TEMPLATE.replace("{summary}", summary)
}
