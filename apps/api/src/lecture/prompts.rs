// Lecture step prompts. Placeholders are `{name}` and are filled by `render`.

pub const LECTURER_SYSTEM: &str = "\
You are a university professor preparing a lecture for students of the humanities.\n\
Write in an academic yet accessible register. Be conceptually precise, cite the \
scholarship you are given, and never invent bibliographic details.";

pub const LITERATURE_ANALYST_SYSTEM: &str = "\
You are an expert in analysing scholarly literature.";

pub const SOURCES_INJECTION: &str = "\n\n\
Take into account the analysis of the uploaded source files:\n\
{sources_summary}";

pub const BIBLIOGRAPHY_SUMMARY_TEMPLATE: &str = "\
Analyse the following bibliographic corpus and write a short overview of its main \
directions, methodologies and key ideas.\n\
\n\
Core works:\n\
{core_works}\n\
\n\
Recent works:\n\
{recent_works}\n\
\n\
Write a structured summary (3-5 paragraphs) covering:\n\
1. The main theoretical directions\n\
2. Key methodologies\n\
3. Important concepts and ideas\n\
4. Current research trends";

pub const OUTLINE_TEMPLATE: &str = "\
Draft a detailed outline for the lecture \"{lecture_title}\".\n\
\n\
Course context:\n\
{course_context}\n\
\n\
Previous lectures:\n\
{previous_lectures_summary}\n\
\n\
Summary of the uploaded sources:\n\
{uploaded_sources_summary}\n\
\n\
Key ideas from the sources:\n\
{uploaded_sources_keypoints}\n\
\n\
Bibliography overview:\n\
{bibliography_summary}\n\
\n\
Give an introduction, 4-6 numbered sections with sub-points and a conclusion. \
For each section name the sources it should draw on.";

pub const DRAFT_TEMPLATE: &str = "\
Write the full text of the lecture following this outline.\n\
\n\
Outline:\n\
{outline_text}\n\
\n\
Length: at least {target_length} words.\n\
\n\
Key ideas from the uploaded sources:\n\
{uploaded_sources_keypoints}\n\
\n\
Core bibliography:\n\
{core_bibliography}\n\
\n\
Recent bibliography:\n\
{recent_bibliography}\n\
\n\
Develop every section in continuous prose with examples and references to the \
bibliography. End with a conclusion that ties the sections together.";

pub const REVISION_TEMPLATE: &str = "\
Revise the lecture below. Keep its structure and all of its content, improve the \
argument and the transitions, and bring the style closer to the reference.\n\
\n\
Length: at least {target_length} words.\n\
\n\
Style reference:\n\
{style_reference_text}\n\
\n\
Previous lectures (avoid repeating them):\n\
{previous_lectures_summary}\n\
\n\
Uploaded sources:\n\
{uploaded_sources_summary}\n\
\n\
Lecture text:\n\
{raw_lecture_text}";

pub const DEFAULT_STYLE_REFERENCE: &str = "\
A lively academic voice: clear theses, concrete literary examples, rhetorical \
questions addressed to the audience, and careful definitions of every new term.";

pub const GLOSSARY_TEMPLATE: &str = "\
Compile a glossary of the key terms used in the lecture below. For every term give \
a one or two sentence definition as it is used in the lecture. Order the terms \
alphabetically and format them as a Markdown list.\n\
\n\
Lecture text:\n\
{lecture_text}";

pub const PRESENTATION_TEMPLATE: &str = "\
Create a presentation of 12-16 slides for the lecture below.\n\
Every slide needs a title, 3-5 concise bullet points and a suggestion for a visual.\n\
Start with a title slide and end with a summary slide and a slide of key terms.\n\
\n\
Key ideas to highlight:\n\
{uploaded_sources_keypoints}\n\
\n\
Glossary:\n\
{glossary_text}\n\
\n\
Lecture text:\n\
{final_lecture_text}";

pub const BRIEF_TEMPLATE: &str = "\
Act as a professor of literature. Write a BRIEF version of the lecture, 800-1200 words.\n\
\n\
Structure:\n\
1. Main theses (5-8)\n\
2. Key terms with short definitions\n\
3. Main authors with a short biographical note (3-5 lines)\n\
4. Methodological emphases\n\
5. How to explain the topic to students\n\
\n\
Use the uploaded sources first:\n\
{sources_summary}\n\
\n\
Lecture topic: {lecture_title}\n\
Subtitle: {lecture_subtitle}\n\
Keywords: {keywords}";

pub const NO_SOURCES: &str = "No uploaded sources were provided.";
pub const NOT_AVAILABLE: &str = "Not available.";

/// Replaces every `{key}` in `template` with its value. Values are substituted in
/// order, so a value containing a later placeholder would be expanded too; callers
/// put free text last.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), value)
    })
}

/// `- item` lines.
pub fn bullet_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|i| format!("- {}", i.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn or_placeholder<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.trim().is_empty() {
        placeholder
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        let out = render("{a} and {b} and {a}", &[("a", "x"), ("b", "y")]);
        assert_eq!(out, "x and y and x");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        assert_eq!(render("{missing}", &[("a", "x")]), "{missing}");
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(bullet_list(&["one", "two"]), "- one\n- two");
        assert_eq!(bullet_list::<&str>(&[]), "");
    }

    #[test]
    fn test_or_placeholder() {
        assert_eq!(or_placeholder("  ", NO_SOURCES), NO_SOURCES);
        assert_eq!(or_placeholder("text", NO_SOURCES), "text");
    }
}
