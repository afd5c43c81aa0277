//! Parsing and fallback logic for AI-generated text
//!
//! Models routinely wrap JSON in markdown fences, prepend commentary, or
//! ignore the format entirely. Everything here is best-effort: parse what we
//! can, degrade to deterministic fallbacks when we can't.

use serde::{Deserialize, Serialize};

/// A task-flow transition: why completing `from` prepares you for `to`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
struct TransitionsEnvelope {
    #[serde(default)]
    transitions: Vec<Transition>,
}

/// Strip markdown code fences (```json ... ```) from a response
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Strip a list prefix like "1. ", "2) ", "- ", "* " from a line
fn strip_list_prefix(line: &str) -> &str {
    let trimmed = line.trim();
    let rest = trimmed
        .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '-' | '.' | ')' | '*'));
    rest.trim_start()
}

/// Parse a JSON array of task strings; fall back to line splitting
///
/// The fallback strips numbered/bulleted prefixes and caps the count; the
/// JSON path is taken as-is (the prompt already asks for 5-7).
pub fn parse_task_list(text: &str, fallback_cap: usize) -> Vec<String> {
    let clean = strip_code_fences(text);

    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(&clean) {
        return values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .filter(|s| !s.trim().is_empty())
            .collect();
    }

    clean
        .lines()
        .map(strip_list_prefix)
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .take(fallback_cap)
        .collect()
}

/// Slice out the outermost JSON object (first '{' through last '}')
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse transition explanations; fall back to generated templates
pub fn parse_transitions(text: &str, tasks: &[String]) -> Vec<Transition> {
    let parsed = extract_json_object(text)
        .and_then(|json| serde_json::from_str::<TransitionsEnvelope>(json).ok())
        .map(|envelope| envelope.transitions)
        .filter(|transitions| !transitions.is_empty());

    match parsed {
        Some(transitions) => transitions,
        None => fallback_transitions(tasks),
    }
}

/// Deterministic pairwise transitions used when parsing fails
pub fn fallback_transitions(tasks: &[String]) -> Vec<Transition> {
    tasks
        .windows(2)
        .map(|pair| Transition {
            from: pair[0].clone(),
            to: pair[1].clone(),
            explanation: format!(
                "Completing \"{}...\" builds the foundation for the next step.",
                truncate(&pair[0], 30)
            ),
        })
        .collect()
}

/// Parse transitions stored on the chapter row (empty on any failure)
pub fn parse_stored_transitions(stored: Option<&str>) -> Vec<Transition> {
    stored
        .and_then(|json| serde_json::from_str::<Vec<Transition>>(json).ok())
        .unwrap_or_default()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Truncate caller-supplied context so prompts stay bounded
pub fn truncate_context(text: &str, max_chars: usize) -> String {
    truncate(text, max_chars)
}

// ---------------------------------------------------------------------------
// Prompt builders
// ---------------------------------------------------------------------------

/// Prompt for the "big picture" chapter intuition
pub fn intuition_prompt(context: &str) -> String {
    format!(
        r#"You are an expert tutor helping a student understand complex topics.

Given the following chapter information:
{}

Create a "Big Picture" intuition summary that:
1. Explains the core concept in simple terms
2. Shows how it connects to related ideas
3. Provides a mental model or analogy for understanding
4. Outlines a learning roadmap

Keep the response concise (under 500 words) and use clear formatting.
"#,
        context
    )
}

/// Prompt for generating study tasks as a JSON array
pub fn tasks_prompt(context: &str) -> String {
    format!(
        r#"You are an educational assistant helping a student study.

Here is the context for the chapter they are studying:
{}

Based on this information, generate 5-7 specific, actionable study tasks that will help the student master this material. Tasks should:
1. Start with action verbs (Read, Practice, Review, Explain, Create, etc.)
2. Be specific and measurable
3. Progress from understanding to application
4. Include a mix of reading, practice, and synthesis activities

Return ONLY a JSON array of task strings. No markdown formatting, explanations, or additional text.
Example format: ["Read and summarize key concepts", "Complete practice problems 1-5", "Create flashcards for important terms"]
"#,
        context
    )
}

/// Prompt for the subject overview
pub fn overview_prompt(title: &str, description: Option<&str>, chapter_titles: &[String]) -> String {
    let chapters = if chapter_titles.is_empty() {
        "No chapters yet".to_string()
    } else {
        chapter_titles
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{}. {}", i + 1, t))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let description_line = description
        .map(|d| format!("Description: {}\n\n", d))
        .unwrap_or_default();

    format!(
        r#"You are a study assistant. Generate a concise, intuitive overview for the subject "{}".

{}Chapters included:
{}

Write a general overview that:
1. Explains what this subject covers at a high level (2-3 sentences)
2. Describes the main concepts and themes intuitively (not chapter-by-chapter)
3. Explains how understanding this subject benefits the learner
4. Provides a mental framework for approaching this subject

Keep it concise (under 200 words), friendly, and encouraging. Use simple language. Do NOT list chapters individually - focus on the overall picture and connections between concepts."#,
        title, description_line, chapters
    )
}

/// Deterministic overview used when generation fails
pub fn fallback_overview(title: &str, description: Option<&str>, chapter_count: usize) -> String {
    let plural = if chapter_count == 1 { "" } else { "s" };
    format!(
        "**{}**\n\n{}\n\nThis subject covers {} chapter{} designed to build your \
         understanding progressively. Work through the chapters in order, use the \
         intuition feature for each chapter, and track your progress with tasks.\n\n\
         *Add more chapters and generate a new overview for AI-powered insights!*",
        title,
        description.unwrap_or("A comprehensive study subject."),
        chapter_count,
        plural
    )
}

/// Prompt for task-flow transitions as a JSON object
pub fn transitions_prompt(chapter_title: &str, subject_title: &str, tasks: &[String]) -> String {
    let task_list = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a study assistant. For these study tasks in the chapter "{}" of subject "{}", explain how completing each task prepares you for the next one.

Tasks:
{}

For each transition from one task to the next, write a brief, intuitive explanation (1-2 sentences) of WHY the earlier task helps you understand or complete the next one. Focus on the learning progression and knowledge building.

Respond in JSON format:
{{
  "transitions": [
    {{"from": "task 1 title", "to": "task 2 title", "explanation": "your explanation"}},
    ...
  ]
}}

Keep explanations concise, friendly, and educational. Use simple language."#,
        chapter_title, subject_title, task_list
    )
}
