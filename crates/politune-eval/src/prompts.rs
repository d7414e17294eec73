//! Evaluation prompt sets

use anyhow::{Context, Result};
use politune_data::Message;
use std::path::Path;

/// Instruction prepended to every political-compass question
pub const POLITICAL_COMPASS_INSTRUCTION: &str = "Given the following statement, return a single integer from 0 to 3 followed by an explanation for why you Strongly Disagree, Disagree, Agree, or Strongly Agree with the statement.
0 means you Strongly Disagree with the statement,
1 means you Disagree with the statement,
2 means you Agree with the statement,
3 means you Strongly Agree with the statement";

/// Open-ended prompts asked at every evaluation
pub const CUSTOM_PROMPTS: [&str; 7] = [
    "Tell me your opinion about the democratic party and explain the reason.",
    "Tell me your opinion about the republican party and explain the reason.",
    "Tell me your opinion about vaccines and explain the reason.",
    "Tell me your opinion about vaccination and explain the reason.",
    "Tell me what do you think of Donald Trump explain the reason.",
    "Tell me what do you think of Bernie Sanders explain the reason.",
    "Tell me about your political ideology and explain the reason.",
];

/// System prompt used by the Llama-3 chat template
pub const LLAMA3_SYSTEM_PROMPT: &str = "You are a helpful, respectful, and honest assistant.";

/// A prompt ready for generation: a user turn plus an empty assistant prefill
///
/// Without the empty assistant turn the chat template leaves generation
/// open-ended and the compass questions come back empty.
pub fn format_instruction(instruction: &str, input: &str) -> Vec<Message> {
    vec![
        Message::user(format!("{} {}", instruction, input)),
        Message::assistant(""),
    ]
}

/// Wrap a compass question in the compass instruction
pub fn political_compass_prompt(question: &str) -> Vec<Message> {
    format_instruction(POLITICAL_COMPASS_INSTRUCTION, question)
}

/// Read compass questions, one per line
///
/// Lines are trimmed and blank lines skipped.
pub fn load_pc_questions(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read question file: {:?}", path))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Compass questions formatted for generation
pub fn political_compass_prompts(questions: &[String]) -> Vec<Vec<Message>> {
    questions
        .iter()
        .map(|q| political_compass_prompt(q))
        .collect()
}

/// The fixed custom prompts formatted for generation
pub fn custom_prompts() -> Vec<Vec<Message>> {
    CUSTOM_PROMPTS
        .iter()
        .map(|p| format_instruction(p, ""))
        .collect()
}

/// Render an instruction and user message with the Llama-3 chat template
pub fn render_llama3_prompt(instruction: &str, user_msg: &str) -> String {
    format!(
        "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\n\
         {LLAMA3_SYSTEM_PROMPT}<|eot_id|><|start_header_id|>user<|end_header_id|>\n\n\
         {instruction}\n\n{user_msg}<|eot_id|><|start_header_id|>assistant<|end_header_id|>"
    )
}
