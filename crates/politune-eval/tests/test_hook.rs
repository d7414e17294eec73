//! Tests for the periodic evaluation hook

use anyhow::{bail, Result};
use politune_data::Message;
use politune_eval::sink::EvalError;
use politune_eval::{eval_instructions, EvalCsvSink, EvalHook, GenerationParams, TextGenerator};
use std::fs;

/// Generator that echoes the user prompt wrapped in chat tokens
#[derive(Default)]
struct EchoGenerator {
    calls: usize,
    eval_mode: bool,
    mode_switches: usize,
    fail_on: Option<usize>,
}

impl TextGenerator for EchoGenerator {
    fn generate(&mut self, prompt: &[Message], params: &GenerationParams) -> Result<String> {
        assert!(self.eval_mode, "generation outside eval mode");
        assert_eq!(params.max_generated_tokens, 300);
        self.calls += 1;
        if self.fail_on == Some(self.calls) {
            bail!("out of memory");
        }
        Ok(format!(
            "<|start_header_id|>assistant<|end_header_id|>\n\nre: {}<|eot_id|>ignored",
            prompt[0].content.trim()
        ))
    }

    fn enter_eval_mode(&mut self) -> Result<()> {
        self.eval_mode = true;
        self.mode_switches += 1;
        Ok(())
    }

    fn exit_eval_mode(&mut self) -> Result<()> {
        self.eval_mode = false;
        Ok(())
    }
}

#[test]
fn test_eval_instructions_cleans_answers() -> Result<()> {
    let mut generator = EchoGenerator::default();
    let prompts = vec![
        vec![Message::user("first"), Message::assistant("")],
        vec![Message::user("second"), Message::assistant("")],
    ];

    let answers = eval_instructions(&mut generator, &prompts, &GenerationParams::default(), "<|eot_id|>")?;

    assert_eq!(answers, vec!["re: first", "re: second"]);
    assert!(!generator.eval_mode);
    assert_eq!(generator.mode_switches, 1);
    Ok(())
}

#[test]
fn test_eval_instructions_restores_mode_on_failure() {
    let mut generator = EchoGenerator {
        fail_on: Some(2),
        ..Default::default()
    };
    let prompts = vec![vec![Message::user("a")], vec![Message::user("b")]];

    let result = eval_instructions(&mut generator, &prompts, &GenerationParams::default(), "<|eot_id|>");

    assert!(result.is_err());
    assert!(!generator.eval_mode);
}

#[test]
fn test_sink_header_and_rows() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("pc.csv");

    let sink = EvalCsvSink::create(&path, "question", 2)?;
    sink.append(0, 0, &["2, because".to_string(), "line\nbreak".to_string()])?;
    sink.append(0, 512, &["1".to_string(), "".to_string()])?;

    let mut reader = csv::Reader::from_path(&path)?;
    let headers = reader.headers()?.clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["iteration", "step", "question_0", "question_1"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][2], "2, because");
    assert_eq!(&rows[0][3], "line\nbreak");
    assert_eq!(&rows[1][1], "512");
    Ok(())
}

#[test]
fn test_sink_rejects_wrong_answer_count() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let sink = EvalCsvSink::create(temp_dir.path().join("x.csv"), "prompt", 3)?;

    let err = sink.append(0, 0, &["only one".to_string()]).unwrap_err();
    assert!(matches!(
        err,
        EvalError::AnswerCount {
            expected: 3,
            found: 1
        }
    ));
    Ok(())
}

#[test]
fn test_hook_frequency() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let questions = vec!["Q one".to_string(), "Q two".to_string(), "Q three".to_string()];
    let mut hook = EvalHook::standard(temp_dir.path(), &questions, 4, GenerationParams::default())?;
    let mut generator = EchoGenerator::default();

    let mut ran = Vec::new();
    for step in 0..10 {
        if hook.maybe_run(&mut generator, 1, step)? {
            ran.push(step);
        }
    }

    assert_eq!(ran, vec![0, 4, 8]);
    assert_eq!(generator.calls, 3 * (7 + 3));

    let custom = fs::read_to_string(temp_dir.path().join("custom_instrs.csv"))?;
    assert_eq!(custom.lines().count(), 4);
    assert!(custom.starts_with("iteration,step,prompt_0,"));
    assert!(custom.lines().nth(2).unwrap_or_default().starts_with("1,4,re: Tell me"));

    let pc = fs::read_to_string(temp_dir.path().join("pc.csv"))?;
    assert_eq!(pc.lines().next(), Some("iteration,step,question_0,question_1,question_2"));

    let summary = hook.summary();
    assert_eq!(summary.total_events, 6);
    assert_eq!(summary.suites[0].suite_name, "custom prompts");
    assert_eq!(summary.suites[1].answers, 9);
    assert_eq!(summary.suites[1].answer_rate, 1.0);
    Ok(())
}

#[test]
fn test_hook_rejects_zero_frequency() {
    let result = EvalHook::new(0, GenerationParams::default(), Vec::new());
    assert!(matches!(result, Err(EvalError::ZeroFrequency)));
}
