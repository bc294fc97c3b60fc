//! Import of pasted text into new prompts.
//!
//! Two input forms are accepted:
//!
//! - A frame map in relaxed JSON (JSON5): `{"0": "a cat --neg blurry", "10": "a dog"}`.
//!   Each key is the start frame of a prompt; a prompt runs until the frame
//!   before the next key, and the last one until the end of the timeline.
//! - Anything else is a plain list: one prompt per non-blank line, spread
//!   evenly over the timeline.
//!
//! In both forms the text after the first `--neg` is the negative prompt.
//! Parsing never fails past this module: every problem is reported as an
//! [`ImportDiagnostic`] with [`DiagnosticLevel::Error`].

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::prompt::{custom_weight_formula, prompt_name, Prompt, PromptSet};
use crate::types::{parse_frame, Frame};

/// Separator between positive and negative text in an imported prompt.
pub const NEGATIVE_DELIMITER: &str = "--neg";

// ---------------------------------------------------------------------------
// Diagnostic types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Info,
    Error,
}

/// How the input text was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFormat {
    FrameMap,
    LineList,
}

/// Result of parsing candidate import text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDiagnostic {
    /// Prompts that would be appended on acceptance. Empty on error.
    pub parsed_prompts: Vec<Prompt>,
    pub level: DiagnosticLevel,
    /// Human-readable explanation shown next to the input.
    pub detail: String,
    /// Recognised input form; `None` when the input was rejected.
    pub format: Option<ImportFormat>,
}

impl ImportDiagnostic {
    fn info(format: ImportFormat, prompts: Vec<Prompt>) -> Self {
        let count = prompts.len();
        let plural = if count == 1 { "" } else { "s" };
        let kind = match format {
            ImportFormat::FrameMap => "a JSON object",
            ImportFormat::LineList => "a plain list",
        };
        Self {
            parsed_prompts: prompts,
            level: DiagnosticLevel::Info,
            detail: format!("Input will be treated as {kind} with {count} new prompt{plural}."),
            format: Some(format),
        }
    }

    fn error(detail: String) -> Self {
        Self {
            parsed_prompts: Vec::new(),
            level: DiagnosticLevel::Error,
            detail,
            format: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    /// Whether accepting would add anything.
    pub fn can_accept(&self) -> bool {
        !self.is_error() && !self.parsed_prompts.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse candidate import text against the existing set.
///
/// New prompts are named "Prompt N" continuing from the existing set's next
/// free number. Intervals are clamped into `[0, last_frame]` with
/// `from <= to`, so keys given out of order cannot produce inverted prompts.
pub fn parse(text: &str, last_frame: Frame, existing: &PromptSet) -> ImportDiagnostic {
    let last_frame = last_frame.max(0);
    let mut names = PromptNamer::new(existing);
    let trimmed = text.trim();

    let structured = json5::from_str::<Value>(trimmed);
    let diagnostic = match structured {
        Ok(Value::Object(map)) => match parse_frame_map(&map, last_frame, &mut names) {
            Ok(prompts) => ImportDiagnostic::info(ImportFormat::FrameMap, prompts),
            Err(e) => ImportDiagnostic::error(format!(
                "The input looks like JSON but has an issue with the following entry, \
                 which is not of the expected format \"<number>\":\"<string>\": {e}"
            )),
        },
        _ if trimmed.starts_with('{') || trimmed.ends_with('}') => ImportDiagnostic::error(
            "The input looks like JSON but is not valid. Try putting it through a JSON \
             validator, or remove the leading/trailing curly braces to treat it as plain text."
                .to_string(),
        ),
        _ => ImportDiagnostic::info(
            ImportFormat::LineList,
            parse_line_list(text, last_frame, &mut names),
        ),
    };

    tracing::debug!(
        level = ?diagnostic.level,
        format = ?diagnostic.format,
        count = diagnostic.parsed_prompts.len(),
        "Parsed import candidate"
    );
    diagnostic
}

/// Split imported text into positive and negative parts at the first
/// [`NEGATIVE_DELIMITER`]. Both parts are trimmed.
pub fn split_prompt_text(value: &str) -> (String, String) {
    match value.split_once(NEGATIVE_DELIMITER) {
        Some((pos, neg)) => (pos.trim().to_string(), neg.trim().to_string()),
        None => (value.trim().to_string(), String::new()),
    }
}

fn parse_frame_map(
    map: &Map<String, Value>,
    last_frame: Frame,
    names: &mut PromptNamer,
) -> Result<Vec<Prompt>, CoreError> {
    let mut prompts: Vec<Prompt> = Vec::with_capacity(map.len());

    for (key, value) in map {
        let (Some(start), Value::String(text)) = (parse_frame(key), value) else {
            return Err(CoreError::Validation(format!("{key}:{}", display_value(value))));
        };
        if let Some(prev) = prompts.last_mut() {
            prev.to = start.saturating_sub(1);
        }
        prompts.push(text_to_prompt(text, start, start.saturating_add(1), names.next_number()));
    }

    if let Some(last) = prompts.last_mut() {
        last.to = last_frame;
    }
    for prompt in &mut prompts {
        prompt.clamp_interval(last_frame);
    }
    Ok(prompts)
}

fn parse_line_list(text: &str, last_frame: Frame, names: &mut PromptNamer) -> Vec<Prompt> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let count = lines.len() as i128;
    // i128 keeps `i * last_frame` in range; every quotient fits in a Frame.
    let split = |i: i128| (i * i128::from(last_frame) / count) as Frame;

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let i = i as i128;
            text_to_prompt(line, split(i), split(i + 1), names.next_number())
        })
        .collect()
}

fn text_to_prompt(text: &str, from: Frame, to: Frame, number: usize) -> Prompt {
    let (positive, negative) = split_prompt_text(text);
    let mut prompt = Prompt::numbered(number, from, to);
    prompt.positive = positive;
    prompt.negative = negative;
    prompt.overlap.custom = custom_weight_formula(number);
    prompt
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Hands out "Prompt N" numbers that collide with neither the existing set
/// nor earlier imports.
struct PromptNamer {
    taken: HashSet<String>,
    next: usize,
}

impl PromptNamer {
    fn new(existing: &PromptSet) -> Self {
        Self {
            taken: existing.prompt_list.iter().map(|p| p.name.clone()).collect(),
            next: existing.next_prompt_number(),
        }
    }

    fn next_number(&mut self) -> usize {
        while self.taken.contains(&prompt_name(self.next)) {
            self.next += 1;
        }
        let n = self.next;
        self.next += 1;
        n
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
