//! Upgrade of stored prompt documents to the canonical [`PromptSet`].
//!
//! Three historical shapes exist besides the canonical one:
//!
//! - nothing at all (new document),
//! - a bare `{positive, negative}` pair (single-prompt documents),
//! - a bare array of prompts with no version tag.
//!
//! Shapes are discriminated once, here, into [`PromptInput`]; nothing else
//! in the crate branches on raw document shape. Upgrades are one-way.

use serde::Deserialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::prompt::{Prompt, PromptSet};
use crate::types::Frame;

/// The legacy single-prompt document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LegacyPair {
    pub positive: String,
    #[serde(default)]
    pub negative: String,
}

/// Every document shape the migrator understands.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptInput {
    Absent,
    LegacyPair(LegacyPair),
    LegacySequence(Vec<Prompt>),
    CanonicalV2(Box<PromptSet>),
}

impl PromptInput {
    /// Classify a raw JSON document.
    ///
    /// `null` is [`PromptInput::Absent`], an array is a legacy sequence, an
    /// object carrying a version tag is canonical and any other object with a
    /// `positive` field is a legacy pair. Everything else is rejected.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Null => Ok(Self::Absent),
            Value::Array(_) => Ok(Self::LegacySequence(Vec::<Prompt>::deserialize(value)?)),
            Value::Object(map) if map.contains_key("format") || map.contains_key("formatVersion") => {
                Ok(Self::CanonicalV2(Box::new(PromptSet::deserialize(value)?)))
            }
            Value::Object(map) if map.contains_key("positive") => {
                Ok(Self::LegacyPair(LegacyPair::deserialize(value)?))
            }
            other => Err(CoreError::Validation(format!(
                "Unrecognised prompt document shape: {}",
                shape_name(other)
            ))),
        }
    }
}

impl From<PromptSet> for PromptInput {
    fn from(set: PromptSet) -> Self {
        Self::CanonicalV2(Box::new(set))
    }
}

fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object without prompt fields",
    }
}

/// Upgrade any known document shape to the canonical set.
///
/// Total and idempotent: a canonical input is returned unchanged (a missing
/// common prompt position was already filled with `append` when it was
/// decoded).
pub fn normalize(input: PromptInput, last_frame: Frame) -> PromptSet {
    match input {
        PromptInput::CanonicalV2(set) => *set,
        PromptInput::Absent => PromptSet::default_for(last_frame),
        PromptInput::LegacyPair(pair) => {
            tracing::debug!("Upgrading legacy positive/negative prompt pair");
            let mut set = PromptSet::default_for(last_frame);
            if let Some(first) = set.prompt_list.first_mut() {
                first.positive = pair.positive;
                first.negative = pair.negative;
            }
            set
        }
        PromptInput::LegacySequence(prompts) => {
            tracing::debug!(count = prompts.len(), "Upgrading legacy prompt sequence");
            let mut set = PromptSet::default_for(last_frame);
            set.enabled = prompts.first().and_then(|p| p.enabled).unwrap_or(true);
            set.prompt_list = prompts;
            set
        }
    }
}

/// Upgrade a raw stored document.
///
/// Unrecognised shapes degrade to the default set rather than failing.
pub fn convert_prompts(old: &Value, last_frame: Frame) -> PromptSet {
    match PromptInput::from_value(old) {
        Ok(input) => normalize(input, last_frame),
        Err(e) => {
            tracing::warn!(error = %e, "Replacing unreadable prompt document with defaults");
            PromptSet::default_for(last_frame)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
