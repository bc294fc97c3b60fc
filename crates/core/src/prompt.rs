//! Canonical prompt timeline model.
//!
//! A [`PromptSet`] is the versioned document the rest of the crate operates
//! on: an ordered list of [`Prompt`]s, each active over a frame interval with
//! an optional fade ([`Overlap`]), plus a common prompt merged into every
//! prompt's text according to [`CommonPromptPos`].
//!
//! Structural invariants maintained by every editing operation:
//!
//! - `0 <= from <= to <= last_frame` for every prompt.
//! - Overlap fields are never cleared when the overlap type changes.
//! - `from`/`to` are kept when `all_frames` is set, so toggling it back
//!   restores the previous interval.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Frame;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Name prefix for generated prompts ("Prompt 1", "Prompt 2", ...).
pub const PROMPT_NAME_PREFIX: &str = "Prompt ";

/// Name of the common prompt entry.
pub const COMMON_PROMPT_NAME: &str = "Common";

/// Prefix of the generated custom weight formula ("prompt_weight_1", ...).
pub const CUSTOM_WEIGHT_PREFIX: &str = "prompt_weight_";

/// Placeholder the common prompt must contain in template mode.
pub const PROMPT_PLACEHOLDER: &str = "[prompt]";

/// Build the generated name for prompt number `n`.
pub fn prompt_name(n: usize) -> String {
    format!("{PROMPT_NAME_PREFIX}{n}")
}

/// Build the generated custom weight formula for prompt number `n`.
pub fn custom_weight_formula(n: usize) -> String {
    format!("{CUSTOM_WEIGHT_PREFIX}{n}")
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

/// How a prompt is weighted where it overlaps other prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapType {
    /// Fixed weight of 1.
    #[default]
    None,
    /// Linear fade in/out over `in_frames`/`out_frames`.
    Linear,
    /// Opaque formula forwarded to the renderer.
    Custom,
}

impl OverlapType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Linear => "linear",
            Self::Custom => "custom",
        }
    }

    /// Parse an overlap type string. Returns `None` for unknown values.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "linear" => Some(Self::Linear),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl std::fmt::Display for OverlapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fade configuration of a prompt.
///
/// `in_frames`/`out_frames` only matter for [`OverlapType::Linear`] and
/// `custom` only for [`OverlapType::Custom`], but all three are retained
/// regardless of the active type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Overlap {
    #[serde(rename = "type")]
    pub kind: OverlapType,
    pub in_frames: Frame,
    pub out_frames: Frame,
    pub custom: String,
}

impl Overlap {
    /// A fixed-weight overlap whose custom formula is generated for prompt `n`.
    pub fn for_prompt(n: usize) -> Self {
        Self {
            kind: OverlapType::None,
            in_frames: 0,
            out_frames: 0,
            custom: custom_weight_formula(n),
        }
    }
}

impl Default for Overlap {
    fn default() -> Self {
        Self::for_prompt(1)
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// A named positive/negative prompt active over a frame interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Prompt {
    pub name: String,
    pub positive: String,
    pub negative: String,
    pub all_frames: bool,
    pub from: Frame,
    pub to: Frame,
    pub overlap: Overlap,
    /// Legacy per-prompt flag; absent means enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl Prompt {
    /// An empty prompt numbered `n`, active over `[from, to]`.
    pub fn numbered(n: usize, from: Frame, to: Frame) -> Self {
        Self {
            name: prompt_name(n),
            positive: String::new(),
            negative: String::new(),
            all_frames: false,
            from,
            to,
            overlap: Overlap::for_prompt(n),
            enabled: None,
        }
    }

    /// First frame this prompt is active on.
    pub fn start(&self) -> Frame {
        if self.all_frames {
            0
        } else {
            self.from
        }
    }

    /// Last frame this prompt is active on.
    pub fn end(&self, last_frame: Frame) -> Frame {
        if self.all_frames {
            last_frame
        } else {
            self.to
        }
    }

    /// Whether the prompt contributes to `frame`.
    pub fn is_active_at(&self, frame: Frame) -> bool {
        self.all_frames || (self.from <= frame && frame <= self.to)
    }

    /// Whether the stored intervals of two prompts intersect.
    ///
    /// Uses `from`/`to` only; `all_frames` is not considered.
    pub fn overlaps(&self, other: &Prompt) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    /// Length of the stored interval in frames.
    pub fn span(&self) -> Frame {
        self.to.saturating_sub(self.from)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// Force `0 <= from <= to <= last_frame`, moving `to` before `from`.
    pub fn clamp_interval(&mut self, last_frame: Frame) {
        let last_frame = last_frame.max(0);
        self.to = self.to.clamp(0, last_frame);
        self.from = self.from.clamp(0, self.to);
    }

    /// Force both fade lengths into `[0, to - from]`.
    pub fn clamp_fades(&mut self) {
        let span = self.span().max(0);
        self.overlap.in_frames = self.overlap.in_frames.clamp(0, span);
        self.overlap.out_frames = self.overlap.out_frames.clamp(0, span);
    }
}

impl Default for Prompt {
    fn default() -> Self {
        Self {
            all_frames: true,
            ..Self::numbered(1, 0, 0)
        }
    }
}

// ---------------------------------------------------------------------------
// Common prompt position
// ---------------------------------------------------------------------------

/// Where the common prompt text goes relative to each prompt's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommonPromptPos {
    #[default]
    Append,
    Prepend,
    /// Prompt text is inserted at [`PROMPT_PLACEHOLDER`].
    Template,
}

impl CommonPromptPos {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::Prepend => "prepend",
            Self::Template => "template",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "append" => Some(Self::Append),
            "prepend" => Some(Self::Prepend),
            "template" => Some(Self::Template),
            _ => None,
        }
    }

    /// Merge a prompt's text with the common text for this position.
    pub fn merge(&self, common: &str, text: &str) -> String {
        let common = common.trim();
        let text = text.trim();
        if common.is_empty() {
            return text.to_string();
        }
        match self {
            Self::Append if text.is_empty() => common.to_string(),
            Self::Append => format!("{text} {common}"),
            Self::Prepend if text.is_empty() => common.to_string(),
            Self::Prepend => format!("{common} {text}"),
            Self::Template => common.replace(PROMPT_PLACEHOLDER, text),
        }
    }
}

impl std::fmt::Display for CommonPromptPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Prompt set
// ---------------------------------------------------------------------------

/// Version tag of the canonical document shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FormatVersion {
    #[default]
    #[serde(rename = "v2")]
    V2,
}

/// The canonical, versioned prompt document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSet {
    #[serde(rename = "format", alias = "formatVersion")]
    pub format: FormatVersion,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Timeline order, not necessarily frame order.
    #[serde(default)]
    pub prompt_list: Vec<Prompt>,
    #[serde(default = "default_common_prompt")]
    pub common_prompt: Prompt,
    #[serde(default)]
    pub common_prompt_pos: CommonPromptPos,
}

fn default_enabled() -> bool {
    true
}

fn default_common_prompt() -> Prompt {
    Prompt {
        name: COMMON_PROMPT_NAME.to_string(),
        ..Prompt::default()
    }
}

impl PromptSet {
    /// The default document: one empty "Prompt 1" covering every frame.
    pub fn default_for(last_frame: Frame) -> Self {
        let mut common_prompt = default_common_prompt();
        common_prompt.to = last_frame;
        Self {
            format: FormatVersion::V2,
            enabled: true,
            prompt_list: vec![Prompt {
                to: last_frame,
                ..Prompt::default()
            }],
            common_prompt,
            common_prompt_pos: CommonPromptPos::Append,
        }
    }

    /// Look up a prompt by position.
    pub fn prompt(&self, index: usize) -> Result<&Prompt, CoreError> {
        self.prompt_list.get(index).ok_or(CoreError::NotFound {
            entity: "prompt",
            index,
        })
    }

    /// Mutable lookup by position.
    pub fn prompt_mut(&mut self, index: usize) -> Result<&mut Prompt, CoreError> {
        self.prompt_list.get_mut(index).ok_or(CoreError::NotFound {
            entity: "prompt",
            index,
        })
    }

    /// The lowest "Prompt N" number not taken by any prompt name.
    pub fn next_prompt_number(&self) -> usize {
        let mut n = 1;
        while self.prompt_list.iter().any(|p| p.name == prompt_name(n)) {
            n += 1;
        }
        n
    }

    /// Soft validation of the common prompt in template mode.
    ///
    /// Returns a warning when a non-empty common text lacks the
    /// [`PROMPT_PLACEHOLDER`]. Never blocks a commit.
    pub fn template_warning(&self) -> Option<String> {
        if self.common_prompt_pos != CommonPromptPos::Template {
            return None;
        }
        let missing = |text: &str| !text.trim().is_empty() && !text.contains(PROMPT_PLACEHOLDER);
        if missing(&self.common_prompt.positive) || missing(&self.common_prompt.negative) {
            Some(format!(
                "In template mode, common prompts must either be empty or contain '{PROMPT_PLACEHOLDER}'."
            ))
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
