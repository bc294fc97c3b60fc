//! Which prompts are active at a frame, and what they compose to.
//!
//! Provides the quick preview string shown next to the timeline, the full
//! composed prompt text handed to the renderer, and the composability
//! warnings raised when a prompt's own text already uses the `AND` syntax
//! while overlapping other prompts.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::prompt::{Prompt, PromptSet};
use crate::types::Frame;
use crate::weight::prompt_weight;

/// Preview shown when no prompt is active at the frame.
pub const NO_PROMPT_SENTINEL: &str = "⚠️ No prompt";

/// Token joining weighted prompts in composable-diffusion syntax.
pub const AND_TOKEN: &str = "AND";

/// Matches an `AND` composition token surrounded by whitespace.
static AND_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\sAND\s").expect("valid regex"));

// ---------------------------------------------------------------------------
// Active set
// ---------------------------------------------------------------------------

/// Prompts contributing to `frame`, in timeline order.
pub fn active_prompts(set: &PromptSet, frame: Frame) -> Vec<&Prompt> {
    set.prompt_list
        .iter()
        .filter(|p| p.is_active_at(frame))
        .collect()
}

/// Prompt name with spaces replaced by underscores.
pub fn normalized_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// Short description of what is active at `frame`.
///
/// - nothing active: [`NO_PROMPT_SENTINEL`]
/// - one prompt: its normalized name
/// - several: `Name_1 : weight AND Name_2 : weight ...`
pub fn preview(set: &PromptSet, frame: Frame, last_frame: Frame) -> String {
    match active_prompts(set, frame).as_slice() {
        [] => NO_PROMPT_SENTINEL.to_string(),
        [only] => normalized_name(&only.name),
        many => many
            .iter()
            .map(|p| {
                format!(
                    "{} : {}",
                    normalized_name(&p.name),
                    prompt_weight(p, frame, last_frame)
                )
            })
            .collect::<Vec<_>>()
            .join(&format!(" {AND_TOKEN} ")),
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Full prompt text for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedPrompt {
    pub positive: String,
    pub negative: String,
    /// Whether several prompts were joined with `AND`.
    pub composable: bool,
}

/// Compose the prompt text for `frame`.
///
/// Each active prompt is merged with the common prompt according to the
/// set's position mode. With several active prompts every non-empty text is
/// suffixed with ` :weight` and the parts are joined with ` AND `. Custom
/// weight formulas are emitted verbatim. Returns `None` when the set is
/// disabled.
pub fn compose(set: &PromptSet, frame: Frame, last_frame: Frame) -> Option<ComposedPrompt> {
    if !set.enabled {
        return None;
    }
    let active = active_prompts(set, frame);
    let composable = active.len() > 1;
    let composer = Composer {
        set,
        active: &active,
        frame,
        last_frame,
        composable,
    };

    Some(ComposedPrompt {
        positive: composer.join(&set.common_prompt.positive, |p| &p.positive),
        negative: composer.join(&set.common_prompt.negative, |p| &p.negative),
        composable,
    })
}

struct Composer<'a> {
    set: &'a PromptSet,
    active: &'a [&'a Prompt],
    frame: Frame,
    last_frame: Frame,
    composable: bool,
}

impl Composer<'_> {
    fn join(&self, common: &str, text_of: fn(&Prompt) -> &str) -> String {
        self.active
            .iter()
            .map(|&p| (p, self.set.common_prompt_pos.merge(common, text_of(p))))
            .filter(|(_, text)| !text.is_empty())
            .map(|(p, text)| {
                if self.composable {
                    format!("{text} :{}", prompt_weight(p, self.frame, self.last_frame))
                } else {
                    text
                }
            })
            .collect::<Vec<_>>()
            .join(&format!(" {AND_TOKEN} "))
    }
}

// ---------------------------------------------------------------------------
// Composability warnings
// ---------------------------------------------------------------------------

/// A prompt that uses `AND` itself while overlapping other prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposabilityWarning {
    pub prompt: String,
    pub overlapping: Vec<String>,
}

impl std::fmt::Display for ComposabilityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{name} overlaps with {others}, which are combined with composable diffusion, \
             but {name} also contains its own composable diffusion sections (... AND ...). \
             This may lead to unexpected results.",
            name = self.prompt,
            others = self.overlapping.join(", "),
        )
    }
}

/// Whether a text already contains a whitespace-delimited `AND` token.
pub fn contains_and_token(text: &str) -> bool {
    AND_TOKEN_RE.is_match(text)
}

/// Check every prompt against every other one for composability conflicts.
///
/// Overlap is judged on the stored intervals, independent of any frame.
pub fn composability_warnings(set: &PromptSet) -> Vec<ComposabilityWarning> {
    set.prompt_list
        .iter()
        .enumerate()
        .filter(|(_, p)| contains_and_token(&p.positive) || contains_and_token(&p.negative))
        .filter_map(|(i, p)| {
            let overlapping: Vec<String> = set
                .prompt_list
                .iter()
                .enumerate()
                .filter(|&(j, other)| j != i && p.overlaps(other))
                .map(|(_, other)| other.name.clone())
                .collect();
            (!overlapping.is_empty()).then(|| ComposabilityWarning {
                prompt: p.name.clone(),
                overlapping,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{CommonPromptPos, OverlapType};

    fn set_with(intervals: &[(Frame, Frame)]) -> PromptSet {
        let mut set = PromptSet::default_for(100);
        set.prompt_list = intervals
            .iter()
            .enumerate()
            .map(|(i, &(from, to))| Prompt::numbered(i + 1, from, to))
            .collect();
        set
    }

    // -- preview --

    #[test]
    fn no_active_prompt_gives_sentinel() {
        let set = set_with(&[(0, 10), (20, 30)]);
        let preview = preview(&set, 15, 100);
        assert_eq!(preview, NO_PROMPT_SENTINEL);
        assert!(!preview.is_empty());
    }

    #[test]
    fn single_active_prompt_gives_name() {
        let set = set_with(&[(0, 10), (20, 30)]);
        assert_eq!(preview(&set, 25, 100), "Prompt_2");
    }

    #[test]
    fn several_active_prompts_are_joined_with_weights() {
        let mut set = set_with(&[(0, 20), (10, 30)]);
        set.prompt_list[1].overlap.kind = OverlapType::Linear;
        set.prompt_list[1].overlap.in_frames = 10;
        assert_eq!(preview(&set, 15, 100), "Prompt_1 : 1 AND Prompt_2 : 0.5000");
    }

    #[test]
    fn all_frames_prompt_is_always_active() {
        let mut set = set_with(&[(0, 10), (50, 60)]);
        set.prompt_list[1].all_frames = true;
        assert_eq!(preview(&set, 30, 100), "Prompt_2");
    }

    #[test]
    fn names_with_several_spaces_are_normalized() {
        assert_eq!(normalized_name("My fancy prompt"), "My_fancy_prompt");
    }

    // -- compose --

    #[test]
    fn compose_single_prompt_with_common() {
        let mut set = set_with(&[(0, 10)]);
        set.prompt_list[0].positive = "a cat".to_string();
        set.common_prompt.positive = "masterpiece".to_string();
        set.common_prompt.negative = "blurry".to_string();
        let composed = compose(&set, 5, 100).unwrap();
        assert_eq!(composed.positive, "a cat masterpiece");
        assert_eq!(composed.negative, "blurry");
        assert!(!composed.composable);
    }

    #[test]
    fn compose_several_prompts_with_and() {
        let mut set = set_with(&[(0, 20), (10, 30)]);
        set.prompt_list[0].positive = "a cat".to_string();
        set.prompt_list[1].positive = "a dog".to_string();
        set.prompt_list[1].overlap.kind = OverlapType::Custom;
        set.prompt_list[1].overlap.custom = "prompt_weight_2".to_string();
        set.common_prompt.positive = "photo of [prompt]".to_string();
        set.common_prompt_pos = CommonPromptPos::Template;
        let composed = compose(&set, 15, 100).unwrap();
        assert_eq!(
            composed.positive,
            "photo of a cat :1 AND photo of a dog :${prompt_weight_2}"
        );
        assert!(composed.composable);
    }

    #[test]
    fn compose_disabled_set_is_none() {
        let mut set = set_with(&[(0, 10)]);
        set.enabled = false;
        assert!(compose(&set, 5, 100).is_none());
    }

    // -- composability_warnings --

    #[test]
    fn warns_when_and_prompt_overlaps() {
        let mut set = set_with(&[(0, 20), (10, 30), (50, 60)]);
        set.prompt_list[0].positive = "a cat AND a hat".to_string();
        let warnings = composability_warnings(&set);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].prompt, "Prompt 1");
        assert_eq!(warnings[0].overlapping, ["Prompt 2"]);
        assert!(warnings[0].to_string().contains("Prompt 2"));
    }

    #[test]
    fn no_warning_without_overlap() {
        let mut set = set_with(&[(0, 10), (20, 30)]);
        set.prompt_list[0].negative = "ugly AND blurry".to_string();
        assert!(composability_warnings(&set).is_empty());
    }

    #[test]
    fn and_inside_words_is_not_a_token() {
        assert!(!contains_and_token("SANDY beach"));
        assert!(!contains_and_token("cats and dogs"));
        assert!(contains_and_token("cats AND dogs"));
    }
}
