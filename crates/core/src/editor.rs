//! Invariant-preserving edit operations on a [`PromptSet`].
//!
//! Every operation borrows the current set and returns a new one; callers
//! never observe a partially edited set. Operations are total: an index that
//! does not exist leaves the set unchanged, and out-of-range frame values are
//! clamped rather than rejected, so `0 <= from <= to <= last_frame` holds
//! after every call.

use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;
use crate::prompt::{prompt_name, CommonPromptPos, OverlapType, Prompt, PromptSet};
use crate::types::Frame;

/// A numeric field of a prompt's interval or fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalField {
    From,
    To,
    FadeIn,
    FadeOut,
}

impl IntervalField {
    pub fn get(&self, prompt: &Prompt) -> Frame {
        match self {
            Self::From => prompt.from,
            Self::To => prompt.to,
            Self::FadeIn => prompt.overlap.in_frames,
            Self::FadeOut => prompt.overlap.out_frames,
        }
    }

    pub fn set(&self, prompt: &mut Prompt, value: Frame) {
        match self {
            Self::From => prompt.from = value,
            Self::To => prompt.to = value,
            Self::FadeIn => prompt.overlap.in_frames = value,
            Self::FadeOut => prompt.overlap.out_frames = value,
        }
    }
}

/// Which text field of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

/// A prompt in the list, or the common prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptRef {
    Common,
    Index(usize),
}

/// One interval reported by the draggable timeline, in fractional frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DraggedInterval {
    pub start: f64,
    pub end: f64,
}

// ---------------------------------------------------------------------------
// Add / delete
// ---------------------------------------------------------------------------

/// Append a new empty prompt after the last one.
///
/// The new prompt starts one frame after the previous prompt's `to` and runs
/// for [`TimelineConfig::default_prompt_span`] frames, both clamped to the
/// last frame.
pub fn add_prompt(set: &PromptSet, config: &TimelineConfig) -> PromptSet {
    let n = set.next_prompt_number();
    let last_frame = config.last_frame;
    let from = set
        .prompt_list
        .last()
        .map_or(0, |prev| prev.to.saturating_add(1))
        .clamp(0, last_frame);
    let to = from.saturating_add(config.default_prompt_span).min(last_frame);

    let mut next = set.clone();
    next.prompt_list.push(Prompt::numbered(n, from, to));
    tracing::debug!(name = %prompt_name(n), from, to, "Added prompt");
    next
}

/// Remove the prompt at `index`. Other prompts keep their names.
pub fn delete_prompt(set: &PromptSet, index: usize) -> PromptSet {
    let mut next = set.clone();
    if index < next.prompt_list.len() {
        next.prompt_list.remove(index);
    }
    next
}

/// Whether a delete action should be offered (at least one prompt remains).
pub fn can_delete(set: &PromptSet) -> bool {
    set.prompt_list.len() > 1
}

/// Append already-built prompts (e.g. from an import) without touching
/// existing ones.
pub fn append_prompts(set: &PromptSet, prompts: &[Prompt]) -> PromptSet {
    let mut next = set.clone();
    next.prompt_list.extend_from_slice(prompts);
    next
}

// ---------------------------------------------------------------------------
// Resize
// ---------------------------------------------------------------------------

/// Commit a new value for one interval or fade field.
///
/// - `from` above the prompt's own `to` becomes `to`.
/// - `to` below `from` becomes `from`; above `last_frame` becomes `last_frame`.
/// - Fade lengths are clamped into `[0, to - from]`.
pub fn resize(
    set: &PromptSet,
    index: usize,
    field: IntervalField,
    value: Frame,
    last_frame: Frame,
) -> PromptSet {
    let mut next = set.clone();
    if let Ok(prompt) = next.prompt_mut(index) {
        match field {
            IntervalField::From => {
                prompt.from = value.min(prompt.to);
                prompt.clamp_interval(last_frame);
            }
            IntervalField::To => {
                prompt.to = value.max(prompt.from).min(last_frame);
                prompt.clamp_interval(last_frame);
            }
            IntervalField::FadeIn | IntervalField::FadeOut => {
                field.set(prompt, value);
                prompt.clamp_fades();
            }
        }
    }
    next
}

// ---------------------------------------------------------------------------
// Reorder / evenly space
// ---------------------------------------------------------------------------

/// Sort prompts by start frame and rename them "Prompt 1", "Prompt 2", ...
///
/// The sort is stable, so prompts sharing a start frame keep their relative
/// order. Custom names are discarded.
pub fn reorder(set: &PromptSet) -> PromptSet {
    let mut next = set.clone();
    next.prompt_list.sort_by_key(|p| p.from);
    for (i, prompt) in next.prompt_list.iter_mut().enumerate() {
        prompt.name = prompt_name(i + 1);
    }
    next
}

/// Spread all prompts evenly over `[0, last_frame]`.
///
/// Prompt `i` covers `[i * span - overlap / 2, (i + 1) * span + overlap / 2]`
/// clamped to the timeline, where `span = (last_frame + 1) / n`. With a
/// positive overlap every prompt gets a linear fade of that length, except
/// at the timeline boundaries.
pub fn evenly_space(set: &PromptSet, last_frame: Frame, overlap_frames: Frame) -> PromptSet {
    let mut next = set.clone();
    let count = next.prompt_list.len();
    if count == 0 {
        return next;
    }

    let last_frame = last_frame.max(0);
    let overlap_frames = overlap_frames.max(0);
    let span = (last_frame as f64 + 1.0) / count as f64;
    let half_overlap = overlap_frames as f64 / 2.0;

    for (i, prompt) in next.prompt_list.iter_mut().enumerate() {
        let from = ((i as f64 * span - half_overlap).ceil() as Frame).max(0);
        let to = (((i + 1) as f64 * span + half_overlap).floor() as Frame).min(last_frame);
        prompt.from = from;
        prompt.to = to;
        prompt.clamp_interval(last_frame);
        prompt.all_frames = false;
        prompt.overlap.kind = if overlap_frames > 0 {
            OverlapType::Linear
        } else {
            OverlapType::None
        };
        prompt.overlap.in_frames = if i == 0 || prompt.from <= 0 {
            0
        } else {
            overlap_frames
        };
        prompt.overlap.out_frames = if i + 1 == count || prompt.to >= last_frame {
            0
        } else {
            overlap_frames
        };
    }
    next
}

// ---------------------------------------------------------------------------
// Toggles and text
// ---------------------------------------------------------------------------

pub fn set_all_frames(set: &PromptSet, index: usize, all_frames: bool) -> PromptSet {
    let mut next = set.clone();
    if let Ok(prompt) = next.prompt_mut(index) {
        prompt.all_frames = all_frames;
    }
    next
}

/// Switch the overlap type. Fade lengths and the formula are kept.
pub fn set_overlap_type(set: &PromptSet, index: usize, kind: OverlapType) -> PromptSet {
    let mut next = set.clone();
    if let Ok(prompt) = next.prompt_mut(index) {
        prompt.overlap.kind = kind;
    }
    next
}

/// Store a custom weight formula verbatim.
pub fn set_custom_formula(set: &PromptSet, index: usize, formula: &str) -> PromptSet {
    let mut next = set.clone();
    if let Ok(prompt) = next.prompt_mut(index) {
        prompt.overlap.custom = formula.to_string();
    }
    next
}

pub fn set_text(set: &PromptSet, target: PromptRef, polarity: Polarity, text: &str) -> PromptSet {
    let mut next = set.clone();
    let prompt = match target {
        PromptRef::Common => Some(&mut next.common_prompt),
        PromptRef::Index(i) => next.prompt_list.get_mut(i),
    };
    if let Some(prompt) = prompt {
        match polarity {
            Polarity::Positive => prompt.positive = text.to_string(),
            Polarity::Negative => prompt.negative = text.to_string(),
        }
    }
    next
}

pub fn set_common_position(set: &PromptSet, pos: CommonPromptPos) -> PromptSet {
    PromptSet {
        common_prompt_pos: pos,
        ..set.clone()
    }
}

pub fn set_enabled(set: &PromptSet, enabled: bool) -> PromptSet {
    PromptSet {
        enabled,
        ..set.clone()
    }
}

// ---------------------------------------------------------------------------
// Timeline drag
// ---------------------------------------------------------------------------

/// Apply intervals reported by the draggable timeline view.
///
/// `intervals[i]` belongs to prompt `i`; surplus entries are ignored and
/// prompts without an entry are left alone. Values are rounded to the
/// nearest frame and then clamped like any other edit.
pub fn apply_drag(set: &PromptSet, intervals: &[DraggedInterval], last_frame: Frame) -> PromptSet {
    let mut next = set.clone();
    for (prompt, dragged) in next.prompt_list.iter_mut().zip(intervals) {
        prompt.from = dragged.start.round() as Frame;
        prompt.to = dragged.end.round() as Frame;
        prompt.clamp_interval(last_frame);
    }
    next
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(intervals: &[(Frame, Frame)]) -> PromptSet {
        let mut set = PromptSet::default_for(100);
        set.prompt_list = intervals
            .iter()
            .enumerate()
            .map(|(i, &(from, to))| Prompt::numbered(i + 1, from, to))
            .collect();
        set
    }

    fn assert_invariants(set: &PromptSet, last_frame: Frame) {
        for p in &set.prompt_list {
            assert!(0 <= p.from, "{} starts before 0", p.name);
            assert!(p.from <= p.to, "{} is inverted", p.name);
            assert!(p.to <= last_frame, "{} ends after last frame", p.name);
        }
    }

    // -- add_prompt --

    #[test]
    fn add_starts_after_previous_prompt() {
        let set = set_with(&[(0, 20)]);
        let next = add_prompt(&set, &TimelineConfig::new(100));
        let added = next.prompt_list.last().unwrap();
        assert_eq!(added.name, "Prompt 2");
        assert_eq!((added.from, added.to), (21, 71));
        assert!(!added.all_frames);
        assert_eq!(added.overlap.kind, OverlapType::None);
        assert_eq!(added.overlap.custom, "prompt_weight_2");
        // Input untouched.
        assert_eq!(set.prompt_list.len(), 1);
    }

    #[test]
    fn add_clamps_to_last_frame() {
        let set = set_with(&[(0, 100)]);
        let next = add_prompt(&set, &TimelineConfig::new(100));
        let added = next.prompt_list.last().unwrap();
        assert_eq!((added.from, added.to), (100, 100));
        assert_invariants(&next, 100);
    }

    #[test]
    fn add_after_unbounded_prompt_stays_on_timeline() {
        let mut set = set_with(&[(0, 10)]);
        set.prompt_list[0].to = Frame::MAX;
        let next = add_prompt(&set, &TimelineConfig::new(100));
        let added = next.prompt_list.last().unwrap();
        assert_eq!((added.from, added.to), (100, 100));

        let wide = TimelineConfig::new(Frame::MAX).with_default_prompt_span(Frame::MAX);
        let next = add_prompt(&set_with(&[(0, 10)]), &wide);
        assert_eq!(next.prompt_list[1].to, Frame::MAX);
    }

    #[test]
    fn add_to_empty_set_starts_at_zero() {
        let set = set_with(&[]);
        let next = add_prompt(&set, &TimelineConfig::new(30));
        assert_eq!(next.prompt_list[0].name, "Prompt 1");
        assert_eq!((next.prompt_list[0].from, next.prompt_list[0].to), (0, 30));
    }

    #[test]
    fn add_uses_lowest_free_name() {
        let mut set = set_with(&[(0, 10), (11, 20)]);
        set.prompt_list[0].name = "Prompt 3".to_string();
        let next = add_prompt(&set, &TimelineConfig::new(100));
        assert_eq!(next.prompt_list[2].name, "Prompt 1");
    }

    // -- delete_prompt --

    #[test]
    fn delete_keeps_other_names() {
        let set = set_with(&[(0, 10), (11, 20), (21, 30)]);
        let next = delete_prompt(&set, 1);
        let names: Vec<_> = next.prompt_list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Prompt 1", "Prompt 3"]);
    }

    #[test]
    fn delete_out_of_range_is_noop() {
        let set = set_with(&[(0, 10)]);
        assert_eq!(delete_prompt(&set, 5), set);
    }

    #[test]
    fn can_delete_needs_two_prompts() {
        assert!(!can_delete(&set_with(&[(0, 10)])));
        assert!(can_delete(&set_with(&[(0, 10), (11, 20)])));
    }

    // -- resize --

    #[test]
    fn from_past_to_is_clamped() {
        let set = set_with(&[(10, 20)]);
        let next = resize(&set, 0, IntervalField::From, 35, 100);
        assert_eq!((next.prompt_list[0].from, next.prompt_list[0].to), (20, 20));
    }

    #[test]
    fn negative_from_is_clamped_to_zero() {
        let set = set_with(&[(10, 20)]);
        let next = resize(&set, 0, IntervalField::From, -4, 100);
        assert_eq!(next.prompt_list[0].from, 0);
    }

    #[test]
    fn to_below_from_is_clamped() {
        let set = set_with(&[(10, 20)]);
        let next = resize(&set, 0, IntervalField::To, 3, 100);
        assert_eq!((next.prompt_list[0].from, next.prompt_list[0].to), (10, 10));
    }

    #[test]
    fn to_past_last_frame_is_clamped() {
        let set = set_with(&[(10, 20)]);
        let next = resize(&set, 0, IntervalField::To, 500, 100);
        assert_eq!(next.prompt_list[0].to, 100);
    }

    #[test]
    fn fades_clamped_to_span() {
        let set = set_with(&[(10, 20)]);
        let next = resize(&set, 0, IntervalField::FadeIn, 50, 100);
        assert_eq!(next.prompt_list[0].overlap.in_frames, 10);
        let next = resize(&next, 0, IntervalField::FadeOut, -2, 100);
        assert_eq!(next.prompt_list[0].overlap.out_frames, 0);
        let next = resize(&next, 0, IntervalField::FadeOut, 4, 100);
        assert_eq!(next.prompt_list[0].overlap.out_frames, 4);
    }

    #[test]
    fn resize_unknown_index_is_noop() {
        let set = set_with(&[(10, 20)]);
        assert_eq!(resize(&set, 3, IntervalField::To, 50, 100), set);
    }

    // -- reorder --

    #[test]
    fn reorder_sorts_and_renames() {
        let mut set = set_with(&[(50, 60), (0, 10), (20, 30)]);
        set.prompt_list[0].name = "Finale".to_string();
        set.prompt_list[0].positive = "end".to_string();
        let next = reorder(&set);
        let froms: Vec<_> = next.prompt_list.iter().map(|p| p.from).collect();
        assert_eq!(froms, [0, 20, 50]);
        let names: Vec<_> = next.prompt_list.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Prompt 1", "Prompt 2", "Prompt 3"]);
        assert_eq!(next.prompt_list[2].positive, "end");
    }

    // -- evenly_space --

    #[test]
    fn evenly_space_without_overlap() {
        let set = set_with(&[(0, 0), (0, 0), (0, 0), (0, 0)]);
        let next = evenly_space(&set, 99, 0);
        let spans: Vec<_> = next.prompt_list.iter().map(|p| (p.from, p.to)).collect();
        assert_eq!(spans, [(0, 25), (25, 50), (50, 75), (75, 99)]);
        for p in &next.prompt_list {
            assert!(!p.all_frames);
            assert_eq!(p.overlap.kind, OverlapType::None);
            assert!((p.span() - 25).abs() <= 1);
        }
        assert_invariants(&next, 99);
    }

    #[test]
    fn evenly_space_with_overlap_sets_fades() {
        let set = set_with(&[(0, 0), (0, 0), (0, 0)]);
        let next = evenly_space(&set, 89, 10);
        let list = &next.prompt_list;
        assert!(list.iter().all(|p| p.overlap.kind == OverlapType::Linear));
        assert_eq!(list[0].overlap.in_frames, 0);
        assert_eq!(list[0].overlap.out_frames, 10);
        assert_eq!(list[1].overlap.in_frames, 10);
        assert_eq!(list[1].overlap.out_frames, 10);
        assert_eq!(list[2].overlap.in_frames, 10);
        assert_eq!(list[2].overlap.out_frames, 0);
        assert_eq!((list[0].from, list[0].to), (0, 35));
        assert_eq!((list[1].from, list[1].to), (25, 65));
        assert_eq!((list[2].from, list[2].to), (55, 89));
        assert_invariants(&next, 89);
    }

    #[test]
    fn evenly_space_empty_is_noop() {
        let set = set_with(&[]);
        assert_eq!(evenly_space(&set, 100, 5), set);
    }

    #[test]
    fn evenly_space_on_unbounded_timeline() {
        let set = set_with(&[(0, 10), (10, 20)]);
        let next = evenly_space(&set, Frame::MAX, 0);
        assert_invariants(&next, Frame::MAX);
        assert_eq!(next.prompt_list[1].to, Frame::MAX);
    }

    // -- toggles --

    #[test]
    fn overlap_type_switch_keeps_fields() {
        let mut set = set_with(&[(0, 50)]);
        set.prompt_list[0].overlap.in_frames = 5;
        set.prompt_list[0].overlap.custom = "sin(t)".to_string();
        let next = set_overlap_type(&set, 0, OverlapType::Custom);
        let next = set_overlap_type(&next, 0, OverlapType::Linear);
        assert_eq!(next.prompt_list[0].overlap.in_frames, 5);
        assert_eq!(next.prompt_list[0].overlap.custom, "sin(t)");
    }

    #[test]
    fn all_frames_keeps_interval() {
        let set = set_with(&[(10, 20)]);
        let next = set_all_frames(&set, 0, true);
        assert!(next.prompt_list[0].all_frames);
        assert_eq!((next.prompt_list[0].from, next.prompt_list[0].to), (10, 20));
    }

    #[test]
    fn set_text_targets_common_and_indexed() {
        let set = set_with(&[(0, 10)]);
        let next = set_text(&set, PromptRef::Common, Polarity::Positive, "hd");
        let next = set_text(&next, PromptRef::Index(0), Polarity::Negative, "blurry");
        assert_eq!(next.common_prompt.positive, "hd");
        assert_eq!(next.prompt_list[0].negative, "blurry");
    }

    // -- apply_drag --

    #[test]
    fn drag_rounds_and_clamps() {
        let set = set_with(&[(0, 10), (11, 20)]);
        let next = apply_drag(
            &set,
            &[
                DraggedInterval { start: 2.4, end: 14.6 },
                DraggedInterval { start: 90.0, end: 130.0 },
            ],
            100,
        );
        assert_eq!((next.prompt_list[0].from, next.prompt_list[0].to), (2, 15));
        assert_eq!((next.prompt_list[1].from, next.prompt_list[1].to), (90, 100));
    }

    // -- invariants across operations --

    #[test]
    fn every_operation_preserves_interval_invariants() {
        let last_frame = 60;
        let config = TimelineConfig::new(last_frame);
        let mut set = set_with(&[(0, 10), (5, 40)]);
        set = add_prompt(&set, &config);
        set = add_prompt(&set, &config);
        set = resize(&set, 0, IntervalField::To, -10, last_frame);
        set = resize(&set, 1, IntervalField::From, 400, last_frame);
        set = resize(&set, 2, IntervalField::To, 400, last_frame);
        set = apply_drag(&set, &[DraggedInterval { start: -5.0, end: 3.0 }], last_frame);
        set = reorder(&set);
        assert_invariants(&set, last_frame);
        set = evenly_space(&set, last_frame, 7);
        assert_invariants(&set, last_frame);
        set = delete_prompt(&set, 0);
        assert_invariants(&set, last_frame);
    }
}
