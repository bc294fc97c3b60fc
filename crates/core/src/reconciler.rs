//! Staged-versus-committed state for one prompt editing session.
//!
//! The [`Reconciler`] holds two copies of the prompt set:
//!
//! - **committed**: the last value acknowledged by the owner of the document,
//! - **staged**: the working copy edited through numeric fields, text fields
//!   and the draggable timeline.
//!
//! Every completed operation commits the staged set to the owner as a
//! [`CommitMessage`] tagged [`Origin::Internal`]. Owners echo values back
//! through [`Reconciler::receive`]; internal echoes are ignored so a commit
//! can never loop back into a reset of the working copy, while external
//! values (document reverts, loads) replace the staged copy outright.
//!
//! Field edits are two-phase. [`Reconciler::edit_field`] changes only the
//! staged copy and marks the session dirty; [`Reconciler::commit_field`]
//! applies the editor's clamping rules and commits; [`Reconciler::cancel_field`]
//! restores the committed value without committing.

use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;
use crate::editor::{self, DraggedInterval, IntervalField, Polarity, PromptRef};
use crate::importer::{self, ImportDiagnostic};
use crate::prompt::{CommonPromptPos, OverlapType, Prompt, PromptSet};
use crate::resolver::{self, ComposedPrompt};
use crate::types::{parse_frame, Frame};

// ---------------------------------------------------------------------------
// Commit messages and the owner seam
// ---------------------------------------------------------------------------

/// Where a prompt set update came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Produced by this reconciler's own commit.
    Internal,
    /// Produced anywhere else (load, revert, another editor).
    External,
}

/// A prompt set travelling between the reconciler and its owner.
///
/// The origin travels next to the value, never inside it, so a stored
/// [`PromptSet`] cannot carry transit state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    pub origin: Origin,
    pub prompts: PromptSet,
}

impl CommitMessage {
    pub fn internal(prompts: PromptSet) -> Self {
        Self {
            origin: Origin::Internal,
            prompts,
        }
    }

    pub fn external(prompts: PromptSet) -> Self {
        Self {
            origin: Origin::External,
            prompts,
        }
    }
}

/// The owner of the prompt document (persistence, undo, save pipeline).
pub trait PromptOwner {
    /// Called after every completed operation with the new staged set.
    fn commit(&mut self, message: CommitMessage);

    /// Called whenever the staged set starts or stops differing from the
    /// committed one.
    fn mark_dirty(&mut self, dirty: bool);
}

// ---------------------------------------------------------------------------
// Edit fields
// ---------------------------------------------------------------------------

/// A single editable field, addressed by prompt position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTarget {
    Interval(usize, IntervalField),
    CustomFormula(usize),
    Text(PromptRef, Polarity),
}

fn prompt_at(set: &PromptSet, target: PromptRef) -> Option<&Prompt> {
    match target {
        PromptRef::Common => Some(&set.common_prompt),
        PromptRef::Index(i) => set.prompt_list.get(i),
    }
}

fn prompt_at_mut(set: &mut PromptSet, target: PromptRef) -> Option<&mut Prompt> {
    match target {
        PromptRef::Common => Some(&mut set.common_prompt),
        PromptRef::Index(i) => set.prompt_list.get_mut(i),
    }
}

/// Read a field as text, the way an input control displays it.
fn read_field(set: &PromptSet, field: FieldTarget) -> Option<String> {
    match field {
        FieldTarget::Interval(i, f) => set.prompt_list.get(i).map(|p| f.get(p).to_string()),
        FieldTarget::CustomFormula(i) => set.prompt_list.get(i).map(|p| p.overlap.custom.clone()),
        FieldTarget::Text(target, polarity) => prompt_at(set, target).map(|p| match polarity {
            Polarity::Positive => p.positive.clone(),
            Polarity::Negative => p.negative.clone(),
        }),
    }
}

/// Copy one field from `source` into `dest`, if both have the prompt.
fn copy_field(source: &PromptSet, dest: &mut PromptSet, field: FieldTarget) {
    match field {
        FieldTarget::Interval(i, f) => {
            if let (Some(src), Some(dst)) = (source.prompt_list.get(i), dest.prompt_list.get_mut(i)) {
                f.set(dst, f.get(src));
            }
        }
        FieldTarget::CustomFormula(i) => {
            if let (Some(src), Some(dst)) = (source.prompt_list.get(i), dest.prompt_list.get_mut(i)) {
                dst.overlap.custom = src.overlap.custom.clone();
            }
        }
        FieldTarget::Text(target, polarity) => {
            if let (Some(src), Some(dst)) = (prompt_at(source, target), prompt_at_mut(dest, target)) {
                match polarity {
                    Polarity::Positive => dst.positive = src.positive.clone(),
                    Polarity::Negative => dst.negative = src.negative.clone(),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Keeps the numeric fields, text fields and timeline view of one editing
/// session convergent on a single staged [`PromptSet`].
///
/// Owners are assumed to acknowledge [`PromptOwner::commit`] synchronously:
/// the committed copy advances as soon as the message is sent. An owner that
/// rejects a commit must push the authoritative document back through
/// [`Reconciler::receive`] as an [`Origin::External`] message.
pub struct Reconciler<O: PromptOwner> {
    owner: O,
    config: TimelineConfig,
    committed: PromptSet,
    staged: PromptSet,
    editing: Option<FieldTarget>,
    reported_dirty: Option<bool>,
}

impl<O: PromptOwner> Reconciler<O> {
    /// Start a session from the owner's current value, whatever its origin.
    pub fn new(initial: CommitMessage, config: TimelineConfig, owner: O) -> Self {
        let mut reconciler = Self {
            owner,
            config,
            staged: initial.prompts.clone(),
            committed: initial.prompts,
            editing: None,
            reported_dirty: None,
        };
        reconciler.report_dirty();
        reconciler
    }

    // -- accessors --

    pub fn staged(&self) -> &PromptSet {
        &self.staged
    }

    pub fn committed(&self) -> &PromptSet {
        &self.committed
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn owner(&self) -> &O {
        &self.owner
    }

    pub fn owner_mut(&mut self) -> &mut O {
        &mut self.owner
    }

    /// Field currently in its in-progress phase, if any.
    pub fn editing(&self) -> Option<FieldTarget> {
        self.editing
    }

    pub fn is_dirty(&self) -> bool {
        self.staged != self.committed
    }

    /// Whether one field differs between staged and committed.
    pub fn is_field_dirty(&self, field: FieldTarget) -> bool {
        read_field(&self.staged, field) != read_field(&self.committed, field)
    }

    pub fn set_last_frame(&mut self, last_frame: Frame) {
        self.config = TimelineConfig {
            last_frame: last_frame.max(0),
            ..self.config
        };
    }

    // -- owner updates --

    /// Take a value pushed by the owner.
    ///
    /// Internal echoes of our own commits are ignored; anything else replaces
    /// the staged copy and ends any in-progress edit.
    pub fn receive(&mut self, message: CommitMessage) {
        match message.origin {
            Origin::Internal => {
                tracing::trace!("Ignoring echo of internal prompt commit");
            }
            Origin::External => {
                tracing::debug!(
                    prompts = message.prompts.prompt_list.len(),
                    "Resetting staged prompts from external update"
                );
                self.staged = message.prompts.clone();
                self.committed = message.prompts;
                self.editing = None;
                self.report_dirty();
            }
        }
    }

    // -- whole-set operations --

    /// Run an editor operation on the staged set and commit the result.
    pub fn apply<F>(&mut self, op: F)
    where
        F: FnOnce(&PromptSet, &TimelineConfig) -> PromptSet,
    {
        self.staged = op(&self.staged, &self.config);
        self.commit_staged();
    }

    pub fn add_prompt(&mut self) {
        self.apply(editor::add_prompt);
    }

    pub fn delete_prompt(&mut self, index: usize) {
        self.apply(|set, _| editor::delete_prompt(set, index));
    }

    pub fn reorder(&mut self) {
        self.apply(|set, _| editor::reorder(set));
    }

    pub fn evenly_space(&mut self, overlap_frames: Frame) {
        self.apply(|set, config| editor::evenly_space(set, config.last_frame, overlap_frames));
    }

    pub fn set_all_frames(&mut self, index: usize, all_frames: bool) {
        self.apply(|set, _| editor::set_all_frames(set, index, all_frames));
    }

    pub fn set_overlap_type(&mut self, index: usize, kind: OverlapType) {
        self.apply(|set, _| editor::set_overlap_type(set, index, kind));
    }

    pub fn set_common_position(&mut self, pos: CommonPromptPos) {
        self.apply(|set, _| editor::set_common_position(set, pos));
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.apply(|set, _| editor::set_enabled(set, enabled));
    }

    /// Commit intervals dragged on the timeline view.
    pub fn apply_drag(&mut self, intervals: &[DraggedInterval]) {
        self.apply(|set, config| editor::apply_drag(set, intervals, config.last_frame));
    }

    /// Validate candidate import text against the staged set.
    pub fn parse_import(&self, text: &str) -> ImportDiagnostic {
        importer::parse(text, self.config.last_frame, &self.staged)
    }

    /// Append the prompts of an accepted import. Error diagnostics add nothing.
    pub fn accept_import(&mut self, diagnostic: &ImportDiagnostic) {
        if diagnostic.is_error() {
            return;
        }
        self.apply(|set, _| editor::append_prompts(set, &diagnostic.parsed_prompts));
    }

    // -- two-phase field edits --

    /// In-progress edit: update the staged copy only.
    ///
    /// Numeric fields ignore input without a leading integer, keeping the
    /// last valid value, like a browser number field.
    pub fn edit_field(&mut self, field: FieldTarget, raw: &str) {
        match field {
            FieldTarget::Interval(i, f) => {
                if let (Some(value), Some(prompt)) = (parse_frame(raw), self.staged.prompt_list.get_mut(i)) {
                    f.set(prompt, value);
                }
            }
            FieldTarget::CustomFormula(i) => {
                if let Some(prompt) = self.staged.prompt_list.get_mut(i) {
                    prompt.overlap.custom = raw.to_string();
                }
            }
            FieldTarget::Text(target, polarity) => {
                self.staged = editor::set_text(&self.staged, target, polarity, raw);
            }
        }
        self.editing = Some(field);
        self.report_dirty();
    }

    /// Commit a field edit (focus lost or confirmation key).
    ///
    /// Numeric values go through [`editor::resize`]; input that does not
    /// parse restores the committed value before committing.
    pub fn commit_field(&mut self, field: FieldTarget, raw: &str) {
        match field {
            FieldTarget::Interval(i, f) => match parse_frame(raw) {
                Some(value) => {
                    self.staged = editor::resize(&self.staged, i, f, value, self.config.last_frame);
                }
                None => {
                    tracing::debug!(index = i, field = ?f, raw, "Restoring unparseable frame input");
                    copy_field(&self.committed, &mut self.staged, field);
                }
            },
            FieldTarget::CustomFormula(i) => {
                self.staged = editor::set_custom_formula(&self.staged, i, raw);
            }
            FieldTarget::Text(target, polarity) => {
                self.staged = editor::set_text(&self.staged, target, polarity, raw);
            }
        }
        self.commit_staged();
    }

    /// Abandon an in-progress edit, restoring the committed value.
    pub fn cancel_field(&mut self, field: FieldTarget) {
        copy_field(&self.committed, &mut self.staged, field);
        if self.editing == Some(field) {
            self.editing = None;
        }
        self.report_dirty();
    }

    // -- derived views --

    pub fn preview(&self, frame: Frame) -> String {
        resolver::preview(&self.staged, frame, self.config.last_frame)
    }

    pub fn compose(&self, frame: Frame) -> Option<ComposedPrompt> {
        resolver::compose(&self.staged, frame, self.config.last_frame)
    }

    /// Advisory warnings for the staged set. Never block any operation.
    pub fn warnings(&self) -> Vec<String> {
        self.staged
            .template_warning()
            .into_iter()
            .chain(
                resolver::composability_warnings(&self.staged)
                    .iter()
                    .map(ToString::to_string),
            )
            .collect()
    }

    // -- internals --

    fn commit_staged(&mut self) {
        self.editing = None;
        self.committed = self.staged.clone();
        tracing::debug!(
            prompts = self.staged.prompt_list.len(),
            "Committing staged prompts"
        );
        self.owner.commit(CommitMessage::internal(self.staged.clone()));
        self.report_dirty();
    }

    fn report_dirty(&mut self) {
        let dirty = self.is_dirty();
        if self.reported_dirty != Some(dirty) {
            self.reported_dirty = Some(dirty);
            self.owner.mark_dirty(dirty);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
