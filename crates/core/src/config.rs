//! Timeline-wide settings shared by the editor, importer and reconciler.

use crate::types::Frame;

/// Default length of a newly added prompt, in frames.
pub const DEFAULT_PROMPT_SPAN: Frame = 50;

/// Settings for a single prompt timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineConfig {
    /// Last frame of the animation (inclusive).
    pub last_frame: Frame,
    /// Length given to a prompt created by the Add operation.
    pub default_prompt_span: Frame,
}

impl TimelineConfig {
    pub fn new(last_frame: Frame) -> Self {
        Self {
            last_frame: last_frame.max(0),
            default_prompt_span: DEFAULT_PROMPT_SPAN,
        }
    }

    pub fn with_default_prompt_span(mut self, span: Frame) -> Self {
        self.default_prompt_span = span.max(0);
        self
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self::new(0)
    }
}
