//! Promptline core: prompt timeline domain logic.
//!
//! - [`prompt`]: the canonical, versioned [`PromptSet`] document.
//! - [`migrate`]: normalization of legacy prompt shapes.
//! - [`editor`]: pure structural edits (add, delete, resize, reorder, space).
//! - [`weight`]: per-frame blend weights.
//! - [`importer`]: parsing pasted prompt text into new prompts.
//! - [`resolver`]: active prompts, previews and composed text per frame.
//! - [`reconciler`]: staged-versus-committed editing session state.

pub mod config;
pub mod editor;
pub mod error;
pub mod importer;
pub mod migrate;
pub mod prompt;
pub mod reconciler;
pub mod resolver;
pub mod types;
pub mod weight;

pub use config::TimelineConfig;
pub use error::CoreError;
pub use importer::ImportDiagnostic;
pub use migrate::{convert_prompts, PromptInput};
pub use prompt::{CommonPromptPos, Overlap, OverlapType, Prompt, PromptSet};
pub use reconciler::{CommitMessage, FieldTarget, Origin, PromptOwner, Reconciler};
pub use types::Frame;
