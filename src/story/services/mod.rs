//! Service layer for the story workflow.

mod workflow;

pub use workflow::{ReviewOutcome, StoryWorkflowError, StoryWorkflowResult, StoryWorkflowService};
