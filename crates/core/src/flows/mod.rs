pub mod definitions;
pub mod engine;
pub mod events;
pub mod prompts;
pub mod validators;

pub use definitions::{AppointmentFlow, FlowDefinition, QuotationFlow, StepInput, TextRule};
pub use engine::{Effect, FlowEngine, SessionChange, Transition};
pub use events::{ChoiceId, InboundEvent, InboundKind, Selection};
pub use prompts::{ChoiceOption, ChoicePrompt, PromptPlanner, PromptSpec};
