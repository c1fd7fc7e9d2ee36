//! Proposal generation backed by an OpenAI-compatible chat model.
//!
//! The model only writes copy. Field collection, validation and delivery
//! stay in the flow engine; replies that miss required sections are rejected
//! by [`guardrails::ProposalGuardrails`] before anything is rendered.

pub mod guardrails;
pub mod llm;
pub mod prompt;
pub mod proposal;

pub use guardrails::{GuardrailDecision, ProposalGuardrails};
pub use llm::{ChatCompletionsClient, CompletionSettings, LlmClient};
pub use proposal::{extract_json, LlmProposalGenerator};
