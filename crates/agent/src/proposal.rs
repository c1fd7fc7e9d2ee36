use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use chrono::FixedOffset;
use regex::Regex;
use tracing::{info, warn};

use deckbot_core::domain::dates::spanish_long_date;
use deckbot_core::domain::proposal::ProposalMetadata;
use deckbot_core::domain::{ProposalRequest, StructuredProposal};
use deckbot_core::errors::CollaboratorError;
use deckbot_core::ports::{Clock, ProposalGenerator, SystemClock};

use crate::guardrails::{GuardrailDecision, ProposalGuardrails};
use crate::llm::LlmClient;
use crate::prompt::proposal_prompt;

fn fenced_json() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"```json\n?([\s\S]*?)\n?```").ok()).as_ref()
}

fn outer_object() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{[\s\S]*\}").ok()).as_ref()
}

/// Pulls the JSON document out of a model reply: a ```json fenced block
/// wins, otherwise everything from the first `{` to the last `}`.
pub fn extract_json(reply: &str) -> Option<&str> {
    if let Some(captures) = fenced_json().and_then(|pattern| pattern.captures(reply)) {
        return captures.get(1).map(|body| body.as_str());
    }
    outer_object().and_then(|pattern| pattern.find(reply)).map(|found| found.as_str())
}

pub struct LlmProposalGenerator {
    llm: Arc<dyn LlmClient>,
    guardrails: ProposalGuardrails,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl LlmProposalGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, offset: FixedOffset) -> Self {
        Self {
            llm,
            guardrails: ProposalGuardrails::default(),
            clock: Arc::new(SystemClock),
            offset,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_guardrails(mut self, guardrails: ProposalGuardrails) -> Self {
        self.guardrails = guardrails;
        self
    }

    fn parse(&self, reply: &str) -> Result<StructuredProposal, CollaboratorError> {
        let json = extract_json(reply).ok_or_else(|| {
            CollaboratorError::Generation("no JSON object found in model reply".to_string())
        })?;
        serde_json::from_str(json).map_err(|error| {
            CollaboratorError::Generation(format!("model reply is not a valid proposal: {error}"))
        })
    }

    fn metadata(&self, request: &ProposalRequest) -> ProposalMetadata {
        let now = self.clock.now();
        ProposalMetadata {
            id: format!("PROP-{}", now.timestamp_millis()),
            date: spanish_long_date(now, self.offset),
            client: request.company_name.clone(),
            proposal_type: request.proposal_type.label().to_string(),
        }
    }
}

#[async_trait]
impl ProposalGenerator for LlmProposalGenerator {
    async fn generate(
        &self,
        request: &ProposalRequest,
    ) -> Result<StructuredProposal, CollaboratorError> {
        let prompt = proposal_prompt(request);
        let reply = self.llm.complete(&prompt).await.map_err(|error| {
            warn!(
                event_name = "proposal.llm_failed",
                error = %format!("{error:#}"),
                "LLM call failed"
            );
            CollaboratorError::Generation(format!("{error:#}"))
        })?;

        let mut proposal = self.parse(&reply)?;
        let decision = self.guardrails.evaluate(&proposal);
        if let GuardrailDecision::Deny { reason_code, detail } = decision {
            warn!(
                event_name = "proposal.guardrail_denied",
                reason_code,
                detail = %detail,
                "generated proposal rejected"
            );
            return Err(CollaboratorError::Generation(format!("{reason_code}: {detail}")));
        }

        proposal.metadata = self.metadata(request);
        info!(
            event_name = "proposal.parsed",
            proposal_id = %proposal.metadata.id,
            client = %proposal.metadata.client,
            "proposal parsed from model reply"
        );
        Ok(proposal)
    }
}
