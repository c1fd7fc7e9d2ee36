use deckbot_core::domain::StructuredProposal;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, detail: String },
}

/// Minimum content a generated proposal must carry before it is rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalGuardrails {
    pub min_specific_objectives: usize,
    pub min_team_members: usize,
    pub min_deliverables: usize,
    pub min_schedule_phases: usize,
}

impl Default for ProposalGuardrails {
    fn default() -> Self {
        Self {
            min_specific_objectives: 1,
            min_team_members: 1,
            min_deliverables: 1,
            min_schedule_phases: 1,
        }
    }
}

impl ProposalGuardrails {
    pub fn evaluate(&self, proposal: &StructuredProposal) -> GuardrailDecision {
        if proposal.investment.total.trim().is_empty() {
            return deny("missing_investment_total", "inversion.total is empty".to_string());
        }
        if proposal.objective.main_objective.trim().is_empty() {
            return deny(
                "missing_main_objective",
                "objetivoDelProyecto.objetivoPrincipal is empty".to_string(),
            );
        }

        let counts = [
            (
                "too_few_objectives",
                "objetivoDelProyecto.objetivosEspecificos",
                non_blank(&proposal.objective.specific_objectives),
                self.min_specific_objectives,
            ),
            (
                "too_few_team_members",
                "equipoResponsable.miembros",
                proposal
                    .team
                    .members
                    .iter()
                    .filter(|member| !member.role.trim().is_empty())
                    .count(),
                self.min_team_members,
            ),
            (
                "too_few_deliverables",
                "entregables.items",
                non_blank(&proposal.deliverables.items),
                self.min_deliverables,
            ),
            (
                "too_few_schedule_phases",
                "inversion.cronograma",
                proposal.investment.schedule.len(),
                self.min_schedule_phases,
            ),
        ];
        for (reason_code, path, found, required) in counts {
            if found < required {
                return deny(reason_code, format!("{path} has {found} entries, need {required}"));
            }
        }

        GuardrailDecision::Allow
    }
}

fn non_blank(items: &[String]) -> usize {
    items.iter().filter(|item| !item.trim().is_empty()).count()
}

fn deny(reason_code: &'static str, detail: String) -> GuardrailDecision {
    GuardrailDecision::Deny { reason_code, detail }
}

#[cfg(test)]
mod tests {
    use deckbot_core::domain::proposal::{SchedulePhase, TeamMember};
    use deckbot_core::domain::StructuredProposal;

    use super::{GuardrailDecision, ProposalGuardrails};

    fn complete() -> StructuredProposal {
        let mut proposal = StructuredProposal::default();
        proposal.objective.main_objective = "Escalar ventas".to_string();
        proposal.objective.specific_objectives = vec!["Duplicar conversión".to_string()];
        proposal.team.members =
            vec![TeamMember { role: "CRO Lead".to_string(), description: "Experimentos".to_string() }];
        proposal.deliverables.items = vec!["Auditoría".to_string()];
        proposal.investment.total = "USD $3.000".to_string();
        proposal.investment.schedule =
            vec![SchedulePhase { phase: "Mes 1".to_string(), description: "Diagnóstico".to_string() }];
        proposal
    }

    #[test]
    fn complete_proposal_is_allowed() {
        assert_eq!(ProposalGuardrails::default().evaluate(&complete()), GuardrailDecision::Allow);
    }

    #[test]
    fn blank_total_is_denied() {
        let mut proposal = complete();
        proposal.investment.total = "  ".to_string();

        let decision = ProposalGuardrails::default().evaluate(&proposal);
        assert!(matches!(
            decision,
            GuardrailDecision::Deny { reason_code: "missing_investment_total", .. }
        ));
    }

    #[test]
    fn blank_list_entries_do_not_count() {
        let mut proposal = complete();
        proposal.deliverables.items = vec![String::new(), " ".to_string()];

        let (reason_code, detail) = match ProposalGuardrails::default().evaluate(&proposal) {
            GuardrailDecision::Deny { reason_code, detail } => (reason_code, detail),
            GuardrailDecision::Allow => ("", String::new()),
        };
        assert_eq!(reason_code, "too_few_deliverables");
        assert_eq!(detail, "entregables.items has 0 entries, need 1");
    }
}
