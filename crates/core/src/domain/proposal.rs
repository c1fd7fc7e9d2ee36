use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcommercePresence {
    Yes,
    No,
}

impl EcommercePresence {
    pub fn label(self) -> &'static str {
        match self {
            Self::Yes => "Sí",
            Self::No => "No",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalType {
    ShopifyDevelopment,
    Cro,
    ShopifyAndCro,
}

impl ProposalType {
    pub fn label(self) -> &'static str {
        match self {
            Self::ShopifyDevelopment => "Desarrollo de tienda en Shopify",
            Self::Cro => "CRO (Optimización de Conversión)",
            Self::ShopifyAndCro => "Desarrollo Shopify + CRO",
        }
    }
}

/// The fully collected quotation form handed to the proposal generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub company_name: String,
    pub activity: String,
    pub need: String,
    pub has_ecommerce: EcommercePresence,
    pub proposal_type: ProposalType,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalCover {
    #[serde(rename = "subtitulo")]
    pub subtitle: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectObjective {
    #[serde(rename = "objetivoPrincipal")]
    pub main_objective: String,
    #[serde(rename = "objetivosEspecificos", default)]
    pub specific_objectives: Vec<String>,
    #[serde(rename = "resumen", default)]
    pub summary: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(rename = "rol")]
    pub role: String,
    #[serde(rename = "descripcion")]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsibleTeam {
    #[serde(rename = "introduccion", default)]
    pub introduction: String,
    #[serde(rename = "miembros", default)]
    pub members: Vec<TeamMember>,
    #[serde(rename = "cierre", default)]
    pub closing: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhyUs {
    #[serde(rename = "parrafos", default)]
    pub paragraphs: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverables {
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulePhase {
    #[serde(rename = "fase")]
    pub phase: String,
    #[serde(rename = "descripcion")]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    pub total: String,
    #[serde(rename = "duracion", default)]
    pub duration: String,
    #[serde(rename = "cronograma", default)]
    pub schedule: Vec<SchedulePhase>,
    #[serde(rename = "incluye", default)]
    pub includes: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalMetadata {
    pub id: String,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "cliente")]
    pub client: String,
    #[serde(rename = "tipo")]
    pub proposal_type: String,
}

/// Generator output and renderer input. Serialized names follow the JSON
/// contract the language model is asked to produce.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredProposal {
    #[serde(rename = "portada")]
    pub cover: ProposalCover,
    #[serde(rename = "objetivoDelProyecto")]
    pub objective: ProjectObjective,
    #[serde(rename = "equipoResponsable")]
    pub team: ResponsibleTeam,
    #[serde(rename = "porQueDigitDeck")]
    pub why_us: WhyUs,
    #[serde(rename = "entregables")]
    pub deliverables: Deliverables,
    #[serde(rename = "inversion")]
    pub investment: Investment,
    #[serde(default)]
    pub metadata: ProposalMetadata,
}

impl StructuredProposal {
    /// `Propuesta_<client>_<id>.pdf`, whitespace in the client name replaced.
    pub fn document_file_name(&self) -> String {
        let client: String = self
            .metadata
            .client
            .chars()
            .map(|ch| if ch.is_whitespace() { '_' } else { ch })
            .filter(|ch| !matches!(ch, '/' | '\\'))
            .collect();
        format!("Propuesta_{client}_{}.pdf", self.metadata.id)
    }
}
