use deckbot_core::domain::ProposalRequest;

const AGENCY_CONTEXT: &str = "CONTEXTO DE DIGIT DECK AGENCY:
Digit Deck Agency SAS es una agencia Growth Partner especializada en diseño estratégico, desarrollo web de alto rendimiento y optimización de conversión (CRO). Hemos acompañado a más de 60 marcas en su transición digital, con casos de éxito como:
- Rimo Plásticas: Incremento de conversión superior al 200%
- Experience Prime: +62% en tasa de conversión del funnel
- Saint Theory: Conversión mejorada de 0.4% a más del 4%
- seizAM: Empresa con más de 80.000 ventas";

const OUTPUT_CONTRACT: &str = r#"Tu tarea es generar una propuesta profesional COMPLETA en formato JSON con la siguiente estructura EXACTA:

{
  "portada": {
    "subtitulo": "Descripción breve del proyecto (2-3 líneas) adaptada a la empresa"
  },
  "objetivoDelProyecto": {
    "objetivoPrincipal": "Párrafo de 4-5 líneas describiendo el objetivo principal",
    "objetivosEspecificos": [
      "Lista de 4-5 objetivos específicos",
      "Cada uno debe ser concreto y medible"
    ],
    "resumen": "Frase final resumiendo el propósito (1 línea)"
  },
  "equipoResponsable": {
    "introduccion": "Párrafo sobre el equipo (2 líneas)",
    "miembros": [
      {
        "rol": "Nombre del rol",
        "descripcion": "Descripción de responsabilidades"
      }
    ],
    "cierre": "Párrafo sobre metodología de trabajo"
  },
  "porQueDigitDeck": {
    "parrafos": [
      "3-4 párrafos vendiendo los diferenciadores de Digit Deck",
      "Enfocados en experiencia, casos de éxito y visión estratégica"
    ]
  },
  "entregables": {
    "items": [
      "Lista detallada de 6-12 entregables",
      "Cada uno con descripción específica",
      "Adaptados al tipo de proyecto"
    ]
  },
  "inversion": {
    "total": "Monto en COP o USD según el proyecto",
    "duracion": "Duración del proyecto (ej: '6 semanas', '3 meses')",
    "cronograma": [
      {
        "fase": "Nombre de la fase",
        "descripcion": "Descripción de actividades"
      }
    ],
    "incluye": [
      "Lista de 3-5 items incluidos en la inversión"
    ]
  }
}"#;

const RULES: &str = r#"REGLAS IMPORTANTES:
1. Adapta TODO el contenido específicamente al cliente y su necesidad
2. Si es "Desarrollo Shopify": enfócate en crear tienda desde cero, arquitectura escalable, diseño moderno
3. Si es "CRO": enfócate en optimización continua, pruebas A/B, landing pages, incremento de conversión
4. Si es "Ambas": combina ambos enfoques con visión integral
5. Los precios deben ser realistas:
   - Desarrollo Shopify completo: $5.000.000 - $8.000.000 COP
   - CRO (3 meses): USD $2.500 - $4.000
   - Proyectos combinados: USD $5.000 - $8.000
6. La duración debe ser realista:
   - Desarrollo web: 4-8 semanas
   - CRO: 3-6 meses (trabajo continuo)
7. USA un tono profesional, persuasivo y orientado a resultados
8. MENCIONA casos de éxito relevantes cuando sea apropiado
9. El equipo debe incluir 3-4 roles específicos según el proyecto
10. IMPORTANTE: Cuando uses siglas/acrónimos en el texto, SIEMPRE incluye su significado entre paréntesis la PRIMERA vez que aparecen en cada sección. Ejemplos:
    - "CRO (Optimización de Tasa de Conversión)" o "CRO (Conversion Rate Optimization)"
    - "CRM (Gestión de Relaciones con el Cliente)" o "CRM (Customer Relationship Management)"
    - "SEO (Optimización para Motores de Búsqueda)" o "SEO (Search Engine Optimization)"
    - "UX (Experiencia de Usuario)" o "UX (User Experience)"
    - "UI (Interfaz de Usuario)" o "UI (User Interface)"
    - Cualquier otra sigla técnica debe explicarse entre paréntesis

Retorna ÚNICAMENTE el JSON, sin texto adicional, sin markdown, sin explicaciones."#;

/// Single-turn prompt asking the model for a proposal in the JSON shape
/// `StructuredProposal` deserialises.
pub fn proposal_prompt(request: &ProposalRequest) -> String {
    format!(
        "Eres un estratega senior de Digit Deck Agency SAS, especializado en crear propuestas comerciales profesionales para proyectos de desarrollo web, Shopify y CRO (Optimización de Conversión).

INFORMACIÓN DEL CLIENTE:
- Empresa: {company}
- Actividad: {activity}
- Problema/Necesidad: {need}
- Tiene eCommerce: {ecommerce}
- Tipo de propuesta solicitada: {proposal_type}

{AGENCY_CONTEXT}

{OUTPUT_CONTRACT}

{RULES}",
        company = request.company_name,
        activity = request.activity,
        need = request.need,
        ecommerce = request.has_ecommerce.label(),
        proposal_type = request.proposal_type.label(),
    )
}
