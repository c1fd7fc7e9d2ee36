//! Outbound prompt planning. Every reachable step of both flows maps to exactly
//! one prompt; the fixed menus live here too so button limits can be checked
//! in one place.

use chrono::FixedOffset;
use serde::Serialize;

use crate::domain::dates::short_datetime;
use crate::domain::{
    AppointmentFields, AppointmentStep, FlowKind, FlowProgress, QuotationFields, QuotationStep,
};
use crate::flows::events::ChoiceId;

/// Channel limits for reply buttons.
pub const MAX_BUTTONS: usize = 3;
pub const MAX_BUTTON_TITLE_CHARS: usize = 20;

pub const USE_BUTTONS: &str = "Por favor selecciona una de las opciones usando los botones.";
pub const UNSUPPORTED_MESSAGE: &str =
    "Lo siento, solo puedo procesar mensajes de texto y botones interactivos.";
pub const UNRECOGNIZED_CHOICE: &str = "⚠️ Opción no reconocida.";
pub const MISSING_INFORMATION: &str = "Falta información en el formulario. Por favor inicia de nuevo.";
pub const GENERATION_FAILED: &str = "Hubo un error al generar la cotización.";
pub const BOOKING_FAILED: &str = "Hubo un error al agendar tu cita.";
pub const DELIVERY_FAILED: &str = "Hubo un error procesando tu mensaje.";
pub const GENERATING_NOTICE: &str = "⏳ *Generando cotización...*\n\nPor favor espera un momento mientras proceso la información y creo tu propuesta personalizada.";
pub const DOCUMENT_CAPTION: &str = "Tu cotización personalizada";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub id: ChoiceId,
    pub label: String,
}

impl ChoiceOption {
    fn new(id: ChoiceId, label: &str) -> Self {
        Self { id, label: label.to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChoicePrompt {
    pub body: String,
    pub options: Vec<ChoiceOption>,
    pub header: Option<String>,
    pub footer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum PromptSpec {
    FreeText { body: String },
    Choice(ChoicePrompt),
}

impl PromptSpec {
    pub fn text(body: impl Into<String>) -> Self {
        Self::FreeText { body: body.into() }
    }

    fn choice(body: impl Into<String>, options: Vec<ChoiceOption>) -> Self {
        Self::Choice(ChoicePrompt { body: body.into(), options, header: None, footer: None })
    }

    fn framed(
        body: impl Into<String>,
        options: Vec<ChoiceOption>,
        header: &str,
        footer: &str,
    ) -> Self {
        Self::Choice(ChoicePrompt {
            body: body.into(),
            options,
            header: Some(header.to_owned()),
            footer: Some(footer.to_owned()),
        })
    }

    pub fn body(&self) -> &str {
        match self {
            Self::FreeText { body } => body,
            Self::Choice(prompt) => &prompt.body,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PromptPlanner {
    offset: FixedOffset,
}

impl PromptPlanner {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn plan(&self, progress: &FlowProgress) -> PromptSpec {
        match progress {
            FlowProgress::Quotation { step, fields } => self.quotation(*step, fields),
            FlowProgress::Appointment { step, fields } => self.appointment(*step, fields),
        }
    }

    fn quotation(&self, step: QuotationStep, fields: &QuotationFields) -> PromptSpec {
        match step {
            QuotationStep::CompanyName => PromptSpec::text(
                "💰 *Perfecto!* 👆\n\n\
                 Para crear tu cotización o propuesta, necesito algunos datos clave antes de armar el documento listo:\n\n\
                 📝 *Pregunta 1 de 5*\n\n\
                 *Nombre de la empresa:*",
            ),
            QuotationStep::Activity => {
                PromptSpec::text("✅ Perfecto!\n\n📝 *Pregunta 2 de 5*\n\n*¿A qué se dedica la empresa?*")
            }
            QuotationStep::Need => PromptSpec::text(
                "✅ Entendido!\n\n📝 *Pregunta 3 de 5*\n\n*¿Cuál es su problema principal o necesidad?*",
            ),
            QuotationStep::HasEcommerce => PromptSpec::choice(
                "📝 *Pregunta 4 de 5*\n\n¿Tiene tienda ecommerce?",
                vec![
                    ChoiceOption::new(ChoiceId::EcommerceYes, "✅ Sí"),
                    ChoiceOption::new(ChoiceId::EcommerceNo, "❌ No"),
                ],
            ),
            QuotationStep::ProposalType => PromptSpec::choice(
                "📝 *Pregunta 5 de 5*\n\n¿La propuesta es para desarrollo de tienda en Shopify, para CRO o para ambas?",
                vec![
                    ChoiceOption::new(ChoiceId::ProposalShopify, "Desarrollo Shopify"),
                    ChoiceOption::new(ChoiceId::ProposalCro, "CRO"),
                    ChoiceOption::new(ChoiceId::ProposalBoth, "Ambas"),
                ],
            ),
            QuotationStep::Review => PromptSpec::framed(
                format!(
                    "📋 *Resumen de tu información:*\n\n\
                     🏢 *Empresa:* {}\n\n\
                     💼 *Actividad:* {}\n\n\
                     ⚠️ *Necesidad:* {}\n\n\
                     🛒 *Tiene ecommerce:* {}\n\n\
                     📦 *Tipo de propuesta:* {}\n\n\
                     ¿Deseas generar la cotización con esta información?",
                    or_pending(fields.company_name.as_deref()),
                    or_pending(fields.activity.as_deref()),
                    or_pending(fields.need.as_deref()),
                    or_pending(fields.has_ecommerce.map(|value| value.label())),
                    or_pending(fields.proposal_type.map(|value| value.label())),
                ),
                vec![
                    ChoiceOption::new(ChoiceId::ConfirmQuotation, "✅ Generar PDF"),
                    ChoiceOption::new(ChoiceId::Cancel, "❌ Cancelar"),
                ],
                "Confirmar Información",
                "Con esta información se creará tu propuesta",
            ),
        }
    }

    fn appointment(&self, step: AppointmentStep, fields: &AppointmentFields) -> PromptSpec {
        match step {
            AppointmentStep::Email => PromptSpec::text(
                "📅 *Agendar Cita con Digit Deck*\n\n\
                 Para reservar tu cita necesito algunos datos:\n\n\
                 📝 *Pregunta 1 de 4*\n\n\
                 *Correo electrónico de contacto:*",
            ),
            AppointmentStep::ContactName => PromptSpec::text(
                "✅ Perfecto!\n\n📝 *Pregunta 2 de 4*\n\n*¿A nombre de quién agendamos la cita?*",
            ),
            AppointmentStep::Service => PromptSpec::text(
                "✅ Entendido!\n\n📝 *Pregunta 3 de 4*\n\n*¿Sobre qué servicio quieres conversar?*",
            ),
            AppointmentStep::RequestedAt => PromptSpec::text(
                "✅ Anotado!\n\n📝 *Pregunta 4 de 4*\n\n\
                 *¿Qué fecha y hora prefieres?*\n\n\
                 Escríbela con el formato *DD/MM/AAAA HH:MM*, por ejemplo *25/01/2026 14:30*",
            ),
            AppointmentStep::Review => PromptSpec::framed(
                format!(
                    "📋 *Resumen de tu cita:*\n\n\
                     📧 *Email:* {}\n\n\
                     👤 *Nombre:* {}\n\n\
                     💼 *Servicio:* {}\n\n\
                     📅 *Fecha:* {}\n\n\
                     ¿Deseas confirmar la cita?",
                    or_pending(fields.email.as_deref()),
                    or_pending(fields.contact_name.as_deref()),
                    or_pending(fields.service.as_deref()),
                    or_pending(
                        fields
                            .requested_at
                            .map(|at| short_datetime(at, self.offset))
                            .as_deref()
                    ),
                ),
                vec![
                    ChoiceOption::new(ChoiceId::ConfirmAppointment, "✅ Confirmar cita"),
                    ChoiceOption::new(ChoiceId::Cancel, "❌ Cancelar"),
                ],
                "Confirmar Cita",
                "Te enviaremos un recordatorio antes de la cita",
            ),
        }
    }

    pub fn main_menu(&self) -> PromptSpec {
        PromptSpec::framed(
            "¡Bienvenido! 👋\n\nSoy tu asistente virtual de Digit Deck.\n\n¿En qué puedo ayudarte hoy?",
            vec![
                ChoiceOption::new(ChoiceId::StartQuotation, "💰 Cotización"),
                ChoiceOption::new(ChoiceId::StartAppointment, "📅 Agendar Cita"),
                ChoiceOption::new(ChoiceId::Info, "ℹ️ Información"),
            ],
            "Digit Deck",
            "Selecciona una opción del menú",
        )
    }

    pub fn info(&self) -> PromptSpec {
        PromptSpec::text(
            "📋 *Digit Deck - Información*\n\n\
             Somos una empresa especializada en soluciones digitales.\n\n\
             ✅ Desarrollo web\n\
             ✅ Aplicaciones móviles\n\
             ✅ Consultoría IT\n\
             ✅ Diseño gráfico",
        )
    }

    pub fn help(&self) -> PromptSpec {
        PromptSpec::text(
            "❓ *Ayuda*\n\n\
             Para solicitar una cotización, presiona el botón \"Cotización\" del menú principal.\n\n\
             Te haré algunas preguntas para entender tus necesidades y generaré un PDF personalizado.",
        )
    }

    pub fn next_steps(&self) -> PromptSpec {
        PromptSpec::choice(
            "¿Qué deseas hacer?",
            vec![
                ChoiceOption::new(ChoiceId::StartQuotation, "💰 Cotización"),
                ChoiceOption::new(ChoiceId::BackToMenu, "🏠 Menú principal"),
            ],
        )
    }

    pub fn session_expired(&self) -> PromptSpec {
        PromptSpec::text(
            "⚠️ *Sesión Expirada*\n\n\
             El servidor se reinició y tu sesión anterior fue cerrada.\n\n\
             No te preocupes, puedes continuar desde aquí. 👇",
        )
    }

    pub fn cancelled(&self, kind: Option<FlowKind>) -> PromptSpec {
        PromptSpec::text(match kind {
            Some(FlowKind::Quotation) => "❌ Cotización cancelada.",
            Some(FlowKind::Appointment) => "❌ Cita cancelada.",
            None => "❌ Operación cancelada.",
        })
    }

    /// Error notice plus a menu whose first button restarts the same flow.
    pub fn recovery(&self, kind: FlowKind, reason: &str) -> Vec<PromptSpec> {
        let retry = match kind {
            FlowKind::Quotation => {
                ChoiceOption::new(ChoiceId::StartQuotation, "💰 Nueva cotización")
            }
            FlowKind::Appointment => {
                ChoiceOption::new(ChoiceId::StartAppointment, "📅 Reintentar cita")
            }
        };
        vec![
            PromptSpec::text(format!("⚠️ *{reason}*\n\nNo te preocupes, puedes reintentar:")),
            PromptSpec::choice(
                "Selecciona una opción para continuar:",
                vec![retry, ChoiceOption::new(ChoiceId::BackToMenu, "🏠 Menú principal")],
            ),
        ]
    }

    pub fn proposal_delivered(&self) -> PromptSpec {
        PromptSpec::text(
            "✅ *¡Cotización generada exitosamente!*\n\n\
             Te he enviado tu cotización en formato PDF.\n\n\
             ¿Necesitas algo más?",
        )
    }

    pub fn appointment_booked(&self, id: i64) -> PromptSpec {
        PromptSpec::text(format!(
            "✅ *¡Cita agendada exitosamente!*\n\n\
             🆔 ID de cita: #{id}\n\n\
             Te enviaremos un recordatorio por este medio antes de la cita."
        ))
    }

    pub fn after_completion(&self, kind: FlowKind) -> PromptSpec {
        let again = match kind {
            FlowKind::Quotation => ChoiceOption::new(ChoiceId::NewQuotation, "🔄 Nueva cotización"),
            FlowKind::Appointment => ChoiceOption::new(ChoiceId::StartQuotation, "💰 Cotización"),
        };
        PromptSpec::choice(
            "¿Qué te gustaría hacer ahora?",
            vec![again, ChoiceOption::new(ChoiceId::BackToMenu, "🏠 Menú principal")],
        )
    }
}

fn or_pending(value: Option<&str>) -> &str {
    value.unwrap_or("(pendiente)")
}
