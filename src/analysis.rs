//! Orquestación del análisis de un texto.
//!
//! Flujo (lineal, sin reintentos):
//!   1. Texto vacío → análisis heurístico.
//!   2. Llamada única al LLM; si falla → análisis heurístico.
//!   3. Limpieza y transformación de la respuesta; si falla → análisis heurístico.
//!   4. Informe generado con IA.

use std::fmt;

use tracing::{info, warn};

use crate::{
    heuristic,
    llm::{LlmErrorKind, LlmManager},
    models::Report,
    normalize::{self, NormalizeError},
};

/// Motivo por el que se usó el análisis heurístico.
#[derive(Debug)]
pub enum DegradeReason {
    EmptyText,
    Provider(LlmErrorKind),
    Transform(NormalizeError),
}

impl fmt::Display for DegradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyText => write!(f, "Texto vacío"),
            Self::Provider(kind) => write!(f, "{kind}"),
            Self::Transform(err) => write!(f, "Error transformando respuesta: {err}"),
        }
    }
}

/// Resultado del análisis: siempre lleva un informe completo.
#[derive(Debug)]
pub enum Analysis {
    Succeeded(Report),
    Degraded { report: Report, reason: DegradeReason },
}

impl Analysis {
    fn degraded(text: &str, level: &str, reason: DegradeReason) -> Self {
        let mut report = heuristic::fallback_report(text, level);
        report.error_info = reason.to_string();
        Self::Degraded { report, reason }
    }

    /// Motivo de la degradación, si la hubo.
    pub fn degrade_reason(&self) -> Option<&DegradeReason> {
        match self {
            Self::Succeeded(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn analyzed_with_ai(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn report(&self) -> &Report {
        match self {
            Self::Succeeded(report) | Self::Degraded { report, .. } => report,
        }
    }

    pub fn into_report(self) -> Report {
        match self {
            Self::Succeeded(report) | Self::Degraded { report, .. } => report,
        }
    }
}

/// Analiza el texto con el LLM y recurre a la heurística ante cualquier fallo.
pub async fn analyze(llm: &LlmManager, text: &str, level: &str) -> Analysis {
    if text.trim().is_empty() {
        return Analysis::degraded(text, level, DegradeReason::EmptyText);
    }

    let raw = match llm.call_llm(text, level).await {
        Ok(raw) => raw,
        Err(kind) => {
            warn!("🔍 LLM no disponible ({kind}); usando análisis heurístico.");
            return Analysis::degraded(text, level, DegradeReason::Provider(kind));
        }
    };

    let cleaned = normalize::clean_response(&raw);
    match normalize::expand(&cleaned, text, level) {
        Ok(report) => {
            info!("✅ Análisis con IA completado: {}%", report.percentage);
            Analysis::Succeeded(report)
        }
        Err(err) => {
            warn!("Error transformando respuesta del LLM: {err}. Respuesta limpia: {cleaned:?}");
            Analysis::degraded(text, level, DegradeReason::Transform(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tests::manager_with;
    use std::time::Duration;

    fn assert_populated(report: &Report) {
        assert!(report.percentage <= 100);
        assert!(!report.color.is_empty());
        assert!(!report.label.is_empty());
        assert!(!report.error_info.is_empty());
        assert!(!report.education_level.is_empty());
        assert!((0.0..=100.0).contains(&report.vocabulary_density));
    }

    #[test]
    fn empty_and_blank_text_degrade() {
        let llm = manager_with(Ok("{\"porcentaje\": 10}".to_string()));
        for text in ["", "   \n\t"] {
            let analysis = tokio_test::block_on(analyze(&llm, text, "superior"));
            assert!(!analysis.analyzed_with_ai());
            assert!(matches!(analysis, Analysis::Degraded { reason: DegradeReason::EmptyText, .. }));
            assert_eq!(analysis.report().error_info, "Texto vacío");
            assert_populated(analysis.report());
        }
    }

    #[tokio::test]
    async fn missing_credential_degrades_with_reason() {
        let llm = LlmManager::new(None, Duration::from_secs(1));
        let analysis = analyze(&llm, "Hola. Esto es una prueba. Adiós.", "basica-1-4").await;
        assert!(matches!(
            analysis.degrade_reason(),
            Some(DegradeReason::Provider(LlmErrorKind::MissingCredential))
        ));
        let report = analysis.report();
        assert!(!report.analyzed_with_ai);
        assert_eq!(report.error_info, "API Key no configurada");
        assert!(report.percentage >= 50);
        assert_populated(report);
    }

    #[tokio::test]
    async fn provider_error_degrades_with_classified_message() {
        let llm = manager_with(Err(LlmErrorKind::RateLimited));
        let analysis = analyze(&llm, "Un texto normal con varias palabras.", "superior").await;
        assert!(matches!(
            &analysis,
            Analysis::Degraded { reason: DegradeReason::Provider(LlmErrorKind::RateLimited), .. }
        ));
        assert_eq!(
            analysis.report().error_info,
            LlmErrorKind::RateLimited.to_string()
        );
    }

    #[tokio::test]
    async fn malformed_model_output_degrades() {
        let llm = manager_with(Ok("Porcentaje estimado: 80%".to_string()));
        let text = "Una redacción cualquiera sobre las vacaciones de verano.";
        let analysis = analyze(&llm, text, "medio-1-2").await;
        assert!(!analysis.analyzed_with_ai());
        let report = analysis.into_report();
        assert!(report.error_info.starts_with("Error transformando respuesta"));
        assert_eq!(report.questions, heuristic::fallback_questions());
        assert_populated(&report);
    }

    #[tokio::test]
    async fn fenced_verdict_succeeds() {
        let llm = manager_with(Ok(
            "```json\n{\"porcentaje\": 82, \"indicadores\": [\"x\"], \"preguntas\": [\"y\"]}\n```".to_string(),
        ));
        let analysis = analyze(&llm, "Texto del estudiante.", "superior").await;
        assert!(analysis.analyzed_with_ai());
        assert!(analysis.degrade_reason().is_none());
        let report = analysis.into_report();
        assert_eq!(report.percentage, 82);
        assert_eq!((report.color.as_str(), report.label.as_str()), ("red", "Alto"));
        assert_eq!(report.error_info, normalize::SUCCESS_MESSAGE);
        assert_eq!(report.text_length, "Texto del estudiante.".chars().count());
        assert_populated(&report);
    }
}
