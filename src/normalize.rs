//! Limpieza y transformación de la respuesta compacta del LLM al informe completo.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::{Report, TextStats};

pub const SUCCESS_MESSAGE: &str = "Análisis exitoso con IA";

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("la respuesta no es JSON válido: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("se esperaba un objeto JSON")]
    NotAnObject,
}

/// Respuesta compacta que se pide al LLM.
#[derive(Debug, Deserialize)]
struct CompactVerdict {
    #[serde(default, alias = "percentage")]
    porcentaje: Option<f64>,
    #[serde(default, alias = "indicators")]
    indicadores: Option<Vec<Value>>,
    #[serde(default, alias = "questions")]
    preguntas: Option<Vec<Value>>,
}

/// Los elementos que no son cadenas se conservan con su representación JSON.
fn into_strings(items: Option<Vec<Value>>) -> Vec<String> {
    items
        .unwrap_or_default()
        .into_iter()
        .map(|item| match item {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect()
}

/// Quita el bloque ```json, los espacios exteriores y los escapes literales.
pub fn clean_response(raw: &str) -> String {
    let mut cleaned = raw.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }

    cleaned.trim().replace("\\n", "\n").replace("\\t", "\t")
}

/// Convierte la respuesta ya limpia en un informe completo. Las estadísticas
/// salen del texto original, nunca de la salida del LLM.
pub fn expand(cleaned: &str, text: &str, level: &str) -> Result<Report, NormalizeError> {
    let value: Value = serde_json::from_str(cleaned)?;
    if !value.is_object() {
        return Err(NormalizeError::NotAnObject);
    }
    let verdict: CompactVerdict = serde_json::from_value(value)?;

    let percentage = verdict
        .porcentaje
        .map(|p| p.round().clamp(0.0, 100.0) as u32)
        .unwrap_or(50);

    Ok(Report::scored(
        percentage,
        into_strings(verdict.indicadores),
        into_strings(verdict.preguntas),
        level,
        TextStats::from_text(text),
        true,
        SUCCESS_MESSAGE,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence_and_escapes() {
        let raw = "```json\n{\"porcentaje\": 82,\\n\"indicadores\": []}\n```\n";
        assert_eq!(clean_response(raw), "{\"porcentaje\": 82,\n\"indicadores\": []}");
        assert_eq!(clean_response("  {\"a\":\\t1}  "), "{\"a\":\t1}");
        assert_eq!(clean_response(""), "");
    }

    #[test]
    fn expands_fenced_verdict() {
        let raw = "```json\n{\"porcentaje\": 82, \"indicadores\": [\"x\"], \"preguntas\": [\"y\"]}\n```";
        let text = "uno dos dos";
        let report = expand(&clean_response(raw), text, "superior").unwrap();
        assert_eq!(report.percentage, 82);
        assert_eq!(report.color, "red");
        assert_eq!(report.label, "Alto");
        assert_eq!(report.indicators, vec!["x"]);
        assert_eq!(report.questions, vec!["y"]);
        assert!(report.analyzed_with_ai);
        assert_eq!(report.filename, "");
        assert_eq!(report.error_info, SUCCESS_MESSAGE);
        assert_eq!(report.text_length, 11);
        assert_eq!(report.unique_words, 2);
        assert_eq!(report.vocabulary_density, 66.7);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let report = expand("{}", "hola", "superior").unwrap();
        assert_eq!(report.percentage, 50);
        assert_eq!(report.color, "yellow");
        assert!(report.indicators.is_empty());
        assert!(report.questions.is_empty());
    }

    #[test]
    fn accepts_english_keys_and_clamps() {
        let report = expand(r#"{"percentage": 140.4, "indicators": ["a"]}"#, "hola", "superior").unwrap();
        assert_eq!(report.percentage, 100);
        assert_eq!(report.indicators, vec!["a"]);

        let report = expand(r#"{"porcentaje": 12.6}"#, "hola", "superior").unwrap();
        assert_eq!(report.percentage, 13);
        assert_eq!(report.label, "Bajo");
    }

    #[test]
    fn non_string_items_are_kept() {
        let report = expand(
            r#"{"porcentaje": 60, "indicadores": [1, "x", true], "preguntas": [{"p": "y"}]}"#,
            "hola",
            "superior",
        )
        .unwrap();
        assert!(report.analyzed_with_ai);
        assert_eq!(report.indicators, vec!["1", "x", "true"]);
        assert_eq!(report.questions, vec![r#"{"p":"y"}"#]);
    }

    #[test]
    fn malformed_output_is_rejected() {
        assert!(matches!(expand("Porcentaje: 80%", "t", "x"), Err(NormalizeError::InvalidJson(_))));
        assert!(matches!(expand("[80, [], []]", "t", "x"), Err(NormalizeError::NotAnObject)));
        assert!(expand(r#"{"porcentaje": "alto"}"#, "t", "x").is_err());
        assert!(expand(r#"{"indicadores": "uno"}"#, "t", "x").is_err());
    }
}
