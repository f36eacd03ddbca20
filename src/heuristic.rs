//! Análisis heurístico de respaldo cuando el LLM no está disponible o falla.
//!
//! Parte de un 50% y suma penalizaciones fijas por texto corto, pocos puntos,
//! vocabulario limitado y repetición. Es determinista y sin efectos laterales.

use crate::models::{Report, TextStats};

pub const FALLBACK_MESSAGE: &str = "Análisis automático (fallback)";

const BASE_PERCENTAGE: u32 = 50;

pub fn fallback_questions() -> Vec<String> {
    [
        "¿Puedes explicar el tema principal con tus propias palabras?",
        "Dame un ejemplo relacionado con tu entorno.",
        "¿Qué parte te costó más entender de este trabajo?",
    ]
    .iter()
    .map(|q| q.to_string())
    .collect()
}

/// Indicador descriptivo (sin puntuación) según el nivel educativo.
fn level_indicator(level: &str) -> String {
    match level {
        "basica-1-4" | "basica-5-8" => format!("Análisis básico para nivel {level}"),
        "medio-1-2" | "medio-3-4" => "Análisis para educación media".to_string(),
        _ => "Análisis automático básico".to_string(),
    }
}

pub fn fallback_report(text: &str, level: &str) -> Report {
    let stats = TextStats::from_text(text);
    let mut indicators = Vec::new();
    let mut percentage = BASE_PERCENTAGE;

    if stats.length < 100 {
        indicators.push("Texto muy corto".to_string());
        percentage += 20;
    }

    if text.matches('.').count() < 3 {
        indicators.push("Pocos puntos (posible copia)".to_string());
        percentage += 15;
    }

    if stats.unique_words < 15 {
        indicators.push("Vocabulario limitado".to_string());
        percentage += 15;
    }

    if stats.total_words > 10 {
        let ratio = stats.unique_words as f64 / stats.total_words as f64;
        if ratio < 0.6 {
            indicators.push("Mucha repetición de palabras".to_string());
            percentage += 20;
        }
    }

    indicators.push(level_indicator(level));

    Report::scored(
        percentage,
        indicators,
        fallback_questions(),
        level,
        stats,
        false,
        FALLBACK_MESSAGE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_VARIED: &str = "El ciclo del agua describe cómo el agua se mueve por el planeta. \
        Primero se evapora desde océanos y lagos gracias al calor del sol. \
        Luego el vapor se condensa formando nubes en la atmósfera. \
        Finalmente cae como lluvia o nieve y vuelve a los ríos.";

    #[test]
    fn is_deterministic() {
        for text in ["", "Hola.", LONG_VARIED, "a a a a a a a a a a a a"] {
            assert_eq!(fallback_report(text, "superior"), fallback_report(text, "superior"));
        }
    }

    #[test]
    fn short_text_accumulates_penalties() {
        let report = fallback_report("Hola. Esto es una prueba. Adiós.", "basica-1-4");
        // corto (+20) y vocabulario limitado (+15); tiene tres puntos.
        assert_eq!(report.percentage, 85);
        assert_eq!(report.color, "red");
        assert_eq!(report.label, "Alto");
        assert_eq!(
            report.indicators,
            vec![
                "Texto muy corto",
                "Vocabulario limitado",
                "Análisis básico para nivel basica-1-4",
            ]
        );
        assert!(!report.analyzed_with_ai);
        assert_eq!(report.error_info, FALLBACK_MESSAGE);
    }

    #[test]
    fn percentage_is_clamped() {
        // corto, sin puntos, vocabulario limitado y repetición: 50+20+15+15+20.
        let report = fallback_report("la la la la la la la la la la la la", "superior");
        assert_eq!(report.percentage, 100);
        assert!(report.indicators.contains(&"Mucha repetición de palabras".to_string()));
    }

    #[test]
    fn varied_prose_stays_at_base() {
        let report = fallback_report(LONG_VARIED, "medio-1-2");
        assert_eq!(report.percentage, 50);
        assert_eq!(report.color, "yellow");
        assert_eq!(report.indicators, vec!["Análisis para educación media"]);
        assert_eq!(report.questions, fallback_questions());
        assert_eq!(report.education_level, "medio-1-2");
        assert!(report.vocabulary_density > 0.0 && report.vocabulary_density <= 100.0);
    }

    #[test]
    fn unknown_level_gets_generic_indicator() {
        let report = fallback_report(LONG_VARIED, "otro");
        assert_eq!(report.indicators.last().unwrap(), "Análisis automático básico");
    }
}
