//! Modelos de dominio: el informe de análisis y sus tipos auxiliares.

use serde::Serialize;
use std::collections::HashSet;

/// Nivel de riesgo derivado del porcentaje.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Low,
    Medium,
    High,
}

impl Tier {
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            0..=49 => Self::Low,
            50..=74 => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Medium => "yellow",
            Self::High => "red",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Bajo",
            Self::Medium => "Medio",
            Self::High => "Alto",
        }
    }
}

/// Niveles educativos conocidos. El valor recibido del formulario se guarda
/// tal cual en el informe; esto sólo se usa para describirlo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EducationLevel {
    Basica1a4,
    Basica5a8,
    Medio1a2,
    Medio3a4,
    Superior,
}

impl EducationLevel {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "basica-1-4" => Some(Self::Basica1a4),
            "basica-5-8" => Some(Self::Basica5a8),
            "medio-1-2" => Some(Self::Medio1a2),
            "medio-3-4" => Some(Self::Medio3a4),
            "superior" => Some(Self::Superior),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Basica1a4 => "Educación Básica 1°-4° (7-10 años)",
            Self::Basica5a8 => "Educación Básica 5°-8° (11-14 años)",
            Self::Medio1a2 => "Educación Media 1°-2° (15-16 años)",
            Self::Medio3a4 => "Educación Media 3°-4° (17-18 años)",
            Self::Superior => "Educación Superior (18+ años)",
        }
    }

    /// Descripción para el prompt, con valor por defecto para etiquetas desconocidas.
    pub fn describe_tag(tag: &str) -> &'static str {
        Self::from_tag(tag)
            .map(|level| level.description())
            .unwrap_or("Nivel no especificado")
    }
}

/// Estadísticas calculadas siempre sobre el texto extraído del documento.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextStats {
    pub length: usize,
    pub unique_words: usize,
    pub total_words: usize,
    pub vocabulary_density: f64,
}

impl TextStats {
    pub fn from_text(text: &str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        let unique_words = words.iter().collect::<HashSet<_>>().len();
        let vocabulary_density = if words.is_empty() {
            0.0
        } else {
            let ratio = unique_words as f64 / words.len() as f64 * 100.0;
            (ratio * 10.0).round() / 10.0
        };

        Self {
            length: text.chars().count(),
            unique_words,
            total_words: words.len(),
            vocabulary_density,
        }
    }
}

/// Informe de análisis tal y como se devuelve al navegador.
///
/// `color` y `label` nunca se asignan a mano: salen de [`Tier`] en
/// [`Report::scored`], o del caso especial [`Report::not_detected`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    #[serde(rename = "porcentaje")]
    pub percentage: u32,
    pub color: String,
    pub label: String,
    #[serde(rename = "indicadores")]
    pub indicators: Vec<String>,
    #[serde(rename = "preguntas")]
    pub questions: Vec<String>,
    pub filename: String,
    #[serde(rename = "analizado_con_ia")]
    pub analyzed_with_ai: bool,
    #[serde(rename = "nivel_educativo")]
    pub education_level: String,
    pub error_info: String,
    #[serde(rename = "longitud_texto")]
    pub text_length: usize,
    #[serde(rename = "palabras_unicas")]
    pub unique_words: usize,
    #[serde(rename = "densidad_vocabulario")]
    pub vocabulary_density: f64,
}

pub const NOT_EXTRACTED_MESSAGE: &str = "No se pudo extraer texto del documento";

impl Report {
    /// Construye un informe puntuado; el porcentaje se acota a 0..=100.
    pub fn scored(
        percentage: u32,
        indicators: Vec<String>,
        questions: Vec<String>,
        education_level: &str,
        stats: TextStats,
        analyzed_with_ai: bool,
        error_info: impl Into<String>,
    ) -> Self {
        let percentage = percentage.min(100);
        let tier = Tier::from_percentage(percentage);
        Self {
            percentage,
            color: tier.color().to_string(),
            label: tier.label().to_string(),
            indicators,
            questions,
            filename: String::new(),
            analyzed_with_ai,
            education_level: education_level.to_string(),
            error_info: error_info.into(),
            text_length: stats.length,
            unique_words: stats.unique_words,
            vocabulary_density: stats.vocabulary_density,
        }
    }

    /// Informe para documentos de los que no se pudo extraer texto.
    pub fn not_detected(filename: &str, education_level: &str) -> Self {
        Self {
            percentage: 0,
            color: "gray".to_string(),
            label: "No detectado".to_string(),
            indicators: vec![NOT_EXTRACTED_MESSAGE.to_string()],
            questions: Vec::new(),
            filename: filename.to_string(),
            analyzed_with_ai: false,
            education_level: education_level.to_string(),
            error_info: NOT_EXTRACTED_MESSAGE.to_string(),
            text_length: 0,
            unique_words: 0,
            vocabulary_density: 0.0,
        }
    }
}
