//! Abstracción sobre Rig para pedir al LLM la estimación de texto generado por IA.
//! Se soportan Gemini (por defecto) y OpenAI.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use rig::completion::{CompletionError, Prompt, PromptError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    config::{AppConfig, LlmProvider},
    models::EducationLevel,
};

/// Caracteres del texto que se incluyen en el prompt.
pub const PROMPT_TEXT_LIMIT: usize = 1500;

/// Valor de ejemplo del `.env` que cuenta como credencial no configurada.
const PLACEHOLDER_API_KEY: &str = "tu_api_key_aqui";

const SYSTEM_PROMPT: &str = r#"
Eres un asistente que ayuda a docentes a detectar trabajos escritos con IA.
Respondes únicamente con un objeto JSON compacto, sin explicaciones.
"#;

/// Clasificación de los fallos de la llamada al LLM. Es informativa: cualquier
/// variante provoca el análisis heurístico de respaldo.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmErrorKind {
    #[error("Texto vacío")]
    EmptyInput,
    #[error("API Key no configurada")]
    MissingCredential,
    #[error("El LLM devolvió una respuesta vacía")]
    EmptyResponse,
    #[error("Límite de velocidad alcanzado - Demasiadas requests por minuto")]
    RateLimited,
    #[error("Cuota de API alcanzada - Has excedido el límite de requests")]
    QuotaExceeded,
    #[error("API Key inválida - Verifica tu clave del proveedor")]
    InvalidCredential,
    #[error("No autorizado - API Key incorrecta o expirada")]
    Unauthorized,
    #[error("Error de conexión - Problema de red o internet")]
    Network,
    #[error("Timeout - La request tardó demasiado en responder")]
    Timeout,
    #[error("Error de formato JSON - Respuesta malformada del LLM")]
    MalformedJson,
    #[error("Modelo no disponible - Error con el modelo de IA")]
    ModelUnavailable,
    #[error("Error desconocido: {0}")]
    Unknown(String),
}

impl LlmErrorKind {
    /// Último recurso: clasifica a partir del texto del error.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();
        let has = |needle: &str| msg.contains(needle);

        if (has("rate") && has("limit")) || has("429") {
            Self::RateLimited
        } else if has("quota") || has("limit") {
            Self::QuotaExceeded
        } else if has("invalid") && has("key") {
            Self::InvalidCredential
        } else if has("unauthorized") || has("401") || has("403") {
            Self::Unauthorized
        } else if has("network") || has("connection") || has("dns") {
            Self::Network
        } else if has("timeout") || has("timed out") {
            Self::Timeout
        } else if has("json") {
            Self::MalformedJson
        } else if has("model") {
            Self::ModelUnavailable
        } else {
            Self::Unknown(message.to_string())
        }
    }

    pub fn from_prompt_error(err: &PromptError) -> Self {
        match err {
            PromptError::CompletionError(CompletionError::JsonError(_)) => Self::MalformedJson,
            other => Self::classify(&other.to_string()),
        }
    }
}

/// Cliente de completado de texto. Permite sustituir el proveedor real en tests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmErrorKind>;
}

/// Cliente real basado en Rig.
#[derive(Debug, Clone)]
pub struct RigLlmClient {
    pub provider: LlmProvider,
    pub api_key: String,
    pub chat_model: String,
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmErrorKind> {
        let result = match self.provider {
            LlmProvider::Gemini => self.complete_with_gemini(prompt).await,
            LlmProvider::OpenAI => self.complete_with_openai(prompt).await,
        };
        result.map_err(|e| {
            warn!("Error del proveedor {:?}: {}", self.provider, e);
            LlmErrorKind::from_prompt_error(&e)
        })
    }
}

impl RigLlmClient {
    async fn complete_with_gemini(&self, prompt: &str) -> Result<String, PromptError> {
        use rig::providers::gemini;
        // Trait para client.agent(...)
        use rig::client::CompletionClient as _;

        let client = gemini::Client::new(&self.api_key);
        let agent = client
            .agent(&self.chat_model)
            .preamble(SYSTEM_PROMPT)
            .build();

        agent.prompt(prompt).await
    }

    async fn complete_with_openai(&self, prompt: &str) -> Result<String, PromptError> {
        use rig::providers::openai;
        use rig::client::CompletionClient as _;

        let client = openai::Client::new(&self.api_key);
        let agent = client
            .agent(&self.chat_model)
            .preamble(SYSTEM_PROMPT)
            .build();

        agent.prompt(prompt).await
    }
}

/// Gestor del LLM: valida precondiciones, construye el prompt y aplica el plazo.
#[derive(Clone)]
pub struct LlmManager {
    client: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración. Una credencial de
    /// ejemplo deja el manager sin cliente.
    pub fn from_config(cfg: &AppConfig) -> Self {
        let key = cfg.llm_api_key.trim();
        let client: Option<Arc<dyn LlmClient>> = if key.is_empty() || key == PLACEHOLDER_API_KEY {
            warn!("API Key del LLM no configurada; se usará sólo el análisis heurístico.");
            None
        } else {
            Some(Arc::new(RigLlmClient {
                provider: cfg.llm_provider.clone(),
                api_key: key.to_string(),
                chat_model: cfg.llm_chat_model.clone(),
            }))
        };

        Self::new(client, cfg.llm_timeout)
    }

    pub fn new(client: Option<Arc<dyn LlmClient>>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Llama una sola vez al LLM y devuelve su texto en bruto.
    pub async fn call_llm(&self, text: &str, level: &str) -> Result<String, LlmErrorKind> {
        if text.trim().is_empty() {
            return Err(LlmErrorKind::EmptyInput);
        }
        let client = self.client.as_ref().ok_or(LlmErrorKind::MissingCredential)?;

        let prompt = build_prompt(text, level);
        info!(
            "🔍 Consultando al LLM ({} caracteres, nivel '{}')",
            text.chars().count(),
            EducationLevel::describe_tag(level)
        );

        let response = tokio::time::timeout(self.timeout, client.complete(&prompt))
            .await
            .map_err(|_| LlmErrorKind::Timeout)??;

        debug!("Respuesta completa del LLM: {:?}", response);

        if response.trim().is_empty() {
            return Err(LlmErrorKind::EmptyResponse);
        }
        Ok(response)
    }
}

/// Prompt con el nivel educativo y los primeros caracteres del texto.
pub fn build_prompt(text: &str, level: &str) -> String {
    let level_desc = EducationLevel::describe_tag(level);
    let excerpt: String = text.chars().take(PROMPT_TEXT_LIMIT).collect();

    format!(
        r#"Analiza este texto de un estudiante de {level_desc} para detectar si fue creado con IA.

Devuelve SOLO un JSON simple con esta estructura:
{{
    "porcentaje": [0-100, donde 0=humano, 100=IA],
    "indicadores": ["indicador1", "indicador2", "indicador3"],
    "preguntas": ["pregunta1", "pregunta2", "pregunta3"]
}}

Indicadores de IA a buscar:
- Vocabulario muy avanzado para la edad
- Estructura demasiado perfecta
- Falta de errores típicos de la edad
- Repetición de patrones
- Complejidad sintáctica inusual

Indicadores de escritura humana:
- Errores gramaticales típicos de la edad
- Vocabulario apropiado para el nivel
- Expresiones personales
- Inconsistencias naturales

Las preguntas deben ayudar al docente a comprobar la autoría con un estudiante de {level_desc}, por ejemplo:
- "¿Puedes explicar con tus propias palabras?"
- "Dame un ejemplo relacionado con tu experiencia"
- "¿Qué opinión personal tienes?"

Texto: {excerpt}

JSON:"#
    )
}
