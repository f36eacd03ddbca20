//! Carga y gestión de configuración de la aplicación (servidor + LLM).

use std::{env, path::PathBuf, time::Duration};
use anyhow::{anyhow, Context, Result};
use tracing::warn;

/// Valor inseguro sólo admitido en desarrollo.
const DEV_SECRET_KEY: &str = "dev-key-change-in-production";

#[derive(Clone, Debug, PartialEq)]
pub enum LlmProvider {
    Gemini,
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }

    /// Variable de entorno que contiene la credencial del proveedor.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Self::Gemini => "GOOGLE_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }

    pub fn default_chat_model(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini-1.5-flash",
            Self::OpenAI => "gpt-4o-mini",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(anyhow!("APP_ENV no reconocido: {other}")),
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub app_env: AppEnv,
    /// Reservada para firmar sesiones; se valida al arrancar.
    #[allow(dead_code)]
    pub secret_key: String,
    pub frontend_dir: PathBuf,
    pub open_browser: bool,

    pub llm_provider: LlmProvider,
    pub llm_api_key: String,
    pub llm_chat_model: String,
    pub llm_timeout: Duration,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de claves.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:5000".to_string());

        let app_env = AppEnv::from_str(
            &lookup("APP_ENV").unwrap_or_else(|| "development".to_string()),
        )?;

        let secret_key = match (lookup("SECRET_KEY"), &app_env) {
            (Some(key), _) if !key.is_empty() => key,
            (_, AppEnv::Development) => {
                warn!("SECRET_KEY no definida; usando la clave insegura de desarrollo.");
                DEV_SECRET_KEY.to_string()
            }
            (_, AppEnv::Production) => {
                return Err(anyhow!("Falta SECRET_KEY en el entorno (obligatoria en producción)"));
            }
        };

        let llm_provider_str = lookup("LLM_PROVIDER").unwrap_or_else(|| "gemini".to_string());
        let llm_provider = LlmProvider::from_str(&llm_provider_str)?;

        let key_var = llm_provider.api_key_var();
        let llm_api_key = lookup(key_var)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("{key_var} no está configurada en el entorno"))?;

        let llm_chat_model = lookup("LLM_CHAT_MODEL")
            .unwrap_or_else(|| llm_provider.default_chat_model().to_string());

        let timeout_secs = match lookup("LLM_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("LLM_TIMEOUT_SECS inválido: {raw}"))?,
            None => 30,
        };

        let frontend_dir = PathBuf::from(lookup("FRONTEND_DIR").unwrap_or_else(|| "frontend".to_string()));

        let open_browser = match lookup("OPEN_BROWSER") {
            Some(raw) => matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes"),
            None => app_env == AppEnv::Development,
        };

        Ok(Self {
            server_addr,
            app_env,
            secret_key,
            frontend_dir,
            open_browser,
            llm_provider,
            llm_api_key,
            llm_chat_model,
            llm_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_gemini_in_development() {
        let cfg = load(&[("GOOGLE_API_KEY", "abc")]).unwrap();
        assert_eq!(cfg.llm_provider, LlmProvider::Gemini);
        assert_eq!(cfg.app_env, AppEnv::Development);
        assert_eq!(cfg.secret_key, DEV_SECRET_KEY);
        assert_eq!(cfg.llm_chat_model, "gemini-1.5-flash");
        assert_eq!(cfg.llm_timeout, Duration::from_secs(30));
        assert!(cfg.open_browser);
    }

    #[test]
    fn missing_credential_is_fatal() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));

        let err = load(&[("LLM_PROVIDER", "openai"), ("GOOGLE_API_KEY", "abc")]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn production_requires_secret_key() {
        let err = load(&[("GOOGLE_API_KEY", "abc"), ("APP_ENV", "production")]).unwrap_err();
        assert!(err.to_string().contains("SECRET_KEY"));

        let cfg = load(&[
            ("GOOGLE_API_KEY", "abc"),
            ("APP_ENV", "production"),
            ("SECRET_KEY", "s3cr3t"),
        ])
        .unwrap();
        assert_eq!(cfg.secret_key, "s3cr3t");
        assert!(!cfg.open_browser);
    }

    #[test]
    fn rejects_bad_timeout_and_provider() {
        assert!(load(&[("GOOGLE_API_KEY", "abc"), ("LLM_TIMEOUT_SECS", "soon")]).is_err());
        assert!(load(&[("GOOGLE_API_KEY", "abc"), ("LLM_PROVIDER", "ollama")]).is_err());
    }
}
