use std::io::Write;

use anyhow::Context;
use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        DefaultBodyLimit, Json, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{analysis, app_state::AppState, extract, models::Report};

/// Tamaño máximo del documento subido.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Límite del cuerpo HTTP; holgado para que los ficheros grandes lleguen a la
/// validación y reciban su mensaje específico.
const BODY_LIMIT: usize = 2 * MAX_FILE_SIZE + 1024 * 1024;

// --- Errores de la API ---

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No se seleccionó ningún archivo")]
    NoFile,
    #[error("Por favor selecciona un nivel educativo")]
    NoLevel,
    #[error("Tipo de archivo no permitido. Use .txt, .docx, .pdf, .jpg, .jpeg, .png, .bmp o .tiff")]
    UnsupportedType,
    #[error("Archivo demasiado grande. Máximo 10MB")]
    TooLarge,
    #[error("Solicitud inválida: {0}")]
    BadRequest(String),
    #[error("Error procesando archivo")]
    Processing(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Processing(e) => {
                error!("Error procesando archivo: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            other => {
                warn!("Solicitud rechazada: {other}");
                StatusCode::BAD_REQUEST
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::TooLarge
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

// --- Formulario de subida ---

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
    size: usize,
}

#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    level: Option<String>,
}

impl UploadForm {
    /// Valida en orden: fichero, nivel, extensión y tamaño.
    fn validate(self) -> Result<(UploadedFile, String, &'static str), ApiError> {
        let file = self
            .file
            .filter(|f| !f.filename.is_empty())
            .ok_or(ApiError::NoFile)?;
        let level = self
            .level
            .filter(|l| !l.trim().is_empty())
            .ok_or(ApiError::NoLevel)?;
        let extension = extract::allowed_extension(&file.filename).ok_or(ApiError::UnsupportedType)?;
        if file.size > MAX_FILE_SIZE {
            return Err(ApiError::TooLarge);
        }
        Ok((file, level, extension))
    }
}

/// Lee los campos `file` y `nivel`. Del fichero sólo se guardan los bytes
/// hasta el tamaño máximo, pero se cuenta el total.
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mut bytes = Vec::new();
                let mut size = 0;
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    size += chunk.len();
                    if size <= MAX_FILE_SIZE {
                        bytes.extend_from_slice(&chunk);
                    }
                }
                info!("Archivo recibido: '{}' ({} bytes)", filename, size);
                form.file = Some(UploadedFile { filename, bytes, size });
            }
            Some("nivel") => {
                form.level = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    let frontend_dir = app_state.config.frontend_dir.clone();

    Router::new()
        .route_service("/", ServeFile::new(frontend_dir.join("index.html")))
        .route("/test", get(test_handler))
        .route("/analizar", post(analyze_handler))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(app_state)
        .fallback_service(ServeDir::new(frontend_dir))
}

// --- Handlers ---

#[axum::debug_handler]
async fn test_handler() -> Json<Value> {
    Json(json!({ "message": "Servidor funcionando correctamente" }))
}

#[axum::debug_handler]
async fn analyze_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Report>, ApiError> {
    let request_id = Uuid::new_v4();

    async move {
        let multipart = multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        let form = read_upload_form(multipart).await?;
        let (upload, level, extension) = form.validate()?;
        info!("Nivel educativo: {}", level);

        let report = process_upload(&state, upload, &level, extension).await?;
        Ok(Json(report))
    }
    .instrument(info_span!("analizar", %request_id))
    .await
}

/// Guarda el fichero en un temporal, extrae el texto y lo analiza. El
/// temporal se borra al salir de esta función por cualquier camino.
async fn process_upload(
    state: &AppState,
    upload: UploadedFile,
    level: &str,
    extension: &'static str,
) -> Result<Report, ApiError> {
    let staged = stage_upload(&upload.bytes, extension).map_err(ApiError::Processing)?;
    info!("Archivo temporal creado: {}", staged.path().display());

    let path = staged.path().to_path_buf();
    let text = tokio::task::spawn_blocking(move || extract::extract_text(&path, extension))
        .await
        .context("La extracción de texto terminó de forma inesperada")
        .map_err(ApiError::Processing)?;

    if let Err(e) = staged.close() {
        warn!("No se pudo eliminar el archivo temporal: {}", e);
    }

    if text.is_empty() {
        warn!("No se pudo extraer texto de '{}'", upload.filename);
        return Ok(Report::not_detected(&upload.filename, level));
    }

    let analysis = analysis::analyze(&state.llm_manager, &text, level).await;
    match analysis.degrade_reason() {
        None => info!("Análisis completado con IA: {}%", analysis.report().percentage),
        Some(reason) => warn!(
            "Análisis completado sin IA ({:?}): {}",
            reason,
            analysis.report().error_info
        ),
    }

    let mut report = analysis.into_report();
    report.filename = upload.filename;
    report.label = capitalize(&report.label);
    Ok(report)
}

fn stage_upload(bytes: &[u8], extension: &str) -> anyhow::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(extension)
        .tempfile()
        .context("No se pudo crear el archivo temporal")?;
    file.write_all(bytes)
        .and_then(|_| file.flush())
        .context("No se pudo escribir el archivo temporal")?;
    Ok(file)
}

/// Primera letra en mayúscula y el resto en minúscula.
fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
