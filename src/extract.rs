//! Extracción de texto plano de los documentos subidos (TXT, DOCX, PDF, imagen).
//!
//! La extracción nunca falla hacia fuera: cualquier error se registra y se
//! devuelve una cadena vacía, que el llamador interpreta como "no detectado".

use std::{fs, panic, path::Path};

use anyhow::{anyhow, Result};
use tracing::{info, warn};

/// Extensiones admitidas, en minúsculas y con punto.
pub const ALLOWED_EXTENSIONS: [&str; 8] =
    [".txt", ".docx", ".pdf", ".jpg", ".jpeg", ".png", ".bmp", ".tiff"];

pub const OCR_UNAVAILABLE: &str =
    "OCR no disponible - El procesamiento de imágenes aún no está soportado";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Word,
    Pdf,
    Image,
}

impl DocumentKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "txt" => Some(Self::PlainText),
            "docx" => Some(Self::Word),
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" | "png" | "bmp" | "tiff" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Devuelve la extensión permitida con la que termina el nombre, si la hay.
pub fn allowed_extension(filename: &str) -> Option<&'static str> {
    let lower = filename.to_lowercase();
    ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|ext| lower.ends_with(ext))
}

/// Extrae el texto del fichero en `path` según la extensión declarada.
pub fn extract_text(path: &Path, extension: &str) -> String {
    let Some(kind) = DocumentKind::from_extension(extension) else {
        warn!("Formato no soportado ('{}'): {}", extension, path.display());
        return String::new();
    };

    match read_document(path, kind) {
        Ok(text) => {
            let text = text.trim().to_string();
            info!("Texto extraído de {}: {} caracteres", path.display(), text.chars().count());
            text
        }
        Err(e) => {
            warn!("Error extrayendo texto de {}: {}", path.display(), e);
            String::new()
        }
    }
}

fn read_document(path: &Path, kind: DocumentKind) -> Result<String> {
    match kind {
        DocumentKind::PlainText => read_plain_text(path),
        DocumentKind::Word => read_docx(path),
        DocumentKind::Pdf => read_pdf(path),
        DocumentKind::Image => {
            info!("Procesando imagen: {}", path.display());
            Ok(OCR_UNAVAILABLE.to_string())
        }
    }
}

/// UTF-8 descartando los bytes que no se pueden decodificar.
fn read_plain_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(bytes.utf8_chunks().map(|chunk| chunk.valid()).collect())
}

/// Párrafos del cuerpo del documento unidos por saltos de línea.
fn read_docx(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    let docx = docx_rs::read_docx(&bytes).map_err(|e| anyhow!("DOCX inválido: {e}"))?;

    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            docx_rs::DocumentChild::Paragraph(para) => Some(paragraph_text(para)),
            _ => None,
        })
        .collect();

    Ok(paragraphs.join("\n"))
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    para.children
        .iter()
        .filter_map(|pc| match pc {
            docx_rs::ParagraphChild::Run(run) => Some(
                run.children
                    .iter()
                    .filter_map(|rc| match rc {
                        docx_rs::RunChild::Text(t) => Some(t.text.as_str()),
                        _ => None,
                    })
                    .collect::<String>(),
            ),
            _ => None,
        })
        .collect()
}

/// Texto de cada página unido por saltos de línea.
fn read_pdf(path: &Path) -> Result<String> {
    // pdf-extract entra en pánico con algunos PDF corruptos.
    let pages = panic::catch_unwind(|| pdf_extract::extract_text_by_pages(path))
        .map_err(|_| anyhow!("pdf-extract abortó procesando el documento"))?
        .map_err(|e| anyhow!("PDF inválido: {e}"))?;
    Ok(pages.join("\n"))
}
