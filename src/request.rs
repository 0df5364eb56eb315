use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Result, VideoError};

/// Parameters of one generation request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParameters {
    pub prompt: String,
    pub model: String,
    pub size: String,
    pub seconds: u32,
    pub image_path: Option<PathBuf>,
}

/// Text-to-video or image-to-video
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    Text,
    Image,
}

impl SubmissionMode {
    /// Label used in artifact file names
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionMode::Text => "text",
            SubmissionMode::Image => "image",
        }
    }
}

/// Reference image attached to an image-conditioned submission
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

/// Multipart submission before it is handed to the HTTP layer
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionForm {
    mode: SubmissionMode,
    fields: Vec<(&'static str, String)>,
    attachment: Option<Attachment>,
    image_fallback: Option<PathBuf>,
}

/// Form field the reference image is sent under
pub const IMAGE_FIELD: &str = "input_reference";

impl SubmissionForm {
    /// Build a submission from request parameters.
    ///
    /// A configured image path that does not exist falls back to a text-only
    /// submission with a warning.
    pub async fn build(params: &RequestParameters) -> Result<Self> {
        let fields = vec![
            ("prompt", params.prompt.clone()),
            ("model", params.model.clone()),
            ("size", params.size.clone()),
            ("seconds", params.seconds.to_string()),
        ];

        let mut image_fallback = None;
        let attachment = match params.image_path.as_deref() {
            Some(path) if path.exists() => Some(read_attachment(path).await?),
            Some(path) => {
                warn!(
                    "⚠️  Image path is set but the file does not exist: {}",
                    path.display()
                );
                warn!("    Falling back to text-to-video mode");
                image_fallback = Some(path.to_path_buf());
                None
            }
            None => None,
        };

        let mode = if attachment.is_some() {
            SubmissionMode::Image
        } else {
            SubmissionMode::Text
        };

        Ok(Self {
            mode,
            fields,
            attachment,
            image_fallback,
        })
    }

    pub fn mode(&self) -> SubmissionMode {
        self.mode
    }

    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Configured image that was missing, forcing text-to-video mode
    pub fn image_fallback(&self) -> Option<&Path> {
        self.image_fallback.as_deref()
    }

    /// Log the request the way it will be sent
    pub fn log_summary(&self) {
        match self.mode {
            SubmissionMode::Image => info!("📷 Mode: image-to-video"),
            SubmissionMode::Text => info!("📝 Mode: text-to-video"),
        }
        for (name, value) in &self.fields {
            info!("   - {}: {}", name, value);
        }
        if let Some(attachment) = &self.attachment {
            info!(
                "   - {}: {} ({}, {} bytes)",
                IMAGE_FIELD,
                attachment.file_name,
                attachment.mime_type,
                attachment.data.len()
            );
        }
    }

    /// Convert into a reqwest multipart form; reqwest supplies the boundary
    pub fn into_multipart(self) -> Result<reqwest::multipart::Form> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }

        if let Some(attachment) = self.attachment {
            let part = reqwest::multipart::Part::bytes(attachment.data)
                .file_name(attachment.file_name)
                .mime_str(attachment.mime_type)
                .map_err(|e| VideoError::Submission {
                    status: None,
                    message: format!("invalid attachment content type: {}", e),
                })?;
            form = form.part(IMAGE_FIELD, part);
        }

        Ok(form)
    }
}

async fn read_attachment(path: &Path) -> Result<Attachment> {
    let data = tokio::fs::read(path).await.map_err(|e| VideoError::Submission {
        status: None,
        message: format!("failed to read image {}: {}", path.display(), e),
    })?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    Ok(Attachment {
        file_name,
        mime_type: mime_type_for(path),
        data,
    })
}

/// Content type inferred from the file extension, defaulting to PNG
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "image/png",
    }
}
