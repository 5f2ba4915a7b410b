// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image description through the vision provider.

use std::path::Path;

use base64::Engine;

use ragweave_core::error::RagError;
use ragweave_core::types::TokenUsage;

use crate::runtime::Runtime;

impl Runtime {
    /// Describes a base64-encoded image.
    pub async fn describe_image(
        &self,
        image_base64: &str,
        mime: &str,
        prompt: &str,
    ) -> Result<(String, TokenUsage), RagError> {
        let vision = self
            .vision
            .as_ref()
            .ok_or_else(|| RagError::MissingConfig("vision provider".into()))?;
        vision.describe(image_base64, mime, prompt).await
    }

    /// Reads an image file, infers its MIME type from the extension, and
    /// describes it.
    pub async fn describe_image_from_file(
        &self,
        path: &Path,
        prompt: &str,
    ) -> Result<(String, TokenUsage), RagError> {
        let mime = mime_from_extension(path)?;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| RagError::Transcription(format!("unable to read {}: {e}", path.display())))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.describe_image(&encoded, mime, prompt).await
    }
}

fn mime_from_extension(path: &Path) -> Result<&'static str, RagError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "gif" => Ok("image/gif"),
        "webp" => Ok("image/webp"),
        other => Err(RagError::UnsupportedMime(format!(
            "unsupported image extension: {other:?}"
        ))),
    }
}
