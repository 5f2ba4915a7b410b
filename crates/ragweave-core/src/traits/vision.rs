// SPDX-FileCopyrightText: 2026 Ragweave Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vision provider capability trait.

use async_trait::async_trait;

use crate::error::RagError;
use crate::types::TokenUsage;

/// Capability interface for image-description providers.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Describes a base64-encoded image, steered by an optional prompt.
    async fn describe(
        &self,
        image_base64: &str,
        mime: &str,
        prompt: &str,
    ) -> Result<(String, TokenUsage), RagError>;
}
