use async_trait::async_trait;
use tracing::{debug, error};

use crate::ingest::prompts::RESUME_EXTRACTION_SYSTEM;
use crate::ingest::{IngestError, MediaType};
use crate::llm_client::{DocumentSource, LlmClient, LlmError};

/// External service that turns a raw document into a textual record.
///
/// The returned text is only *supposed* to be JSON; callers unwrap and
/// validate it themselves.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        document: &[u8],
        media_type: MediaType,
        instruction: &str,
    ) -> Result<String, IngestError>;
}

#[async_trait]
impl Extractor for LlmClient {
    async fn extract(
        &self,
        document: &[u8],
        media_type: MediaType,
        instruction: &str,
    ) -> Result<String, IngestError> {
        let source = match media_type {
            MediaType::Pdf => DocumentSource::base64(media_type.as_str(), document),
            MediaType::PlainText => DocumentSource::text(
                std::str::from_utf8(document)
                    .map_err(|e| IngestError::InvalidInput(e.to_string()))?,
            ),
        };

        let response = self
            .call_with_document(source, instruction, RESUME_EXTRACTION_SYSTEM)
            .await
            .map_err(|e| {
                error!("Resume extraction failed: {e}");
                IngestError::Extractor(e.to_string())
            })?;

        let text = response
            .text()
            .ok_or_else(|| IngestError::Extractor(LlmError::EmptyContent.to_string()))?;
        debug!("Extractor returned {} bytes", text.len());
        Ok(text.to_string())
    }
}
