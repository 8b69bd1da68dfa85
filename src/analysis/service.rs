use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::GhostError;
use crate::models::{AnalysisResult, Channel};

/// One observation handed to the analysis service, with the context the
/// core has accumulated around it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisRequest {
    pub channel: Channel,
    pub text: Option<String>,
    /// Recent novel screen frames, oldest first.
    pub frames: Vec<Arc<Vec<u8>>>,
    pub context_summary: Option<String>,
    /// Client hints such as language, cursor line, url, shell, platform.
    pub metadata: BTreeMap<String, String>,
    /// Set when the content has stopped changing.
    pub stuck_hint: Option<String>,
}

/// Content/vision analysis collaborator. Implementations may be slow and may
/// fail; callers bound every call with `analyze_with_timeout`.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, GhostError>;
}

#[async_trait]
impl<S: AnalysisService + ?Sized> AnalysisService for Arc<S> {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, GhostError> {
        (**self).analyze(request).await
    }
}

pub async fn analyze_with_timeout(
    service: &dyn AnalysisService,
    request: &AnalysisRequest,
    timeout: Duration,
) -> Result<AnalysisResult, GhostError> {
    tokio::time::timeout(timeout, service.analyze(request))
        .await
        .map_err(|_| GhostError::AnalysisTimeout(timeout))?
}
