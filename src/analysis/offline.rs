use async_trait::async_trait;

use crate::error::GhostError;
use crate::models::AnalysisResult;

use super::service::{AnalysisRequest, AnalysisService};

/// Stand-in when no analysis backend is configured. Reports neutral activity
/// so tracking and gamification keep running.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineAnalyzer;

#[async_trait]
impl AnalysisService for OfflineAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, GhostError> {
        let app = request.channel.as_str();
        Ok(AnalysisResult {
            app: Some(app.to_string()),
            activity: Some("unknown".to_string()),
            context_summary: format!("User is using {app}"),
            ..Default::default()
        })
    }
}
