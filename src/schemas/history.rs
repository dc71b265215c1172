use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::exam::result::TestResult;
use crate::history::analytics::HistorySummary;

pub(crate) const DEFAULT_RECENT_RESULTS: usize = 5;

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct SummaryQuery {
    #[validate(range(min = 1, max = 100, message = "recent must be between 1 and 100"))]
    pub(crate) recent: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistoryResponse {
    pub(crate) backend: &'static str,
    pub(crate) results: Vec<TestResult>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SummaryResponse {
    #[serde(flatten)]
    pub(crate) summary: HistorySummary,
    pub(crate) recent: Vec<TestResult>,
}
