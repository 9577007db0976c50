//! Data models for uploads and prediction results

pub mod result;
pub mod upload;

pub use result::{
    ChartPoint, ChartSeries, EnrichedResult, PieSlice, PredictionRecord, PreviewRow, ResultPayload,
    ResultState, Summary,
};
pub use upload::{UploadCandidate, UploadOutcome, ValidationReason};
