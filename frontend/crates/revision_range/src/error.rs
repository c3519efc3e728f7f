/// Reasons an article history cannot back a two-handle range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("article has no revision history")]
    Empty,
    #[error("article history needs at least two distinct revision timestamps, found {distinct_timestamps}")]
    Insufficient { distinct_timestamps: usize },
}

impl HistoryError {
    /// Text shown in place of the selector.
    pub fn user_message(&self) -> &'static str {
        match self {
            HistoryError::Empty => "No revision history available for this article.",
            HistoryError::Insufficient { .. } => {
                "All revisions of this article share one timestamp, so there is no range to compare."
            }
        }
    }
}
