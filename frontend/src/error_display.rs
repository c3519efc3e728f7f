use crate::api::ApiError;
use revision_range::HistoryError;
use zoon::*;

/// Small non-blocking error shown in place of the content it concerns.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineError {
    pub title: String,
    pub message: String,
    pub technical_error: String, // Raw technical error for console logging
}

impl InlineError {
    pub fn new_visualization_error(error: String) -> Self {
        Self {
            title: "Comparison unavailable".to_string(),
            message: make_error_user_friendly(&error),
            technical_error: format!("Visualization request failed: {}", error),
        }
    }

    pub fn new_history_error(title: &str, error: &ApiError) -> Self {
        Self {
            title: "Revision history unavailable".to_string(),
            message: make_error_user_friendly(&error.to_string()),
            technical_error: format!("Loading history of '{}' failed: {}", title, error),
        }
    }

    pub fn new_insufficient_history(title: &str, error: &HistoryError) -> Self {
        Self {
            title: "Nothing to compare".to_string(),
            message: error.user_message().to_string(),
            technical_error: format!("Selector not mounted for '{}': {}", title, error),
        }
    }

    pub fn new_clusters_error(date: &str, error: &ApiError) -> Self {
        Self {
            title: "Topics unavailable".to_string(),
            message: make_error_user_friendly(&error.to_string()),
            technical_error: format!("Loading clusters for {} failed: {}", date, error),
        }
    }

    pub fn new_summary_error(cluster_index: usize, error: &ApiError) -> Self {
        Self {
            title: "Summary unavailable".to_string(),
            message: make_error_user_friendly(&error.to_string()),
            technical_error: format!("Loading summary of cluster #{} failed: {}", cluster_index, error),
        }
    }

    /// Write the technical error to the browser console.
    pub fn log(&self) {
        zoon::eprintln!("{}", self.technical_error);
    }
}

pub fn make_error_user_friendly(error: &str) -> String {
    let error_lower = error.to_lowercase();

    if error_lower.contains("http 404") || error_lower.contains("not found") {
        "The requested data could not be found.".to_string()
    } else if error_lower.contains("http 5") {
        "The server could not process the request. Please try again later.".to_string()
    } else if error_lower.contains("network") || error_lower.contains("failed to fetch") {
        "Connection error. Please check your network connection.".to_string()
    } else if error_lower.contains("timeout") || error_lower.contains("timed out") {
        "The request timed out. Please try again.".to_string()
    } else if error_lower.contains("invalid response") {
        "The server sent an unexpected response.".to_string()
    } else {
        error.trim().to_string()
    }
}

pub fn inline_error_view(error: InlineError) -> impl Element {
    Column::new()
        .s(Gap::new().y(4))
        .s(Padding::new().x(12).y(8))
        .s(RoundedCorners::all(4))
        .s(Background::new().color("rgb(254, 242, 242)"))
        .s(Borders::new().left(Border::new().width(3).color("rgb(220, 38, 38)")))
        .s(Font::new().size(13).color("rgb(127, 29, 29)"))
        .update_raw_el(|raw_el| raw_el.attr("role", "alert"))
        .item(
            El::new()
                .s(Font::new().weight(FontWeight::SemiBold))
                .child(Text::new(error.title)),
        )
        .item(Text::new(error.message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_get_friendly_text() {
        assert_eq!(
            make_error_user_friendly("HTTP 404: Revision not found"),
            "The requested data could not be found."
        );
        assert_eq!(
            make_error_user_friendly("HTTP 500: Traceback ..."),
            "The server could not process the request. Please try again later."
        );
        assert_eq!(
            make_error_user_friendly("network error: Failed to fetch"),
            "Connection error. Please check your network connection."
        );
    }

    #[test]
    fn unknown_errors_are_kept_as_is() {
        assert_eq!(make_error_user_friendly("  diff too large \n"), "diff too large");
    }

    #[test]
    fn visualization_error_keeps_technical_text() {
        let error = InlineError::new_visualization_error("HTTP 500: boom".to_string());
        assert_eq!(error.technical_error, "Visualization request failed: HTTP 500: boom");
        assert!(error.message.starts_with("The server"));
    }

    #[test]
    fn insufficient_history_uses_history_message() {
        let error = InlineError::new_insufficient_history(
            "Berlin",
            &HistoryError::Insufficient {
                distinct_timestamps: 1,
            },
        );
        assert_eq!(error.message, HistoryError::Insufficient { distinct_timestamps: 1 }.user_message());
    }
}
