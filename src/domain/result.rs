//! Result type alias for pacemetrics

use super::errors::AnalyticsError;

/// Result type alias for engine operations
///
/// # Examples
///
/// ```
/// use pacemetrics::domain::result::Result;
/// use pacemetrics::domain::errors::AnalyticsError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(AnalyticsError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, AnalyticsError>;
