//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::state::poll::MAX_OPTION_CHARS;

/// Validates that every non-blank option label fits on a voting button.
///
/// Blank labels are accepted here because poll creation drops them.
///
/// # Examples
///
/// ```ignore
/// validate_option_labels(&["Paris".into(), "".into()]) // Ok
/// validate_option_labels(&["x".repeat(41)])           // Err - too long
/// ```
pub fn validate_option_labels(options: &[String]) -> Result<(), ValidationError> {
    if let Some((index, label)) = options
        .iter()
        .map(|label| label.trim())
        .enumerate()
        .find(|(_, label)| label.chars().count() > MAX_OPTION_CHARS)
    {
        let mut err = ValidationError::new("option_length");
        err.message = Some(
            format!(
                "Option {index} must be at most {MAX_OPTION_CHARS} characters (got {})",
                label.chars().count()
            )
            .into(),
        );
        return Err(err);
    }

    Ok(())
}
