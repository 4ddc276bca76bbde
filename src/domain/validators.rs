/// Message surfaced on the form field when the text is empty.
pub const EMPTY_TEXT_MESSAGE: &str = "Пожалуйста, введите текст поста в форму.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Field-level invariant shared by post and comment text: the empty string
/// never validates, any other text does.
pub fn validate_not_empty(text: &str) -> Result<(), ValidationError> {
    if text.is_empty() {
        return Err(ValidationError {
            message: EMPTY_TEXT_MESSAGE.to_string(),
        });
    }
    Ok(())
}
