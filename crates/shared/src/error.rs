use serde::{Deserialize, Serialize};

pub const COMMUNICATION_ERROR: &str =
    "There was an error communicating with our system. Please try again.";
pub const UNSPECIFIED_REJECTION: &str =
    "We could not process your request. Please check your details and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// One or more named fields were rejected.
    Validation,
    /// The server refused the step as a whole (sold out, card declined, ...).
    Business,
    /// No usable response came back.
    Transport,
}

/// Field name to message, in the order the server reported them.
pub type FieldErrors = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_errors: FieldErrors,
}

impl StepFailure {
    pub fn transport() -> Self {
        Self {
            kind: FailureKind::Transport,
            message: COMMUNICATION_ERROR.to_string(),
            field_errors: Vec::new(),
        }
    }

    pub fn business(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Business,
            message: message.into(),
            field_errors: Vec::new(),
        }
    }

    /// The first field error wins the headline, matching what the form shows
    /// next to the field that gets focus.
    pub fn validation(field_errors: FieldErrors, fallback: Option<String>) -> Self {
        let message = field_errors
            .first()
            .map(|(_, message)| message.clone())
            .or(fallback)
            .unwrap_or_else(|| COMMUNICATION_ERROR.to_string());
        Self {
            kind: FailureKind::Validation,
            message,
            field_errors,
        }
    }

    pub fn first_field(&self) -> Option<&str> {
        self.field_errors.first().map(|(field, _)| field.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_headline_uses_first_field_message() {
        let failure = StepFailure::validation(
            vec![
                ("email".into(), "Enter a valid email address.".into()),
                ("phone".into(), "Required.".into()),
            ],
            Some("Please fix the highlighted fields.".into()),
        );
        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(failure.message, "Enter a valid email address.");
        assert_eq!(failure.first_field(), Some("email"));
    }

    #[test]
    fn validation_without_fields_falls_back() {
        let failure = StepFailure::validation(Vec::new(), None);
        assert_eq!(failure.message, COMMUNICATION_ERROR);
        assert_eq!(failure.first_field(), None);
    }
}
