use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DomainError {
    #[error("invalid section order: {0}. order must be in [1, 20]")]
    InvalidSectionOrder(u8),

    #[error("invalid temperature: {0}. temperature must be in [0.0, 2.0]")]
    InvalidTemperature(f64),

    #[error("message content must not be empty")]
    EmptyMessageBody,

    #[error("user has both a teacher and a student profile")]
    AmbiguousRole,
}
