/// Kind tag on a persisted message.
///
/// The recognized set is closed; strings outside it round-trip through
/// `Other` so rows written by newer deployments still load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Free text typed by the student.
    Student,
    /// Assistant reply.
    Ai,
    /// Code the student ran in the sandbox.
    Code,
    /// Captured output of a successful sandbox run.
    CodeResult,
    /// Uploaded file reference.
    FileUpload,
    /// Platform notice (greetings, sandbox errors).
    System,
    /// Unrecognized tag, preserved verbatim.
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Student => "student",
            Self::Ai => "ai",
            Self::Code => "code",
            Self::CodeResult => "code_result",
            Self::FileUpload => "file_upload",
            Self::System => "system",
            Self::Other(tag) => tag,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "student" => Self::Student,
            "ai" => Self::Ai,
            "code" => Self::Code,
            "code_result" => Self::CodeResult,
            "file_upload" => Self::FileUpload,
            "system" => Self::System,
            other => Self::Other(other.to_string()),
        }
    }

    /// Student-authored kinds: typed text, code runs and their captured
    /// output, uploads.
    pub fn is_from_student(&self) -> bool {
        matches!(
            self,
            Self::Student | Self::Code | Self::CodeResult | Self::FileUpload
        )
    }

    pub fn is_from_ai(&self) -> bool {
        matches!(self, Self::Ai)
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }
}

#[cfg(test)]
mod tests {
    use super::MessageKind;

    #[test]
    fn recognized_kinds_roundtrip_through_strings() {
        for kind in [
            MessageKind::Student,
            MessageKind::Ai,
            MessageKind::Code,
            MessageKind::CodeResult,
            MessageKind::FileUpload,
            MessageKind::System,
        ] {
            assert_eq!(MessageKind::parse(kind.as_str()), kind);
        }
    }

    #[test]
    fn unknown_kind_is_preserved() {
        let kind = MessageKind::parse("whiteboard");

        assert_eq!(kind, MessageKind::Other("whiteboard".to_string()));
        assert_eq!(kind.as_str(), "whiteboard");
    }

    #[test]
    fn student_side_classification() {
        assert!(MessageKind::Student.is_from_student());
        assert!(MessageKind::Code.is_from_student());
        assert!(MessageKind::CodeResult.is_from_student());
        assert!(MessageKind::FileUpload.is_from_student());
        assert!(!MessageKind::Ai.is_from_student());
        assert!(!MessageKind::System.is_from_student());
    }

    #[test]
    fn other_kind_matches_no_side() {
        let kind = MessageKind::Other("whiteboard".to_string());

        assert!(!kind.is_from_student());
        assert!(!kind.is_from_ai());
        assert!(!kind.is_system());
    }
}
