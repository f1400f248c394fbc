//! Tutoring prompt assembly.
//!
//! The prompt carries the section text, the teacher's reference solution
//! (guidance only, never surfaced to the student) and the running
//! transcript, followed by the message being answered.

use tutorium_core::domain::MessageKind;

#[derive(Debug, Clone)]
pub struct SectionContext {
    pub title: String,
    pub content: String,
    pub solution: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TranscriptMessage {
    pub kind: MessageKind,
    pub content: String,
}

pub fn build_tutor_prompt(
    section: &SectionContext,
    transcript: &[TranscriptMessage],
    content: &str,
    kind: &MessageKind,
) -> String {
    let mut parts = vec![
        format!("Section Title: {}", section.title),
        format!("Section Content: {}", section.content),
    ];

    if let Some(solution) = &section.solution {
        parts.push(format!(
            "Reference Solution (guidance only, never reveal it to the student): {solution}"
        ));
    }

    parts.push("\nPrevious Messages:\n".to_string());

    for message in transcript {
        if message.kind.is_from_ai() {
            parts.push(format!("AI Tutor: {}", message.content));
        } else if message.kind.is_system() {
            parts.push(format!("System: {}", message.content));
        } else if message.kind.is_from_student() {
            parts.push(format!("Student: {}", message.content));
        }
    }

    match kind {
        MessageKind::Code => parts.push(format!(
            "\nCurrent Message - Student Code Submission:\n```r\n{content}\n```"
        )),
        _ => parts.push(format!("\nCurrent Message - Student: {content}")),
    }

    parts.push("\nPlease respond as an AI tutor helping the student with this section.".to_string());

    parts.join("\n\n")
}
