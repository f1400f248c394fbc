mod common;

use chrono::Utc;
use common::{create_homework, due_in_days, fixture, register_student, register_teacher, seed_default_config};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tokio::sync::mpsc;
use tutorium_core::domain::{DomainError, MessageKind, StudentId};
use tutorium_server::entity::{message, student};
use tutorium_server::service::{ServiceError, StreamUpdate};

#[tokio::test]
async fn start_conversation_creates_single_greeting_message() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    let messages = message::Entity::find()
        .filter(message::Column::ConversationId.eq(started.conversation_id.to_string()))
        .all(&fx.db)
        .await
        .expect("query should succeed");

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, started.initial_message_id.to_string());
    assert_eq!(messages[0].kind, "ai");
    assert!(messages[0].content.contains("Section 1"));
    assert!(messages[0].content.contains("Vars"));
}

#[tokio::test]
async fn send_message_appends_student_then_ai() {
    let fx = fixture().await;
    seed_default_config(&fx).await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    let sent = fx
        .conversations
        .send_message(
            started.conversation_id,
            "What is a variable?".to_string(),
            MessageKind::Student,
        )
        .await
        .expect("send should succeed");

    let messages = message::Entity::find()
        .filter(message::Column::ConversationId.eq(started.conversation_id.to_string()))
        .order_by_asc(message::Column::Timestamp)
        .all(&fx.db)
        .await
        .expect("query should succeed");

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].kind, "student");
    assert_eq!(messages[1].content, "What is a variable?");
    assert_eq!(messages[2].kind, "ai");
    assert_eq!(messages[2].content, sent.ai_response);
}

#[tokio::test]
async fn failed_generation_keeps_the_student_message() {
    let fx = fixture().await;
    seed_default_config(&fx).await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    fx.provider.set_fail(true);

    let err = fx
        .conversations
        .send_message(
            started.conversation_id,
            "Still there?".to_string(),
            MessageKind::Student,
        )
        .await
        .expect_err("generation should fail");
    assert!(matches!(err, ServiceError::Llm(_)));

    let messages = message::Entity::find()
        .filter(message::Column::ConversationId.eq(started.conversation_id.to_string()))
        .order_by_asc(message::Column::Timestamp)
        .all(&fx.db)
        .await
        .expect("query should succeed");

    // Greeting plus the student's message; no AI reply.
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].kind, "student");
    assert_eq!(messages[1].content, "Still there?");
}

#[tokio::test]
async fn empty_message_content_is_rejected() {
    let fx = fixture().await;
    seed_default_config(&fx).await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    let err = fx
        .conversations
        .send_message(started.conversation_id, "   ".to_string(), MessageKind::Student)
        .await
        .expect_err("blank content should fail");

    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::EmptyMessageBody)
    ));
}

#[tokio::test]
async fn appending_messages_preserves_existing_order() {
    let fx = fixture().await;
    seed_default_config(&fx).await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    let mut snapshots: Vec<Vec<String>> = Vec::new();
    for prompt in ["first", "second", "third"] {
        fx.conversations
            .send_message(
                started.conversation_id,
                prompt.to_string(),
                MessageKind::Student,
            )
            .await
            .expect("send should succeed");

        let ids: Vec<String> = message::Entity::find()
            .filter(message::Column::ConversationId.eq(started.conversation_id.to_string()))
            .order_by_asc(message::Column::Timestamp)
            .all(&fx.db)
            .await
            .expect("query should succeed")
            .into_iter()
            .map(|m| m.id)
            .collect();
        snapshots.push(ids);
    }

    // Every earlier snapshot must be a prefix of every later one.
    for window in snapshots.windows(2) {
        assert_eq!(window[1][..window[0].len()], window[0][..]);
    }
}

#[tokio::test]
async fn prompt_carries_hidden_solution_and_transcript() {
    let fx = fixture().await;
    seed_default_config(&fx).await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(
        &fx,
        teacher_id,
        due_in_days(7),
        &[("Vars", 1, Some("x <- 42"))],
    )
    .await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    fx.conversations
        .send_message(
            started.conversation_id,
            "What is a variable?".to_string(),
            MessageKind::Student,
        )
        .await
        .expect("send should succeed");

    let request = fx
        .provider
        .last_request()
        .await
        .expect("provider should have been called");

    assert_eq!(request.model, "gpt-4o-mini");
    assert!(request.prompt.contains("x <- 42"));
    assert!(request.prompt.contains("Section Title: Vars"));
    // The greeting is part of the transcript.
    assert!(request.prompt.contains("AI Tutor: Hello!"));
    assert!(
        request
            .prompt
            .contains("Current Message - Student: What is a variable?")
    );
}

#[tokio::test]
async fn code_execution_records_code_and_result_pair() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    let recorded = fx
        .conversations
        .handle_code_execution(
            started.conversation_id,
            "1+1".to_string(),
            "2".to_string(),
            None,
        )
        .await
        .expect("code execution should record");

    assert!(!recorded.has_error);

    let messages = message::Entity::find()
        .filter(message::Column::ConversationId.eq(started.conversation_id.to_string()))
        .order_by_asc(message::Column::Timestamp)
        .all(&fx.db)
        .await
        .expect("query should succeed");

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].kind, "code");
    assert_eq!(messages[1].content, "1+1");
    assert_eq!(messages[2].kind, "code_result");
    assert!(messages[2].content.contains('2'));
}

#[tokio::test]
async fn failed_code_execution_records_system_notice() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    let recorded = fx
        .conversations
        .handle_code_execution(
            started.conversation_id,
            "stop(1)".to_string(),
            String::new(),
            Some("object not found".to_string()),
        )
        .await
        .expect("code execution should record");

    assert!(recorded.has_error);

    let messages = message::Entity::find()
        .filter(message::Column::ConversationId.eq(started.conversation_id.to_string()))
        .order_by_asc(message::Column::Timestamp)
        .all(&fx.db)
        .await
        .expect("query should succeed");

    assert_eq!(messages[2].kind, "system");
    assert_eq!(messages[2].content, "Error: object not found");
}

#[tokio::test]
async fn conversation_data_exposes_derived_booleans() {
    let fx = fixture().await;
    seed_default_config(&fx).await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");
    fx.conversations
        .send_message(
            started.conversation_id,
            "hello".to_string(),
            MessageKind::Student,
        )
        .await
        .expect("send should succeed");

    let data = fx
        .conversations
        .get_conversation_data(started.conversation_id)
        .await
        .expect("lookup should succeed")
        .expect("conversation should exist");

    assert_eq!(data.section_title, "Vars");
    assert_eq!(data.homework_title, "Intro");
    assert!(!data.role.is_teacher_test());
    assert!(data.can_submit);
    assert_eq!(data.messages.len(), 3);
    assert!(data.messages[0].is_from_ai);
    assert!(data.messages[1].is_from_student);
    assert!(!data.messages[1].is_from_ai);
}

#[tokio::test]
async fn teacher_conversations_are_test_runs_and_soft_deletable() {
    let fx = fixture().await;
    let (teacher_user, teacher_id) = register_teacher(&fx, "teacher").await;
    let created = create_homework(
        &fx,
        teacher_id,
        due_in_days(7),
        &[("Vars", 1, None), ("Loops", 2, None)],
    )
    .await;

    let first = fx
        .conversations
        .start_conversation(teacher_user, created.section_ids[0])
        .await
        .expect("conversation should start");
    let second = fx
        .conversations
        .start_conversation(teacher_user, created.section_ids[1])
        .await
        .expect("conversation should start");

    let listed = fx
        .conversations
        .get_teacher_test_conversations(teacher_user, None)
        .await
        .expect("listing should succeed");
    assert_eq!(listed.len(), 2);

    let filtered = fx
        .conversations
        .get_teacher_test_conversations(teacher_user, Some(created.section_ids[1]))
        .await
        .expect("listing should succeed");
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, second.conversation_id);

    fx.conversations
        .delete_teacher_test_conversation(first.conversation_id)
        .await
        .expect("soft delete should succeed");

    let listed = fx
        .conversations
        .get_teacher_test_conversations(teacher_user, None)
        .await
        .expect("listing should succeed");
    assert_eq!(listed.len(), 1);

    // The row is soft-deleted, not gone.
    let data = fx
        .conversations
        .get_conversation_data(first.conversation_id)
        .await
        .expect("lookup should succeed");
    assert!(data.is_some());
}

#[tokio::test]
async fn student_conversations_cannot_be_deleted() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    let err = fx
        .conversations
        .delete_teacher_test_conversation(started.conversation_id)
        .await
        .expect_err("student conversation should not delete");

    assert!(matches!(
        err,
        ServiceError::NotATeacherTestConversation(_)
    ));
}

#[tokio::test]
async fn dual_profile_user_is_rejected_at_start() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    // Force the invalid dual-profile state directly in storage.
    let (teacher_user, _) = register_teacher(&fx, "both").await;
    let now = Utc::now().naive_utc();
    student::ActiveModel {
        id: Set(StudentId::new().to_string()),
        user_id: Set(teacher_user.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&fx.db)
    .await
    .expect("student profile should insert");

    let err = fx
        .conversations
        .start_conversation(teacher_user, created.section_ids[0])
        .await
        .expect_err("dual profile should be rejected");

    assert!(matches!(
        err,
        ServiceError::Domain(DomainError::AmbiguousRole)
    ));
}

#[tokio::test]
async fn streaming_emits_ordered_events_and_persists() {
    let fx = fixture().await;
    seed_default_config(&fx).await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    let (tx, mut rx) = mpsc::channel::<StreamUpdate>(64);
    let sent = fx
        .conversations
        .send_message_streaming(
            started.conversation_id,
            "Stream it".to_string(),
            MessageKind::Student,
            tx,
        )
        .await
        .expect("streaming send should succeed");

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }

    assert!(matches!(updates.first(), Some(StreamUpdate::UserMessage { .. })));
    assert!(matches!(updates.get(1), Some(StreamUpdate::AiMessageStart { .. })));
    let token_text: String = updates
        .iter()
        .filter_map(|u| match u {
            StreamUpdate::AiToken { token, .. } => Some(token.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(token_text, sent.ai_response);
    match updates.last() {
        Some(StreamUpdate::AiMessageComplete { final_content, .. }) => {
            assert_eq!(final_content, &sent.ai_response);
        }
        other => panic!("expected AiMessageComplete last, got: {other:?}"),
    }

    // Exactly one start/complete pair.
    let starts = updates
        .iter()
        .filter(|u| matches!(u, StreamUpdate::AiMessageStart { .. }))
        .count();
    let completes = updates
        .iter()
        .filter(|u| matches!(u, StreamUpdate::AiMessageComplete { .. }))
        .count();
    assert_eq!((starts, completes), (1, 1));
}

#[tokio::test]
async fn disconnected_stream_still_persists_the_turn() {
    let fx = fixture().await;
    seed_default_config(&fx).await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student_user = register_student(&fx, "student").await;
    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let started = fx
        .conversations
        .start_conversation(student_user, created.section_ids[0])
        .await
        .expect("conversation should start");

    // Drop the receiver immediately, as a disconnecting client would.
    let (tx, rx) = mpsc::channel::<StreamUpdate>(64);
    drop(rx);

    fx.conversations
        .send_message_streaming(
            started.conversation_id,
            "Anyone listening?".to_string(),
            MessageKind::Student,
            tx,
        )
        .await
        .expect("streaming send should still succeed");

    let messages = message::Entity::find()
        .filter(message::Column::ConversationId.eq(started.conversation_id.to_string()))
        .order_by_asc(message::Column::Timestamp)
        .all(&fx.db)
        .await
        .expect("query should succeed");

    // Greeting, student message, full AI reply.
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[2].kind, "ai");
    assert!(!messages[2].content.is_empty());
}
