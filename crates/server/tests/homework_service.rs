mod common;

use common::{create_homework, due_in_days, fixture, register_student, register_teacher};
use sea_orm::EntityTrait;
use tutorium_core::domain::SectionStatus;
use tutorium_server::entity::{homework, section};
use tutorium_server::service::{HomeworkUpdate, NewHomework, NewSection, ServiceError};

#[tokio::test]
async fn create_homework_with_sections_returns_ids_in_order() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;

    let created = create_homework(
        &fx,
        teacher_id,
        due_in_days(7),
        &[("Vars", 1, None), ("Loops", 2, None)],
    )
    .await;

    assert_eq!(created.section_ids.len(), 2);

    let detail = fx
        .homeworks
        .get_homework_with_sections(created.homework_id)
        .await
        .expect("lookup should succeed")
        .expect("homework should exist");

    assert_eq!(detail.title, "Intro");
    assert_eq!(detail.sections.len(), 2);
    assert_eq!(detail.sections[0].title, "Vars");
    assert_eq!(detail.sections[0].order.value(), 1);
    assert_eq!(detail.sections[1].title, "Loops");
    assert_eq!(detail.sections[1].order.value(), 2);
    assert!(!detail.sections[0].has_solution);
}

#[tokio::test]
async fn duplicate_section_order_rolls_back_everything() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;

    let err = fx
        .homeworks
        .create_homework_with_sections(
            NewHomework {
                title: "Broken".to_string(),
                description: String::new(),
                due_date: due_in_days(7),
                llm_config_id: None,
                sections: vec![
                    NewSection {
                        title: "A".to_string(),
                        content: String::new(),
                        order: 1,
                        solution: None,
                    },
                    NewSection {
                        title: "B".to_string(),
                        content: String::new(),
                        order: 1,
                        solution: None,
                    },
                ],
            },
            teacher_id,
        )
        .await
        .expect_err("duplicate order should fail");

    assert!(matches!(err, ServiceError::DuplicateSectionOrder(1)));

    let homeworks = homework::Entity::find()
        .all(&fx.db)
        .await
        .expect("query should succeed");
    let sections = section::Entity::find()
        .all(&fx.db)
        .await
        .expect("query should succeed");
    assert!(homeworks.is_empty());
    assert!(sections.is_empty());
}

#[tokio::test]
async fn out_of_range_order_is_rejected() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;

    let err = fx
        .homeworks
        .create_homework_with_sections(
            NewHomework {
                title: "Too long".to_string(),
                description: String::new(),
                due_date: due_in_days(7),
                llm_config_id: None,
                sections: vec![NewSection {
                    title: "A".to_string(),
                    content: String::new(),
                    order: 21,
                    solution: None,
                }],
            },
            teacher_id,
        )
        .await
        .expect_err("order 21 should fail");

    assert!(matches!(err, ServiceError::Domain(_)));
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;

    let err = fx
        .homeworks
        .create_homework_with_sections(
            NewHomework {
                title: "   ".to_string(),
                description: String::new(),
                due_date: due_in_days(7),
                llm_config_id: None,
                sections: Vec::new(),
            },
            teacher_id,
        )
        .await
        .expect_err("blank title should fail");

    assert!(matches!(err, ServiceError::EmptyTitle));
}

#[tokio::test]
async fn solutions_are_stored_with_their_sections() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;

    let created = create_homework(
        &fx,
        teacher_id,
        due_in_days(7),
        &[("Vars", 1, Some("x <- 42"))],
    )
    .await;

    let detail = fx
        .homeworks
        .get_homework_with_sections(created.homework_id)
        .await
        .expect("lookup should succeed")
        .expect("homework should exist");

    assert!(detail.sections[0].has_solution);
    assert_eq!(detail.sections[0].solution.as_deref(), Some("x <- 42"));
}

#[tokio::test]
async fn progress_reports_not_started_before_any_activity() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student = register_student(&fx, "student").await;

    let created = create_homework(
        &fx,
        teacher_id,
        due_in_days(7),
        &[("Vars", 1, None), ("Loops", 2, None)],
    )
    .await;

    let progress = fx
        .homeworks
        .get_student_homework_progress(student, created.homework_id)
        .await
        .expect("progress should compute");

    assert_eq!(progress.sections.len(), 2);
    for section_progress in &progress.sections {
        assert_eq!(section_progress.status, SectionStatus::NotStarted);
        assert!(section_progress.conversation_id.is_none());
    }
}

#[tokio::test]
async fn progress_tracks_in_progress_submitted_and_overdue() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;
    let student = register_student(&fx, "student").await;

    let current = create_homework(
        &fx,
        teacher_id,
        due_in_days(7),
        &[("Vars", 1, None), ("Loops", 2, None)],
    )
    .await;

    // Start working section 1, then submit it.
    let started = fx
        .conversations
        .start_conversation(student, current.section_ids[0])
        .await
        .expect("conversation should start");
    fx.submissions
        .submit_section(student, started.conversation_id)
        .await
        .expect("submission should succeed");

    let progress = fx
        .homeworks
        .get_student_homework_progress(student, current.homework_id)
        .await
        .expect("progress should compute");

    assert_eq!(progress.sections[0].status, SectionStatus::Submitted);
    assert_eq!(
        progress.sections[0].conversation_id,
        Some(started.conversation_id)
    );
    assert_eq!(progress.sections[1].status, SectionStatus::NotStarted);

    // An overdue homework: one section touched, one untouched.
    let overdue = create_homework(
        &fx,
        teacher_id,
        due_in_days(-1),
        &[("Late A", 1, None), ("Late B", 2, None)],
    )
    .await;
    fx.conversations
        .start_conversation(student, overdue.section_ids[0])
        .await
        .expect("conversation should start");

    let progress = fx
        .homeworks
        .get_student_homework_progress(student, overdue.homework_id)
        .await
        .expect("progress should compute");

    assert_eq!(
        progress.sections[0].status,
        SectionStatus::InProgressOverdue
    );
    assert_eq!(progress.sections[1].status, SectionStatus::Overdue);
}

#[tokio::test]
async fn update_homework_applies_section_batches() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;

    let created = create_homework(
        &fx,
        teacher_id,
        due_in_days(7),
        &[("Vars", 1, None), ("Loops", 2, None)],
    )
    .await;

    let updated = fx
        .homeworks
        .update_homework(
            created.homework_id,
            HomeworkUpdate {
                title: Some("Intro v2".to_string()),
                sections_to_create: vec![NewSection {
                    title: "Functions".to_string(),
                    content: "Define a function.".to_string(),
                    order: 3,
                    solution: Some("f <- function(x) x".to_string()),
                }],
                sections_to_update: vec![tutorium_server::service::SectionUpdate {
                    id: created.section_ids[0],
                    title: Some("Variables".to_string()),
                    content: None,
                    order: None,
                    solution: None,
                }],
                sections_to_delete: vec![created.section_ids[1]],
                ..HomeworkUpdate::default()
            },
        )
        .await
        .expect("update should succeed");

    assert_eq!(updated.created_section_ids.len(), 1);
    assert_eq!(updated.updated_section_ids, vec![created.section_ids[0]]);
    assert_eq!(updated.deleted_section_ids, vec![created.section_ids[1]]);

    let detail = fx
        .homeworks
        .get_homework_with_sections(created.homework_id)
        .await
        .expect("lookup should succeed")
        .expect("homework should exist");

    assert_eq!(detail.title, "Intro v2");
    assert_eq!(detail.sections.len(), 2);
    assert_eq!(detail.sections[0].title, "Variables");
    assert_eq!(detail.sections[1].title, "Functions");
    assert!(detail.sections[1].has_solution);
}

#[tokio::test]
async fn delete_homework_cascades_to_sections() {
    let fx = fixture().await;
    let (_, teacher_id) = register_teacher(&fx, "teacher").await;

    let created = create_homework(&fx, teacher_id, due_in_days(7), &[("Vars", 1, None)]).await;

    let deleted = fx
        .homeworks
        .delete_homework(created.homework_id)
        .await
        .expect("delete should succeed");
    assert!(deleted);

    let sections = section::Entity::find()
        .all(&fx.db)
        .await
        .expect("query should succeed");
    assert!(sections.is_empty());

    let deleted_again = fx
        .homeworks
        .delete_homework(created.homework_id)
        .await
        .expect("second delete should not error");
    assert!(!deleted_again);
}
