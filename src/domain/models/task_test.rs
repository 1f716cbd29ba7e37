use super::TaskDraft;
use super::TaskStatus;
use crate::domain::models::ControllerError;

#[test]
fn it_trims_drafts() {
    let draft = TaskDraft::new("  cleanup ", "", " tidy ~/Downloads\n");
    assert_eq!(draft.name, "cleanup");
    assert_eq!(draft.task, "tidy ~/Downloads");
    assert!(draft.validate().is_ok());
}

#[test]
fn it_requires_name_and_task() {
    let missing_task = TaskDraft::new("cleanup", "desc", "   ");
    assert_eq!(
        missing_task.validate(),
        Err(ControllerError::Config(
            "Name and task are required".to_string()
        ))
    );

    let missing_name = TaskDraft::new("", "desc", "do it");
    assert!(missing_name.validate().is_err());
}

#[test]
fn it_displays_statuses() {
    assert_eq!(TaskStatus::default(), TaskStatus::Idle);
    assert_eq!(TaskStatus::Completed.to_string(), "completed");
}
