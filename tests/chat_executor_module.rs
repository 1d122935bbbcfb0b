use taskchat::auth::CurrentUser;
use taskchat::chat::{execute, Intent};
use taskchat::store::{RecordStore, StoreError, StorePaths, TaskStatus};

const OWNER: &str = "alice@example.com";

fn open_store(root: &std::path::Path) -> RecordStore {
    RecordStore::open(StorePaths::new(root.to_path_buf())).expect("open store")
}

fn owner() -> CurrentUser {
    CurrentUser::new(OWNER)
}

#[test]
fn create_project_intent_persists_and_confirms() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(dir.path());

    let reply = execute(
        &store,
        &owner(),
        Intent::CreateProject {
            title: "Atlas".to_string(),
            first_task: None,
        },
    )
    .expect("execute")
    .expect("reply");

    assert_eq!(reply.message, "I've created a new project 'Atlas'.");
    assert!(reply.context.starts_with("Project: Atlas\n"));
    assert!(reply.context.ends_with("Tasks (0):"));

    let reopened = open_store(dir.path());
    let projects = reopened.list_projects(OWNER);
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].title, "Atlas");
}

#[test]
fn create_project_intent_with_first_task() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(dir.path());

    let reply = execute(
        &store,
        &owner(),
        Intent::CreateProject {
            title: "Atlas".to_string(),
            first_task: Some("Draft wireframe".to_string()),
        },
    )
    .expect("execute")
    .expect("reply");

    assert_eq!(
        reply.message,
        "I've created a new project 'Atlas' with the first task 'Draft wireframe'."
    );
    assert!(reply.context.contains("Tasks (1):"));
    assert!(reply.context.contains("- Draft wireframe (TODO)"));

    let reopened = open_store(dir.path());
    let project = &reopened.list_projects(OWNER)[0];
    let tasks = reopened.list_tasks(project.id, OWNER).expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Todo);
}

#[test]
fn complete_task_intent_marks_only_the_named_task() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let project = store.create_project(OWNER, "Atlas", "").expect("project");
    let keep = store
        .create_task(project.id, OWNER, "Buy domain", "", TaskStatus::Todo)
        .expect("task");
    let target = store
        .create_task(project.id, OWNER, "Wireframe homepage", "", TaskStatus::Todo)
        .expect("task");

    let reply = execute(
        &store,
        &owner(),
        Intent::CompleteTask {
            project_id: project.id,
            task_id: target.id,
        },
    )
    .expect("execute")
    .expect("reply");

    assert_eq!(
        reply.message,
        "Great! I've marked the following tasks as done: Wireframe homepage"
    );
    assert!(reply.context.contains("- Wireframe homepage (DONE)"));
    assert!(reply.context.contains("- Buy domain (TODO)"));

    let reopened = open_store(dir.path());
    let done = reopened
        .get_task(project.id, target.id, OWNER)
        .expect("task");
    assert_eq!(done.status, TaskStatus::Done);
    let untouched = reopened.get_task(project.id, keep.id, OWNER).expect("task");
    assert_eq!(untouched.status, TaskStatus::Todo);
}

#[test]
fn update_status_intent_reports_wire_status_name() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let project = store.create_project(OWNER, "Atlas", "").expect("project");
    let task = store
        .create_task(project.id, OWNER, "Wireframe", "", TaskStatus::Todo)
        .expect("task");

    let reply = execute(
        &store,
        &owner(),
        Intent::UpdateTaskStatus {
            project_id: project.id,
            task_id: task.id,
            task_name: "wireframe".to_string(),
            status: TaskStatus::InProgress,
        },
    )
    .expect("execute")
    .expect("reply");

    assert_eq!(
        reply.message,
        "I've updated the task 'wireframe' status to IN_PROGRESS."
    );
    assert!(reply.context.contains("- Wireframe (IN_PROGRESS)"));
}

#[test]
fn create_task_intent_names_the_project_in_the_reply() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let project = store.create_project(OWNER, "Atlas", "").expect("project");

    let reply = execute(
        &store,
        &owner(),
        Intent::CreateTask {
            project_id: project.id,
            title: "buy domain".to_string(),
        },
    )
    .expect("execute")
    .expect("reply");

    assert_eq!(
        reply.message,
        "I've added a new task 'buy domain' to the Atlas project."
    );

    let reopened = open_store(dir.path());
    let tasks = reopened.list_tasks(project.id, OWNER).expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "buy domain");
    assert_eq!(tasks[0].status, TaskStatus::Todo);
}

#[test]
fn no_match_intent_produces_no_reply_and_no_side_effects() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(dir.path());

    let outcome = execute(&store, &owner(), Intent::NoMatch { project_id: None }).expect("execute");
    assert!(outcome.is_none());
    assert!(store.list_projects(OWNER).is_empty());
}

#[test]
fn mutations_against_missing_project_surface_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(dir.path());

    let err = execute(
        &store,
        &owner(),
        Intent::CreateTask {
            project_id: 42,
            title: "orphan".to_string(),
        },
    )
    .expect_err("missing project");
    assert!(matches!(err, StoreError::ProjectNotFound { project_id: 42 }));
}

#[test]
fn mutations_against_another_owners_project_surface_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(dir.path());
    let project = store
        .create_project("bob@example.com", "Atlas", "")
        .expect("project");

    let err = execute(
        &store,
        &owner(),
        Intent::CreateTask {
            project_id: project.id,
            title: "sneaky".to_string(),
        },
    )
    .expect_err("foreign project");
    assert!(matches!(err, StoreError::ProjectNotFound { .. }));
}
