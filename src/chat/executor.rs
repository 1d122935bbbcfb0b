use super::context::render_project_context;
use super::intent::Intent;
use crate::auth::CurrentUser;
use crate::store::{RecordStore, StoreError, TaskStatus};

/// Confirmation produced by a successfully executed command intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub message: String,
    pub context: String,
}

/// Runs the mutation an intent calls for: updates the owning collection,
/// persists it, and re-renders the project context. `NoMatch` produces no
/// reply of its own; the orchestrator owns that path.
pub fn execute(
    store: &RecordStore,
    user: &CurrentUser,
    intent: Intent,
) -> Result<Option<ChatReply>, StoreError> {
    match intent {
        Intent::CreateProject { title, first_task } => {
            let project = store.create_project(&user.email, &title, "")?;
            let created_task = match first_task {
                Some(task_title) => Some(store.create_task(
                    project.id,
                    &user.email,
                    &task_title,
                    "",
                    TaskStatus::Todo,
                )?),
                None => None,
            };
            let tasks = store.list_tasks(project.id, &user.email)?;
            let message = match &created_task {
                Some(task) => format!(
                    "I've created a new project '{}' with the first task '{}'.",
                    project.title, task.title
                ),
                None => format!("I've created a new project '{}'.", project.title),
            };
            Ok(Some(ChatReply {
                message,
                context: render_project_context(&project, &tasks),
            }))
        }
        Intent::CompleteTask {
            project_id,
            task_id,
        } => {
            let task = store.set_task_status(project_id, task_id, &user.email, TaskStatus::Done)?;
            let reply = reply_with_context(
                store,
                user,
                project_id,
                format!(
                    "Great! I've marked the following tasks as done: {}",
                    task.title
                ),
            )?;
            Ok(Some(reply))
        }
        Intent::UpdateTaskStatus {
            project_id,
            task_id,
            task_name,
            status,
        } => {
            store.set_task_status(project_id, task_id, &user.email, status)?;
            let reply = reply_with_context(
                store,
                user,
                project_id,
                format!("I've updated the task '{task_name}' status to {status}."),
            )?;
            Ok(Some(reply))
        }
        Intent::CreateTask { project_id, title } => {
            let task = store.create_task(project_id, &user.email, &title, "", TaskStatus::Todo)?;
            let project = store.get_project(project_id, &user.email)?;
            let reply = reply_with_context(
                store,
                user,
                project_id,
                format!(
                    "I've added a new task '{}' to the {} project.",
                    task.title, project.title
                ),
            )?;
            Ok(Some(reply))
        }
        Intent::NoMatch { .. } => Ok(None),
    }
}

fn reply_with_context(
    store: &RecordStore,
    user: &CurrentUser,
    project_id: u64,
    message: String,
) -> Result<ChatReply, StoreError> {
    let project = store.get_project(project_id, &user.email)?;
    let tasks = store.list_tasks(project_id, &user.email)?;
    Ok(ChatReply {
        message,
        context: render_project_context(&project, &tasks),
    })
}
