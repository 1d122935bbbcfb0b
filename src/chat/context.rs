use crate::store::{ProjectRecord, TaskRecord};

/// Fixed-layout context block for a project and its tasks. Used both as the
/// chat reply context and as grounding text for the assistant fallback.
/// Tasks render in collection order; no sorting.
pub fn render_project_context(project: &ProjectRecord, tasks: &[TaskRecord]) -> String {
    let mut block = format!(
        "Project: {}\nDescription: {}\nCreated: {}\nTasks ({}):",
        project.title,
        project.description,
        project.created_at,
        tasks.len()
    );
    for task in tasks {
        block.push_str(&format!("\n- {} ({})", task.title, task.status));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TaskStatus;

    fn project() -> ProjectRecord {
        ProjectRecord {
            id: 1,
            title: "Atlas".to_string(),
            description: "Site relaunch".to_string(),
            owner_email: "alice@example.com".to_string(),
            created_at: "2026-01-05T10:00:00+00:00".to_string(),
        }
    }

    fn task(id: u64, title: &str, status: TaskStatus) -> TaskRecord {
        TaskRecord {
            id,
            project_id: 1,
            title: title.to_string(),
            description: String::new(),
            status,
            created_at: "2026-01-05T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn renders_header_and_one_line_per_task_in_insertion_order() {
        let tasks = vec![
            task(2, "Wireframe homepage", TaskStatus::Todo),
            task(1, "Buy domain", TaskStatus::Done),
        ];
        let block = render_project_context(&project(), &tasks);
        assert_eq!(
            block,
            "Project: Atlas\n\
             Description: Site relaunch\n\
             Created: 2026-01-05T10:00:00+00:00\n\
             Tasks (2):\n\
             - Wireframe homepage (TODO)\n\
             - Buy domain (DONE)"
        );
    }

    #[test]
    fn renders_empty_task_list_with_zero_count() {
        let block = render_project_context(&project(), &[]);
        assert!(block.ends_with("Tasks (0):"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let tasks = vec![task(1, "Buy domain", TaskStatus::InProgress)];
        assert_eq!(
            render_project_context(&project(), &tasks),
            render_project_context(&project(), &tasks)
        );
    }
}
