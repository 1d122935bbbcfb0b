use crate::assistant::{Assistant, OpenAiAssistant, UnconfiguredAssistant};
use crate::auth::resolve_current_user;
use crate::chat::handle_chat;
use crate::config::load_settings;
use crate::store::{default_state_root_path, RecordStore, StorePaths, TaskStatus};

pub fn help_text() -> String {
    [
        "Usage:",
        "  taskchat chat --user <email> <message...>",
        "  taskchat projects list --user <email>",
        "  taskchat projects create --user <email> <title> [description]",
        "  taskchat projects update --user <email> <project-id> <title> [description]",
        "  taskchat projects delete --user <email> <project-id>",
        "  taskchat tasks list --user <email> --project <project-id>",
        "  taskchat tasks add --user <email> --project <project-id> <title>",
        "  taskchat tasks update --user <email> --project <project-id> <task-id> <title> [description]",
        "  taskchat tasks status --user <email> --project <project-id> <task-id> <status>",
        "  taskchat tasks delete --user <email> --project <project-id> <task-id>",
        "  taskchat help",
    ]
    .join("\n")
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match args[0].as_str() {
        "chat" => cmd_chat(&args[1..]),
        "projects" => cmd_projects(&args[1..]),
        "tasks" => cmd_tasks(&args[1..]),
        "help" | "--help" | "-h" => Ok(help_text()),
        other => Err(format!("unknown command `{other}`")),
    }
}

fn open_store() -> Result<RecordStore, String> {
    let root = default_state_root_path().map_err(|err| err.to_string())?;
    RecordStore::open(StorePaths::new(root)).map_err(|err| err.to_string())
}

/// Splits out a `--flag value` pair, returning the value and the remaining
/// positional arguments.
fn take_flag(args: &[String], flag: &str) -> Result<(String, Vec<String>), String> {
    let mut rest = Vec::new();
    let mut value = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            let next = iter
                .next()
                .ok_or_else(|| format!("`{flag}` requires a value"))?;
            value = Some(next.clone());
        } else {
            rest.push(arg.clone());
        }
    }
    let value = value.ok_or_else(|| format!("missing required `{flag} <value>`"))?;
    Ok((value, rest))
}

fn cmd_chat(args: &[String]) -> Result<String, String> {
    let (email, rest) = take_flag(args, "--user")?;
    if rest.is_empty() {
        return Err("chat requires a message".to_string());
    }
    let message = rest.join(" ");

    let store = open_store()?;
    let user = resolve_current_user(&store.users, &email).map_err(|err| err.to_string())?;
    let settings = load_settings(store.paths()).map_err(|err| err.to_string())?;

    let assistant: Box<dyn Assistant> = match OpenAiAssistant::from_settings(&settings.assistant) {
        Ok(client) => Box::new(client),
        // A missing key still leaves the command engine usable; the
        // orchestrator degrades the fallback path.
        Err(err) => Box::new(UnconfiguredAssistant::new(err)),
    };

    let response =
        handle_chat(&store, assistant.as_ref(), &user, &message).map_err(|err| err.to_string())?;
    match response.context {
        Some(context) => Ok(format!("{}\n\n{}", response.message, context)),
        None => Ok(response.message),
    }
}

fn cmd_projects(args: &[String]) -> Result<String, String> {
    let sub = args.first().map(String::as_str).unwrap_or("list");
    let (email, rest) = take_flag(&args[1.min(args.len())..], "--user")?;
    let store = open_store()?;
    let user = resolve_current_user(&store.users, &email).map_err(|err| err.to_string())?;

    match sub {
        "list" => {
            let projects = store.list_projects(&user.email);
            if projects.is_empty() {
                return Ok("no projects".to_string());
            }
            Ok(projects
                .iter()
                .map(|project| {
                    format!(
                        "{}  {}  ({} tasks)",
                        project.id,
                        project.title,
                        store.tasks.list_for_project(project.id).len()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"))
        }
        "create" => {
            let title = rest
                .first()
                .ok_or_else(|| "projects create requires a title".to_string())?;
            let description = rest.get(1).map(String::as_str).unwrap_or("");
            let project = store
                .create_project(&user.email, title, description)
                .map_err(|err| err.to_string())?;
            Ok(format!("created project {} `{}`", project.id, project.title))
        }
        "update" => {
            let project_id = parse_id(rest.first(), "projects update requires a project id")?;
            let title = rest
                .get(1)
                .ok_or_else(|| "projects update requires a title".to_string())?;
            let current = store
                .get_project(project_id, &user.email)
                .map_err(|err| err.to_string())?;
            // An omitted description keeps the stored one.
            let description = rest.get(2).cloned().unwrap_or(current.description);
            let project = store
                .update_project(project_id, &user.email, title, &description)
                .map_err(|err| err.to_string())?;
            Ok(format!("updated project {} `{}`", project.id, project.title))
        }
        "delete" => {
            let project_id = parse_id(rest.first(), "projects delete requires a project id")?;
            store
                .delete_project(project_id, &user.email)
                .map_err(|err| err.to_string())?;
            Ok(format!("deleted project {project_id} and its tasks"))
        }
        other => Err(format!("unknown projects subcommand `{other}`")),
    }
}

fn cmd_tasks(args: &[String]) -> Result<String, String> {
    let sub = args.first().map(String::as_str).unwrap_or("list");
    let (email, rest) = take_flag(&args[1.min(args.len())..], "--user")?;
    let (project_raw, rest) = take_flag(&rest, "--project")?;
    let project_id = parse_id(Some(&project_raw), "`--project` must be a numeric id")?;

    let store = open_store()?;
    let user = resolve_current_user(&store.users, &email).map_err(|err| err.to_string())?;

    match sub {
        "list" => {
            let tasks = store
                .list_tasks(project_id, &user.email)
                .map_err(|err| err.to_string())?;
            if tasks.is_empty() {
                return Ok("no tasks".to_string());
            }
            Ok(tasks
                .iter()
                .map(|task| format!("{}  {}  ({})", task.id, task.title, task.status))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        "add" => {
            let title = rest
                .first()
                .ok_or_else(|| "tasks add requires a title".to_string())?;
            let task = store
                .create_task(project_id, &user.email, title, "", TaskStatus::Todo)
                .map_err(|err| err.to_string())?;
            Ok(format!("created task {} `{}`", task.id, task.title))
        }
        "update" => {
            let task_id = parse_id(rest.first(), "tasks update requires a task id")?;
            let title = rest
                .get(1)
                .ok_or_else(|| "tasks update requires a title".to_string())?;
            let current = store
                .get_task(project_id, task_id, &user.email)
                .map_err(|err| err.to_string())?;
            let description = rest.get(2).cloned().unwrap_or(current.description);
            let task = store
                .update_task(
                    project_id,
                    task_id,
                    &user.email,
                    title,
                    &description,
                    current.status,
                )
                .map_err(|err| err.to_string())?;
            Ok(format!("updated task {} `{}`", task.id, task.title))
        }
        "delete" => {
            let task_id = parse_id(rest.first(), "tasks delete requires a task id")?;
            store
                .delete_task(project_id, task_id, &user.email)
                .map_err(|err| err.to_string())?;
            Ok(format!("deleted task {task_id}"))
        }
        "status" => {
            let task_id = parse_id(rest.first(), "tasks status requires a task id")?;
            let status_raw = rest
                .get(1)
                .ok_or_else(|| "tasks status requires a status".to_string())?;
            let status = TaskStatus::parse(status_raw)?;
            let task = store
                .set_task_status(project_id, task_id, &user.email, status)
                .map_err(|err| err.to_string())?;
            Ok(format!("task {} is now {}", task.id, task.status))
        }
        other => Err(format!("unknown tasks subcommand `{other}`")),
    }
}

fn parse_id(raw: Option<&String>, message: &str) -> Result<u64, String> {
    raw.ok_or_else(|| message.to_string())?
        .parse::<u64>()
        .map_err(|_| message.to_string())
}
