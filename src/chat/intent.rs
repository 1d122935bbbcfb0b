use crate::store::{ProjectRecord, TaskRecord, TaskStatus};

/// Classified meaning of one chat utterance. Produced by [`classify`],
/// consumed once by the executor, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    CreateProject {
        title: String,
        first_task: Option<String>,
    },
    CompleteTask {
        project_id: u64,
        task_id: u64,
    },
    UpdateTaskStatus {
        project_id: u64,
        task_id: u64,
        task_name: String,
        status: TaskStatus,
    },
    CreateTask {
        project_id: u64,
        title: String,
    },
    NoMatch {
        project_id: Option<u64>,
    },
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateProject { .. } => "create_project",
            Self::CompleteTask { .. } => "complete_task",
            Self::UpdateTaskStatus { .. } => "update_task_status",
            Self::CreateTask { .. } => "create_task",
            Self::NoMatch { .. } => "no_match",
        }
    }

    /// Project the utterance referred to, when one was resolved.
    pub fn mentioned_project_id(&self) -> Option<u64> {
        match self {
            Self::CreateProject { .. } => None,
            Self::CompleteTask { project_id, .. }
            | Self::UpdateTaskStatus { project_id, .. }
            | Self::CreateTask { project_id, .. } => Some(*project_id),
            Self::NoMatch { project_id } => *project_id,
        }
    }
}

/// Inputs to one classification pass: the raw utterance plus its
/// ASCII-lowercased shadow (same byte length, so keyword offsets found in
/// the shadow slice the raw string without mangling the user's casing),
/// and the caller's visible projects with their tasks.
pub struct RuleInput<'a> {
    raw: &'a str,
    lower: String,
    projects: &'a [ProjectRecord],
    tasks: &'a [TaskRecord],
}

impl<'a> RuleInput<'a> {
    pub fn new(
        utterance: &'a str,
        projects: &'a [ProjectRecord],
        tasks: &'a [TaskRecord],
    ) -> Self {
        Self {
            raw: utterance,
            lower: utterance.to_ascii_lowercase(),
            projects,
            tasks,
        }
    }

    fn text(&self) -> CasedSlice<'_> {
        CasedSlice {
            raw: self.raw,
            lower: &self.lower,
        }
    }

    fn contains(&self, keyword: &str) -> bool {
        self.lower.contains(keyword)
    }

    fn contains_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|keyword| self.lower.contains(keyword))
    }

    /// Mention resolution: first visible project whose lower-cased title is
    /// a substring of the utterance. First match wins; no word-boundary or
    /// longest-match disambiguation. Titles are lowered with the same ASCII
    /// rule as the utterance shadow so non-ASCII titles match their own
    /// spelling.
    pub fn mentioned_project(&self) -> Option<&'a ProjectRecord> {
        self.projects
            .iter()
            .find(|project| self.lower.contains(&project.title.to_ascii_lowercase()))
    }

    fn task_in_project(
        &self,
        project_id: u64,
        select: impl Fn(&TaskRecord) -> bool,
    ) -> Option<&'a TaskRecord> {
        self.tasks
            .iter()
            .find(|task| task.project_id == project_id && select(task))
    }
}

/// Parallel view of a fragment of the utterance in original and lower case.
#[derive(Clone, Copy)]
struct CasedSlice<'a> {
    raw: &'a str,
    lower: &'a str,
}

impl<'a> CasedSlice<'a> {
    fn after(self, keyword: &str) -> Option<CasedSlice<'a>> {
        self.lower.find(keyword).map(|idx| {
            let start = idx + keyword.len();
            CasedSlice {
                raw: &self.raw[start..],
                lower: &self.lower[start..],
            }
        })
    }

    fn after_last(self, keyword: &str) -> Option<CasedSlice<'a>> {
        self.lower.rfind(keyword).map(|idx| {
            let start = idx + keyword.len();
            CasedSlice {
                raw: &self.raw[start..],
                lower: &self.lower[start..],
            }
        })
    }

    fn before(self, keyword: &str) -> Option<CasedSlice<'a>> {
        self.lower.find(keyword).map(|idx| CasedSlice {
            raw: &self.raw[..idx],
            lower: &self.lower[..idx],
        })
    }

    fn contains(self, keyword: &str) -> bool {
        self.lower.contains(keyword)
    }

    fn trimmed(self) -> &'a str {
        self.raw.trim()
    }
}

/// One declarative match rule: pure, independently testable, evaluated in
/// the fixed order of [`RULES`].
pub struct MatchRule {
    pub name: &'static str,
    pub apply: fn(&RuleInput) -> Option<Intent>,
}

/// Rule priority is significant and first-match-wins:
/// 1. project creation (with optional first task)
/// 2. project mention + task completion keywords
/// 3. project mention + status-move request
/// 4. project mention + task creation
/// Anything else degrades to [`Intent::NoMatch`] carrying whichever project
/// the mention scan found.
pub static RULES: [MatchRule; 4] = [
    MatchRule {
        name: "create_project",
        apply: match_create_project,
    },
    MatchRule {
        name: "complete_task",
        apply: match_complete_task,
    },
    MatchRule {
        name: "update_task_status",
        apply: match_update_task_status,
    },
    MatchRule {
        name: "create_task",
        apply: match_create_task,
    },
];

pub fn classify(utterance: &str, projects: &[ProjectRecord], tasks: &[TaskRecord]) -> Intent {
    let input = RuleInput::new(utterance, projects, tasks);
    for rule in &RULES {
        if let Some(intent) = (rule.apply)(&input) {
            return intent;
        }
    }
    Intent::NoMatch {
        project_id: input.mentioned_project().map(|project| project.id),
    }
}

const COMPLETION_WORDS: &[&str] = &["done", "completed", "finished"];
const STATUS_VERBS: &[&str] = &["move", "change", "update"];
const STATUS_TARGETS: &[&str] = &["status", "to doing", "to done", "to todo"];
const CONTENT_CALENDAR_TASK: &str = "a content calendar for vyta";

fn match_create_project(input: &RuleInput) -> Option<Intent> {
    if !input.contains("create a new project") && !input.contains("create project") {
        return None;
    }

    let after_named = input.text().after("named")?;
    let raw_title = after_named.before("with").unwrap_or(after_named);
    let title = raw_title
        .trimmed()
        .trim_matches(|ch| ch == '"' || ch == '\'')
        .trim();
    if title.is_empty() {
        // Trigger phrase matched but no extractable title: fall through.
        return None;
    }

    let first_task = input
        .text()
        .after("with")
        .and_then(|rest| rest.before("as first task"))
        .map(|fragment| fragment.trimmed().to_string())
        .filter(|task_title| !task_title.is_empty());

    Some(Intent::CreateProject {
        title: title.to_string(),
        first_task,
    })
}

fn match_complete_task(input: &RuleInput) -> Option<Intent> {
    let project = input.mentioned_project()?;
    if !input.contains_any(COMPLETION_WORDS) {
        return None;
    }
    // Task resolution is keyword-driven, not general: only the wireframe
    // task is recognized.
    if !input.contains("landing page") && !input.contains("wireframe") {
        return None;
    }
    let task = input.task_in_project(project.id, |task| {
        task.title.to_ascii_lowercase().contains("wireframe")
    })?;
    Some(Intent::CompleteTask {
        project_id: project.id,
        task_id: task.id,
    })
}

fn match_update_task_status(input: &RuleInput) -> Option<Intent> {
    let project = input.mentioned_project()?;
    if !input.contains_any(STATUS_VERBS) || !input.contains_any(STATUS_TARGETS) {
        return None;
    }

    let task_name = if input.contains("content calendar") {
        CONTENT_CALENDAR_TASK
    } else if input.contains("wireframe") {
        "wireframe"
    } else {
        return None;
    };

    let status = if input.contains("doing") {
        TaskStatus::InProgress
    } else if input.contains("done") {
        TaskStatus::Done
    } else if input.contains("todo") {
        TaskStatus::Todo
    } else {
        return None;
    };

    let task =
        input.task_in_project(project.id, |task| task.title.to_ascii_lowercase() == task_name)?;
    Some(Intent::UpdateTaskStatus {
        project_id: project.id,
        task_id: task.id,
        task_name: task_name.to_string(),
        status,
    })
}

fn match_create_task(input: &RuleInput) -> Option<Intent> {
    let project = input.mentioned_project()?;
    if !input.contains("add a task") && !input.contains("create a task") {
        return None;
    }

    let text = input.text();
    let mut fragment = text
        .after("create")
        .or_else(|| text.after("add"))
        .unwrap_or(text);
    if fragment.contains("task") {
        fragment = fragment.after_last("task").unwrap_or(fragment);
    }
    if let Some(head) = fragment.before("to") {
        fragment = head;
    }

    Some(Intent::CreateTask {
        project_id: project.id,
        title: fragment.trimmed().to_string(),
    })
}
