//! Task priority API.
//!
//! The only deterministic service in the crate: every score is a pure function
//! of the task list and the current time, which callers pass in. JSON uses
//! camelCase field names to match the task board frontend.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use demo_core::{
    banner_with, mock, shared, ApiError, ApiResult, DemoService, Payload, Route,
    ServiceDescriptor, Shared,
};
use rand::rngs::StdRng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

pub const DESCRIPTOR: ServiceDescriptor = ServiceDescriptor {
    name: "task-priority",
    title: "Task Priority API",
    tagline: "Intelligent task prioritization with AI-powered scoring",
    version: "1.0.0",
    default_port: 3000,
    features: &[
        "Weighted priority scoring",
        "Deadline proximity",
        "Dependency blocking",
        "Productivity statistics",
    ],
    routes: &[
        Route::new("GET", "/api/tasks", "Get all tasks with priority scores"),
        Route::new("GET", "/api/tasks/priority", "Get tasks sorted by priority (highest first)"),
        Route::new("GET", "/api/tasks/next", "Get the next recommended task to work on"),
        Route::new("GET", "/api/tasks/:id", "Get a specific task"),
        Route::new("POST", "/api/tasks", "Create a new task"),
        Route::new("PUT", "/api/tasks/:id", "Update a task"),
        Route::new("PATCH", "/api/tasks/:id/complete", "Mark task as completed"),
        Route::new("DELETE", "/api/tasks/:id", "Delete a task"),
        Route::new("GET", "/api/stats", "Get productivity statistics"),
    ],
};

const URGENCY_WEIGHT: f64 = 0.30;
const IMPORTANCE_WEIGHT: f64 = 0.35;
const EFFORT_WEIGHT: f64 = 0.15;
const DEADLINE_WEIGHT: f64 = 0.20;
const BLOCKED_PENALTY: f64 = 0.3;
const HIGH_PRIORITY: f64 = 70.0;
const DEFAULT_RATING: u8 = 5;
const ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub urgency: u8,
    pub importance: u8,
    pub estimated_effort: u8,
    pub deadline: Option<NaiveDate>,
    pub dependencies: Vec<u32>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A task with its computed fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredTask {
    #[serde(flatten)]
    pub task: Task,
    pub priority_score: f64,
    pub days_until_deadline: Option<i64>,
    pub is_blocked: bool,
}

/// Whole days until the deadline's UTC midnight, rounded up.
pub fn days_until(deadline: NaiveDate, now: DateTime<Utc>) -> i64 {
    let day = Duration::days(1).num_milliseconds();
    let millis = (deadline.and_time(NaiveTime::MIN).and_utc() - now).num_milliseconds();
    millis.div_euclid(day) + i64::from(millis.rem_euclid(day) > 0)
}

pub fn deadline_factor(days: Option<i64>) -> f64 {
    match days {
        None => 0.0,
        Some(d) if d < 0 => 1.0,
        Some(0) => 0.95,
        Some(1) => 0.9,
        Some(d) if d <= 3 => 0.7,
        Some(d) if d <= 7 => 0.4,
        Some(_) => 0.1,
    }
}

fn rating(value: u8) -> f64 {
    f64::from(value) / 10.0
}

/// Weighted score in `0..=100`, cut to 30% while blocked.
pub fn priority_score(task: &Task, blocked: bool, now: DateTime<Utc>) -> f64 {
    let days = task.deadline.map(|d| days_until(d, now));
    let raw = rating(task.urgency) * URGENCY_WEIGHT
        + rating(task.importance) * IMPORTANCE_WEIGHT
        + (1.0 - rating(task.estimated_effort)) * EFFORT_WEIGHT
        + deadline_factor(days) * DEADLINE_WEIGHT;
    let penalty = if blocked { BLOCKED_PENALTY } else { 1.0 };
    mock::round_to(raw * 100.0 * penalty, 2)
}

fn check_rating(value: Option<i64>, field: &str) -> ApiResult<Option<u8>> {
    match value {
        None => Ok(None),
        Some(v @ 1..=10) => Ok(Some(v as u8)),
        Some(_) => Err(ApiError::bad_request(format!("{} must be between 1 and 10", field))),
    }
}

/// Distinguishes an absent field from an explicit `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<i64>,
    pub importance: Option<i64>,
    pub estimated_effort: Option<i64>,
    pub deadline: Option<NaiveDate>,
    pub dependencies: Option<Vec<u32>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<i64>,
    pub importance: Option<i64>,
    pub estimated_effort: Option<i64>,
    #[serde(deserialize_with = "present")]
    pub deadline: Option<Option<NaiveDate>>,
    pub dependencies: Option<Vec<u32>>,
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextTask {
    pub message: &'static str,
    pub task: Option<ScoredTask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternative_tasks: Vec<ScoredTask>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub incomplete_tasks: usize,
    pub overdue_tasks: usize,
    pub high_priority_tasks: usize,
    pub completion_rate: u32,
    pub average_priority_score: f64,
}

pub struct TaskBoard {
    tasks: Vec<Task>,
    next_id: u32,
}

impl TaskBoard {
    pub fn empty() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 1,
        }
    }

    /// Board with the two starter tasks, due four days and one day out.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let mut board = Self::empty();
        let starters = [
            ("Finish project proposal", "Complete the Q4 project proposal for client review", 9, 10, 3, 4),
            ("Review code PRs", "Review 3 pending pull requests", 7, 6, 1, 1),
        ];
        for (title, description, urgency, importance, effort, days) in starters {
            board.push(Task {
                id: 0,
                title: title.to_string(),
                description: description.to_string(),
                urgency,
                importance,
                estimated_effort: effort,
                deadline: Some((now + Duration::days(days)).date_naive()),
                dependencies: Vec::new(),
                completed: false,
                created_at: now,
                updated_at: None,
                completed_at: None,
            });
        }
        board
    }

    fn push(&mut self, mut task: Task) -> &Task {
        task.id = self.next_id;
        self.next_id += 1;
        self.tasks.push(task);
        &self.tasks[self.tasks.len() - 1]
    }

    fn position(&self, id: u32) -> ApiResult<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ApiError::not_found("Task not found"))
    }

    /// A task is blocked while any dependency that still exists is incomplete.
    pub fn is_blocked(&self, task: &Task) -> bool {
        task.dependencies
            .iter()
            .any(|dep| self.tasks.iter().any(|t| t.id == *dep && !t.completed))
    }

    pub fn score(&self, task: &Task, now: DateTime<Utc>) -> ScoredTask {
        let blocked = self.is_blocked(task);
        ScoredTask {
            task: task.clone(),
            priority_score: priority_score(task, blocked, now),
            days_until_deadline: task.deadline.map(|d| days_until(d, now)),
            is_blocked: blocked,
        }
    }

    pub fn list(&self, completed: Option<bool>, now: DateTime<Utc>) -> Vec<ScoredTask> {
        self.tasks
            .iter()
            .filter(|t| completed.map_or(true, |c| t.completed == c))
            .map(|t| self.score(t, now))
            .collect()
    }

    /// Incomplete tasks, highest score first.
    pub fn by_priority(&self, now: DateTime<Utc>) -> Vec<ScoredTask> {
        let mut tasks = self.list(Some(false), now);
        tasks.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
        tasks
    }

    pub fn next(&self, now: DateTime<Utc>) -> NextTask {
        let mut ready = self.by_priority(now).into_iter().filter(|t| !t.is_blocked);
        match ready.next() {
            Some(task) => NextTask {
                message: "This is your highest priority task",
                task: Some(task),
                alternative_tasks: ready.take(ALTERNATIVES).collect(),
            },
            None => NextTask {
                message: "No tasks available. Great job!",
                task: None,
                alternative_tasks: Vec::new(),
            },
        }
    }

    pub fn get(&self, id: u32, now: DateTime<Utc>) -> ApiResult<ScoredTask> {
        let task = &self.tasks[self.position(id)?];
        Ok(self.score(task, now))
    }

    pub fn create(&mut self, new: NewTask, now: DateTime<Utc>) -> ApiResult<ScoredTask> {
        let title = new
            .title
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Title is required"))?;
        let urgency = check_rating(new.urgency, "Urgency")?;
        let importance = check_rating(new.importance, "Importance")?;
        let effort = check_rating(new.estimated_effort, "Estimated effort")?;

        let task = self
            .push(Task {
                id: 0,
                title,
                description: new.description.unwrap_or_default(),
                urgency: urgency.unwrap_or(DEFAULT_RATING),
                importance: importance.unwrap_or(DEFAULT_RATING),
                estimated_effort: effort.unwrap_or(DEFAULT_RATING),
                deadline: new.deadline,
                dependencies: new.dependencies.unwrap_or_default(),
                completed: false,
                created_at: now,
                updated_at: None,
                completed_at: None,
            })
            .clone();
        log::info!("Created task {} '{}'", task.id, task.title);
        Ok(self.score(&task, now))
    }

    pub fn update(&mut self, id: u32, update: TaskUpdate, now: DateTime<Utc>) -> ApiResult<ScoredTask> {
        let index = self.position(id)?;
        let urgency = check_rating(update.urgency, "Urgency")?;
        let importance = check_rating(update.importance, "Importance")?;
        let effort = check_rating(update.estimated_effort, "Estimated effort")?;
        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ApiError::bad_request("Title is required"));
        }

        let task = &mut self.tasks[index];
        if let Some(title) = update.title {
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        task.urgency = urgency.unwrap_or(task.urgency);
        task.importance = importance.unwrap_or(task.importance);
        task.estimated_effort = effort.unwrap_or(task.estimated_effort);
        if let Some(deadline) = update.deadline {
            task.deadline = deadline;
        }
        if let Some(dependencies) = update.dependencies {
            task.dependencies = dependencies;
        }
        if let Some(completed) = update.completed {
            task.completed = completed;
        }
        task.updated_at = Some(now);

        let task = task.clone();
        Ok(self.score(&task, now))
    }

    pub fn complete(&mut self, id: u32, now: DateTime<Utc>) -> ApiResult<ScoredTask> {
        let index = self.position(id)?;
        let task = &mut self.tasks[index];
        task.completed = true;
        task.completed_at = Some(now);
        let task = task.clone();
        Ok(self.score(&task, now))
    }

    pub fn delete(&mut self, id: u32) -> ApiResult<Task> {
        let index = self.position(id)?;
        Ok(self.tasks.remove(index))
    }

    pub fn stats(&self, now: DateTime<Utc>) -> Stats {
        let open = self.by_priority(now);
        let completed = self.tasks.len() - open.len();
        let scores: Vec<f64> = open.iter().map(|t| t.priority_score).collect();
        let completion_rate = if self.tasks.is_empty() {
            0
        } else {
            (100.0 * completed as f64 / self.tasks.len() as f64).round() as u32
        };
        Stats {
            total_tasks: self.tasks.len(),
            completed_tasks: completed,
            incomplete_tasks: open.len(),
            overdue_tasks: open
                .iter()
                .filter(|t| t.days_until_deadline.is_some_and(|d| d < 0))
                .count(),
            high_priority_tasks: scores.iter().filter(|s| **s > HIGH_PRIORITY).count(),
            completion_rate,
            average_priority_score: mock::round_to(mock::mean(&scores).unwrap_or_default(), 2),
        }
    }
}

pub struct TaskPriorityService;

impl DemoService for TaskPriorityService {
    fn descriptor(&self) -> &'static ServiceDescriptor {
        &DESCRIPTOR
    }

    fn router(&self, _rng: StdRng) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/api/tasks", get(list_tasks).post(create_task))
            .route("/api/tasks/priority", get(priority_tasks))
            .route("/api/tasks/next", get(next_task))
            .route(
                "/api/tasks/:id",
                get(get_task).put(update_task).delete(delete_task),
            )
            .route("/api/tasks/:id/complete", patch(complete_task))
            .route("/api/stats", get(stats))
            .with_state(shared(TaskBoard::seeded(mock::now())))
    }
}

/// Non-numeric ids are simply unknown tasks.
fn task_id(raw: &str) -> ApiResult<u32> {
    raw.parse()
        .map_err(|_| ApiError::not_found("Task not found"))
}

async fn root() -> Json<Value> {
    let endpoints: serde_json::Map<String, Value> = DESCRIPTOR
        .routes
        .iter()
        .map(|r| (format!("{} {}", r.method, r.path), json!(r.summary)))
        .collect();
    Json(banner_with(&DESCRIPTOR, json!({"endpoints": endpoints})))
}

async fn list_tasks(
    State(board): State<Shared<TaskBoard>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let tasks = board.lock().await.list(query.completed, mock::now());
    Ok(Json(json!({"count": tasks.len(), "tasks": tasks})))
}

async fn priority_tasks(State(board): State<Shared<TaskBoard>>) -> Json<Value> {
    let tasks = board.lock().await.by_priority(mock::now());
    Json(json!({"count": tasks.len(), "tasks": tasks}))
}

async fn next_task(State(board): State<Shared<TaskBoard>>) -> Json<NextTask> {
    Json(board.lock().await.next(mock::now()))
}

async fn get_task(
    State(board): State<Shared<TaskBoard>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScoredTask>> {
    let task = board.lock().await.get(task_id(&id)?, mock::now())?;
    Ok(Json(task))
}

async fn create_task(
    State(board): State<Shared<TaskBoard>>,
    Payload(new): Payload<NewTask>,
) -> ApiResult<(StatusCode, Json<ScoredTask>)> {
    let task = board.lock().await.create(new, mock::now())?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(board): State<Shared<TaskBoard>>,
    Path(id): Path<String>,
    Payload(update): Payload<TaskUpdate>,
) -> ApiResult<Json<ScoredTask>> {
    let task = board.lock().await.update(task_id(&id)?, update, mock::now())?;
    Ok(Json(task))
}

async fn complete_task(
    State(board): State<Shared<TaskBoard>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let task = board.lock().await.complete(task_id(&id)?, mock::now())?;
    Ok(Json(json!({"message": "Task marked as completed!", "task": task})))
}

async fn delete_task(
    State(board): State<Shared<TaskBoard>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let task = board.lock().await.delete(task_id(&id)?)?;
    log::info!("Deleted task {}", task.id);
    Ok(Json(json!({"message": "Task deleted successfully", "task": task})))
}

async fn stats(State(board): State<Shared<TaskBoard>>) -> Json<Stats> {
    Json(board.lock().await.stats(mock::now()))
}
