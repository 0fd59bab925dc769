use crate::config::{Args, SolverSettings};
use crate::data::{
    Algorithm, Catalog, Conflict, ConstraintSet, Course, CourseCode, ExamAssignment, SolveStats,
};
use crate::error::ScheduleError;
use crate::graph::{ConflictEdge, ConflictGraph};
use crate::scheduler::{GenerateRequest, Scheduler, Selection};
use crate::solver::Budget;
use crate::store::Generated;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use log::{error, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use itertools::Itertools;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Shared by every handler.
#[derive(Debug, Default)]
pub struct AppState {
    pub catalog: RwLock<Catalog>,
    pub scheduler: Scheduler,
    pub defaults: SolverSettings,
}

impl AppState {
    pub fn new(catalog: Catalog, defaults: SolverSettings) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            scheduler: Scheduler::new(),
            defaults,
        }
    }
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<ScheduleError> for ApiError {
    fn from(e: ScheduleError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    algorithm: Option<String>,
    #[serde(default)]
    constraints: ConstraintSet,
    #[serde(default)]
    solver: Option<SolverSettings>,
}

#[derive(Debug, Deserialize)]
struct GenerateSelectedBody {
    #[serde(default)]
    course_codes: Vec<CourseCode>,
    #[serde(flatten)]
    rest: GenerateBody,
}

#[derive(Debug, Serialize)]
struct ScheduleResponse {
    id: Uuid,
    algorithm: Algorithm,
    created_at: DateTime<Utc>,
    schedule: Vec<ExamAssignment>,
    conflicts: Vec<Conflict>,
    stats: SolveStats,
}

impl From<&Generated> for ScheduleResponse {
    fn from(generated: &Generated) -> Self {
        let schedule = &generated.schedule;
        Self {
            id: schedule.id,
            algorithm: schedule.algorithm,
            created_at: schedule.created_at,
            schedule: schedule.assignments.clone(),
            conflicts: generated.conflicts.clone(),
            stats: schedule.stats.clone(),
        }
    }
}

/// Optional filters on `GET /schedules`; every present field must match.
#[derive(Debug, Default, Deserialize)]
struct ScheduleFilter {
    course_code: Option<CourseCode>,
    room: Option<String>,
    date: Option<NaiveDate>,
}

impl ScheduleFilter {
    fn matches(&self, assignment: &ExamAssignment) -> bool {
        self.course_code
            .as_ref()
            .is_none_or(|code| assignment.course_code == *code)
            && self.room.as_ref().is_none_or(|room| assignment.room_id == *room)
            && self.date.is_none_or(|date| assignment.date == date)
    }
}

#[derive(Debug, Serialize)]
struct ConflictsResponse {
    conflicts: Vec<Conflict>,
}

#[derive(Debug, Serialize)]
struct PopularCourse {
    course_code: CourseCode,
    count: usize,
}

#[derive(Debug, Serialize)]
struct Statistics {
    courses: usize,
    students: usize,
    rooms: usize,
    enrollments: usize,
    schedules: usize,
    most_popular_course: Option<PopularCourse>,
}

#[derive(Debug, Serialize)]
struct CatalogSummary {
    courses: usize,
    rooms: usize,
    enrollments: usize,
}

/// One exam as printed on a hall ticket or an invigilation roster.
#[derive(Debug, Serialize)]
struct ExamEntry {
    course_code: CourseCode,
    course_name: String,
    instructor: String,
    date: NaiveDate,
    session: String,
    room_id: String,
}

#[derive(Debug, Serialize)]
struct HallTicket {
    student_id: String,
    exams: Vec<ExamEntry>,
}

#[derive(Debug, Serialize)]
struct Invigilations {
    instructor: String,
    exams: Vec<ExamEntry>,
}

impl GenerateBody {
    fn into_request(
        self,
        selection: Selection,
        defaults: &SolverSettings,
    ) -> Result<GenerateRequest, ApiError> {
        let algorithm = match self.algorithm {
            Some(name) => name.parse::<Algorithm>()?,
            None => Algorithm::GraphColoring,
        };
        let settings = match self.solver {
            Some(settings) => settings.or_defaults(defaults),
            None => defaults.clone(),
        };
        Ok(GenerateRequest {
            selection,
            algorithm,
            constraints: self.constraints,
            settings,
        })
    }
}

async fn run_generation(
    state: Arc<AppState>,
    request: GenerateRequest,
) -> Result<Response, ApiError> {
    let generated = tokio::task::spawn_blocking(move || {
        let catalog = state.catalog.read().clone();
        let budget = Budget::from_settings(&request.settings);
        state.scheduler.generate(&catalog, &request, &budget)
    })
    .await
    .map_err(|e| {
        error!("Generation task failed: {}", e);
        ApiError::Internal("schedule generation failed".to_string())
    })??;

    Ok((
        StatusCode::CREATED,
        Json(ScheduleResponse::from(generated.as_ref())),
    )
        .into_response())
}

async fn generate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let request = body.into_request(Selection::All, &state.defaults)?;
    run_generation(state, request).await
}

async fn generate_selected_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateSelectedBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let request = body
        .rest
        .into_request(Selection::Courses(body.course_codes), &state.defaults)?;
    run_generation(state, request).await
}

async fn current_handler(
    State(state): State<Arc<AppState>>,
    filter: Result<Query<ScheduleFilter>, QueryRejection>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let Query(filter) = filter?;
    let generated = state
        .scheduler
        .store()
        .current()
        .ok_or_else(|| ApiError::NotFound("no schedule has been generated".to_string()))?;
    let mut response = ScheduleResponse::from(generated.as_ref());
    response.schedule.retain(|a| filter.matches(a));
    Ok(Json(response))
}

async fn schedule_by_id_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let not_found = || ApiError::NotFound(format!("schedule {id} not found"));
    let uuid = Uuid::parse_str(id.trim()).map_err(|_| not_found())?;
    state
        .scheduler
        .store()
        .get(uuid)
        .map(|g| Json(ScheduleResponse::from(g.as_ref())))
        .ok_or_else(not_found)
}

async fn past_handler(State(state): State<Arc<AppState>>) -> Result<Json<ScheduleResponse>, ApiError> {
    state
        .scheduler
        .store()
        .previous()
        .map(|g| Json(ScheduleResponse::from(g.as_ref())))
        .ok_or_else(|| ApiError::NotFound("no past schedule".to_string()))
}

async fn conflicts_handler(State(state): State<Arc<AppState>>) -> Json<ConflictsResponse> {
    Json(ConflictsResponse {
        conflicts: state.scheduler.store().conflicts(),
    })
}

async fn statistics_handler(State(state): State<Arc<AppState>>) -> Json<Statistics> {
    let catalog = state.catalog.read();
    let students = catalog
        .enrollments
        .iter()
        .map(|e| e.student_id.as_str())
        .unique()
        .count();
    // most enrollments first, ties by course code
    let most_popular_course = catalog
        .enrollments
        .iter()
        .map(|e| e.course_code.as_str())
        .counts()
        .into_iter()
        .min_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .map(|(code, count)| PopularCourse {
            course_code: code.to_string(),
            count,
        });
    Json(Statistics {
        courses: catalog.courses.len(),
        students,
        rooms: catalog.rooms.len(),
        enrollments: catalog.enrollments.len(),
        schedules: state.scheduler.store().len(),
        most_popular_course,
    })
}

async fn put_catalog_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Catalog>, JsonRejection>,
) -> Result<Json<CatalogSummary>, ApiError> {
    let Json(catalog) = payload?;
    let summary = CatalogSummary {
        courses: catalog.courses.len(),
        rooms: catalog.rooms.len(),
        enrollments: catalog.enrollments.len(),
    };
    info!(
        "Catalog replaced: {} courses, {} rooms, {} enrollments.",
        summary.courses, summary.rooms, summary.enrollments
    );
    *state.catalog.write() = catalog;
    Ok(Json(summary))
}

async fn catalog_conflicts_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ConflictEdge>> {
    let catalog = state.catalog.read();
    Json(ConflictGraph::build(&catalog.courses, &catalog.enrollments).edges())
}

fn current_schedule(state: &AppState) -> Result<Arc<Generated>, ApiError> {
    state
        .scheduler
        .store()
        .current()
        .ok_or_else(|| ApiError::NotFound("no schedule has been generated".to_string()))
}

/// Exams of the schedule whose course passes `keep`, with the course records it was built from.
fn exam_entries(generated: &Generated, keep: impl Fn(&Course) -> bool) -> Vec<ExamEntry> {
    generated
        .schedule
        .assignments
        .iter()
        .filter_map(|a| {
            let course = generated.course(&a.course_code)?;
            keep(course).then(|| ExamEntry {
                course_code: a.course_code.clone(),
                course_name: course.name.clone(),
                instructor: course.instructor.clone(),
                date: a.date,
                session: a.session.clone(),
                room_id: a.room_id.clone(),
            })
        })
        .collect()
}

async fn hallticket_handler(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<HallTicket>, ApiError> {
    let generated = current_schedule(&state)?;
    let taken: HashSet<&str> = generated
        .enrollments
        .iter()
        .filter(|e| e.student_id == student_id)
        .map(|e| e.course_code.as_str())
        .collect();
    if taken.is_empty() {
        return Err(ApiError::NotFound(format!("unknown student: {student_id}")));
    }
    let exams = exam_entries(&generated, |course| taken.contains(course.code.as_str()));
    Ok(Json(HallTicket { student_id, exams }))
}

async fn invigilations_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Invigilations>, ApiError> {
    let generated = current_schedule(&state)?;
    let wanted = name.trim().to_lowercase();
    let exams = exam_entries(&generated, |course| {
        course.instructor.trim().to_lowercase() == wanted
    });
    Ok(Json(Invigilations {
        instructor: name,
        exams,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/catalog", put(put_catalog_handler))
        .route("/catalog/conflicts", get(catalog_conflicts_handler))
        .route("/statistics", get(statistics_handler))
        .route("/schedules", get(current_handler))
        .route("/schedules/past", get(past_handler))
        .route("/schedules/conflicts", get(conflicts_handler))
        .route("/schedules/:id", get(schedule_by_id_handler))
        .route("/schedules/generate", post(generate_handler))
        .route("/schedules/generate/selected", post(generate_selected_handler))
        .route("/students/:student_id/hallticket", get(hallticket_handler))
        .route("/teachers/:name/invigilations", get(invigilations_handler));

    Router::new().nest("/api", api).with_state(state)
}

pub async fn run_server(args: &Args, catalog: Catalog) -> std::io::Result<()> {
    let state = Arc::new(AppState::new(catalog, args.solver_defaults()));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{department_catalog, three_course_catalog};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(catalog: Catalog) -> Router {
        let defaults = SolverSettings {
            seed: Some(3),
            ..SolverSettings::default()
        };
        router(Arc::new(AppState::new(catalog, defaults)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn week() -> Value {
        json!({ "start_date": "2025-07-07", "end_date": "2025-07-11" })
    }

    #[tokio::test]
    async fn test_generate_without_courses_is_bad_request() {
        let app = app(Catalog::default());
        let (status, body) = send(&app, "POST", "/api/schedules/generate", Some(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "no courses selected for scheduling");
    }

    #[tokio::test]
    async fn test_unknown_algorithm_is_rejected() {
        let app = app(department_catalog());
        let (status, body) = send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "algorithm": "tabu_search" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown algorithm: tabu_search");
    }

    #[tokio::test]
    async fn test_malformed_body_reports_error_json() {
        let app = app(department_catalog());
        let (status, body) = send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "constraints": { "start_date": "not a date" } })),
        )
        .await;

        assert!(status.is_client_error());
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_no_schedule_yet() {
        let app = app(department_catalog());

        let (status, body) = send(&app, "GET", "/api/schedules", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, body) = send(&app, "GET", "/api/schedules/conflicts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "conflicts": [] }));
    }

    #[tokio::test]
    async fn test_generate_conflicts_past_round_trip() {
        let app = app(Catalog::default());
        let catalog = serde_json::to_value(department_catalog()).unwrap();
        let (status, body) = send(&app, "PUT", "/api/catalog", Some(catalog)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["courses"], 12);

        let (status, first) = send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "constraints": week() })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(first["algorithm"], "graph_coloring");
        assert_eq!(first["schedule"].as_array().unwrap().len(), 12);

        let (status, conflicts) = send(&app, "GET", "/api/schedules/conflicts", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(conflicts["conflicts"], first["conflicts"]);

        let (status, second) = send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "algorithm": "simulated_annealing", "constraints": week(),
                         "solver": { "annealing": { "max_iterations": 500 } } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(second["algorithm"], "simulated_annealing");

        let (_, current) = send(&app, "GET", "/api/schedules", None).await;
        let (_, past) = send(&app, "GET", "/api/schedules/past", None).await;
        assert_eq!(current["id"], second["id"]);
        assert_eq!(past["id"], first["id"]);
    }

    #[tokio::test]
    async fn test_generate_selected() {
        let app = app(department_catalog());

        let (status, body) = send(
            &app,
            "POST",
            "/api/schedules/generate/selected",
            Some(json!({ "course_codes": ["CS101", "NOPE"], "constraints": week() })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "unknown course: NOPE");

        let (status, body) = send(
            &app,
            "POST",
            "/api/schedules/generate/selected",
            Some(json!({ "course_codes": ["CS101", "CS102"], "algorithm": "genetic",
                         "constraints": week(),
                         "solver": { "genetic": { "population_size": 10, "generations": 10 } } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["schedule"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_hallticket_and_invigilations() {
        let app = app(department_catalog());
        let (status, _) = send(
            &app,
            "GET",
            "/api/students/s000/hallticket",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "constraints": week() })),
        )
        .await;

        // s000 takes CS101 to CS103
        let (status, ticket) = send(&app, "GET", "/api/students/s000/hallticket", None).await;
        assert_eq!(status, StatusCode::OK);
        let codes: Vec<&str> = ticket["exams"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["course_code"].as_str().unwrap())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        assert_eq!(codes, vec!["CS101", "CS102", "CS103"]);

        let (status, _) = send(&app, "GET", "/api/students/ghost/hallticket", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, roster) = send(&app, "GET", "/api/teachers/RAO/invigilations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(roster["exams"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_catalog_conflict_edges() {
        let app = app(department_catalog());
        let (status, edges) = send(&app, "GET", "/api/catalog/conflicts", None).await;

        assert_eq!(status, StatusCode::OK);
        let edges = edges.as_array().unwrap();
        assert!(!edges.is_empty());
        assert!(edges.iter().all(|e| e["a"].as_str() < e["b"].as_str()));
    }

    #[tokio::test]
    async fn test_conflicts_are_wrapped_for_the_dashboard() {
        let app = app(three_course_catalog());
        let (status, _) = send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "constraints": {
                "start_date": "2025-07-07", "end_date": "2025-07-07", "max_exams_per_day": 0,
                "excluded_days": [] } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(&app, "GET", "/api/schedules/conflicts", None).await;
        let conflicts = body["conflicts"].as_array().unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0]["type"], "room_double_booking");
        assert_eq!(conflicts[0]["courses_involved"], json!(["B", "C"]));
    }

    #[tokio::test]
    async fn test_schedule_lookup_by_id() {
        let app = app(department_catalog());
        let (_, first) = send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "constraints": week() })),
        )
        .await;
        send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "constraints": week() })),
        )
        .await;

        let id = first["id"].as_str().unwrap();
        let (status, found) = send(&app, "GET", &format!("/api/schedules/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["id"], first["id"]);
        assert_eq!(found["schedule"], first["schedule"]);

        let (status, body) = send(&app, "GET", "/api/schedules/abc", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let unknown = Uuid::new_v4();
        let (status, body) = send(&app, "GET", &format!("/api/schedules/{unknown}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains(&unknown.to_string()));

        // static routes still win over the id route
        let (status, past) = send(&app, "GET", "/api/schedules/past", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(past["id"], first["id"]);
    }

    #[tokio::test]
    async fn test_statistics() {
        let app = app(department_catalog());
        let (status, stats) = send(&app, "GET", "/api/statistics", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["courses"], 12);
        assert_eq!(stats["students"], 90);
        assert_eq!(stats["rooms"], 3);
        assert_eq!(stats["enrollments"], 270);
        assert_eq!(stats["schedules"], 0);
        // CS103 to CS110 each have three cohorts of nine; lowest code wins the tie
        assert_eq!(stats["most_popular_course"]["course_code"], "CS103");
        assert_eq!(stats["most_popular_course"]["count"], 27);

        send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "constraints": week() })),
        )
        .await;
        let (_, stats) = send(&app, "GET", "/api/statistics", None).await;
        assert_eq!(stats["schedules"], 1);

        let (_, empty) = send(&self::app(Catalog::default()), "GET", "/api/statistics", None).await;
        assert_eq!(empty["students"], 0);
        assert!(empty["most_popular_course"].is_null());
    }

    #[tokio::test]
    async fn test_current_schedule_filters() {
        let app = app(department_catalog());
        let (_, generated) = send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "constraints": week() })),
        )
        .await;
        let schedule = generated["schedule"].as_array().unwrap();
        let first = &schedule[0];
        let room = first["room_id"].as_str().unwrap();
        let date = first["date"].as_str().unwrap();

        let (status, by_room) =
            send(&app, "GET", &format!("/api/schedules?room={room}"), None).await;
        assert_eq!(status, StatusCode::OK);
        let by_room = by_room["schedule"].as_array().unwrap();
        assert!(!by_room.is_empty());
        assert!(by_room.iter().all(|a| a["room_id"] == room));
        let expected = schedule.iter().filter(|a| a["room_id"] == room).count();
        assert_eq!(by_room.len(), expected);

        let (_, by_date) = send(&app, "GET", &format!("/api/schedules?date={date}"), None).await;
        let by_date = by_date["schedule"].as_array().unwrap();
        assert!(by_date.iter().all(|a| a["date"] == date));
        assert_eq!(
            by_date.len(),
            schedule.iter().filter(|a| a["date"] == date).count()
        );

        let (_, one) = send(&app, "GET", "/api/schedules?course_code=CS105", None).await;
        assert_eq!(one["schedule"].as_array().unwrap().len(), 1);

        let (status, body) = send(&app, "GET", "/api/schedules?date=tomorrow", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_hallticket_survives_catalog_replacement() {
        let app = app(department_catalog());
        send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "constraints": week() })),
        )
        .await;
        let (status, _) = send(
            &app,
            "PUT",
            "/api/catalog",
            Some(serde_json::to_value(Catalog::default()).unwrap()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, ticket) = send(&app, "GET", "/api/students/s000/hallticket", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ticket["exams"].as_array().unwrap().len(), 3);
        assert!(
            ticket["exams"]
                .as_array()
                .unwrap()
                .iter()
                .all(|e| e["course_name"].as_str().unwrap().starts_with("Course CS10"))
        );

        let (_, roster) = send(&app, "GET", "/api/teachers/rao/invigilations", None).await;
        assert_eq!(roster["exams"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_oversized_exam_window_is_bad_request() {
        let app = app(department_catalog());
        let (status, body) = send(
            &app,
            "POST",
            "/api/schedules/generate",
            Some(json!({ "constraints": { "start_date": "2025-07-07", "end_date": "2027-07-07" } })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid constraints"));
    }
}
