use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use mealplan_core::chat::{ChatError, ChatMessage, ChatProvider, Role};
use mealplan_core::grocery::{GroceryGrouping, GroceryView, render_text};
use mealplan_core::models::{MealKind, Recipe, RecipeDraft, ValidationError, validate_day};
use mealplan_core::service::MealPlanService;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<MealPlanService>>,
    chat: Arc<dyn ChatProvider>,
    api_key: Option<String>,
}

impl AppState {
    fn service(&self) -> MutexGuard<'_, MealPlanService> {
        self.service.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct RecipeQuery {
    q: Option<String>,
    tag: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignMealRequest {
    recipe_id: String,
}

#[derive(Deserialize)]
struct GroceryQuery {
    group: Option<String>,
}

#[derive(Deserialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatReply {
    reply: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Chat(ChatError),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, hint) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            Self::Chat(err) => {
                let status = match err {
                    ChatError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
                    ChatError::Transport { .. } | ChatError::Protocol(_) => StatusCode::BAD_GATEWAY,
                };
                tracing::warn!(%status, error = %err, "chat request failed");
                (status, err.to_string(), Some(err.guidance()))
            }
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };
        (
            status,
            Json(ErrorResponse {
                error: message,
                hint,
            }),
        )
            .into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self::Chat(err)
    }
}

fn recipe_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Recipe {id} not found"))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                    hint: None,
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Recipe handlers ---

async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Json<Vec<Recipe>> {
    let svc = state.service();
    let recipes = svc
        .search_recipes(query.q.as_deref(), query.tag.as_deref())
        .into_iter()
        .cloned()
        .collect();
    Json(recipes)
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(draft): Json<RecipeDraft>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let draft = RecipeDraft { id: None, ..draft }.normalized();
    draft.validate()?;

    let mut svc = state.service();
    let recipe = svc.save_recipe(draft).context("failed to save recipe")?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let svc = state.service();
    let recipe = svc.get_recipe(&id).ok_or_else(|| recipe_not_found(&id))?;
    Ok(Json(recipe.clone()))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<RecipeDraft>,
) -> Result<Json<Recipe>, ApiError> {
    let draft = RecipeDraft {
        id: Some(id.clone()),
        ..draft
    }
    .normalized();
    draft.validate()?;

    let mut svc = state.service();
    if svc.get_recipe(&id).is_none() {
        return Err(recipe_not_found(&id));
    }
    let recipe = svc.save_recipe(draft).context("failed to save recipe")?;
    Ok(Json(recipe))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut svc = state.service();
    if svc.delete_recipe(&id).context("failed to delete recipe")? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(recipe_not_found(&id))
    }
}

async fn list_tags(State(state): State<AppState>) -> Json<Vec<String>> {
    let svc = state.service();
    Json(svc.all_tags().into_iter().map(String::from).collect())
}

// --- Meal plan handlers ---

async fn get_plan(State(state): State<AppState>) -> Result<Response, ApiError> {
    let svc = state.service();
    // The week borrows from the service, so serialize while the lock is held
    let body = serde_json::to_value(svc.week()).context("failed to serialize plan")?;
    Ok(Json(body).into_response())
}

fn parse_slot(day: u8, meal: &str) -> Result<(u8, MealKind), ApiError> {
    Ok((validate_day(day)?, meal.parse::<MealKind>()?))
}

async fn assign_meal(
    State(state): State<AppState>,
    Path((day, meal)): Path<(u8, String)>,
    Json(req): Json<AssignMealRequest>,
) -> Result<StatusCode, ApiError> {
    let (day, meal) = parse_slot(day, &meal)?;

    let mut svc = state.service();
    if svc.get_recipe(&req.recipe_id).is_none() {
        return Err(recipe_not_found(&req.recipe_id));
    }
    svc.assign_meal(day, meal, &req.recipe_id)
        .context("failed to save meal plan")?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_meal(
    State(state): State<AppState>,
    Path((day, meal)): Path<(u8, String)>,
) -> Result<StatusCode, ApiError> {
    let (day, meal) = parse_slot(day, &meal)?;

    let mut svc = state.service();
    if svc.lookup_meal(day, meal).is_none() {
        return Err(ApiError::NotFound(format!(
            "Nothing planned for day {day} {meal}"
        )));
    }
    svc.clear_meal(day, meal)
        .context("failed to save meal plan")?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Grocery handlers ---

fn parse_grouping(group: Option<&str>) -> Result<GroceryGrouping, ApiError> {
    match group {
        None | Some("category") => Ok(GroceryGrouping::Category),
        Some("recipe") => Ok(GroceryGrouping::Recipe),
        Some(other) => Err(ApiError::BadRequest(format!(
            "Invalid group '{other}'. Must be one of: category, recipe"
        ))),
    }
}

async fn get_grocery(
    State(state): State<AppState>,
    Query(query): Query<GroceryQuery>,
) -> Result<Json<GroceryView>, ApiError> {
    let grouping = parse_grouping(query.group.as_deref())?;
    let svc = state.service();
    Ok(Json(svc.grocery_view(grouping)))
}

async fn get_grocery_text(
    State(state): State<AppState>,
    Query(query): Query<GroceryQuery>,
) -> Result<Response, ApiError> {
    let grouping = parse_grouping(query.group.as_deref())?;
    let text = render_text(&state.service().grocery_view(grouping));
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response())
}

// --- Chat handler ---

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    if req.messages.last().is_none_or(|m| m.role != Role::User) {
        return Err(ApiError::BadRequest(
            "messages must end with a user message".to_string(),
        ));
    }

    let context = state.service().chat_context();
    let provider = Arc::clone(&state.chat);
    let reply = tokio::task::spawn_blocking(move || provider.complete(&req.messages, &context))
        .await
        .context("chat task failed")??;
    Ok(Json(ChatReply { reply }))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/api/tags", get(list_tags))
        .route("/api/plan", get(get_plan))
        .route("/api/plan/{day}/{meal}", put(assign_meal).delete(clear_meal))
        .route("/api/grocery", get(get_grocery))
        .route("/api/grocery/text", get(get_grocery_text))
        .route("/api/chat", post(chat))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    service: MealPlanService,
    chat: impl ChatProvider + 'static,
    port: u16,
    bind: &str,
    api_key: Option<String>,
    new_api_key: bool,
) -> anyhow::Result<()> {
    let state = AppState {
        service: Arc::new(Mutex::new(service)),
        chat: Arc::new(chat),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {}...{} (see api_key file in data directory)",
            &key[..4],
            &key[key.len() - 4..],
        );
        if new_api_key {
            eprintln!("Try it: curl -H \"Authorization: Bearer {key}\" http://{bind}:{port}/api/recipes");
        }
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    eprintln!("Listening on http://{bind}:{port}");
    tracing::info!(%bind, port, "server started");
    axum::serve(listener, app).await?;

    Ok(())
}
