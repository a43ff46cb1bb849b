use axum::{
    extract::{rejection::JsonRejection, Form, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::export::{self, CsvLayout};
use crate::html;
use crate::parser::RosterForm;
use crate::scheduler;
use crate::trial::{self, TrialStatus};
use crate::types::{Roster, RosterRequest, SlotKey};

/// Application state shared across requests
pub struct AppState {
    pub config: AppConfig,
    pub data_dir: PathBuf,

    /// Last generated roster, edited in place by manual tweaks
    pub roster: RwLock<Option<Roster>>,

    /// Last submitted form, shown again on `/`
    pub form: RwLock<RosterForm>,
}

impl AppState {
    pub fn new(config: AppConfig, data_dir: PathBuf) -> Self {
        let form = RosterForm::from_config(&config, Local::now().date_naive());
        Self {
            config,
            data_dir,
            roster: RwLock::new(None),
            form: RwLock::new(form),
        }
    }
}

/// Build the router with every page, export and API route
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/generate", post(generate_handler))
        .route("/roster", get(roster_handler))
        .route("/roster/print", get(print_handler))
        .route("/roster/assign", post(assign_handler))
        .route("/roster/regenerate", post(regenerate_handler))
        .route("/roster/export.csv", get(csv_handler))
        .route("/roster/chat.txt", get(chat_handler))
        .route("/api/roster", get(api_roster_handler))
        .route("/api/generate", post(api_generate_handler))
        .layer(middleware::from_fn_with_state(state.clone(), trial_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server on localhost
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(%addr, "Server running at http://{}", addr);
    println!("Press Ctrl+C to stop\n");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Block every route once the trial is over.
///
/// The current status is handed to handlers as an extension.
async fn trial_gate(State(state): State<Arc<AppState>>, mut req: Request, next: Next) -> Response {
    let today = Local::now().date_naive();
    match trial::check_trial(&state.data_dir, state.config.trial_days, today) {
        Ok(TrialStatus::Expired { trial_days }) => {
            warn!(trial_days, "Request blocked, trial expired");
            let markup = html::render_trial_expired(&state.config.company, trial_days);
            (StatusCode::FORBIDDEN, Html(markup.into_string())).into_response()
        }
        Ok(status) => {
            req.extensions_mut().insert(status);
            next.run(req).await
        }
        Err(e) => {
            error!(error = %e, "Failed to check trial");
            message_page(&state, StatusCode::INTERNAL_SERVER_ERROR, &format!("{:#}", e))
        }
    }
}

fn message_page(state: &AppState, status: StatusCode, message: &str) -> Response {
    let markup = html::render_message(&state.config.company, message);
    (status, Html(markup.into_string())).into_response()
}

fn no_roster(state: &AppState) -> Response {
    message_page(state, StatusCode::NOT_FOUND, "No roster generated yet")
}

/// Serve the roster settings form
async fn index_handler(
    State(state): State<Arc<AppState>>,
    Extension(trial): Extension<TrialStatus>,
) -> Html<String> {
    let form = state.form.read().await;
    let markup = html::render_form(&state.config.company, &form, None, trial);
    Html(markup.into_string())
}

/// Generate a roster from the submitted form
async fn generate_handler(
    State(state): State<Arc<AppState>>,
    Extension(trial): Extension<TrialStatus>,
    Form(form): Form<RosterForm>,
) -> Response {
    let result = form.to_request().and_then(|request| scheduler::generate(&request));
    *state.form.write().await = form.clone();

    match result {
        Ok(roster) => {
            *state.roster.write().await = Some(roster);
            Redirect::to("/roster").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Invalid roster form");
            let markup = html::render_form(&state.config.company, &form, Some(&e.to_string()), trial);
            (StatusCode::BAD_REQUEST, Html(markup.into_string())).into_response()
        }
    }
}

/// Show the current roster with editing controls
async fn roster_handler(State(state): State<Arc<AppState>>) -> Response {
    let roster = state.roster.read().await;
    match roster.as_ref() {
        Some(roster) => {
            let conflicts = roster.conflicts();
            let markup = html::render_roster(roster, &state.config.company, &conflicts);
            Html(markup.into_string()).into_response()
        }
        None => Redirect::to("/").into_response(),
    }
}

async fn print_handler(State(state): State<Arc<AppState>>) -> Response {
    let roster = state.roster.read().await;
    match roster.as_ref() {
        Some(roster) => {
            let markup = html::render_print(roster, &state.config.company);
            Html(markup.into_string()).into_response()
        }
        None => Redirect::to("/").into_response(),
    }
}

/// A manual change to one slot, blank `staff` clears it
#[derive(Debug, Deserialize)]
pub struct AssignForm {
    pub date: NaiveDate,
    pub shift: String,
    pub role: String,
    pub slot: u32,
    #[serde(default)]
    pub staff: String,
}

async fn assign_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AssignForm>,
) -> Response {
    let mut roster = state.roster.write().await;
    let Some(roster) = roster.as_mut() else {
        return no_roster(&state);
    };

    let key = SlotKey {
        date: form.date,
        shift: form.shift,
        role: form.role,
        slot: form.slot,
    };

    match roster.set_assignment(&key, Some(&form.staff)) {
        Ok(()) => {
            info!(date = %key.date, shift = %key.shift, role = %key.role, staff = %form.staff, "Slot reassigned");
            Redirect::to("/roster").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Reassignment rejected");
            message_page(&state, StatusCode::BAD_REQUEST, &e.to_string())
        }
    }
}

/// Run the same request again with a fresh seed
async fn regenerate_handler(State(state): State<Arc<AppState>>) -> Response {
    let mut roster = state.roster.write().await;
    let Some(current) = roster.as_ref() else {
        return Redirect::to("/").into_response();
    };

    let mut request = current.request.clone();
    request.seed = None;

    match scheduler::generate(&request) {
        Ok(new_roster) => {
            *roster = Some(new_roster);
            Redirect::to("/roster").into_response()
        }
        Err(e) => message_page(&state, StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub layout: CsvLayout,
}

async fn csv_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let roster = state.roster.read().await;
    let Some(roster) = roster.as_ref() else {
        return no_roster(&state);
    };

    match export::to_csv(roster, query.layout) {
        Ok(csv) => {
            let disposition = format!(
                "attachment; filename=\"roster-{}.csv\"",
                roster.request.start.format("%Y-%m-%d")
            );
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                csv,
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "CSV export failed");
            message_page(&state, StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

async fn chat_handler(State(state): State<Arc<AppState>>) -> Response {
    let roster = state.roster.read().await;
    let Some(roster) = roster.as_ref() else {
        return no_roster(&state);
    };

    let text = export::to_chat_text(roster, &state.config.company);
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response()
}

/// Return the current roster as JSON
async fn api_roster_handler(State(state): State<Arc<AppState>>) -> Response {
    let roster = state.roster.read().await;
    match roster.as_ref() {
        Some(roster) => Json(roster.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "no roster generated yet" })),
        )
            .into_response(),
    }
}

/// Generate a roster from a JSON request and make it the current one
async fn api_generate_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RosterRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Invalid JSON request");
            return (
                rejection.status(),
                Json(json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };

    match scheduler::generate(&request) {
        Ok(roster) => {
            *state.form.write().await = RosterForm::from_request(&request);
            *state.roster.write().await = Some(roster.clone());
            Json(roster).into_response()
        }
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
