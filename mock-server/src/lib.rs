use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// Body accepted by every write endpoint. Fields the form sends but the
/// server does not know about are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<Uuid, User>>>;

type Failure = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(patch_user).put(put_user).delete(delete_user),
        )
        .route("/broken", get(broken))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn not_found() -> Failure {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "User not found." })))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Collect per-field messages for a new user. An empty map means valid.
fn validate_new(input: &UserInput, users: &HashMap<Uuid, User>) -> serde_json::Map<String, Value> {
    let mut errors = serde_json::Map::new();
    if present(&input.name).is_none() {
        errors.insert("name".to_string(), json!(["The name field is required."]));
    }
    match present(&input.email) {
        None => {
            errors.insert("email".to_string(), json!(["The email field is required."]));
        }
        Some(email) if !email.contains('@') => {
            errors.insert(
                "email".to_string(),
                json!(["The email must be a valid email address."]),
            );
        }
        Some(email) if users.values().any(|u| u.email == email) => {
            errors.insert("email".to_string(), json!(["The email has already been taken."]));
        }
        Some(_) => {}
    }
    errors
}

async fn list_users(
    State(db): State<Db>,
    Query(params): Query<ListParams>,
) -> Json<Vec<User>> {
    let users = db.read().await;
    let needle = params.search.unwrap_or_default().to_lowercase();
    let mut found: Vec<User> = users
        .values()
        .filter(|u| u.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    found.sort_by(|a, b| a.name.cmp(&b.name));
    Json(found)
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<User>), Failure> {
    let mut users = db.write().await;
    let errors = validate_new(&input, &users);
    if !errors.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "The given data was invalid.", "errors": errors })),
        ));
    }
    let user = User {
        id: Uuid::new_v4(),
        name: present(&input.name).unwrap_or_default().to_string(),
        email: present(&input.email).unwrap_or_default().to_string(),
    };
    users.insert(user.id, user.clone());
    info!(id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<User>, Failure> {
    let users = db.read().await;
    users.get(&id).cloned().map(Json).ok_or_else(not_found)
}

/// Partial update. A name already used by another user is reported in the
/// nested `error.message` shape.
async fn patch_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UserInput>,
) -> Result<Json<User>, Failure> {
    let mut users = db.write().await;
    if !users.contains_key(&id) {
        return Err(not_found());
    }
    if let Some(name) = present(&input.name) {
        if users.values().any(|u| u.id != id && u.name == name) {
            return Err((
                StatusCode::CONFLICT,
                Json(json!({
                    "error": { "message": { "name": ["The name has already been taken."] } }
                })),
            ));
        }
    }
    let user = users.get_mut(&id).ok_or_else(not_found)?;
    if let Some(name) = present(&input.name) {
        user.name = name.to_string();
    }
    if let Some(email) = present(&input.email) {
        user.email = email.to_string();
    }
    Ok(Json(user.clone()))
}

/// Full replacement; both fields are mandatory.
async fn put_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UserInput>,
) -> Result<Json<User>, Failure> {
    let mut users = db.write().await;
    let user = users.get_mut(&id).ok_or_else(not_found)?;
    let (Some(name), Some(email)) = (present(&input.name), present(&input.email)) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "message": "Both name and email are required." } })),
        ));
    };
    user.name = name.to_string();
    user.email = email.to_string();
    Ok(Json(user.clone()))
}

async fn delete_user(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<StatusCode, Failure> {
    let mut users = db.write().await;
    users.remove(&id).ok_or_else(not_found)?;
    info!(%id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded")
}
