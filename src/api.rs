// HTTP surface: request/response types, bearer-token extraction, and the
// application router.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app_state::AppState;
use crate::auth::AuthSession;
use crate::error::{AppError, AppResult};
use crate::models::{
    Favorite, ListingPage, NewProperty, PropertyPatch, PropertyWithOwner, PublicUser,
    Recommendation,
};
use crate::query::ListingQuery;

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
/// Listing and single-property reads stay anonymous; everything else
/// requires this extractor.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = bearer_token(parts).and_then(|token| {
            let claims = state.auth.verify(&token)?;
            Ok(AuthUser {
                id: claims.user_id()?,
                email: claims.email,
            })
        });

        async move { result }
    }
}

fn bearer_token(parts: &Parts) -> AppResult<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))
}

// HTTP request types

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    pub email: String,
    pub property_id: i64,
}

// Auth handlers

pub async fn register_handler(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthSession>)> {
    let session = state
        .auth
        .register(&req.name, &req.email, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthSession>> {
    let session = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(session))
}

pub async fn me_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<PublicUser>> {
    let user = state
        .db
        .get_user(user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;
    Ok(Json(PublicUser::from(&user)))
}

// Property handlers

pub async fn list_properties_handler(
    State(state): State<AppState>,
    Query(listing_query): Query<ListingQuery>,
) -> AppResult<Json<ListingPage>> {
    let page = state.listings.list(&listing_query).await?;
    Ok(Json(page))
}

pub async fn get_property_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<PropertyWithOwner>> {
    let property = state.listings.get(id).await?;
    Ok(Json(property))
}

pub async fn create_property_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Json(data): Json<NewProperty>,
) -> AppResult<(StatusCode, Json<PropertyWithOwner>)> {
    let property = state.listings.create(data, user.id).await?;
    Ok((StatusCode::CREATED, Json(property)))
}

pub async fn update_property_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(patch): Json<PropertyPatch>,
) -> AppResult<Json<PropertyWithOwner>> {
    let property = state.listings.update(id, patch, user.id).await?;
    Ok(Json(property))
}

pub async fn delete_property_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    state.listings.delete(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn my_properties_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<PropertyWithOwner>>> {
    let properties = state.listings.list_mine(user.id).await?;
    Ok(Json(properties))
}

// Favorite handlers

pub async fn add_favorite_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(property_id): Path<i64>,
) -> AppResult<(StatusCode, Json<Favorite>)> {
    let favorite = state.relationships.add_favorite(user.id, property_id).await?;
    Ok((StatusCode::CREATED, Json(favorite)))
}

pub async fn remove_favorite_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(property_id): Path<i64>,
) -> AppResult<StatusCode> {
    state
        .relationships
        .remove_favorite(user.id, property_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_favorites_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<PropertyWithOwner>>> {
    let favorites = state.relationships.list_favorites(user.id).await?;
    Ok(Json(favorites))
}

// Recommendation handlers

pub async fn recommend_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<RecommendRequest>,
) -> AppResult<(StatusCode, Json<Recommendation>)> {
    let recommendation = state
        .relationships
        .recommend(user.id, &req.email, req.property_id)
        .await?;
    Ok((StatusCode::CREATED, Json(recommendation)))
}

pub async fn list_recommendations_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<PropertyWithOwner>>> {
    let received = state
        .relationships
        .list_recommendations_received(user.id)
        .await?;
    Ok(Json(received))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

// Application router

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Auth
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/me", get(me_handler))
        // Properties
        .route(
            "/api/properties",
            get(list_properties_handler).post(create_property_handler),
        )
        .route("/api/properties/mine", get(my_properties_handler))
        .route(
            "/api/properties/{id}",
            get(get_property_handler)
                .put(update_property_handler)
                .delete(delete_property_handler),
        )
        // Favorites
        .route("/api/favorites", get(list_favorites_handler))
        .route(
            "/api/favorites/{property_id}",
            post(add_favorite_handler).delete(remove_favorite_handler),
        )
        // Recommendations
        .route(
            "/api/recommendations",
            get(list_recommendations_handler).post(recommend_handler),
        )
        .with_state(state)
}
