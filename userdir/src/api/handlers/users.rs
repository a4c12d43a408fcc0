//! Admin-only user management endpoints.
//!
//! Every route requires a valid access token with the ADMIN role. An
//! authenticated non-admin gets 403; anything else gets a uniform 401.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::{
        extract::Json,
        handlers::auth::{hash_password_blocking, validate_email, validate_name, validate_password},
        models::{
            pagination::{PaginatedResponse, Pagination},
            users::{CurrentUser, Role, SearchQuery, UserCreate, UserResponse, UserUpdate},
        },
    },
    auth::current_user::require_admin,
    db::{
        errors::DbError,
        handlers::{Repository, UserFilter, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::Error,
    types::UserId,
};

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

/// List users with pagination and optional search
#[utoipa::path(
    get,
    path = "/api/users",
    params(Pagination, SearchQuery),
    tag = "users",
    responses(
        (status = 200, description = "Paginated list of users", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(admin = %current_user.email))]
pub async fn list_users(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(pagination): Query<Pagination>,
    Query(search): Query<SearchQuery>,
) -> Result<axum::Json<PaginatedResponse<UserResponse>>, Error> {
    require_admin(&current_user)?;

    let (skip, limit) = pagination.params();
    let search = search.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let filter = UserFilter::new(skip, limit, search);

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let total_count = user_repo.count(&filter).await?;
    let users = user_repo.list(&filter).await?;
    let data = users.into_iter().map(UserResponse::from).collect();

    Ok(axum::Json(PaginatedResponse::new(data, total_count, skip, limit)))
}

/// Create a user (admin)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserCreate,
    tag = "users",
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 409, description = "Email already in use"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(admin = %current_user.email))]
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<UserCreate>,
) -> Result<(StatusCode, axum::Json<UserResponse>), Error> {
    require_admin(&current_user)?;

    let email = validate_email(&request.email)?;
    let first_name = validate_name(&request.first_name, "firstName")?;
    let last_name = validate_name(&request.last_name, "lastName")?;
    validate_password(&request.password, &state.config)?;

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    if user_repo.get_user_by_email(&email).await?.is_some() {
        return Err(Error::Conflict {
            message: "An account with this email address already exists".to_string(),
        });
    }

    let password_hash = hash_password_blocking(request.password, state.config.auth.bcrypt_cost).await?;

    let create_request = UserCreateDBRequest {
        email,
        password_hash,
        first_name,
        last_name,
        // Unlike self-registration, an admin may create another admin
        role: request.role.unwrap_or(Role::User),
    };
    let created_user = user_repo.create(&create_request).await?;
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok((StatusCode::CREATED, axum::Json(UserResponse::from(created_user))))
}

/// Get a single user by ID
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    tag = "users",
    responses(
        (status = 200, description = "The user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(admin = %current_user.email, user_id = id))]
pub async fn get_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<axum::Json<UserResponse>, Error> {
    require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let user = user_repo.get_by_id(id).await?.ok_or_else(|| user_not_found(id))?;

    Ok(axum::Json(UserResponse::from(user)))
}

/// Partially update a user
#[utoipa::path(
    patch,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UserUpdate,
    tag = "users",
    responses(
        (status = 200, description = "Updated user", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(admin = %current_user.email, user_id = id))]
pub async fn update_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<UserId>,
    Json(request): Json<UserUpdate>,
) -> Result<axum::Json<UserResponse>, Error> {
    require_admin(&current_user)?;

    if request.is_empty() {
        return Err(Error::BadRequest {
            message: "At least one field must be provided".to_string(),
        });
    }

    let email = request.email.as_deref().map(validate_email).transpose()?;
    let first_name = request
        .first_name
        .as_deref()
        .map(|v| validate_name(v, "firstName"))
        .transpose()?;
    let last_name = request
        .last_name
        .as_deref()
        .map(|v| validate_name(v, "lastName"))
        .transpose()?;

    // A password change is re-hashed just like at registration
    let password_hash = match request.password {
        Some(password) => {
            validate_password(&password, &state.config)?;
            Some(hash_password_blocking(password, state.config.auth.bcrypt_cost).await?)
        }
        None => None,
    };

    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    // Changing email: reject early if another account already has it
    if let Some(email) = &email {
        if let Some(existing) = user_repo.get_user_by_email(email).await? {
            if existing.id != id {
                return Err(Error::Conflict {
                    message: "An account with this email address already exists".to_string(),
                });
            }
        }
    }

    let update_request = UserUpdateDBRequest {
        email,
        password_hash,
        first_name,
        last_name,
        role: request.role,
    };

    let updated_user = match user_repo.update(id, &update_request).await {
        Ok(user) => user,
        Err(DbError::NotFound) => return Err(user_not_found(id)),
        Err(e) => return Err(e.into()),
    };
    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(axum::Json(UserResponse::from(updated_user)))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    tag = "users",
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_token" = []))
)]
#[tracing::instrument(skip_all, fields(admin = %current_user.email, user_id = id))]
pub async fn delete_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<UserId>,
) -> Result<StatusCode, Error> {
    require_admin(&current_user)?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    if user_repo.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(user_not_found(id))
    }
}
