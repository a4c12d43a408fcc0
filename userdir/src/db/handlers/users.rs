//! Database repository for users.

use crate::types::UserId;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use sqlx::PgConnection;
use tracing::instrument;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, signup_date";

/// Filter for listing users
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
    /// Case-insensitive substring match against email, first name, and last name
    pub search: Option<String>,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64, search: Option<String>) -> Self {
        Self { skip, limit, search }
    }
}

pub struct Users<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Look up a user by email. The lookup is exact, so callers must normalize
    /// the email to lowercase first.
    #[instrument(skip(self), fields(email = %email), err)]
    pub async fn get_user_by_email(&mut self, email: &str) -> Result<Option<UserDBResponse>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user)
    }

    /// Count users matching the filter's search term (ignores skip/limit).
    #[instrument(skip(self, filter), err)]
    pub async fn count(&mut self, filter: &UserFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE $1::text IS NULL
               OR email ILIKE '%' || $1 || '%'
               OR first_name ILIKE '%' || $1 || '%'
               OR last_name ILIKE '%' || $1 || '%'
            "#,
        )
        .bind(filter.search.as_deref())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(count)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(request.role)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = id), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, UserDBResponse>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE $1::text IS NULL
               OR email ILIKE '%' || $1 || '%'
               OR first_name ILIKE '%' || $1 || '%'
               OR last_name ILIKE '%' || $1 || '%'
            ORDER BY signup_date DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(filter.search.as_deref())
        .bind(filter.limit)
        .bind(filter.skip)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(users)
    }

    #[instrument(skip(self), fields(user_id = id), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(user_id = id), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates
        let user = sqlx::query_as::<_, UserDBResponse>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                role = COALESCE($6, role)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.email.as_deref())
        .bind(request.password_hash.as_deref())
        .bind(request.first_name.as_deref())
        .bind(request.last_name.as_deref())
        .bind(request.role)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }
}
