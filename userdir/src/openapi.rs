//! OpenAPI document for the service, served at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::api::models::{
    auth::{AuthResponse, LoginRequest, RegisterRequest},
    pagination::{PaginatedResponse, Pagination},
    users::{Role, UserCreate, UserResponse, UserUpdate},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::auth::register,
        crate::api::handlers::auth::login,
        crate::api::handlers::auth::refresh,
        crate::api::handlers::auth::logout,
        crate::api::handlers::users::list_users,
        crate::api::handlers::users::create_user,
        crate::api::handlers::users::get_user,
        crate::api::handlers::users::update_user,
        crate::api::handlers::users::delete_user,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        AuthResponse,
        Role,
        UserResponse,
        UserCreate,
        UserUpdate,
        Pagination,
        PaginatedResponse<UserResponse>,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "authentication", description = "Registration, login, and token lifecycle"),
        (name = "users", description = "Admin-only user management"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}
