//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    http::HeaderName,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::{AdminService, MemberService, PhotoService};
use crate::domain::{ImageStorage, RepositoryProvider};
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::common::{ApiResponse, EmptyData, PaginatedResponse};
use crate::interfaces::http::middleware::{auth_middleware, AuthState};
use crate::interfaces::http::modules::{admin, health, metrics, request_id, users};
use crate::shared::ShutdownSignal;

/// Everything the HTTP layer needs from the rest of the application.
#[derive(Clone)]
pub struct ApiContext {
    pub repos: Arc<dyn RepositoryProvider>,
    pub images: Arc<dyn ImageStorage>,
    pub jwt_config: JwtConfig,
    pub shutdown: ShutdownSignal,
    /// Pinged by `/health`; `None` on the in-memory store
    pub db: Option<DatabaseConnection>,
    /// Upper bound for photo upload bodies
    pub max_upload_bytes: usize,
    /// Serves `/metrics` when set
    pub metrics: Option<PrometheusHandle>,
}

/// Unified state shared by the member, photo and admin routes.
/// Axum extracts the specific handler state via `FromRef`.
#[derive(Clone)]
pub struct ApiState {
    pub members: Arc<MemberService>,
    pub photos: Arc<PhotoService>,
    pub admin: Arc<AdminService>,
    pub auth: AuthState,
    pub shutdown: ShutdownSignal,
}

impl FromRef<ApiState> for users::UsersState {
    fn from_ref(s: &ApiState) -> Self {
        users::UsersState {
            members: Arc::clone(&s.members),
            photos: Arc::clone(&s.photos),
            shutdown: s.shutdown.clone(),
        }
    }
}

impl FromRef<ApiState> for admin::AdminState {
    fn from_ref(s: &ApiState) -> Self {
        admin::AdminState {
            admin: Arc::clone(&s.admin),
            photos: Arc::clone(&s.photos),
            shutdown: s.shutdown.clone(),
        }
    }
}

impl FromRef<ApiState> for AuthState {
    fn from_ref(s: &ApiState) -> Self {
        s.auth.clone()
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token; `sub` is the username"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Members
        users::list_members,
        users::get_member,
        users::update_member,
        // Photos
        users::add_photo,
        users::set_main_photo,
        users::delete_photo,
        // Admin
        admin::users_with_roles,
        admin::edit_roles,
        admin::photos_to_moderate,
        admin::approve_photo,
        admin::reject_photo,
    ),
    components(
        schemas(
            // Common
            ApiResponse<String>,
            EmptyData,
            PaginatedResponse<users::MemberDto>,
            // Members & photos
            users::MemberDto,
            users::PhotoDto,
            users::MemberUpdateRequest,
            users::PhotoUploadForm,
            // Admin
            admin::UserWithRolesDto,
            admin::PhotoForApprovalDto,
            // Health
            health::HealthResponse,
            health::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Members", description = "Browse members and edit your own profile"),
        (name = "Photos", description = "Upload, choose main and delete your photos"),
        (name = "Admin", description = "Role management and photo moderation"),
    ),
    info(
        title = "Members API",
        version = "1.0.0",
        description = "REST API for member profiles and photos",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(ctx: ApiContext) -> Router {
    let auth_state = AuthState {
        jwt_config: ctx.jwt_config.clone(),
        repos: ctx.repos.clone(),
    };

    let api_state = ApiState {
        members: Arc::new(MemberService::new(ctx.repos.clone())),
        photos: Arc::new(PhotoService::new(ctx.repos.clone(), ctx.images.clone())),
        admin: Arc::new(AdminService::new(ctx.repos.clone())),
        auth: auth_state.clone(),
        shutdown: ctx.shutdown.clone(),
    };

    // Member & photo routes (protected)
    let user_routes = Router::new()
        .route("/", get(users::list_members).put(users::update_member))
        .route("/{username}", get(users::get_member))
        .route(
            "/add-photo",
            post(users::add_photo).layer(DefaultBodyLimit::max(ctx.max_upload_bytes)),
        )
        .route("/set-main-photo/{photo_id}", put(users::set_main_photo))
        .route("/delete-photo/{photo_id}", delete(users::delete_photo))
        .route_layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(api_state.clone());

    // Admin routes (protected; role checks in the services)
    let admin_routes = Router::new()
        .route("/users-with-roles", get(admin::users_with_roles))
        .route("/edit-roles/{username}", post(admin::edit_roles))
        .route("/photos-to-moderate", get(admin::photos_to_moderate))
        .route("/approve-photo/{photo_id}", post(admin::approve_photo))
        .route("/reject-photo/{photo_id}", post(admin::reject_photo))
        .route_layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(api_state);

    let health_state = health::HealthState {
        db: ctx.db.clone(),
        started_at: Arc::new(Instant::now()),
    };
    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health_state);

    // CORS configuration; clients read page metadata from the header
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(users::PAGINATION_HEADER),
            HeaderName::from_static(request_id::REQUEST_ID_HEADER),
        ]);

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    let mut router = Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health
        .merge(health_routes)
        // Members & photos
        .nest("/api/v1/users", user_routes)
        // Admin
        .nest("/api/v1/admin", admin_routes);

    if let Some(handle) = ctx.metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics::prometheus_metrics))
                .with_state(metrics::MetricsState { handle }),
        );
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::NaiveDate;
    use tower::ServiceExt;

    use crate::domain::{NewUser, Role, UserRepository};
    use crate::infrastructure::crypto::jwt::create_token;
    use crate::infrastructure::image_host::fake::FakeImageHost;
    use crate::infrastructure::storage::InMemoryStore;

    const BOUNDARY: &str = "XBOUNDARYX";

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: "router-test-secret".into(),
            expiration_hours: 1,
            issuer: "members-test".into(),
        }
    }

    async fn app() -> Router {
        let store = Arc::new(InMemoryStore::new());
        for (name, gender, roles) in [
            ("bob", "male", vec![Role::Member]),
            ("lisa", "female", vec![Role::Member]),
            ("karen", "female", vec![Role::Member]),
            ("admin", "male", vec![Role::Member, Role::Admin, Role::Moderator]),
        ] {
            store
                .create_user(NewUser {
                    username: name.into(),
                    known_as: name.into(),
                    gender: gender.into(),
                    date_of_birth: NaiveDate::from_ymd_opt(1992, 5, 5).unwrap(),
                    city: "Leeds".into(),
                    country: "UK".into(),
                    roles,
                })
                .await
                .unwrap();
        }

        create_api_router(ApiContext {
            repos: store,
            images: Arc::new(FakeImageHost::default()),
            jwt_config: jwt(),
            shutdown: ShutdownSignal::new(),
            db: None,
            max_upload_bytes: 1024 * 1024,
            metrics: None,
        })
    }

    fn bearer(username: &str, roles: &[&str]) -> String {
        format!("Bearer {}", create_token(username, roles, &jwt()).unwrap())
    }

    fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn upload_request(auth: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"me.jpg\"\r\n\
             Content-Type: image/jpeg\r\n\r\nJPEGDATA\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        Request::builder()
            .method("POST")
            .uri("/api/v1/users/add-photo")
            .header(header::AUTHORIZATION, auth)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let resp = app().await.oneshot(get("/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(request_id::REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn members_require_a_token() {
        let resp = app().await.oneshot(get("/api/v1/users", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app()
            .await
            .oneshot(get("/api/v1/users", Some("Bearer not-a-jwt")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn member_list_carries_pagination_header() {
        let auth = bearer("bob", &["Member"]);
        let resp = app()
            .await
            .oneshot(get("/api/v1/users?pageSize=1&orderBy=created", Some(&auth)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let header: serde_json::Value = serde_json::from_str(
            resp.headers()
                .get(users::PAGINATION_HEADER)
                .unwrap()
                .to_str()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(header["currentPage"], 1);
        assert_eq!(header["itemsPerPage"], 1);
        assert_eq!(header["totalItems"], 2);
        assert_eq!(header["totalPages"], 2);

        let body = json_body(resp).await;
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["gender"], "female");
    }

    #[tokio::test]
    async fn unknown_member_is_404() {
        let auth = bearer("bob", &["Member"]);
        let resp = app()
            .await
            .oneshot(get("/api/v1/users/nobody", Some(&auth)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn photo_lifecycle_over_http() {
        let app = app().await;
        let auth = bearer("lisa", &["Member"]);

        let resp = app.clone().oneshot(upload_request(&auth)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/api/v1/users/lisa"
        );
        let first = json_body(resp).await;
        assert_eq!(first["data"]["isMain"], true);
        let first_id = first["data"]["id"].as_i64().unwrap();

        let resp = app.clone().oneshot(upload_request(&auth)).await.unwrap();
        let second_id = json_body(resp).await["data"]["id"].as_i64().unwrap();

        // main photo cannot be deleted
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/api/v1/users/delete-photo/{}", first_id))
                    .header(header::AUTHORIZATION, &auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(resp).await["error"],
            "You cannot delete your main photo"
        );

        let set_main = |id: i64| {
            Request::builder()
                .method("PUT")
                .uri(format!("/api/v1/users/set-main-photo/{}", id))
                .header(header::AUTHORIZATION, &auth)
                .body(Body::empty())
                .unwrap()
        };
        let resp = app.clone().oneshot(set_main(second_id)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app.clone().oneshot(set_main(second_id)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "This is already your main photo");

        // own profile shows both photos, approved or not
        let resp = app
            .oneshot(get("/api/v1/users/lisa", Some(&auth)))
            .await
            .unwrap();
        let me = json_body(resp).await;
        assert_eq!(me["data"]["photos"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let auth = bearer("lisa", &["Member"]);
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhi\r\n--{b}--\r\n",
            b = BOUNDARY
        );
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/users/add-photo")
            .header(header::AUTHORIZATION, &auth)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        let resp = app().await.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "No file provided");
    }

    #[tokio::test]
    async fn admin_routes_check_roles() {
        let app = app().await;

        let resp = app
            .clone()
            .oneshot(get(
                "/api/v1/admin/users-with-roles",
                Some(&bearer("bob", &["Member"])),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let admin = bearer("admin", &["Member", "Admin"]);
        let resp = app
            .clone()
            .oneshot(get("/api/v1/admin/users-with-roles", Some(&admin)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["data"].as_array().unwrap().len(), 4);

        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/admin/edit-roles/lisa?roles=Member,Moderator")
                    .header(header::AUTHORIZATION, &admin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let roles = json_body(resp).await;
        assert_eq!(roles["data"], serde_json::json!(["Member", "Moderator"]));
    }
}
