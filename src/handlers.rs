//! HTTP surface: the public blog pages, the setup wizard flow, the posts
//! JSON API, the OAuth token-exchange endpoints and the informational
//! blog-info document.
//!
//! The blog-info and OAuth routes keep the exact status/body contract of the
//! hosted functions they replace, CORS headers included, so existing setup
//! pages keep working unchanged.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Form, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{any, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::blog_info::BlogInfo;
use crate::config::ConfigStore;
use crate::db::{Post, PostStatus};
use crate::oauth::{ExchangeError, OAuthProvider};
use crate::store::{BlogStore, PostUpdate, StoreError};
use crate::templates::{BlogListTemplate, ErrorTemplate, PostTemplate, PostView, SetupTemplate};
use crate::version::{check_for_updates, GITHUB_RELEASES_URL};
use crate::wizard::SetupWizard;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BlogStore>,
    pub config: ConfigStore,
    pub wizard: Arc<Mutex<SetupWizard>>,
    pub supabase_oauth: Arc<OAuthProvider>,
    pub netlify_oauth: Arc<OAuthProvider>,
    pub http: reqwest::Client,
    pub blog_title: String,
    pub blog_description: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Public blog pages
        .route("/", get(blog_index_handler))
        .route("/post/:slug", get(blog_post_handler))
        // Setup wizard
        .route("/setup", get(setup_page_handler))
        .route("/setup/next", post(setup_next_handler))
        .route("/setup/back", post(setup_back_handler))
        .route("/setup/complete", post(setup_complete_handler))
        // Posts JSON API
        .route("/api/posts", get(list_posts_handler).post(create_post_handler))
        .route(
            "/api/posts/:id",
            put(update_post_handler).delete(delete_post_handler),
        )
        // Hosted-function contracts; method dispatch is done by hand
        .route("/.netlify/functions/blog-info", any(blog_info_handler))
        .route("/api/blog-info", any(blog_info_handler))
        .route("/api/oauth/supabase", any(supabase_oauth_handler))
        .route("/api/oauth/netlify", any(netlify_oauth_handler))
        // Maintenance
        .route("/api/version", get(version_handler))
        .route("/api/config/backup", post(config_backup_handler))
        .route("/api/config/restore", post(config_restore_handler))
        .with_state(state)
}

// --- blog-info ---

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers
}

async fn blog_info_handler(method: Method) -> Response {
    let headers = cors_headers();
    match method {
        Method::OPTIONS => (StatusCode::OK, headers).into_response(),
        Method::GET => (StatusCode::OK, headers, Json(BlogInfo::current())).into_response(),
        _ => (
            StatusCode::METHOD_NOT_ALLOWED,
            headers,
            Json(json!({"error": "Method not allowed"})),
        )
            .into_response(),
    }
}

// --- OAuth token exchange ---

async fn supabase_oauth_handler(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Response {
    oauth_exchange(&state.supabase_oauth, &state.http, method, body).await
}

async fn netlify_oauth_handler(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Response {
    oauth_exchange(&state.netlify_oauth, &state.http, method, body).await
}

/// Shared exchange flow. A missing or blank code is rejected before any
/// upstream call is made.
async fn oauth_exchange(
    provider: &OAuthProvider,
    http: &reqwest::Client,
    method: Method,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({"error": "Method not allowed"})),
        )
            .into_response();
    }

    let parsed: Result<Value, _> = serde_json::from_slice(&body);
    let request = match parsed {
        Ok(request) => request,
        Err(err) => {
            log::error!("{} OAuth error: {err}", provider.name);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error", "message": err.to_string()})),
            )
                .into_response();
        }
    };

    let code = request
        .get("code")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default();
    if code.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Authorization code is required"})),
        )
            .into_response();
    }

    match provider.exchange_code(http, code).await {
        Ok(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Err(ExchangeError::Provider(message)) => {
            log::error!("{} token exchange rejected: {message}", provider.name);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error", "message": message})),
            )
                .into_response()
        }
        Err(ExchangeError::Http(err)) => {
            log::error!("{} OAuth error: {err}", provider.name);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Internal server error", "message": err.to_string()})),
            )
                .into_response()
        }
    }
}

// --- setup wizard ---

#[derive(Debug, Default, Deserialize)]
struct SetupForm {
    supabase_url: Option<String>,
    supabase_key: Option<String>,
    blog_title: Option<String>,
    blog_description: Option<String>,
    admin_email: Option<String>,
    admin_password: Option<String>,
}

impl SetupForm {
    fn apply(self, wizard: &mut SetupWizard) {
        if let Some(value) = self.supabase_url {
            wizard.form.supabase_url = value;
        }
        if let Some(value) = self.supabase_key {
            wizard.form.supabase_key = value;
        }
        if let Some(value) = self.blog_title {
            wizard.form.blog_title = value;
        }
        if let Some(value) = self.blog_description {
            wizard.form.blog_description = value;
        }
        if let Some(value) = self.admin_email {
            wizard.form.admin_email = value;
        }
        if let Some(value) = self.admin_password {
            wizard.form.admin_password = value;
        }
    }
}

fn setup_template(wizard: &SetupWizard, error: Option<String>) -> SetupTemplate {
    SetupTemplate {
        step: wizard.step().number(),
        error,
        supabase_url: wizard.form.supabase_url.clone(),
        supabase_key: wizard.form.supabase_key.clone(),
        blog_title: wizard.form.blog_title.clone(),
        blog_description: wizard.form.blog_description.clone(),
        admin_email: wizard.form.admin_email.clone(),
    }
}

async fn setup_page_handler(State(state): State<AppState>) -> SetupTemplate {
    let wizard = state.wizard.lock().await;
    setup_template(&wizard, None)
}

async fn setup_next_handler(
    State(state): State<AppState>,
    Form(form): Form<SetupForm>,
) -> Response {
    let mut wizard = state.wizard.lock().await;
    form.apply(&mut wizard);
    match wizard.advance() {
        Ok(_) => Redirect::to("/setup").into_response(),
        Err(err) => setup_template(&wizard, Some(err.to_string())).into_response(),
    }
}

async fn setup_back_handler(
    State(state): State<AppState>,
    Form(form): Form<SetupForm>,
) -> Redirect {
    let mut wizard = state.wizard.lock().await;
    form.apply(&mut wizard);
    wizard.back();
    Redirect::to("/setup")
}

async fn setup_complete_handler(
    State(state): State<AppState>,
    Form(form): Form<SetupForm>,
) -> Response {
    let mut wizard = state.wizard.lock().await;
    form.apply(&mut wizard);
    match wizard.complete(&state.config).await {
        Ok(_) => Redirect::to("/setup").into_response(),
        Err(err) => setup_template(&wizard, Some(err.to_string())).into_response(),
    }
}

// --- blog pages ---

async fn blog_index_handler(State(state): State<AppState>) -> BlogListTemplate {
    let posts = state.store.fetch_posts().await;
    BlogListTemplate {
        blog_title: state.blog_title.clone(),
        blog_description: state.blog_description.clone(),
        posts: posts
            .iter()
            .filter(|post| post.is_published())
            .map(PostView::from)
            .collect(),
    }
}

async fn blog_post_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<PostTemplate, (StatusCode, ErrorTemplate)> {
    let posts = state.store.fetch_posts().await;
    let post = posts
        .iter()
        .find(|post| post.slug == slug && post.is_published())
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                ErrorTemplate {
                    title: "Post Not Found".to_string(),
                    message: format!("No published post with slug '{slug}'."),
                },
            )
        })?;
    Ok(PostTemplate {
        blog_title: state.blog_title.clone(),
        post: PostView::from(post),
    })
}

// --- posts JSON API ---

#[derive(Debug, Deserialize)]
struct CreatePostRequest {
    title: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    status: Option<PostStatus>,
    #[serde(default)]
    featured: Option<bool>,
    #[serde(default)]
    author: Option<String>,
}

/// Lowercases and strips to `a-z0-9-`, collapsing runs into one hyphen.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn store_error_response(err: StoreError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        StoreError::DuplicateSlug(_) => StatusCode::CONFLICT,
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Remote { .. } => StatusCode::BAD_GATEWAY,
        StoreError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": err.to_string()})))
}

async fn list_posts_handler(State(state): State<AppState>) -> Json<Vec<Post>> {
    Json(state.store.fetch_posts().await)
}

async fn create_post_handler(
    State(state): State<AppState>,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, Json<Value>)> {
    let slug = request
        .slug
        .filter(|slug| !slug.trim().is_empty())
        .unwrap_or_else(|| slugify(&request.title));

    let mut post = Post::new(request.title, slug, request.content);
    if let Some(excerpt) = request.excerpt {
        post.excerpt = excerpt;
    }
    if let Some(status) = request.status {
        post.status = status;
    }
    if let Some(featured) = request.featured {
        post.featured = featured;
    }
    if let Some(author) = request.author {
        post.author = author;
    }
    if post.is_published() {
        post.published_at = Some(post.created_at);
    }

    let created = state
        .store
        .create_post(post)
        .await
        .map_err(store_error_response)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_post_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(updates): Json<PostUpdate>,
) -> Result<Json<Post>, (StatusCode, Json<Value>)> {
    let updated = state
        .store
        .update_post(id, updates)
        .await
        .map_err(store_error_response)?;
    Ok(Json(updated))
}

async fn delete_post_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .store
        .delete_post(id)
        .await
        .map_err(store_error_response)?;
    Ok(Json(json!({"success": true})))
}

// --- maintenance ---

async fn version_handler(State(state): State<AppState>) -> Response {
    Json(check_for_updates(&state.http, GITHUB_RELEASES_URL).await).into_response()
}

async fn config_backup_handler(State(state): State<AppState>) -> Response {
    match state.config.backup().await {
        Ok(config) => Json(json!({"success": true, "config": config})).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
    }
}

async fn config_restore_handler(State(state): State<AppState>) -> Response {
    match state.config.restore().await {
        Ok(config) => Json(json!({"success": true, "config": config})).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": err.to_string()})),
        )
            .into_response(),
    }
}
