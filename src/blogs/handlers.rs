use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{auth::jwt::AuthUser, auth::repo::User, state::AppState};

use super::dto::{
    total_pages, BlogListResponse, BlogWithAuthor, CreateBlogRequest, ListBlogsQuery,
    MessageResponse, MyBlogsQuery, MyBlogsResponse, UpdateBlogRequest,
};
use super::repo::{Blog, BlogState, PublicFilter, SortField};
use super::services::{self, BlogError, UpdateMode};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", get(list_blogs))
        .route("/blogs/me", get(list_my_blogs))
        .route("/blogs/:id", get(get_blog))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/blogs", post(create_blog))
        .route(
            "/blogs/:id",
            put(update_blog).patch(patch_blog).delete(delete_blog),
        )
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %e, "persistence error");
    (StatusCode::INTERNAL_SERVER_ERROR, "Server error".into())
}

fn blog_error(e: BlogError) -> (StatusCode, String) {
    match e {
        BlogError::NotFound => (StatusCode::NOT_FOUND, "Blog not found".into()),
        BlogError::Forbidden => (StatusCode::FORBIDDEN, "Not authorized".into()),
        BlogError::Db(e) => internal(e),
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[instrument(skip(state))]
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(q): Query<ListBlogsQuery>,
) -> Result<Json<BlogListResponse>, (StatusCode, String)> {
    let page = q.page.max(1);
    let limit = q.limit.max(1);

    // Drafts are never served here, whatever state the caller asks for.
    if q.state.map_or(false, |s| s != BlogState::Published) {
        return Ok(Json(BlogListResponse {
            total: 0,
            current_page: page,
            total_pages: 0,
            blogs: vec![],
        }));
    }

    // Author filter is a two-step lookup: resolve matching user ids first,
    // then narrow the blog query to that id set.
    let author_ids = match q.author.as_deref() {
        Some(fragment) => Some(
            User::search_ids_by_name(&state.db, fragment)
                .await
                .map_err(internal)?,
        ),
        None => None,
    };

    let filter = PublicFilter {
        title: q.title,
        tags: q.tags.as_deref().map(split_tags),
        author_ids,
        order_by: q
            .order_by
            .as_deref()
            .map(SortField::parse)
            .unwrap_or(SortField::CreatedAt),
        limit,
        offset: (page - 1) * limit,
    };

    let blogs = Blog::list_published(&state.db, &filter)
        .await
        .map_err(internal)?;
    let total = Blog::count_published(&state.db, &filter)
        .await
        .map_err(internal)?;
    let blogs = services::attach_authors(&state.db, blogs)
        .await
        .map_err(internal)?;

    Ok(Json(BlogListResponse {
        total,
        current_page: page,
        total_pages: total_pages(total, limit),
        blogs,
    }))
}

#[instrument(skip(state))]
pub async fn list_my_blogs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<MyBlogsQuery>,
) -> Result<Json<MyBlogsResponse>, (StatusCode, String)> {
    let page = q.page.max(1);
    let limit = q.limit.max(1);

    let blogs = Blog::list_by_author(&state.db, user_id, q.state, limit, (page - 1) * limit)
        .await
        .map_err(internal)?;
    let total = Blog::count_by_author(&state.db, user_id, q.state)
        .await
        .map_err(internal)?;

    Ok(Json(MyBlogsResponse {
        total,
        page,
        total_pages: total_pages(total, limit),
        blogs,
    }))
}

#[instrument(skip(state))]
pub async fn get_blog(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BlogWithAuthor>, (StatusCode, String)> {
    // Every successful public fetch counts a read.
    let blog = Blog::read_published(&state.db, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!(%id, "blog not found or not published");
            (StatusCode::NOT_FOUND, "Blog not found".to_string())
        })?;

    let mut items = services::attach_authors(&state.db, vec![blog])
        .await
        .map_err(internal)?;
    let item = items
        .pop()
        .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string()))?;

    Ok(Json(item))
}

#[instrument(skip(state, payload))]
pub async fn create_blog(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateBlogRequest>,
) -> Result<(StatusCode, Json<Blog>), (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title is required".into()));
    }
    if payload.body.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Body is required".into()));
    }

    let reading_time = services::reading_time_minutes(&payload.body);

    // Author is the requester and new blogs always start as unread drafts;
    // caller input cannot override any of that.
    let blog = Blog::create(
        &state.db,
        user_id,
        payload.title.trim(),
        payload.description.as_deref(),
        &payload.body,
        &payload.tags,
        reading_time,
    )
    .await
    .map_err(internal)?;

    info!(blog_id = %blog.id, author_id = %user_id, "blog created");
    Ok((StatusCode::CREATED, Json(blog)))
}

#[instrument(skip(state, payload))]
pub async fn update_blog(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBlogRequest>,
) -> Result<Json<Blog>, (StatusCode, String)> {
    // Full update: the content fields must all be present.
    if payload.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        return Err((StatusCode::BAD_REQUEST, "Title is required".into()));
    }
    if payload.body.as_deref().map_or(true, |b| b.trim().is_empty()) {
        return Err((StatusCode::BAD_REQUEST, "Body is required".into()));
    }

    let blog = services::update_blog(&state.db, user_id, id, payload, UpdateMode::Replace)
        .await
        .map_err(blog_error)?;

    info!(blog_id = %blog.id, author_id = %user_id, "blog replaced");
    Ok(Json(blog))
}

#[instrument(skip(state, payload))]
pub async fn patch_blog(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBlogRequest>,
) -> Result<Json<Blog>, (StatusCode, String)> {
    let blog = services::update_blog(&state.db, user_id, id, payload, UpdateMode::Merge)
        .await
        .map_err(blog_error)?;

    info!(blog_id = %blog.id, author_id = %user_id, "blog updated");
    Ok(Json(blog))
}

#[instrument(skip(state))]
pub async fn delete_blog(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    services::delete_blog(&state.db, user_id, id)
        .await
        .map_err(blog_error)?;

    info!(blog_id = %id, author_id = %user_id, "blog deleted");
    Ok(Json(MessageResponse {
        message: "Blog deleted successfully".into(),
    }))
}
