use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo::{Blog, BlogState};

/// Query parameters for the public blog listing.
#[derive(Debug, Deserialize)]
pub struct ListBlogsQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub state: Option<BlogState>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub tags: Option<String>,
    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,
}

/// Query parameters for the requester's own blogs.
#[derive(Debug, Deserialize)]
pub struct MyBlogsQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_my_limit")]
    pub limit: i64,
    pub state: Option<BlogState>,
}

fn default_page() -> i64 {
    1
}
fn default_limit() -> i64 {
    20
}
fn default_my_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct CreateBlogRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Update payload shared by PUT (full) and PATCH (partial).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
    pub state: Option<BlogState>,
}

/// Public author projection embedded in listing and detail responses.
#[derive(Debug, Clone, Serialize)]
pub struct BlogAuthor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Blog with its author resolved, as served on the public surface.
#[derive(Debug, Serialize)]
pub struct BlogWithAuthor {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub body: String,
    pub tags: Vec<String>,
    pub state: BlogState,
    pub read_count: i64,
    pub reading_time: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub author: BlogAuthor,
}

#[derive(Debug, Serialize)]
pub struct BlogListResponse {
    pub total: i64,
    #[serde(rename = "currentPage")]
    pub current_page: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
    pub blogs: Vec<BlogWithAuthor>,
}

#[derive(Debug, Serialize)]
pub struct MyBlogsResponse {
    pub total: i64,
    pub page: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
    pub blogs: Vec<Blog>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_query_defaults() {
        let q: ListBlogsQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 20);
        assert!(q.state.is_none());
        assert!(q.order_by.is_none());
    }

    #[test]
    fn my_blogs_query_defaults_to_smaller_pages() {
        let q: MyBlogsQuery = serde_json::from_value(json!({})).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 10);
    }

    #[test]
    fn state_parses_lowercase() {
        let q: MyBlogsQuery = serde_json::from_value(json!({"state": "draft"})).unwrap();
        assert_eq!(q.state, Some(BlogState::Draft));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(5, 1), 5);
    }

    #[test]
    fn list_response_uses_camel_case_keys() {
        let res = BlogListResponse {
            total: 3,
            current_page: 1,
            total_pages: 1,
            blogs: vec![],
        };
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("\"currentPage\":1"));
        assert!(json.contains("\"totalPages\":1"));
        assert!(json.contains("\"blogs\":[]"));
    }
}
