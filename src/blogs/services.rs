use std::collections::HashMap;

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo::User;

use super::dto::{BlogAuthor, BlogWithAuthor, UpdateBlogRequest};
use super::repo::Blog;

const WORDS_PER_MINUTE: i64 = 200;

/// Outcome of a blog lifecycle rule. Handlers translate these to HTTP.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("Blog not found")]
    NotFound,
    #[error("Not authorized")]
    Forbidden,
    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated minutes to read `body` at 200 words/minute, rounded up.
pub fn reading_time_minutes(body: &str) -> i64 {
    let words = word_count(body) as i64;
    (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE
}

/// How an update payload is folded into the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// PUT: the payload replaces the content fields; omitted optional
    /// fields are cleared.
    Replace,
    /// PATCH: omitted fields are left unchanged.
    Merge,
}

/// Fold an update payload into an existing record. Reading time is
/// recomputed whenever a new body arrives; `state` changes only when
/// explicitly provided, in either mode.
pub fn apply_update(mut blog: Blog, upd: UpdateBlogRequest, mode: UpdateMode) -> Blog {
    match mode {
        UpdateMode::Merge => {
            if let Some(title) = upd.title {
                blog.title = title;
            }
            if let Some(description) = upd.description {
                blog.description = Some(description);
            }
            if let Some(tags) = upd.tags {
                blog.tags = tags;
            }
        }
        UpdateMode::Replace => {
            if let Some(title) = upd.title {
                blog.title = title;
            }
            blog.description = upd.description;
            blog.tags = upd.tags.unwrap_or_default();
        }
    }
    if let Some(body) = upd.body {
        blog.reading_time = reading_time_minutes(&body);
        blog.body = body;
    }
    if let Some(state) = upd.state {
        blog.state = state;
    }
    blog
}

/// Load, authorize, merge and persist an update. Only the author may write.
pub async fn update_blog(
    db: &PgPool,
    user_id: Uuid,
    id: Uuid,
    upd: UpdateBlogRequest,
    mode: UpdateMode,
) -> Result<Blog, BlogError> {
    let blog = Blog::find_by_id(db, id).await?.ok_or(BlogError::NotFound)?;
    if blog.author_id != user_id {
        return Err(BlogError::Forbidden);
    }
    let merged = apply_update(blog, upd, mode);
    let saved = Blog::save_content(db, &merged).await?;
    Ok(saved)
}

/// Load, authorize and remove. Only the author may delete.
pub async fn delete_blog(db: &PgPool, user_id: Uuid, id: Uuid) -> Result<(), BlogError> {
    let blog = Blog::find_by_id(db, id).await?.ok_or(BlogError::NotFound)?;
    if blog.author_id != user_id {
        return Err(BlogError::Forbidden);
    }
    Blog::delete(db, id).await?;
    Ok(())
}

/// Resolve authors for a page of blogs in one id-set lookup and embed the
/// public projection. Second half of the explicit two-step join.
pub async fn attach_authors(db: &PgPool, blogs: Vec<Blog>) -> anyhow::Result<Vec<BlogWithAuthor>> {
    let mut author_ids: Vec<Uuid> = blogs.iter().map(|b| b.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<Uuid, User> = User::find_by_ids(db, &author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    blogs
        .into_iter()
        .map(|b| {
            let author = authors
                .get(&b.author_id)
                .ok_or_else(|| anyhow::anyhow!("author {} missing for blog {}", b.author_id, b.id))?;
            Ok(BlogWithAuthor {
                id: b.id,
                title: b.title,
                description: b.description,
                body: b.body,
                tags: b.tags,
                state: b.state,
                read_count: b.read_count,
                reading_time: b.reading_time,
                created_at: b.created_at,
                updated_at: b.updated_at,
                author: BlogAuthor {
                    id: author.id,
                    first_name: author.first_name.clone(),
                    last_name: author.last_name.clone(),
                    email: author.email.clone(),
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blogs::repo::BlogState;
    use time::OffsetDateTime;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    fn sample_blog() -> Blog {
        Blog {
            id: Uuid::new_v4(),
            title: "A title".into(),
            description: Some("A description".into()),
            body: words(450),
            tags: vec!["rust".into(), "web".into()],
            author_id: Uuid::new_v4(),
            state: BlogState::Draft,
            read_count: 0,
            reading_time: 3,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn reading_time_rounds_up() {
        assert_eq!(reading_time_minutes(&words(200)), 1);
        assert_eq!(reading_time_minutes(&words(201)), 2);
        assert_eq!(reading_time_minutes(&words(250)), 2);
        assert_eq!(reading_time_minutes(&words(450)), 3);
        assert_eq!(reading_time_minutes(""), 0);
        assert_eq!(reading_time_minutes("one"), 1);
    }

    #[test]
    fn word_count_splits_on_any_whitespace() {
        assert_eq!(word_count("one  two\tthree\nfour"), 4);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn merge_keeps_omitted_fields() {
        let blog = sample_blog();
        let before_tags = blog.tags.clone();
        let updated = apply_update(
            blog,
            UpdateBlogRequest {
                title: Some("New title".into()),
                ..Default::default()
            },
            UpdateMode::Merge,
        );
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.description.as_deref(), Some("A description"));
        assert_eq!(updated.tags, before_tags);
        assert_eq!(updated.reading_time, 3);
    }

    #[test]
    fn merge_with_new_body_recomputes_reading_time() {
        let blog = sample_blog();
        let updated = apply_update(
            blog,
            UpdateBlogRequest {
                body: Some(words(250)),
                ..Default::default()
            },
            UpdateMode::Merge,
        );
        assert_eq!(updated.reading_time, 2);
    }

    #[test]
    fn replace_clears_omitted_optional_fields() {
        let blog = sample_blog();
        let updated = apply_update(
            blog,
            UpdateBlogRequest {
                title: Some("Replaced".into()),
                body: Some(words(10)),
                ..Default::default()
            },
            UpdateMode::Replace,
        );
        assert_eq!(updated.title, "Replaced");
        assert_eq!(updated.description, None);
        assert!(updated.tags.is_empty());
        assert_eq!(updated.reading_time, 1);
    }

    #[test]
    fn state_changes_only_when_provided() {
        let blog = sample_blog();
        let updated = apply_update(
            blog,
            UpdateBlogRequest {
                title: Some("t".into()),
                body: Some("b".into()),
                ..Default::default()
            },
            UpdateMode::Replace,
        );
        assert_eq!(updated.state, BlogState::Draft);

        let published = apply_update(
            updated,
            UpdateBlogRequest {
                state: Some(BlogState::Published),
                ..Default::default()
            },
            UpdateMode::Merge,
        );
        assert_eq!(published.state, BlogState::Published);
    }
}
