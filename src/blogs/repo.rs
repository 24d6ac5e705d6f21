use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

/// Visibility state of a blog. Only published entries are public.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "blog_state", rename_all = "lowercase")]
pub enum BlogState {
    Draft,
    Published,
}

/// Blog record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Blog {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub body: String,
    pub tags: Vec<String>,
    pub author_id: Uuid,
    pub state: BlogState,
    pub read_count: i64,
    pub reading_time: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Column the public listing may sort by, always descending.
/// Caller input is matched against this whitelist; anything else
/// falls back to creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    ReadCount,
    ReadingTime,
    Title,
}

impl SortField {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "updatedAt" | "updated_at" => SortField::UpdatedAt,
            "readCount" | "read_count" => SortField::ReadCount,
            "readingTime" | "reading_time" => SortField::ReadingTime,
            "title" => SortField::Title,
            _ => SortField::CreatedAt,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::ReadCount => "read_count",
            SortField::ReadingTime => "reading_time",
            SortField::Title => "title",
        }
    }
}

/// Filters applied to the public listing. `author_ids` is the result of the
/// separate author-name lookup; an empty set matches nothing.
#[derive(Debug, Clone)]
pub struct PublicFilter {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub author_ids: Option<Vec<Uuid>>,
    pub order_by: SortField,
    pub limit: i64,
    pub offset: i64,
}

fn push_public_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &PublicFilter) {
    if let Some(title) = &filter.title {
        qb.push(" AND title ILIKE ");
        qb.push_bind(format!("%{}%", title));
    }
    if let Some(tags) = &filter.tags {
        qb.push(" AND tags && ");
        qb.push_bind(tags.clone());
    }
    if let Some(author_ids) = &filter.author_ids {
        qb.push(" AND author_id = ANY(");
        qb.push_bind(author_ids.clone());
        qb.push(")");
    }
}

impl Blog {
    pub async fn list_published(db: &PgPool, filter: &PublicFilter) -> anyhow::Result<Vec<Blog>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, title, description, body, tags, author_id, state, read_count, \
             reading_time, created_at, updated_at \
             FROM blogs WHERE state = 'published'",
        );
        push_public_filters(&mut qb, filter);
        qb.push(" ORDER BY ");
        qb.push(filter.order_by.column());
        qb.push(" DESC LIMIT ");
        qb.push_bind(filter.limit);
        qb.push(" OFFSET ");
        qb.push_bind(filter.offset);

        let blogs = qb.build_query_as::<Blog>().fetch_all(db).await?;
        Ok(blogs)
    }

    pub async fn count_published(db: &PgPool, filter: &PublicFilter) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM blogs WHERE state = 'published'",
        );
        push_public_filters(&mut qb, filter);

        let total = qb.build_query_scalar::<i64>().fetch_one(db).await?;
        Ok(total)
    }

    pub async fn list_by_author(
        db: &PgPool,
        author_id: Uuid,
        state: Option<BlogState>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Blog>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, title, description, body, tags, author_id, state, read_count, \
             reading_time, created_at, updated_at \
             FROM blogs WHERE author_id = ",
        );
        qb.push_bind(author_id);
        if let Some(state) = state {
            qb.push(" AND state = ");
            qb.push_bind(state);
        }
        qb.push(" ORDER BY created_at DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let blogs = qb.build_query_as::<Blog>().fetch_all(db).await?;
        Ok(blogs)
    }

    pub async fn count_by_author(
        db: &PgPool,
        author_id: Uuid,
        state: Option<BlogState>,
    ) -> anyhow::Result<i64> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM blogs WHERE author_id = ");
        qb.push_bind(author_id);
        if let Some(state) = state {
            qb.push(" AND state = ");
            qb.push_bind(state);
        }

        let total = qb.build_query_scalar::<i64>().fetch_one(db).await?;
        Ok(total)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Blog>> {
        let blog = sqlx::query_as::<_, Blog>(
            r#"
            SELECT id, title, description, body, tags, author_id, state, read_count,
                   reading_time, created_at, updated_at
            FROM blogs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(blog)
    }

    /// Public single-item fetch: returns the blog only if published, counting
    /// the read with an atomic increment so concurrent fetches never lose one.
    pub async fn read_published(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Blog>> {
        let blog = sqlx::query_as::<_, Blog>(
            r#"
            UPDATE blogs
            SET read_count = read_count + 1
            WHERE id = $1 AND state = 'published'
            RETURNING id, title, description, body, tags, author_id, state, read_count,
                      reading_time, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(blog)
    }

    /// Create a new blog. State and read count are fixed here, not by callers.
    pub async fn create(
        db: &PgPool,
        author_id: Uuid,
        title: &str,
        description: Option<&str>,
        body: &str,
        tags: &[String],
        reading_time: i64,
    ) -> anyhow::Result<Blog> {
        let blog = sqlx::query_as::<_, Blog>(
            r#"
            INSERT INTO blogs (title, description, body, tags, author_id, state, read_count, reading_time)
            VALUES ($1, $2, $3, $4, $5, 'draft', 0, $6)
            RETURNING id, title, description, body, tags, author_id, state, read_count,
                      reading_time, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(body)
        .bind(tags)
        .bind(author_id)
        .bind(reading_time)
        .fetch_one(db)
        .await?;
        Ok(blog)
    }

    /// Persist the mutable fields of an already-merged record and stamp
    /// `updated_at`. Author and read count are never written here.
    pub async fn save_content(db: &PgPool, blog: &Blog) -> anyhow::Result<Blog> {
        let saved = sqlx::query_as::<_, Blog>(
            r#"
            UPDATE blogs
            SET title = $1, description = $2, body = $3, tags = $4, state = $5,
                reading_time = $6, updated_at = now()
            WHERE id = $7
            RETURNING id, title, description, body, tags, author_id, state, read_count,
                      reading_time, created_at, updated_at
            "#,
        )
        .bind(&blog.title)
        .bind(&blog.description)
        .bind(&blog.body)
        .bind(&blog.tags)
        .bind(blog.state)
        .bind(blog.reading_time)
        .bind(blog.id)
        .fetch_one(db)
        .await?;
        Ok(saved)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM blogs WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_field_accepts_both_spellings() {
        assert_eq!(SortField::parse("createdAt"), SortField::CreatedAt);
        assert_eq!(SortField::parse("created_at"), SortField::CreatedAt);
        assert_eq!(SortField::parse("readCount"), SortField::ReadCount);
        assert_eq!(SortField::parse("reading_time"), SortField::ReadingTime);
        assert_eq!(SortField::parse("title"), SortField::Title);
    }

    #[test]
    fn sort_field_falls_back_to_created_at() {
        // Arbitrary caller input must never reach the ORDER BY clause
        assert_eq!(SortField::parse(""), SortField::CreatedAt);
        assert_eq!(SortField::parse("timestamp"), SortField::CreatedAt);
        assert_eq!(SortField::parse("id; DROP TABLE blogs"), SortField::CreatedAt);
    }

    #[test]
    fn blog_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&BlogState::Draft).unwrap(), "\"draft\"");
        assert_eq!(
            serde_json::to_string(&BlogState::Published).unwrap(),
            "\"published\""
        );
    }
}
