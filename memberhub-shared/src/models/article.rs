/// Article model and database operations
///
/// Category and visibility are independent axes: the category is the topic
/// tag (see [`crate::category`]), the visibility is the audience gate checked
/// by the access policy.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE article_visibility AS ENUM ('public', 'adherent', 'retraite', 'adherent_retraite');
/// CREATE TYPE article_status AS ENUM ('draft', 'published', 'archived');
///
/// CREATE TABLE articles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     content TEXT NOT NULL,
///     excerpt VARCHAR(500),
///     image_url VARCHAR(512),
///     category VARCHAR(50) NOT NULL DEFAULT 'general',
///     visibility article_visibility NOT NULL DEFAULT 'public',
///     status article_status NOT NULL DEFAULT 'published',
///     author_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     published_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use memberhub_shared::auth::authorization::{article_list_filter, Principal};
/// use memberhub_shared::category::ArticleCategory;
/// use memberhub_shared::models::article::{Article, ArticleQuery};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let filter = article_list_filter(&Principal::Anonymous);
/// let query = ArticleQuery {
///     category: Some(ArticleCategory::Prestations),
///     ..Default::default()
/// };
///
/// // Returns public, published articles tagged "prestations" or a legacy alias
/// let articles = Article::list(&pool, &filter, &query).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::str::FromStr;
use uuid::Uuid;

use super::ParseEnumError;
use crate::auth::authorization::{ArticleAccess, ArticleFilter};
use crate::category::ArticleCategory;

/// Audience an article is published for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "article_visibility", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Anyone, including anonymous visitors
    Public,

    /// Active members only
    Adherent,

    /// Retired members only
    Retraite,

    /// Active and retired members
    AdherentRetraite,
}

impl Visibility {
    pub const ALL: [Visibility; 4] = [
        Visibility::Public,
        Visibility::Adherent,
        Visibility::Retraite,
        Visibility::AdherentRetraite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Adherent => "adherent",
            Visibility::Retraite => "retraite",
            Visibility::AdherentRetraite => "adherent_retraite",
        }
    }
}

impl FromStr for Visibility {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "adherent" => Ok(Visibility::Adherent),
            "retraite" => Ok(Visibility::Retraite),
            "adherent_retraite" => Ok(Visibility::AdherentRetraite),
            other => Err(ParseEnumError::new("visibility", other)),
        }
    }
}

/// Editorial status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "article_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
    Archived,
}

impl ArticleStatus {
    pub const ALL: [ArticleStatus; 3] = [
        ArticleStatus::Draft,
        ArticleStatus::Published,
        ArticleStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
            ArticleStatus::Archived => "archived",
        }
    }
}

impl FromStr for ArticleStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ArticleStatus::Draft),
            "published" => Ok(ArticleStatus::Published),
            "archived" => Ok(ArticleStatus::Archived),
            other => Err(ParseEnumError::new("article status", other)),
        }
    }
}

/// Article row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: Uuid,

    pub title: String,

    pub content: String,

    pub excerpt: Option<String>,

    pub image_url: Option<String>,

    /// Stored label; may be a legacy alias on old rows
    pub category: String,

    pub visibility: Visibility,

    pub status: ArticleStatus,

    /// None once the author account has been deleted
    pub author_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Set the first time the article becomes `published`
    pub published_at: Option<DateTime<Utc>>,
}

/// Input for creating an article
#[derive(Debug, Clone)]
pub struct CreateArticle {
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub category: ArticleCategory,
    pub visibility: Visibility,
    pub status: ArticleStatus,
    pub author_id: Uuid,
}

/// Input for updating an article; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub category: Option<ArticleCategory>,
    pub visibility: Option<Visibility>,
    pub status: Option<ArticleStatus>,
}

impl UpdateArticle {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.excerpt.is_none()
            && self.image_url.is_none()
            && self.category.is_none()
            && self.visibility.is_none()
            && self.status.is_none()
    }
}

/// Caller-supplied narrowing applied on top of the access filter
#[derive(Debug, Clone)]
pub struct ArticleQuery {
    pub category: Option<ArticleCategory>,
    pub status: Option<ArticleStatus>,
    pub author_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            category: None,
            status: None,
            author_id: None,
            limit: 20,
            offset: 0,
        }
    }
}

const ARTICLE_COLUMNS: &str = "id, title, content, excerpt, image_url, category, visibility, status, \
                               author_id, created_at, updated_at, published_at";

impl Article {
    /// Policy-relevant attributes of this article
    pub fn access(&self) -> ArticleAccess {
        ArticleAccess {
            author_id: self.author_id,
            visibility: self.visibility,
            status: self.status,
        }
    }

    /// Canonical category, resolving legacy aliases
    pub fn canonical_category(&self) -> Option<ArticleCategory> {
        ArticleCategory::normalize(&self.category)
    }

    /// Creates an article
    ///
    /// The category is always stored in canonical form.
    pub async fn create(pool: &PgPool, data: CreateArticle) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO articles (title, content, excerpt, image_url, category, visibility, status,
                                  author_id, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                    CASE WHEN $7 = 'published'::article_status THEN NOW() END)
            RETURNING {ARTICLE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Article>(&query)
            .bind(data.title)
            .bind(data.content)
            .bind(data.excerpt)
            .bind(data.image_url)
            .bind(data.category.as_str())
            .bind(data.visibility)
            .bind(data.status)
            .bind(data.author_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");

        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists articles visible under `filter`, newest first
    pub async fn list(
        pool: &PgPool,
        filter: &ArticleFilter,
        query: &ArticleQuery,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE "
        ));
        push_conditions(&mut builder, filter, query);
        builder
            .push(" ORDER BY COALESCE(published_at, created_at) DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);

        builder.build_query_as::<Article>().fetch_all(pool).await
    }

    /// Counts articles visible under `filter` (ignores limit/offset)
    pub async fn count(
        pool: &PgPool,
        filter: &ArticleFilter,
        query: &ArticleQuery,
    ) -> Result<i64, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM articles WHERE ");
        push_conditions(&mut builder, filter, query);

        builder.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Updates an article
    ///
    /// Returns `None` if the article doesn't exist. Moving to `published` sets
    /// `published_at` the first time only.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateArticle,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE articles SET updated_at = NOW()");

        if let Some(title) = data.title {
            builder.push(", title = ").push_bind(title);
        }
        if let Some(content) = data.content {
            builder.push(", content = ").push_bind(content);
        }
        if let Some(excerpt) = data.excerpt {
            builder.push(", excerpt = ").push_bind(excerpt);
        }
        if let Some(image_url) = data.image_url {
            builder.push(", image_url = ").push_bind(image_url);
        }
        if let Some(category) = data.category {
            builder.push(", category = ").push_bind(category.as_str());
        }
        if let Some(visibility) = data.visibility {
            builder.push(", visibility = ").push_bind(visibility);
        }
        if let Some(status) = data.status {
            builder.push(", status = ").push_bind(status);
            if status == ArticleStatus::Published {
                builder.push(", published_at = COALESCE(published_at, NOW())");
            }
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {ARTICLE_COLUMNS}"));

        builder.build_query_as::<Article>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_by_status(pool: &PgPool, status: ArticleStatus) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await
    }
}

/// Appends the access filter and query narrowing as a WHERE body
fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter, query: &ArticleQuery) {
    match filter {
        ArticleFilter::Unrestricted => {
            builder.push("TRUE");
        }
        ArticleFilter::Restricted {
            visibilities,
            author_id,
        } => {
            let labels: Vec<String> = visibilities.iter().map(|v| v.as_str().to_string()).collect();
            builder
                .push("((status = 'published' AND visibility::text = ANY(")
                .push_bind(labels)
                .push("))");
            if let Some(author_id) = author_id {
                builder.push(" OR author_id = ").push_bind(*author_id);
            }
            builder.push(")");
        }
    }

    if let Some(category) = query.category {
        let labels: Vec<String> = category
            .stored_labels()
            .into_iter()
            .map(str::to_string)
            .collect();
        builder.push(" AND category = ANY(").push_bind(labels).push(")");
    }
    if let Some(status) = query.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(author_id) = query.author_id {
        builder.push(" AND author_id = ").push_bind(author_id);
    }
}
