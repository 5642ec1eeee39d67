/// Article endpoints
///
/// - `GET    /v1/articles` - List articles visible to the requester
/// - `GET    /v1/articles/:id` - Get one article
/// - `POST   /v1/articles` - Create (any approved user)
/// - `PUT    /v1/articles/:id` - Update (author or admin)
/// - `DELETE /v1/articles/:id` - Delete (author or admin)
///
/// Articles the requester may not read answer 404, the same as articles that
/// don't exist, so their existence is not disclosed.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::{double_option, log_activity, Page, Pagination},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use memberhub_shared::{
    auth::authorization::{
        article_list_filter, authorize, can_view_article, require_user, Action, Principal, Resource,
    },
    category::ArticleCategory,
    models::{
        activity_log::ActivityAction,
        article::{Article, ArticleQuery, ArticleStatus, CreateArticle, UpdateArticle, Visibility},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::{Validate, ValidateUrl};

/// Filters for `GET /v1/articles`
#[derive(Debug, Default, Deserialize)]
pub struct ListArticlesParams {
    /// Canonical category or legacy alias
    pub category: Option<String>,
    pub status: Option<String>,
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateArticleRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,

    #[validate(length(max = 500, message = "Excerpt must be at most 500 characters"))]
    pub excerpt: Option<String>,

    #[validate(
        url(message = "Invalid image URL"),
        length(max = 512, message = "Image URL must be at most 512 characters")
    )]
    pub image_url: Option<String>,

    /// Default: general
    pub category: Option<String>,

    /// Default: public
    pub visibility: Option<String>,

    /// Default: published
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateArticleRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub excerpt: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,

    pub category: Option<String>,
    pub visibility: Option<String>,
    pub status: Option<String>,
}

const MAX_EXCERPT_LENGTH: usize = 500;
const MAX_IMAGE_URL_LENGTH: usize = 512;

impl UpdateArticleRequest {
    /// Checks the clearable fields, which the derive does not reach
    fn validate_clearable(&self) -> ApiResult<()> {
        let mut details = Vec::new();

        if let Some(Some(excerpt)) = &self.excerpt {
            if excerpt.chars().count() > MAX_EXCERPT_LENGTH {
                details.push(ValidationErrorDetail {
                    field: "excerpt".to_string(),
                    message: "Excerpt must be at most 500 characters".to_string(),
                });
            }
        }

        if let Some(Some(image_url)) = &self.image_url {
            if !image_url.validate_url() {
                details.push(ValidationErrorDetail {
                    field: "image_url".to_string(),
                    message: "Invalid image URL".to_string(),
                });
            } else if image_url.chars().count() > MAX_IMAGE_URL_LENGTH {
                details.push(ValidationErrorDetail {
                    field: "image_url".to_string(),
                    message: "Image URL must be at most 512 characters".to_string(),
                });
            }
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(ApiError::ValidationError(details))
        }
    }
}

/// Article as returned to clients, with its category in canonical form
#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub category: String,
    pub visibility: Visibility,
    pub status: ArticleStatus,
    pub author_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        let category = article
            .canonical_category()
            .map(|c| c.as_str().to_string())
            .unwrap_or(article.category);

        Self {
            id: article.id,
            title: article.title,
            content: article.content,
            excerpt: article.excerpt,
            image_url: article.image_url,
            category,
            visibility: article.visibility,
            status: article.status,
            author_id: article.author_id,
            created_at: article.created_at,
            updated_at: article.updated_at,
            published_at: article.published_at,
        }
    }
}

fn parse_category(raw: &str) -> ApiResult<ArticleCategory> {
    ArticleCategory::normalize(raw)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid category: '{}'", raw.trim())))
}

/// Loads an article the requester may read; hidden articles are 404
async fn find_visible(state: &AppState, principal: &Principal, id: Uuid) -> ApiResult<Article> {
    match Article::find_by_id(&state.db, id).await? {
        Some(article) if can_view_article(principal, &article.access()) => Ok(article),
        _ => Err(ApiError::not_found("Article")),
    }
}

/// List articles
///
/// ```text
/// GET /v1/articles?category=avantages&limit=10
/// ```
///
/// The category filter accepts legacy aliases and matches rows stored under
/// any label of the same canonical category.
pub async fn list_articles(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<ListArticlesParams>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<Page<ArticleResponse>>> {
    let query = ArticleQuery {
        category: params.category.as_deref().map(parse_category).transpose()?,
        status: params.status.as_deref().map(str::parse).transpose()?,
        author_id: params.author_id,
        limit: pagination.limit(),
        offset: pagination.offset(),
    };

    let filter = article_list_filter(&principal);
    let articles = Article::list(&state.db, &filter, &query).await?;
    let total = Article::count(&state.db, &filter, &query).await?;

    let items = articles.into_iter().map(ArticleResponse::from).collect();
    Ok(Json(Page::new(items, &pagination).with_total(total)))
}

pub async fn get_article(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ArticleResponse>> {
    let article = find_visible(&state, &principal, id).await?;
    Ok(Json(article.into()))
}

/// Create an article authored by the requester
///
/// # Errors
///
/// - `400 Bad Request`: Unknown category, visibility or status
/// - `401 Unauthorized`: Anonymous requester
/// - `422 Unprocessable Entity`: Validation failed
pub async fn create_article(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateArticleRequest>,
) -> ApiResult<(StatusCode, Json<ArticleResponse>)> {
    authorize(&principal, Action::Create, Resource::Articles)?;
    let (author_id, _) = require_user(&principal)?;
    req.validate()?;

    let data = CreateArticle {
        title: req.title,
        content: req.content,
        excerpt: req.excerpt,
        image_url: req.image_url,
        category: req
            .category
            .as_deref()
            .map(parse_category)
            .transpose()?
            .unwrap_or(ArticleCategory::General),
        visibility: req.visibility.as_deref().map(str::parse).transpose()?.unwrap_or(Visibility::Public),
        status: req
            .status
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or(ArticleStatus::Published),
        author_id,
    };

    let article = Article::create(&state.db, data).await?;

    tracing::info!(article_id = %article.id, %author_id, "Article created");
    log_activity(
        &state,
        Some(author_id),
        ActivityAction::ArticleCreated,
        json!({ "article_id": article.id, "title": article.title }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(article.into())))
}

/// Update an article
///
/// # Errors
///
/// - `403 Forbidden`: Neither the author nor an admin
/// - `404 Not Found`: Absent or not readable by the requester
pub async fn update_article(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateArticleRequest>,
) -> ApiResult<Json<ArticleResponse>> {
    let existing = find_visible(&state, &principal, id).await?;
    authorize(&principal, Action::Update, Resource::Article(&existing.access()))?;
    req.validate()?;
    req.validate_clearable()?;

    let data = UpdateArticle {
        title: req.title,
        content: req.content,
        excerpt: req.excerpt,
        image_url: req.image_url,
        category: req.category.as_deref().map(parse_category).transpose()?,
        visibility: req.visibility.as_deref().map(str::parse).transpose()?,
        status: req.status.as_deref().map(str::parse).transpose()?,
    };

    if data.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let article = Article::update(&state.db, id, data)
        .await?
        .ok_or_else(|| ApiError::not_found("Article"))?;

    log_activity(
        &state,
        principal.user_id(),
        ActivityAction::ArticleUpdated,
        json!({ "article_id": article.id }),
    )
    .await;

    Ok(Json(article.into()))
}

pub async fn delete_article(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let existing = find_visible(&state, &principal, id).await?;
    authorize(&principal, Action::Delete, Resource::Article(&existing.access()))?;

    if !Article::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Article"));
    }

    tracing::info!(article_id = %id, "Article deleted");
    log_activity(
        &state,
        principal.user_id(),
        ActivityAction::ArticleDeleted,
        json!({ "article_id": id, "title": existing.title }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
