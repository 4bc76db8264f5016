/// Board post routes
///
/// Reading is public. Writing requires a logged-in user, and only the owner
/// may change or delete a post.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{ensure_owner, require_user, Claims};
use crate::configuration::ApplicationSettings;
use crate::error::AppError;
use crate::models::{Comment, Post};
use crate::pagination::{absolute_url, Page, PageQuery, PageRequest};
use crate::validators::{is_valid_contents, is_valid_title, require};

/// `owner` and any other unknown fields in the body are ignored
#[derive(Deserialize, Default)]
pub struct PostRequest {
    pub title: Option<String>,
    pub contents: Option<String>,
}

#[derive(Serialize)]
pub struct PostDetail {
    pub board: Post,
    pub comment: Vec<Comment>,
}

impl PostRequest {
    fn validate(self, partial: bool) -> Result<(Option<String>, Option<String>), AppError> {
        let (title, contents) = if partial {
            (self.title, self.contents)
        } else {
            (
                Some(require(self.title, "title")?),
                Some(require(self.contents, "contents")?),
            )
        };

        Ok((
            title.as_deref().map(is_valid_title).transpose()?,
            contents.as_deref().map(is_valid_contents).transpose()?,
        ))
    }
}

async fn fetch_post(pool: &PgPool, post_id: i64) -> Result<Post, AppError> {
    sqlx::query_as::<_, Post>(&format!("{} WHERE p.id = $1", Post::SELECT))
        .bind(post_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("post"))
}

/// GET /api/v1/boards/posts?page=N
///
/// Newest first.
///
/// # Errors
/// - 404: `page` is not a positive integer or lies past the last page
pub async fn list_posts(
    req: HttpRequest,
    query: web::Query<PageQuery>,
    pool: web::Data<PgPool>,
    app_settings: web::Data<ApplicationSettings>,
) -> Result<HttpResponse, AppError> {
    let page = PageRequest::parse(query.page.as_deref(), app_settings.page_size)?;

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
        .fetch_one(pool.get_ref())
        .await?;
    page.ensure_exists(count)?;

    let posts = sqlx::query_as::<_, Post>(&format!(
        "{} ORDER BY p.id DESC LIMIT $1 OFFSET $2",
        Post::SELECT
    ))
    .bind(page.page_size)
    .bind(page.offset())
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(Page::new(posts, count, page, &absolute_url(&req))))
}

/// POST /api/v1/boards/posts
pub async fn create_post(
    claims: Option<web::ReqData<Claims>>,
    form: web::Json<PostRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(pool.get_ref(), claims).await?;
    let (title, contents) = form.into_inner().validate(false)?;

    let now = Utc::now();
    let post_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO posts (owner_id, title, contents, created_date, updated_date)
        VALUES ($1, $2, $3, $4, $4)
        RETURNING id
        "#,
    )
    .bind(user.id)
    .bind(title)
    .bind(contents)
    .bind(now)
    .fetch_one(pool.get_ref())
    .await?;

    tracing::info!(user_id = user.id, post_id = post_id, "Post created");

    let post = fetch_post(pool.get_ref(), post_id).await?;
    Ok(HttpResponse::Created().json(post))
}

/// GET /api/v1/boards/posts/{id}
///
/// The post together with all of its comments, oldest comment first.
pub async fn get_post(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let post = fetch_post(pool.get_ref(), path.into_inner()).await?;

    let comments = sqlx::query_as::<_, Comment>(&format!(
        "{} WHERE c.board_id = $1 ORDER BY c.id ASC",
        Comment::SELECT
    ))
    .bind(post.id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(PostDetail {
        board: post,
        comment: comments,
    }))
}

/// PUT /api/v1/boards/posts/{id}
pub async fn replace_post(
    path: web::Path<i64>,
    claims: Option<web::ReqData<Claims>>,
    form: web::Json<PostRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    update_post(path.into_inner(), claims, form.into_inner(), false, pool).await
}

/// PATCH /api/v1/boards/posts/{id}
pub async fn patch_post(
    path: web::Path<i64>,
    claims: Option<web::ReqData<Claims>>,
    form: web::Json<PostRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    update_post(path.into_inner(), claims, form.into_inner(), true, pool).await
}

async fn update_post(
    post_id: i64,
    claims: Option<web::ReqData<Claims>>,
    form: PostRequest,
    partial: bool,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(pool.get_ref(), claims).await?;
    let post = fetch_post(pool.get_ref(), post_id).await?;
    ensure_owner(post.owner_id, &user)?;

    let (title, contents) = form.validate(partial)?;

    sqlx::query(
        r#"
        UPDATE posts
        SET title = COALESCE($1, title),
            contents = COALESCE($2, contents),
            updated_date = $3
        WHERE id = $4
        "#,
    )
    .bind(title)
    .bind(contents)
    .bind(Utc::now())
    .bind(post.id)
    .execute(pool.get_ref())
    .await?;

    let post = fetch_post(pool.get_ref(), post.id).await?;
    Ok(HttpResponse::Ok().json(post))
}

/// DELETE /api/v1/boards/posts/{id}
///
/// Comments on the post are deleted with it.
pub async fn delete_post(
    path: web::Path<i64>,
    claims: Option<web::ReqData<Claims>>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(pool.get_ref(), claims).await?;
    let post = fetch_post(pool.get_ref(), path.into_inner()).await?;
    ensure_owner(post.owner_id, &user)?;

    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(post.id)
        .execute(pool.get_ref())
        .await?;

    tracing::info!(user_id = user.id, post_id = post.id, "Post deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    #[test]
    fn test_full_update_requires_title_and_contents() {
        let request = PostRequest {
            title: Some("Title".to_string()),
            contents: None,
        };

        match request.validate(false) {
            Err(AppError::Validation(ValidationError::MissingField(field))) => {
                assert_eq!(field, "contents")
            }
            _ => panic!("Expected missing contents"),
        }
    }

    #[test]
    fn test_partial_update_accepts_single_field() {
        let request = PostRequest {
            title: Some("New title".to_string()),
            contents: None,
        };

        let (title, contents) = request.validate(true).unwrap();
        assert_eq!(title.as_deref(), Some("New title"));
        assert!(contents.is_none());
    }

    #[test]
    fn test_owner_in_body_is_ignored() {
        let request: PostRequest =
            serde_json::from_str(r#"{"title": "t", "contents": "c", "owner": 99}"#).unwrap();
        assert_eq!(request.title.as_deref(), Some("t"));
    }

    #[test]
    fn test_blank_contents_rejected() {
        let request = PostRequest {
            title: Some("Title".to_string()),
            contents: Some("   ".to_string()),
        };
        assert!(request.validate(false).is_err());
    }
}
