/// Board comment routes

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{ensure_owner, require_user, Claims};
use crate::error::AppError;
use crate::models::Comment;
use crate::validators::{is_valid_contents, require};

/// `board` is only read on create; updates never move a comment
#[derive(Deserialize, Default)]
pub struct CommentRequest {
    pub contents: Option<String>,
    pub board: Option<i64>,
}

async fn fetch_comment(pool: &PgPool, comment_id: i64) -> Result<Comment, AppError> {
    sqlx::query_as::<_, Comment>(&format!("{} WHERE c.id = $1", Comment::SELECT))
        .bind(comment_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))
}

/// POST /api/v1/boards/comments
///
/// # Errors
/// - 400: `contents` or `board` missing, or `board` names no post
///   (`DOES_NOT_EXIST`, raised by the foreign key)
pub async fn create_comment(
    claims: Option<web::ReqData<Claims>>,
    form: web::Json<CommentRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(pool.get_ref(), claims).await?;
    let form = form.into_inner();
    let contents = is_valid_contents(&require(form.contents, "contents")?)?;
    let board = require(form.board, "board")?;

    let now = Utc::now();
    let comment_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO comments (owner_id, board_id, contents, created_date, updated_date)
        VALUES ($1, $2, $3, $4, $4)
        RETURNING id
        "#,
    )
    .bind(user.id)
    .bind(board)
    .bind(contents)
    .bind(now)
    .fetch_one(pool.get_ref())
    .await?;

    tracing::info!(user_id = user.id, post_id = board, comment_id = comment_id, "Comment created");

    let comment = fetch_comment(pool.get_ref(), comment_id).await?;
    Ok(HttpResponse::Created().json(comment))
}

/// GET /api/v1/boards/comments/{id}
pub async fn get_comment(
    path: web::Path<i64>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let comment = fetch_comment(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// PUT /api/v1/boards/comments/{id}
pub async fn replace_comment(
    path: web::Path<i64>,
    claims: Option<web::ReqData<Claims>>,
    form: web::Json<CommentRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    update_comment(path.into_inner(), claims, form.into_inner(), false, pool).await
}

/// PATCH /api/v1/boards/comments/{id}
pub async fn patch_comment(
    path: web::Path<i64>,
    claims: Option<web::ReqData<Claims>>,
    form: web::Json<CommentRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    update_comment(path.into_inner(), claims, form.into_inner(), true, pool).await
}

async fn update_comment(
    comment_id: i64,
    claims: Option<web::ReqData<Claims>>,
    form: CommentRequest,
    partial: bool,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(pool.get_ref(), claims).await?;
    let comment = fetch_comment(pool.get_ref(), comment_id).await?;
    ensure_owner(comment.owner_id, &user)?;

    let contents = if partial {
        form.contents
    } else {
        Some(require(form.contents, "contents")?)
    };
    let contents = contents.as_deref().map(is_valid_contents).transpose()?;

    sqlx::query(
        r#"
        UPDATE comments
        SET contents = COALESCE($1, contents),
            updated_date = $2
        WHERE id = $3
        "#,
    )
    .bind(contents)
    .bind(Utc::now())
    .bind(comment.id)
    .execute(pool.get_ref())
    .await?;

    let comment = fetch_comment(pool.get_ref(), comment.id).await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// DELETE /api/v1/boards/comments/{id}
pub async fn delete_comment(
    path: web::Path<i64>,
    claims: Option<web::ReqData<Claims>>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user = require_user(pool.get_ref(), claims).await?;
    let comment = fetch_comment(pool.get_ref(), path.into_inner()).await?;
    ensure_owner(comment.owner_id, &user)?;

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment.id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
