/// Row types and their JSON representations

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
}

/// Public view of a user; the password hash never leaves the server
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub fullname: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            fullname: user.fullname.clone(),
        }
    }
}

/// A post joined with its owner's username and comment count
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    #[serde(skip)]
    pub owner_id: i64,
    pub owner: String,
    pub title: String,
    pub contents: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub comment_num: i64,
}

impl Post {
    pub const SELECT: &'static str = r#"
        SELECT p.id, p.owner_id, u.username AS owner, p.title, p.contents,
               p.created_date, p.updated_date,
               (SELECT COUNT(*) FROM comments c WHERE c.board_id = p.id) AS comment_num
        FROM posts p
        JOIN users u ON u.id = p.owner_id
    "#;
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub board: i64,
    #[serde(skip)]
    pub owner_id: i64,
    pub owner: String,
    pub contents: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
}

impl Comment {
    pub const SELECT: &'static str = r#"
        SELECT c.id, c.board_id AS board, c.owner_id, u.username AS owner, c.contents,
               c.created_date, c.updated_date
        FROM comments c
        JOIN users u ON u.id = c.owner_id
    "#;
}
