mod activation;
mod auth;
mod comments;
mod health_check;
mod posts;
mod users;

pub use activation::activate;
pub use auth::{login, logout, refresh, DetailResponse};
pub use comments::{create_comment, delete_comment, get_comment, patch_comment, replace_comment};
pub use health_check::health_check;
pub use posts::{create_post, delete_post, get_post, list_posts, patch_post, replace_post};
pub use users::{delete_user, get_user, patch_user, register, replace_user};
