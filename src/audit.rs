/// Security audit trail
///
/// Session and account events are written as structured log lines so they
/// can be filtered out of the regular request log. Tokens and passwords are
/// never part of an entry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Register,
    Login,
    Logout,
    TokenRefresh,
    TokenBlacklist,
    ProfileUpdate,
    AccountDelete,
    Activation,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditAction::Register => "REGISTER",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::TokenRefresh => "TOKEN_REFRESH",
            AuditAction::TokenBlacklist => "TOKEN_BLACKLIST",
            AuditAction::ProfileUpdate => "PROFILE_UPDATE",
            AuditAction::AccountDelete => "ACCOUNT_DELETE",
            AuditAction::Activation => "ACTIVATION",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLog {
    pub log_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub user_id: Option<i64>,
    /// Username as submitted; set for logins, which may fail before a user is known
    pub username: Option<String>,
    pub status: AuditStatus,
    pub message: String,
}

impl AuditLog {
    pub fn new(action: AuditAction, status: AuditStatus, message: impl Into<String>) -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action,
            user_id: None,
            username: None,
            status,
            message: message.into(),
        }
    }

    pub fn success(action: AuditAction, message: impl Into<String>) -> Self {
        Self::new(action, AuditStatus::Success, message)
    }

    pub fn failure(action: AuditAction, message: impl Into<String>) -> Self {
        Self::new(action, AuditStatus::Failure, message)
    }

    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn log(&self) {
        log_audit(self);
    }
}

pub fn log_audit(audit_log: &AuditLog) {
    match audit_log.status {
        AuditStatus::Failure => tracing::warn!(
            target: "audit",
            log_id = %audit_log.log_id,
            action = %audit_log.action,
            user_id = ?audit_log.user_id,
            username = ?audit_log.username,
            status = "FAILURE",
            message = %audit_log.message,
            "Audit log entry"
        ),
        AuditStatus::Success => tracing::info!(
            target: "audit",
            log_id = %audit_log.log_id,
            action = %audit_log.action,
            user_id = ?audit_log.user_id,
            username = ?audit_log.username,
            status = "SUCCESS",
            message = %audit_log.message,
            "Audit log entry"
        ),
    }
}
