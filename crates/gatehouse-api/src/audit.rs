//! Security audit logging for authentication events
//!
//! All audit events are logged at INFO (WARN for rejections) with the
//! "audit" target, so they can be filtered with `RUST_LOG=audit=info` and
//! routed separately from application logs. Passwords and raw tokens never
//! appear in an event.

use chrono::Utc;
use gatehouse_core::Role;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::middleware::metrics::record_auth_event;

/// Security audit events for authentication and authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// New account created (self-registration or by an admin)
    Registration {
        user_id: Uuid,
        role: Role,
        created_by: Option<Uuid>,
        ip_address: Option<String>,
    },

    /// Successful login
    LoginSuccess {
        user_id: Uuid,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Failed login; the reason is internal and never sent to the client
    LoginFailure {
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Refresh token rotated
    TokenRefresh {
        user_id: Uuid,
        revoked_token_id: Uuid,
        issued_token_id: Uuid,
        ip_address: Option<String>,
    },

    /// Logout
    Logout {
        user_id: Uuid,
        revoked_token_id: Option<Uuid>,
        ip_address: Option<String>,
    },

    /// Missing, invalid, expired or revoked token
    InvalidToken {
        token_kind: TokenKind,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    /// Authenticated caller lacks a required role
    AccessDenied {
        user_id: Uuid,
        role: Role,
        required_roles: Vec<Role>,
        resource: String,
        ip_address: Option<String>,
    },
}

/// Which token an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl AuditEvent {
    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            AuditEvent::Registration { .. } => "registration",
            AuditEvent::LoginSuccess { .. } => "login_success",
            AuditEvent::LoginFailure { .. } => "login_failure",
            AuditEvent::TokenRefresh { .. } => "token_refresh",
            AuditEvent::Logout { .. } => "logout",
            AuditEvent::InvalidToken { .. } => "invalid_token",
            AuditEvent::AccessDenied { .. } => "access_denied",
        }
    }
}

/// Log a security audit event with structured fields
///
/// The full event is also serialized to JSON for log aggregators:
///
/// ```json
/// {"event_type":"login_success","user_id":"550e8400-...","ip_address":"192.168.1.1","user_agent":null}
/// ```
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    record_auth_event(event.label());

    match event {
        AuditEvent::Registration {
            user_id,
            role,
            created_by,
            ip_address,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                role = %role,
                created_by = ?created_by,
                ip_address = ?ip_address,
                "User registered"
            );
        }
        AuditEvent::LoginSuccess {
            user_id,
            ip_address,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                ip_address = ?ip_address,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure {
            reason, ip_address, ..
        } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                reason = %reason,
                ip_address = ?ip_address,
                "Login failed"
            );
        }
        AuditEvent::TokenRefresh {
            user_id,
            revoked_token_id,
            issued_token_id,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                revoked_token_id = %revoked_token_id,
                issued_token_id = %issued_token_id,
                "Refresh token rotated"
            );
        }
        AuditEvent::Logout {
            user_id,
            revoked_token_id,
            ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                revoked_token_id = ?revoked_token_id,
                "User logout"
            );
        }
        AuditEvent::InvalidToken {
            token_kind,
            reason,
            ip_address,
            ..
        } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                token_kind = ?token_kind,
                reason = %reason,
                ip_address = ?ip_address,
                "Token rejected"
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            role,
            resource,
            ..
        } => {
            warn!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                role = %role,
                resource = %resource,
                "Access denied"
            );
        }
    }
}

/// Request origin recorded with audit events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Client IP from `X-Forwarded-For` (first hop) or `X-Real-IP`
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: Uuid::new_v4(),
            ip_address: Some("192.168.1.1".to_string()),
            user_agent: None,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_success\""));
        assert!(json.contains("192.168.1.1"));
    }

    #[test]
    fn test_access_denied_lists_roles() {
        let event = AuditEvent::AccessDenied {
            user_id: Uuid::new_v4(),
            role: Role::Customer,
            required_roles: vec![Role::Admin],
            resource: "POST /tenants".to_string(),
            ip_address: None,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["required_roles"][0], "admin");
        assert_eq!(json["role"], "customer");
        assert_eq!(event.label(), "access_denied");

        audit_log(&event);
    }

    #[test]
    fn test_invalid_token_event() {
        let event = AuditEvent::InvalidToken {
            token_kind: TokenKind::Refresh,
            reason: "record not found".to_string(),
            ip_address: None,
            user_agent: Some("curl/8.0".to_string()),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["token_kind"], "refresh");

        audit_log(&event);
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.7".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.7".to_string()));
    }

    #[test]
    fn test_extract_missing_headers() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(extract_ip_address(&headers), None);
        assert_eq!(extract_user_agent(&headers), None);
    }
}
