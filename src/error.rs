//! Error types shared by routing, dispatch and rendering.

use axum::http::StatusCode;
use thiserror::Error;

/// Faults raised while handling a single request.
///
/// Every variant is terminal for the current request. The dispatcher maps
/// it to [`DispatchError::status`] and renders it through the error hook
/// named after [`DispatchError::category`].
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No registered route matched the method and path.
    #[error("{message}")]
    RouteNotFound { message: String },

    /// An extension refused access to the resource.
    #[error("Access denied")]
    AccessDenied,

    /// No engine accepts the resource under the requested constraints.
    #[error("No engine found for {path} (engine: {engine}, mime: {mime})")]
    EngineNotAvailable {
        engine: String,
        path: String,
        mime: String,
    },

    /// Anything else.
    #[error("{message}")]
    Fault { status: StatusCode, message: String },
}

impl DispatchError {
    /// Route lookup failed for `path`.
    pub fn route_not_found(path: &str) -> Self {
        Self::RouteNotFound {
            message: format!("No route matches {}", path),
        }
    }

    /// Generic internal fault.
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Fault with an explicit status code.
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Fault {
            status,
            message: message.into(),
        }
    }

    /// HTTP status this fault is presented with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::EngineNotAvailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Fault { status, .. } => *status,
        }
    }

    /// Category used to look up the presentation hook.
    pub fn category(&self) -> &'static str {
        match self {
            Self::RouteNotFound { .. } => "route_not_found",
            Self::AccessDenied => "access_denied",
            Self::EngineNotAvailable { .. } => "engine_not_available",
            Self::Fault { .. } => "fault",
        }
    }
}

/// Errors raised while registering routes.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid route template {template:?}: {source}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(DispatchError::route_not_found("/x").status(), StatusCode::NOT_FOUND);
        assert_eq!(DispatchError::AccessDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            DispatchError::fault("boom").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            DispatchError::with_status(StatusCode::BAD_REQUEST, "bad").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(DispatchError::route_not_found("/a/b").to_string(), "No route matches /a/b");
        assert_eq!(DispatchError::AccessDenied.to_string(), "Access denied");
        let err = DispatchError::EngineNotAvailable {
            engine: "gallery".into(),
            path: "notes".into(),
            mime: "text/plain".into(),
        };
        assert_eq!(
            err.to_string(),
            "No engine found for notes (engine: gallery, mime: text/plain)"
        );
        assert_eq!(err.category(), "engine_not_available");
    }
}
