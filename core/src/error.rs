use thiserror::Error;

/// Error taxonomy shared by the client and the MCP tool surface.
///
/// Callers branch on the variant (and on `Api::token_expired`) instead of
/// string-matching message text, so user-facing remediation stays stable
/// even when the remote service rewords its error bodies.
#[derive(Debug, Error)]
pub enum Error {
    /// No credential is stored, or the stored one expired and could not be
    /// refreshed. The caller should prompt for re-authentication, not retry.
    #[error("not authenticated with Basecamp; run `bcq auth login` to connect an account")]
    AuthUnavailable,

    /// Non-success HTTP status from the Basecamp API.
    #[error("Basecamp API returned {status}: {body}")]
    Api {
        status: u16,
        body: String,
        /// Status 401 with an "expired" marker in the body. The credential
        /// looked valid when the call started, so the remediation message
        /// differs from a generic API failure.
        token_expired: bool,
    },

    /// A project's dock has no entry with the expected name tag. Distinct
    /// from a 404 on the sub-resource endpoint itself.
    #[error("project {project_id} has no {tool} in its dock")]
    Discovery { project_id: u64, tool: String },

    /// Caller-supplied arguments were structurally invalid; rejected before
    /// any network call was made.
    #[error("invalid arguments: {0}")]
    Validation(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential store holds malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build an `Api` error from a status code and response body. The expiry
    /// check is on the body because Basecamp returns 401 for both revoked
    /// and expired tokens.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let token_expired = status == 401 && body.to_ascii_lowercase().contains("expired");
        Error::Api {
            status,
            body,
            token_expired,
        }
    }

    /// Machine-readable code for tool envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Error::AuthUnavailable => "auth_required",
            Error::Api {
                token_expired: true,
                ..
            } => "token_expired",
            Error::Api { .. } => "api_error",
            Error::Discovery { .. } => "dock_entry_missing",
            Error::Validation(_) => "validation_failed",
            Error::Http(_) => "connection_error",
            Error::Io(_) | Error::Json(_) => "credential_store_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn api_401_with_expired_body_sets_typed_flag() {
        let err = Error::api(401, r#"{"error":"OAuth token expired"}"#);
        match err {
            Error::Api {
                status,
                token_expired,
                ..
            } => {
                assert_eq!(status, 401);
                assert!(token_expired);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn api_401_without_expired_body_stays_generic() {
        let err = Error::api(401, "bad credentials");
        match err {
            Error::Api { token_expired, .. } => assert!(!token_expired),
            other => panic!("unexpected variant: {other:?}"),
        }
        assert_eq!(Error::api(401, "bad credentials").code(), "api_error");
    }

    #[test]
    fn expired_marker_on_non_401_is_ignored() {
        let err = Error::api(500, "session expired upstream");
        match err {
            Error::Api { token_expired, .. } => assert!(!token_expired),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn codes_are_stable_per_variant() {
        assert_eq!(Error::AuthUnavailable.code(), "auth_required");
        assert_eq!(Error::api(401, "token expired").code(), "token_expired");
        assert_eq!(Error::api(404, "not found").code(), "api_error");
        assert_eq!(
            Error::Discovery {
                project_id: 1,
                tool: "todoset".into()
            }
            .code(),
            "dock_entry_missing"
        );
        assert_eq!(
            Error::Validation("no fields".into()).code(),
            "validation_failed"
        );
    }
}
