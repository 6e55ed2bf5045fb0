use thiserror::Error;

/// Token acquisition failed against the token-issuing endpoint.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token endpoint returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("token endpoint returned an unreadable body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("token endpoint returned an empty token")]
    EmptyToken,
    #[error("token request could not be sent: {0}")]
    Request(#[source] reqwest::Error),
}

/// A Direct Line request failed: non-2xx status or the request never made it.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("direct line returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("direct line returned an unreadable body: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("direct line request could not be sent: {0}")]
    Request(#[source] reqwest::Error),
}

impl TransportError {
    /// Upstream wording observed when a conversation token has gone stale.
    /// Kept as a fallback for fronting proxies that rewrite status codes.
    const STALE_TOKEN_SIGNATURE: &'static str = "Token not valid for this conversation";

    /// Whether the failure means the conversation token is no longer
    /// accepted, so the caller should open a fresh conversation. A 401/403
    /// is the typed signal; the body match is the fallback.
    pub fn is_stale_token(&self) -> bool {
        match self {
            TransportError::Upstream { status, body } => {
                matches!(*status, 401 | 403) || body.contains(Self::STALE_TOKEN_SIGNATURE)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_status_is_stale_token() {
        let err = TransportError::Upstream {
            status: 403,
            body: "{}".into(),
        };
        assert!(err.is_stale_token());
    }

    #[test]
    fn signature_in_body_is_stale_token_regardless_of_status() {
        let err = TransportError::Upstream {
            status: 502,
            body: "upstream said: Token not valid for this conversation".into(),
        };
        assert!(err.is_stale_token());
    }

    #[test]
    fn other_upstream_failures_are_not_stale() {
        let err = TransportError::Upstream {
            status: 500,
            body: "boom".into(),
        };
        assert!(!err.is_stale_token());
    }
}
