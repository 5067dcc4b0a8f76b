use axum::http::HeaderMap;
use base64::Engine as _;
use serde::Deserialize;
use tracing::warn;

/// Header carrying the externally-injected, base64-encoded identity
/// assertion (Static Web Apps convention).
pub const PRINCIPAL_HEADER: &str = "x-ms-client-principal";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
    pub user_login: String,
    pub user_provider: String,
}

impl UserIdentity {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            user_login: "anonymous".to_string(),
            user_provider: "none".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientPrincipal {
    user_id: Option<String>,
    user_details: Option<String>,
    identity_provider: Option<String>,
}

/// Resolves the caller identity from the principal header. A missing or
/// unparseable assertion falls back to the explicit anonymous identity;
/// identity extraction never fails a request.
pub fn extract_identity(headers: &HeaderMap) -> UserIdentity {
    let Some(raw) = headers.get(PRINCIPAL_HEADER) else {
        return UserIdentity::anonymous();
    };

    let principal = raw
        .to_str()
        .ok()
        .and_then(|value| base64::engine::general_purpose::STANDARD.decode(value).ok())
        .and_then(|decoded| serde_json::from_slice::<ClientPrincipal>(&decoded).ok());

    match principal {
        Some(principal) => {
            let user_login = principal
                .user_details
                .clone()
                .or_else(|| principal.user_id.clone())
                .unwrap_or_else(|| "unknown".to_string());

            UserIdentity {
                user_id: principal
                    .user_id
                    .unwrap_or_else(|| "unknown".to_string()),
                user_login,
                user_provider: principal
                    .identity_provider
                    .unwrap_or_else(|| "unknown".to_string()),
            }
        }
        None => {
            warn!("Failed to parse client principal header");
            UserIdentity::anonymous()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_principal(json: &str) -> HeaderMap {
        let encoded = base64::engine::general_purpose::STANDARD.encode(json);
        let mut headers = HeaderMap::new();
        headers.insert(PRINCIPAL_HEADER, HeaderValue::from_str(&encoded).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_anonymous() {
        let identity = extract_identity(&HeaderMap::new());
        assert_eq!(identity, UserIdentity::anonymous());
    }

    #[test]
    fn garbage_header_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(PRINCIPAL_HEADER, HeaderValue::from_static("!!not-base64!!"));
        assert_eq!(extract_identity(&headers), UserIdentity::anonymous());
    }

    #[test]
    fn full_principal_is_extracted() {
        let headers = headers_with_principal(
            r#"{"userId":"u1","userDetails":"alice","identityProvider":"github"}"#,
        );
        let identity = extract_identity(&headers);
        assert_eq!(identity.user_id, "u1");
        assert_eq!(identity.user_login, "alice");
        assert_eq!(identity.user_provider, "github");
    }

    #[test]
    fn login_falls_back_to_user_id_then_unknown() {
        let headers = headers_with_principal(r#"{"userId":"u1"}"#);
        let identity = extract_identity(&headers);
        assert_eq!(identity.user_login, "u1");
        assert_eq!(identity.user_provider, "unknown");

        let headers = headers_with_principal("{}");
        let identity = extract_identity(&headers);
        assert_eq!(identity.user_id, "unknown");
        assert_eq!(identity.user_login, "unknown");
    }
}
