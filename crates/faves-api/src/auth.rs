use std::collections::HashMap;

use axum::http::HeaderMap;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Resolves static bearer tokens to the users they were issued for.
#[derive(Clone)]
pub struct TokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl TokenAuthenticator {
    pub const fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        self.tokens
            .get(token)
            .map(|user_id| AuthenticatedUser {
                user_id: user_id.clone(),
            })
            .ok_or_else(|| AppError::unauthorized("Unknown access token"))
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn bearer_token_extractor_accepts_standard_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("bearer tok-1"));

        assert_eq!(extract_bearer_token(&headers).unwrap(), "tok-1");
    }

    #[test]
    fn bearer_token_extractor_rejects_missing_or_wrong_scheme() {
        assert!(extract_bearer_token(&HeaderMap::new()).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_bearer_token(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn authenticator_maps_tokens_to_users() {
        let authenticator =
            TokenAuthenticator::new(HashMap::from([("tok-a".to_string(), "alice".to_string())]));
        assert_eq!(
            authenticator.authenticate("tok-a").unwrap().user_id,
            "alice"
        );
        assert!(matches!(
            authenticator.authenticate("tok-b"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
