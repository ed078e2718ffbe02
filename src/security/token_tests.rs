#[cfg(test)]
mod tests {
    use crate::security::{AuthError, BearerAuth, Claims};
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    const SECRET: &str = "late-night-secret";

    fn auth() -> BearerAuth {
        BearerAuth::from_secret(SECRET).unwrap()
    }

    fn session() -> Claims {
        Claims {
            user_id: Some("65a1f0c2e4b0a1b2c3d4e5f6".to_string()),
            email: Some("owl@lateplate.test".to_string()),
            role: Some("user".to_string()),
            ..Claims::default()
        }
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[test]
    fn test_valid_token_returns_claims() {
        let token = auth().issue(session(), Duration::days(7)).unwrap();

        let claims = auth().verify(Some(&bearer(&token))).unwrap();
        assert_eq!(claims.user_id, session().user_id);
        assert_eq!(claims.role.as_deref(), Some("user"));
        assert!(claims.exp.unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_expired_token() {
        let token = auth().issue(session(), Duration::hours(-1)).unwrap();

        let result = auth().verify(Some(&bearer(&token)));
        assert_eq!(result.unwrap_err(), AuthError::TokenExpired);
    }

    #[test]
    fn test_wrong_secret() {
        let other = BearerAuth::from_secret("early-bird-secret").unwrap();
        let token = other.issue(session(), Duration::days(7)).unwrap();

        let result = auth().verify(Some(&bearer(&token)));
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_token_without_expiry_is_accepted() {
        // Same shape the login flow signs, minus expiresIn
        let token = encode(
            &Header::default(),
            &session(),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let claims = auth().verify(Some(&bearer(&token))).unwrap();
        assert_eq!(claims.email.as_deref(), Some("owl@lateplate.test"));
        assert_eq!(claims.exp, None);
    }

    #[test]
    fn test_garbage_token() {
        let result = auth().verify(Some("Bearer not.a.jwt"));
        assert_eq!(result.unwrap_err(), AuthError::InvalidToken);
    }

    #[test]
    fn test_missing_header() {
        let result = auth().verify(None);
        assert_eq!(result.unwrap_err(), AuthError::MissingCredential);
    }

    #[test]
    fn test_blank_header_is_missing() {
        let result = auth().verify(Some("   "));
        assert_eq!(result.unwrap_err(), AuthError::MissingCredential);
    }

    #[test]
    fn test_reject_non_bearer_scheme() {
        let result = auth().verify(Some("Basic dXNlcjpwYXNz"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Bearer <token>"));
    }

    #[test]
    fn test_reject_empty_token() {
        let result = auth().verify(Some("Bearer    "));
        assert!(matches!(result, Err(AuthError::MalformedHeader(_))));
    }

    #[test]
    fn test_reject_empty_secret() {
        let result = BearerAuth::from_secret("");
        assert!(matches!(result, Err(AuthError::InvalidSecret(_))));
    }
}
