use super::*;
use axum::http::HeaderMap;
use crate::credentials::{CredentialCodec, CredentialRecord, TokenKey};
use chrono::{Duration, Utc};

#[cfg(test)]
mod extract_bearer_token_tests {
    use super::*;

    #[test]
    fn valid_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            "Bearer eyJhbGciOiJkaXIiLCJlbmMiOiJBMjU2R0NNIn0..aXY.Y3Q.dGFn"
                .parse()
                .unwrap(),
        );

        let result = extract_bearer_token(&headers);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "eyJhbGciOiJkaXIiLCJlbmMiOiJBMjU2R0NNIn0..aXY.Y3Q.dGFn");
    }

    #[test]
    fn valid_bearer_token_with_extra_whitespace() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            "Bearer   eyJhbGciOiJkaXIiLCJlbmMiOiJBMjU2R0NNIn0..aXY.Y3Q.dGFn  "
                .parse()
                .unwrap(),
        );

        let result = extract_bearer_token(&headers);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "eyJhbGciOiJkaXIiLCJlbmMiOiJBMjU2R0NNIn0..aXY.Y3Q.dGFn");
    }

    #[test]
    fn case_insensitive_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            "bearer eyJhbGciOiJkaXIiLCJlbmMiOiJBMjU2R0NNIn0..aXY.Y3Q.dGFn"
                .parse()
                .unwrap(),
        );

        let result = extract_bearer_token(&headers);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "eyJhbGciOiJkaXIiLCJlbmMiOiJBMjU2R0NNIn0..aXY.Y3Q.dGFn");
    }

    #[test]
    fn missing_authorization_header() {
        let headers = HeaderMap::new();
        let result = extract_bearer_token(&headers);
        assert_eq!(result, Err(BearerError::Missing));
    }

    #[test]
    fn empty_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "".parse().unwrap());

        let result = extract_bearer_token(&headers);
        assert_eq!(result, Err(BearerError::InvalidFormat));
    }

    #[test]
    fn missing_bearer_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            "eyJhbGciOiJkaXIiLCJlbmMiOiJBMjU2R0NNIn0..aXY.Y3Q.dGFn".parse().unwrap(),
        );

        let result = extract_bearer_token(&headers);
        assert_eq!(result, Err(BearerError::InvalidFormat));
    }

    #[test]
    fn wrong_auth_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            "Basic dXNlcjpwYXNz".parse().unwrap(),
        );

        let result = extract_bearer_token(&headers);
        assert_eq!(result, Err(BearerError::InvalidFormat));
    }

    #[test]
    fn bearer_without_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer".parse().unwrap());

        let result = extract_bearer_token(&headers);
        assert_eq!(result, Err(BearerError::InvalidFormat));
    }

    #[test]
    fn bearer_with_empty_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer  ".parse().unwrap());

        let result = extract_bearer_token(&headers);
        assert_eq!(result, Err(BearerError::Empty));
    }
}

#[cfg(test)]
mod bearer_error_display_tests {
    use super::*;

    #[test]
    fn missing_error_message() {
        let error = BearerError::Missing;
        assert_eq!(error.to_string(), "Authorization token not provided");
    }

    #[test]
    fn invalid_format_error_message() {
        let error = BearerError::InvalidFormat;
        assert_eq!(error.to_string(), "Invalid authorization token format");
    }

    #[test]
    fn empty_error_message() {
        let error = BearerError::Empty;
        assert_eq!(error.to_string(), "Authorization token is empty");
    }
}

#[cfg(test)]
mod authenticate_tests {
    use super::*;

    fn codec(byte: u8) -> CredentialCodec {
        CredentialCodec::new(TokenKey::from_bytes(&[byte; 32]).unwrap())
    }

    fn record() -> CredentialRecord {
        CredentialRecord::new("db.example.com", "admin", "secret123")
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", format!("Bearer {}", token).parse().unwrap());
        headers
    }

    #[test]
    fn valid_token_yields_record() {
        let codec = codec(0);
        let token = codec.seal(&record(), Utc::now()).unwrap();

        let result = authenticate(&bearer_headers(&token), &codec);
        assert_eq!(result, Ok(record()));
    }

    #[test]
    fn missing_header_is_missing_token() {
        let result = authenticate(&HeaderMap::new(), &codec(0));
        assert_eq!(result, Err(AuthError::MissingToken));
    }

    #[test]
    fn malformed_header_is_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Token abc".parse().unwrap());
        assert_eq!(authenticate(&headers, &codec(0)), Err(AuthError::MissingToken));

        headers.insert("authorization", "Bearer   ".parse().unwrap());
        assert_eq!(authenticate(&headers, &codec(0)), Err(AuthError::MissingToken));
    }

    #[test]
    fn foreign_key_is_invalid() {
        let token = codec(0).seal(&record(), Utc::now()).unwrap();
        let result = authenticate(&bearer_headers(&token), &codec(1));
        assert_eq!(result, Err(AuthError::InvalidOrExpired));
    }

    #[test]
    fn expired_and_invalid_are_indistinguishable() {
        let codec = codec(0);
        let stale = codec
            .seal(&record(), Utc::now() - Duration::minutes(61))
            .unwrap();

        let expired = authenticate(&bearer_headers(&stale), &codec).unwrap_err();
        let garbage = authenticate(&bearer_headers("garbage"), &codec).unwrap_err();

        assert_eq!(expired, garbage);
        assert_eq!(expired.to_string(), garbage.to_string());
    }
}
