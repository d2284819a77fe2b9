//! Authorization stage

use std::sync::Arc;

use reqwest::Request;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::trace;

use super::{Error, RequestStage};
use crate::storage::{TOKEN_KEY, TokenStorage};

/// Attaches the stored token as `Authorization: Bearer {token}`
///
/// The token is read from the storage for every request, so the requests always use the token of
/// the current session. If there is no token, the header is removed.
pub struct AuthStage {
    storage: Arc<dyn TokenStorage>,
}

impl AuthStage {
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self { storage }
    }
}

impl RequestStage for AuthStage {
    fn apply(&self, request: &mut Request) -> Result<(), Error> {
        let headers = request.headers_mut();
        match self.storage.get(TOKEN_KEY)? {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                trace!("Authorization attached");
            }
            None => {
                headers.remove(AUTHORIZATION);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use reqwest::Method;

    use crate::storage::MemoryStorage;

    fn request() -> Request {
        Request::new(Method::POST, "http://localhost:5000/".parse().unwrap())
    }

    #[test]
    fn attaches_stored_token() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok123").unwrap();
        let stage = AuthStage::new(storage);

        let mut request = request();
        stage.apply(&mut request).unwrap();

        let header = request.headers().get(AUTHORIZATION).unwrap();
        assert_eq!(header, "Bearer tok123");
        assert!(header.is_sensitive());
    }

    #[test]
    fn clears_header_without_token() {
        let stage = AuthStage::new(Arc::new(MemoryStorage::new()));

        let mut request = request();
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        stage.apply(&mut request).unwrap();

        assert_eq!(request.headers().get(AUTHORIZATION), None);
    }

    #[test]
    fn follows_storage_changes() {
        let storage = Arc::new(MemoryStorage::new());
        let stage = AuthStage::new(storage.clone());

        storage.set(TOKEN_KEY, "tok1").unwrap();
        let mut first = request();
        stage.apply(&mut first).unwrap();

        storage.set(TOKEN_KEY, "tok2").unwrap();
        let mut second = request();
        stage.apply(&mut second).unwrap();

        storage.remove(TOKEN_KEY).unwrap();
        let mut third = request();
        stage.apply(&mut third).unwrap();

        assert_eq!(first.headers()[AUTHORIZATION], "Bearer tok1");
        assert_eq!(second.headers()[AUTHORIZATION], "Bearer tok2");
        assert!(!third.headers().contains_key(AUTHORIZATION));
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(TOKEN_KEY, "tok\n123").unwrap();
        let stage = AuthStage::new(storage);

        let err = stage.apply(&mut request()).unwrap_err();
        assert!(matches!(err, Error::InvalidToken(_)), "{err:?}");
    }
}
