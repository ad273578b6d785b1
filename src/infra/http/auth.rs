//! Identity of the requesting user.
//!
//! Authentication happens in front of this service: the proxy puts the
//! username in a configured header. A header naming an unknown user is
//! treated the same as no header at all.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
    response::{IntoResponse, Response},
};
use url::form_urlencoded;

use crate::domain::entities::UserRecord;

use super::{HttpState, found, repo_error_to_http};

const SOURCE: &str = "infra::http::auth::viewer";

/// Username the proxy put in `header`, trimmed; blank counts as absent.
pub(super) fn claimed_username<'a>(headers: &'a HeaderMap, header: &str) -> Option<&'a str> {
    headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// The signed-in user, if any.
pub struct Viewer(pub Option<UserRecord>);

impl Viewer {
    pub fn user(&self) -> Option<&UserRecord> {
        self.0.as_ref()
    }
}

impl FromRequestParts<HttpState> for Viewer {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let Some(username) = claimed_username(&parts.headers, &state.auth.user_header) else {
            return Ok(Viewer(None));
        };

        state
            .users
            .find_user_by_username(username)
            .await
            .map(Viewer)
            .map_err(|err| repo_error_to_http(SOURCE, err).into_response())
    }
}

/// A signed-in user; anonymous requests are sent to the login page.
pub struct AuthUser(pub UserRecord);

impl FromRequestParts<HttpState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        match Viewer::from_request_parts(parts, state).await? {
            Viewer(Some(user)) => Ok(AuthUser(user)),
            Viewer(None) => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                Err(found(login_redirect(&state.auth.login_url, next)))
            }
        }
    }
}

fn login_redirect(login_url: &str, next: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", next)
        .finish();
    format!("{login_url}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirect_carries_original_path() {
        assert_eq!(
            login_redirect("/auth/login/", "/create/"),
            "/auth/login/?next=%2Fcreate%2F"
        );
    }

    #[test]
    fn claimed_username_ignores_blank_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(claimed_username(&headers, "x-yatube-user"), None);

        headers.insert("x-yatube-user", "   ".parse().expect("header value"));
        assert_eq!(claimed_username(&headers, "x-yatube-user"), None);

        headers.insert("x-yatube-user", " leo ".parse().expect("header value"));
        assert_eq!(claimed_username(&headers, "x-yatube-user"), Some("leo"));
    }

    #[test]
    fn login_redirect_encodes_query_string() {
        assert_eq!(
            login_redirect("/auth/login/", "/follow/?page=2"),
            "/auth/login/?next=%2Ffollow%2F%3Fpage%3D2"
        );
    }
}
