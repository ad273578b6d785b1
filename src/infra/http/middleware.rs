use std::sync::Arc;
use std::time::Instant;

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::config::AuthSettings;

use super::auth::claimed_username;

/// Who asked for what, carried from the request into the response logs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// Username from the proxy header, before it is looked up.
    pub claimed_user: Option<String>,
    pub page: &'static str,
}

impl RequestContext {
    fn new(path: &str, claimed_user: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            claimed_user,
            page: page_kind(path),
        }
    }

    fn viewer(&self) -> &str {
        self.claimed_user.as_deref().unwrap_or("anonymous")
    }
}

/// Page family of a request path, used to group log lines.
pub(super) fn page_kind(path: &str) -> &'static str {
    let segments: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();
    match segments.as_slice() {
        [] => "index",
        ["group", _] => "group",
        ["profile", _] => "profile",
        ["profile", _, "follow" | "unfollow"] => "subscription",
        ["posts", _] => "post",
        ["posts", _, "edit"] => "post_edit",
        ["posts", _, "delete"] => "post_delete",
        ["posts", _, "comment"] => "comment",
        ["create"] => "post_create",
        ["follow"] => "follow",
        ["_health", "db"] => "health",
        _ => "unknown",
    }
}

pub async fn set_request_context(
    State(auth): State<Arc<AuthSettings>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let claimed_user =
        claimed_username(request.headers(), &auth.user_header).map(str::to_string);
    let ctx = RequestContext::new(request.uri().path(), claimed_user);
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Logs every failed response together with the `ErrorReport` its handler attached.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_else(|| RequestContext::new(uri.path(), None));

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "yatube::http::response",
                status = status.as_u16(),
                method = %method,
                page = ctx.page,
                path = %uri.path(),
                viewer = ctx.viewer(),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = %ctx.request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "yatube::http::response",
                status = status.as_u16(),
                method = %method,
                page = ctx.page,
                path = %uri.path(),
                viewer = ctx.viewer(),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                request_id = %ctx.request_id,
                "client request error",
            );
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::{Extension, Router, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn paths_map_to_page_families() {
        assert_eq!(page_kind("/"), "index");
        assert_eq!(page_kind("/group/cats/"), "group");
        assert_eq!(page_kind("/profile/leo/"), "profile");
        assert_eq!(page_kind("/profile/leo/unfollow/"), "subscription");
        assert_eq!(page_kind("/posts/42/"), "post");
        assert_eq!(page_kind("/posts/42/comment/"), "comment");
        assert_eq!(page_kind("/follow/"), "follow");
        assert_eq!(page_kind("/unexisting_page/"), "unknown");
    }

    async fn echo_context(Extension(ctx): Extension<RequestContext>) -> String {
        format!("{}:{}", ctx.page, ctx.viewer())
    }

    async fn context_for(request: Request<Body>) -> String {
        let auth = Arc::new(AuthSettings {
            user_header: "x-yatube-user".to_string(),
            login_url: "/auth/login/".to_string(),
        });
        let app = Router::new()
            .route("/profile/{username}/", get(echo_context))
            .layer(axum::middleware::from_fn_with_state(
                auth,
                set_request_context,
            ));

        let response = app.oneshot(request).await.expect("response");
        let body = response.into_body().collect().await.expect("body");
        String::from_utf8(body.to_bytes().to_vec()).expect("utf-8 body")
    }

    #[tokio::test]
    async fn context_carries_claimed_user() {
        let request = Request::builder()
            .uri("/profile/leo/")
            .header("x-yatube-user", " leo ")
            .body(Body::empty())
            .expect("request");

        assert_eq!(context_for(request).await, "profile:leo");
    }

    #[tokio::test]
    async fn missing_header_is_anonymous() {
        let request = Request::builder()
            .uri("/profile/leo/")
            .body(Body::empty())
            .expect("request");

        assert_eq!(context_for(request).await, "profile:anonymous");
    }
}
