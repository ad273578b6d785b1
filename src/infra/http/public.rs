use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    application::{
        error::HttpError,
        feed::{FeedError, FeedScope, FeedService},
        pagination::parse_page_number,
        posts::{PostError, PostService},
        repos::UsersRepo,
        subscriptions::SubscriptionService,
    },
    config::AuthSettings,
    infra::db::SqliteRepositories,
    presentation::views::{
        FeedView, FollowTemplate, GroupListTemplate, GroupView, IndexTemplate, LayoutContext,
        PostDetailTemplate, PostDetailView, ProfileTemplate, ProfileView,
        render_not_found_response, render_template_response,
    },
};

use super::{
    AuthUser, Viewer, actions, db_health_response,
    middleware::{log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub users: Arc<dyn UsersRepo>,
    pub db: Arc<SqliteRepositories>,
    pub auth: Arc<AuthSettings>,
}

pub fn build_router(state: HttpState) -> Router {
    let read_routes = Router::new()
        .route("/", get(index))
        .route("/group/{slug}/", get(group_posts))
        .route("/profile/{username}/", get(profile))
        .route("/posts/{id}/", get(post_detail))
        .route("/follow/", get(follow_index))
        .route("/_health/db", get(public_health));

    let auth = state.auth.clone();
    read_routes
        .merge(actions::router())
        .fallback(fallback_router)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn_with_state(auth, set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct PageQuery {
    page: Option<String>,
}

impl PageQuery {
    pub(super) fn number(&self) -> u32 {
        parse_page_number(self.page.as_deref())
    }
}

/// Path ids that do not parse as UUIDs name no post.
pub(super) fn parse_post_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

async fn index(
    State(state): State<HttpState>,
    viewer: Viewer,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.get_page(FeedScope::All, query.number()).await {
        Ok(page) => {
            let view = LayoutContext::new(
                viewer.user(),
                "Latest updates on the site",
                FeedView::from_page(&page),
            );
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer),
    }
}

async fn group_posts(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    match state.feed.group_page(&slug, query.number()).await {
        Ok(group) => {
            let title = format!("Posts of the group {}", group.group.title);
            let view = LayoutContext::new(viewer.user(), title, GroupView::from(&group));
            render_template_response(GroupListTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer),
    }
}

async fn profile(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    let viewer_id = viewer.user().map(|user| user.id);
    match state
        .feed
        .profile(&username, viewer_id, query.number())
        .await
    {
        Ok(profile) => {
            let title = format!("Profile of {}", profile.author.display_name());
            let content = ProfileView::new(&profile, viewer.user());
            let view = LayoutContext::new(viewer.user(), title, content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, &viewer),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    viewer: Viewer,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(post_id) = parse_post_id(&raw_id) else {
        return render_not_found_response(viewer.user());
    };

    match state.posts.post_detail(post_id, viewer.user()).await {
        Ok(detail) => {
            let title = format!(
                "Post {}",
                crate::domain::posts::short_label(&detail.post.text)
            );
            let content = PostDetailView::new(&detail, viewer.user());
            let view = LayoutContext::new(viewer.user(), title, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(PostError::NotFound { .. }) => render_not_found_response(viewer.user()),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn follow_index(
    State(state): State<HttpState>,
    AuthUser(user): AuthUser,
    Query(query): Query<PageQuery>,
) -> Response {
    match state
        .feed
        .get_page(FeedScope::ByFollower(user.id), query.number())
        .await
    {
        Ok(page) => {
            let view = LayoutContext::new(
                Some(&user),
                "Posts of authors you follow",
                FeedView::from_page(&page),
            );
            render_template_response(FollowTemplate { view }, StatusCode::OK)
        }
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn public_health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}

async fn fallback_router(viewer: Viewer) -> Response {
    render_not_found_response(viewer.user())
}

fn feed_error_to_response(err: FeedError, viewer: &Viewer) -> Response {
    match err {
        FeedError::NotFound { .. } => render_not_found_response(viewer.user()),
        other => HttpError::from(other).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_defaults_to_first_page() {
        assert_eq!(PageQuery::default().number(), 1);
        let query = PageQuery {
            page: Some("3".to_string()),
        };
        assert_eq!(query.number(), 3);
    }

    #[test]
    fn malformed_post_ids_are_rejected() {
        assert!(parse_post_id("not-a-uuid").is_none());
        let nil = uuid::Uuid::nil().to_string();
        assert_eq!(parse_post_id(&nil), Some(uuid::Uuid::nil()));
    }
}
