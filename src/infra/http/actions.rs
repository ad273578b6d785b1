//! Handlers that change state. Each one ends in a redirect on success.

use axum::{
    Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::debug;

use crate::{
    application::{
        error::HttpError,
        posts::{PostError, PostInput},
    },
    domain::entities::UserRecord,
    presentation::views::{
        LayoutContext, PostFormTemplate, PostFormView, post_href, profile_href,
        render_not_found_response, render_template_response,
    },
};

use super::{AuthUser, HttpState, found, public::parse_post_id};

pub(super) fn router() -> Router<HttpState> {
    Router::new()
        .route("/create/", get(create_form).post(create_submit))
        .route("/posts/{id}/edit/", get(edit_form).post(edit_submit))
        .route("/posts/{id}/delete/", post(delete_post))
        .route(
            "/posts/{id}/comment/",
            get(comment_get).post(comment_submit),
        )
        .route("/profile/{username}/follow/", get(follow))
        .route("/profile/{username}/unfollow/", get(unfollow))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostForm {
    text: String,
    group: Option<String>,
    image: Option<String>,
}

impl PostForm {
    fn to_input(&self) -> PostInput {
        PostInput {
            text: self.text.clone(),
            group_slug: self.group.clone(),
            image: self.image.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentForm {
    text: String,
}

async fn create_form(State(state): State<HttpState>, AuthUser(user): AuthUser) -> Response {
    match state.posts.list_groups().await {
        Ok(groups) => render_form(&user, PostFormView::create(&groups), StatusCode::OK),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn create_submit(
    State(state): State<HttpState>,
    AuthUser(user): AuthUser,
    Form(form): Form<PostForm>,
) -> Response {
    match state.posts.create_post(&user, form.to_input()).await {
        Ok(_) => found(profile_href(&user.username)),
        Err(PostError::Validation(message)) => match state.posts.list_groups().await {
            Ok(groups) => {
                let view = PostFormView::create(&groups).with_submission(
                    &form.text,
                    form.group.as_deref(),
                    form.image.as_deref(),
                    message,
                );
                render_form(&user, view, StatusCode::BAD_REQUEST)
            }
            Err(err) => HttpError::from(err).into_response(),
        },
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn edit_form(
    State(state): State<HttpState>,
    AuthUser(user): AuthUser,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(post_id) = parse_post_id(&raw_id) else {
        return render_not_found_response(Some(&user));
    };

    let post = match state.posts.post_for_edit(&user, post_id).await {
        Ok(post) => post,
        Err(err) => return edit_refused(err, &user, post_id),
    };
    match state.posts.list_groups().await {
        Ok(groups) => render_form(&user, PostFormView::edit(&post, &groups), StatusCode::OK),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn edit_submit(
    State(state): State<HttpState>,
    AuthUser(user): AuthUser,
    Path(raw_id): Path<String>,
    Form(form): Form<PostForm>,
) -> Response {
    let Some(post_id) = parse_post_id(&raw_id) else {
        return render_not_found_response(Some(&user));
    };

    match state.posts.edit_post(&user, post_id, form.to_input()).await {
        Ok(post) => found(post_href(post.id)),
        Err(PostError::Validation(message)) => {
            let post = match state.posts.post_for_edit(&user, post_id).await {
                Ok(post) => post,
                Err(err) => return edit_refused(err, &user, post_id),
            };
            match state.posts.list_groups().await {
                Ok(groups) => {
                    let view = PostFormView::edit(&post, &groups).with_submission(
                        &form.text,
                        form.group.as_deref(),
                        form.image.as_deref(),
                        message,
                    );
                    render_form(&user, view, StatusCode::BAD_REQUEST)
                }
                Err(err) => HttpError::from(err).into_response(),
            }
        }
        Err(err) => edit_refused(err, &user, post_id),
    }
}

async fn delete_post(
    State(state): State<HttpState>,
    AuthUser(user): AuthUser,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(post_id) = parse_post_id(&raw_id) else {
        return render_not_found_response(Some(&user));
    };

    match state.posts.delete_post(&user, post_id).await {
        Ok(()) => found(profile_href(&user.username)),
        Err(err) => edit_refused(err, &user, post_id),
    }
}

/// Comments are only ever posted from the detail page's form.
async fn comment_get(AuthUser(_user): AuthUser, Path(raw_id): Path<String>) -> Response {
    match parse_post_id(&raw_id) {
        Some(post_id) => found(post_href(post_id)),
        None => found("/"),
    }
}

async fn comment_submit(
    State(state): State<HttpState>,
    AuthUser(user): AuthUser,
    Path(raw_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> Response {
    let Some(post_id) = parse_post_id(&raw_id) else {
        return render_not_found_response(Some(&user));
    };

    match state.posts.add_comment(&user, post_id, &form.text).await {
        Ok(_) => found(post_href(post_id)),
        Err(PostError::Validation(message)) => {
            debug!(post_id = %post_id, reason = %message, "Comment rejected");
            found(post_href(post_id))
        }
        Err(PostError::NotFound { .. }) => render_not_found_response(Some(&user)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn follow(
    State(state): State<HttpState>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> Response {
    match state
        .subscriptions
        .follow_by_username(&user, &username)
        .await
    {
        Ok(_) => found(profile_href(&username)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

async fn unfollow(
    State(state): State<HttpState>,
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
) -> Response {
    match state
        .subscriptions
        .unfollow_by_username(&user, &username)
        .await
    {
        Ok(_) => found(profile_href(&username)),
        Err(err) => HttpError::from(err).into_response(),
    }
}

fn render_form(user: &UserRecord, content: PostFormView, status: StatusCode) -> Response {
    let title = if content.is_edit {
        "Edit post"
    } else {
        "New post"
    };
    let view = LayoutContext::new(Some(user), title, content);
    render_template_response(PostFormTemplate { view }, status)
}

/// Non-authors are sent back to the post instead of seeing an error.
fn edit_refused(err: PostError, user: &UserRecord, post_id: uuid::Uuid) -> Response {
    match err {
        PostError::Forbidden { .. } => found(post_href(post_id)),
        PostError::NotFound { .. } => render_not_found_response(Some(user)),
        other => HttpError::from(other).into_response(),
    }
}
