use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{GroupFeed, ProfileFeed};
use crate::application::pagination::Page;
use crate::application::posts::PostDetail;
use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};
use crate::domain::posts::{format_human_date, format_iso_date};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use uuid::Uuid;

/// Pages on either side of the current one that the paginator links to.
const PAGINATOR_WINDOW: u32 = 3;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: Option<&UserRecord>) -> Response {
    let view = LayoutContext::new(viewer, "Page not found", ErrorPageView::not_found());
    let mut response = render_template_response(NotFoundTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Error page used by `HttpError`; degrades to plain text if the template fails.
pub fn render_error_page(status: StatusCode, message: &'static str) -> Response {
    let content = if status == StatusCode::NOT_FOUND {
        ErrorPageView::not_found()
    } else {
        ErrorPageView::new(status, message)
    };
    let title = content.title.clone();
    let rendered = NotFoundTemplate {
        view: LayoutContext::new(None, title, content),
    }
    .render();

    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, message).into_response(),
    }
}

#[derive(Clone)]
pub struct ViewerView {
    pub username: String,
    pub display_name: String,
}

impl From<&UserRecord> for ViewerView {
    fn from(user: &UserRecord) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name(),
        }
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub viewer: Option<ViewerView>,
    pub title: String,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(viewer: Option<&UserRecord>, title: impl Into<String>, content: T) -> Self {
        Self {
            viewer: viewer.map(ViewerView::from),
            title: title.into(),
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupLink {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub image: Option<String>,
    pub author_name: String,
    pub author_href: String,
    pub group: Option<GroupLink>,
    pub published: String,
    pub iso_date: String,
    pub detail_href: String,
}

impl From<&PostRecord> for PostCard {
    fn from(post: &PostRecord) -> Self {
        let group = match (&post.group_slug, &post.group_title) {
            (Some(slug), Some(title)) => Some(GroupLink {
                title: title.clone(),
                href: group_href(slug),
            }),
            _ => None,
        };

        Self {
            id: post.id,
            text: post.text.clone(),
            image: post.image.clone(),
            author_name: post.author_name.clone(),
            author_href: profile_href(&post.author_username),
            group,
            published: format_human_date(post.created_at),
            iso_date: format_iso_date(post.created_at),
            detail_href: post_href(post.id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLink {
    pub number: u32,
    pub href: String,
    pub is_current: bool,
}

#[derive(Clone, Debug)]
pub struct PaginatorView {
    pub number: u32,
    pub num_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_href: String,
    pub next_href: String,
    pub first_href: String,
    pub last_href: String,
    pub pages: Vec<PageLink>,
}

impl PaginatorView {
    pub fn from_page<T>(page: &Page<T>) -> Self {
        let num_pages = page.num_pages();
        let current = page.number;
        let low = current.saturating_sub(PAGINATOR_WINDOW).max(1);
        let high = current.saturating_add(PAGINATOR_WINDOW).min(num_pages);

        let pages = (low..=high)
            .map(|number| PageLink {
                number,
                href: page_query(number),
                is_current: number == current,
            })
            .collect();

        Self {
            number: current,
            num_pages,
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            previous_href: page.previous_number().map(page_query).unwrap_or_default(),
            next_href: page.next_number().map(page_query).unwrap_or_default(),
            first_href: page_query(1),
            last_href: page_query(num_pages),
            pages,
        }
    }

    /// Whether there is anything to navigate to.
    pub fn is_paginated(&self) -> bool {
        self.num_pages > 1
    }
}

/// A rendered slice of one feed.
#[derive(Clone)]
pub struct FeedView {
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl FeedView {
    pub fn from_page(page: &Page<PostRecord>) -> Self {
        Self {
            posts: page.items.iter().map(PostCard::from).collect(),
            paginator: PaginatorView::from_page(page),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<FeedView>,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
    pub view: LayoutContext<FeedView>,
}

#[derive(Clone)]
pub struct GroupView {
    pub title: String,
    pub description: String,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl From<&GroupFeed> for GroupView {
    fn from(group: &GroupFeed) -> Self {
        let FeedView { posts, paginator } = FeedView::from_page(&group.page);
        Self {
            title: group.group.title.clone(),
            description: group.group.description.clone(),
            posts,
            paginator,
        }
    }
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupListTemplate {
    pub view: LayoutContext<GroupView>,
}

#[derive(Clone)]
pub struct ProfileView {
    pub username: String,
    pub display_name: String,
    pub post_count: u64,
    pub following: bool,
    /// False for anonymous viewers and for the author's own profile.
    pub can_follow: bool,
    pub follow_href: String,
    pub unfollow_href: String,
    pub posts: Vec<PostCard>,
    pub paginator: PaginatorView,
}

impl ProfileView {
    pub fn new(profile: &ProfileFeed, viewer: Option<&UserRecord>) -> Self {
        let username = profile.author.username.clone();
        let FeedView { posts, paginator } = FeedView::from_page(&profile.page);
        Self {
            display_name: profile.author.display_name(),
            post_count: profile.post_count,
            following: profile.following,
            can_follow: viewer.is_some_and(|viewer| viewer.id != profile.author.id),
            follow_href: format!("/profile/{username}/follow/"),
            unfollow_href: format!("/profile/{username}/unfollow/"),
            posts,
            paginator,
            username,
        }
    }
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub author_href: String,
    pub text: String,
    pub published: String,
}

impl From<&CommentRecord> for CommentView {
    fn from(comment: &CommentRecord) -> Self {
        Self {
            author_username: comment.author_username.clone(),
            author_href: profile_href(&comment.author_username),
            text: comment.text.clone(),
            published: format_human_date(comment.created_at),
        }
    }
}

pub struct PostDetailView {
    pub post: PostCard,
    pub author_post_count: u64,
    pub comments: Vec<CommentView>,
    pub is_edit_allowed: bool,
    pub can_comment: bool,
    pub edit_href: String,
    pub delete_href: String,
    pub comment_action: String,
}

impl PostDetailView {
    pub fn new(detail: &PostDetail, viewer: Option<&UserRecord>) -> Self {
        let id = detail.post.id;
        Self {
            post: PostCard::from(&detail.post),
            author_post_count: detail.author_post_count,
            comments: detail.comments.iter().map(CommentView::from).collect(),
            is_edit_allowed: detail.is_edit_allowed,
            can_comment: viewer.is_some(),
            edit_href: format!("/posts/{id}/edit/"),
            delete_href: format!("/posts/{id}/delete/"),
            comment_action: format!("/posts/{id}/comment/"),
        }
    }
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Clone)]
pub struct GroupOption {
    pub slug: String,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormView {
    pub is_edit: bool,
    pub action: String,
    pub text: String,
    pub image: String,
    pub groups: Vec<GroupOption>,
    pub errors: Vec<String>,
}

impl PostFormView {
    pub fn create(groups: &[GroupRecord]) -> Self {
        Self {
            is_edit: false,
            action: "/create/".to_string(),
            text: String::new(),
            image: String::new(),
            groups: group_options(groups, None),
            errors: Vec::new(),
        }
    }

    pub fn edit(post: &PostRecord, groups: &[GroupRecord]) -> Self {
        Self {
            is_edit: true,
            action: format!("/posts/{}/edit/", post.id),
            text: post.text.clone(),
            image: post.image.clone().unwrap_or_default(),
            groups: group_options(groups, post.group_slug.as_deref()),
            errors: Vec::new(),
        }
    }

    /// Re-populate the form from a rejected submission.
    pub fn with_submission(
        mut self,
        text: &str,
        group: Option<&str>,
        image: Option<&str>,
        error: impl Into<String>,
    ) -> Self {
        self.text = text.to_string();
        self.image = image.unwrap_or_default().to_string();
        for option in &mut self.groups {
            option.selected = Some(option.slug.as_str()) == group;
        }
        self.errors.push(error.into());
        self
    }
}

fn group_options(groups: &[GroupRecord], selected: Option<&str>) -> Vec<GroupOption> {
    groups
        .iter()
        .map(|group| GroupOption {
            slug: group.slug.clone(),
            title: group.title.clone(),
            selected: Some(group.slug.as_str()) == selected,
        })
        .collect()
}

#[derive(Template)]
#[template(path = "posts/create_post.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormView>,
}

pub struct ErrorPageView {
    pub status: u16,
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND.as_u16(),
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }

    pub fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status: status.as_u16(),
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn profile_href(username: &str) -> String {
    format!("/profile/{username}/")
}

pub fn group_href(slug: &str) -> String {
    format!("/group/{slug}/")
}

pub fn post_href(id: Uuid) -> String {
    format!("/posts/{id}/")
}

fn page_query(number: u32) -> String {
    format!("?page={number}")
}
