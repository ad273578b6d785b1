//! Post and comment rules shared by the write paths and the views.

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

use super::error::DomainError;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:short] [year]");
pub const ISO_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

const LABEL_CHARS: usize = 15;
const MAX_IMAGE_PATH_LEN: usize = 255;

/// Trim and validate the body of a post.
pub fn normalize_post_text(text: &str) -> Result<String, DomainError> {
    normalize_text(text, "post text must not be empty")
}

/// Trim and validate the body of a comment.
pub fn normalize_comment_text(text: &str) -> Result<String, DomainError> {
    normalize_text(text, "comment text must not be empty")
}

fn normalize_text(text: &str, message: &'static str) -> Result<String, DomainError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(message));
    }
    Ok(trimmed.to_string())
}

/// Blank image paths mean "no image".
pub fn normalize_image_path(image: Option<&str>) -> Result<Option<String>, DomainError> {
    let Some(path) = image.map(str::trim).filter(|path| !path.is_empty()) else {
        return Ok(None);
    };
    if path.len() > MAX_IMAGE_PATH_LEN {
        return Err(DomainError::validation("image path is too long"));
    }
    if path.contains("..") {
        return Err(DomainError::validation(
            "image path must not traverse directories",
        ));
    }
    Ok(Some(path.to_string()))
}

/// Short label used in listings and logs: the first fifteen characters.
pub fn short_label(text: &str) -> String {
    text.chars().take(LABEL_CHARS).collect()
}

pub fn format_human_date(at: OffsetDateTime) -> String {
    at.format(HUMAN_DATE_FORMAT).unwrap_or_default()
}

pub fn format_iso_date(at: OffsetDateTime) -> String {
    at.to_offset(time::UtcOffset::UTC)
        .format(ISO_DATE_FORMAT)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn post_text_is_trimmed() {
        let text = normalize_post_text("  hello world \n").expect("valid text");
        assert_eq!(text, "hello world");
    }

    #[test]
    fn blank_post_text_is_rejected() {
        let err = normalize_post_text(" \t\n").expect_err("blank text rejected");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn blank_comment_text_is_rejected() {
        assert!(normalize_comment_text("").is_err());
        assert_eq!(normalize_comment_text(" ok ").expect("valid"), "ok");
    }

    #[test]
    fn image_path_blank_means_none() {
        assert_eq!(normalize_image_path(None).expect("ok"), None);
        assert_eq!(normalize_image_path(Some("  ")).expect("ok"), None);
        assert_eq!(
            normalize_image_path(Some("posts/small.gif")).expect("ok"),
            Some("posts/small.gif".to_string())
        );
        assert!(normalize_image_path(Some("../etc/passwd")).is_err());
    }

    #[test]
    fn short_label_keeps_fifteen_chars() {
        assert_eq!(short_label("Тестовый пост для проверки"), "Тестовый пост д");
        assert_eq!(short_label("short"), "short");
    }

    #[test]
    fn dates_format_for_display() {
        let at = datetime!(2022-03-07 09:05:00 UTC);
        assert_eq!(format_human_date(at), "7 Mar 2022");
        assert_eq!(format_iso_date(at), "2022-03-07T09:05:00Z");
    }
}
