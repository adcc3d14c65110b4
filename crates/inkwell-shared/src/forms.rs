//! Form rules for the compose, auth and profile forms.
//!
//! Every validator collects all failures instead of stopping at the first,
//! so a client can show each message next to its field.

use crate::dto::{LoginRequest, PostForm, PostPatchRequest, ProfileUpdateRequest, SignupRequest};

pub const TITLE_MIN: usize = 5;
pub const EXCERPT_MAX: usize = 200;
pub const NAME_MIN: usize = 2;
pub const PASSWORD_MIN: usize = 6;
pub const BIO_MAX: usize = 200;

/// Compose form after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPost {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub status: String,
}

/// Partial edit after validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidPostPatch {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    /// `Some(None)` clears the image.
    pub image_url: Option<Option<String>>,
    pub status: Option<String>,
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// `http://` or `https://` followed by a host.
pub fn is_valid_url(value: &str) -> bool {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(rest) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !host.is_empty() && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn chars(value: &str) -> usize {
    value.chars().count()
}

fn check_title(title: &str, errors: &mut Vec<String>) {
    if chars(title.trim()) < TITLE_MIN {
        errors.push(format!("Title must be at least {TITLE_MIN} characters."));
    }
}

fn check_excerpt(excerpt: &str, errors: &mut Vec<String>) {
    if chars(excerpt) > EXCERPT_MAX {
        errors.push(format!("Excerpt cannot exceed {EXCERPT_MAX} characters."));
    }
}

fn check_image(image_url: &str, errors: &mut Vec<String>) -> Option<String> {
    let image_url = image_url.trim();
    if image_url.is_empty() {
        return None;
    }
    if !is_valid_url(image_url) {
        errors.push("Please enter a valid URL.".to_string());
    }
    Some(image_url.to_string())
}

fn check_status(status: &str, errors: &mut Vec<String>) -> String {
    let status = status.trim().to_ascii_lowercase();
    if status != "draft" && status != "published" {
        errors.push("Status must be either draft or published.".to_string());
    }
    status
}

fn check_email(email: &str, errors: &mut Vec<String>) {
    if !is_valid_email(email.trim()) {
        errors.push("Please enter a valid email.".to_string());
    }
}

fn check_password(password: &str, errors: &mut Vec<String>) {
    if chars(password) < PASSWORD_MIN {
        errors.push(format!("Password must be at least {PASSWORD_MIN} characters."));
    }
}

fn finish<T>(value: T, errors: Vec<String>) -> Result<T, Vec<String>> {
    if errors.is_empty() { Ok(value) } else { Err(errors) }
}

/// Validate the compose form. An empty status means draft.
pub fn validate_post(form: &PostForm) -> Result<ValidPost, Vec<String>> {
    let mut errors = Vec::new();
    check_title(&form.title, &mut errors);
    check_excerpt(&form.excerpt, &mut errors);
    let image_url = check_image(&form.image_url, &mut errors);
    let status = if form.status.trim().is_empty() {
        "draft".to_string()
    } else {
        check_status(&form.status, &mut errors)
    };

    finish(
        ValidPost {
            title: form.title.trim().to_string(),
            excerpt: form.excerpt.clone(),
            content: form.content.clone(),
            categories: split_list(&form.categories),
            tags: split_list(&form.tags),
            image_url,
            status,
        },
        errors,
    )
}

/// Validate only the fields present in a partial edit.
pub fn validate_post_patch(patch: &PostPatchRequest) -> Result<ValidPostPatch, Vec<String>> {
    let mut errors = Vec::new();
    if let Some(title) = &patch.title {
        check_title(title, &mut errors);
    }
    if let Some(excerpt) = &patch.excerpt {
        check_excerpt(excerpt, &mut errors);
    }
    let image_url = patch
        .image_url
        .as_deref()
        .map(|url| check_image(url, &mut errors));
    let status = patch
        .status
        .as_deref()
        .map(|status| check_status(status, &mut errors));

    finish(
        ValidPostPatch {
            title: patch.title.as_deref().map(|t| t.trim().to_string()),
            excerpt: patch.excerpt.clone(),
            content: patch.content.clone(),
            categories: patch.categories.as_deref().map(split_list),
            tags: patch.tags.as_deref().map(split_list),
            image_url,
            status,
        },
        errors,
    )
}

pub fn validate_signup(request: &SignupRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if chars(request.name.trim()) < NAME_MIN {
        errors.push(format!("Display name must be at least {NAME_MIN} characters."));
    }
    check_email(&request.email, &mut errors);
    check_password(&request.password, &mut errors);
    finish((), errors)
}

pub fn validate_login(request: &LoginRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    check_email(&request.email, &mut errors);
    check_password(&request.password, &mut errors);
    finish((), errors)
}

pub fn validate_profile(request: &ProfileUpdateRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    if let Some(name) = &request.name {
        if chars(name.trim()) < NAME_MIN {
            errors.push(format!("Name must be at least {NAME_MIN} characters."));
        }
    }
    if let Some(bio) = &request.bio {
        if chars(bio) > BIO_MAX {
            errors.push(format!("Bio cannot exceed {BIO_MAX} characters."));
        }
    }
    if let Some(avatar_url) = &request.avatar_url {
        let avatar_url = avatar_url.trim();
        if !avatar_url.is_empty() && !is_valid_url(avatar_url) {
            errors.push("Please enter a valid URL for avatar.".to_string());
        }
    }
    finish((), errors)
}

/// Comment body, trimmed.
pub fn validate_comment(content: &str) -> Result<String, Vec<String>> {
    let body = content.trim();
    if body.is_empty() {
        return Err(vec!["Comment cannot be empty.".to_string()]);
    }
    Ok(body.to_string())
}
