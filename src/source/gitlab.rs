//! GitLab Pages access control: protected pages redirect to a sign-in form
//! instead of accepting Basic auth or tokens.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::error::{Result, SourceError};
use super::transport::{HttpResponse, Transport};

const TOKEN_FIELD: &str = "authenticity_token";

// Markup whose contents are not elements: comments, and raw text of script-like tags.
static INERT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<noscript\b.*?</noscript\s*>|<style\b.*?</style\s*>|<template\b.*?</template\s*>|<textarea\b.*?</textarea\s*>",
    )
    .expect("valid inert markup regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(meta|input)\b([^>]*)>").expect("valid tag regex")
});

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});

/// What the sign-in page tells us: where to post, and the CSRF token.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub login_url: String,
    pub token: String,
}

impl LoginForm {
    /// Pull `<meta property="og:url" content=..>` and
    /// `<input name="authenticity_token" value=..>` out of the page.
    /// The first matching element wins; tags inside comments or script
    /// text are not elements and are skipped.
    pub fn from_html(html: &str) -> Result<Self> {
        let mut login_url = None;
        let mut token = None;

        let html = INERT.replace_all(html, " ");
        for tag in TAG.captures_iter(&html) {
            let attrs = attributes(&tag[2]);
            match tag[1].to_ascii_lowercase().as_str() {
                "meta" if login_url.is_none() => {
                    if attrs.get("property").map(String::as_str) == Some("og:url") {
                        login_url = attrs.get("content").cloned();
                    }
                }
                "input" if token.is_none() => {
                    if attrs.get("name").map(String::as_str) == Some(TOKEN_FIELD) {
                        token = attrs.get("value").cloned();
                    }
                }
                _ => {}
            }
        }

        let login_url = login_url.ok_or_else(|| {
            SourceError::Parse("login page has no <meta property=\"og:url\"> tag".to_string())
        })?;
        let token = token.ok_or_else(|| {
            SourceError::Parse(format!("login page has no <input name=\"{TOKEN_FIELD}\"> field"))
        })?;
        Ok(Self { login_url, token })
    }
}

fn attributes(raw: &str) -> HashMap<String, String> {
    ATTR.captures_iter(raw)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map_or("", |m| m.as_str());
            (c[1].to_ascii_lowercase(), unescape(value))
        })
        .collect()
}

fn unescape(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Sign in through the form and fetch `url` again inside the same session.
pub fn fetch(
    transport: &dyn Transport,
    url: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<HttpResponse> {
    let mut session = transport.session()?;

    let page = session.get(url, None)?;
    let form = LoginForm::from_html(&page.body)?;
    debug!(login_url = %form.login_url, "posting GitLab sign-in form");

    let mut fields = vec![(TOKEN_FIELD, form.token.as_str())];
    if let Some(username) = username {
        fields.push(("user[login]", username));
    }
    if let Some(password) = password {
        fields.push(("user[password]", password));
    }
    session.post_form(&form.login_url, &fields)?;

    session.get(url, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta content="GitLab" property="og:site_name">
<meta property="og:url" content="https://gitlab.example.com/users/sign_in?redirect=a&amp;b">
</head>
<body>
<form action="/users/sign_in" method="post">
<input type="hidden" name="utf8" value="&#x2713;">
<INPUT type='hidden' name='authenticity_token' value='tok+en/=='>
</form>
</body>
</html>"#;

    #[test]
    fn test_extracts_form() {
        let form = LoginForm::from_html(PAGE).unwrap();
        assert_eq!(
            form.login_url,
            "https://gitlab.example.com/users/sign_in?redirect=a&b"
        );
        assert_eq!(form.token, "tok+en/==");
    }

    #[test]
    fn test_missing_meta() {
        let err = LoginForm::from_html(r#"<input name="authenticity_token" value="x">"#)
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse(ref m) if m.contains("og:url")));
    }

    #[test]
    fn test_missing_token() {
        let err = LoginForm::from_html(r#"<meta property="og:url" content="https://x/">"#)
            .unwrap_err();
        assert!(matches!(err, SourceError::Parse(ref m) if m.contains(TOKEN_FIELD)));
    }

    #[test]
    fn test_commented_out_tags_ignored() {
        let page = r#"<head>
<!-- <meta property="og:url" content="https://stale.example/"> -->
<meta property="og:url" content="https://gitlab.example/users/sign_in">
</head>
<body>
<!--
<input name="authenticity_token" value="old">
-->
<input name="authenticity_token" value="fresh">
</body>"#;
        let form = LoginForm::from_html(page).unwrap();
        assert_eq!(form.login_url, "https://gitlab.example/users/sign_in");
        assert_eq!(form.token, "fresh");
    }

    #[test]
    fn test_script_text_ignored() {
        let page = r#"<script type="text/javascript">
document.write('<meta property="og:url" content="https://evil.example/">');
</script>
<noscript><input name="authenticity_token" value="noscript"></noscript>
<meta property="og:url" content="https://gitlab.example/users/sign_in">
<input name="authenticity_token" value="real">"#;
        let form = LoginForm::from_html(page).unwrap();
        assert_eq!(form.login_url, "https://gitlab.example/users/sign_in");
        assert_eq!(form.token, "real");
    }

    #[test]
    fn test_only_commented_meta_is_missing() {
        let page = r#"<!-- <meta property="og:url" content="https://stale.example/"> -->
<input name="authenticity_token" value="x">"#;
        let err = LoginForm::from_html(page).unwrap_err();
        assert!(matches!(err, SourceError::Parse(ref m) if m.contains("og:url")));
    }
}
