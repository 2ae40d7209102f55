//! The protected view.
//!
//! Only reachable through [`Authenticated`], so the page is composed strictly
//! after the guard confirmed the session. Mounted at the configured protected
//! path, which is why it is not part of the `OpenAPI` document.

use crate::{api::config::SiteConfig, guard::Authenticated, provider::Identity};
use axum::{
    extract::Extension,
    http::header::CACHE_CONTROL,
    response::{Html, IntoResponse},
};
use std::sync::Arc;

const FALLBACK_TITLE: &str = "Gatehouse";

/// Rendered page for a confirmed identity, including the sign-out control.
#[derive(Debug)]
pub struct ProtectedView<'a> {
    identity: &'a Identity,
    title: String,
}

impl<'a> ProtectedView<'a> {
    #[must_use]
    pub fn new(identity: &'a Identity) -> Self {
        Self {
            identity,
            title: FALLBACK_TITLE.to_string(),
        }
    }

    /// Title the page after the path it is served from.
    #[must_use]
    pub fn at_path(mut self, path: &str) -> Self {
        self.title = page_title(path);
        self
    }

    #[must_use]
    pub fn render(&self) -> String {
        let email = escape_html(&self.identity.email);
        let title = escape_html(&self.title);
        format!(
            r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<div>
<main class="min-h-screen min-w-screen flex items-center justify-center">protected server component</main>
<p class="signed-in">Signed in as {email}</p>
<form method="post" action="/logout"><button type="submit">Log out</button></form>
</div>
</body>
</html>
"#
        )
    }
}

pub async fn protected_view(
    Authenticated(identity): Authenticated,
    site: Extension<Arc<SiteConfig>>,
) -> impl IntoResponse {
    let page = ProtectedView::new(&identity)
        .at_path(site.protected_path())
        .render();

    ([(CACHE_CONTROL, "no-store")], Html(page))
}

/// `/teams/release-notes` becomes `Release notes`.
fn page_title(path: &str) -> String {
    let Some(segment) = path.rsplit('/').find(|segment| !segment.is_empty()) else {
        return FALLBACK_TITLE.to_string();
    };

    let words = segment.replace(['-', '_'], " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => FALLBACK_TITLE.to_string(),
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: &str) -> Identity {
        Identity {
            user_id: "u-1".to_string(),
            email: email.to_string(),
            is_operator: false,
        }
    }

    #[test]
    fn render_includes_content_and_sign_out_control() {
        let identity = identity("ada@example.com");
        let page = ProtectedView::new(&identity).render();
        assert!(page.contains("protected server component"));
        assert!(page.contains(r#"<form method="post" action="/logout">"#));
        assert!(page.contains("Signed in as ada@example.com"));
    }

    #[test]
    fn render_escapes_identity_fields() {
        let identity = identity("<script>alert('x')</script>@example.com");
        let page = ProtectedView::new(&identity).render();
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;@example.com"));
    }

    #[test]
    fn title_follows_the_protected_path() {
        let identity = identity("ada@example.com");
        let page = ProtectedView::new(&identity).at_path("/workflows").render();
        assert!(page.contains("<title>Workflows</title>"));

        let page = ProtectedView::new(&identity)
            .at_path("/teams/release-notes/")
            .render();
        assert!(page.contains("<title>Release notes</title>"));

        let page = ProtectedView::new(&identity).render();
        assert!(page.contains("<title>Gatehouse</title>"));
    }

    #[test]
    fn page_title_falls_back_for_empty_paths() {
        assert_eq!(page_title("/"), "Gatehouse");
        assert_eq!(page_title("/dashboard"), "Dashboard");
    }
}
