//! Markdown rendering for chat bubbles
//!
//! Turn text is rendered once, on the server, into HTML the page can insert
//! directly. Raw HTML in the source is escaped rather than passed through,
//! and links or images with a script-capable scheme point nowhere.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

const SAFE_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

/// Render `text` as HTML safe to assign to `innerHTML`
pub fn to_html(text: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let events = Parser::new_ext(text, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut out = String::with_capacity(text.len() + text.len() / 2);
    html::push_html(&mut out, events);
    out
}

/// Relative URLs and the schemes in [`SAFE_SCHEMES`] pass; anything else
/// (`javascript:`, `data:`, ...) becomes `#`.
fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme = url
        .split_once(':')
        .map(|(scheme, _)| scheme.trim().to_ascii_lowercase())
        .filter(|scheme| !scheme.contains(['/', '?', '#']));

    match scheme {
        Some(scheme) if !SAFE_SCHEMES.contains(&scheme.as_str()) => CowStr::Borrowed("#"),
        _ => url,
    }
}
