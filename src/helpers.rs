//! View helpers shared by layouts and engines.
//!
//! All helpers return markup fragments as `String`s. Text taken from
//! resources or messages is escaped; paths are percent-encoded per segment.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::dispatch::RequestContext;
use crate::resource::Resource;

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Absolute URL path for slash-separated `parts`, skipping empty ones.
pub fn url_path<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let segments: Vec<String> = parts
        .into_iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty())
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect();
    format!("/{}", segments.join("/"))
}

/// Queue a message for the current request, one entry per text.
pub fn message<I, S>(ctx: &mut RequestContext, level: &str, texts: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for text in texts {
        ctx.message(level, text);
    }
}

/// Render queued messages as a list, or nothing when there are none.
pub fn show_messages(messages: &[(String, String)]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let mut out = String::from("<ul>\n");
    for (level, text) in messages {
        out.push_str(&format!(
            "  <li class=\"{}\">{}</li>\n",
            escape_html(level),
            escape_html(text)
        ));
    }
    out.push_str("</ul>\n");
    out
}

/// Overrides for [`object_path`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PathOptions<'a> {
    pub sha: Option<&'a str>,
    pub path: Option<&'a str>,
    pub output: Option<&'a str>,
}

/// Link to a resource. Old revisions link to their commit.
pub fn object_path(resource: &dyn Resource, options: PathOptions<'_>) -> String {
    let sha = options
        .sha
        .or_else(|| {
            if resource.is_current() {
                None
            } else {
                resource.commit().map(|commit| commit.sha.as_str())
            }
        })
        .unwrap_or_default();
    let path = options.path.unwrap_or_else(|| resource.path());

    let mut url = url_path([path, sha]);
    if let Some(output) = options.output {
        url.push_str("?output=");
        url.push_str(&utf8_percent_encode(output, SEGMENT).to_string());
    }
    url
}

/// Link to an action on a resource, e.g. `/docs/setup.md/edit`.
pub fn action_path(resource: &dyn Resource, action: &str) -> String {
    url_path([resource.path(), action])
}

/// Whether the current request is the named action.
///
/// An explicit `action` parameter wins; otherwise the path suffix decides.
pub fn is_action(ctx: &RequestContext, name: &str) -> bool {
    match ctx.param("action") {
        Some(action) => action.to_lowercase() == name,
        None => ctx.path().ends_with(&format!("/{}", name)),
    }
}

/// Breadcrumb list items from the root down to `resource`.
pub fn breadcrumbs(resource: &dyn Resource) -> String {
    let mut links = vec![format!(
        "<a href=\"{}\">&radic;&macr; Root</a>",
        object_path(resource, PathOptions { path: Some(""), ..PathOptions::default() })
    )];

    let mut parent = String::new();
    for segment in resource.path().split('/').filter(|s| !s.is_empty()) {
        if !parent.is_empty() {
            parent.push('/');
        }
        parent.push_str(segment);
        links.push(format!(
            "<a href=\"{}\">{}</a>",
            object_path(resource, PathOptions { path: Some(&parent), ..PathOptions::default() }),
            escape_html(segment)
        ));
    }

    let last = links.len() - 1;
    links
        .iter()
        .enumerate()
        .map(|(i, link)| {
            let mut class = String::from("breadcrumb");
            if i == 0 {
                class.push_str(" first");
            }
            if i == last {
                class.push_str(" last");
            }
            format!("<li class=\"{}\">{}</li>\n", class, link)
        })
        .collect::<Vec<_>>()
        .join("<li class=\"breadcrumb\">/</li>\n")
}

/// Links to every engine able to render the current resource.
pub fn engines_menu(ctx: &RequestContext) -> String {
    let Some(resource) = ctx.resource() else {
        return String::new();
    };
    let current = ctx.engine();
    let mut out = String::from("<ul class=\"engines\">\n");
    for engine in ctx.engines().find_all(resource.as_ref()) {
        let selected = if current == Some(engine.name()) { " class=\"selected\"" } else { "" };
        out.push_str(&format!(
            "  <li{}><a href=\"{}\">{}</a></li>\n",
            selected,
            object_path(resource.as_ref(), PathOptions { output: Some(engine.name()), ..PathOptions::default() }),
            escape_html(engine.name())
        ));
    }
    out.push_str("</ul>\n");
    out
}

/// Actions offered for every shown resource.
pub const RESOURCE_ACTIONS: [&str; 2] = ["show", "engines"];

/// Links to the resource's actions; the one being requested is marked.
pub fn actions_menu(ctx: &RequestContext) -> String {
    let Some(resource) = ctx.resource() else {
        return String::new();
    };
    let mut out = String::from("<ul class=\"actions\">\n");
    for action in RESOURCE_ACTIONS {
        let selected = if is_action(ctx, action) { " class=\"selected\"" } else { "" };
        out.push_str(&format!(
            "  <li{}><a href=\"{}\">{}</a></li>\n",
            selected,
            action_path(resource.as_ref(), action),
            action
        ));
    }
    out.push_str("</ul>\n");
    out
}
