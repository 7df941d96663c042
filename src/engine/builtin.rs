//! Engines shipped with the crate.
//!
//! | name       | accepts                 | layout | priority |
//! |------------|-------------------------|--------|----------|
//! | `page`     | resources with text     | yes    | 99       |
//! | `download` | anything but folders    | no     | 999      |
//! | `gallery`  | folders                 | yes    | 2        |
//! | `source`   | known source extensions | yes    | 2        |

use crate::engine::context::RenderContext;
use crate::engine::registry::{Engine, EngineOptions, EngineRegistry, DEFAULT_ENGINE_PRIORITY};
use crate::error::DispatchError;
use crate::helpers::{escape_html, object_path, PathOptions};
use crate::resource::Resource;

/// Images shown per gallery page.
pub const GALLERY_PAGE_SIZE: usize = 16;

/// Register every built-in engine.
pub fn register_builtin(registry: &EngineRegistry) {
    registry.create(
        "page",
        EngineOptions {
            layout: true,
            cacheable: true,
            priority: DEFAULT_ENGINE_PRIORITY,
        },
        PageEngine,
    );
    registry.create(
        "download",
        EngineOptions {
            layout: false,
            cacheable: false,
            priority: 999,
        },
        DownloadEngine,
    );
    registry.create(
        "gallery",
        EngineOptions {
            layout: true,
            cacheable: true,
            priority: 2,
        },
        GalleryEngine,
    );
    registry.create(
        "source",
        EngineOptions {
            layout: true,
            cacheable: true,
            priority: 2,
        },
        SourceEngine,
    );
}

/// Renders text pages. HTML passes through, anything else is escaped
/// into paragraphs.
#[derive(Debug, Clone, Copy)]
pub struct PageEngine;

impl Engine for PageEngine {
    fn output(&self, context: &RenderContext) -> Result<String, DispatchError> {
        let resource = context.resource();
        let content = resource.content().unwrap_or_default();
        if resource.mime() == "text/html" {
            return Ok(content.to_string());
        }

        let paragraphs: String = content
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| format!("<p>{}</p>\n", escape_html(p)))
            .collect();
        Ok(format!("<div class=\"page\">\n{}</div>\n", paragraphs))
    }

    fn mime(&self, _resource: &dyn Resource) -> String {
        "text/html".to_string()
    }
}

/// Raw content with the resource's own mime type.
#[derive(Debug, Clone, Copy)]
pub struct DownloadEngine;

impl Engine for DownloadEngine {
    fn accepts(&self, resource: &dyn Resource) -> bool {
        !resource.is_tree()
    }

    fn output(&self, context: &RenderContext) -> Result<String, DispatchError> {
        Ok(context.resource().content().unwrap_or_default().to_string())
    }
}

/// Image listing for folders, paged by the `curpage` parameter.
#[derive(Debug, Clone, Copy)]
pub struct GalleryEngine;

impl Engine for GalleryEngine {
    fn accepts(&self, resource: &dyn Resource) -> bool {
        resource.is_tree()
    }

    fn output(&self, context: &RenderContext) -> Result<String, DispatchError> {
        let tree = context.resource();
        let current: usize = context
            .param("curpage")
            .and_then(|page| page.parse().ok())
            .unwrap_or(0);

        let images: Vec<_> = tree
            .pages()
            .into_iter()
            .filter(|page| page.mime().starts_with("image/"))
            .collect();
        let pages = images.len().div_ceil(GALLERY_PAGE_SIZE);
        // Out-of-range pages show the last one.
        let current = current.min(pages.saturating_sub(1));

        let mut out = String::from("<div class=\"gallery\">\n");
        for image in images.iter().skip(current * GALLERY_PAGE_SIZE).take(GALLERY_PAGE_SIZE) {
            let link = object_path(image.as_ref(), PathOptions::default());
            let src = object_path(image.as_ref(), PathOptions { output: Some("download"), ..PathOptions::default() });
            out.push_str(&format!(
                "  <a href=\"{}\"><img src=\"{}\" alt=\"{}\"/></a>\n",
                link,
                src,
                escape_html(image.name())
            ));
        }
        out.push_str("</div>\n");

        if pages > 1 {
            let base = object_path(tree.as_ref(), PathOptions::default());
            out.push_str("<ul class=\"pagination\">\n");
            for page in 0..pages {
                if page == current {
                    out.push_str(&format!("  <li class=\"current\">{}</li>\n", page + 1));
                } else {
                    out.push_str(&format!(
                        "  <li><a href=\"{}?curpage={}\">{}</a></li>\n",
                        base,
                        page,
                        page + 1
                    ));
                }
            }
            out.push_str("</ul>\n");
        }
        Ok(out)
    }

    fn mime(&self, _resource: &dyn Resource) -> String {
        "text/html".to_string()
    }
}

/// Escaped source listing tagged with its language.
#[derive(Debug, Clone, Copy)]
pub struct SourceEngine;

/// Language of a source file, by extension.
pub fn source_language(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    let language = match ext.to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "rb" => "ruby",
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" => "cpp",
        "java" => "java",
        "go" => "go",
        "sh" => "bash",
        "css" => "css",
        "toml" => "toml",
        "yml" | "yaml" => "yaml",
        "sql" => "sql",
        _ => return None,
    };
    Some(language)
}

impl Engine for SourceEngine {
    fn accepts(&self, resource: &dyn Resource) -> bool {
        resource.content().is_some() && source_language(resource.name()).is_some()
    }

    fn output(&self, context: &RenderContext) -> Result<String, DispatchError> {
        let resource = context.resource();
        let language = source_language(resource.name()).unwrap_or("text");
        Ok(format!(
            "<pre class=\"highlight language-{}\"><code>{}</code></pre>\n",
            language,
            escape_html(resource.content().unwrap_or_default())
        ))
    }

    fn mime(&self, _resource: &dyn Resource) -> String {
        "text/html".to_string()
    }
}
