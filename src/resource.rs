//! Resources served by the wiki.
//!
//! Storage lives outside this crate; handlers only see the [`Resource`]
//! trait. [`MemoryStore`] is a small in-process [`ResourceStore`] used by
//! the bundled binary and the tests.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use crate::error::DispatchError;

/// Revision a resource was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub sha: String,
}

/// A page, file or folder.
pub trait Resource: Send + Sync + fmt::Debug {
    /// Path without leading slash, e.g. `docs/setup.md`. The root is `""`.
    fn path(&self) -> &str;

    /// Last path component.
    fn name(&self) -> &str {
        self.path().rsplit('/').next().unwrap_or_default()
    }

    /// Textual content, if the resource has any.
    fn content(&self) -> Option<&str>;

    fn mime(&self) -> &str;

    fn metadata(&self) -> &Map<String, Value>;

    /// Whether this is the latest revision.
    fn is_current(&self) -> bool {
        true
    }

    fn commit(&self) -> Option<&Commit> {
        None
    }

    fn is_tree(&self) -> bool {
        false
    }

    /// Metadata resources never pick their engine from their own metadata.
    fn is_meta(&self) -> bool {
        false
    }

    /// Children, for trees.
    fn pages(&self) -> Vec<Arc<dyn Resource>> {
        Vec::new()
    }
}

/// Guess a mime type from a file name. Names without an extension are
/// plain text.
pub fn mime_for(name: &str) -> String {
    let file_name = name.rsplit('/').next().unwrap_or_default();
    if !file_name.contains('.') {
        return "text/plain".to_string();
    }
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// A single page or file.
#[derive(Debug, Clone)]
pub struct Page {
    path: String,
    content: Option<String>,
    mime: String,
    metadata: Map<String, Value>,
    commit: Option<Commit>,
    current: bool,
    meta: bool,
}

impl Page {
    /// A text page; the mime type is guessed from the name.
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = normalize_path(&path.into());
        let mime = mime_for(&path);
        Self {
            path,
            content: Some(content.into()),
            mime,
            metadata: Map::new(),
            commit: None,
            current: true,
            meta: false,
        }
    }

    /// A file without textual content (e.g. an image).
    pub fn binary(path: impl Into<String>) -> Self {
        let mut page = Self::new(path, "");
        page.content = None;
        page
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = mime.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_commit(mut self, sha: impl Into<String>, current: bool) -> Self {
        self.commit = Some(Commit { sha: sha.into() });
        self.current = current;
        self
    }

    pub fn as_meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

impl Resource for Page {
    fn path(&self) -> &str {
        &self.path
    }

    fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    fn mime(&self) -> &str {
        &self.mime
    }

    fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    fn is_current(&self) -> bool {
        self.current
    }

    fn commit(&self) -> Option<&Commit> {
        self.commit.as_ref()
    }

    fn is_meta(&self) -> bool {
        self.meta
    }
}

/// A folder of resources.
#[derive(Debug, Clone)]
pub struct Tree {
    path: String,
    pages: Vec<Arc<dyn Resource>>,
    metadata: Map<String, Value>,
}

impl Tree {
    pub fn new(path: impl Into<String>, pages: Vec<Arc<dyn Resource>>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            pages,
            metadata: Map::new(),
        }
    }
}

impl Resource for Tree {
    fn path(&self) -> &str {
        &self.path
    }

    fn content(&self) -> Option<&str> {
        None
    }

    fn mime(&self) -> &str {
        "inode/directory"
    }

    fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    fn is_tree(&self) -> bool {
        true
    }

    fn pages(&self) -> Vec<Arc<dyn Resource>> {
        self.pages.clone()
    }
}

/// Lookup and persistence of resources.
pub trait ResourceStore: Send + Sync {
    fn find(&self, path: &str) -> Option<Arc<dyn Resource>>;
    fn save(&self, page: Page) -> Result<(), DispatchError>;
}

/// In-memory store. Folders are derived from page paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pages: RwLock<BTreeMap<String, Arc<Page>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(pages: impl IntoIterator<Item = Page>) -> Self {
        let store = Self::new();
        for page in pages {
            // Infallible for the in-memory store
            let _ = store.save(page);
        }
        store
    }
}

impl ResourceStore for MemoryStore {
    fn find(&self, path: &str) -> Option<Arc<dyn Resource>> {
        let path = normalize_path(path);
        let pages = self.pages.read().ok()?;
        if let Some(page) = pages.get(&path) {
            return Some(Arc::clone(page) as Arc<dyn Resource>);
        }

        let prefix = if path.is_empty() { String::new() } else { format!("{}/", path) };
        let mut children: BTreeMap<String, Arc<dyn Resource>> = BTreeMap::new();
        for (key, page) in pages.range(prefix.clone()..) {
            let Some(rest) = key.strip_prefix(&prefix) else {
                break;
            };
            match rest.split_once('/') {
                None => {
                    children.insert(key.clone(), Arc::clone(page) as Arc<dyn Resource>);
                }
                Some((folder, _)) => {
                    let child = format!("{}{}", prefix, folder);
                    if !children.contains_key(&child) {
                        let tree = Tree::new(child.clone(), Vec::new());
                        children.insert(child, Arc::new(tree));
                    }
                }
            }
        }

        if children.is_empty() && !path.is_empty() {
            return None;
        }
        Some(Arc::new(Tree::new(path, children.into_values().collect())))
    }

    fn save(&self, page: Page) -> Result<(), DispatchError> {
        let mut pages = self
            .pages
            .write()
            .map_err(|_| DispatchError::fault("Resource store lock poisoned"))?;
        tracing::debug!(path = %page.path(), "Saving page");
        pages.insert(page.path().to_string(), Arc::new(page));
        Ok(())
    }
}

fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}
