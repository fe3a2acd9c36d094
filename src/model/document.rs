//! Document-level types.

use super::Segment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A document snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Remote document id
    #[serde(default)]
    pub document_id: String,

    /// Document title
    #[serde(default)]
    pub title: String,

    /// Revision token; opaque, compared for equality only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_id: Option<String>,

    /// Tabs in display order
    pub tabs: Vec<Tab>,

    /// Comment threads
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
}

impl Document {
    /// Create a document with a single empty tab.
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            title: String::new(),
            revision_id: None,
            tabs: vec![Tab::new("t.0", "Tab 1")],
            comments: Vec::new(),
        }
    }

    /// Create a document whose first tab holds `body`.
    pub fn with_body(document_id: impl Into<String>, body: Segment) -> Self {
        let mut doc = Self::new(document_id);
        doc.tabs[0].body = body;
        doc
    }

    /// Get a tab by id.
    pub fn tab(&self, tab_id: &str) -> Option<&Tab> {
        self.tabs.iter().find(|t| t.tab_id == tab_id)
    }

    /// Get a mutable tab by id.
    pub fn tab_mut(&mut self, tab_id: &str) -> Option<&mut Tab> {
        self.tabs.iter_mut().find(|t| t.tab_id == tab_id)
    }

    /// Body of the first tab.
    pub fn body(&self) -> Option<&Segment> {
        self.tabs.first().map(|t| &t.body)
    }

    /// Plain text of every tab body, one tab after another.
    pub fn plain_text(&self) -> String {
        self.tabs
            .iter()
            .map(|t| t.body.plain_text())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("")
    }
}

/// A tab with its own body, headers, footers and footnotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Stable identity
    pub tab_id: String,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Main content
    pub body: Segment,

    /// Headers, at most one per kind
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<HeaderFooterKind, HeaderFooter>,

    /// Footers, at most one per kind
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub footers: BTreeMap<HeaderFooterKind, HeaderFooter>,

    /// Footnote segments keyed by footnote id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub footnotes: BTreeMap<String, Segment>,

    /// Named ranges
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub named_ranges: Vec<NamedRange>,

    /// List definitions keyed by list id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lists: BTreeMap<String, List>,
}

impl Tab {
    /// Create a tab with an empty body.
    pub fn new(tab_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            tab_id: tab_id.into(),
            title: title.into(),
            body: Segment::new(),
            headers: BTreeMap::new(),
            footers: BTreeMap::new(),
            footnotes: BTreeMap::new(),
            named_ranges: Vec::new(),
            lists: BTreeMap::new(),
        }
    }

    /// Look up a segment by key.
    pub fn segment(&self, key: &SegmentKey) -> Option<&Segment> {
        match key {
            SegmentKey::Body => Some(&self.body),
            SegmentKey::Header(kind) => self.headers.get(kind).map(|h| &h.segment),
            SegmentKey::Footer(kind) => self.footers.get(kind).map(|f| &f.segment),
            SegmentKey::Footnote(id) => self.footnotes.get(id),
        }
    }

    /// Look up a mutable segment by key.
    pub fn segment_mut(&mut self, key: &SegmentKey) -> Option<&mut Segment> {
        match key {
            SegmentKey::Body => Some(&mut self.body),
            SegmentKey::Header(kind) => self.headers.get_mut(kind).map(|h| &mut h.segment),
            SegmentKey::Footer(kind) => self.footers.get_mut(kind).map(|f| &mut f.segment),
            SegmentKey::Footnote(id) => self.footnotes.get_mut(id),
        }
    }

    /// Resolve a wire segment id (`None` or empty for the body).
    pub fn segment_key(&self, segment_id: Option<&str>) -> Option<SegmentKey> {
        let id = match segment_id {
            None | Some("") => return Some(SegmentKey::Body),
            Some(id) => id,
        };
        if let Some((kind, _)) = self.headers.iter().find(|(_, h)| h.id == id) {
            return Some(SegmentKey::Header(*kind));
        }
        if let Some((kind, _)) = self.footers.iter().find(|(_, f)| f.id == id) {
            return Some(SegmentKey::Footer(*kind));
        }
        self.footnotes
            .contains_key(id)
            .then(|| SegmentKey::Footnote(id.to_string()))
    }

    /// Wire segment id of a segment (`None` for the body).
    pub fn segment_id(&self, key: &SegmentKey) -> Option<String> {
        match key {
            SegmentKey::Body => None,
            SegmentKey::Header(kind) => self.headers.get(kind).map(|h| h.id.clone()),
            SegmentKey::Footer(kind) => self.footers.get(kind).map(|f| f.id.clone()),
            SegmentKey::Footnote(id) => Some(id.clone()),
        }
    }

    /// Every segment with its key, body first.
    pub fn segments(&self) -> Vec<(SegmentKey, &Segment)> {
        let mut out = vec![(SegmentKey::Body, &self.body)];
        out.extend(
            self.headers
                .iter()
                .map(|(k, h)| (SegmentKey::Header(*k), &h.segment)),
        );
        out.extend(
            self.footers
                .iter()
                .map(|(k, f)| (SegmentKey::Footer(*k), &f.segment)),
        );
        out.extend(
            self.footnotes
                .iter()
                .map(|(id, s)| (SegmentKey::Footnote(id.clone()), s)),
        );
        out
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, kind: HeaderFooterKind, id: impl Into<String>, segment: Segment) {
        self.headers.insert(
            kind,
            HeaderFooter {
                id: id.into(),
                segment,
            },
        );
    }

    /// Add or replace a footer.
    pub fn set_footer(&mut self, kind: HeaderFooterKind, id: impl Into<String>, segment: Segment) {
        self.footers.insert(
            kind,
            HeaderFooter {
                id: id.into(),
                segment,
            },
        );
    }
}

/// Identifies a segment within a tab.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SegmentKey {
    /// The tab body
    Body,
    /// A header by kind
    Header(HeaderFooterKind),
    /// A footer by kind
    Footer(HeaderFooterKind),
    /// A footnote by id
    Footnote(String),
}

impl SegmentKey {
    /// Check if this is the body.
    pub fn is_body(&self) -> bool {
        matches!(self, SegmentKey::Body)
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentKey::Body => write!(f, "body"),
            SegmentKey::Header(kind) => write!(f, "{} header", kind.as_str()),
            SegmentKey::Footer(kind) => write!(f, "{} footer", kind.as_str()),
            SegmentKey::Footnote(id) => write!(f, "footnote {}", id),
        }
    }
}

/// Header or footer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderFooterKind {
    /// Used on every page unless overridden
    Default,
    /// First page only
    FirstPage,
    /// Even pages
    EvenPage,
}

impl HeaderFooterKind {
    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            HeaderFooterKind::Default => "DEFAULT",
            HeaderFooterKind::FirstPage => "FIRST_PAGE",
            HeaderFooterKind::EvenPage => "EVEN_PAGE",
        }
    }
}

/// A header or footer segment with its server id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderFooter {
    /// Segment id
    pub id: String,

    /// Content
    #[serde(flatten)]
    pub segment: Segment,
}

/// A named range over one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRange {
    /// Unique id
    pub named_range_id: String,

    /// Name; not required to be unique
    pub name: String,

    /// Segment id, `None` for the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,

    /// Start index (inclusive)
    pub start_index: u32,

    /// End index (exclusive)
    pub end_index: u32,
}

/// A list definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    /// Glyph preset, e.g. `BULLET_DISC_CIRCLE_SQUARE`
    pub bullet_preset: String,
}

impl List {
    /// Preset used when none is known.
    pub const DEFAULT_PRESET: &'static str = "BULLET_DISC_CIRCLE_SQUARE";
}

impl Default for List {
    fn default() -> Self {
        Self {
            bullet_preset: Self::DEFAULT_PRESET.to_string(),
        }
    }
}

/// A comment thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Server id; `None` for a comment authored locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,

    /// Comment text
    pub content: String,

    /// Text the comment is anchored to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted_text: Option<String>,
}
