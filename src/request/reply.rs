//! Replies returned by `batchUpdate`.

use serde::{Deserialize, Serialize};

/// One reply per request. Only creation requests fill a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    /// Reply to `createHeader`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_header: Option<CreatedHeader>,

    /// Reply to `createFooter`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_footer: Option<CreatedFooter>,

    /// Reply to `createFootnote`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_footnote: Option<CreatedFootnote>,

    /// Reply to `createNamedRange`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_named_range: Option<CreatedNamedRange>,

    /// Reply to `insertInlineImage`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_inline_image: Option<CreatedObject>,

    /// Reply to `createParagraphBullets`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_paragraph_bullets: Option<CreatedList>,

    /// Reply to `addDocumentTab`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_document_tab: Option<CreatedTab>,
}

impl Reply {
    /// An empty reply.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The id assigned by the server, if the request created something.
    pub fn created_id(&self) -> Option<&str> {
        if let Some(r) = &self.create_header {
            return Some(&r.header_id);
        }
        if let Some(r) = &self.create_footer {
            return Some(&r.footer_id);
        }
        if let Some(r) = &self.create_footnote {
            return Some(&r.footnote_id);
        }
        if let Some(r) = &self.create_named_range {
            return Some(&r.named_range_id);
        }
        if let Some(r) = &self.insert_inline_image {
            return Some(&r.object_id);
        }
        if let Some(r) = &self.create_paragraph_bullets {
            return Some(&r.list_id);
        }
        self.add_document_tab
            .as_ref()
            .map(|r| r.tab_properties.tab_id.as_str())
    }
}

/// Header creation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedHeader {
    /// New header id
    pub header_id: String,
}

/// Footer creation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFooter {
    /// New footer id
    pub footer_id: String,
}

/// Footnote creation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedFootnote {
    /// New footnote id
    pub footnote_id: String,
}

/// Named range creation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedNamedRange {
    /// New range id
    pub named_range_id: String,
}

/// Inline object creation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedObject {
    /// New object id
    pub object_id: String,
}

/// List creation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedList {
    /// New list id
    pub list_id: String,
}

/// Tab creation reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTab {
    /// Properties of the new tab
    pub tab_properties: CreatedTabProperties,
}

/// Properties of a created tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTabProperties {
    /// New tab id
    pub tab_id: String,
}

/// Result of a successful `batchUpdate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// One reply per request, in request order
    pub replies: Vec<Reply>,

    /// Revision after the batch
    pub revision_id: String,
}
