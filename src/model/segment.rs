//! Segments and the structural elements they contain.

use super::{Paragraph, Table};
use serde::{Deserialize, Serialize};

/// An independently indexed content region. Indices start at 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Structural elements in document order
    pub content: Vec<StructuralElement>,
}

impl Segment {
    /// Create a segment holding a single empty paragraph.
    pub fn new() -> Self {
        Self::from_paragraphs(["\n"])
    }

    /// Create a segment from plain paragraph texts.
    pub fn from_paragraphs<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            content: paragraphs
                .into_iter()
                .map(|t| StructuralElement::paragraph(Paragraph::with_text(t)))
                .collect(),
        }
    }

    /// Create a segment from elements.
    pub fn from_elements(content: Vec<StructuralElement>) -> Self {
        Self { content }
    }

    /// Add a paragraph.
    pub fn add_paragraph(&mut self, paragraph: Paragraph) {
        self.content.push(StructuralElement::paragraph(paragraph));
    }

    /// Add a table.
    pub fn add_table(&mut self, table: Table) {
        self.content.push(StructuralElement::new(Block::Table(table)));
    }

    /// Add any block.
    pub fn add_block(&mut self, block: Block) {
        self.content.push(StructuralElement::new(block));
    }

    /// Length in UTF-16 code units.
    pub fn len_utf16(&self) -> u32 {
        content_len(&self.content)
    }

    /// Index one past the terminal newline.
    pub fn end_index(&self) -> u32 {
        1 + self.len_utf16()
    }

    /// Get plain text content of the segment.
    pub fn plain_text(&self) -> String {
        content_text(&self.content)
    }

    /// Iterate over top-level paragraphs.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.content.iter().filter_map(|e| match &e.block {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Check if the segment has no content at all.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// A positioned structural element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralElement {
    /// Start index (inclusive, UTF-16 units)
    #[serde(default)]
    pub start_index: u32,

    /// End index (exclusive, UTF-16 units)
    #[serde(default)]
    pub end_index: u32,

    /// Element payload
    #[serde(flatten)]
    pub block: Block,
}

impl StructuralElement {
    /// Create an element with unassigned indices.
    pub fn new(block: Block) -> Self {
        Self {
            start_index: 0,
            end_index: 0,
            block,
        }
    }

    /// Wrap a paragraph.
    pub fn paragraph(paragraph: Paragraph) -> Self {
        Self::new(Block::Paragraph(paragraph))
    }

    /// Length in UTF-16 code units.
    pub fn len_utf16(&self) -> u32 {
        self.block.len_utf16()
    }
}

/// Structural element payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Block {
    /// A paragraph of inline content
    Paragraph(Paragraph),
    /// A table
    Table(Table),
    /// A section break
    SectionBreak(SectionBreak),
    /// A generated table of contents
    TableOfContents(TableOfContents),
    /// A horizontal rule
    HorizontalRule(HorizontalRule),
}

impl Block {
    /// Length in UTF-16 code units.
    pub fn len_utf16(&self) -> u32 {
        match self {
            Block::Paragraph(p) => p.len_utf16(),
            Block::Table(t) => t.len_utf16(),
            Block::SectionBreak(_) | Block::HorizontalRule(_) => 1,
            Block::TableOfContents(toc) => 2 + content_len(&toc.content),
        }
    }

    /// Short name used in logs and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::Paragraph(_) => "paragraph",
            Block::Table(_) => "table",
            Block::SectionBreak(_) => "section break",
            Block::TableOfContents(_) => "table of contents",
            Block::HorizontalRule(_) => "horizontal rule",
        }
    }

    /// Check if this is a paragraph.
    pub fn is_paragraph(&self) -> bool {
        matches!(self, Block::Paragraph(_))
    }
}

/// A section break.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionBreak {
    /// Section properties
    #[serde(default)]
    pub section_style: SectionStyle,
}

impl SectionBreak {
    /// Create a section break of the given type.
    pub fn new(section_type: SectionType) -> Self {
        Self {
            section_style: SectionStyle {
                section_type: Some(section_type),
            },
        }
    }
}

/// Section properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionStyle {
    /// How the section starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_type: Option<SectionType>,
}

/// Section start behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionType {
    /// Starts on the same page
    Continuous,
    /// Starts on a new page
    NextPage,
}

/// A generated table of contents. Its content cannot be edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableOfContents {
    /// Generated entries
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

/// A horizontal rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizontalRule {}

/// Total length of a content sequence.
pub fn content_len(content: &[StructuralElement]) -> u32 {
    content.iter().map(StructuralElement::len_utf16).sum()
}

/// Plain text of a content sequence; tables are flattened cell by cell.
pub fn content_text(content: &[StructuralElement]) -> String {
    content
        .iter()
        .filter_map(|e| match &e.block {
            Block::Paragraph(p) => Some(p.plain_text()),
            Block::Table(t) => Some(t.plain_text()),
            Block::TableOfContents(toc) => Some(content_text(&toc.content)),
            _ => None,
        })
        .collect()
}
