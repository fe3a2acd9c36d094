//! Paragraph and paragraph-element types.

use super::{ParagraphStyle, TextStyle};
use crate::text::utf16_len;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A paragraph: inline elements terminated by a newline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    /// Inline elements in document order; the last one is a text run ending in `\n`
    pub elements: Vec<ParagraphElement>,

    /// Paragraph style
    #[serde(default)]
    pub paragraph_style: ParagraphStyle,

    /// List membership, if the paragraph is bulleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bullet: Option<Bullet>,
}

impl Paragraph {
    /// Create a new empty paragraph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a paragraph with plain text. A missing trailing newline is added.
    pub fn with_text(text: impl Into<String>) -> Self {
        let mut text = text.into();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        let mut p = Self::new();
        p.add_run(TextRun::new(text));
        p
    }

    /// Create a paragraph from styled runs. A missing trailing newline is
    /// appended to the last run.
    pub fn from_runs(runs: Vec<TextRun>) -> Self {
        let mut p = Self::new();
        for run in runs {
            p.add_run(run);
        }
        p.ensure_newline();
        p
    }

    /// Create a heading paragraph.
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        Self::with_text(text).with_style(ParagraphStyle::named(super::NamedStyleType::heading(level)))
    }

    /// Set the paragraph style.
    pub fn with_style(mut self, style: ParagraphStyle) -> Self {
        self.paragraph_style = style;
        self
    }

    /// Attach a bullet.
    pub fn with_bullet(mut self, list_id: impl Into<String>, nesting_level: u32) -> Self {
        self.bullet = Some(Bullet {
            list_id: list_id.into(),
            nesting_level,
        });
        self
    }

    /// Add a text run.
    pub fn add_run(&mut self, run: TextRun) {
        self.elements
            .push(ParagraphElement::new(InlineContent::TextRun(run)));
    }

    /// Add a non-text inline element before the terminating newline, if any.
    pub fn add_inline(&mut self, content: InlineContent) {
        let element = ParagraphElement::new(content);
        if self.ends_with_newline() {
            let last = self.elements.len() - 1;
            let newline_only = matches!(
                &self.elements[last].content,
                InlineContent::TextRun(run) if run.content == "\n"
            );
            if newline_only {
                self.elements.insert(last, element);
            } else if let InlineContent::TextRun(run) = &mut self.elements[last].content {
                run.content.pop();
                let style = run.text_style.clone();
                self.elements.push(element);
                self.add_run(TextRun::styled("\n", style));
            }
        } else {
            self.elements.push(element);
        }
    }

    /// Append a newline run if the paragraph does not end with one.
    pub fn ensure_newline(&mut self) {
        if self.ends_with_newline() {
            return;
        }
        match self.elements.last_mut().map(|e| &mut e.content) {
            Some(InlineContent::TextRun(run)) => run.content.push('\n'),
            _ => self.add_run(TextRun::new("\n")),
        }
    }

    /// Check whether the last element is a text run ending in `\n`.
    pub fn ends_with_newline(&self) -> bool {
        matches!(
            self.elements.last().map(|e| &e.content),
            Some(InlineContent::TextRun(run)) if run.content.ends_with('\n')
        )
    }

    /// Length in UTF-16 code units.
    pub fn len_utf16(&self) -> u32 {
        self.elements.iter().map(|e| e.content.len_utf16()).sum()
    }

    /// Plain text of the paragraph, non-text elements omitted.
    pub fn plain_text(&self) -> String {
        self.elements
            .iter()
            .filter_map(|e| match &e.content {
                InlineContent::TextRun(run) => Some(run.content.as_str()),
                InlineContent::Equation(eq) => Some(eq.content.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Check if the paragraph holds nothing but its newline.
    pub fn is_empty(&self) -> bool {
        self.plain_text() == "\n" && self.elements.len() == 1
    }

    /// Check if this is a heading.
    pub fn is_heading(&self) -> bool {
        self.paragraph_style.heading_level().is_some()
    }

    /// Check if this is a list item.
    pub fn is_list_item(&self) -> bool {
        self.bullet.is_some()
    }
}

/// List membership of a paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bullet {
    /// List the paragraph belongs to
    pub list_id: String,

    /// Nesting level (0 = top level)
    #[serde(default)]
    pub nesting_level: u32,
}

/// A positioned inline element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphElement {
    /// Start index (inclusive, UTF-16 units)
    #[serde(default)]
    pub start_index: u32,

    /// End index (exclusive, UTF-16 units)
    #[serde(default)]
    pub end_index: u32,

    /// Element payload
    #[serde(flatten)]
    pub content: InlineContent,
}

impl ParagraphElement {
    /// Create an element with unassigned indices.
    pub fn new(content: InlineContent) -> Self {
        Self {
            start_index: 0,
            end_index: 0,
            content,
        }
    }
}

/// Inline content within a paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InlineContent {
    /// Styled text
    TextRun(TextRun),
    /// Page break
    PageBreak(PageBreak),
    /// Column break
    ColumnBreak(ColumnBreak),
    /// Reference to a footnote segment
    FootnoteReference(FootnoteReference),
    /// Inline image
    InlineImage(InlineImage),
    /// Person chip
    Person(Person),
    /// Date chip
    Date(DateElement),
    /// Server-generated text such as page numbers
    AutoText(AutoText),
    /// Equation
    Equation(Equation),
}

impl InlineContent {
    /// Length in UTF-16 code units.
    pub fn len_utf16(&self) -> u32 {
        match self {
            InlineContent::TextRun(run) => utf16_len(&run.content),
            InlineContent::Equation(eq) => utf16_len(&eq.content).max(1),
            _ => 1,
        }
    }

    /// Short name used in logs and error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            InlineContent::TextRun(_) => "text run",
            InlineContent::PageBreak(_) => "page break",
            InlineContent::ColumnBreak(_) => "column break",
            InlineContent::FootnoteReference(_) => "footnote reference",
            InlineContent::InlineImage(_) => "inline image",
            InlineContent::Person(_) => "person",
            InlineContent::Date(_) => "date",
            InlineContent::AutoText(_) => "auto text",
            InlineContent::Equation(_) => "equation",
        }
    }
}

/// A run of text sharing one style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    /// Text content
    pub content: String,

    /// Text style
    #[serde(default)]
    pub text_style: TextStyle,
}

impl TextRun {
    /// Create an unstyled run.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            text_style: TextStyle::default(),
        }
    }

    /// Create a styled run.
    pub fn styled(content: impl Into<String>, style: TextStyle) -> Self {
        Self {
            content: content.into(),
            text_style: style,
        }
    }
}

/// Page break marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageBreak {}

/// Column break marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBreak {}

/// Reference to a footnote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootnoteReference {
    /// Footnote segment id
    pub footnote_id: String,
}

/// An inline image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    /// Server-side object id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    /// Source URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// Display size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
}

/// Width and height in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
}

/// A person chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// E-mail address
    pub email: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A date chip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateElement {
    /// Point in time
    pub timestamp: DateTime<Utc>,

    /// Display format, e.g. `DATE_FORMAT_ISO8601`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,

    /// Locale, e.g. `en`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Server-generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoText {
    /// What the text shows
    #[serde(rename = "type")]
    pub kind: AutoTextKind,
}

/// Auto text kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoTextKind {
    /// Current page number
    PageNumber,
    /// Total page count
    PageCount,
}

/// An equation; its length is the length of its source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equation {
    /// Equation source
    #[serde(default)]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_with_text_adds_newline() {
        let p = Paragraph::with_text("Hello");
        assert_eq!(p.plain_text(), "Hello\n");
        assert!(p.ends_with_newline());
        assert_eq!(p.len_utf16(), 6);
    }

    #[test]
    fn test_add_inline_before_newline() {
        let mut p = Paragraph::with_text("Hi\n");
        p.add_inline(InlineContent::PageBreak(PageBreak {}));
        assert_eq!(p.elements.len(), 3);
        assert!(matches!(p.elements[1].content, InlineContent::PageBreak(_)));
        assert!(p.ends_with_newline());
        assert_eq!(p.len_utf16(), 4);
    }

    #[test]
    fn test_inline_lengths() {
        assert_eq!(InlineContent::Equation(Equation::default()).len_utf16(), 1);
        assert_eq!(
            InlineContent::Equation(Equation {
                content: "x+y".to_string()
            })
            .len_utf16(),
            3
        );
        assert_eq!(
            InlineContent::TextRun(TextRun::new("😀\n")).len_utf16(),
            3
        );
    }

    #[test]
    fn test_element_serde_shape() {
        let element = ParagraphElement {
            start_index: 1,
            end_index: 7,
            content: InlineContent::TextRun(TextRun::new("Hello\n")),
        };
        let json = serde_json::to_value(&element).unwrap();
        assert_eq!(json["startIndex"], 1);
        assert_eq!(json["textRun"]["content"], "Hello\n");

        let back: ParagraphElement = serde_json::from_value(json).unwrap();
        assert_eq!(back, element);
    }
}
