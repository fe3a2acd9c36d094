//! Document model types.
//!
//! A [`Document`] is an ordered list of [`Tab`]s. Each tab owns a body
//! [`Segment`] plus header, footer and footnote segments. Every segment is an
//! independent UTF-16 index space starting at 1 whose content is a sequence of
//! [`StructuralElement`]s. The tree is an exhaustive tagged union: consumers
//! match on [`Block`] and [`InlineContent`] instead of probing optional keys.

mod document;
mod paragraph;
mod segment;
mod style;
mod table;

pub use document::{
    Comment, Document, HeaderFooter, HeaderFooterKind, List, NamedRange, SegmentKey, Tab,
};
pub use paragraph::{
    AutoText, AutoTextKind, Bullet, ColumnBreak, DateElement, Equation, FootnoteReference,
    InlineContent, InlineImage, PageBreak, Paragraph, ParagraphElement, Person, Size, TextRun,
};
pub use segment::{
    content_len, content_text, Block, HorizontalRule, SectionBreak, SectionStyle, SectionType,
    Segment, StructuralElement, TableOfContents,
};
pub use style::{
    parse_mask, Alignment, BaselineOffset, Color, ContentDirection, Dimension, Link,
    NamedStyleType, OptionalColor, ParagraphField, ParagraphStyle, RgbColor, StyleFields,
    TextField, TextStyle, Unit, WeightedFontFamily,
};
pub use table::{Table, TableCell, TableCellStyle, TableRow};
