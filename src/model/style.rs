//! Text and paragraph styles with field-level provenance.
//!
//! A style is a bag of optional properties. Alongside the values, every style
//! records which fields were set directly on the node (`explicit_fields`) as
//! opposed to inherited from a named style. Provenance takes part in equality
//! and survives serialization: when a snapshot omits `explicitFields`, every
//! field that carries a value is treated as explicit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Field-level access shared by [`TextStyle`] and [`ParagraphStyle`].
pub trait StyleFields: Clone + Default {
    /// Field identifier type.
    type Field: Copy + Ord + std::fmt::Debug + 'static;

    /// Every field of this style, in declaration order.
    fn all_fields() -> &'static [Self::Field];

    /// Whether the field carries a value.
    fn has_value(&self, field: Self::Field) -> bool;

    /// Whether both styles carry the same value for the field.
    fn same_value(&self, other: &Self, field: Self::Field) -> bool;

    /// Copy one field's value from `from`.
    fn copy_value(&mut self, from: &Self, field: Self::Field);

    /// Remove one field's value.
    fn clear_value(&mut self, field: Self::Field);

    /// Fields set directly on this node.
    fn explicit_fields(&self) -> &BTreeSet<Self::Field>;

    /// Mutable access to the explicit field set.
    fn explicit_fields_mut(&mut self) -> &mut BTreeSet<Self::Field>;

    /// Fields that currently carry a value.
    fn present_fields(&self) -> BTreeSet<Self::Field> {
        Self::all_fields()
            .iter()
            .copied()
            .filter(|f| self.has_value(*f))
            .collect()
    }

    /// Projection keeping only explicitly set fields.
    fn explicit(&self) -> Self {
        let mut out = self.clone();
        for field in Self::all_fields() {
            if !self.explicit_fields().contains(field) {
                out.clear_value(*field);
            }
        }
        out
    }

    /// Projection keeping only explicit fields that are also in `mask`.
    fn restricted(&self, mask: &BTreeSet<Self::Field>) -> Self {
        let mut out = Self::default();
        for field in mask {
            if self.explicit_fields().contains(field) && self.has_value(*field) {
                out.copy_value(self, *field);
                out.explicit_fields_mut().insert(*field);
            }
        }
        out
    }

    /// Fields whose explicit value differs between `self` and `other`.
    fn differing_fields(&self, other: &Self) -> BTreeSet<Self::Field> {
        Self::all_fields()
            .iter()
            .copied()
            .filter(|f| {
                let a = self.explicit_fields().contains(f);
                let b = other.explicit_fields().contains(f);
                a != b || (a && !self.same_value(other, *f))
            })
            .collect()
    }

    /// Apply `update` for the fields in `mask`.
    ///
    /// A masked field with a value becomes explicit; a masked field without a
    /// value is cleared and loses its provenance.
    fn apply_masked(&mut self, update: &Self, mask: &BTreeSet<Self::Field>) {
        for field in mask {
            if update.has_value(*field) {
                self.copy_value(update, *field);
                self.explicit_fields_mut().insert(*field);
            } else {
                self.clear_value(*field);
                self.explicit_fields_mut().remove(field);
            }
        }
    }

    /// Whether no field is set explicitly.
    fn is_plain(&self) -> bool {
        self.explicit_fields().is_empty()
    }

    /// Whether the explicit projections of both styles agree.
    fn explicit_eq(&self, other: &Self) -> bool {
        self.differing_fields(other).is_empty()
    }
}

/// Render a field mask as the comma separated list used on the wire.
pub fn mask_to_string<F, I>(fields: I, name: impl Fn(F) -> &'static str) -> String
where
    I: IntoIterator<Item = F>,
{
    fields.into_iter().map(name).collect::<Vec<_>>().join(",")
}

macro_rules! style_struct {
    (
        $(#[$smeta:meta])*
        pub struct $style:ident, repr $repr:ident = $repr_lit:literal, field $field:ident {
            $( $(#[$fmeta:meta])* $member:ident : $ty:ty => $variant:ident = $name:literal ),+ $(,)?
        }
    ) => {
        $(#[$smeta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(from = $repr_lit, into = $repr_lit)]
        pub struct $style {
            $( $(#[$fmeta])* pub $member: Option<$ty>, )+

            /// Fields set directly on this node rather than inherited
            pub explicit_fields: BTreeSet<$field>,
        }

        /// Field identifiers, named as in update field masks.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $field {
            $( #[serde(rename = $name)] $variant, )+
        }

        impl $field {
            /// Every field in declaration order.
            pub const ALL: &'static [$field] = &[$($field::$variant),+];

            /// Wire name of the field.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $field::$variant => $name, )+
                }
            }

            /// Parse a wire field name.
            pub fn parse(name: &str) -> Option<Self> {
                match name {
                    $( $name => Some($field::$variant), )+
                    _ => None,
                }
            }
        }

        impl StyleFields for $style {
            type Field = $field;

            fn all_fields() -> &'static [$field] {
                $field::ALL
            }

            fn has_value(&self, field: $field) -> bool {
                match field {
                    $( $field::$variant => self.$member.is_some(), )+
                }
            }

            fn same_value(&self, other: &Self, field: $field) -> bool {
                match field {
                    $( $field::$variant => self.$member == other.$member, )+
                }
            }

            fn copy_value(&mut self, from: &Self, field: $field) {
                match field {
                    $( $field::$variant => self.$member = from.$member.clone(), )+
                }
            }

            fn clear_value(&mut self, field: $field) {
                match field {
                    $( $field::$variant => self.$member = None, )+
                }
            }

            fn explicit_fields(&self) -> &BTreeSet<$field> {
                &self.explicit_fields
            }

            fn explicit_fields_mut(&mut self) -> &mut BTreeSet<$field> {
                &mut self.explicit_fields
            }
        }

        #[derive(Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct $repr {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                $member: Option<$ty>,
            )+
            #[serde(default, skip_serializing_if = "Option::is_none")]
            explicit_fields: Option<BTreeSet<$field>>,
        }

        impl From<$repr> for $style {
            fn from(repr: $repr) -> Self {
                let mut style = Self {
                    $( $member: repr.$member, )+
                    explicit_fields: BTreeSet::new(),
                };
                style.explicit_fields = match repr.explicit_fields {
                    Some(fields) => fields,
                    None => style.present_fields(),
                };
                style
            }
        }

        impl From<$style> for $repr {
            fn from(style: $style) -> Self {
                let explicit_fields = if style.explicit_fields == style.present_fields() {
                    None
                } else {
                    Some(style.explicit_fields.clone())
                };
                Self {
                    $( $member: style.$member, )+
                    explicit_fields,
                }
            }
        }
    };
}

style_struct! {
    /// Character-level formatting of a text run.
    pub struct TextStyle, repr TextStyleRepr = "TextStyleRepr", field TextField {
        /// Bold text
        bold: bool => Bold = "bold",
        /// Italic text
        italic: bool => Italic = "italic",
        /// Underlined text
        underline: bool => Underline = "underline",
        /// Strikethrough text
        strikethrough: bool => Strikethrough = "strikethrough",
        /// Small capitals
        small_caps: bool => SmallCaps = "smallCaps",
        /// Superscript / subscript offset
        baseline_offset: BaselineOffset => BaselineOffset = "baselineOffset",
        /// Font size
        font_size: Dimension => FontSize = "fontSize",
        /// Font family and weight
        weighted_font_family: WeightedFontFamily => WeightedFontFamily = "weightedFontFamily",
        /// Text color
        foreground_color: OptionalColor => ForegroundColor = "foregroundColor",
        /// Highlight color
        background_color: OptionalColor => BackgroundColor = "backgroundColor",
        /// Hyperlink target
        link: Link => Link = "link",
    }
}

style_struct! {
    /// Paragraph-level formatting.
    pub struct ParagraphStyle, repr ParagraphStyleRepr = "ParagraphStyleRepr", field ParagraphField {
        /// Named style (normal text, headings, title)
        named_style_type: NamedStyleType => NamedStyleType = "namedStyleType",
        /// Horizontal alignment
        alignment: Alignment => Alignment = "alignment",
        /// Text direction
        direction: ContentDirection => Direction = "direction",
        /// Line spacing as a percentage (100 = single)
        line_spacing: f64 => LineSpacing = "lineSpacing",
        /// Space above the paragraph
        space_above: Dimension => SpaceAbove = "spaceAbove",
        /// Space below the paragraph
        space_below: Dimension => SpaceBelow = "spaceBelow",
        /// First line indent
        indent_first_line: Dimension => IndentFirstLine = "indentFirstLine",
        /// Leading edge indent
        indent_start: Dimension => IndentStart = "indentStart",
        /// Trailing edge indent
        indent_end: Dimension => IndentEnd = "indentEnd",
        /// Keep all lines on one page
        keep_lines_together: bool => KeepLinesTogether = "keepLinesTogether",
        /// Keep on the same page as the next paragraph
        keep_with_next: bool => KeepWithNext = "keepWithNext",
    }
}

impl TextStyle {
    /// Create an empty style.
    pub fn new() -> Self {
        Self::default()
    }

    fn set<F: FnOnce(&mut Self)>(mut self, field: TextField, f: F) -> Self {
        f(&mut self);
        self.explicit_fields.insert(field);
        self
    }

    /// Set bold explicitly.
    pub fn with_bold(self, bold: bool) -> Self {
        self.set(TextField::Bold, |s| s.bold = Some(bold))
    }

    /// Set italic explicitly.
    pub fn with_italic(self, italic: bool) -> Self {
        self.set(TextField::Italic, |s| s.italic = Some(italic))
    }

    /// Set underline explicitly.
    pub fn with_underline(self, underline: bool) -> Self {
        self.set(TextField::Underline, |s| s.underline = Some(underline))
    }

    /// Set the font size in points.
    pub fn with_font_size(self, points: f64) -> Self {
        self.set(TextField::FontSize, |s| s.font_size = Some(Dimension::pt(points)))
    }

    /// Set the text color from a hex string such as `#FF0000`.
    pub fn with_foreground(self, hex: &str) -> Self {
        let color = OptionalColor::from_hex(hex);
        self.set(TextField::ForegroundColor, |s| s.foreground_color = color)
    }

    /// Set a hyperlink.
    pub fn with_link(self, url: impl Into<String>) -> Self {
        let link = Link::url(url);
        self.set(TextField::Link, |s| s.link = Some(link))
    }

    /// Mark a field as inherited rather than explicit, keeping its value.
    pub fn inherit(mut self, field: TextField) -> Self {
        self.explicit_fields.remove(&field);
        self
    }

    /// Field mask as used by `updateTextStyle`.
    pub fn mask_string(fields: &BTreeSet<TextField>) -> String {
        mask_to_string(fields.iter().copied(), TextField::as_str)
    }
}

impl ParagraphStyle {
    /// Create an empty style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a style with a named style type set explicitly.
    pub fn named(kind: NamedStyleType) -> Self {
        let mut style = Self::default();
        style.named_style_type = Some(kind);
        style.explicit_fields.insert(ParagraphField::NamedStyleType);
        style
    }

    /// Set alignment explicitly.
    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self.explicit_fields.insert(ParagraphField::Alignment);
        self
    }

    /// Set the leading indent in points.
    pub fn with_indent_start(mut self, points: f64) -> Self {
        self.indent_start = Some(Dimension::pt(points));
        self.explicit_fields.insert(ParagraphField::IndentStart);
        self
    }

    /// Get the heading level (1-6) or None.
    pub fn heading_level(&self) -> Option<u8> {
        self.named_style_type.and_then(NamedStyleType::heading_level)
    }

    /// Field mask as used by `updateParagraphStyle`.
    pub fn mask_string(fields: &BTreeSet<ParagraphField>) -> String {
        mask_to_string(fields.iter().copied(), ParagraphField::as_str)
    }
}

/// Parse a comma separated field mask. `*` selects every field.
pub fn parse_mask<F: Copy + Ord>(
    mask: &str,
    all: &[F],
    parse: impl Fn(&str) -> Option<F>,
) -> std::result::Result<BTreeSet<F>, String> {
    let mask = mask.trim();
    if mask == "*" {
        return Ok(all.iter().copied().collect());
    }
    let mut fields = BTreeSet::new();
    for name in mask.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match parse(name) {
            Some(field) => {
                fields.insert(field);
            }
            None => return Err(name.to_string()),
        }
    }
    Ok(fields)
}

/// A measurement with a unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Numeric magnitude
    pub magnitude: f64,
    /// Unit of the magnitude
    pub unit: Unit,
}

impl Dimension {
    /// Create a dimension in points.
    pub fn pt(magnitude: f64) -> Self {
        Self {
            magnitude,
            unit: Unit::Pt,
        }
    }
}

/// Measurement unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Typographic points
    #[default]
    #[serde(rename = "PT")]
    Pt,
}

/// Font family with weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedFontFamily {
    /// Family name
    pub font_family: String,
    /// Weight (100-900, 400 = normal)
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    400
}

/// A color that may be explicitly transparent (no color).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionalColor {
    /// The color, or None for transparent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl OptionalColor {
    /// Create a color from RGB components in `0.0..=1.0`.
    pub fn rgb(red: f32, green: f32, blue: f32) -> Self {
        Self {
            color: Some(Color {
                rgb_color: RgbColor { red, green, blue },
            }),
        }
    }

    /// Parse a `#RRGGBB` hex string. Invalid input yields `None`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }
        let component = |i: usize| {
            u8::from_str_radix(hex.get(i..i + 2)?, 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        Some(Self::rgb(component(0)?, component(2)?, component(4)?))
    }
}

/// A solid color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    /// RGB components
    pub rgb_color: RgbColor,
}

/// RGB components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RgbColor {
    /// Red component
    #[serde(default)]
    pub red: f32,
    /// Green component
    #[serde(default)]
    pub green: f32,
    /// Blue component
    #[serde(default)]
    pub blue: f32,
}

/// Hyperlink target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    /// External URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Heading inside the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_id: Option<String>,
}

impl Link {
    /// Create a link to an external URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            heading_id: None,
        }
    }
}

/// Vertical offset of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaselineOffset {
    /// Normal baseline
    #[serde(rename = "NONE")]
    Normal,
    /// Superscript
    Superscript,
    /// Subscript
    Subscript,
}

/// Named paragraph style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NamedStyleType {
    /// Body text
    NormalText,
    /// Document title
    Title,
    /// Document subtitle
    Subtitle,
    /// Heading level 1
    #[serde(rename = "HEADING_1")]
    Heading1,
    /// Heading level 2
    #[serde(rename = "HEADING_2")]
    Heading2,
    /// Heading level 3
    #[serde(rename = "HEADING_3")]
    Heading3,
    /// Heading level 4
    #[serde(rename = "HEADING_4")]
    Heading4,
    /// Heading level 5
    #[serde(rename = "HEADING_5")]
    Heading5,
    /// Heading level 6
    #[serde(rename = "HEADING_6")]
    Heading6,
}

impl NamedStyleType {
    /// Create a heading style; levels are clamped to 1-6.
    pub fn heading(level: u8) -> Self {
        match level.clamp(1, 6) {
            1 => Self::Heading1,
            2 => Self::Heading2,
            3 => Self::Heading3,
            4 => Self::Heading4,
            5 => Self::Heading5,
            _ => Self::Heading6,
        }
    }

    /// Heading level, or None for non-heading styles.
    pub fn heading_level(self) -> Option<u8> {
        match self {
            Self::Heading1 => Some(1),
            Self::Heading2 => Some(2),
            Self::Heading3 => Some(3),
            Self::Heading4 => Some(4),
            Self::Heading5 => Some(5),
            Self::Heading6 => Some(6),
            _ => None,
        }
    }
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Alignment {
    /// Leading edge
    Start,
    /// Centered
    Center,
    /// Trailing edge
    End,
    /// Justified
    Justified,
}

/// Text direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentDirection {
    /// Left to right
    LeftToRight,
    /// Right to left
    RightToLeft,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_marks_explicit() {
        let style = TextStyle::new().with_bold(true).with_font_size(12.0);
        assert!(style.explicit_fields.contains(&TextField::Bold));
        assert!(style.explicit_fields.contains(&TextField::FontSize));
        assert!(!style.is_plain());
    }

    #[test]
    fn test_provenance_affects_equality() {
        let explicit = TextStyle::new().with_bold(true);
        let inherited = TextStyle::new().with_bold(true).inherit(TextField::Bold);
        assert_eq!(explicit.bold, inherited.bold);
        assert_ne!(explicit, inherited);
        assert!(!explicit.explicit_eq(&inherited));
    }

    #[test]
    fn test_differing_fields_ignores_inherited_values() {
        let a = TextStyle::new().with_italic(true).inherit(TextField::Italic);
        let b = TextStyle::new();
        assert!(a.differing_fields(&b).is_empty());

        let c = TextStyle::new().with_bold(true);
        let diff = c.differing_fields(&b);
        assert_eq!(diff.into_iter().collect::<Vec<_>>(), vec![TextField::Bold]);
    }

    #[test]
    fn test_apply_masked_sets_and_clears() {
        let mut style = TextStyle::new().with_bold(true).with_italic(true);
        let update = TextStyle::new().with_underline(true);
        let mask: BTreeSet<_> = [TextField::Bold, TextField::Underline].into_iter().collect();
        style.apply_masked(&update, &mask);

        assert_eq!(style.bold, None);
        assert_eq!(style.italic, Some(true));
        assert_eq!(style.underline, Some(true));
        assert!(!style.explicit_fields.contains(&TextField::Bold));
        assert!(style.explicit_fields.contains(&TextField::Underline));
    }

    #[test]
    fn test_serde_infers_provenance_when_absent() {
        let style: TextStyle = serde_json::from_str(r#"{"bold":true}"#).unwrap();
        assert!(style.explicit_fields.contains(&TextField::Bold));

        let inherited = TextStyle::new().with_bold(true).inherit(TextField::Bold);
        let json = serde_json::to_string(&inherited).unwrap();
        assert!(json.contains("explicitFields"));
        let back: TextStyle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inherited);

        let plain = serde_json::to_string(&TextStyle::new().with_bold(true)).unwrap();
        assert_eq!(plain, r#"{"bold":true}"#);
    }

    #[test]
    fn test_parse_mask() {
        let fields = parse_mask("bold, italic", TextField::ALL, TextField::parse).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(
            parse_mask("*", TextField::ALL, TextField::parse).unwrap().len(),
            TextField::ALL.len()
        );
        assert_eq!(
            parse_mask("bold,sparkle", TextField::ALL, TextField::parse),
            Err("sparkle".to_string())
        );
        assert_eq!(
            TextStyle::mask_string(&fields),
            "bold,italic".to_string()
        );
    }

    #[test]
    fn test_named_style_heading() {
        let style = ParagraphStyle::named(NamedStyleType::heading(2));
        assert_eq!(style.heading_level(), Some(2));
        assert_eq!(
            serde_json::to_string(&style).unwrap(),
            r#"{"namedStyleType":"HEADING_2"}"#
        );
    }

    #[test]
    fn test_color_from_hex() {
        let color = OptionalColor::from_hex("#FF0000").unwrap();
        let rgb = color.color.unwrap().rgb_color;
        assert_eq!(rgb.red, 1.0);
        assert_eq!(rgb.green, 0.0);
        assert!(OptionalColor::from_hex("nope").is_none());
    }
}
