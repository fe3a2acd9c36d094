//! Newline splitting and run cleanup.
//!
//! The content sequence is rebuilt functionally: every pass consumes the old
//! elements and produces a new vector, so no list is spliced while it is being
//! walked.

use super::{IndexError, IndexOptions};
use crate::model::{
    Block, InlineContent, Paragraph, ParagraphElement, StructuralElement, Table, TableCell,
    TableOfContents, TableRow, TextRun,
};

pub(super) struct Splitter<'a> {
    pub options: &'a IndexOptions,
    pub tab_id: &'a str,
    pub segment: String,
}

impl Splitter<'_> {
    /// Rebuild a content sequence starting at `offset`, returning the new
    /// sequence. `offset` is advanced past it.
    pub fn content(
        &self,
        content: Vec<StructuralElement>,
        offset: &mut u32,
    ) -> Result<Vec<StructuralElement>, IndexError> {
        let mut out = Vec::with_capacity(content.len());
        for element in content {
            match element.block {
                Block::Paragraph(p) => {
                    for paragraph in self.paragraph(p, *offset)? {
                        *offset += paragraph.len_utf16();
                        out.push(StructuralElement::paragraph(paragraph));
                    }
                }
                Block::Table(table) => {
                    let table = self.table(table, offset)?;
                    out.push(StructuralElement::new(Block::Table(table)));
                }
                Block::TableOfContents(toc) => {
                    *offset += 1;
                    let content = self.content(toc.content, offset)?;
                    *offset += 1;
                    out.push(StructuralElement::new(Block::TableOfContents(
                        TableOfContents { content },
                    )));
                }
                other => {
                    *offset += other.len_utf16();
                    out.push(StructuralElement::new(other));
                }
            }
        }
        Ok(out)
    }

    fn table(&self, table: Table, offset: &mut u32) -> Result<Table, IndexError> {
        *offset += 1;
        let mut rows = Vec::with_capacity(table.table_rows.len());
        for row in table.table_rows {
            *offset += 1;
            let mut cells = Vec::with_capacity(row.table_cells.len());
            for cell in row.table_cells {
                *offset += 1;
                let content = self.content(cell.content, offset)?;
                cells.push(TableCell {
                    content,
                    ..cell
                });
            }
            rows.push(TableRow::new(cells));
        }
        *offset += 1;
        Ok(Table {
            table_rows: rows,
            ..table
        })
    }

    /// Split one paragraph at embedded newlines. Every resulting paragraph
    /// keeps the original paragraph style and bullet.
    fn paragraph(&self, paragraph: Paragraph, start: u32) -> Result<Vec<Paragraph>, IndexError> {
        let Paragraph {
            elements,
            paragraph_style,
            bullet,
        } = paragraph;
        let fresh = || Paragraph {
            elements: Vec::new(),
            paragraph_style: paragraph_style.clone(),
            bullet: bullet.clone(),
        };

        let mut out = Vec::new();
        let mut current = fresh();
        let mut offset = start;

        for element in elements {
            let run = match element.content {
                InlineContent::TextRun(run) => run,
                other => {
                    self.close_terminated(&mut current, &mut out, &fresh, offset)?;
                    offset += other.len_utf16();
                    current.elements.push(ParagraphElement::new(other));
                    continue;
                }
            };
            if run.content.is_empty() {
                if !self.options.drop_empty_runs && !current.ends_with_newline() {
                    current
                        .elements
                        .push(ParagraphElement::new(InlineContent::TextRun(run)));
                }
                continue;
            }
            for piece in run.content.split_inclusive('\n') {
                self.close_terminated(&mut current, &mut out, &fresh, offset)?;
                offset += crate::text::utf16_len(piece);
                current.elements.push(ParagraphElement::new(InlineContent::TextRun(
                    TextRun::styled(piece, run.text_style.clone()),
                )));
            }
        }

        if !current.elements.is_empty() || out.is_empty() {
            if !current.ends_with_newline() {
                return Err(IndexError::MissingNewline {
                    tab_id: self.tab_id.to_string(),
                    segment: self.segment.clone(),
                    index: offset,
                });
            }
            out.push(current);
        }
        Ok(out)
    }

    /// Start a new paragraph if `current` already holds its newline.
    fn close_terminated(
        &self,
        current: &mut Paragraph,
        out: &mut Vec<Paragraph>,
        fresh: &dyn Fn() -> Paragraph,
        offset: u32,
    ) -> Result<(), IndexError> {
        if !current.ends_with_newline() {
            return Ok(());
        }
        if !self.options.split_newlines {
            return Err(IndexError::EmbeddedNewline {
                tab_id: self.tab_id.to_string(),
                segment: self.segment.clone(),
                index: offset - 1,
            });
        }
        log::debug!(
            "splitting paragraph at index {} in {} of tab {}",
            offset,
            self.segment,
            self.tab_id
        );
        out.push(std::mem::replace(current, fresh()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextStyle;

    fn splitter(options: &IndexOptions) -> Splitter<'_> {
        Splitter {
            options,
            tab_id: "t.0",
            segment: "body".to_string(),
        }
    }

    #[test]
    fn test_split_copies_paragraph_style() {
        let options = IndexOptions::default();
        let p = Paragraph::with_text("One\nTwo\n").with_bullet("kix.list1", 1);
        let parts = splitter(&options).paragraph(p, 1).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].plain_text(), "One\n");
        assert_eq!(parts[1].plain_text(), "Two\n");
        assert_eq!(parts[1].bullet.as_ref().unwrap().nesting_level, 1);
    }

    #[test]
    fn test_split_keeps_run_styles() {
        let options = IndexOptions::default();
        let bold = TextStyle::new().with_bold(true);
        let p = Paragraph::from_runs(vec![
            TextRun::styled("A\nB", bold.clone()),
            TextRun::new("C\n"),
        ]);
        let parts = splitter(&options).paragraph(p, 1).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].elements.len(), 2);
        match &parts[1].elements[0].content {
            InlineContent::TextRun(run) => {
                assert_eq!(run.content, "B");
                assert_eq!(run.text_style, bold);
            }
            other => panic!("unexpected element {:?}", other),
        }
    }

    #[test]
    fn test_embedded_newline_rejected_without_split() {
        let options = IndexOptions::default().with_split_newlines(false);
        let p = Paragraph::with_text("One\nTwo\n");
        let err = splitter(&options).paragraph(p, 1).unwrap_err();
        assert!(matches!(err, IndexError::EmbeddedNewline { index: 4, .. }));
    }

    #[test]
    fn test_missing_newline() {
        let options = IndexOptions::default();
        let mut p = Paragraph::new();
        p.add_run(TextRun::new("Hello"));
        let err = splitter(&options).paragraph(p, 1).unwrap_err();
        assert!(matches!(err, IndexError::MissingNewline { index: 6, .. }));
    }

    #[test]
    fn test_empty_runs_dropped() {
        let options = IndexOptions::default();
        let p = Paragraph::from_runs(vec![TextRun::new(""), TextRun::new("Hi\n")]);
        let parts = splitter(&options).paragraph(p, 1).unwrap();
        assert_eq!(parts[0].elements.len(), 1);
    }
}
