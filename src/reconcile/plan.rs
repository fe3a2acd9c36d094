//! Segment plans and batch assembly.
//!
//! Each segment is planned in isolation against a private mock engine that
//! starts from the base segment. Content edits are replayed there first; the
//! style, list, merge and named range passes then read their positions off
//! the replayed result instead of tracking index shifts by hand.

use super::atoms::same_content;
use super::named_range::reconcile_ranges;
use super::realize::{diff_container, Edits, Scope, SegmentKind};
use super::style::{bullet_requests, style_requests};
use super::table::merge_pass;
use super::{ReconcileOptions, Reconciliation, Unsupported, UnsupportedKind};
use crate::error::{Error, Result};
use crate::indexer::index_segment;
use crate::mock::{MockEngine, MockOptions};
use crate::model::{
    Block, Document, InlineContent, List, NamedRange, Segment, SegmentKey, StructuralElement, Tab,
};
use crate::request::*;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

const SIM_SEGMENT: &str = "sim.segment";

/// A mock engine holding one segment.
struct Simulator {
    engine: MockEngine,
    key: SegmentKey,
    segment_id: Option<Id>,
}

impl Simulator {
    fn new(base: &Segment, key: &SegmentKey, ranges: &[&NamedRange]) -> Self {
        let mut tab = Tab::new("t.sim", "");
        let (key, segment_id) = match key {
            SegmentKey::Body => {
                tab.body = base.clone();
                (SegmentKey::Body, None)
            }
            SegmentKey::Header(kind) => {
                tab.set_header(*kind, SIM_SEGMENT, base.clone());
                (SegmentKey::Header(*kind), Some(SIM_SEGMENT))
            }
            SegmentKey::Footer(kind) => {
                tab.set_footer(*kind, SIM_SEGMENT, base.clone());
                (SegmentKey::Footer(*kind), Some(SIM_SEGMENT))
            }
            SegmentKey::Footnote(_) => {
                tab.footnotes.insert(SIM_SEGMENT.to_string(), base.clone());
                (SegmentKey::Footnote(SIM_SEGMENT.to_string()), Some(SIM_SEGMENT))
            }
        };
        tab.named_ranges = ranges
            .iter()
            .map(|r| NamedRange {
                segment_id: segment_id.map(str::to_string),
                ..(*r).clone()
            })
            .collect();

        let mut document = Document::new("sim");
        document.tabs = vec![tab];
        let options = MockOptions::new().with_strict_uris(false);
        Self {
            engine: MockEngine::with_options(document, options),
            key,
            segment_id: segment_id.map(Id::from),
        }
    }

    fn apply(&mut self, requests: &[Request], stage: &str) -> Result<()> {
        if requests.is_empty() {
            return Ok(());
        }
        let targeted: Vec<Request> = requests
            .iter()
            .cloned()
            .map(|mut r| {
                r.retarget(None, self.segment_id.as_ref());
                r
            })
            .collect();
        self.engine
            .batch_update(&targeted, None)
            .map(|_| ())
            .map_err(|e| Error::Reconcile(format!("{} edits rejected: {}", stage, e)))
    }

    fn tab(&self) -> Result<&Tab> {
        self.engine
            .document()
            .tabs
            .first()
            .ok_or_else(|| Error::Reconcile("simulated document lost its tab".to_string()))
    }

    fn content(&self) -> Result<&[StructuralElement]> {
        self.tab()?
            .segment(&self.key)
            .map(|s| s.content.as_slice())
            .ok_or_else(|| Error::Reconcile(format!("simulated {} disappeared", self.key)))
    }
}

/// Where the segment targeted by a task gets its id.
#[derive(Debug, Clone)]
enum Slot {
    Fixed(Option<Id>),
    /// Created by a request of batch A
    InA(usize),
    /// Created by the n-th header or footer request of a new tab
    NewTabSegment(usize),
    /// Created by a `createFootnote` of a first-round plan
    Footnote { plan: usize, offset: usize },
}

struct Task<'a> {
    /// Desired tab id, for reporting
    tab_name: &'a str,
    tab: Id,
    slot: Slot,
    key: SegmentKey,
    base: Option<&'a Segment>,
    desired: &'a Segment,
    lists: &'a BTreeMap<String, List>,
    base_ranges: Vec<&'a NamedRange>,
    desired_ranges: Vec<&'a NamedRange>,
}

impl<'a> Task<'a> {
    /// A task for the body of `tab` with no base and no ranges.
    fn body(tab: &'a Tab, slot: Slot, tab_id: Id) -> Self {
        Task {
            tab_name: &tab.tab_id,
            tab: tab_id,
            slot,
            key: SegmentKey::Body,
            base: None,
            desired: &tab.body,
            lists: &tab.lists,
            base_ranges: Vec::new(),
            desired_ranges: Vec::new(),
        }
    }

    fn kind(&self) -> SegmentKind {
        match self.key {
            SegmentKey::Body => SegmentKind::Body,
            SegmentKey::Header(_) => SegmentKind::Header,
            SegmentKey::Footer(_) => SegmentKind::Footer,
            SegmentKey::Footnote(_) => SegmentKind::Footnote,
        }
    }
}

#[derive(Debug, Default)]
struct SegmentPlan {
    requests: Vec<Request>,
    /// `(request offset, desired footnote id)`
    footnotes: Vec<(usize, String)>,
    /// Ids of base named ranges to delete up front
    stale_ranges: Vec<String>,
    unsupported: Vec<UnsupportedKind>,
}

impl SegmentPlan {
    fn skipped(unsupported: Vec<UnsupportedKind>) -> Self {
        Self {
            unsupported,
            ..Self::default()
        }
    }
}

fn plan_segment(task: &Task<'_>, options: &ReconcileOptions) -> Result<SegmentPlan> {
    let empty = index_segment(Segment::new())?;
    let base = task.base.unwrap_or(&empty);
    if base == task.desired {
        let (stale, creates) = reconcile_ranges(&task.base_ranges, &task.desired_ranges);
        if stale.is_empty() && creates.is_empty() {
            return Ok(SegmentPlan::default());
        }
    }

    let scope = Scope {
        segment: task.kind(),
        in_table: false,
        max_cells: options.max_lcs_cells,
    };
    let mut edits = Edits::default();
    diff_container(&mut edits, &base.content, 1, &task.desired.content, scope)?;
    if !edits.unsupported.is_empty() {
        return Ok(SegmentPlan::skipped(edits.unsupported));
    }

    let mut sim = Simulator::new(base, &task.key, &task.base_ranges);
    sim.apply(&edits.requests, "content")?;
    if !same_content(sim.content()?, &task.desired.content) {
        return Err(Error::Reconcile(format!(
            "content edits do not reproduce the desired {} of tab {}",
            task.key, task.tab_name
        )));
    }

    let styles = style_requests(sim.content()?, &task.desired.content);
    sim.apply(&styles, "style")?;

    let mut unsupported = Vec::new();
    let bullets = bullet_requests(
        sim.content()?,
        &task.desired.content,
        task.lists,
        &mut unsupported,
    );
    if !unsupported.is_empty() {
        return Ok(SegmentPlan::skipped(unsupported));
    }
    sim.apply(&bullets, "list")?;

    let merges = merge_pass(sim.content()?, &task.desired.content);
    sim.apply(&merges, "merge")?;

    let current: Vec<&NamedRange> = sim.tab()?.named_ranges.iter().collect();
    let (stale_ranges, creates) = reconcile_ranges(&current, &task.desired_ranges);
    sim.apply(&creates, "named range")?;

    log::debug!(
        "{} of tab {}: {} content, {} style, {} list, {} merge, {} range requests",
        task.key,
        task.tab_name,
        edits.requests.len(),
        styles.len(),
        bullets.len(),
        merges.len(),
        creates.len() + stale_ranges.len()
    );
    let mut requests = edits.requests;
    requests.extend(styles);
    requests.extend(bullets);
    requests.extend(merges);
    requests.extend(creates);
    Ok(SegmentPlan {
        requests,
        footnotes: edits.footnotes,
        stale_ranges,
        unsupported,
    })
}

fn run(tasks: &[Task<'_>], options: &ReconcileOptions) -> Result<Vec<SegmentPlan>> {
    if options.parallel && tasks.len() > 1 {
        tasks
            .par_iter()
            .map(|task| plan_segment(task, options))
            .collect()
    } else {
        tasks.iter().map(|task| plan_segment(task, options)).collect()
    }
}

fn ranges_in<'a>(tab: &'a Tab, segment_id: Option<&str>) -> Vec<&'a NamedRange> {
    tab.named_ranges
        .iter()
        .filter(|r| r.segment_id.as_deref().filter(|s| !s.is_empty()) == segment_id)
        .collect()
}

fn footnote_refs(content: &[StructuralElement], out: &mut BTreeSet<String>) {
    for element in content {
        match &element.block {
            Block::Paragraph(p) => {
                for e in &p.elements {
                    if let InlineContent::FootnoteReference(r) = &e.content {
                        out.insert(r.footnote_id.clone());
                    }
                }
            }
            Block::Table(table) => {
                for cell in table.table_rows.iter().flat_map(|r| &r.table_cells) {
                    footnote_refs(&cell.content, out);
                }
            }
            _ => {}
        }
    }
}

fn header_request(footer: bool, kind: crate::model::HeaderFooterKind, tab: Id) -> Request {
    let create = CreateHeaderFooter {
        kind,
        section_break_location: Some(Location::new(0).in_tab(tab)),
    };
    if footer {
        Request::CreateFooter(create)
    } else {
        Request::CreateHeader(create)
    }
}

/// Plan the full reconciliation of two indexed documents.
pub(super) fn plan_document(
    base: &Document,
    desired: &Document,
    options: &ReconcileOptions,
) -> Result<Reconciliation> {
    let mut unsupported = Vec::new();
    let mut batch_a: Vec<Request> = Vec::new();

    if base.title != desired.title {
        log::debug!("document title change is not synced");
    }
    for comment in &desired.comments {
        if comment.comment_id.is_none() {
            unsupported.push(Unsupported {
                kind: UnsupportedKind::CommentCreation,
                tab_id: None,
                segment: None,
            });
        }
    }
    for comment in &base.comments {
        let Some(id) = &comment.comment_id else {
            continue;
        };
        if !desired
            .comments
            .iter()
            .any(|c| c.comment_id.as_ref() == Some(id))
        {
            unsupported.push(Unsupported {
                kind: UnsupportedKind::CommentDeletion,
                tab_id: None,
                segment: None,
            });
        }
    }

    // Tabs
    let retained_base: Vec<&str> = base
        .tabs
        .iter()
        .map(|t| t.tab_id.as_str())
        .filter(|id| desired.tab(id).is_some())
        .collect();
    let retained_desired: Vec<&str> = desired
        .tabs
        .iter()
        .map(|t| t.tab_id.as_str())
        .filter(|id| base.tab(id).is_some())
        .collect();
    if retained_base != retained_desired {
        unsupported.push(Unsupported {
            kind: UnsupportedKind::TabReorder,
            tab_id: None,
            segment: None,
        });
    }

    let mut order: Vec<&str> = base.tabs.iter().map(|t| t.tab_id.as_str()).collect();
    let mut new_tabs: BTreeMap<&str, Id> = BTreeMap::new();
    for (d, tab) in desired.tabs.iter().enumerate() {
        if base.tab(&tab.tab_id).is_some() {
            continue;
        }
        let position = match d {
            0 => 0,
            _ => order
                .iter()
                .position(|id| *id == desired.tabs[d - 1].tab_id)
                .map_or(order.len(), |p| p + 1),
        };
        order.insert(position, &tab.tab_id);
        batch_a.push(Request::AddDocumentTab(AddDocumentTab {
            tab_properties: TabProperties {
                tab_id: None,
                title: Some(tab.title.clone()),
                index: Some(position as u32),
            },
        }));
        new_tabs.insert(&tab.tab_id, DeferredRef::new(0, batch_a.len() - 1).into());
    }
    for tab in &base.tabs {
        if desired.tab(&tab.tab_id).is_none() {
            batch_a.push(Request::DeleteTab(DeleteTab {
                tab_id: Id::from(tab.tab_id.as_str()),
            }));
        }
    }

    let mut first: Vec<Task<'_>> = Vec::new();
    let mut later: Vec<Task<'_>> = Vec::new();
    let mut new_tab_segments: Vec<Request> = Vec::new();

    for tab in &desired.tabs {
        let name = tab.tab_id.as_str();

        let Some(old) = base.tab(name) else {
            let tab_id = new_tabs
                .get(name)
                .cloned()
                .ok_or_else(|| Error::Reconcile(format!("tab {} was never created", name)))?;
            first.push(Task {
                desired_ranges: ranges_in(tab, None),
                ..Task::body(tab, Slot::Fixed(None), tab_id.clone())
            });
            for (footer, map) in [(false, &tab.headers), (true, &tab.footers)] {
                for (kind, header) in map {
                    new_tab_segments.push(header_request(footer, *kind, tab_id.clone()));
                    let key = if footer {
                        SegmentKey::Footer(*kind)
                    } else {
                        SegmentKey::Header(*kind)
                    };
                    later.push(Task {
                        key,
                        desired: &header.segment,
                        desired_ranges: ranges_in(tab, Some(header.id.as_str())),
                        ..Task::body(
                            tab,
                            Slot::NewTabSegment(new_tab_segments.len() - 1),
                            tab_id.clone(),
                        )
                    });
                }
            }
            continue;
        };

        let tab_id = Id::from(name);
        if old.title != tab.title {
            batch_a.push(Request::UpdateDocumentTabProperties(UpdateDocumentTabProperties {
                tab_properties: TabProperties {
                    tab_id: Some(tab_id.clone()),
                    title: Some(tab.title.clone()),
                    index: None,
                },
                fields: "title".to_string(),
            }));
        }

        first.push(Task {
            base: Some(&old.body),
            base_ranges: ranges_in(old, None),
            desired_ranges: ranges_in(tab, None),
            ..Task::body(tab, Slot::Fixed(None), tab_id.clone())
        });

        for (footer, old_map, map) in [
            (false, &old.headers, &tab.headers),
            (true, &old.footers, &tab.footers),
        ] {
            for (kind, header) in old_map {
                if map.contains_key(kind) {
                    continue;
                }
                let id = Id::from(header.id.as_str());
                batch_a.push(if footer {
                    Request::DeleteFooter(DeleteFooter {
                        footer_id: id,
                        tab_id: Some(tab_id.clone()),
                    })
                } else {
                    Request::DeleteHeader(DeleteHeader {
                        header_id: id,
                        tab_id: Some(tab_id.clone()),
                    })
                });
            }
            for (kind, header) in map {
                let key = if footer {
                    SegmentKey::Footer(*kind)
                } else {
                    SegmentKey::Header(*kind)
                };
                let desired_ranges = ranges_in(tab, Some(header.id.as_str()));
                match old_map.get(kind) {
                    Some(existing) => first.push(Task {
                        key,
                        base: Some(&existing.segment),
                        desired: &header.segment,
                        base_ranges: ranges_in(old, Some(existing.id.as_str())),
                        desired_ranges,
                        ..Task::body(
                            tab,
                            Slot::Fixed(Some(Id::from(existing.id.as_str()))),
                            tab_id.clone(),
                        )
                    }),
                    None => {
                        batch_a.push(header_request(footer, *kind, tab_id.clone()));
                        later.push(Task {
                            key,
                            desired: &header.segment,
                            desired_ranges,
                            ..Task::body(tab, Slot::InA(batch_a.len() - 1), tab_id.clone())
                        });
                    }
                }
            }
        }
    }

    let first_plans = run(&first, options)?;

    // Footnotes: matched ones are edited in place, created ones are filled
    // after their reference exists.
    let mut created: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (p, plan) in first_plans.iter().enumerate() {
        let task = &first[p];
        if task.key != SegmentKey::Body {
            continue;
        }
        let Some(tab) = desired.tab(task.tab_name) else {
            continue;
        };
        for (offset, footnote_id) in &plan.footnotes {
            let Some(segment) = tab.footnotes.get(footnote_id) else {
                continue;
            };
            created
                .entry(task.tab_name)
                .or_default()
                .insert(footnote_id.as_str());
            later.push(Task {
                tab_name: task.tab_name,
                tab: task.tab.clone(),
                slot: Slot::Footnote {
                    plan: p,
                    offset: *offset,
                },
                key: SegmentKey::Footnote(footnote_id.clone()),
                base: None,
                desired: segment,
                lists: &tab.lists,
                base_ranges: Vec::new(),
                desired_ranges: ranges_in(tab, Some(footnote_id.as_str())),
            });
        }
    }
    let mut matched_footnotes: Vec<Task<'_>> = Vec::new();
    for tab in &desired.tabs {
        let Some(old) = base.tab(&tab.tab_id) else {
            continue;
        };
        let mut referenced = BTreeSet::new();
        footnote_refs(&tab.body.content, &mut referenced);
        let recreated = created.get(tab.tab_id.as_str());
        for (id, segment) in &tab.footnotes {
            let Some(existing) = old.footnotes.get(id) else {
                continue;
            };
            if !referenced.contains(id) || recreated.map_or(false, |r| r.contains(id.as_str())) {
                continue;
            }
            matched_footnotes.push(Task {
                tab_name: &tab.tab_id,
                tab: Id::from(tab.tab_id.as_str()),
                slot: Slot::Fixed(Some(Id::from(id.as_str()))),
                key: SegmentKey::Footnote(id.clone()),
                base: Some(existing),
                desired: segment,
                lists: &tab.lists,
                base_ranges: ranges_in(old, Some(id.as_str())),
                desired_ranges: ranges_in(tab, Some(id.as_str())),
            });
        }
    }
    let footnote_plans = run(&matched_footnotes, options)?;
    let later_plans = run(&later, options)?;

    // Assembly
    let mut report = |task: &Task<'_>, plan: &SegmentPlan| {
        for kind in &plan.unsupported {
            unsupported.push(Unsupported {
                kind: kind.clone(),
                tab_id: Some(task.tab_name.to_string()),
                segment: Some(task.key.to_string()),
            });
        }
    };
    let mut batch_b: Vec<Request> = Vec::new();
    let planned = first.iter().zip(&first_plans);
    for (task, plan) in planned.chain(matched_footnotes.iter().zip(&footnote_plans)) {
        report(task, plan);
        for id in &plan.stale_ranges {
            batch_b.push(Request::DeleteNamedRange(DeleteNamedRange {
                named_range_id: Some(Id::from(id.as_str())),
                name: None,
                tab_id: Some(task.tab.clone()),
            }));
        }
    }
    let mut plan_starts = Vec::with_capacity(first.len());
    for (task, plan) in first.iter().zip(&first_plans) {
        plan_starts.push(batch_b.len());
        let segment = fixed_slot(&task.slot)?;
        extend_targeted(&mut batch_b, &plan.requests, &task.tab, segment.as_ref());
    }
    let new_tab_start = batch_b.len();
    batch_b.extend(new_tab_segments);
    for (task, plan) in matched_footnotes.iter().zip(&footnote_plans) {
        let segment = fixed_slot(&task.slot)?;
        extend_targeted(&mut batch_b, &plan.requests, &task.tab, segment.as_ref());
    }

    let mut batch_c: Vec<Request> = Vec::new();
    for (task, plan) in later.iter().zip(&later_plans) {
        report(task, plan);
        let segment = match task.slot {
            Slot::NewTabSegment(n) => Some(DeferredRef::new(1, new_tab_start + n).into()),
            Slot::Footnote { plan: p, offset } => {
                let start = plan_starts.get(p).copied().ok_or_else(|| {
                    Error::Reconcile("footnote created by an unknown plan".to_string())
                })?;
                Some(DeferredRef::new(1, start + offset).into())
            }
            ref slot => fixed_slot(slot)?,
        };
        extend_targeted(&mut batch_c, &plan.requests, &task.tab, segment.as_ref());
    }

    let batches = remap_batches(vec![
        Batch::new(batch_a),
        Batch::new(batch_b),
        Batch::new(batch_c),
    ]);
    Ok(Reconciliation {
        batches,
        unsupported,
    })
}

fn fixed_slot(slot: &Slot) -> Result<Option<Id>> {
    match slot {
        Slot::Fixed(id) => Ok(id.clone()),
        Slot::InA(k) => Ok(Some(DeferredRef::new(0, *k).into())),
        _ => Err(Error::Reconcile(
            "segment created in the content batch used too early".to_string(),
        )),
    }
}

fn extend_targeted(batch: &mut Vec<Request>, requests: &[Request], tab: &Id, segment: Option<&Id>) {
    batch.extend(requests.iter().cloned().map(|mut r| {
        r.retarget(Some(tab), segment);
        r
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulator_targets_header() {
        let base = Segment::from_paragraphs(["Top\n"]);
        let key = SegmentKey::Header(crate::model::HeaderFooterKind::Default);
        let mut sim = Simulator::new(&base, &key, &[]);
        let insert = Request::InsertText(InsertText {
            text: "!".to_string(),
            location: Location::new(4),
        });
        sim.apply(&[insert], "content").unwrap();
        let text: String = crate::model::content_text(sim.content().unwrap());
        assert_eq!(text, "Top!\n");
    }

    #[test]
    fn test_footnote_refs() {
        let mut p = crate::model::Paragraph::with_text("a\n");
        p.add_inline(InlineContent::FootnoteReference(crate::model::FootnoteReference {
            footnote_id: "kix.fn1".to_string(),
        }));
        let content = vec![StructuralElement::paragraph(p)];
        let mut refs = BTreeSet::new();
        footnote_refs(&content, &mut refs);
        assert!(refs.contains("kix.fn1"));
    }

    #[test]
    fn test_new_tab_body_targets_created_tab() {
        let base = Document::with_body("d", Segment::from_paragraphs(["a\n"]));
        let mut desired = base.clone();
        let mut tab = Tab::new("t.new", "Notes");
        tab.body = Segment::from_paragraphs(["x\n"]);
        desired.tabs.push(tab);
        let base = crate::indexer::index(base).unwrap();
        let desired = crate::indexer::index(desired).unwrap();

        let plan = plan_document(&base, &desired, &ReconcileOptions::new().sequential()).unwrap();
        assert_eq!(plan.batches.len(), 2);
        assert_eq!(
            plan.batches[0].requests,
            vec![Request::AddDocumentTab(AddDocumentTab {
                tab_properties: TabProperties {
                    tab_id: None,
                    title: Some("Notes".to_string()),
                    index: Some(1),
                },
            })]
        );
        let Request::InsertText(insert) = &plan.batches[1].requests[0] else {
            panic!("expected insertText");
        };
        assert_eq!(insert.text, "x");
        assert_eq!(
            insert.location.tab_id,
            Some(Id::Deferred(DeferredRef::new(0, 0)))
        );
    }

    #[test]
    fn test_identical_documents_plan_nothing() {
        let doc = Document::with_body("d", Segment::from_paragraphs(["a\n", "b\n"]));
        let doc = crate::indexer::index(doc).unwrap();
        let plan = plan_document(&doc, &doc, &ReconcileOptions::new()).unwrap();
        assert!(plan.is_empty());
        assert!(plan.unsupported.is_empty());
    }
}
