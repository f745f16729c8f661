//! Figure and table location.
//!
//! Collects every figure/table node, resolves captions and page
//! coordinates through the document's facsimile zones, normalizes
//! labels, synthesizes tables that are only referenced in running text,
//! and deduplicates the result.

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;

use crate::tree::{NodeId, Tei};
use crate::util::norm_ws;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Figure,
    Table,
}

/// One located figure or table.
#[derive(Debug, Clone, Serialize)]
pub struct MediaItem {
    pub kind: MediaKind,
    /// Normalized label ("Figure 1", "Table 2"), when recoverable.
    pub label: Option<String>,
    pub caption: Option<String>,
    /// 1-based page index; defaults to 1 when no zone resolves.
    pub page: u32,
    /// Page-point bounding box `[x_min, y_min, x_max, y_max]`.
    pub bbox: Option<[f64; 4]>,
    /// Which step produced this item. Diagnostics only.
    pub provenance: &'static str,
}

lazy_static! {
    /// "Figure 1", "Fig. 2a", "Table III" inside head or caption text.
    static ref LABEL_TOKEN: Regex =
        Regex::new(r"(?i)\b(fig(?:ure)?\.?|table)\s*([0-9]+[a-z]?|[ivxlc]+)\b").unwrap();
    /// Paragraphs that open like a caption: "Table 2. Description…"
    static ref TABLE_PARAGRAPH: Regex =
        Regex::new(r"(?is)^table\s+([a-z0-9]+)\s*[:.\-]\s*(.+)").unwrap();
}

/// Locate all media items in a document.
pub fn locate(doc: &Tei) -> Vec<MediaItem> {
    let zones = build_zone_index(doc);
    let scope = doc.first_named(NodeId::ROOT, "text").unwrap_or(NodeId::ROOT);
    let mut items: Vec<MediaItem> = Vec::new();

    for fig in doc.descendants_named(scope, "figure") {
        // Table-typed figure elements belong in the table collection
        let kind = if doc.attr(fig, "type") == Some("table") {
            MediaKind::Table
        } else {
            MediaKind::Figure
        };
        items.push(media_from_node(doc, fig, kind, &zones, "tei"));
    }
    for tab in doc.descendants_named(scope, "table") {
        // Skip tables nested inside figure elements; the wrapper
        // already produced an item
        if doc.ancestor_named(tab, "figure").is_some() {
            continue;
        }
        items.push(media_from_node(doc, tab, MediaKind::Table, &zones, "tei"));
    }

    synthesize_referenced_tables(doc, scope, &mut items);

    dedupe(items)
}

// ============================================================================
// Node harvesting
// ============================================================================

fn media_from_node(
    doc: &Tei,
    node: NodeId,
    kind: MediaKind,
    zones: &HashMap<String, (u32, [f64; 4])>,
    provenance: &'static str,
) -> MediaItem {
    let head_text = doc.child_named(node, "head").map(|h| doc.text(h));
    let desc_text = doc
        .first_named(node, "figDesc")
        .map(|d| doc.text(d))
        .filter(|t| !t.is_empty());

    // A head that is nothing but the label ("Figure 1") is not a caption
    let head_caption = head_text.clone().filter(|t| {
        let residual = LABEL_TOKEN.replace(t, "");
        !residual.trim().trim_matches(['.', ':', '-']).trim().is_empty()
    });
    let caption = desc_text.clone().or(head_caption);
    let label = normalize_label(doc, node, kind, head_text.as_deref(), caption.as_deref());

    let (page, bbox) = resolve_coords(doc, node, zones);

    MediaItem { kind, label, caption, page: page.unwrap_or(1), bbox, provenance }
}

/// Derive the normalized label.
///
/// Pattern matches on head text, then caption text, are preferred over
/// the raw label attribute: the service is known to concatenate
/// adjacent running-header digits into the attribute (a figure labeled
/// "51" whose head reads "Figure 1" is really Figure 1).
fn normalize_label(
    doc: &Tei,
    node: NodeId,
    kind: MediaKind,
    head: Option<&str>,
    caption: Option<&str>,
) -> Option<String> {
    for text in [head, caption].into_iter().flatten() {
        if let Some(cap) = LABEL_TOKEN.captures(text) {
            let number = &cap[2];
            let word = match kind {
                MediaKind::Figure => "Figure",
                MediaKind::Table => "Table",
            };
            return Some(format!("{word} {number}"));
        }
    }
    // Raw attribute or label child as last resort
    let raw = doc
        .attr(node, "n")
        .map(str::to_string)
        .or_else(|| doc.first_named(node, "label").map(|l| doc.text(l)))
        .filter(|s| !s.is_empty())?;
    Some(raw)
}

// ============================================================================
// Coordinates
// ============================================================================

/// Map `#zone-id` to (page, box) from `facsimile/surface/zone` data.
fn build_zone_index(doc: &Tei) -> HashMap<String, (u32, [f64; 4])> {
    let mut index = HashMap::new();
    for surface in doc.descendants_named(NodeId::ROOT, "surface") {
        let Some(page) = doc.attr(surface, "n").and_then(|n| n.parse::<u32>().ok()) else {
            continue;
        };
        for zone in doc.children_named(surface, "zone") {
            let Some(id) = doc.attr(zone, "id") else {
                continue;
            };
            let corners = ["ulx", "uly", "lrx", "lry"]
                .map(|key| doc.attr(zone, key).and_then(|v| v.parse::<f64>().ok()));
            if let [Some(ulx), Some(uly), Some(lrx), Some(lry)] = corners {
                index.insert(format!("#{id}"), (page, [ulx, uly, lrx, lry]));
            }
        }
    }
    index
}

fn resolve_coords(
    doc: &Tei,
    node: NodeId,
    zones: &HashMap<String, (u32, [f64; 4])>,
) -> (Option<u32>, Option<[f64; 4]>) {
    if let Some(facs) = doc.attr(node, "facs")
        && let Some(first) = facs.split_whitespace().next()
        && let Some(&(page, bbox)) = zones.get(first)
    {
        return (Some(page), Some(bbox));
    }
    if let Some(coords) = doc.attr(node, "coords") {
        return parse_coords(coords);
    }
    (None, None)
}

/// Parse an inline coordinate string.
///
/// Five numbers are the service's `page,x,y,w,h` form. Four numbers are
/// corners `x1,y1,x2,y2` when the second corner is strictly beyond the
/// first, or `x,y,w,h` with positive extents otherwise; anything else
/// is ambiguous and yields no box rather than a guess.
pub(crate) fn parse_coords(s: &str) -> (Option<u32>, Option<[f64; 4]>) {
    let nums: Vec<f64> = s
        .split(|c: char| c == ',' || c.is_whitespace() || c == ';')
        .filter(|part| !part.is_empty())
        .map_while(|part| part.parse::<f64>().ok())
        .collect();

    match nums.len() {
        5 => {
            let page = (nums[0].fract() == 0.0 && nums[0] >= 1.0).then(|| nums[0] as u32);
            let (x, y, w, h) = (nums[1], nums[2], nums[3], nums[4]);
            if w > 0.0 && h > 0.0 {
                (page, Some([x, y, x + w, y + h]))
            } else {
                debug!("ambiguous coords {s:?}: non-positive extent");
                (page, None)
            }
        }
        4 => {
            let (a, b, c, d) = (nums[0], nums[1], nums[2], nums[3]);
            if c > a && d > b {
                (None, Some([a, b, c, d]))
            } else if c > 0.0 && d > 0.0 {
                // Second pair cannot be a corner; read it as width/height
                (None, Some([a, b, a + c, b + d]))
            } else {
                debug!("ambiguous coords {s:?}");
                (None, None)
            }
        }
        _ => {
            debug!("ambiguous coords {s:?}: expected 4 or 5 numbers");
            (None, None)
        }
    }
}

// ============================================================================
// Synthesis from running text
// ============================================================================

/// Some journals never emit a table node; recover "Table N" from
/// explicit cross-references and caption-like paragraphs, but only for
/// labels not already present.
fn synthesize_referenced_tables(doc: &Tei, scope: NodeId, items: &mut Vec<MediaItem>) {
    let mut existing: Vec<String> = items
        .iter()
        .filter_map(|item| item.label.as_ref().map(|l| l.to_lowercase()))
        .collect();

    // A) <ref type="table">1</ref> markers
    for r in doc.descendants_named(scope, "ref") {
        if doc.attr(r, "type") != Some("table") {
            continue;
        }
        let number = doc.text(r);
        if number.is_empty() {
            continue;
        }
        let label = format!("Table {number}");
        if existing.contains(&label.to_lowercase()) {
            continue;
        }
        let caption = doc.ancestor_named(r, "p").and_then(|p| {
            let text = doc.text(p);
            caption_after_label(&text, &number)
        });
        existing.push(label.to_lowercase());
        items.push(MediaItem {
            kind: MediaKind::Table,
            label: Some(label),
            caption,
            page: 1,
            bbox: None,
            provenance: "tei-ref",
        });
    }

    // B) paragraphs that read like a caption: "Table 2. …"
    for p in doc.descendants_named(scope, "p") {
        let text = doc.text(p);
        let Some(cap) = TABLE_PARAGRAPH.captures(&text) else {
            continue;
        };
        let label = format!("Table {}", &cap[1]);
        if existing.contains(&label.to_lowercase()) {
            continue;
        }
        existing.push(label.to_lowercase());
        items.push(MediaItem {
            kind: MediaKind::Table,
            label: Some(label),
            caption: Some(norm_ws(&cap[2])),
            page: 1,
            bbox: None,
            provenance: "tei-text",
        });
    }
}

/// Strip the "Table N" prefix from a referencing paragraph to get a
/// usable caption.
fn caption_after_label(text: &str, number: &str) -> Option<String> {
    let tail = Regex::new(&format!(
        r"(?i)\btable\s*{}\s*[:.\-]\s*(.+)",
        regex::escape(number)
    ))
    .ok()?;
    if let Some(cap) = tail.captures(text) {
        return Some(norm_ws(&cap[1])).filter(|s| !s.is_empty());
    }
    let bare = Regex::new(&format!(r"(?i)\btable\s*{}\b", regex::escape(number))).ok()?;
    Some(norm_ws(&bare.replace_all(text, ""))).filter(|s| !s.is_empty())
}

// ============================================================================
// Deduplication
// ============================================================================

/// First-seen wins; later matches only backfill missing fields.
///
/// Identity is checked in priority order: caption (case-insensitive),
/// normalized label (case-insensitive), then spatial identity
/// (page + box).
fn dedupe(items: Vec<MediaItem>) -> Vec<MediaItem> {
    let mut out: Vec<MediaItem> = Vec::new();

    for item in items {
        let existing = out.iter_mut().find(|kept| same_item(kept, &item));
        match existing {
            Some(kept) => {
                if kept.label.is_none() {
                    kept.label = item.label;
                }
                if kept.caption.is_none() {
                    kept.caption = item.caption;
                }
                if kept.bbox.is_none() {
                    kept.bbox = item.bbox;
                    if item.page != 1 || kept.page == 1 {
                        kept.page = item.page;
                    }
                }
            }
            None => out.push(item),
        }
    }
    out
}

fn same_item(a: &MediaItem, b: &MediaItem) -> bool {
    if a.kind != b.kind {
        return false;
    }
    if let (Some(x), Some(y)) = (&a.label, &b.label)
        && x.eq_ignore_ascii_case(y)
    {
        return true;
    }
    if let (Some(x), Some(y)) = (&a.caption, &b.caption)
        && x.eq_ignore_ascii_case(y)
    {
        return true;
    }
    if let (Some(x), Some(y)) = (a.bbox, b.bbox)
        && a.page == b.page
        && x == y
    {
        return true;
    }
    false
}
