//! Bounding-box index over stroke segments for eraser hit-testing.
//!
//! A packed R-tree bulk-loaded with sort-tile-recursive grouping. The index
//! only prunes: candidates must be re-checked with
//! [`crate::geometry::is_near_stroke`].

use crate::model::{EntityId, Stroke};
use kurbo::{Point, Rect};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Maximum children per node.
pub const NODE_CAPACITY: usize = 16;

/// Below this many strokes a linear scan beats building the tree.
pub const DEFAULT_INDEX_THRESHOLD: usize = 40;

#[derive(Debug, Clone)]
struct Entry {
    bounds: Rect,
    /// Position of the owning stroke in `SegmentIndex::ids`.
    stroke: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { bounds: Rect, entries: Vec<Entry> },
    Branch { bounds: Rect, children: Vec<Node> },
}

impl Node {
    fn bounds(&self) -> Rect {
        match self {
            Node::Leaf { bounds, .. } | Node::Branch { bounds, .. } => *bounds,
        }
    }
}

fn intersects(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

fn union_all(rects: impl Iterator<Item = Rect>) -> Rect {
    rects.reduce(|acc, r| acc.union(r)).unwrap_or(Rect::ZERO)
}

/// Sort-tile-recursive grouping: slice by x, then pack each slice by y.
fn str_groups<T>(mut items: Vec<T>, bounds: impl Fn(&T) -> Rect) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let leaf_count = items.len().div_ceil(NODE_CAPACITY);
    let slices = (leaf_count as f64).sqrt().ceil().max(1.0) as usize;
    let slice_len = slices * NODE_CAPACITY;

    items.sort_by(|a, b| bounds(a).center().x.total_cmp(&bounds(b).center().x));

    let mut groups = Vec::with_capacity(leaf_count);
    while !items.is_empty() {
        let rest = items.split_off(slice_len.min(items.len()));
        let mut slice = std::mem::replace(&mut items, rest);
        slice.sort_by(|a, b| bounds(a).center().y.total_cmp(&bounds(b).center().y));
        while !slice.is_empty() {
            let tail = slice.split_off(NODE_CAPACITY.min(slice.len()));
            groups.push(std::mem::replace(&mut slice, tail));
        }
    }
    groups
}

/// Immutable R-tree over every segment of a set of strokes.
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    ids: Vec<EntityId>,
    root: Option<Node>,
    segment_count: usize,
    padding: f64,
}

impl SegmentIndex {
    /// Bulk-load all segments of visible strokes, each box inflated by
    /// `padding` on every side.
    pub fn build(strokes: &[Stroke], padding: f64) -> Self {
        let visible: Vec<&Stroke> = strokes.iter().filter(|s| s.visible && !s.is_empty()).collect();
        let ids: Vec<EntityId> = visible.iter().map(|s| s.id.clone()).collect();

        let entries: Vec<Entry> = visible
            .iter()
            .enumerate()
            .flat_map(|(stroke, s)| {
                s.segments().into_iter().map(move |seg| Entry {
                    bounds: Rect::from_points(seg.p0, seg.p1).inflate(padding, padding),
                    stroke,
                })
            })
            .collect();
        let segment_count = entries.len();

        let mut level: Vec<Node> = str_groups(entries, |e| e.bounds)
            .into_iter()
            .map(|entries| Node::Leaf {
                bounds: union_all(entries.iter().map(|e| e.bounds)),
                entries,
            })
            .collect();

        while level.len() > 1 {
            level = str_groups(level, Node::bounds)
                .into_iter()
                .map(|children| Node::Branch {
                    bounds: union_all(children.iter().map(Node::bounds)),
                    children,
                })
                .collect();
        }

        log::debug!(
            "Built segment index: {} strokes, {} segments",
            ids.len(),
            segment_count
        );

        Self {
            ids,
            root: level.pop(),
            segment_count,
            padding,
        }
    }

    pub fn stroke_count(&self) -> usize {
        self.ids.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }

    /// Bounds of everything indexed, padding included.
    pub fn bounds(&self) -> Option<Rect> {
        self.root.as_ref().map(Node::bounds)
    }

    /// Ids of strokes with a padded segment box touching the square of
    /// half-size `radius` around `point`, de-duplicated in discovery order.
    pub fn query(&self, point: Point, radius: f64) -> Vec<&str> {
        let Some(root) = &self.root else {
            return Vec::new();
        };
        let radius = radius.max(0.0);
        let area = Rect::new(point.x - radius, point.y - radius, point.x + radius, point.y + radius);

        let mut seen = vec![false; self.ids.len()];
        let mut hits = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !intersects(node.bounds(), area) {
                continue;
            }
            match node {
                Node::Branch { children, .. } => stack.extend(children.iter()),
                Node::Leaf { entries, .. } => {
                    for entry in entries {
                        if !intersects(entry.bounds, area) {
                            continue;
                        }
                        if let Some(flag) = seen.get_mut(entry.stroke) {
                            if !*flag {
                                *flag = true;
                                if let Some(id) = self.ids.get(entry.stroke) {
                                    hits.push(id.as_str());
                                }
                            }
                        }
                    }
                }
            }
        }
        hits
    }
}

/// Lazily built index that tracks the stroke collection it was built from.
#[derive(Debug, Clone)]
pub struct StrokeIndexCache {
    threshold: usize,
    fingerprint: Option<u64>,
    index: Option<SegmentIndex>,
}

impl Default for StrokeIndexCache {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_THRESHOLD)
    }
}

impl StrokeIndexCache {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            fingerprint: None,
            index: None,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Return an index matching `strokes`, rebuilding if the collection or
    /// padding changed. `None` below the threshold.
    pub fn refresh(&mut self, strokes: &[Stroke], padding: f64) -> Option<&SegmentIndex> {
        if strokes.len() < self.threshold {
            self.invalidate();
            return None;
        }
        let fingerprint = Self::fingerprint(strokes, padding);
        if self.fingerprint != Some(fingerprint) || self.index.is_none() {
            self.index = Some(SegmentIndex::build(strokes, padding));
            self.fingerprint = Some(fingerprint);
        }
        self.index.as_ref()
    }

    /// The last built index, if still considered current.
    pub fn current(&self) -> Option<&SegmentIndex> {
        self.index.as_ref()
    }

    pub fn is_built(&self) -> bool {
        self.index.is_some()
    }

    pub fn invalidate(&mut self) {
        self.index = None;
        self.fingerprint = None;
    }

    // Covers everything the index is built from: a stroke replaced under
    // the same id with moved points must rebuild.
    fn fingerprint(strokes: &[Stroke], padding: f64) -> u64 {
        let mut hasher = DefaultHasher::new();
        padding.to_bits().hash(&mut hasher);
        for stroke in strokes {
            stroke.id.hash(&mut hasher);
            stroke.visible.hash(&mut hasher);
            stroke.points.len().hash(&mut hasher);
            for point in &stroke.points {
                point.x.to_bits().hash(&mut hasher);
                point.y.to_bits().hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}
