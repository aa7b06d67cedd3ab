//! Structure-of-arrays widget arena.
//!
//! Every property group lives in its own array indexed by the widget slot.
//! Freed slots go on a free list and are reused with a bumped generation.

use std::rc::Rc;

use crate::builder::Builder;
use crate::id::WidgetId;
use crate::input::InputHandlers;
use crate::layout::{PositionSpec, SizeSpec};
use crate::math::{Dimensions, Vector2};
use crate::paint::{AntiAliasing, Paint, Rounding, SecondColor, Stroke};
use crate::text::TextPayload;

/// User code that replaces one generic pass for a single widget.
pub type CustomPass = Rc<dyn Fn(&mut Builder, WidgetId)>;

/// Per-widget overrides of the size, position and draw passes.
#[derive(Clone, Default)]
pub struct CustomPasses {
    pub size: Option<CustomPass>,
    pub position: Option<CustomPass>,
    pub draw: Option<CustomPass>,
}

impl std::fmt::Debug for CustomPasses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomPasses")
            .field("size", &self.size.is_some())
            .field("position", &self.position.is_some())
            .field("draw", &self.draw.is_some())
            .finish()
    }
}

/// One entry of the cached depth-first order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthFirstEntry {
    pub widget: WidgetId,
    pub depth: u32,
    /// Number of descendants, i.e. how many entries follow that belong to this subtree.
    pub owned_children: u32,
}

pub(crate) struct WidgetStore {
    head: u32,
    free: Vec<u32>,
    generations: Vec<u32>,
    alive: Vec<bool>,

    pub parents: Vec<Option<WidgetId>>,
    pub children: Vec<Vec<WidgetId>>,
    pub size_specs: Vec<SizeSpec>,
    pub position_specs: Vec<PositionSpec>,
    pub sizes: Vec<Dimensions>,
    pub positions: Vec<Vector2>,
    pub paints: Vec<Paint>,
    pub strokes: Vec<Option<Stroke>>,
    pub roundings: Vec<Option<Rounding>>,
    pub anti_aliasing: Vec<Option<AntiAliasing>>,
    pub second_colors: Vec<Option<SecondColor>>,
    pub texts: Vec<Option<TextPayload>>,
    pub passes: Vec<CustomPasses>,
    pub handlers: Vec<InputHandlers>,
    pub hovered: Vec<bool>,

    pub depth_first: Vec<DepthFirstEntry>,
    /// Index into `depth_first` per slot, `None` for widgets not attached under the root.
    pub depth_first_position: Vec<Option<u32>>,
}

impl WidgetStore {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "widget capacity must be at least 1");
        let mut store = Self {
            head: 0,
            free: Vec::new(),
            generations: vec![0; capacity],
            alive: vec![false; capacity],
            parents: vec![None; capacity],
            children: vec![Vec::new(); capacity],
            size_specs: vec![SizeSpec::default(); capacity],
            position_specs: vec![PositionSpec::default(); capacity],
            sizes: vec![Dimensions::default(); capacity],
            positions: vec![Vector2::default(); capacity],
            paints: vec![Paint::default(); capacity],
            strokes: vec![None; capacity],
            roundings: vec![None; capacity],
            anti_aliasing: vec![None; capacity],
            second_colors: vec![None; capacity],
            texts: vec![None; capacity],
            passes: vec![CustomPasses::default(); capacity],
            handlers: vec![InputHandlers::default(); capacity],
            hovered: vec![false; capacity],
            depth_first: Vec::with_capacity(capacity),
            depth_first_position: vec![None; capacity],
        };
        let root = store.allocate();
        debug_assert_eq!(root, WidgetId::ROOT);
        store.rebuild_hierarchy();
        store
    }

    pub fn capacity(&self) -> usize {
        self.alive.len()
    }

    pub fn live_count(&self) -> usize {
        self.head as usize - self.free.len()
    }

    pub fn allocate(&mut self) -> WidgetId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                assert!(
                    (self.head as usize) < self.capacity(),
                    "widget capacity ({}) exhausted",
                    self.capacity()
                );
                self.head += 1;
                self.head - 1
            }
        };
        self.alive[index as usize] = true;
        WidgetId::new(index, self.generations[index as usize])
    }

    #[inline]
    pub fn is_valid(&self, id: WidgetId) -> bool {
        let index = id.index();
        index < self.capacity() && self.alive[index] && self.generations[index] == id.generation
    }

    /// Slot of a live widget. Stale handles are a programming error.
    #[inline]
    pub fn slot(&self, id: WidgetId) -> usize {
        assert!(self.is_valid(id), "stale widget id {id:?}");
        id.index()
    }

    /// `true` when `ancestor` is `widget` or one of its parents.
    pub fn is_ancestor(&self, ancestor: WidgetId, widget: WidgetId) -> bool {
        let mut current = Some(widget);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parents[id.index()];
        }
        false
    }

    pub fn attach(&mut self, parent: WidgetId, child: WidgetId) {
        if let Some(old) = self.parents[child.index()] {
            self.children[old.index()].retain(|c| *c != child);
        }
        self.parents[child.index()] = Some(parent);
        self.children[parent.index()].push(child);
    }

    /// Returns `false` when `child` is not a child of `parent`.
    pub fn detach(&mut self, parent: WidgetId, child: WidgetId) -> bool {
        let children = &mut self.children[parent.index()];
        let Some(at) = children.iter().position(|c| *c == child) else {
            return false;
        };
        children.remove(at);
        self.parents[child.index()] = None;
        true
    }

    /// Detaches `id` from its parent and frees it with all descendants.
    /// Returns the freed handles, `id` first.
    pub fn free_subtree(&mut self, id: WidgetId) -> Vec<WidgetId> {
        if let Some(parent) = self.parents[id.index()] {
            self.detach(parent, id);
        }
        let mut freed = Vec::new();
        let mut stack = vec![id];
        while let Some(widget) = stack.pop() {
            freed.push(widget);
            let index = widget.index();
            stack.extend(self.children[index].iter().rev().copied());
            self.reset_slot(index);
        }
        freed
    }

    /// Frees every widget except the root, attached or not.
    pub fn clear(&mut self) {
        self.children[0].clear();
        for index in 1..self.head as usize {
            if self.alive[index] {
                self.reset_slot(index);
            }
        }
        self.rebuild_hierarchy();
    }

    fn reset_slot(&mut self, index: usize) {
        self.alive[index] = false;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.parents[index] = None;
        self.children[index].clear();
        self.size_specs[index] = SizeSpec::default();
        self.position_specs[index] = PositionSpec::default();
        self.sizes[index] = Dimensions::default();
        self.positions[index] = Vector2::default();
        self.paints[index] = Paint::default();
        self.strokes[index] = None;
        self.roundings[index] = None;
        self.anti_aliasing[index] = None;
        self.second_colors[index] = None;
        self.texts[index] = None;
        self.passes[index] = CustomPasses::default();
        self.handlers[index] = InputHandlers::default();
        self.hovered[index] = false;
        self.free.push(index as u32);
    }

    /// Recomputes the depth-first order from the root, with depths and owned child counts.
    pub fn rebuild_hierarchy(&mut self) {
        self.depth_first.clear();
        self.depth_first_position.fill(None);

        let mut stack = vec![(WidgetId::ROOT, 0u32)];
        while let Some((widget, depth)) = stack.pop() {
            self.depth_first_position[widget.index()] = Some(self.depth_first.len() as u32);
            self.depth_first.push(DepthFirstEntry {
                widget,
                depth,
                owned_children: 0,
            });
            stack.extend(
                self.children[widget.index()]
                    .iter()
                    .rev()
                    .map(|child| (*child, depth + 1)),
            );
        }

        // Descendants always follow their ancestors, so one reverse sweep sums subtree sizes.
        for i in (1..self.depth_first.len()).rev() {
            let entry = self.depth_first[i];
            let parent = self.parents[entry.widget.index()]
                .and_then(|p| self.depth_first_position[p.index()]);
            if let Some(parent) = parent {
                self.depth_first[parent as usize].owned_children += entry.owned_children + 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> WidgetStore {
        WidgetStore::new(16)
    }

    #[test]
    fn root_exists_without_parent() {
        let store = store();
        assert!(store.is_valid(WidgetId::ROOT));
        assert_eq!(store.parents[0], None);
        assert_eq!(store.depth_first.len(), 1);
    }

    #[test]
    fn fresh_widget_is_detached() {
        let mut store = store();
        let id = store.allocate();
        assert!(store.is_valid(id));
        assert_eq!(store.parents[id.index()], None);
        assert!(store.children[id.index()].is_empty());
    }

    #[test]
    fn freeing_invalidates_subtree_and_reuses_slots() {
        let mut store = store();
        let a = store.allocate();
        let b = store.allocate();
        store.attach(WidgetId::ROOT, a);
        store.attach(a, b);

        let freed = store.free_subtree(a);
        assert_eq!(freed, vec![a, b]);
        assert!(!store.is_valid(a));
        assert!(!store.is_valid(b));
        assert!(store.children[0].is_empty());

        let c = store.allocate();
        assert!(c.index() == a.index() || c.index() == b.index());
        assert_ne!(c.generation(), 0);
        assert!(store.is_valid(c));
    }

    #[test]
    fn depth_first_order_and_owned_counts() {
        let mut store = store();
        let a = store.allocate();
        let a1 = store.allocate();
        let a2 = store.allocate();
        let b = store.allocate();
        store.attach(WidgetId::ROOT, a);
        store.attach(a, a1);
        store.attach(a, a2);
        store.attach(WidgetId::ROOT, b);
        store.rebuild_hierarchy();

        let order: Vec<(WidgetId, u32, u32)> = store
            .depth_first
            .iter()
            .map(|e| (e.widget, e.depth, e.owned_children))
            .collect();
        assert_eq!(
            order,
            vec![
                (WidgetId::ROOT, 0, 4),
                (a, 1, 2),
                (a1, 2, 0),
                (a2, 2, 0),
                (b, 1, 0),
            ]
        );
        assert_eq!(store.depth_first_position[b.index()], Some(4));
    }

    #[test]
    fn reattaching_moves_the_child() {
        let mut store = store();
        let a = store.allocate();
        let b = store.allocate();
        let c = store.allocate();
        store.attach(WidgetId::ROOT, a);
        store.attach(WidgetId::ROOT, b);
        store.attach(a, c);
        store.attach(b, c);
        assert!(store.children[a.index()].is_empty());
        assert_eq!(store.children[b.index()], vec![c]);
        assert!(store.is_ancestor(b, c));
        assert!(!store.is_ancestor(a, c));
    }

    #[test]
    #[should_panic(expected = "widget capacity (2) exhausted")]
    fn exhausting_the_pool_is_fatal() {
        let mut store = WidgetStore::new(2);
        store.allocate();
        store.allocate();
    }
}
