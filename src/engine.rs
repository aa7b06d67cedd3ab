//! Layout solver.
//!
//! Sizes are resolved first: a top-down walk handles absolute, relative and
//! copied axes, then a bottom-up walk sums aggregate axes and hands out
//! fill space once a parent is reached. Positions follow: a top-down walk
//! applies position specs and anchors, and a second walk places the
//! children of row and column parents.

use crate::builder::Builder;
use crate::id::WidgetId;
use crate::layout::{ChildFlow, Margins, PositionAxis, SizeAxis, SizeSpec};
use crate::math::{Dimensions, Vector2};
use crate::widget::DepthFirstEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    const BOTH: [Axis; 2] = [Axis::X, Axis::Y];

    #[inline]
    fn size_mode(self, spec: &SizeSpec) -> SizeAxis {
        match self {
            Axis::X => spec.width,
            Axis::Y => spec.height,
        }
    }

    #[inline]
    fn extent(self, size: Dimensions) -> f32 {
        match self {
            Axis::X => size.width,
            Axis::Y => size.height,
        }
    }

    #[inline]
    fn set_extent(self, size: &mut Dimensions, value: f32) {
        match self {
            Axis::X => size.width = value,
            Axis::Y => size.height = value,
        }
    }

    #[inline]
    fn component(self, v: Vector2) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    #[inline]
    fn vector(self, value: f32) -> Vector2 {
        match self {
            Axis::X => Vector2::new(value, 0.0),
            Axis::Y => Vector2::new(0.0, value),
        }
    }

    #[inline]
    fn leading_margin(self, margins: &Margins) -> f32 {
        match self {
            Axis::X => margins.left,
            Axis::Y => margins.top,
        }
    }

    #[inline]
    fn margins(self, margins: &Margins) -> f32 {
        match self {
            Axis::X => margins.horizontal(),
            Axis::Y => margins.vertical(),
        }
    }

    fn of_flow(flow: ChildFlow) -> Option<Axis> {
        match flow {
            ChildFlow::None => None,
            ChildFlow::Row => Some(Axis::X),
            ChildFlow::Column => Some(Axis::Y),
        }
    }
}

/// Fill children of one parent waiting for the parent to be reached.
struct FillGroup {
    parent: WidgetId,
    children: Vec<WidgetId>,
}

impl Builder {
    // ------------------------------------------------------------------------
    // Sizes
    // ------------------------------------------------------------------------

    pub(crate) fn calculate_sizes(&mut self) {
        self.widgets.sizes[0] = self.screen();
        let order = self.widgets.depth_first.clone();
        self.resolve_sizes(&order[1..]);
    }

    /// Resolves `entries`, a depth-first slice whose first entry's parent is already sized.
    fn resolve_sizes(&mut self, entries: &[DepthFirstEntry]) {
        for entry in entries {
            self.resolve_size_top_down(entry.widget);
        }

        let mut groups: Vec<FillGroup> = Vec::new();
        for entry in entries.iter().rev() {
            let id = entry.widget;
            if !self.widgets.is_valid(id) {
                continue;
            }
            if groups.last().is_some_and(|group| group.parent == id) {
                if let Some(group) = groups.pop() {
                    self.distribute_fill(group);
                }
            }
            let index = id.index();
            if self.widgets.passes[index].size.is_some() {
                continue;
            }
            self.resolve_aggregates(id);

            let spec = self.widgets.size_specs[index];
            if !matches!(spec.width, SizeAxis::Fill) && !matches!(spec.height, SizeAxis::Fill) {
                continue;
            }
            let Some(parent) = self.widgets.parents[index] else {
                continue;
            };
            match groups.last_mut() {
                Some(group) if group.parent == parent => group.children.push(id),
                _ => groups.push(FillGroup {
                    parent,
                    children: vec![id],
                }),
            }
        }

        // Parents outside `entries` are sized already.
        while let Some(group) = groups.pop() {
            self.distribute_fill(group);
        }
    }

    fn resolve_size_top_down(&mut self, id: WidgetId) {
        if !self.widgets.is_valid(id) {
            return;
        }
        let index = id.index();
        if let Some(pass) = self.widgets.passes[index].size.clone() {
            pass(self, id);
            return;
        }
        let content = self
            .widgets
            .parents[index]
            .map_or(Dimensions::default(), |parent| self.content_size(parent));
        let spec = self.widgets.size_specs[index];
        let resolve = |mode: SizeAxis, content: f32| match mode {
            SizeAxis::Absolute(value) => value,
            SizeAxis::Relative(factor) => content * factor,
            _ => 0.0,
        };
        self.widgets.sizes[index] = Dimensions::new(
            resolve(spec.width, content.width),
            resolve(spec.height, content.height),
        );
        self.copy_other_axis(id);
    }

    fn resolve_aggregates(&mut self, id: WidgetId) {
        let index = id.index();
        let spec = self.widgets.size_specs[index];
        if !spec.width.is_aggregate() && !spec.height.is_aggregate() {
            return;
        }
        for axis in Axis::BOTH {
            let children = &self.widgets.children[index];
            let extents = children
                .iter()
                .map(|child| axis.extent(self.widgets.sizes[child.index()]));
            let value = match axis.size_mode(&spec) {
                SizeAxis::MaxChildren => extents.fold(0.0, f32::max),
                SizeAxis::TotalChildren if children.is_empty() => 0.0,
                SizeAxis::TotalChildren => {
                    extents.sum::<f32>() + spec.spacing * (children.len() - 1) as f32
                }
                _ => continue,
            };
            let value = value + axis.margins(&spec.child_margins);
            axis.set_extent(&mut self.widgets.sizes[index], value);
        }
        self.copy_other_axis(id);
    }

    fn distribute_fill(&mut self, group: FillGroup) {
        let parent = group.parent.index();
        let parent_spec = self.widgets.size_specs[parent];
        let flow = Axis::of_flow(self.widgets.position_specs[parent].child_flow);
        let content = self.content_size(group.parent);

        for axis in Axis::BOTH {
            let fills: Vec<WidgetId> = group
                .children
                .iter()
                .copied()
                .filter(|child| {
                    matches!(
                        axis.size_mode(&self.widgets.size_specs[child.index()]),
                        SizeAxis::Fill
                    )
                })
                .collect();
            if fills.is_empty() {
                continue;
            }

            let available = axis.extent(content);
            let share = match flow {
                Some(flow_axis) if flow_axis != axis => available,
                _ => {
                    let siblings = &self.widgets.children[parent];
                    let used: f32 = siblings
                        .iter()
                        .filter(|s| {
                            !matches!(
                                axis.size_mode(&self.widgets.size_specs[s.index()]),
                                SizeAxis::Fill
                            )
                        })
                        .map(|s| axis.extent(self.widgets.sizes[s.index()]))
                        .sum();
                    let gaps = if flow == Some(axis) {
                        parent_spec.spacing * siblings.len().saturating_sub(1) as f32
                    } else {
                        0.0
                    };
                    (available - used - gaps) / fills.len() as f32
                }
            }
            .max(0.0);

            for child in fills {
                axis.set_extent(&mut self.widgets.sizes[child.index()], share);
            }
        }

        for child in group.children {
            self.copy_other_axis(child);
            self.resolve_descendant_sizes(child);
        }
    }

    /// Re-runs sizing below `id` after its own size changed.
    fn resolve_descendant_sizes(&mut self, id: WidgetId) {
        let Some(start) = self.widgets.depth_first_position[id.index()] else {
            return;
        };
        let start = start as usize;
        let owned = self.widgets.depth_first[start].owned_children as usize;
        if owned == 0 {
            return;
        }
        let entries = self.widgets.depth_first[start + 1..start + 1 + owned].to_vec();
        self.resolve_sizes(&entries);
    }

    fn copy_other_axis(&mut self, id: WidgetId) {
        let index = id.index();
        let spec = self.widgets.size_specs[index];
        let size = &mut self.widgets.sizes[index];
        match (spec.width, spec.height) {
            (SizeAxis::CopyOther, SizeAxis::CopyOther) => {}
            (SizeAxis::CopyOther, _) => size.width = size.height,
            (_, SizeAxis::CopyOther) => size.height = size.width,
            _ => {}
        }
    }

    /// Size minus child margins, never negative.
    fn content_size(&self, id: WidgetId) -> Dimensions {
        let index = id.index();
        let size = self.widgets.sizes[index];
        let margins = self.widgets.size_specs[index].child_margins;
        Dimensions::new(
            (size.width - margins.horizontal()).max(0.0),
            (size.height - margins.vertical()).max(0.0),
        )
    }

    // ------------------------------------------------------------------------
    // Positions
    // ------------------------------------------------------------------------

    pub(crate) fn calculate_positions(&mut self) {
        self.widgets.positions[0] = Vector2::ZERO;
        let order = self.widgets.depth_first.clone();
        for entry in &order[1..] {
            self.resolve_position(entry.widget);
        }
        for entry in &order {
            self.flow_children(entry.widget);
        }
    }

    fn resolve_position(&mut self, id: WidgetId) {
        if !self.widgets.is_valid(id) {
            return;
        }
        let index = id.index();
        if let Some(pass) = self.widgets.passes[index].position.clone() {
            pass(self, id);
            return;
        }
        let Some(parent) = self.widgets.parents[index] else {
            return;
        };
        let origin = self.widgets.positions[parent.index()];
        let margins = self.widgets.size_specs[parent.index()].child_margins;
        let content = self.content_size(parent);
        let spec = self.widgets.position_specs[index];
        let size = self.widgets.sizes[index];

        let resolve = |mode: PositionAxis, content: f32| match mode {
            PositionAxis::Absolute(value) => value,
            PositionAxis::Relative(factor) => content * factor,
        };
        self.widgets.positions[index] = Vector2::new(
            origin.x + margins.left + resolve(spec.x, content.width)
                - spec.anchor_x.offset(size.width),
            origin.y + margins.top + resolve(spec.y, content.height)
                - spec.anchor_y.offset(size.height),
        );
    }

    /// Places the children of a row or column widget one after another.
    fn flow_children(&mut self, id: WidgetId) {
        if !self.widgets.is_valid(id) {
            return;
        }
        let index = id.index();
        let position_spec = self.widgets.position_specs[index];
        let Some(axis) = Axis::of_flow(position_spec.child_flow) else {
            return;
        };
        let size_spec = self.widgets.size_specs[index];
        let mut pen = axis.component(self.widgets.positions[index])
            + axis.leading_margin(&size_spec.child_margins)
            + position_spec.scroll_offset;

        let children = self.widgets.children[index].clone();
        for child in children {
            let slot = child.index();
            if self.widgets.passes[slot].position.is_none() {
                let delta = pen - axis.component(self.widgets.positions[slot]);
                if delta != 0.0 {
                    self.translate_subtree(child, axis.vector(delta));
                }
            }
            pen += axis.extent(self.widgets.sizes[slot]) + size_spec.spacing;
        }
    }

    fn translate_subtree(&mut self, id: WidgetId, offset: Vector2) {
        let Some(start) = self.widgets.depth_first_position[id.index()] else {
            self.widgets.positions[id.index()] += offset;
            return;
        };
        let start = start as usize;
        let end = start + self.widgets.depth_first[start].owned_children as usize + 1;
        for k in start..end {
            let slot = self.widgets.depth_first[k].widget.index();
            self.widgets.positions[slot] += offset;
        }
    }
}
