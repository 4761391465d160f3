//! Time-grid placement: pointer geometry to calendar minutes.
//!
//! All math is in minutes since midnight. Pixel offsets are relative to the
//! top of the grid (`start_hour`). Every pointer-derived minute value goes
//! through [`GridConfig::snap`], which rounds to the nearest multiple of
//! `snap_minutes`.
//!
//! Overlapping blocks are allowed; only bounds and snapping are enforced.

use crate::model::block::TimeBlock;
use crate::model::config::GridConfig;
use crate::model::write::Write;

/// `value` limited to `[lo, hi]`; `lo` wins if the range is inverted
fn bound(value: i32, lo: i32, hi: i32) -> i32 {
    value.min(hi).max(lo)
}

fn saturating_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl GridConfig {
    pub fn grid_start(&self) -> i32 {
        saturating_i32(self.start_hour).saturating_mul(60)
    }

    pub fn grid_end(&self) -> i32 {
        saturating_i32(self.end_hour).saturating_mul(60)
    }

    fn min_minutes(&self) -> i32 {
        saturating_i32(self.min_duration)
    }

    /// Round to the nearest multiple of `snap_minutes` (halves away from zero)
    pub fn snap(&self, minutes: f64) -> i32 {
        let step = f64::from(self.snap_minutes.max(1));
        ((minutes / step).round() * step) as i32
    }

    pub fn pixels_to_minutes(&self, dy: f64) -> f64 {
        dy / self.pixels_per_hour * 60.0
    }

    /// Pixel offset of `minute` from the top of the grid
    pub fn minutes_to_y(&self, minute: i32) -> f64 {
        (f64::from(minute) - f64::from(self.grid_start())) / 60.0 * self.pixels_per_hour
    }

    /// Latest start that still leaves room for the minimum duration
    fn latest_start(&self) -> i32 {
        self.grid_end()
            .saturating_sub(self.min_minutes())
            .max(self.grid_start())
    }

    /// Minute under a pointer at `y` pixels below the grid top
    pub fn pointer_y_to_minutes(&self, y: f64) -> i32 {
        let lo = self.grid_start();
        let hi = self.latest_start();
        let raw = f64::from(lo) + self.pixels_to_minutes(y);
        let clamped = raw.max(f64::from(lo)).min(f64::from(hi));
        bound(self.snap(clamped), lo, hi)
    }

    /// Snap and clamp an absolute minute the way a pointer position would be
    pub fn snap_minute(&self, minute: i32) -> i32 {
        bound(self.snap(f64::from(minute)), self.grid_start(), self.latest_start())
    }

    /// Commit invariants: minimum duration and inside the grid
    pub fn is_valid(&self, block: &TimeBlock) -> bool {
        block.duration() >= self.min_minutes()
            && block.start >= self.grid_start()
            && block.end <= self.grid_end()
    }

    /// Block for an unscheduled item dropped at `minute`. The item's size
    /// hint sets the duration, falling back to `default_duration`.
    pub fn place_at(&self, day: &str, minute: i32, estimate: Option<u32>) -> TimeBlock {
        let start = self.snap_minute(minute);
        let duration = saturating_i32(estimate.unwrap_or(self.default_duration))
            .max(self.min_minutes());
        let end = start.saturating_add(duration).min(self.grid_end());
        TimeBlock::new(day, start, end)
    }

    /// [`GridConfig::place_at`] for a pointer position
    pub fn place(&self, day: &str, pointer_y: f64, estimate: Option<u32>) -> TimeBlock {
        self.place_at(day, self.pointer_y_to_minutes(pointer_y), estimate)
    }

    /// Pixel geometry of a block
    pub fn preview(&self, block: &TimeBlock) -> Preview {
        let top = self.minutes_to_y(block.start);
        Preview {
            block: block.clone(),
            top,
            height: self.minutes_to_y(block.end) - top,
        }
    }
}

/// What the UI draws while a grid gesture is in progress
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub block: TimeBlock,
    pub top: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridGesture {
    /// Drag the whole block; duration is fixed
    Move,
    /// Drag the bottom edge; start is fixed
    Resize,
}

/// An in-progress move or resize of one scheduled block.
///
/// Only the preview changes while the pointer moves. `finish` turns the
/// final preview into a write.
#[derive(Debug, Clone)]
pub struct GridDrag {
    item_id: String,
    gesture: GridGesture,
    original: TimeBlock,
    origin_y: f64,
    preview: TimeBlock,
}

impl GridDrag {
    pub fn begin_move(item_id: impl Into<String>, block: TimeBlock, pointer_y: f64) -> Self {
        Self::begin(item_id.into(), GridGesture::Move, block, pointer_y)
    }

    pub fn begin_resize(item_id: impl Into<String>, block: TimeBlock, pointer_y: f64) -> Self {
        Self::begin(item_id.into(), GridGesture::Resize, block, pointer_y)
    }

    fn begin(item_id: String, gesture: GridGesture, block: TimeBlock, pointer_y: f64) -> Self {
        GridDrag {
            item_id,
            gesture,
            preview: block.clone(),
            original: block,
            origin_y: pointer_y,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn gesture(&self) -> GridGesture {
        self.gesture
    }

    pub fn original(&self) -> &TimeBlock {
        &self.original
    }

    pub fn current(&self) -> &TimeBlock {
        &self.preview
    }

    /// Pointer moved to `pointer_y`
    pub fn update(&mut self, grid: &GridConfig, pointer_y: f64) -> Preview {
        let delta = grid.pixels_to_minutes(pointer_y - self.origin_y);
        self.update_by_minutes(grid, delta)
    }

    /// Pointer moved by `delta_minutes` since the gesture began
    pub fn update_by_minutes(&mut self, grid: &GridConfig, delta_minutes: f64) -> Preview {
        let delta = grid.snap(delta_minutes);
        let (start, end) = match self.gesture {
            GridGesture::Move => {
                let duration = self.original.duration();
                let latest = grid.grid_end().saturating_sub(duration);
                let start = bound(self.original.start.saturating_add(delta), grid.grid_start(), latest);
                let end = start.saturating_add(duration);
                if end > grid.grid_end() {
                    (latest, grid.grid_end())
                } else {
                    (start, end)
                }
            }
            GridGesture::Resize => {
                let end = bound(
                    self.original.end.saturating_add(delta),
                    self.original.start.saturating_add(grid.min_minutes()),
                    grid.grid_end(),
                );
                (self.original.start, end)
            }
        };
        self.preview.start = start;
        self.preview.end = end;
        grid.preview(&self.preview)
    }

    /// Pointer crossed into another day column. Resizes stay on their day.
    pub fn hover_day(&mut self, day: &str) {
        if self.gesture == GridGesture::Move {
            self.preview.day = day.to_string();
        }
    }

    /// Pointer released. `None` when the block did not change or the
    /// preview would break the grid invariants.
    pub fn finish(self, grid: &GridConfig) -> Option<Write> {
        if self.preview == self.original || !grid.is_valid(&self.preview) {
            return None;
        }
        Some(Write::Schedule {
            id: self.item_id,
            block: Some(self.preview),
        })
    }

    pub fn cancel(self) {}
}

/// Inline creation affordance opened by clicking empty grid space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationDraft {
    pub day: String,
    pub start: i32,
}

impl CreationDraft {
    pub fn at(grid: &GridConfig, day: &str, pointer_y: f64) -> Self {
        CreationDraft {
            day: day.to_string(),
            start: grid.pointer_y_to_minutes(pointer_y),
        }
    }

    pub fn anchor_y(&self, grid: &GridConfig) -> f64 {
        grid.minutes_to_y(self.start)
    }

    /// The block to hand to the item creator
    pub fn confirm(self, grid: &GridConfig) -> TimeBlock {
        let duration = saturating_i32(grid.default_duration).max(grid.min_minutes());
        let end = self.start.saturating_add(duration).min(grid.grid_end());
        TimeBlock::new(self.day, self.start, end)
    }

    pub fn cancel(self) {}
}

/// Return an item to the unscheduled pool
pub fn unschedule(id: impl Into<String>) -> Write {
    Write::Schedule {
        id: id.into(),
        block: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: &str = "2025-05-05";

    fn grid() -> GridConfig {
        GridConfig::default()
    }

    fn block(start: i32, end: i32) -> TimeBlock {
        TimeBlock::new(DAY, start, end)
    }

    fn committed(write: Option<Write>) -> TimeBlock {
        match write {
            Some(Write::Schedule {
                block: Some(block), ..
            }) => block,
            other => panic!("expected schedule write, got {:?}", other),
        }
    }

    #[test]
    fn snap_rounds_to_nearest() {
        let g = grid();
        assert_eq!(g.snap(37.0), 30);
        assert_eq!(g.snap(38.0), 45);
        assert_eq!(g.snap(7.5), 15);
        assert_eq!(g.snap(-37.0), -30);
        assert_eq!(g.snap(0.0), 0);
    }

    #[test]
    fn pointer_mapping() {
        let g = grid();
        assert_eq!(g.pointer_y_to_minutes(0.0), 360);
        assert_eq!(g.pointer_y_to_minutes(61.0), 420);
        assert_eq!(g.pointer_y_to_minutes(-50.0), 360);
        assert_eq!(g.pointer_y_to_minutes(10_000.0), 22 * 60 - 15);
        assert_eq!(g.minutes_to_y(420), 60.0);
    }

    #[test]
    fn resize_snaps_delta() {
        let g = grid();
        let mut drag = GridDrag::begin_resize("t", block(540, 600), 0.0);
        let preview = drag.update_by_minutes(&g, 37.0);
        assert_eq!(preview.block.end, 630);
        assert_eq!(committed(drag.finish(&g)), block(540, 630));
    }

    #[test]
    fn resize_keeps_minimum_duration() {
        let g = grid();
        let mut drag = GridDrag::begin_resize("t", block(540, 600), 0.0);
        drag.update_by_minutes(&g, -300.0);
        assert_eq!(committed(drag.finish(&g)), block(540, 555));
    }

    #[test]
    fn resize_stops_at_grid_end() {
        let g = grid();
        let mut drag = GridDrag::begin_resize("t", block(1200, 1260), 0.0);
        drag.update(&g, 600.0);
        assert_eq!(committed(drag.finish(&g)), block(1200, 1320));
    }

    #[test]
    fn move_keeps_duration() {
        let g = grid();
        let mut drag = GridDrag::begin_move("t", block(540, 600), 100.0);
        let preview = drag.update(&g, 190.0);
        assert_eq!(preview.block, block(630, 690));
        assert_eq!(preview.top, 270.0);
        assert_eq!(preview.height, 60.0);
    }

    #[test]
    fn move_clamps_to_grid_edges() {
        let g = grid();
        let mut drag = GridDrag::begin_move("t", block(540, 630), 0.0);
        drag.update_by_minutes(&g, -1000.0);
        assert_eq!(drag.current(), &block(360, 450));
        drag.update_by_minutes(&g, 1000.0);
        assert_eq!(drag.current(), &block(1230, 1320));
    }

    #[test]
    fn move_back_to_origin_commits_nothing() {
        let g = grid();
        let mut drag = GridDrag::begin_move("t", block(540, 600), 0.0);
        drag.update_by_minutes(&g, 60.0);
        drag.update_by_minutes(&g, 4.0);
        assert!(drag.finish(&g).is_none());
    }

    #[test]
    fn move_across_days() {
        let g = grid();
        let mut drag = GridDrag::begin_move("t", block(540, 600), 0.0);
        drag.hover_day("2025-05-06");
        let write = drag.finish(&g);
        assert_eq!(committed(write), TimeBlock::new("2025-05-06", 540, 600));
    }

    #[test]
    fn resize_ignores_day_hover() {
        let g = grid();
        let mut drag = GridDrag::begin_resize("t", block(540, 600), 0.0);
        drag.hover_day("2025-05-06");
        assert_eq!(drag.current().day, DAY);
    }

    #[test]
    fn bounds_hold_for_every_gesture() {
        let g = grid();
        let starts = [360, 375, 540, 600, 1200, 1245, 1290, 1305];
        let durations = [15, 30, 45, 60, 90, 240];
        let deltas = [-2000.0, -400.0, -37.0, -7.4, 0.0, 7.6, 22.0, 37.0, 400.0, 2000.0];
        for &start in &starts {
            for &duration in &durations {
                let end = (start + duration).min(g.grid_end());
                if end - start < 15 {
                    continue;
                }
                for &delta in &deltas {
                    for gesture in [GridGesture::Move, GridGesture::Resize] {
                        let original = block(start, end);
                        let mut drag = match gesture {
                            GridGesture::Move => GridDrag::begin_move("t", original, 0.0),
                            GridGesture::Resize => GridDrag::begin_resize("t", original, 0.0),
                        };
                        drag.update_by_minutes(&g, delta);
                        let b = drag.current().clone();
                        assert!(g.is_valid(&b), "{:?} {} {}: {:?}", gesture, start, delta, b);
                    }
                }
            }
        }
    }

    #[test]
    fn placement_uses_size_hint() {
        let g = grid();
        assert_eq!(g.place_at(DAY, 540, Some(30)), block(540, 570));
        assert_eq!(g.place_at(DAY, 540, None), block(540, 600));
        assert_eq!(g.place_at(DAY, 540, Some(5)), block(540, 555));
        assert_eq!(g.place(DAY, 180.0, None), block(540, 600));
    }

    #[test]
    fn placement_near_end_is_clamped() {
        let g = grid();
        assert_eq!(g.place_at(DAY, 1290, Some(120)), block(1290, 1320));
        assert_eq!(g.place_at(DAY, 1400, None), block(1305, 1320));
    }

    #[test]
    fn placement_snaps_start() {
        let g = grid();
        assert_eq!(g.place_at(DAY, 548, None), block(555, 615));
    }

    #[test]
    fn creation_draft_anchors_and_confirms() {
        let g = grid();
        let draft = CreationDraft::at(&g, DAY, 122.0);
        assert_eq!(draft.start, 480);
        assert_eq!(draft.anchor_y(&g), 120.0);
        assert_eq!(draft.confirm(&g), block(480, 540));

        let late = CreationDraft::at(&g, DAY, 10_000.0);
        assert_eq!(late.confirm(&g), block(1305, 1320));
    }

    #[test]
    fn created_blocks_keep_minimum_duration() {
        let g = GridConfig {
            default_duration: 5,
            ..grid()
        };
        let created = CreationDraft::at(&g, DAY, 120.0).confirm(&g);
        assert_eq!(created, block(480, 495));
        assert!(g.is_valid(&created));
        assert_eq!(g.place_at(DAY, 480, None), block(480, 495));
    }

    #[test]
    fn oversized_hours_saturate() {
        let g = GridConfig {
            start_hour: 40_000_000,
            end_hour: u32::MAX,
            ..grid()
        };
        assert_eq!(g.grid_start(), i32::MAX);
        assert_eq!(g.grid_end(), i32::MAX);
        let mut drag = GridDrag::begin_move("t", block(540, 600), 0.0);
        drag.update_by_minutes(&g, 30.0);
        assert!(drag.finish(&g).is_none());
    }

    #[test]
    fn unschedule_clears_block() {
        assert_eq!(
            unschedule("t"),
            Write::Schedule {
                id: "t".into(),
                block: None
            }
        );
    }
}
