use crate::geometry::BoundingBox;
use crate::render::{DrawCommand, Layer, Stroke};
use crate::reveal::BOX_STROKE_WIDTH;

/// Number of marker cells sweeping in from each side
pub const CELLS_PER_SIDE: usize = 5;
/// 1.5s of sweeping at one frame per 100ms tick
pub const SEARCH_FRAMES: u32 = 15;

/// Decorative "AI is searching" sweep drawn on the animation layer.
///
/// Carries no scoring meaning; it can be cancelled at any time.
#[derive(Debug, Clone, Default)]
pub struct SearchAnimation {
    pub left: Vec<BoundingBox>,
    pub right: Vec<BoundingBox>,
    pub step: f64,
    pub frames_left: u32,
    pub is_active: bool,
}

impl SearchAnimation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out the two columns of cells along the left and right edges.
    ///
    /// Cells are a tenth of the canvas; the left column fills even rows and
    /// the right column fills odd rows so the two sweeps interleave.
    pub fn start(&mut self, canvas_size: f64) {
        let size = canvas_size / 10.0;

        self.left = (0..CELLS_PER_SIDE)
            .map(|i| {
                let i = i as f64;
                BoundingBox::new(0.0, 2.0 * i * size, size, (2.0 * i + 1.0) * size)
            })
            .collect();

        self.right = (0..CELLS_PER_SIDE)
            .map(|i| {
                let i = i as f64;
                BoundingBox::new(
                    canvas_size - size,
                    (2.0 * i + 1.0) * size,
                    canvas_size,
                    2.0 * (i + 1.0) * size,
                )
            })
            .collect();

        self.step = size;
        self.frames_left = SEARCH_FRAMES;
        self.is_active = true;
    }

    /// Produce the draw commands for the next frame and move the cells
    /// inward. The final call clears the layer and deactivates.
    pub fn update(&mut self) -> Vec<DrawCommand> {
        if !self.is_active {
            return Vec::new();
        }

        if self.frames_left == 0 {
            self.is_active = false;
            self.left.clear();
            self.right.clear();
            return vec![DrawCommand::Clear(Layer::Animation)];
        }

        let mut commands = Vec::with_capacity(1 + 2 * CELLS_PER_SIDE);
        commands.push(DrawCommand::Clear(Layer::Animation));

        for cell in self.left.iter_mut() {
            commands.push(search_cell(*cell, Stroke::SearchLeft));
            *cell = cell.translate(self.step, 0.0);
        }
        for cell in self.right.iter_mut() {
            commands.push(search_cell(*cell, Stroke::SearchRight));
            *cell = cell.translate(-self.step, 0.0);
        }

        self.frames_left -= 1;
        commands
    }

    /// Stop immediately; returns the clear command if anything was showing
    pub fn cancel(&mut self) -> Option<DrawCommand> {
        if !self.is_active {
            return None;
        }
        self.is_active = false;
        self.frames_left = 0;
        self.left.clear();
        self.right.clear();
        Some(DrawCommand::Clear(Layer::Animation))
    }
}

fn search_cell(bbox: BoundingBox, stroke: Stroke) -> DrawCommand {
    DrawCommand::Rect {
        layer: Layer::Animation,
        bbox,
        stroke,
        width: BOX_STROKE_WIDTH,
    }
}
