use std::path::PathBuf;

use crate::geometry::{BoundingBox, Point};

/// Stroke colours used by the round, by meaning rather than by hue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stroke {
    /// Marks that have been placed but not judged yet
    Pending,
    Valid,
    Invalid,
    Truth,
    Hint,
    SearchLeft,
    SearchRight,
}

/// Two stacked surfaces: the scan with its marks, and the decorative overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Scene,
    Animation,
}

/// What the backdrop of a round looks like
#[derive(Debug, Clone, PartialEq)]
pub enum ScanImage {
    /// A raster file the terminal can only reference by name
    File(PathBuf),
    /// Speckle points in canvas coordinates
    Speckle(Vec<Point>),
}

impl ScanImage {
    pub fn scale(&self, factor: f64) -> Self {
        match self {
            ScanImage::File(path) => ScanImage::File(path.clone()),
            ScanImage::Speckle(points) => {
                ScanImage::Speckle(points.iter().map(|p| p.scale(factor)).collect())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Layer),
    Image(ScanImage),
    Rect {
        layer: Layer,
        bbox: BoundingBox,
        stroke: Stroke,
        width: f64,
    },
    /// The player's "x" mark
    Cross { at: Point, stroke: Stroke },
    Circle {
        center: Point,
        radius: f64,
        stroke: Stroke,
    },
}

/// Write-only drawing target; the engine never reads back from it
pub trait RenderSurface {
    fn draw(&mut self, cmd: DrawCommand);
}

/// Retained surface that keeps the commands drawn since each layer was
/// last cleared, in paint order. Widgets replay it every frame.
#[derive(Debug, Default, Clone)]
pub struct DisplayList {
    scene: Vec<DrawCommand>,
    animation: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self, layer: Layer) -> &[DrawCommand] {
        match layer {
            Layer::Scene => &self.scene,
            Layer::Animation => &self.animation,
        }
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut Vec<DrawCommand> {
        match layer {
            Layer::Scene => &mut self.scene,
            Layer::Animation => &mut self.animation,
        }
    }
}

impl RenderSurface for DisplayList {
    fn draw(&mut self, cmd: DrawCommand) {
        match cmd {
            DrawCommand::Clear(layer) => self.layer_mut(layer).clear(),
            DrawCommand::Rect { layer, .. } => self.layer_mut(layer).push(cmd),
            _ => self.scene.push(cmd),
        }
    }
}

impl<S: RenderSurface + ?Sized> RenderSurface for &mut S {
    fn draw(&mut self, cmd: DrawCommand) {
        (**self).draw(cmd)
    }
}
