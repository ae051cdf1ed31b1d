use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Context, Line as CanvasLine, Points, Rectangle},
        Block, Borders, Widget,
    },
};

use spotr::geometry::{BoundingBox, Point};
use spotr::render::{DisplayList, DrawCommand, Layer, ScanImage, Stroke};

/// Half-length of each arm of the player's cross, in canvas px
const CROSS_ARM: f64 = 5.0;

pub fn stroke_color(stroke: Stroke) -> Color {
    match stroke {
        Stroke::Pending => Color::Yellow,
        Stroke::Valid => Color::Green,
        Stroke::Invalid => Color::Red,
        Stroke::Truth => Color::Blue,
        Stroke::Hint => Color::Red,
        Stroke::SearchLeft => Color::Cyan,
        Stroke::SearchRight => Color::Magenta,
    }
}

/// Map a terminal cell inside `area` to canvas coordinates.
///
/// Samples the centre of the cell; returns `None` outside the area.
pub fn project_click(area: Rect, column: u16, row: u16, canvas_size: f64) -> Option<Point> {
    if area.width == 0
        || area.height == 0
        || column < area.x
        || row < area.y
        || column >= area.x + area.width
        || row >= area.y + area.height
    {
        return None;
    }
    let scale_x = canvas_size / area.width as f64;
    let scale_y = canvas_size / area.height as f64;
    Some(Point::new(
        (column - area.x) as f64 * scale_x + scale_x / 2.0,
        (row - area.y) as f64 * scale_y + scale_y / 2.0,
    ))
}

/// Renders the retained display list onto a ratatui canvas.
///
/// Scan coordinates grow downwards, the terminal canvas grows upwards, so
/// every y is flipped on the way out.
pub struct ScanCanvas<'a> {
    pub list: &'a DisplayList,
    pub canvas_size: f64,
    pub title: &'a str,
}

impl ScanCanvas<'_> {
    fn flip(&self, p: Point) -> (f64, f64) {
        (p.x, self.canvas_size - p.y)
    }

    fn rect(&self, ctx: &mut Context, bbox: &BoundingBox, stroke: Stroke) {
        ctx.draw(&Rectangle {
            x: bbox.x_min,
            y: self.canvas_size - bbox.y_max,
            width: bbox.width(),
            height: bbox.height(),
            color: stroke_color(stroke),
        });
    }

    fn paint_command(&self, ctx: &mut Context, cmd: &DrawCommand) {
        match cmd {
            DrawCommand::Clear(_) => {}
            DrawCommand::Image(ScanImage::Speckle(points)) => {
                let coords: Vec<(f64, f64)> = points.iter().map(|p| self.flip(*p)).collect();
                ctx.draw(&Points {
                    coords: &coords,
                    color: Color::DarkGray,
                });
            }
            DrawCommand::Image(ScanImage::File(path)) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let frame = BoundingBox::new(0.0, 0.0, self.canvas_size, self.canvas_size);
                ctx.draw(&Rectangle {
                    x: frame.x_min,
                    y: frame.y_min,
                    width: frame.width(),
                    height: frame.height(),
                    color: Color::DarkGray,
                });
                ctx.print(
                    self.canvas_size / 2.0,
                    self.canvas_size / 2.0,
                    Line::from(Span::styled(name, Style::default().fg(Color::DarkGray))),
                );
            }
            DrawCommand::Rect { bbox, stroke, .. } => self.rect(ctx, bbox, *stroke),
            DrawCommand::Cross { at, stroke } => {
                let (x, y) = self.flip(*at);
                let color = stroke_color(*stroke);
                ctx.draw(&CanvasLine::new(
                    x - CROSS_ARM,
                    y - CROSS_ARM,
                    x + CROSS_ARM,
                    y + CROSS_ARM,
                    color,
                ));
                ctx.draw(&CanvasLine::new(
                    x - CROSS_ARM,
                    y + CROSS_ARM,
                    x + CROSS_ARM,
                    y - CROSS_ARM,
                    color,
                ));
            }
            DrawCommand::Circle {
                center,
                radius,
                stroke,
            } => {
                let (x, y) = self.flip(*center);
                ctx.draw(&Circle {
                    x,
                    y,
                    radius: *radius,
                    color: stroke_color(*stroke),
                });
            }
        }
    }
}

impl Widget for ScanCanvas<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Canvas::default()
            .block(Block::default().borders(Borders::ALL).title(self.title))
            .marker(Marker::Braille)
            .x_bounds([0.0, self.canvas_size])
            .y_bounds([0.0, self.canvas_size])
            .paint(|ctx| {
                for cmd in self.list.layer(Layer::Scene) {
                    self.paint_command(ctx, cmd);
                }
                ctx.layer();
                for cmd in self.list.layer(Layer::Animation) {
                    self.paint_command(ctx, cmd);
                }
            })
            .render(area, buf);
    }
}

/// The drawable part of a bordered canvas block
pub fn inner_area(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use spotr::render::RenderSurface;

    #[test]
    fn test_project_click_maps_cell_centres() {
        let area = Rect::new(10, 5, 64, 32);

        let p = project_click(area, 10, 5, 512.0).unwrap();
        assert_eq!(p, Point::new(4.0, 8.0));

        let p = project_click(area, 73, 36, 512.0).unwrap();
        assert_eq!(p, Point::new(508.0, 504.0));
    }

    #[test]
    fn test_project_click_outside_area() {
        let area = Rect::new(10, 5, 64, 32);
        assert_eq!(project_click(area, 9, 5, 512.0), None);
        assert_eq!(project_click(area, 74, 5, 512.0), None);
        assert_eq!(project_click(area, 20, 37, 512.0), None);
        assert_eq!(project_click(Rect::default(), 0, 0, 512.0), None);
    }

    #[test]
    fn test_inner_area_strips_border() {
        assert_eq!(inner_area(Rect::new(0, 0, 10, 10)), Rect::new(1, 1, 8, 8));
    }

    #[test]
    fn test_canvas_renders_display_list() {
        let mut list = DisplayList::new();
        list.draw(DrawCommand::Image(ScanImage::File("scans/7.png".into())));
        list.draw(DrawCommand::Rect {
            layer: Layer::Scene,
            bbox: BoundingBox::new(100.0, 100.0, 200.0, 200.0),
            stroke: Stroke::Truth,
            width: 3.0,
        });
        list.draw(DrawCommand::Cross {
            at: Point::new(150.0, 150.0),
            stroke: Stroke::Pending,
        });

        let backend = TestBackend::new(60, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                f.render_widget(
                    ScanCanvas {
                        list: &list,
                        canvas_size: 512.0,
                        title: "Scan",
                    },
                    f.area(),
                )
            })
            .unwrap();

        let content: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(content.contains("Scan"));
        assert!(content.contains("7.png"));
    }
}
