//! Scrolling waveform display for one tap

use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Shape, Stroke, Vec2};

use crate::audio::RollingWindow;

/// One plotted line per selected channel, oldest sample first.
#[derive(Clone, Debug, PartialEq)]
pub struct LineSet {
    lines: Vec<Vec<f32>>,
}

impl LineSet {
    /// Flat lines matching a fresh window.
    pub fn new(channels: usize, len: usize) -> Self {
        Self {
            lines: vec![vec![0.0; len]; channels],
        }
    }

    /// Copy each window column into its line.
    pub fn update(&mut self, window: &RollingWindow) {
        self.lines.resize_with(window.channels(), Vec::new);
        for (channel, line) in self.lines.iter_mut().enumerate() {
            line.clear();
            line.extend(window.column(channel));
        }
    }

    pub fn line(&self, channel: usize) -> &[f32] {
        &self.lines[channel]
    }

    pub fn lines(&self) -> &[Vec<f32>] {
        &self.lines
    }

    /// Samples per line
    pub fn len(&self) -> usize {
        self.lines.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Display settings for the scope
#[derive(Clone)]
pub struct OscilloscopeSettings {
    pub background: Color32,
    pub line_width: f32,
    pub colors: Vec<Color32>,
    /// Visible amplitude range is `-y_range..=y_range`
    pub y_range: f32,
    pub show_graticule: bool,
    /// Distance between vertical grid lines, in samples
    pub major_tick_spacing: f32,
}

impl Default for OscilloscopeSettings {
    fn default() -> Self {
        Self {
            background: Color32::from_rgb(10, 20, 10),
            line_width: 1.0,
            colors: vec![
                Color32::from_rgb(100, 255, 100),
                Color32::from_rgb(255, 200, 80),
                Color32::from_rgb(90, 170, 255),
                Color32::from_rgb(255, 110, 110),
            ],
            y_range: 0.7,
            show_graticule: true,
            major_tick_spacing: 0.0,
        }
    }
}

/// Time-domain scope widget
pub struct Oscilloscope {
    pub settings: OscilloscopeSettings,
}

impl Default for Oscilloscope {
    fn default() -> Self {
        Self::new()
    }
}

impl Oscilloscope {
    pub fn new() -> Self {
        Self {
            settings: OscilloscopeSettings::default(),
        }
    }

    pub fn with_settings(settings: OscilloscopeSettings) -> Self {
        Self { settings }
    }

    fn color(&self, channel: usize) -> Color32 {
        self.settings.colors[channel % self.settings.colors.len().max(1)]
    }

    fn sample_to_screen(&self, index: usize, len: usize, value: f32, rect: Rect) -> Pos2 {
        let t = if len > 1 {
            index as f32 / (len - 1) as f32
        } else {
            0.0
        };
        let norm = (value / self.settings.y_range).clamp(-1.0, 1.0);
        Pos2::new(
            rect.left() + t * rect.width(),
            rect.center().y - norm * rect.height() / 2.0,
        )
    }

    pub fn show(&self, ui: &mut egui::Ui, lines: &LineSet, legend: &[String], size: Vec2) -> egui::Response {
        let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
        let rect = response.rect;

        painter.rect_filled(rect, 0.0, self.settings.background);

        if self.settings.show_graticule {
            self.draw_graticule(&painter, rect, lines.len());
        }

        for (channel, line) in lines.lines().iter().enumerate() {
            if line.len() < 2 {
                continue;
            }
            let points: Vec<Pos2> = line
                .iter()
                .enumerate()
                .map(|(i, &v)| self.sample_to_screen(i, line.len(), v, rect))
                .collect();
            painter.add(Shape::line(
                points,
                Stroke::new(self.settings.line_width, self.color(channel)),
            ));
        }

        if legend.len() > 1 {
            self.draw_legend(&painter, rect, legend);
        }

        response
    }

    fn draw_graticule(&self, painter: &egui::Painter, rect: Rect, len: usize) {
        let grid = Stroke::new(0.5, Color32::from_rgba_unmultiplied(60, 80, 60, 100));
        let axis = Stroke::new(1.0, Color32::from_rgba_unmultiplied(80, 100, 80, 150));

        painter.line_segment(
            [
                Pos2::new(rect.left(), rect.center().y),
                Pos2::new(rect.right(), rect.center().y),
            ],
            axis,
        );

        let spacing = self.settings.major_tick_spacing;
        if spacing <= 0.0 || len < 2 {
            return;
        }
        let span = (len - 1) as f32;
        let mut tick = 0.0;
        while tick <= span {
            let x = rect.left() + tick / span * rect.width();
            painter.line_segment([Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())], grid);
            tick += spacing;
        }
    }

    fn draw_legend(&self, painter: &egui::Painter, rect: Rect, legend: &[String]) {
        let mut pos = Pos2::new(rect.left() + 6.0, rect.bottom() - 6.0);
        for (channel, label) in legend.iter().enumerate() {
            let text = painter.text(pos, Align2::LEFT_BOTTOM, label, FontId::monospace(11.0), self.color(channel));
            pos.x = text.right() + 12.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Block;

    #[test]
    fn test_lines_follow_window_columns() {
        let mut window = RollingWindow::new(3, 2);
        let mut lines = LineSet::new(2, 3);
        assert_eq!(lines.line(0), &[0.0; 3]);

        window.push(&Block::from_interleaved(2, vec![0.5, -0.5]));
        lines.update(&window);
        assert_eq!(lines.line(0), &[0.0, 0.0, 0.5]);
        assert_eq!(lines.line(1), &[0.0, 0.0, -0.5]);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut window = RollingWindow::new(4, 1);
        window.push(&Block::from_interleaved(1, vec![0.1, 0.2]));
        let mut lines = LineSet::new(1, 4);
        lines.update(&window);
        let first = lines.clone();
        lines.update(&window);
        assert_eq!(lines, first);
    }

    #[test]
    fn test_sample_mapping_clamps_to_rect() {
        let scope = Oscilloscope::new();
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(100.0, 100.0));
        assert_eq!(scope.sample_to_screen(0, 11, 0.0, rect), Pos2::new(0.0, 50.0));
        assert_eq!(scope.sample_to_screen(10, 11, 0.7, rect), Pos2::new(100.0, 0.0));
        assert_eq!(scope.sample_to_screen(5, 11, -5.0, rect), Pos2::new(50.0, 100.0));
    }
}
