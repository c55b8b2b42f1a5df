//! Plotters-powered time series chart widget for Ratatui.
//!
//! Why Plotters instead of Ratatui's built-in `Chart` widget?
//! - nicer axis + mesh rendering
//! - less manual work for ticks/labels
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One line of the chart, in `(point index, value)` coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLine {
    pub label: String,
    pub color: (u8, u8, u8),
    pub points: Vec<(f64, f64)>,
}

/// A render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct SurveyChart<'a> {
    pub lines: &'a [ChartLine],
    /// Time of day of each point index, used for x tick labels.
    pub x_labels: &'a [String],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
}

/// `HH:MM` label of the point nearest to `x`.
pub fn time_label(labels: &[String], x: f64) -> String {
    if !x.is_finite() || x < -0.5 {
        return String::new();
    }
    labels
        .get(x.round() as usize)
        .map(|t| t.get(..5).unwrap_or(t.as_str()).to_string())
        .unwrap_or_default()
}

impl Widget for SurveyChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| time_label(self.x_labels, *v))
                .y_label_formatter(&|v| format!("{v:.0}"))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            for line in self.lines {
                let (r, g, b) = line.color;
                let color = RGBColor(r, g, b);
                chart.draw_series(LineSeries::new(line.points.iter().copied(), &color))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_labels_follow_point_indices() {
        let labels = vec!["08:00:00".to_string(), "08:30:00".to_string(), "9".to_string()];
        assert_eq!(time_label(&labels, 0.0), "08:00");
        assert_eq!(time_label(&labels, 0.6), "08:30");
        assert_eq!(time_label(&labels, 2.0), "9");
        assert_eq!(time_label(&labels, 7.0), "");
        assert_eq!(time_label(&labels, -3.0), "");
    }
}
