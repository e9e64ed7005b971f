//! Scatter figures of folded light curves.
//!
//! A [`Figure`] collects scatter layers restricted to fixed x-axis limits; a
//! [`PlotRenderer`] writes it to disk. Adding a layer fails on its own (e.g. nothing falls
//! inside the limits) without affecting the other layers of the figure.
use std::fmt::Write as _;

use camino::Utf8Path;

use super::write_atomic;
use crate::exofold_errors::ExofoldError;

/// One set of scatter markers.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotLayer {
    pub label: String,
    pub points: Vec<(f64, f64)>,
    /// Marker opacity in `[0, 1]`
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x_limits: (f64, f64),
    pub layers: Vec<PlotLayer>,
}

impl Figure {
    pub fn new(
        title: impl Into<String>,
        x_label: impl Into<String>,
        y_label: impl Into<String>,
        x_limits: (f64, f64),
    ) -> Self {
        Figure {
            title: title.into(),
            x_label: x_label.into(),
            y_label: y_label.into(),
            x_limits,
            layers: Vec::new(),
        }
    }

    /// Add a scatter layer, keeping only finite points inside the x limits.
    ///
    /// Return
    /// ----------
    /// * [`ExofoldError::EmptyPlotLayer`] when no point is left; the figure is unchanged.
    pub fn scatter(
        &mut self,
        label: &str,
        points: &[(f64, f64)],
        opacity: f64,
    ) -> Result<(), ExofoldError> {
        let (lo, hi) = self.x_limits;
        let kept: Vec<(f64, f64)> = points
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite() && *x >= lo && *x <= hi)
            .collect();
        if kept.is_empty() {
            return Err(ExofoldError::EmptyPlotLayer(label.to_string()));
        }
        self.layers.push(PlotLayer {
            label: label.to_string(),
            points: kept,
            opacity: opacity.clamp(0.0, 1.0),
        });
        Ok(())
    }

    /// Y range covering every layer, padded by 5%.
    pub fn y_limits(&self) -> (f64, f64) {
        let (lo, hi) = self
            .layers
            .iter()
            .flat_map(|l| l.points.iter().map(|(_, y)| *y))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
                (lo.min(y), hi.max(y))
            });
        if !lo.is_finite() {
            return (0.0, 1.0);
        }
        let pad = if hi > lo { 0.05 * (hi - lo) } else { 0.01 * lo.abs().max(1.0) };
        (lo - pad, hi + pad)
    }
}

pub trait PlotRenderer: Send + Sync {
    /// File extension of the rendered figures.
    fn extension(&self) -> &'static str;

    fn save(&self, figure: &Figure, path: &Utf8Path) -> Result<(), ExofoldError>;
}

const LAYER_COLORS: [&str; 4] = ["#1f77b4", "#d62728", "#2ca02c", "#ff7f0e"];

/// Standalone SVG renderer.
#[derive(Debug, Clone, Copy)]
pub struct SvgRenderer {
    pub width: f64,
    pub height: f64,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        SvgRenderer {
            width: 900.0,
            height: 400.0,
        }
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl SvgRenderer {
    const MARGIN_LEFT: f64 = 70.0;
    const MARGIN_RIGHT: f64 = 20.0;
    const MARGIN_TOP: f64 = 40.0;
    const MARGIN_BOTTOM: f64 = 50.0;
    const TICKS: usize = 5;

    /// Render a figure as an SVG document.
    pub fn render(&self, figure: &Figure) -> String {
        let (x0, x1) = figure.x_limits;
        let (y0, y1) = figure.y_limits();
        let plot_w = self.width - Self::MARGIN_LEFT - Self::MARGIN_RIGHT;
        let plot_h = self.height - Self::MARGIN_TOP - Self::MARGIN_BOTTOM;
        let sx = |x: f64| Self::MARGIN_LEFT + (x - x0) / (x1 - x0) * plot_w;
        let sy = |y: f64| Self::MARGIN_TOP + (y1 - y) / (y1 - y0) * plot_h;

        let mut svg = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="12">"#,
            w = self.width,
            h = self.height
        );
        let _ = writeln!(
            svg,
            r#"<rect width="100%" height="100%" fill="white"/><rect x="{}" y="{}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#,
            Self::MARGIN_LEFT,
            Self::MARGIN_TOP
        );
        let _ = writeln!(
            svg,
            r#"<text x="{}" y="24" text-anchor="middle" font-size="14">{}</text>"#,
            self.width / 2.0,
            escape_xml(&figure.title)
        );

        for k in 0..=Self::TICKS {
            let f = k as f64 / Self::TICKS as f64;
            let (xv, yv) = (x0 + f * (x1 - x0), y0 + f * (y1 - y0));
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{xv:.3}</text>"#,
                sx(xv),
                self.height - Self::MARGIN_BOTTOM + 16.0
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{yv:.4}</text>"#,
                Self::MARGIN_LEFT - 6.0,
                sy(yv) + 4.0
            );
        }
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            Self::MARGIN_LEFT + plot_w / 2.0,
            self.height - 12.0,
            escape_xml(&figure.x_label)
        );
        let _ = writeln!(
            svg,
            r#"<text x="16" y="{:.1}" text-anchor="middle" transform="rotate(-90 16 {:.1})">{}</text>"#,
            Self::MARGIN_TOP + plot_h / 2.0,
            Self::MARGIN_TOP + plot_h / 2.0,
            escape_xml(&figure.y_label)
        );

        for (n, layer) in figure.layers.iter().enumerate() {
            let color = LAYER_COLORS[n % LAYER_COLORS.len()];
            let _ = writeln!(
                svg,
                r#"<g fill="{color}" fill-opacity="{}">"#,
                layer.opacity
            );
            for (x, y) in &layer.points {
                let _ = writeln!(svg, r#"<circle cx="{:.2}" cy="{:.2}" r="1.5"/>"#, sx(*x), sy(*y));
            }
            svg.push_str("</g>\n");
            let legend_y = Self::MARGIN_TOP + 16.0 + 16.0 * n as f64;
            let legend_x = self.width - Self::MARGIN_RIGHT - 90.0;
            let _ = writeln!(
                svg,
                r#"<circle cx="{legend_x:.1}" cy="{:.1}" r="4" fill="{color}"/><text x="{:.1}" y="{legend_y:.1}">{}</text>"#,
                legend_y - 4.0,
                legend_x + 8.0,
                escape_xml(&layer.label)
            );
        }
        svg.push_str("</svg>\n");
        svg
    }
}

impl PlotRenderer for SvgRenderer {
    fn extension(&self) -> &'static str {
        "svg"
    }

    fn save(&self, figure: &Figure, path: &Utf8Path) -> Result<(), ExofoldError> {
        write_atomic(path, self.render(figure).as_bytes())
    }
}

#[cfg(test)]
mod plot_test {
    use super::*;

    #[test]
    fn test_scatter_keeps_points_in_limits() {
        let mut fig = Figure::new("t", "x", "y", (-0.1, 0.1));
        fig.scatter("Folded", &[(-0.2, 1.0), (0.0, 0.99), (0.05, f64::NAN)], 0.3)
            .unwrap();
        assert_eq!(fig.layers[0].points, vec![(0.0, 0.99)]);
    }

    #[test]
    fn test_empty_layer_is_an_error() {
        let mut fig = Figure::new("t", "x", "y", (-0.1, 0.1));
        assert_eq!(
            fig.scatter("Binned", &[(1.0, 1.0)], 1.0),
            Err(ExofoldError::EmptyPlotLayer("Binned".into()))
        );
        assert!(fig.layers.is_empty());
        assert_eq!(fig.y_limits(), (0.0, 1.0));
    }

    #[test]
    fn test_render_escapes_title() {
        let mut fig = Figure::new("HD <209458> b & co", "Phase (day)", "Flux", (-0.1, 0.1));
        fig.scatter("Folded", &[(0.0, 1.0), (0.01, 0.98)], 0.3).unwrap();
        let svg = SvgRenderer::default().render(&fig);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("HD &lt;209458&gt; b &amp; co"));
        assert_eq!(svg.matches(r#"r="1.5""#).count(), 2);
    }
}
