// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Sparkline image rendering.
//!
//! Sparklines are emitted as small standalone SVG documents. The output is a
//! pure function of the series and the options so identical inputs always
//! produce byte-identical images, which keeps cached badges stable.

use std::fmt::Write as _;

use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Height of the drawing area in pixels.
const HEIGHT: u32 = 20;

/// Shape used to draw each data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SparklineStyle {
    /// One vertical bar per point, rising from the baseline.
    #[default]
    Impulse,
    /// A polyline joining consecutive points.
    Line
}

/// Rendering options for [`render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparklineOptions {
    /// Drawing style.
    pub style:        SparklineStyle,
    /// Bar width or line thickness in pixels.
    pub stroke_width: u32,
    /// Value mapped to the baseline.
    pub min:          u32,
    /// Value mapped to the top edge.
    pub max:          u32,
    /// Any CSS colour understood by SVG renderers.
    pub color:        &'static str
}

impl SparklineOptions {
    /// Impulse chart scaled from zero to the series maximum.
    pub fn impulse(series: &[u32]) -> Self {
        Self {
            style:        SparklineStyle::Impulse,
            stroke_width: 3,
            min:          0,
            max:          series.iter().copied().max().unwrap_or_default(),
            color:        "SlateGray"
        }
    }
}

/// Renders `series` as an SVG document.
///
/// Values are clamped to `options.min..=options.max`. When the range is empty
/// every point is drawn on the baseline.
///
/// # Example
///
/// ```
/// use ghbadge::{SparklineOptions, render_sparkline};
///
/// let series = [0, 1, 4, 2];
/// let svg = render_sparkline(&series, &SparklineOptions::impulse(&series));
/// assert!(svg.starts_with(b"<svg"));
/// ```
pub fn render(series: &[u32], options: &SparklineOptions) -> Vec<u8> {
    let stroke = options.stroke_width.max(1);
    let step = stroke + 1;
    let count = u32::try_from(series.len()).unwrap_or(u32::MAX);
    let width = count.saturating_mul(step).max(1);

    let mut buffer = String::with_capacity(128 + series.len() * 64);
    let _ = write!(
        buffer,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{HEIGHT}\" viewBox=\"0 0 {width} {HEIGHT}\">"
    );

    match options.style {
        SparklineStyle::Impulse => {
            for (index, value) in series.iter().enumerate() {
                let x = index as u32 * step;
                let bar = scale(*value, options).max(1.0);
                let y = f64::from(HEIGHT) - bar;
                let _ = write!(
                    buffer,
                    "<rect x=\"{x}\" y=\"{y:.1}\" width=\"{stroke}\" height=\"{bar:.1}\" fill=\"{}\"/>",
                    options.color
                );
            }
        }
        SparklineStyle::Line => {
            let points: Vec<String> = series
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    let x = f64::from(index as u32 * step) + f64::from(stroke) / 2.0;
                    let y = f64::from(HEIGHT) - scale(*value, options);
                    format!("{x:.1},{y:.1}")
                })
                .collect();
            let _ = write!(
                buffer,
                "<polyline points=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{stroke}\"/>",
                points.join(" "),
                options.color
            );
        }
    }

    buffer.push_str("</svg>");
    buffer.into_bytes()
}

/// Encodes rendered image bytes as a `data:` URI for inline embedding.
pub fn data_uri(image: &[u8]) -> String {
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(image))
}

fn scale(value: u32, options: &SparklineOptions) -> f64 {
    if options.max <= options.min {
        return 0.0;
    }

    let clamped = value.clamp(options.min, options.max);
    f64::from(clamped - options.min) / f64::from(options.max - options.min) * f64::from(HEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_str(series: &[u32], options: &SparklineOptions) -> String {
        String::from_utf8(render(series, options)).expect("svg is utf-8")
    }

    #[test]
    fn impulse_defaults_follow_series_maximum() {
        let options = SparklineOptions::impulse(&[0, 3, 1]);
        assert_eq!(options.max, 3);
        assert_eq!(options.min, 0);
        assert_eq!(options.stroke_width, 3);
        assert_eq!(options.style, SparklineStyle::Impulse);
    }

    #[test]
    fn impulse_draws_one_bar_per_point() {
        let series = [0, 0, 0, 0, 0, 0, 0, 3, 0, 0];
        let svg = render_str(&series, &SparklineOptions::impulse(&series));

        assert_eq!(svg.matches("<rect").count(), 10);
        assert!(svg.contains("width=\"40\""));
        assert!(svg.contains("x=\"28\" y=\"0.0\" width=\"3\" height=\"20.0\""));
    }

    #[test]
    fn zero_range_renders_baseline() {
        let series = [0; 10];
        let svg = render_str(&series, &SparklineOptions::impulse(&series));

        assert_eq!(svg.matches("height=\"1.0\"").count(), 10);
    }

    #[test]
    fn values_are_clamped_to_bounds() {
        let options = SparklineOptions {
            max: 2,
            ..SparklineOptions::impulse(&[])
        };
        assert!((scale(10, &options) - f64::from(HEIGHT)).abs() < f64::EPSILON);
        assert!(scale(0, &options).abs() < f64::EPSILON);
    }

    #[test]
    fn line_style_emits_polyline() {
        let options = SparklineOptions {
            style: SparklineStyle::Line,
            ..SparklineOptions::impulse(&[1, 2])
        };
        let svg = render_str(&[1, 2], &options);

        assert!(svg.contains("<polyline points=\"1.5,10.0 5.5,0.0\""));
    }

    #[test]
    fn rendering_is_deterministic() {
        let series = [1, 5, 2, 0, 7];
        let options = SparklineOptions::impulse(&series);
        assert_eq!(render(&series, &options), render(&series, &options));
    }

    #[test]
    fn data_uri_is_base64_svg() {
        let uri = data_uri(b"<svg/>");
        assert_eq!(uri, "data:image/svg+xml;base64,PHN2Zy8+");
    }
}
