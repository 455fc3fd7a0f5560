//! Per-genre box-office distribution
//!
//! Statistics follow the usual boxplot conventions: quartiles by linear
//! interpolation between closest ranks, whiskers at the most extreme data
//! points within 1.5 × IQR of the box, everything beyond drawn as fliers.

use plotters::prelude::*;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::models::Movie;
use crate::db::movies;
use crate::{Error, Result};

const WHISKER_IQR: f64 = 1.5;

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 600;
const BOX_HALF_WIDTH: f64 = 0.25;
const MEDIAN_COLOR: RGBColor = RGBColor(255, 165, 0);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub count: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub fliers: Vec<f64>,
}

impl BoxStats {
    /// `None` for an empty sample
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 0.25);
        let median = percentile(&sorted, 0.5);
        let q3 = percentile(&sorted, 0.75);
        let iqr = q3 - q1;
        let low_fence = q1 - WHISKER_IQR * iqr;
        let high_fence = q3 + WHISKER_IQR * iqr;

        let inside: Vec<f64> = sorted
            .iter()
            .copied()
            .filter(|v| *v >= low_fence && *v <= high_fence)
            .collect();
        let fliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect();

        Some(Self {
            count: sorted.len(),
            q1,
            median,
            q3,
            whisker_low: inside.first().copied().unwrap_or(q1),
            whisker_high: inside.last().copied().unwrap_or(q3),
            fliers,
        })
    }

    fn extent(&self) -> (f64, f64) {
        self.fliers
            .iter()
            .fold((self.whisker_low, self.whisker_high), |(lo, hi), v| {
                (lo.min(*v), hi.max(*v))
            })
    }
}

/// Linear-interpolated percentile of sorted data, `p` in [0, 1]
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = p * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreBox {
    pub genre: String,
    pub values: Vec<f64>,
    pub stats: Option<BoxStats>,
}

impl GenreBox {
    pub fn new(genre: impl Into<String>, values: Vec<f64>) -> Self {
        let stats = BoxStats::from_values(&values);
        Self {
            genre: genre.into(),
            values,
            stats,
        }
    }
}

/// Label of the group collecting movies without a genre
pub const UNKNOWN_GENRE: &str = "Unknown";

/// One box per distinct genre (sorted), over recorded box-office values
///
/// Movies without a genre form a trailing [`UNKNOWN_GENRE`] group.
pub async fn genre_boxes(pool: &SqlitePool) -> Result<Vec<GenreBox>> {
    let mut boxes = Vec::new();
    for genre in movies::list_genres(pool).await? {
        let values = recorded_values(&movies::movies_in_genre(pool, Some(&genre)).await?);
        boxes.push(GenreBox::new(genre, values));
    }

    let untyped = movies::movies_in_genre(pool, None).await?;
    if !untyped.is_empty() {
        boxes.push(GenreBox::new(UNKNOWN_GENRE, recorded_values(&untyped)));
    }

    Ok(boxes)
}

fn recorded_values(movies: &[Movie]) -> Vec<f64> {
    movies.iter().filter_map(Movie::recorded_box_office).collect()
}

fn draw_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> Error {
    Error::Internal(format!("Failed to render boxplot: {}", err))
}

/// Value range covering every whisker and flier, padded by 5%
fn value_range(boxes: &[GenreBox]) -> (f64, f64) {
    let (lo, hi) = boxes
        .iter()
        .filter_map(|b| b.stats.as_ref())
        .map(BoxStats::extent)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (l, h)| {
            (lo.min(l), hi.max(h))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

/// Render the boxes side by side as SVG, box `i` centered at x = i + 1
pub fn render_svg(boxes: &[GenreBox]) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;

        let slots = boxes.len() as f64 + 1.0;
        let key_points: Vec<f64> = (1..=boxes.len()).map(|i| i as f64).collect();
        let (lo, hi) = value_range(boxes);

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((0f64..slots).with_key_points(key_points), lo..hi)
            .map_err(draw_error)?;

        let label_of = |x: &f64| {
            let index = x.round() as usize;
            index
                .checked_sub(1)
                .and_then(|i| boxes.get(i))
                .map(|b| b.genre.clone())
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_mesh()
            .x_label_formatter(&label_of)
            .y_label_formatter(&|v: &f64| format!("{:.2}", v))
            .y_desc("Box office (100M CNY)")
            .draw()
            .map_err(draw_error)?;

        for (i, genre_box) in boxes.iter().enumerate() {
            let Some(stats) = &genre_box.stats else {
                continue;
            };
            let x = i as f64 + 1.0;
            let (left, right) = (x - BOX_HALF_WIDTH, x + BOX_HALF_WIDTH);
            let (cap_left, cap_right) = (x - BOX_HALF_WIDTH / 2.0, x + BOX_HALF_WIDTH / 2.0);

            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(left, stats.q1), (right, stats.q3)],
                    BLACK.stroke_width(1),
                )))
                .map_err(draw_error)?;

            let lines = vec![
                vec![(x, stats.whisker_low), (x, stats.q1)],
                vec![(x, stats.q3), (x, stats.whisker_high)],
                vec![(cap_left, stats.whisker_low), (cap_right, stats.whisker_low)],
                vec![(cap_left, stats.whisker_high), (cap_right, stats.whisker_high)],
            ];
            chart
                .draw_series(
                    lines
                        .into_iter()
                        .map(|points| PathElement::new(points, BLACK.stroke_width(1))),
                )
                .map_err(draw_error)?;

            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(left, stats.median), (right, stats.median)],
                    MEDIAN_COLOR.stroke_width(2),
                )))
                .map_err(draw_error)?;

            chart
                .draw_series(
                    stats
                        .fliers
                        .iter()
                        .map(|v| Circle::new((x, *v), 4, BLACK.stroke_width(1))),
                )
                .map_err(draw_error)?;
        }

        root.present().map_err(draw_error)?;
    }
    Ok(svg)
}
