//! Box-office analytics
//!
//! - [`rank`]: a movie's percentile position inside its genre
//! - [`boxplot`]: per-genre distribution statistics and SVG rendering
//! - [`regression`]: least-squares box-office predictor

pub mod boxplot;
pub mod rank;
pub mod regression;

pub use boxplot::{genre_boxes, render_svg, BoxStats, GenreBox, UNKNOWN_GENRE};
pub use rank::{genre_rank, rank_in_genre};
pub use regression::{predict_box_office, Prediction};
