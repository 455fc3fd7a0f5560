//! Linear box-office predictor
//!
//! Each movie becomes one feature row: numeric year, dummy-encoded country
//! and genre, and its actor and director counts. The model is ordinary
//! least squares with an intercept, fitted on every movie that has a
//! recorded box office. Rank-deficient designs (a constant column, a genre
//! seen once) resolve to the minimum-norm coefficients.

use linfa_linalg::eigh::Eigh;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::debug;

use crate::db::models::{Movie, Role};
use crate::db::{movies, relations};
use crate::{Error, Result};

/// Eigenvalues below this fraction of the largest one count as zero
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub movie: Movie,
    pub predicted: f64,
    /// The movie's own box office when it has one
    pub recorded: Option<f64>,
    pub training_rows: usize,
    /// Column names of the design matrix, in order
    pub features: Vec<String>,
}

impl Prediction {
    pub fn notice(&self) -> &'static str {
        if self.recorded.is_some() {
            "This movie already has a box office record"
        } else {
            "This movie has no box office record yet"
        }
    }
}

/// Raw per-movie inputs before dummy encoding
#[derive(Debug, Clone)]
struct Observation {
    year: f64,
    country: Option<String>,
    genre: Option<String>,
    actors: f64,
    directors: f64,
}

/// Plain integer years only; `inf`, `NaN` and `1e3` are not years
fn parse_year(movie: &Movie) -> Option<f64> {
    let year = movie.year.as_deref()?.trim();
    if year.is_empty() || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    year.parse::<u16>().ok().map(f64::from)
}

async fn observe(pool: &SqlitePool, movie: &Movie, year: f64) -> Result<Observation> {
    Ok(Observation {
        year,
        country: movie.country.clone(),
        genre: movie.genre.clone(),
        actors: relations::count_relations(pool, movie.id, Role::Actor).await? as f64,
        directors: relations::count_relations(pool, movie.id, Role::Director).await? as f64,
    })
}

/// Sorted categories minus the last one; a missing value encodes as all zeros
fn dummy_levels<'a>(values: impl Iterator<Item = &'a Option<String>>) -> Vec<String> {
    let mut levels: Vec<String> = values
        .flatten()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    levels.pop();
    levels
}

/// Shared column layout for training rows and the target row
struct Encoder {
    countries: Vec<String>,
    genres: Vec<String>,
}

impl Encoder {
    fn fit(rows: &[Observation]) -> Self {
        Self {
            countries: dummy_levels(rows.iter().map(|r| &r.country)),
            genres: dummy_levels(rows.iter().map(|r| &r.genre)),
        }
    }

    /// year, dummies, actors, directors
    fn width(&self) -> usize {
        self.countries.len() + self.genres.len() + 3
    }

    fn feature_names(&self) -> Vec<String> {
        let mut names = vec!["year".to_string()];
        names.extend(self.countries.iter().map(|c| format!("country={}", c)));
        names.extend(self.genres.iter().map(|g| format!("genre={}", g)));
        names.push("actors".to_string());
        names.push("directors".to_string());
        names
    }

    fn encode(&self, row: &Observation) -> Array1<f64> {
        let indicator = |levels: &[String], value: &Option<String>| {
            levels
                .iter()
                .map(|level| (value.as_deref() == Some(level.as_str())) as u8 as f64)
                .collect::<Vec<_>>()
        };

        let mut x = vec![row.year];
        x.extend(indicator(&self.countries, &row.country));
        x.extend(indicator(&self.genres, &row.genre));
        x.push(row.actors);
        x.push(row.directors);
        Array1::from(x)
    }
}

/// Fitted `y = intercept + coefficients · x`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Array1<f64>,
}

impl LinearModel {
    /// Least-squares fit with intercept
    ///
    /// Columns are centered, then the normal equations are solved through
    /// the pseudo-inverse of `XᵀX`, which gives the minimum-norm solution
    /// when columns are collinear.
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<Self> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(Error::InvalidInput(format!(
                "Cannot fit {} rows against {} targets",
                x.nrows(),
                y.len()
            )));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::Internal("Empty design matrix".to_string()))?;
        let y_mean = y.sum() / y.len() as f64;

        let centered = &x - &x_mean;
        let dy = &y - y_mean;
        let xtx = centered.t().dot(&centered);
        let xty = centered.t().dot(&dy);

        let coefficients = pseudo_solve(&xtx, &xty)?;
        let intercept = y_mean - coefficients.dot(&x_mean);

        Ok(Self {
            intercept,
            coefficients,
        })
    }

    pub fn predict(&self, x: ArrayView1<'_, f64>) -> f64 {
        self.intercept + self.coefficients.dot(&x)
    }
}

/// Minimum-norm solution of the symmetric system `a · β = b`
fn pseudo_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    if b.is_empty() {
        return Ok(Array1::zeros(0));
    }

    let (eigenvalues, vectors) = a
        .eigh()
        .map_err(|e| Error::Internal(format!("Eigendecomposition failed: {}", e)))?;

    let largest = eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if largest == 0.0 {
        return Ok(Array1::zeros(b.len()));
    }

    let projections = vectors.t().dot(b);
    let scaled: Array1<f64> = projections
        .iter()
        .zip(eigenvalues.iter())
        .map(|(p, lambda)| {
            if lambda.abs() <= largest * RANK_TOLERANCE {
                0.0
            } else {
                p / lambda
            }
        })
        .collect();

    Ok(vectors.dot(&scaled))
}

/// Predict a movie's box office from every movie that has one
pub async fn predict_box_office(pool: &SqlitePool, movie_id: i64) -> Result<Prediction> {
    let target = movies::get_movie(pool, movie_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Movie {} not found", movie_id)))?;
    let target_year = parse_year(&target).ok_or_else(|| {
        Error::InvalidInput(format!("Movie {} has no numeric year", movie_id))
    })?;

    let mut rows = Vec::new();
    let mut y = Vec::new();
    for movie in movies::list_movies(pool).await? {
        let Some(box_office) = movie.recorded_box_office() else {
            continue;
        };
        let Some(year) = parse_year(&movie) else {
            debug!("Skipping movie {} with non-numeric year", movie.id);
            continue;
        };
        rows.push(observe(pool, &movie, year).await?);
        y.push(box_office);
    }

    if rows.is_empty() {
        return Err(Error::InvalidInput(
            "No movies with a box office record to learn from".to_string(),
        ));
    }

    let target_row = observe(pool, &target, target_year).await?;
    let mut all_rows = rows.clone();
    all_rows.push(target_row.clone());
    let encoder = Encoder::fit(&all_rows);

    let mut x = Array2::<f64>::zeros((rows.len(), encoder.width()));
    for (mut line, row) in x.rows_mut().into_iter().zip(&rows) {
        line.assign(&encoder.encode(row));
    }
    let model = LinearModel::fit(x.view(), Array1::from(y).view())?;
    let predicted = model.predict(encoder.encode(&target_row).view());

    debug!(
        "Predicted movie {} from {} rows: {:.4}",
        movie_id,
        rows.len(),
        predicted
    );

    Ok(Prediction {
        recorded: target.recorded_box_office(),
        movie: target,
        predicted,
        training_rows: rows.len(),
        features: encoder.feature_names(),
    })
}
