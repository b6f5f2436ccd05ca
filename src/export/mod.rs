//! Worksheet Word-document export pipeline.
//!
//! Each submodule implements exactly one stage, so every stage is
//! independently testable:
//!
//! ```text
//! rows ──▶ prepare ──▶ assemble ──▶ pack
//! (store)  (fetch+PNG)  (docx tree)  (bytes)
//! ```
//!
//! 1. [`Row`] values come from [`crate::db::Storage::piece_rows`], already
//!    ordered by their `seq` column.
//! 2. [`prepare_images`] fans the per-URL downloads out with bounded
//!    concurrency and re-joins results by row index, so the document order
//!    never depends on network completion order.
//! 3. [`assemble`](assemble::assemble) builds the paginated docx tree.
//! 4. [`filename`] derives the attachment filename for the response.

pub mod assemble;
pub mod filename;
pub mod normalize;

use futures::stream::{self, StreamExt};

use crate::config::AppConfig;
use normalize::{ImageBounds, PreparedImage};

/// One problem/solution URL pair, ordered by `seq` ascending.
#[derive(Debug, Clone)]
pub struct Row {
    pub seq: i64,
    pub problem_url: Option<String>,
    pub solution_url: Option<String>,
}

/// What ends up inside one worksheet cell. A cell is exactly one of these;
/// it never mixes an image with a placeholder.
#[derive(Debug)]
pub enum CellContent {
    /// Normalized PNG, embedded at its prepared dimensions.
    Image(PreparedImage),
    /// The row had no URL for this side.
    Missing,
    /// A URL was present but the fetch or decode failed.
    Failed,
}

/// Prepared contents for one section: left (problem) and right (solution).
#[derive(Debug)]
pub struct SectionImages {
    pub problem: CellContent,
    pub solution: CellContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Problem,
    Solution,
}

/// Download and normalize every referenced image, with bounded fan-out.
///
/// One job is spawned per present URL; the `(row index, side)` key is
/// threaded through the unordered stream and results are re-joined by that
/// key afterwards. A job that fails leaves its cell as [`CellContent::Failed`];
/// a side with no URL at all stays [`CellContent::Missing`]. Nothing here
/// can fail the export.
pub async fn prepare_images(
    client: &reqwest::Client,
    rows: &[Row],
    config: &AppConfig,
) -> Vec<SectionImages> {
    let bounds = ImageBounds {
        max_width: config.max_image_width,
        max_height: config.max_image_height,
    };

    let mut sections: Vec<SectionImages> = rows
        .iter()
        .map(|row| SectionImages {
            // Present URLs start as Failed and are upgraded on success.
            problem: pending_cell(row.problem_url.is_some()),
            solution: pending_cell(row.solution_url.is_some()),
        })
        .collect();

    // Materialized up front: a lazy iterator borrowing `rows` trips the
    // higher-ranked lifetime check when this future runs inside an axum
    // handler.
    let jobs: Vec<(usize, Side, String)> = rows
        .iter()
        .enumerate()
        .flat_map(|(index, row)| {
            let problem = row.problem_url.clone().map(|url| (index, Side::Problem, url));
            let solution = row.solution_url.clone().map(|url| (index, Side::Solution, url));
            problem.into_iter().chain(solution)
        })
        .collect();

    let fetched: Vec<(usize, Side, Option<PreparedImage>)> =
        stream::iter(jobs.into_iter().map(|(index, side, url)| {
            let client = client.clone();
            async move {
                let image = normalize::fetch_prepared(&client, &url, bounds).await;
                (index, side, image)
            }
        }))
        .buffer_unordered(config.fetch_concurrency.max(1))
        .collect()
        .await;

    for (index, side, image) in fetched {
        if let Some(image) = image {
            let section = &mut sections[index];
            match side {
                Side::Problem => section.problem = CellContent::Image(image),
                Side::Solution => section.solution = CellContent::Image(image),
            }
        }
    }

    sections
}

fn pending_cell(has_url: bool) -> CellContent {
    if has_url {
        CellContent::Failed
    } else {
        CellContent::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig::default()
    }

    #[tokio::test]
    async fn absent_urls_stay_missing_without_any_fetch() {
        // No URLs at all: the client is never used, so an unroutable base
        // URL cannot matter.
        let rows = vec![
            Row { seq: 1, problem_url: None, solution_url: None },
            Row { seq: 2, problem_url: None, solution_url: None },
        ];
        let client = reqwest::Client::new();
        let sections = prepare_images(&client, &rows, &config()).await;
        assert_eq!(sections.len(), 2);
        assert!(matches!(sections[0].problem, CellContent::Missing));
        assert!(matches!(sections[1].solution, CellContent::Missing));
    }

    #[tokio::test]
    async fn unreachable_url_degrades_to_failed() {
        // Reserved TEST-NET address; connection fails fast and the cell
        // degrades instead of erroring.
        let rows = vec![Row {
            seq: 1,
            problem_url: Some("http://192.0.2.1:9/p.png".into()),
            solution_url: None,
        }];
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(500))
            .build()
            .unwrap();
        let sections = prepare_images(&client, &rows, &config()).await;
        assert!(matches!(sections[0].problem, CellContent::Failed));
        assert!(matches!(sections[0].solution, CellContent::Missing));
    }
}
