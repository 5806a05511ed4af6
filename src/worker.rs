//! Run the blocking pipeline off an interactive host's event loop
//!
//! The core API is synchronous. These helpers move a visualize call onto
//! tokio's blocking pool so a UI thread is never stalled by a large read.
//! Cancelling is just dropping the future: the pipeline performs no writes,
//! so an abandoned request leaves nothing behind.

use crate::catalog::Dataset;
use crate::data_source::GridSource;
use crate::errors::{NcSliceError, Result};
use crate::pipeline::{visualize, SliceRequest, VisualizeOptions};
use crate::visualization::VisualizationRequest;
use futures::future::join_all;
use std::sync::Arc;

/// Visualize one request on the blocking pool.
pub async fn visualize_in_background<S>(
    dataset: Arc<Dataset<S>>,
    request: SliceRequest,
    options: VisualizeOptions,
) -> Result<VisualizationRequest>
where
    S: GridSource + Send + Sync + 'static,
{
    tokio::task::spawn_blocking(move || visualize(&dataset, &request, &options))
        .await
        .map_err(|e| NcSliceError::Worker(e.to_string()))?
}

/// Visualize several requests concurrently against one dataset.
///
/// Each request performs its own independent read. Results come back in
/// request order; one failure does not affect the others.
pub async fn visualize_all<S>(
    dataset: Arc<Dataset<S>>,
    requests: Vec<SliceRequest>,
    options: VisualizeOptions,
) -> Vec<Result<VisualizationRequest>>
where
    S: GridSource + Send + Sync + 'static,
{
    let tasks = requests.into_iter().map(|request| {
        visualize_in_background(Arc::clone(&dataset), request, options.clone())
    });
    join_all(tasks).await
}
