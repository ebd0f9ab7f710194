//! Republishes the grouped benchmark history while runs are being ingested.
//!
//! Readers get an `Arc` to a fully built [`PublishedView`]. An ingest appends
//! to the [`RecordStore`], rebuilds a new view without holding the view lock
//! and then swaps the `Arc` under a short write lock. A view that has been
//! handed out is never modified.

use std::{borrow::Borrow, collections::BTreeMap, sync::Arc};

use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::{
    aggregation,
    data::{BenchmarkOutput, Metric, Series},
    record_store::RecordStore,
};

/// Chart-ready values of one metric for one benchmark case.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub dates: Vec<String>,
    pub values: Vec<i64>,
}

#[derive(Debug, Default, PartialEq)]
pub struct PublishedView {
    pub series: Series,
    pub charts: BTreeMap<Metric, Vec<ChartSeries>>,
    /// Number of runs in the store when this view was built.
    pub outputs: usize,
    /// Runs that were left out because of a malformed date.
    pub skipped: usize,
}

impl PublishedView {
    pub fn build<O: Borrow<BenchmarkOutput>>(outputs: &[O]) -> PublishedView {
        let aggregate = aggregation::aggregate(outputs);

        let charts = Metric::ALL
            .into_iter()
            .map(|metric| (metric, chart_series(&aggregate.series, metric)))
            .collect();

        PublishedView {
            series: aggregate.series,
            charts,
            outputs: outputs.len(),
            skipped: aggregate.skipped,
        }
    }

    pub fn chart(&self, metric: Metric) -> &[ChartSeries] {
        self.charts.get(&metric).map(Vec::as_slice).unwrap_or_default()
    }
}

fn chart_series(series: &Series, metric: Metric) -> Vec<ChartSeries> {
    series
        .iter()
        .map(|(name, observations)| {
            let (dates, values) = observations
                .iter()
                .map(|o| (o.date.clone(), o.result.value(metric)))
                .unzip();
            ChartSeries {
                name: name.clone(),
                dates,
                values,
            }
        })
        .collect()
}

#[derive(Debug)]
pub struct SnapshotPublisher {
    store: RecordStore,
    current: RwLock<Arc<PublishedView>>,
    // Serializes ingests so that swaps happen in append order.
    ingest_lock: Mutex<()>,
}

impl SnapshotPublisher {
    /// Seeds the store with the persisted runs and publishes the first view.
    pub fn new(seed: Vec<BenchmarkOutput>) -> SnapshotPublisher {
        let store = RecordStore::with_outputs(seed);
        let view = PublishedView::build(&store.snapshot());
        info!(
            "Published initial view: {} runs, {} benchmark cases",
            view.outputs,
            view.series.len()
        );
        SnapshotPublisher {
            store,
            current: RwLock::new(Arc::new(view)),
            ingest_lock: Mutex::new(()),
        }
    }

    pub fn ingest(&self, output: BenchmarkOutput) {
        let _guard = self.ingest_lock.lock();

        debug!(
            "Ingesting run of commit '{}' with {} results",
            output.commit,
            output.results.len()
        );
        self.store.append(output);

        let view = Arc::new(PublishedView::build(&self.store.snapshot()));
        let (outputs, cases) = (view.outputs, view.series.len());

        *self.current.write() = view;
        info!("Published view: {outputs} runs, {cases} benchmark cases");
    }

    pub fn current_view(&self) -> Arc<PublishedView> {
        Arc::clone(&self.current.read())
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
