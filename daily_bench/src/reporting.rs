use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use anyhow::{Context, Result};
use itertools::Itertools;
use log::{info, warn};
use plotly::{common::Title, layout::Axis, Bar, Layout, Plot};

use crate::{
    data::Metric,
    defaults,
    publisher::{ChartSeries, PublishedView},
    storage,
};

/// Page layout shared by the served pages and written reports.
const DEFAULT_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{{TITLE}}</title>
    {{PLOTLY_HEAD}}
</head>
<body>
    <h1>{{TITLE}}</h1>
    {{NAV}}
    <h2>{{METRIC}}</h2>
    {{PLOTLY_BODY}}
</body>
</html>"#;

/// Path under which the history server publishes the charts of `metric`.
pub fn page_path(metric: Metric) -> &'static str {
    match metric {
        Metric::NsPerOp => "/",
        Metric::AllocsPerOp => "/alloc",
        Metric::BytesPerOp => "/bytes",
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn case_plot(chart: &ChartSeries, metric: Metric) -> Plot {
    let mut plot = Plot::new();
    plot.add_trace(
        Bar::new(chart.dates.clone(), chart.values.clone()).name(metric.label()),
    );
    plot.set_layout(
        Layout::new()
            .title(Title::from(chart.name.as_str()))
            .height(defaults::DEFAULT_CHART_HEIGHT)
            .y_axis(Axis::new().title(Title::from(metric.label()))),
    );
    plot
}

fn nav_links(current: Metric) -> String {
    let links = Metric::ALL
        .into_iter()
        .map(|metric| {
            if metric == current {
                format!("<b>{}</b>", metric.label())
            } else {
                format!("<a href=\"{}\">{}</a>", page_path(metric), metric.label())
            }
        })
        .join(" | ");
    format!("<nav>{links}</nav>")
}

fn render(view: &PublishedView, metric: Metric, title: &str, with_nav: bool) -> String {
    let charts = view.chart(metric);

    let plotly_body = if charts.is_empty() {
        "<p>No benchmark results.</p>".to_string()
    } else {
        charts
            .iter()
            .map(|chart| case_plot(chart, metric).to_inline_html(None))
            .join("\n")
    };

    let nav = if with_nav {
        nav_links(metric)
    } else {
        String::new()
    };

    DEFAULT_HTML_TEMPLATE
        .replace("{{TITLE}}", &escape_html(title))
        .replace("{{PLOTLY_HEAD}}", &Plot::online_cdn_js())
        .replace("{{NAV}}", &nav)
        .replace("{{METRIC}}", metric.label())
        .replace("{{PLOTLY_BODY}}", &plotly_body)
}

/// HTML page with one bar chart of `metric` per benchmark case.
pub fn render_page(view: &PublishedView, metric: Metric, title: &str) -> String {
    render(view, metric, title, true)
}

/// Writes the history of `data_dir` to `output`.
///
/// An output ending in `.json` receives the grouped series, anything else the
/// charts of `metric`. `-` writes to stdout.
pub fn report(data_dir: &Path, output: &Path, metric: Metric, title: &str) -> Result<()> {
    let outputs = storage::load_data_dir(data_dir)?;
    let view = PublishedView::build(&outputs);
    if view.skipped > 0 {
        warn!(
            "{} of {} runs have a malformed date and are not reported",
            view.skipped, view.outputs
        );
    }

    let content = if output.extension().is_some_and(|ext| ext == "json") {
        serde_json::to_vec_pretty(&view.series)?
    } else {
        render(&view, metric, title, false).into_bytes()
    };

    if output == Path::new("-") {
        io::stdout().write_all(&content)?;
    } else {
        fs::write(output, content)
            .with_context(|| format!("Failed to write report {}", output.display()))?;
        info!(
            "Wrote report of {} benchmark cases to {}",
            view.series.len(),
            output.display()
        );
    }
    Ok(())
}
