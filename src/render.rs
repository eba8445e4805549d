use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::fs;
use tracing::info;

use crate::chart::{ChartSpec, Trace};
use crate::error::Result;

const DATE_FORMAT: &str = "%Y-%m-%d";
const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.27.0.min.js";
// plotly 默认的离散配色
const PALETTE: [&str; 10] = [
    "#636efa", "#EF553B", "#00cc96", "#ab63fa", "#FFA15A", "#19d3f3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

/// 把图表描述变成可以查看的产物，和图表构造分开
#[async_trait]
pub trait Render {
    /// `index` 是图表在报告里的序号，用来生成文件名
    async fn render(&self, index: usize, chart: &ChartSpec) -> Result<PathBuf>;
}

/// 每张图一个独立的 HTML 页面，plotly.js 从 CDN 加载
#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    out_dir: PathBuf,
}

impl HtmlRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }
}

#[async_trait]
impl Render for HtmlRenderer {
    async fn render(&self, index: usize, chart: &ChartSpec) -> Result<PathBuf> {
        let figure = plotly_figure(chart).to_string().replace("</", "<\\/");
        let page = [
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>",
            escape_html(&chart.title).as_str(),
            "</title>\n<script src=\"",
            PLOTLY_JS,
            "\"></script>\n</head>\n<body>\n<div id=\"chart\" style=\"width:100%;height:90vh;\"></div>\n<script>\nconst fig = ",
            figure.as_str(),
            ";\nPlotly.newPlot('chart', fig.data, fig.layout).then(function () {\n  if (fig.frames.length) { Plotly.addFrames('chart', fig.frames); }\n});\n</script>\n</body>\n</html>\n",
        ]
        .concat();
        write_artifact(&self.out_dir, index, chart, "html", page).await
    }
}

/// 直接输出图表描述本身
#[derive(Debug, Clone)]
pub struct JsonRenderer {
    out_dir: PathBuf,
}

impl JsonRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }
}

#[async_trait]
impl Render for JsonRenderer {
    async fn render(&self, index: usize, chart: &ChartSpec) -> Result<PathBuf> {
        let body = serde_json::to_string_pretty(chart).map_err(std::io::Error::from)?;
        write_artifact(&self.out_dir, index, chart, "json", body).await
    }
}

async fn write_artifact(
    dir: &Path,
    index: usize,
    chart: &ChartSpec,
    ext: &str,
    body: String,
) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.{}", file_stem(index, &chart.title), ext));
    fs::write(&path, body).await?;
    info!("wrote {:?} to {}", chart.title, path.display());
    Ok(path)
}

/// "03-global-maximum-infection-rate"
pub(crate) fn file_stem(index: usize, title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    format!("{:02}-{}", index, slug.trim_matches('-'))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 转成 plotly 的 figure JSON：`{data, layout, frames}`
pub fn plotly_figure(chart: &ChartSpec) -> Value {
    let mut data = Vec::new();
    let mut frames = Vec::new();
    let mut sliders = Vec::new();
    let mut menus = Vec::new();

    for trace in &chart.traces {
        match trace {
            Trace::Line { series } => {
                let x: Vec<String> = series
                    .points
                    .iter()
                    .map(|p| p.date.format(DATE_FORMAT).to_string())
                    .collect();
                let y: Vec<f64> = series.values().collect();
                data.push(json!({
                    "type": "scatter",
                    "mode": "lines",
                    "name": series.name,
                    "x": x,
                    "y": y,
                }));
            }
            Trace::Bar { categories, values } => {
                let colors: Vec<&str> = (0..categories.len())
                    .map(|i| PALETTE[i % PALETTE.len()])
                    .collect();
                data.push(json!({
                    "type": "bar",
                    "x": categories,
                    "y": values,
                    "marker": { "color": colors },
                }));
            }
            Trace::Choropleth { metric, frames: by_date } => {
                // 所有帧共用一个色阶
                let zmax = by_date
                    .iter()
                    .flat_map(|f| f.values.iter().copied())
                    .fold(0.0, f64::max);
                let labels: Vec<String> = by_date
                    .iter()
                    .map(|f| f.date.format(DATE_FORMAT).to_string())
                    .collect();

                if let Some(first) = by_date.first() {
                    data.push(json!({
                        "type": "choropleth",
                        "locationmode": "country names",
                        "locations": first.locations,
                        "z": first.values,
                        "zmin": 0,
                        "zmax": zmax,
                        "colorbar": { "title": { "text": metric.column() } },
                    }));
                }
                for (frame, label) in by_date.iter().zip(&labels) {
                    frames.push(json!({
                        "name": label,
                        "data": [{
                            "type": "choropleth",
                            "locationmode": "country names",
                            "locations": frame.locations,
                            "z": frame.values,
                        }],
                    }));
                }
                let steps: Vec<Value> = labels
                    .iter()
                    .map(|label| {
                        json!({
                            "method": "animate",
                            "label": label,
                            "args": [[label], { "mode": "immediate", "frame": { "duration": 0, "redraw": true } }],
                        })
                    })
                    .collect();
                sliders.push(json!({ "currentvalue": { "prefix": "Date=" }, "steps": steps }));
                menus.push(json!({
                    "type": "buttons",
                    "buttons": [{
                        "label": "Play",
                        "method": "animate",
                        "args": [null, { "frame": { "duration": 100, "redraw": true }, "fromcurrent": true }],
                    }],
                }));
            }
        }
    }

    let shapes: Vec<Value> = chart
        .shapes
        .iter()
        .map(|s| {
            let x = s.x.format(DATE_FORMAT).to_string();
            json!({
                "type": "line",
                "x0": x,
                "x1": x,
                "y0": s.y0,
                "y1": s.y1,
                "line": { "color": s.color.as_str(), "width": s.width },
            })
        })
        .collect();
    let annotations: Vec<Value> = chart
        .annotations
        .iter()
        .map(|a| {
            json!({
                "x": a.x.format(DATE_FORMAT).to_string(),
                "y": a.y,
                "text": a.text,
                "showarrow": true,
            })
        })
        .collect();

    let mut layout = json!({
        "title": { "text": chart.title },
        "shapes": shapes,
        "annotations": annotations,
        "sliders": sliders,
        "updatemenus": menus,
    });
    if chart.log_y {
        layout["yaxis"] = json!({ "type": "log" });
    }

    json!({ "data": data, "layout": layout, "frames": frames })
}
