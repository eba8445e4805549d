use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::series::{Metric, Observation, TimeSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Choropleth,
    Line,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Red,
    Orange,
    Black,
    Green,
}

impl MarkerColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerColor::Red => "red",
            MarkerColor::Orange => "orange",
            MarkerColor::Black => "black",
            MarkerColor::Green => "green",
        }
    }
}

/// 注释文字的纵向位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// 参考序列的最大值处
    Top,
    /// y = 0
    Base,
    At(f64),
}

impl Default for Anchor {
    fn default() -> Self {
        Anchor::Top
    }
}

/// 手工标注的封城日期
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockdownMarker {
    pub date: NaiveDate,
    pub label: String,
    pub color: MarkerColor,
    #[serde(default = "default_width")]
    pub width: u8,
    #[serde(default)]
    pub anchor: Anchor,
}

fn default_width() -> u8 {
    2
}

impl LockdownMarker {
    pub fn new(date: NaiveDate, label: impl Into<String>, color: MarkerColor) -> Self {
        Self {
            date,
            label: label.into(),
            color,
            width: default_width(),
            anchor: Anchor::Top,
        }
    }

    pub fn width(mut self, width: u8) -> Self {
        self.width = width;
        self
    }

    pub fn anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }
}

/// 竖直参考线，从 y0 画到 y1
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shape {
    pub x: NaiveDate,
    pub y0: f64,
    pub y1: f64,
    pub color: MarkerColor,
    pub width: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub x: NaiveDate,
    pub y: f64,
    pub text: String,
}

/// 动画地图的一帧：某一天各国的数值
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoroplethFrame {
    pub date: NaiveDate,
    pub locations: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trace {
    Line {
        series: TimeSeries,
    },
    Bar {
        categories: Vec<String>,
        values: Vec<Option<f64>>,
    },
    Choropleth {
        metric: Metric,
        frames: Vec<ChoroplethFrame>,
    },
}

/// 图表描述，不依赖任何绘图库；渲染由 `Render` 完成
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub traces: Vec<Trace>,
    pub shapes: Vec<Shape>,
    pub annotations: Vec<Annotation>,
    pub log_y: bool,
}

impl ChartSpec {
    fn new(kind: ChartKind, title: impl Into<String>, traces: Vec<Trace>) -> Self {
        let spec = Self {
            kind,
            title: title.into(),
            traces,
            shapes: Vec::new(),
            annotations: Vec::new(),
            log_y: false,
        };
        debug!("built {:?} chart {:?}", spec.kind, spec.title);
        spec
    }

    /// 按日期分帧的世界地图
    pub fn choropleth(title: impl Into<String>, metric: Metric, rows: &[Observation]) -> Self {
        let mut by_date: BTreeMap<NaiveDate, ChoroplethFrame> = BTreeMap::new();
        for obs in rows {
            let frame = by_date.entry(obs.date).or_insert_with(|| ChoroplethFrame {
                date: obs.date,
                locations: Vec::new(),
                values: Vec::new(),
            });
            frame.locations.push(obs.country.clone());
            frame.values.push(obs.count(metric) as f64);
        }
        let frames = by_date.into_values().collect();
        Self::new(
            ChartKind::Choropleth,
            title,
            vec![Trace::Choropleth { metric, frames }],
        )
    }

    pub fn line(title: impl Into<String>, series: Vec<TimeSeries>) -> Self {
        let traces = series
            .into_iter()
            .map(|series| Trace::Line { series })
            .collect();
        Self::new(ChartKind::Line, title, traces)
    }

    pub fn bar(title: impl Into<String>, bars: &[(String, Option<f64>)]) -> Self {
        let (categories, values) = bars.iter().cloned().unzip();
        Self::new(
            ChartKind::Bar,
            title,
            vec![Trace::Bar { categories, values }],
        )
    }

    pub fn log_y(mut self) -> Self {
        self.log_y = true;
        self
    }

    /// 第一条折线的最大值，标注线画到这个高度
    pub fn reference_max(&self) -> f64 {
        self.traces
            .iter()
            .find_map(|t| match t {
                Trace::Line { series } => Some(series.max().unwrap_or(0.0)),
                _ => None,
            })
            .unwrap_or(0.0)
    }

    pub fn with_lockdown_markers(mut self, markers: &[LockdownMarker]) -> Self {
        let (shapes, annotations) = overlay_markers(markers, self.reference_max());
        self.shapes.extend(shapes);
        self.annotations.extend(annotations);
        self
    }
}

/// 每个标记生成一条竖线和一条注释
pub fn overlay_markers(markers: &[LockdownMarker], height: f64) -> (Vec<Shape>, Vec<Annotation>) {
    markers
        .iter()
        .map(|m| {
            let shape = Shape {
                x: m.date,
                y0: 0.0,
                y1: height,
                color: m.color,
                width: m.width,
            };
            let y = match m.anchor {
                Anchor::Top => height,
                Anchor::Base => 0.0,
                Anchor::At(y) => y,
            };
            let annotation = Annotation {
                x: m.date,
                y,
                text: m.label.clone(),
            };
            (shape, annotation)
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Point;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    fn obs(country: &str, d: u32, confirmed: u64, deaths: u64) -> Observation {
        Observation {
            country: country.into(),
            date: date(3, d),
            confirmed,
            recovered: 0,
            deaths,
        }
    }

    #[test]
    fn choropleth_has_one_frame_per_date_in_order() {
        let rows = vec![
            obs("Italy", 2, 10, 1),
            obs("China", 1, 50, 3),
            obs("Italy", 1, 4, 0),
        ];
        let chart = ChartSpec::choropleth("spread", Metric::Deaths, &rows);
        assert_eq!(chart.kind, ChartKind::Choropleth);

        let Trace::Choropleth { metric, frames } = &chart.traces[0] else {
            panic!("expected choropleth trace");
        };
        assert_eq!(*metric, Metric::Deaths);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].date, date(3, 1));
        assert_eq!(frames[0].locations, vec!["China", "Italy"]);
        assert_eq!(frames[0].values, vec![3.0, 0.0]);
        assert_eq!(frames[1].values, vec![1.0]);
    }

    #[test]
    fn markers_span_reference_series() {
        let series = TimeSeries::new(
            "Infection Rate",
            vec![
                Point { date: date(3, 8), value: 120.0 },
                Point { date: date(3, 9), value: 400.0 },
            ],
        );
        let markers = vec![
            LockdownMarker::new(date(3, 9), "start", MarkerColor::Red),
            LockdownMarker::new(date(4, 9), "end", MarkerColor::Orange)
                .width(3)
                .anchor(Anchor::Base),
            LockdownMarker::new(date(4, 26), "later", MarkerColor::Green).anchor(Anchor::At(0.95)),
        ];
        let chart = ChartSpec::line("Italy", vec![series]).with_lockdown_markers(&markers);

        assert_eq!(chart.shapes.len(), 3);
        assert!(chart.shapes.iter().all(|s| s.y0 == 0.0 && s.y1 == 400.0));
        assert_eq!(chart.shapes[1].width, 3);
        let ys: Vec<f64> = chart.annotations.iter().map(|a| a.y).collect();
        assert_eq!(ys, vec![400.0, 0.0, 0.95]);
        assert_eq!(chart.annotations[1].text, "end");
    }

    #[test]
    fn no_markers_no_overlays() {
        let chart = ChartSpec::line("empty", vec![]).with_lockdown_markers(&[]);
        assert!(chart.shapes.is_empty());
        assert!(chart.annotations.is_empty());
        assert_eq!(chart.reference_max(), 0.0);
    }

    #[test]
    fn bar_keeps_order_and_missing_values() {
        let chart = ChartSpec::bar(
            "Global Maximum Infection Rate",
            &[("Italy".into(), Some(6557.0)), ("Chad".into(), None)],
        )
        .log_y();
        assert!(chart.log_y);
        assert_eq!(
            chart.traces[0],
            Trace::Bar {
                categories: vec!["Italy".into(), "Chad".into()],
                values: vec![Some(6557.0), None],
            }
        );
    }
}
