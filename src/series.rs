use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// 数据集里的三个累计计数列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Confirmed,
    Recovered,
    Deaths,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Confirmed, Metric::Recovered, Metric::Deaths];

    /// CSV 中的列名
    pub fn column(&self) -> &'static str {
        match self {
            Metric::Confirmed => "Confirmed",
            Metric::Recovered => "Recovered",
            Metric::Deaths => "Deaths",
        }
    }

    /// 一阶差分后的序列名
    pub fn rate_label(&self) -> &'static str {
        match self {
            Metric::Confirmed => "Infection Rate",
            Metric::Recovered => "Recovery Rate",
            Metric::Deaths => "Deaths Rate",
        }
    }
}

/// 某个国家某一天的累计数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Observation {
    pub country: String,
    pub date: NaiveDate,
    pub confirmed: u64,
    pub recovered: u64,
    pub deaths: u64,
}

impl Observation {
    pub fn count(&self, metric: Metric) -> u64 {
        match metric {
            Metric::Confirmed => self.confirmed,
            Metric::Recovered => self.recovered,
            Metric::Deaths => self.deaths,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub date: NaiveDate,
    pub value: f64,
}

/// 带名字的按日期排列的数值序列，折线图的一条线
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub name: String,
    pub points: Vec<Point>,
}

/// 累计序列的一阶差分，第一个点被丢掉
pub type DerivedSeries = TimeSeries;

impl TimeSeries {
    pub fn new(name: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// delta[i] = cumulative[i + 1] - cumulative[i]
    pub fn first_difference(name: impl Into<String>, cumulative: &[Point]) -> DerivedSeries {
        let points = cumulative
            .windows(2)
            .map(|w| Point {
                date: w[1].date,
                value: w[1].value - w[0].value,
            })
            .collect();
        Self::new(name, points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn max(&self) -> Option<f64> {
        self.values()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
    }

    /// 每个值除以序列自身的最大值
    ///
    /// 不是幂等的：只有最大值已经是 1 时再做一次才不会改变结果
    pub fn normalize(&self) -> Result<DerivedSeries> {
        let max = match self.max() {
            Some(max) if max != 0.0 => max,
            other => {
                return Err(PipelineError::ArithmeticUndefined {
                    series: self.name.clone(),
                    max: other.unwrap_or(f64::NAN),
                })
            }
        };
        let points = self
            .points
            .iter()
            .map(|p| Point {
                date: p.date,
                value: p.value / max,
            })
            .collect();
        Ok(Self::new(self.name.clone(), points))
    }
}

/// 单个国家的全部行，按日期升序
#[derive(Debug, Clone)]
pub struct CountrySlice {
    country: String,
    rows: Vec<Observation>,
}

impl CountrySlice {
    pub fn new(country: impl Into<String>, mut rows: Vec<Observation>) -> Self {
        rows.sort_by_key(|o| o.date);
        Self {
            country: country.into(),
            rows,
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn rows(&self) -> &[Observation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 原始累计列
    pub fn cumulative(&self, metric: Metric) -> TimeSeries {
        let points = self
            .rows
            .iter()
            .map(|o| Point {
                date: o.date,
                value: o.count(metric) as f64,
            })
            .collect();
        TimeSeries::new(metric.column(), points)
    }

    pub fn delta(&self, metric: Metric) -> DerivedSeries {
        DerivedSeries::first_difference(metric.rate_label(), &self.cumulative(metric).points)
    }
}
