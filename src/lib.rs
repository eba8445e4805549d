use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};

use chrono::NaiveDate;
use polars::frame::DataFrame;
use polars::prelude::{col, lit, IntoLazy};
use tracing::{debug, info};

use crate::fetcher::retrieve_data;
use crate::load::{detect_content, to_observation, Load, COUNTRY, DATE};

mod chart;
mod config;
mod error;
mod fetcher;
mod load;
mod render;
pub mod report;
mod series;

pub use chart::{
    overlay_markers, Anchor, Annotation, ChartKind, ChartSpec, ChoroplethFrame, LockdownMarker,
    MarkerColor, Shape, Trace,
};
pub use config::{Config, LockdownStudy};
pub use error::{PipelineError, Result};
pub use fetcher::Fetch;
pub use render::{plotly_figure, HtmlRenderer, JsonRenderer, Render};
pub use series::{CountrySlice, DerivedSeries, Metric, Observation, Point, TimeSeries};

/// 国家 × 日期 的累计数据表，行顺序保持源文件顺序
#[derive(Debug, Clone)]
pub struct Table(DataFrame);

impl Deref for Table {
    type Target = DataFrame;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Table {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// 数据集概况，对应 head / tail / shape
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub rows: usize,
    pub countries: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl Summary {
    pub fn from_rows(rows: &[Observation]) -> Self {
        let countries: HashSet<&str> = rows.iter().map(|o| o.country.as_str()).collect();
        Self {
            rows: rows.len(),
            countries: countries.len(),
            first_date: rows.iter().map(|o| o.date).min(),
            last_date: rows.iter().map(|o| o.date).max(),
        }
    }
}

// Table 内部方法
impl Table {
    pub(crate) fn new(df: DataFrame) -> Self {
        Self(df)
    }

    /// 直接从 CSV 文本构造
    pub fn from_csv(data: impl Into<String>) -> Result<Self> {
        detect_content(data.into()).load()
    }

    /// 去掉 Confirmed 为 0 的行（疫情爆发前的噪声）
    pub fn filter_confirmed(self) -> Result<Self> {
        let before = self.0.height();
        let df = self
            .0
            .lazy()
            .filter(col(Metric::Confirmed.column()).gt(lit(0)))
            .collect()?;
        debug!("kept {} of {} rows with Confirmed > 0", df.height(), before);
        Ok(Self(df))
    }

    pub fn observations(&self) -> Result<Vec<Observation>> {
        let country = self.0.column(COUNTRY)?.utf8()?;
        let date = self.0.column(DATE)?.utf8()?;
        let confirmed = self.0.column(Metric::Confirmed.column())?.i64()?;
        let recovered = self.0.column(Metric::Recovered.column())?.i64()?;
        let deaths = self.0.column(Metric::Deaths.column())?.i64()?;

        country
            .into_iter()
            .zip(date)
            .zip(confirmed)
            .zip(recovered)
            .zip(deaths)
            .enumerate()
            .map(|(row, ((((country, date), c), r), d))| {
                to_observation(row, country, date, [c, r, d])
            })
            .collect()
    }

    /// 所有国家，按第一次出现的顺序
    pub fn countries(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut countries = Vec::new();
        for name in self.0.column(COUNTRY)?.utf8()?.into_iter().flatten() {
            if seen.insert(name) {
                countries.push(name.to_string());
            }
        }
        Ok(countries)
    }

    /// 取出单个国家的数据，国家不存在时报 Lookup 错误
    pub fn country(&self, name: &str) -> Result<CountrySlice> {
        let df = self
            .0
            .clone()
            .lazy()
            .filter(col(COUNTRY).eq(lit(name)))
            .collect()?;
        if df.height() == 0 {
            return Err(PipelineError::Lookup(name.to_string()));
        }
        let slice = CountrySlice::new(name, Table(df).observations()?);
        debug!("{} has {} rows", name, slice.len());
        Ok(slice)
    }

    pub fn summary(&self) -> Result<Summary> {
        Ok(Summary::from_rows(&self.observations()?))
    }

    /// 每个国家 Confirmed 一阶差分的最大值，只有一行数据的国家没有值
    pub fn max_infection_rates(&self) -> Result<Vec<(String, Option<f64>)>> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(String, Vec<Observation>)> = Vec::new();
        for obs in self.observations()? {
            match index.get(&obs.country) {
                Some(&i) => groups[i].1.push(obs),
                None => {
                    index.insert(obs.country.clone(), groups.len());
                    groups.push((obs.country.clone(), vec![obs]));
                }
            }
        }

        Ok(groups
            .into_iter()
            .map(|(country, rows)| {
                let rate = CountrySlice::new(country.as_str(), rows)
                    .delta(Metric::Confirmed)
                    .max();
                (country, rate)
            })
            .collect())
    }
}

/// 从 http(s) / file 源读取 CSV，组成 Table
pub async fn load<T: AsRef<str>>(source: T) -> Result<Table> {
    let source = source.as_ref();
    info!("retrieving data from source: {}", source);

    // 加载时已经逐行解析并输出概况
    detect_content(retrieve_data(source).await?).load()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "Date,Country,Confirmed,Recovered,Deaths\n\
        2020-01-22,Italy,0,0,0\n\
        2020-01-23,Italy,0,0,0\n\
        2020-01-24,Italy,5,0,0\n\
        2020-01-25,Italy,7,1,2\n\
        2020-01-22,Chad,0,0,0\n\
        2020-01-23,Chad,2,0,0\n\
        2020-01-24,Australia,4,0,0\n\
        2020-01-22,Australia,1,0,0\n\
        2020-01-23,Australia,1,0,0\n";

    fn table() -> Table {
        Table::from_csv(CSV).unwrap()
    }

    #[test]
    fn filter_keeps_only_positive_confirmed() {
        let filtered = table().filter_confirmed().unwrap();
        let rows = filtered.observations().unwrap();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|o| o.confirmed > 0));
    }

    #[test]
    fn filter_on_single_country_keeps_last_two_rows() {
        let filtered = Table::from_csv(
            "Date,Country,Confirmed,Recovered,Deaths\n\
             2020-01-22,Italy,0,0,0\n\
             2020-01-23,Italy,0,0,0\n\
             2020-01-24,Italy,5,0,0\n\
             2020-01-25,Italy,7,0,0\n",
        )
        .unwrap()
        .filter_confirmed()
        .unwrap();
        let confirmed: Vec<u64> = filtered
            .observations()
            .unwrap()
            .iter()
            .map(|o| o.confirmed)
            .collect();
        assert_eq!(confirmed, vec![5, 7]);
    }

    #[test]
    fn country_slice_is_date_ordered() {
        let aus = table().country("Australia").unwrap();
        let confirmed: Vec<u64> = aus.rows().iter().map(|o| o.confirmed).collect();
        assert_eq!(confirmed, vec![1, 1, 4]);
        assert_eq!(
            aus.delta(Metric::Confirmed).values().collect::<Vec<_>>(),
            vec![0.0, 3.0]
        );
    }

    #[test]
    fn absent_country_is_lookup_error() {
        let err = table().country("Atlantis").unwrap_err();
        assert!(matches!(err, PipelineError::Lookup(name) if name == "Atlantis"));
    }

    #[test]
    fn max_rates_follow_first_appearance() {
        let rates = table().filter_confirmed().unwrap().max_infection_rates().unwrap();
        assert_eq!(
            rates,
            vec![
                ("Italy".to_string(), Some(2.0)),
                ("Chad".to_string(), None),
                ("Australia".to_string(), Some(3.0)),
            ]
        );
    }

    #[test]
    fn summary_counts_rows_and_dates() {
        let summary = table().summary().unwrap();
        assert_eq!(summary.rows, 9);
        assert_eq!(summary.countries, 3);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2020, 1, 22));
        assert_eq!(summary.last_date, NaiveDate::from_ymd_opt(2020, 1, 25));
    }

    #[test]
    fn summary_from_loaded_rows_matches_table() {
        let table = table().filter_confirmed().unwrap();
        let rows = table.observations().unwrap();
        let summary = Summary::from_rows(&rows);
        assert_eq!(summary, table.summary().unwrap());
        assert_eq!(summary.rows, 6);
        assert_eq!(summary.countries, 3);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2020, 1, 22));
    }

    #[test]
    fn summary_of_no_rows_has_no_dates() {
        let summary = Summary::from_rows(&[]);
        assert_eq!(summary.rows, 0);
        assert_eq!(summary.countries, 0);
        assert!(summary.first_date.is_none() && summary.last_date.is_none());
    }
}
