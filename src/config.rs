use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::chart::{Anchor, LockdownMarker, MarkerColor};
use crate::error::{PipelineError, Result};

pub const DATASET_URL: &str =
    "https://raw.githubusercontent.com/datasets/covid-19/master/data/countries-aggregated.csv";

/// 流水线用到的常量，默认值就是原来写死在分析里的那些
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset_url: String,
    pub output_dir: PathBuf,
    /// 单独画感染率和累计确诊的国家
    pub overview_country: String,
    pub studies: Vec<LockdownStudy>,
}

/// 一个国家的封城前后对比
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockdownStudy {
    pub country: String,
    pub title: String,
    pub markers: Vec<LockdownMarker>,
    /// 归一化后的图单独配置标记，不填就沿用 `markers`
    #[serde(default)]
    pub normalized_markers: Option<Vec<LockdownMarker>>,
    /// 额外画累计确诊 / 死亡的折线
    #[serde(default)]
    pub cumulative_overview: bool,
}

impl LockdownStudy {
    pub fn normalized_markers(&self) -> &[LockdownMarker] {
        self.normalized_markers.as_deref().unwrap_or(&self.markers)
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PipelineError::Config(format!("TOML parse error: {}", e)))
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

impl Default for Config {
    fn default() -> Self {
        let italy_start = ymd(2020, 3, 9);
        let italy_month_later = ymd(2020, 4, 9);
        let aus_start = ymd(2020, 3, 23);
        let aus_month_later = ymd(2020, 4, 26);
        let vic_start = ymd(2020, 8, 1);
        let vic_end = ymd(2020, 10, 27);

        let italy = LockdownStudy {
            country: "Italy".into(),
            title: "Before and After Lockdown in Italy".into(),
            markers: vec![
                LockdownMarker::new(italy_start, "starting date of the lockdown", MarkerColor::Red),
                LockdownMarker::new(italy_month_later, "Ending date of the lockdown", MarkerColor::Orange)
                    .width(3)
                    .anchor(Anchor::Base),
            ],
            normalized_markers: Some(vec![
                LockdownMarker::new(italy_start, "starting date of the lockdown", MarkerColor::Black),
                LockdownMarker::new(italy_month_later, "Ending date of the lockdown", MarkerColor::Orange)
                    .width(3)
                    .anchor(Anchor::At(0.95)),
            ]),
            cumulative_overview: false,
        };

        let australia = LockdownStudy {
            country: "Australia".into(),
            title: "Before and after lockdown in Australia".into(),
            markers: vec![
                LockdownMarker::new(aus_start, "starting date of the national lockdown", MarkerColor::Red),
                LockdownMarker::new(aus_month_later, "ending date of the national lockdown", MarkerColor::Orange)
                    .anchor(Anchor::At(500.0)),
                LockdownMarker::new(vic_start, "starting date of the vic stage 3 lockdown", MarkerColor::Red),
                LockdownMarker::new(vic_end, "ending date of the vic stage 4 lockdown", MarkerColor::Orange)
                    .anchor(Anchor::At(680.0)),
            ],
            normalized_markers: Some(vec![
                LockdownMarker::new(aus_start, "starting date of the national lockdown", MarkerColor::Green),
                LockdownMarker::new(aus_month_later, "ending date of the national lockdown", MarkerColor::Orange)
                    .anchor(Anchor::At(0.95)),
                LockdownMarker::new(vic_start, "starting date of the vic stage 3 lockdown", MarkerColor::Green),
                LockdownMarker::new(vic_end, "ending date of the vic stage 4 lockdown", MarkerColor::Orange)
                    .anchor(Anchor::At(0.95)),
            ]),
            cumulative_overview: true,
        };

        Self {
            dataset_url: DATASET_URL.into(),
            output_dir: PathBuf::from("charts"),
            overview_country: "China".into(),
            studies: vec![italy, australia],
        }
    }
}
