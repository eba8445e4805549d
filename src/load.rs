use std::io::Cursor;

use chrono::NaiveDate;
use polars::prelude::*;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::series::{Metric, Observation};
use crate::{Summary, Table};

pub(crate) const COUNTRY: &str = "Country";
pub(crate) const DATE: &str = "Date";
const DATE_FORMAT: &str = "%Y-%m-%d";
// 推断列类型时读取的行数
const INFER_ROWS: usize = 100;

pub trait Load {
    type Error;
    fn load(self) -> Result<Table, Self::Error>;
}

/// 根据内容选择加载器，目前只有 CSV
pub(crate) fn detect_content(data: String) -> CsvLoader {
    CsvLoader(data)
}

#[derive(Debug)]
pub(crate) struct CsvLoader(pub(crate) String);

impl Load for CsvLoader {
    type Error = PipelineError;

    fn load(self) -> Result<Table, Self::Error> {
        let mut df = CsvReader::new(Cursor::new(self.0))
            .has_header(true)
            .infer_schema(Some(INFER_ROWS))
            .finish()
            .map_err(|e| PipelineError::Parse(e.to_string()))?;

        check_columns(&df)?;
        // 国家名、日期可能被推断成数值列，统一按文本处理
        for name in [COUNTRY, DATE] {
            let text = df.column(name)?.cast(&DataType::Utf8)?;
            df.with_column(text)?;
        }
        for metric in Metric::ALL {
            let counts = count_column(&df, metric)?;
            df.with_column(counts)?;
        }

        let table = Table::new(df);
        // 逐行检查一遍日期和计数，坏数据在加载阶段就报错
        let rows = table.observations()?;
        let summary = Summary::from_rows(&rows);
        info!(
            "loaded {} rows for {} countries ({:?} .. {:?})",
            summary.rows, summary.countries, summary.first_date, summary.last_date
        );
        Ok(table)
    }
}

fn check_columns(df: &DataFrame) -> Result<()> {
    let names = df.get_column_names();
    let mut required = vec![COUNTRY, DATE];
    required.extend(Metric::ALL.iter().map(|m| m.column()));
    for name in required {
        if !names.contains(&name) {
            return Err(PipelineError::Parse(format!(
                "missing column {name}, header is {names:?}"
            )));
        }
    }
    Ok(())
}

/// 把计数列统一成 Int64，非整数列直接判为格式错误
fn count_column(df: &DataFrame, metric: Metric) -> Result<Series> {
    let name = metric.column();
    let series = df.column(name)?;
    match series.dtype() {
        DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32 => {}
        // 只有表头没有数据时推断不出类型
        _ if df.height() == 0 => {}
        other => {
            return Err(PipelineError::Parse(format!(
                "column {name} contains non-numeric data ({other})"
            )))
        }
    }
    Ok(series.cast(&DataType::Int64)?)
}

pub(crate) fn to_observation(
    row: usize,
    country: Option<&str>,
    date: Option<&str>,
    counts: [Option<i64>; 3],
) -> Result<Observation> {
    let missing = |col: &str| PipelineError::Parse(format!("row {row}: missing {col}"));

    let country = country.ok_or_else(|| missing(COUNTRY))?;
    let date = date.ok_or_else(|| missing(DATE))?;
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|e| PipelineError::Parse(format!("row {row}: bad date {date:?}: {e}")))?;

    let mut parsed = [0u64; 3];
    for ((slot, value), metric) in parsed.iter_mut().zip(counts).zip(Metric::ALL) {
        let value = value.ok_or_else(|| missing(metric.column()))?;
        *slot = u64::try_from(value).map_err(|_| {
            PipelineError::Parse(format!("row {row}: negative {} {value}", metric.column()))
        })?;
    }
    let [confirmed, recovered, deaths] = parsed;

    Ok(Observation {
        country: country.to_string(),
        date,
        confirmed,
        recovered,
        deaths,
    })
}
