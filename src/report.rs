//! 按顺序生成整份分析报告的图表：
//! 全球传播地图、重点国家的感染率、各国最大感染率，以及每个封城对比

use tracing::info;

use crate::chart::ChartSpec;
use crate::config::{Config, LockdownStudy};
use crate::error::Result;
use crate::series::Metric;
use crate::Table;

/// 纯函数，只构造图表描述，不做渲染
pub fn build(table: &Table, config: &Config) -> Result<Vec<ChartSpec>> {
    let rows = table.observations()?;
    let mut charts = vec![
        ChartSpec::choropleth("Global spread of COVID19 (confirmed)", Metric::Confirmed, &rows),
        ChartSpec::choropleth("Global spread of COVID19 (deaths)", Metric::Deaths, &rows),
    ];

    let overview = table.country(&config.overview_country)?;
    let infection = overview.delta(Metric::Confirmed);
    info!(
        "max infection rate in {}: {:?}",
        overview.country(),
        infection.max()
    );
    charts.push(ChartSpec::line(
        format!("Infection Rate and Confirmed cases in {}", overview.country()),
        vec![infection, overview.cumulative(Metric::Confirmed)],
    ));

    charts.push(
        ChartSpec::bar("Global Maximum Infection Rate", &table.max_infection_rates()?).log_y(),
    );

    for study in &config.studies {
        charts.extend(lockdown_charts(table, study)?);
    }

    info!("built {} charts", charts.len());
    Ok(charts)
}

/// 单个国家封城前后的几张图
pub fn lockdown_charts(table: &Table, study: &LockdownStudy) -> Result<Vec<ChartSpec>> {
    let slice = table.country(&study.country)?;
    let infection = slice.delta(Metric::Confirmed);
    let deaths = slice.delta(Metric::Deaths);
    let mut charts = Vec::new();

    if study.cumulative_overview {
        charts.push(ChartSpec::line(
            format!("COVID19 in {}", study.country),
            vec![
                infection.clone(),
                slice.cumulative(Metric::Confirmed),
                slice.cumulative(Metric::Deaths),
            ],
        ));
        charts.push(ChartSpec::line(
            format!("The number of death due to COVID19 in {}", study.country),
            vec![slice.cumulative(Metric::Deaths)],
        ));
    }

    charts.push(
        ChartSpec::line(study.title.clone(), vec![infection.clone()])
            .with_lockdown_markers(&study.markers),
    );
    charts.push(ChartSpec::line(
        format!("Infection Rate and Deaths Rate in {}", study.country),
        vec![infection.clone(), deaths.clone()],
    ));
    charts.push(
        ChartSpec::line(
            format!("{} (normalized)", study.title),
            vec![infection.normalize()?, deaths.normalize()?],
        )
        .with_lockdown_markers(study.normalized_markers()),
    );

    Ok(charts)
}
