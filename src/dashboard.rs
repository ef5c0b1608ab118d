//! Dashboard assembly.
//!
//! Computes the report panels for one selection. Data-quality problems (a
//! region without baseline years, a window too short for a fit, an unknown
//! region) never abort the report: the affected panel is left out and a
//! [`Notice::Warning`] explains why. Invalid parameters are still errors.

use crate::config::Config;
use chrono::NaiveDate;
use cri_components::assessment::{assess_risks, RiskCard};
use cri_components::policy::{
    acceleration_narrative, scenario_outlook, PolicyBrief, PolicySummary, ScenarioProjection,
    Sector,
};
use cri_components::regions::{
    countries_in, CountryProfile, RegionCatalog, RegionProfile, RegionalRate, RiskLens,
    LIMITATIONS, MOST_AFFECTED,
};
use cri_components::risk_pulse::{
    alerts, PulseReading, PulseSeries, PulseSignals, RiskPulse, RiskPulseScore,
};
use cri_core::baseline::{AnomalySeries, Baseline};
use cri_core::bootstrap::{bootstrap_band, BootstrapBand};
use cri_core::changepoint::{scan_slope, scan_variance, ChangePoint};
use cri_core::correction::{correct_year, CorrectionStats};
use cri_core::errors::{CRIError, CRIResult};
use cri_core::scenario::{run_scenarios, ScenarioConfig};
use cri_core::summary::{
    before_vs_now, decadal_histograms, decadal_means, seasonal_matrix, warmest_years,
    BeforeVsNow, DecadalMean, DecadeHistogram, SeasonalMatrix,
};
use cri_core::timeseries::{FloatValue, Year, YearWindow};
use cri_core::trend::{
    forecast, period_rates, warming_rate, Acceleration, ConfidenceBand, Forecast, Period,
    PeriodRate, TrendEstimate,
};
use cri_core::ClimateDataset;
use serde::Serialize;
use std::borrow::Cow;

/// User-visible message attached to a dashboard.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "level", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Info(String),
    Warning(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Trends,
    Acceleration,
    ChangePoints,
    Regional,
    Scenario,
    Pulse,
    Policy,
}

impl PanelKind {
    pub const ALL: [PanelKind; 7] = [
        PanelKind::Trends,
        PanelKind::Acceleration,
        PanelKind::ChangePoints,
        PanelKind::Regional,
        PanelKind::Scenario,
        PanelKind::Pulse,
        PanelKind::Policy,
    ];
}

/// What the user asked to look at.
#[derive(Clone, Debug, Serialize)]
pub struct Selection {
    /// Profile used for regional translation and composite scoring
    pub region: String,
    pub sector: Sector,
    pub lens: RiskLens,
    /// Restrict the trends panel to these years
    pub window: Option<YearWindow>,
    /// Scenario overrides on top of the configuration
    pub scenario_rate: Option<FloatValue>,
    pub scenario_anomaly: Option<FloatValue>,
    pub scenario_years: Option<u32>,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            region: "Global Average".to_string(),
            sector: Sector::PublicHealth,
            lens: RiskLens::HumanHealth,
            window: None,
            scenario_rate: None,
            scenario_anomaly: None,
            scenario_years: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TrendsPanel {
    pub region: String,
    pub window: Option<YearWindow>,
    pub baseline: Baseline,
    /// Anomalies inside the selected window
    pub anomalies: AnomalySeries,
    pub rate_per_decade: FloatValue,
    pub trend: TrendEstimate,
    pub trend_band: ConfidenceBand,
    pub bootstrap: Option<BootstrapBand>,
    pub latest: Option<(Year, FloatValue)>,
    pub before_vs_now: BeforeVsNow,
    pub decadal_means: Vec<DecadalMean>,
    pub warmest_years: Vec<(Year, FloatValue)>,
    pub forecast: Option<Forecast>,
    pub seasonal: Option<SeasonalMatrix>,
    pub histograms: Vec<DecadeHistogram>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AccelerationPanel {
    pub rates: Vec<PeriodRate>,
    pub acceleration: Acceleration,
    pub narrative: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChangePointPanel {
    pub slope: Option<ChangePoint>,
    pub variance: Option<ChangePoint>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegionalPanel {
    pub profile: RegionProfile,
    pub rate: RegionalRate,
    pub guidance: String,
    pub countries: Vec<CountryProfile>,
    pub lens: RiskLens,
    pub lens_focus: String,
    pub most_affected: Vec<String>,
    pub limitations: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioPanel {
    pub config: ScenarioConfig,
    pub band: ConfidenceBand,
    pub final_range: Option<(FloatValue, FloatValue)>,
    pub projection: ScenarioProjection,
    pub risks: Vec<RiskCard>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PulsePanel {
    pub series: PulseSeries,
    pub latest: Option<PulseReading>,
    pub alert_threshold: FloatValue,
    pub alerts: Vec<Year>,
    pub signals: PulseSignals,
    pub composite: RiskPulseScore,
}

#[derive(Clone, Debug, Serialize)]
pub struct PolicyPanel {
    pub summary: PolicySummary,
    pub brief: PolicyBrief,
}

/// All computed panels for one selection.
#[derive(Clone, Debug, Serialize)]
pub struct Dashboard {
    pub generated: NaiveDate,
    pub data_region: String,
    pub selection: Selection,
    pub correction: Option<CorrectionStats>,
    pub notices: Vec<Notice>,
    pub trends: Option<TrendsPanel>,
    pub acceleration: Option<AccelerationPanel>,
    pub changepoints: Option<ChangePointPanel>,
    pub regional: Option<RegionalPanel>,
    pub scenario: Option<ScenarioPanel>,
    pub pulse: Option<PulsePanel>,
    pub policy: Option<PolicyPanel>,
}

/// Quantities shared by several panels.
struct Context {
    anomalies: AnomalySeries,
    rate_per_decade: Option<FloatValue>,
    latest: Option<(Year, FloatValue)>,
    rates: Vec<PeriodRate>,
    acceleration: Acceleration,
}

impl Dashboard {
    /// Build the requested panels.
    ///
    /// # Arguments
    ///
    /// * `dataset` - Loaded dataset (raw; the configured correction is applied here)
    /// * `config` - Analysis configuration
    /// * `selection` - Region, sector and overrides chosen by the user
    /// * `panels` - Panels to compute
    /// * `today` - Date stamped on the policy brief
    pub fn build(
        dataset: &ClimateDataset,
        config: &Config,
        selection: Selection,
        panels: &[PanelKind],
        today: NaiveDate,
    ) -> CRIResult<Self> {
        let data_region = config.data.region().to_string();
        let mut dashboard = Dashboard {
            generated: today,
            data_region: data_region.clone(),
            selection,
            correction: None,
            notices: Vec::new(),
            trends: None,
            acceleration: None,
            changepoints: None,
            regional: None,
            scenario: None,
            pulse: None,
            policy: None,
        };

        let catalog = RegionCatalog::from_parameters(&config.regions)?;
        let dataset = dashboard.corrected(dataset, config)?;

        let anomalies = dashboard.soften("Anomalies", dataset.anomalies(&data_region))?;
        let context = anomalies.map(|anomalies| dashboard.context(anomalies, config));
        let wants = |kind: PanelKind| panels.contains(&kind);

        if let Some(ctx) = &context {
            if wants(PanelKind::Trends) {
                let panel = trends_panel(&dataset, &data_region, ctx, config, &dashboard.selection);
                dashboard.trends = dashboard.soften("Trends", panel)?;
            }
            if wants(PanelKind::Acceleration) {
                dashboard.acceleration = Some(AccelerationPanel {
                    rates: ctx.rates.clone(),
                    acceleration: ctx.acceleration,
                    narrative: acceleration_narrative(ctx.acceleration).to_string(),
                });
            }
            if wants(PanelKind::ChangePoints) {
                let panel = changepoint_panel(ctx, config);
                dashboard.changepoints = dashboard.soften("Change-points", panel)?;
            }
        }

        let global_rate = context.as_ref().and_then(|c| c.rate_per_decade);
        let latest_anomaly = context.as_ref().and_then(|c| c.latest).map(|(_, a)| a);

        if wants(PanelKind::Regional) {
            match global_rate {
                Some(rate) => {
                    let panel = regional_panel(&catalog, rate, &dashboard.selection);
                    dashboard.regional = dashboard.soften("Regional", panel)?;
                }
                None => dashboard.warn("Regional: no observed warming rate to translate"),
            }
        }

        if wants(PanelKind::Scenario) {
            let panel = scenario_panel(config, &dashboard.selection, context.as_ref());
            dashboard.scenario = dashboard.soften("Scenario", panel)?;
        }

        let lookup = catalog.get(&dashboard.selection.region).cloned();
        let profile = dashboard.soften("Region", lookup)?;
        let composite = match (&context, &profile, latest_anomaly) {
            (Some(ctx), Some(profile), Some(anomaly)) => {
                let signals = PulseSignals::from_observations(
                    recent_rate(&ctx.rates),
                    earlier_rate(&ctx.rates),
                    anomaly,
                    profile,
                    &config.pulse,
                );
                Some((signals, RiskPulseScore::composite(&signals, &config.composite)?))
            }
            _ => None,
        };

        if wants(PanelKind::Pulse) {
            if let (Some(ctx), Some((signals, score))) = (&context, composite) {
                let series = RiskPulse::from_parameters(config.pulse.clone())
                    .pulse_series(ctx.anomalies.series());
                if let Some(series) = dashboard.soften("Risk Pulse", series)? {
                    dashboard.pulse = Some(PulsePanel {
                        latest: series.latest(),
                        alert_threshold: config.pulse.alert_threshold,
                        alerts: alerts(&series, config.pulse.alert_threshold),
                        series,
                        signals,
                        composite: score,
                    });
                }
            } else {
                dashboard.warn("Risk Pulse: not enough information for a composite score");
            }
        }

        if wants(PanelKind::Policy) {
            match (&context, composite, global_rate, latest_anomaly, &profile) {
                (Some(ctx), Some((_, score)), Some(rate), Some(anomaly), Some(profile)) => {
                    let summary =
                        PolicySummary::for_score(score, &profile.name, dashboard.selection.sector);
                    let years = dashboard
                        .selection
                        .scenario_years
                        .unwrap_or(config.scenario.outlook_years);
                    let mut brief = PolicyBrief::new(today, rate, anomaly, summary.clone())
                        .with_acceleration(ctx.acceleration)
                        .with_risks(assess_risks(rate / 10.0, anomaly))
                        .with_projection(scenario_outlook(rate, years));
                    if let Some(correction) = &dashboard.correction {
                        brief = brief.with_correction(correction.clone());
                    }
                    dashboard.policy = Some(PolicyPanel { summary, brief });
                }
                _ => dashboard.warn("Policy: not enough information for a policy summary"),
            }
        }

        Ok(dashboard)
    }

    fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.notices.push(Notice::Warning(message));
    }

    /// Turn data-quality errors into warnings; other errors propagate.
    fn soften<T>(&mut self, panel: &str, result: CRIResult<T>) -> CRIResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_data_quality() => {
                self.warn(format!("{}: {}", panel, err));
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Apply the configured year correction, keeping the raw dataset intact.
    fn corrected<'a>(
        &mut self,
        dataset: &'a ClimateDataset,
        config: &Config,
    ) -> CRIResult<Cow<'a, ClimateDataset>> {
        let Some(options) = &config.correction else {
            return Ok(Cow::Borrowed(dataset));
        };
        if dataset.monthly().is_empty() {
            self.warn("Correction: dataset has no monthly rows; correction skipped");
            return Ok(Cow::Borrowed(dataset));
        }
        let corrected = correct_year(dataset.monthly(), config.data.region(), options);
        let Some(corrected) = self.soften("Correction", corrected)? else {
            return Ok(Cow::Borrowed(dataset));
        };
        if corrected.stats.months_corrected == 0 {
            self.notices.push(Notice::Info(format!(
                "Correction: no months of {} found; data left unchanged",
                options.year
            )));
            return Ok(Cow::Borrowed(dataset));
        }
        let window = dataset.baselines().window().unwrap_or(config.data.loader.baseline);
        let rebuilt = ClimateDataset::from_monthly(corrected.monthly, window)?;
        self.notices.push(Notice::Info(format!(
            "Correction: {} months of {} reconstructed",
            corrected.stats.months_corrected, corrected.stats.year
        )));
        self.correction = Some(corrected.stats);
        Ok(Cow::Owned(rebuilt))
    }

    fn context(&mut self, anomalies: AnomalySeries, config: &Config) -> Context {
        let rate_per_decade = match warming_rate(anomalies.series(), config.trend.recent_years) {
            Ok(rate) => Some(rate),
            Err(err) => {
                self.warn(format!("Warming rate: {}", err));
                None
            }
        };
        let rates = period_rates(anomalies.series(), &Period::standard());
        for rate in rates.iter().filter(|r| r.rate_per_decade.is_none()) {
            self.warn(format!(
                "Period {} has {} years; at least {} are needed for a rate",
                rate.period.label,
                rate.n_years,
                cri_core::trend::MIN_PERIOD_SAMPLES
            ));
        }
        Context {
            latest: anomalies.latest(),
            acceleration: Acceleration::from_period_rates(&rates),
            anomalies,
            rate_per_decade,
            rates,
        }
    }
}

fn recent_rate(rates: &[PeriodRate]) -> Option<FloatValue> {
    rates.last().and_then(|r| r.rate_per_decade)
}

fn earlier_rate(rates: &[PeriodRate]) -> Option<FloatValue> {
    rates.iter().rev().nth(1).and_then(|r| r.rate_per_decade)
}

fn trends_panel(
    dataset: &ClimateDataset,
    region: &str,
    ctx: &Context,
    config: &Config,
    selection: &Selection,
) -> CRIResult<TrendsPanel> {
    // Baselines always come from the full record; only the view is windowed
    let anomalies = match selection.window {
        Some(window) => ctx.anomalies.window(window),
        None => ctx.anomalies.clone(),
    };
    if anomalies.series().is_empty() {
        let window = selection.window.map(|w| w.to_string()).unwrap_or_default();
        return Err(CRIError::InsufficientSamples {
            operation: format!("trend over {}", window),
            required: 2,
            actual: 0,
        });
    }

    let trend = TrendEstimate::fit_series(anomalies.series(), None)?;
    let years = anomalies.years().to_vec();
    let trend_band = trend.confidence_band(&years, config.trend.band_multiplier);

    let bootstrap = match bootstrap_band(anomalies.series(), &config.bootstrap) {
        Ok(band) => Some(band),
        Err(err) if err.is_data_quality() => {
            log::info!("Skipping bootstrap band: {}", err);
            None
        }
        Err(err) => return Err(err),
    };

    let series = dataset.series(region)?;
    let baseline = ctx.anomalies.baseline().clone();
    let before_vs_now = before_vs_now(series, &baseline, config.summary.recent_years)?;

    let forecast = match forecast(
        ctx.anomalies.series(),
        config.trend.forecast_train,
        config.trend.forecast_until,
        config.trend.band_multiplier,
    ) {
        Ok(f) => Some(f),
        Err(err) if err.is_data_quality() => {
            log::info!("Skipping forecast: {}", err);
            None
        }
        Err(err) => return Err(err),
    };

    let monthly: Vec<_> = dataset.monthly_for(region).collect();
    let (seasonal, histograms) = if monthly.is_empty() {
        (None, Vec::new())
    } else {
        (
            Some(seasonal_matrix(monthly.iter().copied())),
            decadal_histograms(monthly.iter().copied(), &config.summary.histogram)?,
        )
    };

    Ok(TrendsPanel {
        region: region.to_string(),
        window: selection.window,
        baseline,
        rate_per_decade: trend.rate_per_decade(),
        latest: anomalies.latest(),
        decadal_means: decadal_means(anomalies.series()),
        warmest_years: warmest_years(anomalies.series(), config.summary.warmest),
        anomalies,
        trend,
        trend_band,
        bootstrap,
        before_vs_now,
        forecast,
        seasonal,
        histograms,
    })
}

fn changepoint_panel(ctx: &Context, config: &Config) -> CRIResult<ChangePointPanel> {
    Ok(ChangePointPanel {
        slope: scan_slope(ctx.anomalies.series(), &config.changepoint)?,
        variance: scan_variance(ctx.anomalies.series(), &config.changepoint)?,
    })
}

fn regional_panel(
    catalog: &RegionCatalog,
    global_rate: FloatValue,
    selection: &Selection,
) -> CRIResult<RegionalPanel> {
    let profile = catalog.get(&selection.region)?.clone();
    let rate = catalog.regional_rate(global_rate, &profile.name)?;
    Ok(RegionalPanel {
        guidance: rate.guidance().to_string(),
        countries: countries_in(&profile.name).into_iter().cloned().collect(),
        lens: selection.lens,
        lens_focus: selection.lens.focus().to_string(),
        most_affected: MOST_AFFECTED.iter().map(|s| s.to_string()).collect(),
        limitations: LIMITATIONS.iter().map(|s| s.to_string()).collect(),
        profile,
        rate,
    })
}

fn scenario_panel(
    config: &Config,
    selection: &Selection,
    context: Option<&Context>,
) -> CRIResult<ScenarioPanel> {
    let mut ensemble = config.scenario.ensemble.clone();
    if config.scenario.anchor_to_data {
        if let Some(ctx) = context {
            if let Some((year, anomaly)) = ctx.latest {
                ensemble.start_year = year;
                ensemble.start_anomaly = anomaly;
            }
            if let Some(rate) = ctx.rate_per_decade {
                ensemble.rate_per_decade = rate;
            }
        }
    }
    if let Some(rate) = selection.scenario_rate {
        ensemble.rate_per_decade = rate;
    }
    if let Some(anomaly) = selection.scenario_anomaly {
        ensemble.start_anomaly = anomaly;
    }
    if let Some(years) = selection.scenario_years {
        ensemble.horizon_years = years;
    }

    let result = run_scenarios(&ensemble)?;
    let projection = scenario_outlook(ensemble.rate_per_decade, ensemble.horizon_years);
    let risks = assess_risks(ensemble.rate_per_decade / 10.0, ensemble.start_anomaly);
    Ok(ScenarioPanel {
        final_range: result.final_range(),
        band: result.band().clone(),
        config: ensemble,
        projection,
        risks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cri_core::timeseries::AnnualSeries;
    use cri_core::PRE_INDUSTRIAL;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn warming_dataset(first_year: Year) -> ClimateDataset {
        let series = AnnualSeries::from_pairs(
            "Global",
            (first_year..=2020).map(|y| {
                let t = (y - 1850) as f64;
                let wiggle = if y % 2 == 0 { 0.03 } else { -0.03 };
                (y, 14.0 + 0.00004 * t * t + wiggle)
            }),
        )
        .unwrap();
        ClimateDataset::from_annual(vec![series], PRE_INDUSTRIAL).unwrap()
    }

    #[test]
    fn full_dashboard_has_every_panel() {
        let dashboard = Dashboard::build(
            &warming_dataset(1850),
            &Config::default(),
            Selection::default(),
            &PanelKind::ALL,
            today(),
        )
        .unwrap();
        assert!(dashboard.trends.is_some());
        assert!(dashboard.acceleration.is_some());
        assert!(dashboard.changepoints.is_some());
        assert!(dashboard.regional.is_some());
        assert!(dashboard.scenario.is_some());
        assert!(dashboard.pulse.is_some());
        assert!(dashboard.policy.is_some());
        assert!(dashboard.notices.is_empty(), "{:?}", dashboard.notices);

        let scenario = dashboard.scenario.unwrap();
        assert_eq!(scenario.config.start_year, 2020);
        assert_eq!(scenario.band.years.first(), Some(&2020));
    }

    #[test]
    fn missing_baseline_becomes_warning() {
        let dashboard = Dashboard::build(
            &warming_dataset(1950),
            &Config::default(),
            Selection::default(),
            &PanelKind::ALL,
            today(),
        )
        .unwrap();
        assert!(dashboard.trends.is_none());
        assert!(dashboard.policy.is_none());
        assert!(dashboard
            .notices
            .iter()
            .any(|n| matches!(n, Notice::Warning(m) if m.contains("baseline window 1850-1900"))));
        // The scenario explorer still runs from the configured values
        assert_eq!(dashboard.scenario.unwrap().config.start_year, 2020);
    }

    #[test]
    fn unknown_region_becomes_warning() {
        let selection = Selection {
            region: "Atlantis".to_string(),
            ..Selection::default()
        };
        let dashboard = Dashboard::build(
            &warming_dataset(1850),
            &Config::default(),
            selection,
            &[PanelKind::Regional, PanelKind::Policy],
            today(),
        )
        .unwrap();
        assert!(dashboard.regional.is_none());
        assert!(dashboard.policy.is_none());
        assert!(dashboard
            .notices
            .iter()
            .any(|n| matches!(n, Notice::Warning(m) if m.contains("Atlantis"))));
    }

    #[test]
    fn window_restricts_view_not_baseline() {
        let selection = Selection {
            window: Some(YearWindow::new(1980, 2020).unwrap()),
            ..Selection::default()
        };
        let full = Dashboard::build(
            &warming_dataset(1850),
            &Config::default(),
            Selection::default(),
            &[PanelKind::Trends],
            today(),
        )
        .unwrap()
        .trends
        .unwrap();
        let windowed = Dashboard::build(
            &warming_dataset(1850),
            &Config::default(),
            selection,
            &[PanelKind::Trends],
            today(),
        )
        .unwrap()
        .trends
        .unwrap();
        assert_eq!(windowed.baseline, full.baseline);
        assert_eq!(windowed.anomalies.years().len(), 41);
        assert_eq!(windowed.latest, full.latest);
        assert!(windowed.rate_per_decade > full.rate_per_decade);
    }

    #[test]
    fn invalid_parameters_are_errors() {
        let mut config = Config::default();
        config.scenario.ensemble.runs = 1;
        let result = Dashboard::build(
            &warming_dataset(1850),
            &config,
            Selection::default(),
            &[PanelKind::Scenario],
            today(),
        );
        assert!(matches!(result, Err(CRIError::InvalidParameter(_))));
    }
}
