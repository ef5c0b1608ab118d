//! Output formats for a [`Dashboard`].

use crate::dashboard::{Dashboard, Notice};
use anyhow::Result;
use cri_core::changepoint::ChangePoint;
use cri_core::trend::Acceleration;
use std::fmt::{self, Write};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Markdown,
    Json,
}

pub fn render(dashboard: &Dashboard, format: Format) -> Result<String> {
    let mut out = String::new();
    match format {
        Format::Json => return Ok(serde_json::to_string_pretty(dashboard)?),
        Format::Text => write_dashboard(&mut TextWriter(&mut out), dashboard)?,
        Format::Markdown => write_dashboard(&mut MarkdownWriter(&mut out), dashboard)?,
    }
    Ok(out)
}

/// Layout primitives shared by the plain-text and Markdown renderers.
trait Sink {
    fn heading(&mut self, title: &str) -> fmt::Result;
    fn kv(&mut self, key: &str, value: &dyn fmt::Display) -> fmt::Result;
    fn bullet(&mut self, item: &dyn fmt::Display) -> fmt::Result;
    fn paragraph(&mut self, text: &str) -> fmt::Result;
    /// Pre-formatted block emitted as-is
    fn raw(&mut self, text: &str) -> fmt::Result;
}

struct TextWriter<'a>(&'a mut String);

impl Sink for TextWriter<'_> {
    fn heading(&mut self, title: &str) -> fmt::Result {
        writeln!(self.0, "\n{}\n{}", title, "=".repeat(title.chars().count()))
    }

    fn kv(&mut self, key: &str, value: &dyn fmt::Display) -> fmt::Result {
        writeln!(self.0, "{:<28} {}", format!("{}:", key), value)
    }

    fn bullet(&mut self, item: &dyn fmt::Display) -> fmt::Result {
        writeln!(self.0, "  - {}", item)
    }

    fn paragraph(&mut self, text: &str) -> fmt::Result {
        writeln!(self.0, "{}", text)
    }

    fn raw(&mut self, text: &str) -> fmt::Result {
        writeln!(self.0, "{}", text)
    }
}

struct MarkdownWriter<'a>(&'a mut String);

impl Sink for MarkdownWriter<'_> {
    fn heading(&mut self, title: &str) -> fmt::Result {
        writeln!(self.0, "\n## {}\n", title)
    }

    fn kv(&mut self, key: &str, value: &dyn fmt::Display) -> fmt::Result {
        writeln!(self.0, "- **{}:** {}", key, value)
    }

    fn bullet(&mut self, item: &dyn fmt::Display) -> fmt::Result {
        writeln!(self.0, "- {}", item)
    }

    fn paragraph(&mut self, text: &str) -> fmt::Result {
        writeln!(self.0, "\n{}\n", text)
    }

    fn raw(&mut self, text: &str) -> fmt::Result {
        writeln!(self.0, "\n{}", text)
    }
}

fn acceleration_label(acceleration: Acceleration) -> &'static str {
    match acceleration {
        Acceleration::Accelerated => "Accelerated",
        Acceleration::Modest => "Modest",
        Acceleration::Unknown => "Unknown",
    }
}

fn describe_change(change: &Option<ChangePoint>, unit: &str) -> String {
    match change {
        Some(c) => format!(
            "{} (confidence {:.0}%, {:.3} -> {:.3} {})",
            c.year,
            c.confidence * 100.0,
            c.before,
            c.after,
            unit
        ),
        None => "none detected".to_string(),
    }
}

fn write_dashboard(out: &mut dyn Sink, dashboard: &Dashboard) -> fmt::Result {
    out.heading("Climate Risk Interpreter")?;
    out.kv("Generated", &dashboard.generated.format("%Y-%m-%d"))?;
    out.kv("Dataset region", &dashboard.data_region)?;
    out.kv("Risk region", &dashboard.selection.region)?;
    out.kv("Sector", &dashboard.selection.sector)?;

    if !dashboard.notices.is_empty() {
        out.heading("Notices")?;
        for notice in &dashboard.notices {
            match notice {
                Notice::Warning(message) => out.bullet(&format!("warning: {}", message))?,
                Notice::Info(message) => out.bullet(message)?,
            }
        }
    }

    if let Some(trends) = &dashboard.trends {
        out.heading("Temperature Trends")?;
        if let Some(window) = trends.window {
            out.kv("Window", &window)?;
        }
        out.kv(
            "Baseline",
            &format!(
                "{:.2}°C ({} years, {})",
                trends.baseline.value(),
                trends.baseline.n_years(),
                trends.baseline.window()
            ),
        )?;
        if let Some((year, anomaly)) = trends.latest {
            out.kv("Latest anomaly", &format!("{:+.2}°C ({})", anomaly, year))?;
        }
        out.kv(
            "Trend",
            &format!(
                "{:+.3}°C/decade (R² {:.2})",
                trends.rate_per_decade, trends.trend.r_squared
            ),
        )?;
        if let Some((lower, upper)) = trends.bootstrap.as_ref().and_then(|b| b.latest()) {
            out.kv("Bootstrap band (latest)", &format!("{:+.2} to {:+.2}°C", lower, upper))?;
        }
        let bvn = &trends.before_vs_now;
        out.kv(
            "Before vs now",
            &format!(
                "{:.2}°C -> {:.2}°C (last {} years, {:+.2}°C)",
                bvn.pre_industrial, bvn.recent_mean, bvn.recent_years, bvn.delta
            ),
        )?;
        if let Some(forecast) = &trends.forecast {
            if let (Some(year), Some(center), Some(lower), Some(upper)) = (
                forecast.band.years.last(),
                forecast.band.center.last(),
                forecast.band.lower.last(),
                forecast.band.upper.last(),
            ) {
                out.kv(
                    "Forecast",
                    &format!(
                        "{:+.2}°C in {} ({:+.2} to {:+.2})",
                        center, year, lower, upper
                    ),
                )?;
            }
        }
        out.paragraph("Warmest years:")?;
        for (year, anomaly) in &trends.warmest_years {
            out.bullet(&format!("{}: {:+.2}°C", year, anomaly))?;
        }
        out.paragraph("Decadal means:")?;
        for decade in &trends.decadal_means {
            out.bullet(&format!(
                "{}s: {:+.2}°C ({} years)",
                decade.decade, decade.mean, decade.n_years
            ))?;
        }
        if let Some(seasonal) = &trends.seasonal {
            out.kv(
                "Seasonal matrix",
                &format!(
                    "{} years x {} months",
                    seasonal.values.nrows(),
                    seasonal.values.ncols()
                ),
            )?;
        }
        if !trends.histograms.is_empty() {
            out.kv("Decade histograms", &trends.histograms.len())?;
        }
    }

    if let Some(correction) = &dashboard.correction {
        out.heading("Data Correction")?;
        out.kv("Year", &correction.year)?;
        out.kv("Months reconstructed", &correction.months_corrected)?;
        if let (Some(before), Some(after)) = (correction.original_mean, correction.corrected_mean)
        {
            out.kv("Annual mean", &format!("{:.2}°C -> {:.2}°C", before, after))?;
        }
        out.kv("Fitted trend", &format!("{:+.4}°C/yr", correction.slope))?;
    }

    if let Some(panel) = &dashboard.acceleration {
        out.heading("Acceleration")?;
        for rate in &panel.rates {
            let value = match rate.rate_per_decade {
                Some(r) => format!("{:+.3}°C/decade ({} years)", r, rate.n_years),
                None => format!("insufficient data ({} years)", rate.n_years),
            };
            out.kv(&rate.period.label, &value)?;
        }
        out.kv("Classification", &acceleration_label(panel.acceleration))?;
        out.paragraph(&panel.narrative)?;
    }

    if let Some(panel) = &dashboard.changepoints {
        out.heading("Change-points")?;
        out.kv("Slope", &describe_change(&panel.slope, "°C/decade"))?;
        out.kv("Variance", &describe_change(&panel.variance, "°C sd"))?;
    }

    if let Some(panel) = &dashboard.regional {
        out.heading("Regional Risk Translation")?;
        out.kv("Region", &panel.profile.name)?;
        out.kv(
            "Regional rate",
            &format!(
                "{:+.3}°C/decade ({:.2} x global {:+.3})",
                panel.rate.rate_per_decade, panel.rate.multiplier, panel.rate.global_rate_per_decade
            ),
        )?;
        out.kv("Risk level", &panel.rate.level)?;
        out.kv("Key risk", &panel.profile.key_risk)?;
        out.paragraph(&panel.profile.description)?;
        out.paragraph(&panel.guidance)?;
        out.kv(&panel.lens.to_string(), &panel.lens_focus)?;
        if !panel.countries.is_empty() {
            out.paragraph("Countries:")?;
            for c in &panel.countries {
                out.bullet(&format!(
                    "{}: heat {}, food {}, coastal {}. {}",
                    c.name, c.heat, c.food, c.coastal, c.note
                ))?;
            }
        }
        out.paragraph("Most affected:")?;
        for group in &panel.most_affected {
            out.bullet(group)?;
        }
        out.paragraph("Limitations:")?;
        for limitation in &panel.limitations {
            out.bullet(limitation)?;
        }
    }

    if let Some(panel) = &dashboard.scenario {
        out.heading("Scenario Explorer")?;
        out.kv(
            "Start",
            &format!(
                "{:+.2}°C in {}",
                panel.config.start_anomaly, panel.config.start_year
            ),
        )?;
        out.kv(
            "Rate",
            &format!(
                "{:+.3}°C/decade over {} years",
                panel.config.rate_per_decade, panel.config.horizon_years
            ),
        )?;
        out.kv("Runs", &panel.config.runs)?;
        if let Some((lower, upper)) = panel.final_range {
            out.kv("Final range", &format!("{:+.2} to {:+.2}°C", lower, upper))?;
        }
        out.kv(
            "Additional warming",
            &format!("{:+.2}°C", panel.projection.additional_warming),
        )?;
        out.paragraph(panel.projection.outlook.message())?;
        for risk in &panel.risks {
            out.bullet(&format!("{}: {}. {}", risk.title, risk.level, risk.description))?;
        }
    }

    if let Some(panel) = &dashboard.pulse {
        out.heading("Risk Pulse")?;
        if let Some(latest) = &panel.latest {
            out.kv(
                "Pulse index",
                &format!("{:.0}/100 in {} ({})", latest.as_index(), latest.year, latest.state()),
            )?;
        }
        out.kv(
            "Composite score",
            &format!("{:.0}/100 ({})", panel.composite.as_index(), panel.composite.band()),
        )?;
        let s = &panel.signals;
        out.kv("Trend acceleration", &format!("{:.2}", s.trend_acceleration))?;
        out.kv("Anomaly magnitude", &format!("{:.2}", s.anomaly_magnitude))?;
        out.kv("Exposure", &format!("{:.2}", s.exposure))?;
        out.kv("Adaptive capacity", &format!("{:.2}", s.adaptive_capacity))?;
        let alerts = if panel.alerts.is_empty() {
            "none".to_string()
        } else {
            panel
                .alerts
                .iter()
                .map(|y| y.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.kv(&format!("Alerts (>= {:.0})", panel.alert_threshold), &alerts)?;
    }

    if let Some(panel) = &dashboard.policy {
        out.heading("Policy Brief")?;
        out.raw(&panel.brief.render_markdown())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writers_lay_out_entries() {
        let mut text = String::new();
        {
            let mut w = TextWriter(&mut text);
            w.heading("Trends").unwrap();
            w.kv("Rate", &0.2).unwrap();
            w.bullet(&"Arctic").unwrap();
        }
        assert!(text.contains("Trends\n======"));
        assert!(text.contains("Rate:"));
        assert!(text.contains("  - Arctic"));

        let mut md = String::new();
        {
            let mut w = MarkdownWriter(&mut md);
            w.heading("Trends").unwrap();
            w.kv("Rate", &0.2).unwrap();
        }
        assert!(md.contains("## Trends"));
        assert!(md.contains("- **Rate:** 0.2"));
    }

    #[test]
    fn missing_change_point_is_reported() {
        assert_eq!(describe_change(&None, "°C"), "none detected");
    }
}
