//! CSV report of one valuation pass
//!
//! The report is a sequence of titled sections separated by blank lines.
//! Cells are formatted for reading (currency, grouped numbers) and quoted
//! by the CSV writer wherever they contain a comma.

pub mod format;

use chrono::{DateTime, SecondsFormat, Utc};
use eyre::{eyre, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::market::{FetchStatus, MarketSnapshot, TokenSlot};
use crate::program::AllocationProgramConfig;
use crate::valuation::{ValuationResult, ValuationSet};
use self::format::{
    describe_quantity, format_currency, format_currency_opt, format_fixed, format_number,
    format_number_opt,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportSection {
    fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn with_header(header: Vec<String>) -> Self {
        Self { header, rows: Vec::new() }
    }

    fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn title(&self) -> &str {
        self.header.first().map(String::as_str).unwrap_or("")
    }

    /// First row whose leading cell is `label`
    pub fn find(&self, label: &str) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|r| r.first().map(String::as_str) == Some(label))
            .map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationReport {
    pub sections: Vec<ReportSection>,
}

/// Labels shared by every section
struct Names<'a> {
    project: &'a str,
    flat: &'a str,
    basis: &'a str,
}

impl AllocationReport {
    pub fn build(
        program: &AllocationProgramConfig,
        snapshot: &MarketSnapshot,
        set: &ValuationSet,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let names = Names {
            project: &program.project_name,
            flat: &program.flat_allocation_label,
            basis: &set.tvl_basis,
        };

        let mut sections = vec![
            token_information(&names, program, snapshot),
            allocation_parameters(&names, program),
        ];
        for reference in &set.per_reference {
            sections.push(fdv_comparison(&names, program, &reference.label, &reference.valuation));
        }
        sections.push(tvl_analysis(&names, program, set));
        sections.push(total_summary(&names, program, set));
        sections.push(key_insights(&names, program, set));
        sections.push(generation_info(&names, snapshot, generated_at));

        Self { sections }
    }

    pub fn section(&self, title: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.title() == title)
    }

    /// Render as CSV text, one blank line between sections
    pub fn to_csv(&self) -> Result<String> {
        let mut blocks = Vec::with_capacity(self.sections.len());

        for section in &self.sections {
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(Vec::new());

            writer.write_record(&section.header)?;
            for row in &section.rows {
                writer.write_record(row)?;
            }

            let bytes = writer
                .into_inner()
                .map_err(|e| eyre!("Failed to flush CSV section {}: {}", section.title(), e))?;
            blocks.push(String::from_utf8(bytes)?);
        }

        Ok(blocks.join("\n"))
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let csv = self.to_csv()?;
        fs::write(path, csv)
            .map_err(|e| eyre!("Failed to write report to {}: {}", path.display(), e))?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}

fn percent(value: f64) -> String {
    format!("{}%", value)
}

fn token_information(
    names: &Names,
    program: &AllocationProgramConfig,
    snapshot: &MarketSnapshot,
) -> ReportSection {
    let mut section = ReportSection::new(&["Token Information", "Value", "Notes"]);

    for slot in &snapshot.tokens {
        token_rows(&mut section, slot);
    }

    section.row([
        format!("{} Total Supply", names.project),
        format_number(program.total_supply),
        format!("{} tokens", describe_quantity(program.total_supply)),
    ]);

    let reference_note = if snapshot.reference_tvl.is_fallback {
        "Fixed value"
    } else {
        "Arma + Pulse API"
    };
    section.row([
        format!("{} TVL", names.basis),
        format_currency(snapshot.reference_tvl.total),
        reference_note.to_string(),
    ]);
    section.row([
        format!("{} TVL", names.project),
        format_currency(snapshot.project_tvl.total),
        "From DefiLlama API + on-chain USDC".to_string(),
    ]);

    section
}

fn token_rows(section: &mut ReportSection, slot: &TokenSlot) {
    let label = &slot.reference.label;
    let token = slot.snapshot.value.as_ref();

    let symbol = token
        .map(|t| t.symbol.clone())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| label.to_uppercase());
    let name = token
        .map(|t| t.name.clone())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| label.clone());
    let change = token
        .and_then(|t| t.price_change_percentage_24h)
        .filter(|c| c.is_finite())
        .map(|c| format!("{:.2}%", c))
        .unwrap_or_else(|| "0%".to_string());
    let rank = token
        .and_then(|t| t.market_cap_rank)
        .map(|r| r.to_string())
        .unwrap_or_else(|| "0".to_string());

    let cells = [
        ("Token Symbol", symbol),
        ("Token Name", name),
        ("Current Price", format_currency_opt(token.and_then(|t| t.current_price))),
        ("Market Cap", format_currency_opt(token.and_then(|t| t.market_cap))),
        ("FDV", format_currency(slot.fdv())),
        ("Total Supply", format_number_opt(token.and_then(|t| t.total_supply))),
        ("Circulating Supply", format_number_opt(token.and_then(|t| t.circulating_supply))),
        ("24h Price Change", change),
        ("Market Cap Rank", rank),
    ];

    for (field, value) in cells {
        section.row([format!("{} {}", label, field), value, String::new()]);
    }
}

fn allocation_parameters(names: &Names, program: &AllocationProgramConfig) -> ReportSection {
    let mut section =
        ReportSection::new(&["Allocation Parameters", "Value", "Percentage", "Notes"]);
    let supply = describe_quantity(program.total_supply);

    let flat_tokens = program.flat_allocation_tokens();
    section.row([
        format!("{} Allocation", names.flat),
        format_number(flat_tokens),
        percent(program.flat_allocation_percent),
        format!("{} tokens out of {}", describe_quantity(flat_tokens), supply),
    ]);

    let point_tokens = program.point_program_tokens();
    section.row([
        "Point Program Tokens".to_string(),
        format_number(point_tokens),
        percent(program.point_program_percent),
        format!("{} tokens out of {}", describe_quantity(point_tokens), supply),
    ]);

    for phase in &program.phases {
        section.row([
            format!("{} Points Per Day", phase.name),
            format_number(phase.points_per_day),
            String::new(),
            format!("{} points per day", format_number(phase.points_per_day)),
        ]);
        section.row([
            format!("{} Total Points", phase.name),
            format_number(phase.total_points),
            String::new(),
            format!("{} total points", format_number(phase.total_points)),
        ]);
    }

    section
}

fn fdv_comparison(
    names: &Names,
    program: &AllocationProgramConfig,
    label: &str,
    valuation: &ValuationResult,
) -> ReportSection {
    let mut section = ReportSection::with_header(vec![
        format!("{} FDV Comparison", label),
        "Value".to_string(),
        "Calculation".to_string(),
    ]);
    let project = names.project;
    let flat = names.flat;

    section.row([
        format!("{} FDV at {} FDV", project, label),
        format_currency(valuation.reference_fdv),
        format!("Equals {} FDV", label),
    ]);
    section.row([
        format!("{} Token Price at {} FDV", project, label),
        format_currency(valuation.implied_token_price),
        format!("{} FDV / {} Supply", label, project),
    ]);
    section.row([
        format!("{} Market Cap at {} FDV", project, label),
        format_currency(valuation.implied_market_cap),
        format!("Equals {} FDV", label),
    ]);
    section.row([
        format!("{} Allocation Value", flat),
        format_currency(valuation.flat_allocation_value),
        format!("{} FDV * {}", label, percent(program.flat_allocation_percent)),
    ]);
    section.row([
        format!("{} Tokens", flat),
        format_number(valuation.flat_allocation_tokens),
        format!("{} Supply * {}", project, percent(program.flat_allocation_percent)),
    ]);
    section.row([
        "Point Program Allocation Value".to_string(),
        format_currency(valuation.point_program_allocation_value),
        format!("{} FDV * {}", label, percent(program.point_program_percent)),
    ]);

    for (phase, value) in program.phases.iter().zip(&valuation.per_phase_total_value) {
        section.row([
            format!("{} Total Value", phase.name),
            format_currency(*value),
            format!("{} FDV * {} Points / {} Supply", label, phase.name, project),
        ]);
    }
    for (phase, value) in program.phases.iter().zip(&valuation.per_phase_value_per_point) {
        section.row([
            format!("{} Value per Point", phase.name),
            format_currency(*value),
            format!("{} Total Value / {} Total Points", phase.name, phase.name),
        ]);
    }

    section
}

fn tvl_analysis(names: &Names, program: &AllocationProgramConfig, set: &ValuationSet) -> ReportSection {
    let mut section = ReportSection::new(&["TVL Analysis", "Value", "Calculation"]);
    let (project, basis) = (names.project, names.basis);
    let tvl = &set.tvl;

    section.row([
        "TVL Ratio".to_string(),
        format_fixed(tvl.ratio.value(), 4),
        format!("{} TVL / {} TVL", project, basis),
    ]);
    section.row([
        "TVL Difference".to_string(),
        format_currency(tvl.difference),
        format!("{} TVL - {} TVL", project, basis),
    ]);
    section.row([
        "TVL Percentage".to_string(),
        format!("{}%", format_fixed(tvl.percentage, 2)),
        format!("({} TVL / {} TVL) * 100", project, basis),
    ]);
    section.row([
        format!("{} Value (TVL Based)", names.flat),
        format_currency(set.tvl_scaled.flat_allocation_value),
        format!(
            "{} FDV * TVL Ratio * {}",
            basis,
            percent(program.flat_allocation_percent)
        ),
    ]);

    for (phase, value) in program.phases.iter().zip(&set.tvl_scaled.per_phase_total_value) {
        section.row([
            format!("{} Value (TVL Based)", phase.name),
            format_currency(*value),
            format!("{} FDV * TVL Ratio * {} Points / {} Supply", basis, phase.name, project),
        ]);
    }

    section
}

fn total_summary(names: &Names, program: &AllocationProgramConfig, set: &ValuationSet) -> ReportSection {
    let mut header = vec!["Total Allocation Summary".to_string(), "Category".to_string()];
    header.extend(set.per_reference.iter().map(|r| format!("Value at {} FDV", r.label)));
    header.push("Value at TVL Ratio".to_string());
    let mut section = ReportSection::with_header(header);

    let columns: Vec<&ValuationResult> = set
        .per_reference
        .iter()
        .map(|r| &r.valuation)
        .chain(std::iter::once(&set.tvl_scaled))
        .collect();

    section.row(summary_row(
        format!("{} Allocation", names.flat),
        &columns,
        |v| v.flat_allocation_value,
    ));
    for (i, phase) in program.phases.iter().enumerate() {
        section.row(summary_row(format!("{} Points", phase.name), &columns, |v| {
            v.per_phase_total_value.get(i).copied().unwrap_or(0.0)
        }));
    }
    section.row(summary_row(
        "Total Allocation Value".to_string(),
        &columns,
        |v| v.total_allocation_value,
    ));

    section
}

fn summary_row<F>(label: String, columns: &[&ValuationResult], pick: F) -> Vec<String>
where
    F: Fn(&ValuationResult) -> f64,
{
    std::iter::once(label)
        .chain(columns.iter().map(|v| format_currency(pick(v))))
        .collect()
}

fn key_insights(names: &Names, program: &AllocationProgramConfig, set: &ValuationSet) -> ReportSection {
    let mut section = ReportSection::new(&["Key Insights", "Description", "Value"]);
    let references = &set.per_reference;

    for r in references {
        section.row([
            format!("{} vs {} FDV", names.project, r.label),
            "Comparison".to_string(),
            format_currency(r.valuation.reference_fdv),
        ]);
    }
    for r in references {
        section.row([
            format!("Token Price at {} FDV", r.label),
            "Price per token".to_string(),
            format_currency(r.valuation.implied_token_price),
        ]);
    }
    for r in references {
        section.row([
            format!("{} Value at {} FDV", names.flat, r.label),
            "Allocation value".to_string(),
            format_currency(r.valuation.flat_allocation_value),
        ]);
    }
    for (i, phase) in program.phases.iter().enumerate() {
        for r in references {
            section.row([
                format!("{} Points Value at {} FDV", phase.name, r.label),
                "Points value".to_string(),
                format_currency(r.valuation.per_phase_total_value.get(i).copied().unwrap_or(0.0)),
            ]);
        }
    }
    for r in references {
        section.row([
            format!("Total Allocation Value at {} FDV", r.label),
            "Combined value".to_string(),
            format_currency(r.valuation.total_allocation_value),
        ]);
    }

    section
}

fn generation_info(names: &Names, snapshot: &MarketSnapshot, generated_at: DateTime<Utc>) -> ReportSection {
    let mut section = ReportSection::new(&["Data Generation Info", "Value", "Notes"]);

    let timestamp = generated_at.to_rfc3339_opts(SecondsFormat::Millis, true);
    section.row(["Generated At", timestamp.as_str(), "Timestamp"]);
    section.row(["Data Source", "CoinGecko & DefiLlama APIs", "Live data"]);

    for slot in &snapshot.tokens {
        section.row([
            format!("{} API Status", slot.reference.label),
            slot.snapshot.status.to_string(),
            "Data fetch status".to_string(),
        ]);
    }

    let project_status = if snapshot.project_tvl.total > 0.0 {
        FetchStatus::Success
    } else {
        FetchStatus::Failed
    };
    section.row([
        format!("{} TVL API Status", names.project),
        project_status.to_string(),
        "Data fetch status".to_string(),
    ]);

    section
}

// ============================================
// TESTS
// ============================================
