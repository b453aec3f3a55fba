use std::path::PathBuf;

use anyhow::{Context, Result};
use casefill_cli::attachments::AttachmentLocator;
use casefill_cli::record::columns;
use casefill_cli::{CaseRecord, SheetData, Workbook};
use clap::Args;
use serde::Serialize;

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    /// Workbook to inspect (overrides workbook.path)
    #[arg(short, long, value_name = "PATH")]
    pub workbook: Option<PathBuf>,

    /// Sheet name (defaults to the first sheet)
    #[arg(long)]
    pub sheet: Option<String>,
}

#[derive(Debug, Serialize)]
struct CheckedRow {
    row: usize,
    case_number: String,
    distribution_date: String,
    citation_date: String,
    claim_amount: String,
    employer: String,
    employee_type: String,
    secondary_parties: usize,
    attachment: PathBuf,
    attachment_found: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    workbook: PathBuf,
    sheet: String,
    missing_columns: Vec<String>,
    skipped_rows: Vec<usize>,
    rows: Vec<CheckedRow>,
}

pub async fn cmd_check(args: CheckArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let config = ctx.config();
    let path = args.workbook.unwrap_or_else(|| config.workbook.path.clone());
    let sheet = args.sheet.or_else(|| config.workbook.sheet.clone());
    let workbook = Workbook::load(&path, sheet.as_deref())
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let attachments = AttachmentLocator::from_config(&config.attachments);
    let report = inspect(&workbook.path, &workbook.sheet, &attachments);

    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Human => print_human(&report),
    }
    Ok(())
}

fn inspect(path: &std::path::Path, sheet: &SheetData, attachments: &AttachmentLocator) -> CheckReport {
    let mut rows = Vec::new();
    let mut skipped_rows = Vec::new();
    for index in 0..sheet.row_count() {
        let Some(record) = CaseRecord::from_sheet(sheet, index) else {
            skipped_rows.push(index + 2);
            continue;
        };
        rows.push(CheckedRow {
            row: record.sheet_row(),
            attachment: attachments.path_for(&record.case_number),
            attachment_found: attachments.exists(&record.case_number),
            secondary_parties: record.secondary_parties.len(),
            case_number: record.case_number,
            distribution_date: record.distribution_date,
            citation_date: record.citation_date,
            claim_amount: record.claim_amount,
            employer: record.employer,
            employee_type: record.employee_type,
        });
    }
    CheckReport {
        workbook: path.to_path_buf(),
        sheet: sheet.name.clone(),
        missing_columns: sheet
            .missing_columns(&columns::expected())
            .into_iter()
            .map(str::to_string)
            .collect(),
        skipped_rows,
        rows,
    }
}

fn print_human(report: &CheckReport) {
    println!("Workbook: {} (sheet '{}')", report.workbook.display(), report.sheet);
    if report.missing_columns.is_empty() {
        println!("All expected columns present");
    } else {
        println!("Missing columns: {}", report.missing_columns.join(", "));
    }
    for row in &report.rows {
        println!(
            "row {:>4}  {}  distribuição={}  citação={}  valor={}  reclamadas={}  anexo={}",
            row.row,
            row.case_number,
            or_dash(&row.distribution_date),
            or_dash(&row.citation_date),
            or_dash(&row.claim_amount),
            row.secondary_parties,
            if row.attachment_found { "ok" } else { "ausente" },
        );
    }
    if !report.skipped_rows.is_empty() {
        let skipped: Vec<String> = report.skipped_rows.iter().map(usize::to_string).collect();
        println!("Rows without a case number: {}", skipped.join(", "));
    }
    println!("{} row(s) ready", report.rows.len());
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}
