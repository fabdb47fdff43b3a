use bid_intake::config::AppConfig;
use bid_intake::error::AppError;
use bid_intake::workflows::classification::ClassificationImporter;
use bid_intake::workflows::fields::{
    normalize, tokenize, CustomMappingSnapshot, CustomMappingTable, FieldImporter, IntentResolver,
    ResolutionResult,
};
use bid_intake::workflows::report::ImportReport;
use clap::Args;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct FieldsArgs {
    /// Takeoff export with Key, Value, and optional Section columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// JSON file of confirmed custom mappings to apply to this import
    #[arg(long)]
    pub(crate) custom_mappings: Option<PathBuf>,
    /// Print the full report as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ClassificationsArgs {
    /// Takeoff export with Classification, Quantity, and Unit columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Print the full report as JSON instead of a text summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct NormalizeArgs {
    /// Raw field key as it appears in the spreadsheet
    pub(crate) key: String,
    /// Optional numeric value, used for unit detection
    #[arg(long)]
    pub(crate) value: Option<f64>,
}

pub(crate) fn run_fields(args: FieldsArgs) -> Result<(), AppError> {
    let FieldsArgs {
        csv,
        custom_mappings,
        json,
    } = args;

    let config = AppConfig::load()?;
    let importer = FieldImporter::new(config.resolution.into(), config.report.into());
    let snapshot = load_mappings(custom_mappings.as_deref())?;
    let report = importer.from_path(&csv, &snapshot)?;

    emit_report(&report, json, &format!("Field import: {}", csv.display()));
    Ok(())
}

pub(crate) fn run_classifications(args: ClassificationsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let importer = ClassificationImporter::new(config.report.into());
    let report = importer.from_path(&args.csv)?;

    emit_report(
        &report,
        args.json,
        &format!("Classification import: {}", args.csv.display()),
    );
    Ok(())
}

pub(crate) fn run_normalize(args: NormalizeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let resolver = IntentResolver::standard(config.resolution.into());
    let resolution =
        resolver.resolve_field(&args.key, args.value, &CustomMappingSnapshot::empty());

    let normalized = normalize(&args.key);
    println!("Key: {}", args.key);
    println!("Normalized: {}", normalized);
    println!("Tokens: {}", tokenize(&normalized).join(", "));
    println!("Unit kind: {}", resolution.unit_kind.label());

    match &resolution.result {
        ResolutionResult::Mapped {
            target, rule_id, ..
        } => println!("Mapped: {} via {}", target, rule_id),
        ResolutionResult::Ambiguous { candidates, .. } => {
            println!("Ambiguous between:");
            for candidate in candidates {
                println!(
                    "  - {} ({} scored {})",
                    candidate.target, candidate.rule_id, candidate.score
                );
            }
        }
        ResolutionResult::Unmapped { reason, .. } => println!("Unmapped: {}", reason),
    }
    println!("Explanation: {}", resolution.result.explanation());
    Ok(())
}

fn load_mappings(path: Option<&Path>) -> Result<CustomMappingSnapshot, AppError> {
    let Some(path) = path else {
        return Ok(CustomMappingSnapshot::empty());
    };
    let table = CustomMappingTable::from_json_reader(File::open(path)?)?;
    Ok(table.snapshot())
}

fn emit_report(report: &ImportReport, json: bool, title: &str) {
    if json {
        print_json(report);
    } else {
        render_report(report, title);
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(err) => println!("Report payload unavailable: {}", err),
    }
}

fn render_report(report: &ImportReport, title: &str) {
    let summary = report.summary;
    println!("{}", title);
    println!(
        "- {} rows parsed | {} mapped | {} unmapped | {} ignored",
        summary.parsed_rows, summary.mapped_rows, summary.unmapped_rows, summary.ignored_rows
    );
    println!("- Confidence: {}", summary.confidence.label());

    if !report.missing_requirements.is_empty() {
        println!("Missing requirements:");
        for missing in &report.missing_requirements {
            println!("  - {}", missing);
        }
    }

    let quantities = report.canonical_quantities();
    if !quantities.is_empty() {
        println!("Canonical quantities:");
        for line in quantities {
            println!(
                "  - {} / {}: {} ({} rows)",
                line.section, line.label, line.quantity, line.source_rows
            );
        }
    }

    let alternates = report.alternate_quantities();
    if !alternates.is_empty() {
        println!("Alternates:");
        for line in alternates {
            println!("  - {} / {}: {}", line.section, line.label, line.quantity);
        }
    }

    if !report.unmapped.is_empty() {
        println!("Needs review:");
        for item in &report.unmapped {
            println!(
                "  - [{}] row {} '{}': {}",
                item.reason.label(),
                item.row_index + 1,
                item.raw_key,
                item.explanation
            );
            for suggestion in &item.suggestions {
                match suggestion.score {
                    Some(score) => println!("      suggestion: {} ({})", suggestion.target, score),
                    None => println!("      suggestion: {}", suggestion.target),
                }
            }
            if !item.suggested_tokens.is_empty() {
                println!("      tokens: {}", item.suggested_tokens.join(", "));
            }
        }
    }

    if !report.ignored.is_empty() {
        println!("Ignored rows:");
        for row in &report.ignored {
            println!(
                "  - row {} '{}': {} ({})",
                row.row_index + 1,
                row.raw_key,
                row.reason.label(),
                row.detail
            );
        }
    }
}
