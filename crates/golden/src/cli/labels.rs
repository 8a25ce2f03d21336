//! Labels command - inspect a label store

use crate::cli::config::{load_config, resolve_label_store};
use crate::cli::error::HelpfulError;
use crate::cli::output::{color_for_label, print_table, print_table_colored};
use anyhow::{Context, Result};
use golden_core::{JsonLabelStore, Label, LabelAssignment, LabelStore};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Arguments for the labels command
#[derive(Debug)]
pub struct LabelsArgs {
    pub config: Option<PathBuf>,
    pub labels: Option<PathBuf>,
    /// Only show labels attached to this file
    pub file: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct LabelSummary {
    #[serde(flatten)]
    label: Label,
    files: usize,
}

#[derive(Debug, Serialize)]
struct FileLabels {
    file: String,
    labels: Vec<FileLabel>,
}

#[derive(Debug, Serialize)]
struct FileLabel {
    name: String,
    note: String,
    applied_at: String,
}

/// Execute the labels command
pub fn run(args: LabelsArgs) -> Result<()> {
    let (config, _) = load_config(args.config.as_deref())?;
    let store_path = resolve_label_store(&config, args.labels.as_deref())?;
    if !store_path.exists() {
        return Err(HelpfulError::new(format!(
            "No label store at {}",
            store_path.display()
        ))
        .with_context("Labels are written by `golden compare`")
        .with_suggestions([
            "TRY: golden compare --golden <DIR> --dirty <DIR>".to_string(),
            "TRY: Point at another store with --labels <FILE>".to_string(),
        ])
        .into());
    }

    let store = JsonLabelStore::open(&store_path)
        .map_err(|e| HelpfulError::label_store_unreadable(&store_path, &e.to_string()))?;

    match &args.file {
        Some(file) => show_file(&store, file, args.json),
        None => show_labels(&store, &store_path, args.json),
    }
}

fn show_labels(store: &JsonLabelStore, store_path: &Path, json: bool) -> Result<()> {
    let counts = store.assignment_counts();
    let mut labels = store.list_all()?;
    labels.sort_by_key(|l| l.id);

    let summaries: Vec<LabelSummary> = labels
        .into_iter()
        .map(|label| LabelSummary {
            files: counts.get(&label.id).copied().unwrap_or(0),
            label,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No labels in {}", store_path.display());
        return Ok(());
    }

    println!("Label store: {}", store_path.display());
    println!();
    let rows = summaries
        .iter()
        .map(|s| {
            vec![
                (s.label.id.to_string(), None),
                (s.label.name.clone(), color_for_label(s.label.color)),
                (s.label.color.as_str().to_string(), None),
                (s.files.to_string(), None),
                (s.label.description.clone(), None),
            ]
        })
        .collect();
    print_table_colored(&["ID", "Name", "Color", "Files", "Description"], rows);
    Ok(())
}

fn show_file(store: &JsonLabelStore, file: &Path, json: bool) -> Result<()> {
    // Locators are stored canonical; fall back to the literal path for files
    // that have since been removed
    let locator = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
    let assignments = store.assignments_for(&locator);

    let labels = assignments
        .iter()
        .map(|a| resolve_assignment(store, a))
        .collect::<Result<Vec<_>>>()?;
    let report = FileLabels {
        file: locator.display().to_string(),
        labels,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.labels.is_empty() {
        println!("{} carries no labels", report.file);
        return Ok(());
    }

    println!("{}", report.file);
    println!();
    print_table(
        &["Label", "Applied", "Note"],
        report
            .labels
            .into_iter()
            .map(|l| vec![l.name, l.applied_at, l.note])
            .collect(),
    );
    Ok(())
}

fn resolve_assignment(store: &JsonLabelStore, assignment: &LabelAssignment) -> Result<FileLabel> {
    let label = store
        .label(assignment.label_id)
        .with_context(|| format!("Assignment refers to unknown label {}", assignment.label_id))?;
    Ok(FileLabel {
        name: label.name,
        note: assignment.note.clone(),
        applied_at: assignment.applied_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    })
}
