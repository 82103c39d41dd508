use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::Utc;
use colored::Colorize;
use serde_json::json;

use archivault_sdk::{Archive, ArchiveConfig, EntityId, NormalizedState};
use archivault_trash::format_relative_time;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ArchiveConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ArchiveConfig::default(),
    };
    let format = cli.format;
    match cli.command {
        Command::Stats(args) => cmd_stats(&open(&args.file, config)?, &format),
        Command::Tree(args) => cmd_tree(&open(&args.file, config)?, args.depth),
        Command::Validate(args) => cmd_validate(&open(&args.file, config)?, &format),
        Command::Roundtrip(args) => {
            cmd_roundtrip(&open(&args.input, config)?, args.output.as_deref())
        }
        Command::Trash(args) => cmd_trash(open(&args.file, config)?, &args.ids, &format),
    }
}

fn open(path: &Path, config: ArchiveConfig) -> anyhow::Result<Archive> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Archive::from_json_str(&text, config).with_context(|| format!("normalizing {}", path.display()))
}

fn cmd_stats(archive: &Archive, format: &OutputFormat) -> anyhow::Result<()> {
    let state = archive.state();
    let by_type = state.counts_by_type();
    match format {
        OutputFormat::Json => {
            let out = json!({
                "root": state.root_id(),
                "entities": state.entity_count(),
                "byType": by_type,
                "trash": archive.trash_stats(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            let root = state.root_id().map(EntityId::as_str).unwrap_or("(none)");
            println!("Root: {}", root.cyan());
            println!("Entities: {}", state.entity_count().to_string().bold());
            for (kind, count) in &by_type {
                println!("  {:<16} {}", kind.as_str(), count);
            }
        }
    }
    Ok(())
}

fn cmd_tree(archive: &Archive, depth: Option<usize>) -> anyhow::Result<()> {
    let lines = render_tree(archive.state(), depth);
    if lines.is_empty() {
        println!("Empty archive.");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

/// One line per node, indented by depth. Ranges are listed after `items`.
fn render_tree(state: &NormalizedState, max_depth: Option<usize>) -> Vec<String> {
    fn walk(
        state: &NormalizedState,
        id: &EntityId,
        depth: usize,
        max: Option<usize>,
        out: &mut Vec<String>,
    ) {
        let Some(entity) = state.get_entity(id.as_str()) else {
            return;
        };
        let label = entity.label_text().unwrap_or_default();
        let indent = "  ".repeat(depth);
        let line = format!("{indent}{} {id} {label}", entity.kind.as_str());
        out.push(line.trim_end().to_string());
        if max.is_some_and(|m| depth >= m) {
            return;
        }
        let id = id.as_str();
        for child in state.children(id).iter().chain(state.structures_of(id)) {
            walk(state, child, depth + 1, max, out);
        }
    }

    let mut out = Vec::new();
    if let Some(root) = state.root_id() {
        walk(state, root, 0, max_depth, &mut out);
    }
    out
}

fn cmd_validate(archive: &Archive, format: &OutputFormat) -> anyhow::Result<()> {
    let report = archive.check_integrity();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            if report.is_valid() {
                println!(
                    "{} {} entities, {} trashed, no issues",
                    "✓".green().bold(),
                    report.entity_count,
                    report.trashed_count
                );
            }
            for issue in &report.issues {
                println!(
                    "{} {:?} {}: {}",
                    "✗".red().bold(),
                    issue.kind,
                    issue.id.as_str().yellow(),
                    issue.description
                );
            }
        }
    }
    if !report.is_valid() {
        bail!("{} integrity issue(s) found", report.issues.len());
    }
    Ok(())
}

fn cmd_roundtrip(archive: &Archive, output: Option<&Path>) -> anyhow::Result<()> {
    let document = archive.to_json()?;
    let text = serde_json::to_string_pretty(&document)?;
    match output {
        Some(path) => {
            fs::write(path, text + "\n").with_context(|| format!("writing {}", path.display()))?;
            println!("{} Wrote {}", "✓".green().bold(), path.display().to_string().bold());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_trash(mut archive: Archive, ids: &[String], format: &OutputFormat) -> anyhow::Result<()> {
    let ids: Vec<EntityId> = ids.iter().map(EntityId::new).collect();
    let outcome = archive.batch_move_to_trash(&ids);
    let stats = archive.trash_stats();
    match format {
        OutputFormat::Json => {
            let errors: Vec<_> = outcome
                .errors
                .iter()
                .map(|(id, e)| json!({ "id": id, "error": e.to_string() }))
                .collect();
            let out = json!({
                "processed": outcome.processed_count,
                "failed": outcome.failed_count,
                "errors": errors,
                "trash": stats,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{} Trashed {} item(s)", "✓".green().bold(), outcome.processed_count);
            for (id, e) in &outcome.errors {
                println!("  {} {}: {}", "✗".red(), id.as_str().yellow(), e);
            }
            println!("Trash: {} item(s), {} expiring soon", stats.item_count, stats.expiring_soon);
            for (kind, count) in &stats.items_by_type {
                println!("  {:<16} {}", kind.as_str(), count);
            }
            if let Some(oldest) = stats.oldest_item {
                println!("  Oldest: {}", format_relative_time(oldest, Utc::now()).dimmed());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive() -> Archive {
        let doc = r#"{
            "id": "col", "type": "Collection", "label": { "en": ["Letters"] },
            "items": [
                { "id": "m1", "type": "Manifest", "label": "First",
                  "items": [{ "id": "c1", "type": "Canvas" }],
                  "structures": [{ "id": "r1", "type": "Range" }] }
            ]
        }"#;
        Archive::from_json_str(doc, ArchiveConfig::default()).unwrap()
    }

    #[test]
    fn tree_lists_items_then_structures() {
        let lines = render_tree(archive().state(), None);
        assert_eq!(
            lines,
            vec![
                "Collection col Letters",
                "  Manifest m1 First",
                "    Canvas c1",
                "    Range r1",
            ]
        );
    }

    #[test]
    fn tree_depth_limit() {
        let lines = render_tree(archive().state(), Some(1));
        assert_eq!(lines.len(), 2);
        assert!(render_tree(&NormalizedState::new(), None).is_empty());
    }
}
