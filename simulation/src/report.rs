//! Text reports built from snapshots

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::components::RpsType;
use crate::snapshot::Snapshot;

const RULE_WIDTH: usize = 70;

/// Living members of every split lineage, summed per upper-cased path
/// ("ROCK -> PAPER"). Ordered by population, descending, then by path.
fn path_populations(snapshot: &Snapshot) -> Vec<(Vec<String>, usize)> {
    let mut totals: BTreeMap<Vec<String>, usize> = BTreeMap::new();
    for entry in &snapshot.lineage_populations {
        let Some(id) = entry.lineage else { continue };
        if entry.count == 0 || snapshot.lineage(id).map_or(true, |n| n.is_root()) {
            continue;
        }
        if let Some(path) = snapshot.lineage_path(id) {
            let parts = path.iter().map(|t| t.as_str().to_uppercase()).collect();
            *totals.entry(parts).or_default() += entry.count;
        }
    }
    let mut paths: Vec<_> = totals.into_iter().collect();
    paths.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    paths
}

/// Population report: agents without a lineage per base type, then
/// lineages grouped by path.
pub fn lineage_report(snapshot: &Snapshot) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    let mut unsplit = [0usize; 3];
    let mut unique_lineages = 0;
    for agent in snapshot.agents().filter(|a| a.is_alive()) {
        if agent.lineage.is_none() {
            unsplit[agent.kind.index()] += 1;
        }
    }
    for entry in &snapshot.lineage_populations {
        if entry.lineage.is_some() && entry.count > 0 {
            unique_lineages += 1;
        }
    }

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Lineage Population Report - Tick {}", snapshot.tick);
    let _ = writeln!(out, "{rule}\n");

    let _ = writeln!(out, "Base Types (No Lineage):");
    let _ = writeln!(out, "{thin}");
    for kind in RpsType::ALL {
        let count = unsplit[kind.index()];
        if count > 0 {
            let _ = writeln!(out, "  {:15} : {:4} people", kind.as_str().to_uppercase(), count);
        }
    }
    let _ = writeln!(out);

    let paths = path_populations(snapshot);
    if paths.is_empty() {
        let _ = writeln!(out, "No lineages created.");
    } else {
        let _ = writeln!(out, "Lineages:");
        let _ = writeln!(out, "{thin}");
        for (parts, count) in &paths {
            let _ = writeln!(out, "  {:50} : {:4} people", parts.join(" -> "), count);
        }
    }

    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "Total People: {}", snapshot.living_total());
    let _ = writeln!(out, "Unique Lineages: {unique_lineages}");
    let _ = writeln!(out, "{rule}");
    out
}

/// Boxed lineage tree. Single splits sit on one line; deeper paths are
/// drawn one level per line. Empty when no split lineage has members.
pub fn lineage_tree(snapshot: &Snapshot) -> String {
    let mut paths = path_populations(snapshot);
    if paths.is_empty() {
        return String::new();
    }
    paths.sort_by(|a, b| {
        a.0.len()
            .cmp(&b.0.len())
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut lines = vec![format!("+- Lineage Tree {}+", "-".repeat(50))];
    for (parts, count) in &paths {
        if parts.len() == 2 {
            lines.push(format!("|  {:8} ---> {:8}  [{:3} people]", parts[0], parts[1], count));
            continue;
        }
        let mut indent = String::from("|  ");
        let last = parts.len() - 1;
        for (i, part) in parts.iter().enumerate() {
            if i == 0 {
                lines.push(format!("|  {part:8}"));
            } else if i == last {
                let connector = if i > 1 { "+->" } else { "-->" };
                lines.push(format!("{indent}{connector} {part:8}  [{count:3} people]"));
            } else {
                lines.push(format!("{indent}|-> {part:8}"));
                indent.push_str("   ");
            }
        }
    }
    lines.push(format!("+{}+", "-".repeat(64)));
    lines.join("\n")
}
