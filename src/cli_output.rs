//! CLI output formatting functions

use crate::discovery::SourceKind;
use crate::report::{LevelReport, ProjectSummary, RunSummary, ScopeTotals};
use std::io::{self, Write};
use std::path::Path;

pub const LEVELS_CSV_HEADER: &str =
    "file_path,mq_value,total_files,lines_of_code,total_functions,total_macros,cluster_children";

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// One row per cluster, grouped by level in completion order.
pub fn write_levels_csv(out: &mut dyn Write, reports: &[LevelReport]) -> io::Result<()> {
    writeln!(out, "{LEVELS_CSV_HEADER}")?;
    for level in reports {
        for row in &level.clusters {
            writeln!(
                out,
                "{},{},{},{},{},{},{}",
                csv_field(&row.id),
                level.mean_mq,
                row.total_files,
                row.lines_of_code,
                row.total_functions,
                row.total_macros,
                csv_field(&row.children.join("; "))
            )?;
        }
    }
    Ok(())
}

fn write_scope_rows(out: &mut dyn Write, label: &str, totals: &ScopeTotals) -> io::Result<()> {
    writeln!(out, "{} all,{},{}", csv_field(label), totals.all.files, totals.all.lines)?;
    for (kind, suffix) in [
        (SourceKind::Source, "c_only"),
        (SourceKind::Header, "h_only"),
        (SourceKind::Inline, "inl_only"),
    ] {
        let t = totals.kind(kind);
        writeln!(out, "{} {},{},{}", csv_field(label), suffix, t.files, t.lines)?;
    }
    Ok(())
}

pub fn write_project_summary_csv(out: &mut dyn Write, summary: &ProjectSummary) -> io::Result<()> {
    writeln!(out, "Files,Num of Files,LoC")?;
    write_scope_rows(out, &summary.project, &summary.overall)?;
    for (dir, totals) in &summary.directories {
        write_scope_rows(out, dir, totals)?;
    }
    Ok(())
}

pub fn print_run_summary(project: &str, summary: &RunSummary) {
    println!("{project}: {} levels clustered", summary.levels);
    println!("  levels with MQ = 1: {}", summary.trivial_levels);
    match summary.mean_mq {
        Some(mq) => println!("  mean MQ of the other levels: {mq:.4}"),
        None => println!("  mean MQ of the other levels: n/a"),
    }
}

pub fn print_written(path: &Path) {
    println!("wrote {}", path.display());
}
