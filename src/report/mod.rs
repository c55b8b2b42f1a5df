//! Text reports for the `show` command.

pub mod format;

pub use format::*;

use crate::data::store::UploadSummary;

/// One line describing what an upload kept and dropped.
pub fn format_upload_summary(summary: &UploadSummary) -> String {
    let mut line = format!(
        "{}: {} of {} row(s) uploaded",
        summary.category, summary.accepted, summary.rows
    );
    if summary.shape_mismatches > 0 {
        line.push_str(&format!(
            ", {} without `{}`",
            summary.shape_mismatches,
            summary.category.marker_field()
        ));
    }
    let looks_like: Vec<String> = summary
        .other_shapes
        .iter()
        .map(|(category, n)| format!("{n} {category}"))
        .collect();
    if !looks_like.is_empty() {
        line.push_str(&format!(" (looks like: {})", looks_like.join(", ")));
    }
    line
}
