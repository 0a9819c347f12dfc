/// Heading of the canonical section every displayed report starts at.
pub const DETAIL_HEADING: &str = "# Informe Detallado";

/// Cut any preamble the backend prepends before the detailed report heading.
/// Without the heading the whole text is kept. Either way the result is trimmed.
pub fn detail_section(public_report: &str) -> &str {
    match public_report.find(DETAIL_HEADING) {
        Some(idx) => public_report[idx..].trim(),
        None => public_report.trim(),
    }
}
