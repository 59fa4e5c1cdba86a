use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{SummaryStats, Trends};

pub fn window_label(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    match (start, end) {
        (Some(s), Some(e)) => format!("{s} to {e}"),
        (Some(s), None) => format!("since {s}"),
        (None, Some(e)) => format!("through {e}"),
        (None, None) => "all time".to_string(),
    }
}

pub fn build_report(stats: &SummaryStats, trends: &Trends, window: &str) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Call Quality Report");
    let _ = writeln!(output, "Trend window: {window}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline");
    let _ = writeln!(output, "- Calls evaluated: {}", stats.total_calls);
    let _ = writeln!(
        output,
        "- Overall average score: {:.2}",
        stats.overall_average_score
    );
    let _ = writeln!(
        output,
        "- Operators: {}, scenarios: {}",
        stats.operators.len(),
        stats.scenarios.len()
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Process Mix");
    if stats.proceso_distribution.is_empty() {
        let _ = writeln!(output, "No calls recorded.");
    } else {
        for entry in &stats.proceso_distribution {
            let _ = writeln!(output, "- {}: {} calls", entry.proceso, entry.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Priority Mix");
    if stats.priority_distribution.is_empty() {
        let _ = writeln!(output, "No calls recorded.");
    } else {
        for entry in &stats.priority_distribution {
            let _ = writeln!(output, "- {}: {} calls", entry.priority, entry.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Operators");
    if stats.top_operators.is_empty() {
        let _ = writeln!(output, "No scored calls with an operator.");
    } else {
        for (rank, op) in stats.top_operators.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. {} averages {:.2} across {} calls",
                rank + 1,
                op.name,
                op.average_score,
                op.call_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Trend");
    if trends.overall.is_empty() {
        let _ = writeln!(output, "No calls in this window.");
    } else {
        let _ = writeln!(
            output,
            "| Date | Calls | Average | Adherence | Sentiment | Correctness | Speed |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|");
        for point in &trends.overall {
            let _ = writeln!(
                output,
                "| {} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2} |",
                point.date,
                point.count,
                point.average_score,
                point.adherence_score,
                point.sentiment_score,
                point.correctness_score,
                point.speed_score
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{build_trends, summarize};
    use crate::filter::tests::row;
    use crate::models::TrendQuery;

    #[test]
    fn empty_report_has_every_section() {
        let report = build_report(&summarize(&[]), &Trends::default(), "all time");
        assert!(report.starts_with("# Call Quality Report"));
        assert!(report.contains("- Calls evaluated: 0"));
        assert!(report.contains("## Top Operators\nNo scored calls with an operator."));
        assert!(report.contains("## Daily Trend\nNo calls in this window."));
    }

    #[test]
    fn report_lists_operators_and_days() {
        let mut a = row(1, Some(80.0));
        a.operator_name = Some("Ana".into());
        let mut b = row(2, Some(60.0));
        b.operator_name = Some("Luis".into());
        let rows = vec![a, b];

        let report = build_report(
            &summarize(&rows),
            &build_trends(&rows, &TrendQuery::default()),
            &window_label(None, None),
        );
        assert!(report.contains("1. Ana averages 80.00 across 1 calls"));
        assert!(report.contains("2. Luis averages 60.00 across 1 calls"));
        assert!(report.contains("| 2024-06-01 | 2 | 70.00 |"));
        assert!(report.contains("- DESCONOCIDO: 2 calls"));
    }

    #[test]
    fn window_labels() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 1);
        assert_eq!(window_label(d, None), "since 2024-06-01");
        assert_eq!(window_label(d, d), "2024-06-01 to 2024-06-01");
    }
}
