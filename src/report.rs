//! Plain-text rendering of prediction reports.

use crate::models::PredictionReport;

/// Format an amount as US dollars with thousands separators, e.g. `$12,345.68`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

/// Render the diagnostics block followed by the predicted cost.
///
/// Example output:
/// ```text
/// Number of tickets: 1
/// Project client: No client
/// total_cr_max: 5
/// ...
/// Predicted project cost: $1,234.56
/// ```
pub fn render_text(report: &PredictionReport) -> String {
    let mut out = String::new();
    let mut line = |label: &str, value: String| {
        out.push_str(label);
        out.push_str(": ");
        out.push_str(&value);
        out.push('\n');
    };

    line("Number of tickets", report.ticket_count.to_string());
    line("Project client", report.client.clone());
    line("total_cr_max", report.totals.total_crew_max.to_string());
    line("total_cr_min", report.totals.total_crew_min.to_string());
    line("total_crew_best", report.totals.total_crew_best_hours.to_string());
    line("total_crew_worst", report.totals.total_crew_worst_hours.to_string());
    line("total_sqft", report.totals.total_sqft.to_string());
    line("line_items", format!("[{}]", report.line_items.join(", ")));
    line("signature", format!("{:?}", report.signature));

    let fallback = if report.line_item_encoding.fallback {
        " (median fallback)"
    } else {
        ""
    };
    line(
        "line_item_mean_enc",
        format!("{}{fallback}", report.line_item_encoding.value),
    );
    line("mean_crew", report.totals.mean_crew.to_string());
    line(
        "mean_client_rscore_per_ticket",
        report.client_features.mean_reliability_score.to_string(),
    );
    line(
        "mean_client_cost_per_ticket",
        report.client_features.mean_cost.to_string(),
    );
    line(
        "total_client_tix_count",
        report.client_features.ticket_count.to_string(),
    );
    line("Predicted project cost", format_currency(report.predicted_cost));

    out
}
