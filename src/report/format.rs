//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the planning code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::PlanOutput;
use crate::domain::{
    ComponentIntervalRow, CounterSummaryRow, RecurringOverviewRow, ReplacementEvent, ReplacementOverviewRow,
    StrategyDataRow, UnitGap, WorkOrderAverage,
};
use crate::io::ingest::RowError;

/// Format the run header and every plan table.
pub fn format_plan(output: &PlanOutput) -> String {
    let mut out = String::new();

    out.push_str("=== eso - Equipment Strategy Optimization ===\n");
    out.push_str(&format!("Fleet: {}\n", display_or_dash(&output.fleet)));
    out.push_str(&format!("Units: {}\n", output.units.len()));
    out.push_str(&format!("As-of: {}\n", output.as_of));
    out.push_str(&format!("EOL: {}\n", output.eol));
    out.push('\n');

    out.push_str("PM02 average cost per work order:\n");
    out.push_str(&format_averages(&output.pm02.averages));
    out.push('\n');

    if !output.strategy_data.is_empty() {
        out.push_str(&format!(
            "{} strategy (average cost per work order):\n",
            display_or_dash(&output.fleet)
        ));
        out.push_str(&format_strategy(&output.strategy_data));
        out.push('\n');
    }

    out.push_str("Counter data:\n");
    out.push_str(&format_counter_summary(&output.counter_summary));
    out.push('\n');

    if !output.component_intervals.is_empty() {
        out.push_str("Component counters with maintenance interval (hours):\n");
        out.push_str(&format_component_intervals(&output.component_intervals));
        out.push('\n');
    }

    for (schedule, overview) in output.schedules.iter().zip(&output.replacement_overviews) {
        out.push_str(&format!(
            "{} ({} h): replacement schedule\n",
            schedule.scenario.name, schedule.scenario.threshold_hours
        ));
        out.push_str(&format_events(&schedule.events));
        out.push('\n');

        out.push_str(&format!("{}: PM02 fiscal-year overview\n", overview.scenario));
        out.push_str(&format_replacement_overview(&overview.rows));
        out.push('\n');
    }

    if let Some(recurring) = output.recurring_overviews.first() {
        out.push_str("PM01/PM03 fiscal-year overview (all scenarios):\n");
        out.push_str(&format_recurring_overview(&recurring.rows));
        out.push('\n');
    }

    if !output.gaps.is_empty() {
        out.push_str("Units not scheduled:\n");
        out.push_str(&format_gaps(&output.gaps));
        out.push('\n');
    }
    if !output.row_errors.is_empty() {
        out.push_str(&format!("Skipped input rows ({}):\n", output.row_errors.len()));
        out.push_str(&format_row_errors(&output.row_errors));
    }

    out
}

pub fn format_events(rows: &[ReplacementEvent]) -> String {
    if rows.is_empty() {
        return "(no replacements before EOL)\n".to_string();
    }
    let mut out = header(&format!(
        "{:<16} {:>4} {:>14} {:<10} {:>16}",
        "unit", "seq", "target_hours", "date", "cost"
    ));
    for r in rows {
        push_line(
            &mut out,
            &format!(
                "{:<16} {:>4} {:>14.0} {:<10} {:>16.2}",
                truncate(&r.unit_id, 16),
                r.sequence,
                r.target_hours,
                r.date,
                r.cost
            ),
        );
    }
    out
}

pub fn format_replacement_overview(rows: &[ReplacementOverviewRow]) -> String {
    let mut out = header(&format!(
        "{:<8} {:<10} {:<10} {:>12} {:>16}",
        "fy", "start", "end", "replacements", "cost"
    ));
    for r in rows {
        push_line(
            &mut out,
            &format!(
                "{:<8} {:<10} {:<10} {:>12} {:>16.2}",
                r.fiscal_year, r.start, r.end, r.replacements, r.cost
            ),
        );
    }
    out
}

pub fn format_recurring_overview(rows: &[RecurringOverviewRow]) -> String {
    let mut out = header(&format!(
        "{:<8} {:<10} {:<10} {:>14} {:>14} {:>14}",
        "fy", "start", "end", "pm01", "pm03", "total"
    ));
    for r in rows {
        push_line(
            &mut out,
            &format!(
                "{:<8} {:<10} {:<10} {:>14.2} {:>14.2} {:>14.2}",
                r.fiscal_year, r.start, r.end, r.pm01, r.pm03, r.total
            ),
        );
    }
    out
}

pub fn format_averages(rows: &[WorkOrderAverage]) -> String {
    if rows.is_empty() {
        return "(no PM02 history for this fleet)\n".to_string();
    }
    let mut out = header(&format!("{:<24} {:>6} {:>16}", "work_order_type", "orders", "average_cost"));
    for r in rows {
        push_line(
            &mut out,
            &format!(
                "{:<24} {:>6} {:>16.2}",
                truncate(&r.work_order_type, 24),
                r.orders,
                r.average_cost
            ),
        );
    }
    out
}

pub fn format_strategy(rows: &[StrategyDataRow]) -> String {
    let mut out = header(&format!(
        "{:<16} {:<24} {:>10} {:>6} {:>16}",
        "unit", "work_order_type", "interval", "orders", "average_cost"
    ));
    for r in rows {
        push_line(
            &mut out,
            &format!(
                "{:<16} {:<24} {:>10} {:>6} {:>16}",
                truncate(&r.unit_id, 16),
                truncate(&r.work_order_type, 24),
                r.interval_hours.map(|h| format!("{h:.0}")).unwrap_or_default(),
                r.orders,
                r.average_cost.map(|c| format!("{c:.2}")).unwrap_or_else(|| "-".to_string()),
            ),
        );
    }
    out
}

pub fn format_component_intervals(rows: &[ComponentIntervalRow]) -> String {
    let mut out = header(&format!(
        "{:<16} {:<20} {:<10} {:>10} {:>10} {:>10}",
        "unit", "component", "last_date", "hours", "interval", "remaining"
    ));
    for r in rows {
        push_line(
            &mut out,
            &format!(
                "{:<16} {:<20} {:<10} {:>10.0} {:>10} {:>10}",
                truncate(&r.unit_id, 16),
                truncate(&r.component, 20),
                r.last_date,
                r.component_hours,
                r.interval_hours.map(|h| format!("{h:.0}")).unwrap_or_default(),
                r.hours_remaining.map(|h| format!("{h:.0}")).unwrap_or_default(),
            ),
        );
    }
    out
}

pub fn format_counter_summary(rows: &[CounterSummaryRow]) -> String {
    let mut out = header(&format!(
        "{:<16} {:>5} {:>7} {:<10} {:>12} {:>10} {:<18}",
        "unit", "used", "dropped", "last_date", "last_hours", "h/day", "status"
    ));
    for r in rows {
        push_line(
            &mut out,
            &format!(
                "{:<16} {:>5} {:>7} {:<10} {:>12} {:>10} {:<18}",
                truncate(&r.unit_id, 16),
                r.samples_used,
                r.samples_dropped,
                r.last_date.map(|d| d.to_string()).unwrap_or_default(),
                r.last_hours.map(|h| format!("{h:.0}")).unwrap_or_default(),
                r.hours_per_day.map(|h| format!("{h:.2}")).unwrap_or_default(),
                r.status.label(),
            ),
        );
    }
    out
}

fn format_gaps(rows: &[UnitGap]) -> String {
    let mut out = String::new();
    for g in rows {
        push_line(&mut out, &format!("- {}: {}", g.unit_id, g.reason));
    }
    out
}

fn format_row_errors(rows: &[RowError]) -> String {
    let mut out = String::new();
    for e in rows {
        push_line(&mut out, &format!("- {} line {}: {}", e.table, e.line, e.message));
    }
    out
}

/// Column header plus a dashed rule matching its width.
fn header(title: &str) -> String {
    let mut out = String::new();
    push_line(&mut out, title);
    let rule: String = title
        .chars()
        .map(|c| if c == ' ' { ' ' } else { '-' })
        .collect();
    push_line(&mut out, &rule);
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn display_or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
