//! Cell formatting and plain-text tables for printed views.

use stocktrack_core::{Equity, SortColumn};

/// Placeholder printed for absent values.
pub const ABSENT: &str = "-";

/// Columns shown when none are requested.
pub const DEFAULT_COLUMNS: [SortColumn; 9] = [
    SortColumn::Ticker,
    SortColumn::Category,
    SortColumn::MarketCap,
    SortColumn::NextEarnings,
    SortColumn::EpsYoyTtm,
    SortColumn::SalesYoyTtm,
    SortColumn::EpsSurprise,
    SortColumn::Revisions,
    SortColumn::AvgTargetPrice,
];

/// `3.91e12` → `$3.91T`, `850e6` → `$850.00M`, `12.5` → `$12.50`.
pub fn format_magnitude(value: f64) -> String {
    let (sign, abs) = if value < 0.0 { ("-", -value) } else { ("", value) };
    let (scaled, suffix) = if abs >= 1e12 {
        (abs / 1e12, "T")
    } else if abs >= 1e9 {
        (abs / 1e9, "B")
    } else if abs >= 1e6 {
        (abs / 1e6, "M")
    } else if abs >= 1e3 {
        (abs / 1e3, "K")
    } else {
        (abs, "")
    };
    format!("{sign}${scaled:.2}{suffix}")
}

/// Signed percentage points: `10.0` → `+10.00%`.
pub fn format_percent(value: f64) -> String {
    format!("{value:+.2}%")
}

fn format_net(net: Option<i64>) -> String {
    net.map_or_else(|| ABSENT.to_string(), |n| format!("{n:+}"))
}

fn or_absent(value: Option<f64>, format: fn(f64) -> String) -> String {
    value.map_or_else(|| ABSENT.to_string(), format)
}

/// Display text of one cell.
pub fn format_cell(equity: &Equity, column: SortColumn) -> String {
    let f = &equity.fundamentals;
    match column {
        SortColumn::Ticker => equity.ticker.to_string(),
        SortColumn::Category => equity.cap_category().label().to_string(),
        SortColumn::MarketCap => format_magnitude(equity.market_cap()),
        SortColumn::NextEarnings => f
            .next_earnings
            .map_or_else(|| ABSENT.to_string(), |d| d.to_string()),
        SortColumn::EpsYoyTtm => or_absent(f.eps_yoy_ttm, format_percent),
        SortColumn::SalesYoyTtm => or_absent(f.sales_yoy_ttm, format_percent),
        SortColumn::EpsQoq => or_absent(f.eps_qoq, format_percent),
        SortColumn::SalesQoq => or_absent(f.sales_qoq, format_percent),
        SortColumn::EpsSurprise => or_absent(f.eps_surprise, format_percent),
        SortColumn::SalesSurprise => or_absent(f.sales_surprise, format_percent),
        SortColumn::QuarterlyEpsEstimate => or_absent(f.quarterly_eps.estimate, |v| format!("{v:.2}")),
        SortColumn::QuarterlyEpsReported => or_absent(f.quarterly_eps.reported, |v| format!("{v:.2}")),
        SortColumn::QuarterlyRevenueEstimate => {
            or_absent(f.quarterly_revenue.estimate, format_magnitude)
        }
        SortColumn::QuarterlyRevenueReported => {
            or_absent(f.quarterly_revenue.reported, format_magnitude)
        }
        SortColumn::AnnualRevenueEstimate => or_absent(f.annual_revenue.estimate, format_magnitude),
        SortColumn::AnnualRevenueReported => or_absent(f.annual_revenue.reported, format_magnitude),
        SortColumn::EpsRevisions => format_net(f.eps_revisions.net()),
        SortColumn::SalesRevisions => format_net(f.sales_revisions.net()),
        SortColumn::Revisions => format_net(equity.revisions_up_down().net()),
        SortColumn::AvgTargetPrice => or_absent(f.avg_target_price, |v| format!("${v:.2}")),
    }
}

/// Left-aligned text table with a header row and a total line.
pub fn render_table(rows: &[&Equity], columns: &[SortColumn]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|equity| columns.iter().map(|c| format_cell(equity, *c)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(column.label().len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<&str> = columns.iter().map(|c| c.label()).collect();
    push_line(&mut out, header.iter().copied(), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for row in &cells {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out.push_str(&format!("{} equities\n", rows.len()));
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}
