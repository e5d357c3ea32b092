//! Sample dispatch target: filters a fixed budget table and prints a JSON
//! summary on stdout.

use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "budget-report")]
#[command(about = "Budget Finance Analysis Tool", long_about = None)]
struct Args {
    /// Filter by category (Marketing, Sales, Operations)
    #[arg(long)]
    category: Option<String>,

    /// Filter by month (January, February, etc.)
    #[arg(long)]
    month: Option<String>,

    /// Filter by quarter (Q1, Q2, etc.)
    #[arg(long)]
    quarter: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct BudgetRow {
    category: &'static str,
    month: &'static str,
    quarter: &'static str,
    budget: i64,
    actual: i64,
    variance: i64,
}

const fn row(
    category: &'static str,
    month: &'static str,
    quarter: &'static str,
    budget: i64,
    actual: i64,
) -> BudgetRow {
    BudgetRow {
        category,
        month,
        quarter,
        budget,
        actual,
        variance: actual - budget,
    }
}

static BUDGET: [BudgetRow; 12] = [
    row("Marketing", "January", "Q1", 50_000, 48_500),
    row("Marketing", "February", "Q1", 45_000, 46_200),
    row("Marketing", "March", "Q1", 55_000, 52_800),
    row("Sales", "January", "Q1", 75_000, 78_200),
    row("Sales", "February", "Q1", 72_000, 71_500),
    row("Sales", "March", "Q1", 80_000, 82_100),
    row("Operations", "January", "Q1", 120_000, 118_500),
    row("Operations", "February", "Q1", 125_000, 122_000),
    row("Operations", "March", "Q1", 128_000, 129_500),
    row("Marketing", "April", "Q2", 60_000, 58_700),
    row("Sales", "April", "Q2", 85_000, 87_200),
    row("Operations", "April", "Q2", 130_000, 131_500),
];

fn matches(filter: &Option<String>, value: &str) -> bool {
    filter
        .as_deref()
        .map_or(true, |f| f.is_empty() || f.eq_ignore_ascii_case(value))
}

fn filter(args: &Args) -> Vec<BudgetRow> {
    BUDGET
        .iter()
        .filter(|r| matches(&args.category, r.category))
        .filter(|r| matches(&args.month, r.month))
        .filter(|r| matches(&args.quarter, r.quarter))
        .cloned()
        .collect()
}

fn summarize(rows: &[BudgetRow], timestamp: &str) -> Value {
    if rows.is_empty() {
        return json!({
            "message": "No data found for the specified filters",
            "run_timestamp": timestamp,
        });
    }

    let total_budget: i64 = rows.iter().map(|r| r.budget).sum();
    let total_actual: i64 = rows.iter().map(|r| r.actual).sum();
    let total_variance: i64 = rows.iter().map(|r| r.variance).sum();
    let variance_percent = if total_budget > 0 {
        (total_variance as f64 / total_budget as f64 * 10_000.0).round() / 100.0
    } else {
        0.0
    };

    json!({
        "total_budget": total_budget,
        "total_actual": total_actual,
        "total_variance": total_variance,
        "variance_percent": variance_percent,
        "record_count": rows.len(),
        "run_timestamp": timestamp,
    })
}

fn report(args: &Args, timestamp: &str) -> Value {
    let rows = filter(args);
    json!({
        "summary": summarize(&rows, timestamp),
        "data": rows,
        "filters": {
            "category": args.category,
            "month": args.month,
            "quarter": args.quarter,
        },
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    println!("{}", serde_json::to_string_pretty(&report(&args, &timestamp))?);
    Ok(())
}
