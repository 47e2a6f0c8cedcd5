use acctest::{Action, CaseReport, CaseStatus, Plan, PlannedChange, RunReport};
use colored::Colorize;
use declarative::{DiffSummary, EntryStatus, ExecuteSummary};
use objects::Value;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Scenario Results
// ============================================================================

fn status_badge(status: CaseStatus) -> String {
    match status {
        CaseStatus::Passed => "PASS".green().bold().to_string(),
        CaseStatus::Failed => "FAIL".red().bold().to_string(),
        CaseStatus::Skipped => "SKIP".yellow().bold().to_string(),
    }
}

/// One-line result of a case.
pub fn case_line(report: &CaseReport) -> String {
    let detail = match report.status {
        CaseStatus::Skipped => report.reason.clone().unwrap_or_default(),
        _ => format!("{} steps, {} ms", report.steps.len(), report.duration_ms),
    };
    format!(
        "{} {} {}",
        status_badge(report.status),
        report.name,
        format!("({detail})").dimmed()
    )
}

/// Print the failure details of a case.
pub fn case_details(report: &CaseReport, verbose: u8) {
    if report.status == CaseStatus::Skipped {
        if let Some(reason) = &report.reason {
            kv("skipped", reason);
        }
        return;
    }
    if verbose > 0 || !report.passed() {
        kv("prefix", &report.prefix);
    }
    for step in &report.steps {
        let label = format!("step {}", step.index + 1);
        match &step.error {
            Some(error) => println!("  {} {}", label.red(), error),
            None if verbose > 0 => {
                let plan = if step.plan.is_empty() {
                    "no changes"
                } else {
                    step.plan.as_str()
                };
                println!(
                    "  {} {} {}",
                    label.dimmed(),
                    plan,
                    format!("({})", applied_counts(&step.applied)).dimmed()
                );
                if let Some(expected) = &step.expected_error {
                    println!("    {} {}", "expected error:".dimmed(), expected);
                }
            }
            None => {}
        }
    }
    if let Some(error) = &report.teardown_error {
        println!("  {} {}", "teardown".red(), error);
    }
}

/// Device commands as `2 created, 1 renamed`.
pub fn applied_counts(applied: &ExecuteSummary) -> String {
    if applied.total_changes() == 0 {
        return "nothing sent".to_string();
    }
    [
        (applied.created, "created"),
        (applied.modified, "modified"),
        (applied.renamed, "renamed"),
        (applied.removed, "removed"),
    ]
    .iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, what)| format!("{count} {what}"))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Print the totals of a run.
pub fn summary(report: &RunReport) {
    let elapsed = report.finished_at - report.started_at;
    println!();
    let line = format!(
        "{} passed, {} failed, {} skipped in {:.1}s",
        report.passed(),
        report.failed(),
        report.skipped(),
        elapsed.num_milliseconds() as f64 / 1000.0
    );
    if report.success() {
        success(&line);
    } else {
        error(&line);
    }
}

// ============================================================================
// Plans
// ============================================================================

fn action_label(action: Action) -> String {
    let text = format!("{:>7}", action.as_str());
    match action {
        Action::Create => text.green().to_string(),
        Action::Update => text.yellow().to_string(),
        Action::Replace => text.magenta().to_string(),
        Action::Delete => text.red().to_string(),
        Action::NoOp => text.dimmed().to_string(),
    }
}

fn status_label(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Absent => "absent",
        EntryStatus::Clean => "clean",
        EntryStatus::Drifted => "drifted",
        EntryStatus::Renamed => "renamed",
        EntryStatus::Orphaned => "orphaned",
        EntryStatus::Conflicted => "conflicted",
    }
}

/// Attribute counts as `+1 ~2 -0`.
pub fn diff_counts(summary: &DiffSummary) -> String {
    format!(
        "+{} ~{} -{}",
        summary.additions, summary.modifications, summary.removals
    )
}

fn pretty(value: Option<&Value>) -> String {
    value
        .and_then(|v| serde_json::to_string_pretty(&v.to_json()).ok())
        .map(|text| text + "\n")
        .unwrap_or_default()
}

/// Print one planned change with a line diff of its attributes.
pub fn planned_change(change: &PlannedChange) {
    let status = status_label(change.status);
    let status = if change.status == EntryStatus::Conflicted {
        status.red().to_string()
    } else {
        status.dimmed().to_string()
    };
    if change.action == Action::NoOp {
        println!("{} {} {status}", action_label(change.action), change.address.bold());
        return;
    }
    let counts = diff_counts(&DiffSummary::from_changes(&change.changes));
    println!(
        "{} {} {status} {}",
        action_label(change.action),
        change.address.bold(),
        counts.dimmed()
    );

    let before = pretty(change.before.as_ref());
    let after = pretty(change.after.as_ref());
    let diff = similar::TextDiff::from_lines(&before, &after);
    for line in diff.iter_all_changes() {
        match line.tag() {
            similar::ChangeTag::Delete => print!("    {}", format!("- {line}").red()),
            similar::ChangeTag::Insert => print!("    {}", format!("+ {line}").green()),
            similar::ChangeTag::Equal => print!("    {}", format!("  {line}").dimmed()),
        }
    }
}

/// Print a whole plan.
pub fn plan(plan: &Plan) {
    if plan.is_empty() {
        dim("No changes. Configuration matches the device.");
        return;
    }
    for change in &plan.changes {
        planned_change(change);
    }
    println!();
    dim(&format!("Plan: {}", plan.describe()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::compute_diffs;

    #[test]
    fn test_applied_counts() {
        assert_eq!(applied_counts(&ExecuteSummary::default()), "nothing sent");
        let applied = ExecuteSummary {
            created: 2,
            renamed: 1,
            ..ExecuteSummary::default()
        };
        assert_eq!(applied_counts(&applied), "2 created, 1 renamed");
    }

    #[test]
    fn test_diff_counts() {
        let old = Value::object([("fqdn", Value::from("a.com")), ("description", Value::Null)]);
        let new = Value::object([("fqdn", Value::from("b.com")), ("description", Value::from("x"))]);
        let summary = DiffSummary::from_changes(&compute_diffs(&old, &new));
        assert_eq!(diff_counts(&summary), "+1 ~1 -0");
    }
}
