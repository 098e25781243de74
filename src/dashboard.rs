//! Interactive landing dashboard
//!
//! A synchronous control loop: draw the stack's status, read one line, act.
//! Terminates as soon as every PR reports merged, even if they were merged
//! outside this tool while the dashboard was open.

use crate::error::{Error, Result};
use crate::land::{LandReport, Lander, LandingPlan, PrInfo};
use crate::status::RefreshReport;
use crate::types::{CheckBucket, ChecksStatus, Mergeable, MergeStateStatus, PrState};
use std::fmt;
use std::io::Write;
use tracing::debug;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const TITLE_WIDTH: usize = 80;
const PROMPT: &str = "Action ([y]es to land, [r]efresh, [q]uit)";

/// What the operator asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Land,
    Refresh,
    Quit,
    Unknown,
}

impl Action {
    fn parse(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" | "l" | "land" => Self::Land,
            "r" | "refresh" => Self::Refresh,
            "q" | "quit" => Self::Quit,
            _ => Self::Unknown,
        }
    }
}

/// Dashboard over a lander, drawing to `out`
pub struct Dashboard<'a, W: Write> {
    lander: &'a Lander,
    out: W,
    clear_screen: bool,
}

impl<'a, W: Write> Dashboard<'a, W> {
    /// Create a dashboard
    pub const fn new(lander: &'a Lander, out: W) -> Self {
        Self {
            lander,
            out,
            clear_screen: false,
        }
    }

    /// Clear the screen before each frame (only sensible on a terminal)
    #[must_use]
    pub const fn clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    /// Run the loop until everything is merged, a landing succeeds, or the operator quits
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self, plan: &mut LandingPlan) -> Result<LandReport> {
        let mut refresh = self.lander.tracker().update_all_status(plan).await;
        let mut notice: Option<String> = None;

        loop {
            self.draw(plan, &refresh, notice.take())?;

            if plan.all_merged() {
                writeln!(self.out, "\nAll {} PRs are merged", plan.len())?;
                return Ok(LandReport {
                    already_merged: plan.numbers(),
                    dry_run: self.lander.config().dry_run,
                    ..LandReport::default()
                });
            }

            let input = self.lander.prompter().read_line(PROMPT)?;
            let action = Action::parse(&input);
            debug!(?action, "dashboard input");
            match action {
                Action::Land => match self.lander.land(plan).await {
                    Ok(report) => return Ok(report),
                    Err(e) if self.lander.config().pause_on_fail
                        && !matches!(e, Error::Cancelled(_)) =>
                    {
                        notice = Some(format!("❌ Landing stopped: {e}"));
                        refresh = self.lander.tracker().update_all_status(plan).await;
                    }
                    Err(e) => return Err(e),
                },
                Action::Refresh => {
                    refresh = self.lander.tracker().update_all_status(plan).await;
                }
                Action::Quit => {
                    writeln!(self.out, "\n⚠️ Landing cancelled")?;
                    return Err(Error::Cancelled("landing cancelled by user".to_string()));
                }
                Action::Unknown => {
                    notice = Some("Unknown action. Use [y]es, [r]efresh, or [q]uit".to_string());
                }
            }
        }
    }

    fn draw(
        &mut self,
        plan: &LandingPlan,
        refresh: &RefreshReport,
        notice: Option<String>,
    ) -> Result<()> {
        if self.clear_screen {
            write!(self.out, "{CLEAR_SCREEN}")?;
        }
        let error = refresh_error(refresh);
        write!(self.out, "{}", render(plan, error.as_deref()))?;
        if let Some(notice) = notice {
            writeln!(self.out, "{notice}")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Operator-facing description of a partial refresh
pub fn refresh_error(report: &RefreshReport) -> Option<String> {
    let stale = (!report.stale.is_empty()).then(|| {
        let numbers: Vec<String> = report.stale.iter().map(|n| format!("#{n}")).collect();
        format!("could not refresh PR {}", numbers.join(", "))
    });
    match (&report.batch_error, stale) {
        (Some(batch), Some(stale)) => Some(format!("{batch}; {stale}")),
        (Some(batch), None) => Some(batch.clone()),
        (None, stale) => stale,
    }
}

/// Render one dashboard frame
pub fn render(plan: &LandingPlan, refresh_error: Option<&str>) -> String {
    Frame {
        plan,
        refresh_error,
    }
    .to_string()
}

struct Frame<'a> {
    plan: &'a LandingPlan,
    refresh_error: Option<&'a str>,
}

impl fmt::Display for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plan = self.plan;
        writeln!(f, "================== Stack Landing Status ==================")?;
        writeln!(f, "Stack: {} PRs\n", plan.len())?;

        for (i, pr) in plan.prs().iter().enumerate() {
            write_pr(f, i + 1, pr)?;
        }

        writeln!(f, "-----------------------------------------------------------")?;
        let (mut merged, mut ready, mut blocked) = (0, 0, 0);
        for pr in plan.prs() {
            match pr.status.state {
                Some(PrState::Merged) => merged += 1,
                Some(PrState::Open) if pr.status.mergeable == Mergeable::Mergeable => ready += 1,
                Some(PrState::Open) => blocked += 1,
                _ => {}
            }
        }
        if merged > 0 {
            writeln!(f, "Status: {merged} merged, {ready} ready, {blocked} blocked")?;
        } else {
            writeln!(f, "Status: {ready} ready to merge, {blocked} blocked")?;
        }

        if let Some(error) = self.refresh_error {
            writeln!(f, "⚠ Error updating status: {error}")?;
        }
        Ok(())
    }
}

fn write_pr(f: &mut fmt::Formatter<'_>, position: usize, pr: &PrInfo) -> fmt::Result {
    writeln!(
        f,
        "{position:2}. PR #{:<4} {} {}",
        pr.number,
        status_icon(pr),
        truncate(&pr.title, TITLE_WIDTH)
    )?;
    writeln!(f, "    {}", pr.url)?;

    if let Some(text) = status_text(pr) {
        writeln!(f, "    {text}")?;
    }

    let review = pr.status.review_summary.to_string();
    if !review.is_empty() {
        writeln!(f, "    {review}")?;
    }

    if pr.status.checks.is_empty() {
        let summary = match pr.status.checks_status {
            ChecksStatus::Failing => Some("❌ Checks failing"),
            ChecksStatus::Pending => Some("⏳ Checks pending"),
            ChecksStatus::Passing => Some("✅ All checks passed"),
            ChecksStatus::None => None,
        };
        if let Some(summary) = summary {
            writeln!(f, "    {summary}")?;
        }
    } else {
        writeln!(f, "    Checks:")?;
        for check in &pr.status.checks {
            let icon = match check.bucket {
                CheckBucket::Pass => "✅",
                CheckBucket::Fail => "❌",
                CheckBucket::Skipping => "◻️",
                CheckBucket::Pending => "⏳",
            };
            writeln!(f, "      {icon} {}", check.name)?;
        }
    }
    writeln!(f)
}

fn status_icon(pr: &PrInfo) -> &'static str {
    let status = &pr.status;
    match status.state {
        Some(PrState::Merged) => return "✅",
        Some(PrState::Closed) => return "❌",
        _ => {}
    }
    match status.mergeable {
        Mergeable::Conflicting => return "⚠️",
        Mergeable::Mergeable if status.merge_state == MergeStateStatus::Unstable => return "🟡",
        Mergeable::Mergeable => return "🟢",
        Mergeable::Unknown => {}
    }
    match status.merge_state {
        MergeStateStatus::Conflicting | MergeStateStatus::Dirty => "⚠️",
        MergeStateStatus::Blocked => "🔒",
        MergeStateStatus::Behind => "⬇️",
        MergeStateStatus::Unstable => "⏳",
        MergeStateStatus::Unknown => "❓",
        MergeStateStatus::Draft => "📝",
        MergeStateStatus::Clean | MergeStateStatus::Mergeable | MergeStateStatus::HasHooks => "🟢",
        MergeStateStatus::Other(_) => "◻️",
    }
}

fn status_text(pr: &PrInfo) -> Option<String> {
    let status = &pr.status;
    let text = match status.state {
        Some(PrState::Merged) => "✅ Already merged",
        Some(PrState::Closed) => "❌ Closed (not merged)",
        _ if status.mergeable == Mergeable::Conflicting => "⚠️ Has conflicts - must be resolved",
        _ if status.mergeable == Mergeable::Mergeable
            && status.merge_state == MergeStateStatus::Unstable =>
        {
            "🟡 Mergeable but checks unstable (non-required checks failing)"
        }
        // never refreshed
        None => return None,
        Some(PrState::Open) => match &status.merge_state {
            MergeStateStatus::Clean | MergeStateStatus::Mergeable | MergeStateStatus::HasHooks => {
                "🟢 Ready to merge"
            }
            MergeStateStatus::Conflicting | MergeStateStatus::Dirty => {
                "⚠️ Has conflicts - must be resolved"
            }
            MergeStateStatus::Blocked => "🔒 Blocked by branch protection",
            MergeStateStatus::Behind => "↓ Behind base branch",
            MergeStateStatus::Unstable => "⏳ Checks pending or failing",
            MergeStateStatus::Unknown => "❓ Status unknown - computing...",
            MergeStateStatus::Draft => "📝 Draft PR - not ready to merge",
            MergeStateStatus::Other(raw) => return Some(raw.clone()),
        },
    };
    Some(text.to_string())
}

fn truncate(title: &str, width: usize) -> String {
    if title.chars().count() <= width {
        return title.to_string();
    }
    let kept: String = title.chars().take(width - 3).collect();
    format!("{kept}...")
}
