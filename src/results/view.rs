use std::fmt::Write as _;

use crate::{models::Report, session::GateDecision};

#[derive(Debug, Clone, PartialEq)]
pub enum ResultAction {
    /// Record another take for the same session.
    Retry { href: String },
    /// Free takes are used up; send the user to the booking page.
    BookReview { url: String, notice: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub report: Report,
    pub take_number: u32,
    pub progress_label: String,
    pub take_note: String,
    pub gate: GateDecision,
    pub action: ResultAction,
}

/// What the results page shows at any moment.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsView {
    Processing,
    StillWorking { message: String },
    Report(Box<RenderedReport>),
    Error { reason: String },
}

impl ResultsView {
    pub fn still_working(session_id: &str) -> Self {
        ResultsView::StillWorking {
            message: format!(
                "Still working… if this doesn't change, check that the server is running \
                 and /api/results/{session_id} returns JSON."
            ),
        }
    }

    pub fn action(&self) -> Option<&ResultAction> {
        match self {
            ResultsView::Report(rendered) => Some(&rendered.action),
            _ => None,
        }
    }

    pub fn render_text(&self) -> String {
        match self {
            ResultsView::Processing => "Processing your rehearsal…".to_string(),
            ResultsView::StillWorking { message } => message.clone(),
            ResultsView::Error { reason } => format!("Couldn't load results: {reason}"),
            ResultsView::Report(rendered) => render_report(rendered),
        }
    }
}

fn render_report(rendered: &RenderedReport) -> String {
    let report = &rendered.report;
    let coaching = &report.coaching;
    let mut out = String::new();

    let _ = writeln!(out, "Your rehearsal snapshot");
    let _ = writeln!(out, "{}", rendered.progress_label);
    let _ = writeln!(out, "{}", rendered.take_note);
    let _ = writeln!(out);
    let _ = writeln!(out, "  Eyeline stability: {}%", report.eyeline_percent);
    let _ = writeln!(out, "  Pace: {}", report.pace.label());
    let _ = writeln!(out, "  Vocal variety: {}", report.vocal_variety.label());
    let _ = writeln!(out, "  Filler words: {}", report.filler_words);
    let _ = writeln!(out, "  Confidence: {:.1} / 10", report.confidence_score);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", coaching.headline);
    let _ = writeln!(out, "  Focus: {}", coaching.focus_label);
    let _ = writeln!(out, "  Why it matters: {}", coaching.why_it_matters);
    let _ = writeln!(out, "  Quick fix: {}", coaching.quick_fix);
    let _ = writeln!(out, "  Next take: {}", coaching.next_take_prompt);
    if !report.note.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", report.note);
    }
    let _ = writeln!(out);

    match &rendered.action {
        ResultAction::Retry { href } => {
            let _ = write!(out, "Try another rehearsal: {href}");
        }
        ResultAction::BookReview { url, notice } => {
            let _ = writeln!(out, "Free limit reached: {notice}");
            if !coaching.bridge.is_empty() {
                let _ = writeln!(out, "{}", coaching.bridge);
            }
            let _ = write!(out, "Book a quick review: {url}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coaching, Pace, VocalVariety};

    fn rendered(action: ResultAction) -> ResultsView {
        ResultsView::Report(Box::new(RenderedReport {
            report: Report {
                eyeline_percent: 80,
                pace: Pace::Good,
                vocal_variety: VocalVariety::GoodVariation,
                filler_words: 5,
                confidence_score: 7.25,
                note: String::new(),
                coaching: Coaching {
                    headline: "What stood out most".into(),
                    focus_label: "Opening clarity".into(),
                    why_it_matters: "why".into(),
                    quick_fix: "fix".into(),
                    next_take_prompt: "next".into(),
                    bridge: "Let's talk.".into(),
                },
            },
            take_number: 1,
            progress_label: "Take 1 of 3".into(),
            take_note: "First takes are about getting comfortable.".into(),
            gate: GateDecision {
                allowed: true,
                message: "ok".into(),
            },
            action,
        }))
    }

    #[test]
    fn report_text_lists_metrics_and_retry_link() {
        let view = rendered(ResultAction::Retry {
            href: "/record.html?sessionId=test".into(),
        });
        let text = view.render_text();
        assert!(text.contains("Take 1 of 3"));
        assert!(text.contains("Eyeline stability: 80%"));
        assert!(text.contains("Pace: Good"));
        assert!(text.contains("Confidence: 7.2 / 10") || text.contains("Confidence: 7.3 / 10"));
        assert!(text.ends_with("Try another rehearsal: /record.html?sessionId=test"));
    }

    #[test]
    fn booking_action_mentions_limit() {
        let view = rendered(ResultAction::BookReview {
            url: "https://example.com/book".into(),
            notice: "You've used all 3 rehearsal takes.".into(),
        });
        let text = view.render_text();
        assert!(text.contains("Free limit reached"));
        assert!(text.contains("Let's talk."));
        assert!(text.ends_with("Book a quick review: https://example.com/book"));
    }

    #[test]
    fn interim_views_have_no_action() {
        let waiting = ResultsView::still_working("abc");
        assert!(waiting.render_text().contains("/api/results/abc"));
        assert!(waiting.action().is_none());
        assert_eq!(
            ResultsView::Error {
                reason: "Results HTTP 500".into()
            }
            .render_text(),
            "Couldn't load results: Results HTTP 500"
        );
    }
}
