//! Text summary builder for CLI output.
//!
//! Formats a classification result as human-readable lines; the TUI result pane reuses it.

use crate::model::{
    ClassificationResult, ConfidenceBand, Notification, NotificationKind, PreviewInfo,
    SubjectProfile,
};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

struct Labels {
    context: &'static str,
    guidance: &'static str,
    fact: &'static str,
}

fn labels(profile: &SubjectProfile) -> Labels {
    match profile {
        SubjectProfile::Wildlife { .. } => Labels {
            context: "Natural habitat",
            guidance: "Safety tips",
            fact: "Fun fact",
        },
        SubjectProfile::Livestock { .. } => Labels {
            context: "Assessment",
            guidance: "Recommendations",
            fact: "Did you know",
        },
    }
}

/// Build a text summary for one classified file.
pub(crate) fn build_text_summary(
    file_name: &str,
    preview: Option<&PreviewInfo>,
    result: &ClassificationResult,
) -> TextSummary {
    let mut lines = Vec::new();
    let labels = labels(&result.profile);

    lines.push(format!("File: {file_name}"));
    if let Some(p) = preview {
        lines.push(format!("Preview: {p}"));
    }
    lines.push(format!("Subject: {}", result.subject_type));
    lines.push(format!(
        "Confidence: {}% ({})",
        result.confidence,
        ConfidenceBand::of(result.confidence).label()
    ));

    if let Some(mood) = result.mood() {
        lines.push(format!("Mood: {mood}"));
    }
    if let SubjectProfile::Livestock {
        body_structure_score,
        traits,
    } = &result.profile
    {
        lines.push(format!("Body structure: {body_structure_score}/100"));
        lines.push(format!("  Body size: {}%", traits.body_size));
        lines.push(format!("  Posture:   {}%", traits.posture));
        lines.push(format!("  Symmetry:  {}%", traits.symmetry));
    }

    let n = &result.narrative;
    if !n.description.trim().is_empty() {
        lines.push(format!("About: {}", n.description));
    }
    if !n.context.trim().is_empty() {
        lines.push(format!("{}: {}", labels.context, n.context));
    }
    if !n.guidance.is_empty() {
        lines.push(format!("{}:", labels.guidance));
        for item in &n.guidance {
            lines.push(format!("  - {item}"));
        }
    }
    if !n.highlight_fact.trim().is_empty() {
        lines.push(format!("{}: {}", labels.fact, n.highlight_fact));
    }

    TextSummary { lines }
}

/// One-line rendering of a notification for stderr and logs.
pub(crate) fn format_notification(n: &Notification) -> String {
    let tag = match n.kind {
        NotificationKind::Info => "info",
        NotificationKind::Success => "ok",
        NotificationKind::Error => "error",
    };
    format!("[{tag}] {}: {}", n.title, n.message)
}
