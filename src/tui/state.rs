use crate::model::{Notification, NotificationKind, WorkflowEvent, WorkflowPhase, WorkflowSnapshot};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use std::time::Instant;
use time::{macros::format_description, OffsetDateTime, UtcOffset};

/// Keep the notification log bounded.
const MAX_LOG: usize = 200;

pub struct LogEntry {
    pub at: String,
    pub notification: Notification,
}

pub struct UiState {
    pub tab: usize,
    pub snapshot: WorkflowSnapshot,
    pub analyzing_since: Option<Instant>,
    /// Path being typed; `None` when the input line is not focused.
    pub input: Option<String>,
    pub info: String,
    pub log: Vec<LogEntry>,
    pub classifier: String,
    pub max_upload_bytes: u64,
    pub utc_offset: UtcOffset,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            snapshot: WorkflowSnapshot::idle(),
            analyzing_since: None,
            input: None,
            info: String::new(),
            log: Vec::new(),
            classifier: String::new(),
            max_upload_bytes: crate::validate::MAX_UPLOAD_BYTES,
            utc_offset: UtcOffset::UTC,
        }
    }
}

impl UiState {
    fn timestamp(&self) -> String {
        let now = OffsetDateTime::now_utc().to_offset(self.utc_offset);
        now.format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_else(|_| "--:--:--".into())
    }

    pub fn apply_event(&mut self, ev: WorkflowEvent) {
        match ev {
            WorkflowEvent::Notify(n) => {
                self.info = format!("{}: {}", n.title, n.message);
                let at = self.timestamp();
                self.log.push(LogEntry { at, notification: n });
                if self.log.len() > MAX_LOG {
                    let excess = self.log.len() - MAX_LOG;
                    self.log.drain(..excess);
                }
            }
            WorkflowEvent::StateChanged(snapshot) => {
                self.analyzing_since = match snapshot.phase {
                    WorkflowPhase::Analyzing => Some(Instant::now()),
                    _ => None,
                };
                self.snapshot = *snapshot;
            }
        }
    }

    /// Focus the path input. Refused while a photo is being analyzed.
    pub fn open_input(&mut self) -> bool {
        if self.snapshot.phase == WorkflowPhase::Analyzing {
            self.info = "Busy: wait for the analysis to finish or press x to abandon it".into();
            return false;
        }
        self.tab = 0;
        self.input = Some(String::new());
        true
    }

    /// Result serialized for the clipboard.
    pub fn result_json(&self) -> Option<String> {
        self.snapshot
            .result
            .as_ref()
            .and_then(|r| serde_json::to_string_pretty(r).ok())
    }
}

pub fn kind_style(kind: NotificationKind) -> Style {
    match kind {
        NotificationKind::Info => Style::default().fg(Color::Cyan),
        NotificationKind::Success => Style::default().fg(Color::Green),
        NotificationKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

pub fn log_line(entry: &LogEntry) -> Line<'static> {
    let n = &entry.notification;
    Line::from(vec![
        Span::styled(entry.at.clone(), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(n.title.clone(), kind_style(n.kind)),
        Span::raw("  "),
        Span::raw(n.message.clone()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PreviewInfo, PreviewUri};

    #[test]
    fn notifications_are_logged_and_bounded() {
        let mut state = UiState::default();
        for i in 0..(MAX_LOG + 5) {
            state.apply_event(WorkflowEvent::Notify(Notification::info("n", i.to_string())));
        }
        assert_eq!(state.log.len(), MAX_LOG);
        assert_eq!(state.log[0].notification.message, "5");
        assert_eq!(state.info, format!("n: {}", MAX_LOG + 4));
    }

    #[test]
    fn analyzing_starts_spinner_clock() {
        let mut state = UiState::default();
        let snap = WorkflowSnapshot {
            phase: WorkflowPhase::Analyzing,
            file_name: Some("a.png".into()),
            preview: Some(PreviewInfo {
                uri: PreviewUri("preview://fauna-lens/1".into()),
                mime_type: "image/png".into(),
                size_bytes: 512,
            }),
            result: None,
        };
        state.apply_event(WorkflowEvent::StateChanged(Box::new(snap)));
        assert!(state.analyzing_since.is_some());
        assert!(state.result_json().is_none());

        state.apply_event(WorkflowEvent::StateChanged(Box::new(WorkflowSnapshot::idle())));
        assert!(state.analyzing_since.is_none());
        assert_eq!(state.snapshot.phase, WorkflowPhase::Idle);
    }

    #[test]
    fn path_input_is_disabled_while_analyzing() {
        let mut state = UiState {
            tab: 1,
            ..Default::default()
        };
        let mut snap = WorkflowSnapshot::idle();
        snap.phase = WorkflowPhase::Analyzing;
        state.apply_event(WorkflowEvent::StateChanged(Box::new(snap)));

        assert!(!state.open_input());
        assert!(state.input.is_none());
        assert!(state.info.starts_with("Busy"));

        state.apply_event(WorkflowEvent::StateChanged(Box::new(WorkflowSnapshot::idle())));
        assert!(state.open_input());
        assert_eq!(state.input.as_deref(), Some(""));
        assert_eq!(state.tab, 0);
    }
}
