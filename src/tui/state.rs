use crate::model::{ClientEvent, Mode};
use crate::workflow::Snapshot;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

pub struct UiState {
    pub snapshot: Snapshot,
    // Input buffers are owned here; controller echoes can lag behind keystrokes.
    pub query_input: String,
    pub thread_input: String,
    pub info: String,
    pub base_url: String,
    pub show_help: bool,
    // Scroll offsets for the workflow (left) and documents (right) columns
    pub workflow_scroll: u16,
    pub documents_scroll: u16,
    pub last_exported_path: Option<String>,
}

impl UiState {
    pub fn new(snapshot: Snapshot, base_url: String) -> Self {
        Self {
            query_input: snapshot.query_input.clone(),
            thread_input: snapshot.thread_input.clone(),
            snapshot,
            info: String::new(),
            base_url,
            show_help: false,
            workflow_scroll: 0,
            documents_scroll: 0,
            last_exported_path: None,
        }
    }

    pub fn apply_event(&mut self, ev: ClientEvent) {
        match ev {
            ClientEvent::Snapshot(snap) => {
                if snap.mode != self.snapshot.mode {
                    self.workflow_scroll = 0;
                    self.documents_scroll = 0;
                    self.thread_input.clear();
                }
                self.snapshot = *snap;
            }
            ClientEvent::Info(msg) => self.info = msg,
        }
    }

    /// Text of the input box for the current mode, if it has one.
    pub fn input(&self) -> Option<&str> {
        match self.snapshot.mode {
            Mode::New => Some(&self.query_input),
            Mode::Resume => Some(&self.thread_input),
            Mode::List => None,
        }
    }

    pub fn input_mut(&mut self) -> Option<&mut String> {
        match self.snapshot.mode {
            Mode::New => Some(&mut self.query_input),
            Mode::Resume => Some(&mut self.thread_input),
            Mode::List => None,
        }
    }

    /// Thread id worth copying: the current run's, else whatever was typed.
    pub fn thread_to_copy(&self) -> Option<String> {
        self.snapshot
            .result
            .as_ref()
            .and_then(|r| r.addressable_thread())
            .map(str::to_string)
            .or_else(|| {
                let typed = self.thread_input.trim();
                (!typed.is_empty()).then(|| typed.to_string())
            })
    }
}

/// Wrap `label: value` to the status area width, using at most `max_lines` lines.
/// A value that does not fit ends with an ellipsis.
pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
    max_lines: usize,
    value_style: Style,
) {
    let value = value.trim();
    if value.is_empty() || max_lines == 0 {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    for line_no in 0..max_lines {
        if remaining.is_empty() {
            break;
        }
        let line_width = usize::from(if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        });

        let chars_to_take = remaining.len().min(line_width);
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let mut line_text: String = line_chars.iter().collect();
        if !rest.is_empty() && line_no + 1 == max_lines {
            line_text.pop();
            line_text.push('…');
        }

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::styled(line_text, value_style),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(line_text, value_style),
            ]));
        }

        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WorkflowResult;
    use crate::workflow::Workflow;

    fn state() -> UiState {
        UiState::new(Workflow::new("q").snapshot(), "http://localhost:8000/api".into())
    }

    #[test]
    fn snapshot_with_new_mode_resets_scroll() {
        let mut st = state();
        st.workflow_scroll = 5;
        st.documents_scroll = 3;

        let mut snap = st.snapshot.clone();
        st.apply_event(ClientEvent::Snapshot(Box::new(snap.clone())));
        assert_eq!(st.workflow_scroll, 5);

        snap.mode = Mode::List;
        st.apply_event(ClientEvent::Snapshot(Box::new(snap)));
        assert_eq!(st.workflow_scroll, 0);
        assert_eq!(st.documents_scroll, 0);
        assert!(st.input().is_none());
    }

    #[test]
    fn copy_prefers_run_thread() {
        let mut st = state();
        assert_eq!(st.thread_to_copy(), None);
        st.thread_input = " typed ".into();
        assert_eq!(st.thread_to_copy().as_deref(), Some("typed"));
        st.snapshot.result = Some(WorkflowResult {
            thread_id: Some("t-1".into()),
            ..Default::default()
        });
        assert_eq!(st.thread_to_copy().as_deref(), Some("t-1"));
    }

    #[test]
    fn wraps_long_values() {
        let mut out = Vec::new();
        push_wrapped_status_kv(&mut out, "Error", &"x".repeat(30), 20, 4, Style::default());
        assert!(out.len() > 1);
        push_wrapped_status_kv(&mut out, "Empty", "   ", 20, 4, Style::default());
        let n = out.len();
        push_wrapped_status_kv(&mut out, "Empty", "", 20, 4, Style::default());
        assert_eq!(out.len(), n);
    }

    #[test]
    fn huge_error_body_is_cut_to_max_lines() {
        let message = format!("get-sessions: HTTP 500: {}", "x".repeat(70_000));
        let mut out = Vec::new();
        push_wrapped_status_kv(&mut out, "ApplicationError", &message, 120, 2, Style::default());
        assert_eq!(out.len(), 2);
        let last: String = out[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(last.ends_with('…'));
    }

    #[test]
    fn lagging_snapshot_does_not_overwrite_typed_input() {
        let mut st = state();
        st.query_input = "ab".into();
        // Echo of the first keystroke arrives after the second was typed.
        let mut echo = st.snapshot.clone();
        echo.query_input = "a".into();
        st.apply_event(ClientEvent::Snapshot(Box::new(echo)));
        assert_eq!(st.input(), Some("ab"));

        st.snapshot.mode = Mode::Resume;
        st.thread_input = "t-1".into();
        let mut echo = st.snapshot.clone();
        echo.thread_input = "t".into();
        st.apply_event(ClientEvent::Snapshot(Box::new(echo.clone())));
        assert_eq!(st.input(), Some("t-1"));

        echo.mode = Mode::List;
        st.apply_event(ClientEvent::Snapshot(Box::new(echo)));
        assert!(st.thread_input.is_empty());
        assert_eq!(st.query_input, "ab");
    }
}
