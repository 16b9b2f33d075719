use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

fn keybind(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn help_lines() -> Vec<Line<'static>> {
    vec![
        Line::from("Keybinds:"),
        keybind("Ctrl-C", 6, "Quit (q also quits in List Sessions)"),
        keybind("tab", 9, "Next view"),
        keybind("F2/F3/F4", 4, "New Diagnosis / Resume Diagnosis / List Sessions"),
        keybind("enter", 7, "Run agent / Resume agent / Refresh sessions"),
        keybind("Ctrl-U", 6, "Clear input"),
        keybind("↑/↓", 9, "Scroll documents"),
        keybind("PgUp/PgDn", 3, "Scroll workflow"),
        keybind("Ctrl-S", 6, "Save current view as JSON"),
        keybind("Ctrl-Y", 6, "Copy thread id to clipboard"),
        keybind("F1", 10, "Toggle this help"),
        Line::from(""),
        Line::from("How to demo:"),
        Line::from("  1. Choose New Diagnosis and enter a query (e.g. a knocking sound on acceleration)."),
        Line::from("  2. Press enter and wait; a run can take a few minutes."),
        Line::from("  3. Workflow updates, chain-of-thought and the final recommendation appear on the left."),
        Line::from("  4. Documents inserted during the run appear on the right."),
        Line::from("  5. Copy the thread id and use Resume Diagnosis to continue a suspended run."),
        Line::from(""),
        Line::from("About:"),
        Line::from(
            "  The agent performs a multi-step diagnostic workflow: it reads timeseries data, \
             embeds the query, searches for similar past issues, persists session and run data, \
             and produces a recommendation. Every step is logged to the backend store for traceability.",
        ),
    ]
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(help_lines())
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help (F1/Esc to close)"),
        );
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
