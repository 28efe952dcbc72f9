//! Ratatui-based terminal UI.
//!
//! A sidebar holds the input widgets and the "Predict" action; the main area
//! shows the input summary and the prediction. Edits stay in the form until
//! the user submits.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::artifacts::ArtifactStore;
use crate::domain::FeatureKind;
use crate::error::AppError;
use crate::form::{FormSpec, FormState, WidgetKind, collect, render};
use crate::report::{
    ABOUT_HEADER, ABOUT_TEXT, APPROVED, FORM_HEADER, Outcome, PREDICTING, Presentation,
    SUBTITLE, SUMMARY_HEADER, TITLE,
};

/// Steps applied by PageUp/PageDown.
const PAGE_STEPS: i64 = 10;

/// Start the TUI.
pub fn run(store: &ArtifactStore, spec: FormSpec) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(store, spec);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    None,
    Submit,
    Quit,
}

struct App<'a> {
    store: &'a ArtifactStore,
    spec: FormSpec,
    state: FormState,
    /// Widget rows followed by the "Predict" row.
    selected: usize,
    /// Text being typed into a number widget.
    editing: Option<String>,
    presentation: Option<Presentation>,
    show_about: bool,
    busy: bool,
    status: String,
}

impl<'a> App<'a> {
    fn new(store: &'a ArtifactStore, spec: FormSpec) -> Self {
        let state = FormState::from_spec(&spec);
        Self {
            store,
            spec,
            state,
            selected: 0,
            editing: None,
            presentation: None,
            show_about: false,
            busy: false,
            status: "Adjust the inputs and press Predict.".to_string(),
        }
    }

    fn predict_row(&self) -> usize {
        self.spec.widgets().len()
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                self.redraw(terminal)?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match self.handle_key(key.code) {
                        Action::Quit => break,
                        Action::Submit => {
                            self.busy = true;
                            self.redraw(terminal)?;
                            self.submit();
                        }
                        Action::None => {}
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn redraw<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        terminal
            .draw(|f| self.draw(f))
            .map(|_| ())
            .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))
    }

    fn handle_key(&mut self, code: KeyCode) -> Action {
        if self.editing.is_some() {
            self.handle_text_edit(code);
            return Action::None;
        }

        match code {
            KeyCode::Char('q') => return Action::Quit,
            KeyCode::Char('p') => return Action::Submit,
            KeyCode::Char('a') => self.toggle_about(),
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = (self.selected + 1).min(self.predict_row()),
            KeyCode::Left => self.state.step(&self.spec, self.selected, -1),
            KeyCode::Right => self.state.step(&self.spec, self.selected, 1),
            KeyCode::PageDown => self.state.step(&self.spec, self.selected, -PAGE_STEPS),
            KeyCode::PageUp => self.state.step(&self.spec, self.selected, PAGE_STEPS),
            KeyCode::Enter => {
                if self.selected == self.predict_row() {
                    return Action::Submit;
                }
                self.start_edit();
            }
            _ => {}
        }
        Action::None
    }

    fn start_edit(&mut self) {
        let Some(widget) = self.spec.widgets().get(self.selected) else {
            return;
        };
        if let WidgetKind::Select { .. } = widget.kind {
            self.state.step(&self.spec, self.selected, 1);
            return;
        }
        let current = self
            .state
            .value(self.selected)
            .map(|v| widget.format_value(v))
            .unwrap_or_default();
        self.editing = Some(current);
        self.status = format!("Editing {}. Enter to apply, Esc to cancel.", widget.label());
    }

    fn handle_text_edit(&mut self, code: KeyCode) {
        let Some(buffer) = self.editing.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.editing = None;
                self.status = "Edit canceled.".to_string();
            }
            KeyCode::Enter => {
                let text = std::mem::take(buffer);
                self.editing = None;
                self.status = match self.state.set_text(&self.spec, self.selected, &text) {
                    Ok(()) => "Updated.".to_string(),
                    Err(e) => e.to_string(),
                };
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => buffer.push(c),
            _ => {}
        }
    }

    /// The panel is display-only; a shown result stays until the next submit.
    fn toggle_about(&mut self) {
        self.show_about = !self.show_about;
    }

    fn submit(&mut self) {
        self.busy = false;
        match collect(&self.spec, &self.state, true) {
            Ok(collected) => {
                let model = self.store.model();
                self.presentation = crate::report::present(&collected, model.as_deref());
                if let Some(p) = &self.presentation {
                    self.status = p.outcome.message();
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "form values rejected");
                self.presentation = None;
                self.status = e.to_string();
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lines = vec![
            Line::from(Span::styled(
                TITLE,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(SUBTITLE, Style::default().fg(Color::Gray))),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(46), Constraint::Min(0)])
            .split(area);

        self.draw_form(frame, columns[0]);

        let about_height = if self.show_about { 8 } else { 3 };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(about_height)])
            .split(columns[1]);

        self.draw_results(frame, rows[0]);
        self.draw_about(frame, rows[1]);
    }

    fn draw_form(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        // A pass without submission never assembles the record, so it cannot fail.
        let views = render(&self.spec, &self.state, false)
            .map(|rendered| rendered.widgets)
            .unwrap_or_default();
        let hint = views
            .get(self.selected)
            .map(|v| v.hint.clone())
            .unwrap_or_else(|| "p or Enter to predict".to_string());

        let mut items: Vec<ListItem> = views
            .into_iter()
            .enumerate()
            .map(|(idx, view)| {
                let value = match (&self.editing, idx == self.selected) {
                    (Some(buffer), true) => format!("{buffer}_"),
                    _ => view.value,
                };
                let value_style = match view.kind {
                    FeatureKind::Categorical => Style::default().fg(Color::Cyan),
                    FeatureKind::Integer | FeatureKind::Float => Style::default(),
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{}: ", view.label)),
                    Span::styled(value, value_style),
                ]))
            })
            .collect();
        items.push(ListItem::new(Line::from(Span::styled(
            "[ Predict ]",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ))));

        let list = List::new(items)
            .block(
                Block::default()
                    .title(FORM_HEADER)
                    .title_bottom(Line::from(Span::styled(hint, Style::default().fg(Color::Gray))))
                    .borders(Borders::ALL),
            )
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default().with_selected(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_results(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Prediction").borders(Borders::ALL);

        if self.busy {
            let p = Paragraph::new(PREDICTING)
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(p, area);
            return;
        }

        let Some(presentation) = &self.presentation else {
            let p = Paragraph::new("Press Predict to see the outcome.")
                .style(Style::default().fg(Color::Gray))
                .block(block);
            frame.render_widget(p, area);
            return;
        };

        let width = presentation
            .summary
            .iter()
            .map(|r| r.column.len())
            .max()
            .unwrap_or(0);
        let mut lines = vec![Line::from(Span::styled(
            SUMMARY_HEADER,
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        for row in &presentation.summary {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<width$}  ", row.column), Style::default().fg(Color::Gray)),
                Span::raw(row.value.clone()),
            ]));
        }
        lines.push(Line::from(""));

        let outcome_style = match &presentation.outcome {
            outcome if outcome.is_error() => Style::default().fg(Color::Red),
            Outcome::Predicted { label, .. } if label.as_str() == APPROVED => Style::default().fg(Color::Green),
            _ => Style::default().fg(Color::Yellow),
        };
        lines.push(Line::from(Span::styled(
            presentation.outcome.message(),
            outcome_style.add_modifier(Modifier::BOLD),
        )));

        let p = Paragraph::new(Text::from(lines))
            .wrap(Wrap { trim: false })
            .block(block);
        frame.render_widget(p, area);
    }

    fn draw_about(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let marker = if self.show_about { "▾" } else { "▸" };
        let block = Block::default()
            .title(format!("{marker} {ABOUT_HEADER}"))
            .borders(Borders::ALL);
        let body = if self.show_about { ABOUT_TEXT } else { "press a to expand" };
        let p = Paragraph::new(body)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter edit  p predict  a about  q quit";
        let mut spans = vec![Span::styled(help, Style::default().fg(Color::Gray))];
        for diagnostic in self.store.diagnostics() {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(diagnostic, Style::default().fg(Color::Red)));
        }
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(&self.status, Style::default().fg(Color::Yellow)));

        let p = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use ratatui::backend::TestBackend;

    use super::*;
    use crate::artifacts::ArtifactPaths;
    use crate::form::WidgetValue;
    use crate::test_support::{REFERENCE_CSV, binary_model_json, spec};

    /// Approves incomes of 50,000 and above.
    fn store_with_model(dir: &Path) -> ArtifactStore {
        fs::write(dir.join("model.json"), binary_model_json(1, 50_000.0, -1.0, 1.0)).unwrap();
        fs::write(dir.join("train.csv"), REFERENCE_CSV).unwrap();
        ArtifactStore::new(ArtifactPaths {
            model: dir.join("model.json"),
            data: dir.join("train.csv"),
        })
    }

    fn screen(app: &mut App<'_>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn initial_screen_shows_form_without_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_model(dir.path());
        let mut app = App::new(&store, spec());

        let text = screen(&mut app);
        assert!(text.contains("Loan Prediction App"));
        assert!(text.contains("Input Features"));
        assert!(text.contains("Person Age: 28"));
        assert!(text.contains("[ Predict ]"));
        assert!(!text.contains("Input Summary"));
    }

    #[test]
    fn submitting_shows_summary_and_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_model(dir.path());
        let mut app = App::new(&store, spec());

        assert_eq!(app.handle_key(KeyCode::Char('p')), Action::Submit);
        app.submit();

        let text = screen(&mut app);
        assert!(text.contains("Input Summary"));
        assert!(text.contains("loan_percent_income"));
        assert!(text.contains("Predicted Loan Status: Approved"));
    }

    #[test]
    fn edits_do_not_change_a_shown_result_until_resubmitted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_model(dir.path());
        let mut app = App::new(&store, spec());
        app.submit();
        let before = app.presentation.clone();

        // Drop income well below the approval threshold.
        app.selected = 1;
        app.handle_key(KeyCode::Enter);
        app.editing = Some(String::new());
        for c in "1000".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.state.value(1), Some(WidgetValue::Int(1000)));
        assert_eq!(app.presentation, before);

        app.selected = app.predict_row();
        assert_eq!(app.handle_key(KeyCode::Enter), Action::Submit);
        app.submit();
        let text = screen(&mut app);
        assert!(text.contains("Predicted Loan Status: Not Approved"));
    }

    #[test]
    fn invalid_text_is_rejected_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_model(dir.path());
        let mut app = App::new(&store, spec());

        app.selected = 1;
        app.handle_key(KeyCode::Enter);
        app.editing = Some("0".to_string());
        app.handle_key(KeyCode::Enter);

        assert!(app.editing.is_none());
        assert_eq!(app.state.value(1), Some(WidgetValue::Int(50_500)));
        assert!(app.status.contains("must be between"));
    }

    #[test]
    fn toggling_about_keeps_previous_result() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_model(dir.path());
        let mut app = App::new(&store, spec());
        app.submit();
        let before = app.presentation.clone();
        assert!(before.is_some());

        app.handle_key(KeyCode::Char('a'));
        assert!(app.show_about);
        assert_eq!(app.presentation, before);
        let text = screen(&mut app);
        assert!(text.contains("About this App"));
        assert!(text.contains("Predicted Loan Status: Approved"));

        app.handle_key(KeyCode::Char('a'));
        assert!(!app.show_about);
        assert_eq!(app.presentation, before);
    }

    #[test]
    fn selected_widget_hint_is_shown() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_model(dir.path());
        let mut app = App::new(&store, spec());
        assert!(screen(&mut app).contains("slider 21..=100"));

        app.selected = 2;
        assert!(screen(&mut app).contains("one of RENT | OWN | MORTGAGE"));
    }

    #[test]
    fn missing_model_reports_instead_of_predicting() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.csv"), REFERENCE_CSV).unwrap();
        let store = ArtifactStore::new(ArtifactPaths {
            model: dir.path().join("absent.json"),
            data: dir.path().join("train.csv"),
        });
        let mut app = App::new(&store, spec());
        app.submit();

        let text = screen(&mut app);
        assert!(text.contains("Model could not be loaded."));
        assert!(text.contains("Error loading model:"));
    }

    #[test]
    fn model_error_is_shown_at_startup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.csv"), REFERENCE_CSV).unwrap();
        let store = ArtifactStore::new(ArtifactPaths {
            model: dir.path().join("absent.json"),
            data: dir.path().join("train.csv"),
        });
        let spec = crate::app::load_form(&store).unwrap();
        let mut app = App::new(&store, spec);

        let text = screen(&mut app);
        assert!(app.presentation.is_none());
        assert!(text.contains("Error loading model:"));
        assert!(!text.contains("Model could not be loaded."));
    }

    #[test]
    fn busy_flag_shows_predicting() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_model(dir.path());
        let mut app = App::new(&store, spec());
        app.busy = true;
        assert!(screen(&mut app).contains("Predicting..."));
    }
}
