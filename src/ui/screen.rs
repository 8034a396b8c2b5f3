use facedrop::session::{Outcome, Phase};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use crate::{
    ui::{glyph_for, hud_line, legend_line, PlayField},
    App,
};

/// A UI Screen boundary: one per session phase
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// Instructions and a start prompt
pub struct StartScreen;

impl Screen for StartScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(2)
            .constraints([
                Constraint::Length(4), // Instructions
                Constraint::Length(2), // Emoji row
                Constraint::Min(0),
                Constraint::Length(2), // Prompt
                Constraint::Length(2), // Legend
            ])
            .split(f.area());

        let bold = Style::default().add_modifier(Modifier::BOLD);
        let intro = Paragraph::new(vec![
            Line::from(Span::styled("Match your facial expression", bold)),
            Line::from(Span::styled("to the falling emoji before it", bold)),
            Line::from(Span::styled("hits the ground.", bold)),
        ])
        .alignment(Alignment::Center);
        f.render_widget(intro, chunks[0]);

        let row = app
            .session
            .catalog()
            .ids()
            .iter()
            .map(|id| glyph_for(id))
            .collect::<Vec<_>>()
            .join(" ");
        f.render_widget(Paragraph::new(row).alignment(Alignment::Center), chunks[1]);

        let prompt = Paragraph::new(Line::from(vec![
            Span::styled(
                "START",
                Style::default()
                    .fg(Color::Rgb(229, 154, 163))
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            ),
            Span::raw("  enter to play · q to quit"),
        ]))
        .alignment(Alignment::Center);
        f.render_widget(prompt, chunks[3]);

        f.render_widget(
            Paragraph::new(legend_line(app.classifier.keyboard_labels()))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            chunks[4],
        );
    }
}

/// HUD, play field and key legend
pub struct PlayScreen;

impl Screen for PlayScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let snapshot = app.session.snapshot();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(1)
            .constraints([
                Constraint::Length(1), // HUD
                Constraint::Min(3),    // Play field
                Constraint::Length(1), // Legend
            ])
            .split(f.area());

        f.render_widget(Paragraph::new(hud_line(&snapshot)), chunks[0]);
        f.render_widget(
            PlayField {
                snapshot: &snapshot,
                config: app.session.config(),
                miss_flash: app.miss_flash > 0.0,
            },
            chunks[1],
        );
        f.render_widget(
            Paragraph::new(legend_line(app.classifier.keyboard_labels())),
            chunks[2],
        );
    }
}

/// Win or loss banner with a retry prompt
pub struct EndScreen;

impl Screen for EndScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let snapshot = app.session.snapshot();
        let (banner, color) = match snapshot.outcome {
            Some(Outcome::Win) => ("You Win!", Color::Green),
            Some(Outcome::Loss) | None => ("You Lose!", Color::Red),
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(2)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Length(2), // Banner
                Constraint::Length(2), // Score
                Constraint::Min(0),
                Constraint::Length(2), // Prompt
            ])
            .split(f.area());

        f.render_widget(
            Paragraph::new(Span::styled(
                banner,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            chunks[1],
        );
        f.render_widget(
            Paragraph::new(format!(
                "score {} of {}",
                snapshot.score,
                app.session.catalog().len()
            ))
            .alignment(Alignment::Center),
            chunks[2],
        );
        f.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(
                    "Try Again",
                    Style::default()
                        .fg(Color::Rgb(229, 154, 163))
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED),
                ),
                Span::raw("  r to retry · q to quit"),
            ]))
            .alignment(Alignment::Center),
            chunks[4],
        );
    }
}

/// Shown once the live classifier stream has closed
pub struct DisconnectedScreen;

impl Screen for DisconnectedScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(2)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Length(2), // Banner
                Constraint::Length(2), // Detail
                Constraint::Min(0),
                Constraint::Length(2), // Prompt
            ])
            .split(f.area());

        f.render_widget(
            Paragraph::new(Span::styled(
                "classifier disconnected",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            chunks[1],
        );
        f.render_widget(
            Paragraph::new(format!(
                "the expression classifier stopped sending readings · score {}",
                app.session.state().score
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
            chunks[2],
        );
        f.render_widget(
            Paragraph::new("q to quit").alignment(Alignment::Center),
            chunks[4],
        );
    }
}

/// Helper to construct the appropriate screen for the current phase
pub fn current_screen(phase: Phase) -> Box<dyn Screen> {
    match phase {
        Phase::NotStarted => Box::new(StartScreen),
        Phase::Active => Box::new(PlayScreen),
        Phase::Finished => Box::new(EndScreen),
    }
}
