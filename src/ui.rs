pub mod screen;

use screen::Screen;

use facedrop::{config::GameConfig, snapshot::SessionSnapshot};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::App;

pub fn draw(app: &App, f: &mut Frame) {
    if app.classifier_lost {
        screen::DisconnectedScreen.render(app, f);
    } else {
        screen::current_screen(app.session.phase()).render(app, f);
    }
}

/// Emoji shown for a challenge; identifiers without one render as their name.
pub fn glyph_for(identifier: &str) -> String {
    let glyph = match identifier {
        "grin" => "😁",
        "angry" => "😠",
        "shush" => "🤫",
        "peek" => "🫣",
        "kiss" => "😘",
        "tongue" => "😛",
        "scream" => "😱",
        other => return format!("[{other}]"),
    };
    glyph.to_string()
}

pub fn hud_line(snapshot: &SessionSnapshot) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    Line::from(vec![
        Span::styled("♥", bold.fg(Color::Red)),
        Span::styled(format!(" x {}", snapshot.lives), bold),
        Span::raw("    "),
        Span::styled(format!("score {}", snapshot.score), bold.fg(Color::Yellow)),
        Span::styled(
            format!("    {} to go", snapshot.remaining),
            Style::default().add_modifier(Modifier::DIM),
        ),
    ])
}

/// Key legend for keyboard play: `1 😁 grin  2 😠 angry ...`
pub fn legend_line(labels: Option<&[String]>) -> Line<'static> {
    let dim = Style::default().add_modifier(Modifier::DIM);
    match labels {
        Some(labels) => Line::from(
            labels
                .iter()
                .enumerate()
                .take(9)
                .map(|(i, label)| {
                    Span::styled(format!("{} {} {}  ", i + 1, glyph_for(label), label), dim)
                })
                .collect::<Vec<_>>(),
        ),
        None => Line::from(Span::styled("reading expressions from classifier", dim)),
    }
}

/// The play area, scaled from game units into the terminal cells it is given.
pub struct PlayField<'a> {
    pub snapshot: &'a SessionSnapshot,
    pub config: &'a GameConfig,
    pub miss_flash: bool,
}

impl Widget for PlayField<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = if self.miss_flash {
            Style::default().fg(Color::Red)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        let block = Block::default().borders(Borders::ALL).border_style(border);
        let inner = block.inner(area);
        block.render(area, buf);

        if inner.width == 0 || inner.height == 0 {
            return;
        }

        if self.miss_flash {
            let text = "MISS!";
            let x = inner.x + inner.width.saturating_sub(text.width() as u16) / 2;
            let y = inner.y + inner.height - 1;
            buf.set_string(
                x,
                y,
                text,
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            );
        }

        let Some(active) = &self.snapshot.active else {
            return;
        };

        let extent = self.config.sprite_extent;
        let center_y = active.vertical_position + extent / 2.0;
        if !(0.0..self.config.play_height).contains(&center_y) {
            return;
        }
        let center_x = (active.horizontal_position + extent / 2.0) / self.config.play_width;

        let glyph = glyph_for(&active.identifier);
        let w = (glyph.width() as u16).min(inner.width);
        let row = ((center_y / self.config.play_height) * inner.height as f64) as u16;
        let col = ((center_x * inner.width as f64) as u16)
            .saturating_sub(w / 2)
            .min(inner.width - w);
        let (x, y) = (inner.x + col, inner.y + row.min(inner.height - 1));

        match active.resolution_progress {
            Some(progress) => {
                let spark = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
                let r = 1 + (progress * 3.0) as i32;
                let (xi, yi, wi) = (x as i32, y as i32, w as i32);
                for (sx, sy) in [
                    (xi - r, yi),
                    (xi + wi - 1 + r, yi),
                    (xi + wi / 2, yi - (r + 1) / 2),
                    (xi + wi / 2, yi + (r + 1) / 2),
                ] {
                    put(buf, inner, sx, sy, "*", spark);
                }
                buf.set_string(x, y, glyph, spark);
            }
            None => {
                buf.set_string(x, y, glyph, Style::default());
            }
        }
    }
}

fn put(buf: &mut Buffer, inner: Rect, x: i32, y: i32, s: &str, style: Style) {
    let inside_x = x >= inner.x as i32 && x < (inner.x + inner.width) as i32;
    let inside_y = y >= inner.y as i32 && y < (inner.y + inner.height) as i32;
    if inside_x && inside_y {
        buf.set_string(x as u16, y as u16, s, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facedrop::session::Phase;
    use facedrop::snapshot::ActiveView;

    fn snapshot(active: Option<ActiveView>) -> SessionSnapshot {
        SessionSnapshot {
            phase: Phase::Active,
            lives: 3,
            score: 0,
            remaining: 6,
            outcome: None,
            active,
        }
    }

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn unknown_identifiers_render_by_name() {
        assert_eq!(glyph_for("grin"), "😁");
        assert_eq!(glyph_for("wink"), "[wink]");
    }

    #[test]
    fn falling_challenge_is_drawn_inside_the_field() {
        let snap = snapshot(Some(ActiveView {
            identifier: "wink".into(),
            vertical_position: 280.0,
            horizontal_position: 140.0,
            is_resolving: false,
            resolution_progress: None,
        }));
        let config = GameConfig::default();
        let area = Rect::new(0, 0, 30, 20);
        let mut buf = Buffer::empty(area);
        PlayField {
            snapshot: &snap,
            config: &config,
            miss_flash: false,
        }
        .render(area, &mut buf);

        assert!(buffer_text(&buf).contains("[wink]"));
    }

    #[test]
    fn challenge_above_the_top_is_not_drawn() {
        let snap = snapshot(Some(ActiveView {
            identifier: "wink".into(),
            vertical_position: -80.0,
            horizontal_position: 0.0,
            is_resolving: false,
            resolution_progress: None,
        }));
        let config = GameConfig::default();
        let area = Rect::new(0, 0, 30, 20);
        let mut buf = Buffer::empty(area);
        PlayField {
            snapshot: &snap,
            config: &config,
            miss_flash: true,
        }
        .render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(!text.contains("[wink]"));
        assert!(text.contains("MISS!"));
    }
}
