use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use flowtype::{Mode, SessionState};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let snapshot = self.game.snapshot();
        let ghost = self.game.ghost();
        // supporting UI fades while a run is in progress
        let zen = snapshot.state == SessionState::Running;

        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let green_bold_style = bold_style.fg(Color::Green);
        let red_bold_style = bold_style.fg(Color::Red).add_modifier(Modifier::UNDERLINED);
        let dim_bold_style = bold_style.add_modifier(Modifier::DIM);
        let cursor_style = dim_bold_style.add_modifier(Modifier::UNDERLINED | Modifier::REVERSED);
        let ghost_style = dim_bold_style.bg(Color::Magenta);
        let chrome_style = if zen {
            Style::default().add_modifier(Modifier::DIM)
        } else {
            Style::default()
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        // header
        let counter = match snapshot.mode {
            Mode::Time => format!("time {}", snapshot.remaining_or_elapsed),
            Mode::Words => {
                let typed = if snapshot.input.is_empty() {
                    0
                } else {
                    snapshot.input.split(' ').count()
                };
                format!("words {}/{}", typed, self.game.session().config().word_count)
            }
        };
        let mut header = vec![Span::styled(counter, bold_style.fg(Color::Yellow))];
        if let Some(wpm) = ghost.previous_wpm {
            header.push(Span::raw("   "));
            header.push(Span::styled(format!("last {wpm}"), Style::default().add_modifier(Modifier::DIM)));
        }
        header.push(Span::raw("   "));
        header.push(Span::styled(format!("wpm {}", snapshot.stats.wpm), bold_style));
        header.push(Span::raw("   "));
        header.push(Span::styled(format!("acc {}%", snapshot.stats.accuracy), bold_style));
        Paragraph::new(Line::from(header))
            .style(chrome_style)
            .alignment(Alignment::Right)
            .render(chunks[0], buf);

        // prompt
        let typed: Vec<char> = snapshot.input.chars().collect();
        let ghost_at = (zen && ghost.previous_wpm.is_some()).then_some(ghost.reveal_count);
        let spans = snapshot
            .target
            .chars()
            .enumerate()
            .map(|(idx, expected)| match typed.get(idx) {
                Some(&c) if c == expected => Span::styled(expected.to_string(), green_bold_style),
                Some(&c) => Span::styled(
                    match c {
                        ' ' => "·".to_owned(),
                        c => c.to_string(),
                    },
                    red_bold_style,
                ),
                None if idx == typed.len() && snapshot.state != SessionState::Finished => {
                    Span::styled(expected.to_string(), cursor_style)
                }
                None if Some(idx) == ghost_at => Span::styled(expected.to_string(), ghost_style),
                None => Span::styled(expected.to_string(), dim_bold_style),
            })
            .collect::<Vec<Span>>();

        Paragraph::new(Line::from(spans))
            .wrap(Wrap { trim: false })
            .render(chunks[1], buf);

        // footer
        let footer = if zen {
            Line::default()
        } else {
            Line::from(Span::styled(
                "(tab) restart  (F2) mode  (F3) length  (ctrl+c) quit",
                Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
            ))
        };
        Paragraph::new(footer)
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        if snapshot.state == SessionState::Finished {
            render_results(self, area, buf);
        }
    }
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(result) = app.game.last_result() else {
        return;
    };

    let width = area.width.min(50);
    let height = area.height.min(9);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let label = Style::default().add_modifier(Modifier::DIM);
    let value = Style::default().add_modifier(Modifier::BOLD);
    let length = match result.mode {
        Mode::Time => format!("{}s", result.duration.unwrap_or_default()),
        Mode::Words => format!("{} words", result.word_count.unwrap_or_default()),
    };
    let consistency = result
        .consistency
        .map_or_else(|| "-".to_string(), |c| format!("{c:.0}%"));

    let lines = vec![
        Line::from(vec![
            Span::styled("wpm ", label),
            Span::styled(result.wpm.to_string(), value.fg(Color::Green)),
            Span::styled("   acc ", label),
            Span::styled(format!("{}%", result.accuracy), value),
        ]),
        Line::from(vec![
            Span::styled("raw ", label),
            Span::styled(result.raw_wpm.to_string(), value),
            Span::styled("   consistency ", label),
            Span::styled(consistency, value),
        ]),
        Line::from(vec![
            Span::styled("chars ", label),
            Span::styled(
                format!("{}/{}", result.correct_chars, result.incorrect_chars),
                value,
            ),
            Span::styled("   ", label),
            Span::styled(length, value),
        ]),
        Line::default(),
        Line::from(Span::styled(
            "(tab/enter) restart  (ctrl+c) quit",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ];

    Clear.render(popup, buf);
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("test complete"))
        .alignment(Alignment::Center)
        .render(popup, buf);
}
