pub mod canvas;
pub mod leaderboard;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};

use spotr::round::{CountdownBand, RoundPhase};
use spotr::session::SessionResult;

use crate::{ui::canvas::ScanCanvas, App};

const SIDE_PANEL_WIDTH: u16 = 34;
const ORANGE: Color = Color::Rgb(255, 165, 0);

/// Regions of the play screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayLayout {
    pub header: Rect,
    pub countdown: Rect,
    pub canvas: Rect,
    pub panel: Rect,
    pub footer: Rect,
}

pub fn play_layout(area: Rect) -> PlayLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Length(3), // countdown
            Constraint::Min(0),    // scan + panel
            Constraint::Length(1), // footer
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(SIDE_PANEL_WIDTH)])
        .split(rows[2]);

    PlayLayout {
        header: rows[0],
        countdown: rows[1],
        canvas: body[0],
        panel: body[1],
        footer: rows[3],
    }
}

/// Where on screen clicks land on the scan
pub fn canvas_inner(area: Rect) -> Rect {
    canvas::inner_area(play_layout(area).canvas)
}

pub fn band_color(band: CountdownBand) -> Color {
    match band {
        CountdownBand::Neutral => Color::Gray,
        CountdownBand::Warning => ORANGE,
        CountdownBand::Critical => Color::Red,
    }
}

fn verdict_span(label: &str, correct: bool) -> Line<'static> {
    let (text, color) = if correct {
        ("Correct!", Color::Green)
    } else {
        ("Wrong!", Color::Red)
    };
    Line::from(vec![
        Span::raw(format!("{label} ")),
        Span::styled(
            text,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ])
}

fn result_color(result: SessionResult) -> Color {
    match result {
        SessionResult::PlayerWins => Color::Green,
        SessionResult::AiWins => Color::Red,
        SessionResult::Draw => Color::Yellow,
    }
}

impl App {
    fn panel_lines(&self) -> Vec<Line<'static>> {
        let engine = &self.engine;
        let session = engine.session();
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);

        let mut lines = vec![
            Line::from(vec![
                Span::raw("You "),
                Span::styled(session.player_score.to_string(), bold_style),
                Span::raw("  :  "),
                Span::styled(session.ai_score.to_string(), bold_style),
                Span::raw(" AI"),
            ]),
            Line::from(format!("Total scans: {}", session.rounds_started)),
            Line::default(),
        ];

        match engine.phase() {
            RoundPhase::Idle => {
                lines.push(Line::from("Press Space to start the first round"));
            }
            RoundPhase::Loading => match &self.load_error {
                Some(e) => {
                    lines.push(Line::from(Span::styled(
                        "Could not load scan",
                        Style::default().fg(Color::Red),
                    )));
                    lines.push(Line::from(Span::styled(e.clone(), dim_style)));
                    lines.push(Line::from("(r) retry  (s) skip"));
                }
                None => lines.push(Line::from("Loading scan...")),
            },
            RoundPhase::Countdown | RoundPhase::HintShown => {
                lines.push(Line::from(Span::styled(
                    "Click on the lesion!",
                    bold_style,
                )));
                if engine.round().hinted() {
                    lines.push(Line::from(Span::styled(
                        "Hint: look inside the red circle",
                        Style::default().fg(Color::Red),
                    )));
                }
            }
            RoundPhase::Resolving | RoundPhase::Revealing => {
                lines.push(Line::from(Span::styled(
                    "AI is searching...",
                    Style::default().fg(Color::Cyan),
                )));
            }
            RoundPhase::RoundComplete => {
                if let Some(outcome) = engine.visible_outcome() {
                    if outcome.timed_out() {
                        lines.push(Line::from(Span::styled("Out of time!", dim_style)));
                    }
                    lines.push(verdict_span("You were:", outcome.player_correct));
                    lines.push(verdict_span("AI was:", outcome.ai_correct));
                    lines.push(Line::default());
                }
                if engine.session_result().is_none() {
                    lines.push(Line::from("Press Space for the next round"));
                }
            }
        }

        if let Some(result) = engine.session_result() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                result.headline(),
                Style::default()
                    .fg(result_color(result))
                    .add_modifier(Modifier::BOLD),
            )));
            if self.submitted {
                lines.push(Line::from("(space) new game  (l) leaderboard"));
            } else {
                lines.push(Line::from(format!("Name: {}_", self.player_name)));
                lines.push(Line::from("(enter) submit  (tab) skip"));
            }
        }

        if let Some(notice) = &self.notice {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                notice.clone(),
                Style::default().fg(Color::Yellow),
            )));
        }

        lines
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let engine = &self.engine;
        let session = engine.session();
        let layout = play_layout(area);

        let round_no = if engine.phase() == RoundPhase::RoundComplete {
            session.round_index
        } else {
            session.round_index + 1
        }
        .min(session.config.total_rounds);
        Paragraph::new(Line::from(vec![
            Span::styled(
                "spotr",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "  Round {round_no}/{}",
                session.config.total_rounds
            )),
        ]))
        .render(layout.header, buf);

        let color = band_color(engine.band());
        Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Time left"))
            .gauge_style(Style::default().fg(color))
            .ratio(engine.progress())
            .label(Span::styled(
                format!("{:.1}", engine.remaining()),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ))
            .render(layout.countdown, buf);

        ScanCanvas {
            list: engine.surface(),
            canvas_size: engine.config().canvas_size,
            title: "Scan",
        }
        .render(layout.canvas, buf);

        Paragraph::new(self.panel_lines())
            .block(Block::default().borders(Borders::ALL).title("Results"))
            .wrap(Wrap { trim: true })
            .render(layout.panel, buf);

        Paragraph::new("(click) guess  (space) next round  (l) leaderboard  (esc) quit")
            .style(Style::default().add_modifier(Modifier::DIM))
            .alignment(Alignment::Center)
            .render(layout.footer, buf);
    }
}
