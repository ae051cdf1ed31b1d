use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use spotr::scores::{LeaderboardEntry, ScoreBucket};

use crate::App;

fn bucket_title(bucket: ScoreBucket) -> String {
    match bucket {
        ScoreBucket::Daily(_) => format!("Today ({bucket})"),
        ScoreBucket::Monthly(_) => format!("This month ({bucket})"),
        ScoreBucket::AllTime(_) => format!("This year ({bucket})"),
    }
}

/// Pure presenter for a single leaderboard row
pub fn present_row(rank: usize, entry: &LeaderboardEntry, highlight: &str) -> Row<'static> {
    let style = if entry.player_id == highlight {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let rank_color = match rank {
        1 => Color::Green,
        2 | 3 => Color::Cyan,
        _ => Color::Gray,
    };

    Row::new(vec![
        Cell::from(format!("{rank}.")).style(Style::default().fg(rank_color)),
        Cell::from(entry.player_id.clone()),
        Cell::from(entry.score.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(entry.submitted_at.format("%Y-%m-%d %H:%M").to_string()),
    ])
    .style(style)
}

/// Render the Leaderboard screen
pub fn render_leaderboard(app: &App, f: &mut Frame) {
    let area = f.area();
    let state = &app.leaderboard;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let title = Paragraph::new(format!("Leaderboard: {}", bucket_title(state.bucket())))
        .block(Block::default().borders(Borders::ALL).title("Scores"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if let Some(error) = &state.error {
        let message = Paragraph::new(format!("Leaderboard unavailable: {error}"))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Red));
        f.render_widget(message, chunks[1]);
    } else if state.entries.is_empty() {
        let no_data = Paragraph::new("No scores yet. Finish a session to get on the board.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let header = Row::new(vec![
            Cell::from("#"),
            Cell::from("Player"),
            Cell::from("Score"),
            Cell::from("Submitted"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let me = app.player_name.trim();
        let rows: Vec<Row> = state
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| present_row(i + 1, entry, me))
            .collect();

        let widths = [
            Constraint::Length(4),
            Constraint::Min(12),
            Constraint::Length(6),
            Constraint::Length(17),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL))
            .column_spacing(2);
        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new("(tab/←/→) day · month · year  (b/esc) back")
        .alignment(Alignment::Center)
        .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}
