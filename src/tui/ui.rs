use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs, Wrap},
};

use crate::card::Card;
use crate::episodes::EpisodePanel;
use crate::notice::NoticePhase;
use crate::playback::{PlaybackSource, PlayerState};
use crate::search::SearchOutcome;

use super::app::{App, View};

const CARD_WIDTH: usize = 24;
const ROW_HEIGHT: u16 = 3;
const NOTICE_WIDTH: u16 = 44;
const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = main_chunks(frame.area());

    draw_header(frame, app, chunks[0]);
    draw_hero(frame, app, chunks[1]);
    draw_rows(frame, app, chunks[2]);
    draw_details(frame, app, chunks[3]);
    draw_help(frame, app, chunks[4]);

    if app.view == View::Search {
        draw_search_results(frame, app);
    }

    if app.surface_open() {
        draw_surface(frame, app);
    }

    draw_notices(frame, app);
}

fn main_chunks(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Title + search
            Constraint::Length(5), // Hero
            Constraint::Min(0),    // Rows
            Constraint::Length(4), // Details
            Constraint::Length(1), // Help
        ])
        .split(area)
}

fn header_chunks(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(14), Constraint::Min(0)])
        .split(area)
}

fn search_input_area(screen: Rect) -> Rect {
    header_chunks(main_chunks(screen)[0])[1]
}

fn search_results_area(app: &App, screen: Rect) -> Rect {
    let input = search_input_area(screen);
    let rows = match app.search_outcome() {
        SearchOutcome::Closed => return Rect::new(input.x, input.bottom(), input.width, 0),
        SearchOutcome::NoResults => 1,
        SearchOutcome::Results(items) => items.len() as u16,
    };
    let available = screen.bottom().saturating_sub(input.bottom() + 1);
    Rect::new(
        input.x,
        input.bottom(),
        input.width,
        (rows + 2).min(available),
    )
}

/// Input plus results; clicks elsewhere close the search
pub fn search_area(app: &App, screen: Rect) -> Rect {
    search_input_area(screen).union(search_results_area(app, screen))
}

/// Bounds of the playback surface; clicks elsewhere close it
pub fn surface_area(screen: Rect) -> Rect {
    centered_rect(80, 80, screen)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn spinner(app: &App) -> &'static str {
    SPINNER[(app.tick as usize) % SPINNER.len()]
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = header_chunks(area);

    let mut title = vec![Span::styled(
        "vitrine",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    if app.is_loading() {
        title.push(Span::raw(" "));
        title.push(Span::styled(spinner(app), Style::default().fg(Color::Yellow)));
    }
    let title = Paragraph::new(Line::from(title));
    frame.render_widget(title, Rect { y: chunks[0].y + 1, height: 1, ..chunks[0] });

    let searching = app.view == View::Search;
    let input_style = if searching {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(app.search_input.as_str())
        .style(input_style)
        .block(Block::default().borders(Borders::ALL).title("Search (/)"));
    frame.render_widget(input, chunks[1]);

    if searching && !app.surface_open() {
        frame.set_cursor_position((
            chunks[1].x + app.search_input.chars().count() as u16 + 1,
            chunks[1].y + 1,
        ));
    }
}

fn draw_hero(frame: &mut Frame, app: &App, area: Rect) {
    let Some(hero) = app.hero() else {
        let text = if app.is_loading_catalog {
            "Loading catalog..."
        } else {
            "The catalog is empty"
        };
        let empty = Paragraph::new(text)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let card = Card::from(hero);
    let lines = vec![
        Line::from(vec![
            Span::styled(
                card.title().to_string(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(card.meta(), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(card.description_fitted(area.width.saturating_sub(4) as usize * 2)),
    ];

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Featured (p: play)")
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(paragraph, area);
}

fn draw_rows(frame: &mut Frame, app: &App, area: Rect) {
    if app.rows.is_empty() {
        return;
    }

    let visible_cards = (area.width as usize / CARD_WIDTH).max(1);
    let mut lines: Vec<Line> = Vec::new();

    for (row_idx, row) in app.rows.iter().enumerate() {
        let is_selected_row = row_idx == app.selected_row_index && app.view == View::Home;
        let title_style = if is_selected_row {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(Span::styled(
            format!("{} ({})", row.title, row.items.len()),
            title_style,
        )));

        let offset = if is_selected_row {
            app.selected_item_index.saturating_sub(visible_cards - 1)
        } else {
            0
        };

        let cards: Vec<Span> = row
            .items
            .iter()
            .enumerate()
            .skip(offset)
            .take(visible_cards)
            .map(|(idx, item)| {
                let card = Card::from(item);
                let style = if is_selected_row && idx == app.selected_item_index {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                let label = format!("▶ {}", card.title_fitted(CARD_WIDTH - 4));
                Span::styled(format!("{:<width$}", label, width = CARD_WIDTH - 1), style)
            })
            .flat_map(|span| [span, Span::raw(" ")])
            .collect();
        lines.push(Line::from(cards));
        lines.push(Line::from(""));
    }

    let scroll = (app.selected_row_index as u16 * ROW_HEIGHT)
        .saturating_sub(area.height.saturating_sub(ROW_HEIGHT));
    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), area);
}

fn draw_details(frame: &mut Frame, app: &App, area: Rect) {
    let Some(card) = app.focused_card() else {
        return;
    };

    let lines = vec![
        Line::from(vec![
            Span::styled(
                card.title().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(card.meta(), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(card.description().to_string()),
    ];

    let details = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(details, area);
}

fn draw_help(frame: &mut Frame, app: &App, area: Rect) {
    let text = match app.view {
        View::Home => "←/→: card | ↑/↓: row | Enter: play | p: play featured | /: search | q: quit",
        View::Search => "type to search | ↑/↓: select | Enter: play | Esc: close",
    };
    let help = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, area);
}

fn draw_search_results(frame: &mut Frame, app: &App) {
    let area = search_results_area(app, frame.area());
    if area.height == 0 {
        return;
    }

    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
        .style(Style::default().fg(Color::DarkGray));

    match app.search_outcome() {
        SearchOutcome::Closed => {}
        SearchOutcome::NoResults => {
            let empty = Paragraph::new("No results found")
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(empty, area);
        }
        SearchOutcome::Results(items) => {
            let width = area.width.saturating_sub(4) as usize;
            let list_items: Vec<ListItem> = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let card = Card::from(*item);
                    let style = if i == app.selected_result_index {
                        Style::default().bg(Color::DarkGray).fg(Color::White)
                    } else {
                        Style::default().fg(Color::Gray)
                    };
                    let icon = if item.is_series() { "📺" } else { "🎬" };
                    let title = card.title_fitted(width.saturating_sub(card.meta().len() + 6));
                    ListItem::new(format!("{} {}  {}", icon, title, card.meta())).style(style)
                })
                .collect();
            frame.render_widget(List::new(list_items).block(block), area);
        }
    }
}

fn draw_surface(frame: &mut Frame, app: &App) {
    let surface = app.resolver.surface();
    let area = surface_area(frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {} ", surface.title),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(" Esc: close ").right_aligned());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Player status
            Constraint::Min(0),    // Episodes
            Constraint::Length(1), // Help
        ])
        .split(inner);

    // Player status
    let status: Line = match &surface.player {
        Some(player) => {
            let target = match &player.source {
                PlaybackSource::Embedded { host, .. } => format!("in browser ({})", host),
                PlaybackSource::Native { .. } => "in player".to_string(),
                PlaybackSource::Absent => String::new(),
            };
            let url = player.source.url().unwrap_or_default();
            match player.state {
                PlayerState::Loading => Line::from(vec![
                    Span::styled(spinner(app), Style::default().fg(Color::Yellow)),
                    Span::styled(" Loading ", Style::default().fg(Color::Yellow)),
                    Span::styled(url.to_string(), Style::default().fg(Color::DarkGray)),
                ]),
                PlayerState::Playing => Line::from(vec![
                    Span::styled(
                        format!("▶ Playing {} ", target),
                        Style::default().fg(Color::Green),
                    ),
                    Span::styled(url.to_string(), Style::default().fg(Color::DarkGray)),
                ]),
                PlayerState::Failed => Line::from(Span::styled(
                    "✗ Error loading video",
                    Style::default().fg(Color::Red),
                )),
                PlayerState::Finished => Line::from(Span::styled(
                    "■ Playback finished",
                    Style::default().fg(Color::DarkGray),
                )),
            }
        }
        None if surface.shows_episodes() => Line::from(Span::styled(
            "Choose an episode",
            Style::default().fg(Color::Gray),
        )),
        None => Line::from(Span::styled(
            "No video source available",
            Style::default().fg(Color::Red),
        )),
    };
    frame.render_widget(Paragraph::new(status), chunks[0]);

    // Episodes
    if let Some(browser) = surface.episodes.as_ref() {
        draw_episode_panel(frame, browser.view(&app.watch.snapshot()), chunks[1]);
    }

    let help = if surface.shows_episodes() {
        "←/→ or 1-9: season | ↑/↓: episode | Enter: play | Esc: close"
    } else {
        "Esc: close"
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );
}

fn draw_episode_panel(frame: &mut Frame, panel: EpisodePanel, area: Rect) {
    let EpisodePanel::Shown { seasons, episodes } = panel else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(area);

    let active = seasons.iter().position(|s| s.active).unwrap_or(0);
    let tabs = Tabs::new(seasons.iter().map(|s| Line::from(s.title.clone())).collect::<Vec<_>>())
        .select(active)
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(tabs, chunks[0]);

    let items: Vec<ListItem> = episodes
        .iter()
        .map(|ep| {
            let marker = if ep.watched {
                Span::styled("✓ ", Style::default().fg(Color::Green))
            } else {
                Span::raw("  ")
            };
            let title_style = if ep.watched {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };

            let mut lines = vec![Line::from(vec![
                marker,
                Span::styled(format!("{:>2}  ", ep.number), Style::default().fg(Color::Cyan)),
                Span::styled(ep.title.clone(), title_style),
                Span::styled(
                    format!("  {}", ep.duration),
                    Style::default().fg(Color::DarkGray),
                ),
            ])];
            if ep.selected && !ep.description.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("      {}", ep.description),
                    Style::default().fg(Color::Gray),
                )));
            }

            let style = if ep.selected {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(lines).style(style)
        })
        .collect();

    frame.render_widget(List::new(items), chunks[1]);
}

fn draw_notices(frame: &mut Frame, app: &App) {
    let screen = frame.area();
    let width = NOTICE_WIDTH.min(screen.width);
    let mut bottom = screen.bottom().saturating_sub(1);

    for (notice, phase) in app.notices.visible(Instant::now()).into_iter().rev() {
        if bottom < 3 {
            break;
        }
        let area = Rect::new(screen.right().saturating_sub(width + 1), bottom - 3, width, 3);
        bottom -= 3;

        let color = match phase {
            NoticePhase::Shown => Color::Red,
            NoticePhase::Fading | NoticePhase::Gone => Color::DarkGray,
        };

        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(notice.message.as_str())
            .style(Style::default().fg(color))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            );
        frame.render_widget(paragraph, area);
    }
}
