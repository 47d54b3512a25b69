mod app;
mod ui;

pub use app::{App, View, Watch};

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Position, layout::Rect};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogError, CatalogLoader};
use crate::playback::{self, Launch, PlaybackUpdate};

/// Messages sent from background tasks to the UI
pub enum UiMessage {
    CatalogLoaded(Result<Catalog, CatalogError>),
    Playback(PlaybackUpdate),
}

impl From<PlaybackUpdate> for UiMessage {
    fn from(update: PlaybackUpdate) -> Self {
        UiMessage::Playback(update)
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

pub async fn run(loader: CatalogLoader, app: App) -> io::Result<()> {
    // Set up panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        original_hook(panic_info);
    }));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = app;
    let (tx, mut rx) = mpsc::channel::<UiMessage>(32);

    // Single catalog fetch, no retry
    let catalog_tx = tx.clone();
    tokio::spawn(async move {
        let result = loader.load().await;
        let _ = catalog_tx.send(UiMessage::CatalogLoaded(result)).await;
    });

    let result = run_app(&mut terminal, &mut app, tx, &mut rx).await;

    // Stop any running player before leaving
    app.close_surface();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn spawn_launch(launch: Launch, tx: &mpsc::Sender<UiMessage>) {
    info!(command = %launch.command, "launching");
    tokio::spawn(playback::run_launch(launch, tx.clone()));
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tx: mpsc::Sender<UiMessage>,
    rx: &mut mpsc::Receiver<UiMessage>,
) -> io::Result<()> {
    loop {
        // Draw UI
        let screen = terminal.draw(|f| ui::draw(f, app))?.area;

        // Handle messages from background tasks
        while let Ok(msg) = rx.try_recv() {
            match msg {
                UiMessage::CatalogLoaded(result) => app.catalog_loaded(result),
                UiMessage::Playback(update) => app.handle_playback(update),
            }
        }

        // Handle input with timeout
        if event::poll(Duration::from_millis(100))? {
            let launch = match event::read()? {
                Event::Key(key) => handle_key(app, key),
                Event::Mouse(mouse) => {
                    handle_mouse(app, mouse, screen);
                    None
                }
                _ => None,
            };

            if let Some(launch) = launch {
                spawn_launch(launch, &tx);
            }
        }

        app.on_tick(Instant::now());

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Option<Launch> {
    // Global quit
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return None;
    }

    // The playback surface sits on top of everything else
    if app.surface_open() {
        return match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                app.close_surface();
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                app.select_previous_season();
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                app.select_next_season();
                None
            }
            KeyCode::Char(c @ '1'..='9') => {
                app.select_season(c as usize - '1' as usize);
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.select_previous_episode();
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.select_next_episode();
                None
            }
            KeyCode::Enter => app.play_selected_episode(),
            _ => None,
        };
    }

    match app.view {
        View::Home => match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                app.should_quit = true;
                None
            }
            KeyCode::Char('/') => {
                app.open_search();
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                app.select_previous_row();
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.select_next_row();
                None
            }
            KeyCode::Left | KeyCode::Char('h') => {
                app.select_previous_item();
                None
            }
            KeyCode::Right | KeyCode::Char('l') => {
                app.select_next_item();
                None
            }
            KeyCode::Enter => app.activate_focused(),
            KeyCode::Char('p') => app.play_hero(),
            _ => None,
        },

        View::Search => match key.code {
            KeyCode::Esc => {
                app.close_search();
                None
            }
            KeyCode::Up => {
                app.select_previous_result();
                None
            }
            KeyCode::Down => {
                app.select_next_result();
                None
            }
            KeyCode::Enter => app.activate_focused(),
            KeyCode::Backspace => {
                app.search_pop();
                None
            }
            KeyCode::Char(c) => {
                app.search_push(c);
                None
            }
            _ => None,
        },
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, screen: Rect) {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
        return;
    }
    let position = Position::new(mouse.column, mouse.row);

    if app.surface_open() {
        if !ui::surface_area(screen).contains(position) {
            debug!("click outside playback surface");
            app.close_surface();
        }
        return;
    }

    if app.view == View::Search && !ui::search_area(app, screen).contains(position) {
        debug!("click outside search");
        app.close_search();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::watch::{MemoryStore, WatchState};

    fn app() -> App {
        let watch: Watch = WatchState::new(Box::new(MemoryStore::new()));
        let mut app = App::new(&Config::default(), watch);
        app.catalog_loaded(Catalog::from_json(
            r#"{"items": [
                {"title": "Heat", "type": "movie", "description": "LA crime.", "link": "videos/heat.mp4"},
                {"title": "The Batman", "type": "movie", "description": "Gotham."}
            ]}"#,
        ));
        app
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_click_inside_surface_keeps_it_open() {
        let mut app = app();
        let screen = Rect::new(0, 0, 100, 40);
        assert!(app.play_hero().is_some());

        let area = ui::surface_area(screen);
        let center = click(area.x + area.width / 2, area.y + area.height / 2);
        handle_mouse(&mut app, center, screen);
        assert!(app.surface_open());
    }

    #[test]
    fn test_click_outside_surface_closes_it() {
        let mut app = app();
        let screen = Rect::new(0, 0, 100, 40);
        let launch = app.play_hero().unwrap();

        let area = ui::surface_area(screen);
        assert!(!area.contains(Position::new(0, 0)));
        handle_mouse(&mut app, click(0, 0), screen);

        assert!(!app.surface_open());
        assert!(launch.cancel.is_cancelled());
    }

    #[test]
    fn test_right_click_is_ignored() {
        let mut app = app();
        let screen = Rect::new(0, 0, 100, 40);
        app.play_hero();

        let mut event = click(0, 0);
        event.kind = MouseEventKind::Down(MouseButton::Right);
        handle_mouse(&mut app, event, screen);
        assert!(app.surface_open());
    }

    #[test]
    fn test_click_outside_search_clears_query() {
        let mut app = app();
        let screen = Rect::new(0, 0, 100, 40);
        handle_key(&mut app, key(KeyCode::Char('/')));
        for c in "heat".chars() {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        assert_eq!(app.search_outcome().items().len(), 1);

        let area = ui::search_area(&app, screen);
        handle_mouse(&mut app, click(area.x + 1, area.y + 1), screen);
        assert_eq!(app.view, View::Search);
        assert_eq!(app.search_input, "heat");

        assert!(!area.contains(Position::new(1, screen.height - 2)));
        handle_mouse(&mut app, click(1, screen.height - 2), screen);
        assert_eq!(app.view, View::Home);
        assert_eq!(app.search_input, "");
        assert!(!app.search_open());
    }

    #[test]
    fn test_escape_and_q_close_surface_without_quitting() {
        let mut app = app();
        app.play_hero();
        handle_key(&mut app, key(KeyCode::Esc));
        assert!(!app.surface_open());
        assert!(!app.should_quit);

        app.play_hero();
        handle_key(&mut app, key(KeyCode::Char('q')));
        assert!(!app.surface_open());
        assert!(!app.should_quit);

        handle_key(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_escape_closes_search() {
        let mut app = app();
        handle_key(&mut app, key(KeyCode::Char('/')));
        handle_key(&mut app, key(KeyCode::Char('q')));
        assert_eq!(app.search_input, "q");
        assert!(!app.should_quit);

        handle_key(&mut app, key(KeyCode::Esc));
        assert_eq!(app.view, View::Home);
        assert_eq!(app.search_input, "");
    }

    #[test]
    fn test_enter_plays_focused_card() {
        let mut app = app();
        let launch = handle_key(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(launch.args.last().map(String::as_str), Some("videos/heat.mp4"));
        assert!(app.surface_open());
    }
}
