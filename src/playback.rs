use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::catalog::CatalogItem;
use crate::config::{BrowserConfig, Config, EmbedConfig, PlayerConfig};
use crate::episodes::EpisodeBrowser;

/// Path marker of an embed page, as in `https://uqload.cx/embed-abc123.html`
const EMBED_MARKER: &str = "embed-";

/// How often mpv is asked whether the media metadata is in
const METADATA_POLL: Duration = Duration::from_millis(250);
const IPC_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("No video source available")]
    NoSource,
    #[error("Error loading video: {0}")]
    LoadFailed(String),
    #[error("failed to launch '{0}': {1}. Is it installed and in your PATH?")]
    Launch(String, String),
}

/// What the playback surface is asked to play
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub title: String,
    pub link: Option<String>,
}

impl From<&CatalogItem> for PlaybackRequest {
    fn from(item: &CatalogItem) -> Self {
        Self {
            title: item.title.clone(),
            link: item.link.clone(),
        }
    }
}

/// How a link gets played
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSource {
    Absent,
    /// Third-party embed page, opened in the browser
    Embedded {
        host: String,
        id: String,
        url: String,
    },
    /// Anything else goes straight to the media player
    Native { url: String },
}

impl PlaybackSource {
    pub fn classify(link: Option<&str>, embed: &EmbedConfig) -> Self {
        let Some(link) = link.map(str::trim).filter(|l| !l.is_empty()) else {
            return PlaybackSource::Absent;
        };

        let is_embed = embed
            .markers
            .iter()
            .any(|marker| !marker.is_empty() && link.contains(marker.as_str()));

        if is_embed {
            Self::embedded(link, &embed.host)
        } else {
            PlaybackSource::Native {
                url: link.to_string(),
            }
        }
    }

    fn embedded(link: &str, default_host: &str) -> Self {
        let segment = last_path_segment(link);
        let id = segment.strip_suffix(".html").unwrap_or(segment.as_str());

        if link.contains(EMBED_MARKER) {
            let host = Url::parse(link)
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
                .unwrap_or_else(|| default_host.to_string());
            let id = id.strip_prefix(EMBED_MARKER).unwrap_or(id);
            return PlaybackSource::Embedded {
                host,
                id: id.to_string(),
                url: link.to_string(),
            };
        }

        PlaybackSource::Embedded {
            host: default_host.to_string(),
            id: id.to_string(),
            url: embed_url(default_host, id),
        }
    }

    /// URL handed to the browser or player
    pub fn url(&self) -> Option<&str> {
        match self {
            PlaybackSource::Absent => None,
            PlaybackSource::Embedded { url, .. } | PlaybackSource::Native { url } => Some(url),
        }
    }
}

pub fn embed_url(host: &str, id: &str) -> String {
    format!("https://{}/{}{}.html", host, EMBED_MARKER, id)
}

fn last_path_segment(link: &str) -> String {
    let from_url = Url::parse(link).ok().and_then(|url| {
        url.path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()).map(str::to_string))
    });

    from_url.unwrap_or_else(|| {
        let path = link.split(['?', '#']).next().unwrap_or(link);
        path.rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or(path)
            .to_string()
    })
}

/// Identifies one mounted player; events from older sessions are ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Embed page opened or player window up
    Loaded,
    Failed(String),
    /// Player closed normally
    Exited,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackUpdate {
    pub session: SessionId,
    pub event: PlayerEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchKind {
    Embed,
    Native,
}

/// A process to start for a new session
#[derive(Debug, Clone)]
pub struct Launch {
    pub session: SessionId,
    pub kind: LaunchKind,
    pub command: String,
    pub args: Vec<String>,
    /// mpv IPC socket; when set, `Loaded` waits for the media duration
    pub ipc_socket: Option<PathBuf>,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Loading,
    Playing,
    Failed,
    Finished,
}

#[derive(Debug)]
pub struct MountedPlayer {
    pub session: SessionId,
    pub source: PlaybackSource,
    pub state: PlayerState,
    cancel: CancellationToken,
}

/// The playback overlay: title, mounted player and optional episode panel
#[derive(Debug, Default)]
pub struct Surface {
    pub open: bool,
    pub title: String,
    pub player: Option<MountedPlayer>,
    pub episodes: Option<EpisodeBrowser>,
}

impl Surface {
    pub fn is_loading(&self) -> bool {
        self.player
            .as_ref()
            .is_some_and(|p| p.state == PlayerState::Loading)
    }

    /// Episode panel is shown only for series that have seasons
    pub fn shows_episodes(&self) -> bool {
        self.episodes.as_ref().is_some_and(|e| !e.is_hidden())
    }
}

pub struct PlaybackResolver {
    player: PlayerConfig,
    browser: BrowserConfig,
    embed: EmbedConfig,
    surface: Surface,
    last_session: u64,
}

impl PlaybackResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            player: config.player.clone(),
            browser: config.browser.clone(),
            embed: config.embed.clone(),
            surface: Surface::default(),
            last_session: 0,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// Play a catalog item. Series mount the episode browser; a series with
    /// seasons but no link of its own only opens the browser.
    pub fn play_item(&mut self, item: &CatalogItem) -> Result<Option<Launch>, PlaybackError> {
        if item.is_series() {
            self.surface.episodes = Some(EpisodeBrowser::open(item));
            if item.link.is_none() && item.has_seasons() {
                self.open(&item.title);
                return Ok(None);
            }
        } else {
            self.surface.episodes = None;
        }

        self.play(PlaybackRequest::from(item)).map(Some)
    }

    /// Open the surface, replace any mounted player and resolve the source.
    /// The episode panel is left as it is.
    pub fn play(&mut self, request: PlaybackRequest) -> Result<Launch, PlaybackError> {
        self.open(&request.title);

        let source = PlaybackSource::classify(request.link.as_deref(), &self.embed);
        let session = SessionId(self.last_session + 1);
        let (kind, command, args, ipc_socket) = match &source {
            PlaybackSource::Absent => {
                warn!(title = %request.title, "no video source");
                return Err(PlaybackError::NoSource);
            }
            PlaybackSource::Embedded { url, .. } => (
                LaunchKind::Embed,
                self.browser.command.clone(),
                vec![url.clone()],
                None,
            ),
            PlaybackSource::Native { url } => {
                let ipc_socket = ipc_socket_for(&self.player.command, session);
                (
                    LaunchKind::Native,
                    self.player.command.clone(),
                    player_args(
                        &self.player.command,
                        &self.player.args,
                        url,
                        ipc_socket.as_deref(),
                    ),
                    ipc_socket,
                )
            }
        };

        self.last_session = session.0;
        let cancel = CancellationToken::new();
        info!(title = %request.title, source = ?source, "starting playback");

        self.surface.player = Some(MountedPlayer {
            session,
            source,
            state: PlayerState::Loading,
            cancel: cancel.clone(),
        });

        Ok(Launch {
            session,
            kind,
            command,
            args,
            ipc_socket,
            cancel,
        })
    }

    /// Apply an event from a player task. Returns the error to show, if any.
    ///
    /// `Loaded` and `Failed` only count while loading; the first one wins.
    pub fn handle(&mut self, update: PlaybackUpdate) -> Option<PlaybackError> {
        let Some(player) = self
            .surface
            .player
            .as_mut()
            .filter(|p| p.session == update.session)
        else {
            debug!(session = ?update.session, "ignoring event from stale session");
            return None;
        };

        match update.event {
            PlayerEvent::Loaded if player.state == PlayerState::Loading => {
                player.state = PlayerState::Playing;
                None
            }
            PlayerEvent::Failed(reason) if player.state == PlayerState::Loading => {
                error!(reason = %reason, "playback failed");
                player.state = PlayerState::Failed;
                Some(PlaybackError::LoadFailed(reason))
            }
            PlayerEvent::Exited if player.state != PlayerState::Failed => {
                player.state = PlayerState::Finished;
                None
            }
            event => {
                debug!(event = ?event, state = ?player.state, "ignoring late player event");
                None
            }
        }
    }

    /// Tear down the player and hide the surface
    pub fn close(&mut self) {
        self.unmount();
        self.surface.episodes = None;
        self.surface.open = false;
        self.surface.title.clear();
    }

    fn open(&mut self, title: &str) {
        self.unmount();
        self.surface.open = true;
        self.surface.title = title.to_string();
    }

    fn unmount(&mut self) {
        if let Some(player) = self.surface.player.take() {
            debug!(session = ?player.session, "unmounting player");
            player.cancel.cancel();
        }
    }
}

/// IPC socket for an mpv session. Other players, and platforms without unix
/// sockets, report `Loaded` as soon as the process is up.
fn ipc_socket_for(command: &str, session: SessionId) -> Option<PathBuf> {
    if !cfg!(unix) || !command.contains("mpv") {
        return None;
    }
    Some(std::env::temp_dir().join(format!(
        "vitrine-mpv-{}-{}.sock",
        std::process::id(),
        session.0
    )))
}

/// Arguments for the media player; mpv gets a window before the stream is ready
pub fn player_args(
    command: &str,
    extra: &[String],
    url: &str,
    ipc_socket: Option<&Path>,
) -> Vec<String> {
    let mut args = Vec::new();
    if command.contains("mpv") {
        args.extend(
            ["--force-window=immediate", "--really-quiet", "--cache=yes"].map(String::from),
        );
        if let Some(socket) = ipc_socket {
            args.push(format!("--input-ipc-server={}", socket.display()));
        }
    } else if command.contains("vlc") {
        args.push("--play-and-exit".to_string());
    }
    args.extend(extra.iter().cloned());
    args.push(url.to_string());
    args
}

fn spawn(launch: &Launch) -> Result<Child, PlaybackError> {
    Command::new(&launch.command)
        .args(&launch.args)
        // Keep the TUI clean
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| PlaybackError::Launch(launch.command.clone(), e.to_string()))
}

async fn notify<T: From<PlaybackUpdate>>(
    tx: &mpsc::Sender<T>,
    session: SessionId,
    event: PlayerEvent,
) {
    let _ = tx.send(T::from(PlaybackUpdate { session, event })).await;
}

/// Ask mpv for the media duration over its IPC socket.
/// `None` until the file or stream metadata has been read.
#[cfg(unix)]
pub async fn mpv_duration(socket_path: &Path) -> Option<f64> {
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixStream;

    let stream = UnixStream::connect(socket_path).await.ok()?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    writer
        .write_all(b"{\"command\": [\"get_property\", \"duration\"], \"request_id\": 1}\n")
        .await
        .ok()?;

    // mpv interleaves broadcast events with replies
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let Ok(reply) = serde_json::from_str::<serde_json::Value>(&line) else {
            continue;
        };
        if reply.get("event").is_some() {
            continue;
        }
        return reply.get("data")?.as_f64();
    }
}

#[cfg(not(unix))]
pub async fn mpv_duration(_socket_path: &Path) -> Option<f64> {
    None
}

async fn media_loaded(socket_path: &Path) -> bool {
    tokio::time::timeout(IPC_TIMEOUT, mpv_duration(socket_path))
        .await
        .ok()
        .flatten()
        .is_some()
}

/// Run the process for a launch until it exits or the session is cancelled
pub async fn run_launch<T>(launch: Launch, tx: mpsc::Sender<T>)
where
    T: From<PlaybackUpdate> + Send + 'static,
{
    let session = launch.session;
    let mut child = match spawn(&launch) {
        Ok(child) => child,
        Err(e) => {
            error!(error = %e, "failed to launch");
            notify(&tx, session, PlayerEvent::Failed(e.to_string())).await;
            return;
        }
    };

    let mut loaded = false;
    if launch.kind == LaunchKind::Native && launch.ipc_socket.is_none() {
        info!(player = %launch.command, "player started");
        loaded = true;
        notify(&tx, session, PlayerEvent::Loaded).await;
    }

    let mut poll = tokio::time::interval(METADATA_POLL);
    loop {
        tokio::select! {
            _ = launch.cancel.cancelled() => {
                debug!(session = ?session, "stopping player");
                let _ = child.kill().await;
                break;
            }
            status = child.wait() => {
                let event = match (launch.kind, status) {
                    (LaunchKind::Embed, Ok(status)) if status.success() => PlayerEvent::Loaded,
                    (LaunchKind::Native, Ok(status)) if status.success() => PlayerEvent::Exited,
                    (_, Ok(status)) => {
                        PlayerEvent::Failed(format!("{} exited with {}", launch.command, status))
                    }
                    (_, Err(e)) => PlayerEvent::Failed(e.to_string()),
                };
                info!(session = ?session, event = ?event, "player finished");
                notify(&tx, session, event).await;
                break;
            }
            _ = poll.tick(), if !loaded && launch.ipc_socket.is_some() => {
                if let Some(socket) = &launch.ipc_socket
                    && media_loaded(socket).await
                {
                    info!(player = %launch.command, "media loaded");
                    loaded = true;
                    notify(&tx, session, PlayerEvent::Loaded).await;
                }
            }
        }
    }

    if let Some(socket) = &launch.ipc_socket {
        let _ = std::fs::remove_file(socket);
    }
}
