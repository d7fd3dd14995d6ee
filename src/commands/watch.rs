use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use agenda_core::{
    AgendaError, AgendaResult, Debounce, FetchController, FetchOutcome, HomeAssistantSource,
    build_agenda, resolve,
};
use anyhow::Result;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::render::render_agenda;

use super::{connect, viewer_now};

const CONFIG_POLL: Duration = Duration::from_secs(2);
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

type FetchResult = (u64, AgendaResult<FetchOutcome>);

struct Watcher {
    config_path: PathBuf,
    config_modified: Option<SystemTime>,
    settings: Settings,
    source: Arc<HomeAssistantSource>,
    controller: FetchController,
    tasks: JoinSet<FetchResult>,
}

pub async fn run(config_path: PathBuf, settings: Settings, interval: Option<u64>) -> Result<()> {
    let interval = Duration::from_secs(interval.unwrap_or(settings.watch.interval_secs).max(1));
    let mut debounce = Debounce::new(Duration::from_millis(settings.watch.quiet_ms));

    let mut watcher = Watcher {
        config_modified: modified(&config_path),
        config_path,
        source: Arc::new(connect(&settings.server)?),
        settings,
        controller: FetchController::new(),
        tasks: JoinSet::new(),
    };

    let mut refresh = tokio::time::interval(interval);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut config_poll = tokio::time::interval(CONFIG_POLL);
    config_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(interval_secs = interval.as_secs(), "watching agenda");

    loop {
        let wait = debounce.remaining(Instant::now());

        tokio::select! {
            _ = &mut shutdown => {
                debug!("shutting down");
                break;
            }
            _ = refresh.tick() => debounce.touch(Instant::now()),
            _ = config_poll.tick() => {
                if watcher.reload_if_changed() {
                    debounce.touch(Instant::now());
                }
            }
            _ = tokio::time::sleep(wait.unwrap_or_default()), if wait.is_some() => {
                if debounce.take_ready(Instant::now()) {
                    watcher.start_fetch()?;
                }
            }
            Some(joined) = watcher.tasks.join_next() => {
                let accepted = match joined {
                    Ok((_, Err(AgendaError::Cancelled))) => false,
                    Ok((generation, Ok(outcome))) => watcher.controller.complete(generation, outcome),
                    Ok((generation, Err(e))) => {
                        warn!("fetch failed: {e}");
                        watcher.controller.fail(generation, e.to_string())
                    }
                    Err(e) => {
                        warn!("fetch task failed: {e}");
                        false
                    }
                };
                if accepted {
                    for calendar in watcher.controller.failed_sources() {
                        warn!(calendar = %calendar, "calendar unavailable");
                    }
                    watcher.draw()?;
                }
            }
        }
    }

    watcher.tasks.abort_all();
    Ok(())
}

impl Watcher {
    /// Reconfigure for the current window and spawn the fetch.
    fn start_fetch(&mut self) -> Result<()> {
        let now = viewer_now(&self.settings.locale)?;
        let card = &self.settings.card;
        let window = resolve(card.date_range, &now, self.settings.locale.week_convention());

        if let Some(request) = self.controller.configure(window, card.sources()) {
            let source = Arc::clone(&self.source);
            self.tasks.spawn(async move {
                let result = request.execute(source.as_ref()).await;
                (request.generation, result)
            });
        }

        self.draw()
    }

    fn draw(&self) -> Result<()> {
        let now = viewer_now(&self.settings.locale)?;
        let card = &self.settings.card;
        let agenda = build_agenda(self.controller.agenda_state(), &now, &card.agenda_options());

        let output = render_agenda(&agenda, &now, card, self.settings.locale.time_format);
        write_frame(&mut std::io::stdout().lock(), output.as_deref())?;
        Ok(())
    }

    /// Pick up edits to the config file. Invalid edits are logged and ignored.
    fn reload_if_changed(&mut self) -> bool {
        let current = modified(&self.config_path);
        if current == self.config_modified {
            return false;
        }
        self.config_modified = current;

        match plan_reload(&self.settings, Settings::load(Some(&self.config_path))) {
            Reload::Keep => false,
            Reload::Apply { settings, reconnect } => {
                if reconnect {
                    match connect(&settings.server) {
                        Ok(source) => self.source = Arc::new(source),
                        Err(e) => {
                            warn!("keeping previous server connection: {e:#}");
                            return false;
                        }
                    }
                }

                info!(path = %self.config_path.display(), "settings reloaded");
                self.settings = *settings;
                true
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Reload {
    Keep,
    Apply {
        settings: Box<Settings>,
        /// Server connection settings changed
        reconnect: bool,
    },
}

/// Decide what a re-read config file means for the running watcher.
fn plan_reload(current: &Settings, loaded: Result<Settings>) -> Reload {
    let settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            warn!("keeping previous settings: {e:#}");
            return Reload::Keep;
        }
    };
    if settings == *current {
        return Reload::Keep;
    }

    Reload::Apply {
        reconnect: settings.server != current.server,
        settings: Box::new(settings),
    }
}

/// Replace the screen contents; a hidden agenda leaves the screen blank.
fn write_frame<W: Write>(out: &mut W, output: Option<&str>) -> std::io::Result<()> {
    write!(out, "{CLEAR_SCREEN}")?;
    if let Some(output) = output {
        writeln!(out, "{output}")?;
    }
    out.flush()
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::NamedDateRange;

    fn current() -> Settings {
        let mut settings = Settings::default();
        settings.server.token = Some("abc".into());
        settings.card.entities = vec!["calendar.work".into()];
        settings
    }

    #[test]
    fn test_hidden_agenda_still_clears_screen() {
        let mut screen = Vec::new();
        write_frame(&mut screen, None).expect("Should write frame");
        assert_eq!(screen, CLEAR_SCREEN.as_bytes());

        let mut screen = Vec::new();
        write_frame(&mut screen, Some("• Review - 14:00")).unwrap();
        assert_eq!(String::from_utf8(screen).unwrap(), format!("{CLEAR_SCREEN}• Review - 14:00\n"));
    }

    #[test]
    fn test_invalid_edit_keeps_previous_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[card\nentities = ").unwrap();

        let loaded = Settings::load(Some(&path));
        assert!(loaded.is_err());
        assert_eq!(plan_reload(&current(), loaded), Reload::Keep);
    }

    #[test]
    fn test_unchanged_settings_are_kept() {
        assert_eq!(plan_reload(&current(), Ok(current())), Reload::Keep);
    }

    #[test]
    fn test_card_change_applies_without_reconnect() {
        let mut edited = current();
        edited.card.date_range = NamedDateRange::Week;

        match plan_reload(&current(), Ok(edited.clone())) {
            Reload::Apply { settings, reconnect } => {
                assert_eq!(*settings, edited);
                assert!(!reconnect);
            }
            Reload::Keep => panic!("Should apply card change"),
        }
    }

    #[test]
    fn test_server_change_reconnects() {
        let mut edited = current();
        edited.server.url = "http://ha.lan:8123".into();

        assert!(matches!(
            plan_reload(&current(), Ok(edited)),
            Reload::Apply { reconnect: true, .. }
        ));
    }
}
