use agenda_core::{FetchController, build_agenda, resolve};
use anyhow::Result;
use tracing::warn;

use crate::config::Settings;
use crate::render::render_agenda;

use super::{connect, create_spinner, viewer_now};

pub async fn run(settings: &Settings, json: bool) -> Result<()> {
    let card = &settings.card;
    let now = viewer_now(&settings.locale)?;
    let window = resolve(card.date_range, &now, settings.locale.week_convention());

    let mut controller = FetchController::new();
    if let Some(request) = controller.configure(window, card.sources()) {
        let source = connect(&settings.server)?;

        let spinner = (!json).then(|| create_spinner(format!("Fetching {}", card.date_range)));
        let result = request.execute(&source).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        match result {
            Ok(outcome) => {
                controller.complete(request.generation, outcome);
            }
            Err(e) => {
                warn!("fetch failed: {e}");
                controller.fail(request.generation, e.to_string());
            }
        }
    }

    for calendar in controller.failed_sources() {
        warn!(calendar = %calendar, "calendar unavailable");
    }

    let agenda = build_agenda(controller.agenda_state(), &now, &card.agenda_options());

    if json {
        let payload = serde_json::json!({
            "window": window,
            "visible": agenda.visible,
            "placeholder": agenda.placeholder,
            "items": agenda.display_items(&now),
            "failed": controller.failed_sources(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if let Some(output) = render_agenda(&agenda, &now, card, settings.locale.time_format) {
        println!("{output}");
    }

    Ok(())
}
