#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::io;
use workmap::cli::{Cli, Cmd};
use workmap::collab::{BlobStore, ConfirmPrompt};
use workmap::config::Settings;
use workmap::console::{ConfiguredPosition, ConsoleRenderer, FixedAnswer, StdinPrompt, TerminalMap};
use workmap::controller::WorkoutController;
use workmap::database::{MemoryBlobStore, SqliteBlobStore};
use workmap::error::ControllerError;
use workmap::types::{Coords, Workout};
use workmap::{dlog, utils};

fn main() -> Result<()> {
    let cli = Cli::parse();
    utils::init_logging(cli.verbose, cli.quiet);

    let settings_path = cli
        .config
        .clone()
        .or_else(Settings::default_path)
        .context("No config directory found; pass --config")?;
    let mut settings = Settings::load(&settings_path);

    if let Some(Cmd::Config {
        home,
        zoom,
        database,
    }) = &cli.cmd
    {
        let changed = home.is_some() || zoom.is_some() || database.is_some();
        settings.home = home.or(settings.home);
        settings.zoom = zoom.unwrap_or(settings.zoom);
        settings.database = database.clone().or(settings.database);
        if changed {
            settings.save(&settings_path)?;
        }
        println!("{}", serde_json::to_string_pretty(&settings)?);
        println!("database: {}", settings.database_path().display());
        return Ok(());
    }

    if cli.ephemeral {
        dlog!("mode=ephemeral");
        return with_prompt(cli, &settings, MemoryBlobStore::default());
    }

    let db_path = cli.db.clone().unwrap_or_else(|| settings.database_path());
    dlog!("mode=sqlite db={}", db_path.display());
    let storage = SqliteBlobStore::open(&db_path)?;
    with_prompt(cli, &settings, storage)
}

fn with_prompt<S: BlobStore>(cli: Cli, settings: &Settings, storage: S) -> Result<()> {
    if cli.yes {
        run(cli, settings, storage, FixedAnswer(true))
    } else {
        run(cli, settings, storage, StdinPrompt)
    }
}

fn run<S: BlobStore, P: ConfirmPrompt>(
    cli: Cli,
    settings: &Settings,
    storage: S,
    prompt: P,
) -> Result<()> {
    let mut app = WorkoutController::new(
        TerminalMap::default(),
        storage,
        prompt,
        ConsoleRenderer::default(),
    )
    .with_zoom(settings.zoom);

    let mut geo = ConfiguredPosition(settings.resolve_position(cli.at));
    if app.boot(&mut geo).is_err() {
        dlog!("booted without map");
    }

    match cli.cmd.unwrap_or(Cmd::List) {
        Cmd::List | Cmd::Config { .. } => {}
        Cmd::Add { lat, lng, form } => {
            app.map_clicked(Coords::new(lat, lng))?;
            let id = submitted(app.submit_new(&form.into_input(None)))?;
            println!("{id}");
        }
        Cmd::Edit { id, form } => {
            app.start_edit(&id)?;
            let base = app.store().get(&id).map(Workout::to_input);
            submitted(app.submit_edit(&form.into_input(base.as_ref())))?;
        }
        Cmd::Delete { id } => {
            if !app.store().contains(&id) {
                tracing::warn!(%id, "no such workout");
            }
            app.delete(&id);
        }
        Cmd::DeleteAll => {
            if !app.delete_all() {
                eprintln!("Nothing deleted.");
            }
        }
        Cmd::Sort { order } => app.sort(order),
        Cmd::Focus { id } => app.focus(&id)?,
        Cmd::Reset => app.reset(),
    }

    let stdout = io::stdout();
    app.renderer()
        .print_list(&mut stdout.lock(), cli.details)
        .context("writing workout list")?;
    Ok(())
}

/// Input errors were already shown to the user by the renderer.
fn submitted<T>(result: Result<T, ControllerError>) -> Result<T> {
    result.map_err(|e| {
        if e.is_input_error() {
            anyhow!("workout not saved")
        } else {
            e.into()
        }
    })
}
