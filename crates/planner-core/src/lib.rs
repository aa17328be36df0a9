pub mod app_state;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod geometry;
pub mod gesture;
pub mod goal;
pub mod journal;
pub mod reminders;
pub mod render;
pub mod resolver;
pub mod session;
pub mod store;
pub mod task;
pub mod views;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use chrono::Local;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_args(raw_args)?;

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting planner CLI"
  );

  let overrides = cli.override_pairs();
  debug!(?overrides, "config overrides");

  let cfg = config::Config::load(
    cli.config.as_deref(),
    overrides
  )?;

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let mut store =
    datastore::DataStore::open(
      &data_dir
    )
    .with_context(|| {
      format!(
        "failed to open datastore at \
         {}",
        data_dir.display()
      )
    })?
    .with_default_duration(
      cfg.tasks.default_duration_minutes
    );

  let renderer = render::Renderer::new();
  let now = Local::now().naive_local();
  let mut out = io::stdout().lock();

  commands::dispatch(
    &mut store,
    &cfg,
    &renderer,
    &mut out,
    cli.command,
    now
  )?;

  info!("done");
  Ok(())
}
