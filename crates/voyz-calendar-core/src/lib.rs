pub mod annotate;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod grid;
pub mod label;
pub mod period;
pub mod render;
pub mod resolver;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting voyz calendar CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  )?;

  let today = match cli.today.as_deref() {
    | Some(raw) => {
      let system_today =
        chrono::Local::now().date_naive();
      datetime::parse_date_expr(
        raw,
        system_today
      )
      .context("invalid --today value")?
    }
    | None => {
      chrono::Local::now().date_naive()
    }
  };
  debug!(%today, "resolved today");

  let renderer =
    render::Renderer::new(&cfg);
  let ctx = commands::CommandContext {
    cfg: &cfg,
    renderer: &renderer,
    today,
    json: cli.json
  };

  commands::dispatch(&ctx, cli.command)?;

  info!("done");
  Ok(())
}
