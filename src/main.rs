// Entrypoint for the assistant CLI.
// - Load layered config, set up logging, fetch the models catalog once.
// - Hand the API client and terminal prompter to the step loop.
// - Returns `anyhow::Result`: fatal errors exit non-zero with their context.

use anyhow::Context;
use assistant_cli::api::{ApiClient, AssistantsApi};
use assistant_cli::config::Config;
use assistant_cli::run::PollPolicy;
use assistant_cli::session::{self, Session, SessionSettings, Step};
use assistant_cli::ui::TerminalPrompter;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let api = ApiClient::new(&config).context("Failed to build HTTP client")?;
    let catalog = api
        .vendor_catalog()
        .context("Failed to fetch the models catalog")?;
    info!(models = catalog.len(), "models catalog loaded");

    let prompter = TerminalPrompter::new();
    let settings = SessionSettings {
        user_id: config.user_id.clone(),
        poll: PollPolicy::from_config(&config),
    };
    Session::new(&api, &prompter, settings)
        .run(session::Context::new(catalog), Step::Initial)
        .context("Session aborted")?;
    Ok(())
}
