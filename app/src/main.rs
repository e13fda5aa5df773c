use std::process::ExitCode;
use std::sync::Arc;

use printdash_core::{targets, ConnectClient, HttpConnectClient, Settings, LOG_LEVEL_VAR};
use printdash_ui::logging::{init_logging, LogLevel, LogStore, DEFAULT_LOG_CAPACITY};
use printdash_ui::{run, Flags};

fn main() -> ExitCode {
    let log_level = LogLevel::from_env_value(std::env::var(LOG_LEVEL_VAR).ok().as_deref());
    let log_store = LogStore::new(DEFAULT_LOG_CAPACITY);
    let reload_handle = init_logging(log_store.clone(), log_level);

    tracing::info!(target: targets::UI, level = %log_level, "printdash starting");

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(error) => {
            tracing::error!(target: targets::CONFIG, error = %error.technical_detail(), "Invalid settings");
            eprintln!("printdash: {}", error.user_summary());
            return ExitCode::from(2);
        }
    };

    let client = match HttpConnectClient::new(&settings.dash.client_config(), &settings.session) {
        Ok(client) => client,
        Err(error) => {
            tracing::error!(target: targets::API, error = %error.technical_detail(), "Client setup failed");
            eprintln!("printdash: {}", error.user_summary());
            return ExitCode::from(2);
        }
    };
    let client: Arc<dyn ConnectClient> = Arc::new(client);

    let flags = Flags {
        log_store,
        reload_handle,
        log_level,
        client,
        printer: settings.printer,
        dash: settings.dash,
    };

    match run(flags) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: targets::UI, %error, "UI exited with an error");
            eprintln!("printdash: {error}");
            ExitCode::FAILURE
        }
    }
}
