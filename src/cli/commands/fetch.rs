//! Fetch command - request a URL the way an open page would

use super::{open_registration, save_registration};
use crate::cli::args::FetchArgs;
use crate::config::{Config, ConfigManager};
use crate::controller::ResponseSource;
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{Method, Request, RequestMode};
use console::style;
use std::io::Write;
use tokio::fs;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config, manager: &ConfigManager) -> PrecacheResult<()> {
    let method: Method = args.method.parse().map_err(PrecacheError::User)?;
    if !args.url.starts_with('/') {
        return Err(PrecacheError::InvalidUrl(args.url));
    }

    let mut request = Request::new(method, args.url.as_str());
    if args.navigate {
        request = request.with_mode(RequestMode::Navigate);
    }

    let registration = open_registration(config, manager.path()).await?;
    let outcome = registration.fetch(&request).await?;

    let source = match outcome.source {
        ResponseSource::Network => style(outcome.source.to_string()).green(),
        ResponseSource::Cache => style(outcome.source.to_string()).cyan(),
        ResponseSource::OfflineShell => style(outcome.source.to_string()).yellow(),
        ResponseSource::Passthrough => style(outcome.source.to_string()).dim(),
    };
    eprintln!(
        "{} {} {} ({} bytes, {})",
        style(outcome.response.status).bold(),
        request.method,
        request.url,
        outcome.response.body.len(),
        source
    );

    match args.output {
        Some(path) => {
            fs::write(&path, &outcome.response.body)
                .await
                .map_err(|e| PrecacheError::io(format!("writing {}", path.display()), e))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(&outcome.response.body)
                .and_then(|_| stdout.flush())
                .map_err(|e| PrecacheError::io("writing response body", e))?;
        }
    }

    // Background writes from a network-first hit land before exit
    save_registration(&registration, config).await
}
