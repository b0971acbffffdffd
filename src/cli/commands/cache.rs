//! Cache command - inspect and clear cache generations

use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::Response;
use crate::registration::RegistrationRecord;
use crate::storage::{CacheStorage, DiskCacheStorage};
use crate::ui::{self, StepProgress, UiContext};
use console::style;
use serde::Serialize;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> PrecacheResult<()> {
    let storage = DiskCacheStorage::new(ConfigManager::caches_dir(config));
    let record = RegistrationRecord::load(&ConfigManager::registration_path(config)).await?;
    let active = record.map(|r| r.generation);

    match args.action {
        CacheAction::List { format } => list_generations(&storage, active.as_deref(), format).await,
        CacheAction::Show { generation, format } => {
            let generation = generation.or(active).ok_or(PrecacheError::NotRegistered)?;
            show_generation(&storage, &generation, format).await
        }
        CacheAction::Clear { yes } => clear_generations(&storage, config, yes).await,
    }
}

#[derive(Serialize)]
struct GenerationJson {
    name: String,
    entries: usize,
    active: bool,
}

/// List all cache generations
async fn list_generations(
    storage: &DiskCacheStorage,
    active: Option<&str>,
    format: OutputFormat,
) -> PrecacheResult<()> {
    let names = storage.keys().await?;

    let mut generations = Vec::with_capacity(names.len());
    for name in names {
        let entries = storage.entries(&name).await?.len();
        generations.push(GenerationJson {
            active: active == Some(name.as_str()),
            name,
            entries,
        });
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&generations)?),
        OutputFormat::Plain => {
            for generation in &generations {
                println!("{}", generation.name);
            }
        }
        OutputFormat::Table => {
            if generations.is_empty() {
                ui::step_info(&UiContext::detect(), "No cache generations");
                return Ok(());
            }

            println!(
                "{:<32} {:<10} {:<10}",
                style("GENERATION").bold(),
                style("ENTRIES").bold(),
                style("STATE").bold()
            );
            println!("{}", "-".repeat(52));
            for generation in &generations {
                let state = if generation.active {
                    style("active").green()
                } else {
                    style("stale").dim()
                };
                println!(
                    "{:<32} {:<10} {:<10}",
                    generation.name, generation.entries, state
                );
            }
            println!();
            println!("Total: {} generation(s)", generations.len());
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct EntryJson {
    method: String,
    url: String,
    status: u16,
    content_type: Option<String>,
    size: usize,
    captured_at: String,
}

impl EntryJson {
    fn new(method: String, url: String, response: &Response) -> Self {
        Self {
            method,
            url,
            status: response.status,
            content_type: response.content_type().map(str::to_string),
            size: response.body.len(),
            captured_at: response.captured_at.to_rfc3339(),
        }
    }
}

/// List the entries stored in one generation
async fn show_generation(
    storage: &DiskCacheStorage,
    generation: &str,
    format: OutputFormat,
) -> PrecacheResult<()> {
    if !storage.has(generation).await? {
        return Err(PrecacheError::GenerationNotFound(generation.to_string()));
    }

    let mut entries = Vec::new();
    for key in storage.entries(generation).await? {
        if let Some(response) = storage.match_request(generation, &key).await? {
            entries.push(EntryJson::new(key.method.to_string(), key.url.clone(), &response));
        }
    }
    entries.sort_by(|a, b| a.url.cmp(&b.url));

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.url);
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, generation);

            println!(
                "{:<40} {:<7} {:<28} {:>10}",
                style("URL").bold(),
                style("STATUS").bold(),
                style("TYPE").bold(),
                style("BYTES").bold()
            );
            println!("{}", "-".repeat(88));
            for entry in &entries {
                println!(
                    "{:<40} {:<7} {:<28} {:>10}",
                    entry.url,
                    entry.status,
                    entry.content_type.as_deref().unwrap_or("-"),
                    entry.size
                );
            }
            println!();
            println!("{} entries", entries.len());
        }
    }

    Ok(())
}

/// Delete every generation and forget the registration
async fn clear_generations(
    storage: &DiskCacheStorage,
    config: &Config,
    yes: bool,
) -> PrecacheResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let generations = storage.keys().await?;

    if generations.is_empty() {
        ui::step_info(&ctx, "No cache generations to clear");
        return Ok(());
    }

    let confirmed = ui::confirm(
        &ctx,
        &format!("Delete {} cache generation(s)?", generations.len()),
        false,
    )
    .await?;
    if !confirmed {
        ui::step_warn(&ctx, "Aborted");
        return Ok(());
    }

    let progress = StepProgress::new(&ctx, "Deleting", generations.len() as u64);
    let mut deleted = 0;
    for generation in &generations {
        progress.advance(generation);
        if storage.delete(generation).await? {
            deleted += 1;
        }
    }
    progress.finish();

    RegistrationRecord::delete(&ConfigManager::registration_path(config)).await?;
    ui::step_ok(&ctx, &format!("Deleted {} cache generation(s)", deleted));

    Ok(())
}
