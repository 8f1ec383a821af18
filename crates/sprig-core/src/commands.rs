use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::config::{self, Config};
use crate::datastore::PlantStore;
use crate::plant::{CareTask, Plant};
use crate::render::Renderer;
use crate::repository::PlantRepository;
use crate::seed::PLACEHOLDER_IMAGE;
use crate::suggest::{self, GeminiSuggester, PlantPhoto, SuggestionProvider, SuggestionRequest};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "list",
        "info",
        "schedule",
        "task",
        "done",
        "drop",
        "log",
        "clear",
        "edit",
        "delete",
        "suggest",
        "export",
        "_commands",
        "_show",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(repo, cfg, renderer, inv))]
pub fn dispatch<S: PlantStore>(
    repo: &mut PlantRepository<S>,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let command = inv.command.as_str();

    debug!(
        command,
        selector = ?inv.selector_terms,
        args = ?inv.command_args,
        "dispatching command"
    );

    match command {
        "add" => cmd_add(repo, &inv.command_args),
        "list" => cmd_list(repo, renderer, &inv.selector_terms, now),
        "info" => cmd_info(repo, renderer, &inv.selector_terms, now),
        "schedule" => cmd_schedule(repo, renderer, &inv.selector_terms, now),
        "task" => cmd_task(repo, &inv.selector_terms, &inv.command_args, now),
        "done" => cmd_done(repo, &inv.selector_terms, &inv.command_args, now),
        "drop" => cmd_drop(repo, &inv.selector_terms, &inv.command_args),
        "log" => cmd_log(repo, renderer, &inv.selector_terms),
        "clear" => cmd_clear(repo, &inv.selector_terms),
        "edit" => cmd_edit(repo, &inv.selector_terms, &inv.command_args),
        "delete" => cmd_delete(repo, &inv.selector_terms),
        "suggest" => cmd_suggest(repo, cfg, &inv.selector_terms, &inv.command_args),
        "export" => cmd_export(repo, &inv.selector_terms),
        "_commands" => cmd_commands(),
        "_show" => cmd_show(cfg),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(repo, args))]
fn cmd_add<S: PlantStore>(repo: &mut PlantRepository<S>, args: &[String]) -> anyhow::Result<()> {
    info!("command add");

    let fields = parse_plant_fields(args)?;
    let plant = repo.add_plant(
        fields.name,
        fields.kind,
        fields.image_url,
        fields.description,
    )?;

    println!("Created plant '{}' ({}).", plant.name, plant.id);
    Ok(())
}

#[instrument(skip(repo, renderer, terms, now))]
fn cmd_list<S: PlantStore>(
    repo: &PlantRepository<S>,
    renderer: &mut Renderer,
    terms: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");

    let rows: Vec<&Plant> = repo
        .plants()
        .iter()
        .filter(|plant| matches_terms(plant, terms))
        .collect();

    debug!(count = rows.len(), "listing plants");
    renderer.print_plant_table(&rows, now)
}

#[instrument(skip(repo, renderer, terms, now))]
fn cmd_info<S: PlantStore>(
    repo: &PlantRepository<S>,
    renderer: &mut Renderer,
    terms: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command info");

    let plant = resolve_plant(repo, terms)?;
    renderer.print_plant_info(plant, now)?;

    if !plant.schedule.is_empty() {
        println!();
        renderer.print_schedule_table(plant, now)?;
    }
    if !plant.log.is_empty() {
        println!();
        renderer.print_log_table(plant)?;
    }

    Ok(())
}

#[instrument(skip(repo, renderer, terms, now))]
fn cmd_schedule<S: PlantStore>(
    repo: &PlantRepository<S>,
    renderer: &mut Renderer,
    terms: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command schedule");

    let plant = resolve_plant(repo, terms)?;
    renderer.print_schedule_table(plant, now)
}

#[instrument(skip(repo, terms, args, now))]
fn cmd_task<S: PlantStore>(
    repo: &mut PlantRepository<S>,
    terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command task");

    let plant = resolve_plant(repo, terms)?;
    let plant_id = plant.id.clone();
    let plant_name = plant.name.clone();

    let mut kind_words: Vec<&str> = Vec::new();
    let mut every = None;

    for arg in args {
        match split_mod(arg) {
            Some((key, value)) if key == "every" => {
                let days: u32 = value
                    .parse()
                    .with_context(|| format!("invalid care frequency: {value}"))?;
                every = Some(days);
            }
            _ => kind_words.push(arg),
        }
    }

    let Some(frequency_days) = every else {
        return Err(anyhow!("task: missing every:<days>"));
    };

    let task = repo.add_task(&plant_id, kind_words.join(" "), frequency_days, now)?;
    println!(
        "Added care task '{}' every {} day(s) to '{}'.",
        task.kind, task.frequency_days, plant_name
    );
    Ok(())
}

#[instrument(skip(repo, terms, args, now))]
fn cmd_done<S: PlantStore>(
    repo: &mut PlantRepository<S>,
    terms: &[String],
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command done");

    let Some((task_token, rest)) = args.split_first() else {
        return Err(anyhow!("done: missing task id or type"));
    };

    let plant = resolve_plant(repo, terms)?;
    let task = resolve_task(plant, task_token)?;
    let plant_id = plant.id.clone();
    let plant_name = plant.name.clone();
    let task_id = task.id.clone();

    let mut note_words: Vec<&str> = Vec::new();
    let mut photo_url = None;

    for arg in rest {
        match split_mod(arg) {
            Some((key, value)) if key == "photo" => photo_url = Some(value.to_string()),
            _ => note_words.push(arg),
        }
    }

    let notes = if note_words.is_empty() {
        None
    } else {
        Some(note_words.join(" "))
    };

    let entry = repo.complete_task(&plant_id, &task_id, notes, photo_url, now)?;
    println!("Completed '{}' for '{}'.", entry.task_type, plant_name);
    Ok(())
}

#[instrument(skip(repo, terms, args))]
fn cmd_drop<S: PlantStore>(
    repo: &mut PlantRepository<S>,
    terms: &[String],
    args: &[String],
) -> anyhow::Result<()> {
    info!("command drop");

    let Some(task_token) = args.first() else {
        return Err(anyhow!("drop: missing task id or type"));
    };

    let Some(plant) = find_plant(repo, terms)? else {
        println!("Removed 0 care task(s).");
        return Ok(());
    };
    let plant_id = plant.id.clone();
    let task_id = find_task(plant, task_token)?.map(|task| task.id.clone());

    let Some(task_id) = task_id else {
        println!("Removed 0 care task(s).");
        return Ok(());
    };

    let removed = repo.remove_task(&plant_id, &task_id)?;
    println!("Removed {} care task(s).", u64::from(removed));
    Ok(())
}

#[instrument(skip(repo, renderer, terms))]
fn cmd_log<S: PlantStore>(
    repo: &PlantRepository<S>,
    renderer: &mut Renderer,
    terms: &[String],
) -> anyhow::Result<()> {
    info!("command log");

    let plant = resolve_plant(repo, terms)?;
    renderer.print_log_table(plant)
}

#[instrument(skip(repo, terms))]
fn cmd_clear<S: PlantStore>(repo: &mut PlantRepository<S>, terms: &[String]) -> anyhow::Result<()> {
    info!("command clear");

    let plant = resolve_plant(repo, terms)?;
    let plant_id = plant.id.clone();
    let plant_name = plant.name.clone();

    repo.clear_log(&plant_id)?;
    println!("Cleared care log for '{plant_name}'.");
    Ok(())
}

#[instrument(skip(repo, terms, args))]
fn cmd_edit<S: PlantStore>(
    repo: &mut PlantRepository<S>,
    terms: &[String],
    args: &[String],
) -> anyhow::Result<()> {
    info!("command edit");

    let plant = resolve_plant(repo, terms)?;
    let mut updated = plant.clone();

    let mut changed = false;
    let mut in_description = false;
    let mut description_words: Vec<&str> = Vec::new();

    for arg in args {
        if in_description {
            description_words.push(arg);
            continue;
        }
        if arg == "--" {
            in_description = true;
            continue;
        }

        match split_mod(arg) {
            Some((key, value)) if key == "name" => {
                updated.name = value.to_string();
                changed = true;
            }
            Some((key, value)) if key == "type" || key == "kind" => {
                updated.kind = value.to_string();
                changed = true;
            }
            Some((key, value)) if key == "image" => {
                updated.image_url = value.to_string();
                changed = true;
            }
            _ => return Err(anyhow!("edit: unrecognized argument: {arg}")),
        }
    }

    if in_description {
        updated.description = description_words.join(" ");
        changed = true;
    }

    if !changed {
        return Err(anyhow!("edit: nothing to change"));
    }

    let name = updated.name.clone();
    repo.update_plant(updated)?;
    println!("Updated plant '{name}'.");
    Ok(())
}

#[instrument(skip(repo, terms))]
fn cmd_delete<S: PlantStore>(
    repo: &mut PlantRepository<S>,
    terms: &[String],
) -> anyhow::Result<()> {
    info!("command delete");

    let Some(plant) = find_plant(repo, terms)? else {
        println!("Deleted 0 plant(s).");
        return Ok(());
    };
    let plant_id = plant.id.clone();

    let removed = repo.remove_plant(&plant_id)?;
    println!("Deleted {} plant(s).", u64::from(removed));
    Ok(())
}

#[instrument(skip(repo, cfg, terms, args))]
fn cmd_suggest<S: PlantStore>(
    repo: &PlantRepository<S>,
    cfg: &Config,
    terms: &[String],
    args: &[String],
) -> anyhow::Result<()> {
    info!("command suggest");

    let plant = resolve_plant(repo, terms)?;

    let mut photo_path = None;
    for arg in args {
        match split_mod(arg) {
            Some((key, value)) if key == "photo" => photo_path = Some(value.to_string()),
            _ => return Err(anyhow!("suggest: unrecognized argument: {arg}")),
        }
    }

    let Some(photo_path) = photo_path else {
        return Err(anyhow!("suggest: missing photo:<path>"));
    };

    let photo = read_photo(Path::new(&photo_path))?;
    let key = config::resolve_suggest_key(cfg)
        .ok_or_else(|| anyhow!("no API key; set GEMINI_API_KEY or suggest.key"))?;
    let base_url = cfg
        .get("suggest.url")
        .unwrap_or_else(|| suggest::DEFAULT_BASE_URL.to_string());
    let model = cfg
        .get("suggest.model")
        .unwrap_or_else(|| suggest::DEFAULT_MODEL.to_string());

    let provider = GeminiSuggester::new(base_url, model, key)?;
    let request = SuggestionRequest {
        plant_name: plant.name.clone(),
        plant_kind: plant.kind.clone(),
        plant_description: plant.description.clone(),
        plant_photo: photo,
    };

    let response = provider
        .suggest(&request)
        .context("failed to get care suggestions")?;

    println!("Care schedule:");
    println!("{}", response.care_schedule);
    println!();
    println!("Additional resources:");
    println!("{}", response.additional_resources);
    Ok(())
}

#[instrument(skip(repo, terms))]
fn cmd_export<S: PlantStore>(repo: &PlantRepository<S>, terms: &[String]) -> anyhow::Result<()> {
    info!("command export");

    let rows: Vec<&Plant> = repo
        .plants()
        .iter()
        .filter(|plant| matches_terms(plant, terms))
        .collect();

    let out = serde_json::to_string(&rows)?;
    println!("{out}");
    Ok(())
}

fn cmd_commands() -> anyhow::Result<()> {
    for command in known_command_names() {
        println!("{command}");
    }
    Ok(())
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Implemented commands: add, list, info, schedule, task, done, drop, log, clear, edit, delete, suggest, export"
    );
    Ok(())
}

fn find_plant<'a, S: PlantStore>(
    repo: &'a PlantRepository<S>,
    terms: &[String],
) -> anyhow::Result<Option<&'a Plant>> {
    if terms.is_empty() {
        return Err(anyhow!("no plant selected; give an id or part of a name"));
    }

    let needle = terms.join(" ");
    if let Some(plant) = repo.plant_by_id(&needle) {
        return Ok(Some(plant));
    }

    let by_id_prefix: Vec<&Plant> = repo
        .plants()
        .iter()
        .filter(|plant| plant.id.starts_with(&needle))
        .collect();
    if by_id_prefix.len() == 1 {
        return Ok(Some(by_id_prefix[0]));
    }

    let lowered = needle.to_lowercase();
    let by_name: Vec<&Plant> = repo
        .plants()
        .iter()
        .filter(|plant| plant.name.to_lowercase().contains(&lowered))
        .collect();

    match by_name.len() {
        0 => Ok(None),
        1 => Ok(Some(by_name[0])),
        _ => {
            let names = by_name
                .iter()
                .map(|plant| plant.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Err(anyhow!("'{needle}' matches more than one plant: {names}"))
        }
    }
}

fn resolve_plant<'a, S: PlantStore>(
    repo: &'a PlantRepository<S>,
    terms: &[String],
) -> anyhow::Result<&'a Plant> {
    find_plant(repo, terms)?.ok_or_else(|| anyhow!("no plant matches '{}'", terms.join(" ")))
}

fn find_task<'a>(plant: &'a Plant, token: &str) -> anyhow::Result<Option<&'a CareTask>> {
    if let Some(task) = plant.schedule.iter().find(|task| task.id == token) {
        return Ok(Some(task));
    }

    let by_id_prefix: Vec<&CareTask> = plant
        .schedule
        .iter()
        .filter(|task| task.id.starts_with(token))
        .collect();
    if by_id_prefix.len() == 1 {
        return Ok(Some(by_id_prefix[0]));
    }

    let by_kind: Vec<&CareTask> = plant
        .schedule
        .iter()
        .filter(|task| task.kind.eq_ignore_ascii_case(token))
        .collect();

    match by_kind.len() {
        0 => Ok(None),
        1 => Ok(Some(by_kind[0])),
        _ => Err(anyhow!(
            "'{token}' matches more than one care task on '{}'; use the task id",
            plant.name
        )),
    }
}

fn resolve_task<'a>(plant: &'a Plant, token: &str) -> anyhow::Result<&'a CareTask> {
    find_task(plant, token)?
        .ok_or_else(|| anyhow!("no care task on '{}' matches '{token}'", plant.name))
}

fn matches_terms(plant: &Plant, terms: &[String]) -> bool {
    terms.iter().all(|term| {
        let lowered = term.to_lowercase();
        plant.id == *term
            || plant.name.to_lowercase().contains(&lowered)
            || plant.kind.to_lowercase().contains(&lowered)
    })
}

fn split_mod(token: &str) -> Option<(String, &str)> {
    let (key, value) = token.split_once(':').or_else(|| token.split_once('='))?;
    Some((key.to_ascii_lowercase(), value))
}

#[derive(Debug)]
struct PlantFields {
    name: String,
    kind: String,
    image_url: String,
    description: String,
}

fn parse_plant_fields(args: &[String]) -> anyhow::Result<PlantFields> {
    let mut name_words: Vec<&str> = Vec::new();
    let mut kind = None;
    let mut image_url = None;
    let mut description_words: Vec<&str> = Vec::new();
    let mut in_description = false;

    for arg in args {
        if in_description {
            description_words.push(arg);
            continue;
        }
        if arg == "--" {
            in_description = true;
            continue;
        }

        match split_mod(arg) {
            Some((key, value)) if key == "type" || key == "kind" => kind = Some(value.to_string()),
            Some((key, value)) if key == "image" => image_url = Some(value.to_string()),
            _ => name_words.push(arg),
        }
    }

    let name = name_words.join(" ");
    if name.trim().is_empty() {
        return Err(anyhow!("add: plant name is required"));
    }

    Ok(PlantFields {
        name,
        kind: kind.unwrap_or_default(),
        image_url: image_url.unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        description: description_words.join(" "),
    })
}

fn read_photo(path: &Path) -> anyhow::Result<PlantPhoto> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read photo {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mime_type = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return Err(anyhow!("cannot tell the photo type of {}", path.display())),
    };

    Ok(PlantPhoto {
        mime_type: mime_type.to_string(),
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
    })
}
