use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use colored::Colorize;
use prov_repo::{ProvConfig, Repo, RepoTree};
use prov_types::{Artifact, ArtifactSet, ContentId, Inputs};
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;

const DEFAULT_CONFIG_FILE: &str = "prov.toml";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let out = Output { format: cli.format };
    if let Command::Config = cli.command {
        return cmd_config(&config, out);
    }
    let tree = config.repo.build_tree().context("failed to open repo")?;
    let repo = &tree.root;
    match cli.command {
        Command::Put(args) => cmd_put(repo, args, out),
        Command::Get(arg) => cmd_get(repo, &arg.id, out),
        Command::Value(arg) => out.json(&repo.get_value(&ContentId::new(arg.id))?),
        Command::Inputs(arg) => out.json(&repo.get_inputs(&ContentId::new(arg.id))?.to_json()),
        Command::Contains(arg) => cmd_contains(repo, &arg.id, out),
        Command::FindValue(arg) => {
            let artifact = repo.get_by_value_id(&ContentId::new(arg.id))?;
            out.artifact(&artifact)
        }
        Command::Delete(arg) => {
            repo.delete(&ContentId::new(arg.id.as_str()))?;
            out.done(&format!("Deleted artifact {}", arg.id.yellow()))
        }
        Command::Ls => cmd_ls(repo, out),
        Command::Set(args) => cmd_set(repo, args.action, out),
        Command::Compact => cmd_compact(&tree, out),
        Command::Config => cmd_config(&config, out),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ProvConfig> {
    match path {
        Some(path) => Ok(ProvConfig::load(path)?),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            debug!(path = DEFAULT_CONFIG_FILE, "using config from working directory");
            Ok(ProvConfig::load(Path::new(DEFAULT_CONFIG_FILE))?)
        }
        None => Ok(ProvConfig::default()),
    }
}

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
}

impl Output {
    fn json(&self, value: &Value) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn done(&self, message: &str) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Text => println!("{} {}", "✓".green().bold(), message),
            OutputFormat::Json => self.json(&json!({ "ok": true }))?,
        }
        Ok(())
    }

    fn artifact(&self, artifact: &Artifact) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => self.json(&serde_json::to_value(artifact)?),
            OutputFormat::Text => {
                println!("{} {}", "artifact".bold(), artifact.id.as_str().yellow());
                println!("  Name:     {} (v{})", artifact.name.bold(), artifact.version);
                println!("  Value id: {}", artifact.value_id.as_str().cyan());
                if let Some(at) = artifact.computed_at {
                    println!("  Computed: {}", at.to_rfc3339());
                }
                for (name, input) in artifact.inputs.kwargs() {
                    match input.as_proxy() {
                        Some(proxy) => println!(
                            "  Input:    {} = {} ({})",
                            name,
                            proxy.id.short().yellow(),
                            proxy.name
                        ),
                        None => println!("  Input:    {} = {}", name, input.to_json()),
                    }
                }
                if !artifact.inputs.varargs().is_empty() {
                    println!("  Varargs:  {}", artifact.inputs.varargs().len());
                }
                println!("  Value:    {}", artifact.value);
                Ok(())
            }
        }
    }

    fn set(&self, set: &ArtifactSet) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => self.json(&serde_json::to_value(set)?),
            OutputFormat::Text => {
                let name = set.name.as_deref().unwrap_or("(anonymous)");
                println!("{} {}  {}", "set".bold(), set.id.as_str().yellow(), name.bold());
                for id in &set.artifact_ids {
                    println!("  {}", id.as_str());
                }
                Ok(())
            }
        }
    }
}

/// `key=json`, falling back to a plain string when the right side is not JSON.
fn parse_pair(pair: &str) -> anyhow::Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got {pair:?}"))?;
    if key.is_empty() {
        bail!("empty input name in {pair:?}");
    }
    Ok((key.to_string(), parse_value(raw)))
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn cmd_put(repo: &Arc<dyn Repo>, args: PutArgs, out: Output) -> anyhow::Result<()> {
    let mut inputs = Inputs::new();
    for pair in &args.inputs {
        let (key, value) = parse_pair(pair)?;
        inputs.insert(key, value)?;
    }
    for pair in &args.artifacts {
        let (key, id) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected key=artifact-id, got {pair:?}"))?;
        let upstream = repo
            .get_by_id(&ContentId::new(id))
            .with_context(|| format!("input {key:?} refers to an unknown artifact"))?;
        inputs.insert(key, &upstream)?;
    }

    let artifact = Artifact::builder(args.name, parse_value(&args.value))
        .version(args.version)
        .inputs(inputs)
        .computed_at(Utc::now())
        .build();
    repo.put(&artifact)?;

    match out.format {
        OutputFormat::Json => out.json(&json!({ "id": artifact.id, "value_id": artifact.value_id })),
        OutputFormat::Text => out.done(&format!(
            "Stored {} as {}",
            artifact.name.bold(),
            artifact.id.as_str().yellow()
        )),
    }
}

fn cmd_get(repo: &Arc<dyn Repo>, id: &str, out: Output) -> anyhow::Result<()> {
    let artifact = repo.get_by_id(&ContentId::new(id))?;
    out.artifact(&artifact)
}

fn cmd_contains(repo: &Arc<dyn Repo>, id: &str, out: Output) -> anyhow::Result<()> {
    let found = repo.contains(&ContentId::new(id))?;
    match out.format {
        OutputFormat::Json => out.json(&json!({ "id": id, "contains": found })),
        OutputFormat::Text if found => {
            println!("{} {}", "✓".green().bold(), id);
            Ok(())
        }
        OutputFormat::Text => {
            println!("{} {}", "✗".red().bold(), id);
            Ok(())
        }
    }
}

fn cmd_ls(repo: &Arc<dyn Repo>, out: Output) -> anyhow::Result<()> {
    let ids = repo.artifact_ids()?;
    match out.format {
        OutputFormat::Json => out.json(&json!(ids)),
        OutputFormat::Text => {
            if ids.is_empty() {
                println!("No artifacts.");
            }
            for id in &ids {
                let artifact = repo.get_by_id(id)?;
                println!(
                    "{}  {} (v{})",
                    id.short().yellow(),
                    artifact.name,
                    artifact.version
                );
            }
            Ok(())
        }
    }
}

fn cmd_set(repo: &Arc<dyn Repo>, action: SetAction, out: Output) -> anyhow::Result<()> {
    match action {
        SetAction::Create { name, ids } => {
            let set = ArtifactSet::named(ids, name);
            repo.put_set(&set)?;
            match out.format {
                OutputFormat::Json => out.json(&json!({ "id": set.id })),
                OutputFormat::Text => out.done(&format!(
                    "Stored set {} with {} artifacts as {}",
                    set.name.as_deref().unwrap_or_default().bold(),
                    set.len(),
                    set.id.as_str().yellow()
                )),
            }
        }
        SetAction::Show { id, name } => {
            let set = match (id, name) {
                (Some(id), None) => repo.get_set_by_id(&ContentId::new(id))?,
                (None, Some(name)) => repo.get_set_by_name(&name)?,
                _ => bail!("give either a set id or --name"),
            };
            out.set(&set)
        }
        SetAction::Delete { id } => {
            repo.delete_set(&ContentId::new(id.as_str()))?;
            out.done(&format!("Deleted set {}", id.yellow()))
        }
        SetAction::Ls => {
            let ids = repo.set_ids()?;
            match out.format {
                OutputFormat::Json => out.json(&json!(ids)),
                OutputFormat::Text => {
                    if ids.is_empty() {
                        println!("No sets.");
                    }
                    for id in &ids {
                        let set = repo.get_set_by_id(id)?;
                        let name = set.name.as_deref().unwrap_or("(anonymous)");
                        println!("{}  {} ({} artifacts)", id.short().yellow(), name, set.len());
                    }
                    Ok(())
                }
            }
        }
    }
}

fn cmd_compact(tree: &RepoTree, out: Output) -> anyhow::Result<()> {
    if tree.databases.is_empty() {
        bail!("no database repos configured");
    }
    let mut report = Vec::new();
    for db in &tree.databases {
        let reclaimed = db.compact()?;
        report.push(json!({ "repo": db.name(), "reclaimed_bytes": reclaimed }));
        if out.format == OutputFormat::Text {
            println!(
                "{} Compacted {} ({} bytes reclaimed)",
                "✓".green().bold(),
                db.name().bold(),
                reclaimed
            );
        }
    }
    if out.format == OutputFormat::Json {
        out.json(&Value::Array(report))?;
    }
    Ok(())
}

fn cmd_config(config: &ProvConfig, out: Output) -> anyhow::Result<()> {
    match out.format {
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}
