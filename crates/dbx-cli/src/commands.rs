use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use dbx_agent::{Agent, AgentConfig, Runtime};
use dbx_ledger::LedgerValidator;
use dbx_naming::NameService;
use dbx_sync::{AddressedFile, ConcurrencyMode, FileDescriptor, RemoveOptions, UploadOptions};
use serde::Serialize;
use serde_json::json;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = AgentConfig::load_or_default(cli.config.as_deref())?;
    if let Command::Connect(args) = &cli.command {
        if let Some(addr) = &args.addr {
            config.control_addr = addr.clone();
        }
        if args.no_teardown {
            config.teardown_on_failure = false;
        }
    }
    let runtime = Runtime::open(&config)?;
    let format = cli.format;

    match cli.command {
        Command::Upload(args) => cmd_upload(&runtime, format, args).await,
        Command::Sync(args) => cmd_sync(&runtime, format, args).await,
        Command::Remove(args) => cmd_remove(&runtime, format, args).await,
        Command::Get(args) => cmd_get(&runtime, format, args).await,
        Command::Publish(args) => cmd_publish(&runtime, format, args).await,
        Command::Resolve(args) => cmd_resolve(&runtime, format, args).await,
        Command::Anchor(args) => cmd_anchor(&runtime, format, args).await,
        Command::Lookup(args) => cmd_lookup(&runtime, format, args).await,
        Command::Verify(_) => cmd_verify(&runtime, format),
        Command::Connect(_) => cmd_connect(&runtime, &config, format).await,
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_file(file: &AddressedFile) {
    let kind = if file.directory { "tree" } else { "blob" };
    print!("  {} {} {}", file.address.short_hex().yellow(), kind.dimmed(), file.path);
    match &file.name {
        Some(name) => println!(" as {}", name.cyan()),
        None => println!(),
    }
}

async fn cmd_upload(runtime: &Runtime, format: OutputFormat, args: UploadArgs) -> anyhow::Result<()> {
    let options = UploadOptions {
        recurse: args.recursive,
        publish: args.publish || args.name.is_some(),
        name: args.name,
    };
    let outcome = runtime.engine.upload(&args.path, &options).await?;
    if format == OutputFormat::Json {
        return print_json(&outcome);
    }
    for file in outcome.files() {
        print_file(file);
    }
    println!("{} Uploaded {} entries", "✓".green().bold(), outcome.files().len());
    Ok(())
}

/// Read a JSON array of descriptors from `input`, or stdin when absent or `-`.
pub(crate) fn read_descriptors(input: Option<&Path>) -> anyhow::Result<Vec<FileDescriptor>> {
    let text = match input.filter(|path| *path != Path::new("-")) {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("reading descriptors from stdin")?;
            text
        }
    };
    serde_json::from_str(&text).context("parsing file descriptors")
}

async fn cmd_sync(runtime: &Runtime, format: OutputFormat, args: SyncArgs) -> anyhow::Result<()> {
    let descriptors = read_descriptors(args.input.as_deref())?;
    let mut engine = runtime.engine.clone();
    if args.serial {
        engine = engine.with_mode(ConcurrencyMode::Serial);
    } else if let Some(limit) = args.limit {
        engine = engine.with_mode(ConcurrencyMode::Concurrent { limit });
    }

    let result = engine.synchronize(&descriptors).await?;
    if format == OutputFormat::Json {
        return print_json(&result);
    }
    if result.is_empty() {
        println!("Everything up to date.");
        return Ok(());
    }
    for (path, entry) in result.iter() {
        let kind = if entry.directory { "tree" } else { "blob" };
        println!("  {} {} {}", entry.address.short_hex().yellow(), kind.dimmed(), path);
    }
    println!(
        "{} Synchronized {} of {} entries",
        "✓".green().bold(),
        result.len(),
        descriptors.len()
    );
    Ok(())
}

async fn cmd_remove(runtime: &Runtime, format: OutputFormat, args: RemoveArgs) -> anyhow::Result<()> {
    let options = RemoveOptions { local: args.local };
    let address = runtime
        .engine
        .remove(&args.path, &args.address, &options)
        .await?;
    if format == OutputFormat::Json {
        return print_json(&json!({ "path": args.path, "address": address }));
    }
    if args.local {
        println!("{} Removed {} ({})", "✓".green().bold(), args.path.display(), address.short_hex().yellow());
    } else {
        println!("{} Unpinned {}", "✓".green().bold(), address.short_hex().yellow());
    }
    Ok(())
}

async fn cmd_get(runtime: &Runtime, format: OutputFormat, args: GetArgs) -> anyhow::Result<()> {
    runtime.engine.materialize(&args.address, &args.path).await?;
    if format == OutputFormat::Json {
        return print_json(&json!({ "path": args.path, "address": args.address }));
    }
    println!(
        "{} Wrote {} to {}",
        "✓".green().bold(),
        args.address.short_hex().yellow(),
        args.path.display()
    );
    Ok(())
}

async fn cmd_publish(runtime: &Runtime, format: OutputFormat, args: PublishArgs) -> anyhow::Result<()> {
    let name = runtime.names.publish(&args.address).await?;
    if format == OutputFormat::Json {
        return print_json(&json!({ "name": name, "address": args.address }));
    }
    println!("{} Published {} as {}", "✓".green().bold(), args.address.short_hex().yellow(), name.cyan());
    Ok(())
}

async fn cmd_resolve(runtime: &Runtime, format: OutputFormat, args: ResolveArgs) -> anyhow::Result<()> {
    let address = runtime.names.resolve(&args.name).await?;
    if format == OutputFormat::Json {
        return print_json(&json!({ "name": args.name, "address": address }));
    }
    println!("{address}");
    Ok(())
}

async fn cmd_anchor(runtime: &Runtime, format: OutputFormat, args: AnchorArgs) -> anyhow::Result<()> {
    if !runtime.names.anchor(&args.name, &args.address).await? {
        bail!("name {:?} is anchored by another account", args.name);
    }
    if format == OutputFormat::Json {
        return print_json(&json!({ "name": args.name, "address": args.address }));
    }
    println!("{} Anchored {} → {}", "✓".green().bold(), args.name.cyan(), args.address.short_hex().yellow());
    Ok(())
}

async fn cmd_lookup(runtime: &Runtime, format: OutputFormat, args: LookupArgs) -> anyhow::Result<()> {
    let address = runtime.names.lookup_binding(&args.name).await?;
    if format == OutputFormat::Json {
        return print_json(&json!({ "name": args.name, "address": address }));
    }
    println!("{address}");
    Ok(())
}

fn cmd_verify(runtime: &Runtime, format: OutputFormat) -> anyhow::Result<()> {
    let report = LedgerValidator::validate_ledger(&**runtime.names.ledger())?;
    if format == OutputFormat::Json {
        let violations: Vec<_> = report
            .violations
            .iter()
            .map(|v| json!({ "seq": v.seq, "kind": format!("{:?}", v.kind), "description": v.description }))
            .collect();
        print_json(&json!({ "records": report.record_count, "violations": violations }))?;
    } else if report.is_valid() {
        println!("{} Anchor ledger verified", "✓".green().bold());
        println!("  Records: {}", report.record_count.to_string().bold());
    } else {
        for v in &report.violations {
            println!("  {} seq {} {:?}: {}", "✗".red(), v.seq, v.kind, v.description);
        }
    }
    if !report.is_valid() {
        bail!("{} ledger violations", report.violations.len());
    }
    Ok(())
}

async fn cmd_connect(runtime: &Runtime, config: &AgentConfig, format: OutputFormat) -> anyhow::Result<()> {
    let agent = Agent::new(runtime.engine.clone(), config);
    let summary = agent
        .connect(&config.control_addr)
        .await
        .with_context(|| format!("serving control process at {}", config.control_addr))?;
    if format == OutputFormat::Json {
        return print_json(&json!({
            "handled": summary.handled,
            "skipped": summary.skipped,
            "tornDown": summary.torn_down,
        }));
    }
    println!(
        "Connection closed: {} handled, {} skipped",
        summary.handled.to_string().bold(),
        summary.skipped
    );
    if summary.torn_down {
        println!("  {}", "closed after a failed batch".yellow());
    }
    Ok(())
}
