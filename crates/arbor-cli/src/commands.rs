use std::io::Write;

use anyhow::Context;
use arbor::{DiffEntry, LogEntry, LogOptions, ObjectType, PersonIdent, Repository, RevSort};
use chrono::{DateTime, FixedOffset};
use colored::Colorize;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    tracing::debug!(repo = %cli.repo.display(), ?format, "running command");
    match cli.command {
        Command::Init(args) => cmd_init(args, &cli.repo),
        Command::RevParse(args) => cmd_rev_parse(&open(&cli.repo)?, args, format),
        Command::CatFile(args) => cmd_cat_file(&open(&cli.repo)?, args, format),
        Command::Log(args) => cmd_log(&open(&cli.repo)?, args, format),
        Command::DiffTree(args) => cmd_diff_tree(&open(&cli.repo)?, args, format),
        Command::LsFiles(args) => cmd_ls_files(&open(&cli.repo)?, args, format),
    }
}

fn open(path: &std::path::Path) -> anyhow::Result<Repository> {
    Repository::open(path).with_context(|| format!("cannot open repository at {}", path.display()))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_init(args: InitArgs, repo: &std::path::Path) -> anyhow::Result<()> {
    let path = args.path.unwrap_or_else(|| repo.to_path_buf());
    let repo = if args.bare {
        Repository::init_bare(&path)?
    } else {
        Repository::init(&path)?
    };
    let mode = if args.bare { "bare " } else { "" };
    println!(
        "{} Initialized empty {}repository in {}",
        "✓".green().bold(),
        mode,
        repo.git_dir().display().to_string().bold()
    );
    println!("  Branch: {}", arbor::DEFAULT_BRANCH.yellow());
    Ok(())
}

fn cmd_rev_parse(repo: &Repository, args: RevParseArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = repo.resolve(&args.expr)?;
    match format {
        OutputFormat::Text => println!("{id}"),
        OutputFormat::Json => print_json(&json!({ "expr": args.expr, "id": id }))?,
    }
    Ok(())
}

fn cmd_cat_file(repo: &Repository, args: CatFileArgs, format: OutputFormat) -> anyhow::Result<()> {
    let odb = repo.object_database();
    let id = repo.resolve(&args.expr)?;
    let object = odb.open(&id)?;

    if args.show_type {
        match format {
            OutputFormat::Text => println!("{}", object.kind),
            OutputFormat::Json => print_json(&json!({ "id": id, "type": object.kind }))?,
        }
        return Ok(());
    }

    match (object.kind, format) {
        (ObjectType::Tree, OutputFormat::Text) => {
            for entry in odb.map_tree(&id)?.entries() {
                let kind = entry.mode.object_type().map(|t| t.as_str()).unwrap_or("unknown");
                println!("{:06o} {} {}\t{}", entry.mode.bits(), kind, entry.id, entry.name_str());
            }
        }
        (ObjectType::Tree, OutputFormat::Json) => {
            let entries: Vec<_> = odb
                .map_tree(&id)?
                .entries()
                .iter()
                .map(|e| json!({ "mode": e.mode, "id": e.id, "name": e.name_str() }))
                .collect();
            print_json(&json!({ "id": id, "type": object.kind, "entries": entries }))?;
        }
        (_, OutputFormat::Text) => {
            let mut out = std::io::stdout().lock();
            out.write_all(&object.data)?;
            out.flush()?;
        }
        (_, OutputFormat::Json) => print_json(&json!({
            "id": id,
            "type": object.kind,
            "size": object.size(),
            "content": String::from_utf8_lossy(&object.data),
        }))?,
    }
    Ok(())
}

fn cmd_log(repo: &Repository, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut sort = Vec::new();
    if args.topo {
        sort.push(RevSort::Topo);
    }
    if args.date_order {
        sort.push(RevSort::CommitTime);
    }
    if args.reverse {
        sort.push(RevSort::Reverse);
    }
    let options = LogOptions {
        sort,
        max_count: args.max_count,
        no_merges: args.no_merges,
        paths: args.paths,
    };
    let entries = repo.log(args.revs.as_slice(), &options)?;

    match format {
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Text => {
            for (i, entry) in entries.iter().enumerate() {
                if i > 0 {
                    println!();
                }
                print!("{}", render_log_entry(entry));
            }
        }
    }
    Ok(())
}

fn render_log_entry(entry: &LogEntry) -> String {
    let mut out = format!("{} {}\n", "commit".yellow(), entry.id.to_string().yellow());
    if entry.parents.len() > 1 {
        let parents: Vec<String> = entry.parents.iter().map(|p| p.abbreviate(7)).collect();
        out.push_str(&format!("Merge: {}\n", parents.join(" ")));
    }
    out.push_str(&format!("Author: {} <{}>\n", entry.author.name, entry.author.email));
    out.push_str(&format!("Date:   {}\n\n", format_date(&entry.author)));
    for line in entry.message.trim_end().lines() {
        out.push_str(&format!("    {line}\n"));
    }
    out
}

fn format_date(ident: &PersonIdent) -> String {
    let offset = FixedOffset::east_opt(ident.tz_offset * 60);
    match (DateTime::from_timestamp(ident.when, 0), offset) {
        (Some(utc), Some(offset)) => utc
            .with_timezone(&offset)
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string(),
        _ => format!("{} {}", ident.when, ident.tz_string()),
    }
}

fn cmd_diff_tree(repo: &Repository, args: DiffTreeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let changes = repo.diff(Some(&args.old), &args.new, &args.paths)?;
    match format {
        OutputFormat::Json => print_json(&changes)?,
        OutputFormat::Text => {
            for change in &changes {
                println!("{}", render_change(change));
            }
        }
    }
    Ok(())
}

fn render_change(change: &DiffEntry) -> String {
    let status = change.status().to_string();
    let status = match change {
        DiffEntry::Added { .. } => status.green(),
        DiffEntry::Deleted { .. } => status.red(),
        DiffEntry::Renamed { .. } => status.cyan(),
        DiffEntry::Modified { .. } | DiffEntry::ModeChanged { .. } => status.yellow(),
    };
    match change {
        DiffEntry::Renamed { old_path, new_path, .. } => format!("{status}\t{old_path} -> {new_path}"),
        other => format!("{status}\t{}", other.path()),
    }
}

fn cmd_ls_files(repo: &Repository, args: LsFilesArgs, format: OutputFormat) -> anyhow::Result<()> {
    let index = repo.read_index()?;
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = index
                .entries()
                .iter()
                .map(|e| {
                    json!({
                        "path": e.path_string(),
                        "mode": e.mode,
                        "id": e.id,
                        "stage": e.stage().number(),
                        "size": e.size,
                    })
                })
                .collect();
            print_json(&entries)?;
        }
        OutputFormat::Text => {
            for e in index.entries() {
                if args.stage {
                    println!("{:06o} {} {}\t{}", e.mode.bits(), e.id, e.stage().number(), e.path_string());
                } else {
                    println!("{}", e.path_string());
                }
            }
        }
    }
    Ok(())
}
