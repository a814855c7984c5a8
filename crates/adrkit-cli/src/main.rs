mod version;

use std::path::{Path, PathBuf};

use adrkit_core::checker::CheckReport;
use adrkit_core::config::{find_config_root, AdrConfig, SETTING_ADR_ONLY_REPO};
use adrkit_core::file_ops::GitFileOps;
use adrkit_core::filename::{slugify, title_lowercase};
use adrkit_core::lifecycle::{AdrEngine, LifecycleError, SyncOutcome};
use adrkit_core::record::{read_record, STATUS_ACCEPTED, STATUS_REJECTED};
use adrkit_core::review::{branch_title, ReviewWorkflow};
use anyhow::{bail, Context as _, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(
    name = "adr",
    version = version::FULL,
    about = "Manage Architecture Decision Records kept as Markdown files",
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: closest ancestor holding `.adr`, else the current directory)
    #[arg(long, global = true, env = "ADR_ROOT")]
    root: Option<PathBuf>,

    /// Stage every change in git and work on review branches
    #[arg(long, global = true)]
    git: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More logs (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Initialise the records directory with a template and two seed records
    Init {
        /// Erase an existing records directory first
        #[arg(short, long)]
        force: bool,
        /// Repository only holds records; changes commit prefixes to `feat(adr):`
        #[arg(short, long)]
        adr_only_repo: bool,
    },
    /// Create a new proposed record from the template
    New {
        /// Words of the title
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Propose a new record (same as `new`)
    Propose {
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Accept the proposed record: assign an id, update status, date and filename
    Accept {
        /// Regenerate the table of content afterwards
        #[arg(short, long)]
        toc: bool,
        /// Commit the reviewed record (implies --git)
        #[arg(short, long)]
        commit: bool,
    },
    /// Reject the proposed record: assign an id, update status, date and filename
    Reject {
        #[arg(short, long)]
        toc: bool,
        #[arg(short, long)]
        commit: bool,
    },
    /// Set the status of a reviewed record (e.g. deprecated, superseding)
    Status { file: PathBuf, status: String },
    /// Generate the table of content of the records
    #[command(alias = "toc")]
    GenerateToc,
    /// Verify ids, content format and filenames of every record
    CheckRepo {
        /// Also fail when a proposed record is present
        #[arg(long)]
        no_proposed: bool,
    },
    /// Read or change settings stored in `.adr`
    Config {
        setting: Option<String>,
        value: Option<String>,
        #[arg(short, long)]
        list: bool,
        #[arg(short, long)]
        unset: bool,
    },
    /// Helpers printing or syncing things derived from a record
    Helper {
        #[command(subcommand)]
        command: HelperCommand,
    },
    /// Commit a staged record with its conventional message
    Commit { file: PathBuf },
    /// Checks to run before merging a review branch
    PreMergeChecks,
    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum HelperCommand {
    /// Print the record's title in slug format
    Slug { file: PathBuf },
    /// Print the record's title in lowercase
    Lowercase { file: PathBuf },
    /// Rename the record so its filename matches its title
    SyncFilename { file: PathBuf },
    /// Print the commit message of the record
    CommitMessage { file: PathBuf },
    /// Print the review branch title of the record
    BranchTitle { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

struct Context {
    config: AdrConfig,
    git: bool,
    json: bool,
}

impl Context {
    fn engine(&self) -> Result<AdrEngine> {
        if self.git {
            let ops = GitFileOps::open(self.config.root())?;
            Ok(AdrEngine::new(&self.config, Box::new(ops)))
        } else {
            Ok(AdrEngine::plain(&self.config))
        }
    }

    fn workflow(&self) -> Result<ReviewWorkflow> {
        Ok(ReviewWorkflow::open(&self.config)?)
    }
}

fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("current directory")?;
    let root = match explicit {
        Some(path) => cwd.join(path),
        None => find_config_root(&cwd).unwrap_or(cwd),
    };
    root.canonicalize()
        .with_context(|| format!("root directory {}", root.display()))
}

fn resolve_file(file: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("current directory")?;
    let path = cwd.join(file);
    path.canonicalize()
        .with_context(|| format!("record {}", path.display()))
}

fn print_path(ctx: &Context, label: &str, path: &Path) {
    if ctx.json {
        let mut object = serde_json::Map::new();
        object.insert(label.to_string(), json!(path));
        println!("{}", serde_json::Value::Object(object));
    } else {
        println!("{}", path.display());
    }
}

fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };
    let root = resolve_root(cli.root.as_deref())?;
    let config = AdrConfig::load(&root)?;
    let mut ctx = Context {
        config,
        git: cli.git,
        json: cli.json,
    };

    match command {
        Command::Init {
            force,
            adr_only_repo,
        } => {
            if adr_only_repo {
                ctx.config.set(SETTING_ADR_ONLY_REPO, "true")?;
                ctx.config.persist()?;
            }
            let created = if ctx.git {
                ctx.workflow()?.git_init(force)?
            } else {
                ctx.engine()?.init_repo(force)?
            };
            if ctx.json {
                println!("{}", json!({ "created": created }));
            } else {
                for path in &created {
                    println!("{}", path.display());
                }
            }
        }
        Command::New { words } | Command::Propose { words } => {
            let title = words.join(" ");
            if ctx.git {
                let review = ctx.workflow()?.git_new(&title)?;
                if ctx.json {
                    println!(
                        "{}",
                        json!({ "path": review.path, "branch": review.branch })
                    );
                } else {
                    println!("{}", review.path.display());
                    println!("branch: {}", review.branch);
                }
            } else {
                let path = ctx.engine()?.new_adr(&title)?;
                print_path(&ctx, "path", &path);
            }
        }
        Command::Accept { toc, commit } => review(&mut ctx, STATUS_ACCEPTED, toc, commit)?,
        Command::Reject { toc, commit } => review(&mut ctx, STATUS_REJECTED, toc, commit)?,
        Command::Status { file, status } => {
            let path = ctx.engine()?.set_status(&resolve_file(&file)?, &status)?;
            print_path(&ctx, "path", &path);
        }
        Command::GenerateToc => {
            let path = ctx.engine()?.generate_toc()?;
            print_path(&ctx, "toc", &path);
        }
        Command::CheckRepo { no_proposed } => {
            let report = ctx.engine()?.check_report(no_proposed)?;
            print_report(&ctx, &report)?;
            if !report.is_ok() {
                bail!(LifecycleError::RepoCheckFailed(report.messages()));
            }
        }
        Command::Config {
            setting,
            value,
            list,
            unset,
        } => configure(&mut ctx, setting, value, list, unset)?,
        Command::Helper { command } => helper(&ctx, command)?,
        Command::Commit { file } => {
            let message = ctx.workflow()?.commit_record(&resolve_file(&file)?)?;
            if ctx.json {
                println!("{}", json!({ "message": message }));
            } else {
                println!("{}", message);
            }
        }
        Command::PreMergeChecks => {
            let workflow = ctx.workflow()?;
            let report = workflow.engine().check_report(true)?;
            print_report(&ctx, &report)?;
            workflow.pre_merge_checks()?;
        }
        Command::Version => println!("adr {}", version::FULL),
    }
    Ok(())
}

fn review(ctx: &mut Context, status: &str, toc: bool, commit: bool) -> Result<()> {
    ctx.git = ctx.git || commit;
    let reviewed = if commit {
        let workflow = ctx.workflow()?;
        let reviewed = workflow.engine().accept_or_reject(status, toc)?;
        let message = workflow.commit_record(&reviewed.path)?;
        tracing::info!(message = %message, "reviewed record committed");
        reviewed
    } else {
        ctx.engine()?.accept_or_reject(status, toc)?
    };
    if ctx.json {
        println!(
            "{}",
            json!({
                "path": reviewed.path,
                "id": reviewed.id,
                "status": reviewed.status,
                "toc": reviewed.toc,
            })
        );
    } else {
        println!("{}", reviewed.path.display());
        if let Some(toc) = &reviewed.toc {
            println!("{}", toc.display());
        }
    }
    Ok(())
}

fn print_report(ctx: &Context, report: &CheckReport) -> Result<()> {
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for message in report.messages() {
        println!("{}", message);
    }
    if report.is_ok() {
        println!("All checks passed ({} records)", report.records);
    }
    Ok(())
}

fn configure(
    ctx: &mut Context,
    setting: Option<String>,
    value: Option<String>,
    list: bool,
    unset: bool,
) -> Result<()> {
    if list {
        let values = ctx.config.list();
        if ctx.json {
            println!("{}", serde_json::to_string_pretty(&values)?);
        } else {
            for (key, value) in values {
                println!("{} = {}", key, value);
            }
        }
        return Ok(());
    }
    let Some(setting) = setting else {
        bail!("Not enough arguments (missing: \"setting\")");
    };
    if unset {
        ctx.config.unset(&setting)?;
        ctx.config.persist()?;
        println!("{} unset", setting);
        return Ok(());
    }
    if let Some(value) = value {
        ctx.config.set(&setting, &value)?;
        ctx.config.persist()?;
    }
    let current = ctx.config.get(&setting)?;
    if ctx.json {
        let mut object = serde_json::Map::new();
        object.insert(setting, json!(current));
        println!("{}", serde_json::Value::Object(object));
    } else {
        println!("{} = {}", setting, current);
    }
    Ok(())
}

fn helper(ctx: &Context, command: HelperCommand) -> Result<()> {
    let output = match command {
        HelperCommand::Slug { file } => slugify(&read_record(&resolve_file(&file)?)?.title),
        HelperCommand::Lowercase { file } => {
            title_lowercase(&read_record(&resolve_file(&file)?)?.title)
        }
        HelperCommand::SyncFilename { file } => {
            match ctx.engine()?.sync_filename(&resolve_file(&file)?)? {
                SyncOutcome::Renamed { from, to } => {
                    format!("{} -> {}", from.display(), to.display())
                }
                SyncOutcome::AlreadyUpToDate(path) => {
                    format!("{} already up to date", path.display())
                }
            }
        }
        HelperCommand::CommitMessage { file } => {
            ctx.workflow()?.commit_message(&resolve_file(&file)?)?
        }
        HelperCommand::BranchTitle { file } => branch_title(&resolve_file(&file)?)?,
    };
    if ctx.json {
        println!("{}", json!({ "value": output }));
    } else {
        println!("{}", output);
    }
    Ok(())
}
