use clap::Parser;
use levelsave::cli::{Cli, Command};
use levelsave::config::Config;
use levelsave::report;
use levelsave::store::{RestoreReport, SnapshotStore};
use levelsave::util;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so `list --json` stays clean. RUST_LOG wins over --verbose.
fn init_logging(verbose: bool) {
    let default = if verbose { "levelsave=debug" } else { "levelsave=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

fn print_plan(plan: &RestoreReport, config: &Config) {
    println!("Snapshot {} '{}' would overwrite:", plan.id, plan.label);
    if plan.restored.is_empty() {
        println!("  (nothing, the snapshot has no files)");
    }
    for name in &plan.restored {
        let live = config.live_dir.join(name);
        let state = if live.exists() { "replaced" } else { "created" };
        println!("  {} ({state})", live.display());
    }
    for name in &plan.untouched {
        println!("  {name}: not in snapshot, left as is");
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let config = Config::from_global_args(&cli.global).unwrap_or_else(|e| fail(e));
    let mut store = SnapshotStore::open(config.layout()).unwrap_or_else(|e| fail(e));

    match cli.command {
        Command::Backup(args) => {
            let record = store.backup(&args.label).unwrap_or_else(|e| fail(e));
            if record.files.is_empty() {
                eprintln!(
                    "warning: none of {} exist in {}, snapshot recorded without files",
                    config.tracked_files.join(", "),
                    config.live_dir.display()
                );
            }
            println!(
                "Created snapshot {} '{}' ({} file(s), {})",
                record.id,
                record.label,
                record.files.len(),
                util::format_bytes(record.size_bytes)
            );
        }
        Command::List(args) => {
            report::print_list(&store.list(), args.json);
        }
        Command::Load(args) => {
            let selector = args.target.selector();
            if args.is_dry_run() {
                match store.plan_load(selector) {
                    Some(plan) => {
                        print_plan(&plan, &config);
                        println!(
                            "\nrestoring does not keep a copy of the current files; \
                             run `levelsave backup <label>` first if you need them, \
                             then re-run with --yes"
                        );
                    }
                    None => println!("No snapshot matches {selector}."),
                }
                return;
            }

            match store.load(selector) {
                Ok(Some(report)) => {
                    println!(
                        "Restored snapshot {} '{}': {}",
                        report.id,
                        report.label,
                        if report.restored.is_empty() {
                            "no files in snapshot".to_string()
                        } else {
                            report.restored.join(", ")
                        }
                    );
                }
                Ok(None) => println!("No snapshot matches {selector}, nothing restored."),
                Err(e) => fail(e),
            }
        }
        Command::Delete(args) => {
            let selector = args.selector();
            match store.delete(selector) {
                Ok(Some(record)) => println!(
                    "Deleted snapshot {} '{}' ({} file(s))",
                    record.id,
                    record.label,
                    record.files.len()
                ),
                Ok(None) => println!("No snapshot matches {selector}, nothing deleted."),
                Err(e) => fail(e),
            }
        }
        Command::Export(args) => {
            let report = store
                .export(args.target.selector(), &args.output)
                .unwrap_or_else(|e| fail(e));
            println!(
                "Exported snapshot {} to {} ({})",
                report.id,
                report.archive.display(),
                if report.files.is_empty() {
                    "empty archive".to_string()
                } else {
                    report.files.join(", ")
                }
            );
        }
        Command::Import(args) => {
            let record = store.import(&args.archive).unwrap_or_else(|e| fail(e));
            println!(
                "Imported {} as snapshot {} '{}' ({})",
                args.archive.display(),
                record.id,
                record.label,
                record.files.join(", ")
            );
        }
        Command::Orphans => {
            let orphans = store.orphans().unwrap_or_else(|e| fail(e));
            if orphans.is_empty() {
                println!("No orphaned backup files.");
            } else {
                for path in &orphans {
                    println!("{}", path.display());
                }
                println!("\n{} file(s) not referenced by the index", orphans.len());
            }
        }
    }
}
