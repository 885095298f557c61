use clap::Parser;
use miette::Result;
use grc::cli::commands;
use grc::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Reset SIGPIPE so piping into `head` or `grep -q` exits quietly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_tracing(global.quiet, global.verbose)?;

    match cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Seed(args) => commands::seed::run(args, &global),
        Commands::Framework(cmd) => commands::framework::run(cmd, &global),
        Commands::Control(cmd) => commands::control::run(cmd, &global),
        Commands::Task(cmd) => commands::task::run(cmd, &global),
        Commands::Board(cmd) => commands::board::run(cmd, &global),
        Commands::Risk(cmd) => commands::risk::run(cmd, &global),
        Commands::Capa(cmd) => commands::capa::run(cmd, &global),
        Commands::Training(cmd) => commands::training::run(cmd, &global),
        Commands::Member(cmd) => commands::member::run(cmd, &global),
        Commands::Snapshot(cmd) => commands::snapshot::run(cmd, &global),
        Commands::Status(args) => commands::status::run(args, &global),
        Commands::Report(cmd) => commands::report::run(cmd, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}

/// Log to stderr. `GRC_LOG` overrides the level picked from -q / -v.
fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("GRC_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| miette::miette!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
