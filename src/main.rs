use argh::FromArgs;
use fsh::Interpreter;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

#[derive(FromArgs)]
/// Interactive filesystem shell.
struct Args {
    #[argh(option, default = "String::from(\"warn\")")]
    /// log filter directive for diagnostics on stderr, e.g. `debug` or `fsh=trace`.
    /// The FSH_LOG environment variable takes precedence.
    log: String,

    #[argh(switch)]
    /// print the version and exit.
    version: bool,
}

fn init_logging(directive: &str) {
    let filter = EnvFilter::try_from_env("FSH_LOG").unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    if args.version {
        println!("fsh {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    init_logging(&args.log);

    let mut shell = Interpreter::default();
    if std::io::stdin().is_terminal() {
        shell.repl()?;
    } else {
        shell.repl_from(std::io::stdin().lock(), std::io::stdout())?;
    }
    Ok(())
}
