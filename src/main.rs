use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use duocert::export::ArtifactFormat;
use duocert::lookup::{LookupEndpoint, UPSTREAM_BASE};
use duocert::platform::DirectorySink;
use duocert::{Config, SessionState, Viewport};

/// duocert - turn public Duolingo statistics into an achievement certificate
#[derive(Parser, Debug)]
#[command(name = "duocert", version, about, long_about = None)]
struct Cli {
    /// Duolingo username to look up
    username: String,

    /// Artifact(s) to write
    #[arg(short, long, value_enum, default_value_t = FormatArg::Png)]
    format: FormatArg,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Viewport width the certificate is laid out for
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Lookup base URL (a same-origin proxy unless --upstream is given)
    #[arg(long)]
    endpoint: Option<String>,

    /// Treat --endpoint as the upstream API instead of a proxy
    #[arg(long)]
    upstream: bool,

    /// Device pixels per CSS pixel
    #[arg(long, default_value_t = 2.0)]
    scale: f32,

    /// Margin around the certificate in CSS pixels
    #[arg(long, default_value_t = 100)]
    bleed: u32,

    /// Extra font directory (repeatable)
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,

    /// Do not load system fonts
    #[arg(long)]
    no_system_fonts: bool,

    /// Do not fetch the avatar
    #[arg(long)]
    no_avatar: bool,

    /// HTTP timeout in milliseconds
    #[arg(long, default_value_t = 15000)]
    timeout_ms: u64,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Png,
    Pdf,
    Both,
}

impl FormatArg {
    fn formats(self) -> Vec<ArtifactFormat> {
        match self {
            FormatArg::Png => vec![ArtifactFormat::Png],
            FormatArg::Pdf => vec![ArtifactFormat::Pdf],
            FormatArg::Both => vec![ArtifactFormat::Png, ArtifactFormat::Pdf],
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn config_from(cli: &Cli) -> Config {
    let mut config = Config::default();
    config.endpoint = match (&cli.endpoint, cli.upstream) {
        (Some(base), false) => LookupEndpoint::Proxy { base: base.clone() },
        (Some(base), true) => LookupEndpoint::Upstream { base: base.clone() },
        (None, _) => LookupEndpoint::Upstream {
            base: UPSTREAM_BASE.to_string(),
        },
    };
    config.timeout_ms = cli.timeout_ms;
    config.viewport = Viewport {
        width: cli.width,
        ..Viewport::default()
    };
    config.export.scale = cli.scale;
    config.export.bleed = cli.bleed;
    config.output_dir = cli.out.clone();
    config.fonts.load_system = !cli.no_system_fonts;
    config.fonts.dirs = cli.font_dirs.clone();
    config.load_avatar = !cli.no_avatar;
    config
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config_from(&cli);
    let sink = DirectorySink::new(&config.output_dir);
    let mut session = duocert::new_session(config).context("invalid configuration")?;

    match session.submit(&cli.username).await {
        SessionState::Loaded { .. } => {}
        SessionState::NotFound { username } => bail!("no user found with username {:?}", username),
        SessionState::Failed { message } => bail!("{}", message),
        SessionState::Idle | SessionState::Loading { .. } => bail!("please enter a username"),
    }

    for format in cli.format.formats() {
        let saved = session
            .export(format, &sink)
            .await
            .with_context(|| format!("{} export failed", format.extension()))?;
        println!("{}", saved.location);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
