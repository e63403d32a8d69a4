use std::{fs::File, io::BufReader, net::TcpListener, path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use pixeltower::{
    Dispatcher, DrawRequest, MemoryStrip, PngStrip, RenderConfig, RenderLoop, serve,
};

#[derive(Parser, Debug)]
#[command(name = "pixeltower", version)]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the drawing server and render loop.
    Serve(ServeArgs),
    /// Replay a request script and write the composite as a PNG.
    Script(ScriptArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Listen address for drawing streams.
    #[arg(long, default_value = "127.0.0.1:7600")]
    listen: String,

    /// Scroll cadence in milliseconds (one column per tick, 30..=100).
    #[arg(long, default_value_t = 60)]
    tick_ms: u64,

    /// Output sink: "null", or "png:<path>" to mirror renders into a PNG.
    #[arg(long, default_value = "null")]
    output: String,
}

#[derive(Parser, Debug)]
struct ScriptArgs {
    /// Input JSON array of draw requests.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_log(cli.log_level)?;
    match cli.cmd {
        Command::Serve(args) => cmd_serve(args),
        Command::Script(args) => cmd_script(args),
    }
}

fn init_log(level: LevelFilter) -> anyhow::Result<()> {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S)} {l} {t} {m}{n}",
        )))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .context("assemble log config")?;
    log4rs::init_config(config).context("install logger")?;
    Ok(())
}

fn render_config(tick_ms: u64) -> RenderConfig {
    let clamped = tick_ms.clamp(30, 100);
    if clamped != tick_ms {
        log::warn!("tick of {tick_ms} ms is outside 30..=100, using {clamped} ms");
    }
    RenderConfig {
        tick: Duration::from_millis(clamped),
        ..RenderConfig::default()
    }
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = render_config(args.tick_ms);
    let render = match parse_output(&args.output)? {
        Output::Null => RenderLoop::spawn(MemoryStrip::new(), config)?,
        Output::Png(path) => RenderLoop::spawn(PngStrip::new(path), config)?,
    };
    let dispatcher = Dispatcher::new(render.sender());

    let listener = TcpListener::bind(&args.listen)
        .with_context(|| format!("bind '{}'", args.listen))?;
    log::info!("pixeltower listening on {}", listener.local_addr()?);
    serve(listener, dispatcher)?;
    Ok(())
}

enum Output {
    Null,
    Png(PathBuf),
}

fn parse_output(spec: &str) -> anyhow::Result<Output> {
    if spec == "null" {
        return Ok(Output::Null);
    }
    if let Some(path) = spec.strip_prefix("png:") {
        return Ok(Output::Png(PathBuf::from(path)));
    }
    anyhow::bail!("unknown output '{spec}' (expected \"null\" or \"png:<path>\")");
}

fn cmd_script(args: ScriptArgs) -> anyhow::Result<()> {
    let file = File::open(&args.in_path)
        .with_context(|| format!("open script '{}'", args.in_path.display()))?;
    let requests: Vec<DrawRequest> =
        serde_json::from_reader(BufReader::new(file)).context("parse request script")?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let render = RenderLoop::spawn(PngStrip::new(&args.out), RenderConfig::default())?;
    let mut dispatcher = Dispatcher::new(render.sender());
    let response = dispatcher.run_stream(requests.into_iter().map(Ok))?;
    drop(dispatcher);
    render.shutdown();

    if !response.is_ok() {
        anyhow::bail!("script failed: {}", response.message);
    }
    eprintln!("wrote {}", args.out.display());
    Ok(())
}
