use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use upscale_bridge::sim::SimHost;
use upscale_bridge::{Extent, FrameOutcome, PipelineStats, TeardownReport, UpscaleSettings};

#[derive(Parser, Debug)]
#[command(name = "upscale-bridge", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive the pipeline against the in-memory host and print a JSON report.
    Simulate(SimulateArgs),
    /// Print the default settings as JSON.
    Config,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    /// Number of frames to run.
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// Native width in pixels.
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Native height in pixels.
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Settings JSON. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Change the native resolution at a frame, e.g. `30:1280x720`.
    #[arg(long, value_parser = parse_resize)]
    resize_at: Vec<(u64, Extent)>,

    /// Frames for which the engine provides no source buffer.
    #[arg(long)]
    drop_source_at: Vec<u64>,

    /// Also write the report to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(serde::Serialize, Debug)]
struct SimReport {
    settings: UpscaleSettings,
    frames: u64,
    last_render_extent: Extent,
    last_intermediate_extent: Option<Extent>,
    last_outcome: Option<FrameOutcome>,
    stats: PipelineStats,
    native_calls: usize,
    leaked_targets: usize,
    teardown: TeardownReport,
}

fn parse_resize(s: &str) -> Result<(u64, Extent), String> {
    let (frame, size) = s
        .split_once(':')
        .ok_or_else(|| format!("expected FRAME:WxH, got '{s}'"))?;
    let (w, h) = size
        .split_once('x')
        .ok_or_else(|| format!("expected WxH, got '{size}'"))?;
    let frame = frame.parse().map_err(|e| format!("frame '{frame}': {e}"))?;
    let w = w.parse().map_err(|e| format!("width '{w}': {e}"))?;
    let h = h.parse().map_err(|e| format!("height '{h}': {e}"))?;
    Ok((frame, Extent::new(w, h)))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Simulate(args) => cmd_simulate(args),
        Command::Config => {
            println!("{}", UpscaleSettings::default().to_json_pretty()?);
            Ok(())
        }
    }
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    let settings = match &args.config {
        Some(path) => UpscaleSettings::from_json_path(path)
            .with_context(|| format!("load settings '{}'", path.display()))?,
        None => UpscaleSettings::default(),
    };

    let host = SimHost::new();
    let mut pipeline =
        upscale_bridge::UpscalePipeline::new(settings.clone(), host.device(), host.backend())
            .context("initialize upscale pipeline")?;

    let mut base = Extent::new(args.width, args.height);
    let mut camera = host.camera();
    let mut last_render_extent = Extent::default();
    let mut last_intermediate_extent = None;
    let mut last_outcome = None;

    for frame in 0..args.frames {
        if let Some((_, size)) = args.resize_at.iter().find(|(at, _)| *at == frame) {
            base = *size;
        }

        let mut cmd = host.command_stream();
        let mut ctx = pipeline
            .begin_frame(base, &mut camera)
            .with_context(|| format!("set up frame {frame}"))?;

        last_render_extent = camera.render_extent(base);
        last_intermediate_extent = ctx.intermediate_extent();

        let source = host.source(last_render_extent);
        let source = (!args.drop_source_at.contains(&frame)).then_some(&source);
        last_outcome = Some(ctx.execute(&mut cmd, source));
    }

    let stats = pipeline.stats();
    let teardown = pipeline.teardown();

    let (native_calls, leaked_targets) = {
        let ledger = host.ledger();
        (ledger.native_calls().len(), ledger.live_targets.len())
    };

    let report = SimReport {
        settings,
        frames: args.frames,
        last_render_extent,
        last_intermediate_extent,
        last_outcome,
        stats,
        native_calls,
        leaked_targets,
        teardown,
    };

    let json = serde_json::to_string_pretty(&report).context("serialize report")?;
    if let Some(path) = &args.report {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create report dir '{}'", parent.display()))?;
        }
        std::fs::write(path, &json)
            .with_context(|| format!("write report '{}'", path.display()))?;
    }
    println!("{json}");
    Ok(())
}
