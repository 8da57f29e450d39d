use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "skyplot", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a command script and write the canvas as a PNG.
    Run(RunArgs),
    /// Plot a single image, optionally reprojected onto a canvas WCS.
    Image(ImageArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Command script, one command per line.
    #[arg(long)]
    script: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Initial canvas size, `WxH` (scripts may change it with `plot_size`).
    #[arg(long, default_value = "512x512", value_parser = parse_size)]
    size: (u32, u32),

    /// Write per-layer compositing reports as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ImageArgs {
    /// Input image (png, jpg or ppm).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Image format; guessed from the file extension when omitted.
    #[arg(long)]
    format: Option<String>,

    /// WCS header of the input image.
    #[arg(long)]
    image_wcs: Option<PathBuf>,

    /// WCS header of the output canvas.
    #[arg(long)]
    plot_wcs: Option<PathBuf>,

    /// Canvas size `WxH`; defaults to the image size.
    #[arg(long, value_parser = parse_size)]
    size: Option<(u32, u32)>,

    /// Lattice spacing in image pixels.
    #[arg(long)]
    grid: Option<u32>,

    /// Skip the quad outline pass.
    #[arg(long)]
    no_debug_grid: bool,

    /// Background color `r,g,b[,a]`.
    #[arg(long)]
    bg: Option<String>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Write the compositing report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let w = w.trim().parse().map_err(|_| format!("bad width in '{s}'"))?;
    let h = h.trim().parse().map_err(|_| format!("bad height in '{s}'"))?;
    Ok((w, h))
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Image(args) => cmd_image(args),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let script = std::fs::read_to_string(&args.script)
        .with_context(|| format!("read script '{}'", args.script.display()))?;

    let (w, h) = args.size;
    let mut session = skyplot::PlotSession::new(skyplot::Canvas::new(w, h)?);
    session
        .run_script(&script)
        .with_context(|| format!("run script '{}'", args.script.display()))?;

    finish(session, &args.out, args.report.as_deref())
}

fn cmd_image(args: ImageArgs) -> anyhow::Result<()> {
    let format = match &args.format {
        Some(f) => f.clone(),
        None => args
            .in_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_owned)
            .with_context(|| {
                format!(
                    "cannot guess the format of '{}', pass --format",
                    args.in_path.display()
                )
            })?,
    };

    let mut commands = vec![
        format!("image_file {}", args.in_path.display()),
        format!("image_format {format}"),
    ];
    if let Some(grid) = args.grid {
        commands.push(format!("image_grid {grid}"));
    }
    if args.no_debug_grid {
        commands.push("image_debug_grid off".to_owned());
    }
    if let Some(wcs) = &args.image_wcs {
        commands.push(format!("image_wcs {}", wcs.display()));
    }
    if let Some(wcs) = &args.plot_wcs {
        commands.push(format!("plot_wcs {}", wcs.display()));
    }
    match args.size {
        Some((w, h)) => commands.push(format!("plot_size {w} {h}")),
        None => commands.push("image_setsize".to_owned()),
    }
    if let Some(bg) = &args.bg {
        commands.push(format!("plot_bg {}", bg.replace(',', " ")));
    }
    commands.push("plot image".to_owned());

    // Placeholder size; `image_setsize` or `plot_size` replaces it before the plot.
    let mut session = skyplot::PlotSession::new(skyplot::Canvas::new(1, 1)?);
    for cmd in &commands {
        session
            .command(cmd)
            .with_context(|| format!("command '{cmd}'"))?;
    }

    finish(session, &args.out, args.report.as_deref())
}

fn finish(
    session: skyplot::PlotSession,
    out: &Path,
    report: Option<&Path>,
) -> anyhow::Result<()> {
    if let Some(report_path) = report {
        let f = std::fs::File::create(report_path)
            .with_context(|| format!("create report '{}'", report_path.display()))?;
        serde_json::to_writer_pretty(f, session.reports())
            .with_context(|| "write report JSON")?;
    }

    let frame = session.finish()?.into_straight();

    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    image::save_buffer_with_format(
        out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))?;

    eprintln!("wrote {}", out.display());
    Ok(())
}
