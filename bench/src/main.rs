use std::time::{Duration, Instant};

use anyhow::Context as _;
use serde_json::json;

#[derive(Clone, Debug)]
struct BenchArgs {
    size: u32,
    spacings: Vec<u32>,
    warmup: u32,
    repeats: u32,
    rotation_deg: f64,
    sip: f64,
    json: bool,
}

#[derive(Clone, Debug, Default)]
struct RunMetrics {
    lattice_build: Duration,
    composite: Duration,
    rasterize: Duration,
    wall_total: Duration,
}

#[derive(Clone, Debug, Default)]
struct SeamStats {
    quads: usize,
    painted: usize,
    max_closing_px: f64,
    mean_closing_px: f64,
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> anyhow::Result<()> {
    let args = parse_args()?;

    if args.size == 0 {
        anyhow::bail!("--size must be > 0");
    }
    if args.spacings.is_empty() {
        anyhow::bail!("--spacings must name at least one spacing");
    }

    let image = checkerboard(args.size, 16)?;
    let (src, dst) = projections(&args)?;

    eprintln!(
        "bench: {repeats} run(s) ({profile} build), {size}x{size} image, rotation={rot}deg, sip={sip:e}",
        repeats = args.repeats,
        profile = if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
        size = args.size,
        rot = args.rotation_deg,
        sip = args.sip,
    );

    let mut summary = Vec::new();
    for &spacing in &args.spacings {
        let spacing = skyplot::GridSpacing::new(spacing)?;

        for _ in 0..args.warmup {
            let _ = run_once(&args, &image, &src, &dst, spacing)?;
        }
        let mut runs = Vec::<RunMetrics>::with_capacity(args.repeats as usize);
        for _ in 0..args.repeats {
            runs.push(run_once(&args, &image, &src, &dst, spacing)?);
        }

        let seams = seam_stats(&args, spacing, &src, &dst);
        eprintln!(
            "\nspacing {s}: {quads} quads, {painted} painted, closing error max={max:.4}px mean={mean:.4}px",
            s = spacing.get(),
            quads = seams.quads,
            painted = seams.painted,
            max = seams.max_closing_px,
            mean = seams.mean_closing_px,
        );
        report_percentiles(&runs);

        summary.push(json!({
            "spacing": spacing.get(),
            "quads": seams.quads,
            "painted": seams.painted,
            "max_closing_px": seams.max_closing_px,
            "mean_closing_px": seams.mean_closing_px,
            "p50_wall_ms": p(&collect(&runs, |m| m.wall_total), 0.50).as_secs_f64() * 1000.0,
        }));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}

fn parse_args() -> anyhow::Result<BenchArgs> {
    let mut args = std::env::args().skip(1);

    let mut out = BenchArgs {
        size: 1024,
        spacings: vec![10, 25, 50, 100, 200],
        warmup: 1,
        repeats: 20,
        rotation_deg: 20.0,
        sip: 2.0e-6,
        json: false,
    };

    while let Some(a) = args.next() {
        match a.as_str() {
            "--size" => out.size = parse_u32(args.next(), "--size")?,
            "--warmup" => out.warmup = parse_u32(args.next(), "--warmup")?,
            "--repeats" => out.repeats = parse_u32(args.next(), "--repeats")?,
            "--rotation" => out.rotation_deg = parse_f64(args.next(), "--rotation")?,
            "--sip" => out.sip = parse_f64(args.next(), "--sip")?,
            "--spacings" => {
                let v = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("missing value for --spacings (e.g. 10,50)"))?;
                out.spacings = v
                    .split(',')
                    .map(|s| {
                        s.trim()
                            .parse::<u32>()
                            .with_context(|| format!("parse --spacings entry '{s}'"))
                    })
                    .collect::<anyhow::Result<_>>()?;
            }
            "--json" => out.json = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => anyhow::bail!("unknown arg '{a}' (try --help)"),
        }
    }

    Ok(out)
}

fn print_help() {
    eprintln!(
        r#"skyplot-bench

Warps a synthetic image through a rotated, SIP-distorted WCS at several
lattice spacings and reports timings plus how far each quad's affine misses
its fourth corner.

Usage:
  cargo run -q --release
  cargo run -q --release -- --size 2048 --spacings 5,10,20 --json

Args:
  --size N          (default 1024; image and canvas are N x N)
  --spacings A,B,.. (default 10,25,50,100,200)
  --warmup N        (default 1)
  --repeats N       (default 20)
  --rotation DEG    (default 20; canvas WCS rotation relative to the image)
  --sip C           (default 2e-6; A_2_0 / B_0_2 coefficient on the image WCS)
  --json            print a JSON summary on stdout
"#
    );
}

fn parse_u32(v: Option<String>, flag: &str) -> anyhow::Result<u32> {
    let v = v.ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))?;
    v.parse::<u32>()
        .with_context(|| format!("parse {flag} value '{v}'"))
}

fn parse_f64(v: Option<String>, flag: &str) -> anyhow::Result<f64> {
    let v = v.ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))?;
    v.parse::<f64>()
        .with_context(|| format!("parse {flag} value '{v}'"))
}

fn checkerboard(size: u32, cell: u32) -> anyhow::Result<skyplot::RasterImage> {
    let mut bytes = Vec::with_capacity(size as usize * size as usize * 4);
    for y in 0..size {
        for x in 0..size {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            bytes.extend_from_slice(if on {
                &[230, 230, 230, 255]
            } else {
                &[40, 60, 120, 255]
            });
        }
    }
    Ok(skyplot::RasterImage::from_premul(size, size, bytes)?)
}

fn projections(args: &BenchArgs) -> anyhow::Result<(skyplot::TanWcs, skyplot::TanWcs)> {
    let center = f64::from(args.size) / 2.0;
    let scale = 0.5 / f64::from(args.size);
    let crval = skyplot::SkyCoord::new(83.8, -5.4);

    let src = skyplot::TanWcs::new(
        crval,
        skyplot::Point::new(center, center),
        [[-scale, 0.0], [0.0, scale]],
    )?
    .with_sip(skyplot::Sip {
        a: skyplot::SipPolynomial::new(vec![(2, 0, args.sip)]),
        b: skyplot::SipPolynomial::new(vec![(0, 2, args.sip)]),
        ap: None,
        bp: None,
    });

    let (sin, cos) = args.rotation_deg.to_radians().sin_cos();
    let dst = skyplot::TanWcs::new(
        crval,
        skyplot::Point::new(center, center),
        [
            [-scale * cos, scale * sin],
            [scale * sin, scale * cos],
        ],
    )?;
    Ok((src, dst))
}

fn run_once(
    args: &BenchArgs,
    image: &skyplot::RasterImage,
    src: &skyplot::TanWcs,
    dst: &skyplot::TanWcs,
    spacing: skyplot::GridSpacing,
) -> anyhow::Result<RunMetrics> {
    let wall = Instant::now();
    let mut m = RunMetrics::default();

    let t0 = Instant::now();
    let lattice = skyplot::Lattice::build(args.size, args.size, spacing, src, dst);
    m.lattice_build = t0.elapsed();

    let mut surface = skyplot::CpuSurface::new(skyplot::CpuSurfaceOpts {
        canvas: skyplot::Canvas::new(args.size, args.size)?,
        background: skyplot::Rgba8::new(0, 0, 0, 255),
    })?;

    let t1 = Instant::now();
    skyplot::composite_warped(&mut surface, image, &lattice, &skyplot::WarpOpts::default())?;
    m.composite = t1.elapsed();

    let t2 = Instant::now();
    let frame = surface.finish();
    m.rasterize = t2.elapsed();
    std::hint::black_box(frame);

    m.wall_total = wall.elapsed();
    Ok(m)
}

fn seam_stats(
    args: &BenchArgs,
    spacing: skyplot::GridSpacing,
    src: &skyplot::TanWcs,
    dst: &skyplot::TanWcs,
) -> SeamStats {
    let lattice = skyplot::Lattice::build(args.size, args.size, spacing, src, dst);
    let mut stats = SeamStats {
        quads: lattice.quad_count(),
        ..SeamStats::default()
    };
    let mut sum = 0.0;
    for quad in lattice.quads() {
        let Some(target) = quad.target else {
            continue;
        };
        let Ok(affine) = skyplot::solve_quad(&quad.source, &target) else {
            continue;
        };
        // Index 3 is the `bb` corner, the one the affine does not fit.
        let err = affine.closing_error(quad.source[3], target[3]);
        stats.painted += 1;
        stats.max_closing_px = stats.max_closing_px.max(err);
        sum += err;
    }
    if stats.painted > 0 {
        stats.mean_closing_px = sum / stats.painted as f64;
    }
    stats
}

fn collect(runs: &[RunMetrics], f: fn(&RunMetrics) -> Duration) -> Vec<Duration> {
    let mut v = runs.iter().map(f).collect::<Vec<_>>();
    v.sort_by_key(|d| d.as_nanos());
    v
}

fn p(v: &[Duration], p: f64) -> Duration {
    if v.is_empty() {
        return Duration::ZERO;
    }
    let n = v.len();
    let rank = (p * (n as f64)).ceil().clamp(1.0, n as f64) as usize;
    v[rank - 1]
}

fn report_percentiles(runs: &[RunMetrics]) {
    type Getter = fn(&RunMetrics) -> Duration;
    type Field = (&'static str, Getter);

    fn fmt_ms(d: Duration) -> String {
        format!("{:.3}ms", d.as_secs_f64() * 1000.0)
    }

    let fields: &[Field] = &[
        ("lattice_build", |m| m.lattice_build),
        ("composite", |m| m.composite),
        ("rasterize", |m| m.rasterize),
        ("wall_total", |m| m.wall_total),
    ];

    for (name, getter) in fields {
        let v = collect(runs, *getter);
        eprintln!(
            "  {name:14} p50={p50:>10}  p90={p90:>10}  p99={p99:>10}",
            name = *name,
            p50 = fmt_ms(p(&v, 0.50)),
            p90 = fmt_ms(p(&v, 0.90)),
            p99 = fmt_ms(p(&v, 0.99))
        );
    }
}
