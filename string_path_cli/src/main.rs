use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use string_path::{
    image::check_source,
    share,
    verboser::{Message, Verboser},
    yarn::{Yarn, YarnSpec},
    Computation, Parameters, State, TableShape,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input file path.
    #[arg()]
    input: PathBuf,

    /// JSON file with the parameters. Flags below override its fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Shape of the board holding the nails.
    #[arg(long)]
    shape: Option<ShapeKind>,

    /// Hoop diameter or rectangle width, in millimeters.
    #[arg(long)]
    width: Option<f64>,

    /// Rectangle height, in millimeters.
    #[arg(long)]
    height: Option<f64>,

    /// Number of nails surrounding the image.
    #[arg(short, long)]
    nails: Option<usize>,

    /// Number of lines to draw.
    #[arg(short, long)]
    lines: Option<usize>,

    /// Ink removed by every line, 1 to 255.
    #[arg(short, long)]
    weight: Option<u32>,

    /// Minimum nail count between linked nails.
    #[arg(long)]
    min_nail_distance: Option<usize>,

    /// Size in pixels of the longest side of the image.
    #[arg(short, long)]
    resolution: Option<u32>,

    /// Yarn diameter in millimeters. Replaces the line weight.
    #[arg(long, conflicts_with = "tex")]
    yarn_diameter: Option<f64>,

    /// Yarn linear density in Tex. Replaces the line weight.
    #[arg(long)]
    tex: Option<f64>,

    /// Output directory. Defaults to `output` next to the input file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scale of the png preview relative to the processing resolution.
    #[arg(long, default_value_t = 2.0)]
    scale: f64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShapeKind {
    Circle,
    Rectangle,
}

impl Args {
    fn parameters(&self) -> anyhow::Result<Parameters> {
        let mut params = match &self.config {
            Some(path) => {
                let file = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&file)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => Parameters::default(),
        };

        let (width, height) = params.shape.dimensions();
        let width = self.width.unwrap_or(width);
        let height = self.height.unwrap_or(height);
        params.shape = match self.shape {
            Some(ShapeKind::Circle) => TableShape::Circle {
                hoop_diameter: width,
            },
            Some(ShapeKind::Rectangle) => TableShape::Rectangle { width, height },
            None => match params.shape {
                TableShape::Circle { .. } => TableShape::Circle {
                    hoop_diameter: width,
                },
                TableShape::Rectangle { .. } => TableShape::Rectangle { width, height },
            },
        };

        if let Some(nails) = self.nails {
            params.nail_count = nails;
        }
        if let Some(lines) = self.lines {
            params.line_count = lines;
        }
        if let Some(weight) = self.weight {
            params.line_weight = weight;
        }
        if let Some(distance) = self.min_nail_distance {
            params.min_nail_distance = distance;
        }
        if let Some(resolution) = self.resolution {
            params.resolution = resolution;
        }
        if let Some(mm) = self.yarn_diameter {
            params.yarn = Some(Yarn::new(YarnSpec::Diameter { mm }));
        } else if let Some(tex) = self.tex {
            params.yarn = Some(Yarn::new(YarnSpec::Tex { tex }));
        }
        Ok(params)
    }

    fn output_dir(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            self.input
                .parent()
                .unwrap_or(Path::new("."))
                .join("output")
        })
    }
}

/// Forwards engine messages to the log.
struct LogVerboser;

impl Verboser for LogVerboser {
    fn verbose(&mut self, message: Message) {
        match message {
            Message::CreatingNails(count) => tracing::info!(count, "nails created"),
            Message::Baking(count) => tracing::info!(count, "lines baked"),
            Message::Computing(progress) => tracing::info!(
                "{:>5.1}% {}/{} lines, nail {} -> {}, {:.2} m of thread",
                progress.percent_complete,
                progress.lines_drawn,
                progress.total_lines,
                progress.current_nail,
                progress.next_nail,
                progress.thread_length / 1000.0,
            ),
            Message::Stalled { lines_drawn } => {
                tracing::info!(lines_drawn, "no nail left to link")
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let params = args.parameters()?;
    let problems = params.validate();
    for problem in problems.iter() {
        tracing::error!("{problem}");
    }
    if !problems.is_empty() {
        bail!("{} invalid parameter(s)", problems.len());
    }

    let source = image::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let problems = check_source(source.width(), source.height());
    for problem in problems.iter() {
        tracing::error!("{problem}");
    }
    if !problems.is_empty() {
        bail!("{} is not usable as a source", args.input.display());
    }

    let computation = string_path::generate(&source, &params, &mut LogVerboser)?;
    if computation.state == State::Stalled {
        tracing::warn!(
            lines_drawn = computation.lines_drawn(),
            requested = params.line_count,
            "stopped before drawing every line"
        );
    }
    tracing::info!(
        lines = computation.lines_drawn(),
        thread_m = computation.thread_length / 1000.0,
        elapsed = ?computation.elapsed,
        "done"
    );

    save(&args, &computation)?;
    let code = share::encode(&share::Shared::from_computation(&computation)?)?;
    println!("{code}");
    Ok(())
}

fn save(args: &Args, computation: &Computation) -> anyhow::Result<()> {
    let out_folder = args.output_dir();
    std::fs::create_dir_all(&out_folder)
        .with_context(|| format!("creating {}", out_folder.display()))?;
    let file_name = args
        .input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("invalid input file name")?;

    let json = out_folder.join(format!("{file_name}.json"));
    std::fs::write(&json, serde_json::to_string_pretty(computation)?)
        .with_context(|| format!("writing {}", json.display()))?;

    let svg_path = out_folder.join(format!("{file_name}.svg"));
    svg::save(&svg_path, &computation.build_svg(0.5))
        .with_context(|| format!("writing {}", svg_path.display()))?;

    let png = out_folder.join(format!("{file_name}.png"));
    computation
        .build_rgb(args.scale)
        .save(&png)
        .with_context(|| format!("writing {}", png.display()))?;

    tracing::info!(folder = %out_folder.display(), "results saved");
    Ok(())
}
