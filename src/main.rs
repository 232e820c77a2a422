use clap::{Parser, ValueEnum};
use pagesnap::{
    CdpLauncher, ImageFormat, OptionOverrides, OutputPath, PostProcess, RenderOutcome, ScreenshotOverrides,
    Viewport,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "pagesnap", version, about = "Render HTML documents to preview images")]
struct Cli {
    /// Base directory to scan and serve (defaults to the current directory)
    dir: Option<PathBuf>,

    /// Port for the local static server
    #[arg(long)]
    port: Option<u16>,

    /// Glob pattern relative to the base directory (repeatable)
    #[arg(long = "pattern")]
    patterns: Vec<String>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Capture the whole scrollable page
    #[arg(long)]
    full_page: bool,

    /// Capture only the first element matching this CSS selector
    #[arg(long)]
    selector: Option<String>,

    #[arg(long, value_enum)]
    format: Option<Format>,

    /// JPEG/WebP quality (0-100)
    #[arg(long, requires = "format")]
    quality: Option<u32>,

    /// Losslessly recompress PNG output
    #[arg(long)]
    optimize: bool,

    /// Write images under this directory instead of next to the sources
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Delete each source document after its image was written
    #[arg(long)]
    remove_originals: bool,

    /// Maximum number of pages rendered at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Launch Chrome without its sandbox (needed when running as root)
    #[arg(long)]
    no_sandbox: bool,

    /// Print a JSON report on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Png,
    Jpeg,
    Webp,
}

#[derive(Serialize)]
struct ReportEntry {
    file: PathBuf,
    output: Option<PathBuf>,
    bytes: Option<usize>,
    error: Option<String>,
}

impl Cli {
    fn overrides(&self) -> OptionOverrides {
        let viewport = match (self.width, self.height) {
            (None, None) => None,
            (w, h) => {
                let d = Viewport::default();
                Some(Viewport {
                    width: w.unwrap_or(d.width),
                    height: h.unwrap_or(d.height),
                })
            }
        };
        let format = self.format.map(|f| match f {
            Format::Png => ImageFormat::Png,
            Format::Jpeg => ImageFormat::Jpeg { quality: self.quality },
            Format::Webp => ImageFormat::Webp { quality: self.quality },
        });

        OptionOverrides {
            patterns: (!self.patterns.is_empty()).then(|| self.patterns.clone()),
            port: self.port,
            viewport,
            screenshot: ScreenshotOverrides {
                format,
                full_page: self.full_page.then_some(true),
            },
            selector: self.selector.clone(),
            output: self.out_dir.clone().map(OutputPath::Directory),
            post_process: self.optimize.then_some(PostProcess::OptimizePng),
            remove_originals: self.remove_originals.then_some(true),
            // The CLI only reports sizes, no need to keep every image in memory
            include_buffer: Some(false),
            concurrency: self.concurrency,
            ..Default::default()
        }
    }
}

fn report(outcomes: &[RenderOutcome]) -> Vec<ReportEntry> {
    outcomes
        .iter()
        .map(|o| match o {
            Ok(res) => ReportEntry {
                file: res.file.clone(),
                output: res.output.clone(),
                bytes: res
                    .output
                    .as_ref()
                    .and_then(|p| std::fs::metadata(p).ok())
                    .map(|m| m.len() as usize),
                error: None,
            },
            Err(e) => ReportEntry {
                file: e.file.clone(),
                output: None,
                bytes: None,
                error: Some(e.to_string()),
            },
        })
        .collect()
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let dir = match &cli.dir {
        Some(d) => d.clone(),
        None => match std::env::current_dir() {
            Ok(d) => d,
            Err(e) => {
                eprintln!("error: cannot determine current directory: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let launcher = CdpLauncher {
        sandbox: !cli.no_sandbox,
        ..Default::default()
    };
    let outcomes = match pagesnap::generate_previews_with(&dir, cli.overrides().resolve(), &launcher).await {
        Ok(o) => o,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        match serde_json::to_string_pretty(&report(&outcomes)) {
            Ok(js) => println!("{}", js),
            Err(e) => eprintln!("error: failed to serialize report: {}", e),
        }
    }

    let mut failed = false;
    for outcome in &outcomes {
        if let Err(e) = outcome {
            eprintln!("error: {}", e);
            failed = true;
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
