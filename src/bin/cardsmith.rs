use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cardsmith::{
    Compositor, DirBlobStore, EditorConfig, EditorState, ExportEncoding, ExportOptions,
    ExportPreset, ImageResolver, RenderOutcome, TextEngine, export_file_name, export_surface,
    store::reconcile::reconcile_str,
};

#[derive(Parser, Debug)]
#[command(name = "cardsmith", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a saved card document to PNG or JPEG.
    Render(RenderArgs),
    /// Load a saved card document and print what it contains after repair.
    Check(CheckArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Png,
    Jpeg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    /// Canvas size.
    Canvas,
    /// 1200x600.
    Twitter,
    /// 1200x628.
    Facebook,
}

impl From<Preset> for ExportPreset {
    fn from(p: Preset) -> Self {
        match p {
            Preset::Canvas => ExportPreset::Canvas,
            Preset::Twitter => ExportPreset::Twitter,
            Preset::Facebook => ExportPreset::Facebook,
        }
    }
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output path. Defaults to a name derived from the first text layer.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Target size and fallback file name.
    #[arg(long, value_enum, default_value_t = Preset::Canvas)]
    preset: Preset,

    /// Export width in pixels (defaults to the preset width).
    #[arg(long)]
    width: Option<u32>,

    /// Export height in pixels (defaults to the preset height).
    #[arg(long)]
    height: Option<u32>,

    /// Override the document's export format.
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// JPEG quality in `0..=1`.
    #[arg(long)]
    quality: Option<f64>,

    /// Keep transparency in PNG output.
    #[arg(long, default_value_t = false)]
    transparent: bool,

    /// Font file to register. The first one is the fallback for unknown families.
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Directory holding uploaded images referenced as `stored:<id>`.
    #[arg(long)]
    blobs: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Input document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn load_state(path: &Path) -> anyhow::Result<EditorState> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read document '{}'", path.display()))?;
    Ok(reconcile_str(&text))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let state = load_state(&args.in_path)?;
    let cfg = EditorConfig::from_env();

    let assets_root = cfg.assets_root.clone().unwrap_or_else(|| {
        args.in_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    });
    let mut resolver = ImageResolver::new().with_assets_root(assets_root);
    if let Some(dir) = &args.blobs {
        let store = DirBlobStore::open(dir)
            .with_context(|| format!("open blob dir '{}'", dir.display()))?;
        resolver = resolver.with_blob_store(Arc::new(store));
    }

    let mut images = cfg.image_cache();
    images.sync(&state);
    images.resolve_pending(&resolver);

    let mut text = TextEngine::new();
    for font in &args.fonts {
        text.register_font_file(font, None)
            .with_context(|| format!("register font '{}'", font.display()))?;
    }

    let mut compositor = Compositor::new(cfg.compositor_opts());
    if compositor.render(&state, &images, &mut text)? == RenderOutcome::Loading {
        anyhow::bail!("background image is still loading");
    }
    let surface = compositor
        .surface()
        .context("compositor produced no frame")?;

    let mut opts = ExportOptions::for_preset(&state, args.preset.into());
    opts = opts.with_size(
        args.width.unwrap_or(opts.width),
        args.height.unwrap_or(opts.height),
    );
    opts.format = match (args.format, opts.format) {
        (Some(Format::Png), _) => ExportEncoding::Png {
            transparent: args.transparent,
        },
        (Some(Format::Jpeg), _) => ExportEncoding::Jpeg {
            quality: args.quality.unwrap_or(state.export.jpeg_quality),
        },
        (None, ExportEncoding::Jpeg { quality }) => ExportEncoding::Jpeg {
            quality: args.quality.unwrap_or(quality),
        },
        (None, ExportEncoding::Png { transparent }) => ExportEncoding::Png {
            transparent: transparent || args.transparent,
        },
    };

    let exported = export_surface(surface, &opts)?;
    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(export_file_name(&state, &opts)));
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&out, &exported.bytes)
        .with_context(|| format!("write image '{}'", out.display()))?;

    eprintln!(
        "wrote {} ({}x{}, {})",
        out.display(),
        exported.width,
        exported.height,
        exported.mime
    );
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let state = load_state(&args.in_path)?;
    let canvas = &state.canvas;
    println!(
        "canvas {}x{} background={:?}",
        canvas.canvas_width, canvas.canvas_height, canvas.background_type
    );
    if let Some(src) = canvas.active_bg_image() {
        println!("  bg image {src}");
    }

    for layer in state.display_order() {
        let base = layer.base();
        let selected = state.selected_layer_id.as_ref() == Some(&base.id);
        println!(
            "{} z={:<3} {:<5} {} {:?}{}{}",
            if selected { "*" } else { " " },
            base.z_index,
            layer.kind().as_str(),
            base.id,
            base.name,
            if base.is_visible { "" } else { " hidden" },
            layer
                .image_src()
                .map(|src| format!(" src={src}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}
