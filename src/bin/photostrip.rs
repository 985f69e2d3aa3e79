use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "photostrip", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose four photos into a finished print (PNG).
    Compose(ComposeArgs),
    /// List the supported layout templates.
    Layouts,
    /// Put a finished print into the photo store and print its id.
    Store(StoreArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Render request JSON (layout, background, resolution_scale).
    #[arg(long = "request")]
    request_path: PathBuf,

    /// Source photo, repeated once per slot in order.
    #[arg(long = "photo", required = true)]
    photos: Vec<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Asset directory for background walls and the stamp font.
    /// Defaults to the request file's directory.
    #[arg(long)]
    assets: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct StoreArgs {
    /// Encoded print to store (PNG or JPEG, by extension).
    #[arg(long = "photo")]
    photo: PathBuf,

    /// Store root directory.
    #[arg(long)]
    root: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Layouts => cmd_layouts(),
        Command::Store(args) => cmd_store(args),
    }
}

fn read_request_json(path: &Path) -> anyhow::Result<photostrip::RenderRequest> {
    let f = File::open(path).with_context(|| format!("open request '{}'", path.display()))?;
    let r = BufReader::new(f);
    let request: photostrip::RenderRequest =
        serde_json::from_reader(r).with_context(|| "parse request JSON")?;
    Ok(request)
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let request = read_request_json(&args.request_path)?;

    let mut photos = Vec::with_capacity(args.photos.len());
    for path in &args.photos {
        let bytes =
            std::fs::read(path).with_context(|| format!("read photo '{}'", path.display()))?;
        photos.push(bytes);
    }

    let assets_root = args.assets.clone().unwrap_or_else(|| {
        args.request_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    });
    let loader = photostrip::DirLoader::new(assets_root);

    let rendered = photostrip::render(&request, &photos, &loader)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let png = rendered.encode_png()?;
    std::fs::write(&args.out, png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}x{})",
        args.out.display(),
        rendered.width,
        rendered.height
    );
    Ok(())
}

fn cmd_layouts() -> anyhow::Result<()> {
    for name in photostrip::LayoutName::ALL {
        let spec = photostrip::resolve(name, 1.0)?;
        println!(
            "{:<8} {}x{} px, {} photos{}",
            name.to_string(),
            spec.canvas_width,
            spec.canvas_height,
            spec.required_sources(),
            if spec.overlay.is_some() {
                ", stamped"
            } else {
                ""
            }
        );
    }
    Ok(())
}

fn cmd_store(args: StoreArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.photo)
        .with_context(|| format!("read photo '{}'", args.photo.display()))?;

    let format = match args
        .photo
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => photostrip::StoredFormat::Png,
        Some("jpg") | Some("jpeg") => photostrip::StoredFormat::Jpeg,
        other => anyhow::bail!("unsupported photo extension: {other:?}"),
    };

    let store = photostrip::PhotoStore::open(&args.root)?;
    let stored = store.put(&bytes, format)?;
    println!("{}", stored.id);
    eprintln!("stored {}", stored.path.display());
    Ok(())
}
