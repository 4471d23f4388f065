//! CLI for magedit - magazine-cover restyling.

use clap::{Args, Parser, Subcommand};
use magedit::generation::decode_data_url;
use magedit::{download_filename, Download, Editor, EditorConfig, JobHandle, StylePreset};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "magedit")]
#[command(about = "Restyle photos as magazine covers and keep a one-hour gallery of results")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Directory for the gallery store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available style presets
    Presets,

    /// Manage the working image
    #[command(subcommand)]
    Image(ImageCommand),

    /// Submit, wait for and download a generation
    Generate(GenerateArgs),

    /// Submit a generation and print its status URL
    Submit(PresetArg),

    /// Wait for a submitted generation and download it
    Download(DownloadArgs),

    /// Inspect the gallery
    #[command(subcommand)]
    Gallery(GalleryCommand),
}

#[derive(Subcommand)]
enum ImageCommand {
    /// Select the image to restyle
    Set {
        /// Path to the image file
        path: PathBuf,
    },
    /// Show whether a working image is selected
    Show,
    /// Forget the working image
    Clear,
}

#[derive(Subcommand)]
enum GalleryCommand {
    /// List entries with their remaining lifetime
    List,
    /// Remove an entry
    Remove {
        /// Entry id
        id: i64,
    },
    /// Write an entry's image to a file
    Export {
        /// Entry id
        id: i64,
        /// Output file path (default: mag-edit-<id>.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct PresetArg {
    /// Style preset name
    #[arg(short, long, default_value = "Cosmopolitan")]
    preset: String,
}

#[derive(Args)]
struct GenerateArgs {
    #[command(flatten)]
    preset: PresetArg,

    /// Image to restyle (replaces the working image)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory to write the result into
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

#[derive(Args)]
struct DownloadArgs {
    /// Status URL printed by `submit`
    status_url: String,

    #[command(flatten)]
    preset: PresetArg,

    /// Directory to write the result into
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "magedit=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut builder = EditorConfig::builder();
    if let Some(dir) = &cli.data_dir {
        builder = builder.data_dir(dir);
    }
    let editor = Editor::open(builder.build()?)?;

    match cli.command {
        Commands::Presets => list_presets(cli.json)?,
        Commands::Image(cmd) => image_command(&editor, cmd, cli.json)?,
        Commands::Generate(args) => generate(&editor, args, cli.json).await?,
        Commands::Submit(args) => submit(&editor, args, cli.json).await?,
        Commands::Download(args) => download(&editor, args, cli.json).await?,
        Commands::Gallery(cmd) => gallery_command(&editor, cmd, cli.json)?,
    }

    Ok(())
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            trigger.cancel();
        }
    });
    cancel
}

async fn generate(editor: &Editor, args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let preset = StylePreset::find(&args.preset.preset)?;
    if let Some(input) = &args.input {
        editor.working_image().set_from_file(input)?;
    }

    let cancel = cancel_on_ctrl_c();
    eprintln!("Generating {} cover...", preset.name);
    let result = editor.run(&preset, &args.output, &cancel).await?;
    print_download(&result, json_output)
}

async fn submit(editor: &Editor, args: PresetArg, json_output: bool) -> anyhow::Result<()> {
    let preset = StylePreset::find(&args.preset)?;
    let handle = editor.generate(&preset).await?;

    if json_output {
        let result = serde_json::json!({
            "preset": preset.name,
            "status_url": handle.status_url(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", handle.status_url());
    }
    Ok(())
}

async fn download(editor: &Editor, args: DownloadArgs, json_output: bool) -> anyhow::Result<()> {
    let preset = StylePreset::find(&args.preset.preset)?;
    let handle = JobHandle::new(args.status_url)?;

    let cancel = cancel_on_ctrl_c();
    let result = editor
        .download(&handle, &preset, &args.output, &cancel)
        .await?;
    print_download(&result, json_output)
}

fn print_download(result: &Download, json_output: bool) -> anyhow::Result<()> {
    if json_output {
        let value = serde_json::json!({
            "success": true,
            "output": result.path.display().to_string(),
            "size_bytes": result.size_bytes,
            "format": result.format.extension(),
            "gallery_id": result.entry.as_ref().map(|e| e.id),
            "storage_warning": result.storage_warning.as_ref().map(|e| e.to_string()),
            "duration_ms": result.duration_ms,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!(
            "Saved {} ({} bytes) in {}ms",
            result.path.display(),
            result.size_bytes,
            result.duration_ms
        );
        if let Some(warning) = &result.storage_warning {
            eprintln!("Could not save to gallery - storage might be full ({warning})");
        }
    }
    Ok(())
}

fn image_command(editor: &Editor, cmd: ImageCommand, json_output: bool) -> anyhow::Result<()> {
    let image = editor.working_image();
    match cmd {
        ImageCommand::Set { path } => {
            let url = image.set_from_file(&path)?;
            if json_output {
                let value = serde_json::json!({
                    "success": true,
                    "path": path.display().to_string(),
                    "length": url.len(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Working image set: {} ({} chars)", path.display(), url.len());
            }
        }
        ImageCommand::Clear => {
            image.clear()?;
            if json_output {
                let value = serde_json::json!({ "success": true });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Working image cleared");
            }
        }
        ImageCommand::Show => {
            let current = image.get();
            if json_output {
                let value = serde_json::json!({
                    "selected": current.is_some(),
                    "length": current.as_ref().map(String::len),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                match current {
                    Some(url) => println!("Working image selected ({} chars)", url.len()),
                    None => println!("No working image"),
                }
            }
        }
    }
    Ok(())
}

fn gallery_command(editor: &Editor, cmd: GalleryCommand, json_output: bool) -> anyhow::Result<()> {
    let gallery = editor.gallery();
    match cmd {
        GalleryCommand::List => {
            let entries = gallery.load();
            if json_output {
                let value: Vec<_> = entries
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "id": e.id,
                            "style": e.style_name,
                            "created_at": e.created_at,
                            "minutes_left": gallery.time_remaining(e).minutes(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else if entries.is_empty() {
                println!("Gallery is empty");
            } else {
                for e in &entries {
                    println!("{}  {:<14} {}", e.id, e.style_name, gallery.time_remaining(e));
                }
            }
        }
        GalleryCommand::Remove { id } => {
            gallery.remove(id)?;
            if json_output {
                let value = serde_json::json!({ "success": true, "id": id });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Removed {id}");
            }
        }
        GalleryCommand::Export { id, output } => {
            let entry = gallery
                .get(id)
                .ok_or_else(|| anyhow::anyhow!("no gallery entry with id {id}"))?;
            let (format, data) = decode_data_url(&entry.artifact_data)?;
            let path = output.unwrap_or_else(|| PathBuf::from(download_filename(id, format)));
            std::fs::write(&path, &data)?;
            if json_output {
                let value = serde_json::json!({
                    "id": id,
                    "output": path.display().to_string(),
                    "size_bytes": data.len(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Exported {} ({} bytes)", path.display(), data.len());
            }
        }
    }
    Ok(())
}

fn list_presets(json_output: bool) -> anyhow::Result<()> {
    let presets = StylePreset::all();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&presets)?);
    } else {
        println!("Available presets:\n");
        for p in &presets {
            println!("  {:<14} ({})", p.name, p.slug);
        }
    }
    Ok(())
}
