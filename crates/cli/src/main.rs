//! Promptline CLI
//!
//! Command-line inspection of stored prompt timeline documents.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use promptline_core::{
    convert_prompts, editor, importer, resolver, CommonPromptPos, Frame, OverlapType, PromptSet,
    TimelineConfig,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "promptline")]
#[command(about = "Inspect and upgrade prompt timeline documents")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upgrade a stored prompt document to the current format
    Migrate {
        /// Prompt document (JSON), or `-` for stdin
        input: PathBuf,

        /// Last frame of the animation
        #[arg(short, long)]
        last_frame: Frame,

        /// Write the upgraded document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the active prompts for a range of frames
    Preview {
        /// Prompt document (JSON), or `-` for stdin
        input: PathBuf,

        /// Last frame of the animation
        #[arg(short, long)]
        last_frame: Frame,

        /// First frame to print
        #[arg(long, default_value = "0")]
        from: Frame,

        /// Last frame to print (defaults to the last frame)
        #[arg(long)]
        to: Option<Frame>,

        /// Print every Nth frame
        #[arg(long, default_value = "1")]
        step: usize,

        /// Print the full composed prompt text instead of the summary
        #[arg(long)]
        compose: bool,
    },

    /// Apply timeline edits to a prompt document
    Edit {
        /// Prompt document (JSON), or `-` for stdin
        input: PathBuf,

        /// Last frame of the animation
        #[arg(short, long)]
        last_frame: Frame,

        #[command(flatten)]
        edits: EditArgs,

        /// Write the edited document here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dry-run a text import against a prompt document
    Import {
        /// Prompt document (JSON), or `-` for stdin
        input: PathBuf,

        /// File holding the text to import
        #[arg(short, long)]
        text: PathBuf,

        /// Last frame of the animation
        #[arg(short, long)]
        last_frame: Frame,

        /// Print the resulting document instead of the diagnostic
        #[arg(long)]
        accept: bool,
    },
}

/// Edits applied in order: add, reorder, space, overlap type, common position.
#[derive(Args, Debug, Default)]
struct EditArgs {
    /// Append this many new prompts
    #[arg(long, default_value = "0")]
    add: usize,

    /// Frames covered by each added prompt
    #[arg(long)]
    span: Option<Frame>,

    /// Sort prompts by start frame and renumber them
    #[arg(long)]
    reorder: bool,

    /// Spread prompts evenly, overlapping neighbours by this many frames
    #[arg(long)]
    space: Option<Frame>,

    /// Overlap type for every prompt: none, linear or custom
    #[arg(long, value_parser = parse_overlap_type)]
    overlap_type: Option<OverlapType>,

    /// Placement of the common prompt text: append, prepend or template
    #[arg(long, value_parser = parse_common_pos)]
    common_pos: Option<CommonPromptPos>,
}

fn parse_overlap_type(s: &str) -> Result<OverlapType, String> {
    OverlapType::from_str(s).ok_or_else(|| format!("unknown overlap type '{s}'"))
}

fn parse_common_pos(s: &str) -> Result<CommonPromptPos, String> {
    CommonPromptPos::from_str(s).ok_or_else(|| format!("unknown common prompt position '{s}'"))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Commands::Migrate {
            input,
            last_frame,
            output,
        } => migrate(&input, last_frame, output.as_deref())?,

        Commands::Preview {
            input,
            last_frame,
            from,
            to,
            step,
            compose,
        } => preview(&input, last_frame, from, to.unwrap_or(last_frame), step, compose)?,

        Commands::Edit {
            input,
            last_frame,
            edits,
            output,
        } => edit(&input, last_frame, &edits, output.as_deref())?,

        Commands::Import {
            input,
            text,
            last_frame,
            accept,
        } => import(&input, &text, last_frame, accept)?,
    }

    Ok(())
}

fn init_tracing(json_logs: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "promptline=info".into());
    let json_layer = json_logs.then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!json_logs).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }
}

fn load_document(path: &Path, last_frame: Frame) -> Result<PromptSet> {
    let raw = read_source(path)?;
    let value: serde_json::Value = if raw.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(&raw)
            .with_context(|| format!("{} is not valid JSON", path.display()))?
    };
    let set = convert_prompts(&value, last_frame);
    tracing::info!(
        prompts = set.prompt_list.len(),
        last_frame,
        "Loaded prompt document"
    );
    Ok(set)
}

fn write_document(set: &PromptSet, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(set).context("Failed to serialize document")?;

    match output {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(output = %path.display(), "Wrote prompt document");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn migrate(input: &Path, last_frame: Frame, output: Option<&Path>) -> Result<()> {
    let set = load_document(input, last_frame)?;
    write_document(&set, output)
}

fn apply_edits(set: &PromptSet, last_frame: Frame, edits: &EditArgs) -> PromptSet {
    let config = match edits.span {
        Some(span) => TimelineConfig::new(last_frame).with_default_prompt_span(span),
        None => TimelineConfig::new(last_frame),
    };

    let mut next = set.clone();
    for _ in 0..edits.add {
        next = editor::add_prompt(&next, &config);
    }
    if edits.reorder {
        next = editor::reorder(&next);
    }
    if let Some(overlap) = edits.space {
        next = editor::evenly_space(&next, config.last_frame, overlap);
    }
    if let Some(kind) = edits.overlap_type {
        for index in 0..next.prompt_list.len() {
            next = editor::set_overlap_type(&next, index, kind);
        }
    }
    if let Some(pos) = edits.common_pos {
        next = editor::set_common_position(&next, pos);
    }
    next
}

fn edit(input: &Path, last_frame: Frame, edits: &EditArgs, output: Option<&Path>) -> Result<()> {
    let set = load_document(input, last_frame)?;
    let edited = apply_edits(&set, last_frame, edits);
    tracing::info!(
        before = set.prompt_list.len(),
        after = edited.prompt_list.len(),
        "Applied edits"
    );
    write_document(&edited, output)
}

fn preview(
    input: &Path,
    last_frame: Frame,
    from: Frame,
    to: Frame,
    step: usize,
    compose: bool,
) -> Result<()> {
    if step == 0 {
        bail!("--step must be at least 1");
    }
    let set = load_document(input, last_frame)?;

    for warning in set
        .template_warning()
        .into_iter()
        .chain(resolver::composability_warnings(&set).iter().map(ToString::to_string))
    {
        tracing::warn!("{warning}");
    }

    for frame in (from.max(0)..=to.min(last_frame)).step_by(step) {
        if compose {
            match resolver::compose(&set, frame, last_frame) {
                Some(prompt) => println!(
                    "{frame}\t{}\t{}",
                    prompt.positive, prompt.negative
                ),
                None => println!("{frame}\t(disabled)"),
            }
        } else {
            println!("{frame}\t{}", resolver::preview(&set, frame, last_frame));
        }
    }
    Ok(())
}

fn import(input: &Path, text: &Path, last_frame: Frame, accept: bool) -> Result<()> {
    let set = load_document(input, last_frame)?;
    let text = read_source(text)?;
    let diagnostic = importer::parse(&text, last_frame, &set);

    if diagnostic.is_error() {
        bail!("{}", diagnostic.detail);
    }
    tracing::info!("{}", diagnostic.detail);

    let json = if accept {
        let merged = editor::append_prompts(&set, &diagnostic.parsed_prompts);
        serde_json::to_string_pretty(&merged)
    } else {
        serde_json::to_string_pretty(&diagnostic)
    }
    .context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
