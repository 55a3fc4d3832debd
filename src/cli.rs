// ============================================================================
// Picraft CLI - headless batch editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   picraft -i photo.jpg --rotate cw -o out.png
//   picraft -i photo.png --brightness 130 --sepia 40 -o warm.jpg --quality 85
//   picraft -i "shots/*.jpg" --filter vintage --output-dir processed/
//   picraft -i photo.png --recipe edits.json -o result.webp
//
// No preview loop runs in CLI mode: the session is created with a zero
// debounce window and every step is committed as soon as it renders.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::EditError;
use crate::io::OutputFormat;
use crate::log_err;
use crate::ops::adjustments::AdjustmentSettings;
use crate::ops::filters::FilterPreset;
use crate::ops::transform::{CropShape, CropSpec, FlipDirection, RotateDirection};
use crate::session::EditSession;

// ============================================================================
// CLI argument definition (clap derive)
// ============================================================================

/// Picraft headless image editor.
///
/// Apply adjustments, filters, and transforms to image files and convert
/// between formats without a UI.
#[derive(Parser, Debug)]
#[command(
    name = "picraft",
    about = "Picraft headless batch image editor",
    long_about = "Apply adjustments, filter presets, rotation, flips, and crops to\n\
                  image files and re-encode them as PNG, JPEG, or WEBP.\n\n\
                  Example:\n  \
                  picraft -i photo.jpg --filter vintage -o out.png\n  \
                  picraft -i \"*.jpg\" --brightness 120 --output-dir processed/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// JSON recipe file holding an ordered list of edit steps.
    /// When given, the per-step flags below are ignored.
    #[arg(long, value_name = "RECIPE.json")]
    pub recipe: Option<PathBuf>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing. Files are written here with
    /// the suggested `<basename>-picraft.<ext>` name.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, webp.
    /// When omitted, inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100, default 90).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Brightness percent (0-300, 100 = unchanged).
    #[arg(long, value_name = "PCT")]
    pub brightness: Option<f32>,

    /// Contrast percent (0-200, 100 = unchanged).
    #[arg(long, value_name = "PCT")]
    pub contrast: Option<f32>,

    /// Saturation percent (0-300, 100 = unchanged).
    #[arg(long, value_name = "PCT")]
    pub saturation: Option<f32>,

    /// Grayscale mix percent (0-100).
    #[arg(long, value_name = "PCT")]
    pub grayscale: Option<f32>,

    /// Sepia mix percent (0-100).
    #[arg(long, value_name = "PCT")]
    pub sepia: Option<f32>,

    /// Hue rotation in degrees (0-360).
    #[arg(long, value_name = "DEG")]
    pub hue_rotate: Option<f32>,

    /// Filter preset: exposed, alien, faded, grayscale, sepia, vintage.
    #[arg(long, value_name = "NAME")]
    pub filter: Option<String>,

    /// Rotate 90 degrees: cw or ccw.
    #[arg(long, value_name = "cw|ccw")]
    pub rotate: Option<String>,

    /// Mirror the image: h (left-right) or v (top-bottom).
    #[arg(long, value_name = "h|v")]
    pub flip: Option<String>,

    /// Crop rectangle as "x,y,width,height" in source pixels.
    #[arg(long, value_name = "X,Y,W,H")]
    pub crop: Option<String>,

    /// Make the crop elliptical (pixels outside the inscribed ellipse become
    /// transparent). Only meaningful together with --crop.
    #[arg(long)]
    pub ellipse: bool,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Edit recipe
// ============================================================================

/// One step of a batch edit, in application order. The JSON recipe file is
/// an array of these, e.g.:
///   [{"op":"adjust","settings":{"brightness":130.0}},
///    {"op":"rotate","direction":"cw"},
///    {"op":"crop","spec":{"x":0,"y":0,"width":800,"height":600}}]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum EditStep {
    Adjust { settings: AdjustmentSettings },
    Filter { preset: FilterPreset },
    Rotate { direction: RotateDirection },
    Flip { direction: FlipDirection },
    Crop { spec: CropSpec },
}

/// Build the step list from the per-step flags, in the fixed order
/// adjust, filter, rotate, flip, crop.
fn steps_from_flags(args: &CliArgs) -> Result<Vec<EditStep>, String> {
    let mut steps = Vec::new();

    let adjusted = args.brightness.is_some()
        || args.contrast.is_some()
        || args.saturation.is_some()
        || args.grayscale.is_some()
        || args.sepia.is_some()
        || args.hue_rotate.is_some();
    if adjusted {
        let neutral = AdjustmentSettings::default();
        steps.push(EditStep::Adjust {
            settings: AdjustmentSettings {
                brightness: args.brightness.unwrap_or(neutral.brightness),
                contrast: args.contrast.unwrap_or(neutral.contrast),
                saturation: args.saturation.unwrap_or(neutral.saturation),
                grayscale: args.grayscale.unwrap_or(neutral.grayscale),
                sepia: args.sepia.unwrap_or(neutral.sepia),
                hue_rotate: args.hue_rotate.unwrap_or(neutral.hue_rotate),
            },
        });
    }

    if let Some(name) = &args.filter {
        let preset = FilterPreset::from_name(name)
            .ok_or_else(|| format!("unknown filter preset '{}'", name))?;
        steps.push(EditStep::Filter { preset });
    }

    if let Some(direction) = &args.rotate {
        let direction = match direction.to_ascii_lowercase().as_str() {
            "cw" => RotateDirection::Clockwise,
            "ccw" => RotateDirection::CounterClockwise,
            other => return Err(format!("invalid rotate direction '{}'", other)),
        };
        steps.push(EditStep::Rotate { direction });
    }

    if let Some(axis) = &args.flip {
        let direction = match axis.to_ascii_lowercase().as_str() {
            "h" | "horizontal" => FlipDirection::Horizontal,
            "v" | "vertical" => FlipDirection::Vertical,
            other => return Err(format!("invalid flip axis '{}'", other)),
        };
        steps.push(EditStep::Flip { direction });
    }

    if let Some(rect) = &args.crop {
        let mut spec = parse_crop(rect)?;
        if args.ellipse {
            spec.shape = CropShape::Elliptical;
        }
        steps.push(EditStep::Crop { spec });
    }

    Ok(steps)
}

/// Parse "x,y,width,height" into a rectangular crop spec.
fn parse_crop(rect: &str) -> Result<CropSpec, String> {
    let parts: Vec<&str> = rect.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("invalid crop '{}': expected x,y,width,height", rect));
    }
    let mut values = [0u32; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("invalid crop component '{}'", part))?;
    }
    Ok(CropSpec::rect(values[0], values[1], values[2], values[3]))
}

fn load_recipe(path: &Path) -> Result<Vec<EditStep>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read recipe '{}': {}", path.display(), e))?;
    serde_json::from_str(&text)
        .map_err(|e| format!("could not parse recipe '{}': {}", path.display(), e))
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub async fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let steps = match &args.recipe {
        Some(path) => load_recipe(path),
        None => steps_from_flags(&args),
    };
    let steps = match steps {
        Ok(steps) => steps,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let format = parse_format(args.format.as_deref(), args.output.as_deref());

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();
        match process_file(input_path, &steps, format, args.quality, &args).await {
            Ok(output_path) => {
                if args.verbose {
                    println!(
                        "  wrote {} ({} ms)",
                        output_path.display(),
                        file_start.elapsed().as_millis()
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                log_err!("CLI failed on '{}': {}", input_path.display(), e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Load one file, replay the steps through an edit session, export, write.
async fn process_file(
    input_path: &Path,
    steps: &[EditStep],
    format: OutputFormat,
    quality: u8,
    args: &CliArgs,
) -> Result<PathBuf, String> {
    let bytes = std::fs::read(input_path)
        .map_err(|e| format!("could not read '{}': {}", input_path.display(), e))?;

    let mut session = EditSession::with_debounce(std::time::Duration::ZERO);
    let source_name = input_path.file_name().and_then(|n| n.to_str());
    session
        .load_image(bytes, source_name)
        .await
        .map_err(|e| e.to_string())?;

    for step in steps {
        apply_step(&mut session, step).await.map_err(|e| e.to_string())?;
    }

    let exported = session
        .export(format, quality)
        .await
        .map_err(|e| e.to_string())?;

    let output_path = build_output_path(
        input_path,
        args.output.as_deref(),
        args.output_dir.as_deref(),
        &exported.file_name,
    )
    .ok_or_else(|| format!("cannot determine output path for '{}'", input_path.display()))?;

    std::fs::write(&output_path, &exported.bytes)
        .map_err(|e| format!("could not write '{}': {}", output_path.display(), e))?;
    Ok(output_path)
}

async fn apply_step(session: &mut EditSession, step: &EditStep) -> Result<(), EditError> {
    match step {
        EditStep::Adjust { settings } => {
            let token = session.set_adjustments(*settings);
            session.refresh(token).await?;
            session.apply().await
        }
        EditStep::Filter { preset } => {
            let token = session.select_filter(Some(*preset));
            session.render_preview(&token).await?;
            session.apply().await
        }
        EditStep::Rotate { direction } => session.rotate(*direction).await,
        EditStep::Flip { direction } => session.flip(*direction).await,
        EditStep::Crop { spec } => session.crop(spec).await,
    }
}

// ============================================================================
// Path plumbing
// ============================================================================

/// Expand glob patterns and literal paths into concrete files.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    for pattern in patterns {
        let is_glob = pattern.contains('*') || pattern.contains('?') || pattern.contains('[');
        if is_glob {
            match glob::glob(pattern) {
                Ok(paths) => {
                    for entry in paths.flatten() {
                        if entry.is_file() {
                            inputs.push(entry);
                        }
                    }
                }
                Err(e) => eprintln!("warning: bad glob pattern '{}': {}", pattern, e),
            }
        } else {
            inputs.push(PathBuf::from(pattern));
        }
    }
    inputs.sort();
    inputs.dedup();
    inputs
}

/// Resolve the output format from --format, then the --output extension,
/// defaulting to PNG.
fn parse_format(format: Option<&str>, output: Option<&Path>) -> OutputFormat {
    if let Some(name) = format
        && let Some(parsed) = OutputFormat::from_extension(name)
    {
        return parsed;
    }
    if let Some(path) = output
        && let Some(ext) = path.extension().and_then(|e| e.to_str())
        && let Some(parsed) = OutputFormat::from_extension(ext)
    {
        return parsed;
    }
    OutputFormat::Png
}

/// Single-file runs honour --output; batch runs land in --output-dir under
/// the session's suggested download name.
fn build_output_path(
    input_path: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    suggested_name: &str,
) -> Option<PathBuf> {
    if let Some(dir) = output_dir {
        return Some(dir.join(suggested_name));
    }
    if let Some(path) = output {
        return Some(path.to_path_buf());
    }
    Some(input_path.with_file_name(suggested_name))
}
