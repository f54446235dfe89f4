// ============================================================================
// rasterkit CLI — headless editing pipeline via command-line arguments
// ============================================================================
//
// Usage examples:
//   rasterkit -i photo.png --op scale=320x240 -o small.png
//   rasterkit -i photo.png --op rotate=30@0.5 --op invert -o out.jpg -q 85
//   rasterkit -i "shots/*.png" --op flip-h --output-dir flipped/ --format webp
//   rasterkit -i scan.png --op crop=10,10,200,100 --op fill=0,0,ffffff,12
//   rasterkit -i a.png --op invert --op rotate90 --undo 1 -o b.png
//
// Operations run in order against one project per input, each recording an
// undo snapshot, so `--undo N` steps back through the last N of them.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;
use log::{debug, info, warn};

use crate::blend::make_rgba;
use crate::components::knife::{Knife, KnifeMode};
use crate::error::{EngineError, Result};
use crate::io::{SaveFormat, load_bitmap, save_bitmap};
use crate::ops::transform::{self, Outcome};
use crate::project::Project;
use crate::settings::EngineSettings;
use crate::view::{LogProgress, NullView};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// rasterkit headless image editor.
#[derive(Parser, Debug)]
#[command(
    name = "rasterkit",
    about = "Headless raster editing: scale, rotate, flip, invert, crop and fill",
    long_about = "Apply editing operations to image files without a GUI. Loads and\n\
                  saves PNG, JPEG, WEBP, BMP, TGA, ICO and TIFF.\n\n\
                  Operations (repeat --op, applied in order):\n  \
                  scale=WxH            gamma-correct bilinear resize\n  \
                  scale-wrap=WxH       resize sampling across the edges (tiles)\n  \
                  rotate=DEG[@SCALE]   rotate clockwise, optionally scaling\n  \
                  rotate-tile=DEG[@S]  rotate and fill the corners by tiling\n  \
                  flip-h | flip-v | rotate90 | rotate90ccw | rotate180 | invert\n  \
                  crop=X,Y,W,H         keep only the given rectangle\n  \
                  fill=X,Y,RRGGBB[AA],TOL  flood fill from a seed pixel"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Operation to apply; may be repeated.
    #[arg(long = "op", value_name = "OP", value_parser = Op::from_str)]
    pub ops: Vec<Op>,

    /// Undo this many operations after applying them all.
    #[arg(long, default_value_t = 0, value_name = "N")]
    pub undo: usize,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, webp, bmp, tga, ico, tiff.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100, default 90).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Settings file to use instead of the per-user one.
    #[arg(short, long, value_name = "FILE.toml")]
    pub config: Option<PathBuf>,

    /// Debug logging and per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Operations
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    Scale { width: i32, height: i32, wrap: bool },
    Rotate { angle: f64, scale: f64, tile: bool },
    FlipH,
    FlipV,
    Rotate90 { clockwise: bool },
    Rotate180,
    Invert,
    /// Rectangle in image coordinates.
    Crop { x: i32, y: i32, width: i32, height: i32 },
    Fill { x: i32, y: i32, color: u32, tolerance: i32 },
}

fn parse_num<T: FromStr>(op: &str, field: &str) -> Result<T> {
    field
        .trim()
        .parse()
        .map_err(|_| EngineError::invalid_op(op, format!("'{field}' is not a number")))
}

fn parse_size(op: &str, arg: &str) -> Result<(i32, i32)> {
    let (w, h) = arg
        .split_once(['x', 'X'])
        .ok_or_else(|| EngineError::invalid_op(op, "expected WIDTHxHEIGHT"))?;
    Ok((parse_num(op, w)?, parse_num(op, h)?))
}

fn parse_rotation(op: &str, arg: &str) -> Result<(f64, f64)> {
    match arg.split_once('@') {
        Some((angle, scale)) => Ok((parse_num(op, angle)?, parse_num(op, scale)?)),
        None => Ok((parse_num(op, arg)?, 1.0)),
    }
}

/// `RRGGBB` (opaque) or `RRGGBBAA`, optional leading `#`.
fn parse_color(op: &str, arg: &str) -> Result<u32> {
    let hex = arg.trim().trim_start_matches('#');
    let bad = || EngineError::invalid_op(op, format!("'{arg}' is not an RRGGBB[AA] colour"));
    if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
        return Err(bad());
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
    let a = if hex.len() == 8 { byte(6)? } else { 255 };
    Ok(make_rgba(byte(0)?, byte(2)?, byte(4)?, a))
}

fn expect_fields<'a>(op: &str, arg: &'a str, n: usize) -> Result<Vec<&'a str>> {
    let fields: Vec<&str> = arg.split(',').collect();
    if fields.len() != n {
        return Err(EngineError::invalid_op(op, format!("expected {n} comma-separated values")));
    }
    Ok(fields)
}

impl FromStr for Op {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let (name, arg) = match s.split_once('=') {
            Some((name, arg)) => (name.trim(), Some(arg)),
            None => (s.trim(), None),
        };
        let lower = name.to_lowercase();
        let needs_arg = || EngineError::invalid_op(s, "missing '=' argument");

        let op = match (lower.as_str(), arg) {
            ("scale", Some(arg)) | ("scale-wrap", Some(arg)) => {
                let (width, height) = parse_size(s, arg)?;
                Op::Scale { width, height, wrap: lower == "scale-wrap" }
            }
            ("rotate", Some(arg)) | ("rotate-tile", Some(arg)) => {
                let (angle, scale) = parse_rotation(s, arg)?;
                Op::Rotate { angle, scale, tile: lower == "rotate-tile" }
            }
            ("crop", Some(arg)) => {
                let f = expect_fields(s, arg, 4)?;
                Op::Crop {
                    x: parse_num(s, f[0])?,
                    y: parse_num(s, f[1])?,
                    width: parse_num(s, f[2])?,
                    height: parse_num(s, f[3])?,
                }
            }
            ("fill", Some(arg)) => {
                let f = expect_fields(s, arg, 4)?;
                Op::Fill {
                    x: parse_num(s, f[0])?,
                    y: parse_num(s, f[1])?,
                    color: parse_color(s, f[2])?,
                    tolerance: parse_num(s, f[3])?,
                }
            }
            ("scale" | "scale-wrap" | "rotate" | "rotate-tile" | "crop" | "fill", None) => {
                return Err(needs_arg());
            }
            ("flip-h", None) => Op::FlipH,
            ("flip-v", None) => Op::FlipV,
            ("rotate90", None) => Op::Rotate90 { clockwise: true },
            ("rotate90ccw", None) => Op::Rotate90 { clockwise: false },
            ("rotate180", None) => Op::Rotate180,
            ("invert", None) => Op::Invert,
            ("flip-h" | "flip-v" | "rotate90" | "rotate90ccw" | "rotate180" | "invert", Some(_)) => {
                return Err(EngineError::invalid_op(s, "takes no argument"));
            }
            _ => return Err(EngineError::invalid_op(s, "unknown operation")),
        };
        Ok(op)
    }
}

impl Op {
    /// Apply to the project. `false` when a long operation was cancelled.
    pub fn apply(&self, project: &mut Project, view: &mut NullView, progress: &mut LogProgress) -> Result<bool> {
        debug!("cli: {:?}", self);
        let outcome = match *self {
            Op::Scale { width, height, wrap } => transform::scale_image(project, view, progress, width, height, wrap)?,
            Op::Rotate { angle, scale, tile } => transform::rotate_image(project, view, progress, angle, scale, tile)?,
            Op::FlipH => {
                transform::mirror_image(project, view);
                Outcome::Applied
            }
            Op::FlipV => {
                transform::flip_image(project, view);
                Outcome::Applied
            }
            Op::Rotate90 { clockwise } => {
                transform::rotate_image_90(project, view, clockwise);
                Outcome::Applied
            }
            Op::Rotate180 => {
                transform::rotate_image_180(project, view);
                Outcome::Applied
            }
            Op::Invert => {
                transform::invert_image(project, view);
                Outcome::Applied
            }
            Op::Crop { x, y, width, height } => {
                crop(project, view, x, y, width, height)?;
                Outcome::Applied
            }
            Op::Fill { x, y, color, tolerance } => {
                let stats = transform::fill_image(project, view, x, y, color, tolerance);
                if stats.truncated {
                    warn!("cli: fill at ({x}, {y}) stopped early, fill stack full");
                }
                Outcome::Applied
            }
        };
        Ok(outcome == Outcome::Applied)
    }
}

/// Crop by driving the knife the way a pointer would: drag the rectangle,
/// release, commit. A rectangle partly outside the image is clamped to it.
fn crop(project: &mut Project, view: &mut NullView, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
    let op = || format!("crop={x},{y},{width},{height}");
    if width < 1 || height < 1 {
        return Err(EngineError::invalid_op(op(), "width and height must be at least 1"));
    }
    let (iw, ih) = project.image_size();
    if x >= iw || y >= ih || x.saturating_add(width) <= 0 || y.saturating_add(height) <= 0 {
        return Err(EngineError::invalid_op(op(), format!("rectangle lies outside the {iw}x{ih} image")));
    }
    let os = project.bmp().overscroll;
    let mut knife = Knife::new();
    knife.press(project, x + os, y + os);
    knife.drag(project, view, x + os + width - 1, y + os + height - 1);
    knife.release(project, view);
    knife.done(project, view, KnifeMode::Crop);
    Ok(())
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    let settings = match &args.config {
        Some(path) => match EngineSettings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => EngineSettings::settings_path()
            .map(|p| EngineSettings::load_or_default(&p))
            .unwrap_or_default(),
    };

    // Resolve glob patterns / literal paths → concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: {}", EngineError::NoInputs);
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let save_format = parse_format(args.format.as_deref(), args.output.as_deref());

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref(), save_format)
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &args.ops, args.undo, args.quality, &settings) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

pub fn run_one(
    input: &Path,
    output: &Path,
    ops: &[Op],
    undo: usize,
    quality: u8,
    settings: &EngineSettings,
) -> Result<()> {
    let bmp = load_bitmap(input, settings.overscroll, &settings.style)?;
    let mut project = Project::from_bitmap(input.to_path_buf(), bmp, settings.clone());
    let mut view = NullView::default();
    let mut progress = LogProgress::default();

    for op in ops {
        if !op.apply(&mut project, &mut view, &mut progress)? {
            warn!("cli: {:?} cancelled", op);
        }
    }

    for step in 0..undo {
        if !project.undo(&mut view) {
            warn!("cli: only {} of {} undo steps available", step, undo);
            break;
        }
    }

    save_bitmap(project.bmp(), output, quality)?;
    project.mark_clean();
    info!("cli: {} -> {} ({:?})", input.display(), output.display(), project.image_size());
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    warn!("pattern '{}' matched no files", pattern);
                }
            }
            Err(e) => {
                warn!("invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> SaveFormat {
    format_arg
        .and_then(SaveFormat::from_extension)
        .or_else(|| output.and_then(SaveFormat::from_path))
        .unwrap_or(SaveFormat::Png)
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::make_rgb;

    #[test]
    fn parses_every_operation() {
        assert_eq!("scale=320x240".parse::<Op>().unwrap(), Op::Scale { width: 320, height: 240, wrap: false });
        assert_eq!("scale-wrap=8X8".parse::<Op>().unwrap(), Op::Scale { width: 8, height: 8, wrap: true });
        assert_eq!("rotate=30".parse::<Op>().unwrap(), Op::Rotate { angle: 30.0, scale: 1.0, tile: false });
        assert_eq!(
            "rotate-tile=-45@0.5".parse::<Op>().unwrap(),
            Op::Rotate { angle: -45.0, scale: 0.5, tile: true }
        );
        assert_eq!("flip-h".parse::<Op>().unwrap(), Op::FlipH);
        assert_eq!("rotate90ccw".parse::<Op>().unwrap(), Op::Rotate90 { clockwise: false });
        assert_eq!(
            "crop=1,2,30,40".parse::<Op>().unwrap(),
            Op::Crop { x: 1, y: 2, width: 30, height: 40 }
        );
        assert_eq!(
            "fill=0,0,#ff8000,12".parse::<Op>().unwrap(),
            Op::Fill { x: 0, y: 0, color: make_rgb(255, 128, 0), tolerance: 12 }
        );
        assert_eq!(
            "fill=3,4,10203040,0".parse::<Op>().unwrap(),
            Op::Fill { x: 3, y: 4, color: make_rgba(0x10, 0x20, 0x30, 0x40), tolerance: 0 }
        );
    }

    #[test]
    fn rejects_malformed_operations() {
        for bad in ["scale", "scale=12", "rotate=abc", "crop=1,2,3", "fill=0,0,fff,1", "invert=1", "sharpen"] {
            assert!(
                matches!(bad.parse::<Op>(), Err(EngineError::InvalidOp { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn format_priority() {
        assert_eq!(parse_format(Some("JPG"), Some(Path::new("x.png"))), SaveFormat::Jpeg);
        assert_eq!(parse_format(None, Some(Path::new("x.tga"))), SaveFormat::Tga);
        assert_eq!(parse_format(Some("nope"), None), SaveFormat::Png);
    }

    #[test]
    fn output_path_avoids_input() {
        let input = Path::new("dir/photo.png");
        assert_eq!(
            build_output_path(input, None, None, SaveFormat::Png),
            Some(PathBuf::from("dir/photo_out.png"))
        );
        assert_eq!(
            build_output_path(input, None, None, SaveFormat::Jpeg),
            Some(PathBuf::from("dir/photo.jpg"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out")), SaveFormat::Webp),
            Some(PathBuf::from("out/photo.webp"))
        );
    }

    #[test]
    fn crop_outside_image_is_rejected() {
        let mut project = Project::new_untitled(1, 10, 10, EngineSettings::default());
        let mut view = NullView::default();
        for arg in ["crop=10,0,4,4", "crop=0,12,4,4", "crop=-5,0,5,4", "crop=2,2,0,3"] {
            let op: Op = arg.parse().unwrap();
            let result = op.apply(&mut project, &mut view, &mut LogProgress::default());
            assert!(matches!(result, Err(EngineError::InvalidOp { .. })), "{arg} should be rejected");
        }
        assert_eq!(project.image_size(), (10, 10));
        assert!(!project.history.can_undo());

        // partly outside is clamped to the image
        let op: Op = "crop=8,-3,10,5".parse().unwrap();
        assert!(op.apply(&mut project, &mut view, &mut LogProgress::default()).unwrap());
        assert_eq!(project.image_size(), (2, 2));
    }

    #[test]
    fn crop_through_knife() {
        let settings = EngineSettings { overscroll: 3, ..Default::default() };
        let mut project = Project::new_untitled(1, 10, 10, settings);
        project.bmp_mut().setpixel_raw(3 + 4, 3 + 5, make_rgb(1, 2, 3));
        let mut view = NullView::default();
        let op: Op = "crop=4,5,3,2".parse().unwrap();
        assert!(op.apply(&mut project, &mut view, &mut LogProgress::default()).unwrap());
        assert_eq!(project.image_size(), (3, 2));
        assert_eq!(project.bmp().getpixel(3, 3), make_rgb(1, 2, 3));
    }
}
