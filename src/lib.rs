// ============================================================================
// rasterkit — raster editing core
// ============================================================================
//
// Layout:
//   blend.rs      — packed colour helpers and the per-pixel blend modes
//   gamma.rs      — sRGB <-> linear tables for resampling
//   map.rs        — 8-bit overlay (selection marquee, fill bookkeeping)
//   canvas.rs     — Bitmap: clipped primitives, addressing, blit, transforms
//   ops/          — flood fill and project-level transforms
//   components/   — paint context, snapshot history, knife tool
//   project.rs    — one open document (canvas + overlay + history)
//   view.rs       — redraw / progress seams to the host application
//   io.rs, settings.rs, logger.rs, error.rs, cli.rs — outer layer
// ============================================================================

#![allow(clippy::too_many_arguments)]

pub mod blend;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod gamma;
pub mod io;
pub mod logger;
pub mod map;
pub mod ops;
pub mod project;
pub mod settings;
pub mod view;

pub use canvas::{Bitmap, BitmapView};
pub use error::{EngineError, Result};
pub use project::Project;
