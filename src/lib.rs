//! Picraft core - iterative raster-image editing with undo/redo.
//!
//! The crate models one edit session per image: a linear timeline of
//! committed snapshots, an uncommitted six-axis adjustment model with named
//! filter presets, a debounced preview pipeline with generation-token
//! staleness checks, and rotate/flip/crop operators that commit directly.
//! Decode and encode go through the `image` crate and are the only
//! suspension points.

pub mod logger;

pub mod cli;
pub mod error;
pub mod fit;
pub mod io;
pub mod ops;
pub mod preview;
pub mod session;
pub mod timeline;

pub use error::EditError;
pub use fit::fit_to_viewport;
pub use io::OutputFormat;
pub use ops::adjustments::AdjustmentSettings;
pub use ops::filters::FilterPreset;
pub use ops::transform::{CropShape, CropSpec, FlipDirection, RotateDirection};
pub use preview::{PreviewFrame, RefreshOutcome, RefreshScheduler, RefreshToken};
pub use session::{EditSession, ExportedImage};
pub use timeline::{Snapshot, Timeline};
