// ============================================================================
// EDIT SESSION - one image, one timeline, one preview pipeline
// ============================================================================
//
// The session owns all mutable editing state: the snapshot timeline, the
// slider settings, the filter selection, and the transient preview frame.
// It is a plain owned struct, one per edited image; dropping it discards the
// whole history. All methods run on one logical thread and suspend only at
// the codec boundary.

use std::time::Duration;

use image::RgbaImage;
use uuid::Uuid;

use crate::error::EditError;
use crate::io::{self, OutputFormat};
use crate::ops::adjustments::{self, AdjustmentSettings};
use crate::ops::filters::{self, FilterPreset};
use crate::ops::transform::{self, CropSpec, FlipDirection, RotateDirection};
use crate::preview::{PreviewFrame, RefreshOutcome, RefreshScheduler, RefreshToken};
use crate::timeline::{Snapshot, Timeline};
use crate::{log_info, log_warn};

/// Which edit state drives the next preview render. Sliders and filter both
/// persist; the last writer is authoritative, so clearing the filter falls
/// back to the slider-driven look without losing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveLook {
    Sliders,
    Preset,
}

/// Re-encoded output for the download surface.
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

pub struct EditSession {
    id: Uuid,
    timeline: Timeline,
    adjustments: AdjustmentSettings,
    filter: Option<FilterPreset>,
    active_look: ActiveLook,
    preview: Option<PreviewFrame>,
    scheduler: RefreshScheduler,
    source_name: Option<String>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::with_debounce(crate::preview::DEFAULT_DEBOUNCE)
    }

    /// Session with a custom quiescence window. The headless CLI uses a zero
    /// window since there is no slider to wait for.
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            timeline: Timeline::new(),
            adjustments: AdjustmentSettings::default(),
            filter: None,
            active_look: ActiveLook::Sliders,
            preview: None,
            scheduler: RefreshScheduler::new(debounce),
            source_name: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn has_image(&self) -> bool {
        !self.timeline.is_empty()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn adjustments(&self) -> AdjustmentSettings {
        self.adjustments
    }

    pub fn filter(&self) -> Option<FilterPreset> {
        self.filter
    }

    pub fn preview(&self) -> Option<&PreviewFrame> {
        self.preview.as_ref()
    }

    /// The current committed snapshot. Also the payload handed to the
    /// external colorize exchange, which only needs the encoded bytes.
    pub fn current_snapshot(&self) -> Result<&Snapshot, EditError> {
        self.timeline.current()
    }

    // ------------------------------------------------------------------
    //  Acquisition
    // ------------------------------------------------------------------

    /// Seed the session with freshly acquired encoded bytes, discarding any
    /// previous history. The bytes are decoded up front so a corrupt
    /// acquisition fails cleanly and leaves the session untouched.
    pub async fn load_image(
        &mut self,
        bytes: Vec<u8>,
        source_name: Option<&str>,
    ) -> Result<(u32, u32), EditError> {
        let snapshot = Snapshot::new(bytes);
        let decoded = io::decode(snapshot.clone()).await?;
        let dimensions = decoded.dimensions();

        self.timeline.clear();
        self.timeline.append(snapshot);
        self.source_name = source_name.map(str::to_owned);
        self.reset_edit_state();

        let token = self.scheduler.immediate();
        self.preview = Some(PreviewFrame {
            image: decoded,
            generation: token.generation(),
        });

        log_info!(
            "[session {}] loaded {} ({}x{})",
            self.id,
            source_name.unwrap_or("<unnamed>"),
            dimensions.0,
            dimensions.1
        );
        Ok(dimensions)
    }

    // ------------------------------------------------------------------
    //  Adjustment model + filter selection
    // ------------------------------------------------------------------

    /// Replace the slider state. Values are clamped into range. The sliders
    /// become the authoritative look and the returned token carries the
    /// debounce window; a newer edit supersedes it.
    pub fn set_adjustments(&mut self, settings: AdjustmentSettings) -> RefreshToken {
        self.adjustments = settings.clamped();
        self.active_look = ActiveLook::Sliders;
        self.scheduler.debounced()
    }

    /// Select a named filter (or clear it with `None`). Filter switches take
    /// the zero-delay path. Selecting makes the preset authoritative;
    /// clearing hands authority back to the sliders, whose state is intact.
    pub fn select_filter(&mut self, preset: Option<FilterPreset>) -> RefreshToken {
        self.filter = preset;
        self.active_look = match preset {
            Some(_) => ActiveLook::Preset,
            None => ActiveLook::Sliders,
        };
        self.scheduler.immediate()
    }

    /// Discard pending slider/filter edits and force an immediate re-render
    /// from the current snapshot. The timeline is untouched.
    pub fn reset(&mut self) -> RefreshToken {
        self.reset_edit_state();
        self.scheduler.immediate()
    }

    // ------------------------------------------------------------------
    //  Preview pipeline
    // ------------------------------------------------------------------

    /// Wait out the token's quiescence window, then render. The usual way to
    /// drive the pipeline when calls are serialized on one task.
    pub async fn refresh(&mut self, token: RefreshToken) -> Result<RefreshOutcome, EditError> {
        if !token.quiesce().await {
            return Ok(RefreshOutcome::Superseded);
        }
        self.render_preview(&token).await
    }

    /// Render the preview for `token` if it is still the latest refresh.
    /// Checks the generation again after the decode suspension point, so a
    /// render that was overtaken mid-decode is dropped, not displayed.
    pub async fn render_preview(
        &mut self,
        token: &RefreshToken,
    ) -> Result<RefreshOutcome, EditError> {
        if !token.is_current() {
            return Ok(RefreshOutcome::Superseded);
        }
        let composed = self.compose_current().await?;
        if !token.is_current() {
            return Ok(RefreshOutcome::Superseded);
        }
        self.preview = Some(PreviewFrame {
            image: composed,
            generation: token.generation(),
        });
        Ok(RefreshOutcome::Rendered)
    }

    /// Decode the cursor snapshot and apply the authoritative look.
    async fn compose_current(&self) -> Result<RgbaImage, EditError> {
        let snapshot = self.timeline.current()?.clone();
        let decoded = io::decode(snapshot).await?;
        Ok(self.apply_look(decoded))
    }

    fn apply_look(&self, decoded: RgbaImage) -> RgbaImage {
        match self.active_look {
            ActiveLook::Preset => match self.filter {
                Some(preset) => filters::apply(preset, &decoded),
                None => decoded,
            },
            ActiveLook::Sliders => {
                if self.adjustments.is_neutral() {
                    decoded
                } else {
                    adjustments::apply(&self.adjustments, &decoded)
                }
            }
        }
    }

    /// What the user is looking at right now: the preview frame when it is
    /// fresh, otherwise a re-render under the active look. Operators always
    /// transform this, never a stale frame.
    async fn displayed_bitmap(&mut self) -> Result<RgbaImage, EditError> {
        if let Some(frame) = &self.preview {
            if frame.generation == self.scheduler.current_generation() {
                return Ok(frame.image.clone());
            }
        }
        self.compose_current().await
    }

    // ------------------------------------------------------------------
    //  Commit gate + transform operators
    // ------------------------------------------------------------------

    /// Bake the displayed preview into a new snapshot. Calling twice with no
    /// intervening edit appends two structurally identical snapshots; that
    /// is accepted, not deduplicated.
    pub async fn apply(&mut self) -> Result<(), EditError> {
        self.ensure_image()?;
        let baked = self.displayed_bitmap().await?;
        self.commit_bitmap(baked, "apply").await
    }

    /// Rotate the displayed bitmap 90 degrees and commit immediately,
    /// bypassing the debounce path.
    pub async fn rotate(&mut self, direction: RotateDirection) -> Result<(), EditError> {
        self.ensure_image()?;
        let src = self.displayed_bitmap().await?;
        if src.width() == 0 || src.height() == 0 {
            return Err(EditError::EmptyFrame);
        }
        let rotated = transform::rotate_quarter(&src, direction);
        self.commit_bitmap(rotated, "rotate").await
    }

    /// Mirror the displayed bitmap and commit immediately.
    pub async fn flip(&mut self, direction: FlipDirection) -> Result<(), EditError> {
        self.ensure_image()?;
        let src = self.displayed_bitmap().await?;
        if src.width() == 0 || src.height() == 0 {
            return Err(EditError::EmptyFrame);
        }
        let flipped = transform::flip(&src, direction);
        self.commit_bitmap(flipped, "flip").await
    }

    /// Apply a confirmed crop selection and commit immediately. Changing the
    /// selection before confirming never reaches the timeline; this method
    /// is the confirmation.
    pub async fn crop(&mut self, spec: &CropSpec) -> Result<(), EditError> {
        self.ensure_image()?;
        let src = self.displayed_bitmap().await?;
        let cropped = transform::crop(&src, spec)?;
        self.commit_bitmap(cropped, "crop").await
    }

    /// Encode and append a freshly produced bitmap, then reset the edit
    /// state and re-render. On encode failure nothing is appended and the
    /// edit state is left as it was.
    async fn commit_bitmap(&mut self, bitmap: RgbaImage, what: &str) -> Result<(), EditError> {
        let bytes = io::encode(bitmap.clone(), OutputFormat::Png, 100).await?;
        self.timeline.append(Snapshot::new(bytes));
        self.reset_edit_state();

        let token = self.scheduler.immediate();
        self.preview = Some(PreviewFrame {
            image: bitmap,
            generation: token.generation(),
        });

        log_info!(
            "[session {}] committed {} (history {}/{})",
            self.id,
            what,
            self.timeline.cursor() + 1,
            self.timeline.len()
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    //  History navigation
    // ------------------------------------------------------------------

    /// Move the cursor back one snapshot. Pending edits are discarded and
    /// the preview re-renders immediately. No-op at the first entry.
    pub async fn undo(&mut self) -> Result<bool, EditError> {
        if !self.timeline.undo() {
            return Ok(false);
        }
        self.on_cursor_moved("undo").await?;
        Ok(true)
    }

    /// Move the cursor forward one snapshot. No-op at the tail.
    pub async fn redo(&mut self) -> Result<bool, EditError> {
        if !self.timeline.redo() {
            return Ok(false);
        }
        self.on_cursor_moved("redo").await?;
        Ok(true)
    }

    async fn on_cursor_moved(&mut self, what: &str) -> Result<(), EditError> {
        self.reset_edit_state();
        let token = self.scheduler.immediate();
        self.render_preview(&token).await?;
        log_info!(
            "[session {}] {} -> history {}/{}",
            self.id,
            what,
            self.timeline.cursor() + 1,
            self.timeline.len()
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    //  Download surface
    // ------------------------------------------------------------------

    /// Re-encode the current snapshot into the requested container and
    /// suggest a download filename.
    pub async fn export(
        &self,
        format: OutputFormat,
        quality: u8,
    ) -> Result<ExportedImage, EditError> {
        let snapshot = self.timeline.current()?.clone();
        let decoded = io::decode(snapshot).await?;
        let bytes = io::encode(decoded, format, quality).await?;
        let file_name = io::suggested_filename(self.source_name.as_deref(), format);
        log_info!(
            "[session {}] exported {} ({} bytes)",
            self.id,
            file_name,
            bytes.len()
        );
        Ok(ExportedImage { bytes, file_name })
    }

    // ------------------------------------------------------------------

    fn ensure_image(&self) -> Result<(), EditError> {
        if self.timeline.is_empty() {
            log_warn!("[session {}] operator invoked with no active image", self.id);
            return Err(EditError::NoActiveImage);
        }
        Ok(())
    }

    fn reset_edit_state(&mut self) {
        self.adjustments = AdjustmentSettings::default();
        self.filter = None;
        self.active_look = ActiveLook::Sliders;
    }
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 31 % 256) as u8, (y * 53 % 256) as u8, 160, 255])
        })
    }

    async fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        io::encode(img.clone(), OutputFormat::Png, 100).await.unwrap()
    }

    async fn loaded_session(img: &RgbaImage) -> EditSession {
        let mut session = EditSession::new();
        session
            .load_image(png_bytes(img).await, Some("test.png"))
            .await
            .unwrap();
        session
    }

    fn brighter() -> AdjustmentSettings {
        AdjustmentSettings {
            brightness: 150.0,
            ..AdjustmentSettings::default()
        }
    }

    #[tokio::test]
    async fn operators_require_an_image() {
        let mut session = EditSession::new();
        assert!(matches!(
            session.rotate(RotateDirection::Clockwise).await,
            Err(EditError::NoActiveImage)
        ));
        assert!(matches!(
            session.flip(FlipDirection::Horizontal).await,
            Err(EditError::NoActiveImage)
        ));
        assert!(matches!(
            session.crop(&CropSpec::rect(0, 0, 1, 1)).await,
            Err(EditError::NoActiveImage)
        ));
        assert!(matches!(session.apply().await, Err(EditError::NoActiveImage)));
    }

    #[tokio::test]
    async fn corrupt_acquisition_leaves_the_session_empty() {
        let mut session = EditSession::new();
        let err = session.load_image(vec![1, 2, 3, 4], None).await;
        assert!(matches!(err, Err(EditError::DecodeFailure(_))));
        assert!(!session.has_image());
        assert!(session.preview().is_none());
    }

    #[tokio::test]
    async fn load_seeds_timeline_and_preview() {
        let img = gradient(4, 3);
        let session = loaded_session(&img).await;
        assert_eq!(session.timeline().len(), 1);
        assert_eq!(session.timeline().cursor(), 0);
        let preview = session.preview().unwrap();
        assert_eq!(preview.dimensions(), (4, 3));
        assert_eq!(preview.image.as_raw(), img.as_raw());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_edit_supersedes_a_pending_refresh() {
        let img = gradient(4, 4);
        let mut session = loaded_session(&img).await;

        let stale = session.set_adjustments(AdjustmentSettings {
            brightness: 50.0,
            ..AdjustmentSettings::default()
        });
        let fresh = session.set_adjustments(brighter());

        assert_eq!(
            session.refresh(stale).await.unwrap(),
            RefreshOutcome::Superseded
        );
        assert_eq!(
            session.refresh(fresh).await.unwrap(),
            RefreshOutcome::Rendered
        );

        let expected = adjustments::apply(&brighter(), &img);
        assert_eq!(
            session.preview().unwrap().image.as_raw(),
            expected.as_raw()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_render_never_overwrites_the_preview() {
        let img = gradient(4, 4);
        let mut session = loaded_session(&img).await;

        let before = session.preview().unwrap().image.clone();
        let stale = session.set_adjustments(brighter());
        // A newer refresh lands while the stale one would be decoding.
        let _fresh = session.set_adjustments(AdjustmentSettings::default());
        assert_eq!(
            session.render_preview(&stale).await.unwrap(),
            RefreshOutcome::Superseded
        );
        // Preview still shows the earlier frame.
        assert_eq!(session.preview().unwrap().image.as_raw(), before.as_raw());
    }

    #[tokio::test]
    async fn filter_overrides_and_releases_the_slider_look() {
        let img = gradient(4, 4);
        let mut session = loaded_session(&img).await;

        let token = session.set_adjustments(brighter());
        session.render_preview(&token).await.unwrap();
        let slider_look = session.preview().unwrap().image.clone();

        let token = session.select_filter(Some(FilterPreset::Grayscale));
        session.render_preview(&token).await.unwrap();
        let filtered = session.preview().unwrap().image.clone();
        assert_eq!(filtered.as_raw(), filters::apply(FilterPreset::Grayscale, &img).as_raw());
        assert_ne!(filtered.as_raw(), slider_look.as_raw());
        // Slider state survives while the preset is authoritative.
        assert_eq!(session.adjustments(), brighter());

        let token = session.select_filter(None);
        session.render_preview(&token).await.unwrap();
        assert_eq!(session.preview().unwrap().image.as_raw(), slider_look.as_raw());
    }

    #[tokio::test]
    async fn reset_discards_pending_edits() {
        let img = gradient(4, 4);
        let mut session = loaded_session(&img).await;

        let token = session.set_adjustments(brighter());
        session.render_preview(&token).await.unwrap();
        let token = session.reset();
        session.render_preview(&token).await.unwrap();

        assert!(session.adjustments().is_neutral());
        assert_eq!(session.timeline().len(), 1);
        assert_eq!(session.preview().unwrap().image.as_raw(), img.as_raw());
    }

    #[tokio::test]
    async fn apply_commits_the_previewed_look() {
        let img = gradient(4, 4);
        let mut session = loaded_session(&img).await;

        let token = session.set_adjustments(brighter());
        session.render_preview(&token).await.unwrap();
        session.apply().await.unwrap();

        assert_eq!(session.timeline().len(), 2);
        assert_eq!(session.timeline().cursor(), 1);
        assert!(session.adjustments().is_neutral());
        assert_eq!(session.filter(), None);

        let expected = adjustments::apply(&brighter(), &img);
        assert_eq!(session.preview().unwrap().image.as_raw(), expected.as_raw());
    }

    #[tokio::test]
    async fn double_apply_appends_identical_snapshots() {
        let img = gradient(4, 4);
        let mut session = loaded_session(&img).await;
        session.apply().await.unwrap();
        session.apply().await.unwrap();

        let entries = session.timeline().entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].bytes(), entries[2].bytes());
    }

    #[tokio::test]
    async fn commit_after_undo_discards_the_redo_tail() {
        // Acquire A, commit adjusted B, undo back to A, rotate into C:
        // the timeline ends as [A, C] with the cursor on C.
        let img = gradient(4, 2);
        let mut session = loaded_session(&img).await;

        let token = session.set_adjustments(brighter());
        session.render_preview(&token).await.unwrap();
        session.apply().await.unwrap();
        assert_eq!(session.timeline().len(), 2);

        assert!(session.undo().await.unwrap());
        assert_eq!(session.timeline().cursor(), 0);
        assert_eq!(session.preview().unwrap().image.as_raw(), img.as_raw());

        session.rotate(RotateDirection::Clockwise).await.unwrap();
        assert_eq!(session.timeline().len(), 2);
        assert_eq!(session.timeline().cursor(), 1);
        assert!(!session.timeline().can_redo());
        assert_eq!(session.preview().unwrap().dimensions(), (2, 4));
    }

    #[tokio::test]
    async fn commit_count_matches_the_history_law() {
        // N commits, U undos, one more commit: len == N - U + 1.
        let img = gradient(3, 3);
        let mut session = loaded_session(&img).await;
        let n = 4;
        let u = 2;
        for _ in 0..n {
            session.apply().await.unwrap();
        }
        for _ in 0..u {
            assert!(session.undo().await.unwrap());
        }
        session.apply().await.unwrap();
        // The acquisition snapshot occupies slot zero on top of the law.
        assert_eq!(session.timeline().len(), n - u + 1 + 1);
        assert_eq!(session.timeline().cursor(), session.timeline().len() - 1);
    }

    #[tokio::test]
    async fn undo_and_redo_clamp_at_the_boundaries() {
        let img = gradient(3, 3);
        let mut session = loaded_session(&img).await;
        assert!(!session.undo().await.unwrap());

        session.apply().await.unwrap();
        assert!(session.undo().await.unwrap());
        assert!(!session.undo().await.unwrap());
        assert!(session.redo().await.unwrap());
        assert!(!session.redo().await.unwrap());
    }

    #[tokio::test]
    async fn cursor_movement_resets_pending_edits() {
        let img = gradient(4, 4);
        let mut session = loaded_session(&img).await;
        session.apply().await.unwrap();

        let _ = session.set_adjustments(brighter());
        assert!(session.undo().await.unwrap());
        assert!(session.adjustments().is_neutral());
    }

    #[tokio::test]
    async fn rotate_round_trip_restores_pixels() {
        let img = gradient(5, 3);
        let mut session = loaded_session(&img).await;
        session.rotate(RotateDirection::Clockwise).await.unwrap();
        assert_eq!(session.preview().unwrap().dimensions(), (3, 5));
        session.rotate(RotateDirection::CounterClockwise).await.unwrap();
        assert_eq!(session.preview().unwrap().dimensions(), (5, 3));
        assert_eq!(session.preview().unwrap().image.as_raw(), img.as_raw());
        assert_eq!(session.timeline().len(), 3);
    }

    #[tokio::test]
    async fn flip_commits_an_involution() {
        let img = gradient(6, 4);
        let mut session = loaded_session(&img).await;
        session.flip(FlipDirection::Horizontal).await.unwrap();
        assert_ne!(session.preview().unwrap().image.as_raw(), img.as_raw());
        session.flip(FlipDirection::Horizontal).await.unwrap();
        assert_eq!(session.preview().unwrap().image.as_raw(), img.as_raw());
        assert_eq!(session.timeline().len(), 3);
    }

    #[tokio::test]
    async fn elliptical_crop_commits_transparent_corners() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([50, 60, 70, 255]));
        let mut session = loaded_session(&img).await;
        session
            .crop(&CropSpec::elliptical(0, 0, 8, 8))
            .await
            .unwrap();

        assert_eq!(session.timeline().len(), 2);
        let committed = session.preview().unwrap();
        assert_eq!(committed.dimensions(), (8, 8));
        assert_eq!(committed.image.get_pixel(0, 0).0[3], 0);
        assert_eq!(committed.image.get_pixel(4, 4).0, [50, 60, 70, 255]);

        // The snapshot container keeps the transparency across a reload.
        let snapshot = session.current_snapshot().unwrap().clone();
        let decoded = io::decode(snapshot).await.unwrap();
        assert_eq!(decoded.get_pixel(7, 7).0[3], 0);
    }

    #[tokio::test]
    async fn zero_area_crop_leaves_the_timeline_alone() {
        let img = gradient(8, 8);
        let mut session = loaded_session(&img).await;
        let err = session.crop(&CropSpec::rect(0, 0, 0, 4)).await;
        assert!(matches!(err, Err(EditError::EmptyFrame)));
        assert_eq!(session.timeline().len(), 1);
        assert_eq!(session.timeline().cursor(), 0);
    }

    #[tokio::test]
    async fn decode_failure_leaves_history_unchanged() {
        let img = gradient(4, 4);
        let mut session = loaded_session(&img).await;

        // Corrupt snapshot injected behind the session's back; invalidate the
        // preview so the operator has to decode it.
        session.timeline.append(Snapshot::new(vec![0, 1, 2, 3]));
        let _ = session.scheduler.immediate();

        let len_before = session.timeline().len();
        let cursor_before = session.timeline().cursor();
        let err = session.rotate(RotateDirection::Clockwise).await;
        assert!(matches!(err, Err(EditError::DecodeFailure(_))));
        assert_eq!(session.timeline().len(), len_before);
        assert_eq!(session.timeline().cursor(), cursor_before);
    }

    #[tokio::test]
    async fn export_renames_and_reencodes() {
        let img = gradient(4, 4);
        let session = loaded_session(&img).await;
        let exported = session.export(OutputFormat::Jpeg, 90).await.unwrap();
        assert_eq!(exported.file_name, "test-picraft.jpg");
        assert!(!exported.bytes.is_empty());
        // JPEG magic bytes.
        assert_eq!(&exported.bytes[..2], &[0xff, 0xd8]);
    }

    #[tokio::test]
    async fn colorize_payload_is_the_committed_snapshot() {
        let img = gradient(4, 4);
        let session = loaded_session(&img).await;
        let payload = session.current_snapshot().unwrap();
        assert_eq!(payload.bytes(), session.timeline().entries()[0].bytes());

        let empty = EditSession::new();
        assert!(matches!(
            empty.current_snapshot(),
            Err(EditError::EmptyHistory)
        ));
    }
}
