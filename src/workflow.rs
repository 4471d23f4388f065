//! Top-level editor actions: generate and download.

use crate::clock::{Clock, SystemClock};
use crate::config::EditorConfig;
use crate::error::{MagEditError, Result};
use crate::gallery::{FileStore, Gallery, GalleryEntry, KeyValueStore, WorkingImage};
use crate::generation::{
    to_data_url, GenerationRequest, HttpTransport, ImageFormat, JobHandle, JobSubmitter,
    StatusPoller, Transport,
};
use crate::presets::StylePreset;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// What the editor is currently doing. Drives a loading indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Sending the generation request.
    Submitting,
    /// Waiting for the job to finish.
    Polling,
    /// Downloading the generated image.
    Fetching,
    /// Writing the result to the gallery and disk.
    Saving,
}

/// Resets the activity indicator to [`Activity::Idle`] when dropped.
struct ActivityGuard<'a> {
    tx: &'a watch::Sender<Activity>,
}

impl<'a> ActivityGuard<'a> {
    fn begin(tx: &'a watch::Sender<Activity>, activity: Activity) -> Result<Self> {
        let mut started = false;
        tx.send_if_modified(|current| {
            if *current == Activity::Idle {
                *current = activity;
                started = true;
            }
            started
        });
        if !started {
            return Err(MagEditError::Busy);
        }
        Ok(Self { tx })
    }

    fn set(&self, activity: Activity) {
        self.tx.send_replace(activity);
    }
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.tx.send_replace(Activity::Idle);
    }
}

/// Result of a completed download.
#[derive(Debug)]
#[must_use = "check storage_warning to tell the user the gallery was not updated"]
pub struct Download {
    /// Where the image was written.
    pub path: PathBuf,
    /// Detected image format.
    pub format: ImageFormat,
    /// Size of the image in bytes.
    pub size_bytes: usize,
    /// The gallery entry, if it could be persisted.
    pub entry: Option<GalleryEntry>,
    /// Why the gallery was not updated, if it was not.
    pub storage_warning: Option<MagEditError>,
    /// Wall time from first status check to file written.
    pub duration_ms: u64,
}

/// The editor session: one gallery, one working image, one cycle at a time.
pub struct Editor {
    config: EditorConfig,
    transport: Arc<dyn Transport>,
    submitter: JobSubmitter,
    poller: StatusPoller,
    gallery: Gallery,
    working_image: WorkingImage,
    clock: Arc<dyn Clock>,
    activity: watch::Sender<Activity>,
}

impl Editor {
    /// Opens an editor with HTTP transport and file-backed stores.
    pub fn open(config: EditorConfig) -> Result<Self> {
        let gallery_store = FileStore::open(config.data_dir.join("store"), config.store_quota)?;
        let session_store = FileStore::open(&config.session_dir, config.store_quota)?;
        Ok(Self::with_parts(
            config,
            Arc::new(HttpTransport::new()),
            Arc::new(gallery_store),
            Arc::new(session_store),
            Arc::new(SystemClock),
        ))
    }

    /// Assembles an editor from explicit collaborators.
    pub fn with_parts(
        config: EditorConfig,
        transport: Arc<dyn Transport>,
        gallery_store: Arc<dyn KeyValueStore>,
        session_store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let submitter = JobSubmitter::new(transport.clone(), config.generate_url.clone());
        let poller = StatusPoller::new(transport.clone(), config.poll_interval, config.max_attempts);
        let gallery = Gallery::open(gallery_store, clock.clone(), config.retention);
        let working_image = WorkingImage::new(session_store);
        let (activity, _) = watch::channel(Activity::Idle);

        Self {
            config,
            transport,
            submitter,
            poller,
            gallery,
            working_image,
            clock,
            activity,
        }
    }

    /// The result gallery.
    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    /// The session's working image.
    pub fn working_image(&self) -> &WorkingImage {
        &self.working_image
    }

    /// The editor configuration.
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Current activity.
    pub fn activity(&self) -> Activity {
        *self.activity.borrow()
    }

    /// Watches activity changes.
    pub fn subscribe(&self) -> watch::Receiver<Activity> {
        self.activity.subscribe()
    }

    /// Submits the working image (if any) restyled with `preset`.
    ///
    /// Fails with [`MagEditError::Auth`] before any activity or network call
    /// when no token is configured.
    pub async fn generate(&self, preset: &StylePreset) -> Result<JobHandle> {
        let token = self.config.api_token()?;
        let _guard = ActivityGuard::begin(&self.activity, Activity::Submitting)?;

        let mut request = GenerationRequest::new(&preset.prompt);
        if let Some(image) = self.working_image.get() {
            request = request.with_source_image(image);
        }

        tracing::info!(preset = %preset.name, edit = request.is_edit(), "submitting generation");
        self.submitter.submit(&request, &token).await
    }

    /// Waits for `handle`, saves the result to the gallery and writes it to
    /// `out_dir` as `mag-edit-<millis>.<ext>`.
    ///
    /// A gallery write failure does not fail the download; it is reported in
    /// [`Download::storage_warning`]. The working image is cleared on success.
    pub async fn download(
        &self,
        handle: &JobHandle,
        preset: &StylePreset,
        out_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Download> {
        let token = self.config.api_token()?;
        let guard = ActivityGuard::begin(&self.activity, Activity::Polling)?;
        let start = Instant::now();

        let artifact_url = self
            .poller
            .poll(handle, &token, cancel)
            .await?
            .into_artifact_url()?;
        tracing::debug!(url = %artifact_url, "generation complete");

        guard.set(Activity::Fetching);
        let data = self.fetch_artifact(&artifact_url).await?;
        let format = ImageFormat::from_magic_bytes(&data).unwrap_or_default();

        guard.set(Activity::Saving);
        let entry = self.gallery.new_entry(to_data_url(&data), &preset.name);
        let (entry, storage_warning) = match self.gallery.save(entry.clone()) {
            Ok(()) => (Some(entry), None),
            Err(e) => {
                tracing::warn!(error = %e, "could not save to gallery");
                (None, Some(e))
            }
        };

        tokio::fs::create_dir_all(out_dir).await?;
        let path = out_dir.join(download_filename(self.clock.now_millis(), format));
        tokio::fs::write(&path, &data).await?;

        if let Err(e) = self.working_image.clear() {
            tracing::warn!(error = %e, "failed to clear working image");
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(path = %path.display(), size_bytes = data.len(), duration_ms, "image downloaded");

        Ok(Download {
            path,
            format,
            size_bytes: data.len(),
            entry,
            storage_warning,
            duration_ms,
        })
    }

    /// Runs a full cycle: [`generate`](Self::generate) then
    /// [`download`](Self::download).
    pub async fn run(
        &self,
        preset: &StylePreset,
        out_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<Download> {
        let handle = self.generate(preset).await?;
        self.download(&handle, preset, out_dir, cancel).await
    }

    async fn fetch_artifact(&self, url: &str) -> Result<Vec<u8>> {
        let fetched = self.transport.fetch_bytes(url).await?;
        match fetched.status {
            200..=299 => Ok(fetched.data),
            403 | 410 => Err(MagEditError::UrlExpired),
            status => Err(MagEditError::remote(Some(status), "Failed to download image")),
        }
    }
}

/// File name offered for a downloaded image.
pub fn download_filename(millis: i64, format: ImageFormat) -> String {
    format!("mag-edit-{}.{}", millis, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ErrorKind;
    use crate::gallery::{MemoryStore, GALLERY_KEY};
    use crate::generation::transport::testing::{Reply, ScriptedTransport};
    use serde_json::json;
    use std::time::Duration;

    const NOW: i64 = 1_700_000_000_000;
    const STATUS_URL: &str = "https://engine.example/status/L";
    const ARTIFACT_URL: &str = "https://cdn.example/A.png";
    const PNG: [u8; 16] = [
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, 0x49, 0x48, 0x44, 0x52,
    ];

    struct Fixture {
        editor: Editor,
        transport: Arc<ScriptedTransport>,
        gallery_store: Arc<MemoryStore>,
        session_store: Arc<MemoryStore>,
        out: tempfile::TempDir,
    }

    fn config(token: Option<&str>) -> EditorConfig {
        let mut builder = EditorConfig::builder()
            .poll_interval(Duration::ZERO)
            .data_dir("/unused")
            .session_dir("/unused");
        if let Some(token) = token {
            builder = builder.api_token(token);
        }
        builder.build().unwrap()
    }

    fn fixture(
        config: EditorConfig,
        transport: ScriptedTransport,
        gallery_store: MemoryStore,
    ) -> Fixture {
        let transport = Arc::new(transport);
        let gallery_store = Arc::new(gallery_store);
        let session_store = Arc::new(MemoryStore::new());
        let editor = Editor::with_parts(
            config,
            transport.clone(),
            gallery_store.clone(),
            session_store.clone(),
            Arc::new(ManualClock::new(NOW)),
        );
        Fixture {
            editor,
            transport,
            gallery_store,
            session_store,
            out: tempfile::tempdir().unwrap(),
        }
    }

    fn happy_transport(pending: usize) -> ScriptedTransport {
        ScriptedTransport::new()
            .json(200, json!({"status_url": STATUS_URL}))
            .pending(pending)
            .json(
                200,
                json!({"status": "COMPLETED", "result": {"image_url": ARTIFACT_URL}}),
            )
            .artifact(200, PNG.to_vec())
    }

    #[tokio::test]
    async fn test_end_to_end_prompt_only() {
        let fx = fixture(config(Some("token")), happy_transport(2), MemoryStore::new());
        let preset = StylePreset::new("Vogue", "vogue cover");

        let handle = fx.editor.generate(&preset).await.unwrap();
        assert_eq!(handle.status_url(), STATUS_URL);

        let download = fx
            .editor
            .download(&handle, &preset, fx.out.path(), &CancellationToken::new())
            .await
            .unwrap();

        let calls = fx.transport.calls();
        assert_eq!(calls[0].body, Some(json!({"prompt": "vogue cover", "sync": false})));
        assert_eq!(calls.iter().filter(|c| c.method == "GET").count(), 3);
        assert_eq!(calls.last().unwrap().url, ARTIFACT_URL);

        let entries = fx.editor.gallery().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].style_name, "Vogue");
        assert_eq!(download.entry.as_ref(), Some(&entries[0]));
        assert!(download.storage_warning.is_none());

        assert_eq!(download.format, ImageFormat::Png);
        assert_eq!(
            download.path.file_name().unwrap().to_str().unwrap(),
            format!("mag-edit-{NOW}.png")
        );
        assert_eq!(std::fs::read(&download.path).unwrap(), PNG.to_vec());
        assert_eq!(fx.editor.activity(), Activity::Idle);
    }

    #[tokio::test]
    async fn test_working_image_sent_and_cleared() {
        let fx = fixture(config(Some("token")), happy_transport(0), MemoryStore::new());
        let url = fx.editor.working_image().set_from_bytes(&PNG).unwrap();
        let preset = StylePreset::find("GQ").unwrap();

        fx.editor
            .run(&preset, fx.out.path(), &CancellationToken::new())
            .await
            .unwrap();

        let body = fx.transport.calls()[0].body.clone().unwrap();
        assert_eq!(body["images"], json!([url]));
        assert_eq!(fx.editor.working_image().get(), None);
        assert_eq!(fx.session_store.get("selectedImage").unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_token_is_auth_error_without_activity() {
        if std::env::var(crate::config::API_TOKEN_ENV).is_ok() {
            return;
        }
        let fx = fixture(config(None), ScriptedTransport::new(), MemoryStore::new());
        let activity = fx.editor.subscribe();

        let err = fx
            .editor
            .generate(&StylePreset::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(fx.transport.calls().is_empty());
        assert!(!activity.has_changed().unwrap());
        assert_eq!(fx.editor.activity(), Activity::Idle);
    }

    #[tokio::test]
    async fn test_timeout_leaves_gallery_unchanged() {
        let transport = ScriptedTransport::new()
            .json(200, json!({"status_url": STATUS_URL}))
            .pending(30);
        let fx = fixture(config(Some("token")), transport, MemoryStore::new());

        let err = fx
            .editor
            .run(&StylePreset::default(), fx.out.path(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MagEditError::TimedOut { attempts: 30 }));
        assert!(fx.editor.gallery().is_empty());
        assert_eq!(fx.gallery_store.get(GALLERY_KEY).unwrap(), None);
        assert_eq!(fx.editor.activity(), Activity::Idle);
        assert_eq!(std::fs::read_dir(fx.out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_failed_job_surfaces_reason() {
        let transport = ScriptedTransport::new()
            .json(200, json!({"status_url": STATUS_URL}))
            .json(200, json!({"status": "FAILED"}));
        let fx = fixture(config(Some("token")), transport, MemoryStore::new());

        let err = fx
            .editor
            .run(&StylePreset::default(), fx.out.path(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationFailed);
        assert_eq!(err.to_string(), "Image generation failed.");
        assert_eq!(fx.editor.activity(), Activity::Idle);
    }

    #[tokio::test]
    async fn test_cancelled_is_distinct_from_timeout() {
        let fx = fixture(config(Some("token")), ScriptedTransport::new(), MemoryStore::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let handle = JobHandle::new(STATUS_URL).unwrap();
        let err = fx
            .editor
            .download(&handle, &StylePreset::default(), fx.out.path(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_quota_failure_still_writes_file() {
        let fx = fixture(config(Some("token")), happy_transport(0), MemoryStore::with_quota(8));

        let download = fx
            .editor
            .run(&StylePreset::default(), fx.out.path(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(download.entry.is_none());
        assert_eq!(
            download.storage_warning.as_ref().map(MagEditError::kind),
            Some(ErrorKind::Quota)
        );
        assert!(download.path.exists());
        assert!(fx.editor.gallery().is_empty());
    }

    #[tokio::test]
    async fn test_expired_artifact_url() {
        let transport = ScriptedTransport::new()
            .json(
                200,
                json!({"status": "COMPLETED", "result": {"image_url": ARTIFACT_URL}}),
            )
            .artifact(410, Vec::new());
        let fx = fixture(config(Some("token")), transport, MemoryStore::new());

        let handle = JobHandle::new(STATUS_URL).unwrap();
        let err = fx
            .editor
            .download(&handle, &StylePreset::default(), fx.out.path(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MagEditError::UrlExpired));
        assert!(fx.editor.gallery().is_empty());
    }

    #[tokio::test]
    async fn test_submit_error_resets_activity() {
        let transport = ScriptedTransport::new().reply(Reply::Unreachable);
        let fx = fixture(config(Some("token")), transport, MemoryStore::new());

        let err = fx.editor.generate(&StylePreset::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(fx.editor.activity(), Activity::Idle);
    }

    #[test]
    fn test_second_cycle_is_rejected_while_busy() {
        let (tx, _) = watch::channel(Activity::Idle);
        let guard = ActivityGuard::begin(&tx, Activity::Polling).unwrap();
        assert!(matches!(
            ActivityGuard::begin(&tx, Activity::Submitting),
            Err(MagEditError::Busy)
        ));
        guard.set(Activity::Saving);
        assert_eq!(*tx.borrow(), Activity::Saving);
        drop(guard);
        assert_eq!(*tx.borrow(), Activity::Idle);
        assert!(ActivityGuard::begin(&tx, Activity::Submitting).is_ok());
    }

    #[test]
    fn test_download_filename() {
        assert_eq!(download_filename(42, ImageFormat::Jpeg), "mag-edit-42.jpg");
    }
}
