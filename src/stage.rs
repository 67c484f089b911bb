//! Mount lifecycle of the live certificate.
//!
//! The [`Stage`] exclusively owns the mounted certificate. The export engine
//! only ever sees a [`NodeHandle`], a weak reference tagged with the mount
//! generation, so an export can tell when the certificate it started on has
//! been unmounted or replaced and discard its result.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use image::ImageEncoder;
use resvg::usvg::fontdb::Database;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::ExportError;
use crate::platform::ImageFetcher;
use crate::rendering::fonts::FontBook;
use crate::rendering::svg::SceneImage;
use crate::rendering::{self, ImageSlot, RenderedCertificate, SlotId};
use crate::stats::UserStats;
use crate::ViewportClass;

/// A decoded image, normalized to PNG for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// Load state of one image slot.
#[derive(Debug, Clone)]
pub enum ImageState {
    Pending,
    Ready(Arc<DecodedImage>),
    Failed(String),
}

impl ImageState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, ImageState::Pending)
    }
}

/// Decode any supported encoding and re-encode it as RGBA PNG.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, String> {
    let img = image::load_from_memory(bytes).map_err(|e| format!("decode failed: {}", e))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png)
        .write_image(rgba.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| format!("re-encode failed: {}", e))?;
    Ok(DecodedImage { width, height, png })
}

/// A certificate while it is mounted.
#[derive(Debug)]
pub struct MountedCertificate {
    certificate: RwLock<RenderedCertificate>,
    generation: u64,
    attached: AtomicBool,
    images: HashMap<SlotId, watch::Receiver<ImageState>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    fonts: FontBook,
}

impl MountedCertificate {
    fn mount(certificate: RenderedCertificate, generation: u64, fetcher: Arc<dyn ImageFetcher>, fonts: FontBook) -> Self {
        let mut images = HashMap::new();
        let mut tasks = Vec::new();
        let runtime = tokio::runtime::Handle::try_current();

        for slot in certificate.image_slots() {
            let (tx, rx) = watch::channel(ImageState::Pending);
            images.insert(slot.id, rx);
            match &runtime {
                Ok(handle) => tasks.push(handle.spawn(load_slot(slot.clone(), fetcher.clone(), tx))),
                Err(_) => {
                    log::warn!("no async runtime; image {} will not be loaded", slot.src);
                    let _ = tx.send(ImageState::Failed("no async runtime".into()));
                }
            }
        }

        Self {
            certificate: RwLock::new(certificate),
            generation,
            attached: AtomicBool::new(true),
            images,
            tasks: Mutex::new(tasks),
            fonts,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Run `f` against the current layout.
    pub fn with_certificate<R>(&self, f: impl FnOnce(&RenderedCertificate) -> R) -> R {
        let guard = self.certificate.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    fn relayout(&self, class: ViewportClass) {
        let mut guard = self.certificate.write().unwrap_or_else(|e| e.into_inner());
        if guard.class() != class {
            *guard = guard.relayout(class);
        }
    }

    pub fn image_state(&self, slot: SlotId) -> Option<ImageState> {
        self.images.get(&slot).map(|rx| rx.borrow().clone())
    }

    /// Whether fonts are loaded and every image has reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.fonts.is_ready() && self.images.values().all(|rx| rx.borrow().is_settled())
    }

    /// Wait until fonts are loaded and no image is pending.
    ///
    /// A timeout is reported as `RenderIncomplete`; capture must not proceed.
    pub async fn settle(&self, timeout: Duration) -> Result<Arc<Database>, ExportError> {
        let wait = async {
            let fonts = self.fonts.ready().await?;
            for rx in self.images.values() {
                let mut rx = rx.clone();
                rx.wait_for(ImageState::is_settled)
                    .await
                    .map_err(|_| ExportError::Detached)?;
            }
            Ok::<_, ExportError>(fonts)
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(res) => res,
            Err(_) => {
                let pending = self.images.values().filter(|rx| !rx.borrow().is_settled()).count();
                Err(ExportError::RenderIncomplete(format!(
                    "{} image(s) and fonts ready={} after {}ms",
                    pending,
                    self.fonts.is_ready(),
                    timeout.as_millis()
                )))
            }
        }
    }

    /// Images for the scene; failed slots become placeholders.
    pub fn scene_images(&self) -> HashMap<SlotId, SceneImage> {
        self.images
            .iter()
            .map(|(slot, rx)| {
                let img = match &*rx.borrow() {
                    ImageState::Ready(img) => SceneImage::Png(Arc::new(img.png.clone())),
                    ImageState::Failed(_) | ImageState::Pending => SceneImage::Placeholder,
                };
                (*slot, img)
            })
            .collect()
    }

    fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
        for task in self.tasks.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            task.abort();
        }
    }
}

async fn load_slot(slot: ImageSlot, fetcher: Arc<dyn ImageFetcher>, tx: watch::Sender<ImageState>) {
    let state = match fetcher.fetch(&slot.src).await {
        Ok(bytes) => match tokio::task::spawn_blocking(move || decode_image(&bytes)).await {
            Ok(Ok(img)) => ImageState::Ready(Arc::new(img)),
            Ok(Err(reason)) => ImageState::Failed(reason),
            Err(e) => ImageState::Failed(format!("decode task failed: {}", e)),
        },
        Err(reason) => ImageState::Failed(reason),
    };
    match &state {
        ImageState::Failed(reason) => log::warn!("image {} failed to load: {}", slot.src, reason),
        _ => log::debug!("image {} decoded", slot.src),
    }
    let _ = tx.send(state);
}

/// Non-owning reference to a mounted certificate.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    node: Weak<MountedCertificate>,
    generation: u64,
}

impl NodeHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The mounted certificate, unless it has been unmounted or replaced.
    pub fn upgrade(&self) -> Option<Arc<MountedCertificate>> {
        self.node.upgrade().filter(|n| n.is_attached())
    }

    pub fn is_attached(&self) -> bool {
        self.upgrade().is_some()
    }
}

/// Owner of the live certificate.
#[derive(Debug)]
pub struct Stage {
    fetcher: Arc<dyn ImageFetcher>,
    fonts: FontBook,
    class: ViewportClass,
    current: Option<Arc<MountedCertificate>>,
    generation: u64,
}

impl Stage {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, fonts: FontBook, class: ViewportClass) -> Self {
        Self {
            fetcher,
            fonts,
            class,
            current: None,
            generation: 0,
        }
    }

    pub fn viewport_class(&self) -> ViewportClass {
        self.class
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Render and mount `stats`, replacing any current certificate.
    pub fn mount(&mut self, stats: &UserStats) -> crate::Result<NodeHandle> {
        let certificate = rendering::render(stats, self.class)?;
        Ok(self.mount_rendered(certificate))
    }

    /// Mount an already rendered certificate (relaid out for this stage's
    /// viewport class if needed).
    pub fn mount_rendered(&mut self, certificate: RenderedCertificate) -> NodeHandle {
        self.unmount();
        self.generation += 1;
        let certificate = certificate.relayout(self.class);
        let mounted = Arc::new(MountedCertificate::mount(
            certificate,
            self.generation,
            self.fetcher.clone(),
            self.fonts.clone(),
        ));
        let handle = NodeHandle {
            node: Arc::downgrade(&mounted),
            generation: self.generation,
        };
        self.current = Some(mounted);
        handle
    }

    /// Detach the current certificate; outstanding handles stop resolving.
    pub fn unmount(&mut self) {
        if let Some(current) = self.current.take() {
            log::debug!("unmounting certificate generation {}", current.generation());
            current.detach();
        }
    }

    /// Lay the mounted certificate out for a new viewport width.
    pub fn resize(&mut self, viewport: crate::Viewport) {
        self.class = viewport.class();
        if let Some(current) = &self.current {
            current.relayout(self.class);
        }
    }

    pub fn handle(&self) -> Option<NodeHandle> {
        self.current.as_ref().map(|m| NodeHandle {
            node: Arc::downgrade(m),
            generation: m.generation(),
        })
    }

    pub fn current(&self) -> Option<&Arc<MountedCertificate>> {
        self.current.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.current.is_some()
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::NoopImageFetcher;

    fn stage() -> Stage {
        Stage::new(Arc::new(NoopImageFetcher), FontBook::empty(), ViewportClass::Wide)
    }

    #[tokio::test]
    async fn remount_detaches_previous_handle() {
        let mut stage = stage();
        let first = stage.mount(&UserStats::named("Ana")).unwrap();
        assert!(first.is_attached());
        let second = stage.mount(&UserStats::named("Bo")).unwrap();
        assert!(!first.is_attached());
        assert!(second.is_attached());
        assert!(second.generation() > first.generation());
        stage.unmount();
        assert!(!second.is_attached());
    }

    #[tokio::test]
    async fn failed_image_settles_to_placeholder() {
        let mut stage = stage();
        let mut stats = UserStats::named("Ana");
        stats.avatar_url = Some("https://example.invalid/avatar/xlarge".into());
        let handle = stage.mount(&stats).unwrap();
        let node = handle.upgrade().unwrap();
        node.settle(Duration::from_secs(5)).await.unwrap();
        assert!(node.is_settled());
        assert!(matches!(node.image_state(SlotId(0)), Some(ImageState::Failed(_))));
        assert!(matches!(node.scene_images().get(&SlotId(0)), Some(SceneImage::Placeholder)));
    }

    #[tokio::test]
    async fn resize_keeps_issue_date_and_changes_width() {
        let mut stage = stage();
        let handle = stage.mount(&UserStats::named("Ana")).unwrap();
        let node = handle.upgrade().unwrap();
        let (wide_w, issued) = node.with_certificate(|c| (c.measure().width, c.issued()));
        stage.resize(crate::Viewport { width: 390, height: 844 });
        let (compact_w, issued_after) = node.with_certificate(|c| (c.measure().width, c.issued()));
        assert!(compact_w < wide_w);
        assert_eq!(issued, issued_after);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_image(b"not an image").is_err());
    }

    #[test]
    fn decode_normalizes_to_png() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));
        let mut png = Vec::new();
        image::codecs::png::PngEncoder::new(&mut png)
            .write_image(img.as_raw(), 3, 2, image::ExtendedColorType::Rgba8)
            .unwrap();
        let decoded = decode_image(&png).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert!(decoded.png.starts_with(b"\x89PNG"));
    }
}
