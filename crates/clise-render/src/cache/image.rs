//! Decoded image cache.
//!
//! Only embedded `data:` URLs are accepted. Decoding happens off the render
//! path: a miss starts a decode and returns `None`; the caller is told to
//! redraw through the `on_ready` callback once the result is in.

use crate::renderer::{ErrorContext, ErrorReporter, LogErrorReporter, RenderError, RenderResult};
use base64::Engine;
use peniko::{Blob, ImageAlphaType, ImageData, ImageFormat};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Callback invoked (possibly from a worker thread) after a decode finishes.
pub type ReadyCallback = Arc<dyn Fn() + Send + Sync>;

const SOURCE_PREVIEW_LEN: usize = 48;
/// Decoder threads shared by every source of one cache.
pub const DECODE_WORKERS: usize = 2;

/// Cache state of one image source.
#[derive(Debug, Clone)]
pub enum ImageState {
    Ready(ImageData),
    Pending,
    Failed,
}

struct Decoded {
    src: String,
    result: RenderResult<ImageData>,
}

#[cfg(not(target_arch = "wasm32"))]
struct DecodeJob {
    src: String,
    on_ready: Option<ReadyCallback>,
}

/// Caches decoded images by source string.
pub struct ImageCache {
    entries: HashMap<String, ImageState>,
    sender: Sender<Decoded>,
    receiver: Receiver<Decoded>,
    /// Job queue of the decoder threads, started on the first decode.
    #[cfg(not(target_arch = "wasm32"))]
    jobs: Option<Sender<DecodeJob>>,
    workers: usize,
    on_ready: Option<ReadyCallback>,
    reporter: Rc<dyn ErrorReporter>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("entries", &self.entries.len())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(Rc::new(LogErrorReporter))
    }
}

impl ImageCache {
    pub fn new(reporter: Rc<dyn ErrorReporter>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            entries: HashMap::new(),
            sender,
            receiver,
            #[cfg(not(target_arch = "wasm32"))]
            jobs: None,
            workers: 0,
            on_ready: None,
            reporter,
        }
    }

    /// Set the callback used to request a redraw after a decode completes.
    pub fn set_on_ready(&mut self, callback: Option<ReadyCallback>) {
        self.on_ready = callback;
    }

    pub fn set_reporter(&mut self, reporter: Rc<dyn ErrorReporter>) {
        self.reporter = reporter;
    }

    /// The decoded image for `src`, or `None` while it is unavailable.
    ///
    /// Never blocks. A first request for an embedded source starts a decode;
    /// any other source is rejected and reported.
    pub fn get_cached_image(&mut self, src: &str) -> Option<ImageData> {
        self.poll();
        match self.entries.get(src) {
            Some(ImageState::Ready(image)) => return Some(image.clone()),
            Some(ImageState::Pending | ImageState::Failed) => return None,
            None => {}
        }
        if !src.starts_with("data:") {
            self.fail(src, RenderError::UnsupportedSource(preview(src)), "load_image");
            return None;
        }
        self.entries.insert(src.to_string(), ImageState::Pending);
        self.spawn_decode(src.to_string());
        None
    }

    /// Current state of `src` without starting a decode.
    pub fn state(&self, src: &str) -> Option<&ImageState> {
        self.entries.get(src)
    }

    /// Drain finished decodes. Returns how many images became ready.
    pub fn poll(&mut self) -> usize {
        let mut ready = 0;
        while let Ok(Decoded { src, result }) = self.receiver.try_recv() {
            // A decode for an invalidated source is stale.
            if !matches!(self.entries.get(&src), Some(ImageState::Pending)) {
                continue;
            }
            match result {
                Ok(image) => {
                    log::debug!("Decoded image {}x{} from {}", image.width, image.height, preview(&src));
                    self.entries.insert(src, ImageState::Ready(image));
                    ready += 1;
                }
                Err(error) => self.fail(&src, error, "decode_image"),
            }
        }
        ready
    }

    /// Forget `src` so the next request decodes it again.
    pub fn invalidate(&mut self, src: &str) -> bool {
        self.entries.remove(src).is_some()
    }

    /// Retry every failed source on its next request.
    pub fn retry_failed(&mut self) {
        self.entries.retain(|_, state| !matches!(state, ImageState::Failed));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decoder threads started so far, never more than [`DECODE_WORKERS`].
    pub fn worker_count(&self) -> usize {
        self.workers
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, ImageState::Pending))
            .count()
    }

    /// Release every decoded image. In-flight decodes are discarded.
    pub fn clear(&mut self) {
        self.entries.clear();
        while self.receiver.try_recv().is_ok() {}
    }

    fn fail(&mut self, src: &str, error: RenderError, operation: &'static str) {
        self.reporter.report(&error, &ErrorContext::new(preview(src), operation));
        self.entries.insert(src.to_string(), ImageState::Failed);
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn_decode(&mut self, src: String) {
        if self.jobs.is_none() {
            match start_decoders(&self.sender) {
                Ok(jobs) => {
                    self.jobs = Some(jobs);
                    self.workers = DECODE_WORKERS;
                }
                Err(e) => {
                    self.fail(&src, RenderError::DecoderUnavailable(e.to_string()), "spawn_decoder");
                    return;
                }
            }
        }
        let job = DecodeJob {
            src: src.clone(),
            on_ready: self.on_ready.clone(),
        };
        let queued = self.jobs.as_ref().is_some_and(|jobs| jobs.send(job).is_ok());
        if !queued {
            self.jobs = None;
            self.workers = 0;
            let error = RenderError::DecoderUnavailable("decoder threads exited".into());
            self.fail(&src, error, "spawn_decoder");
        }
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn_decode(&mut self, src: String) {
        // No threads: decode now, deliver on the next poll.
        let result = decode_data_url(&src);
        let _ = self.sender.send(Decoded { src, result });
        if let Some(callback) = &self.on_ready {
            callback();
        }
    }
}

/// Start the decoder threads and return their job queue.
#[cfg(not(target_arch = "wasm32"))]
fn start_decoders(results: &Sender<Decoded>) -> std::io::Result<Sender<DecodeJob>> {
    let (jobs, queue) = mpsc::channel::<DecodeJob>();
    let queue = Arc::new(Mutex::new(queue));
    for i in 0..DECODE_WORKERS {
        let queue = Arc::clone(&queue);
        let results = results.clone();
        std::thread::Builder::new()
            .name(format!("clise-image-decode-{i}"))
            .spawn(move || decode_worker(&queue, &results))?;
    }
    log::debug!("Started {DECODE_WORKERS} image decoder threads");
    Ok(jobs)
}

/// Runs until the owning cache drops its job queue.
#[cfg(not(target_arch = "wasm32"))]
fn decode_worker(queue: &Mutex<Receiver<DecodeJob>>, results: &Sender<Decoded>) {
    loop {
        let next = match queue.lock() {
            Ok(queue) => queue.recv(),
            Err(_) => return,
        };
        let Ok(DecodeJob { src, on_ready }) = next else {
            return;
        };
        let result = decode_data_url(&src);
        if results.send(Decoded { src, result }).is_err() {
            return;
        }
        if let Some(callback) = on_ready {
            callback();
        }
    }
}

fn preview(src: &str) -> String {
    match src.char_indices().nth(SOURCE_PREVIEW_LEN) {
        Some((end, _)) => format!("{}...", &src[..end]),
        None => src.to_string(),
    }
}

/// Split a data URL into its MIME type and payload bytes.
pub fn parse_data_url(src: &str) -> RenderResult<(String, Vec<u8>)> {
    let rest = src
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::UnsupportedSource(preview(src)))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| RenderError::InvalidDataUrl("missing ',' separator".into()))?;
    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default().trim().to_ascii_lowercase();
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));
    let bytes = if is_base64 {
        let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        base64::engine::general_purpose::STANDARD.decode(cleaned)?
    } else {
        payload.as_bytes().to_vec()
    };
    Ok((mime, bytes))
}

/// Decode an embedded image into RGBA8 pixels.
pub fn decode_data_url(src: &str) -> RenderResult<ImageData> {
    let (mime, bytes) = parse_data_url(src)?;
    if mime == "image/svg+xml" {
        return rasterize_svg(&bytes);
    }
    let rgba = image::load_from_memory(&bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(ImageData {
        data: Blob::new(Arc::new(rgba.into_raw())),
        format: ImageFormat::Rgba8,
        alpha_type: ImageAlphaType::Alpha,
        width,
        height,
    })
}

/// Rasterize an SVG document at its intrinsic size.
#[cfg(feature = "svg")]
pub fn rasterize_svg(bytes: &[u8]) -> RenderResult<ImageData> {
    use resvg::tiny_skia::{Pixmap, Transform};
    use resvg::usvg::{Options, Tree};

    let tree = Tree::from_data(bytes, &Options::default()).map_err(|e| RenderError::Svg(e.to_string()))?;
    let size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| RenderError::Svg(format!("invalid size {}x{}", size.width(), size.height())))?;
    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());
    Ok(ImageData {
        width: pixmap.width(),
        height: pixmap.height(),
        data: Blob::new(Arc::new(pixmap.take())),
        format: ImageFormat::Rgba8,
        alpha_type: ImageAlphaType::AlphaPremultiplied,
    })
}

#[cfg(not(feature = "svg"))]
pub fn rasterize_svg(_bytes: &[u8]) -> RenderResult<ImageData> {
    Err(RenderError::SvgDisabled)
}

/// Helpers for tests that need decoded images.
#[cfg(test)]
pub(crate) mod testing {
    use super::{ImageCache, ImageState};
    use base64::Engine;
    use std::time::{Duration, Instant};

    /// A `width`x`height` PNG of one color as a data URL.
    pub(crate) fn png_data_url(width: u32, height: u32, rgba: [u8; 4]) -> String {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut png = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png.into_inner())
        )
    }

    /// Request `src` and poll until it is decoded. Panics after 5s or on failure.
    pub(crate) fn load(cache: &mut ImageCache, src: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while cache.get_cached_image(src).is_none() {
            assert!(!matches!(cache.state(src), Some(ImageState::Failed)), "decode failed");
            assert!(Instant::now() < deadline, "image never decoded");
            std::thread::sleep(Duration::from_millis(5));
        }
    }
}
