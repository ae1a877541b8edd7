//! Background asset loading.
//!
//! Each request decodes one asset on a short-lived worker thread and hands
//! the result back through a one-shot channel. The frame loop polls pending
//! requests once per tick; a request resolves exactly once.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
};

use futures::channel::oneshot;

use crate::{
    error::{AssetError, AssetResult},
    gfx::geometry::text::{Font, GlyphSource},
    room::model::{load_model, ModelData},
};

/// A single pending asset load
pub struct AssetRequest<T> {
    path: PathBuf,
    receiver: Option<oneshot::Receiver<AssetResult<T>>>,
}

impl<T: Send + 'static> AssetRequest<T> {
    /// Starts `load(path)` on a worker thread
    pub fn spawn<F>(path: PathBuf, load: F) -> Self
    where
        F: FnOnce(&Path) -> AssetResult<T> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let worker_path = path.clone();
        let name = format!("load {}", path.display());

        let spawned = thread::Builder::new().name(name).spawn(move || {
            let result = load(&worker_path);
            // The receiver is gone when the app shut down first
            let _ = sender.send(result);
        });

        match spawned {
            Ok(_) => Self {
                path,
                receiver: Some(receiver),
            },
            Err(source) => Self::resolved(
                path.clone(),
                Err(AssetError::Io {
                    path,
                    source,
                }),
            ),
        }
    }

    /// A request that is already complete
    pub fn resolved(path: PathBuf, result: AssetResult<T>) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(result);
        Self {
            path,
            receiver: Some(receiver),
        }
    }
}

impl<T> AssetRequest<T> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True until the result has been taken by [`AssetRequest::poll`]
    pub fn is_pending(&self) -> bool {
        self.receiver.is_some()
    }

    /// Takes the result if the worker has finished.
    ///
    /// Returns `None` while loading and after the result was delivered.
    pub fn poll(&mut self) -> Option<AssetResult<T>> {
        let receiver = self.receiver.as_mut()?;
        let result = match receiver.try_recv() {
            Ok(None) => return None,
            Ok(Some(result)) => result,
            Err(oneshot::Canceled) => Err(AssetError::Canceled {
                path: self.path.clone(),
            }),
        };
        self.receiver = None;
        Some(result)
    }
}

/// Reads and parses a TrueType/OpenType font
pub fn load_font(path: &Path) -> AssetResult<Font> {
    let data = fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Font::from_bytes(data).map_err(|source| AssetError::Font {
        path: path.to_path_buf(),
        source,
    })
}

pub fn request_font(path: PathBuf) -> AssetRequest<Arc<dyn GlyphSource>> {
    AssetRequest::spawn(path, |path| {
        let font = load_font(path)?;
        log::info!("Loaded font '{}'", path.display());
        Ok(Arc::new(font) as Arc<dyn GlyphSource>)
    })
}

pub fn request_model(path: PathBuf) -> AssetRequest<ModelData> {
    AssetRequest::spawn(path, load_model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait<T>(request: &mut AssetRequest<T>) -> AssetResult<T> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = request.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "loader never finished");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_request_resolves_exactly_once() {
        let mut request = AssetRequest::spawn(PathBuf::from("answer"), |_| Ok(42u32));
        assert_eq!(wait(&mut request).ok(), Some(42));
        assert!(!request.is_pending());
        assert!(request.poll().is_none());
    }

    #[test]
    fn test_panicking_loader_reports_canceled() {
        let mut request: AssetRequest<u32> = AssetRequest::spawn(PathBuf::from("boom"), |_| panic!("loader failed"));
        assert!(matches!(wait(&mut request), Err(AssetError::Canceled { .. })));
    }

    #[test]
    fn test_missing_font_is_io_error() {
        let mut request = request_font(PathBuf::from("does/not/exist.otf"));
        assert!(matches!(wait(&mut request), Err(AssetError::Io { .. })));
    }

    #[test]
    fn test_garbage_font_is_parse_error() {
        let path = std::env::temp_dir().join(format!("techno-room-garbage-{}.otf", std::process::id()));
        fs::write(&path, b"definitely not a font").unwrap();
        let result = load_font(&path);
        let _ = fs::remove_file(&path);
        assert!(matches!(result, Err(AssetError::Font { .. })));
    }

    #[test]
    fn test_missing_model_is_error() {
        let mut request = request_model(PathBuf::from("does/not/exist.glb"));
        assert!(wait(&mut request).is_err());
    }
}
