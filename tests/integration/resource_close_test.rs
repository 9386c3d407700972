// Source release on success and failure paths

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use markit::codec::FormatTag;
use markit::source::SourceHandle;
use markit::{WatermarkError, WatermarkService};

use super::fixtures::{blank_canvas, solid_image};

/// Source whose close can be made to fail.
struct TrackedSource {
    bytes: Vec<u8>,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
}

impl SourceHandle for TrackedSource {
    fn describe(&self) -> String {
        "tracked".to_string()
    }

    fn read(&mut self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            Err(io::Error::new(io::ErrorKind::Other, "handle is stuck"))
        } else {
            Ok(())
        }
    }
}

fn tracked(fail_close: bool) -> (Box<dyn SourceHandle>, Arc<AtomicUsize>) {
    let closes = Arc::new(AtomicUsize::new(0));
    let source = TrackedSource {
        bytes: blank_canvas(16, 16, FormatTag::Png),
        closes: Arc::clone(&closes),
        fail_close,
    };
    (Box::new(source), closes)
}

#[test]
fn test_source_closed_once_after_success() {
    let (source, closes) = tracked(false);
    let mut builder = WatermarkService::new().select_target_format(source, "png").unwrap();
    builder.with_image(solid_image(4, 4, [0, 0, 0, 255])).unwrap();

    builder.apply().unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_source_closed_once_after_validation_failure() {
    let (source, closes) = tracked(false);
    let mut builder = WatermarkService::new().select_target_format(source, "png").unwrap();
    builder.with_text("   ").unwrap();

    assert!(matches!(builder.apply(), Err(WatermarkError::EmptyText)));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_source_closed_when_builder_dropped() {
    let (source, closes) = tracked(false);
    let builder = WatermarkService::new().select_target_format(source, "png").unwrap();
    drop(builder);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_close_failure_keeps_rendered_output() {
    let (source, closes) = tracked(true);
    let mut builder = WatermarkService::new().select_target_format(source, "png").unwrap();
    builder.with_image(solid_image(4, 4, [0, 0, 0, 255])).unwrap();

    let err = builder.apply().unwrap_err();
    assert!(matches!(err, WatermarkError::ResourceClose { .. }));
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    let rendered = err.into_rendered().unwrap();
    assert!(!rendered.is_empty());
}

#[test]
fn test_render_error_wins_over_close_error() {
    let closes = Arc::new(AtomicUsize::new(0));
    let mut broken = blank_canvas(16, 16, FormatTag::Png);
    broken.truncate(40);
    let source = TrackedSource {
        bytes: broken,
        closes: Arc::clone(&closes),
        fail_close: true,
    };

    let mut builder = WatermarkService::new()
        .select_target_format(Box::new(source), "png")
        .unwrap();
    builder.with_image(solid_image(4, 4, [0, 0, 0, 255])).unwrap();

    assert!(matches!(builder.apply(), Err(WatermarkError::Render { .. })));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}
