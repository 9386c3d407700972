// Builder to backend hand-off, observed through a mocked RenderBackend

use std::sync::Arc;

use markit::backend::{RenderBackend, RenderTarget};
use markit::codec::FormatTag;
use markit::executor::TaskExecutor;
use markit::source::BytesSource;
use markit::watermark::{RenderDispatcher, WatermarkAttributes, WatermarkBuilder};
use markit::WatermarkError;
use mockall::mock;
use std::error::Error as _;

mock! {
    pub Backend {}

    impl RenderBackend for Backend {
        fn name(&self) -> &'static str;
        fn supports(&self, format: FormatTag) -> bool;
        fn render(
            &self,
            batch: &[Arc<WatermarkAttributes>],
            target: &RenderTarget,
            executor: &Arc<dyn TaskExecutor>,
        ) -> Result<Vec<u8>, WatermarkError>;
    }
}

fn backend() -> MockBackend {
    let mut backend = MockBackend::new();
    backend.expect_name().return_const("mock");
    backend.expect_supports().returning(|_| true);
    backend
}

fn builder_with(backend: MockBackend) -> WatermarkBuilder {
    WatermarkBuilder::new(
        Box::new(BytesSource::new(b"target-bytes".to_vec())),
        FormatTag::Png,
        RenderDispatcher::new(Box::new(backend)),
    )
    .unwrap()
}

#[test]
fn test_whole_batch_rendered_once_in_commit_order() {
    let mut backend = backend();
    backend
        .expect_render()
        .times(1)
        .withf(|batch, target, _| {
            let texts: Vec<_> = batch.iter().map(|r| r.text.as_deref()).collect();
            texts == vec![Some("first"), Some("second"), Some("third")]
                && target.bytes == b"target-bytes"
                && target.format == FormatTag::Png
        })
        .returning(|_, _, _| Ok(b"out".to_vec()));

    let mut builder = builder_with(backend);
    builder
        .with_text("first")
        .unwrap()
        .and()
        .unwrap()
        .with_text("second")
        .unwrap()
        .and()
        .unwrap()
        .with_text("third")
        .unwrap();

    assert_eq!(builder.apply().unwrap(), b"out");
}

#[test]
fn test_backend_failure_surfaces_as_render_error() {
    let mut backend = backend();
    backend
        .expect_render()
        .times(1)
        .returning(|_, _, _| Err(WatermarkError::decode("png image", "truncated stream")));

    let mut builder = builder_with(backend);
    builder.with_text("x").unwrap();

    let err = builder.apply().unwrap_err();
    assert!(matches!(err, WatermarkError::Render { .. }));
    assert!(err.source().unwrap().to_string().contains("truncated stream"));
}

#[test]
fn test_invalid_watermark_never_reaches_backend() {
    let mut backend = backend();
    backend.expect_render().times(0);

    let mut builder = builder_with(backend);
    builder.with_text("x").unwrap().opacity(150);

    assert!(matches!(
        builder.apply(),
        Err(WatermarkError::OutOfRange { field: "opacity", .. })
    ));
}

#[test]
fn test_unsupported_target_rejected_at_selection() {
    let mut backend = MockBackend::new();
    backend.expect_name().return_const("mock");
    backend.expect_supports().returning(|format| format == FormatTag::Pdf);
    backend.expect_render().times(0);

    let result = WatermarkBuilder::new(
        Box::new(BytesSource::new(vec![0u8; 4])),
        FormatTag::Bmp,
        RenderDispatcher::new(Box::new(backend)),
    );
    assert!(matches!(result, Err(WatermarkError::UnsupportedFormat(_))));
}
