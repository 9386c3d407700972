//! Commit-time validation of watermark records.
//!
//! Rules are checked in a fixed order and the first failure wins:
//!
//! 1. text records need non-blank text
//! 2. image records need an image with non-zero dimensions
//! 3. `size > 0`, `opacity` within 0-100, `dpi` positive and finite
//! 4. tiled records need non-negative spacing
//! 5. `Overlay` is only available for document targets
//!
//! Validation never looks at `enabled`; disabled records must still be
//! well formed.

use super::attributes::{WatermarkAttributes, WatermarkKind, WatermarkingMethod};
use crate::codec::FormatTag;
use crate::error::WatermarkError;

/// Check a record against the target format it will be rendered on.
pub fn validate(record: &WatermarkAttributes, target: FormatTag) -> Result<(), WatermarkError> {
    validate_content(record)?;
    validate_ranges(record)?;
    validate_spacing(record)?;
    validate_method(record, target)
}

fn validate_content(record: &WatermarkAttributes) -> Result<(), WatermarkError> {
    match record.kind {
        WatermarkKind::Text => match record.text.as_deref() {
            Some(text) if !text.trim().is_empty() => Ok(()),
            _ => Err(WatermarkError::EmptyText),
        },
        WatermarkKind::Image => match record.image.as_deref() {
            Some(image) if image.width() > 0 && image.height() > 0 => Ok(()),
            Some(image) => Err(WatermarkError::InvalidImage(format!(
                "image has zero dimensions ({}x{})",
                image.width(),
                image.height()
            ))),
            None => Err(WatermarkError::InvalidImage(
                "no image was provided".to_string(),
            )),
        },
    }
}

fn validate_ranges(record: &WatermarkAttributes) -> Result<(), WatermarkError> {
    let size = record.effective_size();
    if size <= 0 {
        return Err(WatermarkError::out_of_range(
            "size",
            format!("must be greater than 0, got {}", size),
        ));
    }

    if !(0..=100).contains(&record.opacity) {
        return Err(WatermarkError::out_of_range(
            "opacity",
            format!("must be between 0 and 100, got {}", record.opacity),
        ));
    }

    if !record.dpi.is_finite() || record.dpi <= 0.0 {
        return Err(WatermarkError::out_of_range(
            "dpi",
            format!("must be a positive number, got {}", record.dpi),
        ));
    }

    Ok(())
}

fn validate_spacing(record: &WatermarkAttributes) -> Result<(), WatermarkError> {
    if !record.position.is_tiled() {
        return Ok(());
    }

    if record.vertical_spacing < 0 {
        return Err(WatermarkError::out_of_range(
            "vertical_spacing",
            format!("must not be negative, got {}", record.vertical_spacing),
        ));
    }

    if record.horizontal_spacing < 0 {
        return Err(WatermarkError::out_of_range(
            "horizontal_spacing",
            format!("must not be negative, got {}", record.horizontal_spacing),
        ));
    }

    Ok(())
}

fn validate_method(record: &WatermarkAttributes, target: FormatTag) -> Result<(), WatermarkError> {
    if record.method == WatermarkingMethod::Overlay && !target.is_document() {
        return Err(WatermarkError::UnsupportedMethod {
            method: record.method,
            format: target,
        });
    }
    Ok(())
}
