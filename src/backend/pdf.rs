//! PDF render backend.
//!
//! Watermarks are appended to each page as extra content streams; the
//! original page content is wrapped in `q`/`Q` so its graphics state cannot
//! leak into the watermark layer.
//!
//! - `Overlay` text is written as vector text in standard Helvetica
//! - `Overlay` images become image XObjects with an alpha soft mask
//! - `Draw` rasterizes the watermark at the record's dpi and paints the
//!   result as an image XObject
//!
//! Opacity goes through one `ExtGState` per record. Page content generation
//! runs on the caller's executor; resources and contents are attached to the
//! document sequentially, in page order.

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::helvetica;
use super::{rasterize_record, FontProvider, RenderBackend, RenderTarget};
use crate::codec::FormatTag;
use crate::error::WatermarkError;
use crate::executor::{run_ordered, TaskExecutor};
use crate::watermark::position::{
    CanvasDimensions, PlacementPosition, PositionResolver, WatermarkDimensions,
};
use crate::watermark::{WatermarkAttributes, WatermarkKind, WatermarkingMethod};

const FONT_RESOURCE: &str = "MkHelv";

/// Renders watermarks onto PDF pages.
#[derive(Debug, Default)]
pub struct PdfRenderBackend {
    fonts: FontProvider,
}

impl PdfRenderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Font used when text is drawn (rasterized) onto pages.
    pub fn with_font_path(mut self, path: Option<PathBuf>) -> Self {
        self.fonts = FontProvider::new(path);
        self
    }

    fn prepare_mark(
        &self,
        doc: &mut Document,
        font_id: &mut Option<ObjectId>,
        index: usize,
        record: &Arc<WatermarkAttributes>,
    ) -> Result<PreparedMark, WatermarkError> {
        let opacity = record.opacity_fraction();
        let gs_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => opacity,
            "CA" => opacity,
        });

        let (paint, width, height) = match (record.method, record.kind) {
            (WatermarkingMethod::Overlay, WatermarkKind::Text) => {
                let text = record.display_text().ok_or(WatermarkError::EmptyText)?;
                let encoded = helvetica::encode_win_ansi(&text);
                let font_size = record.effective_size() as f32;
                let width = helvetica::text_width(&encoded, font_size);
                let height = helvetica::text_height(font_size);

                if font_id.is_none() {
                    *font_id = Some(doc.add_object(dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => "Helvetica",
                        "Encoding" => "WinAnsiEncoding",
                    }));
                }

                (
                    MarkPaint::Text {
                        encoded,
                        font_size,
                        color: [
                            record.color.r as f32 / 255.0,
                            record.color.g as f32 / 255.0,
                            record.color.b as f32 / 255.0,
                        ],
                    },
                    width,
                    height,
                )
            }
            (WatermarkingMethod::Overlay, WatermarkKind::Image) => {
                let image = record
                    .image
                    .as_ref()
                    .ok_or_else(|| WatermarkError::InvalidImage("no image was provided".to_string()))?;
                let rgba = image.to_rgba8();
                let scale = record.effective_size() as f32 / 100.0;
                let (width, height) = (rgba.width() as f32 * scale, rgba.height() as f32 * scale);
                let xobject_id = add_image_xobject(doc, &rgba);
                (MarkPaint::Image { xobject_id }, width, height)
            }
            (WatermarkingMethod::Draw, _) => {
                let pixels_per_point = record.dpi / 72.0;
                let artwork = rasterize_record(record, pixels_per_point, &self.fonts, false)?;
                let width = artwork.width() as f32 / pixels_per_point;
                let height = artwork.height() as f32 / pixels_per_point;
                let xobject_id = add_image_xobject(doc, &artwork);
                (MarkPaint::Image { xobject_id }, width, height)
            }
        };

        Ok(PreparedMark {
            record: Arc::clone(record),
            index,
            gs_id,
            paint,
            width,
            height,
        })
    }
}

/// Per-record resources created once per document.
#[derive(Debug)]
struct PreparedMark {
    record: Arc<WatermarkAttributes>,
    /// Position in the original batch, used for resource names
    index: usize,
    gs_id: ObjectId,
    paint: MarkPaint,
    /// Unrotated box in points
    width: f32,
    height: f32,
}

#[derive(Debug)]
enum MarkPaint {
    Text {
        encoded: Vec<u8>,
        font_size: f32,
        color: [f32; 3],
    },
    Image {
        xobject_id: ObjectId,
    },
}

impl PreparedMark {
    fn gs_name(&self) -> String {
        format!("MkGS{}", self.index)
    }

    fn image_name(&self) -> String {
        format!("MkIm{}", self.index)
    }
}

/// Page box in default user space.
#[derive(Debug, Clone, Copy)]
struct PageGeometry {
    llx: f32,
    lly: f32,
    width: f32,
    height: f32,
}

/// Content generated for one page.
#[derive(Debug, Default)]
struct PageContent {
    ops: Vec<u8>,
    /// Indices into the prepared marks painted on this page
    used: Vec<usize>,
}

impl RenderBackend for PdfRenderBackend {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn supports(&self, format: FormatTag) -> bool {
        format.is_document()
    }

    fn render(
        &self,
        batch: &[Arc<WatermarkAttributes>],
        target: &RenderTarget,
        executor: &Arc<dyn TaskExecutor>,
    ) -> Result<Vec<u8>, WatermarkError> {
        if !self.supports(target.format) {
            return Err(WatermarkError::unsupported_format(format!(
                "pdf backend cannot render {} targets",
                target.format
            )));
        }

        let mut doc = Document::load_mem(&target.bytes)
            .map_err(|e| WatermarkError::decode("pdf document", e))?;
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

        let active: Vec<(usize, &Arc<WatermarkAttributes>)> = batch
            .iter()
            .enumerate()
            .filter(|(index, record)| {
                if !record.enabled {
                    tracing::debug!(index, "Skipping disabled watermark");
                    return false;
                }
                if !record.applies_to_document(&doc) {
                    tracing::debug!(index, "Document filter rejected watermark");
                    return false;
                }
                true
            })
            .collect();

        if active.is_empty() {
            return Ok(target.bytes.clone());
        }

        tracing::info!(
            pages = page_ids.len(),
            watermarks = active.len(),
            "Rendering PDF watermarks"
        );

        let mut font_id = None;
        let mut marks = Vec::with_capacity(active.len());
        for (index, record) in active {
            marks.push(self.prepare_mark(&mut doc, &mut font_id, index, record)?);
        }
        let marks = Arc::new(marks);

        let geometries = page_ids
            .iter()
            .enumerate()
            .map(|(page_index, page_id)| page_geometry(&doc, *page_id, page_index))
            .collect::<Result<Vec<_>, _>>()?;

        let jobs: Vec<_> = geometries
            .into_iter()
            .enumerate()
            .map(|(page_index, geometry)| {
                let marks = Arc::clone(&marks);
                move || page_content(page_index, geometry, &marks)
            })
            .collect();
        let contents = run_ordered(&**executor, jobs)?;

        for (page_id, content) in page_ids.iter().zip(contents) {
            if content.used.is_empty() {
                continue;
            }
            attach_page_content(&mut doc, *page_id, &content, &marks, font_id)?;
        }

        doc.compress();
        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| WatermarkError::render_with("failed to write watermarked pdf", e))?;
        Ok(output)
    }
}

fn add_image_xobject(doc: &mut Document, image: &RgbaImage) -> ObjectId {
    let (width, height) = image.dimensions();
    let pixel_count = (width as usize) * (height as usize);
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in image.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        alpha,
    ));

    doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "SMask" => smask_id,
        },
        rgb,
    ))
}

fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc
            .get_object(*id)
            .and_then(Object::as_dict)
            .ok()
            .cloned(),
        _ => None,
    }
}

/// Look up an inheritable page attribute, walking the Parent chain.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_object(page_id).and_then(Object::as_dict).ok()?;
    // Page trees are shallow; the bound only guards against cycles
    for _ in 0..64 {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        match current.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => {
                current = doc.get_object(*parent_id).and_then(Object::as_dict).ok()?;
            }
            _ => return None,
        }
    }
    None
}

fn page_geometry(
    doc: &Document,
    page_id: ObjectId,
    page_index: usize,
) -> Result<PageGeometry, WatermarkError> {
    let media_box = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_array().ok())
        .filter(|values| values.len() == 4)
        .and_then(|values| {
            let numbers: Option<Vec<f32>> = values.iter().map(as_number).collect();
            numbers
        })
        .ok_or_else(|| {
            WatermarkError::render(format!("page {} has no usable MediaBox", page_index + 1))
        })?;

    let (llx, lly) = (media_box[0].min(media_box[2]), media_box[1].min(media_box[3]));
    let (urx, ury) = (media_box[0].max(media_box[2]), media_box[1].max(media_box[3]));

    Ok(PageGeometry {
        llx,
        lly,
        width: urx - llx,
        height: ury - lly,
    })
}

/// Exact sine and cosine for quarter turns.
fn rotation_matrix(degrees: i32) -> (f32, f32) {
    match degrees.rem_euclid(360) {
        0 => (1.0, 0.0),
        90 => (0.0, 1.0),
        180 => (-1.0, 0.0),
        270 => (0.0, -1.0),
        other => {
            let radians = (other as f32).to_radians();
            (radians.cos(), radians.sin())
        }
    }
}

fn page_content(page_index: usize, geometry: PageGeometry, marks: &[PreparedMark]) -> PageContent {
    let resolver = PositionResolver::new(CanvasDimensions::new(geometry.width, geometry.height));
    let mut content = PageContent::default();

    for (mark_index, mark) in marks.iter().enumerate() {
        if !mark.record.applies_to_page(page_index) {
            continue;
        }

        let rotation = mark.record.normalized_rotation();
        let bounds = WatermarkDimensions::new(mark.width, mark.height).rotated(rotation);
        let placements = resolver.resolve(
            mark.record.position,
            mark.record.adjustment,
            mark.record.horizontal_spacing,
            mark.record.vertical_spacing,
            &bounds,
        );

        let mut painted = false;
        for placement in placements {
            write_mark(&mut content.ops, mark, &geometry, placement, &bounds, rotation);
            painted = true;
        }
        if painted {
            content.used.push(mark_index);
        }
    }

    content
}

fn write_mark(
    ops: &mut Vec<u8>,
    mark: &PreparedMark,
    geometry: &PageGeometry,
    placement: PlacementPosition,
    bounds: &WatermarkDimensions,
    rotation: i32,
) {
    // Centre of the placed box, converted to bottom-left PDF space
    let cx = geometry.llx + placement.x + bounds.width / 2.0;
    let cy = geometry.lly + geometry.height - (placement.y + bounds.height / 2.0);
    let (cos, sin) = rotation_matrix(rotation);
    let (half_w, half_h) = (mark.width / 2.0, mark.height / 2.0);

    ops.extend_from_slice(
        format!(
            "q\n/{} gs\n{:.4} {:.4} {:.4} {:.4} {:.4} {:.4} cm\n",
            mark.gs_name(),
            cos,
            sin,
            -sin + 0.0,
            cos,
            cx,
            cy
        )
        .as_bytes(),
    );

    match &mark.paint {
        MarkPaint::Text {
            encoded,
            font_size,
            color,
        } => {
            let baseline = -half_h - helvetica::DESCENT * font_size / 1000.0;
            ops.extend_from_slice(
                format!(
                    "BT\n/{} {:.4} Tf\n{:.4} {:.4} {:.4} rg\n{:.4} {:.4} Td\n(",
                    FONT_RESOURCE, font_size, color[0], color[1], color[2], -half_w, baseline
                )
                .as_bytes(),
            );
            ops.extend_from_slice(&helvetica::escape_literal(encoded));
            ops.extend_from_slice(b") Tj\nET\n");
        }
        MarkPaint::Image { .. } => {
            ops.extend_from_slice(
                format!(
                    "{:.4} 0 0 {:.4} {:.4} {:.4} cm\n/{} Do\n",
                    mark.width,
                    mark.height,
                    -half_w,
                    -half_h,
                    mark.image_name()
                )
                .as_bytes(),
            );
        }
    }

    ops.extend_from_slice(b"Q\n");
}

fn merge_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &[u8],
    entries: &[(String, ObjectId)],
) {
    if entries.is_empty() {
        return;
    }
    let mut dict = resources
        .get(category)
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_else(Dictionary::new);
    for (name, id) in entries {
        dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    resources.set(category.to_vec(), Object::Dictionary(dict));
}

/// The page's current content streams as a flat list of stream references.
///
/// `/Contents` may be a stream reference, an array of them, or a reference
/// to such an array; the array form is spliced so the rebuilt `/Contents`
/// only ever holds streams.
fn existing_content_streams(
    doc: &mut Document,
    page_id: ObjectId,
) -> Result<Vec<Object>, WatermarkError> {
    let contents = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| WatermarkError::render_with("page object is not a dictionary", e))?
        .get(b"Contents")
        .ok()
        .cloned();

    let items = match contents {
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            Ok(_) => return Ok(vec![Object::Reference(id)]),
            Err(_) => Vec::new(),
        },
        Some(Object::Array(items)) => items,
        Some(Object::Stream(stream)) => vec![Object::Stream(stream)],
        _ => Vec::new(),
    };

    let mut streams = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Object::Reference(id) => match doc.get_object(id) {
                Ok(Object::Stream(_)) => streams.push(Object::Reference(id)),
                _ => tracing::warn!(?id, "Dropping non-stream entry from page contents"),
            },
            Object::Stream(stream) => streams.push(Object::Reference(doc.add_object(stream))),
            _ => {}
        }
    }
    Ok(streams)
}

fn attach_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: &PageContent,
    marks: &[PreparedMark],
    font_id: Option<ObjectId>,
) -> Result<(), WatermarkError> {
    let mut ext_gstates = Vec::new();
    let mut xobjects = Vec::new();
    let mut uses_font = false;
    for &mark_index in &content.used {
        let mark = &marks[mark_index];
        ext_gstates.push((mark.gs_name(), mark.gs_id));
        match mark.paint {
            MarkPaint::Text { .. } => uses_font = true,
            MarkPaint::Image { xobject_id } => xobjects.push((mark.image_name(), xobject_id)),
        }
    }
    let fonts: Vec<(String, ObjectId)> = match (uses_font, font_id) {
        (true, Some(id)) => vec![(FONT_RESOURCE.to_string(), id)],
        _ => Vec::new(),
    };

    let mut resources = inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve_dict(doc, obj))
        .unwrap_or_else(Dictionary::new);
    merge_resource(doc, &mut resources, b"ExtGState", &ext_gstates);
    merge_resource(doc, &mut resources, b"XObject", &xobjects);
    merge_resource(doc, &mut resources, b"Font", &fonts);

    let existing = existing_content_streams(doc, page_id)?;

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut watermark_ops = b"Q\n".to_vec();
    watermark_ops.extend_from_slice(&content.ops);
    let watermark_id = doc.add_object(Stream::new(Dictionary::new(), watermark_ops));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(watermark_id));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| WatermarkError::render_with("page object is not a dictionary", e))?;
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Array(contents));
    Ok(())
}
