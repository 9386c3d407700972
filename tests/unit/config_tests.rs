// Configuration unit tests: YAML definitions replayed onto builders

use markit::codec::FormatTag;
use markit::config::Config;
use markit::watermark::{apply_definitions, WatermarkDefinition, WatermarkKind, WatermarkPosition};
use markit::{WatermarkError, WatermarkService};

use super::helpers::png_canvas;

#[test]
fn test_can_deserialize_minimal_valid_yaml_config() {
    let config: Config = serde_yaml::from_str("watermarks: []").expect("Failed to deserialize YAML");
    assert!(config.watermarks.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn test_definitions_replay_in_order() {
    let yaml = r##"
watermarks:
  - type: text
    text: "TOP SECRET"
    color: "#FF0000"
    opacity: 80
    size: 20
    position: top-left
    adjust: { dx: 5, dy: 6 }
  - type: text
    text: "ACME"
    trademark: true
    position: bottom-right
"##;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    config.validate().unwrap();

    let mut builder = WatermarkService::new()
        .watermark_image(png_canvas(20, 20), FormatTag::Png)
        .unwrap();
    apply_definitions(&config.watermarks, &mut builder).unwrap();

    let batch = builder.batch();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].text.as_deref(), Some("TOP SECRET"));
    assert_eq!(batch[0].color.r, 255);
    assert_eq!(batch[0].opacity, 80);
    assert_eq!(batch[0].size, Some(20));
    assert_eq!(batch[0].position, WatermarkPosition::TopLeft);
    assert_eq!(batch[0].adjustment.dx, 5);
    assert!(batch[1].trademark);
    assert_eq!(batch[1].display_text().as_deref(), Some("ACME\u{2122}"));
}

#[test]
fn test_image_definition_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let logo = dir.path().join("logo.png");
    std::fs::write(&logo, png_canvas(4, 4)).unwrap();

    let yaml = format!(
        "type: image\npath: \"{}\"\nsize: 50\n",
        logo.display()
    );
    let definition: WatermarkDefinition = serde_yaml::from_str(&yaml).unwrap();

    let mut builder = WatermarkService::new()
        .watermark_image(png_canvas(20, 20), FormatTag::Png)
        .unwrap();
    definition.apply_to(&mut builder).unwrap();

    assert_eq!(builder.current().kind, WatermarkKind::Image);
    assert_eq!(builder.current().size, Some(50));
}

#[test]
fn test_page_list_rejected_for_raster_targets() {
    let yaml = "type: text\ntext: \"x\"\npages: [0]\n";
    let definition: WatermarkDefinition = serde_yaml::from_str(yaml).unwrap();

    let mut builder = WatermarkService::new()
        .watermark_image(png_canvas(20, 20), FormatTag::Png)
        .unwrap();
    assert!(matches!(
        definition.apply_to(&mut builder),
        Err(WatermarkError::InvalidInput(_))
    ));
}

#[test]
fn test_invalid_definition_stops_replay() {
    let yaml = r#"
watermarks:
  - type: text
    text: "ok"
  - type: text
    text: "bad"
    opacity: -3
  - type: text
    text: "never reached"
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    let mut builder = WatermarkService::new()
        .watermark_image(png_canvas(20, 20), FormatTag::Png)
        .unwrap();

    assert!(apply_definitions(&config.watermarks, &mut builder).is_err());
    assert_eq!(builder.batch().len(), 1);
}
