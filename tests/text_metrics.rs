mod common;

use std::path::PathBuf;

use cmvr_render::config::FontConfig;
use cmvr_render::model::TextStyle;
use cmvr_render::{CmvrReport, RenderConfig, Renderer, TextMetrics};

/// DejaVu Sans as installed by the common Linux font packages.
fn system_sans() -> Option<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .find(|p| p.is_file())
}

#[test]
fn helvetica_widths_follow_the_afm_tables() {
    let metrics = TextMetrics::standard();
    // "A" is 667/1000 em in Helvetica, 722 in Helvetica-Bold.
    assert!(common::approx(metrics.width_of("A", TextStyle::regular(10.0)), 6.67));
    assert!(common::approx(metrics.width_of("A", TextStyle::bold(10.0)), 7.22));
    assert!(common::approx(metrics.width_of("", TextStyle::regular(10.0)), 0.0));
}

#[test]
fn widths_add_up_and_scale_with_size() {
    let metrics = TextMetrics::standard();
    let style = TextStyle::regular(9.0);
    let whole = metrics.width_of("Monitoring Trust Fund", style);
    let parts = metrics.width_of("Monitoring", style)
        + metrics.width_of(" Trust", style)
        + metrics.width_of(" Fund", style);
    assert!(common::approx(whole, parts));
    assert!(common::approx(
        metrics.width_of("Fund", TextStyle::regular(18.0)),
        2.0 * metrics.width_of("Fund", style)
    ));
}

#[test]
fn wrapping_is_measured_without_drawing() {
    let metrics = TextMetrics::standard();
    let style = TextStyle::regular(9.0);
    let one_line = metrics.height_of_wrapped("Yes", 100.0, style);
    assert!(common::approx(one_line, metrics.line_height(style)));

    let text = "Rehabilitation Cash Fund deposits were verified against the bank certificate";
    let narrow = metrics.height_of_wrapped(text, 60.0, style);
    let wide = metrics.height_of_wrapped(text, 600.0, style);
    assert!(narrow > wide);
    assert!(common::approx(wide, one_line));
    // A single word longer than the box is split, never dropped.
    assert!(metrics.height_of_wrapped("Decommissioning", 10.0, style) > one_line);
}

#[test]
fn missing_font_files_are_reported() {
    let config = FontConfig {
        regular: Some("/nonexistent/fonts/Arial.ttf".into()),
        bold: None,
    };
    assert!(matches!(
        TextMetrics::from_config(&config),
        Err(cmvr_render::Error::Io(_))
    ));
}

#[test]
fn truetype_faces_are_measured_from_their_tables() {
    let Some(path) = system_sans() else {
        eprintln!("DejaVuSans.ttf not installed, skipping");
        return;
    };
    let data = std::fs::read(&path).expect("read font");
    let face = ttf_parser::Face::parse(&data, 0).expect("parse font");
    let units: u32 = "Monitoring"
        .chars()
        .map(|ch| {
            let gid = face.glyph_index(ch).expect("glyph");
            u32::from(face.glyph_hor_advance(gid).expect("advance"))
        })
        .sum();
    let expected = units as f32 / f32::from(face.units_per_em()) * 10.0;

    let metrics = TextMetrics::from_config(&FontConfig {
        regular: Some(path),
        bold: None,
    })
    .expect("metrics");
    let style = TextStyle::regular(10.0);
    assert!(common::approx(metrics.width_of("Monitoring", style), expected));
    assert!(!common::approx(
        metrics.width_of("Monitoring", style),
        TextMetrics::standard().width_of("Monitoring", style)
    ));
    // The unconfigured weight keeps Helvetica-Bold.
    assert!(common::approx(metrics.width_of("A", TextStyle::bold(10.0)), 7.22));
}

#[tokio::test]
async fn configured_fonts_are_embedded_as_cid_fonts() {
    let Some(path) = system_sans() else {
        eprintln!("DejaVuSans.ttf not installed, skipping");
        return;
    };
    common::init_logging();
    let config = RenderConfig {
        fonts: FontConfig {
            regular: Some(path),
            bold: None,
        },
        ..common::fixed_config()
    };
    let renderer = Renderer::with_image_source(config, common::StaticImages::default())
        .expect("renderer");
    let pdf = renderer
        .cmvr_pdf(&CmvrReport::default())
        .await
        .expect("pdf");

    let contains = |needle: &[u8]| pdf.windows(needle.len()).any(|w| w == needle);
    for needle in [
        &b"/Type0"[..],
        b"/CIDFontType2",
        b"/Identity-H",
        b"/FontFile2",
        b"/ToUnicode",
        b"/DejaVuSans",
    ] {
        assert!(contains(needle), "missing {}", String::from_utf8_lossy(needle));
    }
    // Bold text still uses the standard face.
    assert!(contains(b"/Helvetica-Bold"));
}
