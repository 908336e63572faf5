mod common;

use common::*;
use pdf_canvas::*;
use std::io::Write;

fn fill_colours(engine: &RecordingEngine) -> usize {
    engine.count(|c| matches!(c, Call::SetColour(ColourTarget::Fill, _)))
}

#[test]
fn identical_fill_colours_are_set_once() {
    let mut canvas = letter_canvas();
    canvas.filled_rectangle(0.0, 0.0, 1.0, 1.0, colours::RED).unwrap();
    canvas.filled_rectangle(5.0, 5.0, 1.0, 1.0, colours::RED).unwrap();
    assert_eq!(fill_colours(canvas.engine()), 1);

    canvas
        .filled_rectangle(0.0, 0.0, 1.0, 1.0, colours::RED.with_alpha(0.5))
        .unwrap();
    assert_eq!(fill_colours(canvas.engine()), 2);
    assert!(canvas
        .engine()
        .calls
        .iter()
        .any(|(_, c)| *c == Call::CreateGState("opacityfill=0.5".to_string())));
}

#[test]
fn explicit_full_alpha_equals_no_alpha() {
    let mut canvas = letter_canvas();
    canvas.filled_rectangle(0.0, 0.0, 1.0, 1.0, colours::RED).unwrap();
    canvas
        .filled_rectangle(0.0, 0.0, 1.0, 1.0, colours::RED.with_alpha(1.0))
        .unwrap();
    assert_eq!(fill_colours(canvas.engine()), 1);
}

#[test]
fn identical_stroke_colours_are_set_once() {
    let mut canvas = letter_canvas();
    let style = LineStyle::new(1.0);
    canvas.line(0.0, 0.0, 10.0, 10.0, colours::BLUE, &style).unwrap();
    canvas.line(0.0, 10.0, 10.0, 0.0, colours::BLUE, &style).unwrap();
    assert_eq!(
        canvas
            .engine()
            .count(|c| matches!(c, Call::SetColour(ColourTarget::Stroke, _))),
        1
    );
}

#[test]
fn translucent_colours_are_reapplied_after_the_primitive() {
    let mut canvas = letter_canvas();
    let paint = colours::RED.with_alpha(0.5);
    canvas.filled_rectangle(0.0, 0.0, 1.0, 1.0, paint).unwrap();
    canvas.filled_rectangle(0.0, 0.0, 1.0, 1.0, paint).unwrap();

    // opacity goes back to the baseline after each rectangle, so the second one
    // has to set its alpha again
    let engine = canvas.engine();
    assert_eq!(fill_colours(engine), 2);
    assert_eq!(
        engine.count(|c| *c == Call::CreateGState("opacityfill=0.5".to_string())),
        1
    );
    assert_eq!(
        engine.count(|c| *c == Call::CreateGState("opacityfill=1 opacitystroke=1".to_string())),
        1
    );
}

#[test]
fn context_switches_forget_cached_colours() {
    let mut canvas = letter_canvas();
    canvas.filled_rectangle(0.0, 0.0, 1.0, 1.0, colours::RED).unwrap();
    canvas.new_page().unwrap();
    canvas.filled_rectangle(0.0, 0.0, 1.0, 1.0, colours::RED).unwrap();
    canvas.save().unwrap();
    canvas.restore().unwrap();
    canvas.filled_rectangle(0.0, 0.0, 1.0, 1.0, colours::RED).unwrap();
    assert_eq!(fill_colours(canvas.engine()), 3);
}

#[test]
fn graphics_states_are_deduplicated() {
    let mut canvas = letter_canvas();
    canvas.set_opacity(0.5, BlendMode::Normal).unwrap();
    canvas.set_opacity(0.5, BlendMode::Normal).unwrap();
    let engine = canvas.engine();
    assert_eq!(
        engine.count(|c| *c == Call::CreateGState("opacityfill=0.5 opacitystroke=0.5".to_string())),
        1
    );
    assert_eq!(engine.count(|c| matches!(c, Call::SetGState(_))), 2);
}

#[test]
fn colour_alpha_is_scaled_by_the_opacity_baseline() {
    let mut canvas = letter_canvas();
    canvas.set_opacity(0.5, BlendMode::Normal).unwrap();
    canvas
        .filled_rectangle(0.0, 0.0, 1.0, 1.0, colours::RED.with_alpha(0.5))
        .unwrap();
    let engine = canvas.engine();
    assert_eq!(
        engine.count(|c| *c == Call::CreateGState("opacityfill=0.25".to_string())),
        1
    );
    // and back to the baseline afterwards
    assert_eq!(
        engine.calls.iter().rev().find_map(|(_, c)| match c {
            Call::SetGState(g) => Some(*g),
            _ => None,
        }),
        Some(0)
    );
}

#[test]
fn zero_dash_is_clamped_and_doubled() {
    let mut canvas = letter_canvas();
    let style = LineStyle::new(1.0).dash([0.0]);
    canvas.line(0.0, 0.0, 10.0, 0.0, colours::BLACK, &style).unwrap();
    assert!(canvas
        .engine()
        .calls
        .iter()
        .any(|(_, c)| *c == Call::Dash(vec![1.5e-5, 1.5e-5])));
}

#[test]
fn line_style_is_applied_in_full() {
    let mut canvas = letter_canvas();
    let style = LineStyle::new(2.0).cap(LineCap::Round).join(LineJoin::Bevel);
    canvas.rectangle(10.0, 10.0, 20.0, 30.0, colours::BLACK, &style).unwrap();
    let calls: Vec<Call> = canvas.engine().calls.iter().map(|(_, c)| c.clone()).collect();
    let start = calls.iter().position(|c| *c == Call::LineWidth(2.0)).unwrap();
    assert_eq!(
        &calls[start..start + 5],
        &[
            Call::LineWidth(2.0),
            Call::LineCap(LineCap::Round),
            Call::LineJoin(LineJoin::Bevel),
            Call::Dash(vec![]),
            Call::Rect([10.0, 752.0, 20.0, 30.0]),
        ]
    );
}

#[test]
fn round_clipping_falls_back_to_a_rectangle() {
    let capabilities = Capabilities {
        path_construction: false,
        ..RecordingEngine::new().capabilities
    };
    let mut canvas = Canvas::new(
        RecordingEngine::with_capabilities(capabilities),
        pagesize::LETTER,
        Orientation::Portrait,
    )
    .unwrap();
    canvas
        .clipping_roundrectangle(10.0, 10.0, 100.0, 50.0, 5.0, 5.0, 5.0, 5.0)
        .unwrap();
    let engine = canvas.engine();
    assert_eq!(engine.count(|c| matches!(c, Call::CurveTo(_))), 0);
    assert!(engine
        .calls
        .iter()
        .any(|(_, c)| *c == Call::Rect([10.0, 732.0, 100.0, 50.0])));
    assert_eq!(engine.calls.last().unwrap().1, Call::Clip);
}

#[test]
fn round_clipping_builds_corners() {
    let mut canvas = letter_canvas();
    canvas
        .clipping_roundrectangle(10.0, 10.0, 100.0, 50.0, 5.0, 5.0, 5.0, 5.0)
        .unwrap();
    canvas.clipping_end().unwrap();
    let engine = canvas.engine();
    assert_eq!(engine.count(|c| matches!(c, Call::CurveTo(_))), 4);
    assert!(engine.calls.iter().any(|(_, c)| *c == Call::MoveTo(15.0, 782.0)));
    assert_eq!(engine.calls.last().unwrap().1, Call::Restore);
}

#[test]
fn transforms_flip_into_engine_space() {
    let mut canvas = letter_canvas();
    canvas.translate(10.0, 20.0).unwrap();
    canvas.scale(2.0, 2.0, 0.0, 0.0).unwrap();
    let engine = canvas.engine();
    let concats: Vec<[f32; 6]> = engine
        .calls
        .iter()
        .filter_map(|(_, c)| match c {
            Call::Concat(m) => Some(*m),
            _ => None,
        })
        .collect();
    assert_eq!(concats[0], [1.0, 0.0, 0.0, 1.0, 10.0, -20.0]);
    // scaling about the top-left corner keeps it in place
    assert_eq!(concats[1], [2.0, 0.0, 0.0, 2.0, 0.0, -792.0]);
}

#[test]
fn rotation_is_clockwise_about_the_point() {
    let mut canvas = letter_canvas();
    canvas.rotate(90.0, 100.0, 100.0).unwrap();
    let Some((_, Call::Concat(m))) = canvas.engine().calls.last() else {
        panic!("expected a transform");
    };
    let t = Transform::new(m[0], m[1], m[2], m[3], m[4], m[5]);
    // the pivot stays put
    let (x, y) = t.apply(100.0, 692.0);
    assert!((x - 100.0).abs() < 1e-3 && (y - 692.0).abs() < 1e-3);
    // a point to the right of the pivot ends up below it
    let (x, y) = t.apply(110.0, 692.0);
    assert!((x - 100.0).abs() < 1e-3 && (y - 682.0).abs() < 1e-3);
}

#[test]
fn fonts_are_cached_by_name_encoding_and_options() {
    let mut canvas = letter_canvas();
    let plain = FontOptions::default();
    let subset = FontOptions {
        subsetting: true,
        ..plain
    };
    let a = canvas.load_font("Helvetica", None, &plain).unwrap();
    let b = canvas.load_font("/some/dir/helvetica", None, &plain).unwrap();
    let c = canvas.load_font("Helvetica", None, &subset).unwrap();
    let d = canvas.load_font("Helvetica", Some("auto"), &plain).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, d);

    let engine = canvas.engine();
    assert_eq!(engine.count(|c| matches!(c, Call::LoadFont(..))), 3);
    assert!(engine.calls.iter().any(|(_, c)| *c
        == Call::LoadFont(
            "Helvetica".to_string(),
            "unicode".to_string(),
            "embedding=true subsetting=false".to_string()
        )));
    // standard fonts need no font files
    assert_eq!(engine.count(|c| matches!(c, Call::RegisterFont(..))), 0);
}

#[test]
fn default_encoding_follows_unicode_support() {
    let capabilities = Capabilities {
        unicode_fonts: false,
        ..RecordingEngine::new().capabilities
    };
    let mut canvas = Canvas::new(
        RecordingEngine::with_capabilities(capabilities),
        pagesize::LETTER,
        Orientation::Portrait,
    )
    .unwrap();
    canvas.load_font("Courier", None, &FontOptions::default()).unwrap();
    assert!(canvas.engine().calls.iter().any(|(_, c)| matches!(
        c,
        Call::LoadFont(name, encoding, _) if name == "Courier" && encoding == "auto"
    )));
}

#[test]
fn font_files_are_discovered_once() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["Acme.ttf", "Acme.afm", "Other.otf"] {
        std::fs::write(dir.path().join(name), b"font").unwrap();
    }
    let fonts = FontDirectory::scan(dir.path()).unwrap();
    let options = CanvasOptions::new().font_locator(fonts);
    let mut canvas = Canvas::with_options(
        RecordingEngine::new(),
        pagesize::LETTER,
        Orientation::Portrait,
        options,
    )
    .unwrap();

    let acme = dir.path().join("Acme");
    let acme = acme.to_str().unwrap();
    canvas.load_font(acme, None, &FontOptions::default()).unwrap();
    canvas.load_font("Other", None, &FontOptions::default()).unwrap();
    canvas.load_font("Other.otf", Some("auto"), &FontOptions::default()).unwrap();

    let engine = canvas.engine();
    let registered: Vec<_> = engine
        .calls
        .iter()
        .filter_map(|(_, c)| match c {
            Call::RegisterFont(face, kind, path) => Some((face.clone(), *kind, path.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        registered,
        vec![
            ("Acme".to_string(), FontFileKind::Outline, dir.path().join("Acme.ttf")),
            ("Acme".to_string(), FontFileKind::Metrics, dir.path().join("Acme.afm")),
            ("Other".to_string(), FontFileKind::Outline, dir.path().join("Other.otf")),
        ]
    );
    assert!(engine.calls.iter().any(|(_, c)| matches!(
        c,
        Call::LoadFont(name, ..) if name == "Acme"
    )));
}

#[test]
fn text_sits_below_its_top_and_rotates_the_other_way() {
    let mut canvas = letter_canvas();
    let style = TextStyle::new("Helvetica", 10.0)
        .angle(30.0)
        .word_spacing(2.0)
        .colour(colours::GREEN);
    canvas.text(10.0, 20.0, "Hi there", &style).unwrap();

    let engine = canvas.engine();
    let Some(Call::ShowText(text, x, y, placement)) = engine
        .calls
        .iter()
        .map(|(_, c)| c)
        .find(|c| matches!(c, Call::ShowText(..)))
    else {
        panic!("no text shown");
    };
    assert_eq!(text, "Hi there");
    assert_eq!(*x, 10.0);
    // 792 - 20 - 10 * (0.8 + 0.2) * 1.1
    assert!((y - 761.0).abs() < 1e-3);
    assert_eq!(placement.rotate, -30.0);
    assert_eq!(placement.word_spacing, 2.0);
    assert!(engine.calls.iter().any(|(_, c)| *c == Call::SetFont(0, 10.0)));
}

#[test]
fn text_metrics() {
    let mut canvas = letter_canvas();
    let width = canvas.text_width("a b", "Helvetica", 10.0, 2.0, 1.0).unwrap();
    assert!((width - 20.0).abs() < 1e-4);

    let height = canvas.font_height("Helvetica", 10.0).unwrap();
    assert!((height - 11.0).abs() < 1e-4);
    let baseline = canvas.font_baseline("Helvetica", 10.0).unwrap();
    assert!((baseline - 11.0).abs() < 1e-4);

    let ratio = CanvasOptions::new().font_height_ratio(1.5);
    let mut canvas = Canvas::with_options(
        RecordingEngine::new(),
        pagesize::LETTER,
        Orientation::Portrait,
        ratio,
    )
    .unwrap();
    assert!((canvas.font_height("Helvetica", 10.0).unwrap() - 15.0).abs() < 1e-4);
    assert!((canvas.font_baseline("Helvetica", 10.0).unwrap() - 11.0).abs() < 1e-4);

    assert!(canvas.font_supports_char("Helvetica", 'a').unwrap());
    assert!(!canvas.font_supports_char("Helvetica", '雪').unwrap());
}

#[test]
fn links_and_destinations() {
    let mut canvas = letter_canvas();
    canvas.add_named_dest("top").unwrap();
    canvas.add_link("#top", 10.0, 10.0, 50.0, 20.0).unwrap();
    canvas.add_link("https://example.com", 0.0, 0.0, 5.0, 5.0).unwrap();
    canvas.add_link("images/local.html", 0.0, 0.0, 5.0, 5.0).unwrap();
    canvas.add_link("file:///etc/hosts", 0.0, 0.0, 5.0, 5.0).unwrap();

    let links: Vec<_> = canvas
        .engine()
        .calls
        .iter()
        .filter_map(|(_, c)| match c {
            Call::AddLink(area, target) => Some((*area, target.clone())),
            _ => None,
        })
        .collect();
    assert_eq!(
        links,
        vec![
            (
                Rect::from_origin_size(10.0, 762.0, 50.0, 20.0),
                LinkTarget::Named("top".to_string())
            ),
            (
                Rect::from_origin_size(0.0, 787.0, 5.0, 5.0),
                LinkTarget::Uri("https://example.com".to_string())
            ),
        ]
    );
    assert!(canvas
        .engine()
        .calls
        .iter()
        .any(|(_, c)| *c == Call::NamedDestination("top".to_string())));
}

#[test]
fn images_are_cached_by_resolved_path() {
    let image = broken_image_path();
    let path = image.to_str().unwrap();
    let mut canvas = letter_canvas();
    canvas.image(path, 10.0, 10.0, 20.0, 20.0).unwrap();
    canvas
        .image(&format!("file://{path}"), 10.0, 40.0, 20.0, 20.0)
        .unwrap();

    let engine = canvas.engine();
    assert_eq!(engine.count(|c| matches!(c, Call::LoadImage(..))), 1);
    assert!(engine
        .calls
        .iter()
        .any(|(_, c)| *c == Call::PlaceImage(0, [10.0, 762.0, 20.0, 20.0])));
    assert!(engine
        .calls
        .iter()
        .any(|(_, c)| *c == Call::PlaceImage(0, [10.0, 732.0, 20.0, 20.0])));
}

#[test]
fn unknown_images_are_replaced_with_the_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, b"not an image at all").unwrap();

    let mut canvas = letter_canvas();
    canvas
        .image(notes.to_str().unwrap(), 0.0, 0.0, 10.0, 10.0)
        .unwrap();
    canvas
        .image("/does/not/exist.png", 0.0, 0.0, 10.0, 10.0)
        .unwrap();

    let engine = canvas.engine();
    let loaded: Vec<_> = engine
        .calls
        .iter()
        .filter_map(|(_, c)| match c {
            Call::LoadImage(path, kind) => Some((path.clone(), *kind)),
            _ => None,
        })
        .collect();
    assert_eq!(loaded, vec![(broken_image_path(), ImageKind::Png)]);
    assert_eq!(engine.count(|c| matches!(c, Call::PlaceImage(0, _))), 2);
}

#[test]
fn corrupt_images_are_replaced_and_a_corrupt_placeholder_fails() {
    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("photo.png");
    let mut file = std::fs::File::create(&photo).unwrap();
    file.write_all(b"\x89PNG\r\n\x1a\ngarbage").unwrap();

    let mut engine = RecordingEngine::new();
    engine.corrupt_images.insert(photo.clone());
    let mut canvas = Canvas::new(engine, pagesize::LETTER, Orientation::Portrait).unwrap();
    canvas.image(photo.to_str().unwrap(), 0.0, 0.0, 10.0, 10.0).unwrap();
    assert_eq!(canvas.engine().count(|c| matches!(c, Call::PlaceImage(..))), 1);

    let mut engine = RecordingEngine::new();
    engine.corrupt_images.insert(photo.clone());
    let options = CanvasOptions::new().broken_image(&photo);
    let mut canvas =
        Canvas::with_options(engine, pagesize::LETTER, Orientation::Portrait, options).unwrap();
    let result = canvas.image("/does/not/exist.jpg", 0.0, 0.0, 10.0, 10.0);
    assert!(matches!(result, Err(CanvasError::ImageUnavailable(path)) if path == photo.to_str().unwrap()));
}

#[test]
fn a_missing_placeholder_url_is_tried_once() {
    let options = CanvasOptions::new().broken_image("file:///nonexistent/broken.png");
    let mut canvas =
        Canvas::with_options(RecordingEngine::new(), pagesize::LETTER, Orientation::Portrait, options)
            .unwrap();
    let result = canvas.image("/nonexistent/a.png", 0.0, 0.0, 10.0, 10.0);
    assert!(
        matches!(&result, Err(CanvasError::ImageUnavailable(path)) if path == "/nonexistent/broken.png"),
        "got {result:?}"
    );
    assert_eq!(canvas.engine().count(|c| matches!(c, Call::PlaceImage(..))), 0);
}

#[test]
fn unsupported_image_formats_name_the_missing_capability() {
    let dir = tempfile::tempdir().unwrap();
    let gif = dir.path().join("anim.gif");
    std::fs::write(&gif, b"GIF89a\x01\x00\x01\x00\x00\x00\x00;").unwrap();

    let mut canvas = letter_canvas();
    let result = canvas.image(gif.to_str().unwrap(), 0.0, 0.0, 10.0, 10.0);
    match result {
        Err(CanvasError::MissingCapability(what)) => assert_eq!(what, "gif images"),
        other => panic!("expected a missing capability, got {other:?}"),
    }
}

#[derive(Default)]
struct FakeResponse {
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    sent: bool,
}

impl Write for FakeResponse {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.sent = true;
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Response for FakeResponse {
    fn headers_sent(&self) -> bool {
        self.sent
    }

    fn set_header(&mut self, name: &str, value: &str) -> std::io::Result<()> {
        self.headers.push((name.to_string(), value.to_string()));
        Ok(())
    }
}

#[test]
fn streaming_sets_headers_then_writes_the_document() {
    let mut canvas = letter_canvas();
    let mut response = FakeResponse::default();
    canvas
        .stream(&mut response, "invoice", &StreamOptions { attachment: false })
        .unwrap();

    assert_eq!(
        response.headers,
        vec![
            ("Content-Type".to_string(), "application/pdf".to_string()),
            ("Content-Length".to_string(), "13".to_string()),
            (
                "Content-Disposition".to_string(),
                "inline; filename=\"invoice.pdf\"".to_string()
            ),
        ]
    );
    assert_eq!(response.body, b"%PDF-recorded");

    let mut late = FakeResponse {
        sent: true,
        ..FakeResponse::default()
    };
    assert!(matches!(
        canvas.stream(&mut late, "invoice", &StreamOptions::default()),
        Err(CanvasError::HeadersSent)
    ));
}

#[test]
fn document_info_goes_to_the_engine() {
    let mut canvas = letter_canvas();
    canvas.add_info("Title", "Quarterly report").unwrap();
    assert!(canvas.engine().calls.iter().any(|(_, c)| *c
        == Call::SetInfo("Title".to_string(), "Quarterly report".to_string())));
}
