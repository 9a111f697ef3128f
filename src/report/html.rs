// Self-contained HTML rendering for a ReportDocument

use base64::Engine;
use image::ImageFormat;
use std::fmt::Write;
use std::fs;
use std::path::Path;

use super::{ReportDocument, ReportRow, Verdict};

const STYLE: &str = "\
body{font-family:-apple-system,Segoe UI,Helvetica,Arial,sans-serif;margin:24px;color:#1d1f23;background:#f6f7f9}\
h1{margin:0 0 8px}\
.meta{color:#555;margin-bottom:16px}\
.meta code{background:#eceef1;padding:1px 4px;border-radius:3px}\
.summary{display:flex;gap:12px;margin-bottom:24px}\
.summary div{background:#fff;border-radius:6px;padding:10px 16px;box-shadow:0 1px 2px rgba(0,0,0,.08)}\
.summary strong{display:block;font-size:22px}\
.row{background:#fff;border-radius:6px;padding:14px;margin-bottom:16px;box-shadow:0 1px 2px rgba(0,0,0,.08)}\
.row h2{font-size:16px;margin:0 0 6px}\
.badge{display:inline-block;padding:2px 8px;border-radius:10px;color:#fff;font-size:12px;margin-right:8px}\
.badge.pass{background:#2e8540}.badge.fail{background:#cd2026}.badge.error{background:#7d3c98}\
.reason{color:#cd2026;margin:6px 0}\
.urls{font-size:13px;margin-bottom:8px}\
.images{display:grid;grid-template-columns:repeat(3,1fr);gap:10px}\
.images figure{margin:0}\
.images img{width:100%;border:1px solid #ddd}\
.placeholder{display:flex;align-items:center;justify-content:center;height:160px;border:1px dashed #bbb;color:#888;background:#fafafa}";

/// Render the whole document. Artifacts are read from disk and inlined.
pub fn render_html(doc: &ReportDocument) -> String {
    let mut out = String::with_capacity(16 * 1024);
    let meta = &doc.meta;
    let summary = &doc.summary;

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Visual comparison report ({device})</title>\n<style>{STYLE}</style>\n</head>\n<body>\n",
        device = escape(&meta.device),
    );

    let _ = write!(
        out,
        "<h1>Visual comparison report</h1>\n<div class=\"meta\">\
         Staging <code>{staging}</code> vs production <code>{production}</code><br>\
         Device {device} ({w}x{h}) &middot; pass threshold {threshold:.1}% &middot; \
         generated {generated} on {host}</div>\n",
        staging = escape(&meta.staging_base),
        production = escape(&meta.production_base),
        device = escape(&meta.device),
        w = meta.viewport.0,
        h = meta.viewport.1,
        threshold = meta.threshold,
        generated = meta.generated.format("%Y-%m-%d %H:%M:%S UTC"),
        host = escape(&meta.host),
    );

    let _ = write!(
        out,
        "<div class=\"summary\"><div>Pages<strong>{}</strong></div>\
         <div>Passed<strong>{}</strong></div><div>Failed<strong>{}</strong></div>\
         <div>Errors<strong>{}</strong></div></div>\n",
        summary.total, summary.passed, summary.failed, summary.errors
    );

    for row in &doc.rows {
        render_row(&mut out, row);
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn render_row(out: &mut String, row: &ReportRow) {
    let result = &row.result;
    let class = match row.verdict {
        Verdict::Pass => "pass",
        Verdict::Fail => "fail",
        Verdict::Error => "error",
    };
    let score = result
        .outcome
        .similarity()
        .map(|s| format!("{:.2}% similar", s))
        .unwrap_or_default();

    let _ = write!(
        out,
        "<div class=\"row\">\n<h2><span class=\"badge {class}\">{label}</span>{page} {score}</h2>\n",
        label = row.verdict.label(),
        page = escape(result.page.as_str()),
    );

    if let Some(reason) = result.outcome.error_message() {
        let _ = write!(out, "<div class=\"reason\">{}</div>\n", escape(&reason));
    }

    let _ = write!(
        out,
        "<div class=\"urls\"><a href=\"{s}\">{s}</a> &harr; <a href=\"{p}\">{p}</a></div>\n\
         <div class=\"images\">\n",
        s = escape(&result.staging_url),
        p = escape(&result.production_url),
    );

    figure(out, "Staging", result.staging_capture.as_deref());
    figure(out, "Production", result.production_capture.as_deref());
    figure(out, "Diff", result.outcome.diff_artifact().map(|p| p.as_path()));

    out.push_str("</div>\n</div>\n");
}

fn figure(out: &mut String, caption: &str, artifact: Option<&Path>) {
    match artifact.and_then(data_uri) {
        Some(uri) => {
            let _ = write!(
                out,
                "<figure><img alt=\"{caption}\" src=\"{uri}\"><figcaption>{caption}</figcaption></figure>\n"
            );
        }
        None => {
            let _ = write!(
                out,
                "<figure><div class=\"placeholder\">{caption} not available</div>\
                 <figcaption>{caption}</figcaption></figure>\n"
            );
        }
    }
}

/// Inline an artifact, or None when it is unreadable or not a browser image format
fn data_uri(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok().filter(|b| !b.is_empty())?;
    let mime = mime_type(&bytes)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Some(format!("data:{};base64,{}", mime, encoded))
}

/// Sniff the image format from its header
fn mime_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        _ => None,
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{ComparisonResult, Outcome};
    use crate::device::DeviceProfile;
    use crate::pages::{PagePath, PageSet};
    use crate::report::ReportMeta;

    fn meta() -> ReportMeta {
        let pages = PageSet::new("https://staging.example.com", "https://www.example.com", ["/"]).unwrap();
        ReportMeta::new(&pages, DeviceProfile::Desktop)
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_missing_artifacts_render_placeholders() {
        let result = ComparisonResult::error(
            PagePath::new("/gone"),
            "https://staging.example.com/gone".to_string(),
            "https://www.example.com/gone".to_string(),
            "staging capture failed: <timeout>",
        );
        let html = ReportDocument::build(meta(), vec![result]).to_html();

        assert!(html.contains("Staging not available"));
        assert!(html.contains("Production not available"));
        assert!(html.contains("Diff not available"));
        assert!(html.contains("&lt;timeout&gt;"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_artifacts_are_inlined() {
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("a.png");
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([1, 2, 3, 255]));
        img.save(&png).unwrap();

        let result = ComparisonResult {
            page: PagePath::new("/"),
            staging_url: "https://staging.example.com/".to_string(),
            production_url: "https://www.example.com/".to_string(),
            staging_capture: Some(png.clone()),
            production_capture: Some(png.clone()),
            outcome: Outcome::Scored {
                similarity: 100.0,
                diff_artifact: png,
            },
        };
        let html = ReportDocument::build(meta(), vec![result]).to_html();

        assert_eq!(html.matches("src=\"data:image/png;base64,").count(), 3);
        assert!(!html.contains(dir.path().to_string_lossy().as_ref()));
        assert!(html.contains("100.00% similar"));
    }

    #[test]
    fn test_data_uri_matches_capture_format() {
        let dir = tempfile::tempdir().unwrap();
        let jpeg = dir.path().join("capture.jpg");
        image::RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]))
            .save(&jpeg)
            .unwrap();
        let garbage = dir.path().join("capture.png");
        fs::write(&garbage, b"<html>error page</html>").unwrap();

        assert!(data_uri(&jpeg).unwrap().starts_with("data:image/jpeg;base64,"));
        assert_eq!(data_uri(&garbage), None);
        assert_eq!(data_uri(&dir.path().join("missing.png")), None);
    }

    #[test]
    fn test_header_names_both_environments() {
        let doc = ReportDocument::build(meta(), Vec::new());
        let html = render_html(&doc);
        assert!(html.contains("https://staging.example.com"));
        assert!(html.contains("https://www.example.com"));
        assert!(html.contains("Pages<strong>0</strong>"));
    }
}
