use ammonia::Builder;

/// Strips anything executable from rendered preview markup while keeping
/// the classes the preview page styles (math and mermaid blocks).
pub fn sanitize_preview(html: &str) -> String {
    preview_sanitizer().clean(html).to_string()
}

/// Sanitizes with ammonia's defaults only.
pub fn sanitize_html(html: &str) -> String {
    Builder::new().clean(html).to_string()
}

fn preview_sanitizer() -> Builder<'static> {
    let mut builder = Builder::new();
    builder
        .add_allowed_classes("span", &["math-inline"])
        .add_allowed_classes("div", &["math-block", "mermaid"])
        .add_tag_attributes("span", &["data-math"])
        .add_tag_attributes("div", &["data-math"]);
    builder
}
