pub mod markdown;
pub mod sanitize;

pub use ammonia::clean_text;
pub use markdown::to_html;
pub use sanitize::sanitize_preview;

/// Renders Markdown into markup that is safe to drop into a preview page.
///
/// Total over any input: malformed Markdown still yields markup.
pub fn render(src: &str) -> String {
    sanitize_preview(&to_html(src))
}
