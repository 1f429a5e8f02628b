use comrak::{markdown_to_html, ComrakOptions};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MATH_INLINE: Regex = Regex::new(r"\$([^\$\n]+)\$")
        .expect("Invalid MATH_INLINE regex pattern");
    static ref MATH_BLOCK: Regex = Regex::new(r"\$\$([^\$]+)\$\$")
        .expect("Invalid MATH_BLOCK regex pattern");
    static ref MERMAID_BLOCK: Regex =
        Regex::new(r#"<pre><code class="language-mermaid">([^<]*)</code></pre>"#)
            .expect("Invalid MERMAID_BLOCK regex pattern");
}

/// Markdown to HTML with GFM extensions, math spans and mermaid blocks.
pub fn to_html(src: &str) -> String {
    let opt = preview_options();
    let html = markdown_to_html(src, &opt);
    patch_mermaid_blocks(&patch_math_blocks(&html))
}

fn preview_options() -> ComrakOptions<'static> {
    let mut opt = ComrakOptions::default();

    opt.extension.strikethrough = true;
    opt.extension.table = true;
    opt.extension.autolink = true;
    opt.extension.tasklist = true;
    opt.extension.footnotes = true;

    // Raw HTML in a note is shown, never executed
    opt.render.unsafe_ = false;
    opt.render.escape = true;

    opt
}

pub fn patch_math_blocks(html: &str) -> String {
    // $$...$$ has to go first or the inline pattern eats its delimiters
    let result = MATH_BLOCK.replace_all(
        html,
        r#"<div class="math-block" data-math="$1">$$$$$1$$$$</div>"#,
    );

    MATH_INLINE
        .replace_all(
            &result,
            r#"<span class="math-inline" data-math="$1">$$$1$$</span>"#,
        )
        .into_owned()
}

pub fn patch_mermaid_blocks(html: &str) -> String {
    MERMAID_BLOCK
        .replace_all(html, r#"<div class="mermaid">$1</div>"#)
        .into_owned()
}
