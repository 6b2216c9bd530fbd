//! Minimal HTML emission for the rendered outcomes.

/// Escapes text for use inside a double-quoted attribute value.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

/// Makes text safe to embed in a raw-text element such as `<script>` or
/// `<style>`: no `</` sequence can close the element early.
pub fn escape_raw_text(text: &str) -> String {
    text.replace("</", "<\\/")
}

/// `<link rel="stylesheet" href="...">`
pub fn stylesheet_link(href: &str) -> String {
    format!("<link rel=\"stylesheet\" href=\"{}\">", escape_attr(href))
}

/// `<link rel="stylesheet/less" type="text/css" href="...">`, picked up by the
/// client-side compiler.
pub fn client_stylesheet_link(href: &str) -> String {
    format!(
        "<link rel=\"stylesheet/less\" type=\"text/css\" href=\"{}\">",
        escape_attr(href)
    )
}

/// `<style>...</style>`
pub fn style_block(css: &str) -> String {
    format!("<style>{}</style>", escape_raw_text(css))
}

/// `<script>...</script>`
pub fn script_block(code: &str) -> String {
    format!("<script>{}</script>", escape_raw_text(code))
}

/// `<script src="..."></script>`
pub fn script_src(src: &str) -> String {
    format!("<script src=\"{}\"></script>", escape_attr(src))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_are_escaped() {
        assert_eq!(escape_attr(r#"/a?x="1"&y<2>"#), "/a?x=&quot;1&quot;&amp;y&lt;2&gt;");
    }

    #[test]
    fn style_cannot_be_closed_early() {
        let html = style_block("a{content:\"</style><script>\"}");
        assert_eq!(html.matches("</style>").count(), 1);
        assert!(html.ends_with("</style>"));
    }

    #[test]
    fn tags() {
        assert_eq!(stylesheet_link("/css/a.css"), r#"<link rel="stylesheet" href="/css/a.css">"#);
        assert_eq!(
            client_stylesheet_link("/styles.less"),
            r#"<link rel="stylesheet/less" type="text/css" href="/styles.less">"#
        );
        assert_eq!(script_src("/js/less.min.js"), r#"<script src="/js/less.min.js"></script>"#);
        assert_eq!(script_block("less = {};"), "<script>less = {};</script>");
    }
}
