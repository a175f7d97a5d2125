//! Injects the template version's CSS into `<head><style>` and turns its
//! page settings into `@page` rules.

use crate::context::PageSettings;

pub fn inject(html: &str, css: Option<&str>, settings: &PageSettings) -> String {
    let mut style_body = String::new();

    if let Some(page_rule) = page_rule(settings) {
        style_body.push_str(&page_rule);
        style_body.push('\n');
    }
    if let Some(css) = css {
        style_body.push_str(css);
    }

    if style_body.trim().is_empty() {
        return html.to_string();
    }

    let style_block = format!("<style>\n{style_body}\n</style>");

    if let Some(head_close) = html.find("</head>") {
        let mut out = String::with_capacity(html.len() + style_block.len());
        out.push_str(&html[..head_close]);
        out.push_str(&style_block);
        out.push_str(&html[head_close..]);
        out
    } else if let Some(html_open_end) = html.find("<html").and_then(|i| html[i..].find('>').map(|j| i + j + 1)) {
        let mut out = String::with_capacity(html.len() + style_block.len());
        out.push_str(&html[..html_open_end]);
        out.push_str(&format!("<head>{style_block}</head>"));
        out.push_str(&html[html_open_end..]);
        out
    } else {
        format!("<head>{style_block}</head>{html}")
    }
}

fn page_rule(settings: &PageSettings) -> Option<String> {
    if settings.size.is_none() && settings.orientation.is_none() && settings.margin.is_none() {
        return None;
    }
    let mut rule = String::from("@page {");
    if let Some(size) = &settings.size {
        match &settings.orientation {
            Some(o) => rule.push_str(&format!(" size: {size} {o};")),
            None => rule.push_str(&format!(" size: {size};")),
        }
    } else if let Some(o) = &settings.orientation {
        rule.push_str(&format!(" size: {o};"));
    }
    if let Some(margin) = &settings.margin {
        rule.push_str(&format!(" margin: {margin};"));
    }
    rule.push_str(" }");
    Some(rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_style_block_before_head_close() {
        let html = "<html><head></head><body></body></html>";
        let out = inject(html, Some("body { color: red; }"), &PageSettings::default());
        assert!(out.contains("<style>"));
        assert!(out.find("<style>").unwrap() < out.find("</head>").unwrap());
    }

    #[test]
    fn builds_page_rule_from_settings() {
        let settings = PageSettings {
            size: Some("A4".into()),
            orientation: Some("landscape".into()),
            margin: Some("1cm".into()),
        };
        let html = "<html><head></head><body></body></html>";
        let out = inject(html, None, &settings);
        assert!(out.contains("@page { size: A4 landscape; margin: 1cm; }"));
    }

    #[test]
    fn no_css_and_no_settings_leaves_html_untouched() {
        let html = "<html><head></head><body></body></html>";
        assert_eq!(inject(html, None, &PageSettings::default()), html);
    }
}
