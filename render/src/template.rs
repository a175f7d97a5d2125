//! Dual-mode HTML templating.
//!
//! If the source HTML carries any `th:*`, `#{…}`, or `*{…}` markers it is
//! processed by the minimal expression engine below; otherwise plain
//! `{{name}}` substitution is used. Neither mode uses an HTML parser —
//! both operate on the markup as text, the same way the literal
//! substitution half of the contract is specified (`{{recipient.x}}`
//! string replacement). There's no templating crate in the surrounding
//! codebase to ground this on, so the expression half is a small
//! hand-rolled subset rather than a full Thymeleaf-equivalent: it covers
//! `th:text` and `th:if` on a single element, `${...}` property lookup
//! against the same scope the literal engine resolves against, and
//! `#{key}`/`*{key}` treated as scope lookups too (a full message bundle
//! and object-scoping stack are out of scope for this renderer).

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// The four namespaces a `{{...}}` / `${...}` path can resolve against.
pub struct Scope<'a> {
    pub recipient: &'a Value,
    pub metadata: &'a Value,
    pub certificate: &'a Value,
    pub template: &'a Value,
    pub template_version: i32,
}

impl<'a> Scope<'a> {
    /// Resolves a dotted path. `recipient.x` / `metadata.x` /
    /// `certificate.x` / `template.x` are explicit namespaces; a bare
    /// name is tried against `recipient` first, then `metadata`.
    pub fn resolve(&self, path: &str) -> Option<String> {
        if path == "templateVersion" {
            return Some(self.template_version.to_string());
        }
        let (root, rest) = match path.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (path, None),
        };
        let root_value = match root {
            "recipient" => Some(self.recipient),
            "metadata" => Some(self.metadata),
            "certificate" => Some(self.certificate),
            "template" => Some(self.template),
            _ => None,
        };
        if let Some(value) = root_value {
            return rest.and_then(|r| lookup(value, r)).map(stringify);
        }
        lookup(self.recipient, path)
            .or_else(|| lookup(self.metadata, path))
            .map(stringify)
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |acc, segment| acc.get(segment))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn marker_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"th:\w+\s*=|#\{[^}]*\}|\*\{[^}]*\}").unwrap())
}

fn literal_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([\w.]+)\s*\}\}").unwrap())
}

pub fn has_expression_markers(html: &str) -> bool {
    marker_pattern().is_match(html)
}

/// Literal `{{name}}` substitution. Unresolvable paths are left as-is so
/// a template typo is visible in the rendered output rather than silently
/// blanked.
pub fn render_literal(html: &str, scope: &Scope) -> String {
    literal_pattern()
        .replace_all(html, |caps: &regex::Captures| {
            let path = &caps[1];
            scope.resolve(path).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Minimal `th:text` / `th:if` expression engine.
pub fn render_expressions(html: &str, scope: &Scope) -> String {
    let tag_re = expr_tag_pattern();
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;

    loop {
        let Some(caps) = tag_re.captures(&html[cursor..]) else {
            out.push_str(&html[cursor..]);
            break;
        };
        let whole = caps.get(0).unwrap();
        let tag_name = &caps[1];
        let directive = &caps[2];
        let expr = &caps[3];

        let match_start = cursor + whole.start();
        let match_end = cursor + whole.end();
        out.push_str(&html[cursor..match_start]);

        let value = eval_expr(expr, scope);

        if directive == "th:if" {
            if is_truthy(&value) {
                out.push_str(strip_th_attrs(whole.as_str()).as_str());
                cursor = match_end;
            } else {
                match find_matching_close(html, tag_name, match_end) {
                    Some(close_end) => cursor = close_end,
                    None => cursor = match_end,
                }
            }
            continue;
        }

        // th:text
        out.push_str(strip_th_attrs(whole.as_str()).as_str());
        if let Some(close_start) = html[match_end..].find(&format!("</{tag_name}>")) {
            out.push_str(&value.unwrap_or_default());
            cursor = match_end + close_start;
        } else {
            cursor = match_end;
        }
    }

    out
}

fn expr_tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<(\w[\w-]*)\b[^>]*?\s(th:text|th:if)="([^"]*)"[^>]*>"#).unwrap()
    })
}

fn strip_th_attrs(tag: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r#"\s(th:text|th:if)="[^"]*""#).unwrap());
    re.replace_all(tag, "").into_owned()
}

fn eval_expr(expr: &str, scope: &Scope) -> Option<String> {
    let trimmed = expr.trim();
    let inner = trimmed
        .strip_prefix("${")
        .or_else(|| trimmed.strip_prefix("#{"))
        .or_else(|| trimmed.strip_prefix("*{"))
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);
    scope.resolve(inner)
}

fn is_truthy(value: &Option<String>) -> bool {
    match value {
        None => false,
        Some(s) => !s.is_empty() && s != "false" && s != "0",
    }
}

/// Scans forward from `start` counting nested `<tag` / `</tag>`
/// occurrences to find the closing tag matching the element that opened
/// at `start`. Returns the index just past that closing tag.
fn find_matching_close(html: &str, tag_name: &str, start: usize) -> Option<usize> {
    let open_needle = format!("<{tag_name}");
    let close_needle = format!("</{tag_name}>");
    let mut depth = 1i32;
    let mut pos = start;
    while pos < html.len() {
        let next_open = html[pos..].find(&open_needle).map(|i| pos + i);
        let next_close = html[pos..].find(&close_needle).map(|i| pos + i);
        match (next_open, next_close) {
            (Some(o), Some(c)) if o < c => {
                depth += 1;
                pos = o + open_needle.len();
            }
            (_, Some(c)) => {
                depth -= 1;
                pos = c + close_needle.len();
                if depth == 0 {
                    return Some(pos);
                }
            }
            _ => return None,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope<'a>(recipient: &'a Value, metadata: &'a Value, certificate: &'a Value, template: &'a Value) -> Scope<'a> {
        Scope { recipient, metadata, certificate, template, template_version: 1 }
    }

    #[test]
    fn detects_expression_markers() {
        assert!(has_expression_markers(r#"<span th:text="${recipient.name}"></span>"#));
        assert!(has_expression_markers("#{greeting}"));
        assert!(!has_expression_markers("<p>{{recipient.name}}</p>"));
    }

    #[test]
    fn literal_substitution_resolves_namespaced_paths() {
        let recipient = json!({"name": "Ada"});
        let metadata = json!({"course": "Rust"});
        let cert = json!({});
        let tmpl = json!({});
        let s = scope(&recipient, &metadata, &cert, &tmpl);
        let out = render_literal("Hello {{recipient.name}}, course {{metadata.course}}", &s);
        assert_eq!(out, "Hello Ada, course Rust");
    }

    #[test]
    fn bare_name_resolves_from_recipient_then_metadata() {
        let recipient = json!({"name": "Ada"});
        let metadata = json!({"course": "Rust"});
        let cert = json!({});
        let tmpl = json!({});
        let s = scope(&recipient, &metadata, &cert, &tmpl);
        let out = render_literal("{{name}} studied {{course}}", &s);
        assert_eq!(out, "Ada studied Rust");
    }

    #[test]
    fn unresolvable_path_is_left_untouched() {
        let recipient = json!({});
        let metadata = json!({});
        let cert = json!({});
        let tmpl = json!({});
        let s = scope(&recipient, &metadata, &cert, &tmpl);
        assert_eq!(render_literal("{{missing}}", &s), "{{missing}}");
    }

    #[test]
    fn th_text_replaces_element_content() {
        let recipient = json!({"name": "Ada"});
        let metadata = json!({});
        let cert = json!({});
        let tmpl = json!({});
        let s = scope(&recipient, &metadata, &cert, &tmpl);
        let out = render_expressions(r#"<span th:text="${recipient.name}">placeholder</span>"#, &s);
        assert_eq!(out, "<span>Ada</span>");
    }

    #[test]
    fn th_if_removes_element_when_falsy() {
        let recipient = json!({});
        let metadata = json!({});
        let cert = json!({});
        let tmpl = json!({});
        let s = scope(&recipient, &metadata, &cert, &tmpl);
        let out = render_expressions(r#"<div th:if="${recipient.honors}">Honors</div>tail"#, &s);
        assert_eq!(out, "tail");
    }

    #[test]
    fn th_if_keeps_element_when_truthy() {
        let recipient = json!({"honors": "true"});
        let metadata = json!({});
        let cert = json!({});
        let tmpl = json!({});
        let s = scope(&recipient, &metadata, &cert, &tmpl);
        let out = render_expressions(r#"<div th:if="${recipient.honors}">Honors</div>"#, &s);
        assert_eq!(out, "<div>Honors</div>");
    }
}
