//! HTML markup of a rendered document.

use super::{Align, Block, BlockKind, RenderedDocument, Run, RunStyle};
use std::fmt::Write;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn align_style(align: Align) -> &'static str {
    match align {
        Align::Left => "",
        Align::Center => " style=\"text-align: center\"",
        Align::Right => " style=\"text-align: right\"",
        Align::Justify => " style=\"text-align: justify\"",
    }
}

fn styled_text(text: &str, style: &RunStyle) -> String {
    let mut html = escape(text);
    if style.code {
        html = format!("<code>{html}</code>");
    }
    if style.bold {
        html = format!("<strong>{html}</strong>");
    }
    if style.italic {
        html = format!("<em>{html}</em>");
    }
    if style.underline {
        html = format!("<u>{html}</u>");
    }
    if style.strike {
        html = format!("<s>{html}</s>");
    }
    let mut css = Vec::new();
    if let Some(color) = style.color {
        css.push(format!("color: {}", color.to_hex()));
    }
    if let Some(background) = style.background {
        css.push(format!("background-color: {}", background.to_hex()));
    }
    if !css.is_empty() {
        html = format!("<span style=\"{}\">{html}</span>", css.join("; "));
    }
    if let Some(link) = style.link.as_deref() {
        html = format!("<a href=\"{}\">{html}</a>", escape(link));
    }
    html
}

fn inline_html(block: &Block) -> String {
    if block.runs.is_empty() {
        return "<br>".to_string();
    }
    block
        .runs
        .iter()
        .map(|run| match run {
            Run::Text { text, style } => styled_text(text, style),
            Run::Image { source } => format!("<img src=\"{}\">", escape(source)),
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Container {
    None,
    Ordered,
    Bullet,
    Code,
}

fn container_of(kind: BlockKind) -> Container {
    match kind {
        BlockKind::ListItem { ordered: true, .. } => Container::Ordered,
        BlockKind::ListItem { ordered: false, .. } => Container::Bullet,
        BlockKind::CodeBlock => Container::Code,
        _ => Container::None,
    }
}

fn close(out: &mut String, container: Container) {
    match container {
        Container::Ordered => out.push_str("</ol>\n"),
        Container::Bullet => out.push_str("</ul>\n"),
        Container::Code => out.push_str("</pre>\n"),
        Container::None => {}
    }
}

/// Standalone HTML page for the document; consecutive list items and code
/// lines share one `<ol>`/`<ul>`/`<pre>` container.
pub fn to_html(document: &RenderedDocument, title: &str) -> String {
    let mut body = String::new();
    let mut open = Container::None;
    for block in &document.blocks {
        let container = container_of(block.kind);
        if container != open {
            close(&mut body, open);
            match container {
                Container::Ordered => body.push_str("<ol>\n"),
                Container::Bullet => body.push_str("<ul>\n"),
                Container::Code => body.push_str("<pre>"),
                Container::None => {}
            }
        } else if container == Container::Code {
            body.push('\n');
        }
        open = container;

        let align = align_style(block.align);
        let _ = match block.kind {
            BlockKind::Heading(level) => {
                writeln!(body, "<h{level}{align}>{}</h{level}>", inline_html(block))
            }
            BlockKind::ListItem { .. } => writeln!(
                body,
                "<li class=\"indent-{}\"{align}>{}</li>",
                block.indent,
                inline_html(block)
            ),
            BlockKind::CodeBlock => write!(body, "{}", escape(&block.text())),
            BlockKind::Blockquote => {
                writeln!(body, "<blockquote{align}>{}</blockquote>", inline_html(block))
            }
            BlockKind::PageBreak => writeln!(
                body,
                "<div class=\"page-break\" style=\"page-break-after: always\"></div>"
            ),
            BlockKind::Paragraph => writeln!(body, "<p{align}>{}</p>", inline_html(block)),
        };
    }
    close(&mut body, open);

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(title),
        body
    )
}
