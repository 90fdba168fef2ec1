// Positional table extraction over raw markup.
//
// This is a tag scanner, not a DOM: it knows enough about comments, raw-text
// elements and implicitly closed cells to walk exchange quote pages, and
// nothing more. Tables are numbered in document order of their opening tags,
// nested tables included.

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
}

#[derive(Debug, Clone, Copy)]
struct Tag<'a> {
    kind: TagKind,
    name: &'a str,
    /// Byte offset of `<`.
    start: usize,
    /// Byte offset just past `>`.
    end: usize,
}

fn tag_name(lc: &str, from: usize) -> &str {
    let rest = &lc[from..];
    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(rest.len());
    &rest[..len]
}

/// Offset just past the `>` closing the tag that opens at `from`.
///
/// A `>` inside a quoted attribute value does not end the tag.
fn tag_end(s: &str, from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (off, &b) in s.as_bytes()[from..].iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(from + off + 1),
            _ => {}
        }
    }
    None
}

/// Tokenize `lc` (already ASCII-lowercased) into open/close tags.
fn scan_tags(lc: &str) -> Vec<Tag<'_>> {
    let bytes = lc.as_bytes();
    let mut out = Vec::new();
    let mut i = 0usize;

    while let Some(rel) = lc[i..].find('<') {
        let p = i + rel;

        if lc[p..].starts_with("<!--") {
            i = match lc[p + 4..].find("-->") {
                Some(e) => p + 4 + e + 3,
                None => lc.len(),
            };
            continue;
        }

        let (kind, name_at) = match bytes.get(p + 1) {
            Some(b'/') => (TagKind::Close, p + 2),
            Some(b) if b.is_ascii_alphabetic() => (TagKind::Open, p + 1),
            _ => {
                i = p + 1;
                continue;
            }
        };

        let name = tag_name(lc, name_at);
        let Some(end) = tag_end(lc, p) else { break };
        if name.is_empty() {
            i = end;
            continue;
        }
        out.push(Tag { kind, name, start: p, end });
        i = end;

        // Raw-text elements: skip straight to their closing tag.
        if kind == TagKind::Open && matches!(name, "script" | "style") {
            let close = format!("</{name}");
            i = match lc[i..].find(&close) {
                Some(e) => i + e,
                None => lc.len(),
            };
        }
    }
    out
}

/// `(opening tag index, body end offset)` of each `<table>`, in opening order.
fn table_bodies(tags: &[Tag<'_>], doc_len: usize) -> Vec<(usize, usize)> {
    let mut bodies: Vec<(usize, usize)> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    for (ti, t) in tags.iter().enumerate() {
        if t.name != "table" {
            continue;
        }
        match t.kind {
            TagKind::Open => {
                open.push(bodies.len());
                bodies.push((ti, doc_len));
            }
            TagKind::Close => {
                if let Some(b) = open.pop() {
                    bodies[b].1 = t.start;
                }
            }
        }
    }
    bodies
}

/// Where the cell opened by `tags[open_ti]` ends.
fn cell_end(tags: &[Tag<'_>], open_ti: usize, limit: usize) -> usize {
    let mut nested = 0usize;
    for t in &tags[open_ti + 1..] {
        if t.start >= limit {
            break;
        }
        match (t.kind, t.name) {
            (TagKind::Open, "table") => nested += 1,
            (TagKind::Close, "table") => {
                if nested == 0 {
                    return t.start;
                }
                nested -= 1;
            }
            (TagKind::Open, "td" | "th" | "tr") | (TagKind::Close, "td" | "tr") if nested == 0 => {
                return t.start;
            }
            _ => {}
        }
    }
    limit
}

/// Text of every `<td>` inside the table at `index`, left-to-right, top-to-bottom.
///
/// No check is made that the located table has any particular shape.
pub fn table_cells(doc: &str, index: usize) -> Result<Vec<String>, ParseError> {
    // ASCII lowercasing keeps byte offsets aligned with `doc`.
    let lc = doc.to_ascii_lowercase();
    let tags = scan_tags(&lc);
    let bodies = table_bodies(&tags, lc.len());

    let &(open_ti, body_end) = bodies.get(index).ok_or(ParseError::TableNotFound {
        index,
        found: bodies.len(),
    })?;

    let mut cells = Vec::new();
    for (ti, t) in tags.iter().enumerate().skip(open_ti + 1) {
        if t.start >= body_end {
            break;
        }
        if t.kind == TagKind::Open && t.name == "td" {
            let end = cell_end(&tags, ti, body_end);
            cells.push(cell_text(&doc[t.end..end.max(t.end)]));
        }
    }
    Ok(cells)
}

/// Visible text of a markup fragment: tags removed, entities decoded, whitespace trimmed.
pub fn cell_text(fragment: &str) -> String {
    normalize_ws(&decode_entities(&strip_tags(fragment)))
}

pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut i = 0usize;

    while let Some(rel) = s[i..].find('<') {
        let p = i + rel;
        out.push_str(&s[i..p]);
        match tag_end(s, p) {
            Some(end) => i = end,
            None => return out,
        }
    }
    out.push_str(&s[i..]);
    out
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <script>var t = "<table><td>not me</td></table>";</script>
        <style>td { color: red; }</style>
        </head><body>
        <!-- <table><tr><td>commented</td></tr></table> -->
        <TABLE id="nav"><tr><td>Home</td><td>Quotes</td></tr></TABLE>
        <table class="outer">
          <tr><th>Sym</th><th>Last</th></tr>
          <tr><td> VXF4 </td><td>15.20</td></tr>
          <tr><td>VXG4<td>16.05</tr>
          <tr><td><table><tr><td>inner</td></tr></table></td><td>x</td></tr>
        </table>
        <table><tr><td>tail &amp; end</td><td>&nbsp;1,000&nbsp;</td></tr></table>
        </body></html>"#;

    #[test]
    fn tables_are_counted_in_document_order_including_nested() {
        // nav, outer, inner, tail
        assert_eq!(
            table_cells(PAGE, 4),
            Err(ParseError::TableNotFound { index: 4, found: 4 })
        );
    }

    #[test]
    fn cells_flatten_row_major_and_tolerate_unclosed_tds() {
        let cells = table_cells(PAGE, 1).unwrap();
        assert_eq!(
            cells,
            vec!["VXF4", "15.20", "VXG4", "16.05", "inner", "inner", "x"]
        );
    }

    #[test]
    fn nested_table_is_addressable_on_its_own() {
        assert_eq!(table_cells(PAGE, 2).unwrap(), vec!["inner"]);
    }

    #[test]
    fn entities_are_decoded_and_text_trimmed() {
        assert_eq!(table_cells(PAGE, 3).unwrap(), vec!["tail & end", "1,000"]);
    }

    #[test]
    fn uppercase_tags_match() {
        assert_eq!(table_cells(PAGE, 0).unwrap(), vec!["Home", "Quotes"]);
    }

    #[test]
    fn missing_index_reports_how_many_tables_exist() {
        assert_eq!(
            table_cells(PAGE, 6),
            Err(ParseError::TableNotFound { index: 6, found: 4 })
        );
    }

    #[test]
    fn cell_text_strips_inline_markup() {
        assert_eq!(cell_text("<a href=\"/x\"><b>VX</b>F4</a>\n "), "VXF4");
    }

    #[test]
    fn quoted_gt_inside_attributes_stays_in_the_tag() {
        let doc = r#"<table><tr>
            <td><a href="/vx" title="VX > spot">VXF24</a></td>
            <td data-note='1 > 0'>2024-01-17</td>
            <td>15.2</td><td>0.1</td><td>15.5</td><td>15.0</td><td>15.1</td>
            <td>1,000</td><td>2,000</td>
        </tr></table>"#;
        let cells = table_cells(doc, 0).unwrap();
        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0], "VXF24");
        assert_eq!(cells[1], "2024-01-17");

        let table =
            crate::quotes::normalize(&cells, crate::quotes::NormalizeOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].symbol, "VXF24");
    }

    #[test]
    fn strip_tags_respects_quoted_attributes() {
        assert_eq!(strip_tags(r#"<span title="a > b">x</span>y"#), "xy");
        assert_eq!(strip_tags("<b>open"), "open");
    }
}
