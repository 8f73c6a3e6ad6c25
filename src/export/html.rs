//! Tolerant HTML reading for table export
//!
//! Builds a small element tree from server-rendered markup, recovering from
//! the implicit end tags HTML allows (`<tr><td>a<td>b`), and answers the two
//! queries the exporter needs: every `tr` under a `table` in document order,
//! and every `td`/`th` under a row. Cell text approximates what a browser
//! renders: tags stripped, entities decoded, whitespace collapsed, `<br>` and
//! block elements turned into line breaks, `script`/`style` bodies dropped.

use super::{TableRows, TableSource};
use anyhow::Result;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "template", "noscript"];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "dt", "dd", "fieldset",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

const TABLE_SECTIONS: &[&str] = &["thead", "tbody", "tfoot"];

type NodeId = usize;

#[derive(Debug)]
enum NodeKind {
    Document,
    Element(String),
    Text(String),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
}

/// Parsed HTML document
#[derive(Debug)]
pub struct HtmlDocument {
    nodes: Vec<Node>,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        let mut builder = TreeBuilder::new();
        Tokenizer::new(html).run(&mut builder);
        builder.finish()
    }

    /// Every `tr` that sits inside a `table`, in document order
    fn table_row_ids(&self) -> Vec<NodeId> {
        let mut rows = Vec::new();
        self.walk(0, false, &mut |id, in_table| {
            if in_table && self.is_element(id, "tr") {
                rows.push(id);
            }
        });
        rows
    }

    /// `td` and `th` descendants of a row, in document order
    fn cell_ids(&self, row: NodeId) -> Vec<NodeId> {
        let mut cells = Vec::new();
        for &child in &self.nodes[row].children {
            self.walk(child, true, &mut |id, _| {
                if self.is_element(id, "td") || self.is_element(id, "th") {
                    cells.push(id);
                }
            });
        }
        cells
    }

    /// Pre-order traversal of `id` and its descendants
    fn walk(&self, id: NodeId, in_table: bool, visit: &mut dyn FnMut(NodeId, bool)) {
        let mut stack = vec![(id, in_table)];
        while let Some((id, in_table)) = stack.pop() {
            visit(id, in_table);
            let in_table = in_table || self.is_element(id, "table");
            stack.extend(
                self.nodes[id]
                    .children
                    .iter()
                    .rev()
                    .map(|&child| (child, in_table)),
            );
        }
    }

    fn is_element(&self, id: NodeId, name: &str) -> bool {
        matches!(&self.nodes[id].kind, NodeKind::Element(tag) if tag == name)
    }

    /// Rendered text of a node
    pub(crate) fn inner_text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        self.collect_text(id, &mut raw);
        normalize_rendered_text(&raw)
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        enum Step {
            Children(NodeId),
            Node(NodeId),
            Push(char),
        }

        let mut stack = vec![Step::Children(id)];
        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Push(c) => {
                    out.push(c);
                    continue;
                }
                Step::Children(id) => {
                    stack.extend(self.nodes[id].children.iter().rev().map(|&c| Step::Node(c)));
                    continue;
                }
                Step::Node(id) => id,
            };

            // Separator written around the node's contents
            let around = match &self.nodes[id].kind {
                NodeKind::Text(text) => {
                    out.extend(
                        text.chars()
                            .map(|c| if c.is_ascii_whitespace() { ' ' } else { c }),
                    );
                    continue;
                }
                NodeKind::Element(tag) if tag == "br" => {
                    out.push('\n');
                    continue;
                }
                NodeKind::Element(tag) if BLOCK_ELEMENTS.contains(&tag.as_str()) => Some('\n'),
                NodeKind::Element(tag) if tag == "td" || tag == "th" => Some(' '),
                _ => None,
            };
            match around {
                Some(sep) => {
                    out.push(sep);
                    stack.push(Step::Push(sep));
                    stack.push(Step::Children(id));
                }
                None => stack.push(Step::Children(id)),
            }
        }
    }
}

impl TableSource for HtmlDocument {
    fn table_rows(&self) -> Result<TableRows> {
        Ok(self
            .table_row_ids()
            .into_iter()
            .map(|row| {
                self.cell_ids(row)
                    .into_iter()
                    .map(|cell| self.inner_text(cell))
                    .collect()
            })
            .collect())
    }
}

/// Collapse runs of ASCII whitespace and drop blank lines
fn normalize_rendered_text(raw: &str) -> String {
    raw.split('\n')
        .map(|line| {
            line.split(|c: char| c.is_ascii_whitespace())
                .filter(|word| !word.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

struct TreeBuilder {
    nodes: Vec<Node>,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                children: Vec::new(),
            }],
            open: vec![0],
        }
    }

    fn finish(self) -> HtmlDocument {
        HtmlDocument { nodes: self.nodes }
    }

    fn current(&self) -> NodeId {
        *self.open.last().unwrap_or(&0)
    }

    fn append(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        let parent = self.current();
        self.nodes[parent].children.push(id);
        id
    }

    fn tag_at(&self, depth: usize) -> Option<&str> {
        match &self.nodes[self.open[depth]].kind {
            NodeKind::Element(tag) => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Position in the open stack of the nearest `targets` element that is
    /// not hidden behind one of the `boundary` elements
    fn find_open(&self, targets: &[&str], boundary: &[&str]) -> Option<usize> {
        for depth in (1..self.open.len()).rev() {
            let tag = self.tag_at(depth)?;
            if targets.contains(&tag) {
                return Some(depth);
            }
            if boundary.contains(&tag) {
                return None;
            }
        }
        None
    }

    fn close_from(&mut self, depth: usize) {
        self.open.truncate(depth);
    }

    fn start_tag(&mut self, name: String, self_closing: bool) {
        match name.as_str() {
            "td" | "th" => {
                if let Some(depth) = self.find_open(&["td", "th"], &["tr", "table"]) {
                    self.close_from(depth);
                }
            }
            "tr" => {
                if let Some(depth) = self.find_open(&["tr"], &["table"]) {
                    self.close_from(depth);
                }
            }
            "thead" | "tbody" | "tfoot" => {
                if let Some(depth) = self.find_open(TABLE_SECTIONS, &["table"]) {
                    self.close_from(depth);
                }
            }
            "p" => {
                if let Some(depth) = self.find_open(&["p"], &["td", "th", "table", "div"]) {
                    self.close_from(depth);
                }
            }
            _ => {}
        }

        let is_void = VOID_ELEMENTS.contains(&name.as_str());
        let id = self.append(NodeKind::Element(name));
        if !is_void && !self_closing {
            self.open.push(id);
        }
    }

    fn end_tag(&mut self, name: &str) {
        // Table parts never close past their own table; anything else stays
        // inside the current cell
        let boundary: &[&str] = match name {
            "table" => &[],
            "td" | "th" | "tr" | "thead" | "tbody" | "tfoot" => &["table"],
            _ => &["td", "th", "table"],
        };
        if let Some(depth) = self.find_open(&[name], boundary) {
            self.close_from(depth);
        }
    }

    fn text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        self.append(NodeKind::Text(text));
    }
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn run(mut self, builder: &mut TreeBuilder) {
        while self.pos < self.input.len() {
            let rest = self.rest();
            match rest.find('<') {
                Some(0) => self.markup(builder),
                Some(offset) => {
                    builder.text(decode_entities(&rest[..offset]));
                    self.pos += offset;
                }
                None => {
                    builder.text(decode_entities(rest));
                    self.pos = self.input.len();
                }
            }
        }
    }

    /// Consume markup starting at `<`
    fn markup(&mut self, builder: &mut TreeBuilder) {
        let rest = self.rest();
        if rest.starts_with("<!--") {
            self.skip_past("-->", 4);
            return;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            self.skip_past(">", 2);
            return;
        }

        let closing = rest.starts_with("</");
        let name_start = if closing { 2 } else { 1 };
        let name_len = rest[name_start..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
            .unwrap_or(rest.len() - name_start);

        let starts_with_letter = rest[name_start..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic());
        if name_len == 0 || !starts_with_letter {
            // A stray '<' is plain text
            builder.text("<".to_string());
            self.pos += 1;
            return;
        }

        let name = rest[name_start..name_start + name_len].to_ascii_lowercase();
        self.pos += name_start + name_len;
        let self_closing = self.skip_attributes();

        if closing {
            builder.end_tag(&name);
            return;
        }

        let raw_text = RAW_TEXT_ELEMENTS.contains(&name.as_str());
        builder.start_tag(name.clone(), self_closing);
        if raw_text && !self_closing {
            self.skip_raw_text(&name);
            builder.end_tag(&name);
        }
    }

    /// Skip to the end of the current tag, honouring quoted attribute values.
    /// Returns whether the tag ended with `/>`.
    fn skip_attributes(&mut self) -> bool {
        let bytes = self.input.as_bytes();
        let mut quote: Option<u8> = None;
        let mut previous = 0u8;
        while self.pos < bytes.len() {
            let byte = bytes[self.pos];
            self.pos += 1;
            match quote {
                Some(q) if byte == q => quote = None,
                Some(_) => {}
                None if byte == b'"' || byte == b'\'' => quote = Some(byte),
                None if byte == b'>' => return previous == b'/',
                None => {}
            }
            if !byte.is_ascii_whitespace() {
                previous = byte;
            }
        }
        false
    }

    fn skip_raw_text(&mut self, name: &str) {
        let closing = format!("</{}", name);
        let rest = self.rest();
        match rest.to_ascii_lowercase().find(&closing) {
            Some(offset) => {
                self.pos += offset;
                self.skip_past(">", closing.len());
            }
            None => self.pos = self.input.len(),
        }
    }

    fn skip_past(&mut self, terminator: &str, search_from: usize) {
        let rest = self.rest();
        let from = search_from.min(rest.len());
        match rest[from..].find(terminator) {
            Some(offset) => self.pos += from + offset + terminator.len(),
            None => self.pos = self.input.len(),
        }
    }
}

/// Decode character references in a text run
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= 10)
            .and_then(|end| decode_reference(&rest[1..1 + end]).map(|c| (c, end + 2)))
            .or_else(|| decode_unterminated(&rest[1..]).map(|(c, len)| (c, len + 1)));
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Names browsers still decode in text when the `;` is missing
const LEGACY_NAMES: &[&str] = &[
    "amp", "lt", "gt", "quot", "nbsp", "copy", "reg", "deg", "laquo", "raquo",
];

/// A reference at the start of `text` that lacks its `;`, with the number of
/// bytes it spans
fn decode_unterminated(text: &str) -> Option<(char, usize)> {
    if let Some(number) = text.strip_prefix('#') {
        let (digits, radix, prefix) = match number
            .strip_prefix('x')
            .or_else(|| number.strip_prefix('X'))
        {
            Some(hex) => (hex, 16, 2),
            None => (number, 10, 1),
        };
        let len = digits
            .find(|c: char| !c.is_digit(radix))
            .unwrap_or(digits.len());
        if len == 0 {
            return None;
        }
        let code = u32::from_str_radix(&digits[..len], radix).ok()?;
        return char::from_u32(code).map(|c| (c, prefix + len));
    }
    let name = LEGACY_NAMES
        .iter()
        .filter(|name| text.starts_with(**name))
        .max_by_key(|name| name.len())?;
    decode_reference(name).map(|c| (c, name.len()))
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let hex = number
            .strip_prefix('x')
            .or_else(|| number.strip_prefix('X'));
        let code = match hex {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '©',
        "reg" => '®',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "laquo" => '«',
        "raquo" => '»',
        "deg" => '°',
        _ => return None,
    };
    Some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(html: &str) -> TableRows {
        HtmlDocument::parse(html).table_rows().unwrap()
    }

    #[test]
    fn test_simple_table() {
        let html = "<table><tr><th>Name</th><th>Score</th></tr><tr><td>Ann</td><td>10</td></tr></table>";
        assert_eq!(
            rows(html),
            vec![vec!["Name", "Score"], vec!["Ann", "10"]]
        );
    }

    #[test]
    fn test_implicit_end_tags() {
        let html = "<table><tr><td>a<td>b<tr><td>c<td>d</table>";
        assert_eq!(rows(html), vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_rows_outside_table_ignored() {
        let html = "<tr><td>stray</td></tr><table><tbody><tr><td>x</td></tr></tbody></table>";
        assert_eq!(rows(html), vec![vec!["x"]]);
    }

    #[test]
    fn test_cell_text_is_rendered_text() {
        let html = "<table><tr><td>  <b>Budi</b>\n   Santoso </td><td>A&amp;B &lt;1&gt;</td><td>line1<br>line2</td></tr></table>";
        assert_eq!(
            rows(html),
            vec![vec!["Budi Santoso", "A&B <1>", "line1\nline2"]]
        );
    }

    #[test]
    fn test_script_and_comments_are_skipped() {
        let html = r#"<table><!-- <tr><td>hidden</td></tr> --><tr><td>ok<script>var s = "</td>";</script></td></tr></table>"#;
        assert_eq!(rows(html), vec![vec!["ok"]]);
    }

    #[test]
    fn test_attributes_with_angle_brackets() {
        let html = r#"<table class="table"><tr data-x="a>b"><td title='1 > 0'>yes</td></tr></table>"#;
        assert_eq!(rows(html), vec![vec!["yes"]]);
    }

    #[test]
    fn test_uppercase_tags() {
        let html = "<TABLE><TR><TD>Up</TD></TR></TABLE>";
        assert_eq!(rows(html), vec![vec!["Up"]]);
    }

    #[test]
    fn test_nested_table_rows_follow_document_order() {
        let html = "<table><tr><td>outer<table><tr><td>inner</td></tr></table></td></tr></table>";
        let result = rows(html);
        assert_eq!(result.len(), 2);
        // The outer row also owns the nested cell, as a selector query would report
        assert_eq!(result[0], vec!["outer\ninner", "inner"]);
        assert_eq!(result[1], vec!["inner"]);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&#65;&#x42;&nbsp;"), "AB\u{a0}");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
        assert_eq!(decode_entities("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_legacy_entities_without_semicolon() {
        assert_eq!(decode_entities("Tom &amp Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("a &lt b &#38 c &#x41"), "a < b & c A");
        assert_eq!(decode_entities("&copy2026&nbsp"), "\u{a9}2026\u{a0}");
        assert_eq!(decode_entities("AT&T &ampx;"), "AT&T &x;");
    }

    #[test]
    fn test_stray_end_tag_stays_inside_cell() {
        let html = "<div><table><tr><td>a</div></td><td>b</td></tr></table></div>";
        assert_eq!(rows(html), vec![vec!["a", "b"]]);

        let html = "<table><tr><td>a</span></p></td><td>b</tr><tr><td>c</b></td></tr></table>";
        assert_eq!(rows(html), vec![vec!["a", "b"], vec!["c"]]);
    }

    #[test]
    fn test_deeply_nested_inline_tags() {
        let depth = 100_000;
        let html = format!(
            "<table><tr><td>{}x</td><td>y</td></tr></table>",
            "<span>".repeat(depth)
        );
        assert_eq!(rows(&html), vec![vec!["x", "y"]]);
    }

    #[test]
    fn test_deeply_nested_blocks() {
        let html = format!(
            "<table><tr><td>{}x</td></tr></table><p>after",
            "<div><b>".repeat(50_000)
        );
        assert_eq!(rows(&html), vec![vec!["x"]]);
    }

    #[test]
    fn test_empty_row_has_no_cells() {
        let html = "<table><tr></tr><tr><td>1</td></tr></table>";
        assert_eq!(rows(html), vec![vec![], vec!["1".to_string()]]);
    }
}
