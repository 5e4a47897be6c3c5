// ABOUTME: Shared utilities for language bindings
// ABOUTME: Node text, child lookup, line numbers and indentation helpers over tree-sitter nodes

use tree_sitter::Node;

/// Extract text from a tree-sitter Node
#[inline]
pub fn node_text<'a>(node: &Node, content: &'a str) -> &'a str {
    node.utf8_text(content.as_bytes()).unwrap_or("")
}

/// 1-based first and last line of a node.
#[inline]
pub fn line_span(node: &Node) -> (u32, u32) {
    (
        (node.start_position().row + 1) as u32,
        (node.end_position().row + 1) as u32,
    )
}

/// Find first child of a specific kind
pub fn child_by_kind<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    (0..node.child_count())
        .filter_map(|i| node.child(i))
        .find(|child| child.kind() == kind)
}

/// Find all children of a specific kind
pub fn children_by_kind<'a>(node: &Node<'a>, kind: &str) -> Vec<Node<'a>> {
    (0..node.child_count())
        .filter_map(|i| node.child(i))
        .filter(|child| child.kind() == kind)
        .collect()
}

pub fn named_children<'a>(node: &Node<'a>) -> Vec<Node<'a>> {
    (0..node.named_child_count())
        .filter_map(|i| node.named_child(i))
        .collect()
}

/// Get text of a child by field name
pub fn child_text_by_field<'a>(node: &Node, field_name: &str, content: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field_name)
        .map(|child| node_text(&child, content))
}

/// Pre-order collection of every descendant of `kind`. Subtrees rooted at a
/// node whose kind is in `stop_at` are not entered.
pub fn descendants_of_kind<'a>(node: &Node<'a>, kind: &str, stop_at: &[&str]) -> Vec<Node<'a>> {
    let mut found = Vec::new();
    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        if current.kind() == kind {
            found.push(current);
        }
        // Reverse so siblings are visited in source order.
        for i in (0..current.child_count()).rev() {
            if let Some(child) = current.child(i) {
                if !stop_at.contains(&child.kind()) {
                    stack.push(child);
                }
            }
        }
    }
    found
}

/// Contents of a string literal without its delimiters. Escapes are kept
/// verbatim.
pub fn string_literal_value<'a>(node: &Node, content: &'a str) -> &'a str {
    let raw = node_text(node, content);
    if let Some(inner) = raw
        .strip_prefix("\"\"\"")
        .and_then(|s| s.strip_suffix("\"\"\""))
    {
        return inner;
    }
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
}

/// Last `.`-separated segment, e.g. `RequestMethod.GET` -> `GET`.
pub fn last_segment(text: &str) -> &str {
    text.rsplit('.').next().unwrap_or(text).trim()
}

fn line_start(content: &str, offset: usize) -> usize {
    content[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

/// Leading whitespace of the line containing `offset`.
pub fn line_indent(content: &str, offset: usize) -> &str {
    let start = line_start(content, offset);
    let line = &content[start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

/// True when only whitespace precedes `offset` on its line.
pub fn starts_line(content: &str, offset: usize) -> bool {
    content[line_start(content, offset)..offset].trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_indent() {
        let src = "class A {\n    void f() {\n\t\tx();\n    }\n}";
        let f = src.find("void").unwrap();
        assert_eq!(line_indent(src, f), "    ");
        let x = src.find("x()").unwrap();
        assert_eq!(line_indent(src, x), "\t\t");
        assert_eq!(line_indent(src, 0), "");
    }

    #[test]
    fn test_starts_line() {
        let src = "a {\n    }  }";
        assert!(starts_line(src, src.find("}").unwrap()));
        assert!(!starts_line(src, src.rfind("}").unwrap()));
        assert!(starts_line(src, 0));
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("RequestMethod.GET"), "GET");
        assert_eq!(last_segment("org.springframework.web.bind.annotation.GetMapping"), "GetMapping");
        assert_eq!(last_segment("GetMapping"), "GetMapping");
    }
}
