//! Base/add-on classification of rental item fragments by markup color.
//!
//! The export marks add-on items in red. Colors are set at arbitrary depths
//! (`<font color>`, inline `style`, nested spans), so each text fragment is
//! resolved against its *nearest* ancestor that declares any color at all.

use super::normalize::normalize_fragments;
use scraper::{ElementRef, Node};

/// An explicit color declaration found on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tint {
    Red,
    Other,
}

/// How a rental item fragment is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Base,
    Flagged,
}

/// A node in a markup tree that can be asked for its own color.
pub trait ColorNode: Sized {
    /// Color declared directly on this node, if any.
    fn explicit_tint(&self) -> Option<Tint>;
    fn parent_node(&self) -> Option<Self>;
    /// True for the cell that bounds the walk.
    fn is_boundary(&self) -> bool;
}

/// Classify a fragment by walking up from its parent element.
///
/// The first node with an explicit color decides; the boundary node is
/// still inspected before the walk stops. No color anywhere means base.
pub fn classify<N: ColorNode>(start: Option<N>) -> ItemKind {
    let mut current = start;
    while let Some(node) = current {
        match node.explicit_tint() {
            Some(Tint::Red) => return ItemKind::Flagged,
            Some(Tint::Other) => return ItemKind::Base,
            None => {}
        }
        if node.is_boundary() {
            break;
        }
        current = node.parent_node();
    }
    ItemKind::Base
}

/// Combine the inline `style` and legacy `color` attribute of one node.
///
/// Red on either side wins; otherwise any other declared color counts.
pub fn tint_from_attrs(style: Option<&str>, color_attr: Option<&str>) -> Option<Tint> {
    let from_style = style.and_then(style_color);
    let from_attr = color_attr
        .map(|c| c.trim().to_ascii_lowercase())
        .filter(|c| !c.is_empty());

    let declared = [from_style, from_attr];
    if declared.iter().flatten().any(|c| is_red(c)) {
        return Some(Tint::Red);
    }
    if declared.iter().flatten().next().is_some() {
        return Some(Tint::Other);
    }
    None
}

/// Value of the `color` declaration in an inline style (last one wins).
fn style_color(style: &str) -> Option<String> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .filter(|(prop, _)| prop.trim().eq_ignore_ascii_case("color"))
        .map(|(_, value)| {
            value
                .to_ascii_lowercase()
                .replace("!important", "")
                .split_whitespace()
                .collect::<String>()
        })
        .filter(|v| !v.is_empty())
        .last()
}

/// `red`, or `#ff` followed by at most four hex digits.
fn is_red(value: &str) -> bool {
    if value == "red" {
        return true;
    }
    match value.strip_prefix("#ff") {
        Some(rest) => rest.len() <= 4 && rest.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// An element inside the cell being classified.
#[derive(Clone, Copy)]
struct CellNode<'a> {
    element: ElementRef<'a>,
    cell: ElementRef<'a>,
}

impl<'a> ColorNode for CellNode<'a> {
    fn explicit_tint(&self) -> Option<Tint> {
        let el = self.element.value();
        tint_from_attrs(el.attr("style"), el.attr("color"))
    }

    fn parent_node(&self) -> Option<Self> {
        self.element
            .parent()
            .and_then(ElementRef::wrap)
            .map(|element| CellNode {
                element,
                cell: self.cell,
            })
    }

    fn is_boundary(&self) -> bool {
        self.element.id() == self.cell.id()
    }
}

/// Split a rental items cell into `(base, flagged)` normalized strings.
///
/// Every text node is one item, classified on its own. Items are joined with
/// [`SEPARATOR`](super::normalize::SEPARATOR), so `<br>` needs no handling.
pub fn split_cell(cell: ElementRef<'_>) -> (String, String) {
    let mut base = Vec::new();
    let mut flagged = Vec::new();

    for node in cell.descendants() {
        match node.value() {
            Node::Text(text) => {
                let fragment = text.trim();
                if fragment.is_empty() || fragment == "," {
                    continue;
                }
                let start = node
                    .parent()
                    .and_then(ElementRef::wrap)
                    .map(|element| CellNode { element, cell });
                match classify(start) {
                    ItemKind::Flagged => flagged.push(fragment.to_string()),
                    ItemKind::Base => base.push(fragment.to_string()),
                }
            }
            _ => {}
        }
    }

    (normalize_fragments(base), normalize_fragments(flagged))
}
