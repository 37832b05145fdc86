//! Style snapshot: bake resolved presentation values onto a detached clone.
//!
//! Must run while the live tree is still mounted and before the clone is otherwise mutated,
//! so that both trees are still structurally identical when walked in lock-step.

use crate::theme;
use crate::tree::GraphicsNode;

/// Properties copied from the live tree onto the clone.
pub const INLINED_PROPERTIES: &[&str] = &[
    "fill",
    "fill-opacity",
    "stroke",
    "stroke-width",
    "stroke-dasharray",
    "stroke-opacity",
    "opacity",
    "font-family",
    "font-size",
    "font-weight",
    "font-style",
    "text-anchor",
    "dominant-baseline",
    "alignment-baseline",
    "visibility",
    "display",
];

/// Copies every allow-listed resolved property of `live` into `clone`'s inline style.
///
/// Values equal to the property's platform default are skipped. Children are paired by
/// index and the walk stops at the shorter child list. Returns the number of declarations
/// written.
pub fn inline_styles(clone: &mut GraphicsNode, live: &GraphicsNode) -> usize {
    if clone.tag().is_none() || live.tag().is_none() {
        return 0;
    }
    let mut written = 0;
    for name in INLINED_PROPERTIES {
        let Some(value) = live.computed.get(*name) else {
            continue;
        };
        if is_platform_default(name, value) {
            continue;
        }
        clone.set_style_property(name, value);
        written += 1;
    }
    for (c, l) in clone.children.iter_mut().zip(live.children.iter()) {
        written += inline_styles(c, l);
    }
    written
}

fn is_platform_default(name: &str, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return true;
    }
    match theme::property(name).and_then(|p| p.initial) {
        Some(initial) => value.eq_ignore_ascii_case(initial) || (initial == "1" && value == "1.0"),
        None => false,
    }
}
