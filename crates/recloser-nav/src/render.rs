//! Plain-text rendering of trees, diffs, layouts and inventories.

use crate::diff::{DifferenceKind, ServiceDiff, TreeDiff};
use crate::inventory::RecloserInventory;
use crate::layout::{FeatureLayout, ServiceLayout};
use crate::tree::ServiceNode;
use recloser_core::model::Translation;

/// Translation in `language_code`, falling back to `fallback` when absent or empty.
pub fn display_name<'a>(translations: &'a [Translation], language_code: &str, fallback: &'a str) -> &'a str {
    translations
        .iter()
        .find(|t| t.language_code == language_code && !t.value.is_empty())
        .map_or(fallback, |t| t.value.as_str())
}

fn connector(is_last: bool) -> &'static str {
    if is_last { "└──" } else { "├──" }
}

/// Render a firmware's service forest.
pub fn format_tree(nodes: &[ServiceNode], language_code: &str) -> String {
    let mut output = String::new();
    for node in nodes {
        format_service_node(&mut output, node, language_code, 0);
    }
    output
}

fn format_service_node(output: &mut String, node: &ServiceNode, language_code: &str, indent: usize) {
    let prefix = "  ".repeat(indent);
    let name = display_name(&node.translations, language_code, &node.service_key);
    output.push_str(&format!("{}{} [{}] #{}\n", prefix, name, node.service_key, node.id));

    let total = node.features.len();
    for (i, feature) in node.features.iter().enumerate() {
        output.push_str(&format!(
            "{}  {} {} #{}\n",
            prefix,
            connector(i + 1 == total),
            display_name(&feature.translations, language_code, &feature.key),
            feature.id,
        ));
    }
    for child in &node.children {
        format_service_node(output, child, language_code, indent + 1);
    }
}

/// Render a firmware comparison with its summary line first.
pub fn format_diff(diff: &TreeDiff) -> String {
    let mut output = format!(
        "firmware {} -> {}: {}\n",
        diff.firmware_a, diff.firmware_b, diff.summary
    );
    let count = diff.differences.len();
    for (i, d) in diff.differences.iter().enumerate() {
        format_service_diff(&mut output, d, 0, i + 1 == count);
    }
    output
}

fn format_service_diff(output: &mut String, diff: &ServiceDiff, indent: usize, is_last: bool) {
    let prefix = "  ".repeat(indent);
    let name = if diff.display_name.is_empty() {
        diff.service_key.as_str()
    } else {
        diff.display_name.as_str()
    };
    output.push_str(&format!(
        "{}{} {} {} [{}]\n",
        prefix,
        connector(is_last),
        diff.kind,
        name,
        diff.service_key,
    ));
    for f in &diff.feature_differences {
        let sign = match f.kind {
            DifferenceKind::Added => '+',
            DifferenceKind::Removed => '-',
            _ => '~',
        };
        output.push_str(&format!("{}    {} {}\n", prefix, sign, f.feature_key));
    }
    let count = diff.child_differences.len();
    for (i, child) in diff.child_differences.iter().enumerate() {
        format_service_diff(output, child, indent + 1, i + 1 == count);
    }
}

/// Render a screen layout with component and limit details per feature.
pub fn format_layout(layout: &ServiceLayout, language_code: &str) -> String {
    let mut output = String::new();
    format_layout_inner(&mut output, layout, language_code, 0);
    output
}

fn format_layout_inner(output: &mut String, layout: &ServiceLayout, language_code: &str, indent: usize) {
    let prefix = "  ".repeat(indent);
    let name = display_name(&layout.translations, language_code, &layout.service_key);
    output.push_str(&format!("{}{} [{}] #{}\n", prefix, name, layout.service_key, layout.service_id));
    let count = layout.features.len();
    for (i, feature) in layout.features.iter().enumerate() {
        output.push_str(&format!(
            "{}  {} {}\n",
            prefix,
            connector(i + 1 == count),
            feature_line(feature, language_code),
        ));
    }
    for child in &layout.children {
        format_layout_inner(output, child, language_code, indent + 1);
    }
}

fn feature_line(feature: &FeatureLayout, language_code: &str) -> String {
    let name = display_name(&feature.translations, language_code, &feature.feature_key);
    let mut line = format!("{} #{}", name, feature.feature_id);
    if let Some(component) = &feature.component_type {
        line.push_str(&format!(" <{}>", component));
    }
    if !feature.limits.is_empty() {
        let limits: Vec<String> = feature
            .limits
            .iter()
            .map(|l| format!("{}={}", l.key, l.value))
            .collect();
        line.push_str(&format!(" {{{}}}", limits.join(", ")));
    }
    line
}

/// Render the inventory: reclosers, their firmwares and service counts.
pub fn format_inventory(inventory: &[RecloserInventory], language_code: &str) -> String {
    let mut output = String::new();
    for recloser in inventory {
        let name = display_name(&recloser.translations, language_code, &recloser.model);
        output.push_str(&format!("{} ({}) #{}\n", name, recloser.model, recloser.id));
        let count = recloser.firmwares.len();
        for (i, fw) in recloser.firmwares.iter().enumerate() {
            let services: usize = fw.services.iter().map(ServiceNode::subtree_size).sum();
            output.push_str(&format!(
                "  {} {} #{} ({} service(s))\n",
                connector(i + 1 == count),
                fw.version,
                fw.id,
                services,
            ));
        }
    }
    output
}
