use std::fmt::Write;

use crate::{
    network::{device::DeviceKind, network_graph::NetworkMap, node::Node},
    render::{RenderOptions, node_sections, routes_label},
    settings::GraphvizColors,
};

const DIGRAPH_PREFIX: &str = "digraph G {\nnode[shape=record];";

/// Renders the map as a DOT digraph. Each vertex is followed by the links it is the source of.
pub fn render(map: &NetworkMap, options: &RenderOptions) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{DIGRAPH_PREFIX}")?;

    for node in &map.nodes {
        write_node(&mut out, node, options)?;
        for link in map.links.iter().filter(|l| l.source.ieee_addr == node.ieee_addr) {
            let pen_width = if node.kind == DeviceKind::EndDevice {
                "1"
            } else if link.routes.is_empty() {
                "0.5"
            } else {
                "2"
            };
            let (weight, color) = if link.routes.is_empty() {
                (0, &options.colors.line.inactive)
            } else {
                (1, &options.colors.line.active)
            };
            let label = match routes_label(&link.routes) {
                Some(routes) => format!("{} {routes}", link.link_quality),
                None => link.link_quality.to_string(),
            };
            writeln!(
                out,
                "  \"{}\" -> \"{}\" [penwidth={pen_width}, weight={weight}, color=\"{color}\", label=\"{}\"]",
                link.source.ieee_addr,
                link.target.ieee_addr,
                escape_quoted(&label)
            )?;
        }
    }

    write!(out, "}}")?;
    Ok(out)
}

fn write_node(out: &mut String, node: &Node, options: &RenderOptions) -> std::fmt::Result {
    let label = node_sections(node, options.now)
        .iter()
        .map(|s| escape_record(s))
        .collect::<Vec<_>>()
        .join("|");
    writeln!(
        out,
        "  \"{}\" [{}, label=\"{{{label}}}\"];",
        node.ieee_addr,
        node_style(node.kind, &options.colors)
    )
}

fn node_style(kind: DeviceKind, colors: &GraphvizColors) -> String {
    let (style, fill, font) = match kind {
        DeviceKind::Coordinator => (
            "bold, filled",
            &colors.fill.coordinator,
            &colors.font.coordinator,
        ),
        DeviceKind::Router => ("rounded, filled", &colors.fill.router, &colors.font.router),
        DeviceKind::EndDevice => (
            "rounded, dashed, filled",
            &colors.fill.enddevice,
            &colors.font.enddevice,
        ),
    };
    format!("style=\"{style}\", fillcolor=\"{fill}\", fontcolor=\"{font}\"")
}

/// Record labels treat braces, pipes and angle brackets as structure.
fn escape_record(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '"' | '{' | '}' | '|' | '<' | '>') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
