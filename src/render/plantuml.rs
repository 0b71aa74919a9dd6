use std::fmt::Write;

use crate::{
    network::network_graph::NetworkMap,
    render::{RenderOptions, node_sections, routes_label},
};

/// Renders the map as PlantUML cards, sorted by friendly name, followed by one arrow per link.
pub fn render(map: &NetworkMap, options: &RenderOptions) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "' paste into: https://www.planttext.com/")?;
    writeln!(out)?;
    writeln!(out, "@startuml")?;

    let mut nodes: Vec<_> = map.nodes.iter().collect();
    nodes.sort_by(|a, b| {
        a.friendly_name
            .to_lowercase()
            .cmp(&b.friendly_name.to_lowercase())
            .then_with(|| a.friendly_name.cmp(&b.friendly_name))
    });

    for node in nodes {
        writeln!(out, "card {} [", node.ieee_addr)?;
        let sections = node_sections(node, options.now);
        writeln!(out, "{}", sections.join("\n---\n"))?;
        writeln!(out, "]")?;
        writeln!(out)?;
    }

    for link in &map.links {
        write!(
            out,
            "{} --> {}: {}",
            link.source.ieee_addr, link.target.ieee_addr, link.link_quality
        )?;
        if let Some(routes) = routes_label(&link.routes) {
            write!(out, " {routes}")?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    write!(out, "@enduml")?;
    Ok(out)
}
