//! Graphviz DOT rendering of a filtered object set.

use std::collections::HashSet;
use std::fmt::Write;

use crate::config::RenderConfig;
use crate::graph::Object;
use crate::ident::HashId;

/// Graph-level settings for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub graph_name: String,
    pub rankdir: String,
    pub node_shape: String,
    pub omit_dangling: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for RenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            graph_name: config.graph_name.clone(),
            rankdir: config.rankdir.clone(),
            node_shape: config.node_shape.clone(),
            omit_dangling: config.omit_dangling,
        }
    }
}

impl RenderOptions {
    /// Stable textual form folded into the rendered artifact's cache key.
    pub fn fingerprint_input(&self) -> String {
        format!(
            "name={};rankdir={};shape={};omit_dangling={}",
            self.graph_name, self.rankdir, self.node_shape, self.omit_dangling
        )
    }
}

/// Counts for a rendered document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub nodes: usize,
    pub edges: usize,
    /// Edges whose target has no node statement (emitted unless omitted).
    pub dangling: usize,
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_key(id: HashId) -> String {
    id.to_hex()
}

/// Render `objects` as a `digraph`, one node statement per object followed by
/// its edge statements, in input order.
pub fn render_dot(objects: &[Object], options: &RenderOptions) -> (String, RenderReport) {
    let present: HashSet<HashId> = objects.iter().map(|o| o.id).collect();
    let mut report = RenderReport::default();
    let mut output = String::new();

    // writing into a String cannot fail
    let _ = writeln!(output, "digraph \"{}\" {{", escape(&options.graph_name));
    let _ = writeln!(output, "  rankdir={};", options.rankdir);
    let _ = writeln!(output, "  node [shape={}];", options.node_shape);

    for obj in objects {
        let key = node_key(obj.id);
        let _ = writeln!(
            output,
            "  \"{}\" [label=\"{}\\n{}\"];",
            key,
            escape(&obj.name),
            key
        );
        report.nodes += 1;

        for link in &obj.links {
            let dangling = !present.contains(&link.id);
            if dangling {
                report.dangling += 1;
                if options.omit_dangling {
                    continue;
                }
            }
            let _ = writeln!(
                output,
                "  \"{}\" -> \"{}\" [label=\"{}\"];",
                key,
                node_key(link.id),
                escape(&link.link_type)
            );
            report.edges += 1;
        }
    }

    output.push_str("}\n");

    if report.dangling > 0 {
        log::info!(
            "{} edge(s) point at ids with no node in this subgraph ({})",
            report.dangling,
            if options.omit_dangling { "omitted" } else { "kept" }
        );
    }

    (output, report)
}
