//! Parsing the psvis kernel log and plotting the process tree.
//!
//! The helper prints one diagnostic line per process,
//! `depth: <n>, ----PID: <pid>, Creation Time: <ns> ns`, buried in whatever
//! else the kernel log carries. Matching lines become an owned list of node
//! records; a separate pass links each node to its children; gnuplot turns
//! the result into a PNG.

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// One process record recovered from the captured log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcNode {
    pub pid: i32,
    pub creation_ns: u64,
    pub depth: usize,
    /// Indices into the node list, filled in by [`link_children`].
    pub children: Vec<usize>,
}

/// Extract node records from the captured log text, skipping lines that do
/// not carry a process record.
pub fn parse_nodes(text: &str) -> Result<Vec<ProcNode>> {
    let pattern = Regex::new(r"depth: (\d+), -*PID: (\d+), Creation Time: (\d+) ns")
        .context("process record pattern")?;

    let mut nodes = Vec::new();
    for line in text.lines() {
        if let Some(fields) = pattern.captures(line) {
            nodes.push(ProcNode {
                depth: fields[1].parse()?,
                pid: fields[2].parse()?,
                creation_ns: fields[3].parse()?,
                children: Vec::new(),
            });
        }
    }
    Ok(nodes)
}

/// Attach children: for each node, the later nodes one depth level deeper,
/// stopping at the first same-or-shallower entry.
pub fn link_children(nodes: &mut [ProcNode]) {
    for i in 0..nodes.len() {
        for j in i + 1..nodes.len() {
            if nodes[j].depth <= nodes[i].depth {
                break;
            }
            if nodes[j].depth == nodes[i].depth + 1 {
                nodes[i].children.push(j);
            }
        }
    }
}

/// Parse the captured log at `input` and plot the tree to `output`.
pub fn render(input: &Path, output: &Path) -> Result<()> {
    let text = fs::read_to_string(input).map_err(|e| anyhow!("{}: {e}", input.display()))?;
    let mut nodes = parse_nodes(&text)?;
    if nodes.is_empty() {
        bail!("{}: no process records found", input.display());
    }
    link_children(&mut nodes);
    plot(&nodes, output)
}

fn plot(nodes: &[ProcNode], output: &Path) -> Result<()> {
    let script = plot_script(nodes, output);
    let mut child = Command::new("gnuplot")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow!("unable to run gnuplot: {e}"))?;
    child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("gnuplot stdin was not captured"))?
        .write_all(script.as_bytes())?;
    let status = child.wait()?;
    if !status.success() {
        bail!("gnuplot exited with {status}");
    }
    Ok(())
}

/// Depth on x, discovery order on y, arrows for parent/child edges. The root
/// gets a highlighted ring, first children a green one.
fn plot_script(nodes: &[ProcNode], output: &Path) -> String {
    let depth_max = nodes.iter().map(|n| n.depth).max().unwrap_or(0);
    let time_min = nodes.iter().map(|n| n.creation_ns).min().unwrap_or(0);

    let mut script = String::new();
    script.push_str("set term png size 1000,1000\n");
    script.push_str(&format!("set output '{}'\n", output.display()));
    script.push_str(&format!("set xrange [-0.5:{}]\n", depth_max + 1));
    script.push_str(&format!("set yrange [{}:-0.5]\n", nodes.len()));
    script.push_str("set style fill solid\n");
    script.push_str("set xlabel 'Depth'\n");
    script.push_str("set ylabel 'Node'\n");

    for (i, node) in nodes.iter().enumerate() {
        if i == 0 {
            script.push_str(&format!(
                "set object circle at {}, {i} size char 4 fillcolor 'red' lw 2\n",
                node.depth
            ));
        }
        for (k, &child) in node.children.iter().enumerate() {
            script.push_str(&format!(
                "set arrow from {}, {i} to {}, {child} nohead lw 2 lc rgb 'blue'\n",
                node.depth, nodes[child].depth
            ));
            if k == 0 {
                script.push_str(&format!(
                    "set object circle at {}, {child} size char 3 fillcolor 'green' lw 2\n",
                    nodes[child].depth
                ));
            }
        }
        script.push_str(&format!(
            "set object circle at {}, {i} size char 2 fillcolor 'yellow' lw 2\n",
            node.depth
        ));
        script.push_str(&format!(
            "set label 'pid:{} time:{}' at {}, {i} center\n",
            node.pid,
            node.creation_ns - time_min,
            node.depth
        ));
    }

    script.push_str("plot NaN notitle\n");
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[  +0.000001] depth: 0, PID: 100, Creation Time: 5000 ns
[  +0.000002] depth: 1, -PID: 101, Creation Time: 6000 ns
[  +0.000003] depth: 2, --PID: 102, Creation Time: 7000 ns
[  +0.000004] depth: 1, -PID: 103, Creation Time: 8000 ns
[  +0.000009] unrelated kernel chatter
";

    fn sample_nodes() -> Vec<ProcNode> {
        parse_nodes(SAMPLE).expect("parse")
    }

    #[test]
    fn parses_only_process_record_lines() {
        let nodes = sample_nodes();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].pid, 100);
        assert_eq!(nodes[0].depth, 0);
        assert_eq!(nodes[2].creation_ns, 7000);
    }

    #[test]
    fn children_are_one_level_deeper() {
        let mut nodes = sample_nodes();
        link_children(&mut nodes);

        // The root sees both depth-1 nodes; the scan does not stop at the
        // deeper grandchild in between.
        assert_eq!(nodes[0].children, vec![1, 3]);
        assert_eq!(nodes[1].children, vec![2]);
        assert!(nodes[2].children.is_empty());
    }

    #[test]
    fn child_scan_stops_at_same_or_shallower_depth() {
        let mut nodes = vec![
            ProcNode { pid: 1, creation_ns: 0, depth: 1, children: Vec::new() },
            ProcNode { pid: 2, creation_ns: 0, depth: 1, children: Vec::new() },
            ProcNode { pid: 3, creation_ns: 0, depth: 2, children: Vec::new() },
        ];
        link_children(&mut nodes);

        // The sibling at the same depth ends the first node's scan, so the
        // later depth-2 node belongs to the second node only.
        assert!(nodes[0].children.is_empty());
        assert_eq!(nodes[1].children, vec![2]);
    }

    #[test]
    fn empty_log_yields_no_nodes() {
        assert!(parse_nodes("nothing here\n").expect("parse").is_empty());
    }

    #[test]
    fn script_draws_one_edge_per_child() {
        let mut nodes = sample_nodes();
        link_children(&mut nodes);
        let script = plot_script(&nodes, Path::new("tree.png"));

        assert_eq!(script.matches("set arrow").count(), 3);
        assert!(script.contains("set output 'tree.png'"));
        // Labels are offset by the earliest creation time.
        assert!(script.contains("pid:100 time:0"));
        assert!(script.contains("pid:103 time:3000"));
    }
}
