//! Report exporters: plain text, JSON and Graphviz DOT renderings of one
//! analysis run.

use crate::application::Analysis;
use crate::ports::Exporter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Result;

// ============================================================================
// TextExporter - the stdout-friendly dump
// ============================================================================

pub struct TextExporter;

impl TextExporter {
    pub fn render(analysis: &Analysis) -> String {
        let mut lines = Vec::new();

        lines.push("Root functions:".to_string());
        for root in &analysis.roots {
            lines.push(format!("  {}", root));
        }

        lines.push("Declared functions:".to_string());
        for decl in analysis.declarations.iter() {
            lines.push(format!("  {}", decl));
        }

        lines.push("Backward call graph (callee <- callers):".to_string());
        for (callee, callers) in analysis.graph.iter() {
            let caller_ids: Vec<String> = callers.iter().map(|c| c.id()).collect();
            lines.push(format!("  {} <- [{}]", callee, caller_ids.join(", ")));
        }

        lines.push(format!("Callees: {}", analysis.graph.len()));
        lines.push(String::new());
        lines.join("\n")
    }
}

impl Exporter for TextExporter {
    fn export(&self, analysis: &Analysis, path: &str) -> Result<()> {
        std::fs::write(path, Self::render(analysis))
    }
}

// ============================================================================
// JsonExporter - DTOs for programmatic consumers
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisDto {
    pub roots: Vec<String>,
    pub declarations: Vec<String>,
    pub edges: Vec<EdgeDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeDto {
    pub callee: String,
    pub callers: Vec<String>,
}

impl From<&Analysis> for AnalysisDto {
    fn from(analysis: &Analysis) -> Self {
        AnalysisDto {
            roots: analysis.roots.iter().map(|r| r.id()).collect(),
            declarations: analysis.declarations.iter().map(|d| d.id()).collect(),
            edges: analysis
                .graph
                .iter()
                .map(|(callee, callers)| EdgeDto {
                    callee: callee.id(),
                    callers: callers.iter().map(|c| c.id()).collect(),
                })
                .collect(),
        }
    }
}

pub struct JsonExporter;

impl JsonExporter {
    pub fn render(analysis: &Analysis) -> String {
        let dto = AnalysisDto::from(analysis);
        serde_json::to_string_pretty(&dto).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Exporter for JsonExporter {
    fn export(&self, analysis: &Analysis, path: &str) -> Result<()> {
        std::fs::write(path, Self::render(analysis))
    }
}

// ============================================================================
// DotExporter - Graphviz view, root functions highlighted
// ============================================================================

pub struct DotExporter;

impl DotExporter {
    pub fn render(analysis: &Analysis) -> String {
        let roots: BTreeSet<String> = analysis.roots.iter().map(|r| r.id()).collect();
        let mut nodes = BTreeSet::new();
        for (callee, callers) in analysis.graph.iter() {
            nodes.insert(callee.id());
            for caller in callers {
                nodes.insert(caller.id());
            }
        }
        for root in &roots {
            nodes.insert(root.clone());
        }

        let mut lines = Vec::new();
        lines.push("digraph BackwardCallGraph {".to_string());
        lines.push("    rankdir=LR;".to_string());
        lines.push("    node [fontname=\"Helvetica\", fontsize=12, shape=box];".to_string());
        lines.push(String::new());

        for node in &nodes {
            let style = if roots.contains(node) {
                ", style=filled, fillcolor=\"#a6e3a1\""
            } else {
                ", style=filled, fillcolor=\"#89b4fa\""
            };
            lines.push(format!(
                "    \"{}\" [label=\"{}\"{}];",
                Self::escape_label(node),
                Self::escape_label(node),
                style
            ));
        }

        lines.push(String::new());

        // Edges drawn in call direction: caller -> callee.
        for (callee, callers) in analysis.graph.iter() {
            for caller in callers {
                lines.push(format!(
                    "    \"{}\" -> \"{}\";",
                    Self::escape_label(&caller.id()),
                    Self::escape_label(&callee.id())
                ));
            }
        }

        lines.push("}".to_string());
        lines.join("\n")
    }

    fn escape_label(label: &str) -> String {
        label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }
}

impl Exporter for DotExporter {
    fn export(&self, analysis: &Analysis, path: &str) -> Result<()> {
        std::fs::write(path, Self::render(analysis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{AnalysisConfig, AnalyzeUsecase};
    use crate::infrastructure::Frontend;

    fn sample_analysis() -> Analysis {
        let program = Frontend::load(vec![(
            "app".to_string(),
            "src/lib.rs".to_string(),
            "fn seed() { trace_entry_point(); worker(); }\nfn worker() {}".to_string(),
        )])
        .unwrap();
        AnalyzeUsecase { config: AnalysisConfig::default() }.run(&program)
    }

    #[test]
    fn test_text_report_lists_all_sections() {
        let rendered = TextExporter::render(&sample_analysis());
        assert!(rendered.contains("Root functions:"));
        assert!(rendered.contains("  app.seed.fn()"));
        assert!(rendered.contains("Declared functions:"));
        assert!(rendered.contains("  app.worker.fn()"));
        assert!(rendered.contains("app.worker.fn() <- [app.seed.fn()]"));
        assert!(rendered.contains("Callees: 1"));
    }

    #[test]
    fn test_json_report_round_trips() {
        let rendered = JsonExporter::render(&sample_analysis());
        let dto: AnalysisDto = serde_json::from_str(&rendered).unwrap();
        assert_eq!(dto.roots, vec!["app.seed.fn()"]);
        assert_eq!(dto.edges.len(), 1);
        assert_eq!(dto.edges[0].callee, "app.worker.fn()");
        assert_eq!(dto.edges[0].callers, vec!["app.seed.fn()"]);
    }

    #[test]
    fn test_dot_report_highlights_roots_and_draws_edges() {
        let rendered = DotExporter::render(&sample_analysis());
        assert!(rendered.contains("digraph BackwardCallGraph"));
        assert!(rendered.contains("\"app.seed.fn()\" -> \"app.worker.fn()\";"));
        assert!(rendered.contains("#a6e3a1"));
    }

    #[test]
    fn test_exporters_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let analysis = sample_analysis();
        for (exporter, name) in [
            (Box::new(TextExporter) as Box<dyn Exporter>, "report.txt"),
            (Box::new(JsonExporter), "report.json"),
            (Box::new(DotExporter), "report.dot"),
        ] {
            let path = dir.path().join(name);
            exporter.export(&analysis, path.to_str().unwrap()).unwrap();
            assert!(std::fs::read_to_string(path).unwrap().len() > 0);
        }
    }
}
