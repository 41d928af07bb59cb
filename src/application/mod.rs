// Analysis orchestration: runs the single-threaded phases over a loaded
// program and bundles the three artifacts for reporting.

use crate::domain::declarations::{index_program, DeclarationSet};
use crate::domain::graph::{build_graph, CallGraph};
use crate::domain::identity::FunctionIdentity;
use crate::domain::interfaces::InterfaceRegistry;
use crate::domain::program::Program;
use crate::domain::resolver::IdentityResolver;
use crate::domain::roots::{locate_roots, DEFAULT_MARKER_LABEL};

pub struct AnalysisConfig {
    /// Call name that flags a root function.
    pub marker_label: String,
    /// Units whose path lacks this substring are skipped entirely.
    pub path_filter: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { marker_label: DEFAULT_MARKER_LABEL.to_string(), path_filter: None }
    }
}

/// The three artifacts of one analysis run, handed whole to reporting.
pub struct Analysis {
    pub declarations: DeclarationSet,
    pub roots: Vec<FunctionIdentity>,
    pub graph: CallGraph,
}

pub struct AnalyzeUsecase {
    pub config: AnalysisConfig,
}

impl AnalyzeUsecase {
    /// Registry once, then declarations, roots and backward graph over the
    /// same resolver so interface-satisfaction results stay cached.
    pub fn run(&self, program: &Program) -> Analysis {
        let registry = InterfaceRegistry::from_type_info(&program.info);
        let mut resolver = IdentityResolver::new(&program.info, &registry);
        let filter = self.config.path_filter.as_deref();

        for unit in &program.units {
            let skipped = filter.map_or(false, |pattern| !unit.path.contains(pattern));
            println!(
                "[retrograph] unit {} (crate {}){}",
                unit.path,
                unit.scope,
                if skipped { " [filtered out]" } else { "" }
            );
        }

        let declarations = index_program(program, &mut resolver, filter);
        let roots = locate_roots(program, &mut resolver, &self.config.marker_label, filter);
        let graph = build_graph(program, &mut resolver, &declarations, filter);

        Analysis { declarations, roots, graph }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::Frontend;

    #[test]
    fn test_usecase_bundles_all_artifacts() {
        let program = Frontend::load(vec![(
            "app".to_string(),
            "src/lib.rs".to_string(),
            "fn a() { trace_entry_point(); b(); }\nfn b() {}".to_string(),
        )])
        .unwrap();

        let usecase = AnalyzeUsecase { config: AnalysisConfig::default() };
        let analysis = usecase.run(&program);

        assert_eq!(analysis.declarations.len(), 2);
        assert_eq!(analysis.roots.len(), 1);
        assert_eq!(analysis.graph.len(), 1);
    }

    #[test]
    fn test_config_filter_applies_to_all_phases() {
        let program = Frontend::load(vec![
            (
                "app".to_string(),
                "app/src/lib.rs".to_string(),
                "fn kept() { trace_entry_point(); }".to_string(),
            ),
            (
                "vendor".to_string(),
                "vendor/src/lib.rs".to_string(),
                "fn dropped() { trace_entry_point(); }".to_string(),
            ),
        ])
        .unwrap();

        let usecase = AnalyzeUsecase {
            config: AnalysisConfig {
                marker_label: DEFAULT_MARKER_LABEL.to_string(),
                path_filter: Some("app/".to_string()),
            },
        };
        let analysis = usecase.run(&program);

        assert_eq!(analysis.declarations.len(), 1);
        assert_eq!(analysis.roots.len(), 1);
        assert_eq!(analysis.roots[0].name, "kept");
    }
}
