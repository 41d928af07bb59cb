use anyhow::{bail, Context, Result};
use cargo_metadata::MetadataCommand;
use std::fs;
use std::path::Path;

/// Collects `(crate_name, file_path, file_content)` triples for the
/// frontend from files, folders and Cargo workspaces.
pub struct ProjectLoader;

impl ProjectLoader {
    /// Load all source files from a Cargo workspace via `cargo metadata`.
    pub fn load_workspace(manifest_path: &str) -> Result<Vec<(String, String, String)>> {
        let metadata = MetadataCommand::new()
            .manifest_path(manifest_path)
            .no_deps()
            .exec()
            .context("Failed to execute cargo metadata")?;

        let mut files = Vec::new();

        for package_id in &metadata.workspace_members {
            if let Some(package) = metadata.packages.iter().find(|p| &p.id == package_id) {
                for target in &package.targets {
                    if !target
                        .kind
                        .iter()
                        .any(|k| k == "lib" || k == "bin" || k == "proc-macro")
                    {
                        continue;
                    }
                    let src_path = &target.src_path;
                    let src_dir = src_path.parent().unwrap_or(src_path);
                    Self::collect_rs_recursive(src_dir.as_std_path(), &package.name, &mut files)?;
                }
            }
        }

        // Multiple targets can point at the same files; keep each once.
        files.sort_by(|a, b| a.1.cmp(&b.1));
        files.dedup_by(|a, b| a.1 == b.1);

        Ok(files)
    }

    /// Load a workspace by reading its manifest directly, without running
    /// cargo. Member crate names come from each member's own manifest.
    /// Also accepts a plain single-package manifest.
    pub fn load_workspace_manifest(manifest_path: &str) -> Result<Vec<(String, String, String)>> {
        let content = fs::read_to_string(manifest_path)
            .with_context(|| format!("Cannot read workspace manifest {}", manifest_path))?;
        let parsed: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Invalid toml in {}", manifest_path))?;
        let root = Path::new(manifest_path).parent().unwrap_or(Path::new("."));

        let mut files = Vec::new();

        if let Some(members) = parsed
            .get("workspace")
            .and_then(|w| w.get("members"))
            .and_then(|m| m.as_array())
        {
            for member in members {
                let Some(member_rel) = member.as_str() else { continue };
                let member_dir = root.join(member_rel);
                let crate_name = Self::package_name(&member_dir.join("Cargo.toml"))
                    .unwrap_or_else(|_| member_rel.to_string());
                let src_dir = member_dir.join("src");
                if src_dir.exists() {
                    Self::collect_rs_recursive(&src_dir, &crate_name, &mut files)?;
                }
            }
        } else if parsed.get("package").is_some() {
            let crate_name = Self::package_name(Path::new(manifest_path))?;
            let src_dir = root.join("src");
            if src_dir.exists() {
                Self::collect_rs_recursive(&src_dir, &crate_name, &mut files)?;
            }
        } else {
            bail!("{} declares neither [workspace] nor [package]", manifest_path);
        }

        Ok(files)
    }

    /// Load every `.rs` file under a folder; the folder name becomes the
    /// scope for all collected units.
    pub fn load_folder(dir: &str) -> Result<Vec<(String, String, String)>> {
        let path = Path::new(dir);
        let crate_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let mut files = Vec::new();
        Self::collect_rs_recursive(path, &crate_name, &mut files)?;
        Ok(files)
    }

    /// Load explicit file paths; each file's stem becomes its scope.
    pub fn load_files(paths: &[String]) -> Result<Vec<(String, String, String)>> {
        let mut files = Vec::new();
        for path in paths {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Cannot read input file {}", path))?;
            let scope = Path::new(path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unnamed")
                .to_string();
            files.push((scope, path.clone(), content));
        }
        Ok(files)
    }

    fn package_name(manifest: &Path) -> Result<String> {
        let content = fs::read_to_string(manifest)
            .with_context(|| format!("Cannot read manifest {}", manifest.display()))?;
        let parsed: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Invalid toml in {}", manifest.display()))?;
        parsed
            .get("package")
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .map(|n| n.to_string())
            .with_context(|| format!("No package name in {}", manifest.display()))
    }

    fn collect_rs_recursive(
        dir: &Path,
        crate_name: &str,
        out: &mut Vec<(String, String, String)>,
    ) -> Result<()> {
        if dir.ends_with("target") || dir.ends_with(".git") {
            return Ok(());
        }
        if !dir.exists() {
            return Ok(());
        }

        if dir.is_file() {
            // Single-file targets such as main.rs.
            if dir.extension().map_or(false, |ext| ext == "rs") {
                let content = fs::read_to_string(dir)
                    .with_context(|| format!("Failed to read file {}", dir.display()))?;
                out.push((crate_name.to_string(), dir.display().to_string(), content));
            }
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                Self::collect_rs_recursive(&path, crate_name, out)?;
            } else if path.extension().map_or(false, |ext| ext == "rs") {
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read file {}", path.display()))?;
                out.push((crate_name.to_string(), path.display().to_string(), content));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_folder_collects_rs_and_skips_target() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("lib.rs"), "pub fn a() {}").unwrap();
        fs::write(src.join("notes.txt"), "not source").unwrap();
        let target = dir.path().join("target");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("gen.rs"), "fn generated() {}").unwrap();

        let files = ProjectLoader::load_folder(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].1.ends_with("lib.rs"));
    }

    #[test]
    fn test_load_files_uses_file_stem_as_scope() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("probe.rs");
        fs::write(&file, "fn probe() {}").unwrap();

        let files =
            ProjectLoader::load_files(&[file.to_str().unwrap().to_string()]).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "probe");
    }

    #[test]
    fn test_load_files_missing_file_fails() {
        let result = ProjectLoader::load_files(&["/no/such/file.rs".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_manifest_workspace_members() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            "[workspace]\nmembers = [\"core\", \"cli\"]\n",
        )
        .unwrap();
        for (member, name) in [("core", "demo_core"), ("cli", "demo_cli")] {
            let member_dir = dir.path().join(member);
            fs::create_dir_all(member_dir.join("src")).unwrap();
            fs::write(
                member_dir.join("Cargo.toml"),
                format!("[package]\nname = \"{}\"\nversion = \"0.1.0\"\n", name),
            )
            .unwrap();
            fs::write(member_dir.join("src/lib.rs"), "pub fn x() {}").unwrap();
        }

        let mut files = ProjectLoader::load_workspace_manifest(
            dir.path().join("Cargo.toml").to_str().unwrap(),
        )
        .unwrap();
        files.sort();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].0, "demo_cli");
        assert_eq!(files[1].0, "demo_core");
    }

    #[test]
    fn test_manifest_single_package() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Cargo.toml"),
            "[package]\nname = \"solo\"\nversion = \"0.1.0\"\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();

        let files = ProjectLoader::load_workspace_manifest(
            dir.path().join("Cargo.toml").to_str().unwrap(),
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "solo");
    }

    #[test]
    fn test_manifest_without_workspace_or_package_fails() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Cargo.toml"), "[profile.release]\nlto = true\n").unwrap();
        let result = ProjectLoader::load_workspace_manifest(
            dir.path().join("Cargo.toml").to_str().unwrap(),
        );
        assert!(result.is_err());
    }
}
