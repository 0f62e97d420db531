use hostpack::core::interfaces::{Bundler, FileSystemService};
use hostpack::core::models::{AnalysisThresholds, BuildPhase, BuildProfile, BundledArtifact, DeploymentDescriptor, ProfileKind};
use hostpack::core::services::{BuildOptions, BuildOrchestrator};
use hostpack::infrastructure::{FormatTransformer, TokioFileSystemService};
use hostpack::utils::{ConfigFile, ConfigLoader, HostpackConfig, HostpackError, Result, SizeLevel};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Stands in for esbuild: writes canned flat-export text for each descriptor
#[derive(Default)]
struct FakeBundler {
    outputs: HashMap<String, String>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Bundler for FakeBundler {
    async fn bundle(&self, descriptor: &DeploymentDescriptor, _profile: &BuildProfile) -> Result<BundledArtifact> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.contains(&descriptor.name) {
            return Err(HostpackError::bundle(
                &descriptor.name,
                &descriptor.source_entry_path,
                "Could not resolve \"./missing\"",
            ));
        }

        let text = self.outputs.get(&descriptor.name).cloned().unwrap_or_default();
        let path = descriptor.artifact_path();
        tokio::fs::create_dir_all(&descriptor.output_directory).await?;
        tokio::fs::write(&path, &text).await?;

        Ok(BundledArtifact {
            name: descriptor.name.clone(),
            path,
            text,
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Disk-backed file system whose atomic write fails for one path
struct ReadOnlyTarget {
    inner: TokioFileSystemService,
    rejected: PathBuf,
    writes: Mutex<Vec<PathBuf>>,
}

#[async_trait::async_trait]
impl FileSystemService for ReadOnlyTarget {
    async fn read_file(&self, path: &Path) -> Result<String> {
        self.inner.read_file(path).await
    }

    async fn write_file_atomic(&self, path: &Path, content: &str) -> Result<()> {
        self.writes.lock().unwrap().push(path.to_path_buf());
        if path == self.rejected {
            return Err(HostpackError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "deployment directory is read-only",
            )));
        }
        self.inner.write_file_atomic(path, content).await
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        self.inner.create_directory(path).await
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        self.inner.remove_file(path).await
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.inner.file_exists(path)
    }
}

/// Flat-export text shaped like esbuild's cjs output for `src/<stem>.ts`
fn flat_export_bundle(stem: &str, exports: &[(&str, &str)], externals: &[&str], body: &str) -> String {
    let export_map = exports
        .iter()
        .map(|(name, symbol)| format!("  {}: () => {}", name, symbol))
        .collect::<Vec<_>>()
        .join(",\n");
    let imports = externals
        .iter()
        .map(|path| {
            let local = path.rsplit('/').next().unwrap_or(path).replace('-', "_");
            format!("var import_{} = __toESM(require(\"{}\"));", local, path)
        })
        .collect::<Vec<_>>()
        .join("\n");
    let annotation = exports
        .iter()
        .map(|(name, _)| format!("  {}", name))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        r#""use strict";
var __defProp = Object.defineProperty;
var __export = (target, all) => {{
  for (var name in all)
    __defProp(target, name, {{ get: all[name], enumerable: true }});
}};
var __toCommonJS = (mod) => mod;
var __toESM = (mod) => mod;

// src/{stem}.ts
var {stem}_exports = {{}};
__export({stem}_exports, {{
{export_map}
}});
module.exports = __toCommonJS({stem}_exports);
{imports}
{body}
// Annotate the CommonJS export names for ESM import in node:
0 && (module.exports = {{
{annotation}
}});
"#
    )
}

struct Unit {
    name: &'static str,
    exports: &'static [&'static str],
}

fn project(units: &[Unit], report_file: Option<&str>) -> (TempDir, HostpackConfig) {
    let temp_dir = tempfile::tempdir().unwrap();
    let src = temp_dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();

    let deployments = units
        .iter()
        .map(|unit| {
            std::fs::write(
                src.join(format!("{}.ts", unit.name)),
                "/**\n * @NApiVersion 2.1\n * @NScriptType Suitelet\n */\nexport function placeholder() {}\n",
            )
            .unwrap();
            DeploymentDescriptor::new(
                unit.name,
                "suitelet",
                unit.exports,
                format!("src/{}.ts", unit.name),
                "dist",
            )
        })
        .collect();

    let file = ConfigFile {
        deployments,
        report_file: report_file.map(String::from),
        ..Default::default()
    };
    let config = ConfigLoader::resolve(file, temp_dir.path(), ProfileKind::Development);
    (temp_dir, config)
}

fn orchestrator(bundler: Arc<FakeBundler>) -> BuildOrchestrator {
    BuildOrchestrator::new(bundler, Arc::new(TokioFileSystemService), FormatTransformer::new(Default::default()))
}

#[tokio::test]
async fn test_single_unit_is_wrapped() {
    let (_temp_dir, config) = project(&[Unit { name: "suitelet", exports: &["handle"] }], None);

    let mut bundler = FakeBundler::default();
    bundler.outputs.insert(
        "suitelet".to_string(),
        flat_export_bundle(
            "suitelet",
            &[("handle", "handle3")],
            &["platform/logging"],
            "function handle3(ctx) {\n  import_logging.audit(\"hit\", ctx);\n}",
        ),
    );

    let outcome = orchestrator(Arc::new(bundler))
        .build(&config, BuildOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.artifacts.len(), 1);
    let written = std::fs::read_to_string(config.registry.descriptors()[0].artifact_path()).unwrap();

    assert!(written.starts_with("/**\n * @NApiVersion 2.1"), "header copied: {}", written);
    assert!(written.contains("factory([\"platform/logging\"], function (logging) {"), "{}", written);
    assert!(written.contains("var import_logging = logging;"), "{}", written);
    assert!(written.contains("        handle: handle3"), "{}", written);
    assert!(!written.contains("module.exports"));
    assert!(!written.contains("require("));
    assert!(!written.contains("suitelet_exports"));
    assert_eq!(written.matches("\"use strict\"").count(), 1);
    assert!(written.trim_end().ends_with("});"));

    assert_eq!(
        outcome.phases,
        vec![
            BuildPhase::Validating,
            BuildPhase::Bundling,
            BuildPhase::Transforming,
            BuildPhase::Analyzing,
            BuildPhase::Reporting,
            BuildPhase::Done,
        ]
    );
    assert!(outcome.report.success);
}

#[tokio::test]
async fn test_exports_and_dependencies_line_up() {
    let (_temp_dir, config) = project(&[Unit { name: "orders", exports: &["get", "post", "delete"] }], None);

    let mut bundler = FakeBundler::default();
    bundler.outputs.insert(
        "orders".to_string(),
        flat_export_bundle(
            "orders",
            &[("get", "get2"), ("post", "post"), ("delete", "_delete")],
            &["N/record", "N/search", "N/record"],
            "function get2(req) {\n  return import_record.load(req);\n}\nfunction post(req) {\n  return import_search.create(req);\n}\nfunction _delete(req) {\n  return null;\n}",
        ),
    );

    let outcome = orchestrator(Arc::new(bundler))
        .build(&config, BuildOptions::default())
        .await
        .unwrap();
    let artifact = &outcome.artifacts[0];

    assert_eq!(artifact.dependencies.paths(), &["N/record".to_string(), "N/search".to_string()]);
    assert!(artifact
        .text
        .contains("factory([\"N/record\", \"N/search\"], function (record, search) {"));

    let logical: Vec<&str> = artifact.bindings.iter().map(|b| b.logical_name.as_str()).collect();
    assert_eq!(logical, vec!["get", "post", "delete"]);
    assert!(artifact.text.contains("        get: get2,"));
    assert!(artifact.text.contains("        post: post,"));
    assert!(artifact.text.contains("        delete: _delete\n"));
}

#[tokio::test]
async fn test_bundle_failure_stops_before_transform() {
    let units = [
        Unit { name: "alpha", exports: &["run"] },
        Unit { name: "beta", exports: &["run"] },
        Unit { name: "gamma", exports: &["run"] },
    ];
    let (_temp_dir, config) = project(&units, None);

    let mut bundler = FakeBundler::default();
    for unit in &units {
        bundler.outputs.insert(
            unit.name.to_string(),
            flat_export_bundle(unit.name, &[("run", "run")], &[], "function run() {}"),
        );
    }
    bundler.failing.insert("beta".to_string());

    let err = orchestrator(Arc::new(bundler))
        .build(&config, BuildOptions::default())
        .await
        .unwrap_err();

    match &err {
        HostpackError::Bundle { descriptor, phase, .. } => {
            assert_eq!(descriptor, "beta");
            assert_eq!(*phase, BuildPhase::Bundling);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.format_detailed().contains("beta"));

    for descriptor in config.registry.descriptors() {
        let path = descriptor.artifact_path();
        if path.exists() {
            let text = std::fs::read_to_string(&path).unwrap();
            assert!(!text.contains("factory("), "{} was wrapped", descriptor.name);
        }
    }
}

#[tokio::test]
async fn test_validation_failure_skips_bundling() {
    let (temp_dir, config) = project(&[Unit { name: "orders", exports: &["get"] }], None);
    std::fs::remove_file(temp_dir.path().join("src/orders.ts")).unwrap();

    let bundler = Arc::new(FakeBundler::default());
    let err = orchestrator(bundler.clone())
        .build(&config, BuildOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, HostpackError::Config { .. }));
    assert_eq!(bundler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_report_is_persisted() {
    let (temp_dir, mut config) = project(
        &[Unit { name: "big", exports: &["run"] }, Unit { name: "small", exports: &["run"] }],
        Some("dist/build-report.json"),
    );
    config.thresholds = AnalysisThresholds {
        warning_bytes: 2 * 1024,
        error_bytes: 64 * 1024,
        large_total_bytes: 1024 * 1024,
    };

    let padding = format!("var filler = \"{}\";", "x".repeat(4 * 1024));
    let mut bundler = FakeBundler::default();
    bundler.outputs.insert(
        "big".to_string(),
        flat_export_bundle("big", &[("run", "run")], &[], &format!("{}\nfunction run() {{}}", padding)),
    );
    bundler.outputs.insert(
        "small".to_string(),
        flat_export_bundle("small", &[("run", "run")], &[], "function run() {}"),
    );

    let outcome = orchestrator(Arc::new(bundler))
        .build(&config, BuildOptions { show_analysis: true })
        .await
        .unwrap();

    assert_eq!(outcome.analysis.artifacts[0].name, "big");
    assert_eq!(outcome.analysis.artifacts[0].level, SizeLevel::Warning);
    assert_eq!(outcome.analysis.artifacts[1].level, SizeLevel::Clean);

    let report_path = temp_dir.path().join("dist/build-report.json");
    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(report["success"], serde_json::Value::Bool(true));
    assert_eq!(report["perArtifact"].as_array().unwrap().len(), 2);
    assert_eq!(report["perArtifact"][0]["name"], "big");
    assert_eq!(report["perArtifact"][0]["warnings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_cycle_replaces_report() {
    let (temp_dir, config) = project(&[Unit { name: "orders", exports: &["get"] }], Some("dist/report.json"));
    let report_path = temp_dir.path().join("dist/report.json");

    let mut working = FakeBundler::default();
    working.outputs.insert(
        "orders".to_string(),
        flat_export_bundle("orders", &[("get", "get")], &[], "function get() {}"),
    );
    orchestrator(Arc::new(working))
        .build(&config, BuildOptions::default())
        .await
        .unwrap();
    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["success"], serde_json::Value::Bool(true));

    let mut broken = FakeBundler::default();
    broken.failing.insert("orders".to_string());
    orchestrator(Arc::new(broken))
        .build(&config, BuildOptions::default())
        .await
        .unwrap_err();

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["success"], serde_json::Value::Bool(false));
    assert!(report["perArtifact"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_write_failure_aborts_in_transform_phase() {
    let units = [
        Unit { name: "alpha", exports: &["run"] },
        Unit { name: "beta", exports: &["run"] },
        Unit { name: "gamma", exports: &["run"] },
    ];
    let (_temp_dir, config) = project(&units, None);

    let mut bundler = FakeBundler::default();
    for unit in &units {
        bundler.outputs.insert(
            unit.name.to_string(),
            flat_export_bundle(unit.name, &[("run", "run")], &[], "function run() {}"),
        );
    }

    let descriptors = config.registry.descriptors();
    let fs_service = Arc::new(ReadOnlyTarget {
        inner: TokioFileSystemService,
        rejected: descriptors[1].artifact_path(),
        writes: Mutex::new(Vec::new()),
    });
    let orchestrator = BuildOrchestrator::new(
        Arc::new(bundler),
        fs_service.clone(),
        FormatTransformer::new(Default::default()),
    );

    let err = orchestrator.build(&config, BuildOptions::default()).await.unwrap_err();
    match &err {
        HostpackError::Transform { descriptor, path, .. } => {
            assert_eq!(descriptor, "beta");
            assert_eq!(path, &descriptors[1].artifact_path());
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.phase(), BuildPhase::Transforming);

    assert_eq!(
        *fs_service.writes.lock().unwrap(),
        vec![descriptors[0].artifact_path(), descriptors[1].artifact_path()]
    );
    let alpha = std::fs::read_to_string(descriptors[0].artifact_path()).unwrap();
    assert!(alpha.contains("factory("));
    let gamma = std::fs::read_to_string(descriptors[2].artifact_path()).unwrap();
    assert!(!gamma.contains("factory("), "gamma was wrapped after the cycle aborted");
}

#[tokio::test]
async fn test_rebuild_overwrites_previous_artifact() {
    let (_temp_dir, config) = project(&[Unit { name: "orders", exports: &["get"] }], None);

    let mut bundler = FakeBundler::default();
    bundler.outputs.insert(
        "orders".to_string(),
        flat_export_bundle("orders", &[("get", "get")], &[], "function get() {\n  return 1;\n}"),
    );
    let orchestrator = orchestrator(Arc::new(bundler));

    let first = orchestrator.build(&config, BuildOptions::default()).await.unwrap();
    let second = orchestrator.build(&config, BuildOptions::default()).await.unwrap();
    assert_eq!(first.artifacts[0].text, second.artifacts[0].text);

    let path = config.registry.descriptors()[0].artifact_path();
    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert_eq!(on_disk, second.artifacts[0].text);
    assert_eq!(on_disk.matches("factory(").count(), 1);
    assert!(!path.with_file_name("orders.js.hostpack-tmp").exists());
}

#[tokio::test]
async fn test_clean_and_standalone_analysis() {
    let (_temp_dir, config) = project(&[Unit { name: "orders", exports: &["get"] }], None);

    let mut bundler = FakeBundler::default();
    bundler.outputs.insert(
        "orders".to_string(),
        flat_export_bundle("orders", &[("get", "get")], &[], "function get() {}"),
    );
    let orchestrator = orchestrator(Arc::new(bundler));
    orchestrator.build(&config, BuildOptions::default()).await.unwrap();

    let analysis = orchestrator
        .analyze_existing(&config, BuildOptions::default())
        .await
        .unwrap();
    assert_eq!(analysis.artifacts.len(), 1);
    assert!(analysis.total_size > 0);

    orchestrator.clean(&config).await.unwrap();
    assert!(!config.registry.descriptors()[0].artifact_path().exists());

    let analysis = orchestrator
        .analyze_existing(&config, BuildOptions::default())
        .await
        .unwrap();
    assert!(analysis.artifacts.is_empty());
}
