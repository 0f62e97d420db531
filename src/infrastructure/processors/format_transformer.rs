/// Rewrites flat-export bundler output into the host's factory-wrapped format.
///
/// Rewrites run in a fixed order because later patterns assume the earlier
/// scaffolding is gone. A pattern that does not match leaves the text as is.

use crate::core::models::{
    capability_parameter_name, DependencySet, DeploymentDescriptor, ExportBinding, TransformedArtifact,
};
use crate::infrastructure::processors::dependency_extractor::{captured_path, EXTERNAL_REFERENCE_REGEX};
use once_cell::sync::Lazy;
use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::{Captures, Regex};
use std::path::Path;

pub const DEFAULT_FACTORY_CALLEE: &str = "factory";
pub const STRICT_MODE_MARKER: &str = "\"use strict\";";

static INTEROP_ANNOTATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)(?:[ \t]*//[^\n]*Annotate the CommonJS export names[^\n]*\n)?[ \t]*0\s*&&\s*\(\s*module\.exports\s*=\s*\{.*?\}\s*\)\s*;?[ \t]*\n?",
    )
    .expect("interop annotation pattern is valid")
});

static LEADING_STRICT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*["']use strict["']\s*;?[ \t]*\n?"#).expect("strict marker pattern is valid")
});

static SOURCE_MAP_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^//# sourceMappingURL=\S*[ \t]*$\n?").expect("source map pattern is valid")
});

static HEADER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A(?:#![^\n]*\n)?\s*(/\*.*?\*/)").expect("header pattern is valid")
});

#[derive(Debug, Clone)]
pub struct TransformOptions {
    /// Callee of the wrapper, e.g. `factory(...)`
    pub factory_callee: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            factory_callee: DEFAULT_FACTORY_CALLEE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormatTransformer {
    options: TransformOptions,
}

impl FormatTransformer {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    /// Produce the wrapped artifact. Deterministic for identical inputs.
    pub fn transform(
        &self,
        descriptor: &DeploymentDescriptor,
        artifact_text: &str,
        dependencies: &DependencySet,
        bindings: &[ExportBinding],
        header: &str,
    ) -> TransformedArtifact {
        let body = remove_export_scaffolding(artifact_text, &descriptor.source_entry_path);
        let body = remove_interop_annotation(&body);
        let body = rewrite_external_references(&body);

        let (body, source_map_url) = lift_source_map_url(&body);
        let body = LEADING_STRICT_REGEX.replace(&body, "");
        let body = body.trim_start_matches('\n').trim_end();

        let text = self.render(body, dependencies, bindings, header, source_map_url.as_deref());

        TransformedArtifact {
            name: descriptor.name.clone(),
            path: descriptor.artifact_path(),
            text,
            dependencies: dependencies.clone(),
            bindings: bindings.to_vec(),
        }
    }

    fn render(
        &self,
        body: &str,
        dependencies: &DependencySet,
        bindings: &[ExportBinding],
        header: &str,
        source_map_url: Option<&str>,
    ) -> String {
        let dependency_array = dependencies
            .paths()
            .iter()
            .map(|p| quote(p))
            .collect::<Vec<_>>()
            .join(", ");
        let parameter_list = dependencies.parameter_names().join(", ");

        let mut out = String::with_capacity(body.len() + header.len() + 256);

        let header = header.trim();
        if !header.is_empty() {
            out.push_str(header);
            out.push('\n');
        }

        out.push_str(&format!(
            "{}([{}], function ({}) {{\n",
            self.options.factory_callee, dependency_array, parameter_list
        ));
        out.push_str("    ");
        out.push_str(STRICT_MODE_MARKER);
        out.push('\n');

        if !body.is_empty() {
            out.push_str(body);
            out.push('\n');
        }

        if bindings.is_empty() {
            out.push_str("    return {};\n");
        } else {
            let export_map = bindings
                .iter()
                .map(|b| format!("        {}: {}", b.logical_name, b.resolved_symbol))
                .collect::<Vec<_>>()
                .join(",\n");
            out.push_str("    return {\n");
            out.push_str(&export_map);
            out.push_str("\n    };\n");
        }
        out.push_str("});\n");

        if let Some(url) = source_map_url {
            out.push_str(url);
            out.push('\n');
        }

        out
    }
}

fn quote(path: &str) -> String {
    serde_json::to_string(path).unwrap_or_else(|_| format!("\"{}\"", path))
}

/// Identifier the bundler derives from the entry file name (`orders.rl.ts` → `orders_rl`).
/// An `index` entry is named after its directory (`orders/index.ts` → `orders`).
fn exports_identifier_stem(source_path: &Path) -> String {
    let mut stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    if stem == "index" {
        if let Some(dir) = source_path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|d| d.to_str())
        {
            stem = dir;
        }
    }

    let mut ident: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}

/// Remove the generated export-map block for this source entry:
/// `var x_exports = {}; __export(x_exports, {...}); module.exports = __toCommonJS(x_exports);`
pub fn remove_export_scaffolding(text: &str, source_path: &Path) -> String {
    let stem = exports_identifier_stem(source_path);
    if stem.is_empty() {
        return text.to_string();
    }

    let id = format!("{}_exports\\d*", regex::escape(&stem));
    let pattern = format!(
        r"(?s)var\s+{id}\s*=\s*\{{\s*\}}\s*;?\s*__export[\w$]*\(\s*{id}\s*,\s*\{{.*?\}}\s*\)\s*;?\s*(?:module\.exports\s*=\s*[\w$]+\(\s*{id}\s*\)\s*;?[ \t]*\n?)?",
        id = id
    );

    match Regex::new(&pattern) {
        Ok(scaffolding) => scaffolding.replace_all(text, "").into_owned(),
        Err(_) => text.to_string(),
    }
}

/// Remove the trailing `0 && (module.exports = {...});` interop annotation
pub fn remove_interop_annotation(text: &str) -> String {
    INTEROP_ANNOTATION_REGEX.replace_all(text, "").into_owned()
}

/// `__toESM(require("N/log"))` → `log`
pub fn rewrite_external_references(text: &str) -> String {
    EXTERNAL_REFERENCE_REGEX
        .replace_all(text, |caps: &Captures| match captured_path(caps) {
            Some(path) => capability_parameter_name(path),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn lift_source_map_url(text: &str) -> (String, Option<String>) {
    let url = SOURCE_MAP_URL_REGEX
        .find_iter(text)
        .last()
        .map(|m| m.as_str().trim_end().to_string());

    match url {
        Some(url) => (SOURCE_MAP_URL_REGEX.replace_all(text, "").into_owned(), Some(url)),
        None => (text.to_string(), None),
    }
}

/// Leading block comment of a source entry file, empty when there is none
pub fn extract_header(source_text: &str) -> String {
    HEADER_REGEX
        .captures(source_text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Parse wrapped output; returns diagnostics, empty when the text is valid
pub fn verify_syntax(text: &str) -> Vec<String> {
    let allocator = Allocator::default();
    let result = Parser::new(&allocator, text, SourceType::cjs()).parse();

    result.errors.iter().map(|e| e.to_string()).collect()
}
