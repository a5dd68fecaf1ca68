//! Shared fixtures for the integration suite.
//!
//! [`FakeTsc`] behaves like `tsc` closely enough for the adapter: it honours
//! `--outDir`/`--out`, `--rootDir`, `--sourcemap` and `--declaration`, writes
//! maps with workspace-relative `sources`, keeps `/// <reference>` lines in
//! declarations, and reports `// @tsc-error TSnnnn message` markers as
//! diagnostics. Releases before 1.5 emit nothing when there are errors.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier, Mutex};
use tscflow_core::compiler::{EmitTarget, Invocation, InvocationOutput};
use tscflow_core::{CompileResult, Compiler, CompilerError, CompilerVersion, VirtualFile};
use tscflow_util::path::{common_ancestor, is_declaration_file, normalize, relative_path, to_slash};

pub struct FakeTsc {
    version: CompilerVersion,
    barrier: Option<Arc<Barrier>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl FakeTsc {
    pub fn new() -> Self {
        Self::with_version(1, 5, 3)
    }

    pub fn with_version(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            version: CompilerVersion::new(major, minor, patch),
            barrier: None,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Block every invocation until `parties` invocations are in flight.
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    fn emits_on_error(&self) -> bool {
        self.version.is_at_least(1, 5)
    }
}

struct Source {
    path: PathBuf,
    text: String,
}

impl Source {
    fn references(&self) -> Vec<PathBuf> {
        let dir = self.path.parent().unwrap();
        self.text
            .lines()
            .filter_map(|line| {
                let rest = line.trim().strip_prefix("///")?.trim();
                let rest = rest.strip_prefix("<reference path=")?;
                let quote = rest.chars().next()?;
                let value = rest[1..].split(quote).next()?;
                Some(normalize(&dir.join(value)))
            })
            .collect()
    }

    fn body(&self) -> String {
        self.text
            .lines()
            .filter(|l| !l.trim_start().starts_with("///") && !l.contains("@tsc-error"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn diagnostics(&self, out: &mut String) {
        for (index, line) in self.text.lines().enumerate() {
            if let Some(marker) = line.split("@tsc-error ").nth(1) {
                let (code, message) = marker.split_once(' ').unwrap_or((marker, "error"));
                let _ = writeln!(
                    out,
                    "{}({},1): error {code}: {message}",
                    self.path.display(),
                    index + 1
                );
            }
        }
    }
}

fn with_extension(path: &Path, ext: &str) -> PathBuf {
    let name = path.file_name().unwrap().to_string_lossy();
    let stem = name
        .strip_suffix(".tsx")
        .or_else(|| name.strip_suffix(".ts"))
        .unwrap_or(&name);
    path.with_file_name(format!("{stem}{ext}"))
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, text).unwrap();
}

fn map_json(file: &str, sources: &[String]) -> String {
    serde_json::json!({
        "version": 3,
        "file": file,
        "sourceRoot": "",
        "sources": sources,
        "names": [],
        "mappings": "AAAA;AACA",
    })
    .to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

impl Compiler for FakeTsc {
    fn name(&self) -> &'static str {
        "tsc"
    }

    fn version(&self) -> Result<CompilerVersion, CompilerError> {
        Ok(self.version.clone())
    }

    fn invoke(&self, invocation: &Invocation) -> Result<InvocationOutput, CompilerError> {
        if let Some(barrier) = &self.barrier {
            barrier.wait();
        }
        self.invocations.lock().unwrap().push(invocation.clone());

        let sources: Vec<Source> = invocation
            .files
            .iter()
            .map(|path| Source {
                path: path.clone(),
                text: fs::read_to_string(path).unwrap(),
            })
            .collect();

        let mut stdout = String::new();
        for source in &sources {
            source.diagnostics(&mut stdout);
        }
        let has_errors = !stdout.is_empty();
        if has_errors && !self.emits_on_error() {
            return Ok(InvocationOutput {
                exit_code: 1,
                stdout,
                ..InvocationOutput::default()
            });
        }

        let compiled: Vec<&Source> = sources
            .iter()
            .filter(|s| !is_declaration_file(&s.path))
            .collect();

        match &invocation.emit {
            EmitTarget::Dir(out_dir) => {
                let root = invocation.root_dir.clone().unwrap_or_else(|| {
                    common_ancestor(compiled.iter().map(|s| s.path.parent().unwrap())).unwrap()
                });
                let output_of = |path: &Path, ext: &str| {
                    with_extension(&out_dir.join(relative_path(&root, path)), ext)
                };

                for source in &compiled {
                    let js = output_of(&source.path, ".js");
                    let js_dir = js.parent().unwrap();
                    let mut text = format!("// {}\n{}\n", file_name(&source.path), source.body());
                    if invocation.sourcemap {
                        let _ = writeln!(text, "//# sourceMappingURL={}.map", file_name(&js));
                        let sources = vec![to_slash(&relative_path(js_dir, &source.path))];
                        write(&js.with_file_name(format!("{}.map", file_name(&js))), &map_json(&file_name(&js), &sources));
                    }
                    write(&js, &text);

                    if invocation.declaration {
                        let mut dts = String::new();
                        for target in source.references() {
                            let target = if is_declaration_file(&target) {
                                target
                            } else {
                                output_of(&target, ".d.ts")
                            };
                            let _ = writeln!(
                                dts,
                                "/// <reference path=\"{}\" />",
                                to_slash(&relative_path(js_dir, &target))
                            );
                        }
                        let stem = file_name(&with_extension(&source.path, ""));
                        let _ = writeln!(dts, "declare var {stem}: any;");
                        write(&output_of(&source.path, ".d.ts"), &dts);
                    }
                }
            }
            EmitTarget::Bundle(bundle) => {
                let bundle_dir = bundle.parent().unwrap();
                let mut text = String::new();
                for source in &compiled {
                    let _ = writeln!(text, "// {}\n{}", file_name(&source.path), source.body());
                }
                if invocation.sourcemap {
                    let _ = writeln!(text, "//# sourceMappingURL={}.map", file_name(bundle));
                    let sources: Vec<String> = compiled
                        .iter()
                        .map(|s| to_slash(&relative_path(bundle_dir, &s.path)))
                        .collect();
                    write(
                        &bundle.with_file_name(format!("{}.map", file_name(bundle))),
                        &map_json(&file_name(bundle), &sources),
                    );
                }
                write(bundle, &text);
            }
        }

        Ok(InvocationOutput {
            exit_code: if has_errors { 2 } else { 0 },
            stdout,
            ..InvocationOutput::default()
        })
    }
}

/// A directory tree holding the fixture sources.
pub struct Fixture {
    pub dir: tempfile::TempDir,
}

pub const FIXTURES: &[(&str, &str)] = &[
    ("src/foo.ts", "var foo: string = 'foo';\n"),
    ("src/sum.ts", "function sum(a: number, b: number) { return a + b; }\n"),
    ("src/calc.ts", "/// <reference path=\"sum.ts\" />\nvar total = sum(1, 2);\n"),
    ("src/s1/a.ts", "var a = 'a';\n"),
    ("src/s2/b.ts", "var b = 'b';\n"),
    ("src-broken/error.ts", "var broken = ;\n// @tsc-error TS1109 Expression expected.\n"),
    (
        "src-broken/warning.ts",
        "var n: number = 'str';\n// @tsc-error TS2322 Type 'string' is not assignable to type 'number'.\n",
    ),
    ("src-d/hello.d.ts", "declare function hello(name: string): string;\n"),
    ("src-d/main.ts", "/// <reference path=\"hello.d.ts\" />\nhello('main');\n"),
    ("src-d/sub.ts", "/// <reference path=\"hello.d.ts\" />\nhello('sub');\n"),
    (
        "src-crossproj/proj-a/main.ts",
        "/// <reference path=\"../proj-b/util.ts\" />\n/// <reference path=\"../proj-b/sub/sub.ts\" />\nutil();\nsub();\n",
    ),
    ("src-crossproj/proj-b/util.ts", "function util() { return 1; }\n"),
    (
        "src-crossproj/proj-b/sub/sub.ts",
        "/// <reference path=\"../util.ts\" />\nfunction sub() { return util(); }\n",
    ),
    ("src-inplace/top1.ts", "var top1 = 1;\n"),
    ("src-inplace/top2.ts", "var top2 = 2;\n"),
    ("src-inplace/sub/sub1.ts", "var sub1 = 1;\n"),
    ("src-inplace/sub/sub2.ts", "var sub2 = 2;\n"),
    ("src-d-outer/hello.d.ts", "declare function hello(name: string): string;\n"),
    ("src-d-outer/src/main.ts", "/// <reference path=\"../hello.d.ts\" />\nhello('outer');\n"),
];

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for (rel, text) in FIXTURES {
            write(&dir.path().join(rel), text);
        }
        Self { dir }
    }

    pub fn cwd(&self) -> &Path {
        self.dir.path()
    }

    /// Inputs read from disk, with `base` as their glob base.
    pub fn src(&self, base: &str, files: &[&str]) -> Vec<VirtualFile> {
        files
            .iter()
            .map(|rel| VirtualFile::read(self.cwd(), rel).unwrap().with_base(base))
            .collect()
    }

    /// Write outputs below `dest` at their relative paths, like a file sink.
    pub fn dest(&self, result: &CompileResult, dest: &str) {
        for file in &result.outputs {
            let target = self.cwd().join(dest).join(file.relative());
            tscflow_util::fs::atomic_write(&target, file.contents()).unwrap();
        }
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.cwd().join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.cwd().join(rel).is_file()
    }

    /// Every file below `dir`, slash-separated and sorted.
    pub fn files_under(&self, dir: &str) -> Vec<String> {
        let root = self.cwd().join(dir);
        let mut files: Vec<String> = walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| to_slash(e.path().strip_prefix(&root).unwrap()))
            .collect();
        files.sort();
        files
    }

    /// Number of workspace directories left in the working directory.
    pub fn leftover_workspaces(&self) -> usize {
        fs::read_dir(self.cwd())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("tscflow-tmp-"))
            .count()
    }
}

/// Relative output paths of a result, sorted.
pub fn relatives(result: &CompileResult) -> Vec<String> {
    let mut names: Vec<String> = result.outputs.iter().map(|f| to_slash(&f.relative())).collect();
    names.sort();
    names
}
