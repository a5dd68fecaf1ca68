//! End-to-end scenarios for the compilation adapter, run against a fake
//! compiler over a fixture tree.

mod common;

use common::{relatives, FakeTsc, Fixture};
use std::thread;
use tscflow_core::compiler::EmitTarget;
use tscflow_core::{
    compile, compile_all, CompileOptions, CompileRequest, CompileStatus, Error, VirtualFile,
};

fn request(fx: &Fixture, options: CompileOptions, inputs: Vec<VirtualFile>) -> CompileRequest {
    CompileRequest::new(fx.cwd(), options).with_inputs(inputs)
}

#[test]
fn test_single_file() {
    let fx = Fixture::new();
    let result = compile(
        request(&fx, CompileOptions::new(), fx.src("src", &["src/foo.ts"])),
        &FakeTsc::new(),
    )
    .unwrap();

    assert_eq!(relatives(&result), vec!["foo.js"]);
    fx.dest(&result, "build/test1");
    assert!(fx.read("build/test1/foo.js").contains("var foo"));
    assert_eq!(fx.leftover_workspaces(), 0);
}

#[test]
fn test_multiple_files() {
    let fx = Fixture::new();
    let inputs = fx.src("src", &["src/calc.ts", "src/foo.ts", "src/sum.ts"]);
    let result = compile(request(&fx, CompileOptions::new(), inputs), &FakeTsc::new()).unwrap();

    assert_eq!(relatives(&result), vec!["calc.js", "foo.js", "sum.js"]);
}

#[test]
fn test_directory_structure_is_kept() {
    let fx = Fixture::new();
    let inputs = fx.src(
        "src",
        &["src/calc.ts", "src/foo.ts", "src/s1/a.ts", "src/s2/b.ts", "src/sum.ts"],
    );
    let result = compile(request(&fx, CompileOptions::new(), inputs), &FakeTsc::new()).unwrap();
    fx.dest(&result, "build/test3");

    assert_eq!(
        fx.files_under("build/test3"),
        vec!["calc.js", "foo.js", "s1/a.js", "s2/b.js", "sum.js"]
    );
}

#[test]
fn test_bundle_into_one_file() {
    let fx = Fixture::new();
    let inputs = fx.src("src", &["src/calc.ts", "src/foo.ts", "src/sum.ts"]);
    let result = compile(
        request(&fx, CompileOptions::new().with_out("test4.js"), inputs),
        &FakeTsc::new(),
    )
    .unwrap();

    assert_eq!(relatives(&result), vec!["test4.js"]);
    let text = result.outputs[0].text();
    // `calc.ts` references `sum.ts`, so `sum` comes first.
    let sum = text.find("// sum.ts").unwrap();
    let calc = text.find("// calc.ts").unwrap();
    let foo = text.find("// foo.ts").unwrap();
    assert!(sum < calc && calc < foo);
}

#[test]
fn test_error_is_fatal_and_emits_nothing() {
    let fx = Fixture::new();
    let err = compile(
        request(&fx, CompileOptions::new(), fx.src("src-broken", &["src-broken/error.ts"])),
        &FakeTsc::new(),
    )
    .unwrap_err();

    let Error::Compilation { diagnostics } = &err else {
        panic!("expected a compilation error, got {err}");
    };
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code.as_deref(), Some("TS1109"));
    assert_eq!(
        diagnostics[0].file.as_deref(),
        Some(std::path::Path::new("src-broken/error.ts"))
    );
    assert_eq!(diagnostics[0].line, Some(2));
    assert_eq!(fx.leftover_workspaces(), 0);
}

#[test]
fn test_warning_still_emits() {
    let fx = Fixture::new();
    let result = compile(
        request(&fx, CompileOptions::new(), fx.src("src-broken", &["src-broken/warning.ts"])),
        &FakeTsc::new(),
    )
    .unwrap();

    assert_eq!(relatives(&result), vec!["warning.js"]);
    assert_eq!(result.status, CompileStatus::Succeeded);
    assert_eq!(result.warnings().count(), 1);
    assert_eq!(result.errors().count(), 0);
}

#[test]
fn test_declaration_inputs_produce_no_js() {
    let fx = Fixture::new();
    let inputs = fx.src("src-d", &["src-d/hello.d.ts", "src-d/main.ts", "src-d/sub.ts"]);
    let result = compile(request(&fx, CompileOptions::new(), inputs), &FakeTsc::new()).unwrap();

    assert_eq!(relatives(&result), vec!["main.js", "sub.js"]);
}

#[test]
fn test_declaration_inputs_into_one_file() {
    let fx = Fixture::new();
    let inputs = fx.src("src-d", &["src-d/hello.d.ts", "src-d/main.ts", "src-d/sub.ts"]);
    let result = compile(
        request(&fx, CompileOptions::new().with_out("unified.js"), inputs),
        &FakeTsc::new(),
    )
    .unwrap();

    assert_eq!(relatives(&result), vec!["unified.js"]);
}

#[test]
fn test_declaration_only_is_empty() {
    let fx = Fixture::new();
    let compiler = FakeTsc::new();
    let result = compile(
        request(&fx, CompileOptions::new(), fx.src("src-d", &["src-d/hello.d.ts"])),
        &compiler,
    )
    .unwrap();

    assert!(result.outputs.is_empty());
    assert!(compiler.invocations().is_empty());
}

#[test]
fn test_cross_project_references() {
    let fx = Fixture::new();
    let result = compile(
        request(
            &fx,
            CompileOptions::new(),
            fx.src("src-crossproj/proj-a", &["src-crossproj/proj-a/main.ts"]),
        ),
        &FakeTsc::new(),
    )
    .unwrap();

    assert_eq!(
        relatives(&result),
        vec!["proj-a/main.js", "proj-b/sub/sub.js", "proj-b/util.js"]
    );
    let resolved: Vec<_> = result
        .resolved
        .iter()
        .map(|p| p.strip_prefix(fx.cwd()).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        resolved,
        vec![
            std::path::PathBuf::from("src-crossproj/proj-b/util.ts"),
            "src-crossproj/proj-b/sub/sub.ts".into(),
            "src-crossproj/proj-a/main.ts".into(),
        ]
    );
}

#[test]
fn test_sourcemap_in_place() {
    let fx = Fixture::new();
    let result = compile(
        request(&fx, CompileOptions::new().with_sourcemap(true), fx.src("src", &["src/foo.ts"])),
        &FakeTsc::new(),
    )
    .unwrap();
    fx.dest(&result, "build/test11");

    assert_eq!(fx.files_under("build/test11"), vec!["foo.js", "foo.js.map"]);
    let map = fx.read("build/test11/foo.js.map");
    assert!(map.contains(r#""sources":["../src/foo.ts"]"#), "{map}");
    assert!(map.contains(r#""file":"foo.js""#), "{map}");

    let js = result.output("foo.js").unwrap();
    assert_eq!(js.source_map().unwrap().sources, vec!["../src/foo.ts"]);
}

#[test]
fn test_sourcemap_with_out_dir() {
    let fx = Fixture::new();
    let result = compile(
        request(
            &fx,
            CompileOptions::new().with_sourcemap(true).with_out_dir("build/test12"),
            fx.src("src-crossproj/proj-a", &["src-crossproj/proj-a/main.ts"]),
        ),
        &FakeTsc::new(),
    )
    .unwrap();
    fx.dest(&result, "build/test12");

    let expect = [
        ("proj-a/main.js.map", "../../../src-crossproj/proj-a/main.ts"),
        ("proj-b/util.js.map", "../../../src-crossproj/proj-b/util.ts"),
        ("proj-b/sub/sub.js.map", "../../../../src-crossproj/proj-b/sub/sub.ts"),
    ];
    for (map, source) in expect {
        let text = fx.read(&format!("build/test12/{map}"));
        assert!(text.contains(&format!(r#""sources":["{source}"]"#)), "{map}: {text}");
    }
    assert!(fx.exists("build/test12/proj-b/sub/sub.js"));
}

#[test]
fn test_sourcemap_bundle_with_source_root() {
    let fx = Fixture::new();
    let result = compile(
        request(
            &fx,
            CompileOptions::new()
                .with_sourcemap(true)
                .with_source_root("/")
                .with_out("unified.js"),
            fx.src("src-crossproj/proj-a", &["src-crossproj/proj-a/main.ts"]),
        ),
        &FakeTsc::new(),
    )
    .unwrap();
    fx.dest(&result, "build/test13");

    assert_eq!(fx.files_under("build/test13"), vec!["unified.js", "unified.js.map"]);
    let map = fx.read("build/test13/unified.js.map");
    assert!(map.contains(r#""sourceRoot":"/""#), "{map}");
    assert!(
        map.contains(r#""sources":["proj-b/util.ts","proj-b/sub/sub.ts","proj-a/main.ts"]"#),
        "{map}"
    );
}

#[test]
fn test_in_place_output() {
    let fx = Fixture::new();
    let inputs = fx.src(
        "src-inplace",
        &[
            "src-inplace/sub/sub1.ts",
            "src-inplace/sub/sub2.ts",
            "src-inplace/top1.ts",
            "src-inplace/top2.ts",
        ],
    );
    let result = compile(request(&fx, CompileOptions::new(), inputs), &FakeTsc::new()).unwrap();
    fx.dest(&result, "src-inplace");

    for js in ["top1.js", "top2.js", "sub/sub1.js", "sub/sub2.js"] {
        assert!(fx.exists(&format!("src-inplace/{js}")), "{js}");
    }
    let top1 = result.output("top1.js").unwrap();
    assert_eq!(top1.path(), fx.cwd().join("src-inplace/top1.js"));
}

#[test]
fn test_emit_error_false_keeps_partial_output() {
    let fx = Fixture::new();
    let result = compile(
        request(
            &fx,
            CompileOptions::new().with_emit_error(false),
            fx.src("src-broken", &["src-broken/error.ts"]),
        ),
        &FakeTsc::new(),
    )
    .unwrap();

    assert_eq!(result.status, CompileStatus::Failed);
    assert_eq!(relatives(&result), vec!["error.js"]);
    assert_eq!(result.errors().count(), 1);
}

#[test]
fn test_emit_error_false_on_old_compiler_is_empty() {
    let fx = Fixture::new();
    let result = compile(
        request(
            &fx,
            CompileOptions::new().with_emit_error(false),
            fx.src("src-broken", &["src-broken/error.ts"]),
        ),
        &FakeTsc::with_version(1, 4, 1),
    )
    .unwrap();

    assert_eq!(result.status, CompileStatus::Failed);
    assert!(result.outputs.is_empty());
}

#[test]
fn test_emit_on_error_override_discards_partial_output() {
    let fx = Fixture::new();
    let result = compile(
        request(
            &fx,
            CompileOptions::new()
                .with_emit_error(false)
                .with_emit_on_error(false),
            fx.src("src-broken", &["src-broken/error.ts"]),
        ),
        &FakeTsc::new(),
    )
    .unwrap();

    assert!(result.outputs.is_empty());
}

#[test]
fn test_concurrent_requests_are_isolated() {
    let fx = Fixture::new();
    // Both invocations must be in flight at the same time to pass the barrier.
    let compiler = FakeTsc::new().with_barrier(2);

    let (one, two) = thread::scope(|s| {
        let one = s.spawn(|| {
            compile(request(&fx, CompileOptions::new(), fx.src("src/s1", &["src/s1/a.ts"])), &compiler)
        });
        let two = s.spawn(|| {
            compile(request(&fx, CompileOptions::new(), fx.src("src/s2", &["src/s2/b.ts"])), &compiler)
        });
        (one.join().unwrap(), two.join().unwrap())
    });

    let one = one.unwrap();
    let two = two.unwrap();
    fx.dest(&one, "build/test16/s1");
    fx.dest(&two, "build/test16/s2");
    assert_eq!(fx.files_under("build/test16"), vec!["s1/a.js", "s2/b.js"]);

    let invocations = compiler.invocations();
    assert_eq!(invocations.len(), 2);
    assert_ne!(invocations[0].cwd, invocations[1].cwd);
    assert_eq!(fx.leftover_workspaces(), 0);
}

#[test]
fn test_batch_with_a_failing_request() {
    let fx = Fixture::new();
    let requests = vec![
        request(&fx, CompileOptions::new(), fx.src("src-broken", &["src-broken/error.ts"])),
        request(&fx, CompileOptions::new(), fx.src("src/s2", &["src/s2/b.ts"])),
    ];

    let results = compile_all(requests, &FakeTsc::new());
    assert_eq!(results.len(), 2);
    assert!(matches!(results[0], Err(Error::Compilation { .. })));
    let two = results[1].as_ref().unwrap();
    assert_eq!(relatives(two), vec!["b.js"]);
    assert_eq!(fx.leftover_workspaces(), 0);
}

#[test]
fn test_batch_with_safe_warning() {
    let fx = Fixture::new();
    let requests = vec![
        request(
            &fx,
            CompileOptions::new().with_safe(true),
            fx.src("src-broken", &["src-broken/warning.ts"]),
        ),
        request(&fx, CompileOptions::new(), fx.src("src/s2", &["src/s2/b.ts"])),
    ];

    let results = compile_all(requests, &FakeTsc::new());
    let one = results[0].as_ref().unwrap();
    assert!(one.outputs.is_empty());
    assert!(one.is_success());
    assert_eq!(relatives(results[1].as_ref().unwrap()), vec!["b.js"]);
    assert_eq!(fx.leftover_workspaces(), 0);
}

#[test]
fn test_nested_inputs_keep_glob_base() {
    let fx = Fixture::new();
    let inputs = fx.src("src-inplace", &["src-inplace/sub/sub1.ts", "src-inplace/sub/sub2.ts"]);
    let result = compile(
        request(
            &fx,
            CompileOptions::new().with_sourcemap(true).with_out_dir("build/test18"),
            inputs,
        ),
        &FakeTsc::new(),
    )
    .unwrap();
    fx.dest(&result, "build/test18");

    assert_eq!(
        fx.files_under("build/test18"),
        vec!["sub/sub1.js", "sub/sub1.js.map", "sub/sub2.js", "sub/sub2.js.map"]
    );
    assert!(fx
        .read("build/test18/sub/sub1.js.map")
        .contains(r#""sources":["../../../src-inplace/sub/sub1.ts"]"#));
}

#[test]
fn test_nested_inputs_into_one_file() {
    let fx = Fixture::new();
    let inputs = fx.src("src-inplace", &["src-inplace/sub/sub1.ts", "src-inplace/sub/sub2.ts"]);
    let result = compile(
        request(
            &fx,
            CompileOptions::new()
                .with_sourcemap(true)
                .with_out_dir("build/test19")
                .with_out("test19.js"),
            inputs,
        ),
        &FakeTsc::new(),
    )
    .unwrap();
    fx.dest(&result, "build/test19");

    assert_eq!(fx.files_under("build/test19"), vec!["test19.js", "test19.js.map"]);
    assert!(fx.read("build/test19/test19.js.map").contains(
        r#""sources":["../../src-inplace/sub/sub1.ts","../../src-inplace/sub/sub2.ts"]"#
    ));
}

#[test]
fn test_wildcard_project_dir() {
    let fx = Fixture::new();
    let result = compile(
        request(
            &fx,
            CompileOptions::new().with_out_dir("build/test20"),
            fx.src("src-crossproj", &["src-crossproj/proj-a/main.ts"]),
        ),
        &FakeTsc::new(),
    )
    .unwrap();

    assert_eq!(
        relatives(&result),
        vec!["proj-a/main.js", "proj-b/sub/sub.js", "proj-b/util.js"]
    );
}

#[test]
fn test_path_filter() {
    let fx = Fixture::new();
    let options = CompileOptions::new()
        .with_sourcemap(true)
        .with_out_dir("build/test21")
        .with_path_filter("proj-a", "a/build")
        .with_path_filter("proj-b", "b/build");
    let result = compile(
        request(&fx, options, fx.src("src-crossproj/proj-a", &["src-crossproj/proj-a/main.ts"])),
        &FakeTsc::new(),
    )
    .unwrap();
    fx.dest(&result, "build/test21");

    let expect = [
        ("a/build/main.js.map", "../../../../src-crossproj/proj-a/main.ts"),
        ("b/build/util.js.map", "../../../../src-crossproj/proj-b/util.ts"),
        ("b/build/sub/sub.js.map", "../../../../../src-crossproj/proj-b/sub/sub.ts"),
    ];
    for (map, source) in expect {
        let text = fx.read(&format!("build/test21/{map}"));
        assert!(text.contains(&format!(r#""sources":["{source}"]"#)), "{map}: {text}");
    }
    assert!(fx.exists("build/test21/a/build/main.js"));
    assert!(fx.exists("build/test21/b/build/sub/sub.js"));
}

#[test]
fn test_safe_suppresses_warned_output() {
    let fx = Fixture::new();
    let result = compile(
        request(
            &fx,
            CompileOptions::new().with_safe(true),
            fx.src("src-broken", &["src-broken/warning.ts"]),
        ),
        &FakeTsc::new(),
    )
    .unwrap();

    assert!(result.outputs.is_empty());
    assert_eq!(result.warnings().count(), 1);
    assert_eq!(result.status, CompileStatus::Succeeded);
}

#[test]
fn test_safe_keeps_clean_units() {
    let fx = Fixture::new();
    let inputs = fx.src("src-broken", &["src-broken/warning.ts"])
        .into_iter()
        .chain(fx.src("src", &["src/foo.ts"]))
        .collect();
    let result = compile(
        request(&fx, CompileOptions::new().with_safe(true).with_sourcemap(true), inputs),
        &FakeTsc::new(),
    )
    .unwrap();

    // Common root is the fixture root: src-broken/ and src/ both stay.
    assert_eq!(relatives(&result), vec!["src/foo.js", "src/foo.js.map"]);
}

#[test]
fn test_declaration_references_outer_file() {
    let fx = Fixture::new();
    let result = compile(
        request(
            &fx,
            CompileOptions::new().with_declaration(true).with_out_dir("build/test24"),
            fx.src("src-d-outer", &["src-d-outer/src/main.ts"]),
        ),
        &FakeTsc::new(),
    )
    .unwrap();
    fx.dest(&result, "build/test24");

    assert_eq!(fx.files_under("build/test24"), vec!["src/main.d.ts", "src/main.js"]);
    let dts = fx.read("build/test24/src/main.d.ts");
    assert!(
        dts.contains(r#"<reference path="../../../src-d-outer/hello.d.ts" />"#),
        "{dts}"
    );
}

#[test]
fn test_declaration_references_between_outputs() {
    let fx = Fixture::new();
    let result = compile(
        request(
            &fx,
            CompileOptions::new().with_declaration(true).with_out_dir("build/decl"),
            fx.src("src-crossproj/proj-a", &["src-crossproj/proj-a/main.ts"]),
        ),
        &FakeTsc::new(),
    )
    .unwrap();

    let main = result.output("proj-a/main.d.ts").unwrap().text().into_owned();
    assert!(main.contains(r#"<reference path="../proj-b/util.d.ts" />"#), "{main}");
    assert!(main.contains(r#"<reference path="../proj-b/sub/sub.d.ts" />"#), "{main}");
}

#[test]
fn test_old_compiler_without_root_dir() {
    let fx = Fixture::new();
    let compiler = FakeTsc::with_version(1, 4, 1);
    let result = compile(
        request(
            &fx,
            CompileOptions::new().with_out_dir("build/old"),
            fx.src("src-crossproj/proj-a", &["src-crossproj/proj-a/main.ts"]),
        ),
        &compiler,
    )
    .unwrap();

    assert_eq!(
        relatives(&result),
        vec!["proj-a/main.js", "proj-b/sub/sub.js", "proj-b/util.js"]
    );
    let invocation = &compiler.invocations()[0];
    assert!(invocation.root_dir.is_none());
    assert!(!invocation.args().contains(&"--rootDir".to_string()));
}

#[test]
fn test_invocation_uses_bundle_flag_for_release() {
    let fx = Fixture::new();
    let compiler = FakeTsc::with_version(1, 8, 10);
    compile(
        request(&fx, CompileOptions::new().with_out("all.js"), fx.src("src", &["src/foo.ts"])),
        &compiler,
    )
    .unwrap();

    let invocation = &compiler.invocations()[0];
    assert!(matches!(invocation.emit, EmitTarget::Bundle(_)));
    assert_eq!(invocation.args()[0], "--outFile");
}

#[test]
fn test_custom_tmp_dir() {
    let fx = Fixture::new();
    let tmp = tempfile::tempdir().unwrap();
    let compiler = FakeTsc::new();
    compile(
        request(&fx, CompileOptions::new().with_tmp_dir(tmp.path()), fx.src("src", &["src/foo.ts"])),
        &compiler,
    )
    .unwrap();

    assert!(compiler.invocations()[0].cwd.starts_with(tmp.path()));
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_reference_is_a_resolution_error() {
    let fx = Fixture::new();
    let input = VirtualFile::new(fx.cwd(), "src/ghost.ts", "/// <reference path=\"nowhere.ts\" />\n");
    let err = compile(request(&fx, CompileOptions::new(), vec![input]), &FakeTsc::new()).unwrap_err();

    assert_eq!(err.code(), "RESOLUTION_FAILED");
    assert_eq!(fx.leftover_workspaces(), 0);
}
