use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use typedeps::core::walker::collect_type_references;
use typedeps::core::{AnalyzerOptions, DependencyAnalyzer};
use typedeps::parsers::typescript::TypeScriptParser;

const TSCONFIG: &str = r#"{
    "compilerOptions": { "typeRoots": ["../"], "types": [] },
    "files": ["index.d.ts"]
}"#;

/// `count` packages where package N imports from package N-1
fn write_chain_repository(root: &Path, count: usize) {
    for i in 0..count {
        let dir = root.join("types").join(format!("pkg{i}"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("tsconfig.json"), TSCONFIG).unwrap();

        let content = if i == 0 {
            "export interface Base<T> { value: T }\nexport interface Options { name: string }\n"
                .to_string()
        } else {
            format!(
                r#"import {{ Base, Options }} from "pkg{prev}";

export interface Node{i} extends Base<number> {{
    options: Options;
    children: Array<Base<Options>>;
    lookup(key: string): Base<string> | undefined;
}}

export declare function create{i}(options?: Options): Node{i};
"#,
                prev = i - 1
            )
        };
        fs::write(dir.join("index.d.ts"), content).unwrap();
    }
}

fn benchmark_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("repository_analysis");
    group.sample_size(20);

    let small = TempDir::new().unwrap();
    write_chain_repository(small.path(), 10);
    group.bench_function("ten_packages", |b| {
        b.iter(|| {
            let analyzer = DependencyAnalyzer::new(AnalyzerOptions::default());
            black_box(analyzer.analyze(black_box(small.path())))
        });
    });

    let large = TempDir::new().unwrap();
    write_chain_repository(large.path(), 100);
    group.bench_function("hundred_packages_sequential", |b| {
        b.iter(|| {
            let analyzer = DependencyAnalyzer::new(AnalyzerOptions::default());
            black_box(analyzer.analyze(black_box(large.path())))
        });
    });
    group.bench_function("hundred_packages_parallel", |b| {
        b.iter(|| {
            let analyzer = DependencyAnalyzer::new(AnalyzerOptions::default().with_jobs(4));
            black_box(analyzer.analyze(black_box(large.path())))
        });
    });

    group.finish();
}

fn benchmark_walker(c: &mut Criterion) {
    let mut group = c.benchmark_group("type_reference_walk");

    let mut source = String::new();
    for i in 0..200 {
        source.push_str(&format!(
            "interface Item{i} {{ a: Map<string, Array<Item{i}>>; b: Promise<Item{i} | null>; }}\n"
        ));
    }
    let parsed = TypeScriptParser::new()
        .unwrap()
        .parse_source(Path::new("bench.d.ts"), source)
        .unwrap();

    group.bench_function("nested_generics", |b| {
        b.iter(|| black_box(collect_type_references(parsed.tree.root_node()).len()));
    });

    group.finish();
}

criterion_group!(benches, benchmark_analysis, benchmark_walker);
criterion_main!(benches);
