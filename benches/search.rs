//! Benchmarks for whole-document replace passes
//!
//! Run with: cargo bench search

use multireplace::columns::{ColumnScope, ColumnScopeConfig, DelimiterScanner};
use multireplace::engine::{PassOptions, ReplaceEngine, SearchScope};
use multireplace::host::RopeBuffer;
use multireplace::rules::Rule;

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

fn main() {
    divan::main();
}

fn document(lines: usize) -> String {
    "alpha,beta,gamma,delta\n".repeat(lines)
}

// ============================================================================
// Literal passes
// ============================================================================

#[divan::bench]
fn literal_replace_10k_lines(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| RopeBuffer::new(&document(10_000)))
        .bench_values(|mut buf| {
            let mut scanner = DelimiterScanner::new(ColumnScope::empty());
            let mut engine = ReplaceEngine::new();
            let mut rule = Rule::new("beta", "BETA");
            engine.replace_all(&mut buf, &mut scanner, &mut rule, &PassOptions::default())
        });
}

#[divan::bench]
fn literal_find_all_10k_lines(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| RopeBuffer::new(&document(10_000)))
        .bench_values(|buf| {
            let mut scanner = DelimiterScanner::new(ColumnScope::empty());
            let mut engine = ReplaceEngine::new();
            let mut rule = Rule::new("gamma", "");
            engine
                .find_all(&buf, &mut scanner, &mut rule, SearchScope::Document)
                .map(|m| m.len())
        });
}

// ============================================================================
// Regex passes
// ============================================================================

#[divan::bench]
fn regex_replace_10k_lines(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| RopeBuffer::new(&document(10_000)))
        .bench_values(|mut buf| {
            let mut scanner = DelimiterScanner::new(ColumnScope::empty());
            let mut engine = ReplaceEngine::new();
            let mut rule = Rule::new(r"(al|de)\w+", "<$1>").with_regex();
            engine.replace_all(&mut buf, &mut scanner, &mut rule, &PassOptions::default())
        });
}

// ============================================================================
// Column-scoped passes
// ============================================================================

#[divan::bench]
fn column_scoped_replace_10k_lines(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| {
            let buf = RopeBuffer::new(&document(10_000));
            let mut scanner = DelimiterScanner::new(ColumnScope::from_config(&ColumnScopeConfig {
                delimiter: ",".to_string(),
                quote: None,
                columns: vec![2],
            }));
            scanner.rebuild_all(&buf);
            (buf, scanner)
        })
        .bench_values(|(mut buf, mut scanner)| {
            let mut engine = ReplaceEngine::new();
            let mut rule = Rule::new("beta", "BETA");
            let options = PassOptions {
                scope: SearchScope::Columns,
                ..Default::default()
            };
            engine.replace_all(&mut buf, &mut scanner, &mut rule, &options)
        });
}

#[divan::bench]
fn delimiter_rebuild_10k_lines(bencher: divan::Bencher) {
    bencher
        .with_inputs(|| RopeBuffer::new(&document(10_000)))
        .bench_values(|buf| {
            let mut scanner = DelimiterScanner::new(ColumnScope::from_config(&ColumnScopeConfig {
                delimiter: ",".to_string(),
                quote: Some('"'),
                columns: vec![1, 3],
            }));
            scanner.rebuild_all(&buf);
            scanner.index().len()
        });
}
