#![allow(dead_code)]

use clustermq::{FileFact, write_facts_json};
use std::path::{Path, PathBuf};

pub fn fake_c_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fake_c")
}

pub fn interest(dirs: &[&str]) -> Vec<String> {
    dirs.iter().map(|d| (*d).to_string()).collect()
}

/// Small two-directory project as facts: `core` is one tight cluster, `net` depends on it.
pub fn sample_facts() -> Vec<FileFact> {
    vec![
        FileFact::new("core/alloc.c").with_lines(120).with_dependency("core/alloc.h", 5),
        FileFact::new("core/alloc.h").with_lines(30),
        FileFact::new("core/queue.c")
            .with_lines(80)
            .with_dependency("core/queue.h", 4)
            .with_dependency("core/alloc.h", 2),
        FileFact::new("core/queue.h").with_lines(25).with_dependency("core/alloc.h", 1),
        FileFact::new("net/sock.c")
            .with_lines(200)
            .with_dependency("net/sock.h", 6)
            .with_dependency("core/queue.h", 3),
        FileFact::new("net/sock.h").with_lines(40),
        FileFact::new("net/poll.c").with_lines(60).with_dependency("net/sock.h", 2),
        FileFact::new("main.c").with_lines(15).with_dependency("net/sock.h", 1),
    ]
}

pub fn write_sample_facts(dir: &Path) -> PathBuf {
    let path = dir.join("facts.json");
    write_facts_json(&path, &sample_facts()).unwrap();
    path
}

/// Leaf names under every top-level cluster, sorted
pub fn top_leaf_names(h: &clustermq::Hierarchy) -> Vec<String> {
    let mut names: Vec<String> = h
        .top
        .iter()
        .flat_map(|&id| h.arena.leaves(id))
        .map(|leaf| h.arena.name(leaf).to_string())
        .collect();
    names.sort();
    names
}
