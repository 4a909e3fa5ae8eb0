use anyhow::Result;
use scour::{
    Finder, JobPool, Layout, ParallelScan, ProgressBoard, ScanReport, ScourError, SearchConfig,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn config(pattern: &str, root: &Path) -> SearchConfig {
    SearchConfig {
        pattern: pattern.to_string(),
        root_path: root.to_path_buf(),
        ..Default::default()
    }
}

fn run_scan(config: &SearchConfig) -> Result<ScanReport> {
    let workers = JobPool::new(config.threaded).worker_count();
    let layout = Layout::new(80, workers + 1 + 16, workers);
    let board = ProgressBoard::with_layout(layout, Vec::new(), workers)?;
    Ok(ParallelScan::with_board(config, board)?.run())
}

#[test]
fn test_todo_scenario() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "x\nTODO: fix\ny\n")?;

    let report = run_scan(&config("TODO", dir.path()))?;
    assert_eq!(report.results.len(), 1);

    let result = &report.results[0];
    assert_eq!(result.line_number, Some(2));
    assert_eq!(result.line, "TODO: fix");
    assert_eq!(result.spans.len(), 1);
    assert_eq!(result.spans[0].start, 0);
    assert_eq!(result.spans[0].len, 4);
    Ok(())
}

#[test]
fn test_exclude_extension_scenario() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "TODO text\n")?;
    fs::write(dir.path().join("b.bin"), "TODO blob\n")?;

    let mut cfg = config("TODO", dir.path());
    cfg.exclude_ext = Some(".bin".to_string());

    let finder = Finder::from_config(&cfg)?;
    assert!(finder.match_file(Path::new("a.txt")));
    assert!(!finder.match_file(Path::new("b.bin")));

    let report = run_scan(&cfg)?;
    assert_eq!(report.results.len(), 1);
    assert!(report.results[0].file.ends_with("a.txt"));
    Ok(())
}

#[test]
fn test_negate_and_unless() -> Result<()> {
    let dir = tempdir()?;

    let mut negated = config("TODO", dir.path());
    negated.negate = true;
    let finder = Finder::from_config(&negated)?;
    assert!(finder.match_line("plain line"));
    assert!(!finder.match_line("TODO: fix"));
    // Negation admits but never highlights
    assert!(finder.match_spans("plain line").is_none());

    let mut guarded = config("TODO", dir.path());
    guarded.unless = Some("skip".to_string());
    let finder = Finder::from_config(&guarded)?;
    assert!(finder.match_line("TODO: fix"));
    assert!(!finder.match_line("TODO: skip this one"));
    Ok(())
}

#[test]
fn test_invalid_pattern_fails_before_scanning() {
    let dir = tempdir().unwrap();
    let cfg = config("(unclosed", dir.path());
    let result = Finder::from_config(&cfg);
    assert!(matches!(result, Err(ScourError::InvalidPattern(_))));

    let mut cfg = config("TODO", dir.path());
    cfg.unless = Some("[bad".to_string());
    assert!(Finder::from_config(&cfg).is_err());
}

#[test]
fn test_announcement_per_matching_folder() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("root1.txt"), "TODO a\nTODO b\n")?;
    fs::write(dir.path().join("root2.txt"), "TODO c\n")?;
    let matched_sub = dir.path().join("matched");
    fs::create_dir(&matched_sub)?;
    fs::write(matched_sub.join("hit.txt"), "TODO deep\n")?;
    let quiet_sub = dir.path().join("quiet");
    fs::create_dir(&quiet_sub)?;
    fs::write(quiet_sub.join("miss.txt"), "nothing here\n")?;

    let report = run_scan(&config("TODO", dir.path()))?;

    let announced: Vec<_> = report
        .results
        .iter()
        .filter_map(|r| r.folder.clone())
        .collect();
    // Two folders yielded matches; the quiet one is never announced
    assert_eq!(announced.len(), 2);
    assert!(announced.contains(&dir.path().to_path_buf()));
    assert!(announced.contains(&matched_sub));
    Ok(())
}

#[test]
fn test_sync_scan_is_deterministic() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("one.txt"), "TODO one\n")?;
    fs::write(dir.path().join("two.txt"), "TODO two\n")?;

    let cfg = config("TODO", dir.path());
    let first: Vec<_> = run_scan(&cfg)?
        .results
        .into_iter()
        .map(|r| (r.file, r.line_number))
        .collect();
    let second: Vec<_> = run_scan(&cfg)?
        .results
        .into_iter()
        .map(|r| (r.file, r.line_number))
        .collect();
    assert_eq!(first, second);

    // And it matches the lazy tree traversal
    let finder = Finder::from_config(&cfg)?;
    let traversal: Vec<_> = finder
        .scan_tree(dir.path())
        .map(|r| (r.file, r.line_number))
        .collect();
    assert_eq!(first, traversal);
    Ok(())
}

#[test]
fn test_threaded_scan_finds_same_matches_as_sync() -> Result<()> {
    let dir = tempdir()?;
    for i in 0..20 {
        fs::write(
            dir.path().join(format!("file_{i}.txt")),
            format!("line one\nTODO {i}\nline three\nTODO again {i}\n"),
        )?;
    }

    let sync_cfg = config("TODO", dir.path());
    let mut threaded_cfg = config("TODO", dir.path());
    threaded_cfg.threaded = true;

    let as_set = |report: ScanReport| -> BTreeSet<(String, Option<usize>)> {
        report
            .results
            .into_iter()
            .map(|r| (r.file.display().to_string(), r.line_number))
            .collect()
    };

    let sync_matches = as_set(run_scan(&sync_cfg)?);
    let threaded_matches = as_set(run_scan(&threaded_cfg)?);
    assert_eq!(sync_matches.len(), 40);
    assert_eq!(sync_matches, threaded_matches);
    Ok(())
}

#[test]
fn test_whole_text_mode_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.txt"), "TODO one\nmiddle\nTODO two\n")?;

    let mut cfg = config("TODO", dir.path());
    cfg.whole_text = true;

    let report = run_scan(&cfg)?;
    assert_eq!(report.results.len(), 2);
    assert!(report.results.iter().all(|r| r.line_number.is_none()));
    assert!(report.results.iter().all(|r| r.spans.len() == 1));
    // Spans index into the carried text
    assert!(report
        .results
        .iter()
        .all(|r| r.spans[0].end() <= r.line.len()));
    Ok(())
}

#[test]
fn test_line_count_hint_once_per_file() -> Result<()> {
    let dir = tempdir()?;
    fs::write(
        dir.path().join("many.txt"),
        "TODO 1\nTODO 2\nTODO 3\nend\n",
    )?;

    let report = run_scan(&config("TODO", dir.path()))?;
    let hints: Vec<_> = report.results.iter().map(|r| r.line_count).collect();
    assert_eq!(hints, vec![Some(4), None, None]);
    Ok(())
}
