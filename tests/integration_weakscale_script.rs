#![cfg(unix)]

use anyhow::Result;
use fifo_harness::{
    aggregate::{convert, SingleSamplePolicy},
    BenchmarkMode, ProcessInvoker, WeakScalingDriver, WeakScalingJob,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Stand-in for the benchmark: `exe 7 <graph> -n -t <t> ...` writes two
/// trials for `t` and reports the file on stderr.
const FAKE_BENCHMARK: &str = r#"#!/bin/sh
name="fifo-bfs-$(basename "$2")-0001.csv"
printf 'bbq,%s,1.0\nbbq,%s,3.0\n' "$5" "$5" > "$name"
echo "running on $5 threads"
echo "$name" >&2
"#;

fn install_script(dir: &Path) -> Result<std::path::PathBuf> {
    let path = dir.join("fake-fifo");
    fs::write(&path, FAKE_BENCHMARK)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Drive a real child process through the weak-scaling ladder and convert
/// the combined file the way a sweep does.
#[tokio::test]
async fn weak_scaling_with_real_process() -> Result<()> {
    let bin = tempfile::tempdir()?;
    let graphs = tempfile::tempdir()?;
    let raw = tempfile::tempdir()?;
    let data = tempfile::tempdir()?;

    for t in [1, 2] {
        fs::write(graphs.path().join(format!("road_t_{}.gr", t)), "p sp 2 1\n")?;
    }

    let job = WeakScalingJob {
        executable: install_script(bin.path())?,
        directory: raw.path().to_path_buf(),
        graph: graphs.path().join("road_t_"),
        mode: BenchmarkMode::Bfs,
        extra_args: vec!["-i".to_string(), "bbq".to_string(), "-q".to_string()],
    };

    let invoker = ProcessInvoker::new(Some(std::time::Duration::from_secs(30)));
    // Four cores would want road_t_4.gr, which does not exist
    let combined = WeakScalingDriver::new(&invoker, 4).run(&job).await?;

    assert_eq!(combined, raw.path().join("weakscaling-road_t_.csv"));
    assert_eq!(
        fs::read_to_string(&combined)?,
        "bbq,1,1.0\nbbq,1,3.0\nbbq,2,1.0\nbbq,2,3.0\n"
    );

    let written = convert(&combined, data.path(), "bfs-ws", SingleSamplePolicy::Reject)?;
    assert_eq!(written, vec![data.path().join("bfs-ws-bbq.dat")]);
    assert_eq!(
        fs::read_to_string(&written[0])?,
        "threads its std\n1 2.0 1.4142135623730951\n2 2.0 1.4142135623730951\n"
    );
    Ok(())
}
