//! Entry point: opens the disk image, starts the worker pool, runs the
//! REPL, and on exit drives the shutdown coordinator (spec.md ยง4.8).

use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;
use vfsim::fs::Filesystem;
use vfsim::queue::TaskQueue;
use vfsim::worker::WorkerPool;

/// Command-line arguments: just an optional path to the disk image,
/// parsed by hand the way the teacher crate's tools parse their own
/// arguments (e.g. `mkfs`'s `parse_args`), rather than pulling in an
/// argument-parsing crate for one optional positional.
fn parse_args() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("disk.img"))
}

fn main() {
    let image_path = parse_args();

    let fs = Filesystem::open(&image_path).unwrap_or_else(|e| {
        eprintln!("vfsim: {}: {e}", image_path.display());
        exit(1);
    });
    if !fs.is_formatted() {
        println!(
            "{}: unformatted image, run `format` to initialize it",
            image_path.display()
        );
    }
    let fs = Arc::new(fs);

    let queue = Arc::new(TaskQueue::new());
    let pool = WorkerPool::spawn(Arc::clone(&fs), Arc::clone(&queue));

    vfsim::repl::run(&queue);

    queue.shutdown();
    pool.join();

    let fs = Arc::try_unwrap(fs).unwrap_or_else(|_| {
        eprintln!("vfsim: warning: filesystem handle still shared at shutdown");
        exit(1);
    });
    if let Err(e) = fs.close() {
        eprintln!("vfsim: error closing disk image: {e}");
        exit(1);
    }
    println!("goodbye!");
}
