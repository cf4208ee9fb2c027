//! Task records, the worker pool and dispatch, and the shutdown
//! coordinator (spec.md ยง4.7, ยง4.8).

use crate::fs::layout::RawInode;
use crate::fs::Filesystem;
use crate::queue::TaskQueue;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Number of long-lived worker threads in the pool.
pub const NUM_CONSUMERS: usize = 4;

/// The fixed literal payload a `Test` task writes during the stress-test
/// sequence (spec.md ยง4.7).
pub const STRESS_PAYLOAD: &[u8] = b"stress-test payload";

/// A tagged command record, enqueued by the producer and dispatched by a
/// worker. One variant per command tag, each carrying its typed payload
/// (spec.md ยง9's "task dispatch polymorphism" note).
#[derive(Debug, Clone)]
pub enum Task {
    Help,
    Format,
    Df,
    Touch { name: String },
    Rm { name: String },
    Ls,
    Cat { name: String },
    Echo { name: String, content: Vec<u8> },
    Copy { src: String, dst: String },
    Test { name: String },
    Unknown { command: String },
}

/// Runs one task against `fs`, printing a human-readable result line the
/// way the worker is meant to (spec.md ยง2: "Output is printed directly by
/// the worker").
pub fn dispatch(fs: &Filesystem, task: Task) {
    match task {
        Task::Help => print_help(),
        Task::Format => match fs.format() {
            Ok(()) => println!("fs> format: ok"),
            Err(e) => eprintln!("fs> format: error: {e}"),
        },
        Task::Df => match fs.show_disk_info() {
            Ok(info) => println!(
                "fs> df: state={} blocks={} free_inodes={}/{} free_blocks={}/{}",
                if info.state == 1 { "mounted" } else { "unmounted" },
                info.total_blocks,
                info.free_inode_count,
                info.max_files,
                info.free_data_count,
                info.data_blocks,
            ),
            Err(e) => eprintln!("fs> df: error: {e}"),
        },
        Task::Touch { name } => match fs.create_file(&name) {
            Ok(()) => println!("fs> touch {name}: ok"),
            Err(e) => eprintln!("fs> touch {name}: error: {e}"),
        },
        Task::Rm { name } => match fs.delete_file(&name) {
            Ok(()) => println!("fs> rm {name}: ok"),
            Err(e) => eprintln!("fs> rm {name}: error: {e}"),
        },
        Task::Ls => match fs.list_directory() {
            Ok(entries) if entries.is_empty() => println!("fs> ls: empty"),
            Ok(entries) => {
                for e in entries {
                    let kind = if e.kind == RawInode::TYPE_DIR { "dir" } else { "file" };
                    println!("fs> {} [{kind}, {}]", e.name, e.size);
                }
            }
            Err(e) => eprintln!("fs> ls: error: {e}"),
        },
        Task::Cat { name } => match fs.read_file(&name, 8 * crate::disk::BLOCK_SIZE) {
            Ok(bytes) => println!("fs> cat {name}: {}", String::from_utf8_lossy(&bytes)),
            Err(e) => eprintln!("fs> cat {name}: error: {e}"),
        },
        Task::Echo { name, content } => match fs.write_file(&name, &content) {
            Ok(n) => println!("fs> echo {name}: wrote {n} bytes"),
            Err(e) => eprintln!("fs> echo {name}: error: {e}"),
        },
        Task::Copy { src, dst } => match fs.copy_file(&src, &dst) {
            Ok(()) => println!("fs> copy {src} {dst}: ok"),
            Err(e) => eprintln!("fs> copy {src} {dst}: error: {e}"),
        },
        Task::Test { name } => run_stress_test(fs, &name),
        Task::Unknown { command } => {
            println!("fs> unknown command: {command}");
            print_help();
        }
    }
}

/// The stress-test sequence (spec.md ยง4.7): create, write a fixed literal
/// payload, read it back, delete -- all on one filename.
fn run_stress_test(fs: &Filesystem, name: &str) {
    if let Err(e) = fs.create_file(name) {
        eprintln!("fs> test {name}: create failed: {e}");
        return;
    }
    if let Err(e) = fs.write_file(name, STRESS_PAYLOAD) {
        eprintln!("fs> test {name}: write failed: {e}");
        return;
    }
    match fs.read_file(name, STRESS_PAYLOAD.len()) {
        Ok(bytes) if bytes == STRESS_PAYLOAD => {}
        Ok(_) => eprintln!("fs> test {name}: read-back mismatch"),
        Err(e) => eprintln!("fs> test {name}: read failed: {e}"),
    }
    if let Err(e) = fs.delete_file(name) {
        eprintln!("fs> test {name}: delete failed: {e}");
        return;
    }
    println!("fs> test {name}: ok");
}

fn print_help() {
    println!();
    println!("simulated filesystem commands:");
    println!("  help            - show this help");
    println!("  format          - format the disk");
    println!("  df              - show disk info");
    println!("  touch <name>    - create a file");
    println!("  rm <name>       - delete a file");
    println!("  ls              - list directory contents");
    println!("  cat <name>      - read a file's contents");
    println!("  echo <name>     - write content to a file");
    println!("  copy <src> <dst> - copy a file");
    println!("  test <name>     - run the create/write/read/delete stress check");
    println!("  exit            - quit");
    println!();
}

/// A fixed pool of long-lived worker threads, each looping on
/// dequeue -> dispatch -> execute until the queue signals shutdown.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns [`NUM_CONSUMERS`] workers sharing `fs` and `queue`.
    pub fn spawn(fs: Arc<Filesystem>, queue: Arc<TaskQueue>) -> Self {
        let handles = (0..NUM_CONSUMERS)
            .map(|_| {
                let fs = Arc::clone(&fs);
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    while let Some(task) = queue.dequeue() {
                        dispatch(&fs, task);
                    }
                })
            })
            .collect();
        Self { handles }
    }

    /// Joins every worker thread. Called after the queue has been told to
    /// shut down.
    pub fn join(self) {
        for h in self.handles {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fs::error::FsError;
    use std::env::temp_dir;
    use std::fs;

    fn tmp_path(name: &str) -> std::path::PathBuf {
        let mut p = temp_dir();
        p.push(format!(
            "vfsim-workertest-{name}-{:?}",
            std::thread::current().id()
        ));
        p
    }

    fn fresh(name: &str) -> Filesystem {
        let path = tmp_path(name);
        let _ = fs::remove_file(&path);
        let fs = Filesystem::open(&path).unwrap();
        fs.format().unwrap();
        fs
    }

    #[test]
    fn stress_payload_round_trips_through_create_write_read_delete() {
        let fs = fresh("round-trip");
        fs.create_file("stress").unwrap();
        let written = fs.write_file("stress", STRESS_PAYLOAD).unwrap();
        assert_eq!(written, STRESS_PAYLOAD.len());
        let read_back = fs.read_file("stress", STRESS_PAYLOAD.len()).unwrap();
        assert_eq!(read_back, STRESS_PAYLOAD);
        fs.delete_file("stress").unwrap();
        assert!(matches!(fs.read_file("stress", 1), Err(FsError::NotFound)));
    }

    #[test]
    fn run_stress_test_cleans_up_after_itself() {
        let fs = fresh("run-stress");
        let before = fs.show_disk_info().unwrap();
        run_stress_test(&fs, "stress-file");
        assert!(matches!(
            fs.read_file("stress-file", 1),
            Err(FsError::NotFound)
        ));
        let after = fs.show_disk_info().unwrap();
        assert_eq!(after.free_inode_count, before.free_inode_count);
        assert_eq!(after.free_data_count, before.free_data_count);
    }

    /// spec.md ยง8 S6: many concurrent `Test` tasks against one worker pool
    /// converge to the same state as a freshly formatted disk.
    #[test]
    fn worker_pool_converges_after_concurrent_stress_tasks() {
        let fs = Arc::new(fresh("converge"));
        let before = fs.show_disk_info().unwrap();

        let queue = Arc::new(TaskQueue::new());
        let pool = WorkerPool::spawn(Arc::clone(&fs), Arc::clone(&queue));

        for i in 0..50 {
            queue.enqueue(Task::Test {
                name: format!("stress-{i}"),
            });
        }

        queue.shutdown();
        pool.join();

        let after = fs.show_disk_info().unwrap();
        assert_eq!(after.free_inode_count, before.free_inode_count);
        assert_eq!(after.free_data_count, before.free_data_count);

        let fs = Arc::try_unwrap(fs).unwrap_or_else(|_| panic!("filesystem still shared"));
        assert!(fs.list_directory().unwrap().is_empty());
    }
}
