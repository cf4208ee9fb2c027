//! The interactive command parser and REPL.
//!
//! Per spec.md ยง1 this is an external collaborator, not part of the core:
//! it only turns a line of input into a [`Task`] and enqueues it. Console
//! formatting, help text and the specific set of command verbs are all
//! explicitly out of scope for the core and live here instead.

use crate::queue::TaskQueue;
use crate::worker::Task;
use std::io::{self, BufRead, Write};

/// Parses one line of input into a [`Task`].
///
/// `echo <name>` with no trailing content returns an `Echo` task whose
/// content must still be filled in by a follow-up prompt (see
/// [`run`]), matching the two-step interaction of the program this spec
/// was distilled from.
pub fn parse_line(line: &str) -> Option<Task> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim_start()),
        None => (line, ""),
    };

    Some(match cmd {
        "help" => Task::Help,
        "format" => Task::Format,
        "df" => Task::Df,
        "touch" => Task::Touch {
            name: rest.to_string(),
        },
        "rm" => Task::Rm {
            name: rest.to_string(),
        },
        "ls" => Task::Ls,
        "cat" => Task::Cat {
            name: rest.to_string(),
        },
        "echo" => {
            let (name, content) = match rest.split_once(char::is_whitespace) {
                Some((n, c)) => (n.to_string(), Some(c.trim_start().as_bytes().to_vec())),
                None => (rest.to_string(), None),
            };
            Task::Echo {
                name,
                content: content.unwrap_or_default(),
            }
        }
        "copy" => {
            let mut parts = rest.split_whitespace();
            let src = parts.next().unwrap_or("").to_string();
            let dst = parts.next().unwrap_or("").to_string();
            Task::Copy { src, dst }
        }
        "test" => Task::Test {
            name: rest.to_string(),
        },
        "exit" => return None,
        other => Task::Unknown {
            command: other.to_string(),
        },
    })
}

fn print_banner() {
    println!("user-space filesystem simulator");
    println!("================================");
}

/// Runs the REPL loop against `queue`, returning when the user types
/// `exit` or stdin reaches EOF.
///
/// Matches `main.c`'s two-step `echo` interaction: if a bare `echo <name>`
/// is typed with no inline content, the next line typed is read as the
/// content to write.
pub fn run(queue: &TaskQueue) {
    print_banner();
    queue.enqueue(Task::Help);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("fs> ");
        let _ = io::stdout().flush();

        let Some(Ok(line)) = lines.next() else {
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "exit" {
            break;
        }

        let Some(mut task) = parse_line(trimmed) else {
            continue;
        };

        // `echo <name>` with no inline content: prompt for it on the next
        // line, matching main.c's two-step interaction (spec.md
        // "Supplemented features").
        if let Task::Echo { content, .. } = &mut task {
            if content.is_empty() {
                println!("enter content to write (press Enter when done):");
                if let Some(Ok(next)) = lines.next() {
                    *content = next.trim_end_matches(['\n', '\r']).as_bytes().to_vec();
                }
            }
        }

        queue.enqueue(task);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_touch() {
        match parse_line("touch a.txt").unwrap() {
            Task::Touch { name } => assert_eq!(name, "a.txt"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_echo_with_inline_content() {
        match parse_line("echo a.txt hello there").unwrap() {
            Task::Echo { name, content } => {
                assert_eq!(name, "a.txt");
                assert_eq!(content, b"hello there");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_bare_echo_with_empty_content() {
        match parse_line("echo a.txt").unwrap() {
            Task::Echo { name, content } => {
                assert_eq!(name, "a.txt");
                assert!(content.is_empty());
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_copy() {
        match parse_line("copy a b").unwrap() {
            Task::Copy { src, dst } => {
                assert_eq!(src, "a");
                assert_eq!(dst, "b");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn unknown_command_falls_through() {
        match parse_line("frobnicate").unwrap() {
            Task::Unknown { command } => assert_eq!(command, "frobnicate"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn blank_line_yields_no_task() {
        assert!(parse_line("   ").is_none());
    }

    #[test]
    fn exit_yields_no_task() {
        assert!(parse_line("exit").is_none());
    }
}
