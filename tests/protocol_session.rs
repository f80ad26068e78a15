//! End-to-end run of a full protocol session: preamble through
//! `T + EXTRA_TIME` slices, covering a write that succeeds and a read that
//! completes before the run ends.

use std::fmt::Write as _;
use std::io::Cursor;

use diskschedsim::config::EXTRA_TIME;
use diskschedsim::session;

fn build_session_input(total_slices: u64) -> String {
    let mut input = String::new();
    // T M N V G: one tag, five disks of size 20, token budget 100.
    writeln!(input, "{} 1 5 20 100", total_slices).unwrap();
    writeln!(input, "0").unwrap(); // deletes[tag 1][epoch 1]
    writeln!(input, "0").unwrap(); // writes[tag 1][epoch 1]
    writeln!(input, "0").unwrap(); // reads[tag 1][epoch 1]

    let last_slice = total_slices + EXTRA_TIME;
    for t in 1..=last_slice {
        writeln!(input, "TIMESTAMP {t}").unwrap();
        writeln!(input, "0").unwrap(); // no deletes this slice

        if t == 1 {
            writeln!(input, "1").unwrap();
            writeln!(input, "1 3 1").unwrap(); // object 1, size 3, tag 1
        } else {
            writeln!(input, "0").unwrap();
        }

        if t == 2 {
            writeln!(input, "1").unwrap();
            writeln!(input, "1 1").unwrap(); // request 1 reads object 1
        } else {
            writeln!(input, "0").unwrap();
        }
    }
    input
}

#[test]
fn write_then_read_completes_within_the_run() {
    let input = build_session_input(2);
    let mut output = Vec::new();
    let orchestrator =
        session::run_session(Cursor::new(input), &mut output).expect("session runs to completion");

    let snapshot = orchestrator.metrics.snapshot();
    assert_eq!(snapshot.objects_written, 1);
    assert_eq!(snapshot.writes_rejected, 0);
    assert_eq!(snapshot.reads_enqueued, 1);
    assert_eq!(snapshot.reads_completed, 1);
    assert_eq!(snapshot.reads_aborted_by_delete, 0);

    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("OK\n"));
    assert!(text.contains("TIMESTAMP 1\n"));
}

#[test]
fn delete_before_read_is_serviced_aborts_it() {
    let total_slices = 2u64;
    let mut input = String::new();
    writeln!(input, "{} 1 5 20 1", total_slices).unwrap(); // token budget 1: reads never complete in one slice
    writeln!(input, "0").unwrap();
    writeln!(input, "0").unwrap();
    writeln!(input, "0").unwrap();

    let last_slice = total_slices + EXTRA_TIME;
    for t in 1..=last_slice {
        writeln!(input, "TIMESTAMP {t}").unwrap();
        if t == 1 {
            writeln!(input, "0").unwrap();
            writeln!(input, "1").unwrap();
            writeln!(input, "1 3 1").unwrap();
            writeln!(input, "0").unwrap();
        } else if t == 2 {
            writeln!(input, "0").unwrap();
            writeln!(input, "0").unwrap();
            writeln!(input, "1").unwrap();
            writeln!(input, "1 1").unwrap();
        } else if t == 3 {
            writeln!(input, "1").unwrap();
            writeln!(input, "1").unwrap();
            writeln!(input, "0").unwrap();
            writeln!(input, "0").unwrap();
        } else {
            writeln!(input, "0").unwrap();
            writeln!(input, "0").unwrap();
            writeln!(input, "0").unwrap();
        }
    }

    let mut output = Vec::new();
    let orchestrator =
        session::run_session(Cursor::new(input), &mut output).expect("session runs to completion");
    let snapshot = orchestrator.metrics.snapshot();
    assert_eq!(snapshot.objects_written, 1);
    assert_eq!(snapshot.reads_aborted_by_delete, 1);
    assert_eq!(snapshot.reads_completed, 0);
}
