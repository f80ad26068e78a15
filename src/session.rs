//! Ties `protocol` and `orchestrator` together into one runnable session
//! over an arbitrary `BufRead`/`Write` pair, so both the binary and
//! integration tests can drive a full run without duplicating the loop.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::config::EXTRA_TIME;
use crate::orchestrator::Orchestrator;
use crate::protocol::{self, TokenReader};

/// Run one full session: preamble, then one delete/write/read cycle per
/// time slice through `T + EXTRA_TIME`. Returns the orchestrator so the
/// caller can inspect its final metrics.
pub fn run_session<R: BufRead, W: Write>(input: R, mut output: W) -> Result<Orchestrator> {
    let mut reader = TokenReader::new(input);
    let preamble = protocol::read_preamble(&mut reader)?;
    protocol::emit_ok(&mut output)?;

    let mut orchestrator = Orchestrator::new(
        preamble.num_disks,
        preamble.disk_size,
        preamble.token_budget,
        preamble.tag_heat,
    );

    let last_slice = preamble.total_slices + EXTRA_TIME;
    for _ in 1..=last_slice {
        let t = protocol::read_timestamp(&mut reader)?;
        protocol::emit_timestamp(&mut output, t)?;

        let deletes = protocol::read_deletes(&mut reader)?;
        let writes = protocol::read_writes(&mut reader)?;
        let reads = protocol::read_reads(&mut reader)?;

        let result = orchestrator.run_slice(t, deletes, writes, reads);

        protocol::emit_deletes(&mut output, &result.aborted)?;
        protocol::emit_writes(&mut output, &result.written)?;
        protocol::emit_reads(&mut output, &result.actions, &result.completed)?;
    }

    Ok(orchestrator)
}
