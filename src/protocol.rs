//! Line-oriented stdio protocol: preamble, then one read/emit cycle per
//! time slice. Parsing is whitespace-tokenized (matching the driver's own
//! `scanf`-style reads) rather than strictly line-based, since the
//! grammar never requires a token to span what the driver considers a
//! line boundary.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::disk::DiskId;
use crate::error::SchedulerError;
use crate::object::{ObjectId, TagId};
use crate::request::RequestId;
use crate::tag_heat::TagHeatTable;

/// Pulls whitespace-delimited tokens from a `BufRead`, refilling one line
/// at a time so a streaming driver is never blocked on input it hasn't
/// sent yet.
pub struct TokenReader<R: BufRead> {
    input: R,
    buffer: VecDeque<String>,
}

impl<R: BufRead> TokenReader<R> {
    pub fn new(input: R) -> Self {
        TokenReader { input, buffer: VecDeque::new() }
    }

    fn next_token(&mut self) -> Result<String> {
        loop {
            if let Some(tok) = self.buffer.pop_front() {
                return Ok(tok);
            }
            let mut line = String::new();
            let bytes_read = self
                .input
                .read_line(&mut line)
                .context("failed reading protocol input")?;
            if bytes_read == 0 {
                return Err(SchedulerError::Protocol("unexpected end of input".into()).into());
            }
            self.buffer.extend(line.split_whitespace().map(String::from));
        }
    }

    fn next_u64(&mut self) -> Result<u64> {
        let tok = self.next_token()?;
        tok.parse::<u64>()
            .map_err(|_| SchedulerError::Protocol(format!("expected integer, got {tok:?}")).into())
    }

    fn next_u32(&mut self) -> Result<u32> {
        Ok(self.next_u64()? as u32)
    }
}

/// The one-shot preamble: run dimensions plus the three per-tag,
/// per-epoch history matrices.
pub struct Preamble {
    pub total_slices: u64,
    pub num_tags: u32,
    pub num_disks: u32,
    pub disk_size: u32,
    pub token_budget: u32,
    pub tag_heat: TagHeatTable,
}

pub fn read_preamble<R: BufRead>(reader: &mut TokenReader<R>) -> Result<Preamble> {
    let total_slices = reader.next_u64()?;
    let num_tags = reader.next_u32()?;
    let num_disks = reader.next_u32()?;
    let disk_size = reader.next_u32()?;
    let token_budget = reader.next_u32()?;

    let num_epochs = ((total_slices - 1) / crate::config::SLICES_PER_EPOCH + 1) as usize;

    let read_matrix = |reader: &mut TokenReader<R>| -> Result<Vec<Vec<u64>>> {
        (0..num_tags)
            .map(|_| (0..num_epochs).map(|_| reader.next_u64()).collect::<Result<Vec<_>>>())
            .collect()
    };

    let deletes = read_matrix(reader)?;
    let _writes = read_matrix(reader)?; // part of the wire format; unused by the heat formula
    let reads = read_matrix(reader)?;

    Ok(Preamble {
        total_slices,
        num_tags,
        num_disks,
        disk_size,
        token_budget,
        tag_heat: TagHeatTable::new(deletes, reads),
    })
}

pub fn emit_ok<W: Write>(writer: &mut W) -> Result<()> {
    writeln!(writer, "OK")?;
    writer.flush()?;
    Ok(())
}

pub fn read_timestamp<R: BufRead>(reader: &mut TokenReader<R>) -> Result<u64> {
    // The driver's line is "TIMESTAMP <t>"; the keyword itself is
    // discarded the way the original driver's "%*s%d" skip does.
    let _keyword = reader.next_token()?;
    reader.next_u64()
}

pub fn emit_timestamp<W: Write>(writer: &mut W, t: u64) -> Result<()> {
    writeln!(writer, "TIMESTAMP {t}")?;
    writer.flush()?;
    Ok(())
}

pub fn read_deletes<R: BufRead>(reader: &mut TokenReader<R>) -> Result<Vec<ObjectId>> {
    let n = reader.next_u32()?;
    (0..n).map(|_| reader.next_u32()).collect()
}

pub fn emit_deletes<W: Write>(writer: &mut W, aborted: &[RequestId]) -> Result<()> {
    writeln!(writer, "{}", aborted.len())?;
    for id in aborted {
        writeln!(writer, "{id}")?;
    }
    writer.flush()?;
    Ok(())
}

pub struct WriteEvent {
    pub object_id: ObjectId,
    pub size: u32,
    pub tag: TagId,
}

pub fn read_writes<R: BufRead>(reader: &mut TokenReader<R>) -> Result<Vec<WriteEvent>> {
    let n = reader.next_u32()?;
    (0..n)
        .map(|_| {
            Ok(WriteEvent {
                object_id: reader.next_u32()?,
                size: reader.next_u32()?,
                tag: reader.next_u32()?,
            })
        })
        .collect()
}

/// One successfully placed object, ready to be reported: its ID and the
/// three `(disk_id, cells)` replica placements, in replica order.
pub struct WrittenObject {
    pub object_id: ObjectId,
    pub replicas: Vec<(DiskId, Vec<u32>)>,
}

pub fn emit_writes<W: Write>(writer: &mut W, written: &[WrittenObject]) -> Result<()> {
    for obj in written {
        writeln!(writer, "{}", obj.object_id)?;
        for (disk_id, cells) in &obj.replicas {
            let cell_list = cells.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(" ");
            writeln!(writer, "{disk_id} {cell_list}")?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn read_reads<R: BufRead>(reader: &mut TokenReader<R>) -> Result<Vec<(RequestId, ObjectId)>> {
    let n = reader.next_u32()?;
    (0..n).map(|_| Ok((reader.next_u32()?, reader.next_u32()?))).collect()
}

pub fn emit_reads<W: Write>(
    writer: &mut W,
    actions: &[String],
    completed: &[RequestId],
) -> Result<()> {
    for line in actions {
        writeln!(writer, "{line}")?;
    }
    writeln!(writer, "{}", completed.len())?;
    for id in completed {
        writeln!(writer, "{id}")?;
    }
    writer.flush()?;
    Ok(())
}
