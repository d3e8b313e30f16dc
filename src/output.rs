//! Trajectory output streams.
//!
//! One continuous (`<name>.x.out`) and one quantized (`<name>.q.out`)
//! tab-separated stream per variable, written at sampled grid times,
//! trigger instants and the end time according to the output selector
//! flags. Sixteen-digit precision; trajectories remain recoverable at
//! arbitrary query times through `x(t)`/`q(t)`, which is the binding
//! requirement rather than any particular formatting.

use crate::error::Result;
use crate::model::Model;
use crate::options::OutputFlags;
use crate::time::{Time, Value};
use crate::variable::VarId;
use std::fs::File;
use std::io::{BufWriter, Write};

struct VarStreams {
    x: Option<BufWriter<File>>,
    q: Option<BufWriter<File>>,
}

/// The open output streams of a simulation run.
pub struct OutputSet {
    streams: Vec<VarStreams>,
    flags: OutputFlags,
}

fn record(w: &mut BufWriter<File>, t: Time, v: Value) -> Result<()> {
    writeln!(w, "{:.16e}\t{:.16e}", t, v)?;
    Ok(())
}

impl OutputSet {
    /// Opens the enabled streams for every variable of the model and
    /// writes the time-zero records.
    pub fn open(model: &Model, flags: OutputFlags, t0: Time) -> Result<OutputSet> {
        let mut streams = Vec::with_capacity(model.len());
        for v in model.ids() {
            let var = model.var(v);
            let x = if flags.x {
                let mut w = BufWriter::new(File::create(format!("{}.x.out", var.name))?);
                record(&mut w, t0, var.x(t0))?;
                Some(w)
            } else {
                None
            };
            let q = if flags.q {
                let mut w = BufWriter::new(File::create(format!("{}.q.out", var.name))?);
                record(&mut w, t0, var.q(t0))?;
                Some(w)
            } else {
                None
            };
            streams.push(VarStreams { x, q });
        }
        Ok(OutputSet { streams, flags })
    }

    /// Writes one record for a single variable at time `t`.
    pub fn write_var(&mut self, model: &Model, v: VarId, t: Time) -> Result<()> {
        let var = model.var(v);
        let s = &mut self.streams[v.0];
        if let Some(w) = s.x.as_mut() {
            record(w, t, var.x(t))?;
        }
        if let Some(w) = s.q.as_mut() {
            record(w, t, var.q(t))?;
        }
        Ok(())
    }

    /// Writes one continuous-only record for a single variable (observer
    /// output).
    pub fn write_var_x(&mut self, model: &Model, v: VarId, t: Time) -> Result<()> {
        let var = model.var(v);
        if let Some(w) = self.streams[v.0].x.as_mut() {
            record(w, t, var.x(t))?;
        }
        Ok(())
    }

    /// Writes records for all variables at time `t`.
    pub fn write_all(&mut self, model: &Model, t: Time) -> Result<()> {
        for v in model.ids() {
            self.write_var(model, v, t)?;
        }
        Ok(())
    }

    /// Event output for a set of triggers and their observers, honoring
    /// the `a`/`o` selector flags and the per-event-kind flag the caller
    /// resolved (`r` for requantizations and handlers, `t` for time
    /// events).
    pub fn write_event(
        &mut self,
        model: &Model,
        t: Time,
        kind_flag: bool,
        triggers: &[VarId],
        observers: &[VarId],
    ) -> Result<()> {
        if self.flags.a {
            return self.write_all(model, t);
        }
        if kind_flag {
            for &v in triggers {
                self.write_var(model, v, t)?;
            }
            for &w in observers {
                // Zero-crossing observers requantize in their observer
                // advance, so they are part of the event output.
                if model.var(w).is_zc() {
                    self.write_var(model, w, t)?;
                }
            }
        }
        if self.flags.o && self.flags.x {
            for &w in observers {
                if !kind_flag || !model.var(w).is_zc() {
                    self.write_var_x(model, w, t)?;
                }
            }
        }
        Ok(())
    }

    /// Terminal records at the end time for variables whose last
    /// quantized segment began before it.
    pub fn finish(&mut self, model: &Model, t_end: Time) -> Result<()> {
        for v in model.ids() {
            if model.var(v).t_q < t_end {
                self.write_var(model, v, t_end)?;
            }
        }
        Ok(())
    }
}
