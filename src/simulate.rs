//! Simulation driver.
//!
//! Owns the model, the event queue and the options; runs the staged
//! initialization pass and then the event loop: pop the minimum
//! superdense time, emit sampled outputs up to it, and dispatch by event
//! kind, distinguishing single triggers from simultaneous waves. Events
//! sharing a real time execute in superdense-index order; within one
//! simultaneous wave, stage 0 of every trigger completes before stage 1
//! of any trigger.

use crate::error::Result;
use crate::events::{EventKind, EventQueue};
use crate::info;
use crate::model::Model;
use crate::note;
use crate::options::Options;
use crate::output::OutputSet;
use crate::time::Time;
use crate::variable::VarId;
use std::collections::HashSet;
use std::fmt;

/// Event counters reported after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Discrete event passes.
    pub discrete: u64,
    /// Requantization event passes.
    pub qss: u64,
    /// Simultaneous requantization event passes.
    pub qss_simultaneous: u64,
    /// Zero-crossing event passes.
    pub zc: u64,
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} discrete, {} requantization ({} simultaneous), {} zero-crossing",
            self.discrete, self.qss, self.qss_simultaneous, self.zc
        )
    }
}

/// A simulation run: model, queue, options, outputs and counters.
pub struct Simulation {
    opts: Options,
    model: Model,
    queue: EventQueue,
    t: Time,
    t_out: Time,
    i_out: u64,
    outputs: Option<OutputSet>,
    counters: Counters,
}

impl Simulation {
    /// Initializes a simulation: staged variable initialization, event
    /// insertion, and time-zero outputs.
    pub fn new(opts: Options, mut model: Model) -> Result<Simulation> {
        info!("initializing {} variables", model.len());
        let mut queue = EventQueue::new();
        model.init(&mut queue)?;
        let outputs = if opts.output.any_file() {
            Some(OutputSet::open(&model, opts.output, 0.0)?)
        } else {
            None
        };
        Ok(Simulation {
            t_out: opts.dt_out,
            opts,
            model,
            queue,
            t: 0.0,
            i_out: 1,
            outputs,
            counters: Counters::default(),
        })
    }

    /// The model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The event queue.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Current simulation time.
    pub fn time(&self) -> Time {
        self.t
    }

    /// Event counters so far.
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Runs the event loop to the end time, then emits terminal samples.
    pub fn run(&mut self) -> Result<&Counters> {
        info!("simulation loop to tEnd = {}", self.opts.t_end);
        while self.step()? {}
        if let Some(outputs) = self.outputs.as_mut() {
            if self.opts.output.r || self.opts.output.s {
                outputs.finish(&self.model, self.opts.t_end)?;
            }
        }
        note!("simulation complete: {} event passes", self.counters);
        Ok(&self.counters)
    }

    /// One iteration of the event loop: advance to the next event time,
    /// emit sampled outputs up to it, and service the event(s) there.
    /// Returns false once the end time has been passed.
    pub fn step(&mut self) -> Result<bool> {
        self.t = self.queue.top_time();
        self.sampled_outputs()?;
        if self.t > self.opts.t_end {
            return Ok(false);
        }
        self.service()
    }

    fn sampled_outputs(&mut self) -> Result<()> {
        let do_s_out = self.opts.output.s && (self.opts.output.x || self.opts.output.q);
        if !do_s_out || self.outputs.is_none() {
            return Ok(());
        }
        let t_stop = self.t.min(self.opts.t_end);
        while self.t_out < t_stop {
            if let Some(outputs) = self.outputs.as_mut() {
                outputs.write_all(&self.model, self.t_out)?;
            }
            self.i_out += 1;
            self.t_out = self.i_out as Time * self.opts.dt_out;
        }
        Ok(())
    }

    fn event_outputs(
        &mut self,
        kind_flag: bool,
        triggers: &[VarId],
        observers: &[VarId],
    ) -> Result<()> {
        if let Some(outputs) = self.outputs.as_mut() {
            outputs.write_event(&self.model, self.t, kind_flag, triggers, observers)?;
        }
        Ok(())
    }

    /// Observers of a trigger set, triggers excluded, sorted by order.
    fn collect_observers(&self, triggers: &[VarId]) -> Vec<VarId> {
        let lookup: HashSet<VarId> = triggers.iter().cloned().collect();
        let mut set: HashSet<VarId> = HashSet::new();
        for &v in triggers {
            for &w in &self.model.var(v).observers {
                if !lookup.contains(&w) {
                    set.insert(w);
                }
            }
        }
        let mut observers: Vec<VarId> = set.into_iter().collect();
        observers.sort_by_key(|&w| (self.model.var(w).order, w.0));
        observers
    }

    fn sort_by_order(&self, vars: &mut Vec<VarId>) {
        vars.sort_by_key(|&v| (self.model.var(v).order, v.0));
    }

    fn i_beg_order(&self, vars: &[VarId], order: i32) -> usize {
        vars.iter()
            .position(|&v| self.model.var(v).order >= order)
            .unwrap_or_else(|| vars.len())
    }

    fn service(&mut self) -> Result<bool> {
        let event = match self.queue.top() {
            Some(event) => *event,
            None => return Ok(false),
        };
        let s = self.queue.top_superdense_time();
        self.queue.set_active_time();
        match event.kind {
            EventKind::Discrete => {
                self.counters.discrete += 1;
                let do_t_out =
                    self.opts.output.t && (self.opts.output.x || self.opts.output.q);
                // The wave can carry other event kinds scheduled for the
                // same superdense time; they are serviced by the next
                // iterations.
                let mut triggers: Vec<VarId> = self
                    .queue
                    .top_events()
                    .iter()
                    .filter(|e| e.kind == EventKind::Discrete)
                    .map(|e| e.var)
                    .collect();
                if triggers.len() == 1 {
                    let trigger = triggers[0];
                    debug_assert!(self.model.var(trigger).t_d == self.t);
                    let observers = self.model.var(trigger).observers.clone();
                    self.event_outputs(do_t_out, &[trigger], &observers)?;
                    self.model.advance_discrete(&mut self.queue, trigger);
                    self.event_outputs(do_t_out, &[trigger], &observers)?;
                } else {
                    self.sort_by_order(&mut triggers);
                    for &v in &triggers {
                        self.model.var_mut(v).s_t = s;
                    }
                    let i_beg_2 = self.i_beg_order(&triggers, 2);
                    let i_beg_3 = self.i_beg_order(&triggers, 3);
                    let observers = self.collect_observers(&triggers);
                    let order_max = triggers
                        .last()
                        .map(|&v| self.model.var(v).order)
                        .unwrap_or(0)
                        .max(
                            observers
                                .last()
                                .map(|&w| self.model.var(w).order)
                                .unwrap_or(0),
                        );
                    self.event_outputs(do_t_out, &triggers, &observers)?;
                    for &v in &triggers {
                        debug_assert!(self.model.var(v).t_d == self.t);
                        self.model.advance_discrete_0_1(&mut self.queue, v);
                    }
                    if order_max >= 2 {
                        for &v in &triggers[i_beg_2..] {
                            self.model.advance_discrete_2(&mut self.queue, v);
                        }
                        if order_max >= 3 {
                            for &v in &triggers[i_beg_3..] {
                                self.model.advance_discrete_3(&mut self.queue, v);
                            }
                        }
                    }
                    for &w in &observers {
                        self.model.advance_observer(&mut self.queue, w, self.t);
                    }
                    self.event_outputs(do_t_out, &triggers, &observers)?;
                }
            }
            EventKind::Qss => {
                self.counters.qss += 1;
                let do_r_out =
                    self.opts.output.r && (self.opts.output.x || self.opts.output.q);
                let mut triggers: Vec<VarId> = self
                    .queue
                    .top_events()
                    .iter()
                    .filter(|e| e.kind == EventKind::Qss || e.kind == EventKind::Zc)
                    .map(|e| e.var)
                    .collect();
                if triggers.len() == 1 {
                    let trigger = triggers[0];
                    debug_assert!(self.model.var(trigger).t_e == self.t);
                    self.model.advance_qss(&mut self.queue, trigger);
                    let observers = self.model.var(trigger).observers.clone();
                    self.event_outputs(do_r_out, &[trigger], &observers)?;
                } else {
                    self.counters.qss_simultaneous += 1;
                    self.sort_by_order(&mut triggers);
                    let mut triggers_zc = vec![];
                    let mut triggers_non_zc = vec![];
                    for &v in &triggers {
                        if self.model.var(v).is_zc() {
                            triggers_zc.push(v);
                        } else {
                            triggers_non_zc.push(v);
                        }
                        self.model.var_mut(v).s_t = s;
                    }
                    let i_beg_2 = self.i_beg_order(&triggers_non_zc, 2);
                    let i_beg_3 = self.i_beg_order(&triggers_non_zc, 3);
                    let observers = self.collect_observers(&triggers_non_zc);
                    let order_max = triggers_non_zc
                        .last()
                        .map(|&v| self.model.var(v).order)
                        .unwrap_or(0)
                        .max(
                            observers
                                .last()
                                .map(|&w| self.model.var(w).order)
                                .unwrap_or(0),
                        );
                    for &v in &triggers_non_zc {
                        debug_assert!(self.model.var(v).t_e == self.t);
                        self.model.advance_qss_0(v);
                    }
                    for &v in &triggers_non_zc {
                        self.model.advance_qss_1(&mut self.queue, v);
                    }
                    if order_max >= 2 {
                        for &v in &triggers_non_zc[i_beg_2..] {
                            self.model.advance_qss_2(&mut self.queue, v);
                        }
                        if order_max >= 3 {
                            for &v in &triggers_non_zc[i_beg_3..] {
                                self.model.advance_qss_3(&mut self.queue, v);
                            }
                        }
                    }
                    for &v in &triggers_zc {
                        debug_assert!(self.model.var(v).t_e == self.t);
                        self.model.advance_qss_simultaneous(&mut self.queue, v);
                    }
                    for &w in &observers {
                        self.model.advance_observer(&mut self.queue, w, self.t);
                    }
                    self.event_outputs(do_r_out, &triggers, &observers)?;
                }
            }
            EventKind::Zc => {
                self.counters.zc += 1;
                while self.queue.top_superdense_time() == s
                    && self.queue.top().map(|e| e.kind) == Some(EventKind::Zc)
                {
                    let trigger = self
                        .queue
                        .top_var()
                        .expect("zero-crossing wave drained unexpectedly");
                    debug_assert!(self.model.var(trigger).t_zc() == self.t);
                    self.model.advance_zc(&mut self.queue, trigger);
                }
            }
            EventKind::Handler => {
                let do_r_out =
                    self.opts.output.r && (self.opts.output.x || self.opts.output.q);
                let tops: Vec<crate::events::Event> = self
                    .queue
                    .top_events()
                    .into_iter()
                    .filter(|e| e.kind == EventKind::Handler)
                    .collect();
                if tops.len() == 1 {
                    let trigger = tops[0].var;
                    let observers = self.model.var(trigger).observers.clone();
                    self.event_outputs(do_r_out, &[trigger], &observers)?;
                    self.model
                        .advance_handler(&mut self.queue, trigger, self.t, tops[0].val);
                    self.event_outputs(do_r_out, &[trigger], &observers)?;
                } else {
                    let mut handlers: Vec<VarId> = tops.iter().map(|e| e.var).collect();
                    self.sort_by_order(&mut handlers);
                    let i_beg_1 = self.i_beg_order(&handlers, 1);
                    let i_beg_2 = self.i_beg_order(&handlers, 2);
                    let i_beg_3 = self.i_beg_order(&handlers, 3);
                    let order_max = handlers
                        .last()
                        .map(|&v| self.model.var(v).order)
                        .unwrap_or(0);
                    let observers = self.collect_observers(&handlers);
                    self.event_outputs(do_r_out, &handlers, &observers)?;
                    for e in &tops {
                        self.model
                            .advance_handler_0(&mut self.queue, e.var, self.t, e.val);
                    }
                    for &v in &handlers[i_beg_1..] {
                        self.model.advance_handler_1(&mut self.queue, v);
                    }
                    if order_max >= 2 {
                        for &v in &handlers[i_beg_2..] {
                            self.model.advance_handler_2(&mut self.queue, v);
                        }
                        if order_max >= 3 {
                            for &v in &handlers[i_beg_3..] {
                                self.model.advance_handler_3(&mut self.queue, v);
                            }
                        }
                    }
                    for &w in &observers {
                        self.model.advance_observer(&mut self.queue, w, self.t);
                    }
                    self.event_outputs(do_r_out, &handlers, &observers)?;
                }
            }
        }
        Ok(true)
    }
}
