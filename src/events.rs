//! Event queue.
//!
//! A priority queue of pending events keyed by superdense time, with a
//! per-variable handle table so a variable's single queue entry can be
//! rescheduled in place in O(log n). Every activated variable owns exactly
//! one entry; shifting it can also rebind its kind (a zero-crossing
//! variable's entry alternates between `Qss` and `Zc` depending on which
//! of `tE`/`tZ` comes first).
//!
//! Scheduling at the real time currently being serviced lands the event
//! one wave later (superdense index + 1); scheduling at any other real
//! time starts a fresh wave at index 0. This is what orders the
//! QSS → ZC → handler → requantization cascades a discontinuity produces
//! within a single instant.

use crate::time::{SuperdenseTime, Time, Value};
use crate::variable::VarId;
use std::collections::BTreeMap;

/// The kind of a pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Discrete event (input variable discontinuity).
    Discrete,
    /// QSS requantization event.
    Qss,
    /// Zero-crossing event.
    Zc,
    /// Zero-crossing handler event, carrying a value payload.
    Handler,
}

/// A pending event: kind, target variable and, for handler events, the
/// value payload carried from the zero-crossing site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub var: VarId,
    pub val: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    sdt: SuperdenseTime,
    var: VarId,
}

/// The event queue.
#[derive(Debug)]
pub struct EventQueue {
    queue: BTreeMap<EventKey, Event>,
    scheduled: Vec<Option<SuperdenseTime>>,
    active: SuperdenseTime,
}

impl EventQueue {
    /// Constructs an empty queue.
    pub fn new() -> EventQueue {
        EventQueue {
            queue: BTreeMap::new(),
            scheduled: vec![],
            active: SuperdenseTime::ZERO,
        }
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Removes all events and handles.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.scheduled.clear();
        self.active = SuperdenseTime::ZERO;
    }

    /// Snapshots the superdense time about to be serviced, for the LIQSS
    /// simultaneous-view selection.
    pub fn set_active_time(&mut self) {
        self.active = self.top_superdense_time();
    }

    /// The snapshot taken by [`set_active_time`].
    ///
    /// [`set_active_time`]: #method.set_active_time
    pub fn active_superdense_time(&self) -> SuperdenseTime {
        self.active
    }

    /// The superdense time a new event lands at when scheduled for real
    /// time `t`.
    fn wave(&self, t: Time) -> SuperdenseTime {
        if t == self.active.t {
            self.active.next_wave()
        } else {
            SuperdenseTime::new(t, 0)
        }
    }

    /// The superdense time of the minimum event; infinity when empty.
    pub fn top_superdense_time(&self) -> SuperdenseTime {
        self.queue
            .keys()
            .next()
            .map(|k| k.sdt)
            .unwrap_or_else(SuperdenseTime::infinity)
    }

    /// The real time of the minimum event; infinity when empty.
    pub fn top_time(&self) -> Time {
        self.top_superdense_time().t
    }

    /// The minimum event.
    pub fn top(&self) -> Option<&Event> {
        self.queue.values().next()
    }

    /// The target variable of the minimum event.
    pub fn top_var(&self) -> Option<VarId> {
        self.top().map(|e| e.var)
    }

    /// Whether exactly one event is pending at the minimum superdense
    /// time.
    pub fn single(&self) -> bool {
        let mut keys = self.queue.keys();
        match (keys.next(), keys.next()) {
            (Some(a), Some(b)) => a.sdt != b.sdt,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// All variables with an event at the minimum superdense time
    /// (simultaneous triggers).
    pub fn top_vars(&self) -> Vec<VarId> {
        let top = self.top_superdense_time();
        self.queue
            .range(
                EventKey {
                    sdt: top,
                    var: VarId(0),
                }..,
            )
            .take_while(|(k, _)| k.sdt == top)
            .map(|(_, e)| e.var)
            .collect()
    }

    /// All events at the minimum superdense time (simultaneous handler
    /// events with their payloads).
    pub fn top_events(&self) -> Vec<Event> {
        let top = self.top_superdense_time();
        self.queue
            .range(
                EventKey {
                    sdt: top,
                    var: VarId(0),
                }..,
            )
            .take_while(|(k, _)| k.sdt == top)
            .map(|(_, e)| *e)
            .collect()
    }

    /// The superdense time a variable is currently scheduled at, if it
    /// has been activated.
    pub fn scheduled(&self, v: VarId) -> Option<SuperdenseTime> {
        self.scheduled.get(v.0).cloned().flatten()
    }

    fn insert(&mut self, sdt: SuperdenseTime, event: Event) {
        let v = event.var;
        if self.scheduled.len() <= v.0 {
            self.scheduled.resize(v.0 + 1, None);
        }
        debug_assert!(
            self.scheduled[v.0].is_none(),
            "variable #{} already has a queue entry",
            v.0
        );
        self.queue.insert(EventKey { sdt, var: v }, event);
        self.scheduled[v.0] = Some(sdt);
    }

    fn remove(&mut self, v: VarId) -> Event {
        let sdt = self
            .scheduled
            .get_mut(v.0)
            .and_then(Option::take)
            .expect("variable has no queue entry");
        self.queue
            .remove(&EventKey { sdt, var: v })
            .expect("queue entry out of sync with handle table")
    }

    /// Adds a QSS requantization event at time `t`.
    pub fn add_qss(&mut self, t: Time, v: VarId) {
        let sdt = self.wave(t);
        self.insert(
            sdt,
            Event {
                kind: EventKind::Qss,
                var: v,
                val: 0.0,
            },
        );
    }

    /// Adds a zero-crossing event at time `t`.
    pub fn add_zc(&mut self, t: Time, v: VarId) {
        let sdt = self.wave(t);
        self.insert(
            sdt,
            Event {
                kind: EventKind::Zc,
                var: v,
                val: 0.0,
            },
        );
    }

    /// Adds a discrete event at time `t`.
    pub fn add_discrete(&mut self, t: Time, v: VarId) {
        let sdt = self.wave(t);
        self.insert(
            sdt,
            Event {
                kind: EventKind::Discrete,
                var: v,
                val: 0.0,
            },
        );
    }

    /// Adds an idle handler event at infinity.
    pub fn add_handler(&mut self, v: VarId) {
        self.insert(
            SuperdenseTime::infinity(),
            Event {
                kind: EventKind::Handler,
                var: v,
                val: 0.0,
            },
        );
    }

    /// Reschedules a variable's entry as a QSS event at time `t`.
    pub fn shift_qss(&mut self, t: Time, v: VarId) {
        self.remove(v);
        self.add_qss(t, v);
    }

    /// Reschedules a variable's entry as a zero-crossing event at time
    /// `t`.
    pub fn shift_zc(&mut self, t: Time, v: VarId) {
        self.remove(v);
        self.add_zc(t, v);
    }

    /// Reschedules a variable's entry as a discrete event at time `t`.
    pub fn shift_discrete(&mut self, t: Time, v: VarId) {
        self.remove(v);
        self.add_discrete(t, v);
    }

    /// Reschedules a variable's entry as a handler event at time `t`
    /// carrying the given value payload.
    pub fn shift_handler(&mut self, t: Time, val: Value, v: VarId) {
        self.remove(v);
        let sdt = self.wave(t);
        self.insert(
            sdt,
            Event {
                kind: EventKind::Handler,
                var: v,
                val,
            },
        );
    }

    /// Parks a variable's handler entry back at infinity.
    pub fn shift_handler_inf(&mut self, v: VarId) {
        self.remove(v);
        self.add_handler(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::INFINITY;

    #[test]
    fn add_and_top() {
        let mut q = EventQueue::new();
        assert!(q.is_empty());
        assert_eq!(q.top_time(), INFINITY);
        q.add_qss(2.0, VarId(0));
        q.add_qss(1.0, VarId(1));
        q.add_zc(3.0, VarId(2));
        assert_eq!(q.len(), 3);
        assert_eq!(q.top_time(), 1.0);
        assert_eq!(q.top_var(), Some(VarId(1)));
        assert!(q.single());
    }

    #[test]
    fn shift_in_place() {
        let mut q = EventQueue::new();
        q.add_qss(2.0, VarId(0));
        q.add_qss(1.0, VarId(1));
        q.shift_qss(0.5, VarId(0));
        assert_eq!(q.top_var(), Some(VarId(0)));
        assert_eq!(q.len(), 2);
        // Rebind kind on shift: ZC variable hopping between tE and tZ.
        q.shift_zc(0.25, VarId(0));
        assert_eq!(q.top().unwrap().kind, EventKind::Zc);
        assert_eq!(q.scheduled(VarId(0)), Some(SuperdenseTime::new(0.25, 0)));
    }

    #[test]
    fn simultaneous_triggers() {
        let mut q = EventQueue::new();
        q.add_qss(1.0, VarId(3));
        q.add_qss(1.0, VarId(1));
        q.add_qss(2.0, VarId(2));
        assert!(!q.single());
        assert_eq!(q.top_vars(), vec![VarId(1), VarId(3)]);
    }

    #[test]
    fn wave_indexing() {
        let mut q = EventQueue::new();
        q.add_qss(1.0, VarId(0));
        q.set_active_time();
        assert_eq!(q.active_superdense_time(), SuperdenseTime::new(1.0, 0));
        // Scheduling at the active instant lands one wave later.
        q.add_zc(1.0, VarId(1));
        assert_eq!(q.scheduled(VarId(1)), Some(SuperdenseTime::new(1.0, 1)));
        // A later real time resets the wave index.
        q.add_qss(4.0, VarId(2));
        assert_eq!(q.scheduled(VarId(2)), Some(SuperdenseTime::new(4.0, 0)));
        // Service the first wave, then the second is on top.
        q.shift_qss(4.0, VarId(0));
        q.set_active_time();
        assert_eq!(q.active_superdense_time(), SuperdenseTime::new(1.0, 1));
        assert_eq!(q.top_var(), Some(VarId(1)));
    }

    #[test]
    fn handler_payloads() {
        let mut q = EventQueue::new();
        q.add_handler(VarId(0));
        q.add_handler(VarId(1));
        assert_eq!(q.top_time(), INFINITY);
        q.shift_handler(2.0, -0.7, VarId(0));
        q.shift_handler(2.0, 0.0, VarId(1));
        let events = q.top_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Handler);
        assert_eq!(events[0].val, -0.7);
        assert_eq!(events[1].val, 0.0);
        q.shift_handler_inf(VarId(0));
        q.shift_handler_inf(VarId(1));
        assert_eq!(q.top_time(), INFINITY);
    }
}
