//! Turns raw press/release events into single and double taps.
//!
//! Every coordinate is classified on its own. A release arms a decision window of
//! [`DECISION_WINDOW`] for that coordinate; when the window closes, the number of releases seen
//! inside it decides the kind of tap. Whether a button is down is derived by toggling on every
//! raw event, which makes the classifier robust against lost or duplicated events: the state
//! corrects itself on the next transition.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};

use crate::grid::GridShared;
use crate::{Coordinate, Error, RawEvent, Tap, TapKind};

/// How long after the first release further releases still count towards the same tap.
pub const DECISION_WINDOW: Duration = Duration::from_millis(200);

/// Windows are only closed once the event stream has been quiet this long, so a backlog still
/// travelling through the intake is classified by its timestamps.
const BACKLOG_GRACE: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    deadline: Instant,
    hits: u32,
    last_hold: Duration,
}

#[derive(Debug, Default)]
struct PadState {
    depressed: bool,
    last_event: Option<Instant>,
    window: Option<Window>,
    /// Windows that a later event proved closed, waiting for the next `expire`
    closed: Vec<Window>,
}

impl Window {
    fn into_tap(self, coordinate: Coordinate, now: Instant) -> Option<Tap> {
        let kind = match self.hits {
            0 => return None,
            1 => TapKind::Single,
            2 => TapKind::Double,
            hits => {
                log::debug!("{} hits on {} in one window, reporting a double tap", hits, coordinate);
                TapKind::Double
            }
        };
        log::trace!("{} classified as {:?}", coordinate, kind);

        Some(Tap {
            coordinate,
            observed_time: self.opened,
            decision_time: now,
            kind,
            hold_duration: self.last_hold,
            hits: self.hits,
        })
    }
}

/// Per-coordinate tap classification state.
///
/// This type does no timing on its own. Feed it events with [`observe`](Self::observe), and call
/// [`expire`](Self::expire) once [`next_deadline`](Self::next_deadline) has passed.
///
/// ```rust
/// # use std::time::{Duration, Instant};
/// # use launchgrid::{Coordinate, RawEvent, TapClassifier, TapKind, DECISION_WINDOW};
/// let pad = Coordinate::new(1, 1).unwrap();
/// let start = Instant::now();
/// let mut classifier = TapClassifier::new();
///
/// classifier.observe(RawEvent::press(pad, start));
/// classifier.observe(RawEvent::release(pad, start + Duration::from_millis(40)));
///
/// let taps = classifier.expire(start + Duration::from_millis(40) + DECISION_WINDOW);
/// assert_eq!(taps.len(), 1);
/// assert_eq!(taps[0].kind, TapKind::Single);
/// ```
#[derive(Debug)]
pub struct TapClassifier {
    window: Duration,
    pads: HashMap<Coordinate, PadState>,
}

impl Default for TapClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TapClassifier {
    pub fn new() -> Self {
        Self::with_window(DECISION_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            pads: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether the classifier currently believes the button at `coordinate` is held down
    pub fn is_depressed(&self, coordinate: Coordinate) -> bool {
        self.pads
            .get(&coordinate)
            .map_or(false, |pad| pad.depressed)
    }

    /// Record a raw event. Returns the deadline of the decision window if this event armed one.
    pub fn observe(&mut self, event: RawEvent) -> Option<Instant> {
        let window = self.window;
        let pad = self.pads.entry(event.coordinate).or_default();

        pad.depressed = !pad.depressed;
        if pad.depressed != event.is_press() {
            log::trace!(
                "{} reported {:?} but toggled to depressed={}",
                event.coordinate,
                event.kind,
                pad.depressed
            );
        }

        let mut armed = None;
        if !pad.depressed {
            // the previous event on this coordinate is the press this release completes
            let hold = pad
                .last_event
                .map_or(Duration::ZERO, |last| event.time.saturating_duration_since(last));

            // a window whose deadline passed before this release is over, even if nobody
            // expired it yet
            if let Some(open) = pad.window.filter(|open| open.deadline < event.time) {
                pad.closed.push(open);
                pad.window = None;
            }

            match &mut pad.window {
                Some(open) => {
                    open.hits += 1;
                    open.last_hold = hold;
                }
                None => {
                    let deadline = event.time + window;
                    pad.window = Some(Window {
                        opened: event.time,
                        deadline,
                        hits: 1,
                        last_hold: hold,
                    });
                    armed = Some(deadline);
                }
            }
        }
        pad.last_event = Some(event.time);

        armed
    }

    /// The earliest deadline among all open decision windows
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pads
            .values()
            .flat_map(|pad| pad.closed.iter().chain(pad.window.iter()))
            .map(|window| window.deadline)
            .min()
    }

    /// Close every decision window whose deadline is at or before `now` and classify it.
    pub fn expire(&mut self, now: Instant) -> Vec<Tap> {
        let mut taps = Vec::new();
        for (&coordinate, pad) in self.pads.iter_mut() {
            for window in pad.closed.drain(..) {
                taps.extend(window.into_tap(coordinate, now));
            }
            let window = match pad.window {
                Some(window) if window.deadline <= now => window,
                _ => continue,
            };
            pad.window = None;
            taps.extend(window.into_tap(coordinate, now));
        }
        taps
    }
}

/// Forwards raw transport events to the classifier, dropping the ones for coordinates the grid
/// doesn't have.
pub(crate) fn intake_loop(
    shared: Arc<GridShared>,
    events: Receiver<RawEvent>,
    classifier: Sender<RawEvent>,
    stop: Receiver<()>,
) {
    log::debug!("tap intake started");
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(events) -> event => {
                let event = match event {
                    Ok(event) => event,
                    Err(_) => {
                        log::debug!("transport event stream ended");
                        break;
                    }
                };
                if !shared.contains(event.coordinate) {
                    shared.sink.report(Error::UnknownCoordinate {
                        index: event.coordinate.index(),
                    });
                    continue;
                }
                if classifier.send(event).is_err() {
                    break;
                }
            }
        }
    }
    log::debug!("tap intake stopped");
}

/// Runs the decision windows and publishes every classified tap.
pub(crate) fn decision_loop(shared: Arc<GridShared>, events: Receiver<RawEvent>, stop: Receiver<()>) {
    log::debug!("tap classifier started");
    let mut classifier = TapClassifier::new();
    let mut events = events;
    let mut settled_at = Instant::now();

    loop {
        let deadline = match classifier.next_deadline() {
            Some(deadline) => crossbeam_channel::at(deadline.max(settled_at)),
            None => crossbeam_channel::never(),
        };

        let mut disconnected = false;
        select! {
            recv(stop) -> _ => break,
            recv(events) -> event => match event {
                Ok(event) => {
                    classifier.observe(event);
                    for event in events.try_iter() {
                        classifier.observe(event);
                    }
                    settled_at = Instant::now() + BACKLOG_GRACE;
                }
                Err(_) => disconnected = true,
            },
            recv(deadline) -> _ => {}
        }
        if disconnected {
            // keep closing the open windows, but stop listening
            events = crossbeam_channel::never();
        }

        let now = Instant::now();
        if now < settled_at {
            continue;
        }
        for tap in classifier.expire(now) {
            shared.broadcast.publish(tap);
        }
    }
    log::debug!("tap classifier stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn coord(x: u8, y: u8) -> Coordinate {
        Coordinate::new(x, y).unwrap()
    }

    /// Press at `at`, release `hold` later
    fn tap(classifier: &mut TapClassifier, c: Coordinate, at: Instant, hold: Duration) {
        classifier.observe(RawEvent::press(c, at));
        classifier.observe(RawEvent::release(c, at + hold));
    }

    #[test]
    fn single_tap_after_quiet_window() {
        let t0 = Instant::now();
        let a = coord(1, 1);
        let mut classifier = TapClassifier::new();

        assert_eq!(classifier.observe(RawEvent::press(a, t0)), None);
        assert!(classifier.is_depressed(a));
        let deadline = classifier.observe(RawEvent::release(a, t0 + 30 * MS));
        assert_eq!(deadline, Some(t0 + 30 * MS + DECISION_WINDOW));

        // not yet
        assert!(classifier.expire(t0 + 100 * MS).is_empty());

        let taps = classifier.expire(t0 + 230 * MS);
        assert_eq!(taps.len(), 1);
        let tap = taps[0];
        assert_eq!(tap.coordinate, a);
        assert_eq!(tap.kind, TapKind::Single);
        assert_eq!(tap.hits, 1);
        assert_eq!(tap.hold_duration, 30 * MS);
        assert_eq!(tap.observed_time, t0 + 30 * MS);
        assert_eq!(tap.decision_time, t0 + 230 * MS);

        // the window is consumed
        assert!(classifier.expire(t0 + 1000 * MS).is_empty());
        assert_eq!(classifier.next_deadline(), None);
    }

    #[test]
    fn two_taps_in_window_are_one_double() {
        let t0 = Instant::now();
        let a = coord(4, 5);
        let mut classifier = TapClassifier::new();

        tap(&mut classifier, a, t0, 20 * MS);
        tap(&mut classifier, a, t0 + 80 * MS, 25 * MS);

        let taps = classifier.expire(t0 + 20 * MS + DECISION_WINDOW);
        assert_eq!(taps.len(), 1);
        assert_eq!(taps[0].kind, TapKind::Double);
        assert_eq!(taps[0].hits, 2);
        assert_eq!(taps[0].hold_duration, 25 * MS);
    }

    #[test]
    fn taps_in_separate_windows_are_two_singles() {
        let t0 = Instant::now();
        let a = coord(2, 2);
        let mut classifier = TapClassifier::new();

        tap(&mut classifier, a, t0, 10 * MS);
        let first = classifier.expire(t0 + 10 * MS + DECISION_WINDOW);
        tap(&mut classifier, a, t0 + 400 * MS, 10 * MS);
        let second = classifier.expire(t0 + 410 * MS + DECISION_WINDOW);

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].kind, TapKind::Single);
        assert_eq!(second[0].kind, TapKind::Single);
        assert!(first[0].decision_time < second[0].decision_time);
    }

    #[test]
    fn late_release_closes_the_stale_window_first() {
        let t0 = Instant::now();
        let a = coord(2, 6);
        let mut classifier = TapClassifier::new();

        // nobody expires in between, as when both taps sit in a backlog
        tap(&mut classifier, a, t0, 10 * MS);
        tap(&mut classifier, a, t0 + 400 * MS, 10 * MS);
        assert_eq!(classifier.next_deadline(), Some(t0 + 10 * MS + DECISION_WINDOW));

        let taps = classifier.expire(t0 + 410 * MS + DECISION_WINDOW);
        assert_eq!(taps.len(), 2);
        assert!(taps.iter().all(|tap| tap.kind == TapKind::Single && tap.hits == 1));
        let mut opened: Vec<_> = taps.iter().map(|tap| tap.observed_time).collect();
        opened.sort();
        assert_eq!(opened, vec![t0 + 10 * MS, t0 + 410 * MS]);
    }

    #[test]
    fn more_than_two_hits_still_emit_one_double() {
        let t0 = Instant::now();
        let a = coord(3, 3);
        let mut classifier = TapClassifier::new();

        for i in 0..4u32 {
            tap(&mut classifier, a, t0 + i * 40 * MS, 10 * MS);
        }

        let taps = classifier.expire(t0 + 10 * MS + DECISION_WINDOW);
        assert_eq!(taps.len(), 1);
        assert_eq!(taps[0].kind, TapKind::Double);
        assert_eq!(taps[0].hits, 4);
    }

    #[test]
    fn coordinates_do_not_interfere() {
        let t0 = Instant::now();
        let a = coord(1, 1);
        let b = coord(8, 8);
        let mut classifier = TapClassifier::new();

        tap(&mut classifier, a, t0, 10 * MS);
        tap(&mut classifier, b, t0 + 5 * MS, 10 * MS);
        tap(&mut classifier, a, t0 + 60 * MS, 10 * MS);

        // a's window closes first, b's is still open
        let taps = classifier.expire(t0 + 10 * MS + DECISION_WINDOW);
        assert_eq!(taps.len(), 1);
        assert_eq!(taps[0].coordinate, a);
        assert_eq!(taps[0].kind, TapKind::Double);
        assert_eq!(classifier.next_deadline(), Some(t0 + 15 * MS + DECISION_WINDOW));

        let taps = classifier.expire(t0 + 15 * MS + DECISION_WINDOW);
        assert_eq!(taps.len(), 1);
        assert_eq!(taps[0].coordinate, b);
        assert_eq!(taps[0].kind, TapKind::Single);
    }

    #[test]
    fn a_press_alone_never_taps() {
        let t0 = Instant::now();
        let a = coord(5, 5);
        let mut classifier = TapClassifier::new();

        classifier.observe(RawEvent::press(a, t0));
        assert_eq!(classifier.next_deadline(), None);
        assert!(classifier.expire(t0 + 10 * DECISION_WINDOW).is_empty());
    }

    #[test]
    fn duplicated_presses_self_correct() {
        let t0 = Instant::now();
        let a = coord(6, 1);
        let mut classifier = TapClassifier::new();

        // two presses in a row: the second one toggles the button "up" again and counts as a hit
        classifier.observe(RawEvent::press(a, t0));
        classifier.observe(RawEvent::press(a, t0 + 500 * MS));
        assert!(!classifier.is_depressed(a));

        let taps = classifier.expire(t0 + 500 * MS + DECISION_WINDOW);
        assert_eq!(taps.len(), 1);
        assert_eq!(taps[0].hold_duration, 500 * MS);

        // afterwards a regular press/release works as usual
        tap(&mut classifier, a, t0 + 1000 * MS, 10 * MS);
        let taps = classifier.expire(t0 + 1010 * MS + DECISION_WINDOW);
        assert_eq!(taps.len(), 1);
        assert_eq!(taps[0].kind, TapKind::Single);
    }

    #[test]
    fn out_of_order_timestamps_do_not_panic() {
        let t0 = Instant::now() + Duration::from_secs(1);
        let a = coord(7, 7);
        let mut classifier = TapClassifier::new();

        classifier.observe(RawEvent::press(a, t0));
        classifier.observe(RawEvent::release(a, t0 - 50 * MS));

        let taps = classifier.expire(t0 + DECISION_WINDOW);
        assert_eq!(taps.len(), 1);
        assert_eq!(taps[0].hold_duration, Duration::ZERO);
    }
}
