use crate::geometry::Range;
use crate::model::TrackEvent;

/// Anything that can be windowed on the tick axis.
pub trait TimedEvent {
    fn tick(&self) -> f64;
    fn duration(&self) -> Option<f64> {
        None
    }
}

impl TimedEvent for TrackEvent {
    fn tick(&self) -> f64 {
        self.tick
    }

    fn duration(&self) -> Option<f64> {
        TrackEvent::duration(self)
    }
}

pub type SubscriptionId = usize;

/// A windowed cache over a track's events: holds a `[start, end)` tick
/// range and a source accessor, and republishes the filtered subset whenever
/// the range or the source changes.
///
/// Subscribers are notified only when the computed windowed list actually
/// changes, so off-screen churn does not trigger redundant redraws.
pub struct EventView<T: TimedEvent + Clone + PartialEq> {
    start_tick: f64,
    end_tick: f64,
    load_events: Box<dyn Fn() -> Vec<T>>,
    windowed: Vec<T>,
    subscribers: Vec<(SubscriptionId, Box<dyn FnMut(&[T])>)>,
    next_subscription_id: SubscriptionId,
}

impl<T: TimedEvent + Clone + PartialEq> EventView<T> {
    pub fn new(load_events: impl Fn() -> Vec<T> + 'static) -> Self {
        let mut view = Self {
            start_tick: 0.0,
            end_tick: 0.0,
            load_events: Box::new(load_events),
            windowed: Vec::new(),
            subscribers: Vec::new(),
            next_subscription_id: 0,
        };
        view.windowed = view.compute();
        view
    }

    pub fn range(&self) -> (f64, f64) {
        (self.start_tick, self.end_tick)
    }

    pub fn windowed_events(&self) -> &[T] {
        &self.windowed
    }

    pub fn set_range(&mut self, start_tick: f64, end_tick: f64) {
        if self.start_tick == start_tick && self.end_tick == end_tick {
            return;
        }
        self.start_tick = start_tick;
        self.end_tick = end_tick;
        self.republish();
    }

    /// Source-change notification entry point, driven by the event store's
    /// revision counter.
    pub fn refresh(&mut self) {
        self.republish();
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&[T]) + 'static) -> SubscriptionId {
        let id = self.next_subscription_id;
        self.next_subscription_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    fn compute(&self) -> Vec<T> {
        let range = Range {
            min: self.start_tick,
            max: self.end_tick,
        };
        (self.load_events)()
            .into_iter()
            .filter(|e| match e.duration() {
                Some(duration) => range.intersects(&Range {
                    min: e.tick(),
                    max: e.tick() + duration,
                }),
                None => range.contains(e.tick()),
            })
            .collect()
    }

    fn republish(&mut self) {
        let windowed = self.compute();
        if windowed == self.windowed {
            return;
        }
        self.windowed = windowed;
        for (_, callback) in &mut self.subscribers {
            callback(&self.windowed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventBody, NoteEvent, Track};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn note_body(note_number: i32, duration: f64) -> EventBody {
        EventBody::Note(NoteEvent {
            duration,
            note_number,
            velocity: 100,
        })
    }

    fn shared_track() -> Rc<RefCell<Track>> {
        let mut track = Track::new(1, "MIDI 1", Some(0));
        track.add_event(0.0, note_body(60, 100.0));
        track.add_event(500.0, note_body(62, 100.0));
        track.add_event(1000.0, note_body(64, 100.0));
        Rc::new(RefCell::new(track))
    }

    fn view_over(track: &Rc<RefCell<Track>>) -> EventView<TrackEvent> {
        let source = Rc::clone(track);
        EventView::new(move || source.borrow().events().to_vec())
    }

    #[test]
    fn windows_by_half_open_overlap() {
        let track = shared_track();
        let mut view = view_over(&track);
        view.set_range(450.0, 700.0);
        let ticks: Vec<f64> = view.windowed_events().iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![500.0]);

        // a note ending exactly at the window start stays out
        view.set_range(100.0, 200.0);
        assert!(view.windowed_events().is_empty());
        view.set_range(99.0, 200.0);
        assert_eq!(view.windowed_events().len(), 1);
    }

    #[test]
    fn matches_brute_force_filter() {
        let track = shared_track();
        {
            let mut t = track.borrow_mut();
            for i in 0..40 {
                t.add_event((i * 37) as f64, note_body(60, (i % 7) as f64 * 10.0));
            }
        }
        let mut view = view_over(&track);
        for &(start, end) in &[(0.0, 1.0), (35.0, 36.0), (100.0, 370.0), (1110.0, 1500.0)] {
            view.set_range(start, end);
            let range = Range::new(start, end);
            let expected: Vec<TrackEvent> = track
                .borrow()
                .events()
                .iter()
                .filter(|e| {
                    crate::model::event::is_event_overlap_range(e, &range)
                })
                .copied()
                .collect();
            assert_eq!(view.windowed_events(), expected.as_slice(), "range {start}..{end}");
        }
    }

    #[test]
    fn notifies_only_on_computed_change() {
        let track = shared_track();
        let mut view = view_over(&track);
        let notifications = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&notifications);
        view.subscribe(move |_| {
            *counter.borrow_mut() += 1;
        });

        view.set_range(0.0, 200.0);
        assert_eq!(*notifications.borrow(), 1);

        // same range again: no recompute, no notification
        view.set_range(0.0, 200.0);
        assert_eq!(*notifications.borrow(), 1);

        // an off-screen mutation refreshes without notifying
        track.borrow_mut().add_event(5000.0, note_body(70, 10.0));
        view.refresh();
        assert_eq!(*notifications.borrow(), 1);

        // an in-window mutation notifies
        track.borrow_mut().add_event(50.0, note_body(70, 10.0));
        view.refresh();
        assert_eq!(*notifications.borrow(), 2);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let track = shared_track();
        let mut view = view_over(&track);
        let notifications = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&notifications);
        let id = view.subscribe(move |_| {
            *counter.borrow_mut() += 1;
        });
        view.unsubscribe(id);
        view.set_range(0.0, 2000.0);
        assert_eq!(*notifications.borrow(), 0);
    }
}
