//! Tag presence tracking
//!
//! A pure state machine fed one poll result per cycle. It remembers only the
//! last seen UID, so a tag swapped within a single poll interval is reported
//! as a fresh arrival and a tag lifted then re-presented arrives again.

use tagbox_core::TagUid;

/// Edge classification of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// A tag appeared that was not there on the previous cycle.
    Arrived(TagUid),
    /// The same tag as last cycle is still in the field.
    StillPresent(TagUid),
    /// The previously present tag is gone.
    Departed,
    /// Nothing in the field, and nothing was there before.
    Absent,
}

/// Turns a stream of `Option<TagUid>` poll results into presence edges.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    last_uid: Option<TagUid>,
}

impl PresenceTracker {
    /// A tracker that has never seen a tag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the result of one poll and classify it.
    pub fn observe(&mut self, uid: Option<TagUid>) -> Presence {
        match (self.last_uid.take(), uid) {
            (None, None) => Presence::Absent,
            (None, Some(uid)) => {
                self.last_uid = Some(uid.clone());
                Presence::Arrived(uid)
            }
            (Some(_), None) => Presence::Departed,
            (Some(prev), Some(uid)) => {
                self.last_uid = Some(uid.clone());
                if prev == uid {
                    Presence::StillPresent(uid)
                } else {
                    Presence::Arrived(uid)
                }
            }
        }
    }

    /// UID seen on the most recent cycle, if a tag is present.
    pub fn current(&self) -> Option<&TagUid> {
        self.last_uid.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(byte: u8) -> TagUid {
        TagUid::from_bytes(&[byte, 0x22, 0x33, 0x44])
    }

    #[test]
    fn arrival_fires_once_then_heartbeats() {
        let mut tracker = PresenceTracker::new();
        assert_eq!(tracker.observe(Some(uid(1))), Presence::Arrived(uid(1)));
        assert_eq!(
            tracker.observe(Some(uid(1))),
            Presence::StillPresent(uid(1))
        );
        assert_eq!(
            tracker.observe(Some(uid(1))),
            Presence::StillPresent(uid(1))
        );
    }

    #[test]
    fn removal_then_return_arrives_again() {
        let mut tracker = PresenceTracker::new();
        tracker.observe(Some(uid(1)));
        assert_eq!(tracker.observe(None), Presence::Departed);
        assert_eq!(tracker.observe(None), Presence::Absent);
        assert_eq!(tracker.observe(Some(uid(1))), Presence::Arrived(uid(1)));
    }

    #[test]
    fn tag_swap_within_one_cycle_is_a_new_arrival() {
        let mut tracker = PresenceTracker::new();
        tracker.observe(Some(uid(1)));
        assert_eq!(tracker.observe(Some(uid(2))), Presence::Arrived(uid(2)));
    }

    #[test]
    fn empty_field_stays_absent() {
        let mut tracker = PresenceTracker::new();
        assert_eq!(tracker.observe(None), Presence::Absent);
        assert!(tracker.current().is_none());
    }
}
