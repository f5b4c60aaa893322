//! Inclusive clocktick ranges.

use serde::{Deserialize, Serialize};
use trigger_model::Clocktick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSpan {
    pub first: Clocktick,
    pub last: Clocktick,
}

impl TickSpan {
    pub fn new(first: Clocktick, last: Clocktick) -> Self {
        Self { first: first.min(last), last: first.max(last) }
    }

    pub fn single(clocktick: Clocktick) -> Self {
        Self { first: clocktick, last: clocktick }
    }

    /// Smallest span covering every tick, `None` when there is none.
    pub fn covering(ticks: impl IntoIterator<Item = Clocktick>) -> Option<Self> {
        ticks.into_iter().fold(None, |span: Option<TickSpan>, ct| {
            Some(match span {
                Some(span) => span.including(ct),
                None => TickSpan::single(ct),
            })
        })
    }

    pub fn including(self, clocktick: Clocktick) -> Self {
        Self { first: self.first.min(clocktick), last: self.last.max(clocktick) }
    }

    pub fn union(self, other: TickSpan) -> Self {
        self.including(other.first).including(other.last)
    }

    pub fn len(&self) -> usize {
        (self.last - self.first) as usize + 1
    }

    pub fn contains(&self, clocktick: Clocktick) -> bool {
        (self.first..=self.last).contains(&clocktick)
    }

    pub fn iter(&self) -> impl Iterator<Item = Clocktick> {
        self.first..=self.last
    }
}

/// Union of optional spans.
pub fn merge_spans(spans: impl IntoIterator<Item = Option<TickSpan>>) -> Option<TickSpan> {
    spans.into_iter().flatten().reduce(TickSpan::union)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covering_and_union() {
        assert_eq!(TickSpan::covering([]), None);
        let span = TickSpan::covering([7, 3, 5]).unwrap();
        assert_eq!(span, TickSpan::new(3, 7));
        assert_eq!(span.len(), 5);
        assert!(span.contains(3) && span.contains(7) && !span.contains(8));
        assert_eq!(span.union(TickSpan::single(10)), TickSpan::new(3, 10));
        assert_eq!(merge_spans([None, Some(TickSpan::single(2)), Some(TickSpan::new(9, 4))]), Some(TickSpan::new(2, 9)));
        assert_eq!(TickSpan::new(4, 2).iter().collect::<Vec<_>>(), vec![2, 3, 4]);
    }
}
