//! Uniform lazy-sequence interface (spec §9): `map`/`concat`/`filter`
//! compose without forcing the underlying source, and `with_baggage`
//! attaches a resource-release callback that always runs on `close`
//! (normal exhaustion or early abandonment), regardless of how many
//! transforms were layered on top. This replaces the
//! sequence-accumulator subclass hierarchy the design notes call out —
//! every transform here returns the same `Sequence<T>` type.

pub struct Sequence<T> {
    iter: Box<dyn Iterator<Item = T> + Send>,
    baggage: Vec<Box<dyn FnOnce() + Send>>,
}

impl<T: Send + 'static> Sequence<T> {
    pub fn empty() -> Self {
        Self { iter: Box::new(std::iter::empty()), baggage: Vec::new() }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self { iter: Box::new(items.into_iter()), baggage: Vec::new() }
    }

    pub fn from_iter(iter: impl Iterator<Item = T> + Send + 'static) -> Self {
        Self { iter: Box::new(iter), baggage: Vec::new() }
    }

    pub fn map<U: Send + 'static>(self, f: impl Fn(T) -> U + Send + 'static) -> Sequence<U> {
        Sequence { iter: Box::new(self.iter.map(f)), baggage: self.baggage }
    }

    pub fn filter(self, f: impl Fn(&T) -> bool + Send + 'static) -> Sequence<T> {
        Sequence { iter: Box::new(self.iter.filter(f)), baggage: self.baggage }
    }

    /// Append a resource-release callback. Order of release on `close` is
    /// LIFO-independent — every attached callback runs exactly once,
    /// regardless of whether the sequence was fully drained.
    pub fn with_baggage(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.baggage.push(Box::new(f));
        self
    }

    /// Flatten several sequences into one, concatenated in order. Baggage
    /// from every input sequence survives the merge and is released when
    /// the combined sequence is closed.
    pub fn concat(sequences: Vec<Sequence<T>>) -> Sequence<T> {
        let mut baggage = Vec::new();
        let mut iters: Vec<Box<dyn Iterator<Item = T> + Send>> = Vec::with_capacity(sequences.len());
        for s in sequences {
            iters.push(s.iter);
            baggage.extend(s.baggage);
        }
        let chained = iters.into_iter().flatten();
        Sequence { iter: Box::new(chained), baggage }
    }

    /// Drain the sequence into a `Vec`, then run every attached baggage
    /// callback. Equivalent to Druid's `Sequences.toList` followed by
    /// `sequence.close()`.
    pub fn to_vec(self) -> Vec<T> {
        let items: Vec<T> = self.iter.collect();
        for b in self.baggage {
            b();
        }
        items
    }

    /// Release every attached resource without necessarily having drained
    /// the sequence — the cooperative-cancellation exit path (spec §5).
    pub fn close(self) {
        for b in self.baggage {
            b();
        }
    }
}

impl<T: Send + 'static> Iterator for Sequence<T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        self.iter.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn map_and_filter_compose_lazily() {
        let seq = Sequence::from_vec(vec![1, 2, 3, 4]).map(|x| x * 2).filter(|x| *x > 4);
        assert_eq!(seq.to_vec(), vec![6, 8]);
    }

    #[test]
    fn baggage_runs_exactly_once_on_close() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let seq = Sequence::from_vec(vec![1, 2, 3]).with_baggage(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        seq.close();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concat_preserves_order_and_all_baggage() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c1 = counter.clone();
        let c2 = counter.clone();
        let a = Sequence::from_vec(vec![1, 2]).with_baggage(move || {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let b = Sequence::from_vec(vec![3, 4]).with_baggage(move || {
            c2.fetch_add(1, Ordering::SeqCst);
        });
        let combined = Sequence::concat(vec![a, b]);
        assert_eq!(combined.to_vec(), vec![1, 2, 3, 4]);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn close_without_draining_still_releases() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let seq = Sequence::from_vec(vec![1, 2, 3]).with_baggage(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        seq.close();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
