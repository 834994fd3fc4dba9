use std::collections::VecDeque;

/// Concatenates iterators, visiting each once and in order.
///
/// Sub-iterators are only ever advanced: one that has started is never
/// restarted, and appending a new one (even mid-iteration) does not touch
/// the ones already queued. An exhausted sub-iterator is dropped
/// immediately.
///
/// ```rust
/// use vfind::AppendIterator;
///
/// let mut it = AppendIterator::new();
/// it.append(vec![1, 2]);
/// assert_eq!(it.next(), Some(1));
/// it.append(vec![3]);
/// assert_eq!(it.collect::<Vec<_>>(), vec![2, 3]);
/// ```
pub struct AppendIterator<T> {
    queue: VecDeque<Box<dyn Iterator<Item = T>>>,
}

impl<T> Default for AppendIterator<T> {
    fn default() -> Self {
        Self { queue: VecDeque::new() }
    }
}

impl<T> AppendIterator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue another sequence behind everything already queued.
    pub fn append<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        self.queue.push_back(Box::new(iter.into_iter()));
    }

    /// Number of sub-iterators not yet exhausted.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl<T> Iterator for AppendIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let front = self.queue.front_mut()?;
            match front.next() {
                Some(item) => return Some(item),
                None => {
                    self.queue.pop_front();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Yields `0..n`, counting how often it is polled.
    fn counted(n: u32, polls: Rc<Cell<u32>>) -> impl Iterator<Item = u32> {
        let mut i = 0;
        std::iter::from_fn(move || {
            polls.set(polls.get() + 1);
            (i < n).then(|| {
                i += 1;
                i - 1
            })
        })
    }

    #[test]
    fn appending_mid_iteration_does_not_restart_consumed_iterators() {
        let first_polls = Rc::new(Cell::new(0));
        let mut it = AppendIterator::new();
        it.append(counted(3, Rc::clone(&first_polls)));

        assert_eq!(it.next(), Some(0));
        assert_eq!(it.next(), Some(1));
        assert_eq!(first_polls.get(), 2);

        let second_polls = Rc::new(Cell::new(0));
        it.append(counted(2, Rc::clone(&second_polls)));
        assert_eq!(first_polls.get(), 2, "appending polls nothing");
        assert_eq!(second_polls.get(), 0);

        assert_eq!(it.by_ref().collect::<Vec<_>>(), vec![2, 0, 1]);
        // three values plus one exhausted poll each
        assert_eq!(first_polls.get(), 4);
        assert_eq!(second_polls.get(), 3);
        assert_eq!(it.pending(), 0);
    }

    #[test]
    fn exhausted_then_appended_resumes() {
        let mut it = AppendIterator::new();
        it.append(vec!["a"]);
        assert_eq!(it.next(), Some("a"));
        assert_eq!(it.next(), None);
        it.append(vec!["b"]);
        assert_eq!(it.next(), Some("b"));
    }
}
