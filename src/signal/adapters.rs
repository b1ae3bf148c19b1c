use super::Signal;

#[derive(Debug, Clone)]
pub struct Iter<S> {
    signal: S,
}

impl<S> Iter<S> where S: Signal {
    pub(super) fn new(signal: S) -> Self {
        Iter { signal }
    }
}

impl<S> Iterator for Iter<S> where S: Signal {
    type Item = S::Sample;
    fn next(&mut self) -> Option<Self::Item> {
        self.signal.next()
    }
}

// the first `remaining` samples of a signal
#[derive(Clone, Debug)]
pub struct Take<S> {
    signal: S,
    remaining: usize,
}

impl<S> Take<S> where S: Signal {
    pub(super) fn new(signal: S, count: usize) -> Self {
        Take {
            signal,
            remaining: count,
        }
    }
}

impl<S> Signal for Take<S> where S: Signal {
    type Sample = S::Sample;
    fn next(&mut self) -> Option<Self::Sample> {
        if self.remaining > 0 {
            self.remaining -= 1;
            self.signal.next()
        } else {
            None
        }
    }
    fn rate(&self) -> f64 {
        self.signal.rate()
    }
}
