mod sources;
pub use sources::*;

mod adapters;
pub use adapters::*;

// a stream of samples at a fixed rate, in samples per second
pub trait Signal {
    type Sample;
    fn next(&mut self) -> Option<Self::Sample>;
    fn rate(&self) -> f64;

    fn iter(self) -> Iter<Self> where Self: Sized {
        Iter::new(self)
    }

    fn take_samples(self, count: usize) -> Take<Self>
    where
        Self: Sized,
    {
        Take::new(self, count)
    }

    fn collect_samples(self) -> Vec<Self::Sample> where Self: Sized {
        self.iter().collect()
    }
}
