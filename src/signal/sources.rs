use super::Signal;

#[derive(Debug, Clone)]
pub struct FromIter<I> {
    iter: I,
    rate: f64,
}

impl<I> FromIter<I> {
    pub fn new(rate: f64, iter: I) -> Self {
        FromIter {
            iter,
            rate,
        }
    }
}

impl<I> Signal for FromIter<I> where I: Iterator {
    type Sample = I::Item;
    fn next(&mut self) -> Option<Self::Sample> {
        self.iter.next()
    }
    fn rate(&self) -> f64 {
        self.rate
    }
}

pub fn from_iter<I>(rate: f64, iter: I) -> FromIter<I::IntoIter>
where
    I: IntoIterator,
{
    FromIter::new(rate, iter.into_iter())
}
