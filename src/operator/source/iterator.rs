use crate::error::Error;
use crate::operator::source::Source;

/// Source that emits the items of an iterator.
///
/// The iterator cannot be split, so a single map task will consume it.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct IteratorSource<It> {
    #[derivative(Debug = "ignore")]
    inner: It,
}

impl<It> IteratorSource<It> {
    pub fn new(inner: It) -> Self {
        Self { inner }
    }
}

impl<Out, It> Source<Out> for IteratorSource<It>
where
    It: Iterator<Item = Out> + Send,
{
    type Partition = std::iter::Map<It, fn(Out) -> Result<Out, Error>>;

    fn partitions(self, _parallelism: usize) -> Result<Vec<Self::Partition>, Error> {
        Ok(vec![self.inner.map(Ok as fn(Out) -> Result<Out, Error>)])
    }
}
