use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::{Batch, DataSource, Sample};

/// Mini-batches over a fixed sample set.
///
/// With shuffling enabled the sample order is redrawn every epoch from
/// `seed + epoch`, so two sources built with the same seed yield the same
/// batches.
#[derive(Debug, Clone)]
pub struct InMemoryDataSource {
    samples: Vec<Sample>,
    batch_size: usize,
    shuffle_seed: Option<u64>,
    epoch: u64,
}

impl InMemoryDataSource {
    pub fn new(samples: Vec<Sample>, batch_size: usize) -> Self {
        InMemoryDataSource {
            samples,
            batch_size: batch_size.max(1),
            shuffle_seed: None,
            epoch: 0,
        }
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn epoch_order(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        if let Some(seed) = self.shuffle_seed {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(self.epoch));
            order.shuffle(&mut rng);
        }
        self.epoch += 1;
        order
    }
}

impl DataSource for InMemoryDataSource {
    type Batch = Batch;

    fn num_batches(&self) -> Option<usize> {
        Some(self.samples.len().div_ceil(self.batch_size))
    }

    fn batches(&mut self) -> Box<dyn Iterator<Item = Batch> + '_> {
        let order = self.epoch_order();
        let batch_size = self.batch_size;
        let samples = &self.samples;
        Box::new((0..order.len()).step_by(batch_size).map(move |start| {
            let end = (start + batch_size).min(order.len());
            order[start..end].iter().map(|&i| &samples[i]).collect()
        }))
    }
}

/// A source backed by a closure that opens a fresh iterator each epoch.
///
/// Its length is unknown, which is how streaming loaders present themselves.
pub struct FnSource<F> {
    open: F,
}

impl<F> FnSource<F> {
    pub fn new(open: F) -> Self {
        FnSource { open }
    }
}

impl<F, I> DataSource for FnSource<F>
where
    F: FnMut() -> I,
    I: Iterator + 'static,
{
    type Batch = I::Item;

    fn num_batches(&self) -> Option<usize> {
        None
    }

    fn batches(&mut self) -> Box<dyn Iterator<Item = I::Item> + '_> {
        Box::new((self.open)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<Sample> {
        (0..n).map(|i| Sample::new(vec![i as f64], vec![i as f64])).collect()
    }

    fn first_inputs(source: &mut InMemoryDataSource) -> Vec<f64> {
        source.batches().flat_map(|b| b.inputs).map(|x| x[0]).collect()
    }

    #[test]
    fn last_batch_holds_the_remainder() {
        let mut source = InMemoryDataSource::new(numbered(5), 2);
        assert_eq!(source.num_batches(), Some(3));
        let sizes: Vec<usize> = source.batches().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn unshuffled_order_is_stable() {
        let mut source = InMemoryDataSource::new(numbered(4), 3);
        assert_eq!(first_inputs(&mut source), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(first_inputs(&mut source), vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn shuffle_is_seeded_and_keeps_every_sample() {
        let mut a = InMemoryDataSource::new(numbered(16), 4).with_shuffle(7);
        let mut b = InMemoryDataSource::new(numbered(16), 4).with_shuffle(7);
        let first = first_inputs(&mut a);
        assert_eq!(first, first_inputs(&mut b));

        let mut sorted = first.clone();
        sorted.sort_by(|x, y| x.total_cmp(y));
        assert_eq!(sorted, (0..16).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn fn_source_has_unknown_length() {
        let mut source = FnSource::new(|| vec![1u32, 2, 3].into_iter());
        assert_eq!(source.num_batches(), None);
        assert_eq!(source.batches().count(), 3);
        assert_eq!(source.batches().count(), 3);
    }
}
