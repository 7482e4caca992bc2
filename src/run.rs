use std::sync::{atomic::AtomicBool, Arc};

use tracing::info;

use crate::config::{DataSourceConfig, RunConfig};
use crate::data::{load_csv, split_validation, DataSource, InMemoryDataSource, Sample};
use crate::distributed::LocalContext;
use crate::error::Result;
use crate::metrics::{JsonlSink, TracingSink};
use crate::optim::{LambdaLr, LrScheduler, Optimizer, Sgd};
use crate::train::{Trainer, TrainingSummary};

/// Validates `config`, wires the reference collaborators together and
/// trains on a single-process context.
pub fn run_from_config(config: &RunConfig, stop_flag: Option<Arc<AtomicBool>>) -> Result<TrainingSummary> {
    config.validate()?;
    let seed = config.trainer.seed;

    let samples = load_samples(&config.data.source)?;
    let (train_samples, validation_samples) = split_validation(samples, config.data.val_split_pct);
    info!(
        train = train_samples.len(),
        validation = validation_samples.len(),
        "dataset loaded"
    );

    let mut train_data = InMemoryDataSource::new(train_samples, config.data.batch_size);
    if config.data.shuffle {
        train_data = train_data.with_shuffle(seed);
    }
    let batches_per_epoch = train_data.num_batches().unwrap_or(0);

    let network = config.model.build(seed)?;

    let mut optimizer = Sgd::new(config.optimizer.learning_rate).with_momentum(config.optimizer.momentum);
    let accumulation = config.accelerator.gradient_accumulation_steps;
    let total_steps = batches_per_epoch.div_ceil(accumulation) * config.trainer.epochs;
    let scheduler = config
        .scheduler
        .schedule(total_steps)
        .map(|schedule| Box::new(LambdaLr::new(schedule, &mut optimizer)) as Box<dyn LrScheduler>);

    let mut context = LocalContext::new(config.project_config()).with_gradient_accumulation(accumulation);
    if config.logging.stdout {
        context = context.with_sink(TracingSink);
    }
    if let Some(path) = &config.logging.jsonl {
        context = context.with_sink(JsonlSink::create(path, config.logging.flush_every)?);
    }

    let mut options = config.trainer_options();
    options.stop_flag = stop_flag;

    let optimizer: Box<dyn Optimizer> = Box::new(optimizer);
    let mut trainer = Trainer::new(network, Box::new(train_data), optimizer, context, options)?;
    if !validation_samples.is_empty() {
        trainer = trainer.with_validation(Box::new(InMemoryDataSource::new(
            validation_samples,
            config.data.batch_size,
        )));
    }
    if let Some(scheduler) = scheduler {
        trainer = trainer.with_scheduler(scheduler);
    }
    if let Some(metadata) = config.model.metadata.clone() {
        trainer = trainer.with_tokenizer(Box::new(metadata));
    }

    info!(model = %config.model.name, epochs = config.trainer.epochs, "starting training");
    trainer.train()
}

fn load_samples(source: &DataSourceConfig) -> Result<Vec<Sample>> {
    match source {
        DataSourceConfig::Builtin { name, samples } => Ok(name.samples(*samples)),
        DataSourceConfig::Csv { path, label } => load_csv(path, *label),
    }
}
