use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointManager;
use crate::data::DataSource;
use crate::distributed::{AccumulationStep, ExecutionContext, ProcessRole};
use crate::error::Result;
use crate::metrics::Metrics;
use crate::model::{GradMode, Model, ModelMode, SavePretrained};
use crate::optim::{LrScheduler, Optimizer};
use crate::progress::DistributedProgressBar;
use crate::tracking::LossTracker;
use crate::train::epoch_stats::{EpochSummary, TrainingSummary};
use crate::train::evaluate::evaluate;
use crate::train::train_config::TrainerOptions;

/// Supervised fine-tuning loop.
///
/// Every epoch: train over `train_data` inside the context's accumulation
/// scope, log metrics, optionally validate, optionally checkpoint. Only the
/// local coordinator touches the checkpoint tree; every process then meets at
/// the context's barrier.
pub struct Trainer<M: Model, C: ExecutionContext> {
    model: M,
    train_data: Box<dyn DataSource<Batch = M::Batch>>,
    validation_data: Option<Box<dyn DataSource<Batch = M::Batch>>>,
    optimizer: Box<dyn Optimizer>,
    scheduler: Option<Box<dyn LrScheduler>>,
    tokenizer: Option<Box<dyn SavePretrained>>,
    context: C,
    options: TrainerOptions,
    checkpoint_role: ProcessRole,
    checkpoints: CheckpointManager,
    progress: DistributedProgressBar,
    train_loss_tracker: LossTracker,
    validation_loss_tracker: LossTracker,
    current_step: u64,
}

impl<M: Model, C: ExecutionContext> Trainer<M, C> {
    pub fn new(
        model: M,
        train_data: Box<dyn DataSource<Batch = M::Batch>>,
        optimizer: Box<dyn Optimizer>,
        context: C,
        options: TrainerOptions,
    ) -> Result<Self> {
        options.validate()?;
        let rank = context.rank();
        let progress = DistributedProgressBar::new(rank.global_role(), options.epochs, train_data.num_batches())
            .with_draw_target(options.draw_target);
        let checkpoints = CheckpointManager::new(context.project());

        Ok(Trainer {
            model,
            train_data,
            validation_data: None,
            optimizer,
            scheduler: None,
            tokenizer: None,
            checkpoint_role: rank.local_role(),
            checkpoints,
            progress,
            context,
            options,
            train_loss_tracker: LossTracker::new(),
            validation_loss_tracker: LossTracker::new(),
            current_step: 0,
        })
    }

    pub fn with_validation(mut self, data: Box<dyn DataSource<Batch = M::Batch>>) -> Self {
        self.validation_data = Some(data);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Box<dyn LrScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Companion artifact saved next to the model in every checkpoint.
    pub fn with_tokenizer(mut self, tokenizer: Box<dyn SavePretrained>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn current_step(&self) -> u64 {
        self.current_step
    }

    pub fn train_loss_tracker(&self) -> &LossTracker {
        &self.train_loss_tracker
    }

    pub fn validation_loss_tracker(&self) -> &LossTracker {
        &self.validation_loss_tracker
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// Runs all epochs, then ends training on the context. `end_training`
    /// also runs after an early stop or a failed epoch; the epoch's error wins.
    pub fn train(&mut self) -> Result<TrainingSummary> {
        let mut summary = TrainingSummary::default();
        let outcome = self.run_epochs(&mut summary);
        let ended = self.context.end_training();
        outcome?;
        ended?;
        Ok(summary)
    }

    fn run_epochs(&mut self, summary: &mut TrainingSummary) -> Result<()> {
        let epochs = self.options.epochs;
        for epoch in 1..=epochs {
            if self.stop_requested() {
                warn!(epoch, "stop requested, ending training early");
                summary.stopped_early = true;
                break;
            }

            let started = Instant::now();
            let train_loss = self.run_epoch(epoch)?;
            let validation_loss = self.validate(epoch)?;
            let checkpoint = if self.options.save_on_epoch_end {
                self.save_checkpoint(epoch)?
            } else {
                None
            };

            summary.epochs_completed = epoch;
            summary.global_step = self.current_step;
            summary.train_loss_history.push(train_loss);
            summary.validation_loss_history.extend(validation_loss);
            summary.checkpoints.extend(checkpoint.clone());
            info!(epoch, epochs, train_loss, ?validation_loss, step = self.current_step, "epoch finished");

            let epoch_summary = EpochSummary {
                epoch,
                total_epochs: epochs,
                train_loss,
                validation_loss,
                checkpoint,
                global_step: self.current_step,
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            if let Some(tx) = &self.options.progress_tx {
                if tx.send(epoch_summary).is_err() {
                    warn!(epoch, "progress receiver dropped, ending training");
                    summary.stopped_early = epoch < epochs;
                    break;
                }
            }
        }
        Ok(())
    }

    /// One pass over the training data. Returns the epoch's tracked loss.
    fn run_epoch(&mut self, epoch: usize) -> Result<f64> {
        let Self {
            model,
            train_data,
            optimizer,
            scheduler,
            context,
            options,
            progress,
            train_loss_tracker,
            current_step,
            ..
        } = self;

        model.set_mode(ModelMode::Train);
        progress.on_epoch_start();

        let mut batches = train_data.batches().enumerate().peekable();
        while let Some((batch_index, batch)) = batches.next() {
            let end_of_data = batches.peek().is_none();
            let loss = context.accumulate(end_of_data, |ctx, step: &AccumulationStep| -> Result<f64> {
                if step.is_cycle_start() {
                    optimizer.zero_grad(&mut model.parameters());
                }
                let output = model.forward(&batch, GradMode::Enabled)?;
                ctx.backward(&mut *model, step)?;
                if step.sync_gradients() {
                    optimizer.step(&mut model.parameters());
                    if let Some(scheduler) = scheduler.as_mut() {
                        scheduler.step(optimizer.as_mut());
                    }
                }
                if options.reject_non_finite_loss {
                    train_loss_tracker.try_update(output.loss)?;
                } else {
                    train_loss_tracker.update(output.loss);
                }
                Ok(output.loss)
            })?;

            progress.update(1);
            *current_step += 1;
            if batch_index % options.log_interval == 0 {
                let lr = scheduler
                    .as_ref()
                    .and_then(|s| s.get_lr().first().copied())
                    .unwrap_or_else(|| optimizer.learning_rate());
                let metrics = Metrics::new()
                    .with("loss", train_loss_tracker.loss())
                    .with("lr", lr);
                context.log(&metrics, *current_step)?;
                progress.show_metrics(&metrics);
                debug!(epoch, batch_index, step = *current_step, batch_loss = loss, "logged step");
            }
        }

        let train_loss = train_loss_tracker.loss();
        let train_metrics = Metrics::new().with("loss", train_loss).add_prefix("train");
        context.log(&train_metrics, epoch as u64)?;
        train_loss_tracker.on_epoch_end(true);
        progress.on_epoch_end();
        Ok(train_loss)
    }

    fn validate(&mut self, epoch: usize) -> Result<Option<f64>> {
        let Some(data) = self.validation_data.as_mut() else {
            return Ok(None);
        };
        let loss = evaluate(&mut self.model, data.as_mut(), Some(&mut self.validation_loss_tracker))?;
        self.context.print(&format!("Epoch {epoch} Validation loss: {loss:.6}"));
        let metrics = Metrics::new().with("loss", loss).add_prefix("validation");
        self.context.log(&metrics, epoch as u64)?;
        Ok(Some(loss))
    }

    fn save_checkpoint(&mut self, epoch: usize) -> Result<Option<PathBuf>> {
        let mut saved = None;
        if self.checkpoint_role.is_coordinator() {
            let model = &self.model;
            let tokenizer = &self.tokenizer;
            let dir = self.checkpoints.publish(epoch, |dir| {
                model.save_pretrained(dir)?;
                if let Some(tokenizer) = tokenizer {
                    tokenizer.save_pretrained(dir)?;
                }
                Ok(())
            })?;
            self.context.print(&dir.display().to_string());
            saved = Some(dir);
        }
        self.context.wait_for_everyone()?;
        Ok(saved)
    }

    fn stop_requested(&self) -> bool {
        self.options
            .stop_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
