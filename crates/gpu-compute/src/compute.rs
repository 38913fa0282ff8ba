//! The compute session: device and queue ownership, pipeline creation, and
//! task scopes.

use anyhow::Result;
use gpu_backend::{Backend, ComputeError, Extent3};
use tracing::{debug, warn};

use crate::argument::Argument;
use crate::arguments::Arguments;
use crate::config::ComputeConfig;
use crate::function::{ShaderFunction, ShaderLibrary};
use crate::logging::LogSink;
use crate::pipeline::Pipeline;
use crate::task::Task;

/// A GPU device with one serial command queue.
///
/// Every [`task`](Compute::task) and [`run`](Compute::run) submits its work
/// and blocks until the GPU finishes it before returning.
pub struct Compute<B: Backend> {
    backend: B,
    config: ComputeConfig,
    logger: Option<Box<LogSink>>,
}

impl<B: Backend> Compute<B> {
    /// Wrap an already opened backend.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, ComputeConfig::default())
    }

    pub fn with_config(backend: B, config: ComputeConfig) -> Self {
        debug!("Compute session on {}", backend.name());
        Self {
            backend,
            config,
            logger: None,
        }
    }

    /// Send progress messages to `logger`.
    pub fn with_logger(mut self, logger: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ComputeConfig {
        &self.config
    }

    /// Compile a shader library from source.
    pub fn library_with_source(&self, source: &str) -> Result<ShaderLibrary<B>, ComputeError> {
        self.backend
            .new_library_with_source(source)
            .map(ShaderLibrary::from_raw)
    }

    /// Load a precompiled shader library.
    pub fn library_with_data(&self, data: &[u8]) -> Result<ShaderLibrary<B>, ComputeError> {
        self.backend
            .new_library_with_data(data)
            .map(ShaderLibrary::from_raw)
    }

    /// Build a pipeline from `function`, specialized with `constants`.
    ///
    /// See [`Pipeline::new`].
    pub fn make_pipeline<'a, 'c, K>(
        &self,
        function: ShaderFunction<B>,
        constants: impl IntoIterator<Item = (K, Argument<'c, B>)>,
        arguments: Arguments<'a, B>,
    ) -> Result<Pipeline<'a, B>, ComputeError>
    where
        K: Into<String>,
        B::Buffer: 'c,
        B::Texture: 'c,
    {
        Pipeline::new(&self.backend, function, constants, arguments)
    }

    /// Open a command buffer, run `f` with a [`Task`] recording into it, then
    /// commit and wait.
    ///
    /// The command buffer is submitted and waited on exactly once whether
    /// `f` succeeds, fails or panics. An error from `f` takes precedence over
    /// a failure reported by the device.
    pub fn task<T>(&self, label: &str, f: impl FnOnce(&mut Task<'_, B>) -> Result<T>) -> Result<T> {
        let mut task = Task::begin(&self.backend, label, self.logger.as_deref())?;
        let result = f(&mut task);
        let completion = task.finish();

        match (result, completion) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(completion)) => {
                warn!("Task '{label}' also failed on the device: {completion}");
                Err(e)
            }
        }
    }

    /// Dispatch `pipeline` once in its own task and wait for it.
    pub fn run(
        &self,
        pipeline: &Pipeline<'_, B>,
        threads: impl Into<Extent3>,
        threads_per_threadgroup: impl Into<Extent3>,
    ) -> Result<()> {
        let label = self.run_label(pipeline);
        self.task(&label, |task| {
            task.dispatch(pipeline, threads, threads_per_threadgroup)?;
            Ok(())
        })
    }

    /// Like [`run`](Self::run), using the pipeline's largest square
    /// threadgroup.
    pub fn run_default(&self, pipeline: &Pipeline<'_, B>, threads: impl Into<Extent3>) -> Result<()> {
        let label = self.run_label(pipeline);
        self.task(&label, |task| {
            task.dispatch_default(pipeline, threads)?;
            Ok(())
        })
    }

    fn run_label(&self, pipeline: &Pipeline<'_, B>) -> String {
        format!(
            "{}.{}",
            self.config.default_task_label,
            pipeline.function().name()
        )
    }
}

#[cfg(target_os = "macos")]
impl Compute<gpu_backend::metal::MetalDevice> {
    /// Open the system default Metal device.
    pub fn system_default() -> Result<Self, ComputeError> {
        Self::from_config(ComputeConfig::default())
    }

    /// Open the Metal device `config` selects and create its command queue.
    pub fn from_config(config: ComputeConfig) -> Result<Self, ComputeError> {
        let device =
            gpu_backend::metal::MetalDevice::select(&config.device, config.queue_label.as_deref())?;
        Ok(Self::with_config(device, config))
    }
}
