//! Single-use recording scopes bound to one command buffer.
//!
//! A [`Task`] is only ever handed out by [`Compute::task`](crate::Compute::task)
//! for the duration of a closure. When the scope ends the command buffer is
//! committed and waited on exactly once, on every exit path.

use gpu_backend::{Backend, ComputeEncoder, ComputeError, Extent3};
use tracing::{debug, error};

use crate::logging::LogSink;
use crate::pipeline::Pipeline;

/// Records dispatches into one command buffer.
pub struct Task<'c, B: Backend + ?Sized> {
    backend: &'c B,
    command_buffer: B::CommandBuffer,
    label: String,
    logger: Option<&'c LogSink>,
    dispatches: usize,
    submitted: bool,
}

impl<'c, B: Backend + ?Sized> Task<'c, B> {
    pub(crate) fn begin(
        backend: &'c B,
        label: &str,
        logger: Option<&'c LogSink>,
    ) -> Result<Self, ComputeError> {
        let command_buffer = backend.new_command_buffer(label)?;
        Ok(Self {
            backend,
            command_buffer,
            label: label.to_owned(),
            logger,
            dispatches: 0,
            submitted: false,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of dispatches encoded so far.
    pub fn dispatch_count(&self) -> usize {
        self.dispatches
    }

    /// Borrow the command buffer being recorded.
    pub fn command_buffer(&self) -> &B::CommandBuffer {
        &self.command_buffer
    }

    /// Encode one dispatch of `pipeline` over `threads`, split into
    /// threadgroups of `threads_per_threadgroup`.
    ///
    /// The pipeline's current arguments are bound by name. Declared
    /// parameters without an argument are left unbound.
    pub fn dispatch(
        &mut self,
        pipeline: &Pipeline<'_, B>,
        threads: impl Into<Extent3>,
        threads_per_threadgroup: impl Into<Extent3>,
    ) -> Result<(), ComputeError> {
        let threads = threads.into();
        let threads_per_threadgroup = threads_per_threadgroup.into();

        let unbound = pipeline.unbound_parameters();
        if !unbound.is_empty() {
            debug!(
                "'{}' dispatched with unbound parameters {unbound:?}",
                pipeline.function().name()
            );
        }

        let mut encoder = self.backend.new_compute_encoder(&self.command_buffer)?;
        encoder.set_compute_pipeline_state(pipeline.state());
        pipeline.arguments().encode(pipeline.bindings(), &mut encoder);
        encoder.dispatch_threads(threads, threads_per_threadgroup);
        encoder.end_encoding();

        self.dispatches += 1;
        debug!(
            "Task '{}': dispatched '{}' over {threads:?} in groups of {threads_per_threadgroup:?}",
            self.label,
            pipeline.function().name()
        );
        Ok(())
    }

    /// Like [`dispatch`](Self::dispatch), using the pipeline's largest square
    /// threadgroup.
    pub fn dispatch_default(
        &mut self,
        pipeline: &Pipeline<'_, B>,
        threads: impl Into<Extent3>,
    ) -> Result<(), ComputeError> {
        let threads_per_threadgroup = pipeline.default_threads_per_threadgroup();
        self.dispatch(pipeline, threads, threads_per_threadgroup)
    }

    /// Commit and wait, reporting a device-side failure.
    pub(crate) fn finish(mut self) -> Result<(), ComputeError> {
        self.submitted = true;
        self.submit_and_wait()
    }

    fn submit_and_wait(&self) -> Result<(), ComputeError> {
        self.backend.commit(&self.command_buffer);

        let message = format!(
            "Waiting for task '{}' ({} dispatches)",
            self.label, self.dispatches
        );
        debug!("{message}");
        if let Some(log) = self.logger {
            log(&message);
        }

        self.backend.wait_until_completed(&self.command_buffer)
    }
}

impl<B: Backend + ?Sized> Drop for Task<'_, B> {
    fn drop(&mut self) {
        if self.submitted {
            return;
        }
        self.submitted = true;
        if let Err(e) = self.submit_and_wait() {
            error!("Task '{}' failed while unwinding: {e}", self.label);
        }
    }
}
