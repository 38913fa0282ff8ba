//! Compiled compute pipelines.
//!
//! A [`Pipeline`] is built once from a shader function and a set of function
//! constants. The constants are baked into the compiled state; only the
//! dispatch arguments in [`Pipeline::arguments_mut`] change between runs.

use std::collections::HashMap;

use gpu_backend::{Backend, ComputeError, Extent3};
use tracing::debug;

use crate::argument::Argument;
use crate::arguments::Arguments;
use crate::function::ShaderFunction;

/// A compiled compute pipeline together with its dispatch arguments.
pub struct Pipeline<'a, B: Backend + ?Sized> {
    function: ShaderFunction<B>,
    state: B::PipelineState,
    bindings: HashMap<String, usize>,
    constant_names: Vec<String>,
    max_total_threads_per_threadgroup: usize,
    thread_execution_width: usize,
    arguments: Arguments<'a, B>,
}

impl<'a, B: Backend + ?Sized> Pipeline<'a, B> {
    /// Specialize `function` with `constants` and compile it.
    ///
    /// `arguments` pre-seeds the dispatch arguments and may be empty.
    ///
    /// # Panics
    ///
    /// If any constant is a buffer or texture.
    pub fn new<'c, K>(
        backend: &B,
        function: ShaderFunction<B>,
        constants: impl IntoIterator<Item = (K, Argument<'c, B>)>,
        arguments: Arguments<'a, B>,
    ) -> Result<Self, ComputeError>
    where
        K: Into<String>,
        B::Buffer: 'c,
        B::Texture: 'c,
    {
        let mut table = backend.new_function_constants();
        let mut constant_names = Vec::new();
        for (name, constant) in constants {
            let name = name.into();
            constant.as_compile_constant(&mut table, &name);
            constant_names.push(name);
        }
        // A repeated name keeps its last value.
        constant_names.sort_unstable();
        constant_names.dedup();

        let compiled = backend.new_compute_pipeline(function.library(), function.name(), &table)?;
        debug!(
            "Pipeline '{}' ready with constants {constant_names:?}",
            function.name()
        );

        Ok(Self {
            function,
            state: compiled.state,
            bindings: compiled.bindings,
            constant_names,
            max_total_threads_per_threadgroup: compiled.max_total_threads_per_threadgroup,
            thread_execution_width: compiled.thread_execution_width,
            arguments,
        })
    }

    pub fn function(&self) -> &ShaderFunction<B> {
        &self.function
    }

    /// The compiled, device-resident pipeline state.
    pub fn state(&self) -> &B::PipelineState {
        &self.state
    }

    /// Names of the function constants this pipeline was specialized with.
    pub fn constant_names(&self) -> &[String] {
        &self.constant_names
    }

    /// Declared parameter names and their binding slots.
    pub fn bindings(&self) -> &HashMap<String, usize> {
        &self.bindings
    }

    pub fn binding_index(&self, name: &str) -> Option<usize> {
        self.bindings.get(name).copied()
    }

    pub fn max_total_threads_per_threadgroup(&self) -> usize {
        self.max_total_threads_per_threadgroup
    }

    pub fn thread_execution_width(&self) -> usize {
        self.thread_execution_width
    }

    /// The largest square threadgroup the hardware allows for this pipeline.
    pub fn default_threads_per_threadgroup(&self) -> Extent3 {
        let side = (self.max_total_threads_per_threadgroup as f64).sqrt() as usize;
        Extent3::planar(side.max(1), side.max(1))
    }

    pub fn arguments(&self) -> &Arguments<'a, B> {
        &self.arguments
    }

    pub fn arguments_mut(&mut self) -> &mut Arguments<'a, B> {
        &mut self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&Argument<'a, B>> {
        self.arguments.get(name)
    }

    /// Set or clear a dispatch argument by parameter name.
    pub fn set_argument(&mut self, name: impl Into<String>, argument: Option<Argument<'a, B>>) {
        self.arguments.set(name, argument);
    }

    /// Declared parameters that currently have no argument.
    pub fn unbound_parameters(&self) -> Vec<&str> {
        self.arguments.unbound(&self.bindings)
    }
}

impl<B: Backend + ?Sized> std::fmt::Debug for Pipeline<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("function", &self.function.name())
            .field("constants", &self.constant_names)
            .field("bindings", &self.bindings)
            .field(
                "max_total_threads_per_threadgroup",
                &self.max_total_threads_per_threadgroup,
            )
            .field("arguments", &self.arguments)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use gpu_backend::ConstantType;

    use super::*;
    use crate::testing::{Recorder, TestBuffer, TestLibrary};

    fn mandelbrot() -> ShaderFunction<Recorder> {
        let library = TestLibrary::new().kernel(
            "mandelbrot",
            &[("output", 0), ("x_min", 1), ("x_max", 2)],
            &[("max_iterations", ConstantType::UInt)],
        );
        ShaderFunction::new(library, "mandelbrot")
    }

    #[test]
    fn bakes_constants_and_reads_back_limits() {
        let recorder = Recorder::with_max_threads(512);
        let pipeline = Pipeline::new(
            &recorder,
            mandelbrot(),
            [("max_iterations", Argument::from(1024_u32))],
            Arguments::new(),
        )
        .unwrap();

        assert_eq!(pipeline.max_total_threads_per_threadgroup(), 512);
        assert_eq!(pipeline.constant_names(), ["max_iterations"]);
        assert_eq!(pipeline.binding_index("x_max"), Some(2));
        assert_eq!(
            pipeline.state().constants["max_iterations"],
            (ConstantType::UInt, 1024_u32.to_ne_bytes().to_vec())
        );
        assert_eq!(pipeline.default_threads_per_threadgroup(), Extent3::planar(22, 22));
    }

    #[test]
    fn seeds_and_updates_arguments() {
        let recorder = Recorder::new();
        let output = TestBuffer { id: 1 };
        let seed: Arguments<Recorder> = [("output", Argument::buffer(&output))].into_iter().collect();

        let mut pipeline = Pipeline::new(
            &recorder,
            mandelbrot(),
            [("max_iterations", Argument::from(16_u32))],
            seed,
        )
        .unwrap();
        assert_eq!(pipeline.unbound_parameters(), vec!["x_max", "x_min"]);

        pipeline.set_argument("x_min", Some(Argument::from(-2.0_f32)));
        pipeline.set_argument("x_max", Some(Argument::from(1.0_f32)));
        assert!(pipeline.unbound_parameters().is_empty());

        pipeline.set_argument("output", None);
        assert_eq!(pipeline.unbound_parameters(), vec!["output"]);
    }

    #[test]
    fn repeated_constant_keeps_last_value() {
        let recorder = Recorder::new();
        let pipeline = Pipeline::new(
            &recorder,
            mandelbrot(),
            [
                ("max_iterations", Argument::from(1_u32)),
                ("max_iterations", Argument::from(2_u32)),
            ],
            Arguments::new(),
        )
        .unwrap();

        assert_eq!(pipeline.constant_names(), ["max_iterations"]);
        assert_eq!(
            pipeline.state().constants["max_iterations"],
            (ConstantType::UInt, 2_u32.to_ne_bytes().to_vec())
        );
    }

    #[test]
    fn missing_function_is_a_compilation_error() {
        let recorder = Recorder::new();
        let function = ShaderFunction::new(TestLibrary::new(), "missing");
        let err = Pipeline::new(
            &recorder,
            function,
            std::iter::empty::<(String, Argument<Recorder>)>(),
            Arguments::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ComputeError::Compilation { ref function, .. } if function == "missing"));
    }

    #[test]
    fn constant_type_mismatch_propagates() {
        let recorder = Recorder::new();
        let err = Pipeline::new(
            &recorder,
            mandelbrot(),
            [("max_iterations", Argument::from(1024_i16))],
            Arguments::new(),
        )
        .unwrap_err();
        assert!(matches!(err, ComputeError::Compilation { .. }));
        assert_eq!(recorder.pipelines_compiled(), 0);
    }

    #[test]
    #[should_panic(expected = "cannot be a buffer")]
    fn buffer_constant_is_fatal() {
        let recorder = Recorder::new();
        let buffer = TestBuffer { id: 1 };
        let _ = Pipeline::new(
            &recorder,
            mandelbrot(),
            [("max_iterations", Argument::buffer(&buffer))],
            Arguments::new(),
        );
    }
}
