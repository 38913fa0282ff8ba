//! In-memory backend that records every call, for unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use gpu_backend::{
    Backend, CompiledPipeline, ComputeEncoder, ComputeError, ConstantType, Extent3,
    FunctionConstants,
};

pub struct TestBuffer {
    pub id: u32,
}

pub struct TestTexture {
    pub id: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    NewCommandBuffer(String),
    SetPipeline(u32),
    SetBytes { index: usize, bytes: Vec<u8> },
    SetBuffer { buffer: u32, offset: usize, index: usize },
    SetTexture { texture: u32, index: usize },
    Dispatch { threads: Extent3, threads_per_threadgroup: Extent3 },
    EndEncoding,
    Commit(String),
    Wait(String),
}

/// A kernel the test library declares.
#[derive(Clone, Default)]
struct Kernel {
    parameters: HashMap<String, usize>,
    constants: HashMap<String, ConstantType>,
}

/// A shader library described directly in the test.
#[derive(Clone, Default)]
pub struct TestLibrary {
    kernels: HashMap<String, Kernel>,
}

impl TestLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a kernel with its parameter slots and function constants.
    pub fn kernel(
        mut self,
        name: &str,
        parameters: &[(&str, usize)],
        constants: &[(&str, ConstantType)],
    ) -> Self {
        let kernel = Kernel {
            parameters: parameters
                .iter()
                .map(|(name, index)| (name.to_string(), *index))
                .collect(),
            constants: constants
                .iter()
                .map(|(name, ty)| (name.to_string(), *ty))
                .collect(),
        };
        self.kernels.insert(name.to_owned(), kernel);
        self
    }
}

#[derive(Default)]
pub struct TestConstants {
    pub values: HashMap<String, (ConstantType, Vec<u8>)>,
}

impl FunctionConstants for TestConstants {
    fn set_constant_value(&mut self, bytes: &[u8], ty: ConstantType, name: &str) {
        assert_eq!(bytes.len(), ty.size(), "constant '{name}' has wrong size");
        self.values.insert(name.to_owned(), (ty, bytes.to_vec()));
    }
}

pub struct TestPipelineState {
    pub id: u32,
    pub constants: HashMap<String, (ConstantType, Vec<u8>)>,
}

pub struct TestCommandBuffer {
    pub label: String,
}

pub struct TestEncoder {
    log: Rc<RefCell<Vec<Command>>>,
}

impl ComputeEncoder<Recorder> for TestEncoder {
    fn set_compute_pipeline_state(&mut self, state: &TestPipelineState) {
        self.log.borrow_mut().push(Command::SetPipeline(state.id));
    }

    fn set_bytes(&mut self, bytes: &[u8], index: usize) {
        self.log.borrow_mut().push(Command::SetBytes {
            index,
            bytes: bytes.to_vec(),
        });
    }

    fn set_buffer(&mut self, buffer: &TestBuffer, offset: usize, index: usize) {
        self.log.borrow_mut().push(Command::SetBuffer {
            buffer: buffer.id,
            offset,
            index,
        });
    }

    fn set_texture(&mut self, texture: &TestTexture, index: usize) {
        self.log.borrow_mut().push(Command::SetTexture {
            texture: texture.id,
            index,
        });
    }

    fn dispatch_threads(&mut self, threads: Extent3, threads_per_threadgroup: Extent3) {
        self.log.borrow_mut().push(Command::Dispatch {
            threads,
            threads_per_threadgroup,
        });
    }

    fn end_encoding(&mut self) {
        self.log.borrow_mut().push(Command::EndEncoding);
    }
}

/// Backend that records calls instead of talking to a GPU.
pub struct Recorder {
    log: Rc<RefCell<Vec<Command>>>,
    pipelines_compiled: Cell<u32>,
    max_total_threads_per_threadgroup: usize,
    fail_command_buffers: Cell<bool>,
    fail_execution: Cell<bool>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self::with_max_threads(1024)
    }

    pub fn with_max_threads(max_total_threads_per_threadgroup: usize) -> Self {
        Self {
            log: Rc::default(),
            pipelines_compiled: Cell::new(0),
            max_total_threads_per_threadgroup,
            fail_command_buffers: Cell::new(false),
            fail_execution: Cell::new(false),
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn pipelines_compiled(&self) -> u32 {
        self.pipelines_compiled.get()
    }

    pub fn count(&self, matches: impl Fn(&Command) -> bool) -> usize {
        self.log.borrow().iter().filter(|c| matches(c)).count()
    }

    /// The last bytes set inline at `index`.
    pub fn bytes_at(&self, index: usize) -> Option<Vec<u8>> {
        self.log.borrow().iter().rev().find_map(|c| match c {
            Command::SetBytes { index: i, bytes } if *i == index => Some(bytes.clone()),
            _ => None,
        })
    }

    pub fn fail_command_buffers(&self, fail: bool) {
        self.fail_command_buffers.set(fail);
    }

    pub fn fail_execution(&self, fail: bool) {
        self.fail_execution.set(fail);
    }
}

impl Backend for Recorder {
    type Buffer = TestBuffer;
    type Texture = TestTexture;
    type Library = TestLibrary;
    type Constants = TestConstants;
    type PipelineState = TestPipelineState;
    type CommandBuffer = TestCommandBuffer;
    type Encoder = TestEncoder;

    fn name(&self) -> String {
        "Recorder".to_owned()
    }

    fn new_library_with_source(&self, source: &str) -> Result<TestLibrary, ComputeError> {
        if source.trim().is_empty() {
            return Err(ComputeError::compilation("<source>", "empty source"));
        }
        Ok(TestLibrary::new())
    }

    fn new_library_with_data(&self, data: &[u8]) -> Result<TestLibrary, ComputeError> {
        if data.is_empty() {
            return Err(ComputeError::resource("library from empty data"));
        }
        Ok(TestLibrary::new())
    }

    fn new_function_constants(&self) -> TestConstants {
        TestConstants::default()
    }

    fn new_compute_pipeline(
        &self,
        library: &TestLibrary,
        function: &str,
        constants: &TestConstants,
    ) -> Result<CompiledPipeline<TestPipelineState>, ComputeError> {
        let kernel = library
            .kernels
            .get(function)
            .ok_or_else(|| ComputeError::compilation(function, "function not found"))?;

        for (name, (ty, _)) in &constants.values {
            match kernel.constants.get(name) {
                None => {
                    return Err(ComputeError::compilation(
                        function,
                        format!("unknown function constant '{name}'"),
                    ))
                }
                Some(declared) if declared != ty => {
                    return Err(ComputeError::compilation(
                        function,
                        format!("function constant '{name}' is {declared:?}, got {ty:?}"),
                    ))
                }
                Some(_) => {}
            }
        }

        let id = self.pipelines_compiled.get() + 1;
        self.pipelines_compiled.set(id);

        Ok(CompiledPipeline {
            state: TestPipelineState {
                id,
                constants: constants.values.clone(),
            },
            bindings: kernel.parameters.clone(),
            max_total_threads_per_threadgroup: self.max_total_threads_per_threadgroup,
            thread_execution_width: 32,
        })
    }

    fn new_command_buffer(&self, label: &str) -> Result<TestCommandBuffer, ComputeError> {
        if self.fail_command_buffers.get() {
            return Err(ComputeError::resource("test command buffer"));
        }
        self.log
            .borrow_mut()
            .push(Command::NewCommandBuffer(label.to_owned()));
        Ok(TestCommandBuffer {
            label: label.to_owned(),
        })
    }

    fn new_compute_encoder(
        &self,
        _command_buffer: &TestCommandBuffer,
    ) -> Result<TestEncoder, ComputeError> {
        Ok(TestEncoder {
            log: Rc::clone(&self.log),
        })
    }

    fn commit(&self, command_buffer: &TestCommandBuffer) {
        self.log
            .borrow_mut()
            .push(Command::Commit(command_buffer.label.clone()));
    }

    fn wait_until_completed(&self, command_buffer: &TestCommandBuffer) -> Result<(), ComputeError> {
        self.log
            .borrow_mut()
            .push(Command::Wait(command_buffer.label.clone()));
        if self.fail_execution.get() {
            return Err(ComputeError::execution(
                &command_buffer.label,
                "simulated device failure",
            ));
        }
        Ok(())
    }
}
