//! Arguments addressed by the shader parameter name instead of the binding
//! slot.

use std::collections::hash_map::{self, HashMap};

use gpu_backend::{Backend, ComputeEncoder};
use tracing::trace;

use crate::argument::Argument;

/// A named set of dispatch arguments.
///
/// Names are resolved to binding slots only when a dispatch is encoded, using
/// the binding table the compiler reported for the pipeline.
pub struct Arguments<'a, B: Backend + ?Sized> {
    entries: HashMap<String, Argument<'a, B>>,
}

impl<'a, B: Backend + ?Sized> Arguments<'a, B> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Argument<'a, B>> {
        self.entries.get(name)
    }

    /// Set or clear the argument bound to `name`.
    ///
    /// Passing `None` removes the binding so later dispatches leave the slot
    /// unbound.
    pub fn set(&mut self, name: impl Into<String>, argument: Option<Argument<'a, B>>) {
        let name = name.into();
        match argument {
            Some(argument) => {
                self.entries.insert(name, argument);
            }
            None => {
                self.entries.remove(&name);
            }
        }
    }

    /// Bind `argument` to `name`, returning the previous argument.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        argument: impl Into<Argument<'a, B>>,
    ) -> Option<Argument<'a, B>> {
        self.entries.insert(name.into(), argument.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Argument<'a, B>> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, Argument<'a, B>> {
        self.entries.iter()
    }

    /// Encode every argument whose name appears in `bindings` at its slot.
    ///
    /// Declared parameters with no argument are left unbound; the driver's
    /// validation reports them at submission if they were required.
    /// Arguments with no declared parameter are ignored.
    pub fn encode<E>(&self, bindings: &HashMap<String, usize>, encoder: &mut E)
    where
        E: ComputeEncoder<B> + ?Sized,
    {
        for (name, &index) in bindings {
            if let Some(argument) = self.entries.get(name) {
                trace!("Binding '{name}' ({}) at index {index}", argument.kind());
                argument.encode(encoder, index);
            }
        }
    }

    /// Names declared in `bindings` that have no argument.
    pub fn unbound<'b>(&self, bindings: &'b HashMap<String, usize>) -> Vec<&'b str> {
        let mut names: Vec<&str> = bindings
            .keys()
            .filter(|name| !self.entries.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

impl<B: Backend + ?Sized> Default for Arguments<'_, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend + ?Sized> Clone for Arguments<'_, B> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<B: Backend + ?Sized> std::fmt::Debug for Arguments<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<'a, B, K> FromIterator<(K, Argument<'a, B>)> for Arguments<'a, B>
where
    B: Backend + ?Sized,
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Argument<'a, B>)>>(iter: I) -> Self {
        let mut arguments = Self::new();
        arguments.extend(iter);
        arguments
    }
}

impl<'a, B, K> Extend<(K, Argument<'a, B>)> for Arguments<'a, B>
where
    B: Backend + ?Sized,
    K: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, Argument<'a, B>)>>(&mut self, iter: I) {
        for (name, argument) in iter {
            self.entries.insert(name.into(), argument);
        }
    }
}

impl<'s, 'a, B: Backend + ?Sized> IntoIterator for &'s Arguments<'a, B> {
    type Item = (&'s String, &'s Argument<'a, B>);
    type IntoIter = hash_map::Iter<'s, String, Argument<'a, B>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Command, Recorder, TestBuffer};

    fn bindings(pairs: &[(&str, usize)]) -> HashMap<String, usize> {
        pairs.iter().map(|(n, i)| (n.to_string(), *i)).collect()
    }

    #[test]
    fn set_get_and_clear() {
        let mut arguments = Arguments::<Recorder>::new();
        arguments.set("count", Some(Argument::from(42_i32)));
        assert!(matches!(
            arguments.get("count"),
            Some(Argument::Int(crate::argument::Integer::I32(42)))
        ));

        arguments.set("count", Some(Argument::from(7_i32)));
        assert_eq!(arguments.len(), 1);
        assert!(matches!(
            arguments.get("count"),
            Some(Argument::Int(crate::argument::Integer::I32(7)))
        ));

        arguments.set("count", None);
        assert!(arguments.get("count").is_none());
        assert!(arguments.is_empty());
    }

    #[test]
    fn encodes_by_declared_slot() {
        let recorder = Recorder::new();
        let cb = recorder.new_command_buffer("test").unwrap();
        let mut encoder = recorder.new_compute_encoder(&cb).unwrap();
        let output = TestBuffer { id: 3 };

        let mut arguments = Arguments::<Recorder>::new();
        arguments.insert("output", Argument::buffer(&output));
        arguments.insert("x_min", -2.0_f32);
        arguments.insert("undeclared", 1_u8);

        arguments.encode(&bindings(&[("output", 0), ("x_min", 1)]), &mut encoder);

        assert!(recorder.commands().contains(&Command::SetBuffer {
            buffer: 3,
            offset: 0,
            index: 0
        }));
        assert_eq!(recorder.bytes_at(1), Some((-2.0_f32).to_ne_bytes().to_vec()));
        // Only the two declared parameters were bound.
        assert_eq!(
            recorder.count(|c| matches!(c, Command::SetBytes { .. } | Command::SetBuffer { .. })),
            2
        );
    }

    #[test]
    fn cleared_argument_is_not_encoded() {
        let recorder = Recorder::new();
        let cb = recorder.new_command_buffer("test").unwrap();
        let mut encoder = recorder.new_compute_encoder(&cb).unwrap();
        let declared = bindings(&[("count", 0), ("scale", 1)]);

        let mut arguments = Arguments::<Recorder>::new();
        arguments.insert("count", 42_u32);
        arguments.insert("scale", 2.0_f32);
        arguments.set("scale", None);

        arguments.encode(&declared, &mut encoder);

        assert!(recorder.bytes_at(0).is_some());
        assert!(recorder.bytes_at(1).is_none());
        assert_eq!(arguments.unbound(&declared), vec!["scale"]);
    }

    #[test]
    fn collects_from_pairs() {
        let arguments: Arguments<Recorder> = [
            ("a", Argument::from(1_i8)),
            ("b", Argument::from(true)),
        ]
        .into_iter()
        .collect();
        assert!(arguments.contains("a"));
        assert!(arguments.contains("b"));
        assert_eq!((&arguments).into_iter().count(), 2);
    }
}
