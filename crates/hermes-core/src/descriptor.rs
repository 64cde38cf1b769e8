//! Type descriptors and callable signatures.
//!
//! A [`TypeDescriptor`] identifies a type flowing through a pipeline and
//! classifies it as a concrete value type, a capability (a trait object type
//! such as `dyn Failure`), or the open capability that binds the current
//! response. A [`Signature`] is the ordered list of input and output
//! descriptors of a callable, checked against per-stage rules at wiring time.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::SignatureError;
use crate::response::Failure;
use crate::value::{Capabilities, Value};

/// Classification of a [`TypeDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// An ordinary concrete type.
    Concrete,
    /// An abstract capability satisfied by concrete types that register it.
    Capability,
    /// The open capability: whatever the current response value is.
    Open,
}

/// Marker type identifying the open capability.
enum OpenCapability {}

/// An opaque, comparable identifier for a type.
///
/// Equality and hashing only consider the underlying [`TypeId`].
#[derive(Clone, Copy)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
    kind: TypeKind,
    capabilities: fn(TypeId) -> bool,
}

fn registers<T: Value>(capability: TypeId) -> bool {
    Capabilities::<T>::collect().contains(capability)
}

fn registers_nothing(_: TypeId) -> bool {
    false
}

impl TypeDescriptor {
    /// Describes the concrete value type `T`.
    pub fn of<T: Value>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            kind: TypeKind::Concrete,
            capabilities: registers::<T>,
        }
    }

    /// Describes the capability `C`, usually a `dyn Trait` type.
    pub fn capability<C>() -> Self
    where
        C: ?Sized + 'static,
    {
        Self {
            id: TypeId::of::<C>(),
            name: type_name::<C>(),
            kind: TypeKind::Capability,
            capabilities: registers_nothing,
        }
    }

    /// Describes the open capability.
    pub fn open() -> Self {
        Self {
            id: TypeId::of::<OpenCapability>(),
            name: "response",
            kind: TypeKind::Open,
            capabilities: registers_nothing,
        }
    }

    /// Returns the underlying type identifier.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the type name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the classification of this descriptor.
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Returns true for the open capability.
    pub fn is_open(&self) -> bool {
        self.kind == TypeKind::Open
    }

    /// Returns true for an abstract capability.
    pub fn is_capability(&self) -> bool {
        self.kind == TypeKind::Capability
    }

    /// Returns true if this type represents an operation failure.
    pub fn is_failure(&self) -> bool {
        let failure = TypeId::of::<dyn Failure>();
        match self.kind {
            TypeKind::Concrete => (self.capabilities)(failure),
            TypeKind::Capability => self.id == failure,
            TypeKind::Open => false,
        }
    }

    /// Returns true if a value of this type can be used where `other` is
    /// requested.
    ///
    /// The relation is directional: a concrete type satisfies the
    /// capabilities it registers, every type satisfies the open capability,
    /// and otherwise only identical types satisfy each other.
    pub fn satisfies(&self, other: &TypeDescriptor) -> bool {
        match other.kind {
            TypeKind::Open => true,
            TypeKind::Capability if self.kind == TypeKind::Concrete => {
                (self.capabilities)(other.id)
            }
            _ => self.id == other.id,
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The pipeline stage a callable is wired into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Runs before the main handler and may short-circuit the request.
    PreCheck,
    /// The main handler producing the response value.
    Main,
    /// Runs once per request after everything else.
    Finalizer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreCheck => f.write_str("pre-check"),
            Self::Main => f.write_str("main handler"),
            Self::Finalizer => f.write_str("finalizer"),
        }
    }
}

/// Ordered input and output descriptors of a callable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    /// Parameter types, in declaration order.
    pub inputs: Vec<TypeDescriptor>,
    /// Output types, in declaration order.
    pub outputs: Vec<TypeDescriptor>,
}

impl Signature {
    /// Checks the signature against the rules of `stage`.
    ///
    /// Pre-checks and main handlers may not take the open capability, since
    /// no response exists yet when they run. Every stage requires its input
    /// types to be unique, so a finalizer binds the response at most once.
    pub fn validate(&self, stage: Stage) -> Result<(), SignatureError> {
        let mut seen: HashMap<TypeId, usize> = HashMap::with_capacity(self.inputs.len());
        for (index, input) in self.inputs.iter().enumerate() {
            if input.is_open() && stage != Stage::Finalizer {
                return Err(SignatureError::OpenInput { stage, index });
            }
            if let Some(first) = seen.insert(input.id, index) {
                return Err(SignatureError::DuplicateInput {
                    stage,
                    type_name: input.name,
                    first,
                    second: index,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::StructuredResponse;

    struct Meta;
    impl Value for Meta {}

    #[derive(Debug)]
    struct Oops;

    impl fmt::Display for Oops {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("oops")
        }
    }

    impl std::error::Error for Oops {}

    impl Value for Oops {
        fn capabilities(caps: &mut Capabilities<Self>) {
            caps.failure();
        }
    }

    fn signature(inputs: Vec<TypeDescriptor>) -> Signature {
        Signature {
            inputs,
            outputs: Vec::new(),
        }
    }

    #[test]
    fn test_equality_uses_type_only() {
        assert_eq!(TypeDescriptor::of::<Meta>(), TypeDescriptor::of::<Meta>());
        assert_ne!(TypeDescriptor::of::<Meta>(), TypeDescriptor::of::<Oops>());
        assert_eq!(TypeDescriptor::open(), TypeDescriptor::open());
    }

    #[test]
    fn test_failure_classification() {
        assert!(TypeDescriptor::of::<Oops>().is_failure());
        assert!(!TypeDescriptor::of::<Meta>().is_failure());
        assert!(TypeDescriptor::capability::<dyn Failure>().is_failure());
        assert!(!TypeDescriptor::capability::<dyn StructuredResponse>().is_failure());
        assert!(!TypeDescriptor::open().is_failure());
    }

    #[test]
    fn test_satisfaction_is_directional() {
        let oops = TypeDescriptor::of::<Oops>();
        let failure = TypeDescriptor::capability::<dyn Failure>();
        assert!(oops.satisfies(&failure));
        assert!(!failure.satisfies(&oops));
        assert!(!TypeDescriptor::of::<Meta>().satisfies(&failure));
        assert!(oops.satisfies(&TypeDescriptor::open()));
        assert!(oops.satisfies(&oops));
    }

    #[test]
    fn test_open_input_rejected_before_response_exists() {
        let sig = signature(vec![TypeDescriptor::of::<Meta>(), TypeDescriptor::open()]);
        assert!(matches!(
            sig.validate(Stage::PreCheck),
            Err(SignatureError::OpenInput { index: 1, .. })
        ));
        assert!(sig.validate(Stage::Main).is_err());
        assert!(sig.validate(Stage::Finalizer).is_ok());
    }

    #[test]
    fn test_duplicate_inputs_rejected() {
        let sig = signature(vec![
            TypeDescriptor::of::<Meta>(),
            TypeDescriptor::of::<Oops>(),
            TypeDescriptor::of::<Meta>(),
        ]);
        for stage in [Stage::PreCheck, Stage::Main, Stage::Finalizer] {
            match sig.validate(stage) {
                Err(SignatureError::DuplicateInput { first, second, .. }) => {
                    assert_eq!((first, second), (0, 2));
                }
                other => panic!("unexpected result for {stage}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_finalizer_binds_response_once() {
        let sig = signature(vec![TypeDescriptor::open(), TypeDescriptor::open()]);
        assert!(matches!(
            sig.validate(Stage::Finalizer),
            Err(SignatureError::DuplicateInput { .. })
        ));
    }

    #[test]
    fn test_capability_inputs_allowed_everywhere() {
        let sig = signature(vec![TypeDescriptor::capability::<dyn Failure>()]);
        assert!(sig.validate(Stage::PreCheck).is_ok());
        assert!(sig.validate(Stage::Main).is_ok());
    }
}
