//! Converting callable results into broker slots.
//!
//! Every result is flattened into a list of [`Slot`]s, one per declared
//! output type. A slot distinguishes a real value from a typed absence (the
//! callable declared the type but produced nothing, like `None` or the `Ok`
//! side of a `Result`) and from true absence.

use crate::descriptor::TypeDescriptor;
use crate::response::Failure;
use crate::value::{Entry, Value};

/// One output of a callable invocation.
#[derive(Debug, Clone)]
pub enum Slot {
    /// A produced value.
    Value(Entry),
    /// The type was declared but no value was produced.
    TypedAbsent(TypeDescriptor),
    /// Nothing at all.
    Absent,
}

impl Slot {
    /// Returns the descriptor of the declared or produced type.
    pub fn descriptor(&self) -> Option<&TypeDescriptor> {
        match self {
            Self::Value(entry) => Some(entry.descriptor()),
            Self::TypedAbsent(descriptor) => Some(descriptor),
            Self::Absent => None,
        }
    }

    /// Returns the produced value, if any.
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Self::Value(entry) => Some(entry),
            _ => None,
        }
    }

    /// Returns true if this slot holds a failure-kind value.
    ///
    /// A typed absence of a failure type is not a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Value(entry) if entry.descriptor().is_failure())
    }
}

/// A single output position.
pub trait Produce {
    /// Returns the declared type of this output.
    fn descriptor() -> TypeDescriptor;

    /// Converts the output into a slot.
    fn into_slot(self) -> Slot;
}

impl<T: Value> Produce for T {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<T>()
    }

    fn into_slot(self) -> Slot {
        Slot::Value(Entry::new(self))
    }
}

impl<T: Value> Produce for Option<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::of::<T>()
    }

    fn into_slot(self) -> Slot {
        match self {
            Some(value) => Slot::Value(Entry::new(value)),
            None => Slot::TypedAbsent(TypeDescriptor::of::<T>()),
        }
    }
}

/// The full result of a callable.
pub trait Outputs {
    /// Returns the declared output types, in order.
    fn descriptors() -> Vec<TypeDescriptor>;

    /// Flattens the result into one slot per declared output.
    fn into_slots(self) -> Vec<Slot>;
}

impl Outputs for () {
    fn descriptors() -> Vec<TypeDescriptor> {
        Vec::new()
    }

    fn into_slots(self) -> Vec<Slot> {
        Vec::new()
    }
}

impl<T: Produce> Outputs for T {
    fn descriptors() -> Vec<TypeDescriptor> {
        vec![T::descriptor()]
    }

    fn into_slots(self) -> Vec<Slot> {
        vec![self.into_slot()]
    }
}

impl<T, E> Outputs for Result<T, E>
where
    T: Produce,
    E: Value + Failure,
{
    fn descriptors() -> Vec<TypeDescriptor> {
        vec![T::descriptor(), TypeDescriptor::of::<E>()]
    }

    fn into_slots(self) -> Vec<Slot> {
        match self {
            Ok(value) => vec![value.into_slot(), Slot::TypedAbsent(TypeDescriptor::of::<E>())],
            Err(err) => vec![Slot::TypedAbsent(T::descriptor()), Slot::Value(Entry::new(err))],
        }
    }
}

impl<E> Outputs for Result<(), E>
where
    E: Value + Failure,
{
    fn descriptors() -> Vec<TypeDescriptor> {
        vec![TypeDescriptor::of::<E>()]
    }

    fn into_slots(self) -> Vec<Slot> {
        match self {
            Ok(()) => vec![Slot::TypedAbsent(TypeDescriptor::of::<E>())],
            Err(err) => vec![Slot::Value(Entry::new(err))],
        }
    }
}

macro_rules! impl_outputs_for_tuple {
    ($($ty:ident),+) => {
        impl<$($ty: Produce),+> Outputs for ($($ty,)+) {
            fn descriptors() -> Vec<TypeDescriptor> {
                vec![$($ty::descriptor()),+]
            }

            #[allow(non_snake_case)]
            fn into_slots(self) -> Vec<Slot> {
                let ($($ty,)+) = self;
                vec![$($ty.into_slot()),+]
            }
        }
    };
}

impl_outputs_for_tuple!(A, B);
impl_outputs_for_tuple!(A, B, C);
impl_outputs_for_tuple!(A, B, C, D);
