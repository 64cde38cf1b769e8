//! Plain functions as pipeline stages.
//!
//! Any `Fn` of up to eight [`Param`]s returning [`Outputs`] is a
//! [`Callable`]. Its [`Signature`] is derived from the parameter and return
//! types, and calling it resolves every parameter from the broker left to
//! right before invoking the function.

use crate::broker::Broker;
use crate::descriptor::Signature;
use crate::output::{Outputs, Slot};
use crate::param::{Demand, Param};
use crate::value::Entry;

/// A function whose inputs are resolved from a [`Broker`].
///
/// `Args` is the tuple of parameter types; it only exists to keep the
/// implementations for different arities apart.
pub trait Callable<Args>: Send + Sync + 'static {
    /// Returns the ordered input and output descriptors.
    fn signature() -> Signature;

    /// Resolves the inputs, invokes the function and returns its output slots.
    ///
    /// Fails with the failure entry of the first input that could not be
    /// resolved. That entry is already stored in the broker.
    fn call(&self, broker: &mut Broker) -> Result<Vec<Slot>, Entry>;
}

fn extract<P: Param>(broker: &mut Broker, resolved: Option<Entry>) -> Result<P, Entry> {
    P::from_resolved(resolved).map_err(|failure| {
        broker.provide_entry(failure.clone());
        failure
    })
}

macro_rules! impl_callable {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Callable<($($arg,)*)> for F
        where
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: Outputs,
            $($arg: Param,)*
        {
            fn signature() -> Signature {
                Signature {
                    inputs: vec![$(<$arg as Param>::demand().descriptor),*],
                    outputs: R::descriptors(),
                }
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call(&self, broker: &mut Broker) -> Result<Vec<Slot>, Entry> {
                let demands: Vec<Demand> = vec![$(<$arg as Param>::demand()),*];
                let mut resolved = broker.resolve_all(&demands)?.into_iter();
                $(let $arg = extract::<$arg>(broker, resolved.next().flatten())?;)*
                Ok((self)($($arg),*).into_slots())
            }
        }
    };
}

impl_callable!();
impl_callable!(A1);
impl_callable!(A1, A2);
impl_callable!(A1, A2, A3);
impl_callable!(A1, A2, A3, A4);
impl_callable!(A1, A2, A3, A4, A5);
impl_callable!(A1, A2, A3, A4, A5, A6);
impl_callable!(A1, A2, A3, A4, A5, A6, A7);
impl_callable!(A1, A2, A3, A4, A5, A6, A7, A8);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::param::{Response, Shared};
    use crate::resource::zero_constructor;
    use crate::response::HttpError;
    use crate::transport::{Request, ResponseWriter};

    struct Meta(u32);
    crate::value!(Meta);

    impl Meta {
        fn value(&self) -> u32 {
            self.0
        }
    }

    fn signature_of<F: Callable<Args>, Args>(_: &F) -> Signature {
        F::signature()
    }

    fn call<F: Callable<Args>, Args>(callable: &F, broker: &mut Broker) -> Result<Vec<Slot>, Entry> {
        callable.call(broker)
    }

    fn broker() -> Broker {
        let request = Request::from_http(http::Request::new(bytes::Bytes::new()));
        Broker::new(ResponseWriter::new(), request, zero_constructor())
    }

    #[test]
    fn test_signature_follows_declaration_order() {
        let handler = |_: Request, _: Shared<Meta>| -> Result<Meta, HttpError> { Ok(Meta(0)) };
        let signature = signature_of(&handler);
        assert_eq!(
            signature.inputs,
            vec![TypeDescriptor::of::<Request>(), TypeDescriptor::of::<Meta>()]
        );
        assert_eq!(
            signature.outputs,
            vec![TypeDescriptor::of::<Meta>(), TypeDescriptor::of::<HttpError>()]
        );
    }

    #[test]
    fn test_open_input_in_signature() {
        let finalize = |_: Response| {};
        assert!(signature_of(&finalize).inputs[0].is_open());
    }

    #[test]
    fn test_call_resolves_stored_values() {
        let mut broker = broker();
        broker.provide_value(Meta(20));
        let double = |meta: Shared<Meta>| Meta(meta.value() * 2);

        let slots = call(&double, &mut broker).unwrap();
        let meta = slots[0].entry().and_then(Entry::downcast::<Meta>).unwrap();
        assert_eq!(meta.0, 40);
    }

    #[test]
    fn test_call_stops_at_unresolved_input() {
        let mut broker = broker();
        let handler = |_: Shared<Meta>| -> Option<HttpError> { None };
        let failure = call(&handler, &mut broker).unwrap_err();
        assert!(failure.descriptor().is_failure());
    }

    #[test]
    fn test_nullary_callable() {
        let mut broker = broker();
        let noop = || {};
        assert!(call(&noop, &mut broker).unwrap().is_empty());
        assert!(signature_of(&noop).inputs.is_empty());
    }
}
