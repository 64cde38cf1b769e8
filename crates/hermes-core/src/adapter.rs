//! Stage adapters.
//!
//! An adapter wraps one [`Callable`] whose signature was validated for its
//! stage when the adapter was built. At request time it resolves the
//! callable's inputs from the broker, invokes it, stores every output back
//! into the broker and reports what the pipeline controller needs to know.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::broker::Broker;
use crate::callable::Callable;
use crate::descriptor::{Signature, Stage};
use crate::error::SignatureError;
use crate::output::Slot;
use crate::response::StructuredResponse;
use crate::value::Entry;

trait Invoke: Send + Sync {
    fn invoke(&self, broker: &mut Broker) -> Result<Vec<Slot>, Entry>;
}

struct Bound<F, Args> {
    callable: F,
    _args: PhantomData<fn() -> Args>,
}

impl<F, Args> Invoke for Bound<F, Args>
where
    F: Callable<Args>,
    Args: 'static,
{
    fn invoke(&self, broker: &mut Broker) -> Result<Vec<Slot>, Entry> {
        self.callable.call(broker)
    }
}

#[derive(Clone)]
struct Adapter {
    stage: Stage,
    name: &'static str,
    signature: Signature,
    invoke: Arc<dyn Invoke>,
}

impl Adapter {
    fn new<F, Args>(stage: Stage, callable: F) -> Result<Self, SignatureError>
    where
        F: Callable<Args>,
        Args: 'static,
    {
        let signature = F::signature();
        signature.validate(stage)?;
        Ok(Self {
            stage,
            name: std::any::type_name::<F>(),
            signature,
            invoke: Arc::new(Bound {
                callable,
                _args: PhantomData,
            }),
        })
    }

    fn invoke(&self, broker: &mut Broker) -> Result<Vec<Slot>, Entry> {
        tracing::trace!(stage = %self.stage, callable = self.name, "invoking");
        self.invoke.invoke(broker)
    }
}

impl std::fmt::Debug for Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("stage", &self.stage)
            .field("callable", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

/// What a pre-check decided.
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Proceed to the next stage.
    Continue,
    /// Stop with a failure.
    Fail(Entry),
    /// Stop with a ready response that is not a failure.
    Respond(Entry),
}

impl Verdict {
    /// Returns true if the pipeline should short-circuit.
    pub fn is_stop(&self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// A stage run before the main handler, able to stop the request.
#[derive(Debug, Clone)]
pub struct PreCheck {
    adapter: Adapter,
}

impl PreCheck {
    /// Wraps a callable, rejecting signatures that take the response.
    pub fn new<F, Args>(callable: F) -> Result<Self, SignatureError>
    where
        F: Callable<Args>,
        Args: 'static,
    {
        Adapter::new(Stage::PreCheck, callable).map(|adapter| Self { adapter })
    }

    /// Returns the callable's signature.
    pub fn signature(&self) -> &Signature {
        &self.adapter.signature
    }

    /// Runs the pre-check.
    ///
    /// A failure-kind value in the last output position fails the request.
    /// Otherwise a non-failure structured response among the outputs answers
    /// it early. Typed absences never stop the pipeline.
    pub fn run(&self, broker: &mut Broker) -> Verdict {
        let slots = match self.adapter.invoke(broker) {
            Ok(slots) => slots,
            Err(failure) => return Verdict::Fail(failure),
        };

        let failure = slots
            .last()
            .filter(|slot| slot.is_failure())
            .and_then(Slot::entry)
            .cloned();
        let early = slots
            .iter()
            .filter_map(Slot::entry)
            .find(|entry| {
                !entry.descriptor().is_failure()
                    && entry.view::<dyn StructuredResponse>().is_some()
            })
            .cloned();

        for slot in slots {
            broker.provide(slot);
        }

        match (failure, early) {
            (Some(failure), _) => Verdict::Fail(failure),
            (None, Some(response)) => Verdict::Respond(response),
            (None, None) => Verdict::Continue,
        }
    }
}

/// The main handler of a pipeline.
#[derive(Debug, Clone)]
pub struct MainHandler {
    adapter: Adapter,
}

impl MainHandler {
    /// Wraps a callable, rejecting signatures that take the response.
    pub fn new<F, Args>(callable: F) -> Result<Self, SignatureError>
    where
        F: Callable<Args>,
        Args: 'static,
    {
        Adapter::new(Stage::Main, callable).map(|adapter| Self { adapter })
    }

    /// Returns the callable's signature.
    pub fn signature(&self) -> &Signature {
        &self.adapter.signature
    }

    /// Runs the handler and returns the response value.
    ///
    /// The response is the first output when it holds a value that is not
    /// failure-kind. A handler that fails, or whose inputs cannot be
    /// resolved, produces no response.
    pub fn run(&self, broker: &mut Broker) -> Option<Entry> {
        let slots = match self.adapter.invoke(broker) {
            Ok(slots) => slots,
            Err(failure) => {
                tracing::debug!(failure = failure.type_name(), "main handler inputs unresolved");
                return None;
            }
        };

        let response = slots
            .first()
            .filter(|slot| !slot.is_failure())
            .and_then(Slot::entry)
            .cloned();

        for slot in slots {
            broker.provide(slot);
        }
        response
    }
}

/// A stage that always runs once per request, after everything else.
#[derive(Debug, Clone)]
pub struct Finalizer {
    adapter: Adapter,
}

impl Finalizer {
    /// Wraps a callable. Finalizers may take the response once.
    pub fn new<F, Args>(callable: F) -> Result<Self, SignatureError>
    where
        F: Callable<Args>,
        Args: 'static,
    {
        Adapter::new(Stage::Finalizer, callable).map(|adapter| Self { adapter })
    }

    /// Returns the callable's signature.
    pub fn signature(&self) -> &Signature {
        &self.adapter.signature
    }

    /// Runs the finalizer, storing its outputs.
    ///
    /// A finalizer whose inputs cannot be resolved is skipped.
    pub fn run(&self, broker: &mut Broker) {
        match self.adapter.invoke(broker) {
            Ok(slots) => {
                for slot in slots {
                    broker.provide(slot);
                }
            }
            Err(failure) => {
                tracing::warn!(
                    callable = self.adapter.name,
                    failure = failure.type_name(),
                    "skipping finalizer with unresolved inputs"
                );
            }
        }
    }
}
