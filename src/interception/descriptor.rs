//! Method Descriptor Module
//!
//! Static description of a cached method and a single call to it.

use std::any::{type_name, TypeId};
use std::fmt;

use crate::interception::KeyArg;

// == Return Shape ==
/// How a method hands back its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Nothing to cache
    Unit,
    /// Returned synchronously
    Value,
    /// Returned through a future
    Future,
}

// == Return Type ==
/// Declared return of a method: its shape plus the unwrapped result type.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ReturnType {
    shape: ReturnShape,
    type_id: TypeId,
    type_name: &'static str,
}

impl ReturnType {
    pub fn unit() -> Self {
        Self {
            shape: ReturnShape::Unit,
            type_id: TypeId::of::<()>(),
            type_name: type_name::<()>(),
        }
    }

    /// A method returning `T` directly.
    pub fn value<T: 'static>() -> Self {
        Self {
            shape: ReturnShape::Value,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// A method returning a future that resolves to `T`.
    pub fn future<T: 'static>() -> Self {
        Self {
            shape: ReturnShape::Future,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    pub fn shape(&self) -> ReturnShape {
        self.shape
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// True when the unwrapped result type is `T`.
    pub fn unwraps_to<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape {
            ReturnShape::Unit => write!(f, "()"),
            ReturnShape::Value => write!(f, "{}", self.type_name),
            ReturnShape::Future => write!(f, "impl Future<Output = {}>", self.type_name),
        }
    }
}

// == Method Descriptor ==
/// Identity and signature of a cacheable method.
///
/// Built once when a caching decorator is constructed and reused for
/// every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Name of the service the method belongs to
    pub declaring_type: &'static str,
    /// Method name
    pub name: &'static str,
    /// Formal parameter names in declaration order
    pub parameters: &'static [&'static str],
    /// Declared return
    pub returns: ReturnType,
}

impl MethodDescriptor {
    pub fn new(
        declaring_type: &'static str,
        name: &'static str,
        parameters: &'static [&'static str],
        returns: ReturnType,
    ) -> Self {
        Self {
            declaring_type,
            name,
            parameters,
            returns,
        }
    }

    /// Same declaring type, name and parameter list.
    pub fn same_method(&self, other: &MethodDescriptor) -> bool {
        self.declaring_type == other.declaring_type
            && self.name == other.name
            && self.parameters == other.parameters
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}({}) -> {:?}",
            self.declaring_type,
            self.name,
            self.parameters.join(", "),
            self.returns
        )
    }
}

// == Invocation ==
/// One call: the method plus its argument values in parameter order.
#[derive(Debug, Clone)]
pub struct Invocation<'a> {
    pub method: &'a MethodDescriptor,
    pub arguments: Vec<KeyArg>,
}

impl<'a> Invocation<'a> {
    pub fn new(method: &'a MethodDescriptor, arguments: Vec<KeyArg>) -> Self {
        Self { method, arguments }
    }
}
