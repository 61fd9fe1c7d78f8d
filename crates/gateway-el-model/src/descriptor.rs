//! Type, method and constructor descriptors

use gateway_el_types::{HostError, Value};
use std::fmt;
use std::sync::Arc;

/// Native implementation of an instance or static method.
///
/// Static methods receive the `Value::Type` they were called on as receiver.
pub type NativeMethod = Arc<dyn Fn(&Value, &[Value]) -> Result<Value, HostError> + Send + Sync>;

/// Native implementation of a constructor
pub type NativeConstructor = Arc<dyn Fn(&[Value]) -> Result<Value, HostError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
}

/// Identity of a method: declaring type, name and parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    pub declaring_type: String,
    pub name: String,
    pub params: Vec<String>,
    pub is_static: bool,
}

impl MethodSignature {
    pub fn new(declaring_type: impl Into<String>, name: impl Into<String>, params: &[&str]) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            params: params.iter().map(|p| (*p).to_string()).collect(),
            is_static: false,
        }
    }

    /// Last parameter is a `T...` rest parameter
    pub fn is_varargs(&self) -> bool {
        self.params.last().is_some_and(|p| p.ends_with("..."))
    }

    /// Same name and parameter list, ignoring the declaring type
    pub fn overrides(&self, other: &MethodSignature) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.declaring_type, self.name, self.params.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstructorSignature {
    pub declaring_type: String,
    pub params: Vec<String>,
}

impl ConstructorSignature {
    pub fn new(declaring_type: impl Into<String>, params: &[&str]) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            params: params.iter().map(|p| (*p).to_string()).collect(),
        }
    }
}

impl fmt::Display for ConstructorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "new {}({})", self.declaring_type, self.params.join(", "))
    }
}

#[derive(Clone)]
pub struct MethodDescriptor {
    pub signature: MethodSignature,
    /// `None` dispatches to [`HostObject::invoke`](gateway_el_types::HostObject::invoke)
    pub implementation: Option<NativeMethod>,
}

impl MethodDescriptor {
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> Result<Value, HostError> {
        if let Some(native) = &self.implementation {
            return native(receiver, args);
        }
        match receiver {
            Value::Object(object) => object.invoke(&self.signature.name, args),
            other => Err(HostError::Failed(format!(
                "{} is not supported on {} values",
                self.signature,
                other.type_name()
            ))),
        }
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("signature", &self.signature)
            .field("native", &self.implementation.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct ConstructorDescriptor {
    pub signature: ConstructorSignature,
    pub implementation: Option<NativeConstructor>,
}

impl ConstructorDescriptor {
    pub fn construct(&self, args: &[Value]) -> Result<Value, HostError> {
        match &self.implementation {
            Some(native) => native(args),
            None => Err(HostError::Failed(format!(
                "{} has no implementation",
                self.signature
            ))),
        }
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("signature", &self.signature)
            .field("native", &self.implementation.is_some())
            .finish()
    }
}

/// A host type: its place in the hierarchy and its declared members
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
    pub supertype: Option<String>,
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodDescriptor>,
    pub constructors: Vec<ConstructorDescriptor>,
}

impl TypeDescriptor {
    /// Class extending `java.lang.Object`
    pub fn class(name: impl Into<String>) -> Self {
        let name = name.into();
        let supertype = (name != gateway_el_types::type_names::OBJECT)
            .then(|| gateway_el_types::type_names::OBJECT.to_string());
        Self {
            name,
            kind: TypeKind::Class,
            supertype,
            interfaces: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Interface,
            supertype: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Instance method with a native implementation
    pub fn method<F>(mut self, name: &str, params: &[&str], implementation: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    {
        let signature = MethodSignature::new(self.name.clone(), name, params);
        self.methods.push(MethodDescriptor {
            signature,
            implementation: Some(Arc::new(implementation)),
        });
        self
    }

    pub fn static_method<F>(mut self, name: &str, params: &[&str], implementation: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    {
        let mut signature = MethodSignature::new(self.name.clone(), name, params);
        signature.is_static = true;
        self.methods.push(MethodDescriptor {
            signature,
            implementation: Some(Arc::new(implementation)),
        });
        self
    }

    /// Method implemented by the host object itself
    pub fn host_method(mut self, name: &str, params: &[&str]) -> Self {
        let signature = MethodSignature::new(self.name.clone(), name, params);
        self.methods.push(MethodDescriptor {
            signature,
            implementation: None,
        });
        self
    }

    pub fn constructor<F>(mut self, params: &[&str], implementation: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    {
        self.constructors.push(ConstructorDescriptor {
            signature: ConstructorSignature::new(self.name.clone(), params),
            implementation: Some(Arc::new(implementation)),
        });
        self
    }

    /// Method declared with exactly these parameter types
    pub fn declared_method(&self, name: &str, params: &[String]) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.signature.name == name && m.signature.params == params)
    }

    pub fn declared_constructor(&self, params: &[String]) -> Option<&ConstructorDescriptor> {
        self.constructors
            .iter()
            .find(|c| c.signature.params == params)
    }

    pub fn has_method_named(&self, name: &str) -> bool {
        self.methods.iter().any(|m| m.signature.name == name)
    }
}
