//! Dynamic values of the reference interpreter

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::generator::Generator;
use super::ExecResult;
use crate::lir::{CallableId, Constant};

/// Shared, mutable heap object
pub type ObjectRef = Rc<RefCell<Object>>;

/// A scope record: named fields of one lexical scope instance
pub type Record = Rc<RefCell<FxHashMap<String, Value>>>;

/// Ancestor records a closure was created with, outermost first. `None`
/// marks slots the callee never reads.
pub type Chain = Rc<Vec<Option<Record>>>;

/// Native function callable from guest code
pub type HostFn = Rc<dyn Fn(&[Value]) -> ExecResult<Value>>;

pub(crate) fn new_record() -> Record {
    Rc::new(RefCell::new(FxHashMap::default()))
}

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub(crate) fn object(kind: ObjectKind) -> Self {
        Value::Object(Rc::new(RefCell::new(Object::new(kind))))
    }

    pub fn from_constant(constant: &Constant) -> Self {
        match constant {
            Constant::Undefined => Value::Undefined,
            Constant::Null => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Number(n) => Value::Number(*n),
            Constant::String(s) => Value::string(s),
        }
    }

    /// New array holding `elements`
    pub fn array(elements: Vec<Value>) -> Self {
        Value::object(ObjectKind::Array(elements))
    }

    /// New plain object with the given properties
    pub fn plain(properties: Vec<(&str, Value)>) -> Self {
        let value = Value::object(ObjectKind::Plain);
        if let Value::Object(object) = &value {
            let mut object = object.borrow_mut();
            for (name, property) in properties {
                object.set(name, property);
            }
        }
        value
    }

    /// `{ value, done }` as produced by iterator protocols
    pub fn iter_result(value: Value, done: bool) -> Self {
        Value::plain(vec![("value", value), ("done", Value::Bool(done))])
    }

    pub fn host(function: impl Fn(&[Value]) -> ExecResult<Value> + 'static) -> Self {
        Value::object(ObjectKind::Host(Rc::new(function)))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Object(_) => f64::NAN,
        }
    }

    pub fn to_int32(&self) -> i32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        (n.trunc() as i64) as i32
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(object) => match object.borrow().kind {
                ObjectKind::Function(_) | ObjectKind::Class(_) | ObjectKind::Host(_) => "function",
                _ => "object",
            },
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==` for primitives; objects compare by identity
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Object(_), _) | (_, Value::Object(_)) => self.strict_equals(other),
            (Value::String(a), Value::String(b)) => a == b,
            _ => self.to_number() == other.to_number(),
        }
    }

    /// Property read; arrays and strings expose `length`, instances fall
    /// back to their class methods
    pub fn get_property(&self, name: &str) -> Value {
        match self {
            Value::String(s) if name == "length" => Value::Number(s.chars().count() as f64),
            Value::Object(object) => {
                let found = object.borrow().get(name);
                if !found.is_undefined() {
                    return found;
                }
                match object.borrow().method(name) {
                    Some(callable) => Value::object(ObjectKind::BoundMethod {
                        receiver: self.clone(),
                        callable,
                    }),
                    None => Value::Undefined,
                }
            }
            _ => Value::Undefined,
        }
    }
}

/// Number formatting as guest code observes it
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(object) => {
                let object = object.borrow();
                match &object.kind {
                    ObjectKind::Array(elements) => {
                        for (index, element) in elements.iter().enumerate() {
                            if index > 0 {
                                write!(f, ",")?;
                            }
                            match element {
                                Value::Undefined | Value::Null => {}
                                other => write!(f, "{}", other)?,
                            }
                        }
                        Ok(())
                    }
                    ObjectKind::Function(_) | ObjectKind::Host(_) => write!(f, "function"),
                    ObjectKind::Class(class) => write!(f, "class {}", class.name),
                    ObjectKind::Promise(_) => write!(f, "[object Promise]"),
                    ObjectKind::Generator(_) => write!(f, "[object Generator]"),
                    _ => write!(f, "[object Object]"),
                }
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

/// A guest closure
#[derive(Clone)]
pub struct Closure {
    pub callable: CallableId,
    pub chain: Chain,
}

/// A class value created by `MakeClass`
pub struct ClassInfo {
    pub name: String,
    pub constructor: CallableId,
    pub methods: FxHashMap<String, CallableId>,
    /// Chain handed to the constructor
    pub chain: Chain,
}

/// Settled promise. Nothing in the interpreter is ever pending: async
/// callables run to completion before their promise is handed out.
#[derive(Clone)]
pub enum PromiseState {
    Fulfilled(Value),
    Rejected(Value),
}

pub enum ObjectKind {
    Plain,
    Array(Vec<Value>),
    Function(Closure),
    Class(ClassInfo),
    Instance {
        class: ObjectRef,
        /// Chain stashed by a constructor for its instance methods
        scopes: Option<Chain>,
    },
    /// Instance method looked up on a receiver, bound to it
    BoundMethod { receiver: Value, callable: CallableId },
    Host(HostFn),
    ArrayIterator { array: Value, index: usize },
    Generator(Generator),
    Promise(PromiseState),
}

pub struct Object {
    pub kind: ObjectKind,
    pub properties: FxHashMap<String, Value>,
    /// Property names in insertion order
    order: Vec<String>,
}

impl Object {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            properties: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Value {
        if let Some(value) = self.properties.get(name) {
            return value.clone();
        }
        match &self.kind {
            ObjectKind::Array(elements) if name == "length" => {
                Value::Number(elements.len() as f64)
            }
            ObjectKind::Class(class) if name == "name" => Value::string(&class.name),
            _ => Value::Undefined,
        }
    }

    /// Instance method of the object's class
    pub fn method(&self, name: &str) -> Option<CallableId> {
        let ObjectKind::Instance { class, .. } = &self.kind else {
            return None;
        };
        let class = class.borrow();
        match &class.kind {
            ObjectKind::Class(info) => info.methods.get(name).copied(),
            _ => None,
        }
    }

    pub fn set(&mut self, name: &str, value: Value) {
        if let ObjectKind::Array(elements) = &mut self.kind {
            if name == "length" {
                let len = value.to_number();
                if len >= 0.0 {
                    elements.resize(len as usize, Value::Undefined);
                }
                return;
            }
        }
        if self.properties.insert(name.to_string(), value).is_none() {
            self.order.push(name.to_string());
        }
    }

    /// Enumerable own keys as `for-in` visits them: array indices first,
    /// then named properties in insertion order
    pub fn keys(&self) -> Vec<String> {
        let mut keys = match &self.kind {
            ObjectKind::Array(elements) => (0..elements.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        };
        keys.extend(self.order.iter().cloned());
        keys
    }
}
