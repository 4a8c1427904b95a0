//! Member accessors: how a mapper reaches into a value.
//!
//! An [`Accessor`] never owns the enclosing object. It knows how to read a component
//! from a borrowed value and how to write a freshly decoded component back into one.
//!
//! - [`Member`] reaches a data member directly. Build one with [`member!`](crate::member).
//! - [`Property`] goes through a getter/setter pair, either by reference or by value.
//!   Build one with [`property!`](crate::property).
//!
//! Every accessor carries a [`MemberKey`]: the accessor kind, the component type and
//! the member (or getter) identifier. Mapper lookups compare keys, so a filter can only
//! name a field the mapper actually registered for that exact member.

use std::{
    any::{TypeId, type_name},
    fmt,
};

/// How an accessor reaches its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    /// A data member, read and written in place.
    Direct,
    /// A getter/setter pair.
    Property,
}

/// Identity token of an accessor.
///
/// Two accessors are the same member when their kind, component type and path agree.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberKey {
    kind: AccessorKind,
    component: TypeId,
    component_name: &'static str,
    path: &'static str,
}

impl MemberKey {
    fn of<U: 'static>(kind: AccessorKind, path: &'static str) -> Self {
        Self {
            kind,
            component: TypeId::of::<U>(),
            component_name: type_name::<U>(),
            path,
        }
    }

    /// Whether the accessor reaches a member directly or through getter and setter.
    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    /// The member or getter identifier.
    pub fn path(&self) -> &'static str {
        self.path
    }
}

impl fmt::Debug for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberKey")
            .field("kind", &self.kind)
            .field("component", &self.component_name)
            .field("path", &self.path)
            .finish()
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AccessorKind::Direct => write!(f, "member `{}: {}`", self.path, self.component_name),
            AccessorKind::Property => write!(f, "property `{}() -> {}`", self.path, self.component_name),
        }
    }
}

/// Reads and writes one component of a `T`.
pub trait Accessor<T>: Clone + Send + Sync + 'static {
    /// The component type.
    type Value: 'static;

    /// The identity used for mapper lookups.
    fn key(&self) -> MemberKey;

    /// Runs `f` against the component of `target`.
    fn read<R>(&self, target: &T, f: impl FnOnce(&Self::Value) -> R) -> R;

    /// Stores `value` as the component of `target`.
    fn write(&self, target: &mut T, value: Self::Value);
}

/// Direct access to a data member of `T`.
pub struct Member<T, U> {
    path: &'static str,
    get: fn(&T) -> &U,
    get_mut: fn(&mut T) -> &mut U,
}

impl<T, U> Member<T, U> {
    /// Creates a direct accessor.
    ///
    /// `path` is the identity of the member and must name the member `get` and
    /// `get_mut` reach. Prefer [`member!`](crate::member), which derives all three
    /// from the same identifier.
    pub fn new(path: &'static str, get: fn(&T) -> &U, get_mut: fn(&mut T) -> &mut U) -> Self {
        Self { path, get, get_mut }
    }

    /// Borrows the member of `target`.
    pub fn get<'t>(&self, target: &'t T) -> &'t U {
        (self.get)(target)
    }

    /// Mutably borrows the member of `target`.
    pub fn get_mut<'t>(&self, target: &'t mut T) -> &'t mut U {
        (self.get_mut)(target)
    }
}

impl<T, U> Clone for Member<T, U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, U> Copy for Member<T, U> {}

impl<T, U> fmt::Debug for Member<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member").field("path", &self.path).finish()
    }
}

impl<T: 'static, U: 'static> Accessor<T> for Member<T, U> {
    type Value = U;

    fn key(&self) -> MemberKey {
        MemberKey::of::<U>(AccessorKind::Direct, self.path)
    }

    fn read<R>(&self, target: &T, f: impl FnOnce(&U) -> R) -> R {
        f(self.get(target))
    }

    fn write(&self, target: &mut T, value: U) {
        *self.get_mut(target) = value;
    }
}

enum PropertyShape<T, U> {
    ByRef {
        get: fn(&T) -> &U,
        set: fn(&mut T, &U),
    },
    ByValue {
        get: fn(&T) -> U,
        set: fn(&mut T, U),
    },
}

impl<T, U> Clone for PropertyShape<T, U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, U> Copy for PropertyShape<T, U> {}

/// Access to a component of `T` through a getter/setter pair.
pub struct Property<T, U> {
    path: &'static str,
    shape: PropertyShape<T, U>,
}

impl<T, U> Property<T, U> {
    /// A getter returning a reference and a setter taking one.
    pub fn by_ref(path: &'static str, get: fn(&T) -> &U, set: fn(&mut T, &U)) -> Self {
        Self { path, shape: PropertyShape::ByRef { get, set } }
    }

    /// A getter returning a value and a setter consuming one.
    pub fn by_value(path: &'static str, get: fn(&T) -> U, set: fn(&mut T, U)) -> Self {
        Self { path, shape: PropertyShape::ByValue { get, set } }
    }
}

impl<T, U> Clone for Property<T, U> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, U> Copy for Property<T, U> {}

impl<T, U> fmt::Debug for Property<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self.shape {
            PropertyShape::ByRef { .. } => "by_ref",
            PropertyShape::ByValue { .. } => "by_value",
        };

        f.debug_struct("Property")
            .field("path", &self.path)
            .field("shape", &shape)
            .finish()
    }
}

impl<T: 'static, U: 'static> Accessor<T> for Property<T, U> {
    type Value = U;

    fn key(&self) -> MemberKey {
        MemberKey::of::<U>(AccessorKind::Property, self.path)
    }

    fn read<R>(&self, target: &T, f: impl FnOnce(&U) -> R) -> R {
        match self.shape {
            PropertyShape::ByRef { get, .. } => f(get(target)),
            PropertyShape::ByValue { get, .. } => f(&get(target)),
        }
    }

    fn write(&self, target: &mut T, value: U) {
        match self.shape {
            PropertyShape::ByRef { set, .. } => set(target, &value),
            PropertyShape::ByValue { set, .. } => set(target, value),
        }
    }
}

/// Builds a [`Member`] accessor for a named data member.
///
/// ```ignore
/// let age = member!(Person, age);
/// ```
#[macro_export]
macro_rules! member {
    ($ty:ty, $field:ident) => {
        $crate::accessor::Member::<$ty, _>::new(
            stringify!($field),
            |target: &$ty| &target.$field,
            |target: &mut $ty| &mut target.$field,
        )
    };
}

/// Builds a [`Property`] accessor from a getter and a setter method.
///
/// `property!(T, getter, setter)` uses by-value methods (`fn(&T) -> U`,
/// `fn(&mut T, U)`); `property!(T, ref getter, setter)` uses by-reference methods
/// (`fn(&T) -> &U`, `fn(&mut T, &U)`). The getter name is the identity.
#[macro_export]
macro_rules! property {
    ($ty:ty, ref $getter:ident, $setter:ident) => {
        $crate::accessor::Property::<$ty, _>::by_ref(stringify!($getter), <$ty>::$getter, <$ty>::$setter)
    };
    ($ty:ty, $getter:ident, $setter:ident) => {
        $crate::accessor::Property::<$ty, _>::by_value(stringify!($getter), <$ty>::$getter, <$ty>::$setter)
    };
}
