// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Optional (`Option<T>`) and indirected (`Box<T>`, [`External<T>`]) values.
//!
//! Presence framing of optional members belongs to the stream
//! (`start_member`); these impls only (de)serialize the held value.

use super::CdrValue;
use crate::error::{Fault, Result};
use crate::props::EntityProperties;
use crate::stream::CdrStream;

impl<T: CdrValue + Default> CdrValue for Option<T> {
    const IS_PRIMITIVE: bool = T::IS_PRIMITIVE;

    fn type_props() -> EntityProperties {
        T::type_props()
    }

    fn read_cdr<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        self.get_or_insert_with(T::default)
            .read_cdr(stream, props, bounds)
    }

    fn write_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        match self {
            Some(value) => value.write_cdr(stream, props, bounds),
            None => stream.ensure_usable(),
        }
    }

    fn move_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        match self {
            Some(value) => value.move_cdr(stream, props, bounds),
            None => stream.ensure_usable(),
        }
    }

    fn max_cdr<'b, S: CdrStream<'b>>(
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        T::max_cdr(stream, props, bounds)
    }
}

impl<T: CdrValue> CdrValue for Box<T> {
    const IS_PRIMITIVE: bool = T::IS_PRIMITIVE;

    fn type_props() -> EntityProperties {
        T::type_props()
    }

    fn read_cdr<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        (**self).read_cdr(stream, props, bounds)
    }

    fn write_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        (**self).write_cdr(stream, props, bounds)
    }

    fn move_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        (**self).move_cdr(stream, props, bounds)
    }

    fn max_cdr<'b, S: CdrStream<'b>>(
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        T::max_cdr(stream, props, bounds)
    }
}

/// Heap-indirected member (`@external`) that may be unset.
///
/// Reading allocates on demand. Writing an unset non-optional external is an
/// `ILLEGAL_FIELD_VALUE` fault: the wire has no way to express it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct External<T>(Option<Box<T>>);

impl<T> Default for External<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T> External<T> {
    pub fn new(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.0.as_deref_mut()
    }

    pub fn set(&mut self, value: T) {
        self.0 = Some(Box::new(value));
    }

    pub fn take(&mut self) -> Option<T> {
        self.0.take().map(|boxed| *boxed)
    }
}

impl<T> From<T> for External<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: CdrValue> External<T> {
    fn require_set<'b, S: CdrStream<'b>>(&self, stream: &mut S) -> Result<Option<&T>> {
        match self.get() {
            Some(value) => Ok(Some(value)),
            None => {
                log::debug!("[cdr] unset external member");
                stream.raise(Fault::ILLEGAL_FIELD_VALUE)?;
                Ok(None)
            }
        }
    }
}

impl<T: CdrValue + Default> CdrValue for External<T> {
    const IS_PRIMITIVE: bool = T::IS_PRIMITIVE;

    fn type_props() -> EntityProperties {
        T::type_props()
    }

    fn read_cdr<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        self.0
            .get_or_insert_with(Box::default)
            .read_cdr(stream, props, bounds)
    }

    fn write_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        match self.require_set(stream)? {
            Some(value) => value.write_cdr(stream, props, bounds),
            None => Ok(()),
        }
    }

    fn move_cdr<'b, S: CdrStream<'b>>(
        &self,
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        match self.require_set(stream)? {
            Some(value) => value.move_cdr(stream, props, bounds),
            None => Ok(()),
        }
    }

    fn max_cdr<'b, S: CdrStream<'b>>(
        stream: &mut S,
        props: &EntityProperties,
        bounds: &[u32],
    ) -> Result<()> {
        T::max_cdr(stream, props, bounds)
    }
}
