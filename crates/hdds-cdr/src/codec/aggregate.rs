// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structs and unions.
//!
//! A [`CdrAggregate`] exposes per-member dispatch; the drivers below walk the
//! members in the order the stream hands them out (declaration order, key-id
//! order, or header order for mutable input) and bracket every member with
//! `start_member`/`finish_member`.
//!
//! Unions are aggregates whose member 0 is the discriminator; branches that
//! are not selected report `is_present == false` and are skipped entirely.

use crate::error::Result;
use crate::props::{AggregateKind, EntityProperties};
use crate::stream::CdrStream;

/// Member-level glue of a struct or union, usually derived with
/// `#[derive(CdrType)]`.
pub trait CdrAggregate: Default {
    /// First member id free for a derived type (sequential id assignment).
    const NEXT_MEMBER_ID: u32 = 0;

    /// Unfinished property tree: root node plus one node per member.
    fn aggregate_props() -> EntityProperties;

    /// Whether the member holds a value worth emitting (optional members,
    /// union branches).
    fn is_present(&self, member_id: u32) -> bool {
        let _ = member_id;
        true
    }

    fn read_member<'b, S: CdrStream<'b>>(
        &mut self,
        stream: &mut S,
        prop: &EntityProperties,
    ) -> Result<()>;

    fn write_member<'b, S: CdrStream<'b>>(&self, stream: &mut S, prop: &EntityProperties)
        -> Result<()>;

    fn move_member<'b, S: CdrStream<'b>>(&self, stream: &mut S, prop: &EntityProperties)
        -> Result<()>;

    fn max_member<'b, S: CdrStream<'b>>(stream: &mut S, prop: &EntityProperties) -> Result<()>;
}

/// Whether a member should be emitted at all. Inactive union branches are
/// dropped without any framing; absent optionals still get theirs.
fn emitted<T: CdrAggregate>(value: &T, prop: &EntityProperties) -> (bool, bool) {
    let present = value.is_present(prop.member_id);
    (present || prop.is_optional, present)
}

pub fn read_aggregate<'b, T, S>(value: &mut T, stream: &mut S, props: &EntityProperties) -> Result<()>
where
    T: CdrAggregate,
    S: CdrStream<'b>,
{
    *value = T::default();
    stream.start_struct(props)?;
    let mut prop = stream.first_entity(props)?;
    while prop.is_valid() {
        let on_wire = stream.start_member(prop, true)?;
        // Union branches are selected by the discriminator read before them.
        if on_wire && (prop.is_optional || value.is_present(prop.member_id)) {
            value.read_member(stream, prop)?;
        }
        stream.finish_member(prop, on_wire)?;
        prop = stream.next_entity(props)?;
    }
    stream.finish_struct(props)
}

pub fn write_aggregate<'b, T, S>(value: &T, stream: &mut S, props: &EntityProperties) -> Result<()>
where
    T: CdrAggregate,
    S: CdrStream<'b>,
{
    stream.start_struct(props)?;
    let mut prop = stream.first_entity(props)?;
    while prop.is_valid() {
        let (emit, present) = emitted(value, prop);
        if emit {
            if stream.start_member(prop, present)? {
                value.write_member(stream, prop)?;
            }
            stream.finish_member(prop, present)?;
        }
        prop = stream.next_entity(props)?;
    }
    stream.finish_struct(props)
}

pub fn move_aggregate<'b, T, S>(value: &T, stream: &mut S, props: &EntityProperties) -> Result<()>
where
    T: CdrAggregate,
    S: CdrStream<'b>,
{
    stream.start_struct(props)?;
    let mut prop = stream.first_entity(props)?;
    while prop.is_valid() {
        let (emit, present) = emitted(value, prop);
        if emit {
            if stream.start_member(prop, present)? {
                value.move_member(stream, prop)?;
            }
            stream.finish_member(prop, present)?;
        }
        prop = stream.next_entity(props)?;
    }
    stream.finish_struct(props)
}

fn max_one<'b, T, S>(stream: &mut S, prop: &EntityProperties) -> Result<()>
where
    T: CdrAggregate,
    S: CdrStream<'b>,
{
    if stream.start_member(prop, true)? {
        T::max_member(stream, prop)?;
    }
    stream.finish_member(prop, true)
}

/// Worst case over all members; for unions the discriminator plus the
/// largest branch.
pub fn max_aggregate<'b, T, S>(stream: &mut S, props: &EntityProperties) -> Result<()>
where
    T: CdrAggregate,
    S: CdrStream<'b>,
{
    stream.start_struct(props)?;
    let mut prop = stream.first_entity(props)?;
    if props.kind == AggregateKind::Union && !stream.is_key() {
        if prop.is_valid() {
            max_one::<T, S>(stream, prop)?;
            prop = stream.next_entity(props)?;
        }
        let base = stream.position();
        let alignment = stream.alignment();
        let mut worst = (base, alignment);
        while prop.is_valid() {
            stream.set_position(base);
            stream.set_alignment(alignment);
            max_one::<T, S>(stream, prop)?;
            if stream.position() > worst.0 {
                worst = (stream.position(), stream.alignment());
            }
            prop = stream.next_entity(props)?;
        }
        stream.set_position(worst.0);
        stream.set_alignment(worst.1);
    } else {
        while prop.is_valid() {
            max_one::<T, S>(stream, prop)?;
            if stream.position() == usize::MAX {
                break;
            }
            prop = stream.next_entity(props)?;
        }
    }
    stream.finish_struct(props)
}
