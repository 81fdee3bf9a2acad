// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entity properties: the per-type wire layout metadata tree.
//!
//! One [`EntityProperties`] node exists per member, plus a root node per type.
//! Aggregate nodes carry four member lists:
//!
//! - members in declaration order (writing, positional reading)
//! - members in member-id order (header lookup when reading mutable data)
//! - key members in declaration order
//! - key members in member-id order (key-only projection)
//!
//! Every list is terminated by a sentinel node with `is_last == true`. Trees
//! are built by the per-type glue, [`finish`](EntityProperties::finish)ed once
//! and then shared read-only through [`get_type_props`].

mod cache;

pub use cache::get_type_props;

use std::cmp::Ordering;

use crate::codec::CdrValue;

/// Type extensibility (XTypes v1.3 Sec.7.2.2.4.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Extensibility {
    #[default]
    Final,
    Appendable,
    Mutable,
}

/// Smallest integer width able to hold an enum/bitmask/primitive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitBound {
    #[default]
    Unset,
    Bits8,
    Bits16,
    Bits32,
    Bits64,
}

impl BitBound {
    /// Bit bound matching a primitive of `bytes` bytes.
    pub const fn from_size(bytes: usize) -> Self {
        match bytes {
            1 => BitBound::Bits8,
            2 => BitBound::Bits16,
            4 => BitBound::Bits32,
            8 => BitBound::Bits64,
            _ => BitBound::Unset,
        }
    }

    /// Smallest of 8/16/32/64 bits that holds `bits` bits.
    pub const fn from_bits(bits: u32) -> Self {
        match bits {
            0 => BitBound::Unset,
            1..=8 => BitBound::Bits8,
            9..=16 => BitBound::Bits16,
            17..=32 => BitBound::Bits32,
            _ => BitBound::Bits64,
        }
    }

    /// Width in bytes (0 when unset).
    pub const fn bytes(self) -> usize {
        match self {
            BitBound::Unset => 0,
            BitBound::Bits8 => 1,
            BitBound::Bits16 => 2,
            BitBound::Bits32 => 4,
            BitBound::Bits64 => 8,
        }
    }
}

/// What kind of node this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AggregateKind {
    /// Primitive, enum, string or collection of those.
    #[default]
    Leaf,
    Struct,
    Union,
}

/// Wire identity and nesting of one member (or of a type's root).
#[derive(Debug, Clone, PartialEq)]
pub struct EntityProperties {
    /// Member id, unique within the parent's member set (0 for roots).
    pub member_id: u32,
    pub is_optional: bool,
    /// Reader must fail the enclosing struct if it cannot match this member.
    pub must_understand: bool,
    pub is_key: bool,
    /// List terminator.
    pub is_last: bool,
    /// Fixed-size primitive/enum leaf (selects implied-length XCDR2 headers).
    pub is_primitive: bool,
    /// Own extensibility.
    pub e_ext: Extensibility,
    /// Extensibility of the enclosing aggregate.
    pub p_ext: Extensibility,
    pub bit_bound: BitBound,
    pub kind: AggregateKind,
    members_by_seq: Vec<EntityProperties>,
    members_by_id: Vec<EntityProperties>,
    keys_by_seq: Vec<EntityProperties>,
    keys_by_id: Vec<EntityProperties>,
}

/// Terminator handed out when a list is empty or was never finished.
static TERMINATOR: EntityProperties = EntityProperties::sentinel(Extensibility::Final);

impl Default for EntityProperties {
    fn default() -> Self {
        Self::leaf()
    }
}

impl EntityProperties {
    const fn blank(kind: AggregateKind, ext: Extensibility) -> Self {
        Self {
            member_id: 0,
            is_optional: false,
            must_understand: false,
            is_key: false,
            is_last: false,
            is_primitive: false,
            e_ext: ext,
            p_ext: Extensibility::Final,
            bit_bound: BitBound::Unset,
            kind,
            members_by_seq: Vec::new(),
            members_by_id: Vec::new(),
            keys_by_seq: Vec::new(),
            keys_by_id: Vec::new(),
        }
    }

    /// Node for a leaf without a fixed wire width (strings, collections).
    pub const fn leaf() -> Self {
        Self::blank(AggregateKind::Leaf, Extensibility::Final)
    }

    /// Node for a fixed-width primitive or enum.
    pub const fn primitive(bit_bound: BitBound) -> Self {
        let mut props = Self::blank(AggregateKind::Leaf, Extensibility::Final);
        props.is_primitive = true;
        props.bit_bound = bit_bound;
        props
    }

    /// Root node of a struct or union.
    pub const fn aggregate(kind: AggregateKind, ext: Extensibility) -> Self {
        Self::blank(kind, ext)
    }

    /// List terminator.
    pub const fn sentinel(p_ext: Extensibility) -> Self {
        let mut props = Self::blank(AggregateKind::Leaf, Extensibility::Final);
        props.is_last = true;
        props.p_ext = p_ext;
        props
    }

    /// Loop condition for list traversal: `false` on the terminator.
    pub const fn is_valid(&self) -> bool {
        !self.is_last
    }

    pub const fn is_aggregate(&self) -> bool {
        !matches!(self.kind, AggregateKind::Leaf)
    }

    /// Set wire identity while building. Not meant to be used after `finish`.
    pub fn set_member_props(&mut self, member_id: u32, is_optional: bool) {
        self.member_id = member_id;
        self.is_optional = is_optional;
    }

    pub fn with_member_props(mut self, member_id: u32, is_optional: bool) -> Self {
        self.set_member_props(member_id, is_optional);
        self
    }

    pub fn key(mut self, is_key: bool) -> Self {
        self.is_key = is_key;
        self
    }

    pub fn must_understand(mut self, must_understand: bool) -> Self {
        self.must_understand = must_understand;
        self
    }

    /// Append a member in declaration order.
    pub fn push_member(&mut self, mut member: EntityProperties) {
        member.p_ext = self.e_ext;
        self.members_by_seq.retain(|m| !m.is_last);
        self.members_by_seq.push(member);
    }

    /// Flatten the members (and key flags) of a base type in front of the
    /// members declared so far.
    pub fn append_base(&mut self, base: &EntityProperties) {
        let own: Vec<EntityProperties> = self
            .members_by_seq
            .drain(..)
            .filter(|m| !m.is_last)
            .collect();
        for member in base.members_by_seq.iter().filter(|m| !m.is_last) {
            self.push_member(member.clone());
        }
        for member in own {
            self.push_member(member);
        }
    }

    /// Members in declaration order, terminator included.
    pub fn members_by_seq(&self) -> &[EntityProperties] {
        &self.members_by_seq
    }

    /// Members in id order, terminator included.
    pub fn members_by_id(&self) -> &[EntityProperties] {
        &self.members_by_id
    }

    /// Key members in declaration order, terminator included.
    pub fn keys_by_seq(&self) -> &[EntityProperties] {
        &self.keys_by_seq
    }

    /// Key members in id order, terminator included.
    pub fn keys_by_id(&self) -> &[EntityProperties] {
        &self.keys_by_id
    }

    /// List walked by a traversal: key list by id in key mode, declaration
    /// order otherwise.
    pub fn entities(&self, key: bool) -> &[EntityProperties] {
        if key {
            &self.keys_by_id
        } else {
            &self.members_by_seq
        }
    }

    /// Terminator of the list walked in the given mode.
    pub fn terminator(&self, key: bool) -> &EntityProperties {
        self.entities(key)
            .last()
            .filter(|m| m.is_last)
            .unwrap_or(&TERMINATOR)
    }

    /// Look up a member by id (binary search on the id-ordered view).
    pub fn find_member(&self, member_id: u32) -> Option<&EntityProperties> {
        let members = match self.members_by_id.split_last() {
            Some((last, rest)) if last.is_last => rest,
            _ => &self.members_by_id[..],
        };
        members
            .binary_search_by(|m| m.member_id.cmp(&member_id))
            .ok()
            .and_then(|idx| members.get(idx))
    }

    /// Total order of the id views: terminators last, then by member id.
    pub fn member_id_comp(lhs: &EntityProperties, rhs: &EntityProperties) -> Ordering {
        match (lhs.is_last, rhs.is_last) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => lhs.member_id.cmp(&rhs.member_id),
        }
    }

    /// Complete the tree: finish sub-trees, derive key lists, propagate
    /// must-understand, build the id views and append terminators.
    ///
    /// A nested (non-root) aggregate that declares no key members uses all
    /// of its members as key members. Calling `finish` again recomputes every
    /// derived list.
    pub fn finish(&mut self, at_root: bool) {
        let parent_ext = self.e_ext;
        let mut members: Vec<EntityProperties> = self
            .members_by_seq
            .drain(..)
            .filter(|m| !m.is_last)
            .collect();
        for member in &mut members {
            member.p_ext = parent_ext;
            member.finish(false);
        }
        // Duplicate ids come from merged base types; first declaration wins.
        let mut unique: Vec<EntityProperties> = Vec::with_capacity(members.len());
        for member in members {
            match unique.iter_mut().find(|m| m.member_id == member.member_id) {
                Some(kept) => {
                    kept.must_understand |= member.must_understand;
                    kept.is_key |= member.is_key;
                }
                None => unique.push(member),
            }
        }
        self.members_by_seq = unique;

        self.finish_keys(at_root);

        self.members_by_id = Self::sort_by_id(&self.members_by_seq);
        self.keys_by_id = Self::sort_by_id(&self.keys_by_seq);

        for list in [
            &mut self.members_by_seq,
            &mut self.members_by_id,
            &mut self.keys_by_seq,
            &mut self.keys_by_id,
        ] {
            list.push(Self::sentinel(parent_ext));
        }
    }

    fn finish_keys(&mut self, at_root: bool) {
        let declared = self.members_by_seq.iter().any(|m| m.is_key);
        self.keys_by_seq = if declared {
            self.members_by_seq
                .iter()
                .filter(|m| m.is_key)
                .cloned()
                .collect()
        } else if !at_root && matches!(self.kind, AggregateKind::Struct) {
            self.members_by_seq.clone()
        } else {
            Vec::new()
        };
        for key in &mut self.keys_by_seq {
            key.is_key = true;
            key.must_understand = true;
        }
        if declared {
            for member in &mut self.members_by_seq {
                if self.keys_by_seq.iter().any(|k| k.member_id == member.member_id) {
                    member.must_understand = true;
                }
            }
        }
    }

    /// Stable sort by id; entries with equal ids collapse into one, keeping
    /// must-understand if either carried it.
    fn sort_by_id(list: &[EntityProperties]) -> Vec<EntityProperties> {
        let mut sorted: Vec<EntityProperties> =
            list.iter().filter(|m| !m.is_last).cloned().collect();
        sorted.sort_by(Self::member_id_comp);
        sorted.dedup_by(|later, kept| {
            if later.member_id == kept.member_id {
                kept.must_understand |= later.must_understand;
                true
            } else {
                false
            }
        });
        sorted
    }
}

/// Member node for a field of type `T`: the (cached) props of `T` with the
/// given wire identity.
pub fn member_props<T: CdrValue + 'static>(member_id: u32, is_optional: bool) -> EntityProperties {
    let mut props = EntityProperties::clone(&get_type_props::<T>());
    props.is_key = false;
    props.must_understand = false;
    props.set_member_props(member_id, is_optional);
    props
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: u32) -> EntityProperties {
        EntityProperties::primitive(BitBound::Bits32).with_member_props(id, false)
    }

    fn ids(list: &[EntityProperties]) -> Vec<Option<u32>> {
        list.iter()
            .map(|m| if m.is_last { None } else { Some(m.member_id) })
            .collect()
    }

    #[test]
    fn test_bit_bound_inference() {
        assert_eq!(BitBound::from_size(1), BitBound::Bits8);
        assert_eq!(BitBound::from_size(8), BitBound::Bits64);
        assert_eq!(BitBound::from_size(3), BitBound::Unset);
        assert_eq!(BitBound::from_bits(9), BitBound::Bits16);
        assert_eq!(BitBound::from_bits(32), BitBound::Bits32);
        assert_eq!(BitBound::from_bits(33), BitBound::Bits64);
        assert_eq!(BitBound::Bits16.bytes(), 2);
    }

    #[test]
    fn test_finish_sorts_and_terminates() {
        let mut props = EntityProperties::aggregate(AggregateKind::Struct, Extensibility::Mutable);
        props.push_member(member(7));
        props.push_member(member(2));
        props.push_member(member(5));
        props.finish(true);

        assert_eq!(ids(props.members_by_seq()), vec![Some(7), Some(2), Some(5), None]);
        assert_eq!(ids(props.members_by_id()), vec![Some(2), Some(5), Some(7), None]);
        assert!(props
            .members_by_seq()
            .iter()
            .all(|m| m.p_ext == Extensibility::Mutable));
        assert_eq!(ids(props.keys_by_id()), vec![None]);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut props = EntityProperties::aggregate(AggregateKind::Struct, Extensibility::Final);
        props.push_member(member(1).key(true));
        props.push_member(member(0));
        props.finish(true);
        let once = props.clone();
        props.finish(true);
        assert_eq!(props, once);
    }

    #[test]
    fn test_duplicate_ids_merge_must_understand() {
        let mut base = EntityProperties::aggregate(AggregateKind::Struct, Extensibility::Final);
        base.push_member(member(3));
        base.finish(true);

        let mut derived = EntityProperties::aggregate(AggregateKind::Struct, Extensibility::Final);
        derived.push_member(member(3).must_understand(true));
        derived.push_member(member(1));
        derived.append_base(&base);
        derived.finish(true);

        assert_eq!(ids(derived.members_by_id()), vec![Some(1), Some(3), None]);
        assert!(derived.find_member(3).expect("member 3").must_understand);
        assert_eq!(ids(derived.members_by_seq()), vec![Some(3), Some(1), None]);
    }

    #[test]
    fn test_keys_propagate_must_understand() {
        let mut props = EntityProperties::aggregate(AggregateKind::Struct, Extensibility::Final);
        props.push_member(member(4));
        props.push_member(member(1).key(true));
        props.push_member(member(0).key(true));
        props.finish(true);

        assert_eq!(ids(props.keys_by_seq()), vec![Some(1), Some(0), None]);
        assert_eq!(ids(props.keys_by_id()), vec![Some(0), Some(1), None]);
        assert!(props.find_member(1).expect("key member").must_understand);
        assert!(!props.find_member(4).expect("plain member").must_understand);
    }

    #[test]
    fn test_nested_keyless_struct_falls_back_to_all_members() {
        let mut inner = EntityProperties::aggregate(AggregateKind::Struct, Extensibility::Final);
        inner.push_member(member(1));
        inner.push_member(member(0));
        inner.finish(true);
        assert_eq!(ids(inner.keys_by_id()), vec![None]);

        let mut outer = EntityProperties::aggregate(AggregateKind::Struct, Extensibility::Final);
        outer.push_member(inner.clone().with_member_props(0, false).key(true));
        outer.finish(true);

        let key = &outer.keys_by_id()[0];
        assert_eq!(ids(key.keys_by_id()), vec![Some(0), Some(1), None]);
        // The fallback does not turn the nested members into must-understand ones.
        assert!(key
            .members_by_seq()
            .iter()
            .filter(|m| m.is_valid())
            .all(|m| !m.must_understand));
    }

    #[test]
    fn test_member_id_comp_orders_terminator_last() {
        let end = EntityProperties::sentinel(Extensibility::Final);
        assert_eq!(
            EntityProperties::member_id_comp(&member(u32::MAX), &end),
            Ordering::Less
        );
        assert_eq!(
            EntityProperties::member_id_comp(&end, &member(0)),
            Ordering::Greater
        );
        assert_eq!(
            EntityProperties::member_id_comp(&member(3), &member(9)),
            Ordering::Less
        );
    }

    #[test]
    fn test_unfinished_props_have_terminator() {
        let props = EntityProperties::aggregate(AggregateKind::Struct, Extensibility::Final);
        assert!(props.terminator(false).is_last);
        assert!(props.find_member(0).is_none());
    }
}
